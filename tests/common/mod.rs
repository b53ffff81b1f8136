#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;
use uuid::Uuid;

use salon_api::config::AppConfig;
use salon_api::db::{self, DbConfig};
use salon_api::entities::{branch, service, staff, staff_service, user};
use salon_api::errors::ServiceError;
use salon_api::events;
use salon_api::gateway::{
    GatewayOrderRequest, GatewaySubmitResponse, GatewayTransactionStatus, PaymentGateway,
};
use salon_api::AppState;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Scripted gateway double. Counts every call so tests can assert the
/// idempotent paths never touch the gateway.
pub struct MockGateway {
    pub ipn_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub fail_submit: AtomicBool,
    status_code: Mutex<String>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            ipn_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            fail_submit: AtomicBool::new(false),
            status_code: Mutex::new("0".to_string()),
        }
    }

    pub fn set_status_code(&self, code: &str) {
        *self.status_code.lock().unwrap() = code.to_string();
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn ipn_calls(&self) -> usize {
        self.ipn_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn register_ipn(&self) -> Result<String, ServiceError> {
        self.ipn_calls.fetch_add(1, Ordering::SeqCst);
        Ok("ipn-test-1".to_string())
    }

    async fn submit_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewaySubmitResponse, ServiceError> {
        let n = self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(ServiceError::GatewayError(
                "submission rejected by test double".to_string(),
            ));
        }
        Ok(GatewaySubmitResponse {
            order_tracking_id: format!("track-{}-{}", n, request.merchant_reference),
            redirect_url: "https://gateway.test/checkout".to_string(),
        })
    }

    async fn transaction_status(
        &self,
        _tracking_id: &str,
    ) -> Result<GatewayTransactionStatus, ServiceError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let code = self.status_code.lock().unwrap().clone();
        Ok(GatewayTransactionStatus {
            payment_status_code: code.clone(),
            payment_method: Some("MPESA".to_string()),
            amount: Decimal::ZERO,
            currency: "KES".to_string(),
            raw: json!({ "status_code": code, "payment_method": "MPESA" }),
        })
    }
}

/// In-memory application: SQLite, migrations applied, event processor
/// running, fake gateway wired in.
pub struct TestApp {
    pub state: AppState,
    pub gateway: Arc<MockGateway>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        // One pooled connection: each SQLite in-memory connection is its
        // own database.
        let db_config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let db = Arc::new(
            db::establish_connection_with_config(&db_config)
                .await
                .expect("test database"),
        );
        db::run_migrations(&db).await.expect("migrations");

        let config = AppConfig::new(
            db_config.url.clone(),
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );

        let (event_sender, event_receiver) = events::event_channel(64);
        tokio::spawn(events::process_events(event_receiver, db.clone()));

        let gateway = Arc::new(MockGateway::new());
        let state = AppState::new(db, Arc::new(config), gateway.clone(), event_sender);

        Self { state, gateway }
    }

    /// Yields to the event processor so side effects land before asserts.
    pub async fn settle_events(&self) {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    pub async fn seed_branch(&self) -> branch::Model {
        branch::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Westlands".to_string()),
            city: Set("Nairobi".to_string()),
            address: Set(Some("Woodvale Grove".to_string())),
            phone: Set(None),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed branch")
    }

    pub async fn seed_user(&self, role: &str) -> user::Model {
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(format!("{}@test.example", Uuid::new_v4())),
            full_name: Set("Wanjiku Kamau".to_string()),
            phone: Set(Some("+254700000000".to_string())),
            role: Set(role.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed user")
    }

    pub async fn seed_staff(&self, branch_id: Uuid) -> staff::Model {
        let account = self.seed_user(user::ROLE_STAFF).await;
        staff::ActiveModel {
            id: Set(Uuid::new_v4()),
            branch_id: Set(branch_id),
            user_id: Set(account.id),
            title: Set(Some("Stylist".to_string())),
            is_available: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed staff")
    }

    pub async fn seed_service(
        &self,
        branch_id: Uuid,
        duration_minutes: i32,
        price: Decimal,
    ) -> service::Model {
        service::ActiveModel {
            id: Set(Uuid::new_v4()),
            branch_id: Set(branch_id),
            name: Set("Haircut".to_string()),
            description: Set(None),
            duration_minutes: Set(duration_minutes),
            price: Set(price),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed service")
    }

    pub async fn link_staff_service(&self, staff_id: Uuid, service_id: Uuid) {
        staff_service::ActiveModel {
            staff_id: Set(staff_id),
            service_id: Set(service_id),
        }
        .insert(&*self.state.db)
        .await
        .expect("link staff to service");
    }
}
