pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use axum::{http::HeaderValue, routing::get, Json, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::gateway::PaymentGateway;
use crate::services::{
    AppointmentService, AvailabilityService, CatalogService, LoyaltyService, OrderService,
    PaymentService, ReviewService, StatsService,
};

/// Envelope for successful responses.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Shared application state: one instance of each service plus the raw
/// handles they were built from.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: Arc<AppConfig>,
    pub event_sender: EventSender,
    pub availability: AvailabilityService,
    pub appointments: AppointmentService,
    pub payments: PaymentService,
    pub catalog: CatalogService,
    pub orders: OrderService,
    pub loyalty: LoyaltyService,
    pub reviews: ReviewService,
    pub stats: StatsService,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: Arc<AppConfig>,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            availability: AvailabilityService::new(db.clone()),
            appointments: AppointmentService::new(db.clone(), event_sender.clone()),
            payments: PaymentService::new(
                db.clone(),
                gateway,
                config.pesapal.clone(),
                event_sender.clone(),
            ),
            catalog: CatalogService::new(db.clone()),
            orders: OrderService::new(db.clone()),
            loyalty: LoyaltyService::new(db.clone()),
            reviews: ReviewService::new(db.clone()),
            stats: StatsService::new(db.clone()),
            db,
            config,
            event_sender,
        }
    }
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(handlers::catalog::routes())
        .merge(handlers::appointments::routes())
        .merge(handlers::payments::routes())
        .merge(handlers::orders::routes())
        .merge(handlers::loyalty::routes())
        .merge(handlers::reviews::routes())
        .merge(handlers::admin::routes())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    match allowed_origins {
        Some(origins) if !origins.trim().is_empty() => {
            let parsed: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|origin| origin.trim().parse::<HeaderValue>().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(parsed)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any)
        }
        _ => CorsLayer::permissive(),
    }
}

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config.cors_allowed_origins.as_deref());

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}
