mod common;

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal_macros::dec;
use salon_api::entities::{appointment, order, user};
use salon_api::errors::ServiceError;
use salon_api::services::appointments::NewAppointment;
use salon_api::services::orders::{NewOrder, NewOrderItem};
use salon_api::services::payments::{PaymentLookup, PaymentReference};
use salon_api::services::reviews::NewReview;

use common::TestApp;

fn hair_oil(quantity: i32) -> NewOrderItem {
    NewOrderItem {
        item_name: "Argan hair oil".to_string(),
        quantity,
        unit_price: dec!(1250),
    }
}

#[tokio::test]
async fn order_requires_items_and_positive_total() {
    let app = TestApp::spawn().await;
    let client = app.seed_user(user::ROLE_CLIENT).await;

    let empty = app
        .state
        .orders
        .create(NewOrder {
            client_id: client.id,
            items: vec![],
            total_amount: dec!(100),
            currency: "KES".to_string(),
            notes: None,
        })
        .await;
    assert_matches!(empty, Err(ServiceError::ValidationError(_)));

    let zero_total = app
        .state
        .orders
        .create(NewOrder {
            client_id: client.id,
            items: vec![hair_oil(1)],
            total_amount: dec!(0),
            currency: "KES".to_string(),
            notes: None,
        })
        .await;
    assert_matches!(zero_total, Err(ServiceError::ValidationError(_)));

    let bad_quantity = app
        .state
        .orders
        .create(NewOrder {
            client_id: client.id,
            items: vec![hair_oil(0)],
            total_amount: dec!(1250),
            currency: "KES".to_string(),
            notes: None,
        })
        .await;
    assert_matches!(bad_quantity, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn paid_order_accrues_loyalty() {
    let app = TestApp::spawn().await;
    let client = app.seed_user(user::ROLE_CLIENT).await;

    let created = app
        .state
        .orders
        .create(NewOrder {
            client_id: client.id,
            items: vec![hair_oil(2)],
            total_amount: dec!(2500),
            currency: "KES".to_string(),
            notes: None,
        })
        .await
        .unwrap();
    assert_eq!(created.payment_status, order::PAYMENT_PENDING);

    let items = app.state.orders.items(created.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 2);

    let initiated = app
        .state
        .payments
        .initiate(PaymentReference::Order(created.id), "Shop order".to_string())
        .await
        .unwrap();

    app.gateway.set_status_code("1");
    app.state
        .payments
        .reconcile(PaymentLookup::MerchantReference(
            initiated.merchant_reference,
        ))
        .await
        .unwrap();
    app.settle_events().await;

    let paid = app.state.orders.get(created.id).await.unwrap();
    assert_eq!(paid.payment_status, order::PAYMENT_PAID);
    assert_eq!(app.state.loyalty.balance(client.id).await.unwrap(), 25);
}

async fn completed_appointment(app: &TestApp) -> appointment::Model {
    let branch = app.seed_branch().await;
    let staff = app.seed_staff(branch.id).await;
    let service = app.seed_service(branch.id, 30, dec!(900)).await;
    app.link_staff_service(staff.id, service.id).await;
    let client = app.seed_user(user::ROLE_CLIENT).await;

    let appt = app
        .state
        .appointments
        .create(NewAppointment {
            branch_id: branch.id,
            client_id: client.id,
            staff_id: staff.id,
            service_id: service.id,
            appointment_date: NaiveDate::from_ymd_opt(2026, 9, 14).unwrap(),
            start_time: NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            notes: None,
        })
        .await
        .unwrap();
    app.state
        .appointments
        .update_status(appt.id, appointment::STATUS_CONFIRMED)
        .await
        .unwrap();
    app.state
        .appointments
        .update_status(appt.id, appointment::STATUS_COMPLETED)
        .await
        .unwrap()
}

#[tokio::test]
async fn review_requires_completed_appointment() {
    let app = TestApp::spawn().await;
    let branch = app.seed_branch().await;
    let staff = app.seed_staff(branch.id).await;
    let service = app.seed_service(branch.id, 30, dec!(900)).await;
    app.link_staff_service(staff.id, service.id).await;
    let client = app.seed_user(user::ROLE_CLIENT).await;

    let appt = app
        .state
        .appointments
        .create(NewAppointment {
            branch_id: branch.id,
            client_id: client.id,
            staff_id: staff.id,
            service_id: service.id,
            appointment_date: NaiveDate::from_ymd_opt(2026, 9, 14).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            notes: None,
        })
        .await
        .unwrap();

    let early = app
        .state
        .reviews
        .create(NewReview {
            client_id: client.id,
            appointment_id: appt.id,
            rating: 5,
            comment: None,
        })
        .await;
    assert_matches!(early, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn review_flow_and_duplicates() {
    let app = TestApp::spawn().await;
    let appt = completed_appointment(&app).await;

    let stranger = app.seed_user(user::ROLE_CLIENT).await;
    let not_owner = app
        .state
        .reviews
        .create(NewReview {
            client_id: stranger.id,
            appointment_id: appt.id,
            rating: 4,
            comment: None,
        })
        .await;
    assert_matches!(not_owner, Err(ServiceError::Forbidden(_)));

    let created = app
        .state
        .reviews
        .create(NewReview {
            client_id: appt.client_id,
            appointment_id: appt.id,
            rating: 5,
            comment: Some("Great cut".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(created.branch_id, appt.branch_id);
    assert_eq!(created.staff_id, Some(appt.staff_id));

    let duplicate = app
        .state
        .reviews
        .create(NewReview {
            client_id: appt.client_id,
            appointment_id: appt.id,
            rating: 1,
            comment: None,
        })
        .await;
    assert_matches!(duplicate, Err(ServiceError::Conflict(_)));

    let for_branch = app
        .state
        .reviews
        .list_for_branch(appt.branch_id)
        .await
        .unwrap();
    assert_eq!(for_branch.len(), 1);

    let out_of_range = app
        .state
        .reviews
        .create(NewReview {
            client_id: appt.client_id,
            appointment_id: appt.id,
            rating: 6,
            comment: None,
        })
        .await;
    assert_matches!(out_of_range, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn admin_stats_aggregate() {
    let app = TestApp::spawn().await;
    let appt = completed_appointment(&app).await;

    let initiated = app
        .state
        .payments
        .initiate(
            PaymentReference::Appointment(appt.id),
            "Haircut".to_string(),
        )
        .await
        .unwrap();
    app.gateway.set_status_code("1");
    app.state
        .payments
        .reconcile(PaymentLookup::MerchantReference(
            initiated.merchant_reference,
        ))
        .await
        .unwrap();
    app.settle_events().await;

    let stats = app.state.stats.admin_stats().await.unwrap();
    assert_eq!(stats.total_appointments, 1);
    assert_eq!(
        stats.appointments_by_status.get("completed").copied(),
        Some(1)
    );
    assert_eq!(stats.total_revenue, dec!(900));
    assert_eq!(stats.total_clients, 1);
}
