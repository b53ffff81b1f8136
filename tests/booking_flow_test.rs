mod common;

use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal_macros::dec;
use salon_api::entities::appointment;
use salon_api::errors::ServiceError;
use salon_api::services::appointments::NewAppointment;

use common::TestApp;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 9, 14).unwrap()
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

async fn booking(
    app: &TestApp,
    staff_id: uuid::Uuid,
    service_id: uuid::Uuid,
    branch_id: uuid::Uuid,
    client_id: uuid::Uuid,
    start: NaiveTime,
) -> Result<appointment::Model, ServiceError> {
    app.state
        .appointments
        .create(NewAppointment {
            branch_id,
            client_id,
            staff_id,
            service_id,
            appointment_date: date(),
            start_time: start,
            notes: None,
        })
        .await
}

#[tokio::test]
async fn unbooked_day_exposes_full_grid() {
    let app = TestApp::spawn().await;
    let branch = app.seed_branch().await;
    let staff = app.seed_staff(branch.id).await;

    let slots = app
        .state
        .availability
        .available_slots(staff.id, date())
        .await
        .unwrap();

    assert_eq!(slots.len(), 18);
    assert_eq!(slots[0], t(9, 0));
    assert_eq!(slots[17], t(17, 30));
}

#[tokio::test]
async fn hour_long_booking_removes_both_slots() {
    let app = TestApp::spawn().await;
    let branch = app.seed_branch().await;
    let staff = app.seed_staff(branch.id).await;
    let service = app.seed_service(branch.id, 60, dec!(1500)).await;
    app.link_staff_service(staff.id, service.id).await;
    let client = app.seed_user("client").await;

    let appt = booking(&app, staff.id, service.id, branch.id, client.id, t(9, 0))
        .await
        .unwrap();
    assert_eq!(appt.end_time, t(10, 0));
    assert_eq!(appt.status, appointment::STATUS_PENDING);
    assert_eq!(appt.total_price, dec!(1500));

    let slots = app
        .state
        .availability
        .available_slots(staff.id, date())
        .await
        .unwrap();
    assert!(!slots.contains(&t(9, 0)));
    assert!(!slots.contains(&t(9, 30)));
    assert!(slots.contains(&t(10, 0)));
    assert_eq!(slots.len(), 16);
}

#[tokio::test]
async fn cancelling_frees_the_slot() {
    let app = TestApp::spawn().await;
    let branch = app.seed_branch().await;
    let staff = app.seed_staff(branch.id).await;
    let service = app.seed_service(branch.id, 30, dec!(500)).await;
    app.link_staff_service(staff.id, service.id).await;
    let client = app.seed_user("client").await;

    let appt = booking(&app, staff.id, service.id, branch.id, client.id, t(11, 0))
        .await
        .unwrap();
    app.state
        .appointments
        .update_status(appt.id, appointment::STATUS_CANCELLED)
        .await
        .unwrap();

    let slots = app
        .state
        .availability
        .available_slots(staff.id, date())
        .await
        .unwrap();
    assert_eq!(slots.len(), 18);
}

#[tokio::test]
async fn same_slot_twice_conflicts() {
    let app = TestApp::spawn().await;
    let branch = app.seed_branch().await;
    let staff = app.seed_staff(branch.id).await;
    let service = app.seed_service(branch.id, 30, dec!(500)).await;
    app.link_staff_service(staff.id, service.id).await;
    let first = app.seed_user("client").await;
    let second = app.seed_user("client").await;

    booking(&app, staff.id, service.id, branch.id, first.id, t(10, 0))
        .await
        .unwrap();
    let result = booking(&app, staff.id, service.id, branch.id, second.id, t(10, 0)).await;

    assert_matches!(result, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn overlapping_interval_conflicts() {
    let app = TestApp::spawn().await;
    let branch = app.seed_branch().await;
    let staff = app.seed_staff(branch.id).await;
    let long = app.seed_service(branch.id, 60, dec!(2000)).await;
    let short = app.seed_service(branch.id, 30, dec!(500)).await;
    app.link_staff_service(staff.id, long.id).await;
    app.link_staff_service(staff.id, short.id).await;
    let client = app.seed_user("client").await;

    booking(&app, staff.id, long.id, branch.id, client.id, t(9, 0))
        .await
        .unwrap();
    // 09:30 falls inside the 09:00-10:00 booking.
    let result = booking(&app, staff.id, short.id, branch.id, client.id, t(9, 30)).await;

    assert_matches!(result, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn off_grid_start_rejected() {
    let app = TestApp::spawn().await;
    let branch = app.seed_branch().await;
    let staff = app.seed_staff(branch.id).await;
    let service = app.seed_service(branch.id, 30, dec!(500)).await;
    app.link_staff_service(staff.id, service.id).await;
    let client = app.seed_user("client").await;

    let before_opening = booking(&app, staff.id, service.id, branch.id, client.id, t(8, 30)).await;
    assert_matches!(before_opening, Err(ServiceError::ValidationError(_)));

    let off_grid = booking(&app, staff.id, service.id, branch.id, client.id, t(10, 15)).await;
    assert_matches!(off_grid, Err(ServiceError::ValidationError(_)));

    let at_close = booking(&app, staff.id, service.id, branch.id, client.id, t(18, 0)).await;
    assert_matches!(at_close, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn end_time_rolls_past_closing() {
    let app = TestApp::spawn().await;
    let branch = app.seed_branch().await;
    let staff = app.seed_staff(branch.id).await;
    let service = app.seed_service(branch.id, 60, dec!(1500)).await;
    app.link_staff_service(staff.id, service.id).await;
    let client = app.seed_user("client").await;

    let appt = booking(&app, staff.id, service.id, branch.id, client.id, t(17, 30))
        .await
        .unwrap();
    assert_eq!(appt.end_time, t(18, 30));
}

#[tokio::test]
async fn status_machine_enforced() {
    let app = TestApp::spawn().await;
    let branch = app.seed_branch().await;
    let staff = app.seed_staff(branch.id).await;
    let service = app.seed_service(branch.id, 30, dec!(500)).await;
    app.link_staff_service(staff.id, service.id).await;
    let client = app.seed_user("client").await;

    let appt = booking(&app, staff.id, service.id, branch.id, client.id, t(12, 0))
        .await
        .unwrap();

    // pending cannot jump straight to completed
    let skip = app
        .state
        .appointments
        .update_status(appt.id, appointment::STATUS_COMPLETED)
        .await;
    assert_matches!(skip, Err(ServiceError::InvalidTransition(_)));

    let confirmed = app
        .state
        .appointments
        .update_status(appt.id, appointment::STATUS_CONFIRMED)
        .await
        .unwrap();
    assert_eq!(confirmed.status, appointment::STATUS_CONFIRMED);

    let completed = app
        .state
        .appointments
        .update_status(appt.id, appointment::STATUS_COMPLETED)
        .await
        .unwrap();
    assert_eq!(completed.status, appointment::STATUS_COMPLETED);

    // completed is terminal
    let reopen = app
        .state
        .appointments
        .update_status(appt.id, appointment::STATUS_CANCELLED)
        .await;
    assert_matches!(reopen, Err(ServiceError::InvalidTransition(_)));
}

#[tokio::test]
async fn unknown_staff_is_not_found() {
    let app = TestApp::spawn().await;
    let result = app
        .state
        .availability
        .available_slots(uuid::Uuid::new_v4(), date())
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn staff_must_offer_the_service() {
    let app = TestApp::spawn().await;
    let branch = app.seed_branch().await;
    let staff = app.seed_staff(branch.id).await;
    let service = app.seed_service(branch.id, 30, dec!(500)).await;
    // no staff_services link
    let client = app.seed_user("client").await;

    let result = booking(&app, staff.id, service.id, branch.id, client.id, t(9, 0)).await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}
