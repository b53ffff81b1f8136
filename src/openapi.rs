use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::errors::ErrorResponse;
use crate::handlers;
use crate::services::stats::AdminStats;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Salon API",
        description = "Salon booking, retail orders and Pesapal payments"
    ),
    paths(
        handlers::catalog::list_branches,
        handlers::appointments::availability,
        handlers::appointments::create_appointment,
        handlers::appointments::update_status,
        handlers::payments::initiate,
        handlers::payments::status,
        handlers::orders::create_order,
        handlers::reviews::create_review,
        handlers::admin::stats,
    ),
    components(schemas(
        ErrorResponse,
        AdminStats,
        handlers::appointments::CreateAppointmentRequest,
        handlers::appointments::UpdateStatusRequest,
        handlers::payments::InitiatePaymentRequest,
        handlers::payments::InitiatePaymentResponse,
        handlers::orders::CreateOrderRequest,
        handlers::orders::OrderItemRequest,
        handlers::reviews::CreateReviewRequest,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "catalog", description = "Branches, services and staff"),
        (name = "appointments", description = "Availability and bookings"),
        (name = "payments", description = "Payment initiation and reconciliation"),
        (name = "orders", description = "Retail orders"),
        (name = "reviews", description = "Client reviews"),
        (name = "admin", description = "Administration")
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
