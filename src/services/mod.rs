pub mod appointments;
pub mod availability;
pub mod catalog;
pub mod loyalty;
pub mod orders;
pub mod payments;
pub mod reviews;
pub mod stats;

pub use appointments::AppointmentService;
pub use availability::AvailabilityService;
pub use catalog::CatalogService;
pub use loyalty::LoyaltyService;
pub use orders::OrderService;
pub use payments::PaymentService;
pub use reviews::ReviewService;
pub use stats::StatsService;
