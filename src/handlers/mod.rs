pub mod admin;
pub mod appointments;
pub mod catalog;
pub mod loyalty;
pub mod orders;
pub mod payments;
pub mod reviews;
