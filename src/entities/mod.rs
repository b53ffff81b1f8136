pub mod appointment;
pub mod branch;
pub mod loyalty_point;
pub mod loyalty_transaction;
pub mod order;
pub mod order_item;
pub mod payment_transaction;
pub mod review;
pub mod service;
pub mod staff;
pub mod staff_service;
pub mod user;
