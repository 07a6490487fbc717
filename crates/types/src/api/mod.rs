pub mod bookings;
pub mod services;

pub use bookings::*;
pub use services::*;
