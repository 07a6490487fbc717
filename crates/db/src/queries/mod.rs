pub mod bookings;
pub mod quota;
pub mod services;
pub mod transaction_events;
