pub mod booking;
pub mod quota;
pub mod service;
pub mod transaction;

pub use booking::BookingRecord;
pub use quota::{QuotaAllocation, QuotaCounter};
pub use service::Service;
pub use transaction::{TransactionEvent, TransactionState};
