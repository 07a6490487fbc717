mod watchdog;

pub use watchdog::fail_stale_transactions;
