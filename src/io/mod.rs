/// CSV export of market records.
pub mod export;
