//! Shared `SQLite` infrastructure for the factoid store.
//!
//! - [`connection`]: lock acquisition with poison recovery, pragmas
//! - [`factoid_row`]: row conversion for [`Factoid`](crate::models::Factoid)
//! - [`metrics`]: operation counters and latency histograms

mod connection;
mod factoid_row;
mod metrics;

pub use connection::{DEFAULT_BUSY_TIMEOUT, acquire_lock, configure_connection};
pub use factoid_row::{FACTOID_COLUMNS, FactoidRow};
pub use metrics::{record_operation_metrics, timed};
