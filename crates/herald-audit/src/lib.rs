//! Append-only audit log of every attempted delivery.
//!
//! Each send, successful or not, is appended as a `send_history` row. The
//! log is write-once telemetry for reporting and operator review: it is
//! never consulted when deciding whether a step may be sent, and it never
//! blocks a delivery. The single permitted mutation is an administrative
//! edit of a record's free-text notes.

pub mod db;
pub mod error;
pub mod log;
pub mod types;

pub use error::AuditError;
pub use log::AuditLog;
pub use types::{SendHistory, SendHistoryFilter, SendHistoryPage, SendRecord};
