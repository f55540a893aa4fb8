//! `herald-core` — configuration, shared error type, and delivery payload types
//! used across the Herald workspace.

pub mod config;
pub mod delivery;
pub mod error;

pub use config::HeraldConfig;
pub use delivery::{DeliveryPayload, PayloadItem, PayloadKind};
pub use error::{HeraldError, Result};
