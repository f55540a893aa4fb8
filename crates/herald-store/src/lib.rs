pub mod db;
pub mod error;
pub mod manager;
pub mod types;

pub use error::StoreError;
pub use manager::MetadataStore;
pub use types::{OpenInstance, ReminderMetadataItem, StepOutcome, StepStatus, StuckClaim};
