//! `herald-campaign` — campaign definitions and the pure evaluation logic
//! built on top of them.
//!
//! # Overview
//!
//! A campaign pairs a recurrence model ([`types::PromotionConfig`]) with an
//! ordered message flow ([`types::MessageFlow`]) and a recipient list. The
//! [`schedule`] module decides whether a campaign is triggered at a given
//! instant, [`flow`] expands a trigger into the flow steps that have matured,
//! and [`attach`] normalizes step attachments into delivery payloads. All
//! three are pure functions of their inputs; idempotent delivery is the
//! metadata store's job, not this crate's.
//!
//! # Recurrence variants
//!
//! | Variant   | Behaviour                                                  |
//! |-----------|------------------------------------------------------------|
//! | `hourly`  | Due inside a `[start_time, end_time)` window every day     |
//! | `weekly`  | Due on one weekday at a fixed time (0 = Sunday)            |
//! | `3_day`   | Due on any weekday in a set at a fixed time                |

pub mod attach;
pub mod error;
pub mod flow;
pub mod roster;
pub mod schedule;
pub mod types;

pub use error::{CampaignError, Result};
pub use schedule::Trigger;
pub use types::{Attachment, Campaign, MessageFlow, PromotionConfig};
