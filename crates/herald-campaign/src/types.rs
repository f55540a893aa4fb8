use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::{CampaignError, Result};

/// Defines when a campaign fires.
///
/// Weekday numbering follows the source data: 0 = Sunday … 6 = Saturday.
/// Times are wall-clock `HH:MM:SS` with no date component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PromotionConfig {
    /// Recurs every day inside the `[start_time, end_time)` window.
    ///
    /// The campaign triggers at the window start and keeps re-evaluating
    /// reminders until the window closes. Windows must not cross midnight.
    Hourly {
        start_time: NaiveTime,
        end_time: NaiveTime,
        /// Cadence the flow's reminder offsets are expected to follow.
        remind_after_minutes: u32,
    },

    /// Fires once per week, on `day_of_week` at `time_of_day`.
    Weekly { day_of_week: u8, time_of_day: NaiveTime },

    /// Fires on any day whose weekday is in `days_of_week`, at `time_of_day`.
    #[serde(rename = "3_day")]
    ThreeDay {
        days_of_week: Vec<u8>,
        time_of_day: NaiveTime,
    },
}

impl PromotionConfig {
    /// Check the semantic invariants serde cannot express.
    ///
    /// Midnight-crossing hourly windows are rejected here rather than given
    /// wraparound semantics; a zero-width window is accepted but never due.
    pub fn validate(&self) -> Result<()> {
        match self {
            PromotionConfig::Hourly {
                start_time,
                end_time,
                remind_after_minutes,
            } => {
                if end_time < start_time {
                    return Err(CampaignError::InvalidConfig(format!(
                        "hourly window end {end_time} precedes start {start_time}"
                    )));
                }
                if *remind_after_minutes == 0 {
                    return Err(CampaignError::InvalidConfig(
                        "remind_after_minutes must be positive".to_string(),
                    ));
                }
            }
            PromotionConfig::Weekly { day_of_week, .. } => {
                if *day_of_week > 6 {
                    return Err(CampaignError::InvalidConfig(format!(
                        "day_of_week {day_of_week} out of range 0..=6"
                    )));
                }
            }
            PromotionConfig::ThreeDay { days_of_week, .. } => {
                if days_of_week.is_empty() {
                    return Err(CampaignError::InvalidConfig(
                        "days_of_week must not be empty".to_string(),
                    ));
                }
                if let Some(bad) = days_of_week.iter().find(|d| **d > 6) {
                    return Err(CampaignError::InvalidConfig(format!(
                        "day_of_week {bad} out of range 0..=6"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// The message sent at the moment a campaign triggers (flow offset 0).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialMessage {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

/// A follow-up message, offset in minutes from the initial send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderMessage {
    pub message: String,
    pub offset_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

/// A campaign's ordered message flow: one initial message followed by zero or
/// more reminders.
///
/// Step identity is the offset: 0 for the initial message, `offset_minutes`
/// for reminders. The flow is immutable once a trigger instance has started.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageFlow {
    pub initial: InitialMessage,
    #[serde(default)]
    pub reminders: Vec<ReminderMessage>,
}

impl MessageFlow {
    /// Reminder offsets must be positive and strictly increasing so each
    /// flow step has a distinct offset identity.
    pub fn validate(&self) -> Result<()> {
        let mut last = 0u32;
        for reminder in &self.reminders {
            if reminder.offset_minutes <= last {
                return Err(CampaignError::InvalidConfig(format!(
                    "reminder offsets must be strictly increasing and positive: \
                     {} follows {}",
                    reminder.offset_minutes, last
                )));
            }
            last = reminder.offset_minutes;
        }
        Ok(())
    }

    /// Largest reminder offset, or 0 for an initial-only flow.
    ///
    /// Valid flows keep offsets ascending, so the last reminder is the max.
    pub fn last_offset_minutes(&self) -> u32 {
        self.reminders.last().map(|r| r.offset_minutes).unwrap_or(0)
    }
}

/// A message attachment in one of three shapes.
///
/// Each shape carries a primary payload plus an optional list of secondary
/// items. Exactly one shape is present per message; absence is modelled as
/// `Option<Attachment>` on the flow step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attachment {
    Image {
        base64: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        items: Option<Vec<ImageItem>>,
    },
    Link {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        items: Option<Vec<LinkItem>>,
    },
    File {
        base64: String,
        filename: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        items: Option<Vec<FileItem>>,
    },
}

/// Secondary image descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageItem {
    pub base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Secondary link descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkItem {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Secondary file descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileItem {
    pub base64: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// One configured campaign: a schedule, a message flow, and the recipients
/// enrolled in it. Loaded from the roster file, read-mostly afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    /// Stable identifier; part of every claim key.
    pub id: String,
    /// Human-readable label.
    pub name: String,
    /// Disabled campaigns stay in the roster but are never evaluated.
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Function tag recorded on audit rows (e.g. "scheduled", "auto_greeting").
    #[serde(default = "default_send_function")]
    pub send_function: String,
    /// Name of the registered transport deliveries are routed through.
    #[serde(default = "default_transport")]
    pub transport: String,
    /// Identity recorded as the audit row's sender.
    #[serde(default = "default_sender")]
    pub sender: String,
    pub config: PromotionConfig,
    pub flow: MessageFlow,
    #[serde(default)]
    pub recipients: Vec<String>,
}

impl Campaign {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(CampaignError::InvalidConfig(
                "campaign id must not be empty".to_string(),
            ));
        }
        self.config.validate()?;
        self.flow.validate()
    }
}

fn bool_true() -> bool {
    true
}
fn default_send_function() -> String {
    "scheduled".to_string()
}
fn default_transport() -> String {
    "log".to_string()
}
fn default_sender() -> String {
    "herald".to_string()
}
