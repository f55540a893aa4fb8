use herald_core::delivery::DeliveryPayload;
use serde::{Deserialize, Serialize};

/// Lifecycle state of one claimed flow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Claimed, delivery in flight. A pending entry past the grace period
    /// is a stuck claim.
    Pending,
    /// Delivered; `attachment_sent` records what went out.
    Sent,
    /// Delivery failed terminally; `error` records why. Never retried for
    /// this trigger instance.
    Failed,
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::Sent => "sent",
            StepStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StepStatus::Pending),
            "sent" => Ok(StepStatus::Sent),
            "failed" => Ok(StepStatus::Failed),
            other => Err(format!("unknown step status: {other}")),
        }
    }
}

/// Terminal outcome of a claimed step, recorded over the pending entry.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    Sent {
        attachment_sent: Option<DeliveryPayload>,
    },
    Failed {
        error: String,
    },
}

/// One processed flow step for one recipient within one trigger instance.
///
/// The (recipient_key, campaign_id, trigger_at, step_offset) tuple is unique;
/// the row's existence means the step was claimed and must never be
/// reprocessed for this trigger instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReminderMetadataItem {
    /// UUID v4 row id.
    pub id: String,
    pub recipient_key: String,
    pub campaign_id: String,
    /// RFC3339 canonical trigger instant.
    pub trigger_at: String,
    /// Step identity: minutes from the initial send, 0 for the initial.
    pub step_offset: u32,
    /// Message text of the step at claim time.
    pub message: String,
    /// RFC3339 instant the step matured.
    pub remind_at: String,
    pub status: StepStatus,
    /// Payload that was actually delivered, for sent steps with attachments.
    pub attachment_sent: Option<DeliveryPayload>,
    /// Terminal failure reason, for failed steps.
    pub error: Option<String>,
    /// RFC3339 wall-clock instant the claim was taken.
    pub claimed_at: String,
    pub updated_at: String,
}

/// A trigger instance with at least one recorded step, as returned by
/// [`MetadataStore::instances_since`](crate::manager::MetadataStore::instances_since).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenInstance {
    pub recipient_key: String,
    pub trigger_at: chrono::DateTime<chrono::Utc>,
}

/// A pending entry older than the grace period with no terminal outcome.
///
/// Surfaced for operators; never auto-resolved, since a silent retry could
/// double-send.
#[derive(Debug, Clone, Serialize)]
pub struct StuckClaim {
    pub recipient_key: String,
    pub campaign_id: String,
    pub trigger_at: String,
    pub step_offset: u32,
    pub claimed_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_status_roundtrips_through_strings() {
        for status in [StepStatus::Pending, StepStatus::Sent, StepStatus::Failed] {
            let s = status.to_string();
            let parsed: StepStatus = s.parse().expect("parse failed");
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn unknown_status_string_is_an_error() {
        assert!("delivered".parse::<StepStatus>().is_err());
    }
}
