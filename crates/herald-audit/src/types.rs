use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Input for one audit entry, appended after every delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRecord {
    /// Message text as handed to the transport.
    pub content: String,
    /// Instant the send happened (or failed).
    pub sent_at: DateTime<Utc>,
    /// Sender identity, a person or a system name.
    pub sent_from: String,
    /// Transport-level destination the message went to.
    pub sent_to: String,
    /// Normalised recipient identifier, when known.
    pub recipient_key: Option<String>,
    /// Operator who initiated the send, for manual sends.
    pub user_id: Option<String>,
    /// Classification tag, e.g. `auto_greeting` or `scheduled`.
    pub send_function: String,
    pub notes: Option<String>,
}

/// One persisted audit row. Immutable after creation apart from
/// administrative `notes` edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendHistory {
    pub id: i64,
    pub content: String,
    pub sent_at: String,
    pub sent_from: String,
    pub sent_to: String,
    pub recipient_key: Option<String>,
    pub user_id: Option<String>,
    pub send_function: String,
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Filter for querying the audit log. All fields are optional; unset
/// fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SendHistoryFilter {
    /// Exact match on the recipient identifier.
    pub recipient_key: Option<String>,
    /// Exact match on the originating operator.
    pub user_id: Option<String>,
    /// Exact match on the classification tag.
    pub send_function: Option<String>,
    /// Inclusive lower bound on `sent_at`.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `sent_at`.
    pub to: Option<DateTime<Utc>>,
    /// Substring match on the notes text.
    pub notes: Option<String>,
    /// 1-indexed page, defaults to 1.
    pub page: Option<u32>,
    /// Rows per page, defaults to 20.
    pub page_size: Option<u32>,
}

/// One page of audit rows plus the total match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendHistoryPage {
    pub data: Vec<SendHistory>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}
