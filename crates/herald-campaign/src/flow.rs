use chrono::{DateTime, Duration, Utc};

use crate::schedule::Trigger;
use crate::types::{Attachment, MessageFlow};

/// A flow step that has matured for one trigger instance.
///
/// Borrows the message and attachment from the flow; the step's identity is
/// `offset_minutes` (0 for the initial message).
#[derive(Debug, Clone)]
pub struct DueStep<'a> {
    pub offset_minutes: u32,
    pub message: &'a str,
    pub attachment: Option<&'a Attachment>,
    /// Instant the step matured: trigger + offset.
    pub due_at: DateTime<Utc>,
}

/// Expand a trigger instance into the flow steps due at `now`, in ascending
/// offset order.
///
/// A step is due once `trigger.at + offset <= now`. When the trigger carries
/// a window end (hourly campaigns), reminders maturing after the close are
/// dropped: the window shut before they came due. The same step is returned
/// on every tick until the instance ages out, so callers must pair this with
/// the metadata store's claim to avoid re-sending.
pub fn steps_due<'a>(
    flow: &'a MessageFlow,
    trigger: &Trigger,
    now: DateTime<Utc>,
) -> Vec<DueStep<'a>> {
    let mut due = Vec::new();

    if trigger.at <= now {
        due.push(DueStep {
            offset_minutes: 0,
            message: &flow.initial.message,
            attachment: flow.initial.attachment.as_ref(),
            due_at: trigger.at,
        });
    }

    for reminder in &flow.reminders {
        let due_at = trigger.at + Duration::minutes(reminder.offset_minutes as i64);
        // Offsets are strictly increasing, so the first miss ends the scan.
        if due_at > now {
            break;
        }
        if let Some(end) = trigger.window_end {
            if due_at > end {
                break;
            }
        }
        due.push(DueStep {
            offset_minutes: reminder.offset_minutes,
            message: &reminder.message,
            attachment: reminder.attachment.as_ref(),
            due_at,
        });
    }

    due
}
