use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::db::init_db;
use crate::error::{Result, StoreError};
use crate::types::{OpenInstance, ReminderMetadataItem, StepOutcome, StepStatus, StuckClaim};

/// Thread-safe store for per-recipient reminder metadata.
///
/// Wraps a single SQLite connection in a `Mutex`. The store is the single
/// source of truth for "has this step already been sent": every delivery
/// attempt must win [`MetadataStore::try_claim`] first, and the claim row
/// survives crashes and overlapping evaluator ticks.
pub struct MetadataStore {
    db: Mutex<Connection>,
}

impl MetadataStore {
    /// Wrap a connection, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Atomically claim one (recipient, campaign, trigger instance, step)
    /// tuple. Returns `true` when this caller won the claim and now holds
    /// the exclusive right to attempt delivery; `false` when an entry for
    /// the tuple already exists (claimed on an earlier tick, by a racing
    /// evaluator, or already resolved).
    ///
    /// `INSERT OR IGNORE` against the tuple's UNIQUE constraint is the whole
    /// mechanism: of N racing callers exactly one insert changes a row.
    #[instrument(skip(self, message), fields(recipient_key, campaign_id, step_offset))]
    pub fn try_claim(
        &self,
        recipient_key: &str,
        campaign_id: &str,
        trigger_at: DateTime<Utc>,
        step_offset: u32,
        message: &str,
        remind_at: DateTime<Utc>,
    ) -> Result<bool> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let inserted = db.execute(
            "INSERT OR IGNORE INTO reminder_metadata
             (id, recipient_key, campaign_id, trigger_at, step_offset, message,
              remind_at, status, attachment_sent, error, claimed_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,'pending',NULL,NULL,?8,?8)",
            rusqlite::params![
                id,
                recipient_key,
                campaign_id,
                trigger_at.to_rfc3339(),
                step_offset,
                message,
                remind_at.to_rfc3339(),
                now
            ],
        )?;

        if inserted == 0 {
            debug!("claim lost: tuple already recorded");
        }
        Ok(inserted == 1)
    }

    /// Record the terminal outcome of a claimed step, overwriting the
    /// pending entry in place. Returns `ClaimNotFound` when no entry exists
    /// for the tuple, which means the caller never claimed it.
    #[instrument(skip(self, outcome), fields(recipient_key, campaign_id, step_offset))]
    pub fn record_outcome(
        &self,
        recipient_key: &str,
        campaign_id: &str,
        trigger_at: DateTime<Utc>,
        step_offset: u32,
        outcome: StepOutcome,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let (status, attachment_json, error) = match outcome {
            StepOutcome::Sent { attachment_sent } => {
                let json = attachment_sent
                    .map(|payload| serde_json::to_string(&payload))
                    .transpose()?;
                (StepStatus::Sent, json, None)
            }
            StepOutcome::Failed { error } => (StepStatus::Failed, None, Some(error)),
        };

        let db = self.db.lock().unwrap();
        let rows_changed = db.execute(
            "UPDATE reminder_metadata
             SET status = ?1, attachment_sent = ?2, error = ?3, updated_at = ?4
             WHERE recipient_key = ?5 AND campaign_id = ?6
               AND trigger_at = ?7 AND step_offset = ?8",
            rusqlite::params![
                status.to_string(),
                attachment_json,
                error,
                now,
                recipient_key,
                campaign_id,
                trigger_at.to_rfc3339(),
                step_offset
            ],
        )?;
        if rows_changed == 0 {
            return Err(StoreError::ClaimNotFound {
                recipient: recipient_key.to_string(),
                campaign: campaign_id.to_string(),
                offset: step_offset,
            });
        }
        Ok(())
    }

    /// All entries for one trigger instance, ordered by `remind_at`.
    ///
    /// Used to report what a recipient has been sent and to reconstruct
    /// already-claimed state when an instance is revisited after a restart.
    #[instrument(skip(self), fields(recipient_key, campaign_id, trigger_at = %trigger_at))]
    pub fn list_for_instance(
        &self,
        recipient_key: &str,
        campaign_id: &str,
        trigger_at: DateTime<Utc>,
    ) -> Result<Vec<ReminderMetadataItem>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare_cached(
            "SELECT id, recipient_key, campaign_id, trigger_at, step_offset, message,
                    remind_at, status, attachment_sent, error, claimed_at, updated_at
             FROM reminder_metadata
             WHERE recipient_key = ?1 AND campaign_id = ?2 AND trigger_at = ?3
             ORDER BY remind_at",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![recipient_key, campaign_id, trigger_at.to_rfc3339()],
            row_to_item,
        )?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Distinct (recipient, trigger instant) pairs for a campaign whose
    /// trigger is at or after `since`.
    ///
    /// The evaluator uses this to revisit recent trigger instances whose
    /// later flow steps may have matured on this tick.
    #[instrument(skip(self), fields(campaign_id, since = %since))]
    pub fn instances_since(
        &self,
        campaign_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<OpenInstance>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare_cached(
            "SELECT DISTINCT recipient_key, trigger_at
             FROM reminder_metadata
             WHERE campaign_id = ?1 AND trigger_at >= ?2
             ORDER BY trigger_at, recipient_key",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![campaign_id, since.to_rfc3339()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?, // recipient_key
                    row.get::<_, String>(1)?, // trigger_at
                ))
            },
        )?;
        Ok(rows
            .filter_map(|r| r.ok())
            .filter_map(|(recipient_key, trigger_str)| {
                // A malformed trigger string cannot be revisited; skip it.
                let trigger_at = DateTime::parse_from_rfc3339(&trigger_str).ok()?;
                Some(OpenInstance {
                    recipient_key,
                    trigger_at: trigger_at.with_timezone(&Utc),
                })
            })
            .collect())
    }

    /// Pending entries claimed more than `grace` before `now`.
    ///
    /// These are claims whose holder died mid-delivery. They are surfaced
    /// for operators and counted in the tick summary; resolving them is a
    /// human decision because a silent retry could double-send.
    #[instrument(skip(self))]
    pub fn stuck_claims(&self, now: DateTime<Utc>, grace: Duration) -> Result<Vec<StuckClaim>> {
        let cutoff = (now - grace).to_rfc3339();
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare_cached(
            "SELECT recipient_key, campaign_id, trigger_at, step_offset, claimed_at
             FROM reminder_metadata
             WHERE status = 'pending' AND claimed_at < ?1
             ORDER BY claimed_at",
        )?;
        let rows = stmt.query_map([cutoff], |row| {
            Ok(StuckClaim {
                recipient_key: row.get(0)?,
                campaign_id: row.get(1)?,
                trigger_at: row.get(2)?,
                step_offset: row.get::<_, i64>(3)? as u32,
                claimed_at: row.get(4)?,
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

/// Map a SQLite row to a `ReminderMetadataItem`.
fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReminderMetadataItem> {
    let status_str: String = row.get(7)?;
    // An unknown status string means a newer schema wrote the row; treat it
    // as pending rather than dropping the entry.
    let status: StepStatus = status_str.parse().unwrap_or(StepStatus::Pending);

    let attachment_json: Option<String> = row.get(8)?;
    let attachment_sent = attachment_json.and_then(|json| serde_json::from_str(&json).ok());

    Ok(ReminderMetadataItem {
        id: row.get(0)?,
        recipient_key: row.get(1)?,
        campaign_id: row.get(2)?,
        trigger_at: row.get(3)?,
        step_offset: row.get::<_, i64>(4)? as u32,
        message: row.get(5)?,
        remind_at: row.get(6)?,
        status,
        attachment_sent,
        error: row.get(9)?,
        claimed_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use herald_core::delivery::{DeliveryPayload, PayloadItem, PayloadKind};

    use super::*;

    fn store() -> MetadataStore {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        MetadataStore::new(conn).expect("init store")
    }

    fn trigger() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap()
    }

    #[test]
    fn first_claim_wins_second_loses() {
        let store = store();
        let won = store
            .try_claim("cust-1", "camp", trigger(), 0, "hello", trigger())
            .expect("claim failed");
        assert!(won, "first claim must win");

        let again = store
            .try_claim("cust-1", "camp", trigger(), 0, "hello", trigger())
            .expect("claim failed");
        assert!(!again, "second claim for the same tuple must lose");
    }

    #[test]
    fn claims_for_distinct_steps_and_instances_all_win() {
        let store = store();
        let t = trigger();
        assert!(store.try_claim("cust-1", "camp", t, 0, "a", t).unwrap());
        // Different step offset.
        assert!(store
            .try_claim("cust-1", "camp", t, 30, "b", t + Duration::minutes(30))
            .unwrap());
        // Different recipient.
        assert!(store.try_claim("cust-2", "camp", t, 0, "a", t).unwrap());
        // Different campaign.
        assert!(store.try_claim("cust-1", "other", t, 0, "a", t).unwrap());
        // Different trigger instance, same step.
        let next_week = t + Duration::days(7);
        assert!(store
            .try_claim("cust-1", "camp", next_week, 0, "a", next_week)
            .unwrap());
    }

    #[test]
    fn concurrent_claims_yield_exactly_one_winner() {
        let store = Arc::new(store());
        let t = trigger();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .try_claim("cust-1", "camp", t, 0, "hello", t)
                        .expect("claim failed")
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().expect("claimer thread panicked"))
            .filter(|&won| won)
            .count();
        assert_eq!(wins, 1, "exactly one concurrent claimer may win");
    }

    #[test]
    fn sent_outcome_overwrites_the_pending_entry() {
        let store = store();
        let t = trigger();
        store.try_claim("cust-1", "camp", t, 0, "hello", t).unwrap();

        let payload = DeliveryPayload {
            primary: PayloadItem {
                kind: PayloadKind::Link,
                data: "https://example.com/sale".to_string(),
                label: None,
                size: None,
            },
            extra: Vec::new(),
        };
        store
            .record_outcome(
                "cust-1",
                "camp",
                t,
                0,
                StepOutcome::Sent {
                    attachment_sent: Some(payload.clone()),
                },
            )
            .expect("record failed");

        let items = store.list_for_instance("cust-1", "camp", t).expect("list failed");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].status, StepStatus::Sent);
        assert_eq!(items[0].attachment_sent.as_ref(), Some(&payload));
        assert!(items[0].error.is_none());
    }

    #[test]
    fn failed_outcome_records_the_error() {
        let store = store();
        let t = trigger();
        store.try_claim("cust-1", "camp", t, 30, "reminder", t).unwrap();
        store
            .record_outcome(
                "cust-1",
                "camp",
                t,
                30,
                StepOutcome::Failed {
                    error: "transport unreachable".to_string(),
                },
            )
            .expect("record failed");

        let items = store.list_for_instance("cust-1", "camp", t).expect("list failed");
        assert_eq!(items[0].status, StepStatus::Failed);
        assert_eq!(items[0].error.as_deref(), Some("transport unreachable"));
        assert!(items[0].attachment_sent.is_none());
    }

    #[test]
    fn outcome_without_claim_is_claim_not_found() {
        let store = store();
        let result = store.record_outcome(
            "cust-1",
            "camp",
            trigger(),
            0,
            StepOutcome::Failed {
                error: "boom".to_string(),
            },
        );
        assert!(matches!(result, Err(StoreError::ClaimNotFound { .. })));
    }

    #[test]
    fn list_orders_entries_by_remind_at() {
        let store = store();
        let t = trigger();
        // Claim out of order; listing must come back sorted by remind_at.
        store
            .try_claim("cust-1", "camp", t, 90, "late", t + Duration::minutes(90))
            .unwrap();
        store.try_claim("cust-1", "camp", t, 0, "first", t).unwrap();
        store
            .try_claim("cust-1", "camp", t, 30, "middle", t + Duration::minutes(30))
            .unwrap();

        let items = store.list_for_instance("cust-1", "camp", t).expect("list failed");
        let offsets: Vec<u32> = items.iter().map(|i| i.step_offset).collect();
        assert_eq!(offsets, vec![0, 30, 90]);
    }

    #[test]
    fn instances_since_returns_distinct_recent_instances() {
        let store = store();
        let old = trigger() - Duration::days(7);
        let recent = trigger();
        store.try_claim("cust-1", "camp", old, 0, "old", old).unwrap();
        store.try_claim("cust-1", "camp", recent, 0, "new", recent).unwrap();
        store
            .try_claim("cust-1", "camp", recent, 30, "new", recent + Duration::minutes(30))
            .unwrap();
        store.try_claim("cust-2", "camp", recent, 0, "new", recent).unwrap();
        store.try_claim("cust-9", "other", recent, 0, "x", recent).unwrap();

        let instances = store
            .instances_since("camp", recent - Duration::hours(1))
            .expect("query failed");
        // Two steps for cust-1 collapse into one instance; the old trigger
        // and the other campaign are excluded.
        assert_eq!(
            instances,
            vec![
                OpenInstance {
                    recipient_key: "cust-1".to_string(),
                    trigger_at: recent,
                },
                OpenInstance {
                    recipient_key: "cust-2".to_string(),
                    trigger_at: recent,
                },
            ]
        );
    }

    #[test]
    fn instances_since_is_inclusive_at_the_boundary() {
        let store = store();
        let t = trigger();
        store.try_claim("cust-1", "camp", t, 0, "hello", t).unwrap();
        let instances = store.instances_since("camp", t).expect("query failed");
        assert_eq!(instances.len(), 1);
    }

    #[test]
    fn pending_claim_past_grace_is_stuck() {
        let store = store();
        let t = trigger();
        store.try_claim("cust-1", "camp", t, 0, "hello", t).unwrap();

        // Nothing is stuck right after claiming.
        let fresh = store
            .stuck_claims(Utc::now(), Duration::minutes(30))
            .expect("scan failed");
        assert!(fresh.is_empty());

        // Viewed from two hours in the future the claim is long past grace.
        let later = Utc::now() + Duration::hours(2);
        let stuck = store
            .stuck_claims(later, Duration::minutes(30))
            .expect("scan failed");
        assert_eq!(stuck.len(), 1);
        assert_eq!(stuck[0].recipient_key, "cust-1");
        assert_eq!(stuck[0].step_offset, 0);
    }

    #[test]
    fn resolved_claims_are_never_stuck() {
        let store = store();
        let t = trigger();
        store.try_claim("cust-1", "camp", t, 0, "hello", t).unwrap();
        store
            .record_outcome(
                "cust-1",
                "camp",
                t,
                0,
                StepOutcome::Sent {
                    attachment_sent: None,
                },
            )
            .unwrap();

        let later = Utc::now() + Duration::hours(2);
        let stuck = store
            .stuck_claims(later, Duration::minutes(30))
            .expect("scan failed");
        assert!(stuck.is_empty());
    }
}
