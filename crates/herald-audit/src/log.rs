use std::sync::Mutex;

use chrono::Utc;
use rusqlite::Connection;
use tracing::instrument;

use crate::db::init_db;
use crate::error::{AuditError, Result};
use crate::types::{SendHistory, SendHistoryFilter, SendHistoryPage, SendRecord};

const DEFAULT_PAGE_SIZE: u32 = 20;

/// Append-only log of delivery attempts backed by SQLite.
pub struct AuditLog {
    db: Mutex<Connection>,
}

impl AuditLog {
    /// Wrap a connection, initialising the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Append one record and return its assigned id.
    #[instrument(skip(self, record), fields(send_function = %record.send_function))]
    pub fn append(&self, record: &SendRecord) -> Result<i64> {
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO send_history
             (content, sent_at, sent_from, sent_to, recipient_key, user_id,
              send_function, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            rusqlite::params![
                record.content,
                record.sent_at.to_rfc3339(),
                record.sent_from,
                record.sent_to,
                record.recipient_key,
                record.user_id,
                record.send_function,
                record.notes,
                now
            ],
        )?;
        Ok(db.last_insert_rowid())
    }

    /// Query the log with optional filters, newest first.
    ///
    /// `page` is 1-indexed and defaults to 1; `page_size` defaults to 20.
    /// The time range bounds `sent_at` and is inclusive at both ends; the
    /// notes filter is a substring match.
    pub fn query(&self, filter: &SendHistoryFilter) -> Result<SendHistoryPage> {
        let page = filter.page.unwrap_or(1).max(1);
        let page_size = filter.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let offset = (page as i64 - 1) * page_size as i64;
        let from = filter.from.map(|t| t.to_rfc3339());
        let to = filter.to.map(|t| t.to_rfc3339());

        let db = self.db.lock().unwrap();
        let total: i64 = db
            .prepare_cached(
                "SELECT COUNT(*) FROM send_history
                 WHERE (?1 IS NULL OR recipient_key = ?1)
                   AND (?2 IS NULL OR user_id = ?2)
                   AND (?3 IS NULL OR send_function = ?3)
                   AND (?4 IS NULL OR sent_at >= ?4)
                   AND (?5 IS NULL OR sent_at <= ?5)
                   AND (?6 IS NULL OR notes LIKE '%' || ?6 || '%')",
            )?
            .query_row(
                rusqlite::params![
                    filter.recipient_key,
                    filter.user_id,
                    filter.send_function,
                    from,
                    to,
                    filter.notes
                ],
                |row| row.get(0),
            )?;

        let mut stmt = db.prepare_cached(
            "SELECT id, content, sent_at, sent_from, sent_to, recipient_key,
                    user_id, send_function, notes, created_at, updated_at
             FROM send_history
             WHERE (?1 IS NULL OR recipient_key = ?1)
               AND (?2 IS NULL OR user_id = ?2)
               AND (?3 IS NULL OR send_function = ?3)
               AND (?4 IS NULL OR sent_at >= ?4)
               AND (?5 IS NULL OR sent_at <= ?5)
               AND (?6 IS NULL OR notes LIKE '%' || ?6 || '%')
             ORDER BY created_at DESC, id DESC
             LIMIT ?7 OFFSET ?8",
        )?;
        let rows = stmt.query_map(
            rusqlite::params![
                filter.recipient_key,
                filter.user_id,
                filter.send_function,
                from,
                to,
                filter.notes,
                page_size as i64,
                offset
            ],
            row_to_history,
        )?;

        Ok(SendHistoryPage {
            data: rows.filter_map(|r| r.ok()).collect(),
            total: total as u64,
            page,
            page_size,
        })
    }

    /// Administrative edit of a record's notes. The only mutation the log
    /// permits after creation.
    #[instrument(skip(self, notes))]
    pub fn update_notes(&self, id: i64, notes: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let rows_changed = db.execute(
            "UPDATE send_history SET notes = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![notes, now, id],
        )?;
        if rows_changed == 0 {
            return Err(AuditError::RecordNotFound { id });
        }
        Ok(())
    }
}

/// Map a SQLite row to a `SendHistory`.
fn row_to_history(row: &rusqlite::Row<'_>) -> rusqlite::Result<SendHistory> {
    Ok(SendHistory {
        id: row.get(0)?,
        content: row.get(1)?,
        sent_at: row.get(2)?,
        sent_from: row.get(3)?,
        sent_to: row.get(4)?,
        recipient_key: row.get(5)?,
        user_id: row.get(6)?,
        send_function: row.get(7)?,
        notes: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;

    fn log() -> AuditLog {
        let conn = Connection::open_in_memory().expect("open in-memory db");
        AuditLog::new(conn).expect("init log")
    }

    fn record(recipient: &str, function: &str, sent_at: DateTime<Utc>) -> SendRecord {
        SendRecord {
            content: format!("promo for {recipient}"),
            sent_at,
            sent_from: "herald".to_string(),
            sent_to: recipient.to_string(),
            recipient_key: Some(recipient.to_string()),
            user_id: None,
            send_function: function.to_string(),
            notes: None,
        }
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap()
    }

    #[test]
    fn append_assigns_increasing_ids() {
        let log = log();
        let first = log.append(&record("cust-1", "scheduled", noon())).unwrap();
        let second = log.append(&record("cust-2", "scheduled", noon())).unwrap();
        assert!(second > first);
    }

    #[test]
    fn unfiltered_query_uses_defaults_and_orders_newest_first() {
        let log = log();
        for i in 0..25 {
            let at = noon() + chrono::Duration::minutes(i);
            log.append(&record(&format!("cust-{i}"), "scheduled", at)).unwrap();
        }

        let page = log.query(&SendHistoryFilter::default()).expect("query failed");
        assert_eq!(page.total, 25);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 20);
        assert_eq!(page.data.len(), 20);
        // Newest row first.
        assert_eq!(page.data[0].recipient_key.as_deref(), Some("cust-24"));
    }

    #[test]
    fn second_page_holds_the_remainder() {
        let log = log();
        for i in 0..25 {
            log.append(&record(&format!("cust-{i}"), "scheduled", noon())).unwrap();
        }

        let filter = SendHistoryFilter {
            page: Some(2),
            ..Default::default()
        };
        let page = log.query(&filter).expect("query failed");
        assert_eq!(page.total, 25);
        assert_eq!(page.page, 2);
        assert_eq!(page.data.len(), 5);
    }

    #[test]
    fn filters_narrow_by_recipient_and_function() {
        let log = log();
        log.append(&record("cust-1", "scheduled", noon())).unwrap();
        log.append(&record("cust-1", "auto_greeting", noon())).unwrap();
        log.append(&record("cust-2", "scheduled", noon())).unwrap();

        let by_recipient = log
            .query(&SendHistoryFilter {
                recipient_key: Some("cust-1".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_recipient.total, 2);

        let by_function = log
            .query(&SendHistoryFilter {
                recipient_key: Some("cust-1".to_string()),
                send_function: Some("auto_greeting".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_function.total, 1);
    }

    #[test]
    fn time_range_is_inclusive_at_both_ends() {
        let log = log();
        let nine = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let ten = Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap();
        let eleven = Utc.with_ymd_and_hms(2026, 1, 5, 11, 0, 0).unwrap();
        log.append(&record("cust-1", "scheduled", nine)).unwrap();
        log.append(&record("cust-1", "scheduled", ten)).unwrap();
        log.append(&record("cust-1", "scheduled", eleven)).unwrap();

        let window = log
            .query(&SendHistoryFilter {
                from: Some(ten),
                to: Some(eleven),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(window.total, 2);

        let exact = log
            .query(&SendHistoryFilter {
                from: Some(ten),
                to: Some(ten),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(exact.total, 1);
    }

    #[test]
    fn notes_filter_matches_substrings() {
        let log = log();
        let mut with_notes = record("cust-1", "scheduled", noon());
        with_notes.notes = Some("resend after outage".to_string());
        log.append(&with_notes).unwrap();
        log.append(&record("cust-2", "scheduled", noon())).unwrap();

        let page = log
            .query(&SendHistoryFilter {
                notes: Some("outage".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].recipient_key.as_deref(), Some("cust-1"));
    }

    #[test]
    fn update_notes_edits_only_existing_records() {
        let log = log();
        let id = log.append(&record("cust-1", "scheduled", noon())).unwrap();
        log.update_notes(id, "verified manually").expect("update failed");

        let page = log.query(&SendHistoryFilter::default()).unwrap();
        assert_eq!(page.data[0].notes.as_deref(), Some("verified manually"));

        let missing = log.update_notes(id + 100, "nope");
        assert!(matches!(missing, Err(AuditError::RecordNotFound { .. })));
    }
}
