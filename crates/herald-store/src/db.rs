use rusqlite::Connection;

use crate::error::Result;

/// Initialise the reminder metadata schema in `conn`.
///
/// The UNIQUE constraint over (recipient_key, campaign_id, trigger_at,
/// step_offset) is what makes `try_claim` atomic: of two racing inserts for
/// the same tuple, exactly one changes a row. The index on (status,
/// claimed_at) keeps the stuck-claim scan cheap.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS reminder_metadata (
            id              TEXT    NOT NULL PRIMARY KEY,
            recipient_key   TEXT    NOT NULL,
            campaign_id     TEXT    NOT NULL,
            trigger_at      TEXT    NOT NULL,   -- RFC3339 canonical trigger instant
            step_offset     INTEGER NOT NULL,   -- minutes from the initial send; 0 = initial
            message         TEXT    NOT NULL,
            remind_at       TEXT    NOT NULL,   -- RFC3339 instant the step matured
            status          TEXT    NOT NULL DEFAULT 'pending',
            attachment_sent TEXT,               -- JSON DeliveryPayload or NULL
            error           TEXT,               -- terminal failure reason or NULL
            claimed_at      TEXT    NOT NULL,
            updated_at      TEXT    NOT NULL,
            UNIQUE (recipient_key, campaign_id, trigger_at, step_offset)
        ) STRICT;

        -- Stuck-claim scan: SELECT … WHERE status = 'pending' AND claimed_at < ?
        CREATE INDEX IF NOT EXISTS idx_reminder_metadata_pending
            ON reminder_metadata (status, claimed_at);
        ",
    )?;
    Ok(())
}
