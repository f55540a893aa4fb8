use rusqlite::Connection;

use crate::error::Result;

/// Initialise the send history schema in `conn`. Safe to call on every
/// startup (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS send_history (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            content       TEXT NOT NULL,
            sent_at       TEXT NOT NULL,      -- RFC3339 instant the send happened
            sent_from     TEXT NOT NULL,      -- sender identity (person or system)
            sent_to       TEXT NOT NULL,      -- transport-level destination
            recipient_key TEXT,               -- normalised recipient identifier, when known
            user_id       TEXT,               -- originating operator, for manual sends
            send_function TEXT NOT NULL,      -- e.g. 'auto_greeting', 'scheduled'
            notes         TEXT,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_send_history_created
            ON send_history (created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_send_history_recipient
            ON send_history (recipient_key, created_at DESC);
        ",
    )?;
    Ok(())
}
