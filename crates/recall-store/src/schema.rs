use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS cards (
            id          TEXT PRIMARY KEY,
            question    TEXT NOT NULL,
            answer      TEXT NOT NULL,
            category    TEXT,
            difficulty  INTEGER CHECK (difficulty BETWEEN 1 AND 5),
            embedding   TEXT,
            created_at  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS card_states (
            card_id          TEXT PRIMARY KEY REFERENCES cards(id) ON DELETE CASCADE,
            ease             REAL NOT NULL,
            interval_days    INTEGER NOT NULL DEFAULT 0,
            rep_count        INTEGER NOT NULL DEFAULT 0,
            next_review_at   INTEGER NOT NULL,
            last_reviewed_at INTEGER,
            stage            INTEGER NOT NULL DEFAULT 0 CHECK (stage BETWEEN 0 AND 5)
        );

        CREATE TABLE IF NOT EXISTS reviews (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            card_id      TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
            rating       TEXT NOT NULL CHECK (rating IN ('again', 'hard', 'good')),
            reviewed_at  INTEGER NOT NULL,
            stage_before INTEGER NOT NULL,
            stage_after  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_state_next_review ON card_states(next_review_at);
        CREATE INDEX IF NOT EXISTS idx_state_stage ON card_states(stage);
        CREATE INDEX IF NOT EXISTS idx_reviews_at ON reviews(reviewed_at);
        CREATE INDEX IF NOT EXISTS idx_reviews_card ON reviews(card_id);
        ",
    )?;

    let previous = get_schema_version(conn)?;
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;
    if previous.is_none() {
        tracing::info!("initialized schema v{SCHEMA_VERSION}");
    }

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}
