use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use recall_core::{
    Card, CardRow, CardState, PoolSources, Rating, Timestamp, apply_review,
    create_initial_card_state, serialize_embedding,
};

use crate::error::{Result, StoreError};
use crate::schema;

/// Input for creating a card.
#[derive(Debug, Clone, Default)]
pub struct NewCard {
    pub question: String,
    pub answer: String,
    pub category: Option<String>,
    pub difficulty: Option<u8>,
    pub embedding: Option<Vec<f64>>,
}

/// Columns selected by every card+state query, in `row_from_sql` order.
const ROW_COLUMNS: &str = "c.id, c.question, c.answer, c.category, c.difficulty, c.embedding, c.created_at,
     s.ease, s.interval_days, s.rep_count, s.next_review_at, s.last_reviewed_at, s.stage";

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- Cards ---

    /// Insert a card and its initial state in one transaction.
    pub fn add_card(&self, new: &NewCard, now: Timestamp) -> Result<Card> {
        if let Some(d) = new.difficulty
            && !(1..=5).contains(&d)
        {
            return Err(StoreError::InvalidData(format!(
                "difficulty must be between 1 and 5, got {d}"
            )));
        }
        if new.question.trim().is_empty() || new.answer.trim().is_empty() {
            return Err(StoreError::InvalidData(
                "question and answer must not be empty".to_string(),
            ));
        }

        let card = Card {
            id: Uuid::new_v4().to_string(),
            question: new.question.clone(),
            answer: new.answer.clone(),
            category: new.category.clone(),
            difficulty: new.difficulty,
            embedding: new.embedding.as_deref().map(serialize_embedding),
            created_at: now,
        };
        let state = create_initial_card_state(now);

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO cards (id, question, answer, category, difficulty, embedding, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                card.id,
                card.question,
                card.answer,
                card.category,
                card.difficulty,
                card.embedding,
                card.created_at,
            ],
        )?;
        Self::save_state_on(&tx, &card.id, &state)?;
        tx.commit()?;

        tracing::info!("added card {}", card.id);
        Ok(card)
    }

    pub fn get_row(&self, id: &str) -> Result<Option<CardRow>> {
        let sql = format!(
            "SELECT {ROW_COLUMNS} FROM cards c LEFT JOIN card_states s ON s.card_id = c.id
             WHERE c.id = ?1"
        );
        let row = self.conn.query_row(&sql, [id], row_from_sql).optional()?;
        Ok(row)
    }

    pub fn get_card(&self, id: &str) -> Result<Option<Card>> {
        Ok(self.get_row(id)?.map(|r| r.card))
    }

    /// Every card with its state, oldest first.
    pub fn list_rows(&self) -> Result<Vec<CardRow>> {
        let sql = format!(
            "SELECT {ROW_COLUMNS} FROM cards c LEFT JOIN card_states s ON s.card_id = c.id
             ORDER BY c.created_at, c.id"
        );
        self.query_rows(&sql, [])
    }

    /// Reviewed cards due on or before `end_of_today`, most overdue first.
    ///
    /// Unseen cards are left to [`Store::new_card_rows`] so the daily cap
    /// applies to them.
    pub fn review_due_rows(&self, end_of_today: Timestamp) -> Result<Vec<CardRow>> {
        let sql = format!(
            "SELECT {ROW_COLUMNS} FROM cards c JOIN card_states s ON s.card_id = c.id
             WHERE s.next_review_at <= ?1 AND s.last_reviewed_at IS NOT NULL
             ORDER BY s.next_review_at, c.id"
        );
        self.query_rows(&sql, [end_of_today])
    }

    /// Unseen cards (no state or stage 0), oldest first, at most `limit`.
    pub fn new_card_rows(&self, limit: usize) -> Result<Vec<CardRow>> {
        let sql = format!(
            "SELECT {ROW_COLUMNS} FROM cards c LEFT JOIN card_states s ON s.card_id = c.id
             WHERE s.card_id IS NULL OR s.stage = 0
             ORDER BY c.created_at, c.id
             LIMIT ?1"
        );
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_rows(&sql, [limit])
    }

    /// Both pool sources for today, in deterministic order.
    pub fn session_sources(&self, end_of_today: Timestamp, max_new: usize) -> Result<PoolSources> {
        Ok(PoolSources {
            review_due: self.review_due_rows(end_of_today)?,
            new_cards: self.new_card_rows(max_new)?,
        })
    }

    pub fn cards_missing_embedding(&self) -> Result<Vec<Card>> {
        let sql = format!(
            "SELECT {ROW_COLUMNS} FROM cards c LEFT JOIN card_states s ON s.card_id = c.id
             WHERE c.embedding IS NULL
             ORDER BY c.created_at, c.id"
        );
        Ok(self
            .query_rows(&sql, [])?
            .into_iter()
            .map(|r| r.card)
            .collect())
    }

    /// Store or clear a card's embedding. Returns false for an unknown id.
    pub fn set_embedding(&self, id: &str, embedding: Option<&[f64]>) -> Result<bool> {
        let encoded = embedding.map(serialize_embedding);
        let changed = self.conn.execute(
            "UPDATE cards SET embedding = ?1 WHERE id = ?2",
            params![encoded, id],
        )?;
        Ok(changed > 0)
    }

    /// Delete a card, its state and its review log.
    pub fn delete_card(&self, id: &str) -> Result<bool> {
        let changed = self.conn.execute("DELETE FROM cards WHERE id = ?1", [id])?;
        if changed > 0 {
            tracing::info!("deleted card {id}");
        }
        Ok(changed > 0)
    }

    // --- Reviews ---

    /// Apply a rating with both schedulers and persist the result.
    ///
    /// Concurrent reviews of the same card are last-write-wins.
    pub fn record_review(&self, id: &str, rating: Rating, now: Timestamp) -> Result<CardState> {
        let row = self
            .get_row(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let before = row.effective_state(now);
        let after = apply_review(&before, rating, now);

        let tx = self.conn.unchecked_transaction()?;
        Self::save_state_on(&tx, id, &after)?;
        tx.execute(
            "INSERT INTO reviews (card_id, rating, reviewed_at, stage_before, stage_after)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, rating.as_str(), now, before.stage, after.stage],
        )?;
        tx.commit()?;

        tracing::info!(
            "reviewed {id} as {rating}: stage {} -> {}, next at {}",
            before.stage,
            after.stage,
            after.next_review_at
        );
        Ok(after)
    }

    fn save_state_on(conn: &Connection, id: &str, state: &CardState) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO card_states
             (card_id, ease, interval_days, rep_count, next_review_at, last_reviewed_at, stage)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                state.ease,
                state.interval_days,
                state.rep_count,
                state.next_review_at,
                state.last_reviewed_at,
                state.stage,
            ],
        )?;
        Ok(())
    }

    /// Number of reviews recorded at or after `since`.
    pub fn review_count_since(&self, since: Timestamp) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM reviews WHERE reviewed_at >= ?1",
            [since],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn query_rows<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<CardRow>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, row_from_sql)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn row_from_sql(row: &Row<'_>) -> rusqlite::Result<CardRow> {
    let card = Card {
        id: row.get(0)?,
        question: row.get(1)?,
        answer: row.get(2)?,
        category: row.get(3)?,
        difficulty: row.get(4)?,
        embedding: row.get(5)?,
        created_at: row.get(6)?,
    };

    // LEFT JOIN: all state columns are NULL when the card has no state row
    let state = match row.get::<_, Option<f64>>(7)? {
        Some(ease) => Some(CardState {
            ease,
            interval_days: row.get(8)?,
            rep_count: row.get(9)?,
            next_review_at: row.get(10)?,
            last_reviewed_at: row.get(11)?,
            stage: row.get(12)?,
        }),
        None => None,
    };

    Ok(CardRow { card, state })
}
