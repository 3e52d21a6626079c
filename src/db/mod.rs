use chrono::{NaiveDate, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::debug;

pub mod models;
use models::*;

use crate::staking::risk::RiskProfile;
use crate::staking::{BankrollStore, BetSource};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database connection mutex poisoned")]
    Poisoned,
}

/// Thread-safe SQLite connection pool (single connection with mutex)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the SQLite database at the given path.
    /// `":memory:"` gives a private in-memory database.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run schema migrations (idempotent)
    fn run_migrations(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // ── Bet candidates ───────────────────────────────────────────────────────

    /// Register a pending bet candidate and return it with its new id.
    pub fn add_candidate(&self, candidate: &NewCandidate) -> Result<BetCandidate, StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO bet_candidates (user_id, decimal_odds, win_probability, selection, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                candidate.user_id,
                candidate.decimal_odds,
                candidate.win_probability,
                candidate.selection,
                CANDIDATE_PENDING,
                Utc::now(),
            ],
        )?;
        Ok(BetCandidate {
            id: conn.last_insert_rowid(),
            decimal_odds: candidate.decimal_odds,
            win_probability: candidate.win_probability,
            selection: candidate.selection.clone(),
        })
    }

    /// Mark a candidate settled ("won" / "lost") so it leaves the feed.
    pub fn settle_candidate(&self, id: i64, status: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE bet_candidates SET status=?1 WHERE id=?2",
            params![status, id],
        )?;
        Ok(changed > 0)
    }
}

// ── Staking collaborators ─────────────────────────────────────────────────────

impl BankrollStore for Database {
    fn get_bankroll(&self, user_id: i64) -> Result<Option<Bankroll>, StoreError> {
        let conn = self.conn()?;
        select_bankroll(&conn, user_id)
    }

    fn create_or_update_bankroll(
        &self,
        user_id: i64,
        amount: f64,
        target: f64,
        risk: RiskProfile,
    ) -> Result<Bankroll, StoreError> {
        let conn = self.conn()?;
        upsert_bankroll(&conn, user_id, amount, target, risk)
    }

    fn append_history_snapshot(
        &self,
        bankroll_id: i64,
        amount: f64,
        date: NaiveDate,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        insert_snapshot(&conn, bankroll_id, amount, date)
    }

    fn snapshot_and_update_bankroll(
        &self,
        user_id: i64,
        amount: f64,
        target: f64,
        risk: RiskProfile,
        date: NaiveDate,
    ) -> Result<Bankroll, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if let Some(existing) = select_bankroll(&tx, user_id)? {
            insert_snapshot(&tx, existing.id, existing.current_amount, date)?;
            debug!(
                user_id,
                bankroll_id = existing.id,
                prior_amount = existing.current_amount,
                "Snapshotted bankroll before update"
            );
        }
        let bankroll = upsert_bankroll(&tx, user_id, amount, target, risk)?;
        tx.commit()?;
        Ok(bankroll)
    }

    fn replace_future_recommendations(
        &self,
        bankroll_id: i64,
        from: NaiveDate,
        rows: &[NewRecommendation],
    ) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        // Dropping `tx` on any early return rolls back both statements.
        let tx = conn.transaction()?;
        let deleted = delete_recommendations(&tx, bankroll_id, from)?;
        insert_recommendations(&tx, bankroll_id, rows)?;
        tx.commit()?;
        debug!(
            bankroll_id,
            %from,
            deleted,
            inserted = rows.len(),
            "Replaced future wager recommendations"
        );
        Ok(())
    }

    fn list_history(&self, bankroll_id: i64) -> Result<Vec<BankrollHistorySnapshot>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, bankroll_id, amount, date
             FROM bankroll_history WHERE bankroll_id=?1 ORDER BY date ASC, id ASC",
        )?;
        let rows = stmt
            .query_map(params![bankroll_id], |row| {
                Ok(BankrollHistorySnapshot {
                    id: row.get(0)?,
                    bankroll_id: row.get(1)?,
                    amount: row.get(2)?,
                    date: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn list_recommendations(
        &self,
        bankroll_id: i64,
        from: NaiveDate,
    ) -> Result<Vec<WagerRecommendation>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, bankroll_id, date, recommended_wager, expected_profit, bet_id, created_at
             FROM wager_recommendations
             WHERE bankroll_id=?1 AND date >= ?2 ORDER BY date ASC",
        )?;
        let rows = stmt
            .query_map(params![bankroll_id, from], map_recommendation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl BetSource for Database {
    fn candidates(&self, user_id: i64) -> Result<Vec<BetCandidate>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, decimal_odds, win_probability, selection
             FROM bet_candidates WHERE user_id=?1 AND status=?2
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt
            .query_map(params![user_id, CANDIDATE_PENDING], map_candidate)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn pending_candidates(&self) -> Result<Vec<BetCandidate>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, decimal_odds, win_probability, selection
             FROM bet_candidates WHERE status=?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt
            .query_map(params![CANDIDATE_PENDING], map_candidate)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn select_bankroll(conn: &Connection, user_id: i64) -> Result<Option<Bankroll>, StoreError> {
    let bankroll = conn
        .query_row(
            "SELECT id, user_id, current_amount, target_profit, risk_profile,
                    created_at, updated_at
             FROM bankrolls WHERE user_id=?1",
            params![user_id],
            map_bankroll,
        )
        .optional()?;
    Ok(bankroll)
}

fn upsert_bankroll(
    conn: &Connection,
    user_id: i64,
    amount: f64,
    target: f64,
    risk: RiskProfile,
) -> Result<Bankroll, StoreError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO bankrolls (user_id, current_amount, target_profit, risk_profile,
                                created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(user_id) DO UPDATE SET
            current_amount=excluded.current_amount,
            target_profit=excluded.target_profit,
            risk_profile=excluded.risk_profile,
            updated_at=excluded.updated_at",
        params![user_id, amount, target, risk, now],
    )?;
    let bankroll = conn.query_row(
        "SELECT id, user_id, current_amount, target_profit, risk_profile,
                created_at, updated_at
         FROM bankrolls WHERE user_id=?1",
        params![user_id],
        map_bankroll,
    )?;
    Ok(bankroll)
}

fn insert_snapshot(
    conn: &Connection,
    bankroll_id: i64,
    amount: f64,
    date: NaiveDate,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO bankroll_history (bankroll_id, amount, date) VALUES (?1, ?2, ?3)",
        params![bankroll_id, amount, date],
    )?;
    Ok(())
}

fn delete_recommendations(
    tx: &Transaction<'_>,
    bankroll_id: i64,
    from: NaiveDate,
) -> Result<usize, StoreError> {
    let deleted = tx.execute(
        "DELETE FROM wager_recommendations WHERE bankroll_id=?1 AND date >= ?2",
        params![bankroll_id, from],
    )?;
    Ok(deleted)
}

fn insert_recommendations(
    tx: &Transaction<'_>,
    bankroll_id: i64,
    rows: &[NewRecommendation],
) -> Result<(), StoreError> {
    let now = Utc::now();
    let mut stmt = tx.prepare(
        "INSERT INTO wager_recommendations
            (bankroll_id, date, recommended_wager, expected_profit, bet_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for row in rows {
        stmt.execute(params![
            bankroll_id,
            row.date,
            row.recommended_wager,
            row.expected_profit,
            row.bet_id,
            now,
        ])?;
    }
    Ok(())
}

// ── Row mappers ──────────────────────────────────────────────────────────────

fn map_bankroll(row: &rusqlite::Row) -> rusqlite::Result<Bankroll> {
    Ok(Bankroll {
        id: row.get(0)?,
        user_id: row.get(1)?,
        current_amount: row.get(2)?,
        target_profit: row.get(3)?,
        risk_profile: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn map_recommendation(row: &rusqlite::Row) -> rusqlite::Result<WagerRecommendation> {
    Ok(WagerRecommendation {
        id: row.get(0)?,
        bankroll_id: row.get(1)?,
        date: row.get(2)?,
        recommended_wager: row.get(3)?,
        expected_profit: row.get(4)?,
        bet_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_candidate(row: &rusqlite::Row) -> rusqlite::Result<BetCandidate> {
    Ok(BetCandidate {
        id: row.get(0)?,
        decimal_odds: row.get(1)?,
        win_probability: row.get(2)?,
        selection: row.get(3)?,
    })
}

impl ToSql for RiskProfile {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RiskProfile {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let label = value.as_str()?;
        label
            .parse()
            .map_err(|_| FromSqlError::Other(format!("unknown risk profile '{label}'").into()))
    }
}

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS bankrolls (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id        INTEGER NOT NULL UNIQUE,
    current_amount REAL    NOT NULL CHECK (current_amount > 0),
    target_profit  REAL    NOT NULL CHECK (target_profit > 0),
    risk_profile   TEXT    NOT NULL CHECK (risk_profile IN ('low', 'medium', 'high')),
    created_at     TEXT    NOT NULL,
    updated_at     TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS bankroll_history (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    bankroll_id INTEGER NOT NULL,
    amount      REAL    NOT NULL,
    date        TEXT    NOT NULL,
    FOREIGN KEY (bankroll_id) REFERENCES bankrolls(id)
);

CREATE TABLE IF NOT EXISTS bet_candidates (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id         INTEGER NOT NULL,
    decimal_odds    REAL    NOT NULL,
    win_probability REAL    NOT NULL,
    selection       TEXT,
    status          TEXT    NOT NULL DEFAULT 'pending',
    created_at      TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS wager_recommendations (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    bankroll_id       INTEGER NOT NULL,
    date              TEXT    NOT NULL,
    recommended_wager REAL    NOT NULL CHECK (recommended_wager >= 0),
    expected_profit   REAL    NOT NULL,
    bet_id            INTEGER,
    created_at        TEXT    NOT NULL,
    UNIQUE (bankroll_id, date),
    FOREIGN KEY (bankroll_id) REFERENCES bankrolls(id),
    FOREIGN KEY (bet_id) REFERENCES bet_candidates(id)
);

CREATE INDEX IF NOT EXISTS idx_history_bankroll ON bankroll_history(bankroll_id);
CREATE INDEX IF NOT EXISTS idx_candidates_user_status ON bet_candidates(user_id, status);
"#;
