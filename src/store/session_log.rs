use anyhow::Context;
use sqlx::SqlitePool;

/// One finished game, as recorded when detailed logging is enabled.
#[derive(Debug, Clone)]
pub struct SessionRow {
    pub username: String,
    pub start_unix_ms: i64,
    pub end_unix_ms: i64,
    pub score: i64,
    pub outcome: String,
    pub mode: String,
    pub difficulty: String,
}

#[derive(Debug, Clone)]
pub struct SessionLogStore {
    pool: SqlitePool,
}

impl SessionLogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, row: &SessionRow) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO game_sessions \
                 (username, start_time, end_time, score, winner, mode, difficulty) \
             VALUES (?, datetime(? / 1000, 'unixepoch'), datetime(? / 1000, 'unixepoch'), ?, ?, ?, ?)",
        )
        .bind(&row.username)
        .bind(row.start_unix_ms)
        .bind(row.end_unix_ms)
        .bind(row.score)
        .bind(&row.outcome)
        .bind(&row.mode)
        .bind(&row.difficulty)
        .execute(&self.pool)
        .await
        .context("session log insert failed")?;
        Ok(())
    }
}
