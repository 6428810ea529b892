use anyhow::Context;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};

const TOP_ENTRIES: i64 = 10;
const MIN_GAMES_FOR_WIN_RATE: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: i64,
    pub difficulty: String,
    pub mode: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinRateEntry {
    pub name: String,
    pub total_games: i64,
    pub total_wins: i64,
    pub win_rate: f64,
}

#[derive(Debug, Clone)]
pub struct LeaderboardStore {
    pool: SqlitePool,
}

impl LeaderboardStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn add_entry(
        &self,
        name: &str,
        score: i64,
        difficulty: &str,
        mode: &str,
    ) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO leaderboard (name, score, difficulty, mode) VALUES (?, ?, ?, ?)")
            .bind(name)
            .bind(score)
            .bind(difficulty)
            .bind(mode)
            .execute(&self.pool)
            .await
            .context("leaderboard insert failed")?;
        Ok(())
    }

    pub async fn entries(&self) -> anyhow::Result<Vec<LeaderboardEntry>> {
        let rows = sqlx::query(
            "SELECT name, score, difficulty, mode FROM leaderboard \
             ORDER BY score DESC, date ASC LIMIT ?",
        )
        .bind(TOP_ENTRIES)
        .fetch_all(&self.pool)
        .await
        .context("leaderboard query failed")?;

        rows.iter()
            .map(|row| {
                Ok(LeaderboardEntry {
                    name: row.try_get("name")?,
                    score: row.try_get("score")?,
                    difficulty: row.try_get("difficulty")?,
                    mode: row.try_get("mode")?,
                })
            })
            .collect()
    }

    /// Win rates over the user table, skipping players with too few games
    /// for the ratio to mean anything.
    pub async fn win_rates(&self) -> anyhow::Result<Vec<WinRateEntry>> {
        let rows = sqlx::query(
            "SELECT username, total_games, total_wins FROM users \
             WHERE total_games >= ? \
             ORDER BY CAST(total_wins AS REAL) / total_games DESC, total_games DESC \
             LIMIT ?",
        )
        .bind(MIN_GAMES_FOR_WIN_RATE)
        .bind(TOP_ENTRIES)
        .fetch_all(&self.pool)
        .await
        .context("win rate query failed")?;

        rows.iter()
            .map(|row| {
                let total_games: i64 = row.try_get("total_games")?;
                let total_wins: i64 = row.try_get("total_wins")?;
                Ok(WinRateEntry {
                    name: row.try_get("username")?,
                    total_games,
                    total_wins,
                    win_rate: total_wins as f64 / total_games.max(1) as f64,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_pool;
    use crate::store::users::UserStore;

    #[tokio::test]
    async fn entries_come_back_highest_first() {
        let store = LeaderboardStore::new(test_pool().await);
        store.add_entry("low", 10, "mid", "battle").await.expect("insert");
        store.add_entry("high", 300, "mid", "battle").await.expect("insert");
        store.add_entry("mid", 120, "high", "battle").await.expect("insert");

        let entries = store.entries().await.expect("entries");
        let names: Vec<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, ["high", "mid", "low"]);
    }

    #[tokio::test]
    async fn win_rates_require_a_minimum_sample() {
        let pool = test_pool().await;
        let users = UserStore::new(pool.clone());
        let store = LeaderboardStore::new(pool);

        users.register("veteran", "secret").await.expect("register");
        users.register("rookie", "secret").await.expect("register");
        for won in [true, true, false] {
            users.update_stats("veteran", 50, won).await.expect("update");
        }
        users.update_stats("rookie", 10, true).await.expect("update");

        let rates = store.win_rates().await.expect("win rates");
        assert_eq!(rates.len(), 1, "rookie has too few games");
        assert_eq!(rates[0].name, "veteran");
        assert!((rates[0].win_rate - 2.0 / 3.0).abs() < 1e-9);
    }
}
