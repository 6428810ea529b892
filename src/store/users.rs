use crate::shared::names::{is_valid_username, sanitize_username};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

/// Public user record; the password hash never leaves this module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub username: String,
    pub best_score: i64,
    pub total_games: i64,
    pub total_wins: i64,
}

#[derive(Debug, Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn register(&self, username: &str, password: &str) -> anyhow::Result<()> {
        let username = sanitize_username(username);
        if !is_valid_username(&username) {
            bail!("username must be 2-20 letters, digits, '-' or '_'");
        }
        if password.len() < 4 {
            bail!("password must be at least 4 characters");
        }

        let existing = sqlx::query("SELECT username FROM users WHERE username = ?")
            .bind(&username)
            .fetch_optional(&self.pool)
            .await
            .context("user lookup failed")?;
        if existing.is_some() {
            bail!("username already taken");
        }

        sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
            .bind(&username)
            .bind(hash_password(&username, password))
            .execute(&self.pool)
            .await
            .context("user insert failed")?;
        tracing::info!(user = %username, "registered");
        Ok(())
    }

    pub async fn login(&self, username: &str, password: &str) -> anyhow::Result<User> {
        let username = sanitize_username(username);
        let row = sqlx::query(
            "SELECT username, password_hash, best_score, total_games, total_wins \
             FROM users WHERE username = ?",
        )
        .bind(&username)
        .fetch_optional(&self.pool)
        .await
        .context("user lookup failed")?;

        let Some(row) = row else {
            bail!("unknown username or wrong password");
        };
        let stored_hash: String = row.try_get("password_hash")?;
        if stored_hash != hash_password(&username, password) {
            bail!("unknown username or wrong password");
        }
        row_to_user(&row)
    }

    /// Applies one finished game: bumps totals, keeps the best score, and
    /// returns the refreshed record.
    pub async fn update_stats(&self, username: &str, score: i64, won: bool) -> anyhow::Result<User> {
        sqlx::query(
            "UPDATE users SET \
                 best_score = MAX(best_score, ?), \
                 total_games = total_games + 1, \
                 total_wins = total_wins + ? \
             WHERE username = ?",
        )
        .bind(score.max(0))
        .bind(if won { 1 } else { 0 })
        .bind(username)
        .execute(&self.pool)
        .await
        .context("stats update failed")?;

        self.get(username)
            .await?
            .with_context(|| format!("user {username} vanished during stats update"))
    }

    pub async fn get(&self, username: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(
            "SELECT username, best_score, total_games, total_wins FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .context("user lookup failed")?;
        row.map(|row| row_to_user(&row)).transpose()
    }
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<User> {
    Ok(User {
        username: row.try_get("username")?,
        best_score: row.try_get("best_score")?,
        total_games: row.try_get("total_games")?,
        total_wins: row.try_get("total_wins")?,
    })
}

fn hash_password(username: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_pool;

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let store = UserStore::new(test_pool().await);
        store.register("bee", "secret").await.expect("register");
        let user = store.login("bee", "secret").await.expect("login");
        assert_eq!(user.username, "bee");
        assert_eq!(user.total_games, 0);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let store = UserStore::new(test_pool().await);
        store.register("bee", "secret").await.expect("register");
        let err = store.register("bee", "other").await.unwrap_err();
        assert!(err.to_string().contains("already taken"));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected_without_detail() {
        let store = UserStore::new(test_pool().await);
        store.register("bee", "secret").await.expect("register");
        let err = store.login("bee", "nope").await.unwrap_err();
        assert!(err.to_string().contains("unknown username or wrong password"));
        let err = store.login("ghost", "nope").await.unwrap_err();
        assert!(err.to_string().contains("unknown username or wrong password"));
    }

    #[tokio::test]
    async fn stats_track_bests_and_wins() {
        let store = UserStore::new(test_pool().await);
        store.register("bee", "secret").await.expect("register");

        let user = store.update_stats("bee", 150, true).await.expect("update");
        assert_eq!(user.best_score, 150);
        assert_eq!(user.total_games, 1);
        assert_eq!(user.total_wins, 1);

        let user = store.update_stats("bee", 90, false).await.expect("update");
        assert_eq!(user.best_score, 150, "lower score keeps the best");
        assert_eq!(user.total_games, 2);
        assert_eq!(user.total_wins, 1);
    }

    #[tokio::test]
    async fn invalid_usernames_are_rejected() {
        let store = UserStore::new(test_pool().await);
        assert!(store.register("a", "secret").await.is_err());
        assert!(store.register("bad name!", "secret").await.is_err());
    }
}
