use anyhow::Context;
use sqlx::SqlitePool;

#[derive(Debug, Clone)]
pub struct FeedbackStore {
    pool: SqlitePool,
}

impl FeedbackStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn append(&self, username: &str, message: &str) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO feedback (username, message) VALUES (?, ?)")
            .bind(username)
            .bind(message)
            .execute(&self.pool)
            .await
            .context("feedback insert failed")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_pool;
    use sqlx::Row;

    #[tokio::test]
    async fn feedback_rows_are_appended() {
        let pool = test_pool().await;
        let store = FeedbackStore::new(pool.clone());
        store.append("bee", "more snakes please").await.expect("insert");

        let row = sqlx::query("SELECT username, message FROM feedback")
            .fetch_one(&pool)
            .await
            .expect("row");
        let username: String = row.try_get("username").expect("username");
        assert_eq!(username, "bee");
    }
}
