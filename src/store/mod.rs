pub mod feedback;
pub mod leaderboard;
pub mod session_log;
pub mod users;

use sqlx::SqlitePool;

/// Process-wide stores, constructed once at startup and handed to sessions
/// by reference. All share the same SQLite pool.
#[derive(Debug, Clone)]
pub struct Stores {
    pub users: users::UserStore,
    pub leaderboard: leaderboard::LeaderboardStore,
    pub feedback: feedback::FeedbackStore,
    pub session_log: session_log::SessionLogStore,
}

impl Stores {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            users: users::UserStore::new(pool.clone()),
            leaderboard: leaderboard::LeaderboardStore::new(pool.clone()),
            feedback: feedback::FeedbackStore::new(pool.clone()),
            session_log: session_log::SessionLogStore::new(pool),
        }
    }
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    // One connection: every connection to :memory: is its own database.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}
