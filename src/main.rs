use axum::{
    extract::{State, WebSocketUpgrade},
    http::{HeaderMap, Method},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::sqlite::SqlitePoolOptions;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

mod game;
mod inference;
mod protocol;
mod recorder;
mod server;
mod shared;
mod store;
mod transport;

use game::constants::MAX_PLAYERS;
use server::AppState;

#[derive(Debug, Serialize)]
struct OkResponse {
    ok: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
        let base = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let default_path = base.join("data").join("game.db");
        format!("sqlite://{}", default_path.display())
    });
    ensure_db_dir(&database_url)?;

    let db = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;
    let stores = store::Stores::new(db);

    let model_path = env::var("SNAKE_MODEL_PATH")
        .unwrap_or_else(|_| "ml/checkpoints/snake_policy.onnx".to_string());
    let inference = match inference::start(model_path.as_ref()) {
        Ok(handle) => {
            tracing::info!(model = %model_path, "policy inference service online");
            Some(handle)
        }
        Err(error) => {
            tracing::warn!(?error, "inference unavailable, bots fall back to heuristic");
            None
        }
    };

    let max_players = env::var("SNAKE_MAX_PLAYERS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(MAX_PLAYERS);
    let detailed_logs = env::var("SNAKE_DETAILED_LOGS")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE"))
        .unwrap_or(false);
    let feedback_webhook = env::var("FEEDBACK_WEBHOOK_URL")
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    let state = Arc::new(AppState::new(
        stores,
        inference,
        max_players,
        detailed_logs,
        feedback_webhook,
    ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);
    let app: Router = Router::new()
        .route("/api/health", get(health))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state);

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8080);
    let address = format!("0.0.0.0:{port}");
    tracing::info!("snake arena listening on {address}");
    let listener = tokio::net::TcpListener::bind(&address).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(OkResponse { ok: true })
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let user_agent = headers
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());
    ws.on_upgrade(move |socket| transport::ws_session::handle_socket(state, socket, user_agent))
}

fn ensure_db_dir(database_url: &str) -> anyhow::Result<()> {
    if database_url.starts_with("sqlite::memory:") {
        return Ok(());
    }
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"));
    let Some(path) = path else { return Ok(()) };
    if path.is_empty() || path == ":memory:" {
        return Ok(());
    }
    let db_path = PathBuf::from(path);
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !db_path.exists() {
        let _ = std::fs::File::create(&db_path)?;
    }
    Ok(())
}
