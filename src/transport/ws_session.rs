use crate::game::constants::{LARGE_HEIGHT, LARGE_WIDTH, STANDARD_HEIGHT, STANDARD_WIDTH};
use crate::protocol::{decode_client_envelope, ServerEnvelope};
use crate::server::session::{handle_message, run_ticker, OutboundFrame, Session};
use crate::server::{matchmaker, AppState};
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use uuid::Uuid;

const MOBILE_KEYWORDS: [&str; 6] = ["Mobile", "Android", "iPhone", "iPad", "Windows Phone", "Mobi"];

/// Mobile clients get the standard board (which is also what the policy
/// network expects); desktops get the large one.
pub fn board_for_user_agent(user_agent: Option<&str>) -> (i32, i32) {
    let is_mobile = user_agent
        .map(|agent| MOBILE_KEYWORDS.iter().any(|keyword| agent.contains(keyword)))
        .unwrap_or(false);
    if is_mobile {
        (STANDARD_WIDTH, STANDARD_HEIGHT)
    } else {
        (LARGE_WIDTH, LARGE_HEIGHT)
    }
}

pub async fn handle_socket(state: Arc<AppState>, socket: WebSocket, user_agent: Option<String>) {
    let (mut sink, mut stream) = socket.split();

    // Admission cap: one error envelope, then close.
    if state.connections.len() >= state.max_players {
        tracing::warn!(cap = state.max_players, "connection rejected, server full");
        let envelope =
            ServerEnvelope::error("Server is full. Please wait for a player to leave and retry.");
        if let Ok(bytes) = envelope.encode() {
            let _ = sink.send(Message::Binary(bytes)).await;
        }
        return;
    }

    let conn_id = Uuid::new_v4().to_string();
    let (width, height) = board_for_user_agent(user_agent.as_deref());
    tracing::info!(conn = %conn_id, width, height, "connection accepted");

    let (session, mut outbound_rx) =
        Session::new(conn_id.clone(), width, height, state.inference.clone());
    state.connections.insert(conn_id.clone(), Arc::clone(&session));
    state.broadcast_session_count();

    // Writer task: sole owner of the sink, draining the outbound queue.
    let send_task = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            match frame {
                OutboundFrame::Message(payload) => {
                    if sink.send(Message::Binary(payload)).await.is_err() {
                        break;
                    }
                }
                OutboundFrame::Close => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    send_initial_envelopes(&state, &session).await;
    let ticker = tokio::spawn(run_ticker(Arc::clone(&state), Arc::clone(&session)));

    while let Some(result) = stream.next().await {
        let Ok(message) = result else { break };
        let data = match &message {
            Message::Binary(data) => data.as_slice(),
            Message::Text(text) => text.as_bytes(),
            Message::Close(_) => break,
            _ => continue,
        };
        let Some(envelope) = decode_client_envelope(data) else {
            tracing::debug!(conn = %conn_id, "dropping malformed frame");
            continue;
        };
        if !handle_message(&state, &session, envelope).await {
            break;
        }
    }

    // Deterministic unwind, in this order: stop simulating, deregister and
    // re-count, leave the queue, settle any live match, stop recording.
    ticker.abort();
    state.connections.remove(&conn_id);
    state.broadcast_session_count();
    state.matchmaker.cancel_search(&session).await;

    let live_match = { session.state.lock().await.game_match.clone() };
    if let Some(game_match) = live_match {
        if game_match.begin_closing() {
            tracing::info!(conn = %conn_id, "match terminated by disconnect");
            matchmaker::handle_match_over(&state, &game_match).await;
        }
    }

    {
        let mut st = session.state.lock().await;
        if let Some(recorder) = st.recorder.as_mut() {
            recorder.close();
        }
        st.recorder = None;
    }
    send_task.abort();
    tracing::info!(conn = %conn_id, "connection closed");
}

/// Config, current leaderboard, and the initial state, in that order.
async fn send_initial_envelopes(state: &Arc<AppState>, session: &Arc<Session>) {
    let (config, snapshot) = {
        let st = session.state.lock().await;
        let g = st.game.lock().await;
        (g.config(), g.snapshot(st.started, st.boosting, st.difficulty))
    };
    session.send(&ServerEnvelope::config(config));

    match (
        state.stores.leaderboard.entries().await,
        state.stores.leaderboard.win_rates().await,
    ) {
        (Ok(entries), Ok(win_rates)) => {
            session.send(&ServerEnvelope::leaderboard(entries, win_rates));
        }
        (Err(error), _) | (_, Err(error)) => {
            tracing::warn!(?error, "failed to load leaderboard");
        }
    }

    session.send(&ServerEnvelope::state(snapshot));
}
