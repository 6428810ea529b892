use super::session::{session_update, Role, Session};
use super::AppState;
use crate::game::constants::BASE_TICK;
use crate::game::types::Difficulty;
use crate::game::Game;
use crate::protocol::ServerEnvelope;
use crate::recorder::unix_millis;
use crate::store::session_log::SessionRow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// A live pairing of two sessions over one shared game. The runner task is
/// the sole mutator of the game while the match lasts; both participants'
/// own tickers skip simulation while attached.
pub struct Match {
    pub game: Arc<Mutex<Game>>,
    pub p1: Arc<Session>,
    pub p2: Arc<Session>,
    closing: AtomicBool,
}

impl Match {
    /// Flips the match into its closing state. Returns true for exactly one
    /// caller, which is then responsible for `handle_match_over`.
    pub fn begin_closing(&self) -> bool {
        !self.closing.swap(true, Ordering::SeqCst)
    }

    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Match {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Match")
            .field("p1", &self.p1.conn_id)
            .field("p2", &self.p2.conn_id)
            .field("closing", &self.is_closing())
            .finish()
    }
}

/// Single-slot matchmaking queue: at most one session waits at a time; the
/// next distinct user pairs with it.
#[derive(Debug, Default)]
pub struct Matchmaker {
    waiting: Mutex<Option<Arc<Session>>>,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn find_match(&self, state: &Arc<AppState>, session: &Arc<Session>) {
        let my_username = {
            let st = session.state.lock().await;
            if st.game_match.is_some() {
                return;
            }
            match &st.user {
                Some(user) => user.username.clone(),
                None => return,
            }
        };

        let mut waiting = self.waiting.lock().await;
        let Some(other) = waiting.take() else {
            *waiting = Some(Arc::clone(session));
            session.state.lock().await.searching = true;
            tracing::info!(user = %my_username, "entered matchmaking queue");
            return;
        };

        let other_username = {
            let other_state = other.state.lock().await;
            other_state.user.as_ref().map(|user| user.username.clone())
        };
        // No self-match across two connections of the same account.
        if other_username.as_deref() == Some(my_username.as_str()) {
            tracing::warn!(user = %my_username, "rejected self-match, keeping queue entry");
            *waiting = Some(other);
            return;
        }
        drop(waiting);

        let p1_name = other_username.unwrap_or_else(|| "Player 1".to_string());
        tracing::info!(p1 = %p1_name, p2 = %my_username, "match found");
        start_match(state, other, Arc::clone(session), &p1_name, &my_username).await;
    }

    pub async fn cancel_search(&self, session: &Arc<Session>) {
        let mut waiting = self.waiting.lock().await;
        let is_waiting = waiting
            .as_ref()
            .is_some_and(|candidate| Arc::ptr_eq(candidate, session));
        if is_waiting {
            *waiting = None;
            session.state.lock().await.searching = false;
            tracing::info!(conn = %session.conn_id, "left matchmaking queue");
        }
    }
}

/// Builds the shared game, attaches both sessions, announces the pairing and
/// spawns the countdown + runner task.
async fn start_match(
    state: &Arc<AppState>,
    p1: Arc<Session>,
    p2: Arc<Session>,
    p1_name: &str,
    p2_name: &str,
) {
    let shared = Arc::new(Mutex::new(Game::new_pvp(p1_name, p2_name)));
    let game_match = Arc::new(Match {
        game: Arc::clone(&shared),
        p1: Arc::clone(&p1),
        p2: Arc::clone(&p2),
        closing: AtomicBool::new(false),
    });

    attach_participant(&p1, &game_match, Role::P1).await;
    attach_participant(&p2, &game_match, Role::P2).await;

    let announce = {
        let mut g = shared.lock().await;
        g.set_message_with_type("MATCH FOUND!", "important");
        let snapshot = g.snapshot(true, false, Difficulty::Mid);
        g.clear_transients();
        snapshot
    };
    p1.send(&ServerEnvelope::state(announce.clone()));
    p2.send(&ServerEnvelope::state(announce));

    let state = Arc::clone(state);
    tokio::spawn(async move {
        run_countdown(&game_match).await;
        if !game_match.is_closing() {
            run_match(&state, &game_match).await;
        }
    });
}

async fn attach_participant(session: &Arc<Session>, game_match: &Arc<Match>, role: Role) {
    let mut st = session.state.lock().await;
    st.searching = false;
    st.game_match = Some(Arc::clone(game_match));
    st.role = role;
    st.game = Arc::clone(&game_match.game);
    st.started = false;
    st.boosting = false;
    st.tick_count = 0;
    st.rival_tick_count = 0;
    st.fireball_tick_count = 0;
}

/// Three personalized countdown beats, one second apart, then the shared
/// unpause that both clients observe with the same start time.
async fn run_countdown(game_match: &Arc<Match>) {
    for i in (1..=3).rev() {
        if game_match.is_closing() {
            return;
        }
        let snapshot = {
            let g = game_match.game.lock().await;
            g.snapshot(true, false, Difficulty::Mid)
        };

        let mut for_p1 = snapshot.clone();
        for_p1.message = Some(format!("YOU ARE PLAYER 1 (GREEN)\nSTARTING IN {i}..."));
        for_p1.message_type = Some("important".to_string());
        game_match.p1.send(&ServerEnvelope::state(for_p1));

        let mut for_p2 = snapshot;
        for_p2.message = Some(format!("YOU ARE PLAYER 2 (PURPLE)\nSTARTING IN {i}..."));
        for_p2.message_type = Some("important".to_string());
        game_match.p2.send(&ServerEnvelope::state(for_p2));

        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    if game_match.is_closing() {
        return;
    }
    {
        let mut g = game_match.game.lock().await;
        g.set_message_with_type("GO!", "important");
        g.paused = false;
        g.timer_started = true;
        g.start_time = std::time::Instant::now();
    }
    for session in [&game_match.p1, &game_match.p2] {
        let mut st = session.state.lock().await;
        st.started = true;
        st.session_start = std::time::Instant::now();
    }
    tracing::info!("pvp match unpaused");
}

/// Drives the shared game at the base tick. Each round advances both
/// players' paced updates under the participant and game locks, fans one
/// snapshot out to both clients, and clears the one-shot buffers only after
/// both sends are enqueued.
async fn run_match(state: &Arc<AppState>, game_match: &Arc<Match>) {
    let mut interval = tokio::time::interval(BASE_TICK);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        if game_match.is_closing() {
            return;
        }

        let game_over = {
            // Lock order everywhere: p1 state, p2 state, then the game.
            let mut s1 = game_match.p1.state.lock().await;
            let mut s2 = game_match.p2.state.lock().await;
            let mut g = game_match.game.lock().await;

            let c1 = session_update(&mut s1, &mut g).await;
            let c2 = session_update(&mut s2, &mut g).await;

            if c1 || c2 {
                let snapshot = g.snapshot(true, false, s1.difficulty);
                game_match.p1.send(&ServerEnvelope::state(snapshot.clone()));
                game_match.p2.send(&ServerEnvelope::state(snapshot));
                g.clear_transients();
            }
            g.game_over
        };

        if game_over {
            if game_match.begin_closing() {
                handle_match_over(state, game_match).await;
            }
            return;
        }
    }
}

/// Persists both players' results and detaches them so their solo loops
/// resume and a new `find_match` can be queued. Called exactly once per
/// match, by whichever side won the `begin_closing` race (runner or a
/// disconnect handler).
pub async fn handle_match_over(state: &Arc<AppState>, game_match: &Arc<Match>) {
    let (winner, scores) = {
        let g = game_match.game.lock().await;
        let scores: Vec<i64> = g.players.iter().map(|player| player.score).collect();
        (g.winner.clone(), scores)
    };
    tracing::info!(winner = %winner, "match over");

    let participants = [
        (&game_match.p1, Role::P1, winner == "player"),
        (&game_match.p2, Role::P2, winner == "ai"),
    ];
    for (session, role, won) in participants {
        let (username, session_start, difficulty) = {
            let st = session.state.lock().await;
            (
                st.user.as_ref().map(|user| user.username.clone()),
                st.session_start,
                st.difficulty,
            )
        };
        let Some(username) = username else { continue };
        let score = scores.get(role.player_index()).copied().unwrap_or(0);

        match state.stores.users.update_stats(&username, score, won).await {
            Ok(updated) => {
                session.state.lock().await.user = Some(updated.clone());
                session.send(&ServerEnvelope::auth_success(updated));
            }
            Err(error) => {
                tracing::warn!(?error, user = %username, "failed to persist match stats");
            }
        }

        if state.detailed_logs {
            let outcome = if won {
                "won"
            } else if winner == "draw" {
                "draw"
            } else {
                "lost"
            };
            let end = unix_millis();
            let elapsed_ms = session_start.elapsed().as_millis() as i64;
            let row = SessionRow {
                username,
                start_unix_ms: end - elapsed_ms,
                end_unix_ms: end,
                score,
                outcome: outcome.to_string(),
                mode: "pvp".to_string(),
                difficulty: difficulty.as_str().to_string(),
            };
            if let Err(error) = state.stores.session_log.append(&row).await {
                tracing::warn!(?error, "failed to append pvp session log");
            }
        }
    }

    detach_participants(game_match).await;
}

/// Resets both sessions to solo so they can re-queue. Their games still
/// point at the finished shared game until a restart replaces it.
pub async fn detach_participants(game_match: &Arc<Match>) {
    for session in [&game_match.p1, &game_match.p2] {
        let mut st = session.state.lock().await;
        st.game_match = None;
        st.role = Role::Solo;
        st.started = false;
        st.searching = false;
    }
}
