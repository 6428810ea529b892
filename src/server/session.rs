use super::matchmaker::Match;
use super::AppState;
use crate::game::constants::{
    fireball_ticks, BASE_TICK, BOOST_THRESHOLD, BOOST_TIMEOUT, KEY_REPEAT_WINDOW, MID_BOOST_TICKS,
    MID_TICKS,
};
use crate::game::types::{Action, Difficulty, GameMode, Point, DOWN, LEFT, RIGHT, UP};
use crate::game::Game;
use crate::inference::InferenceHandle;
use crate::protocol::{ClientEnvelope, ServerEnvelope};
use crate::recorder::{unix_millis, Recorder, StepRecord};
use crate::store::leaderboard::{LeaderboardEntry, WinRateEntry};
use crate::store::session_log::SessionRow;
use crate::store::users::User;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, Mutex};

/// Which seat this connection occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Solo,
    P1,
    P2,
}

impl Role {
    pub fn player_index(self) -> usize {
        match self {
            Role::Solo | Role::P1 => 0,
            Role::P2 => 1,
        }
    }
}

#[derive(Debug)]
pub enum OutboundFrame {
    Message(Vec<u8>),
    Close,
}

/// One connected client. The outbound queue is the per-connection write
/// serializer: every envelope is encoded once and enqueued; a single writer
/// task owns the socket sink, so frames never interleave.
pub struct Session {
    pub conn_id: String,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
    pub state: Mutex<SessionState>,
}

pub struct SessionState {
    pub user: Option<User>,
    pub game: Arc<Mutex<Game>>,
    pub game_match: Option<Arc<Match>>,
    pub role: Role,
    pub difficulty: Difficulty,
    pub current_mode: GameMode,
    pub started: bool,
    pub searching: bool,
    pub boosting: bool,
    pub recorder: Option<Recorder>,
    pub session_start: Instant,

    // Boost key detection
    last_boost_key: Option<Instant>,
    last_dir_key: Option<Instant>,
    last_dir: Point,
    consecutive_presses: u32,

    // Per-player pacing counters, in base ticks
    pub tick_count: u32,
    pub rival_tick_count: u32,
    pub fireball_tick_count: u32,

    // Recording
    step_id: u64,
    fired_this_step: bool,
}

impl Session {
    pub fn new(
        conn_id: String,
        width: i32,
        height: i32,
        inference: Option<InferenceHandle>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let session = Arc::new(Self {
            conn_id,
            outbound,
            state: Mutex::new(SessionState {
                user: None,
                game: Arc::new(Mutex::new(Game::new(width, height, inference))),
                game_match: None,
                role: Role::Solo,
                difficulty: Difficulty::Mid,
                current_mode: GameMode::Battle,
                started: false,
                searching: false,
                boosting: false,
                recorder: None,
                session_start: Instant::now(),
                last_boost_key: None,
                last_dir_key: None,
                last_dir: Point::default(),
                consecutive_presses: 0,
                tick_count: 0,
                rival_tick_count: 0,
                fireball_tick_count: 0,
                step_id: 0,
                fired_this_step: false,
            }),
        });
        (session, outbound_rx)
    }

    pub fn send(&self, envelope: &ServerEnvelope) {
        match envelope.encode() {
            Ok(bytes) => {
                let _ = self.outbound.send(OutboundFrame::Message(bytes));
            }
            Err(error) => {
                tracing::error!(?error, conn = %self.conn_id, "failed to encode envelope");
            }
        }
    }

    /// Asks the writer task to close the socket; the reader observes the
    /// closed stream and unwinds through the normal disconnect path.
    pub fn close(&self) {
        let _ = self.outbound.send(OutboundFrame::Close);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("conn_id", &self.conn_id).finish()
    }
}

/// Dispatches one decoded client message. Returns false when the reader
/// loop should stop (logout).
pub async fn handle_message(
    state: &Arc<AppState>,
    session: &Arc<Session>,
    envelope: ClientEnvelope,
) -> bool {
    match envelope.action.as_str() {
        "login" => {
            let username = envelope.username.unwrap_or_default();
            let password = envelope.password.unwrap_or_default();
            match state.stores.users.login(&username, &password).await {
                Ok(user) => {
                    kick_existing_session(state, session, &user.username);
                    tracing::info!(user = %user.username, conn = %session.conn_id, "login");
                    session.state.lock().await.user = Some(user.clone());
                    session.send(&ServerEnvelope::auth_success(user));
                }
                Err(error) => {
                    tracing::warn!(user = %username, "login failed: {error}");
                    session.send(&ServerEnvelope::auth_error(error.to_string()));
                }
            }
            true
        }
        "register" => {
            let username = envelope.username.unwrap_or_default();
            let password = envelope.password.unwrap_or_default();
            match state.stores.users.register(&username, &password).await {
                Ok(()) => {
                    session.send(&ServerEnvelope::auth_success_message(
                        "Account created! Please login.",
                    ));
                }
                Err(error) => {
                    session.send(&ServerEnvelope::auth_error(error.to_string()));
                }
            }
            true
        }
        "ping" => {
            session.send(&ServerEnvelope::pong());
            true
        }
        "logout" => {
            tracing::info!(conn = %session.conn_id, "logout");
            session.close();
            false
        }
        "submit_feedback" => {
            let username = envelope.username.unwrap_or_default();
            let feedback = envelope.feedback.unwrap_or_default();
            match state.stores.feedback.append(&username, &feedback).await {
                Ok(()) => {
                    notify_feedback_webhook(state, username, feedback);
                    session.send(
                        &ServerEnvelope::state_ack("Thank you for your feedback!"),
                    );
                }
                Err(error) => {
                    tracing::warn!(?error, "failed to store feedback");
                }
            }
            true
        }
        "find_match" => {
            let logged_in = session.state.lock().await.user.is_some();
            if logged_in {
                state.matchmaker.find_match(state, session).await;
            } else {
                session.send(&ServerEnvelope::error("Login required for matches"));
            }
            true
        }
        "cancel_match" => {
            state.matchmaker.cancel_search(session).await;
            true
        }
        "submit_score" => true, // scores submit automatically on game over
        action => {
            handle_game_action(state, session, action, envelope.mode.as_deref()).await;
            true
        }
    }
}

/// On duplicate login the previous session for the account is told why and
/// closed before the new one is acknowledged.
fn kick_existing_session(state: &Arc<AppState>, new_session: &Arc<Session>, username: &str) {
    let mut victim = None;
    for entry in state.connections.iter() {
        if entry.key() == &new_session.conn_id {
            continue;
        }
        if let Ok(other_state) = entry.value().state.try_lock() {
            if other_state
                .user
                .as_ref()
                .is_some_and(|user| user.username == username)
            {
                victim = Some(Arc::clone(entry.value()));
                break;
            }
        }
    }
    if let Some(victim) = victim {
        tracing::warn!(user = %username, "kicking previous session");
        victim.send(&ServerEnvelope::error("Logged in from another location."));
        victim.close();
    }
}

fn notify_feedback_webhook(state: &Arc<AppState>, username: String, feedback: String) {
    let Some(url) = state.feedback_webhook.clone() else {
        return;
    };
    let client = state.http.clone();
    tokio::spawn(async move {
        let payload = serde_json::json!({
            "text": format!("Snake arena feedback from {username}: {feedback}"),
        });
        if let Err(error) = client.post(&url).json(&payload).send().await {
            tracing::warn!(?error, "feedback webhook failed");
        }
    });
}

async fn handle_game_action(
    state: &Arc<AppState>,
    session: &Arc<Session>,
    action: &str,
    agent_mode: Option<&str>,
) {
    if action == "restart" {
        restart_game(state, session).await;
        send_immediate_state(session).await;
        return;
    }

    let mut st = session.state.lock().await;
    let game = Arc::clone(&st.game);
    let mut g = game.lock().await;

    let input_dir = match action {
        "up" => Some(UP),
        "down" => Some(DOWN),
        "left" => Some(LEFT),
        "right" => Some(RIGHT),
        _ => None,
    };

    if let Some(input_dir) = input_dir {
        apply_direction_input(&mut st, &mut g, input_dir);
    } else {
        match action {
            "pause" => {
                if !g.game_over {
                    if !st.started {
                        start_game(&mut st, &mut g);
                    } else {
                        g.toggle_pause();
                    }
                }
            }
            "start" => start_game(&mut st, &mut g),
            "mode_zen" => {
                st.current_mode = GameMode::Zen;
                g.mode = GameMode::Zen;
                g.remove_rival();
            }
            "mode_battle" => {
                st.current_mode = GameMode::Battle;
                g.mode = GameMode::Battle;
                g.add_rival();
            }
            "diff_low" | "diff_mid" | "diff_high" => {
                if !st.started || g.game_over {
                    st.difficulty = match action {
                        "diff_low" => Difficulty::Low,
                        "diff_high" => Difficulty::High,
                        _ => Difficulty::Mid,
                    };
                }
            }
            "auto" => {
                if !g.game_over {
                    let idx = st.role.player_index();
                    g.toggle_player_auto(idx, agent_mode);
                }
            }
            "fire" => {
                if !g.game_over && !g.paused {
                    let idx = st.role.player_index();
                    g.fire(idx);
                    st.fired_this_step = true;
                }
            }
            "toggleBerserker" => {
                if !g.game_over {
                    g.toggle_berserker();
                }
            }
            _ => {
                tracing::debug!(action, "ignored unknown action");
            }
        }
    }

    if st.started {
        maybe_start_recording(state, &mut st, &session.conn_id);
    }

    let in_match = st.game_match.is_some();
    let searching = st.searching;
    if !in_match && !searching {
        // Immediate state for UI responsiveness, without waiting a tick.
        let snapshot = g.snapshot(st.started, st.boosting, st.difficulty);
        g.clear_transients();
        drop(g);
        drop(st);
        session.send(&ServerEnvelope::state(snapshot));
    }
}

/// A direction key both feeds the manual controller and runs the key-repeat
/// boost detector: repeated presses of the travel direction within the
/// window activate boost; a direction change cancels it.
fn apply_direction_input(st: &mut SessionState, g: &mut Game, input_dir: Point) {
    if !st.started && st.role == Role::Solo {
        start_game(st, g);
    }
    let idx = st.role.player_index();

    let mut dir_changed = false;
    if let Some(player) = g.players.get(idx) {
        if let Some(manual) = player.brain.manual_input() {
            manual.set_direction(input_dir);
            dir_changed = g.set_player_direction(idx, input_dir);
        }
    }

    let now = Instant::now();
    if dir_changed {
        st.consecutive_presses = 1;
        st.last_dir = input_dir;
        st.last_dir_key = Some(now);
        st.boosting = false;
    } else {
        check_boost_key(st, g, input_dir, now);
    }
}

fn check_boost_key(st: &mut SessionState, g: &Game, input_dir: Point, now: Instant) {
    let within_window = st
        .last_dir_key
        .is_some_and(|at| now.duration_since(at) < KEY_REPEAT_WINDOW);
    if input_dir == st.last_dir && within_window {
        st.consecutive_presses += 1;
    } else {
        st.consecutive_presses = 1;
    }
    st.last_dir = input_dir;
    st.last_dir_key = Some(now);

    let idx = st.role.player_index();
    if let Some(player) = g.players.get(idx) {
        if st.consecutive_presses >= BOOST_THRESHOLD && input_dir == player.dir {
            st.boosting = true;
            st.last_boost_key = Some(now);
        }
    }
}

pub fn start_game(st: &mut SessionState, g: &mut Game) {
    if st.started || g.game_over {
        return;
    }
    st.started = true;
    st.tick_count = 0;
    st.session_start = Instant::now();
    g.timer_started = true;
    g.start_time = Instant::now();
    g.last_food_spawn = Instant::now();
    // The first food may have been waiting since the connection opened;
    // restart its countdown with the clock.
    let pause_total = g.total_paused();
    if let Some(food) = g.foods.first_mut() {
        food.spawn_time = Instant::now();
        food.paused_at_spawn = pause_total;
    }
}

async fn restart_game(state: &Arc<AppState>, session: &Arc<Session>) {
    let mut st = session.state.lock().await;
    if let Some(recorder) = st.recorder.as_mut() {
        recorder.close();
    }
    st.recorder = None;

    let (game_over, width, height) = {
        let g = st.game.lock().await;
        (g.game_over, g.width, g.height)
    };
    if !game_over {
        return;
    }
    let mut fresh = Game::new(width, height, state.inference.clone());
    fresh.mode = st.current_mode;
    if st.current_mode == GameMode::Zen {
        fresh.remove_rival();
    }
    // A fresh arc: a detached PVP game stays with its match.
    st.game = Arc::new(Mutex::new(fresh));
    st.role = Role::Solo;
    st.started = false;
    st.boosting = false;
    st.tick_count = 0;
    st.rival_tick_count = 0;
    st.fireball_tick_count = 0;
    st.consecutive_presses = 0;
    st.step_id = 0;
}

async fn send_immediate_state(session: &Arc<Session>) {
    let st = session.state.lock().await;
    if st.game_match.is_some() || st.searching {
        return;
    }
    let game = Arc::clone(&st.game);
    let mut g = game.lock().await;
    let snapshot = g.snapshot(st.started, st.boosting, st.difficulty);
    g.clear_transients();
    drop(g);
    drop(st);
    session.send(&ServerEnvelope::state(snapshot));
}

// --- Tick loop --------------------------------------------------------------

pub async fn run_ticker(state: Arc<AppState>, session: Arc<Session>) {
    let mut interval = tokio::time::interval(BASE_TICK);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        tick(&state, &session).await;
    }
}

async fn tick(state: &Arc<AppState>, session: &Arc<Session>) {
    let (changed, report) = {
        let mut st = session.state.lock().await;
        let game = Arc::clone(&st.game);
        let mut g = game.lock().await;
        if st.game_match.is_some() {
            // The match runner owns simulation and snapshots; this loop only
            // keeps the local boost flag synced into the shared game.
            update_boosting_only(&mut st, &g);
            return;
        }
        let changed = session_update(&mut st, &mut g).await;
        let report = take_game_over_report(&mut st, &mut g);
        (changed, report)
    };

    // Persistence happens with no locks held.
    let mut updated_user = None;
    let mut leaderboard = None;
    if let Some(report) = report {
        let (user, boards) = persist_game_over(state, &report).await;
        updated_user = user;
        leaderboard = boards;
    }

    if !changed && updated_user.is_none() && leaderboard.is_none() {
        return;
    }

    let mut st = session.state.lock().await;
    if let Some(user) = &updated_user {
        st.user = Some(user.clone());
    }
    let game = Arc::clone(&st.game);
    let mut g = game.lock().await;
    let snapshot = g.snapshot(st.started, st.boosting, st.difficulty);
    g.clear_transients();
    drop(g);
    drop(st);

    let (entries, win_rates) = match leaderboard {
        Some((entries, win_rates)) => (Some(entries), Some(win_rates)),
        None => (None, None),
    };
    let envelope = ServerEnvelope::state(snapshot)
        .with_user(updated_user)
        .with_leaderboard(entries, win_rates);
    session.send(&envelope);
}

/// Syncs the session's boost key state into the manual controller, expiring
/// it after the boost timeout.
pub fn update_boosting_only(st: &mut SessionState, g: &Game) {
    if st.boosting
        && st
            .last_boost_key
            .is_some_and(|at| at.elapsed() > BOOST_TIMEOUT)
    {
        st.boosting = false;
    }
    let idx = st.role.player_index();
    if let Some(player) = g.players.get(idx) {
        if let Some(manual) = player.brain.manual_input() {
            manual.set_boosting(st.boosting);
        }
    }
}

/// One base tick of this session's view of the game: paces the own snake by
/// difficulty and boost, the solo rival at mid speed, and fireballs on their
/// own divider; runs the periodic world updates. Returns whether anything
/// worth broadcasting happened. Used by both the solo ticker and the match
/// runner (once per participant).
pub async fn session_update(st: &mut SessionState, g: &mut Game) -> bool {
    let mut changed = false;
    update_boosting_only(st, g);

    st.tick_count += 1;
    if st.started {
        let idx = st.role.player_index();
        let boosted = g.players.get(idx).is_some_and(|player| player.boosting);
        let mut ticks_needed = if boosted {
            st.difficulty.boost_ticks()
        } else {
            st.difficulty.ticks()
        };
        // Victim-slow: somebody else's TimeWarp doubles my move budget.
        if g.others_time_warp_active(idx) {
            ticks_needed *= 2;
        }

        if st.tick_count >= ticks_needed {
            st.tick_count = 0;
            if !g.game_over && !g.paused {
                g.update_player(idx).await;
                changed = true;
                record_step(st, g, false);
            }
        }
    }

    // The solo rival moves on its own counter at mid speed.
    if st.started && !g.is_pvp && g.players.len() > 1 && st.role == Role::Solo {
        st.rival_tick_count += 1;
        let mut rival_ticks = if g.players[1].boosting {
            MID_BOOST_TICKS
        } else {
            MID_TICKS
        };
        if g.others_time_warp_active(1) {
            rival_ticks *= 2;
        }
        if st.rival_tick_count >= rival_ticks {
            st.rival_tick_count = 0;
            if !g.game_over && !g.paused {
                g.update_player(1).await;
                changed = true;
            }
        }
    }

    // Periodic world upkeep runs whenever the game is live.
    if !g.game_over && !g.paused && (st.started || g.mode == GameMode::Pvp) {
        g.update_world();
    }

    if st.started {
        st.fireball_tick_count += 1;
        if st.fireball_tick_count >= fireball_ticks() {
            st.fireball_tick_count = 0;
            if !g.game_over && !g.paused {
                g.update_fireballs();
                changed = true;
            }
        }
    }

    // Messages and one-shot events must reach the client even on ticks
    // where nothing moved. The game-over tick itself counts; afterwards
    // `started` is already cleared and the dead game stays quiet.
    if g.message.is_some()
        || !g.hit_points.is_empty()
        || !g.score_events.is_empty()
        || (g.game_over && st.started)
    {
        changed = true;
    }
    changed
}

fn record_step(st: &mut SessionState, g: &mut Game, done: bool) {
    let idx = st.role.player_index();
    let Some(player) = g.players.get(idx) else {
        return;
    };
    let action = Action {
        dir: player.last_move_dir,
        boost: player.boosting,
        fire: st.fired_this_step,
    };
    st.fired_this_step = false;

    let score = player.score;
    let mut reward = (score - g.last_score) as f64;
    if g.game_over && g.winner != "player" {
        reward -= 100.0;
    } else if !g.game_over {
        reward += 0.1;
    }
    g.last_score = score;

    let Some(recorder) = st.recorder.as_mut() else {
        return;
    };
    let state_snapshot = g.snapshot(st.started, st.boosting, st.difficulty);
    recorder.record_step(StepRecord {
        step_id: st.step_id,
        ts: unix_millis(),
        state: state_snapshot,
        action,
        reward,
        done,
    });
    st.step_id += 1;
}

/// What needs to be persisted for a finished solo game.
#[derive(Debug)]
pub struct GameOverReport {
    pub username: String,
    pub score: i64,
    pub won: bool,
    pub outcome: String,
    pub mode: GameMode,
    pub difficulty: Difficulty,
    pub session_start: Instant,
    pub submit_to_leaderboard: bool,
}

/// Extracts the one-shot game-over report. Stops any recording, flips
/// `started` so the game is only processed once, and returns None for
/// anonymous sessions.
fn take_game_over_report(st: &mut SessionState, g: &mut Game) -> Option<GameOverReport> {
    if !g.game_over || !st.started {
        return None;
    }
    if st.recorder.is_some() {
        record_step(st, g, true);
        if let Some(recorder) = st.recorder.as_mut() {
            recorder.close();
        }
    }
    st.recorder = None;
    st.started = false;

    let user = st.user.as_ref()?;
    let idx = st.role.player_index();
    let score = g.players.get(idx).map_or(0, |player| player.score);
    let won = if g.is_pvp {
        match st.role {
            Role::P1 => g.winner == "player",
            Role::P2 => g.winner == "ai",
            Role::Solo => false,
        }
    } else {
        g.winner == "player"
    };
    Some(GameOverReport {
        username: user.username.clone(),
        score,
        won,
        outcome: g.winner.clone(),
        mode: g.mode,
        difficulty: st.difficulty,
        session_start: st.session_start,
        submit_to_leaderboard: g.mode == GameMode::Battle && score > 0,
    })
}

/// Persists stats (always), the leaderboard entry (battle mode only) and the
/// optional detailed session row; returns what should ride the next state
/// envelope.
async fn persist_game_over(
    state: &Arc<AppState>,
    report: &GameOverReport,
) -> (
    Option<User>,
    Option<(Vec<LeaderboardEntry>, Vec<WinRateEntry>)>,
) {
    tracing::info!(
        user = %report.username,
        score = report.score,
        outcome = %report.outcome,
        "game over"
    );
    let updated_user = match state
        .stores
        .users
        .update_stats(&report.username, report.score, report.won)
        .await
    {
        Ok(user) => Some(user),
        Err(error) => {
            tracing::warn!(?error, "failed to update user stats");
            None
        }
    };

    let mut leaderboard = None;
    if report.submit_to_leaderboard {
        let added = state
            .stores
            .leaderboard
            .add_entry(
                &report.username,
                report.score,
                report.difficulty.as_str(),
                report.mode.as_str(),
            )
            .await;
        match added {
            Ok(()) => {
                let entries = state.stores.leaderboard.entries().await;
                let win_rates = state.stores.leaderboard.win_rates().await;
                if let (Ok(entries), Ok(win_rates)) = (entries, win_rates) {
                    leaderboard = Some((entries, win_rates));
                }
            }
            Err(error) => {
                tracing::warn!(?error, "failed to submit leaderboard entry");
            }
        }
    }

    if state.detailed_logs {
        let elapsed_ms = report.session_start.elapsed().as_millis() as i64;
        let end = unix_millis();
        let row = SessionRow {
            username: report.username.clone(),
            start_unix_ms: end - elapsed_ms,
            end_unix_ms: end,
            score: report.score,
            outcome: report.outcome.clone(),
            mode: report.mode.as_str().to_string(),
            difficulty: report.difficulty.as_str().to_string(),
        };
        if let Err(error) = state.stores.session_log.append(&row).await {
            tracing::warn!(?error, "failed to append session log");
        }
    }

    (updated_user, leaderboard)
}

/// Starts recording for a session if detailed logging is on.
pub fn maybe_start_recording(state: &AppState, st: &mut SessionState, conn_id: &str) {
    if !state.detailed_logs || st.recorder.is_some() {
        return;
    }
    let session_id = format!("{}_{}", unix_millis(), conn_id);
    match Recorder::create(&session_id) {
        Ok(recorder) => {
            st.recorder = Some(recorder);
            st.step_id = 0;
        }
        Err(error) => {
            tracing::warn!(?error, "failed to start recorder");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::{STANDARD_HEIGHT, STANDARD_WIDTH};
    use crate::store::Stores;

    async fn test_state() -> Arc<AppState> {
        let pool = crate::store::test_pool().await;
        Arc::new(AppState::new(Stores::new(pool), None, 500, false, None))
    }

    fn connect(state: &Arc<AppState>) -> (Arc<Session>, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (session, rx) = Session::new(
            uuid::Uuid::new_v4().to_string(),
            STANDARD_WIDTH,
            STANDARD_HEIGHT,
            None,
        );
        state
            .connections
            .insert(session.conn_id.clone(), Arc::clone(&session));
        (session, rx)
    }

    fn login_envelope(username: &str, password: &str) -> ClientEnvelope {
        ClientEnvelope {
            action: "login".to_string(),
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            feedback: None,
            mode: None,
        }
    }

    async fn next_envelope(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> serde_json::Value {
        match rx.recv().await.expect("expected a frame") {
            OutboundFrame::Message(bytes) => {
                serde_json::from_slice(&bytes).expect("valid envelope json")
            }
            OutboundFrame::Close => panic!("unexpected close frame"),
        }
    }

    #[tokio::test]
    async fn duplicate_login_kicks_the_previous_session() {
        let state = test_state().await;
        state
            .stores
            .users
            .register("dupe", "secret")
            .await
            .expect("register");

        let (first, mut first_rx) = connect(&state);
        let (second, mut second_rx) = connect(&state);

        assert!(handle_message(&state, &first, login_envelope("dupe", "secret")).await);
        let ack = next_envelope(&mut first_rx).await;
        assert_eq!(ack["type"], "auth_success");
        assert!(first.state.lock().await.user.is_some());

        assert!(handle_message(&state, &second, login_envelope("dupe", "secret")).await);

        // The old session hears why, then its socket is closed.
        let kick = next_envelope(&mut first_rx).await;
        assert_eq!(kick["type"], "error");
        let message = kick["error"].as_str().expect("error message");
        assert!(message.contains("another location"), "got {message}");
        match first_rx.recv().await.expect("expected a frame") {
            OutboundFrame::Close => {}
            OutboundFrame::Message(bytes) => {
                panic!("expected close, got {}", String::from_utf8_lossy(&bytes))
            }
        }

        // The new session completes login normally.
        let ack = next_envelope(&mut second_rx).await;
        assert_eq!(ack["type"], "auth_success");
        assert_eq!(ack["user"]["username"], "dupe");
        assert!(second.state.lock().await.user.is_some());
    }

    #[tokio::test]
    async fn wrong_password_reports_auth_error_without_a_kick() {
        let state = test_state().await;
        state
            .stores
            .users
            .register("dupe", "secret")
            .await
            .expect("register");

        let (first, mut first_rx) = connect(&state);
        let (second, mut second_rx) = connect(&state);
        assert!(handle_message(&state, &first, login_envelope("dupe", "secret")).await);
        let _ = next_envelope(&mut first_rx).await;

        assert!(handle_message(&state, &second, login_envelope("dupe", "nope")).await);

        let rejection = next_envelope(&mut second_rx).await;
        assert_eq!(rejection["type"], "auth_error");
        assert!(second.state.lock().await.user.is_none());

        // The logged-in session is untouched: no error, no close pending.
        assert!(first_rx.try_recv().is_err());
        assert!(first.state.lock().await.user.is_some());
    }

    #[tokio::test]
    async fn relogging_the_same_connection_does_not_kick_itself() {
        let state = test_state().await;
        state
            .stores
            .users
            .register("dupe", "secret")
            .await
            .expect("register");

        let (session, mut rx) = connect(&state);
        assert!(handle_message(&state, &session, login_envelope("dupe", "secret")).await);
        let _ = next_envelope(&mut rx).await;

        assert!(handle_message(&state, &session, login_envelope("dupe", "secret")).await);
        let ack = next_envelope(&mut rx).await;
        assert_eq!(ack["type"], "auth_success");
        assert!(rx.try_recv().is_err(), "no kick for the same connection");
    }
}
