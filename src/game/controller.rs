use super::ai;
use super::constants::{STANDARD_HEIGHT, STANDARD_WIDTH};
use super::game::Game;
use super::types::{Action, Point};
use crate::inference::InferenceHandle;
use rand::Rng;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

/// Latest-intent cell for a human-driven seat. The reader task writes the
/// client's input here; the simulation reads it once per move.
#[derive(Debug, Default)]
pub struct ManualInput {
    inner: StdMutex<Action>,
}

impl ManualInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_direction(&self, dir: Point) {
        self.inner.lock().unwrap().dir = dir;
    }

    pub fn set_boosting(&self, boosting: bool) {
        self.inner.lock().unwrap().boost = boosting;
    }

    /// Returns the pending intent. Fire requests from clients are applied
    /// directly by the session, so the stored action never carries one.
    pub fn take_action(&self) -> Action {
        *self.inner.lock().unwrap()
    }
}

/// The brain of one seat. All three variants answer a single question: given
/// the game and my player index, what is my next action?
#[derive(Debug, Clone)]
pub enum Brain {
    Manual(Arc<ManualInput>),
    Heuristic,
    Neural(InferenceHandle),
}

impl Brain {
    pub fn kind(&self) -> &'static str {
        match self {
            Brain::Manual(_) => "manual",
            Brain::Heuristic => "heuristic",
            Brain::Neural(_) => "neural",
        }
    }

    pub fn manual_input(&self) -> Option<&Arc<ManualInput>> {
        match self {
            Brain::Manual(input) => Some(input),
            _ => None,
        }
    }

    pub async fn next_action(&self, game: &Game, idx: usize) -> Action {
        match self {
            Brain::Manual(input) => input.take_action(),
            Brain::Heuristic => heuristic_action(game, idx),
            Brain::Neural(handle) => neural_action(game, idx, handle).await,
        }
    }
}

fn heuristic_action(game: &Game, idx: usize) -> Action {
    if idx >= game.players.len() {
        return Action::default();
    }
    let (dir, boost) = ai::calculate_best_move(game, idx);

    let mut fire = ai::should_fire(game, idx, dir);
    if !fire && !game.is_pvp {
        // Rare pot shot, solo modes only.
        fire = rand::thread_rng().gen_bool(0.01);
    }

    Action { dir, boost, fire }
}

/// Learned policy: feed the feature grid through the shared inference
/// service and take the argmax. Falls back to the planner when the board is
/// not the training size, the service is unavailable, or the suggested move
/// is suicidal. Boost and fire decisions always come from the planner.
async fn neural_action(game: &Game, idx: usize, handle: &InferenceHandle) -> Action {
    if game.width != STANDARD_WIDTH || game.height != STANDARD_HEIGHT {
        return heuristic_action(game, idx);
    }
    let Some(head) = game.players.get(idx).and_then(|player| player.head()) else {
        return Action::default();
    };

    let grid = ai::feature_grid(game, idx);
    let Some(logits) = handle.predict(grid).await else {
        return heuristic_action(game, idx);
    };

    let mut best_index = 0;
    let mut best_value = f32::MIN;
    for (i, value) in logits.iter().enumerate() {
        if *value > best_value {
            best_value = *value;
            best_index = i;
        }
    }
    let dir = ai::logit_direction(best_index);

    let next_head = head.step(dir);
    if !game.is_safe(next_head) {
        tracing::debug!(player = idx, "policy suggested a fatal move, using planner");
        return heuristic_action(game, idx);
    }

    let (_, boost) = ai::calculate_best_move(game, idx);
    let fire = ai::should_fire(game, idx, dir);

    Action { dir, boost, fire }
}
