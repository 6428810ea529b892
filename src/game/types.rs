use super::constants::{
    BIG_CHEST_SCORE, MAGNET_DURATION, RAPID_FIRE_DURATION, SCATTER_SHOT_DURATION,
    SHIELD_DURATION, SMALL_CHEST_SCORE, TIME_WARP_DURATION,
};
use super::controller::Brain;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

pub const UP: Point = Point { x: 0, y: -1 };
pub const DOWN: Point = Point { x: 0, y: 1 };
pub const LEFT: Point = Point { x: -1, y: 0 };
pub const RIGHT: Point = Point { x: 1, y: 0 };

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Point) -> Point {
        Point::new(self.x + dir.x, self.y + dir.y)
    }

    pub fn manhattan(self, other: Point) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn distance_sq(self, other: Point) -> i32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// True when `other` is the exact 180-degree inverse of this direction.
    pub fn is_opposite(self, other: Point) -> bool {
        (other.x != 0 && self.x == -other.x) || (other.y != 0 && self.y == -other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Zen,
    Battle,
    Pvp,
}

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Zen => "zen",
            GameMode::Battle => "battle",
            GameMode::Pvp => "pvp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FoodKind {
    Purple,
    Blue,
    Orange,
    Red,
}

#[derive(Debug, Clone)]
pub struct Food {
    pub pos: Point,
    pub kind: FoodKind,
    pub spawn_time: Instant,
    pub paused_at_spawn: Duration,
}

#[derive(Debug, Clone)]
pub struct Obstacle {
    pub points: Vec<Point>,
    pub spawn_time: Instant,
    pub duration: Duration,
    pub paused_at_spawn: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropKind {
    Shield,
    TimeWarp,
    Trimmer,
    Magnet,
    BigChest,
    SmallChest,
    RapidFire,
    ScatterShot,
}

impl PropKind {
    pub const ALL: [PropKind; 8] = [
        PropKind::Shield,
        PropKind::TimeWarp,
        PropKind::Trimmer,
        PropKind::Magnet,
        PropKind::BigChest,
        PropKind::SmallChest,
        PropKind::RapidFire,
        PropKind::ScatterShot,
    ];

    /// Timed effect installed on pickup, if any. Instant props return None.
    pub fn effect(self) -> Option<(EffectKind, Duration)> {
        match self {
            PropKind::Shield => Some((EffectKind::Shield, SHIELD_DURATION)),
            PropKind::TimeWarp => Some((EffectKind::TimeWarp, TIME_WARP_DURATION)),
            PropKind::Magnet => Some((EffectKind::Magnet, MAGNET_DURATION)),
            PropKind::RapidFire => Some((EffectKind::RapidFire, RAPID_FIRE_DURATION)),
            PropKind::ScatterShot => Some((EffectKind::ScatterShot, SCATTER_SHOT_DURATION)),
            PropKind::Trimmer | PropKind::BigChest | PropKind::SmallChest => None,
        }
    }

    pub fn instant_score(self) -> Option<i64> {
        match self {
            PropKind::BigChest => Some(BIG_CHEST_SCORE),
            PropKind::SmallChest => Some(SMALL_CHEST_SCORE),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PropKind::Shield => "Shield",
            PropKind::TimeWarp => "Time Warp",
            PropKind::Trimmer => "Trimmer",
            PropKind::Magnet => "Magnet",
            PropKind::BigChest => "Big Chest",
            PropKind::SmallChest => "Small Chest",
            PropKind::RapidFire => "Rapid Fire",
            PropKind::ScatterShot => "Scatter Shot",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            PropKind::Shield => "🛡️",
            PropKind::TimeWarp => "⏳",
            PropKind::Trimmer => "✂️",
            PropKind::Magnet => "🧲",
            PropKind::BigChest => "🎁",
            PropKind::SmallChest => "📦",
            PropKind::RapidFire => "🔫",
            PropKind::ScatterShot => "💥",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Prop {
    pub pos: Point,
    pub kind: PropKind,
    pub spawn_time: Instant,
    pub paused_at_spawn: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Shield,
    TimeWarp,
    Magnet,
    RapidFire,
    ScatterShot,
}

#[derive(Debug, Clone, Copy)]
pub struct ActiveEffect {
    pub kind: EffectKind,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Fireball {
    pub pos: Point,
    pub dir: Point,
    /// Index of the player that shot this projectile.
    pub owner: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEvent {
    pub pos: Point,
    pub amount: i64,
    pub label: String,
}

/// One controller decision for one move of a snake.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub dir: Point,
    pub boost: bool,
    pub fire: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Low,
    Mid,
    High,
}

impl Difficulty {
    pub fn ticks(self) -> u32 {
        match self {
            Difficulty::Low => super::constants::LOW_TICKS,
            Difficulty::Mid => super::constants::MID_TICKS,
            Difficulty::High => super::constants::HIGH_TICKS,
        }
    }

    pub fn boost_ticks(self) -> u32 {
        match self {
            Difficulty::Low => super::constants::LOW_BOOST_TICKS,
            Difficulty::Mid => super::constants::MID_BOOST_TICKS,
            Difficulty::High => super::constants::HIGH_BOOST_TICKS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Low => "low",
            Difficulty::Mid => "mid",
            Difficulty::High => "high",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    /// Head-first body segments. Non-empty while the player is alive.
    pub body: Vec<Point>,
    pub dir: Point,
    pub last_move_dir: Point,
    pub score: i64,
    pub foods_eaten: u32,
    pub boosting: bool,
    pub stunned: bool,
    pub stunned_until: Option<Instant>,
    pub last_fire_at: Option<Instant>,
    pub name: String,
    pub brain: Brain,
    pub effects: Vec<ActiveEffect>,
    /// Spawn seed; solo bots respawn here after a crash.
    pub origin: Point,
}

impl Player {
    pub fn new(name: impl Into<String>, origin: Point, dir: Point, brain: Brain) -> Self {
        Self {
            body: vec![origin],
            dir,
            last_move_dir: dir,
            score: 0,
            foods_eaten: 0,
            boosting: false,
            stunned: false,
            stunned_until: None,
            last_fire_at: None,
            name: name.into(),
            brain,
            effects: Vec::new(),
            origin,
        }
    }

    pub fn head(&self) -> Option<Point> {
        self.body.first().copied()
    }

    pub fn tail(&self) -> Option<Point> {
        self.body.last().copied()
    }

    pub fn has_effect(&self, kind: EffectKind) -> bool {
        self.effects.iter().any(|effect| effect.kind == kind)
    }

    /// Installs the effect, refreshing the expiry when one of the same kind
    /// is already active instead of appending a duplicate entry.
    pub fn apply_effect(&mut self, kind: EffectKind, duration: Duration) {
        let expires_at = Instant::now() + duration;
        match self.effects.iter_mut().find(|effect| effect.kind == kind) {
            Some(existing) => existing.expires_at = expires_at,
            None => self.effects.push(ActiveEffect { kind, expires_at }),
        }
    }

    /// Removes exactly one Shield charge. Returns true if one was consumed.
    pub fn consume_shield(&mut self) -> bool {
        if let Some(index) = self
            .effects
            .iter()
            .position(|effect| effect.kind == EffectKind::Shield)
        {
            self.effects.remove(index);
            return true;
        }
        false
    }

    pub fn drop_expired_effects(&mut self, now: Instant) {
        self.effects.retain(|effect| effect.expires_at > now);
    }
}

// --- Wire DTOs -------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodInfo {
    pub pos: Point,
    pub kind: FoodKind,
    pub remaining_seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObstacleInfo {
    pub points: Vec<Point>,
    pub remaining_seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropInfo {
    pub pos: Point,
    pub kind: PropKind,
    pub remaining_seconds: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectInfo {
    pub kind: EffectKind,
    pub remaining_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub name: String,
    pub body: Vec<Point>,
    pub score: i64,
    pub foods_eaten: u32,
    pub boosting: bool,
    pub stunned: bool,
    pub controller: &'static str,
    pub effects: Vec<EffectInfo>,
}

/// Full authoritative state sent to clients. One-shot fields (`scoreEvents`,
/// `hitPoints`, `message`, `messageType`) are cleared after each send.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub players: Vec<PlayerSnapshot>,
    pub foods: Vec<FoodInfo>,
    pub obstacles: Vec<ObstacleInfo>,
    pub props: Vec<PropInfo>,
    pub fireballs: Vec<Fireball>,
    pub hit_points: Vec<Point>,
    pub score_events: Vec<ScoreEvent>,
    pub score: i64,
    pub food_eaten: u32,
    pub eating_speed: f64,
    pub started: bool,
    pub game_over: bool,
    pub paused: bool,
    pub boosting: bool,
    pub auto_play: bool,
    pub difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crash_point: Option<Point>,
    pub time_remaining: i64,
    pub winner: String,
    pub mode: GameMode,
    pub berserker: bool,
    #[serde(rename = "isPVP")]
    pub is_pvp: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    pub width: i32,
    pub height: i32,
    /// Match length in seconds.
    pub game_duration: u64,
    /// Fireball cooldown in milliseconds.
    pub fireball_cooldown: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_direction_detection() {
        assert!(LEFT.is_opposite(RIGHT));
        assert!(UP.is_opposite(DOWN));
        assert!(!UP.is_opposite(LEFT));
        assert!(!RIGHT.is_opposite(RIGHT));
    }

    #[test]
    fn effect_refresh_keeps_single_entry_per_kind() {
        let mut player = Player::new("p", Point::new(5, 5), RIGHT, Brain::Heuristic);
        player.apply_effect(EffectKind::Magnet, Duration::from_secs(1));
        let first_expiry = player.effects[0].expires_at;
        player.apply_effect(EffectKind::Magnet, Duration::from_secs(8));
        assert_eq!(player.effects.len(), 1);
        assert!(player.effects[0].expires_at > first_expiry);
    }

    #[test]
    fn shield_consumption_removes_one_charge() {
        let mut player = Player::new("p", Point::new(5, 5), RIGHT, Brain::Heuristic);
        assert!(!player.consume_shield());
        player.apply_effect(EffectKind::Shield, Duration::from_secs(10));
        assert!(player.consume_shield());
        assert!(!player.has_effect(EffectKind::Shield));
    }
}
