use std::time::Duration;

// Board sizes. The standard board is what the policy network was trained on;
// desktop clients get the large board.
pub const STANDARD_WIDTH: i32 = 25;
pub const STANDARD_HEIGHT: i32 = 25;
pub const LARGE_WIDTH: i32 = 38;
pub const LARGE_HEIGHT: i32 = 38;

pub const GAME_DURATION: Duration = Duration::from_secs(60);

// Food spawn settings
pub const FOOD_SPAWN_INTERVAL: Duration = Duration::from_secs(5);
pub const MAX_FOODS: usize = 12;

// Obstacle settings
pub const OBSTACLE_SPAWN_INTERVAL: Duration = Duration::from_secs(10);
pub const OBSTACLE_DURATION: Duration = Duration::from_secs(30);
pub const MAX_OBSTACLES: usize = 8;

// Prop settings
pub const PROP_SPAWN_INTERVAL: Duration = Duration::from_secs(12);
pub const PROP_SPAWN_CHANCE: f64 = 0.20;
pub const MAX_PROPS: usize = 4;
pub const PROP_DURATION: Duration = Duration::from_secs(15);

// Fireball settings
pub const FIREBALL_SPEED: Duration = Duration::from_millis(48);
pub const FIREBALL_COOLDOWN: Duration = Duration::from_millis(300);
pub const HEADSHOT_STUN: Duration = Duration::from_secs(2);
pub const HEADSHOT_SCORE: i64 = 50;
pub const BODY_HIT_SCORE: i64 = 10;
pub const OBSTACLE_HIT_SCORE: i64 = 10;

// Timed prop effects
pub const SHIELD_DURATION: Duration = Duration::from_secs(10);
pub const TIME_WARP_DURATION: Duration = Duration::from_secs(6);
pub const MAGNET_DURATION: Duration = Duration::from_secs(8);
pub const RAPID_FIRE_DURATION: Duration = Duration::from_secs(8);
pub const SCATTER_SHOT_DURATION: Duration = Duration::from_secs(8);
pub const MAGNET_RADIUS_SQ: i32 = 9;
pub const BIG_CHEST_SCORE: i64 = 120;
pub const SMALL_CHEST_SCORE: i64 = 20;
pub const TRIMMER_SEGMENTS: usize = 3;

// Position bonuses for hard-to-reach food
pub const CORNER_BONUS: i64 = 100;
pub const EDGE_BONUS: i64 = 30;

// Base tick interval (~60 FPS) and per-difficulty move pacing, expressed as
// the number of base ticks between head moves.
pub const BASE_TICK: Duration = Duration::from_millis(16);
pub const LOW_TICKS: u32 = 18;
pub const MID_TICKS: u32 = 13;
pub const HIGH_TICKS: u32 = 9;
pub const LOW_BOOST_TICKS: u32 = 6;
pub const MID_BOOST_TICKS: u32 = 4;
pub const HIGH_BOOST_TICKS: u32 = 3;

// Boost key detection
pub const BOOST_TIMEOUT: Duration = Duration::from_millis(150);
pub const BOOST_THRESHOLD: u32 = 2;
pub const KEY_REPEAT_WINDOW: Duration = Duration::from_millis(200);

// Global admission cap
pub const MAX_PLAYERS: usize = 500;

pub fn fireball_ticks() -> u32 {
    (FIREBALL_SPEED.as_millis() / BASE_TICK.as_millis()).max(1) as u32
}
