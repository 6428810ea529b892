use super::constants::{CORNER_BONUS, EDGE_BONUS};
use super::types::{Food, FoodKind, Obstacle, Point, Prop};
use rand::Rng;
use std::time::{Duration, Instant};

/// Pause-adjusted age shared by foods, props and obstacles: time on the board
/// minus whatever portion of the global pause accumulated after the spawn.
/// The countdown therefore freezes while the game is paused regardless of
/// when the pause started relative to the spawn.
pub fn pause_adjusted_age(
    spawn_time: Instant,
    paused_at_spawn: Duration,
    now: Instant,
    pause_total: Duration,
) -> Duration {
    let elapsed = now.saturating_duration_since(spawn_time);
    let paused_since_spawn = pause_total.saturating_sub(paused_at_spawn);
    elapsed.saturating_sub(paused_since_spawn)
}

impl FoodKind {
    pub fn base_score(self) -> i64 {
        match self {
            FoodKind::Purple => 10,
            FoodKind::Blue => 20,
            FoodKind::Orange => 30,
            FoodKind::Red => 40,
        }
    }

    pub fn lifetime(self) -> Duration {
        match self {
            FoodKind::Purple => Duration::from_secs(20),
            FoodKind::Blue => Duration::from_secs(18),
            FoodKind::Orange => Duration::from_secs(15),
            FoodKind::Red => Duration::from_secs(10),
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            FoodKind::Purple => "🟣",
            FoodKind::Blue => "🔵",
            FoodKind::Orange => "🟠",
            FoodKind::Red => "🔴",
        }
    }

    /// Weighted draw: Red 15%, Orange 20%, Blue 25%, Purple 40%.
    pub fn sample(rng: &mut impl Rng) -> FoodKind {
        match rng.gen_range(0..100) {
            0..=14 => FoodKind::Red,
            15..=34 => FoodKind::Orange,
            35..=59 => FoodKind::Blue,
            _ => FoodKind::Purple,
        }
    }
}

/// Bonus for food parked in hard-to-reach cells: the four interior corners
/// pay +100, every other interior border cell pays +30.
pub fn position_bonus(pos: Point, width: i32, height: i32) -> i64 {
    let on_corner = (pos.x == 1 || pos.x == width - 2) && (pos.y == 1 || pos.y == height - 2);
    if on_corner {
        return CORNER_BONUS;
    }
    let on_edge = pos.x == 1 || pos.x == width - 2 || pos.y == 1 || pos.y == height - 2;
    if on_edge {
        return EDGE_BONUS;
    }
    0
}

pub fn bonus_message(pos: Point, width: i32, height: i32) -> Option<String> {
    match position_bonus(pos, width, height) {
        CORNER_BONUS => Some(format!("Corner challenge! +{CORNER_BONUS} bonus!")),
        EDGE_BONUS => Some(format!("Edge snack! +{EDGE_BONUS} bonus!")),
        _ => None,
    }
}

impl Food {
    pub fn total_score(&self, width: i32, height: i32) -> i64 {
        self.kind.base_score() + position_bonus(self.pos, width, height)
    }

    pub fn is_expired(&self, now: Instant, pause_total: Duration) -> bool {
        pause_adjusted_age(self.spawn_time, self.paused_at_spawn, now, pause_total)
            > self.kind.lifetime()
    }

    pub fn remaining_seconds(&self, now: Instant, pause_total: Duration) -> i64 {
        let age = pause_adjusted_age(self.spawn_time, self.paused_at_spawn, now, pause_total);
        self.kind.lifetime().saturating_sub(age).as_secs() as i64
    }
}

impl Prop {
    pub fn is_expired(&self, now: Instant, pause_total: Duration) -> bool {
        pause_adjusted_age(self.spawn_time, self.paused_at_spawn, now, pause_total)
            > super::constants::PROP_DURATION
    }

    pub fn remaining_seconds(&self, now: Instant, pause_total: Duration) -> i64 {
        let age = pause_adjusted_age(self.spawn_time, self.paused_at_spawn, now, pause_total);
        super::constants::PROP_DURATION.saturating_sub(age).as_secs() as i64
    }
}

impl Obstacle {
    pub fn is_expired(&self, now: Instant, pause_total: Duration) -> bool {
        pause_adjusted_age(self.spawn_time, self.paused_at_spawn, now, pause_total) > self.duration
    }

    pub fn remaining_seconds(&self, now: Instant, pause_total: Duration) -> i64 {
        let age = pause_adjusted_age(self.spawn_time, self.paused_at_spawn, now, pause_total);
        self.duration.saturating_sub(age).as_secs() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn red_food_at(pos: Point, spawned_secs_ago: u64) -> Food {
        Food {
            pos,
            kind: FoodKind::Red,
            spawn_time: Instant::now() - Duration::from_secs(spawned_secs_ago),
            paused_at_spawn: Duration::ZERO,
        }
    }

    #[test]
    fn countdown_runs_without_pause() {
        let food = red_food_at(Point::new(5, 5), 2);
        let remaining = food.remaining_seconds(Instant::now(), Duration::ZERO);
        assert!((7..=8).contains(&remaining), "got {remaining}");
    }

    #[test]
    fn countdown_freezes_while_paused() {
        // Two seconds of wall clock, all of it spent paused: the red food
        // should still have its full ten seconds.
        let food = red_food_at(Point::new(5, 5), 2);
        let remaining = food.remaining_seconds(Instant::now(), Duration::from_secs(2));
        assert!((9..=10).contains(&remaining), "got {remaining}");
    }

    #[test]
    fn pause_before_spawn_does_not_count() {
        // Spawned nine seconds ago while the game already carried five
        // seconds of pause. With no pause since spawn, one second remains.
        let mut food = red_food_at(Point::new(5, 5), 9);
        food.paused_at_spawn = Duration::from_secs(5);
        assert!(!food.is_expired(Instant::now(), Duration::from_secs(5)));

        // A fresh five-second pause after the spawn pushes it back to ~6s.
        let remaining = food.remaining_seconds(Instant::now(), Duration::from_secs(10));
        assert!((5..=6).contains(&remaining), "got {remaining}");
    }

    #[test]
    fn corner_and_edge_bonuses() {
        let (w, h) = (25, 25);
        for corner in [
            Point::new(1, 1),
            Point::new(23, 1),
            Point::new(1, 23),
            Point::new(23, 23),
        ] {
            assert_eq!(position_bonus(corner, w, h), CORNER_BONUS);
        }
        assert_eq!(position_bonus(Point::new(12, 1), w, h), EDGE_BONUS);
        assert_eq!(position_bonus(Point::new(1, 12), w, h), EDGE_BONUS);
        assert_eq!(position_bonus(Point::new(12, 12), w, h), 0);
        // Wall cells are never food cells, but the bonus is defined over the
        // interior only.
        assert_eq!(position_bonus(Point::new(2, 2), w, h), 0);
    }

    #[test]
    fn corner_eat_scores_base_plus_bonus() {
        let food = red_food_at(Point::new(23, 1), 0);
        assert_eq!(food.total_score(25, 25), 140);
    }

    #[test]
    fn kind_sampling_stays_in_distribution() {
        let mut rng = rand::thread_rng();
        let mut reds = 0usize;
        for _ in 0..2000 {
            if FoodKind::sample(&mut rng) == FoodKind::Red {
                reds += 1;
            }
        }
        // 15% nominal; accept a generous band to keep the test stable.
        assert!((150..=450).contains(&reds), "red count {reds}");
    }
}
