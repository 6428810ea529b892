use super::constants::{
    FOOD_SPAWN_INTERVAL, MAX_FOODS, MAX_OBSTACLES, MAX_PROPS, OBSTACLE_DURATION,
    OBSTACLE_SPAWN_INTERVAL, PROP_SPAWN_CHANCE, PROP_SPAWN_INTERVAL,
};
use super::game::Game;
use super::types::{Food, FoodKind, Obstacle, Point, Prop, PropKind, DOWN, LEFT, RIGHT, UP};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Instant;

const SPAWN_ATTEMPTS: usize = 100;
const OBSTACLE_SEED_ATTEMPTS: usize = 50;

impl Game {
    /// A cell is empty iff it is strictly interior and not occupied by any
    /// snake segment, food, prop or obstacle point.
    pub fn is_cell_empty(&self, pos: Point) -> bool {
        if pos.x <= 0 || pos.x >= self.width - 1 || pos.y <= 0 || pos.y >= self.height - 1 {
            return false;
        }
        if self
            .players
            .iter()
            .any(|player| player.body.contains(&pos))
        {
            return false;
        }
        if self.foods.iter().any(|food| food.pos == pos) {
            return false;
        }
        if self.props.iter().any(|prop| prop.pos == pos) {
            return false;
        }
        !self
            .obstacles
            .iter()
            .any(|obstacle| obstacle.points.contains(&pos))
    }

    fn random_interior_cell(&self, rng: &mut impl Rng) -> Point {
        Point::new(
            rng.gen_range(1..self.width - 1),
            rng.gen_range(1..self.height - 1),
        )
    }

    // --- Foods -------------------------------------------------------------

    /// Drops expired foods, then spawns one when the board is empty or the
    /// spawn interval has elapsed and the cap is not reached.
    pub fn try_spawn_food(&mut self) {
        if self.game_over {
            return;
        }
        self.remove_expired_foods();

        if self.foods.is_empty() {
            self.spawn_one_food();
            return;
        }
        if self.last_food_spawn.elapsed() > FOOD_SPAWN_INTERVAL && self.foods.len() < MAX_FOODS {
            self.spawn_one_food();
        }
    }

    pub(super) fn spawn_one_food(&mut self) {
        if self.foods.len() >= MAX_FOODS {
            return;
        }
        let mut rng = rand::thread_rng();
        let kind = FoodKind::sample(&mut rng);

        for _ in 0..SPAWN_ATTEMPTS {
            let pos = self.random_interior_cell(&mut rng);
            if !self.is_cell_empty(pos) {
                continue;
            }
            self.foods.push(Food {
                pos,
                kind,
                spawn_time: Instant::now(),
                paused_at_spawn: self.total_paused(),
            });
            self.last_food_spawn = Instant::now();
            return;
        }
    }

    fn remove_expired_foods(&mut self) {
        let now = Instant::now();
        let pause_total = self.total_paused();
        self.foods
            .retain(|food| !food.is_expired(now, pause_total));
    }

    // --- Obstacles ---------------------------------------------------------

    /// Drops obstacles that expired or were fully eroded by fireballs, then
    /// spawns a new cluster when the interval has elapsed under the cap.
    pub fn try_spawn_obstacle(&mut self) {
        if self.game_over {
            return;
        }
        let now = Instant::now();
        let pause_total = self.total_paused();
        self.obstacles
            .retain(|obstacle| !obstacle.points.is_empty() && !obstacle.is_expired(now, pause_total));

        if self.obstacles.len() < MAX_OBSTACLES
            && self.last_obstacle_spawn.elapsed() > OBSTACLE_SPAWN_INTERVAL
        {
            self.spawn_one_obstacle();
        }
    }

    /// Seeds a cluster on an empty interior cell and grows up to five more
    /// points by random walk into adjacent empty interior cells.
    fn spawn_one_obstacle(&mut self) {
        let mut rng = rand::thread_rng();
        let mut seed = None;
        for _ in 0..OBSTACLE_SEED_ATTEMPTS {
            let pos = Point::new(
                rng.gen_range(2..self.width - 2),
                rng.gen_range(2..self.height - 2),
            );
            if self.is_cell_empty(pos) {
                seed = Some(pos);
                break;
            }
        }
        let Some(seed) = seed else { return };

        let mut points = vec![seed];
        let target_len = rng.gen_range(1..=6);
        let mut dirs = [UP, DOWN, LEFT, RIGHT];
        while points.len() < target_len {
            let base = points[rng.gen_range(0..points.len())];
            dirs.shuffle(&mut rng);
            let mut grown = false;
            for dir in dirs {
                let next = base.step(dir);
                let inside = next.x > 1
                    && next.x < self.width - 2
                    && next.y > 1
                    && next.y < self.height - 2;
                if inside && self.is_cell_empty(next) && !points.contains(&next) {
                    points.push(next);
                    grown = true;
                    break;
                }
            }
            if !grown {
                break;
            }
        }

        self.obstacles.push(Obstacle {
            points,
            spawn_time: Instant::now(),
            duration: OBSTACLE_DURATION,
            paused_at_spawn: self.total_paused(),
        });
        self.last_obstacle_spawn = Instant::now();
    }

    // --- Props -------------------------------------------------------------

    /// Each spawn opportunity fires at PROP_SPAWN_INTERVAL with a 20% chance.
    pub fn try_spawn_prop(&mut self) {
        if self.game_over {
            return;
        }
        let now = Instant::now();
        let pause_total = self.total_paused();
        self.props
            .retain(|prop| !prop.is_expired(now, pause_total));

        if self.props.len() >= MAX_PROPS
            || self.last_prop_spawn.elapsed() <= PROP_SPAWN_INTERVAL
        {
            return;
        }
        let mut rng = rand::thread_rng();
        // The opportunity is spent whether or not the roll succeeds.
        self.last_prop_spawn = Instant::now();
        if !rng.gen_bool(PROP_SPAWN_CHANCE) {
            return;
        }

        let kind = *PropKind::ALL
            .choose(&mut rng)
            .unwrap_or(&PropKind::SmallChest);
        for _ in 0..SPAWN_ATTEMPTS {
            let pos = self.random_interior_cell(&mut rng);
            if !self.is_cell_empty(pos) {
                continue;
            }
            self.props.push(Prop {
                pos,
                kind,
                spawn_time: Instant::now(),
                paused_at_spawn: self.total_paused(),
            });
            return;
        }
    }
}
