use super::constants::BASE_TICK;
use super::game::Game;
use super::types::{Difficulty, Point, DOWN, LEFT, RIGHT, UP};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashSet, VecDeque};
use std::time::Instant;

/// Flood fill budget; past this many cells the area is "open enough".
const FLOOD_FILL_LIMIT: usize = 400;
/// Stand-in target value for props, which carry no score of their own.
const PROP_TARGET_VALUE: f64 = 80.0;
/// How far ahead the firing ray looks.
const FIRE_RANGE: i32 = 8;
/// Competitors this close to the same target trigger a boost race.
const COMPETE_DISTANCE: i32 = 8;

#[derive(Debug, Clone, Copy)]
struct Target {
    pos: Point,
    /// Move-feasibility verdict that doubles as the boost recommendation.
    needs_boost: bool,
}

/// Flood-fill planner: picks a target by utility, scores each legal
/// direction by open space and target distance, and recommends boosting
/// when racing the clock or a competitor.
pub fn calculate_best_move(game: &Game, idx: usize) -> (Point, bool) {
    let Some(head) = game.players.get(idx).and_then(|player| player.head()) else {
        return (RIGHT, false);
    };
    let last_move_dir = game.players[idx].last_move_dir;

    let Some(target) = pick_target(game, head) else {
        return (last_move_dir, false);
    };
    let mut boost = target.needs_boost;

    let mut rng = rand::thread_rng();
    let mut candidates = [UP, DOWN, LEFT, RIGHT];
    candidates.shuffle(&mut rng);

    let body_len = game.players[idx].body.len();
    let mut best_dir = last_move_dir;
    let mut best_score = f64::MIN;

    for dir in candidates {
        if last_move_dir.is_opposite(dir) {
            continue;
        }
        let next = head.step(dir);
        if !game.is_safe(next) || near_enemy_head(game, idx, next) {
            continue;
        }

        let space = reachable_space(game, idx, next);
        let mut score = space as f64 * 50.0;
        if space < body_len {
            score -= 5000.0;
        }

        let dist_to_target = target.pos.manhattan(next) as f64;
        score += (100.0 - dist_to_target) * 2.0;
        if next == target.pos {
            score += 1000.0;
        }

        // Tight on space: chase the tail, harder the tighter it gets.
        let survival_threshold = body_len + 10;
        if space < survival_threshold {
            if let Some(tail) = game.players[idx].tail() {
                let dist_to_tail = tail.manhattan(next) as f64;
                let urgency = (survival_threshold - space) as f64;
                score += (100.0 - dist_to_tail) * urgency * 0.5;
            }
        }

        if score > best_score {
            best_score = score;
            best_dir = dir;
        }
    }

    if competitor_near_target(game, idx, target.pos) {
        boost = true;
    }
    if game.berserker && !boost && head.manhattan(target.pos) > 10 && rng.gen_bool(0.2) {
        boost = true;
    }

    (best_dir, boost)
}

/// Picks the food or prop with the best value-per-distance, skipping foods
/// that cannot be reached before they rot even under boost (as long as any
/// alternative exists).
fn pick_target(game: &Game, head: Point) -> Option<Target> {
    let now = Instant::now();
    let pause_total = game.total_paused();
    let normal_secs = move_interval_secs(Difficulty::Mid, false);
    let boost_secs = move_interval_secs(Difficulty::Mid, true);

    let mut best: Option<Target> = None;
    let mut best_utility = f64::MIN;

    for food in &game.foods {
        let dist = (food.pos.manhattan(head).max(1)) as f64;
        let remaining = food.remaining_seconds(now, pause_total) as f64;
        if dist * boost_secs > remaining && game.foods.len() > 1 {
            continue;
        }
        let utility = food.total_score(game.width, game.height) as f64 / dist;
        if utility > best_utility {
            best_utility = utility;
            best = Some(Target {
                pos: food.pos,
                needs_boost: dist * normal_secs > remaining,
            });
        }
    }

    for prop in &game.props {
        let dist = (prop.pos.manhattan(head).max(1)) as f64;
        let utility = PROP_TARGET_VALUE / dist;
        if utility > best_utility {
            best_utility = utility;
            best = Some(Target {
                pos: prop.pos,
                needs_boost: false,
            });
        }
    }

    best
}

fn move_interval_secs(difficulty: Difficulty, boosted: bool) -> f64 {
    let ticks = if boosted {
        difficulty.boost_ticks()
    } else {
        difficulty.ticks()
    };
    BASE_TICK.as_secs_f64() * ticks as f64
}

fn competitor_near_target(game: &Game, idx: usize, target: Point) -> bool {
    let Some(my_head) = game.players.get(idx).and_then(|player| player.head()) else {
        return false;
    };
    if my_head.manhattan(target) >= COMPETE_DISTANCE {
        return false;
    }
    game.players.iter().enumerate().any(|(i, player)| {
        i != idx
            && player
                .head()
                .is_some_and(|head| head.manhattan(target) < COMPETE_DISTANCE)
    })
}

/// Cells adjacent to (or on) a live enemy head are treated as unsafe: that
/// head moves this tick too. Berserker mode drops the caution.
fn near_enemy_head(game: &Game, idx: usize, pos: Point) -> bool {
    if game.berserker {
        return false;
    }
    game.players.iter().enumerate().any(|(i, player)| {
        i != idx
            && !player.stunned
            && player
                .head()
                .is_some_and(|head| head.manhattan(pos) <= 1)
    })
}

/// Bounded flood fill from `start`, counting cells a snake could still
/// occupy. Tails count as walkable since they vacate their cells; enemy
/// head neighborhoods stay excluded outside berserker mode.
pub fn reachable_space(game: &Game, idx: usize, start: Point) -> usize {
    let mut occupied: HashSet<Point> = HashSet::new();
    let mut tails: HashSet<Point> = HashSet::new();
    for player in &game.players {
        for segment in &player.body {
            occupied.insert(*segment);
        }
        if player.body.len() > 1 {
            if let Some(tail) = player.tail() {
                tails.insert(tail);
            }
        }
    }

    let mut visited: HashSet<Point> = HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);
    let mut count = 0usize;

    while let Some(current) = queue.pop_front() {
        count += 1;
        if count > FLOOD_FILL_LIMIT {
            return count;
        }
        for dir in [UP, DOWN, LEFT, RIGHT] {
            let next = current.step(dir);
            if next.x <= 0
                || next.x >= game.width - 1
                || next.y <= 0
                || next.y >= game.height - 1
            {
                continue;
            }
            if occupied.contains(&next) && !tails.contains(&next) {
                continue;
            }
            if near_enemy_head(game, idx, next) {
                continue;
            }
            if game
                .obstacles
                .iter()
                .any(|obstacle| obstacle.points.contains(&next))
            {
                continue;
            }
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    count
}

/// True when a straight ray of up to eight cells ahead meets an obstacle
/// point or an enemy segment. The ray stops at walls, and at food so a shot
/// never wastes a snack.
pub fn should_fire(game: &Game, idx: usize, dir: Point) -> bool {
    let Some(head) = game.players.get(idx).and_then(|player| player.head()) else {
        return false;
    };
    if dir == Point::default() {
        return false;
    }
    for dist in 1..=FIRE_RANGE {
        let look = Point::new(head.x + dir.x * dist, head.y + dir.y * dist);
        if look.x <= 0 || look.x >= game.width - 1 || look.y <= 0 || look.y >= game.height - 1 {
            return false;
        }
        if game
            .obstacles
            .iter()
            .any(|obstacle| obstacle.points.contains(&look))
        {
            return true;
        }
        if game
            .players
            .iter()
            .enumerate()
            .any(|(i, player)| i != idx && player.body.contains(&look))
        {
            return true;
        }
        if game.foods.iter().any(|food| food.pos == look) {
            return false;
        }
    }
    false
}

/// 6-channel board-sized feature grid for the policy network, in absolute
/// coordinates: own head, own body, enemy heads, enemy bodies, food, and
/// hazards (border walls, obstacle points, fireballs).
pub fn feature_grid(game: &Game, idx: usize) -> Vec<f32> {
    let width = game.width as usize;
    let height = game.height as usize;
    let size = width * height;
    let mut grid = vec![0f32; 6 * size];

    fn set(grid: &mut [f32], size: usize, width: usize, channel: usize, pos: Point) {
        if pos.x < 0 || pos.y < 0 {
            return;
        }
        let (x, y) = (pos.x as usize, pos.y as usize);
        if x < width && y * width + x < size {
            grid[channel * size + y * width + x] = 1.0;
        }
    }

    for (pi, player) in game.players.iter().enumerate() {
        let (head_channel, body_channel) = if pi == idx { (0, 1) } else { (2, 3) };
        if let Some(head) = player.head() {
            set(&mut grid, size, width, head_channel, head);
        }
        for segment in player.body.iter().skip(1) {
            set(&mut grid, size, width, body_channel, *segment);
        }
    }
    for food in &game.foods {
        set(&mut grid, size, width, 4, food.pos);
    }
    for x in 0..game.width {
        set(&mut grid, size, width, 5, Point::new(x, 0));
        set(&mut grid, size, width, 5, Point::new(x, game.height - 1));
    }
    for y in 0..game.height {
        set(&mut grid, size, width, 5, Point::new(0, y));
        set(&mut grid, size, width, 5, Point::new(game.width - 1, y));
    }
    for obstacle in &game.obstacles {
        for point in &obstacle.points {
            set(&mut grid, size, width, 5, *point);
        }
    }
    for fireball in &game.fireballs {
        set(&mut grid, size, width, 5, fireball.pos);
    }

    grid
}

/// Maps an argmax index over the policy head to a direction. Order is
/// up, down, left, right, matching the training labels.
pub fn logit_direction(index: usize) -> Point {
    match index {
        0 => UP,
        1 => DOWN,
        2 => LEFT,
        _ => RIGHT,
    }
}
