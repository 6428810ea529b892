use super::constants::{
    BODY_HIT_SCORE, FIREBALL_COOLDOWN, GAME_DURATION, HEADSHOT_SCORE, HEADSHOT_STUN,
    MAGNET_RADIUS_SQ, OBSTACLE_HIT_SCORE, STANDARD_HEIGHT, STANDARD_WIDTH,
};
use super::controller::{Brain, ManualInput};
use super::food::bonus_message;
use super::types::{
    Difficulty, EffectInfo, EffectKind, Fireball, FoodInfo, GameConfig, GameMode, GameSnapshot,
    ObstacleInfo, Player, Point, PropInfo, PlayerSnapshot, ScoreEvent, LEFT, RIGHT,
};
use crate::inference::InferenceHandle;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Authoritative state of one running game. A solo session owns its game
/// exclusively; in PVP the match owns it and both sessions hold a shared
/// handle. All mutation goes through the owning driver's tick loop.
#[derive(Debug)]
pub struct Game {
    pub width: i32,
    pub height: i32,
    pub players: Vec<Player>,
    pub foods: Vec<super::types::Food>,
    pub props: Vec<super::types::Prop>,
    pub obstacles: Vec<super::types::Obstacle>,
    pub fireballs: Vec<Fireball>,
    pub hit_points: Vec<Point>,
    pub score_events: Vec<ScoreEvent>,
    pub paused: bool,
    pub game_over: bool,
    pub winner: String,
    pub mode: GameMode,
    pub is_pvp: bool,
    pub berserker: bool,
    pub auto_play: bool,
    pub timer_started: bool,
    pub start_time: Instant,
    pub end_time: Option<Instant>,
    pub pause_start: Option<Instant>,
    pub accumulated_pause: Duration,
    pub last_food_spawn: Instant,
    pub last_obstacle_spawn: Instant,
    pub last_prop_spawn: Instant,
    pub message: Option<String>,
    pub message_type: Option<String>,
    pub crash_point: Option<Point>,
    /// Score at the previous recorded step, for reward deltas.
    pub last_score: i64,
    pub inference: Option<InferenceHandle>,
}

impl Game {
    pub fn new(width: i32, height: i32, inference: Option<InferenceHandle>) -> Self {
        let now = Instant::now();
        let center = Point::new(width / 2, height / 2);
        let mut game = Self {
            width,
            height,
            players: vec![Player::new(
                "Player 1",
                center,
                RIGHT,
                Brain::Manual(Arc::new(ManualInput::new())),
            )],
            foods: Vec::new(),
            props: Vec::new(),
            obstacles: Vec::new(),
            fireballs: Vec::new(),
            hit_points: Vec::new(),
            score_events: Vec::new(),
            paused: false,
            game_over: false,
            winner: String::new(),
            mode: GameMode::Battle,
            is_pvp: false,
            berserker: false,
            auto_play: false,
            timer_started: false,
            start_time: now,
            end_time: None,
            pause_start: None,
            accumulated_pause: Duration::ZERO,
            last_food_spawn: now,
            last_obstacle_spawn: now,
            last_prop_spawn: now,
            message: None,
            message_type: None,
            crash_point: None,
            last_score: 0,
            inference,
        };
        game.add_rival();
        game.spawn_one_food();
        game
    }

    /// Shared game for a matched pair: standard board, both seats manual,
    /// seeded at opposite thirds facing each other, paused for the countdown.
    pub fn new_pvp(p1_name: &str, p2_name: &str) -> Self {
        let mut game = Self::new(STANDARD_WIDTH, STANDARD_HEIGHT, None);
        game.mode = GameMode::Pvp;
        game.is_pvp = true;
        game.paused = true;
        let (w, h) = (game.width, game.height);
        game.players = vec![
            Player::new(
                p1_name,
                Point::new(w / 4, h / 3),
                RIGHT,
                Brain::Manual(Arc::new(ManualInput::new())),
            ),
            Player::new(
                p2_name,
                Point::new(w * 3 / 4, h * 2 / 3),
                LEFT,
                Brain::Manual(Arc::new(ManualInput::new())),
            ),
        ];
        game
    }

    /// Brain for a server-controlled snake: the learned policy when the
    /// service is up and the board matches its training size, otherwise the
    /// flood-fill planner.
    pub fn bot_brain(&self) -> Brain {
        match &self.inference {
            Some(handle) if self.width == STANDARD_WIDTH && self.height == STANDARD_HEIGHT => {
                Brain::Neural(handle.clone())
            }
            _ => Brain::Heuristic,
        }
    }

    /// Adds the rival snake for battle mode if the seat is empty.
    pub fn add_rival(&mut self) {
        if self.players.len() >= 2 {
            return;
        }
        let origin = Point::new(self.width - 2, self.height - 2);
        let brain = self.bot_brain();
        self.players.push(Player::new("AI", origin, LEFT, brain));
    }

    pub fn remove_rival(&mut self) {
        self.players.truncate(1);
    }

    // --- Tick kernel -------------------------------------------------------

    /// One full logical step: clears the transient output buffers, advances
    /// every player in index order, then runs the periodic world updates.
    /// The session/match drivers pace players individually instead and call
    /// the pieces directly.
    pub async fn advance(&mut self) {
        if self.game_over || self.paused {
            return;
        }
        self.hit_points.clear();
        self.score_events.clear();
        for idx in 0..self.players.len() {
            self.update_player(idx).await;
        }
        self.update_world();
    }

    /// Advances a single player by one move: controller decision, direction
    /// commit (180-degree turns rejected here, at commit time), collision
    /// resolution, movement, eating and prop pickup.
    pub async fn update_player(&mut self, idx: usize) {
        if idx >= self.players.len() {
            return;
        }
        if self.game_over {
            self.check_contested_finish(idx);
            return;
        }
        let now = Instant::now();
        {
            let player = &mut self.players[idx];
            player.stunned = player.stunned_until.is_some_and(|until| now < until);
            if player.stunned {
                return;
            }
        }

        let brain = self.players[idx].brain.clone();
        let action = brain.next_action(self, idx).await;
        {
            let player = &mut self.players[idx];
            if action.dir != Point::default() && !player.last_move_dir.is_opposite(action.dir) {
                player.dir = action.dir;
            }
            player.boosting = action.boost;
        }
        if action.fire {
            self.fire(idx);
        }

        let (head, dir) = {
            let player = &mut self.players[idx];
            player.last_move_dir = player.dir;
            let Some(head) = player.head() else { return };
            (head, player.dir)
        };
        let next_head = head.step(dir);

        if self.check_collision(next_head, idx) {
            if self.players[idx].consume_shield() {
                let name = self.players[idx].name.clone();
                self.set_message_with_type(format!("{name}'s shield absorbed the hit!"), "important");
                return; // the move is skipped; the snake stays put this tick
            }
            self.handle_crash(idx, next_head);
            return;
        }

        self.players[idx].body.insert(0, next_head);
        let ate = self.handle_food_collision(next_head, idx);
        if !ate {
            self.players[idx].body.pop();
            if self.players[idx].has_effect(EffectKind::Magnet) {
                self.magnet_sweep(idx, next_head);
            }
        }
        self.handle_prop_collision(next_head, idx);
    }

    /// Periodic world maintenance: spawns, the match clock, effect decay.
    pub fn update_world(&mut self) {
        if self.game_over {
            return;
        }
        self.try_spawn_food();
        self.try_spawn_prop();
        self.try_spawn_obstacle();
        self.check_time_limit();
        self.decay_effects();
    }

    fn decay_effects(&mut self) {
        let now = Instant::now();
        for player in &mut self.players {
            player.drop_expired_effects(now);
        }
    }

    // --- Collisions --------------------------------------------------------

    /// Collision test for the prospective head cell of player `idx`.
    pub fn check_collision(&self, pos: Point, idx: usize) -> bool {
        if pos.x <= 0 || pos.x >= self.width - 1 || pos.y <= 0 || pos.y >= self.height - 1 {
            return true;
        }
        for (pi, player) in self.players.iter().enumerate() {
            let len = player.body.len();
            for (si, segment) in player.body.iter().enumerate() {
                if *segment != pos {
                    continue;
                }
                // Own tail vacates the cell this tick.
                if pi == idx && si == len - 1 && len > 1 {
                    continue;
                }
                // Berserker mode lets heads contest the same cell.
                if self.berserker && pi != idx && si == 0 && !player.stunned {
                    continue;
                }
                return true;
            }
        }
        self.obstacles
            .iter()
            .any(|obstacle| obstacle.points.contains(&pos))
    }

    /// Planner-facing safety check: walls, every snake segment, obstacles.
    pub fn is_safe(&self, pos: Point) -> bool {
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
        !self
            .obstacles
            .iter()
            .any(|obstacle| obstacle.points.contains(&pos))
    }

    fn handle_crash(&mut self, idx: usize, crash_point: Point) {
        let now = Instant::now();
        if self.is_pvp {
            self.game_over = true;
            self.end_time = Some(now);
            self.crash_point = Some(crash_point);
            self.winner = if idx == 0 { "ai" } else { "player" }.to_string();
            tracing::info!(crashed = idx, winner = %self.winner, "pvp crash");
            return;
        }
        if idx == 0 {
            self.game_over = true;
            self.end_time = Some(now);
            self.crash_point = Some(crash_point);
            self.winner = match self.mode {
                GameMode::Zen => "none",
                _ => "ai",
            }
            .to_string();
            return;
        }
        // The solo rival just respawns at its seed corner.
        let player = &mut self.players[idx];
        player.body = vec![player.origin];
        player.dir = LEFT;
        player.last_move_dir = LEFT;
        self.set_message("The rival snake crashed and respawned!");
    }

    /// Called when a player's update lands on a tick where the opponent has
    /// already crashed. If this head's pending move would also crash, the
    /// round is a draw. Time-limit endings are left untouched.
    fn check_contested_finish(&mut self, idx: usize) {
        if !self.is_pvp || self.winner == "draw" || self.crash_point.is_none() {
            return;
        }
        let Some(head) = self.players.get(idx).and_then(Player::head) else {
            return;
        };
        let next_head = head.step(self.players[idx].dir);
        if self.check_collision(next_head, idx) {
            self.winner = "draw".to_string();
            self.set_message_with_type("Double crash! It's a draw!", "important");
        }
    }

    // --- Eating ------------------------------------------------------------

    fn handle_food_collision(&mut self, pos: Point, idx: usize) -> bool {
        let Some(food_index) = self.foods.iter().position(|food| food.pos == pos) else {
            return false;
        };
        self.consume_food(food_index, pos, idx);
        true
    }

    fn consume_food(&mut self, food_index: usize, pos: Point, idx: usize) {
        let total = self.foods[food_index].total_score(self.width, self.height);
        self.foods.remove(food_index);

        let player = &mut self.players[idx];
        player.score += total;
        player.foods_eaten += 1;

        if idx == 0 {
            if let Some(message) = bonus_message(pos, self.width, self.height) {
                self.set_message_with_type(message, "bonus");
            }
        }
        self.score_events.push(ScoreEvent {
            pos,
            amount: total,
            label: format!("+{total}"),
        });
    }

    /// Magnet effect: when the move did not land on food, the first food
    /// within squared distance 9 of the new head is pulled in and eaten
    /// through the same scoring path.
    fn magnet_sweep(&mut self, idx: usize, head: Point) {
        let Some(food_index) = self
            .foods
            .iter()
            .position(|food| food.pos.distance_sq(head) <= MAGNET_RADIUS_SQ)
        else {
            return;
        };
        let pos = self.foods[food_index].pos;
        self.consume_food(food_index, pos, idx);
    }

    fn handle_prop_collision(&mut self, pos: Point, idx: usize) {
        let Some(prop_index) = self.props.iter().position(|prop| prop.pos == pos) else {
            return;
        };
        let kind = self.props[prop_index].kind;
        self.props.remove(prop_index);
        self.apply_prop(idx, kind, pos);
    }

    fn apply_prop(&mut self, idx: usize, kind: super::types::PropKind, pos: Point) {
        use super::types::PropKind;
        let name = self.players[idx].name.clone();
        if let Some((effect, duration)) = kind.effect() {
            self.players[idx].apply_effect(effect, duration);
            self.set_message(format!("{name} picked up {}!", kind.label()));
            return;
        }
        if let Some(amount) = kind.instant_score() {
            self.players[idx].score += amount;
            self.score_events.push(ScoreEvent {
                pos,
                amount,
                label: format!("+{amount}"),
            });
            self.set_message_with_type(format!("{name} opened a {}!", kind.label()), "bonus");
            return;
        }
        if kind == PropKind::Trimmer {
            let player = &mut self.players[idx];
            if player.body.len() > 5 {
                let new_len = player.body.len() - super::constants::TRIMMER_SEGMENTS;
                player.body.truncate(new_len);
                self.set_message(format!("{name} got trimmed by 3 segments!"));
            }
        }
    }

    // --- Fireballs ---------------------------------------------------------

    /// Spawns a fireball at the player's head. Rejected while stunned, with
    /// an empty body, or inside the cooldown window (halved by RapidFire).
    /// ScatterShot adds two diagonal projectiles orthogonal to the shot axis.
    pub fn fire(&mut self, idx: usize) {
        if self.game_over || self.paused {
            return;
        }
        let Some(player) = self.players.get(idx) else {
            return;
        };
        if player.stunned || player.body.is_empty() {
            return;
        }
        let now = Instant::now();
        let mut cooldown = FIREBALL_COOLDOWN;
        if player.has_effect(EffectKind::RapidFire) {
            cooldown /= 2;
        }
        if let Some(last) = player.last_fire_at {
            if now.duration_since(last) < cooldown {
                return;
            }
        }
        let head = player.body[0];
        let dir = player.dir;
        let scatter = player.has_effect(EffectKind::ScatterShot);

        self.fireballs.push(Fireball {
            pos: head,
            dir,
            owner: idx,
        });
        if scatter {
            for extra_dir in scatter_dirs(dir) {
                self.fireballs.push(Fireball {
                    pos: head,
                    dir: extra_dir,
                    owner: idx,
                });
            }
        }
        self.players[idx].last_fire_at = Some(now);
    }

    /// Steps every fireball (twice when the owner has RapidFire) and resolves
    /// wall, snake and obstacle hits.
    pub fn update_fireballs(&mut self) {
        if self.paused || self.game_over {
            return;
        }
        let fireballs = std::mem::take(&mut self.fireballs);
        let mut survivors = Vec::with_capacity(fireballs.len());
        for mut fireball in fireballs {
            let steps = if self
                .players
                .get(fireball.owner)
                .is_some_and(|player| player.has_effect(EffectKind::RapidFire))
            {
                2
            } else {
                1
            };
            let mut hit = false;
            for _ in 0..steps {
                fireball.pos = fireball.pos.step(fireball.dir);
                if self.resolve_fireball_hit(&fireball) {
                    hit = true;
                    break;
                }
            }
            if !hit {
                survivors.push(fireball);
            }
        }
        self.fireballs = survivors;
    }

    fn resolve_fireball_hit(&mut self, fireball: &Fireball) -> bool {
        let pos = fireball.pos;
        if pos.x <= 0 || pos.x >= self.width - 1 || pos.y <= 0 || pos.y >= self.height - 1 {
            self.hit_points.push(pos);
            return true;
        }

        let mut victim: Option<(usize, usize)> = None;
        for (pi, player) in self.players.iter().enumerate() {
            if let Some(si) = player.body.iter().position(|segment| *segment == pos) {
                // A projectile never hits its owner's own head on the way out.
                if pi == fireball.owner && si == 0 {
                    continue;
                }
                victim = Some((pi, si));
                break;
            }
        }
        if let Some((pi, si)) = victim {
            self.hit_points.push(pos);
            let (amount, label) = if si == 0 {
                let target = &mut self.players[pi];
                target.stunned_until = Some(Instant::now() + HEADSHOT_STUN);
                target.stunned = true;
                if pi == 0 {
                    self.set_message_with_type("Headshot! Stunned for 2 seconds!", "important");
                }
                (HEADSHOT_SCORE, format!("HEADSHOT +{HEADSHOT_SCORE}"))
            } else {
                let target = &mut self.players[pi];
                if target.body.len() > 2 {
                    target.body.pop();
                }
                (BODY_HIT_SCORE, format!("HIT +{BODY_HIT_SCORE}"))
            };
            if let Some(attacker) = self.players.get_mut(fireball.owner) {
                attacker.score += amount;
            }
            self.score_events.push(ScoreEvent { pos, amount, label });
            return true;
        }

        for obstacle in &mut self.obstacles {
            if let Some(oi) = obstacle.points.iter().position(|point| *point == pos) {
                obstacle.points.remove(oi);
                self.hit_points.push(pos);
                if let Some(attacker) = self.players.get_mut(fireball.owner) {
                    attacker.score += OBSTACLE_HIT_SCORE;
                }
                self.score_events.push(ScoreEvent {
                    pos,
                    amount: OBSTACLE_HIT_SCORE,
                    label: format!("+{OBSTACLE_HIT_SCORE}"),
                });
                return true;
            }
        }
        false
    }

    // --- Clock and pause ---------------------------------------------------

    pub fn toggle_pause(&mut self) {
        if self.game_over {
            return;
        }
        if self.paused {
            if let Some(start) = self.pause_start.take() {
                self.accumulated_pause += start.elapsed();
            }
        } else {
            self.pause_start = Some(Instant::now());
        }
        self.paused = !self.paused;
    }

    /// Total paused time including the currently running pause, clamped at
    /// the game end once it is over.
    pub fn total_paused(&self) -> Duration {
        let mut total = self.accumulated_pause;
        if self.paused {
            if let Some(start) = self.pause_start {
                let end = match (self.game_over, self.end_time) {
                    (true, Some(end_time)) => end_time,
                    _ => Instant::now(),
                };
                total += end.saturating_duration_since(start);
            }
        }
        total
    }

    pub fn check_time_limit(&mut self) {
        if self.mode == GameMode::Zen || self.game_over || !self.timer_started {
            return;
        }
        let elapsed = Instant::now()
            .saturating_duration_since(self.start_time)
            .saturating_sub(self.total_paused());
        if elapsed < GAME_DURATION {
            return;
        }
        self.game_over = true;
        self.end_time = Some(Instant::now());
        self.winner = if self.players.len() >= 2 {
            let s1 = self.players[0].score;
            let s2 = self.players[1].score;
            match s1.cmp(&s2) {
                std::cmp::Ordering::Greater => "player",
                std::cmp::Ordering::Less => "ai",
                std::cmp::Ordering::Equal => "draw",
            }
        } else {
            "none"
        }
        .to_string();
        tracing::info!(winner = %self.winner, "time limit reached");
    }

    pub fn time_remaining(&self) -> i64 {
        if !self.timer_started {
            return GAME_DURATION.as_secs() as i64;
        }
        let end = match (self.game_over, self.end_time) {
            (true, Some(end_time)) => end_time,
            _ => Instant::now(),
        };
        let elapsed = end
            .saturating_duration_since(self.start_time)
            .saturating_sub(self.total_paused());
        GAME_DURATION.saturating_sub(elapsed).as_secs() as i64
    }

    /// Player 1's foods per non-paused second.
    pub fn eating_speed(&self) -> f64 {
        let Some(player) = self.players.first() else {
            return 0.0;
        };
        let end = match (self.game_over, self.end_time) {
            (true, Some(end_time)) => end_time,
            _ => Instant::now(),
        };
        let elapsed = end
            .saturating_duration_since(self.start_time)
            .saturating_sub(self.total_paused());
        if elapsed.as_secs_f64() > 0.0 {
            player.foods_eaten as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    // --- Mode and input mutations ------------------------------------------

    /// Commits a direction change for a player, rejecting 180-degree turns
    /// against the last performed move. Returns whether the direction
    /// actually changed.
    pub fn set_player_direction(&mut self, idx: usize, new_dir: Point) -> bool {
        let Some(player) = self.players.get_mut(idx) else {
            return false;
        };
        let compare = if player.last_move_dir == Point::default() {
            player.dir
        } else {
            player.last_move_dir
        };
        if compare.is_opposite(new_dir) {
            return false;
        }
        if player.dir != new_dir {
            player.dir = new_dir;
            return true;
        }
        false
    }

    pub fn toggle_berserker(&mut self) {
        self.berserker = !self.berserker;
        if self.berserker {
            self.set_message_with_type("Berserker mode: ON!", "important");
        } else {
            self.set_message("Berserker mode: off");
        }
    }

    /// Cycles a seat between manual control and a server brain. A concrete
    /// `requested` of "neural" or "heuristic" switches agents in place; with
    /// the seat already automated and no request, it reverts to manual.
    pub fn toggle_player_auto(&mut self, idx: usize, requested: Option<&str>) {
        let Some(player) = self.players.get(idx) else {
            return;
        };
        let current = player.brain.kind();
        let switching = current != "manual"
            && requested.is_some_and(|mode| !mode.is_empty() && mode != current);

        if current == "manual" || switching {
            let wants_neural = match requested {
                Some(mode) => mode == "neural",
                None => true,
            };
            let name = self.players[idx].name.clone();
            match self.bot_brain() {
                Brain::Neural(handle) if wants_neural => {
                    self.players[idx].brain = Brain::Neural(handle);
                    self.set_message(format!("{name}: policy network engaged"));
                }
                _ => {
                    // An `auto neural` request without a usable model silently
                    // downgrades to the planner.
                    self.players[idx].brain = Brain::Heuristic;
                    self.set_message(format!("{name}: heuristic planner engaged"));
                }
            }
        } else {
            let name = self.players[idx].name.clone();
            self.players[idx].brain = Brain::Manual(Arc::new(ManualInput::new()));
            self.players[idx].boosting = false;
            self.set_message(format!("{name}: manual control restored"));
        }

        if idx == 0 {
            self.auto_play = self.players[0].brain.kind() != "manual";
        }
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.set_message_with_type(message, "normal");
    }

    pub fn set_message_with_type(&mut self, message: impl Into<String>, kind: &str) {
        self.message = Some(message.into());
        self.message_type = Some(kind.to_string());
    }

    /// Clears the one-shot buffers after a snapshot has been sent.
    pub fn clear_transients(&mut self) {
        self.hit_points.clear();
        self.score_events.clear();
        self.message = None;
        self.message_type = None;
    }

    /// True when any player other than `idx` has TimeWarp active; the caller
    /// is slowed rather than the caster sped up.
    pub fn others_time_warp_active(&self, idx: usize) -> bool {
        self.players
            .iter()
            .enumerate()
            .any(|(i, player)| i != idx && player.has_effect(EffectKind::TimeWarp))
    }

    // --- Snapshots ---------------------------------------------------------

    pub fn snapshot(
        &self,
        started: bool,
        server_boosting: bool,
        difficulty: Difficulty,
    ) -> GameSnapshot {
        let now = Instant::now();
        let pause_total = self.total_paused();

        let players = self
            .players
            .iter()
            .map(|player| PlayerSnapshot {
                name: player.name.clone(),
                body: player.body.clone(),
                score: player.score,
                foods_eaten: player.foods_eaten,
                boosting: player.boosting,
                stunned: player.stunned_until.is_some_and(|until| now < until),
                controller: player.brain.kind(),
                effects: player
                    .effects
                    .iter()
                    .map(|effect| EffectInfo {
                        kind: effect.kind,
                        remaining_ms: effect
                            .expires_at
                            .saturating_duration_since(now)
                            .as_millis() as u64,
                    })
                    .collect(),
            })
            .collect();

        GameSnapshot {
            players,
            foods: self
                .foods
                .iter()
                .map(|food| FoodInfo {
                    pos: food.pos,
                    kind: food.kind,
                    remaining_seconds: food.remaining_seconds(now, pause_total),
                })
                .collect(),
            obstacles: self
                .obstacles
                .iter()
                .map(|obstacle| ObstacleInfo {
                    points: obstacle.points.clone(),
                    remaining_seconds: obstacle.remaining_seconds(now, pause_total),
                })
                .collect(),
            props: self
                .props
                .iter()
                .map(|prop| PropInfo {
                    pos: prop.pos,
                    kind: prop.kind,
                    remaining_seconds: prop.remaining_seconds(now, pause_total),
                })
                .collect(),
            fireballs: self.fireballs.clone(),
            hit_points: self.hit_points.clone(),
            score_events: self.score_events.clone(),
            score: self.players.first().map_or(0, |player| player.score),
            food_eaten: self.players.first().map_or(0, |player| player.foods_eaten),
            eating_speed: self.eating_speed(),
            started,
            game_over: self.game_over,
            paused: self.paused,
            boosting: self.players.first().map_or(false, |player| player.boosting)
                || server_boosting,
            auto_play: self.auto_play,
            difficulty,
            message: self.message.clone(),
            message_type: self.message_type.clone(),
            crash_point: if self.game_over { self.crash_point } else { None },
            time_remaining: self.time_remaining(),
            winner: self.winner.clone(),
            mode: self.mode,
            berserker: self.berserker,
            is_pvp: self.is_pvp,
        }
    }

    pub fn config(&self) -> GameConfig {
        GameConfig {
            width: self.width,
            height: self.height,
            game_duration: GAME_DURATION.as_secs(),
            fireball_cooldown: FIREBALL_COOLDOWN.as_millis() as u64,
        }
    }
}

fn scatter_dirs(dir: Point) -> [Point; 2] {
    if dir.x != 0 {
        [Point::new(dir.x, 1), Point::new(dir.x, -1)]
    } else {
        [Point::new(1, dir.y), Point::new(-1, dir.y)]
    }
}
