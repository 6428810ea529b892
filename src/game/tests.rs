use super::constants::{GAME_DURATION, STANDARD_HEIGHT, STANDARD_WIDTH};
use super::controller::Brain;
use super::game::Game;
use super::types::{
    EffectKind, Food, FoodKind, GameMode, Obstacle, Point, Prop, PropKind, DOWN, LEFT, RIGHT, UP,
};
use std::time::{Duration, Instant};

fn solo_game() -> Game {
    let mut game = Game::new(STANDARD_WIDTH, STANDARD_HEIGHT, None);
    game.mode = GameMode::Zen;
    game.remove_rival();
    game.foods.clear();
    game
}

fn battle_game() -> Game {
    let mut game = Game::new(STANDARD_WIDTH, STANDARD_HEIGHT, None);
    game.foods.clear();
    game
}

fn place_food(game: &mut Game, pos: Point, kind: FoodKind) {
    game.foods.push(Food {
        pos,
        kind,
        spawn_time: Instant::now(),
        paused_at_spawn: game.total_paused(),
    });
}

fn place_prop(game: &mut Game, pos: Point, kind: PropKind) {
    game.props.push(Prop {
        pos,
        kind,
        spawn_time: Instant::now(),
        paused_at_spawn: game.total_paused(),
    });
}

fn place_obstacle(game: &mut Game, points: Vec<Point>) {
    game.obstacles.push(Obstacle {
        points,
        spawn_time: Instant::now(),
        duration: Duration::from_secs(30),
        paused_at_spawn: game.total_paused(),
    });
}

#[tokio::test]
async fn heuristic_drives_snake_to_corner_food() {
    let mut game = solo_game();
    game.players[0].body = vec![Point::new(12, 12)];
    game.players[0].dir = RIGHT;
    game.players[0].last_move_dir = RIGHT;
    game.players[0].brain = Brain::Heuristic;
    // Red food parked in the hardest cell on the board.
    place_food(&mut game, Point::new(23, 1), FoodKind::Red);

    let mut eaten_at_step = None;
    for step in 0..200 {
        game.update_player(0).await;
        if game.players[0].foods_eaten == 1 {
            eaten_at_step = Some(step);
            break;
        }
        assert!(!game.game_over, "planner crashed the snake at step {step}");
    }

    assert!(eaten_at_step.is_some(), "food never reached");
    assert_eq!(game.players[0].score, 140, "base 40 + corner 100");
    assert_eq!(game.players[0].foods_eaten, 1);
    assert!(game.foods.is_empty());
    let event = game
        .score_events
        .iter()
        .find(|event| event.pos == Point::new(23, 1))
        .expect("score event for the corner eat");
    assert_eq!(event.amount, 140);
    assert_eq!(event.label, "+140");
}

#[tokio::test]
async fn direction_commit_rejects_180_even_with_rapid_input() {
    let mut game = battle_game();
    // Moving right; an immediate left must be rejected.
    assert!(!game.set_player_direction(0, LEFT));
    // Up is fine, but a follow-up left before any move still reverses the
    // last performed move and must be rejected.
    assert!(game.set_player_direction(0, UP));
    assert!(!game.set_player_direction(0, LEFT));

    game.update_player(0).await;
    // After moving up, left becomes legal and down is the new reversal.
    assert!(game.set_player_direction(0, LEFT));
    assert!(!game.set_player_direction(0, DOWN));
}

#[test]
fn pause_toggle_is_idempotent_and_accumulates() {
    let mut game = battle_game();
    assert_eq!(game.total_paused(), Duration::ZERO);

    game.toggle_pause();
    assert!(game.paused);
    std::thread::sleep(Duration::from_millis(60));
    game.toggle_pause();
    assert!(!game.paused);

    let accumulated = game.accumulated_pause;
    assert!(accumulated >= Duration::from_millis(50));
    assert!(accumulated < Duration::from_millis(500));

    // Not paused: the accumulator must not move.
    std::thread::sleep(Duration::from_millis(20));
    assert_eq!(game.accumulated_pause, accumulated);
}

#[test]
fn pausing_freezes_food_timers_on_the_board() {
    let mut game = solo_game();
    place_food(&mut game, Point::new(5, 5), FoodKind::Red);
    game.foods[0].spawn_time = Instant::now() - Duration::from_secs(2);

    // Pretend the whole two seconds were spent paused.
    game.accumulated_pause = Duration::from_secs(2);
    let remaining =
        game.foods[0].remaining_seconds(Instant::now(), game.total_paused());
    assert!((9..=10).contains(&remaining), "got {remaining}");
}

#[tokio::test]
async fn fireball_headshot_stuns_and_scores() {
    let mut game = battle_game();
    game.players[0].body = vec![Point::new(5, 5)];
    game.players[0].dir = RIGHT;
    game.players[1].body = vec![Point::new(9, 5)];

    game.fire(0);
    assert_eq!(game.fireballs.len(), 1);

    for _ in 0..4 {
        game.update_fireballs();
    }

    assert!(game.fireballs.is_empty(), "projectile should be consumed");
    assert_eq!(game.players[0].score, 50);
    let victim = &game.players[1];
    assert!(victim
        .stunned_until
        .is_some_and(|until| until > Instant::now()));
    assert!(game.hit_points.contains(&Point::new(9, 5)));
    assert!(game
        .score_events
        .iter()
        .any(|event| event.label.contains("HEADSHOT")));
}

#[test]
fn fireball_body_hit_trims_victim_tail() {
    let mut game = battle_game();
    game.players[0].body = vec![Point::new(5, 5)];
    game.players[0].dir = RIGHT;
    game.players[1].body = vec![
        Point::new(7, 3),
        Point::new(7, 4),
        Point::new(7, 5),
        Point::new(7, 6),
    ];

    game.fire(0);
    game.update_fireballs(); // (6,5)
    game.update_fireballs(); // (7,5) -> body segment

    assert_eq!(game.players[0].score, 10);
    assert_eq!(game.players[1].body.len(), 3);
    assert!(game.hit_points.contains(&Point::new(7, 5)));
}

#[test]
fn fireball_at_border_hits_wall_on_next_step() {
    let mut game = solo_game();
    game.players[0].body = vec![Point::new(1, 12)];
    game.players[0].dir = LEFT;

    game.fire(0);
    game.update_fireballs();

    assert!(game.fireballs.is_empty());
    assert_eq!(game.hit_points, vec![Point::new(0, 12)]);
}

#[test]
fn fireball_erodes_obstacles_until_collected() {
    let mut game = solo_game();
    game.players[0].body = vec![Point::new(5, 5)];
    game.players[0].dir = RIGHT;
    place_obstacle(&mut game, vec![Point::new(7, 5)]);

    game.fire(0);
    game.update_fireballs();
    game.update_fireballs();

    assert_eq!(game.players[0].score, 10);
    assert!(game.obstacles[0].points.is_empty());

    // The empty shell is garbage collected by the next world pass.
    game.try_spawn_obstacle();
    assert!(game.obstacles.is_empty() || !game.obstacles[0].points.is_empty());
}

#[tokio::test]
async fn shield_absorbs_one_collision_and_skips_the_move() {
    let mut game = solo_game();
    game.players[0].body = vec![Point::new(1, 5), Point::new(2, 5)];
    game.players[0].dir = LEFT;
    game.players[0].last_move_dir = LEFT;
    game.players[0].apply_effect(EffectKind::Shield, Duration::from_secs(10));

    game.update_player(0).await;

    assert!(!game.game_over, "shield should absorb the wall hit");
    assert_eq!(game.players[0].body, vec![Point::new(1, 5), Point::new(2, 5)]);
    assert!(!game.players[0].has_effect(EffectKind::Shield));

    // Second collision with no shield left ends the game.
    game.update_player(0).await;
    assert!(game.game_over);
    assert_eq!(game.crash_point, Some(Point::new(0, 5)));
}

#[tokio::test]
async fn trimmer_prop_cuts_three_segments() {
    let mut game = solo_game();
    game.players[0].body = (0..8).map(|i| Point::new(10 - i, 5)).collect();
    game.players[0].dir = RIGHT;
    game.players[0].last_move_dir = RIGHT;
    place_prop(&mut game, Point::new(11, 5), PropKind::Trimmer);

    game.update_player(0).await;

    assert_eq!(game.players[0].body.len(), 5);
    assert!(game.props.is_empty());
}

#[tokio::test]
async fn small_trimmer_target_is_left_alone() {
    let mut game = solo_game();
    game.players[0].body = vec![Point::new(10, 5), Point::new(9, 5)];
    game.players[0].dir = RIGHT;
    game.players[0].last_move_dir = RIGHT;
    place_prop(&mut game, Point::new(11, 5), PropKind::Trimmer);

    game.update_player(0).await;

    assert_eq!(game.players[0].body.len(), 2);
}

#[tokio::test]
async fn magnet_pulls_nearby_food() {
    let mut game = solo_game();
    game.players[0].body = vec![Point::new(10, 10)];
    game.players[0].dir = RIGHT;
    game.players[0].last_move_dir = RIGHT;
    game.players[0].apply_effect(EffectKind::Magnet, Duration::from_secs(8));
    // Off the movement line but within squared distance 9 of the new head.
    place_food(&mut game, Point::new(12, 12), FoodKind::Purple);

    game.update_player(0).await;

    assert_eq!(game.players[0].foods_eaten, 1);
    assert_eq!(game.players[0].score, 10);
    assert!(game.foods.is_empty());
}

#[tokio::test]
async fn chest_props_pay_out_instantly() {
    let mut game = solo_game();
    game.players[0].body = vec![Point::new(10, 5)];
    game.players[0].dir = RIGHT;
    game.players[0].last_move_dir = RIGHT;
    place_prop(&mut game, Point::new(11, 5), PropKind::BigChest);

    game.update_player(0).await;

    assert_eq!(game.players[0].score, 120);
    assert!(game
        .score_events
        .iter()
        .any(|event| event.amount == 120 && event.label == "+120"));
}

#[test]
fn time_warp_slows_the_other_player_only() {
    let mut game = battle_game();
    game.players[1].apply_effect(EffectKind::TimeWarp, Duration::from_secs(6));
    assert!(game.others_time_warp_active(0));
    assert!(!game.others_time_warp_active(1));
}

#[test]
fn berserker_relaxes_head_on_collisions() {
    let mut game = battle_game();
    game.players[0].body = vec![Point::new(10, 5)];
    game.players[1].body = vec![Point::new(11, 5)];

    assert!(game.check_collision(Point::new(11, 5), 0));
    game.berserker = true;
    assert!(!game.check_collision(Point::new(11, 5), 0));
    // Body segments stay solid even in berserker mode.
    game.players[1].body.push(Point::new(12, 5));
    assert!(game.check_collision(Point::new(12, 5), 0));
}

#[test]
fn own_tail_is_walkable_while_it_moves_out() {
    let mut game = solo_game();
    game.players[0].body = vec![
        Point::new(10, 5),
        Point::new(10, 6),
        Point::new(11, 6),
        Point::new(11, 5),
    ];
    // The tail cell vacates this tick, so stepping onto it is legal.
    assert!(!game.check_collision(Point::new(11, 5), 0));
    // Any other segment is fatal.
    assert!(game.check_collision(Point::new(10, 6), 0));
}

#[test]
fn time_limit_derives_winner_from_scores() {
    let mut game = battle_game();
    game.timer_started = true;
    game.start_time = Instant::now() - GAME_DURATION - Duration::from_secs(1);
    game.players[0].score = 100;
    game.players[1].score = 40;

    game.check_time_limit();

    assert!(game.game_over);
    assert!(game.end_time.is_some());
    assert_eq!(game.winner, "player");
    assert_eq!(game.time_remaining(), 0);
}

#[test]
fn time_limit_tie_is_a_draw() {
    let mut game = battle_game();
    game.timer_started = true;
    game.start_time = Instant::now() - GAME_DURATION - Duration::from_secs(1);
    game.players[0].score = 70;
    game.players[1].score = 70;

    game.check_time_limit();
    assert_eq!(game.winner, "draw");
}

#[test]
fn pausing_extends_the_match_clock() {
    let mut game = battle_game();
    game.timer_started = true;
    game.start_time = Instant::now() - Duration::from_secs(30);
    game.accumulated_pause = Duration::from_secs(20);
    // 30s elapsed minus 20s paused: ten seconds used, fifty left.
    let remaining = game.time_remaining();
    assert!((49..=50).contains(&remaining), "got {remaining}");
}

#[tokio::test]
async fn pvp_crash_hands_the_win_to_the_survivor() {
    let mut game = Game::new_pvp("alice", "bob");
    game.paused = false;
    game.players[0].body = vec![Point::new(1, 5)];
    game.players[0].dir = LEFT;
    game.players[0].last_move_dir = LEFT;
    // Manual brain with no pending direction keeps the current one.

    game.update_player(0).await;

    assert!(game.game_over);
    assert_eq!(game.winner, "ai", "seat two takes the round");
    assert_eq!(game.crash_point, Some(Point::new(0, 5)));
}

#[tokio::test]
async fn pvp_double_crash_in_one_tick_is_a_draw() {
    let mut game = Game::new_pvp("alice", "bob");
    game.paused = false;
    game.players[0].body = vec![Point::new(1, 5)];
    game.players[0].dir = LEFT;
    game.players[0].last_move_dir = LEFT;
    game.players[1].body = vec![Point::new(23, 5)];
    game.players[1].dir = RIGHT;
    game.players[1].last_move_dir = RIGHT;

    game.update_player(0).await;
    assert!(game.game_over);
    game.update_player(1).await;

    assert_eq!(game.winner, "draw");
}

#[tokio::test]
async fn solo_rival_respawns_after_crash() {
    let mut game = battle_game();
    let origin = game.players[1].origin;
    game.players[1].body = vec![Point::new(1, 5), Point::new(2, 5)];
    game.players[1].dir = LEFT;
    game.players[1].last_move_dir = LEFT;
    game.players[1].brain = Brain::Heuristic;
    // Force the crash regardless of what the planner wants.
    game.players[1].stunned_until = None;
    game.players[1].body = vec![Point::new(1, 5)];
    // Surround the head so every direction is fatal.
    place_obstacle(
        &mut game,
        vec![Point::new(1, 4), Point::new(1, 6), Point::new(2, 5)],
    );

    game.update_player(1).await;

    assert!(!game.game_over, "rival crash never ends a solo game");
    assert_eq!(game.players[1].body, vec![origin]);
}

#[tokio::test]
async fn stunned_player_skips_the_move() {
    let mut game = solo_game();
    game.players[0].body = vec![Point::new(10, 5)];
    game.players[0].stunned_until = Some(Instant::now() + Duration::from_secs(2));

    game.update_player(0).await;

    assert_eq!(game.players[0].body, vec![Point::new(10, 5)]);
    assert!(game.players[0].stunned);
}

#[test]
fn fire_respects_cooldown() {
    let mut game = solo_game();
    game.players[0].body = vec![Point::new(10, 5)];
    game.players[0].dir = RIGHT;

    game.fire(0);
    game.fire(0);
    assert_eq!(game.fireballs.len(), 1, "second shot inside cooldown");
}

#[test]
fn scatter_shot_fires_three_projectiles() {
    let mut game = solo_game();
    game.players[0].body = vec![Point::new(10, 5)];
    game.players[0].dir = RIGHT;
    game.players[0].apply_effect(EffectKind::ScatterShot, Duration::from_secs(8));

    game.fire(0);

    assert_eq!(game.fireballs.len(), 3);
    let dirs: Vec<Point> = game.fireballs.iter().map(|fb| fb.dir).collect();
    assert!(dirs.contains(&RIGHT));
    assert!(dirs.contains(&Point::new(1, 1)));
    assert!(dirs.contains(&Point::new(1, -1)));
}

#[tokio::test]
async fn advance_keeps_every_point_inside_the_walls() {
    let mut game = battle_game();
    game.players[0].brain = Brain::Heuristic;
    game.timer_started = true;

    for _ in 0..80 {
        game.advance().await;
        if game.game_over {
            break;
        }
        for player in &game.players {
            for segment in &player.body {
                assert!(segment.x >= 1 && segment.x <= game.width - 2);
                assert!(segment.y >= 1 && segment.y <= game.height - 2);
            }
        }
        for food in &game.foods {
            assert!(food.pos.x >= 1 && food.pos.x <= game.width - 2);
            assert!(food.pos.y >= 1 && food.pos.y <= game.height - 2);
        }
    }
}

#[tokio::test]
async fn advance_leaves_no_overlapping_segments() {
    let mut game = battle_game();
    game.players[0].brain = Brain::Heuristic;
    game.timer_started = true;

    for _ in 0..80 {
        game.advance().await;
        if game.game_over {
            break;
        }
        let mut seen = std::collections::HashSet::new();
        for player in &game.players {
            for segment in &player.body {
                assert!(seen.insert(*segment), "segment {segment:?} duplicated");
            }
        }
    }
}

#[tokio::test]
async fn no_reverse_after_any_advance() {
    let mut game = battle_game();
    game.players[0].brain = Brain::Heuristic;
    for _ in 0..40 {
        game.advance().await;
        if game.game_over {
            break;
        }
        for player in &game.players {
            assert!(!player.dir.is_opposite(player.last_move_dir));
        }
    }
}
