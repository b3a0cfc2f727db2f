//! Court geometry and gameplay tuning
//!
//! Screen-space coordinates: x grows to the right, y grows downward, the
//! floor is a horizontal line at `FLOOR_Y`. Velocities are in px/s.

use crate::util::time::TICK_DELTA;

/// Fixed physics step (seconds)
pub const DT: f32 = TICK_DELTA;

// Court
pub const COURT_WIDTH: f32 = 960.0;
pub const FLOOR_Y: f32 = 380.0;

// Bodies
pub const PLAYER_WIDTH: f32 = 32.0;
pub const PLAYER_HEIGHT: f32 = 48.0;
pub const BALL_RADIUS: f32 = 12.0;

/// Y of a player's center when standing on the floor
pub const PLAYER_GROUND_Y: f32 = FLOOR_Y - PLAYER_HEIGHT / 2.0;

/// Tip-off / reset spots for slot 0 and slot 1
pub const SPAWN_X: [f32; 2] = [240.0, 720.0];
pub const SPAWN_FACING: [i8; 2] = [1, -1];

// Movement
pub const GRAVITY: f32 = 1800.0;
pub const PLAYER_SPEED_WITH_BALL: f32 = 300.0;
pub const DEFENDER_SPEED: f32 = 350.0;
pub const JUMP_VELOCITY: f32 = -780.0;
pub const DEFENDER_JUMP_VELOCITY: f32 = -880.0;
pub const AIR_CONTROL_MULT: f32 = 0.5;

// Ball carried by a player
pub const BALL_HOLD_OFFSET_X: f32 = 14.0;
pub const BALL_HOLD_OFFSET_Y: f32 = 8.0;

// Ball surfaces
pub const RESTITUTION_RIM: f32 = 0.6;
pub const RESTITUTION_BACKBOARD: f32 = 0.4;
pub const RESTITUTION_FLOOR: f32 = 0.5;
pub const RESTITUTION_WALL: f32 = 0.8;
pub const RESTITUTION_CEILING: f32 = 0.5;
pub const FLOOR_FRICTION: f32 = 0.95;
/// Vertical bounce speed below which the ball settles on the floor
pub const BOUNCE_STOP_SPEED: f32 = 20.0;

// Pickup
/// Both velocity components below this count as "slow" for a pickup
pub const SLOW_BALL_SPEED: f32 = 100.0;
pub const PICKUP_RADIUS: f32 = PLAYER_WIDTH / 2.0 + BALL_RADIUS + 4.0;

// Hoops
pub const HOOP_LEFT_X: f32 = 80.0;
pub const HOOP_RIGHT_X: f32 = 880.0;
pub const HOOP_Y: f32 = 180.0;
pub const RIM_WIDTH: f32 = 48.0;
pub const RIM_RADIUS: f32 = 5.0;
pub const BACKBOARD_HEIGHT: f32 = 80.0;
pub const BACKBOARD_GAP: f32 = 4.0;

/// Distance from the hoop center beyond which a made shot counts 3
pub const THREE_POINT_RADIUS: f32 = 150.0;

// Shooting
pub const MAX_SHOOT_FORCE: f32 = 1200.0;
pub const MIN_SHOOT_FORCE: f32 = 300.0;
pub const SHOT_FORCE_MARGIN: f32 = 1.15;
pub const SHOT_PICKUP_COOLDOWN_TICKS: u8 = 30;
pub const SHOOTER_EXEMPT_TICKS: u8 = 30;
pub const ACCURACY_UNDER_RIM: f64 = 0.6;
pub const ACCURACY_AT_THREE: f64 = 0.25;
pub const ACCURACY_FAR_COURT: f64 = 0.15;

// Defense
pub const BLOCK_RANGE: f32 = 50.0;
pub const BLOCK_HEIGHT_TOLERANCE: f32 = 10.0;
pub const BLOCK_DEFLECT_VX: f32 = 200.0;
pub const BLOCK_DEFLECT_VY: f32 = 300.0;
pub const DEFLECT_SPEED_MULT: f32 = 0.5;
pub const DEFLECT_PICKUP_COOLDOWN_TICKS: u8 = 15;
pub const STEAL_RANGE: f32 = 40.0;
pub const STEAL_CHANCE: f64 = 0.5;
pub const STEAL_COOLDOWN_TICKS: u8 = 45;
/// Ticks a player who just lost the ball must wait before grabbing it again
pub const PICKUP_DELAY_TICKS: u8 = 30;

/// Ticks a shoot/block pose stays on screen
pub const ACTION_ANIM_TICKS: u8 = 12;

// Clocks (seconds)
pub const SHOT_CLOCK_SECS: f32 = 24.0;
pub const GAME_DURATION_SECS: f32 = 120.0;
pub const COUNTDOWN_SECS: f32 = 3.0;
pub const SCORED_PAUSE_SECS: f32 = 2.0;
