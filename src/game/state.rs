//! Authoritative match state
//!
//! `GameState` is serialized verbatim into every `GameState` broadcast.
//! Fields marked `#[serde(skip)]` are server bookkeeping the client never sees.

use serde::{Deserialize, Serialize, Serializer};

use super::court::{
    BALL_RADIUS, COUNTDOWN_SECS, COURT_WIDTH, FLOOR_Y, GAME_DURATION_SECS, PLAYER_GROUND_Y,
    SHOT_CLOCK_SECS, SPAWN_FACING, SPAWN_X,
};

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GamePhase {
    /// Pre-game countdown
    Countdown = 1,
    /// Ball is live
    Playing = 2,
    /// Short pause after a basket
    Scored = 3,
    /// Final state, nothing moves anymore
    GameOver = 4,
}

impl Serialize for GamePhase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// Animation tag rendered by clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AnimState {
    Idle = 0,
    Run = 1,
    Jump = 2,
    Shoot = 3,
    Dribble = 4,
    Block = 5,
}

impl Serialize for AnimState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// Player slots go over the wire as int8, with -1 for "nobody"
mod slot {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(slot: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(slot.map_or(-1, |i| i as i8))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// -1 = facing left, 1 = facing right
    pub facing: i8,
    pub anim: AnimState,
    pub grounded: bool,
    pub has_ball: bool,

    /// Ticks left on a shoot/block pose
    #[serde(skip)]
    pub anim_hold: u8,
    /// Ticks until the next steal attempt is allowed
    #[serde(skip)]
    pub steal_cooldown: u8,
    /// Ticks this player cannot pick up a loose ball
    #[serde(skip)]
    pub pickup_delay: u8,
}

impl PlayerState {
    /// A player standing on its spawn spot
    pub fn new(slot: usize) -> Self {
        Self {
            x: SPAWN_X[slot],
            y: PLAYER_GROUND_Y,
            vx: 0.0,
            vy: 0.0,
            facing: SPAWN_FACING[slot],
            anim: AnimState::Idle,
            grounded: true,
            has_ball: false,
            anim_hold: 0,
            steal_cooldown: 0,
            pickup_delay: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BallState {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Current holder
    #[serde(serialize_with = "slot::serialize")]
    pub owner: Option<usize>,
    pub in_flight: bool,

    /// Ticks before anyone may pick the ball up
    #[serde(skip)]
    pub pickup_cooldown: u8,
    /// Who released the current shot (exempt from body collision for a while)
    #[serde(skip)]
    pub shooter: Option<usize>,
    #[serde(skip)]
    pub shot_age_ticks: u8,
    /// Where the shooter stood, for 3-point detection
    #[serde(skip)]
    pub shot_origin_x: f32,
    /// Last player who held the ball
    #[serde(skip)]
    pub last_owner: Option<usize>,
}

impl BallState {
    /// A loose ball resting at center court
    pub fn new() -> Self {
        Self {
            x: COURT_WIDTH / 2.0,
            y: FLOOR_Y - BALL_RADIUS,
            vx: 0.0,
            vy: 0.0,
            owner: None,
            in_flight: false,
            pickup_cooldown: 0,
            shooter: None,
            shot_age_ticks: 0,
            shot_origin_x: 0.0,
            last_owner: None,
        }
    }
}

impl Default for BallState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub tick: u32,
    pub phase: GamePhase,
    /// Seconds left in the countdown or post-score pause
    pub phase_timer: f32,
    pub players: [PlayerState; 2],
    pub ball: BallState,
    pub score: [u8; 2],
    pub shot_clock: f32,
    pub game_clock: f32,
    /// Set once the match is over; `None` is a tie
    #[serde(serialize_with = "slot::serialize")]
    pub winner: Option<usize>,
}

impl GameState {
    /// Fresh match: both players on their spots, ball loose at center, countdown running
    pub fn new() -> Self {
        Self {
            tick: 0,
            phase: GamePhase::Countdown,
            phase_timer: COUNTDOWN_SECS,
            players: [PlayerState::new(0), PlayerState::new(1)],
            ball: BallState::new(),
            score: [0, 0],
            shot_clock: SHOT_CLOCK_SECS,
            game_clock: GAME_DURATION_SECS,
            winner: None,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Latest controls from one client
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInput {
    /// Desired horizontal direction: -1, 0 or 1
    #[serde(default)]
    pub move_x: i8,
    #[serde(default)]
    pub jump: bool,
    #[serde(default)]
    pub shoot: bool,
    /// Client tick this input was produced on
    #[serde(default)]
    pub tick: u32,
}

impl PlayerInput {
    /// Fold a newly received input into the buffered one.
    ///
    /// Movement is last-writer-wins; jump/shoot stay latched until consumed.
    pub fn latch(&mut self, next: PlayerInput) {
        self.move_x = next.move_x.clamp(-1, 1);
        self.jump |= next.jump;
        self.shoot |= next.shoot;
        self.tick = next.tick;
    }

    /// Copy the input out and clear the one-shot actions
    pub fn take(&mut self) -> PlayerInput {
        let snapshot = *self;
        self.jump = false;
        self.shoot = false;
        snapshot
    }
}
