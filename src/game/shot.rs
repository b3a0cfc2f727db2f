//! Shooting, blocking and stealing
//!
//! Shots are auto-aimed: the server picks the target hoop from the shooter's
//! slot, rolls accuracy from the shooting distance and solves a ballistic
//! launch towards the (possibly perturbed) aim point.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use tracing::debug;

use super::court::{
    ACCURACY_AT_THREE, ACCURACY_FAR_COURT, ACCURACY_UNDER_RIM, ACTION_ANIM_TICKS, BALL_RADIUS,
    BLOCK_DEFLECT_VX, BLOCK_DEFLECT_VY, BLOCK_HEIGHT_TOLERANCE, BLOCK_RANGE, COURT_WIDTH,
    DEFLECT_PICKUP_COOLDOWN_TICKS, GRAVITY, MAX_SHOOT_FORCE, MIN_SHOOT_FORCE, PICKUP_DELAY_TICKS,
    SHOT_FORCE_MARGIN, SHOT_PICKUP_COOLDOWN_TICKS, STEAL_CHANCE, STEAL_COOLDOWN_TICKS,
    PLAYER_WIDTH, STEAL_RANGE, THREE_POINT_RADIUS,
};
use super::dice::Dice;
use super::hoop::Hoop;
use super::physics::PhysicsSystem;
use super::state::{AnimState, BallState, PlayerState};

/// Launch parameters for a shot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Launch {
    /// Radians from the +x axis, counter-clockwise (upwards on screen)
    pub angle: f64,
    /// Initial speed in px/s
    pub force: f64,
}

impl Launch {
    /// Screen-space velocity (y grows downward)
    pub fn velocity(&self) -> (f32, f32) {
        (
            (self.force * self.angle.cos()) as f32,
            -(self.force * self.angle.sin()) as f32,
        )
    }
}

/// Shot resolution system
pub struct ShotSystem;

impl ShotSystem {
    /// Probability that a shot from `player_x` by `slot` is on target.
    ///
    /// 0.6 under the rim, 0.25 at the three-point radius, 0.15 at the
    /// farthest wall, linear in between.
    pub fn accuracy(player_x: f32, slot: usize) -> f64 {
        let hoop_x = Hoop::target_of(slot).center_x as f64;
        let dist = (player_x as f64 - hoop_x).abs();
        let three = THREE_POINT_RADIUS as f64;

        if dist <= three {
            let t = dist / three;
            return ACCURACY_UNDER_RIM - t * (ACCURACY_UNDER_RIM - ACCURACY_AT_THREE);
        }

        let max_dist = hoop_x.max(COURT_WIDTH as f64 - hoop_x);
        let remaining = max_dist - three;
        if remaining < 1.0 {
            return ACCURACY_FAR_COURT;
        }
        let t = ((dist - three) / remaining).clamp(0.0, 1.0);
        ACCURACY_AT_THREE - t * (ACCURACY_AT_THREE - ACCURACY_FAR_COURT)
    }

    /// Solve a launch from `start` that passes through `target`.
    ///
    /// Force is a margin over the minimum-energy speed; the angle is the
    /// high-arc root of the range equation in `tan(angle)`.
    pub fn solve_launch(start: (f32, f32), target: (f32, f32)) -> Launch {
        let g = GRAVITY as f64;
        let dx = (target.0 - start.0) as f64;
        // Positive when the target is above the start
        let h = (start.1 - target.1) as f64;
        let d = dx.abs();

        let v_min_sq = g * (h + h.hypot(d));
        let v_min = if v_min_sq > 0.0 {
            v_min_sq.sqrt()
        } else {
            MIN_SHOOT_FORCE as f64
        };
        let force = (v_min * SHOT_FORCE_MARGIN as f64)
            .clamp(MIN_SHOOT_FORCE as f64, MAX_SHOOT_FORCE as f64);

        let angle = if d > 1.0 {
            let c = g * d * d / (2.0 * force * force);
            let discriminant = d * d - 4.0 * c * (c + h);
            let rise = if discriminant >= 0.0 {
                ((d + discriminant.sqrt()) / (2.0 * c)).atan()
            } else {
                // Out of reach at this speed: aim for distance
                let line_of_sight = h.atan2(d);
                FRAC_PI_4.max((FRAC_PI_4 + line_of_sight) / 2.0 + 0.2)
            };
            if dx >= 0.0 {
                rise
            } else {
                PI - rise
            }
        } else {
            FRAC_PI_2
        };

        Launch {
            angle: angle.clamp(0.1, PI - 0.1),
            force,
        }
    }

    /// Release the ball from `shooter` towards its target hoop.
    ///
    /// Returns whether the roll was on target.
    pub fn shoot(
        ball: &mut BallState,
        shooter: &mut PlayerState,
        slot: usize,
        dice: &mut dyn Dice,
    ) -> bool {
        let hoop = Hoop::target_of(slot);
        let accuracy = Self::accuracy(shooter.x, slot);
        let hit = dice.unit() < accuracy;

        let mut aim = (hoop.center_x, hoop.rim_y);
        if !hit {
            let mut offset_x = (35.0 + dice.unit() * 30.0) as f32;
            if dice.coin() {
                offset_x = -offset_x;
            }
            let offset_y = (-25.0 + dice.unit() * 35.0) as f32;
            aim.0 += offset_x;
            aim.1 += offset_y;
        }

        let start = PhysicsSystem::hold_point(shooter);
        let launch = Self::solve_launch(start, aim);
        let (vx, vy) = launch.velocity();

        debug!(
            slot,
            hit,
            accuracy,
            angle = launch.angle,
            force = launch.force,
            "Shot released"
        );

        ball.x = start.0;
        ball.y = start.1;
        ball.vx = vx;
        ball.vy = vy;
        ball.owner = None;
        ball.in_flight = true;
        ball.pickup_cooldown = SHOT_PICKUP_COOLDOWN_TICKS;
        ball.shooter = Some(slot);
        ball.shot_age_ticks = 0;
        ball.shot_origin_x = shooter.x;

        shooter.has_ball = false;
        shooter.anim = AnimState::Shoot;
        shooter.anim_hold = ACTION_ANIM_TICKS;

        hit
    }

    /// Swat the shot if `blocker` is airborne, close and high enough.
    ///
    /// A blocked shot becomes a grounder knocked away from the shooter's hoop.
    /// It starts clear of the shooter's body and the shooter cannot deflect
    /// it while it rolls away.
    pub fn try_block(
        ball: &mut BallState,
        shooter: &mut PlayerState,
        shooter_slot: usize,
        blocker: &mut PlayerState,
    ) -> bool {
        if blocker.grounded {
            return false;
        }

        let dx = shooter.x - blocker.x;
        let dy = shooter.y - blocker.y;
        if (dx * dx + dy * dy).sqrt() > BLOCK_RANGE {
            return false;
        }
        if blocker.y > shooter.y + BLOCK_HEIGHT_TOLERANCE {
            return false;
        }

        let away = if shooter_slot == 0 { -1.0 } else { 1.0 };
        ball.vx = away * BLOCK_DEFLECT_VX;
        ball.vy = BLOCK_DEFLECT_VY;
        ball.x = (shooter.x + away * (PLAYER_WIDTH / 2.0 + BALL_RADIUS))
            .clamp(BALL_RADIUS, COURT_WIDTH - BALL_RADIUS);
        ball.y = shooter.y;
        ball.owner = None;
        ball.in_flight = true;
        ball.pickup_cooldown = DEFLECT_PICKUP_COOLDOWN_TICKS;
        ball.shooter = Some(shooter_slot);
        ball.shot_age_ticks = 0;

        shooter.has_ball = false;
        shooter.pickup_delay = PICKUP_DELAY_TICKS;
        blocker.anim = AnimState::Block;
        blocker.anim_hold = ACTION_ANIM_TICKS;

        true
    }

    /// Reach for the ball held by `carrier`.
    ///
    /// Returns `None` when no attempt was possible, otherwise whether it
    /// succeeded. Every attempt arms the thief's steal cooldown.
    pub fn try_steal(
        ball: &mut BallState,
        thief: &mut PlayerState,
        thief_slot: usize,
        carrier: &mut PlayerState,
        dice: &mut dyn Dice,
    ) -> Option<bool> {
        if thief.has_ball || thief.steal_cooldown > 0 || !carrier.has_ball {
            return None;
        }
        if ball.owner != Some(1 - thief_slot) {
            return None;
        }

        let dx = carrier.x - thief.x;
        let dy = carrier.y - thief.y;
        if (dx * dx + dy * dy).sqrt() > STEAL_RANGE {
            return None;
        }

        thief.steal_cooldown = STEAL_COOLDOWN_TICKS;
        if dice.unit() >= STEAL_CHANCE {
            return Some(false);
        }

        carrier.has_ball = false;
        carrier.pickup_delay = PICKUP_DELAY_TICKS;
        thief.has_ball = true;
        ball.owner = Some(thief_slot);
        ball.last_owner = Some(thief_slot);
        ball.in_flight = false;
        ball.shooter = None;
        PhysicsSystem::hold_ball(ball, thief);

        Some(true)
    }
}
