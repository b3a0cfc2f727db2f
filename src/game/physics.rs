//! Player and ball physics

use super::court::{
    AIR_CONTROL_MULT, BALL_HOLD_OFFSET_X, BALL_HOLD_OFFSET_Y, BALL_RADIUS, BOUNCE_STOP_SPEED,
    COURT_WIDTH, DEFENDER_JUMP_VELOCITY, DEFENDER_SPEED, DEFLECT_PICKUP_COOLDOWN_TICKS,
    DEFLECT_SPEED_MULT, DT, FLOOR_FRICTION, FLOOR_Y, GRAVITY, JUMP_VELOCITY, PICKUP_RADIUS,
    PLAYER_GROUND_Y, PLAYER_HEIGHT, PLAYER_SPEED_WITH_BALL, PLAYER_WIDTH, RESTITUTION_CEILING,
    RESTITUTION_FLOOR, RESTITUTION_WALL, SHOOTER_EXEMPT_TICKS, SLOW_BALL_SPEED,
};
use super::state::{AnimState, BallState, PlayerInput, PlayerState};

/// Physics system for advancing players and the ball by one fixed step
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Turn buffered controls into velocity
    pub fn apply_input(player: &mut PlayerState, input: &PlayerInput) {
        // Defender (no ball) moves faster; air control is reduced
        let mut speed = if player.has_ball {
            PLAYER_SPEED_WITH_BALL
        } else {
            DEFENDER_SPEED
        };
        if !player.grounded {
            speed *= AIR_CONTROL_MULT;
        }

        let direction = input.move_x.clamp(-1, 1);
        player.vx = direction as f32 * speed;
        if direction != 0 {
            player.facing = direction;
        }

        if input.jump && player.grounded {
            player.vy = if player.has_ball {
                JUMP_VELOCITY
            } else {
                DEFENDER_JUMP_VELOCITY
            };
            player.grounded = false;
        }
    }

    /// Integrate one player and refresh its animation tag
    pub fn step_player(player: &mut PlayerState) {
        if !player.grounded {
            player.vy += GRAVITY * DT;
        }

        player.x += player.vx * DT;
        player.y += player.vy * DT;

        // Floor
        if player.y + PLAYER_HEIGHT / 2.0 >= FLOOR_Y {
            player.y = PLAYER_GROUND_Y;
            player.vy = 0.0;
            player.grounded = true;
        }

        // Court bounds
        let half_w = PLAYER_WIDTH / 2.0;
        player.x = player.x.clamp(half_w, COURT_WIDTH - half_w);

        player.steal_cooldown = player.steal_cooldown.saturating_sub(1);
        player.pickup_delay = player.pickup_delay.saturating_sub(1);

        if player.anim_hold > 0 {
            player.anim_hold -= 1;
        } else {
            player.anim = Self::base_anim(player);
        }
    }

    fn base_anim(player: &PlayerState) -> AnimState {
        if !player.grounded {
            AnimState::Jump
        } else if player.has_ball && player.vx != 0.0 {
            AnimState::Dribble
        } else if player.vx != 0.0 {
            AnimState::Run
        } else {
            AnimState::Idle
        }
    }

    /// Where the ball sits when `holder` carries it
    pub fn hold_point(holder: &PlayerState) -> (f32, f32) {
        (
            holder.x + holder.facing as f32 * BALL_HOLD_OFFSET_X,
            holder.y + BALL_HOLD_OFFSET_Y,
        )
    }

    /// Glue the ball to its holder
    pub fn hold_ball(ball: &mut BallState, holder: &PlayerState) {
        let (x, y) = Self::hold_point(holder);
        ball.x = x;
        ball.y = y;
        ball.vx = 0.0;
        ball.vy = 0.0;
    }

    /// Advance the ball by one step.
    ///
    /// Returns the slot that picked the ball up this step, if any.
    pub fn step_ball(ball: &mut BallState, players: &mut [PlayerState; 2]) -> Option<usize> {
        if let Some(owner) = ball.owner {
            Self::hold_ball(ball, &players[owner]);
            return None;
        }

        ball.pickup_cooldown = ball.pickup_cooldown.saturating_sub(1);
        if ball.in_flight {
            ball.shot_age_ticks = ball.shot_age_ticks.saturating_add(1);
        }

        ball.vy += GRAVITY * DT;
        ball.x += ball.vx * DT;
        ball.y += ball.vy * DT;

        // Floor bounce
        if ball.y + BALL_RADIUS >= FLOOR_Y {
            ball.y = FLOOR_Y - BALL_RADIUS;
            ball.vy = -ball.vy * RESTITUTION_FLOOR;
            ball.vx *= FLOOR_FRICTION;

            if ball.vy.abs() < BOUNCE_STOP_SPEED {
                ball.vy = 0.0;
                ball.in_flight = false;
            }
        }

        // Side walls
        if ball.x - BALL_RADIUS < 0.0 {
            ball.x = BALL_RADIUS;
            ball.vx = -ball.vx * RESTITUTION_WALL;
        }
        if ball.x + BALL_RADIUS > COURT_WIDTH {
            ball.x = COURT_WIDTH - BALL_RADIUS;
            ball.vx = -ball.vx * RESTITUTION_WALL;
        }

        // Ceiling
        if ball.y - BALL_RADIUS < 0.0 {
            ball.y = BALL_RADIUS;
            ball.vy = -ball.vy * RESTITUTION_CEILING;
        }

        if ball.in_flight {
            Self::deflect_off_players(ball, players);
        }

        Self::try_pickup(ball, players)
    }

    /// Circle-vs-box test of the ball against each player's body.
    ///
    /// The shooter passes through its own shot for `SHOOTER_EXEMPT_TICKS`.
    pub fn deflect_off_players(ball: &mut BallState, players: &[PlayerState; 2]) -> Option<usize> {
        for (slot, player) in players.iter().enumerate() {
            if ball.shooter == Some(slot) && ball.shot_age_ticks < SHOOTER_EXEMPT_TICKS {
                continue;
            }

            let half_w = PLAYER_WIDTH / 2.0;
            let half_h = PLAYER_HEIGHT / 2.0;
            let closest_x = ball.x.clamp(player.x - half_w, player.x + half_w);
            let closest_y = ball.y.clamp(player.y - half_h, player.y + half_h);

            let dx = ball.x - closest_x;
            let dy = ball.y - closest_y;
            let dist_sq = dx * dx + dy * dy;
            if dist_sq >= BALL_RADIUS * BALL_RADIUS {
                continue;
            }

            let dist = dist_sq.sqrt().max(0.001);
            let nx = dx / dist;
            let ny = dy / dist;

            // Push out of the body
            let overlap = BALL_RADIUS - dist;
            ball.x += nx * overlap;
            ball.y += ny * overlap;

            // Reflect about the contact normal and dampen
            let dot = ball.vx * nx + ball.vy * ny;
            ball.vx = (ball.vx - 2.0 * dot * nx) * DEFLECT_SPEED_MULT;
            ball.vy = (ball.vy - 2.0 * dot * ny) * DEFLECT_SPEED_MULT;

            // Anyone can grab a deflected ball
            ball.shooter = None;
            ball.pickup_cooldown = DEFLECT_PICKUP_COOLDOWN_TICKS;
            return Some(slot);
        }
        None
    }

    /// Hand a loose, slow ball to the first player close enough
    pub fn try_pickup(ball: &mut BallState, players: &mut [PlayerState; 2]) -> Option<usize> {
        if ball.owner.is_some() || ball.pickup_cooldown > 0 {
            return None;
        }
        let slow = ball.vx.abs() < SLOW_BALL_SPEED && ball.vy.abs() < SLOW_BALL_SPEED;
        if ball.in_flight && !slow {
            return None;
        }

        for (slot, player) in players.iter_mut().enumerate() {
            if player.pickup_delay > 0 {
                continue;
            }
            let dx = player.x - ball.x;
            let dy = player.y - ball.y;
            if (dx * dx + dy * dy).sqrt() < PICKUP_RADIUS {
                ball.owner = Some(slot);
                ball.last_owner = Some(slot);
                ball.in_flight = false;
                ball.shooter = None;
                player.has_ball = true;
                Self::hold_ball(ball, player);
                return Some(slot);
            }
        }
        None
    }
}
