//! Hoop geometry and ball-vs-hoop collision

use super::court::{
    BACKBOARD_GAP, BACKBOARD_HEIGHT, BALL_RADIUS, HOOP_LEFT_X, HOOP_RIGHT_X, HOOP_Y,
    RESTITUTION_BACKBOARD, RESTITUTION_RIM, RIM_RADIUS, RIM_WIDTH, THREE_POINT_RADIUS,
};
use super::state::BallState;

/// Static geometry of one basket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hoop {
    pub center_x: f32,
    pub rim_left_x: f32,
    pub rim_right_x: f32,
    pub rim_y: f32,
    pub backboard_x: f32,
    pub backboard_top_y: f32,
    pub backboard_bottom_y: f32,
    /// Backboard sits on the outer left edge of the rim
    pub backboard_on_left: bool,
}

impl Hoop {
    /// Basket player 1 attacks
    pub const LEFT: Hoop = Hoop {
        center_x: HOOP_LEFT_X,
        rim_left_x: HOOP_LEFT_X - RIM_WIDTH / 2.0,
        rim_right_x: HOOP_LEFT_X + RIM_WIDTH / 2.0,
        rim_y: HOOP_Y,
        backboard_x: HOOP_LEFT_X - RIM_WIDTH / 2.0 - BACKBOARD_GAP,
        backboard_top_y: HOOP_Y - BACKBOARD_HEIGHT / 2.0,
        backboard_bottom_y: HOOP_Y + BACKBOARD_HEIGHT / 2.0,
        backboard_on_left: true,
    };

    /// Basket player 0 attacks
    pub const RIGHT: Hoop = Hoop {
        center_x: HOOP_RIGHT_X,
        rim_left_x: HOOP_RIGHT_X - RIM_WIDTH / 2.0,
        rim_right_x: HOOP_RIGHT_X + RIM_WIDTH / 2.0,
        rim_y: HOOP_Y,
        backboard_x: HOOP_RIGHT_X + RIM_WIDTH / 2.0 + BACKBOARD_GAP,
        backboard_top_y: HOOP_Y - BACKBOARD_HEIGHT / 2.0,
        backboard_bottom_y: HOOP_Y + BACKBOARD_HEIGHT / 2.0,
        backboard_on_left: false,
    };

    /// The hoop `slot` shoots at
    pub fn target_of(slot: usize) -> Hoop {
        if slot == 0 {
            Self::RIGHT
        } else {
            Self::LEFT
        }
    }

    /// Whether a made shot from `origin_x` is worth 3.
    ///
    /// Exactly on the three-point radius still counts 2.
    pub fn is_three_pointer(&self, origin_x: f32) -> bool {
        (origin_x - self.center_x).abs() > THREE_POINT_RADIUS
    }

    /// Bounce the ball off the rim and backboard, then report whether it
    /// dropped through the net this step.
    pub fn check_ball(&self, ball: &mut BallState, prev_y: f32) -> bool {
        if ball.owner.is_some() {
            return false;
        }

        self.bounce_off_rim_point(ball, self.rim_left_x);
        self.bounce_off_rim_point(ball, self.rim_right_x);
        self.bounce_off_backboard(ball);

        ball.in_flight
            && prev_y < self.rim_y
            && ball.y >= self.rim_y
            && ball.x > self.rim_left_x + RIM_RADIUS
            && ball.x < self.rim_right_x - RIM_RADIUS
    }

    fn bounce_off_rim_point(&self, ball: &mut BallState, rim_x: f32) {
        let dx = ball.x - rim_x;
        let dy = ball.y - self.rim_y;
        let dist = (dx * dx + dy * dy).sqrt();
        let min_dist = BALL_RADIUS + RIM_RADIUS;
        if dist >= min_dist || dist <= 0.0 {
            return;
        }

        let nx = dx / dist;
        let ny = dy / dist;

        let overlap = min_dist - dist;
        ball.x += nx * overlap;
        ball.y += ny * overlap;

        let dot = ball.vx * nx + ball.vy * ny;
        ball.vx = (ball.vx - 2.0 * dot * nx) * RESTITUTION_RIM;
        ball.vy = (ball.vy - 2.0 * dot * ny) * RESTITUTION_RIM;
    }

    fn bounce_off_backboard(&self, ball: &mut BallState) {
        let overlaps_height = ball.y + BALL_RADIUS > self.backboard_top_y
            && ball.y - BALL_RADIUS < self.backboard_bottom_y;
        if !overlaps_height {
            return;
        }

        if self.backboard_on_left {
            // Hit from the court side (right)
            if ball.x - BALL_RADIUS < self.backboard_x
                && ball.x > self.backboard_x - BALL_RADIUS * 2.0
            {
                ball.x = self.backboard_x + BALL_RADIUS;
                ball.vx = -ball.vx * RESTITUTION_BACKBOARD;
            }
        } else if ball.x + BALL_RADIUS > self.backboard_x
            && ball.x < self.backboard_x + BALL_RADIUS * 2.0
        {
            ball.x = self.backboard_x - BALL_RADIUS;
            ball.vx = -ball.vx * RESTITUTION_BACKBOARD;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn falling_ball(x: f32, y: f32) -> BallState {
        let mut ball = BallState::new();
        ball.x = x;
        ball.y = y;
        ball.vy = 300.0;
        ball.in_flight = true;
        ball
    }

    #[test]
    fn test_geometry() {
        assert_eq!(Hoop::RIGHT.rim_left_x, 856.0);
        assert_eq!(Hoop::RIGHT.rim_right_x, 904.0);
        assert_eq!(Hoop::RIGHT.backboard_x, 908.0);
        assert_eq!(Hoop::LEFT.backboard_x, 52.0);
        assert_eq!(Hoop::LEFT.backboard_top_y, 140.0);
        assert_eq!(Hoop::LEFT.backboard_bottom_y, 220.0);
        assert_eq!(Hoop::target_of(0), Hoop::RIGHT);
        assert_eq!(Hoop::target_of(1), Hoop::LEFT);
    }

    #[test]
    fn test_three_point_radius_is_two_points_inclusive() {
        assert!(!Hoop::RIGHT.is_three_pointer(730.0));
        assert!(Hoop::RIGHT.is_three_pointer(729.0));
        assert!(!Hoop::LEFT.is_three_pointer(230.0));
        assert!(Hoop::LEFT.is_three_pointer(231.0));
    }

    #[test]
    fn test_score_when_crossing_rim_downward() {
        let mut ball = falling_ball(880.0, 181.0);
        assert!(Hoop::RIGHT.check_ball(&mut ball, 178.0));
    }

    #[test]
    fn test_no_score_moving_up_or_outside_rim() {
        // Previous position already below the rim
        let mut ball = falling_ball(880.0, 185.0);
        assert!(!Hoop::RIGHT.check_ball(&mut ball, 182.0));

        // Crosses the rim line but outside the opening
        let mut ball = falling_ball(700.0, 181.0);
        assert!(!Hoop::RIGHT.check_ball(&mut ball, 178.0));

        // Not a live shot
        let mut ball = falling_ball(880.0, 181.0);
        ball.in_flight = false;
        assert!(!Hoop::RIGHT.check_ball(&mut ball, 178.0));
    }

    #[test]
    fn test_held_ball_ignores_hoop() {
        let mut ball = falling_ball(860.0, 181.0);
        ball.owner = Some(0);
        let before = ball;
        assert!(!Hoop::RIGHT.check_ball(&mut ball, 178.0));
        assert_eq!(ball, before);
    }

    #[test]
    fn test_rim_bounce() {
        let mut ball = BallState::new();
        ball.x = 846.0;
        ball.y = HOOP_Y;
        ball.vx = 400.0;
        ball.in_flight = true;

        Hoop::RIGHT.check_ball(&mut ball, HOOP_Y);

        assert_eq!(ball.x, 856.0 - BALL_RADIUS - RIM_RADIUS);
        assert_eq!(ball.vx, -400.0 * RESTITUTION_RIM);
    }

    #[test]
    fn test_backboard_bounce() {
        let mut ball = BallState::new();
        ball.x = 900.0;
        ball.y = 150.0;
        ball.vx = 300.0;
        ball.in_flight = true;

        Hoop::RIGHT.check_ball(&mut ball, 150.0);
        assert_eq!(ball.x, 908.0 - BALL_RADIUS);
        assert_eq!(ball.vx, -300.0 * RESTITUTION_BACKBOARD);

        let mut ball = BallState::new();
        ball.x = 60.0;
        ball.y = 150.0;
        ball.vx = -300.0;
        ball.in_flight = true;

        Hoop::LEFT.check_ball(&mut ball, 150.0);
        assert_eq!(ball.x, 52.0 + BALL_RADIUS);
        assert_eq!(ball.vx, 300.0 * RESTITUTION_BACKBOARD);
    }
}
