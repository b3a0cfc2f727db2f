//! Per-tick match rules
//!
//! `Simulation` is the synchronous core of a room: it owns the `GameState`
//! and the random source, and advances both by exactly one tick per call.
//! It never touches the network; the room turns returned events into
//! messages.

use super::court::{DT, SCORED_PAUSE_SECS, SHOT_CLOCK_SECS};
use super::dice::Dice;
use super::hoop::Hoop;
use super::physics::PhysicsSystem;
use super::shot::ShotSystem;
use super::state::{BallState, GamePhase, GameState, PlayerInput, PlayerState};

/// Something a tick produced that the room needs to act on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchEvent {
    ShotTaken { slot: usize, on_target: bool },
    Blocked { shooter: usize, blocker: usize },
    Stolen { thief: usize, victim: usize },
    Scored { scorer: usize, points: u8, score: [u8; 2] },
    ShotClockViolation { new_owner: usize },
    GameOver { winner: Option<usize>, score: [u8; 2] },
}

pub struct Simulation {
    state: GameState,
    dice: Box<dyn Dice>,
}

impl Simulation {
    pub fn new(dice: Box<dyn Dice>) -> Self {
        Self {
            state: GameState::new(),
            dice,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[cfg(test)]
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn is_over(&self) -> bool {
        self.state.phase == GamePhase::GameOver
    }

    /// Advance one tick with the inputs drained for this tick
    pub fn tick(&mut self, inputs: [PlayerInput; 2]) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        self.state.tick = self.state.tick.wrapping_add(1);

        match self.state.phase {
            GamePhase::Countdown | GamePhase::Scored => self.tick_pause(),
            GamePhase::Playing => self.tick_playing(inputs, &mut events),
            GamePhase::GameOver => {}
        }

        events
    }

    fn tick_pause(&mut self) {
        let state = &mut self.state;
        state.phase_timer -= DT;
        if state.phase_timer <= 0.0 {
            state.phase = GamePhase::Playing;
            state.phase_timer = 0.0;
        }
    }

    fn tick_playing(&mut self, inputs: [PlayerInput; 2], events: &mut Vec<MatchEvent>) {
        let state = &mut self.state;
        let possessor = state.ball.last_owner;
        let carrier = state.ball.owner;

        for (player, input) in state.players.iter_mut().zip(inputs.iter()) {
            PhysicsSystem::apply_input(player, input);
        }

        // The carrier acts first so a same-tick steal cannot swallow its shot
        if let Some(slot) = carrier.filter(|&slot| inputs[slot].shoot) {
            let (me, other) = pair_mut(&mut state.players, slot);
            if can_shoot_from(me.x, slot) {
                if ShotSystem::try_block(&mut state.ball, me, slot, other) {
                    events.push(MatchEvent::Blocked {
                        shooter: slot,
                        blocker: 1 - slot,
                    });
                } else {
                    let on_target =
                        ShotSystem::shoot(&mut state.ball, me, slot, self.dice.as_mut());
                    events.push(MatchEvent::ShotTaken { slot, on_target });
                }
            }
        }

        for (slot, input) in inputs.iter().enumerate() {
            if !input.shoot || carrier == Some(slot) {
                continue;
            }
            let (me, other) = pair_mut(&mut state.players, slot);
            if let Some(true) =
                ShotSystem::try_steal(&mut state.ball, me, slot, other, self.dice.as_mut())
            {
                events.push(MatchEvent::Stolen {
                    thief: slot,
                    victim: 1 - slot,
                });
            }
        }

        for player in state.players.iter_mut() {
            PhysicsSystem::step_player(player);
        }

        let prev_y = state.ball.y;
        PhysicsSystem::step_ball(&mut state.ball, &mut state.players);

        if Hoop::RIGHT.check_ball(&mut state.ball, prev_y) {
            self.scored(0, events);
            return;
        }
        if Hoop::LEFT.check_ball(&mut state.ball, prev_y) {
            self.scored(1, events);
            return;
        }

        let state = &mut self.state;

        // New possession, new shot clock
        if state.ball.last_owner != possessor {
            state.shot_clock = SHOT_CLOCK_SECS;
        }

        state.shot_clock -= DT;
        if state.shot_clock <= 0.0 {
            let new_owner = match state.ball.owner.or(state.ball.last_owner) {
                Some(previous) => 1 - previous,
                None => 0,
            };
            reset_possession(state, new_owner);
            events.push(MatchEvent::ShotClockViolation { new_owner });
        }

        state.game_clock -= DT;
        if state.game_clock <= 0.0 {
            state.game_clock = 0.0;
            state.phase = GamePhase::GameOver;
            state.phase_timer = 0.0;
            state.winner = match state.score[0].cmp(&state.score[1]) {
                std::cmp::Ordering::Greater => Some(0),
                std::cmp::Ordering::Less => Some(1),
                std::cmp::Ordering::Equal => None,
            };
            events.push(MatchEvent::GameOver {
                winner: state.winner,
                score: state.score,
            });
        }
    }

    fn scored(&mut self, scorer: usize, events: &mut Vec<MatchEvent>) {
        let state = &mut self.state;
        let points = if Hoop::target_of(scorer).is_three_pointer(state.ball.shot_origin_x) {
            3
        } else {
            2
        };
        state.score[scorer] = state.score[scorer].saturating_add(points);

        state.phase = GamePhase::Scored;
        state.phase_timer = SCORED_PAUSE_SECS;
        reset_possession(state, 1 - scorer);

        events.push(MatchEvent::Scored {
            scorer,
            points,
            score: state.score,
        });
    }
}

/// `(players[slot], players[1 - slot])`
fn pair_mut(players: &mut [PlayerState; 2], slot: usize) -> (&mut PlayerState, &mut PlayerState) {
    let [first, second] = players;
    if slot == 0 {
        (first, second)
    } else {
        (second, first)
    }
}

/// Shooting from behind the target backboard is not allowed
fn can_shoot_from(x: f32, slot: usize) -> bool {
    if slot == 0 {
        x <= Hoop::RIGHT.backboard_x
    } else {
        x >= Hoop::LEFT.backboard_x
    }
}

/// Put both players back on their spots and hand the ball to `owner`
fn reset_possession(state: &mut GameState, owner: usize) {
    state.players = [PlayerState::new(0), PlayerState::new(1)];
    state.players[owner].has_ball = true;

    state.ball = BallState::new();
    state.ball.owner = Some(owner);
    state.ball.last_owner = Some(owner);
    PhysicsSystem::hold_ball(&mut state.ball, &state.players[owner]);

    state.shot_clock = SHOT_CLOCK_SECS;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::court::{COUNTDOWN_SECS, GAME_DURATION_SECS, PICKUP_RADIUS, SPAWN_X};
    use crate::game::dice::ScriptedDice;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn match_length_ticks() -> u32 {
        (GAME_DURATION_SECS / DT).round() as u32
    }

    fn playing(dice: ScriptedDice) -> Simulation {
        let mut sim = Simulation::new(Box::new(dice));
        sim.state_mut().phase = GamePhase::Playing;
        sim.state_mut().phase_timer = 0.0;
        sim
    }

    fn give_ball(sim: &mut Simulation, slot: usize, x: f32) {
        let state = sim.state_mut();
        state.players[slot].x = x;
        state.players[slot].has_ball = true;
        state.ball.owner = Some(slot);
        state.ball.last_owner = Some(slot);
        PhysicsSystem::hold_ball(&mut state.ball, &state.players[slot]);
    }

    fn idle() -> [PlayerInput; 2] {
        [PlayerInput::default(); 2]
    }

    fn shoot(slot: usize) -> [PlayerInput; 2] {
        let mut inputs = idle();
        inputs[slot].shoot = true;
        inputs
    }

    fn assert_possession_consistent(state: &GameState) {
        for slot in 0..2 {
            assert_eq!(state.ball.owner == Some(slot), state.players[slot].has_ball);
        }
        assert!(!(state.players[0].has_ball && state.players[1].has_ball));
    }

    /// Deterministic but busy input script
    fn scripted_inputs(tick: u32) -> [PlayerInput; 2] {
        let phase = tick / 40;
        [
            PlayerInput {
                move_x: if phase % 3 == 0 { 1 } else { -1 },
                jump: tick % 53 == 0,
                shoot: tick % 97 == 0,
                tick,
            },
            PlayerInput {
                move_x: if phase % 2 == 0 { -1 } else { 1 },
                jump: tick % 31 == 0,
                shoot: tick % 23 == 0,
                tick,
            },
        ]
    }

    #[test]
    fn test_countdown_then_playing() {
        let mut sim = Simulation::new(Box::new(ScriptedDice::always_hit()));
        let countdown_ticks = (COUNTDOWN_SECS / DT).round() as u32;

        for _ in 0..countdown_ticks - 1 {
            sim.tick(idle());
            assert_eq!(sim.state().phase, GamePhase::Countdown);
        }
        // Inputs are ignored during the countdown
        let before = sim.state().players;
        sim.tick([PlayerInput { move_x: 1, jump: true, shoot: true, tick: 0 }; 2]);
        assert_eq!(sim.state().players, before);

        for _ in 0..2 {
            sim.tick(idle());
        }
        assert_eq!(sim.state().phase, GamePhase::Playing);
        assert_eq!(sim.state().tick, countdown_ticks + 2);
    }

    #[test]
    fn test_determinism_with_seeded_dice() {
        let mut a = Simulation::new(Box::new(ChaCha8Rng::seed_from_u64(42)));
        let mut b = Simulation::new(Box::new(ChaCha8Rng::seed_from_u64(42)));

        for tick in 0..3000 {
            let ea = a.tick(scripted_inputs(tick));
            let eb = b.tick(scripted_inputs(tick));
            assert_eq!(ea, eb);
        }

        let json_a = serde_json::to_string(a.state()).unwrap();
        let json_b = serde_json::to_string(b.state()).unwrap();
        assert_eq!(json_a, json_b);
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn test_possession_invariant_holds() {
        let mut sim = Simulation::new(Box::new(ChaCha8Rng::seed_from_u64(9)));
        // Countdown and post-score pauses stretch the match past its clock
        for tick in 0..match_length_ticks() * 3 {
            if sim.is_over() {
                break;
            }
            sim.tick(scripted_inputs(tick));
            assert_possession_consistent(sim.state());
            if let Some(owner) = sim.state().ball.owner {
                let (x, y) = PhysicsSystem::hold_point(&sim.state().players[owner]);
                assert_eq!((sim.state().ball.x, sim.state().ball.y), (x, y));
                assert_eq!((sim.state().ball.vx, sim.state().ball.vy), (0.0, 0.0));
            }
        }
        assert!(sim.is_over());
    }

    #[test]
    fn test_shot_under_rim_scores_two() {
        let mut sim = playing(ScriptedDice::always_hit());
        // Ball leaves the hand right under the rim center
        give_ball(&mut sim, 0, 866.0);

        let events = sim.tick(shoot(0));
        assert_eq!(events, vec![MatchEvent::ShotTaken { slot: 0, on_target: true }]);

        let mut scored = None;
        for _ in 0..120 {
            let events = sim.tick(idle());
            if let Some(event) = events
                .into_iter()
                .find(|e| matches!(e, MatchEvent::Scored { .. }))
            {
                scored = Some(event);
                break;
            }
        }

        assert_eq!(
            scored,
            Some(MatchEvent::Scored { scorer: 0, points: 2, score: [2, 0] })
        );
        let state = sim.state();
        assert_eq!(state.phase, GamePhase::Scored);
        assert_eq!(state.ball.owner, Some(1));
        assert_possession_consistent(state);
        assert_eq!(state.players[0].x, SPAWN_X[0]);
        assert_eq!(state.shot_clock, SHOT_CLOCK_SECS);
    }

    #[test]
    fn test_three_point_boundary() {
        for (origin, points) in [(730.0, 2), (729.0, 3)] {
            let mut sim = playing(ScriptedDice::always_hit());
            let state = sim.state_mut();
            state.ball.x = 880.0;
            state.ball.y = 176.0;
            state.ball.vy = 300.0;
            state.ball.in_flight = true;
            state.ball.pickup_cooldown = 20;
            state.ball.shot_origin_x = origin;

            let events = sim.tick(idle());
            assert_eq!(
                events,
                vec![MatchEvent::Scored { scorer: 0, points, score: [points, 0] }]
            );
        }
    }

    #[test]
    fn test_left_hoop_scores_for_player_one() {
        let mut sim = playing(ScriptedDice::always_hit());
        let state = sim.state_mut();
        state.ball.x = 80.0;
        state.ball.y = 176.0;
        state.ball.vy = 300.0;
        state.ball.in_flight = true;
        state.ball.pickup_cooldown = 20;
        state.ball.shot_origin_x = 400.0;

        let events = sim.tick(idle());
        assert_eq!(events, vec![MatchEvent::Scored { scorer: 1, points: 3, score: [0, 3] }]);
        assert_eq!(sim.state().ball.owner, Some(0));
    }

    #[test]
    fn test_scored_pause_resumes_play() {
        let mut sim = playing(ScriptedDice::always_hit());
        let state = sim.state_mut();
        state.phase = GamePhase::Scored;
        state.phase_timer = SCORED_PAUSE_SECS;

        let pause_ticks = (SCORED_PAUSE_SECS / DT).round() as u32;
        for _ in 0..pause_ticks + 1 {
            sim.tick(idle());
        }
        assert_eq!(sim.state().phase, GamePhase::Playing);
    }

    #[test]
    fn test_shot_clock_turnover() {
        let mut sim = playing(ScriptedDice::always_hit());
        give_ball(&mut sim, 0, 400.0);
        sim.state_mut().shot_clock = DT * 1.5;

        assert!(sim.tick(idle()).is_empty());
        let events = sim.tick(idle());

        assert_eq!(events, vec![MatchEvent::ShotClockViolation { new_owner: 1 }]);
        let state = sim.state();
        assert_eq!(state.ball.owner, Some(1));
        assert_eq!(state.shot_clock, SHOT_CLOCK_SECS);
        assert_eq!(state.score, [0, 0]);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_possession_consistent(state);
    }

    #[test]
    fn test_shot_clock_violation_on_loose_ball_goes_to_other_side() {
        let mut sim = playing(ScriptedDice::always_hit());
        let state = sim.state_mut();
        state.ball.last_owner = Some(1);
        state.ball.x = 480.0;
        state.ball.y = 100.0;
        state.ball.in_flight = true;
        state.ball.pickup_cooldown = 50;
        state.shot_clock = DT / 2.0;

        let events = sim.tick(idle());
        assert_eq!(events, vec![MatchEvent::ShotClockViolation { new_owner: 0 }]);
        assert_eq!(sim.state().ball.owner, Some(0));
    }

    #[test]
    fn test_possession_change_resets_shot_clock() {
        let mut sim = playing(ScriptedDice::always_hit());
        give_ball(&mut sim, 0, 500.0);
        sim.state_mut().players[1].x = 530.0;
        sim.state_mut().shot_clock = 5.0;

        let events = sim.tick(shoot(1));

        assert_eq!(events, vec![MatchEvent::Stolen { thief: 1, victim: 0 }]);
        assert_eq!(sim.state().ball.owner, Some(1));
        assert_eq!(sim.state().shot_clock, SHOT_CLOCK_SECS - DT);
    }

    #[test]
    fn test_block_beats_shot() {
        let mut sim = playing(ScriptedDice::always_hit());
        give_ball(&mut sim, 0, 500.0);
        let state = sim.state_mut();
        state.players[1].x = 530.0;
        state.players[1].y = state.players[0].y - 20.0;
        state.players[1].vy = -400.0;
        state.players[1].grounded = false;

        let events = sim.tick(shoot(0));

        assert_eq!(events, vec![MatchEvent::Blocked { shooter: 0, blocker: 1 }]);
        assert_eq!(sim.state().ball.owner, None);
        assert!(sim.state().ball.vx < 0.0);
        assert_eq!(sim.state().score, [0, 0]);
    }

    #[test]
    fn test_blocked_ball_rolls_clear_of_shooter() {
        let mut sim = playing(ScriptedDice::always_hit());
        give_ball(&mut sim, 0, 500.0);
        let state = sim.state_mut();
        state.players[1].x = 530.0;
        state.players[1].y = state.players[0].y - 20.0;
        state.players[1].vy = -400.0;
        state.players[1].grounded = false;

        sim.tick(shoot(0));
        for _ in 0..120 {
            sim.tick(idle());
        }

        // The shooter's pickup delay ran out long ago; the ball is simply out of reach
        let state = sim.state();
        assert_eq!(state.ball.owner, None);
        assert_eq!(state.players[0].pickup_delay, 0);
        assert!(state.ball.x < state.players[0].x - PICKUP_RADIUS);
    }

    #[test]
    fn test_carrier_shot_beats_same_tick_steal() {
        for carrier in 0..2 {
            let defender = 1 - carrier;
            let mut sim = playing(ScriptedDice::always_hit());
            give_ball(&mut sim, carrier, 500.0);
            // Defender stands behind the shooter, within steal range
            sim.state_mut().players[defender].x = if carrier == 0 { 470.0 } else { 530.0 };

            let mut both = idle();
            both[0].shoot = true;
            both[1].shoot = true;
            let events = sim.tick(both);

            assert_eq!(
                events,
                vec![MatchEvent::ShotTaken { slot: carrier, on_target: true }],
                "carrier in slot {carrier}"
            );
            let state = sim.state();
            assert_eq!(state.ball.owner, None);
            assert!(state.ball.in_flight);
            assert_eq!(state.players[defender].steal_cooldown, 0);
            assert_eq!(state.players[defender].pickup_delay, 0);
            assert_eq!(state.players[carrier].pickup_delay, 0);
            assert_possession_consistent(state);
        }
    }

    #[test]
    fn test_no_shot_from_behind_backboard() {
        let mut sim = playing(ScriptedDice::always_hit());
        give_ball(&mut sim, 0, 920.0);

        let events = sim.tick(shoot(0));

        assert!(events.is_empty());
        assert_eq!(sim.state().ball.owner, Some(0));
    }

    #[test]
    fn test_game_clock_expiry_picks_winner() {
        let mut sim = playing(ScriptedDice::always_hit());
        let state = sim.state_mut();
        state.score = [4, 7];
        state.game_clock = DT / 2.0;

        let events = sim.tick(idle());

        assert_eq!(
            events,
            vec![MatchEvent::GameOver { winner: Some(1), score: [4, 7] }]
        );
        assert!(sim.is_over());
        assert_eq!(sim.state().game_clock, 0.0);

        // Terminal: nothing moves anymore
        let frozen = *sim.state();
        assert!(sim.tick(shoot(1)).is_empty());
        assert_eq!(sim.state().players, frozen.players);
        assert_eq!(sim.state().ball, frozen.ball);
    }

    #[test]
    fn test_tie_has_no_winner() {
        let mut sim = playing(ScriptedDice::always_hit());
        sim.state_mut().score = [5, 5];
        sim.state_mut().game_clock = DT / 2.0;

        let events = sim.tick(idle());

        assert_eq!(events, vec![MatchEvent::GameOver { winner: None, score: [5, 5] }]);
        assert_eq!(sim.state().winner, None);
    }

    #[test]
    fn test_match_length() {
        assert_eq!(match_length_ticks(), 7200);
    }
}
