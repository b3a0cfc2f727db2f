//! Match room and authoritative tick loop

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::matchmaking::{RoomCreator, RoomTicket};
use crate::util::signal::CancelSignal;
use crate::util::time::{tick_duration, unix_millis, SIMULATION_TPS};
use crate::ws::connection::Connection;
use crate::ws::protocol::{ClientMsg, ServerMsg};

use super::dice::Dice;
use super::simulation::{MatchEvent, Simulation};
use super::state::PlayerInput;

/// State shared between the tick loop and the input pumps
struct RoomShared {
    id: Uuid,
    conns: [Arc<Connection>; 2],
    /// Latest buffered input per slot
    inputs: Mutex<[PlayerInput; 2]>,
    /// Tick last simulated, for stamping replies sent from the pumps
    tick: AtomicU32,
    cancel: CancelSignal,
}

impl RoomShared {
    fn tick(&self) -> u32 {
        self.tick.load(Ordering::Relaxed)
    }

    /// Tell the peer, then stop the room. Only the first report counts.
    fn player_left(&self, slot: usize) {
        if self.cancel.is_cancelled() {
            return;
        }
        info!(match_id = %self.id, slot, conn_id = %self.conns[slot].id, "Player disconnected");
        self.conns[1 - slot].send(
            &ServerMsg::PlayerDisconnected {
                player_index: slot as u8,
            },
            self.tick(),
        );
        self.cancel.cancel();
    }
}

/// One running two-player match
pub struct GameMatch {
    shared: Arc<RoomShared>,
    names: [String; 2],
    sim: Simulation,
    linger_ticks: u32,
}

impl GameMatch {
    /// Create a match with a freshly seeded random source
    pub fn new(first: Arc<Connection>, second: Arc<Connection>, linger: Duration) -> Self {
        let seed = rand::random::<u64>();
        let game = Self::with_dice(
            first,
            second,
            linger,
            Box::new(ChaCha8Rng::seed_from_u64(seed)),
        );
        debug!(match_id = %game.id(), seed, "Match seeded");
        game
    }

    pub fn with_dice(
        first: Arc<Connection>,
        second: Arc<Connection>,
        linger: Duration,
        dice: Box<dyn Dice>,
    ) -> Self {
        let names = [first.nickname(), second.nickname()];
        let linger_ticks = (linger.as_millis() as u64 * SIMULATION_TPS as u64 / 1000)
            .min(u32::MAX as u64) as u32;

        Self {
            shared: Arc::new(RoomShared {
                id: Uuid::new_v4(),
                conns: [first, second],
                inputs: Mutex::new([PlayerInput::default(); 2]),
                tick: AtomicU32::new(0),
                cancel: CancelSignal::new(),
            }),
            names,
            sim: Simulation::new(dice),
            linger_ticks,
        }
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Run the room until the match ends or a player leaves
    pub async fn run(mut self) {
        let shared = self.shared.clone();
        info!(
            match_id = %shared.id,
            first = %self.names[0],
            second = %self.names[1],
            "Match started"
        );

        for (slot, conn) in shared.conns.iter().enumerate() {
            conn.send(
                &ServerMsg::GameStart {
                    player_index: slot as u8,
                    names: self.names.clone(),
                },
                0,
            );
        }

        let pumps: Vec<JoinHandle<()>> = (0..2)
            .map(|slot| tokio::spawn(pump_inputs(shared.clone(), slot)))
            .collect();

        let mut tick_interval = interval(tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks_since_over: Option<u32> = None;

        loop {
            tokio::select! {
                biased;
                _ = shared.cancel.cancelled() => break,
                _ = tick_interval.tick() => {}
            }

            let inputs = {
                let mut buffered = shared.inputs.lock();
                [buffered[0].take(), buffered[1].take()]
            };

            let events = self.sim.tick(inputs);
            let tick = self.sim.state().tick;
            shared.tick.store(tick, Ordering::Relaxed);

            for event in events {
                self.handle_event(event, tick);
            }
            self.broadcast_state(tick);

            if self.sim.is_over() {
                let waited = ticks_since_over.get_or_insert(0);
                if *waited >= self.linger_ticks {
                    break;
                }
                *waited += 1;
            }
        }

        shared.cancel.cancel();
        for conn in shared.conns.iter() {
            conn.close();
        }
        for pump in pumps {
            let _ = pump.await;
        }

        let state = self.sim.state();
        info!(
            match_id = %shared.id,
            tick = state.tick,
            score = ?state.score,
            "Match ended"
        );
    }

    fn handle_event(&self, event: MatchEvent, tick: u32) {
        let id = self.shared.id;
        match event {
            MatchEvent::ShotTaken { slot, on_target } => {
                debug!(match_id = %id, slot, on_target, "Shot taken");
            }
            MatchEvent::Blocked { shooter, blocker } => {
                info!(match_id = %id, shooter, blocker, "Shot blocked");
            }
            MatchEvent::Stolen { thief, victim } => {
                info!(match_id = %id, thief, victim, "Ball stolen");
            }
            MatchEvent::ShotClockViolation { new_owner } => {
                info!(match_id = %id, new_owner, "Shot clock violation");
            }
            MatchEvent::Scored {
                scorer,
                points,
                score,
            } => {
                info!(match_id = %id, scorer, points, score = ?score, "Scored");
                self.send_all(
                    &ServerMsg::Scored {
                        scorer_index: scorer as u8,
                        points,
                        new_score: score,
                    },
                    tick,
                );
            }
            MatchEvent::GameOver { winner, score } => {
                info!(match_id = %id, winner = ?winner, score = ?score, "Game over");
                self.send_all(
                    &ServerMsg::GameOver {
                        winner: winner.map_or(-1, |slot| slot as i8),
                        score,
                    },
                    tick,
                );
            }
        }
    }

    fn send_all(&self, msg: &ServerMsg, tick: u32) {
        for conn in self.shared.conns.iter() {
            conn.send(msg, tick);
        }
    }

    /// Encode the state once and queue it for both players
    fn broadcast_state(&self, tick: u32) {
        let msg = ServerMsg::GameState(Box::new(*self.sim.state()));
        match msg.encode(tick) {
            Ok(text) => {
                for conn in self.shared.conns.iter() {
                    conn.send_text(text.clone());
                }
            }
            Err(e) => {
                error!(match_id = %self.shared.id, tick, error = %e, "Failed to encode state");
            }
        }
    }
}

/// Feed one player's messages into the room until it stops or they leave
async fn pump_inputs(shared: Arc<RoomShared>, slot: usize) {
    let conn = shared.conns[slot].clone();
    let Some(mut inbound) = conn.take_inbound() else {
        shared.player_left(slot);
        return;
    };

    loop {
        let msg = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => return,
            _ = conn.closed() => None,
            msg = inbound.recv() => msg,
        };

        let Some(msg) = msg else {
            shared.player_left(slot);
            return;
        };

        match msg {
            ClientMsg::PlayerInput(input) => {
                shared.inputs.lock()[slot].latch(input);
            }
            ClientMsg::Ping { client_time } => {
                conn.send(
                    &ServerMsg::Pong {
                        client_time,
                        server_time: unix_millis(),
                    },
                    shared.tick(),
                );
            }
            ClientMsg::JoinQueue { name } => {
                debug!(match_id = %shared.id, slot, name = %name, "Ignoring JoinQueue during a match");
            }
        }
    }
}

/// Room creation callback handed to the matchmaking service
pub struct MatchLauncher {
    linger: Duration,
}

impl MatchLauncher {
    pub fn new(linger: Duration) -> Self {
        Self { linger }
    }
}

impl RoomCreator for MatchLauncher {
    fn create_room(&self, first: Arc<Connection>, second: Arc<Connection>, ticket: RoomTicket) {
        let game = GameMatch::new(first, second, self.linger);
        tokio::spawn(async move {
            game.run().await;
            drop(ticket);
        });
    }
}
