//! Matchmaking service - pairs connections into rooms

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::ws::connection::Connection;

use super::queue::{disambiguate, WaitingSlot};

/// Starts a room for a freshly paired couple of connections.
///
/// The room owns `ticket` until it finishes; dropping it frees the room slot.
pub trait RoomCreator: Send + Sync {
    fn create_room(&self, first: Arc<Connection>, second: Arc<Connection>, ticket: RoomTicket);
}

/// One reserved active-room slot
#[derive(Debug)]
pub struct RoomTicket {
    active_rooms: Arc<AtomicUsize>,
}

impl Drop for RoomTicket {
    fn drop(&mut self) {
        let left = self.active_rooms.fetch_sub(1, Ordering::AcqRel) - 1;
        debug!(active_rooms = left, "Room slot released");
    }
}

/// Live hub counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HubStats {
    pub active_rooms: usize,
    pub total_connections: u64,
    pub waiting_players: usize,
}

/// What happened to a connection handed to [`MatchmakingService::try_match`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pairing {
    /// Parked in the waiting slot
    Waiting,
    /// Paired with the previous waiter; a room was created
    Matched,
    /// Room capacity reached; the connection was closed
    Rejected,
}

/// Matchmaking service
pub struct MatchmakingService {
    slot: Mutex<WaitingSlot>,
    creator: Arc<dyn RoomCreator>,
    next_id: AtomicU64,
    active_rooms: Arc<AtomicUsize>,
    total_connections: AtomicU64,
    max_active_rooms: usize,
}

impl MatchmakingService {
    pub fn new(creator: Arc<dyn RoomCreator>, max_active_rooms: usize) -> Self {
        Self {
            slot: Mutex::new(WaitingSlot::Empty),
            creator,
            next_id: AtomicU64::new(0),
            active_rooms: Arc::new(AtomicUsize::new(0)),
            total_connections: AtomicU64::new(0),
            max_active_rooms,
        }
    }

    /// Count a newly accepted connection and assign its id
    pub fn admit(&self) -> String {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("player-{n}")
    }

    /// Pair `conn` with the waiting connection, or make it the waiter
    pub fn try_match(self: &Arc<Self>, conn: Arc<Connection>) -> Pairing {
        let mut slot = self.slot.lock();

        let Some(opponent) = slot.open_waiter().cloned() else {
            slot.park(conn.clone());
            drop(slot);
            info!(conn_id = %conn.id, "Waiting for opponent");
            self.watch_waiter(conn);
            return Pairing::Waiting;
        };

        if self.active_rooms.load(Ordering::Acquire) >= self.max_active_rooms {
            drop(slot);
            warn!(conn_id = %conn.id, max_rooms = self.max_active_rooms, "Max rooms reached, rejecting");
            conn.reject();
            return Pairing::Rejected;
        }

        slot.take();

        let nickname = conn.nickname();
        if opponent.nickname() == nickname {
            let renamed = disambiguate(&nickname);
            info!(conn_id = %conn.id, nickname = %renamed, "Renamed duplicate nickname");
            conn.set_nickname(renamed);
        }

        let rooms = self.active_rooms.fetch_add(1, Ordering::AcqRel) + 1;
        let ticket = RoomTicket {
            active_rooms: self.active_rooms.clone(),
        };
        drop(slot);

        info!(
            first = %opponent.id,
            first_name = %opponent.nickname(),
            second = %conn.id,
            second_name = %conn.nickname(),
            active_rooms = rooms,
            "Players matched"
        );
        self.creator.create_room(opponent, conn, ticket);
        Pairing::Matched
    }

    /// Free the slot if the waiter leaves before being paired
    fn watch_waiter(self: &Arc<Self>, conn: Arc<Connection>) {
        let service = self.clone();
        tokio::spawn(async move {
            conn.closed().await;
            if service.slot.lock().clear_if(&conn) {
                info!(conn_id = %conn.id, "Disconnected while waiting");
            }
        });
    }

    pub fn stats(&self) -> HubStats {
        let waiting_players = usize::from(self.slot.lock().open_waiter().is_some());
        HubStats {
            active_rooms: self.active_rooms.load(Ordering::Acquire),
            total_connections: self.total_connections.load(Ordering::Relaxed),
            waiting_players,
        }
    }
}
