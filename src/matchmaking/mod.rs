//! Matchmaking: one waiting slot, pairing, room accounting

pub mod queue;
pub mod service;

pub use service::{MatchmakingService, RoomCreator, RoomTicket};
