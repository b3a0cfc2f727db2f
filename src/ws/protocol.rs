//! WebSocket protocol message definitions
//!
//! Every frame is a JSON envelope `{type, tick, payload}` where `type` is a
//! one-byte message code and `payload` depends on it.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::game::state::{GameState, PlayerInput};

/// Message type codes
pub mod msg_type {
    // Client -> server
    pub const PLAYER_INPUT: u8 = 0x01;
    pub const JOIN_QUEUE: u8 = 0x02;
    pub const PING: u8 = 0x04;

    // Server -> client
    pub const GAME_STATE: u8 = 0x81;
    pub const GAME_START: u8 = 0x82;
    pub const GAME_OVER: u8 = 0x83;
    pub const SCORED: u8 = 0x84;
    pub const PONG: u8 = 0x86;
    pub const PLAYER_DISCONNECTED: u8 = 0x87;
}

/// Wire envelope shared by both directions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub tick: u32,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JoinQueuePayload {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PingPayload {
    client_time: u64,
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMsg {
    /// Latest controls
    PlayerInput(PlayerInput),
    /// "Play again" request; accepted but not acted upon
    JoinQueue { name: String },
    /// Latency probe
    Ping { client_time: u64 },
}

impl ClientMsg {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        match envelope.kind {
            msg_type::PLAYER_INPUT => {
                let input: PlayerInput = serde_json::from_value(envelope.payload)?;
                Ok(Self::PlayerInput(input))
            }
            msg_type::JOIN_QUEUE => {
                let payload: JoinQueuePayload = if envelope.payload.is_null() {
                    JoinQueuePayload { name: String::new() }
                } else {
                    serde_json::from_value(envelope.payload)?
                };
                Ok(Self::JoinQueue { name: payload.name })
            }
            msg_type::PING => {
                let payload: PingPayload = serde_json::from_value(envelope.payload)?;
                Ok(Self::Ping {
                    client_time: payload.client_time,
                })
            }
            other => Err(ProtocolError::UnknownType(other)),
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone)]
pub enum ServerMsg {
    /// Full authoritative snapshot, once per tick
    GameState(Box<GameState>),
    /// Sent once per player when a match starts
    GameStart { player_index: u8, names: [String; 2] },
    /// Final result; `winner` is -1 on a tie
    GameOver { winner: i8, score: [u8; 2] },
    Scored {
        scorer_index: u8,
        points: u8,
        new_score: [u8; 2],
    },
    Pong { client_time: u64, server_time: u64 },
    /// The opponent left; the match is over
    PlayerDisconnected { player_index: u8 },
}

impl ServerMsg {
    pub fn type_code(&self) -> u8 {
        match self {
            Self::GameState(_) => msg_type::GAME_STATE,
            Self::GameStart { .. } => msg_type::GAME_START,
            Self::GameOver { .. } => msg_type::GAME_OVER,
            Self::Scored { .. } => msg_type::SCORED,
            Self::Pong { .. } => msg_type::PONG,
            Self::PlayerDisconnected { .. } => msg_type::PLAYER_DISCONNECTED,
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        let payload = match self {
            Self::GameState(state) => serde_json::to_value(state)?,
            Self::GameStart {
                player_index,
                names,
            } => json!({ "playerIndex": player_index, "names": names }),
            Self::GameOver { winner, score } => json!({ "winner": winner, "score": score }),
            Self::Scored {
                scorer_index,
                points,
                new_score,
            } => json!({
                "scorerIndex": scorer_index,
                "points": points,
                "newScore": new_score,
            }),
            Self::Pong {
                client_time,
                server_time,
            } => json!({ "clientTime": client_time, "serverTime": server_time }),
            Self::PlayerDisconnected { player_index } => json!({ "playerIndex": player_index }),
        };
        Ok(payload)
    }

    /// Wrap in an envelope stamped with `tick` and serialize
    pub fn encode(&self, tick: u32) -> Result<String, ProtocolError> {
        let envelope = Envelope {
            kind: self.type_code(),
            tick,
            payload: self.payload()?,
        };
        Ok(serde_json::to_string(&envelope)?)
    }
}

/// Protocol errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown message type: {0:#04x}")]
    UnknownType(u8),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn parse(text: &str) -> Value {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_decode_player_input() {
        let msg = assert_ok!(ClientMsg::decode(
            r#"{"type":1,"tick":12,"payload":{"moveX":-1,"jump":true,"shoot":false,"tick":12}}"#
        ));
        assert_eq!(
            msg,
            ClientMsg::PlayerInput(PlayerInput {
                move_x: -1,
                jump: true,
                shoot: false,
                tick: 12
            })
        );
    }

    #[test]
    fn test_decode_partial_input_defaults() {
        let msg = assert_ok!(ClientMsg::decode(r#"{"type":1,"tick":3,"payload":{"shoot":true}}"#));
        assert_eq!(
            msg,
            ClientMsg::PlayerInput(PlayerInput {
                shoot: true,
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_decode_ping_and_join_queue() {
        let ping = assert_ok!(ClientMsg::decode(
            r#"{"type":4,"tick":0,"payload":{"clientTime":1700000000123}}"#
        ));
        assert_eq!(
            ping,
            ClientMsg::Ping {
                client_time: 1_700_000_000_123
            }
        );

        let join = assert_ok!(ClientMsg::decode(r#"{"type":2,"tick":0,"payload":{"name":"Bo"}}"#));
        assert_eq!(join, ClientMsg::JoinQueue { name: "Bo".into() });

        let bare = assert_ok!(ClientMsg::decode(r#"{"type":2}"#));
        assert_eq!(bare, ClientMsg::JoinQueue { name: String::new() });
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            assert_err!(ClientMsg::decode("not json")),
            ProtocolError::Json(_)
        ));
        assert!(matches!(
            assert_err!(ClientMsg::decode(r#"{"type":129,"tick":0,"payload":{}}"#)),
            ProtocolError::UnknownType(0x81)
        ));
        // moveX outside int8
        assert!(matches!(
            assert_err!(ClientMsg::decode(r#"{"type":1,"payload":{"moveX":300}}"#)),
            ProtocolError::Json(_)
        ));
        assert_err!(ClientMsg::decode(r#"{"type":4,"payload":{}}"#));
    }

    #[test]
    fn test_encode_game_state() {
        let state = GameState::new();
        let text = assert_ok!(ServerMsg::GameState(Box::new(state)).encode(77));
        let json = parse(&text);

        assert_eq!(json["type"], 0x81);
        assert_eq!(json["tick"], 77);
        assert_eq!(json["payload"]["phase"], 1);
        assert_eq!(json["payload"]["ball"]["owner"], -1);
        assert_eq!(json["payload"]["players"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn test_encode_event_payloads() {
        let start = ServerMsg::GameStart {
            player_index: 1,
            names: ["Al".into(), "Bo".into()],
        };
        let json = parse(&assert_ok!(start.encode(0)));
        assert_eq!(json["type"], 0x82);
        assert_eq!(json["payload"]["playerIndex"], 1);
        assert_eq!(json["payload"]["names"][1], "Bo");

        let scored = ServerMsg::Scored {
            scorer_index: 0,
            points: 3,
            new_score: [3, 2],
        };
        let json = parse(&assert_ok!(scored.encode(5)));
        assert_eq!(json["type"], 0x84);
        assert_eq!(json["payload"]["scorerIndex"], 0);
        assert_eq!(json["payload"]["newScore"][0], 3);

        let over = ServerMsg::GameOver {
            winner: -1,
            score: [4, 4],
        };
        let json = parse(&assert_ok!(over.encode(9)));
        assert_eq!(json["type"], 0x83);
        assert_eq!(json["payload"]["winner"], -1);

        let pong = ServerMsg::Pong {
            client_time: 10,
            server_time: 20,
        };
        let json = parse(&assert_ok!(pong.encode(1)));
        assert_eq!(json["type"], 0x86);
        assert_eq!(json["payload"]["clientTime"], 10);
        assert_eq!(json["payload"]["serverTime"], 20);

        let gone = ServerMsg::PlayerDisconnected { player_index: 0 };
        let json = parse(&assert_ok!(gone.encode(2)));
        assert_eq!(json["type"], 0x87);
        assert_eq!(json["payload"]["playerIndex"], 0);
    }
}
