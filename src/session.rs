use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actions::GameEvent;
use crate::errors::ServerResult;
use crate::game::{PlayerColor, BOARD_SIZE};

/// Identifies one connected peer for the lifetime of its connection.
pub type PeerId = Uuid;

/// The two seats of a match. The host's state is canonical and only the host
/// may restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Seat {
    Host,
    Guest,
}

/// Host color assignment, computed once per match and carried explicitly
/// instead of being re-derived from "am I host" at every use site. The guest
/// always holds the complementary color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorAssignment {
    host: PlayerColor,
}

impl ColorAssignment {
    pub fn new(host: PlayerColor) -> Self {
        ColorAssignment { host }
    }

    pub fn host(&self) -> PlayerColor {
        self.host
    }

    pub fn guest(&self) -> PlayerColor {
        self.host.opponent()
    }

    pub fn for_seat(&self, seat: Seat) -> PlayerColor {
        match seat {
            Seat::Host => self.host(),
            Seat::Guest => self.guest(),
        }
    }
}

/// Messages the server delivers to peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent privately when a peer takes a seat.
    Welcome {
        seat: Seat,
        assigned_color: PlayerColor,
        host_color: PlayerColor,
        current_turn: PlayerColor,
        board_size: usize,
    },

    /// A state-change event from the authority.
    Event(GameEvent),

    /// Session-level failure (game-rule rejections are silent and never use
    /// this).
    Error { message: String },
}

impl ServerMessage {
    pub fn welcome(
        seat: Seat,
        assigned_color: PlayerColor,
        host_color: PlayerColor,
        current_turn: PlayerColor,
    ) -> Self {
        ServerMessage::Welcome {
            seat,
            assigned_color,
            host_color,
            current_turn,
            board_size: BOARD_SIZE,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}

/// Transport-agnostic event dispatch. The authority side only ever needs
/// "send to one peer" and "send to everyone"; the websocket layer implements
/// the actual wire delivery. Neither call waits for peer acknowledgment.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn send_to(&self, peer: PeerId, message: &ServerMessage) -> ServerResult<()>;

    async fn broadcast(&self, message: &ServerMessage) -> ServerResult<()>;
}
