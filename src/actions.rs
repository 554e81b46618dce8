use serde::{Deserialize, Serialize};

use crate::game::PlayerColor;

/// Requests a peer can send to the authority.
///
/// Coordinates arrive as signed integers so out-of-range input is
/// representable and can be rejected rather than clamped. The claimed color
/// is checked against the sender's seat assignment at the session boundary;
/// a mismatch is dropped before it reaches the authority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerRequest {
    PlaceMove { x: i32, y: i32, color: PlayerColor },
    PlaceTrap { x: i32, y: i32, color: PlayerColor },
    Restart { swap_colors: bool },
}

/// State-change events emitted by the authority.
///
/// Presentation layers key their rendered objects by coordinate, so removal
/// events carry the exact cell rather than requiring any client-side search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A piece was placed.
    PieceSpawned { x: usize, y: usize, color: PlayerColor },

    /// A piece was removed (random removal after a trigger).
    PieceRemoved { x: usize, y: usize },

    /// The mover stepped on their own trap; its visual goes away for the
    /// owner. Sent before any trigger evaluation for the same cell.
    PlayerTrapRemoved { x: usize, y: usize, color: PlayerColor },

    /// A trap fired at the cell. `message` names the layers that fired and
    /// the exact number of pieces removed.
    TrapTriggered {
        x: usize,
        y: usize,
        color: PlayerColor,
        message: String,
    },

    /// The transient trap notice is cleared at the start of every accepted
    /// request.
    TrapNoticeCleared,

    /// Trap budget counters, visible to both players.
    TrapBudgetUpdated { black_used: u8, white_used: u8 },

    /// Private confirmation of a trap placement. Only the requester may ever
    /// receive this; broadcasting it would reveal the hidden location.
    TrapPlacedConfirmed { x: usize, y: usize },

    /// Turn passed to `current`.
    TurnChanged { current: PlayerColor },

    /// Five in a row; the game is over until a restart.
    WinnerDeclared { color: PlayerColor },

    /// Full reset: clients drop all rendered pieces and traps.
    GameReset { host_color: PlayerColor },
}

/// Delivery envelope for an event produced by one accepted request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Fan out to every connected peer.
    Broadcast(GameEvent),
    /// Deliver only to the peer whose request produced the event.
    Requester(GameEvent),
}

impl Outbound {
    pub fn event(&self) -> &GameEvent {
        match self {
            Outbound::Broadcast(event) | Outbound::Requester(event) => event,
        }
    }
}
