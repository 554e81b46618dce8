// Authoritative server for a two-player Gomoku variant with traps.
//
// The game core (board, trap resolution, win detection, turn authority)
// lives under `game` and is free of any networking concern; `service` wraps
// one authority per match in a single-consumer command queue; `session` and
// `websocket` carry events to the two connected peers.

// Core game logic
pub mod actions;
pub mod errors;
pub mod game;

// Server implementation
pub mod service;
pub mod session;
pub mod websocket;

// Re-export common types for convenient access
pub use crate::actions::{GameEvent, Outbound, PlayerRequest};
pub use crate::errors::{Reject, ServerError, ServerResult, SessionError};
pub use crate::game::{
    BoardState, PlayerColor, TurnAuthority, BOARD_SIZE, MAX_PLAYER_TRAPS, PUBLIC_TRAP_COUNT,
};
pub use crate::service::{spawn_match, MatchCommand, MatchHandle};
pub use crate::session::{ColorAssignment, EventTransport, PeerId, Seat, ServerMessage};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
