pub mod authority;
pub mod board;
pub mod traps;
pub mod win;

pub use authority::TurnAuthority;
pub use board::{BoardState, PlayerColor, BOARD_SIZE, MAX_PLAYER_TRAPS, PUBLIC_TRAP_COUNT};
pub use traps::TrapTrigger;
