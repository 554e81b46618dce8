use rand::Rng;
use serde::{Deserialize, Serialize};

/// Side length of the square board.
pub const BOARD_SIZE: usize = 15;

/// Number of public traps seeded at the start of every game.
pub const PUBLIC_TRAP_COUNT: usize = 15;

/// Maximum traps a single player may place per game.
pub const MAX_PLAYER_TRAPS: u8 = 3;

/// Stone color. Black always opens the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerColor {
    Black,
    White,
}

impl PlayerColor {
    pub fn opponent(self) -> Self {
        match self {
            PlayerColor::Black => PlayerColor::White,
            PlayerColor::White => PlayerColor::Black,
        }
    }
}

impl std::fmt::Display for PlayerColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayerColor::Black => write!(f, "black"),
            PlayerColor::White => write!(f, "white"),
        }
    }
}

/// The three grids and trap counters for one match.
///
/// Pure data with invariant-preserving mutators. Callers (the turn authority)
/// validate coordinates before touching the board; an out-of-range index here
/// is a broken invariant and panics via the array bounds check rather than
/// being reported as a recoverable error.
#[derive(Debug, Clone)]
pub struct BoardState {
    pieces: [[Option<PlayerColor>; BOARD_SIZE]; BOARD_SIZE],
    public_traps: [[bool; BOARD_SIZE]; BOARD_SIZE],
    player_traps: [[Option<PlayerColor>; BOARD_SIZE]; BOARD_SIZE],
    black_traps_used: u8,
    white_traps_used: u8,
}

impl BoardState {
    pub fn new() -> Self {
        BoardState {
            pieces: [[None; BOARD_SIZE]; BOARD_SIZE],
            public_traps: [[false; BOARD_SIZE]; BOARD_SIZE],
            player_traps: [[None; BOARD_SIZE]; BOARD_SIZE],
            black_traps_used: 0,
            white_traps_used: 0,
        }
    }

    pub fn piece(&self, x: usize, y: usize) -> Option<PlayerColor> {
        self.pieces[x][y]
    }

    pub fn set_piece(&mut self, x: usize, y: usize, color: PlayerColor) {
        debug_assert!(self.pieces[x][y].is_none(), "cell already holds a piece");
        self.pieces[x][y] = Some(color);
    }

    pub fn clear_piece(&mut self, x: usize, y: usize) {
        self.pieces[x][y] = None;
    }

    /// Coordinates of every piece of the given color, in row-major order.
    pub fn pieces_of(&self, color: PlayerColor) -> Vec<(usize, usize)> {
        let mut cells = Vec::new();
        for x in 0..BOARD_SIZE {
            for y in 0..BOARD_SIZE {
                if self.pieces[x][y] == Some(color) {
                    cells.push((x, y));
                }
            }
        }
        cells
    }

    pub fn player_trap(&self, x: usize, y: usize) -> Option<PlayerColor> {
        self.player_traps[x][y]
    }

    /// Places a trap for `color` and spends one unit of their budget.
    /// Budget is restored only by a full reset, never by trap removal.
    pub fn place_player_trap(&mut self, x: usize, y: usize, color: PlayerColor) {
        debug_assert!(self.traps_used(color) < MAX_PLAYER_TRAPS);
        debug_assert!(self.player_traps[x][y] != Some(color));
        self.player_traps[x][y] = Some(color);
        match color {
            PlayerColor::Black => self.black_traps_used += 1,
            PlayerColor::White => self.white_traps_used += 1,
        }
    }

    pub fn clear_player_trap(&mut self, x: usize, y: usize) {
        self.player_traps[x][y] = None;
    }

    pub fn traps_used(&self, color: PlayerColor) -> u8 {
        match color {
            PlayerColor::Black => self.black_traps_used,
            PlayerColor::White => self.white_traps_used,
        }
    }

    pub fn has_public_trap(&self, x: usize, y: usize) -> bool {
        self.public_traps[x][y]
    }

    /// Removes the public trap at the cell, reporting whether one was there.
    /// A consumed trap never retriggers.
    pub fn consume_public_trap(&mut self, x: usize, y: usize) -> bool {
        let present = self.public_traps[x][y];
        self.public_traps[x][y] = false;
        present
    }

    pub(crate) fn set_public_trap(&mut self, x: usize, y: usize) {
        self.public_traps[x][y] = true;
    }

    pub(crate) fn clear_public_traps(&mut self) {
        self.public_traps = [[false; BOARD_SIZE]; BOARD_SIZE];
    }

    /// Replaces the public-trap layer with exactly [`PUBLIC_TRAP_COUNT`]
    /// traps at distinct uniformly random cells.
    pub fn seed_public_traps<R: Rng>(&mut self, rng: &mut R) {
        self.clear_public_traps();
        let mut placed = 0;
        while placed < PUBLIC_TRAP_COUNT {
            let x = rng.gen_range(0..BOARD_SIZE);
            let y = rng.gen_range(0..BOARD_SIZE);
            if !self.public_traps[x][y] {
                self.public_traps[x][y] = true;
                placed += 1;
            }
        }
    }

    pub fn public_trap_count(&self) -> usize {
        self.public_traps
            .iter()
            .map(|col| col.iter().filter(|&&t| t).count())
            .sum()
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new()
    }
}
