use super::board::{BoardState, PlayerColor};

/// Pieces removed per triggered trap layer.
const REMOVALS_PER_TRAP: usize = 2;

/// Outcome of evaluating a destination cell for trap triggers.
///
/// Both layers are evaluated independently and additively: a cell carrying a
/// public trap and an opponent trap fires both, doubling the removal count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapTrigger {
    pub pieces_to_remove: usize,
    pub public_triggered: bool,
    pub enemy_triggered: bool,
}

impl TrapTrigger {
    pub fn fired(&self) -> bool {
        self.pieces_to_remove > 0
    }

    fn label(&self) -> Option<&'static str> {
        match (self.public_triggered, self.enemy_triggered) {
            (true, true) => Some("public + opponent"),
            (true, false) => Some("public"),
            (false, true) => Some("opponent"),
            (false, false) => None,
        }
    }

    /// Player-facing notice naming which layers fired and the exact number
    /// of pieces removed. Empty when nothing fired.
    pub fn describe(&self) -> String {
        match self.label() {
            Some(label) => format!(
                "{} trap triggered! {} of your pieces removed!",
                label, self.pieces_to_remove
            ),
            None => String::new(),
        }
    }
}

/// Computes the trigger outcome for `mover` landing on `(x, y)`.
///
/// Pure function of the board snapshot; the turn authority applies the
/// consequences (trap consumption, piece removal). The mover's own trap on
/// the cell never fires and is expected to be removed by the caller before
/// the move resolves.
pub fn resolve(board: &BoardState, x: usize, y: usize, mover: PlayerColor) -> TrapTrigger {
    let public_triggered = board.has_public_trap(x, y);
    let enemy_triggered = board.player_trap(x, y) == Some(mover.opponent());

    let mut pieces_to_remove = 0;
    if public_triggered {
        pieces_to_remove += REMOVALS_PER_TRAP;
    }
    if enemy_triggered {
        pieces_to_remove += REMOVALS_PER_TRAP;
    }

    TrapTrigger {
        pieces_to_remove,
        public_triggered,
        enemy_triggered,
    }
}
