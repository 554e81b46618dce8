use super::board::{BoardState, PlayerColor, BOARD_SIZE};

/// Run length required to win.
const WIN_LENGTH: usize = 5;

/// The four line orientations through a cell: horizontal, vertical, and the
/// two diagonals. The opposite direction of each is scanned separately.
const DIRECTIONS: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// Reports whether placing `color` at `(x, y)` completed a run of five or
/// more. Incremental detection: only lines through the last move are scanned,
/// which is sufficient because any new winning run must contain it. Runs do
/// not wrap at board edges.
pub fn check_win(board: &BoardState, x: usize, y: usize, color: PlayerColor) -> bool {
    for (dx, dy) in DIRECTIONS {
        let run = 1 + count_run(board, x, y, dx, dy, color) + count_run(board, x, y, -dx, -dy, color);
        if run >= WIN_LENGTH {
            return true;
        }
    }
    false
}

/// Consecutive same-color cells extending from (but excluding) `(x, y)` in
/// direction `(dx, dy)`.
fn count_run(board: &BoardState, x: usize, y: usize, dx: i32, dy: i32, color: PlayerColor) -> usize {
    let mut count = 0;
    for step in 1..WIN_LENGTH as i32 {
        let nx = x as i32 + dx * step;
        let ny = y as i32 + dy * step;
        if nx < 0 || nx >= BOARD_SIZE as i32 || ny < 0 || ny >= BOARD_SIZE as i32 {
            break;
        }
        if board.piece(nx as usize, ny as usize) != Some(color) {
            break;
        }
        count += 1;
    }
    count
}
