use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

use super::board::{BoardState, PlayerColor, BOARD_SIZE, MAX_PLAYER_TRAPS};
use super::{traps, win};
use crate::actions::{GameEvent, Outbound};
use crate::errors::Reject;

/// The authoritative state machine for one match.
///
/// Owns every piece of mutable game state: board, turn, winner, host color
/// assignment, and the RNG driving trap seeding and random removals. Exactly
/// one instance exists per match and all mutation flows through the three
/// request handlers, which either apply atomically and return the ordered
/// events to deliver, or reject with no observable effect.
#[derive(Debug)]
pub struct TurnAuthority {
    board: BoardState,
    turn: PlayerColor,
    winner: Option<PlayerColor>,
    host_color: PlayerColor,
    last_trap_notice: Option<String>,
    rng: XorShiftRng,
}

impl TurnAuthority {
    pub fn new() -> Self {
        Self::with_rng(XorShiftRng::from_entropy())
    }

    /// Deterministic construction for tests: trap seeding and random piece
    /// removal replay identically for the same seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(XorShiftRng::seed_from_u64(seed))
    }

    fn with_rng(mut rng: XorShiftRng) -> Self {
        let mut board = BoardState::new();
        board.seed_public_traps(&mut rng);
        TurnAuthority {
            board,
            turn: PlayerColor::Black,
            winner: None,
            host_color: PlayerColor::Black,
            last_trap_notice: None,
            rng,
        }
    }

    pub fn board(&self) -> &BoardState {
        &self.board
    }

    pub fn turn(&self) -> PlayerColor {
        self.turn
    }

    pub fn winner(&self) -> Option<PlayerColor> {
        self.winner
    }

    pub fn host_color(&self) -> PlayerColor {
        self.host_color
    }

    pub fn guest_color(&self) -> PlayerColor {
        self.host_color.opponent()
    }

    pub fn last_trap_notice(&self) -> Option<&str> {
        self.last_trap_notice.as_deref()
    }

    /// A move request: place a piece, or trigger traps at the destination.
    pub fn handle_move(
        &mut self,
        requester: PlayerColor,
        x: i32,
        y: i32,
    ) -> Result<Vec<Outbound>, Reject> {
        self.check_active(requester)?;
        let (x, y) = check_bounds(x, y)?;
        if self.board.piece(x, y).is_some() {
            return Err(Reject::CellOccupied);
        }

        let mut out = self.clear_trap_notice();

        // Stepping on your own trap disarms it before triggers are
        // evaluated, so it never counts against you.
        if self.board.player_trap(x, y) == Some(requester) {
            self.board.clear_player_trap(x, y);
            out.push(Outbound::Broadcast(GameEvent::PlayerTrapRemoved {
                x,
                y,
                color: requester,
            }));
        }

        let trigger = traps::resolve(&self.board, x, y, requester);
        if trigger.fired() {
            if trigger.public_triggered {
                self.board.consume_public_trap(x, y);
            }
            if trigger.enemy_triggered {
                self.board.clear_player_trap(x, y);
            }

            // The move is forfeited: no piece lands at (x, y); the mover
            // loses pieces of their own instead.
            for (rx, ry) in self.remove_random_pieces(requester, trigger.pieces_to_remove) {
                out.push(Outbound::Broadcast(GameEvent::PieceRemoved { x: rx, y: ry }));
            }

            let message = trigger.describe();
            self.last_trap_notice = Some(message.clone());
            out.push(Outbound::Broadcast(GameEvent::TrapTriggered {
                x,
                y,
                color: requester,
                message,
            }));
        } else {
            self.board.set_piece(x, y, requester);
            out.push(Outbound::Broadcast(GameEvent::PieceSpawned {
                x,
                y,
                color: requester,
            }));

            if win::check_win(&self.board, x, y, requester) {
                self.winner = Some(requester);
                out.push(Outbound::Broadcast(GameEvent::WinnerDeclared { color: requester }));
            }
        }

        // The turn flips even on the winning move; subsequent requests die
        // on the winner check, not on turn ownership.
        out.push(self.flip_turn());
        Ok(out)
    }

    /// A trap-placement request. Costs the whole turn; the placed location is
    /// confirmed only to the requester.
    pub fn handle_trap(
        &mut self,
        requester: PlayerColor,
        x: i32,
        y: i32,
    ) -> Result<Vec<Outbound>, Reject> {
        self.check_active(requester)?;
        let (x, y) = check_bounds(x, y)?;
        if self.board.traps_used(requester) >= MAX_PLAYER_TRAPS {
            return Err(Reject::TrapBudgetExhausted);
        }
        if self.board.piece(x, y).is_some() {
            return Err(Reject::CellOccupied);
        }
        if self.board.player_trap(x, y) == Some(requester) {
            return Err(Reject::DuplicateTrap);
        }

        let mut out = self.clear_trap_notice();

        self.board.place_player_trap(x, y, requester);
        out.push(Outbound::Broadcast(GameEvent::TrapBudgetUpdated {
            black_used: self.board.traps_used(PlayerColor::Black),
            white_used: self.board.traps_used(PlayerColor::White),
        }));
        out.push(Outbound::Requester(GameEvent::TrapPlacedConfirmed { x, y }));

        out.push(self.flip_turn());
        Ok(out)
    }

    /// Wholesale reset. The public-trap layer is regenerated, not merely
    /// cleared; Black moves first regardless of the color swap.
    pub fn restart(&mut self, swap_colors: bool) -> Vec<Outbound> {
        self.board = BoardState::new();
        self.board.seed_public_traps(&mut self.rng);
        self.winner = None;
        self.last_trap_notice = None;
        if swap_colors {
            self.host_color = self.host_color.opponent();
        }
        self.turn = PlayerColor::Black;

        vec![
            Outbound::Broadcast(GameEvent::GameReset {
                host_color: self.host_color,
            }),
            Outbound::Broadcast(GameEvent::TurnChanged { current: self.turn }),
        ]
    }

    fn check_active(&self, requester: PlayerColor) -> Result<(), Reject> {
        if self.winner.is_some() {
            return Err(Reject::GameOver);
        }
        if requester != self.turn {
            return Err(Reject::NotYourTurn);
        }
        Ok(())
    }

    fn clear_trap_notice(&mut self) -> Vec<Outbound> {
        self.last_trap_notice = None;
        vec![Outbound::Broadcast(GameEvent::TrapNoticeCleared)]
    }

    fn flip_turn(&mut self) -> Outbound {
        self.turn = self.turn.opponent();
        Outbound::Broadcast(GameEvent::TurnChanged { current: self.turn })
    }

    /// Removes up to `count` of the mover's pieces, chosen uniformly at
    /// random without replacement. Fewer pieces than `count` removes them
    /// all; that is not an error.
    fn remove_random_pieces(&mut self, color: PlayerColor, count: usize) -> Vec<(usize, usize)> {
        let mut pool = self.board.pieces_of(color);
        let mut removed = Vec::new();
        for _ in 0..count {
            if pool.is_empty() {
                break;
            }
            let idx = self.rng.gen_range(0..pool.len());
            let (x, y) = pool.swap_remove(idx);
            self.board.clear_piece(x, y);
            removed.push((x, y));
        }
        removed
    }

    #[cfg(test)]
    pub(crate) fn board_mut(&mut self) -> &mut BoardState {
        &mut self.board
    }
}

impl Default for TurnAuthority {
    fn default() -> Self {
        Self::new()
    }
}

fn check_bounds(x: i32, y: i32) -> Result<(usize, usize), Reject> {
    let range = 0..BOARD_SIZE as i32;
    if range.contains(&x) && range.contains(&y) {
        Ok((x as usize, y as usize))
    } else {
        Err(Reject::OutOfBounds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::PUBLIC_TRAP_COUNT;
    use crate::game::PlayerColor::{Black, White};

    /// Authority with a deterministic RNG and no public traps, so moves land
    /// where the test puts them.
    fn quiet_authority() -> TurnAuthority {
        let mut authority = TurnAuthority::with_seed(7);
        authority.board_mut().clear_public_traps();
        authority
    }

    fn broadcasts(out: &[Outbound]) -> Vec<&GameEvent> {
        out.iter()
            .filter_map(|o| match o {
                Outbound::Broadcast(e) => Some(e),
                Outbound::Requester(_) => None,
            })
            .collect()
    }

    fn has_event(out: &[Outbound], pred: impl Fn(&GameEvent) -> bool) -> bool {
        out.iter().any(|o| pred(o.event()))
    }

    #[test]
    fn test_move_places_piece_and_flips_turn() {
        let mut authority = quiet_authority();

        let out = authority.handle_move(Black, 7, 7).unwrap();

        assert_eq!(authority.board().piece(7, 7), Some(Black));
        assert_eq!(authority.turn(), White);
        assert!(has_event(&out, |e| matches!(
            e,
            GameEvent::PieceSpawned { x: 7, y: 7, color: Black }
        )));
        assert!(has_event(&out, |e| matches!(
            e,
            GameEvent::TurnChanged { current: White }
        )));
    }

    #[test]
    fn test_every_accepted_request_clears_the_trap_notice_first() {
        let mut authority = quiet_authority();

        let out = authority.handle_move(Black, 0, 0).unwrap();
        assert!(matches!(
            out[0],
            Outbound::Broadcast(GameEvent::TrapNoticeCleared)
        ));

        let out = authority.handle_trap(White, 5, 5).unwrap();
        assert!(matches!(
            out[0],
            Outbound::Broadcast(GameEvent::TrapNoticeCleared)
        ));
    }

    #[test]
    fn test_out_of_turn_move_is_rejected_without_mutation() {
        let mut authority = quiet_authority();

        assert_eq!(authority.handle_move(White, 7, 7), Err(Reject::NotYourTurn));
        assert_eq!(authority.board().piece(7, 7), None);
        assert_eq!(authority.turn(), Black);
    }

    #[test]
    fn test_out_of_bounds_move_is_rejected_not_clamped() {
        let mut authority = quiet_authority();

        for (x, y) in [(-1, 0), (0, -1), (15, 0), (0, 15), (100, 100)] {
            assert_eq!(authority.handle_move(Black, x, y), Err(Reject::OutOfBounds));
        }
        assert_eq!(authority.turn(), Black);
    }

    #[test]
    fn test_occupied_cell_is_rejected() {
        let mut authority = quiet_authority();
        authority.handle_move(Black, 7, 7).unwrap();

        assert_eq!(authority.handle_move(White, 7, 7), Err(Reject::CellOccupied));
        assert_eq!(authority.board().piece(7, 7), Some(Black));
        assert_eq!(authority.turn(), White);
    }

    #[test]
    fn test_public_trap_removes_two_pieces_instead_of_placing() {
        let mut authority = quiet_authority();

        // Black builds up three pieces while White plays elsewhere.
        authority.handle_move(Black, 0, 0).unwrap();
        authority.handle_move(White, 14, 14).unwrap();
        authority.handle_move(Black, 0, 1).unwrap();
        authority.handle_move(White, 14, 13).unwrap();
        authority.handle_move(Black, 0, 2).unwrap();
        authority.handle_move(White, 14, 12).unwrap();

        authority.board_mut().set_public_trap(3, 3);
        let out = authority.handle_move(Black, 3, 3).unwrap();

        // No piece lands on the trap cell and exactly two of Black's pieces
        // are gone.
        assert_eq!(authority.board().piece(3, 3), None);
        assert_eq!(authority.board().pieces_of(Black).len(), 1);
        assert_eq!(authority.board().pieces_of(White).len(), 3);
        assert!(!authority.board().has_public_trap(3, 3));
        assert_eq!(authority.turn(), White);

        let removals = out
            .iter()
            .filter(|o| matches!(o.event(), GameEvent::PieceRemoved { .. }))
            .count();
        assert_eq!(removals, 2);
        assert!(has_event(&out, |e| matches!(
            e,
            GameEvent::TrapTriggered { x: 3, y: 3, color: Black, .. }
        )));
        assert!(!has_event(&out, |e| matches!(e, GameEvent::PieceSpawned { .. })));
    }

    #[test]
    fn test_consumed_trap_cell_is_playable_again() {
        let mut authority = quiet_authority();
        authority.board_mut().set_public_trap(3, 3);

        authority.handle_move(Black, 3, 3).unwrap();
        authority.handle_move(White, 10, 10).unwrap();

        // The trap is spent; the same cell now takes a normal placement.
        let out = authority.handle_move(Black, 3, 3).unwrap();
        assert_eq!(authority.board().piece(3, 3), Some(Black));
        assert!(has_event(&out, |e| matches!(e, GameEvent::PieceSpawned { .. })));
    }

    #[test]
    fn test_trigger_with_no_pieces_on_board_removes_nothing() {
        let mut authority = quiet_authority();
        authority.board_mut().set_public_trap(3, 3);

        // Black has zero pieces; the trigger still consumes the trap and
        // forfeits the move without erroring.
        let out = authority.handle_move(Black, 3, 3).unwrap();

        assert!(!has_event(&out, |e| matches!(e, GameEvent::PieceRemoved { .. })));
        assert!(has_event(&out, |e| matches!(e, GameEvent::TrapTriggered { .. })));
        assert_eq!(authority.turn(), White);
    }

    #[test]
    fn test_opponent_trap_triggers_and_own_trap_is_disarmed_first() {
        let mut authority = quiet_authority();

        authority.handle_trap(Black, 6, 6).unwrap();
        // White walks onto Black's hidden trap.
        authority.handle_move(White, 1, 1).unwrap();
        authority.handle_move(Black, 2, 2).unwrap();
        let out = authority.handle_move(White, 6, 6).unwrap();

        assert!(has_event(&out, |e| matches!(
            e,
            GameEvent::TrapTriggered { x: 6, y: 6, color: White, .. }
        )));
        assert_eq!(authority.board().piece(6, 6), None);
        assert_eq!(authority.board().player_trap(6, 6), None);
        // White's lone piece was removed by the trigger.
        assert!(authority.board().pieces_of(White).is_empty());
    }

    #[test]
    fn test_moving_onto_own_trap_disarms_it_without_triggering() {
        let mut authority = quiet_authority();

        authority.handle_trap(Black, 6, 6).unwrap();
        authority.handle_move(White, 1, 1).unwrap();
        let out = authority.handle_move(Black, 6, 6).unwrap();

        assert!(has_event(&out, |e| matches!(
            e,
            GameEvent::PlayerTrapRemoved { x: 6, y: 6, color: Black }
        )));
        assert!(!has_event(&out, |e| matches!(e, GameEvent::TrapTriggered { .. })));
        // The piece lands normally on the disarmed cell.
        assert_eq!(authority.board().piece(6, 6), Some(Black));
        assert_eq!(authority.board().player_trap(6, 6), None);
    }

    #[test]
    fn test_both_trap_layers_compound_to_four_removals() {
        let mut authority = quiet_authority();

        authority.handle_move(Black, 0, 0).unwrap();
        authority.handle_trap(White, 6, 6).unwrap();
        authority.handle_move(Black, 0, 1).unwrap();
        authority.handle_move(White, 14, 1).unwrap();
        authority.handle_move(Black, 0, 2).unwrap();
        authority.handle_move(White, 14, 2).unwrap();
        authority.handle_move(Black, 0, 3).unwrap();
        authority.handle_move(White, 14, 3).unwrap();
        authority.handle_move(Black, 0, 4).unwrap();
        authority.handle_move(White, 14, 4).unwrap();

        authority.board_mut().set_public_trap(6, 6);
        let out = authority.handle_move(Black, 6, 6).unwrap();

        let removals = out
            .iter()
            .filter(|o| matches!(o.event(), GameEvent::PieceRemoved { .. }))
            .count();
        assert_eq!(removals, 4);
        assert!(has_event(&out, |e| match e {
            GameEvent::TrapTriggered { message, .. } => message.contains("public + opponent"),
            _ => false,
        }));
        assert_eq!(authority.board().pieces_of(Black).len(), 1);
    }

    #[test]
    fn test_trap_placement_costs_the_turn_and_confirms_privately() {
        let mut authority = quiet_authority();

        let out = authority.handle_trap(Black, 4, 4).unwrap();

        assert_eq!(authority.board().player_trap(4, 4), Some(Black));
        assert_eq!(authority.turn(), White);
        assert!(has_event(&out, |e| matches!(
            e,
            GameEvent::TrapBudgetUpdated { black_used: 1, white_used: 0 }
        )));

        // The location-bearing confirmation must be requester-private; no
        // broadcast may carry the trap coordinates.
        assert!(out.iter().any(|o| matches!(
            o,
            Outbound::Requester(GameEvent::TrapPlacedConfirmed { x: 4, y: 4 })
        )));
        assert!(!broadcasts(&out)
            .iter()
            .any(|e| matches!(e, GameEvent::TrapPlacedConfirmed { .. })));
    }

    #[test]
    fn test_fourth_trap_is_rejected() {
        let mut authority = quiet_authority();

        for i in 0..3i32 {
            authority.handle_trap(Black, i, 0).unwrap();
            authority.handle_move(White, i, 14).unwrap();
        }

        assert_eq!(authority.board().traps_used(Black), 3);
        assert_eq!(
            authority.handle_trap(Black, 9, 9),
            Err(Reject::TrapBudgetExhausted)
        );
        // White's budget is untouched by Black exhausting theirs.
        authority.handle_move(Black, 10, 10).unwrap();
        authority.handle_trap(White, 9, 9).unwrap();
    }

    #[test]
    fn test_trap_rejected_on_piece_or_duplicate() {
        let mut authority = quiet_authority();

        authority.handle_move(Black, 5, 5).unwrap();
        assert_eq!(authority.handle_trap(White, 5, 5), Err(Reject::CellOccupied));

        authority.handle_trap(White, 6, 6).unwrap();
        authority.handle_move(Black, 0, 0).unwrap();
        assert_eq!(authority.handle_trap(White, 6, 6), Err(Reject::DuplicateTrap));

        // The opponent may stack their own trap on the same cell.
        authority.handle_trap(White, 7, 7).unwrap();
        authority.handle_trap(Black, 7, 7).unwrap();
        assert_eq!(authority.board().player_trap(7, 7), Some(Black));
    }

    #[test]
    fn test_five_in_a_row_declares_winner_and_still_flips_turn() {
        let mut authority = quiet_authority();

        for i in 0..4 {
            authority.handle_move(Black, 7, 7 + i).unwrap();
            authority.handle_move(White, 0, i).unwrap();
        }
        let out = authority.handle_move(Black, 7, 11).unwrap();

        assert_eq!(authority.winner(), Some(Black));
        assert!(has_event(&out, |e| matches!(
            e,
            GameEvent::WinnerDeclared { color: Black }
        )));
        // Observed behavior preserved: the turn flips even on the winning
        // move.
        assert_eq!(authority.turn(), White);

        // Terminal: both players are locked out until restart.
        assert_eq!(authority.handle_move(White, 10, 10), Err(Reject::GameOver));
        assert_eq!(authority.handle_move(Black, 10, 10), Err(Reject::GameOver));
        assert_eq!(authority.handle_trap(White, 10, 10), Err(Reject::GameOver));
    }

    #[test]
    fn test_restart_resets_everything_and_reseeds() {
        let mut authority = quiet_authority();

        authority.handle_move(Black, 7, 7).unwrap();
        authority.handle_trap(White, 6, 6).unwrap();
        authority.handle_move(Black, 7, 8).unwrap();

        let out = authority.restart(false);

        assert_eq!(authority.board().pieces_of(Black), vec![]);
        assert_eq!(authority.board().player_trap(6, 6), None);
        assert_eq!(authority.board().traps_used(Black), 0);
        assert_eq!(authority.board().traps_used(White), 0);
        assert_eq!(authority.winner(), None);
        assert_eq!(authority.turn(), Black);
        assert_eq!(authority.last_trap_notice(), None);
        assert_eq!(authority.board().public_trap_count(), PUBLIC_TRAP_COUNT);

        assert!(has_event(&out, |e| matches!(e, GameEvent::GameReset { .. })));
        assert!(has_event(&out, |e| matches!(
            e,
            GameEvent::TurnChanged { current: Black }
        )));
    }

    #[test]
    fn test_restart_swap_toggles_host_color_but_black_still_opens() {
        let mut authority = quiet_authority();
        assert_eq!(authority.host_color(), Black);

        authority.restart(true);
        assert_eq!(authority.host_color(), White);
        assert_eq!(authority.guest_color(), Black);
        assert_eq!(authority.turn(), Black);

        authority.restart(false);
        assert_eq!(authority.host_color(), White);

        authority.restart(true);
        assert_eq!(authority.host_color(), Black);
    }

    #[test]
    fn test_restart_unlocks_a_finished_game() {
        let mut authority = quiet_authority();

        for i in 0..4 {
            authority.handle_move(Black, 7, 7 + i).unwrap();
            authority.handle_move(White, 0, i).unwrap();
        }
        authority.handle_move(Black, 7, 11).unwrap();
        assert_eq!(authority.winner(), Some(Black));

        authority.restart(false);
        authority.handle_move(Black, 7, 7).unwrap();
        assert_eq!(authority.board().piece(7, 7), Some(Black));
    }

    #[test]
    fn test_trap_notice_survives_until_the_next_accepted_request() {
        let mut authority = quiet_authority();
        authority.board_mut().set_public_trap(3, 3);

        authority.handle_move(Black, 3, 3).unwrap();
        assert!(authority.last_trap_notice().is_some());

        // A rejected request leaves the notice alone.
        assert_eq!(authority.handle_move(Black, 5, 5), Err(Reject::NotYourTurn));
        assert!(authority.last_trap_notice().is_some());

        authority.handle_move(White, 5, 5).unwrap();
        assert_eq!(authority.last_trap_notice(), None);
    }

    #[test]
    fn test_seeded_authorities_replay_identically() {
        let mut a = TurnAuthority::with_seed(99);
        let mut b = TurnAuthority::with_seed(99);

        for x in 0..BOARD_SIZE {
            for y in 0..BOARD_SIZE {
                assert_eq!(a.board().has_public_trap(x, y), b.board().has_public_trap(x, y));
            }
        }

        let out_a = a.handle_move(Black, 7, 7);
        let out_b = b.handle_move(Black, 7, 7);
        assert_eq!(out_a, out_b);
    }
}
