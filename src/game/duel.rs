//! Dual-board match state and terminal resolution.
//!
//! A `Duel` binds the two private boards of one match, converts correct
//! flags into attacks on the opposing board, and decides the winner. It
//! knows nothing about connections; the session layer owns that mapping.

use serde::{Deserialize, Serialize};

use crate::core::rng::derive_board_seed;
use crate::game::board::{Board, FlagOutcome};
use crate::game::tile::Index;
use crate::{DEFAULT_BOARD_SIZE, DEFAULT_DEAL_FACTOR, DEFAULT_MINE_COUNT};

/// Which seat a player occupies in a duel. On the wire this is the bare
/// number `1` or `2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Side {
    /// The first seat.
    One,
    /// The second seat.
    Two,
}

impl Side {
    /// The other seat.
    pub fn opponent(self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }

    /// Wire number of this seat.
    pub fn number(self) -> u8 {
        u8::from(self)
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> u8 {
        match side {
            Side::One => 1,
            Side::Two => 2,
        }
    }
}

impl TryFrom<u8> for Side {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Side::One),
            2 => Ok(Side::Two),
            other => Err(format!("invalid side: {other}")),
        }
    }
}

/// Tuning for one duel.
#[derive(Clone, Copy, Debug)]
pub struct DuelConfig {
    /// Board side length.
    pub board_size: usize,
    /// Mines initially dealt to each board.
    pub mine_count: u32,
    /// Correct flags needed to launch one attack; 0 disables attacks.
    pub deal_factor: u32,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            mine_count: DEFAULT_MINE_COUNT,
            deal_factor: DEFAULT_DEAL_FACTOR,
        }
    }
}

/// The authoritative state of one match: two boards plus the attack meter.
pub struct Duel {
    board1: Board,
    board2: Board,
    deal_factor: u32,
    deal1: u32,
    deal2: u32,
    over: bool,
    winner: Option<Side>,
}

impl Duel {
    /// Create a duel; per-board layouts derive from `entropy` and the match
    /// id so the two sides never share a layout.
    pub fn new(config: DuelConfig, entropy: u64, match_id: u64) -> Self {
        let seed1 = derive_board_seed(entropy, match_id, Side::One.number());
        let seed2 = derive_board_seed(entropy, match_id, Side::Two.number());
        Self {
            board1: Board::new(config.board_size, config.mine_count, seed1),
            board2: Board::new(config.board_size, config.mine_count, seed2),
            deal_factor: config.deal_factor,
            deal1: 0,
            deal2: 0,
            over: false,
            winner: None,
        }
    }

    /// The named side's board.
    pub fn board(&self, side: Side) -> &Board {
        match side {
            Side::One => &self.board1,
            Side::Two => &self.board2,
        }
    }

    /// Whether the match has been decided.
    pub fn is_over(&self) -> bool {
        self.over
    }

    /// The winning side once the match is decided.
    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    /// Correct flags accumulated by `side` toward its next attack.
    pub fn deal(&self, side: Side) -> u32 {
        match side {
            Side::One => self.deal1,
            Side::Two => self.deal2,
        }
    }

    /// Reveal on the named side's board. Returns whether anything changed.
    ///
    /// Out-of-range coordinates and actions after the match is decided are
    /// silent no-ops.
    pub fn reveal(&mut self, side: Side, row: i64, column: i64) -> bool {
        if self.over {
            return false;
        }
        let Some(index) = Index::checked(row, column, self.board(side).size()) else {
            return false;
        };

        let changed = self.board_mut(side).reveal(index);
        self.resolve();
        changed
    }

    /// Flag on the named side's board. Returns whether anything changed.
    ///
    /// A correct flag charges the side's attack meter; at `deal_factor` the
    /// meter resets and one mine drops into the opposing board.
    pub fn flag(&mut self, side: Side, row: i64, column: i64) -> bool {
        if self.over {
            return false;
        }
        let Some(index) = Index::checked(row, column, self.board(side).size()) else {
            return false;
        };

        let outcome = self.board_mut(side).flag(index);
        if outcome == FlagOutcome::Flagged {
            let deal_factor = self.deal_factor;
            let deal = self.deal_mut(side);
            *deal += 1;
            if deal_factor != 0 && *deal >= deal_factor {
                *deal = 0;
                self.board_mut(side.opponent()).add_mine();
            }
        }
        self.resolve();
        outcome.changed()
    }

    /// Force termination with the given winner (forfeits). Idempotent.
    pub fn finish(&mut self, winner: Side) {
        if self.over {
            return;
        }
        self.over = true;
        self.winner = Some(winner);
    }

    /// Decide the match after an action.
    ///
    /// Losing a board (mine hit or misflag) and clearing a board by flags
    /// are different triggers: the first awards the opponent, the second
    /// the actor. Loss checks strictly precede win checks.
    fn resolve(&mut self) {
        if self.over {
            return;
        }

        let winner = if self.board1.is_over() {
            Some(Side::Two)
        } else if self.board2.is_over() {
            Some(Side::One)
        } else if self.board1.is_won() {
            Some(Side::One)
        } else if self.board2.is_won() {
            Some(Side::Two)
        } else {
            None
        };

        if winner.is_some() {
            self.over = true;
            self.winner = winner;
        }
    }

    fn board_mut(&mut self, side: Side) -> &mut Board {
        match side {
            Side::One => &mut self.board1,
            Side::Two => &mut self.board2,
        }
    }

    fn deal_mut(&mut self, side: Side) -> &mut u32 {
        match side {
            Side::One => &mut self.deal1,
            Side::Two => &mut self.deal2,
        }
    }
}

#[cfg(test)]
impl Duel {
    /// Build a duel around two rigged boards.
    pub(crate) fn with_boards(board1: Board, board2: Board, deal_factor: u32) -> Self {
        Self {
            board1,
            board2,
            deal_factor,
            deal1: 0,
            deal2: 0,
            over: false,
            winner: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 4x4 board whose five mines sit on the right edge, far enough from
    /// (0,0) that flags never end it by accident.
    fn edge_board() -> Board {
        Board::with_layout(4, &[(0, 3), (1, 3), (2, 3), (3, 3), (3, 2)])
    }

    #[test]
    fn test_side_roundtrip() {
        assert_eq!(Side::One.number(), 1);
        assert_eq!(Side::Two.number(), 2);
        assert_eq!(Side::One.opponent(), Side::Two);
        assert_eq!(Side::try_from(1), Ok(Side::One));
        assert_eq!(Side::try_from(2), Ok(Side::Two));
        assert!(Side::try_from(0).is_err());
        assert!(Side::try_from(3).is_err());

        assert_eq!(serde_json::to_string(&Side::Two).unwrap(), "2");
        assert_eq!(serde_json::from_str::<Side>("1").unwrap(), Side::One);
        assert!(serde_json::from_str::<Side>("5").is_err());
    }

    #[test]
    fn test_mine_hit_awards_opponent() {
        let mut duel = Duel::with_boards(edge_board(), edge_board(), 0);
        assert!(duel.reveal(Side::One, 0, 3));
        assert!(duel.is_over());
        assert_eq!(duel.winner(), Some(Side::Two));
    }

    #[test]
    fn test_misflag_awards_opponent() {
        let mut duel = Duel::with_boards(edge_board(), edge_board(), 0);
        assert!(duel.flag(Side::Two, 0, 0));
        assert!(duel.is_over());
        assert_eq!(duel.winner(), Some(Side::One));
    }

    #[test]
    fn test_clearing_by_flags_awards_actor() {
        let mut board1 = Board::with_layout(3, &[(1, 1)]);
        board1.reveal(Index::new(0, 0));
        let mut duel = Duel::with_boards(board1, edge_board(), 0);

        assert!(duel.flag(Side::One, 1, 1));
        assert!(duel.is_over());
        assert_eq!(duel.winner(), Some(Side::One));
    }

    #[test]
    fn test_loss_checks_precede_win_checks() {
        // Rig the impossible: board1 lost and board2 cleared in the same
        // resolution. The loss on board1 must decide the match.
        let mut board1 = edge_board();
        board1.force_over();
        let mut board2 = edge_board();
        board2.force_win();

        let mut duel = Duel::with_boards(board1, board2, 0);
        duel.resolve();
        assert!(duel.is_over());
        assert_eq!(duel.winner(), Some(Side::Two));
    }

    #[test]
    fn test_deal_factor_attack_cadence() {
        // With deal_factor 2, two correct flags by side 1 inject exactly
        // one mine into board 2 and reset the counter.
        let mut duel = Duel::with_boards(edge_board(), edge_board(), 2);
        let before = duel.board(Side::Two).mine_count();

        assert!(duel.flag(Side::One, 0, 3));
        assert_eq!(duel.deal(Side::One), 1);
        assert_eq!(duel.board(Side::Two).mine_count(), before);

        assert!(duel.flag(Side::One, 1, 3));
        assert_eq!(duel.deal(Side::One), 0);
        assert_eq!(duel.board(Side::Two).mine_count(), before + 1);
        assert_eq!(duel.board(Side::Two).mines_left(), 6);

        // A third flag starts a fresh accumulation, no second attack yet
        assert!(duel.flag(Side::One, 2, 3));
        assert_eq!(duel.deal(Side::One), 1);
        assert_eq!(duel.board(Side::Two).mine_count(), before + 1);
    }

    #[test]
    fn test_deal_factor_zero_disables_attacks() {
        let mut duel = Duel::with_boards(edge_board(), edge_board(), 0);
        let before = duel.board(Side::Two).mine_count();

        duel.flag(Side::One, 0, 3);
        duel.flag(Side::One, 1, 3);
        duel.flag(Side::One, 2, 3);

        assert_eq!(duel.board(Side::Two).mine_count(), before);
        // The counter still tracks, it just never fires
        assert_eq!(duel.deal(Side::One), 3);
    }

    #[test]
    fn test_counters_are_per_side() {
        let mut duel = Duel::with_boards(edge_board(), edge_board(), 3);

        duel.flag(Side::One, 0, 3);
        duel.flag(Side::Two, 0, 3);
        duel.flag(Side::One, 1, 3);

        assert_eq!(duel.deal(Side::One), 2);
        assert_eq!(duel.deal(Side::Two), 1);
    }

    #[test]
    fn test_out_of_bounds_ignored() {
        let mut duel = Duel::with_boards(edge_board(), edge_board(), 0);

        assert!(!duel.reveal(Side::One, -1, 0));
        assert!(!duel.reveal(Side::One, 0, 4));
        assert!(!duel.flag(Side::Two, 4, 0));
        assert!(!duel.flag(Side::Two, 0, -7));
        assert!(!duel.is_over());
    }

    #[test]
    fn test_actions_after_over_ignored() {
        let mut duel = Duel::with_boards(edge_board(), edge_board(), 0);
        duel.reveal(Side::One, 0, 3);
        assert!(duel.is_over());

        assert!(!duel.reveal(Side::Two, 0, 0));
        assert!(!duel.flag(Side::Two, 0, 3));
        assert_eq!(duel.winner(), Some(Side::Two));
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut duel = Duel::with_boards(edge_board(), edge_board(), 0);

        duel.finish(Side::Two);
        assert!(duel.is_over());
        assert_eq!(duel.winner(), Some(Side::Two));

        // A later forfeit cannot flip the result
        duel.finish(Side::One);
        assert_eq!(duel.winner(), Some(Side::Two));
    }

    #[test]
    fn test_fresh_duel_has_distinct_layouts() {
        let mut duel = Duel::new(DuelConfig::default(), 0xC0FFEE, 1);
        assert!(duel.reveal(Side::One, 8, 8));
        assert!(duel.reveal(Side::Two, 8, 8));

        let pack1 = duel.board(Side::One).pack();
        let pack2 = duel.board(Side::Two).pack();
        // Same anchor, independent seeds: the openings differ
        assert_ne!(pack1.state, pack2.state);
    }
}
