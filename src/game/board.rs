//! One player's private grid.
//!
//! The board owns the authoritative mine layout and every rule check:
//! deferred safe-zone mine placement, flood-fill reveal, flag validation,
//! and mine injection from opponent attacks. Mine positions never leave
//! this type except as derived display states.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::rng::DeterministicRng;
use crate::game::tile::{Index, Tile, TileState};

/// Outcome of a flag attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagOutcome {
    /// Nothing happened: board frozen, tile not hidden, or no mines placed yet.
    Ignored,
    /// A mine was correctly flagged.
    Flagged,
    /// A safe tile was flagged - the board is lost.
    Misflag,
}

impl FlagOutcome {
    /// Whether the attempt mutated the board.
    pub fn changed(self) -> bool {
        !matches!(self, FlagOutcome::Ignored)
    }
}

/// Externally visible snapshot of a board.
///
/// `state` holds one lowercase hex digit per tile, row-major. A hidden mine
/// packs identically to any other hidden tile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedBoard {
    /// Packed display states, `size * size` hex digits.
    pub state: String,
    /// Cell that ended the board, if any.
    pub over_cause: Option<Index>,
    /// Mines not yet correctly flagged.
    pub mines_left: u32,
    /// Most recent reveal/flag target, for client-side highlight.
    pub last_action: Option<Index>,
}

/// One player's grid with its authoritative mine layout.
pub struct Board {
    size: usize,
    tiles: Vec<Tile>,
    mines_placed: bool,
    mines_left: u32,
    over: bool,
    win: bool,
    over_cause: Option<Index>,
    last_action: Option<Index>,
    rng: DeterministicRng,
}

impl Board {
    /// Create an empty board of side `size` that will receive `mines` mines
    /// on the first reveal. The seed fixes the layout for replay.
    pub fn new(size: usize, mines: u32, seed: u64) -> Self {
        Self {
            size,
            tiles: vec![Tile::default(); size * size],
            mines_placed: false,
            mines_left: mines,
            over: false,
            win: false,
            over_cause: None,
            last_action: None,
            rng: DeterministicRng::new(seed),
        }
    }

    /// Board side length.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Mines not yet correctly flagged. May exceed the initial count after
    /// attacks.
    pub fn mines_left(&self) -> u32 {
        self.mines_left
    }

    /// Whether the deferred mine placement has happened.
    pub fn mines_placed(&self) -> bool {
        self.mines_placed
    }

    /// Whether the board is lost (mine revealed or misflag).
    pub fn is_over(&self) -> bool {
        self.over
    }

    /// Whether all mines are correctly flagged.
    pub fn is_won(&self) -> bool {
        self.win
    }

    /// Cell that ended the board, if it is over.
    pub fn over_cause(&self) -> Option<Index> {
        self.over_cause
    }

    /// Most recent reveal/flag target.
    pub fn last_action(&self) -> Option<Index> {
        self.last_action
    }

    /// Display state at `index`.
    pub fn tile_state(&self, index: Index) -> TileState {
        self.tile(index).state
    }

    /// Reveal the tile at `index`. Returns whether the board changed.
    ///
    /// The first reveal of a match triggers mine placement anchored at
    /// `index`, so the anchor and its whole 3x3 neighborhood come up clear.
    pub fn reveal(&mut self, index: Index) -> bool {
        if !self.mines_placed {
            self.place_mines(index);
        }
        if self.frozen() || !self.tile(index).state.is_hidden() {
            return false;
        }
        self.last_action = Some(index);

        if self.tile(index).mine {
            self.tile_mut(index).state = TileState::Mine;
            self.over = true;
            self.over_cause = Some(index);
        } else {
            self.flood_reveal(index);
        }
        true
    }

    /// Flag the tile at `index`.
    ///
    /// Flagging is a commitment: a correct flag locks the mine and counts
    /// toward the attack meter, a wrong one loses the board on the spot.
    /// Not available before the first reveal has placed the mines.
    pub fn flag(&mut self, index: Index) -> FlagOutcome {
        if !self.mines_placed || self.frozen() || !self.tile(index).state.is_hidden() {
            return FlagOutcome::Ignored;
        }
        self.last_action = Some(index);

        if self.tile(index).mine {
            self.tile_mut(index).state = TileState::Flag;
            self.mines_left -= 1;
            if self.mines_left == 0 {
                self.win = true;
            }
            FlagOutcome::Flagged
        } else {
            let count = self.adjacent_mines(index);
            self.tile_mut(index).state = TileState::Revealed(count);
            self.over = true;
            self.over_cause = Some(index);
            FlagOutcome::Misflag
        }
    }

    /// Inject one attack mine into a uniformly random hidden, mine-free
    /// tile.
    ///
    /// Before placement only the budget grows; the deferred placement deals
    /// the reserved mine with the rest. With no eligible tile the call is a
    /// no-op. Already-displayed neighbor counts are rewritten so the board
    /// never shows a stale number.
    pub fn add_mine(&mut self) {
        if !self.mines_placed {
            self.mines_left += 1;
            return;
        }

        let candidates: Vec<Index> = self
            .indices()
            .filter(|&ix| {
                let tile = self.tile(ix);
                !tile.mine && tile.state.is_hidden()
            })
            .collect();

        let Some(&target) = self.rng.choose(&candidates) else {
            return;
        };

        self.tile_mut(target).mine = true;

        for neighbor in target.neighbors(self.size) {
            let tile = self.tile(neighbor);
            if !tile.mine && matches!(tile.state, TileState::Revealed(_)) {
                let count = self.adjacent_mines(neighbor);
                self.tile_mut(neighbor).state = TileState::Revealed(count);
            }
        }

        self.mines_left += 1;
    }

    /// Produce the mine-safe snapshot pushed to clients.
    pub fn pack(&self) -> PackedBoard {
        let mut state = String::with_capacity(self.size * self.size);
        for tile in &self.tiles {
            state.push(tile.state.to_hex_digit());
        }
        PackedBoard {
            state,
            over_cause: self.over_cause,
            mines_left: self.mines_left,
            last_action: self.last_action,
        }
    }

    /// Place `mines_left` mines anywhere with Chebyshev distance > 1 from
    /// the anchor, uniformly without replacement. Guarantees the first
    /// reveal opens on a zero-count tile.
    fn place_mines(&mut self, anchor: Index) {
        let eligible: Vec<Index> = self
            .indices()
            .filter(|&ix| ix.chebyshev(anchor) > 1)
            .collect();

        // mines_left can exceed the eligible set on degenerate configs;
        // sample clamps rather than failing.
        for at in self.rng.sample(eligible.len(), self.mines_left as usize) {
            self.tile_mut(eligible[at]).mine = true;
        }
        self.mines_placed = true;
    }

    /// Iterative flood-fill reveal over an explicit work-list.
    ///
    /// Terminates because each tile leaves `Hidden` at most once and only
    /// hidden tiles are enqueued.
    fn flood_reveal(&mut self, start: Index) {
        let mut work = VecDeque::new();
        work.push_back(start);

        while let Some(index) = work.pop_front() {
            if !self.tile(index).state.is_hidden() {
                continue;
            }
            let count = self.adjacent_mines(index);
            self.tile_mut(index).state = TileState::Revealed(count);

            if count == 0 {
                work.extend(
                    index
                        .neighbors(self.size)
                        .filter(|&n| self.tile(n).state.is_hidden()),
                );
            }
        }
    }

    /// True adjacent-mine count over the in-bounds 8-neighborhood.
    fn adjacent_mines(&self, index: Index) -> u8 {
        index
            .neighbors(self.size)
            .filter(|&n| self.tile(n).mine)
            .count() as u8
    }

    /// A finished board accepts no further actions.
    fn frozen(&self) -> bool {
        self.over || self.win
    }

    fn indices(&self) -> impl Iterator<Item = Index> {
        let size = self.size;
        (0..size).flat_map(move |row| (0..size).map(move |col| Index::new(row, col)))
    }

    fn tile(&self, index: Index) -> &Tile {
        &self.tiles[index.flatten(self.size)]
    }

    fn tile_mut(&mut self, index: Index) -> &mut Tile {
        let at = index.flatten(self.size);
        &mut self.tiles[at]
    }
}

#[cfg(test)]
impl Board {
    /// Build a board with an explicit, already-placed mine layout.
    pub(crate) fn with_layout(size: usize, mines: &[(usize, usize)]) -> Self {
        let mut board = Board::new(size, mines.len() as u32, 0);
        for &(row, col) in mines {
            board.tiles[row * size + col].mine = true;
        }
        board.mines_placed = true;
        board
    }

    pub(crate) fn is_mine(&self, index: Index) -> bool {
        self.tile(index).mine
    }

    pub(crate) fn mine_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.mine).count()
    }

    pub(crate) fn force_over(&mut self) {
        self.over = true;
    }

    pub(crate) fn force_win(&mut self) {
        self.win = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_reveal_safe_zone() {
        // A 16x16 first reveal at (8,8) leaves the centered 3x3 block
        // mine-free.
        for seed in 0..16 {
            let mut board = Board::new(16, 30, seed);
            let anchor = Index::new(8, 8);
            assert!(board.reveal(anchor));
            assert!(board.mines_placed());

            for row in 7..=9 {
                for col in 7..=9 {
                    assert!(!board.is_mine(Index::new(row, col)));
                }
            }
            // The anchor therefore opens on a zero
            assert_eq!(board.tile_state(anchor), TileState::Revealed(0));
        }
    }

    #[test]
    fn test_placement_counts() {
        let mut board = Board::new(16, 30, 7);
        board.reveal(Index::new(0, 0));
        assert_eq!(board.mine_count(), 30);
        assert_eq!(board.mines_left(), 30);
    }

    #[test]
    fn test_reveal_mine_loses() {
        let mut board = Board::with_layout(8, &[(4, 4), (0, 7)]);
        let hit = Index::new(4, 4);

        assert!(board.reveal(hit));
        assert!(board.is_over());
        assert_eq!(board.over_cause(), Some(hit));
        assert_eq!(board.last_action(), Some(hit));
        assert_eq!(board.tile_state(hit), TileState::Mine);
    }

    #[test]
    fn test_reveal_frozen_and_non_hidden_ignored() {
        let mut board = Board::with_layout(8, &[(4, 4)]);
        assert!(board.reveal(Index::new(0, 0)));

        // Already revealed tile is a no-op
        assert!(!board.reveal(Index::new(0, 0)));

        board.reveal(Index::new(4, 4));
        assert!(board.is_over());

        // Frozen board accepts nothing, and last_action stays on the mine
        assert!(!board.reveal(Index::new(7, 7)));
        assert_eq!(board.last_action(), Some(Index::new(4, 4)));
    }

    #[test]
    fn test_flag_mine_decrements() {
        let mut board = Board::with_layout(8, &[(2, 2), (5, 5)]);
        board.reveal(Index::new(0, 0));

        assert_eq!(board.flag(Index::new(2, 2)), FlagOutcome::Flagged);
        assert_eq!(board.mines_left(), 1);
        assert!(!board.is_won());

        assert_eq!(board.flag(Index::new(5, 5)), FlagOutcome::Flagged);
        assert_eq!(board.mines_left(), 0);
        assert!(board.is_won());
        assert!(!board.is_over());
    }

    #[test]
    fn test_misflag_loses() {
        // The layout is already placed, so the cell next to the mine is
        // still hidden when the wrong flag lands.
        let mut board = Board::with_layout(8, &[(2, 2)]);

        let wrong = Index::new(2, 3);
        assert_eq!(board.flag(wrong), FlagOutcome::Misflag);
        assert!(board.is_over());
        assert_eq!(board.over_cause(), Some(wrong));
        // The true count shows at the misflagged cell
        assert_eq!(board.tile_state(wrong), TileState::Revealed(1));
    }

    #[test]
    fn test_flag_before_first_reveal_ignored() {
        let mut board = Board::new(8, 5, 3);
        assert_eq!(board.flag(Index::new(4, 4)), FlagOutcome::Ignored);
        assert!(!board.mines_placed());
        assert_eq!(board.last_action(), None);
    }

    #[test]
    fn test_won_board_is_frozen() {
        // Center mine keeps every count at 1, so nothing floods and hidden
        // tiles remain after the winning flag.
        let mut board = Board::with_layout(3, &[(1, 1)]);
        board.reveal(Index::new(0, 0));
        board.flag(Index::new(1, 1));
        assert!(board.is_won());

        assert!(board.tile_state(Index::new(2, 2)).is_hidden());
        assert!(!board.reveal(Index::new(2, 2)));
        assert_eq!(board.flag(Index::new(0, 1)), FlagOutcome::Ignored);
        assert!(board.tile_state(Index::new(2, 2)).is_hidden());
    }

    #[test]
    fn test_flood_fill_stops_at_numbers() {
        // Single mine in the far corner: revealing the opposite corner
        // clears everything except the mine itself.
        let mut board = Board::with_layout(4, &[(3, 3)]);
        board.reveal(Index::new(0, 0));

        for row in 0..4 {
            for col in 0..4 {
                let ix = Index::new(row, col);
                if ix == Index::new(3, 3) {
                    assert!(board.tile_state(ix).is_hidden());
                } else {
                    let expected = board.adjacent_mines(ix);
                    assert_eq!(board.tile_state(ix), TileState::Revealed(expected));
                }
            }
        }
    }

    #[test]
    fn test_flood_fill_does_not_cross_frontier() {
        // A wall of mines splits the 5x5 grid; revealing on the left side
        // must leave the right side hidden.
        let wall: Vec<(usize, usize)> = (0..5).map(|r| (r, 2)).collect();
        let mut board = Board::with_layout(5, &wall);
        board.reveal(Index::new(2, 0));

        for row in 0..5 {
            assert!(board.tile_state(Index::new(row, 3)).is_hidden());
            assert!(board.tile_state(Index::new(row, 4)).is_hidden());
        }
    }

    #[test]
    fn test_add_mine_before_placement_reserves() {
        let mut board = Board::new(8, 5, 11);
        board.add_mine();
        assert_eq!(board.mines_left(), 6);
        assert_eq!(board.mine_count(), 0);

        board.reveal(Index::new(4, 4));
        assert_eq!(board.mine_count(), 6);
    }

    #[test]
    fn test_add_mine_lands_on_only_candidate() {
        // Mine at (1,1) keeps every count at 1, so the two reveals do not
        // flood and only (1,0) is left hidden and mine-free.
        let mut board = Board::with_layout(2, &[(1, 1)]);
        board.reveal(Index::new(0, 0));
        board.reveal(Index::new(0, 1));

        board.add_mine();
        assert!(board.is_mine(Index::new(1, 0)));
        assert_eq!(board.mines_left(), 2);
    }

    #[test]
    fn test_add_mine_saturated_noop() {
        let mut board = Board::with_layout(2, &[(0, 0), (0, 1), (1, 0), (1, 1)]);
        board.add_mine();
        assert_eq!(board.mine_count(), 4);
        assert_eq!(board.mines_left(), 4);
    }

    #[test]
    fn test_add_mine_refreshes_displayed_counts() {
        // Mine at (0,0); reveal the two numbered tiles next to it, leaving
        // (1,1) as the only hidden mine-free cell for the injection.
        let mut board = Board::with_layout(2, &[(0, 0)]);
        board.reveal(Index::new(0, 1));
        board.reveal(Index::new(1, 0));
        assert_eq!(board.tile_state(Index::new(0, 1)), TileState::Revealed(1));
        assert_eq!(board.tile_state(Index::new(1, 0)), TileState::Revealed(1));

        board.add_mine();
        assert!(board.is_mine(Index::new(1, 1)));
        assert_eq!(board.mines_left(), 2);
        // Displayed numbers now count the injected mine
        assert_eq!(board.tile_state(Index::new(0, 1)), TileState::Revealed(2));
        assert_eq!(board.tile_state(Index::new(1, 0)), TileState::Revealed(2));
    }

    #[test]
    fn test_pack_never_leaks_mines() {
        let mut board = Board::with_layout(4, &[(3, 3), (3, 2)]);
        board.reveal(Index::new(0, 0));
        board.flag(Index::new(3, 3));

        let packed = board.pack();
        assert_eq!(packed.state.len(), 16);
        assert_eq!(packed.mines_left, 1);
        assert_eq!(packed.last_action, Some(Index::new(3, 3)));
        assert_eq!(packed.over_cause, None);

        // Flagged mine shows 'a'; the unflagged hidden mine packs as 'b',
        // identical to a plain hidden tile
        let digit_at = |r: usize, c: usize| packed.state.as_bytes()[r * 4 + c] as char;
        assert_eq!(digit_at(3, 3), 'a');
        assert_eq!(digit_at(3, 2), 'b');
    }

    #[test]
    fn test_pack_fresh_board_all_hidden() {
        let board = Board::new(16, 30, 1);
        let packed = board.pack();
        assert_eq!(packed.state.len(), 256);
        assert!(packed.state.bytes().all(|b| b == b'b'));
        assert_eq!(packed.over_cause, None);
        assert_eq!(packed.last_action, None);
        assert_eq!(packed.mines_left, 30);
    }

    #[test]
    fn test_same_seed_same_layout() {
        let mut board1 = Board::new(16, 30, 99);
        let mut board2 = Board::new(16, 30, 99);
        board1.reveal(Index::new(8, 8));
        board2.reveal(Index::new(8, 8));

        for row in 0..16 {
            for col in 0..16 {
                let ix = Index::new(row, col);
                assert_eq!(board1.is_mine(ix), board2.is_mine(ix));
            }
        }
    }

    proptest! {
        #[test]
        fn prop_safe_zone_always_holds(
            seed in any::<u64>(),
            row in 0usize..16,
            col in 0usize..16,
        ) {
            let mut board = Board::new(16, 30, seed);
            let anchor = Index::new(row, col);
            board.reveal(anchor);

            prop_assert!(!board.is_mine(anchor));
            for n in anchor.neighbors(16) {
                prop_assert!(!board.is_mine(n));
            }
            prop_assert_eq!(board.mine_count(), 30);
        }

        #[test]
        fn prop_zero_tiles_have_no_hidden_neighbors(
            seed in any::<u64>(),
            row in 0usize..16,
            col in 0usize..16,
        ) {
            let mut board = Board::new(16, 30, seed);
            board.reveal(Index::new(row, col));

            // Flood-fill boundary: an open region ends only at numbered
            // tiles or the border
            for r in 0..16 {
                for c in 0..16 {
                    let ix = Index::new(r, c);
                    if board.tile_state(ix) == TileState::Revealed(0) {
                        for n in ix.neighbors(16) {
                            prop_assert!(!board.tile_state(n).is_hidden());
                        }
                    }
                }
            }
        }

        #[test]
        fn prop_tiles_never_return_to_hidden(
            seed in any::<u64>(),
            ops in prop::collection::vec(
                (any::<bool>(), 0usize..9, 0usize..9),
                1..60,
            ),
        ) {
            let mut board = Board::new(9, 10, seed);

            for (flag, row, col) in ops {
                let before: Vec<TileState> =
                    board.tiles.iter().map(|t| t.state).collect();

                let ix = Index::new(row, col);
                if flag {
                    board.flag(ix);
                } else {
                    board.reveal(ix);
                }

                for (tile, old) in board.tiles.iter().zip(&before) {
                    if !old.is_hidden() {
                        prop_assert!(!tile.state.is_hidden());
                    }
                }
            }

            // Win exactly when the flag count catches the budget
            prop_assert_eq!(board.mines_left() == 0, board.is_won());
        }

        #[test]
        fn prop_add_mine_targets_hidden_nonmine(
            seed in any::<u64>(),
            row in 0usize..16,
            col in 0usize..16,
        ) {
            let mut board = Board::new(16, 30, seed);
            board.reveal(Index::new(row, col));

            let before: Vec<bool> = board.tiles.iter().map(|t| t.mine).collect();
            let states: Vec<TileState> = board.tiles.iter().map(|t| t.state).collect();
            let candidates = states
                .iter()
                .zip(&before)
                .filter(|(s, mined)| s.is_hidden() && !**mined)
                .count();
            board.add_mine();

            let mut added = 0;
            for (at, (tile, was_mine)) in board.tiles.iter().zip(&before).enumerate() {
                if tile.mine && !*was_mine {
                    added += 1;
                    // Strictly a fresh, hidden cell
                    prop_assert!(states[at].is_hidden());
                }
            }

            if candidates == 0 {
                prop_assert_eq!(added, 0);
                prop_assert_eq!(board.mines_left(), 30);
            } else {
                prop_assert_eq!(added, 1);
                prop_assert_eq!(board.mines_left(), 31);
            }
        }
    }
}
