//! Tile display states and grid indices.

use serde::{Deserialize, Serialize};

/// Offsets of the full 8-direction (Chebyshev) neighborhood.
const NEIGHBOR_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Player-visible state of a single tile.
///
/// A tile starts `Hidden` and leaves that state at most once; only the
/// displayed count of a revealed tile may be rewritten afterwards, when an
/// attack drops a new mine next to it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TileState {
    /// Not yet revealed or flagged - the only state a tile can act from.
    #[default]
    Hidden,
    /// Revealed, showing its adjacent-mine count (0 through 8).
    Revealed(u8),
    /// Revealed mine - terminal for the board.
    Mine,
    /// Correctly flagged mine - terminal for that cell.
    Flag,
}

impl TileState {
    /// Wire code for this state: 0-8 for counts, 9 mine, 10 flag, 11 hidden.
    pub const fn code(self) -> u8 {
        match self {
            TileState::Revealed(count) => count,
            TileState::Mine => 9,
            TileState::Flag => 10,
            TileState::Hidden => 11,
        }
    }

    /// Lowercase hex digit used in packed snapshots (`9`, `a`, `b`, ...).
    pub fn to_hex_digit(self) -> char {
        char::from_digit(self.code() as u32, 16).expect("tile codes fit one hex digit")
    }

    /// Whether the tile can still be acted on.
    pub const fn is_hidden(self) -> bool {
        matches!(self, TileState::Hidden)
    }
}

/// One grid cell: a display state plus the hidden mine bit.
///
/// The mine bit never crosses the game module boundary; clients only ever
/// see the display state.
#[derive(Clone, Copy, Debug, Default)]
pub struct Tile {
    pub(crate) state: TileState,
    pub(crate) mine: bool,
}

impl Tile {
    /// The player-visible state.
    pub fn state(&self) -> TileState {
        self.state
    }
}

/// Row/column address of one tile, serialized as `{"r":_,"c":_}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Row, 0-based from the top.
    #[serde(rename = "r")]
    pub row: usize,
    /// Column, 0-based from the left.
    #[serde(rename = "c")]
    pub col: usize,
}

impl Index {
    /// Build an index assumed to be in bounds.
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Validate untrusted coordinates against a board of side `size`.
    pub fn checked(row: i64, column: i64, size: usize) -> Option<Self> {
        if row >= 0 && column >= 0 && (row as usize) < size && (column as usize) < size {
            Some(Self::new(row as usize, column as usize))
        } else {
            None
        }
    }

    /// All in-bounds tiles of the 8-direction neighborhood.
    pub fn neighbors(self, size: usize) -> impl Iterator<Item = Index> {
        NEIGHBOR_OFFSETS.iter().filter_map(move |&(dr, dc)| {
            Index::checked(self.row as i64 + dr, self.col as i64 + dc, size)
        })
    }

    /// Chebyshev distance to another index.
    pub fn chebyshev(self, other: Index) -> usize {
        self.row.abs_diff(other.row).max(self.col.abs_diff(other.col))
    }

    /// Row-major offset into a flat tile array.
    pub(crate) fn flatten(self, size: usize) -> usize {
        self.row * size + self.col
    }
}
