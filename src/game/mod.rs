//! Game Logic Module
//!
//! Deterministic dual-board minesweeper rules. Nothing in here touches the
//! network: the session layer feeds validated intents in and carries packed
//! snapshots out.
//!
//! ## Module Structure
//!
//! - `tile`: tile display states and grid indices
//! - `board`: one player's grid - placement, reveal, flag, attack injection
//! - `duel`: the two-board match, attack counters, terminal resolution

pub mod board;
pub mod duel;
pub mod tile;

// Re-export key types
pub use self::board::{Board, FlagOutcome, PackedBoard};
pub use self::duel::{Duel, DuelConfig, Side};
pub use self::tile::{Index, Tile, TileState};
