//! # Mineclash Game Server
//!
//! Authoritative match server for Mineclash, a two-player competitive
//! minesweeper variant. Each player sweeps a private board; correct flags
//! charge an attack that injects mines into the opponent's board. The server
//! holds the only copy of both boards and pushes synchronized snapshots to
//! both clients.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    MINECLASH SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  └── rng.rs      - Xorshift128+ PRNG + board seed derivation │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── tile.rs     - Tile display states and grid indices      │
//! │  ├── board.rs    - Mine placement, reveal, flag, attack      │
//! │  └── duel.rs     - Dual-board match and terminal resolution  │
//! │                                                              │
//! │  network/        - Networking (non-deterministic)            │
//! │  ├── server.rs   - WebSocket server, connection lifecycle    │
//! │  ├── protocol.rs - Message types                             │
//! │  ├── matchmaker.rs - FIFO pairing and id allocation          │
//! │  └── session.rs  - Live match session, snapshot broadcast    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Authority Model
//!
//! The `core/` and `game/` modules never touch the network. All randomness
//! comes from a seeded Xorshift128+ PRNG owned by each board, so any match
//! can be replayed from its seeds. Clients send only intents (`reveal`,
//! `flag`); every rule check happens server-side and mine positions are
//! never serialized to the wire.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use crate::core::rng::DeterministicRng;
pub use crate::game::board::Board;
pub use crate::game::duel::{Duel, Side};
pub use crate::game::tile::{Index, Tile, TileState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default board side length (the classic 16x16 variant)
pub const DEFAULT_BOARD_SIZE: usize = 16;

/// Default number of mines dealt to each board
pub const DEFAULT_MINE_COUNT: u32 = 30;

/// Default number of correct flags needed to launch one attack
pub const DEFAULT_DEAL_FACTOR: u32 = 2;
