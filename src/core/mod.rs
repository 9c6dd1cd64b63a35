//! Core deterministic primitives.
//!
//! Everything here is free of I/O and system-time dependencies so that a
//! board seeded identically always produces the identical mine layout.

pub mod rng;

// Re-export core types
pub use self::rng::{derive_board_seed, DeterministicRng};
