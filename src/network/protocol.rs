//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! Every frame is a UTF-8 JSON text message tagged by `type`; anything that
//! fails to decode is dropped at the transport boundary.

use serde::{Deserialize, Serialize};

use crate::game::board::PackedBoard;
use crate::game::duel::Side;

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Enter the matchmaking queue.
    Join,

    /// Leave the queue while waiting, or concede a running match.
    Leave,

    /// Reveal the tile at (row, column) on the sender's own board.
    Reveal {
        /// Target row, 0-based.
        row: i64,
        /// Target column, 0-based.
        column: i64,
    },

    /// Flag the tile at (row, column) on the sender's own board.
    Flag {
        /// Target row, 0-based.
        row: i64,
        /// Target column, 0-based.
        column: i64,
    },
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent once to each player on pairing; names the seat they control.
    MatchStart {
        /// The seat assigned to the recipient.
        board: Side,
    },

    /// Snapshot of both boards after every accepted action and at match
    /// start. `board1` is always the recipient's own board, `board2` the
    /// opponent's, regardless of seat numbering.
    UpdateBoard {
        /// The recipient's board.
        board1: PackedBoard,
        /// The opponent's board.
        board2: PackedBoard,
    },

    /// Sent once, immediately after the snapshot that decided the match
    /// (or on forfeit).
    MatchOver {
        /// The winning seat.
        winner: Side,
    },
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl ServerMessage {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
