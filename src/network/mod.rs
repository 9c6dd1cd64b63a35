//! Network Layer
//!
//! WebSocket server for real-time play. This layer is **non-deterministic**
//! - all game rules run through `game/`.

pub mod matchmaker;
pub mod protocol;
pub mod server;
pub mod session;

pub use self::matchmaker::{IdGenerator, JoinOutcome, Matchmaker, Paired, Waiter};
pub use self::protocol::{ClientMessage, ServerMessage};
pub use self::server::{GameServer, GameServerError, ServerConfig};
pub use self::session::{ConnectionId, DuelSession, MatchId, Seat, SessionHandle};
