//! Live Match Sessions
//!
//! A `DuelSession` couples one `Duel` with the two connections playing it
//! and owns all outbound traffic for the match: perspective-relative board
//! snapshots, the terminal notice, and the forfeit path. Each session is
//! touched only by its two owning connections, so a single mutex around it
//! serializes every action.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::info;

use crate::game::duel::{Duel, Side};
use crate::network::protocol::ServerMessage;

/// Process-wide unique match identifier.
pub type MatchId = u64;

/// Process-wide unique connection identifier.
pub type ConnectionId = u64;

/// Shared handle to a running session; one clone per seat.
pub type SessionHandle = Arc<Mutex<DuelSession>>;

/// One player's seat: the connection occupying it plus its outbound
/// channel.
#[derive(Clone)]
pub struct Seat {
    /// Connection occupying this seat.
    pub conn_id: ConnectionId,
    /// Fire-and-forget path to that connection's socket.
    pub outbound: mpsc::Sender<ServerMessage>,
}

/// A running match: the authoritative duel plus the seats it reports to.
pub struct DuelSession {
    id: MatchId,
    duel: Duel,
    seats: [Seat; 2],
}

impl DuelSession {
    /// Create the session and push `match_start` plus the opening snapshot
    /// to both seats.
    pub async fn start(id: MatchId, duel: Duel, seat1: Seat, seat2: Seat) -> SessionHandle {
        let session = DuelSession {
            id,
            duel,
            seats: [seat1, seat2],
        };

        session
            .send_to(Side::One, ServerMessage::MatchStart { board: Side::One })
            .await;
        session
            .send_to(Side::Two, ServerMessage::MatchStart { board: Side::Two })
            .await;
        session.push_update().await;

        Arc::new(Mutex::new(session))
    }

    /// Match identifier.
    pub fn id(&self) -> MatchId {
        self.id
    }

    /// Whether the match has been decided.
    pub fn is_over(&self) -> bool {
        self.duel.is_over()
    }

    /// Apply a reveal from `side`; both seats get a snapshot if anything
    /// changed. Returns whether the match is now decided.
    pub async fn reveal(&mut self, side: Side, row: i64, column: i64) -> bool {
        if self.duel.reveal(side, row, column) {
            self.push_update().await;
        }
        self.duel.is_over()
    }

    /// Apply a flag from `side`; both seats get a snapshot if anything
    /// changed. Returns whether the match is now decided.
    pub async fn flag(&mut self, side: Side, row: i64, column: i64) -> bool {
        if self.duel.flag(side, row, column) {
            self.push_update().await;
        }
        self.duel.is_over()
    }

    /// Concede the match for `leaving`: the opponent wins and both seats
    /// get the final snapshot. No-op if the match was already decided.
    pub async fn forfeit(&mut self, leaving: Side) {
        if self.duel.is_over() {
            return;
        }
        self.duel.finish(leaving.opponent());
        info!(
            "match {} forfeited by #{}, side {} wins",
            self.id,
            self.seat(leaving).conn_id,
            leaving.opponent().number()
        );
        self.push_update().await;
    }

    /// Push a snapshot of both boards to both seats, own board first for
    /// each recipient, followed by the terminal notice once decided.
    async fn push_update(&self) {
        let pack1 = self.duel.board(Side::One).pack();
        let pack2 = self.duel.board(Side::Two).pack();

        self.send_to(
            Side::One,
            ServerMessage::UpdateBoard {
                board1: pack1.clone(),
                board2: pack2.clone(),
            },
        )
        .await;
        self.send_to(
            Side::Two,
            ServerMessage::UpdateBoard {
                board1: pack2,
                board2: pack1,
            },
        )
        .await;

        if let Some(winner) = self.duel.winner() {
            let over = ServerMessage::MatchOver { winner };
            self.send_to(Side::One, over.clone()).await;
            self.send_to(Side::Two, over).await;
        }
    }

    /// Fire-and-forget send; a closed peer is treated as already gone.
    async fn send_to(&self, side: Side, message: ServerMessage) {
        let _ = self.seat(side).outbound.send(message).await;
    }

    fn seat(&self, side: Side) -> &Seat {
        &self.seats[(side.number() - 1) as usize]
    }
}
