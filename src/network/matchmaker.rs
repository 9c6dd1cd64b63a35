//! Matchmaking
//!
//! Strict FIFO pairing: the first joiner waits, the second joiner is bound
//! to it on the spot. The queue is the only process-wide mutable state
//! besides the id counters, and pair formation happens entirely under its
//! lock so a join and a racing leave can never both claim the same waiter.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::game::duel::{Duel, DuelConfig, Side};
use crate::network::protocol::ServerMessage;
use crate::network::session::{ConnectionId, DuelSession, Seat, SessionHandle};

/// Monotonic process-wide id source for connections and matches.
///
/// Ids are never reused; the matchmaker owns the only instance instead of
/// the counters living as ambient globals.
#[derive(Debug, Default)]
pub struct IdGenerator {
    connections: AtomicU64,
    matches: AtomicU64,
}

impl IdGenerator {
    /// Allocate the next connection id.
    pub fn next_connection(&self) -> u64 {
        self.connections.fetch_add(1, Ordering::Relaxed)
    }

    /// Allocate the next match id.
    pub fn next_match(&self) -> u64 {
        self.matches.fetch_add(1, Ordering::Relaxed)
    }
}

/// Seat assignment handed to a waiting connection when an opponent
/// arrives.
pub struct Paired {
    /// The session both players now share.
    pub session: SessionHandle,
    /// The seat the receiving player controls.
    pub side: Side,
}

/// A connection asking to be paired.
pub struct Waiter {
    /// The connection's id.
    pub conn_id: ConnectionId,
    /// Outbound channel to the connection's socket.
    pub outbound: mpsc::Sender<ServerMessage>,
    /// Control channel that delivers the seat assignment if this
    /// connection ends up waiting.
    pub pair_tx: mpsc::Sender<Paired>,
}

/// Result of a join request.
pub enum JoinOutcome {
    /// No opponent available; the connection is queued.
    Waiting,
    /// Paired immediately with the front of the queue.
    Paired(Paired),
}

/// FIFO waiting list plus the id source.
pub struct Matchmaker {
    config: DuelConfig,
    ids: IdGenerator,
    queue: Mutex<VecDeque<Waiter>>,
}

impl Matchmaker {
    /// Create a matchmaker producing duels with the given tuning.
    pub fn new(config: DuelConfig) -> Self {
        Self {
            config,
            ids: IdGenerator::default(),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// The process-wide id source.
    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    /// Handle a join request.
    ///
    /// Pop-then-pair: an available waiter is taken immediately, the new
    /// joiner becomes side 1 and the waiter side 2 for the whole match.
    /// The waiter's seat assignment is delivered through its control
    /// channel before the queue lock drops, so a leave that lost the race
    /// always finds the assignment already buffered.
    pub async fn join(&self, joiner: Waiter) -> JoinOutcome {
        let mut queue = self.queue.lock().await;

        let Some(opponent) = queue.pop_front() else {
            debug!("connection #{} waiting for an opponent", joiner.conn_id);
            queue.push_back(joiner);
            return JoinOutcome::Waiting;
        };

        let match_id = self.ids.next_match();
        info!(
            "match {} start: #{} vs #{}",
            match_id, joiner.conn_id, opponent.conn_id
        );

        let duel = Duel::new(self.config, pairing_entropy(), match_id);
        let session = DuelSession::start(
            match_id,
            duel,
            Seat {
                conn_id: joiner.conn_id,
                outbound: joiner.outbound,
            },
            Seat {
                conn_id: opponent.conn_id,
                outbound: opponent.outbound,
            },
        )
        .await;

        let _ = opponent
            .pair_tx
            .send(Paired {
                session: Arc::clone(&session),
                side: Side::Two,
            })
            .await;

        JoinOutcome::Paired(Paired {
            session,
            side: Side::One,
        })
    }

    /// Remove a queued connection. Returns whether it was still queued;
    /// `false` means a pairing already claimed it.
    pub async fn leave(&self, conn_id: ConnectionId) -> bool {
        let mut queue = self.queue.lock().await;
        let before = queue.len();
        queue.retain(|w| w.conn_id != conn_id);
        let removed = queue.len() != before;
        if removed {
            debug!("connection #{} left the queue", conn_id);
        }
        removed
    }

    /// Number of connections currently waiting.
    pub async fn waiting(&self) -> usize {
        self.queue.lock().await.len()
    }
}

/// Per-pairing entropy for board seed derivation.
fn pairing_entropy() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
