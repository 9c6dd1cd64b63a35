//! WebSocket Game Server
//!
//! Accepts WebSocket connections and walks each one through the
//! idle/matching/playing lifecycle: `join` queues or pairs, `reveal`/`flag`
//! are routed to the running session, `leave` or a dropped socket concedes.
//! Each connection runs in its own task; everything the pair shares lives
//! behind the session mutex.

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::game::duel::{DuelConfig, Side};
use crate::network::matchmaker::{JoinOutcome, Matchmaker, Paired, Waiter};
use crate::network::protocol::{ClientMessage, ServerMessage};
use crate::network::session::{ConnectionId, SessionHandle};
use crate::{DEFAULT_BOARD_SIZE, DEFAULT_DEAL_FACTOR, DEFAULT_MINE_COUNT};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
    /// Board side length for new matches.
    pub board_size: usize,
    /// Mines dealt to each board.
    pub mine_count: u32,
    /// Correct flags per attack; 0 disables the attack mechanic.
    pub deal_factor: u32,
    /// Server version string.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".parse().unwrap(),
            max_connections: 1000,
            board_size: DEFAULT_BOARD_SIZE,
            mine_count: DEFAULT_MINE_COUNT,
            deal_factor: DEFAULT_DEAL_FACTOR,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ServerConfig {
    /// Read overrides from `MINECLASH_*` environment variables.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            bind_addr: env_parse("MINECLASH_ADDR").unwrap_or(base.bind_addr),
            max_connections: env_parse("MINECLASH_MAX_CONNECTIONS")
                .unwrap_or(base.max_connections),
            board_size: env_parse("MINECLASH_BOARD_SIZE").unwrap_or(base.board_size),
            mine_count: env_parse("MINECLASH_MINES").unwrap_or(base.mine_count),
            deal_factor: env_parse("MINECLASH_DEAL_FACTOR").unwrap_or(base.deal_factor),
            version: base.version,
        }
    }

    /// Duel tuning handed to the matchmaker.
    pub fn duel_config(&self) -> DuelConfig {
        DuelConfig {
            board_size: self.board_size,
            mine_count: self.mine_count,
            deal_factor: self.deal_factor,
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Game server errors.
#[derive(Debug, thiserror::Error)]
pub enum GameServerError {
    /// Failed to bind to address.
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Per-connection lifecycle phase.
enum Phase {
    /// Connected, neither queued nor in a match.
    Idle,
    /// Queued, waiting for an opponent.
    Matching,
    /// Seated in a running match.
    Playing {
        /// The match this connection is playing in.
        session: SessionHandle,
        /// The seat it controls.
        side: Side,
    },
}

/// The game server.
pub struct GameServer {
    /// Server configuration.
    config: ServerConfig,
    /// FIFO pairing and id allocation.
    matchmaker: Arc<Matchmaker>,
    /// Live connection count.
    active: Arc<AtomicUsize>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl GameServer {
    /// Create a new game server.
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let matchmaker = Arc::new(Matchmaker::new(config.duel_config()));

        Self {
            config,
            matchmaker,
            active: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Run the server until shutdown.
    pub async fn run(&self) -> Result<(), GameServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(
            "Game server v{} listening on {}",
            self.config.version, self.config.bind_addr
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.active.load(Ordering::Relaxed) >= self.config.max_connections {
                                warn!("Connection limit reached, rejecting {}", addr);
                                continue;
                            }
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection in its own task.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let matchmaker = self.matchmaker.clone();
        let active = self.active.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        active.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    active.fetch_sub(1, Ordering::Relaxed);
                    return;
                }
            };

            let conn_id = matchmaker.ids().next_connection();
            info!("connection #{} opened from {}", conn_id, addr);

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(64);
            let (pair_tx, mut pair_rx) = mpsc::channel::<Paired>(1);

            // Outbound pump: fire-and-forget, a failed send ends the pump
            // and the peer is treated as gone
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = out_rx.recv().await {
                    let text = match msg.to_json() {
                        Ok(t) => t,
                        Err(e) => {
                            error!("Failed to serialize message: {}", e);
                            continue;
                        }
                    };
                    if ws_sender.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            });

            let mut phase = Phase::Idle;

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        debug!("invalid message from #{}: {}", conn_id, e);
                                        continue;
                                    }
                                };
                                phase = dispatch(
                                    phase,
                                    client_msg,
                                    conn_id,
                                    &matchmaker,
                                    &out_tx,
                                    &pair_tx,
                                    &mut pair_rx,
                                )
                                .await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("connection #{} closed", conn_id);
                                break;
                            }
                            Some(Err(e)) => {
                                warn!("WebSocket error on #{}: {}", conn_id, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    paired = pair_rx.recv() => {
                        // Only reachable while Matching: the channel is
                        // drained on every other way out of the queue
                        if let Some(p) = paired {
                            phase = Phase::Playing { session: p.session, side: p.side };
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("connection #{} dropped for shutdown", conn_id);
                        break;
                    }
                }
            }

            disconnect(phase, conn_id, &matchmaker, &mut pair_rx).await;

            sender_task.abort();
            active.fetch_sub(1, Ordering::Relaxed);
            info!("connection #{} cleaned up", conn_id);
        });
    }

    /// Shutdown the server.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Get active connection count.
    pub fn connection_count(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Get matchmaking queue size.
    pub async fn waiting_count(&self) -> usize {
        self.matchmaker.waiting().await
    }
}

/// Advance the per-connection state machine for one inbound message.
///
/// Every (phase, message) pair not listed is protocol misuse and is
/// dropped without a reply or a state change.
async fn dispatch(
    phase: Phase,
    msg: ClientMessage,
    conn_id: ConnectionId,
    matchmaker: &Arc<Matchmaker>,
    out_tx: &mpsc::Sender<ServerMessage>,
    pair_tx: &mpsc::Sender<Paired>,
    pair_rx: &mut mpsc::Receiver<Paired>,
) -> Phase {
    // A decided match releases its players on their next action, so a
    // rematch join always finds the connection idle
    let phase = match phase {
        Phase::Playing { session, side } => {
            if session.lock().await.is_over() {
                Phase::Idle
            } else {
                Phase::Playing { session, side }
            }
        }
        other => other,
    };

    match (phase, msg) {
        (Phase::Idle, ClientMessage::Join) => {
            let waiter = Waiter {
                conn_id,
                outbound: out_tx.clone(),
                pair_tx: pair_tx.clone(),
            };
            match matchmaker.join(waiter).await {
                JoinOutcome::Waiting => Phase::Matching,
                JoinOutcome::Paired(p) => Phase::Playing {
                    session: p.session,
                    side: p.side,
                },
            }
        }
        (Phase::Matching, ClientMessage::Leave) => {
            if !matchmaker.leave(conn_id).await {
                // A pairing won the race; the seat assignment is already
                // buffered. Take it and concede so the opponent is not
                // left hanging.
                if let Ok(p) = pair_rx.try_recv() {
                    p.session.lock().await.forfeit(p.side).await;
                }
            }
            Phase::Idle
        }
        (Phase::Playing { session, side }, ClientMessage::Leave) => {
            session.lock().await.forfeit(side).await;
            Phase::Idle
        }
        (Phase::Playing { session, side }, ClientMessage::Reveal { row, column }) => {
            let over = session.lock().await.reveal(side, row, column).await;
            if over {
                Phase::Idle
            } else {
                Phase::Playing { session, side }
            }
        }
        (Phase::Playing { session, side }, ClientMessage::Flag { row, column }) => {
            let over = session.lock().await.flag(side, row, column).await;
            if over {
                Phase::Idle
            } else {
                Phase::Playing { session, side }
            }
        }
        (phase, msg) => {
            debug!("connection #{} sent {:?} out of phase, ignored", conn_id, msg);
            phase
        }
    }
}

/// Wind down a departing connection: dequeue if waiting, forfeit if
/// playing. A pairing that raced with the disconnect is drained and
/// conceded immediately.
async fn disconnect(
    phase: Phase,
    conn_id: ConnectionId,
    matchmaker: &Arc<Matchmaker>,
    pair_rx: &mut mpsc::Receiver<Paired>,
) {
    match phase {
        Phase::Idle => {}
        Phase::Matching => {
            if !matchmaker.leave(conn_id).await {
                if let Ok(p) = pair_rx.try_recv() {
                    p.session.lock().await.forfeit(p.side).await;
                }
            }
        }
        Phase::Playing { session, side } => {
            // No-op if the match already ended
            session.lock().await.forfeit(side).await;
        }
    }
}
