//! Mineclash Game Server
//!
//! Authoritative match server for competitive dual-board minesweeper.
//! Binds a WebSocket listener and serves matches until shut down.

use anyhow::Context;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use mineclash::network::server::{GameServer, ServerConfig};
use mineclash::VERSION;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let config = ServerConfig::from_env();

    info!("Mineclash Server v{}", VERSION);
    info!(
        "Board: {}x{}, {} mines, deal factor {}",
        config.board_size, config.board_size, config.mine_count, config.deal_factor
    );

    let server = GameServer::new(config);
    server.run().await.context("server terminated")?;

    Ok(())
}
