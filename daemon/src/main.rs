//! shardchain daemon: entry point for running a node.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use shardchain_network::HttpPeerClient;
use shardchain_node::{init_logging, ChainNode, NodeConfig, ShutdownController};
use shardchain_rpc::RpcServer;
use shardchain_types::NodeId;

#[derive(Parser)]
#[command(name = "shardchain-daemon", about = "Sharded proof-of-work ledger node")]
struct Cli {
    /// Port for the HTTP interface.
    #[arg(short, long, env = "SHARDCHAIN_PORT")]
    port: Option<u16>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "SHARDCHAIN_CONFIG")]
    config: Option<PathBuf>,

    /// Blocks per shard epoch before leadership rotates.
    #[arg(long, env = "SHARDCHAIN_SHARD_SIZE")]
    shard_size: Option<u64>,

    /// Maximum concurrent peer calls during assembly and distribution.
    #[arg(long, env = "SHARDCHAIN_FETCH_WORKERS")]
    fetch_workers: Option<usize>,

    /// Peers to register at start-up (comma-separated: "10.0.0.1:5000,10.0.0.2:5000").
    #[arg(long, env = "SHARDCHAIN_PEERS", value_delimiter = ',')]
    peers: Vec<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "SHARDCHAIN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "SHARDCHAIN_LOG_FORMAT")]
    log_format: Option<String>,
}

impl Cli {
    /// Layer flags and env vars over the file config (or the defaults).
    fn into_config(self) -> anyhow::Result<NodeConfig> {
        let base = match &self.config {
            Some(path) => {
                let path = path.to_string_lossy();
                NodeConfig::from_toml_file(&path)
                    .with_context(|| format!("loading config from {path}"))?
            }
            None => NodeConfig::default(),
        };

        let config = NodeConfig {
            port: self.port.unwrap_or(base.port),
            shard_size: self.shard_size.unwrap_or(base.shard_size),
            fetch_workers: self.fetch_workers.unwrap_or(base.fetch_workers),
            bootstrap_peers: if self.peers.is_empty() {
                base.bootstrap_peers
            } else {
                self.peers
            },
            log_level: self.log_level.unwrap_or(base.log_level),
            log_format: self.log_format.unwrap_or(base.log_format),
            ..base
        };
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone();
    let config = cli.into_config()?;

    init_logging(config.log_format()?, &config.log_level).context("initialising logging")?;
    if let Some(path) = config_path {
        tracing::info!(path = %path.display(), "loaded config file");
    }

    let identity = NodeId::generate().context("generating node identity")?;
    let client = HttpPeerClient::with_timeout(config.peer_timeout())
        .context("building peer client")?;
    let port = config.port;
    let node = Arc::new(ChainNode::new(identity, config, Arc::new(client))?);

    tracing::info!(port, id = %node.identity(), "starting shardchain node");
    if !node.config().bootstrap_peers.is_empty() {
        tracing::info!(peers = %node.peers().await.join(", "), "bootstrap peers");
    }

    let shutdown = Arc::new(ShutdownController::new());
    let signals = Arc::clone(&shutdown);
    let miner = Arc::clone(&node);
    tokio::spawn(async move {
        signals.wait_for_signal().await;
        miner.halt_mining();
    });

    RpcServer::new(port, node)
        .serve(shutdown.wait())
        .await
        .context("HTTP server failed")?;

    tracing::info!("shardchain daemon exited cleanly");
    Ok(())
}
