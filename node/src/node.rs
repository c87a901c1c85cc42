//! The main node struct: wires registry, coordinator and consensus together.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::Instrument;

use shardchain_consensus::{ConsensusResolver, PeerReport};
use shardchain_ledger::{hash, LedgerError};
use shardchain_network::{normalize_address, PeerClient, PeerRegistry};
use shardchain_types::{Block, NodeId};
use shardchain_work::solve_until;

use crate::config::NodeConfig;
use crate::coordinator::{DistributionReport, ShardCoordinator};
use crate::error::NodeError;
use crate::metrics::NodeMetrics;
use crate::parallel_fetcher::ParallelFetcher;
use crate::shard::Micronode;
use crate::tracing_spans::consensus_span;

/// Sender of the reward transaction in every mined block.
pub const REWARD_SENDER: &str = "0";
pub const MINING_REWARD: u64 = 1;

/// Result of [`ChainNode::resolve`].
#[derive(Clone, Debug, Serialize)]
pub struct ResolveOutcome {
    pub replaced: bool,
    pub chain: Vec<Block>,
    /// Present when the adopted chain was spread across micronodes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<DistributionReport>,
    #[serde(skip)]
    pub votes: Vec<PeerReport>,
}

/// A running shardchain node.
pub struct ChainNode {
    identity: NodeId,
    config: NodeConfig,
    peers: RwLock<PeerRegistry>,
    coordinator: ShardCoordinator,
    resolver: ConsensusResolver,
    metrics: Arc<NodeMetrics>,
    /// Raised once; every proof search in flight or started later stops.
    halt: Arc<AtomicBool>,
}

impl ChainNode {
    /// Build a node with a fresh genesis block. Bootstrap peers from the
    /// configuration are registered immediately.
    pub fn new(
        identity: NodeId,
        config: NodeConfig,
        client: Arc<dyn PeerClient>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let metrics = Arc::new(NodeMetrics::new()?);

        let mut registry = PeerRegistry::new();
        for peer in &config.bootstrap_peers {
            registry.register(peer)?;
        }
        metrics.peer_count.set(registry.len() as i64);

        let fetcher = ParallelFetcher::new(config.fetch_workers);
        let coordinator = ShardCoordinator::new(
            identity.clone(),
            config.shard_size,
            Arc::clone(&client),
            fetcher,
            Arc::clone(&metrics),
        );

        tracing::info!(
            id = %identity,
            shard_size = config.shard_size,
            peers = registry.len(),
            "node initialised"
        );

        Ok(Self {
            identity,
            config,
            peers: RwLock::new(registry),
            coordinator,
            resolver: ConsensusResolver::new(client),
            metrics,
            halt: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn identity(&self) -> &NodeId {
        &self.identity
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    pub fn coordinator(&self) -> &ShardCoordinator {
        &self.coordinator
    }

    /// Find a proof on top of the current tip, reward this node and seal
    /// the block (locally or via the leader).
    pub async fn mine(&self) -> Result<Block, NodeError> {
        self.coordinator.ensure_writable().await?;
        let tip = self
            .coordinator
            .last_block()
            .await
            .ok_or(LedgerError::EmptyChain)?;
        let last_hash = hash(&tip);

        let search_hash = last_hash.clone();
        let last_proof = tip.proof;
        let halt = Arc::clone(&self.halt);
        let proof = tokio::task::spawn_blocking(move || {
            solve_until(last_proof, &search_hash, &halt)
        })
        .await
        .map_err(|e| NodeError::Task(e.to_string()))??;

        self.coordinator
            .submit_transaction(REWARD_SENDER, self.identity.as_str(), MINING_REWARD)
            .await?;
        let block = self
            .coordinator
            .seal_and_append(proof, Some(last_hash))
            .await?;
        tracing::info!(index = block.index, proof, "new block forged");
        Ok(block)
    }

    /// Stop every proof search. Blocking tasks would otherwise keep the
    /// runtime alive past shutdown.
    pub fn halt_mining(&self) {
        if !self.halt.swap(true, Ordering::Relaxed) {
            tracing::info!("proof search halted");
        }
    }

    pub async fn submit_transaction(
        &self,
        sender: &str,
        recipient: &str,
        amount: u64,
    ) -> Result<u64, NodeError> {
        self.coordinator
            .submit_transaction(sender, recipient, amount)
            .await
    }

    /// Register every address, or none if any is invalid.
    pub async fn register_peers(&self, addresses: &[String]) -> Result<Vec<String>, NodeError> {
        let normalized = addresses
            .iter()
            .map(|a| normalize_address(a))
            .collect::<Result<Vec<_>, _>>()?;
        let mut registry = self.peers.write().await;
        for peer in &normalized {
            registry.register(peer)?;
        }
        self.metrics.peer_count.set(registry.len() as i64);
        Ok(registry.peers())
    }

    pub async fn peers(&self) -> Vec<String> {
        self.peers.read().await.peers()
    }

    pub async fn register_micronodes(
        &self,
        addresses: &[String],
    ) -> Result<Vec<Micronode>, NodeError> {
        self.coordinator.register_micronodes(addresses).await
    }

    pub async fn full_chain(&self) -> Result<Vec<Block>, NodeError> {
        self.coordinator.assemble_full_chain().await
    }

    /// Run one consensus round against every registered peer.
    ///
    /// The assembled chain stands for the local one; if assembly fails the
    /// local fragment is used instead. An adopted chain is redistributed
    /// across micronodes, or replaces the local chain when there are none.
    pub async fn resolve(&self) -> Result<ResolveOutcome, NodeError> {
        let local = match self.coordinator.assemble_full_chain().await {
            Ok(chain) => chain,
            Err(e) => {
                tracing::warn!(error = %e, "assembly failed; resolving against local fragment");
                self.coordinator.local_chain().await
            }
        };
        let peers = self.peers().await;

        let resolution = self
            .resolver
            .resolve(&local, &peers)
            .instrument(consensus_span(peers.len()))
            .await;
        self.metrics.consensus_rounds.inc();
        self.metrics
            .peer_failures
            .inc_by(resolution.unreachable_count() as u64);

        let mut distribution = None;
        if resolution.replaced {
            self.metrics.chain_replacements.inc();
            tracing::info!(
                from = resolution.adopted_from().unwrap_or_default(),
                length = resolution.chain.len(),
                "adopting longer chain"
            );
            if self.coordinator.is_sharded().await {
                distribution = Some(
                    self.coordinator
                        .distribute_chain(resolution.chain.clone())
                        .await,
                );
            } else {
                self.coordinator
                    .replace_local(resolution.chain.clone())
                    .await;
            }
        }

        Ok(ResolveOutcome {
            replaced: resolution.replaced,
            chain: resolution.chain,
            distribution,
            votes: resolution.votes,
        })
    }
}
