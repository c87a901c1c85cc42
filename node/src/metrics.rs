//! Prometheus metrics for a shardchain node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`] that the `/metrics`
//! route encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

use crate::NodeError;

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Blocks sealed and appended by this node as leader.
    pub blocks_sealed: IntCounter,
    /// Writes (seals and transactions) forwarded to the active leader.
    pub writes_forwarded: IntCounter,
    /// Writes refused with "not the leader".
    pub writes_rejected: IntCounter,
    /// Transactions accepted, locally or by forwarding.
    pub transactions_received: IntCounter,
    pub consensus_rounds: IntCounter,
    /// Rounds that replaced the local chain.
    pub chain_replacements: IntCounter,
    /// Failed calls to peers or micronodes.
    pub peer_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Blocks held locally (the shard fragment when sharded).
    pub chain_length: IntGauge,
    pub peer_count: IntGauge,
    pub micronode_count: IntGauge,
}

impl NodeMetrics {
    /// Create a fresh set of metrics registered under a new [`Registry`].
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();
        let counter = |name: &str, help: &str| {
            register_int_counter_with_registry!(Opts::new(name, help), registry)
                .map_err(|e| NodeError::Config(format!("metric {name}: {e}")))
        };
        let blocks_sealed = counter("shardchain_blocks_sealed_total", "Blocks sealed by this node")?;
        let writes_forwarded = counter(
            "shardchain_writes_forwarded_total",
            "Writes forwarded to the active leader",
        )?;
        let writes_rejected = counter(
            "shardchain_writes_rejected_total",
            "Writes rejected because this node is not the leader",
        )?;
        let transactions_received = counter(
            "shardchain_transactions_received_total",
            "Transactions accepted",
        )?;
        let consensus_rounds =
            counter("shardchain_consensus_rounds_total", "Consensus rounds run")?;
        let chain_replacements = counter(
            "shardchain_chain_replacements_total",
            "Consensus rounds that replaced the local chain",
        )?;
        let peer_failures = counter("shardchain_peer_failures_total", "Failed peer calls")?;

        let gauge = |name: &str, help: &str| {
            register_int_gauge_with_registry!(Opts::new(name, help), registry)
                .map_err(|e| NodeError::Config(format!("metric {name}: {e}")))
        };
        let chain_length = gauge("shardchain_chain_length", "Blocks held locally")?;
        let peer_count = gauge("shardchain_peer_count", "Registered peers")?;
        let micronode_count = gauge("shardchain_micronode_count", "Registered micronodes")?;

        Ok(Self {
            registry,
            blocks_sealed,
            writes_forwarded,
            writes_rejected,
            transactions_received,
            consensus_rounds,
            chain_replacements,
            peer_failures,
            chain_length,
            peer_count,
            micronode_count,
        })
    }

    /// Encode every metric in the text exposition format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buf = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buf)
            .map_err(|e| NodeError::Config(format!("metrics encoding: {e}")))?;
        String::from_utf8(buf).map_err(|e| NodeError::Config(format!("metrics encoding: {e}")))
    }
}
