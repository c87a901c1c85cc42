//! Shard coordinator: who may write, and how the chain is spread across
//! micronodes.
//!
//! All mutable state (ledger, schedule, tip) sits behind one
//! [`tokio::sync::RwLock`]. Writes take the guard, decide, mutate and drop
//! it; the guard is never held across a call to another node. A forwarded
//! write releases the guard before the call and re-acquires it to record
//! the leader's answer.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::Instrument;

use shardchain_ledger::{hash, LedgerStore};
use shardchain_network::{
    normalize_address, ForwardedTransaction, NetworkError, PeerClient, SealRequest, ShardView,
};
use shardchain_types::{Block, BlockHash, NodeId};

use crate::metrics::NodeMetrics;
use crate::parallel_fetcher::{FetchError, ParallelFetcher};
use crate::shard::{Micronode, ShardSchedule};
use crate::tracing_spans::{assemble_span, distribute_span, forward_span};
use crate::NodeError;

struct State {
    ledger: LedgerStore,
    schedule: ShardSchedule,
    /// Newest block this node knows of, sealed here or returned by the
    /// leader. Mining builds on it.
    tip: Option<Block>,
}

impl State {
    fn record_tip(&mut self, block: &Block) {
        if self.tip.as_ref().map_or(true, |t| t.index <= block.index) {
            self.tip = Some(block.clone());
        }
    }
}

enum WriteRoute {
    Local,
    Forward { leader: Micronode, view: ShardView },
}

/// Outcome of one step of redistribution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum StepOutcome {
    Done,
    Failed(String),
    /// Not attempted because an earlier step for the same node failed.
    Skipped,
}

impl StepOutcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct FragmentReport {
    pub epoch: usize,
    pub blocks: usize,
    pub outcome: StepOutcome,
}

#[derive(Clone, Debug, Serialize)]
pub struct NodeDistribution {
    pub address: String,
    pub cleared: StepOutcome,
    pub fragments: Vec<FragmentReport>,
}

/// Per-micronode record of a [`ShardCoordinator::distribute_chain`] call.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DistributionReport {
    pub nodes: Vec<NodeDistribution>,
}

impl DistributionReport {
    /// True only if every clear and every post succeeded.
    pub fn is_complete(&self) -> bool {
        self.nodes.iter().all(|n| {
            n.cleared.is_done() && n.fragments.iter().all(|f| f.outcome.is_done())
        })
    }

    pub fn failed_nodes(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| {
                !n.cleared.is_done() || n.fragments.iter().any(|f| !f.outcome.is_done())
            })
            .map(|n| n.address.as_str())
            .collect()
    }
}

pub struct ShardCoordinator {
    identity: NodeId,
    client: Arc<dyn PeerClient>,
    fetcher: ParallelFetcher,
    metrics: Arc<NodeMetrics>,
    state: RwLock<State>,
}

impl ShardCoordinator {
    pub fn new(
        identity: NodeId,
        shard_size: u64,
        client: Arc<dyn PeerClient>,
        fetcher: ParallelFetcher,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        Self::with_ledger(identity, shard_size, LedgerStore::new(), client, fetcher, metrics)
    }

    pub fn with_ledger(
        identity: NodeId,
        shard_size: u64,
        ledger: LedgerStore,
        client: Arc<dyn PeerClient>,
        fetcher: ParallelFetcher,
        metrics: Arc<NodeMetrics>,
    ) -> Self {
        let tip = ledger.last_block().cloned();
        metrics.chain_length.set(ledger.len() as i64);
        Self {
            identity,
            client,
            fetcher,
            metrics,
            state: RwLock::new(State {
                ledger,
                schedule: ShardSchedule::new(shard_size),
                tip,
            }),
        }
    }

    pub fn identity(&self) -> &NodeId {
        &self.identity
    }

    // ── Authorization ───────────────────────────────────────────────────

    fn route(&self, state: &State) -> Result<WriteRoute, NodeError> {
        let schedule = &state.schedule;
        if schedule.is_leader(&self.identity) {
            return Ok(WriteRoute::Local);
        }
        if schedule.is_coordinator(&self.identity) {
            if let Some(leader) = schedule.active_leader() {
                return Ok(WriteRoute::Forward {
                    leader: leader.clone(),
                    view: schedule.view(state.ledger.height()),
                });
            }
        }
        self.metrics.writes_rejected.inc();
        Err(NodeError::NotLeader {
            node: self.identity.clone(),
        })
    }

    pub async fn is_leader(&self) -> bool {
        self.state.read().await.schedule.is_leader(&self.identity)
    }

    /// Fail fast with `NotLeader` if this node can neither write locally
    /// nor forward.
    pub async fn ensure_writable(&self) -> Result<(), NodeError> {
        let state = self.state.read().await;
        self.route(&state).map(|_| ())
    }

    fn forward_failed(&self, err: NetworkError) -> NodeError {
        match err {
            NetworkError::LeaderRejected { peer } => {
                tracing::warn!(%peer, "leader refused forwarded write");
                self.metrics.writes_rejected.inc();
                NodeError::NotLeader {
                    node: self.identity.clone(),
                }
            }
            other => {
                self.metrics.peer_failures.inc();
                NodeError::Network(other)
            }
        }
    }

    // ── Writes ──────────────────────────────────────────────────────────

    fn seal_locally(
        &self,
        state: &mut State,
        proof: u64,
        previous_hash: Option<BlockHash>,
    ) -> Result<Block, NodeError> {
        let previous_hash = previous_hash.or_else(|| state.tip.as_ref().map(hash));
        let block = state.ledger.seal_block(proof, previous_hash)?;
        let block = state.ledger.append(block);
        state.record_tip(&block);
        if let Some(next) = state.schedule.record_sealed(block.index) {
            tracing::info!(index = block.index, leader = next, "leadership rotated");
        }
        self.metrics.blocks_sealed.inc();
        self.metrics.chain_length.set(state.ledger.len() as i64);
        tracing::debug!(index = block.index, proof, "block sealed");
        Ok(block)
    }

    /// Seal the pending transactions into a block with `proof`.
    ///
    /// The leader appends locally; the coordinator forwards to the leader
    /// and records the block it returns; anyone else gets `NotLeader`.
    pub async fn seal_and_append(
        &self,
        proof: u64,
        previous_hash: Option<BlockHash>,
    ) -> Result<Block, NodeError> {
        let (leader, request) = {
            let mut state = self.state.write().await;
            match self.route(&state)? {
                WriteRoute::Local => return self.seal_locally(&mut state, proof, previous_hash),
                WriteRoute::Forward { leader, view } => {
                    let previous_hash = previous_hash.or_else(|| state.tip.as_ref().map(hash));
                    (
                        leader,
                        SealRequest {
                            proof,
                            previous_hash,
                            view,
                        },
                    )
                }
            }
        };

        let block = self
            .client
            .forward_seal(&leader.address, &request)
            .instrument(forward_span("seal", &leader.address))
            .await
            .map_err(|e| self.forward_failed(e))?;
        self.metrics.writes_forwarded.inc();

        let mut state = self.state.write().await;
        state.ledger.observe_height(block.index);
        state.record_tip(&block);
        if let Some(next) = state.schedule.record_sealed(block.index) {
            tracing::info!(index = block.index, leader = next, "leadership rotated");
        }
        Ok(block)
    }

    /// Buffer a transaction for the next block. Returns that block's index.
    pub async fn submit_transaction(
        &self,
        sender: &str,
        recipient: &str,
        amount: u64,
    ) -> Result<u64, NodeError> {
        let (leader, request) = {
            let mut state = self.state.write().await;
            match self.route(&state)? {
                WriteRoute::Local => {
                    self.metrics.transactions_received.inc();
                    return Ok(state.ledger.add_transaction(sender, recipient, amount));
                }
                WriteRoute::Forward { leader, view } => (
                    leader,
                    ForwardedTransaction {
                        sender: sender.to_string(),
                        recipient: recipient.to_string(),
                        amount,
                        view,
                    },
                ),
            }
        };

        let index = self
            .client
            .forward_transaction(&leader.address, &request)
            .instrument(forward_span("transaction", &leader.address))
            .await
            .map_err(|e| self.forward_failed(e))?;
        self.metrics.writes_forwarded.inc();
        self.metrics.transactions_received.inc();
        Ok(index)
    }

    /// Merge the sender's view, then refuse unless this node now leads.
    /// Forwarded writes are never forwarded again.
    fn accept_view(&self, state: &mut State, view: &ShardView) -> Result<(), NodeError> {
        state.schedule.merge_view(view);
        state.ledger.observe_height(view.height);
        if state.schedule.is_leader(&self.identity) {
            Ok(())
        } else {
            self.metrics.writes_rejected.inc();
            Err(NodeError::NotLeader {
                node: self.identity.clone(),
            })
        }
    }

    pub async fn accept_forwarded_seal(&self, request: SealRequest) -> Result<Block, NodeError> {
        let mut state = self.state.write().await;
        self.accept_view(&mut state, &request.view)?;
        self.seal_locally(&mut state, request.proof, request.previous_hash)
    }

    pub async fn accept_forwarded_transaction(
        &self,
        request: ForwardedTransaction,
    ) -> Result<u64, NodeError> {
        let mut state = self.state.write().await;
        self.accept_view(&mut state, &request.view)?;
        self.metrics.transactions_received.inc();
        Ok(state
            .ledger
            .add_transaction(request.sender, request.recipient, request.amount))
    }

    // ── Membership ──────────────────────────────────────────────────────

    /// Resolve each address's identity and add them as micronodes.
    ///
    /// The local node must be one of them. A node that joins a subnet it
    /// does not coordinate drops its standalone chain, since epoch 0
    /// belongs to the coordinator. A coordinator that already sealed blocks
    /// keeps leading every epoch those blocks touch.
    pub async fn register_micronodes(
        &self,
        addresses: &[String],
    ) -> Result<Vec<Micronode>, NodeError> {
        let addresses = addresses
            .iter()
            .map(|a| normalize_address(a))
            .collect::<Result<Vec<_>, _>>()?;

        let client = Arc::clone(&self.client);
        let results = self
            .fetcher
            .map_async(addresses.clone(), move |address: String| {
                let client = Arc::clone(&client);
                async move { client.fetch_identity(&address).await }
            })
            .await;

        let mut nodes = Vec::with_capacity(addresses.len());
        for (address, result) in addresses.into_iter().zip(results) {
            match result {
                Ok(id) => nodes.push(Micronode { id, address }),
                Err(e) => {
                    self.metrics.peer_failures.inc();
                    return Err(identity_error(&address, e));
                }
            }
        }

        if !nodes.iter().any(|m| m.id == self.identity) {
            return Err(NodeError::NotInSubnet {
                node: self.identity.clone(),
            });
        }

        let mut state = self.state.write().await;
        let was_standalone = !state.schedule.is_sharded();
        let added = state.schedule.add_micronodes(nodes);
        if was_standalone {
            if state.schedule.is_coordinator(&self.identity) {
                let height = state.ledger.height();
                state.schedule.align_with_local_history(height);
            } else {
                // The subnet's history lives with the coordinator; heights
                // arrive with the first forwarded view.
                state.ledger.clear();
                state.tip = None;
                self.metrics.chain_length.set(0);
            }
        }
        let micronodes = state.schedule.micronodes().to_vec();
        self.metrics.micronode_count.set(micronodes.len() as i64);
        tracing::info!(added, total = micronodes.len(), "micronodes registered");
        Ok(micronodes)
    }

    // ── Distribution and assembly ───────────────────────────────────────

    /// Replace the chain held across the subnet with `chain`.
    ///
    /// Every micronode is cleared, then receives the fragments it now
    /// owns, in epoch order. A node whose clear failed gets nothing. The
    /// local node's share is applied directly. Without micronodes the
    /// local chain is simply replaced.
    pub async fn distribute_chain(&self, chain: Vec<Block>) -> DistributionReport {
        let span = {
            let state = self.state.read().await;
            distribute_span(chain.len(), state.schedule.micronodes().len())
        };
        self.distribute_inner(chain).instrument(span).await
    }

    async fn distribute_inner(&self, chain: Vec<Block>) -> DistributionReport {
        // Plan under the lock; apply the local share at the same time.
        let (local_report, remote) = {
            let mut state = self.state.write().await;
            if !state.schedule.is_sharded() {
                Self::replace_state(&mut state, chain);
                self.metrics.chain_length.set(state.ledger.len() as i64);
                return DistributionReport::default();
            }

            // One leader per completed epoch plus the open one, exactly as
            // if every block had been sealed here.
            let height = chain.last().map_or(0, |b| b.index);
            let leaders = state.schedule.leaders_for_height(height);
            state.schedule.extend_to(leaders);

            let micronodes = state.schedule.micronodes().to_vec();
            let mut owned: Vec<Vec<(usize, Vec<Block>)>> = vec![Vec::new(); micronodes.len()];
            for (epoch, (slot, fragment)) in state.schedule.partition(&chain).into_iter().enumerate()
            {
                if let Some(list) = owned.get_mut(slot) {
                    list.push((epoch, fragment.to_vec()));
                }
            }

            let mut local_report = None;
            let mut remote = Vec::new();
            for (node, fragments) in micronodes.into_iter().zip(owned) {
                if node.id == self.identity {
                    state.ledger.clear();
                    for (_, fragment) in &fragments {
                        for block in fragment {
                            state.ledger.append(block.clone());
                        }
                    }
                    local_report = Some(NodeDistribution {
                        address: node.address,
                        cleared: StepOutcome::Done,
                        fragments: fragments
                            .iter()
                            .map(|(epoch, blocks)| FragmentReport {
                                epoch: *epoch,
                                blocks: blocks.len(),
                                outcome: StepOutcome::Done,
                            })
                            .collect(),
                    });
                } else {
                    remote.push((node, fragments));
                }
            }
            if let Some(last) = chain.last() {
                state.ledger.observe_height(last.index);
            }
            state.tip = chain.last().cloned();
            self.metrics.chain_length.set(state.ledger.len() as i64);
            (local_report, remote)
        };

        // Phase 1: clear every remote micronode.
        let client = Arc::clone(&self.client);
        let addresses: Vec<String> = remote.iter().map(|(n, _)| n.address.clone()).collect();
        let clears = self
            .fetcher
            .map_async(addresses, move |address: String| {
                let client = Arc::clone(&client);
                async move { client.clear_chain(&address).await }
            })
            .await;

        // Phase 2: post fragments to nodes that were cleared.
        let mut pending_posts = Vec::new();
        let mut reports: Vec<NodeDistribution> = Vec::with_capacity(remote.len() + 1);
        reports.extend(local_report);
        for ((node, fragments), cleared) in remote.into_iter().zip(clears) {
            let cleared = match cleared {
                Ok(()) => StepOutcome::Done,
                Err(e) => {
                    self.metrics.peer_failures.inc();
                    tracing::warn!(peer = %node.address, error = %e, "clear failed; skipping node");
                    StepOutcome::Failed(e.to_string())
                }
            };
            let skip = !cleared.is_done();
            reports.push(NodeDistribution {
                address: node.address.clone(),
                cleared,
                fragments: fragments
                    .iter()
                    .map(|(epoch, blocks)| FragmentReport {
                        epoch: *epoch,
                        blocks: blocks.len(),
                        outcome: StepOutcome::Skipped,
                    })
                    .collect(),
            });
            if !skip && !fragments.is_empty() {
                pending_posts.push((reports.len() - 1, node.address, fragments));
            }
        }

        let client = Arc::clone(&self.client);
        let targets: Vec<usize> = pending_posts.iter().map(|(i, _, _)| *i).collect();
        let posts = self
            .fetcher
            .map_async(pending_posts, move |(_, address, fragments)| {
                let client = Arc::clone(&client);
                async move {
                    let mut outcomes = Vec::with_capacity(fragments.len());
                    let mut failed = false;
                    for (_, blocks) in &fragments {
                        if failed {
                            outcomes.push(StepOutcome::Skipped);
                            continue;
                        }
                        match client.post_fragment(&address, blocks).await {
                            Ok(()) => outcomes.push(StepOutcome::Done),
                            Err(e) => {
                                tracing::warn!(peer = %address, error = %e, "fragment post failed");
                                failed = true;
                                outcomes.push(StepOutcome::Failed(e.to_string()));
                            }
                        }
                    }
                    Ok::<_, NetworkError>(outcomes)
                }
            })
            .await;

        for (report_idx, result) in targets.into_iter().zip(posts) {
            let report = &mut reports[report_idx];
            match result {
                Ok(outcomes) => {
                    for (fragment, outcome) in report.fragments.iter_mut().zip(outcomes) {
                        if matches!(outcome, StepOutcome::Failed(_)) {
                            self.metrics.peer_failures.inc();
                        }
                        fragment.outcome = outcome;
                    }
                }
                Err(e) => {
                    self.metrics.peer_failures.inc();
                    for fragment in &mut report.fragments {
                        fragment.outcome = StepOutcome::Failed(e.to_string());
                    }
                }
            }
        }

        let report = DistributionReport { nodes: reports };
        if report.is_complete() {
            tracing::info!(blocks = chain.len(), "chain distributed");
        } else {
            tracing::warn!(failed = ?report.failed_nodes(), "chain distribution incomplete");
        }
        report
    }

    /// The whole chain, rebuilt from every micronode's fragment.
    ///
    /// With at most one micronode the local chain is the whole chain. A
    /// fragment that cannot be fetched is an error, never a silent gap.
    pub async fn assemble_full_chain(&self) -> Result<Vec<Block>, NodeError> {
        let (schedule, local) = {
            let state = self.state.read().await;
            (state.schedule.clone(), state.ledger.chain().to_vec())
        };
        if schedule.micronodes().len() <= 1 {
            return Ok(local);
        }
        let span = assemble_span(schedule.micronodes().len());
        self.assemble_inner(schedule, local).instrument(span).await
    }

    async fn assemble_inner(
        &self,
        schedule: ShardSchedule,
        local: Vec<Block>,
    ) -> Result<Vec<Block>, NodeError> {
        let client = Arc::clone(&self.client);
        let identity = self.identity.clone();
        let items: Vec<(usize, Micronode)> =
            schedule.micronodes().iter().cloned().enumerate().collect();

        let results = self
            .fetcher
            .map_async(items, move |(slot, node): (usize, Micronode)| {
                let client = Arc::clone(&client);
                let own = (node.id == identity).then(|| local.clone());
                async move {
                    let fragment = match own {
                        Some(blocks) => blocks,
                        None => client.fetch_fragment(&node.address).await.map_err(|e| {
                            NodeError::FragmentUnavailable {
                                peer: node.address.clone(),
                                reason: e.to_string(),
                            }
                        })?,
                    };
                    Ok::<_, NodeError>((slot, fragment))
                }
            })
            .await;

        let mut tagged = Vec::with_capacity(results.len());
        for (node, result) in schedule.micronodes().iter().zip(results) {
            match result {
                Ok(pair) => tagged.push(pair),
                Err(FetchError::Failed(e)) => {
                    self.metrics.peer_failures.inc();
                    return Err(e);
                }
                Err(other) => {
                    self.metrics.peer_failures.inc();
                    return Err(NodeError::FragmentUnavailable {
                        peer: node.address.clone(),
                        reason: other.to_string(),
                    });
                }
            }
        }
        tagged.sort_by_key(|(slot, _)| *slot);
        let fragments: Vec<Vec<Block>> = tagged.into_iter().map(|(_, f)| f).collect();

        let chain = schedule.reassemble(&fragments)?;
        tracing::debug!(length = chain.len(), "full chain assembled");
        Ok(chain)
    }

    // ── Local fragment ──────────────────────────────────────────────────

    fn replace_state(state: &mut State, chain: Vec<Block>) {
        state.tip = chain.last().cloned();
        state.ledger.replace(chain);
    }

    pub async fn replace_local(&self, chain: Vec<Block>) {
        let mut state = self.state.write().await;
        Self::replace_state(&mut state, chain);
        self.metrics.chain_length.set(state.ledger.len() as i64);
    }

    pub async fn clear_local(&self) {
        let mut state = self.state.write().await;
        state.ledger.clear();
        state.tip = None;
        self.metrics.chain_length.set(0);
    }

    /// Append `blocks` verbatim. Returns the local chain afterwards.
    pub async fn append_fragment(&self, blocks: Vec<Block>) -> Vec<Block> {
        let mut state = self.state.write().await;
        for block in blocks {
            state.record_tip(&block);
            state.ledger.append(block);
        }
        self.metrics.chain_length.set(state.ledger.len() as i64);
        state.ledger.chain().to_vec()
    }

    pub async fn local_chain(&self) -> Vec<Block> {
        self.state.read().await.ledger.chain().to_vec()
    }

    /// Newest block known here, the base for the next proof of work.
    pub async fn last_block(&self) -> Option<Block> {
        self.state.read().await.tip.clone()
    }

    pub async fn view(&self) -> ShardView {
        let state = self.state.read().await;
        state.schedule.view(state.ledger.height())
    }

    pub async fn micronodes(&self) -> Vec<Micronode> {
        self.state.read().await.schedule.micronodes().to_vec()
    }

    pub async fn is_sharded(&self) -> bool {
        self.state.read().await.schedule.is_sharded()
    }

    pub async fn pending_count(&self) -> usize {
        self.state.read().await.ledger.pending().len()
    }
}

fn identity_error(address: &str, err: FetchError<NetworkError>) -> NodeError {
    match err {
        FetchError::Failed(e) => NodeError::Network(e),
        other => NodeError::Network(NetworkError::PeerUnreachable {
            peer: address.to_string(),
            reason: other.to_string(),
        }),
    }
}
