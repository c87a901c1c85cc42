//! Shard schedule: which micronode leads which epoch.
//!
//! Epoch `k` covers global block indices `k * shard_size + 1 ..= (k + 1) *
//! shard_size`. `leaders[k]` is the slot (position in `micronodes`) of the
//! node that seals epoch `k`. The list starts as `[0]` and only grows.

use serde::{Deserialize, Serialize};

use shardchain_network::ShardView;
use shardchain_types::{Block, NodeId};

use crate::NodeError;

/// A peer taking part in leader rotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Micronode {
    pub id: NodeId,
    /// `host:port` used for every call to this node.
    pub address: String,
}

#[derive(Clone, Debug)]
pub struct ShardSchedule {
    shard_size: u64,
    micronodes: Vec<Micronode>,
    leaders: Vec<usize>,
}

impl ShardSchedule {
    /// `shard_size` is clamped to at least 1.
    pub fn new(shard_size: u64) -> Self {
        Self {
            shard_size: shard_size.max(1),
            micronodes: Vec::new(),
            leaders: vec![0],
        }
    }

    pub fn shard_size(&self) -> u64 {
        self.shard_size
    }

    pub fn micronodes(&self) -> &[Micronode] {
        &self.micronodes
    }

    pub fn leaders(&self) -> &[usize] {
        &self.leaders
    }

    pub fn is_sharded(&self) -> bool {
        !self.micronodes.is_empty()
    }

    /// The micronode allowed to seal right now.
    pub fn active_leader(&self) -> Option<&Micronode> {
        let slot = *self.leaders.last()?;
        self.micronodes.get(slot)
    }

    /// `micronodes[0]`, which forwards writes it cannot perform itself.
    pub fn coordinator(&self) -> Option<&Micronode> {
        self.micronodes.first()
    }

    /// Without micronodes every node is its own authority.
    pub fn is_leader(&self, id: &NodeId) -> bool {
        if self.micronodes.is_empty() {
            return true;
        }
        self.active_leader().is_some_and(|m| &m.id == id)
    }

    pub fn is_coordinator(&self, id: &NodeId) -> bool {
        self.coordinator().is_some_and(|m| &m.id == id)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.micronodes.iter().any(|m| &m.id == id)
    }

    /// Append micronodes not already present (by id). Returns how many
    /// were added.
    pub fn add_micronodes(&mut self, nodes: impl IntoIterator<Item = Micronode>) -> usize {
        let mut added = 0;
        for node in nodes {
            if !self.contains(&node.id) {
                self.micronodes.push(node);
                added += 1;
            }
        }
        added
    }

    /// Apply the rotation rule after block `index` was sealed. Returns the
    /// new leader slot if leadership moved.
    pub fn record_sealed(&mut self, index: u64) -> Option<usize> {
        if self.micronodes.is_empty() || index % self.shard_size != 0 {
            return None;
        }
        Some(self.rotate())
    }

    fn rotate(&mut self) -> usize {
        let last = self.leaders.last().copied().unwrap_or(0);
        let next = (last + 1) % self.micronodes.len().max(1);
        self.leaders.push(next);
        next
    }

    /// Length of the leader list once block `height` is sealed: one entry
    /// per completed epoch plus the open one.
    pub fn leaders_for_height(&self, height: u64) -> usize {
        (height / self.shard_size + 1) as usize
    }

    /// Catch the schedule up with a chain this node sealed before it had
    /// micronodes. Those epochs, and the open one, stay with slot 0, the
    /// coordinator whose ledger already holds them.
    pub fn align_with_local_history(&mut self, height: u64) {
        let target = self.leaders_for_height(height);
        while self.leaders.len() < target {
            self.leaders.push(0);
        }
    }

    /// Make sure epochs `0..epochs` all have a leader, continuing round
    /// robin from the last known one.
    pub fn extend_to(&mut self, epochs: usize) {
        if self.micronodes.is_empty() {
            return;
        }
        while self.leaders.len() < epochs {
            self.rotate();
        }
    }

    /// Adopt a view carried by a forwarded write. The leader list only
    /// grows; a view that disagrees with the local prefix is ignored.
    pub fn merge_view(&mut self, view: &ShardView) -> bool {
        if view.leaders.len() <= self.leaders.len() {
            return false;
        }
        if !view.leaders.starts_with(&self.leaders) {
            tracing::warn!(
                local = ?self.leaders,
                remote = ?view.leaders,
                "ignoring leader view that diverges from local schedule"
            );
            return false;
        }
        self.leaders = view.leaders.clone();
        true
    }

    pub fn view(&self, height: u64) -> ShardView {
        ShardView {
            leaders: self.leaders.clone(),
            height,
        }
    }

    /// Split `chain` into epoch-sized fragments, paired with the slot of
    /// the micronode that owns each. Call [`Self::extend_to`] first.
    pub fn partition<'a>(&self, chain: &'a [Block]) -> Vec<(usize, &'a [Block])> {
        chain
            .chunks(self.shard_size as usize)
            .zip(self.leaders.iter().copied())
            .map(|(fragment, slot)| (slot, fragment))
            .collect()
    }

    /// Rebuild the full chain from the fragments stored by each micronode,
    /// `fragments[slot]` being what `micronodes[slot]` holds.
    ///
    /// Epoch `k` consumes the next `shard_size` blocks of its leader's
    /// fragment. A short epoch ends the chain.
    pub fn reassemble(&self, fragments: &[Vec<Block>]) -> Result<Vec<Block>, NodeError> {
        let size = self.shard_size as usize;
        let mut cursors = vec![0usize; fragments.len()];
        let mut chain = Vec::new();

        for (epoch, &slot) in self.leaders.iter().enumerate() {
            let fragment = fragments.get(slot).ok_or_else(|| {
                NodeError::InconsistentShards(format!(
                    "epoch {epoch} led by slot {slot}, only {} fragments",
                    fragments.len()
                ))
            })?;
            let start = cursors[slot];
            let end = (start + size).min(fragment.len());
            let taken = &fragment[start..end];
            chain.extend_from_slice(taken);
            cursors[slot] = end;
            if taken.len() < size {
                break;
            }
        }

        for (pos, block) in chain.iter().enumerate() {
            if block.index != pos as u64 + 1 {
                return Err(NodeError::InconsistentShards(format!(
                    "block at position {pos} has index {}",
                    block.index
                )));
            }
        }

        let leftover: usize = fragments
            .iter()
            .zip(&cursors)
            .map(|(f, &c)| f.len().saturating_sub(c))
            .sum();
        if leftover > 0 {
            tracing::warn!(leftover, "fragments hold blocks beyond the leader schedule");
        }
        Ok(chain)
    }
}
