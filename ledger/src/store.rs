//! Append-only chain storage plus the pending-transaction buffer.

use shardchain_types::{Block, BlockHash, Chain, Timestamp, Transaction};

use crate::genesis::create_genesis_block;
use crate::LedgerError;

/// Canonical SHA-256 hash of a block.
pub fn hash(block: &Block) -> BlockHash {
    block.compute_hash()
}

/// A node's local chain (or chain fragment) and the transactions waiting
/// for the next block.
///
/// `height` is the highest global block index this store knows of. It
/// equals the tip's index whenever the store holds the whole chain, and is
/// raised by [`LedgerStore::observe_height`] when the node only holds a
/// fragment and learns about blocks sealed elsewhere.
#[derive(Clone, Debug)]
pub struct LedgerStore {
    chain: Chain,
    pending: Vec<Transaction>,
    height: u64,
}

impl LedgerStore {
    /// A store holding only a fresh genesis block.
    pub fn new() -> Self {
        Self::with_genesis(create_genesis_block())
    }

    pub fn with_genesis(genesis: Block) -> Self {
        let height = genesis.index;
        Self {
            chain: vec![genesis],
            pending: Vec::new(),
            height,
        }
    }

    /// Build the next block from the pending buffer without appending it.
    ///
    /// Without an explicit `previous_hash` the hash of the local tip is
    /// used; an empty store then fails with [`LedgerError::EmptyChain`].
    pub fn seal_block(
        &self,
        proof: u64,
        previous_hash: Option<BlockHash>,
    ) -> Result<Block, LedgerError> {
        let previous_hash = match previous_hash {
            Some(h) => h,
            None => hash(self.chain.last().ok_or(LedgerError::EmptyChain)?),
        };
        Ok(Block {
            index: self.height + 1,
            timestamp: Timestamp::now(),
            transactions: self.pending.clone(),
            proof,
            previous_hash,
        })
    }

    /// Append `block` to the tail and reset the pending buffer.
    ///
    /// No validation is done here.
    pub fn append(&mut self, block: Block) -> Block {
        self.pending = Vec::new();
        self.height = self.height.max(block.index);
        self.chain.push(block.clone());
        block
    }

    /// Buffer a transaction; returns the index of the block that will hold it.
    pub fn add_transaction(
        &mut self,
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: u64,
    ) -> u64 {
        self.pending.push(Transaction::new(sender, recipient, amount));
        self.next_index()
    }

    /// Drop every block and pending transaction.
    pub fn clear(&mut self) {
        self.chain.clear();
        self.pending.clear();
        self.height = 0;
    }

    /// Replace the whole chain, e.g. after losing a consensus round.
    pub fn replace(&mut self, chain: Chain) {
        self.height = chain.last().map(|b| b.index).unwrap_or(0);
        self.chain = chain;
        self.pending = Vec::new();
    }

    /// Raise the known global height; never lowers it.
    pub fn observe_height(&mut self, height: u64) {
        self.height = self.height.max(height);
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn last_block(&self) -> Option<&Block> {
        self.chain.last()
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn next_index(&self) -> u64 {
        self.height + 1
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}
