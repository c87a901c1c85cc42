//! Pre-built [`tracing::Span`] constructors for common node operations.
//!
//! Consistent span names and field sets make traces easy to filter.

use tracing::{info_span, Span};

/// Span covering one consensus round over `peer_count` peers.
pub fn consensus_span(peer_count: usize) -> Span {
    info_span!("consensus", peer_count = %peer_count)
}

/// Span covering redistribution of a chain across micronodes.
pub fn distribute_span(blocks: usize, micronodes: usize) -> Span {
    info_span!("distribute", blocks = %blocks, micronodes = %micronodes)
}

/// Span covering reassembly of the full chain from shard fragments.
pub fn assemble_span(micronodes: usize) -> Span {
    info_span!("assemble", micronodes = %micronodes)
}

/// Span covering a write forwarded to the active leader.
pub fn forward_span(op: &str, leader: &str) -> Span {
    info_span!("forward", op = %op, leader = %leader)
}

/// Span covering a single HTTP request handled by the RPC server.
pub fn rpc_span(route: &str) -> Span {
    info_span!("rpc", route = %route)
}
