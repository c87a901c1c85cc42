//! Longest-valid-chain resolver.
//!
//! Peers are visited one at a time in registry order. A candidate replaces
//! the current best only if it is strictly longer, its reported length
//! matches the blocks actually sent, and it validates. Ties keep whichever
//! chain reached that length first.

use std::sync::Arc;

use shardchain_ledger::check_chain;
use shardchain_network::{ChainResponse, PeerClient};
use shardchain_types::Block;

/// What happened to one peer's chain during a resolution round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerVote {
    /// Became the best chain seen so far.
    Adopted { length: usize },
    /// Valid or not, it was no longer than the best chain at that point.
    NotLonger { length: usize },
    /// Longer, but failed validation.
    Invalid { length: usize, reason: String },
    /// The `length` field disagreed with the number of blocks sent.
    LengthMismatch { reported: usize, actual: usize },
    /// No usable response.
    Unreachable { reason: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeerReport {
    pub peer: String,
    pub vote: PeerVote,
}

/// Outcome of [`ConsensusResolver::resolve`].
#[derive(Clone, Debug)]
pub struct Resolution {
    /// True iff a peer's chain was adopted.
    pub replaced: bool,
    /// The winning chain (the local one when nothing was adopted).
    pub chain: Vec<Block>,
    /// One entry per peer, in scan order.
    pub votes: Vec<PeerReport>,
}

impl Resolution {
    /// The peer whose chain won, if any.
    pub fn adopted_from(&self) -> Option<&str> {
        self.votes
            .iter()
            .rev()
            .find(|r| matches!(r.vote, PeerVote::Adopted { .. }))
            .map(|r| r.peer.as_str())
    }

    pub fn unreachable_count(&self) -> usize {
        self.votes
            .iter()
            .filter(|r| matches!(r.vote, PeerVote::Unreachable { .. }))
            .count()
    }
}

pub struct ConsensusResolver {
    client: Arc<dyn PeerClient>,
}

impl ConsensusResolver {
    pub fn new(client: Arc<dyn PeerClient>) -> Self {
        Self { client }
    }

    /// Scan `peers` and return the longest valid chain among them and
    /// `local`.
    ///
    /// Never fails: unreachable peers and bad chains only show up in
    /// [`Resolution::votes`].
    pub async fn resolve(&self, local: &[Block], peers: &[String]) -> Resolution {
        let mut best: Option<Vec<Block>> = None;
        let mut best_length = local.len();
        let mut votes = Vec::with_capacity(peers.len());

        for peer in peers {
            let vote = match self.client.fetch_chain(peer).await {
                Err(e) => {
                    tracing::warn!(%peer, error = %e, "peer chain unavailable");
                    PeerVote::Unreachable {
                        reason: e.to_string(),
                    }
                }
                Ok(ChainResponse { chain, length }) => {
                    if length != chain.len() {
                        tracing::debug!(%peer, reported = length, actual = chain.len(), "length mismatch");
                        PeerVote::LengthMismatch {
                            reported: length,
                            actual: chain.len(),
                        }
                    } else if length <= best_length {
                        PeerVote::NotLonger { length }
                    } else {
                        match check_chain(&chain) {
                            Ok(()) => {
                                tracing::debug!(%peer, length, "candidate adopted");
                                best_length = length;
                                best = Some(chain);
                                PeerVote::Adopted { length }
                            }
                            Err(e) => {
                                tracing::info!(%peer, length, error = %e, "rejected invalid chain");
                                PeerVote::Invalid {
                                    length,
                                    reason: e.to_string(),
                                }
                            }
                        }
                    }
                }
            };
            votes.push(PeerReport {
                peer: peer.clone(),
                vote,
            });
        }

        let replaced = best.is_some();
        let chain = best.unwrap_or_else(|| local.to_vec());
        if replaced {
            tracing::info!(length = chain.len(), "local chain superseded");
        }
        Resolution {
            replaced,
            chain,
            votes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shardchain_nullables::{mined_chain, tampered, NullPeerClient};

    fn peers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn adopts_longest_valid_chain() {
        let full = mined_chain(7);
        let client = Arc::new(NullPeerClient::new());
        client.set_chain("a:1", full[..5].to_vec());
        client.set_chain("b:1", full.clone());
        client.set_chain("c:1", tampered(full.clone(), 9));

        let resolver = ConsensusResolver::new(client.clone());
        let res = resolver
            .resolve(&full[..4], &peers(&["a:1", "b:1", "c:1"]))
            .await;

        assert!(res.replaced);
        assert_eq!(res.chain.len(), 7);
        assert_eq!(res.chain, full);
        assert_eq!(res.adopted_from(), Some("b:1"));
        assert_eq!(res.votes[0].vote, PeerVote::Adopted { length: 5 });
        assert_eq!(res.votes[1].vote, PeerVote::Adopted { length: 7 });
        assert!(matches!(res.votes[2].vote, PeerVote::Invalid { length: 9, .. }));
    }

    #[tokio::test]
    async fn keeps_local_when_no_peer_is_longer() {
        let full = mined_chain(3);
        let client = Arc::new(NullPeerClient::new());
        client.set_chain("a:1", full[..2].to_vec());
        client.set_chain("b:1", full.clone());

        let resolver = ConsensusResolver::new(client);
        let res = resolver.resolve(&full, &peers(&["a:1", "b:1"])).await;

        assert!(!res.replaced);
        assert_eq!(res.chain, full);
        assert_eq!(res.adopted_from(), None);
        assert!(res
            .votes
            .iter()
            .all(|r| matches!(r.vote, PeerVote::NotLonger { .. })));
    }

    #[tokio::test]
    async fn first_chain_to_reach_a_length_wins_ties() {
        let full = mined_chain(4);
        let client = Arc::new(NullPeerClient::new());
        client.set_chain("a:1", full.clone());
        client.set_chain("b:1", full.clone());

        let resolver = ConsensusResolver::new(client);
        let res = resolver.resolve(&full[..1], &peers(&["a:1", "b:1"])).await;

        assert_eq!(res.adopted_from(), Some("a:1"));
        assert_eq!(res.votes[1].vote, PeerVote::NotLonger { length: 4 });
    }

    #[tokio::test]
    async fn unreachable_and_mismatched_peers_are_skipped() {
        let full = mined_chain(3);
        let client = Arc::new(NullPeerClient::new());
        client.set_chain("a:1", full.clone());
        client.set_unreachable("a:1");
        client.set_chain_with_length("b:1", full.clone(), 10);

        let resolver = ConsensusResolver::new(client);
        let res = resolver.resolve(&full[..1], &peers(&["a:1", "b:1"])).await;

        assert!(!res.replaced);
        assert_eq!(res.chain.len(), 1);
        assert_eq!(res.unreachable_count(), 1);
        assert_eq!(
            res.votes[1].vote,
            PeerVote::LengthMismatch {
                reported: 10,
                actual: 3
            }
        );
    }

    #[tokio::test]
    async fn no_peers_keeps_local_chain() {
        let local = mined_chain(2);
        let resolver = ConsensusResolver::new(Arc::new(NullPeerClient::new()));
        let res = resolver.resolve(&local, &[]).await;
        assert!(!res.replaced);
        assert_eq!(res.chain, local);
        assert!(res.votes.is_empty());
    }
}
