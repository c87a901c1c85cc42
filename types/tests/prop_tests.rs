use proptest::prelude::*;

use shardchain_types::{Block, BlockHash, Timestamp, Transaction};

fn arb_transaction() -> impl Strategy<Value = Transaction> {
    ("[a-z0-9]{1,12}", "[a-z0-9]{1,12}", any::<u64>())
        .prop_map(|(sender, recipient, amount)| Transaction::new(sender, recipient, amount))
}

fn arb_block() -> impl Strategy<Value = Block> {
    (
        1u64..1_000_000,
        any::<u64>(),
        prop::collection::vec(arb_transaction(), 0..5),
        any::<u64>(),
        "[0-9a-f]{64}",
    )
        .prop_map(|(index, ts, transactions, proof, prev)| Block {
            index,
            timestamp: Timestamp::new(ts),
            transactions,
            proof,
            previous_hash: BlockHash::new(prev),
        })
}

proptest! {
    /// Hashing the same block twice yields the same digest.
    #[test]
    fn block_hash_is_deterministic(block in arb_block()) {
        prop_assert_eq!(block.compute_hash(), block.clone().compute_hash());
    }

    /// A block that travelled through JSON hashes exactly like the source block.
    #[test]
    fn block_hash_survives_json_transport(block in arb_block()) {
        let wire = serde_json::to_string(&block).unwrap();
        let decoded: Block = serde_json::from_str(&wire).unwrap();
        prop_assert_eq!(decoded.compute_hash(), block.compute_hash());
    }

    /// Digests are 64 lowercase hex characters.
    #[test]
    fn block_hash_is_hex_sha256(block in arb_block()) {
        let hash = block.compute_hash();
        prop_assert_eq!(hash.as_str().len(), 64);
        prop_assert!(hash.as_str().chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    /// Changing the proof always changes the digest.
    #[test]
    fn proof_is_covered_by_hash(block in arb_block(), delta in 1u64..1000) {
        let mut other = block.clone();
        other.proof = block.proof.wrapping_add(delta);
        prop_assert_ne!(other.compute_hash(), block.compute_hash());
    }

    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }
}
