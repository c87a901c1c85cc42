#![no_main]

use libfuzzer_sys::fuzz_target;
use shardchain_types::Block;

fuzz_target!(|data: &[u8]| {
    // Peers send blocks and chains as JSON; none of this may panic.
    if let Ok(block) = serde_json::from_slice::<Block>(data) {
        let first = block.compute_hash();
        let reparsed: Block = serde_json::from_value(serde_json::to_value(&block).unwrap()).unwrap();
        assert_eq!(first, reparsed.compute_hash());
    }

    if let Ok(chain) = serde_json::from_slice::<Vec<Block>>(data) {
        let _ = shardchain_ledger::check_chain(&chain);
    }
});
