#![no_main]

use libfuzzer_sys::fuzz_target;
use shardchain_types::BlockHash;

fuzz_target!(|data: &[u8]| {
    // 8 bytes last proof, 8 bytes proof, the rest as the previous hash.
    if data.len() >= 16 {
        let last_proof = u64::from_le_bytes([
            data[0], data[1], data[2], data[3],
            data[4], data[5], data[6], data[7],
        ]);
        let proof = u64::from_le_bytes([
            data[8], data[9], data[10], data[11],
            data[12], data[13], data[14], data[15],
        ]);
        let last_hash = BlockHash::new(String::from_utf8_lossy(&data[16..]).into_owned());

        // This must never panic regardless of input
        let _ = shardchain_work::valid_proof(last_proof, proof, &last_hash);
    }
});
