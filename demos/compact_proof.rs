//! Example of compacting proofs and sending them as bytes
//!
//! This example demonstrates:
//! - Keeping values next to the tree with `SMSTWithStorage`
//! - Compacting a proof and encoding it
//! - Decoding and verifying it on the other side

use sha2::Sha256;
use smst::{
    compact_sum_proof, verify_compact_sum_proof, MemoryDb, SMSTWithStorage,
    SparseCompactMerkleSumProof, TreeSpec,
};
use std::convert::Infallible;

fn main() {
    let mut tree = SMSTWithStorage::<32, Sha256, Infallible>::new(
        Box::new(MemoryDb::new()),
        Box::new(MemoryDb::new()),
        TreeSpec::new(),
    );
    for i in 0..1000u32 {
        tree.update(&i.to_be_bytes(), format!("value {i}").as_bytes(), i as u64)
            .unwrap();
    }
    tree.commit().unwrap();
    let root = tree.root();

    let key = 42u32.to_be_bytes();
    let (value, sum) = tree.get_value(&key).unwrap().unwrap();
    let proof = tree.prove(&key).unwrap();
    let compact = compact_sum_proof(&proof, tree.spec()).unwrap();
    println!(
        "Side nodes: {}, after compaction: {}",
        proof.side_nodes.len(),
        compact.side_nodes.len()
    );

    let bytes = compact.encode().unwrap();
    println!("Encoded compact proof: {} bytes", bytes.len());

    // On the verifier side only the root, the spec and the claim are known
    let decoded = SparseCompactMerkleSumProof::decode(&bytes).unwrap();
    let spec = TreeSpec::<32, Sha256>::new();
    let valid = verify_compact_sum_proof(&decoded, &root, &key, &value, sum, &spec);
    println!("Compact proof verification: {:?}", valid);
}
