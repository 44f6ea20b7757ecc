//! Example of implementing a custom hasher for the Sparse Merkle Sum Tree
//!
//! This example demonstrates:
//! - Creating a custom hasher implementation
//! - Using it with the tree
//! - Verifying proofs with the spec of the tree that produced them

use sha2::{Digest, Sha256};
use smst::{verify_sum_proof, Hasher, MemoryDb, TreeSpec, SMST};
use std::convert::Infallible;

// Custom hasher that uses SHA256 but adds a prefix to the input
#[derive(Clone)]
struct PrefixedSha256;

impl Hasher<32> for PrefixedSha256 {
    fn hash(data: &[u8]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        // Add a custom prefix to the input
        hasher.update(b"custom_prefix:");
        hasher.update(data);
        hasher.finalize().into()
    }
}

fn main() {
    // Create a new tree with our custom hasher
    let mut tree =
        SMST::<32, PrefixedSha256, Infallible>::new(Box::new(MemoryDb::new()), TreeSpec::new());
    tree.update(b"key", b"value", 100).unwrap();
    println!("Root with custom hasher: {}", hex::encode(tree.root()));

    // Compare with standard SHA256
    let mut standard_tree =
        SMST::<32, Sha256, Infallible>::new(Box::new(MemoryDb::new()), TreeSpec::new());
    standard_tree.update(b"key", b"value", 100).unwrap();
    println!(
        "Root with standard SHA256: {}",
        hex::encode(standard_tree.root())
    );

    // A proof only verifies with the hasher of its tree
    let proof = tree.prove(b"key").unwrap();
    let custom = verify_sum_proof(&proof, &tree.root(), b"key", b"value", 100, tree.spec());
    let standard = verify_sum_proof(
        &proof,
        &tree.root(),
        b"key",
        b"value",
        100,
        standard_tree.spec(),
    );
    println!("Verified with the custom hasher: {:?}", custom);
    println!("Verified with standard SHA256: {:?}", standard);

    // Note that the roots are different due to our custom prefix, the sums are the same
    println!("\nThe roots only share their last 8 bytes, the sum of the tree.");
}
