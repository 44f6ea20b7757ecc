//! Basic example of using the Sparse Merkle Sum Tree
//!
//! This example demonstrates:
//! - Creating a new tree
//! - Updating and deleting keys
//! - Getting the root and the total sum
//! - Verifying membership and non-membership proofs

use smst::{verify_sum_proof, MemoryDb, TreeSpec, DEFAULT_VALUE, SMST};
use sha2::Sha256;
use std::convert::Infallible;

fn main() {
    // Create a new tree with 32-byte hashes using SHA256, keys and values are hashed
    let db = Box::new(MemoryDb::new());
    let mut tree = SMST::<32, Sha256, Infallible>::new(db, TreeSpec::new());

    // Insert some keys with different values and sums
    tree.update(b"alice", b"balance of alice", 100).unwrap();
    tree.update(b"bob", b"balance of bob", 200).unwrap();
    tree.update(b"carol", b"balance of carol", 300).unwrap();

    // The root is `hash ‖ sum`
    let root = tree.root();
    println!("Root: {}", hex::encode(&root));
    println!("Total sum: {}", tree.sum());

    // Prove that bob has 200
    let proof = tree.prove(b"bob").unwrap();
    println!("Proof length: {}", proof.side_nodes.len());
    let valid = verify_sum_proof(&proof, &root, b"bob", b"balance of bob", 200, tree.spec());
    println!("Membership proof verification: {:?}", valid);

    // Prove that dave isn't in the tree
    let proof = tree.prove(b"dave").unwrap();
    let valid = verify_sum_proof(&proof, &root, b"dave", DEFAULT_VALUE, 0, tree.spec());
    println!("Non-membership proof verification: {:?}", valid);

    // Deleting a key removes its sum from the root
    tree.delete(b"carol").unwrap();
    println!("Total sum after deleting carol: {}", tree.sum());

    // Nodes only reach the database on commit
    tree.commit().unwrap();
    println!("Saved root: {}", hex::encode(tree.saved_root()));
}
