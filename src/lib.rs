//! Sparse Merkle Sum Tree implementation
//!
//! This crate provides a sparse merkle tree where every leaf carries a sum next
//! to its value. The root commits to both the key value mapping and the total
//! sum of the leaves, so membership, non-membership and sums can be verified
//! against the root alone.
//!
//! The tree supports:
//! - Compressed storage: runs of single child branches are stored as extensions
//! - Lazy loading of nodes through the `Db` trait
//! - Membership, non-membership and closest key proofs
//! - Compact proofs that leave out empty subtrees

mod db;
mod error;
mod node;
mod path;
mod proof;
mod spec;
mod storage;
mod tree;

pub use db::{Db, MemoryDb, ThreadSafe};
pub use error::{ProofError, SumOverflow, TreeError};
pub use node::{
    Branch, ComputedNode, Extension, Hasher, Leaf, Node, Sum, BRANCH_TAG, DEFAULT_VALUE,
    EXTENSION_TAG, LEAF_TAG, SUM_SIZE,
};
pub use path::{count_set_bits, flip_path_bit, get_path_bit, set_path_bit};
pub use proof::{
    compact_sum_proof, decompact_sum_proof, verify_compact_sum_proof, verify_sum_proof,
    verify_sum_proof_with_updates, ProofUpdate, SparseCompactMerkleSumProof,
    SparseMerkleSumProof,
};
pub use spec::{PathHasher, TreeSpec, ValueHasher};
pub use storage::SMSTWithStorage;
pub use tree::{ClosestProof, SMST};

#[cfg(test)]
mod tests;
