//! Tree configuration and the digest rules shared by the tree and the proof
//! verifier.

use std::fmt::Debug;
use std::marker::PhantomData;

use crate::{
    error::{ProofError, SumOverflow},
    node::{digest_branch, encode_leaf, ComputedNode, Hasher, Node, Sum},
};

/// How keys are turned into paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathHasher {
    /// The path is the digest of the key.
    #[default]
    Digest,
    /// The key is already a path and must be `HASH_SIZE` bytes long.
    Identity,
}

/// How values are turned into the digest stored in the leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueHasher {
    /// The leaf stores the digest of the value.
    #[default]
    Digest,
    /// The leaf stores the value itself.
    Identity,
}

/// Parameters of a tree: the hasher `H` and how keys and values are prehashed.
///
/// A proof is only meaningful with the spec of the tree that produced it.
pub struct TreeSpec<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> {
    path_hasher: PathHasher,
    value_hasher: ValueHasher,
    _phantom: PhantomData<H>,
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> Clone for TreeSpec<HASH_SIZE, H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> Copy for TreeSpec<HASH_SIZE, H> {}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> Debug for TreeSpec<HASH_SIZE, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeSpec")
            .field("hash_size", &HASH_SIZE)
            .field("path_hasher", &self.path_hasher)
            .field("value_hasher", &self.value_hasher)
            .finish()
    }
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> Default for TreeSpec<HASH_SIZE, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> TreeSpec<HASH_SIZE, H> {
    /// Hashes both keys and values.
    pub fn new() -> Self {
        Self {
            path_hasher: PathHasher::Digest,
            value_hasher: ValueHasher::Digest,
            _phantom: PhantomData,
        }
    }

    /// Neither keys nor values are hashed. This is the spec used to check the
    /// result of a closest key query, which returns paths and value digests.
    pub fn no_prehash() -> Self {
        Self::new()
            .with_path_hasher(PathHasher::Identity)
            .with_value_hasher(ValueHasher::Identity)
    }

    pub fn with_path_hasher(mut self, path_hasher: PathHasher) -> Self {
        self.path_hasher = path_hasher;
        self
    }

    pub fn with_value_hasher(mut self, value_hasher: ValueHasher) -> Self {
        self.value_hasher = value_hasher;
        self
    }

    pub fn path_hasher(&self) -> PathHasher {
        self.path_hasher
    }

    pub fn value_hasher(&self) -> ValueHasher {
        self.value_hasher
    }

    /// Number of bits of a path, which is also the maximum depth of the tree.
    pub const fn max_height() -> usize {
        HASH_SIZE * 8
    }

    /// Returns the path of `key`, or `None` if `key` can't be used as a path.
    pub fn path(&self, key: &[u8]) -> Option<[u8; HASH_SIZE]> {
        match self.path_hasher {
            PathHasher::Digest => Some(H::hash(key)),
            PathHasher::Identity => key.try_into().ok(),
        }
    }

    /// Returns the digest stored in a leaf for `value`.
    pub fn digest_value(&self, value: &[u8]) -> Vec<u8> {
        match self.value_hasher {
            ValueHasher::Digest => H::hash(value).to_vec(),
            ValueHasher::Identity => value.to_vec(),
        }
    }

    /// Hashes a leaf. Returns its encoding and its record.
    pub fn digest_sum_leaf(
        &self,
        path: &[u8],
        value_hash: &[u8],
        sum: Sum,
    ) -> (ComputedNode<HASH_SIZE>, Vec<u8>) {
        let record = encode_leaf(path, value_hash, sum);
        (ComputedNode::new(H::hash(&record), sum), record)
    }

    /// Hashes a branch from the encodings of its children. Returns its encoding
    /// and its record.
    pub fn digest_sum_node(
        &self,
        left: &[u8],
        right: &[u8],
    ) -> Result<(ComputedNode<HASH_SIZE>, Vec<u8>), ProofError> {
        let left = ComputedNode::<HASH_SIZE>::from_bytes(left).ok_or(ProofError::BadProof)?;
        let right = ComputedNode::<HASH_SIZE>::from_bytes(right).ok_or(ProofError::BadProof)?;
        let sum = left
            .sum()
            .checked_add(right.sum())
            .ok_or(SumOverflow)?;
        Ok(digest_branch::<HASH_SIZE, H>(&left, &right, sum))
    }

    /// Encoding of an empty subtree.
    pub fn sum_placeholder(&self) -> Vec<u8> {
        ComputedNode::<HASH_SIZE>::placeholder().to_bytes()
    }

    /// Returns the encoding of a node record of any kind.
    pub fn hash_serialization(&self, record: &[u8]) -> Result<Vec<u8>, ProofError> {
        Node::<HASH_SIZE, H>::parse(record)
            .map(|node| node.computed().to_bytes())
            .map_err(|_| ProofError::BadProof)
    }
}

#[cfg(test)]
mod test {
    use super::{PathHasher, TreeSpec, ValueHasher};
    use crate::error::ProofError;
    use crate::node::{Hasher, Leaf};
    use sha2::Sha256;

    #[test]
    fn test_path_hashers() {
        let spec = TreeSpec::<32, Sha256>::new();
        assert_eq!(spec.path(b"key"), Some(Sha256::hash(b"key")));
        let spec = spec.with_path_hasher(PathHasher::Identity);
        assert_eq!(spec.path(b"key"), None);
        assert_eq!(spec.path(&[3; 32]), Some([3; 32]));
    }

    #[test]
    fn test_value_hashers() {
        let spec = TreeSpec::<32, Sha256>::new();
        assert_eq!(spec.digest_value(b"value"), Sha256::hash(b"value").to_vec());
        let spec = spec.with_value_hasher(ValueHasher::Identity);
        assert_eq!(spec.digest_value(b"value"), b"value".to_vec());
        assert!(spec.digest_value(b"").is_empty());
    }

    #[test]
    fn test_digest_sum_leaf_matches_leaf_node() {
        let spec = TreeSpec::<32, Sha256>::new();
        let (computed, record) = spec.digest_sum_leaf(&[5; 32], &[1, 2], 9);
        let leaf = Leaf::<32, Sha256>::new([5; 32], vec![1, 2], 9);
        assert_eq!(computed, leaf.computed());
        assert_eq!(record, leaf.serialize());
        assert_eq!(spec.hash_serialization(&record).unwrap(), computed.to_bytes());
    }

    #[test]
    fn test_digest_sum_node() {
        let spec = TreeSpec::<32, Sha256>::new();
        let (left, _) = spec.digest_sum_leaf(&[1; 32], &[1], 3);
        let (right, _) = spec.digest_sum_leaf(&[2; 32], &[2], 4);
        let (node, record) = spec
            .digest_sum_node(&left.to_bytes(), &right.to_bytes())
            .unwrap();
        assert_eq!(node.sum(), 7);
        assert_eq!(node.hash(), Sha256::hash(&record));
        assert_eq!(record[0], 1);
        assert_eq!(spec.hash_serialization(&record).unwrap(), node.to_bytes());
    }

    #[test]
    fn test_digest_sum_node_errors() {
        let spec = TreeSpec::<32, Sha256>::new();
        let placeholder = spec.sum_placeholder();
        assert_eq!(
            spec.digest_sum_node(&placeholder[1..], &placeholder).unwrap_err(),
            ProofError::BadProof
        );
        let (big, _) = spec.digest_sum_leaf(&[1; 32], &[1], u64::MAX);
        let (one, _) = spec.digest_sum_leaf(&[2; 32], &[1], 1);
        assert_eq!(
            spec.digest_sum_node(&big.to_bytes(), &one.to_bytes())
                .unwrap_err(),
            ProofError::SumOverflow
        );
    }

    #[test]
    fn test_sum_placeholder() {
        let spec = TreeSpec::<32, Sha256>::no_prehash();
        assert_eq!(spec.sum_placeholder(), vec![0; 40]);
        assert_eq!(TreeSpec::<32, Sha256>::max_height(), 256);
        assert_eq!(
            spec.hash_serialization(&[9, 9, 9]).unwrap_err(),
            ProofError::BadProof
        );
    }
}
