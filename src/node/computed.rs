use std::fmt::Display;

use super::{Sum, SUM_SIZE};

/// A computed node, the `hash ‖ sum` pair every node is known by.
///
/// Its byte encoding is what parents hash, what proofs carry as side nodes and
/// what the database uses as the key of the node record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComputedNode<const HASH_SIZE: usize> {
    node_hash: [u8; HASH_SIZE],
    sum: Sum,
}

impl<const HASH_SIZE: usize> ComputedNode<HASH_SIZE> {
    /// Size in bytes of the encoded form.
    pub const ENCODED_SIZE: usize = HASH_SIZE + SUM_SIZE;

    pub fn new(node_hash: [u8; HASH_SIZE], sum: Sum) -> Self {
        Self { node_hash, sum }
    }

    /// The placeholder of an empty subtree: all zero hash and sum `0`.
    pub const fn placeholder() -> Self {
        Self {
            node_hash: [0; HASH_SIZE],
            sum: 0,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        *self == Self::placeholder()
    }

    /// Returns the hash of the node.
    pub fn hash(&self) -> [u8; HASH_SIZE] {
        self.node_hash
    }

    /// Returns the sum of the node.
    pub fn sum(&self) -> Sum {
        self.sum
    }

    /// Encodes as `hash ‖ sum` with the sum in big endian.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::ENCODED_SIZE);
        bytes.extend_from_slice(&self.node_hash);
        bytes.extend_from_slice(&self.sum.to_be_bytes());
        bytes
    }

    /// Decodes a `hash ‖ sum` encoding. Returns `None` if the length is wrong.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::ENCODED_SIZE {
            return None;
        }
        let (hash, sum) = bytes.split_at(HASH_SIZE);
        Some(Self {
            node_hash: hash.try_into().ok()?,
            sum: Sum::from_be_bytes(sum.try_into().ok()?),
        })
    }
}

impl<const HASH_SIZE: usize> Display for ComputedNode<HASH_SIZE> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Computed {{ sum: {}, hash: {} }}",
            self.sum(),
            hex::encode(self.hash().as_slice())
        )
    }
}
