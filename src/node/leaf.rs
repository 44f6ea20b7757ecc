use std::{fmt::Display, marker::PhantomData};

use super::{encode_leaf, ComputedNode, Hasher, Sum, LEAF_TAG, SUM_SIZE};

/// A Leaf is a node that has no children and simply holds information.
/// Each leaf stores the full `path` it was inserted under, the digest of its
/// value and a `sum` which is an integer.
///
/// Since the path is part of the record, a leaf hashes the same at any depth
/// and can be moved up the tree when its neighbours are deleted.
#[derive(Clone)]
pub struct Leaf<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> {
    path: [u8; HASH_SIZE],
    value_hash: Vec<u8>,
    sum: Sum,
    computed: ComputedNode<HASH_SIZE>,
    persisted: bool,
    _phantom: PhantomData<H>,
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> Leaf<HASH_SIZE, H> {
    /// Creates a new [`Leaf`]. This function performs a hash.
    pub fn new(path: [u8; HASH_SIZE], value_hash: Vec<u8>, sum: Sum) -> Self {
        let node_hash = H::hash(&encode_leaf(&path, &value_hash, sum));
        Self {
            path,
            value_hash,
            sum,
            computed: ComputedNode::new(node_hash, sum),
            persisted: false,
            _phantom: PhantomData,
        }
    }

    /// Returns the hash of the node. NO HASHING IS DONE HERE.
    pub fn hash(&self) -> [u8; HASH_SIZE] {
        self.computed.hash()
    }

    /// Returns the sum of the node.
    pub fn sum(&self) -> Sum {
        self.sum
    }

    pub fn computed(&self) -> ComputedNode<HASH_SIZE> {
        self.computed
    }

    pub fn path(&self) -> &[u8; HASH_SIZE] {
        &self.path
    }

    /// Returns the value digest stored in the leaf.
    pub fn value_hash(&self) -> &[u8] {
        &self.value_hash
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn serialize(&self) -> Vec<u8> {
        encode_leaf(&self.path, &self.value_hash, self.sum)
    }

    pub(crate) fn parse(record: &[u8]) -> Result<Self, &'static str> {
        if record.len() < 1 + HASH_SIZE + SUM_SIZE {
            return Err("leaf record too short");
        }
        if record[0] != LEAF_TAG {
            return Err("not a leaf record");
        }
        let sum_start = record.len() - SUM_SIZE;
        let path = record[1..1 + HASH_SIZE]
            .try_into()
            .map_err(|_| "invalid leaf path")?;
        let sum = Sum::from_be_bytes(
            record[sum_start..]
                .try_into()
                .map_err(|_| "invalid leaf sum")?,
        );
        let mut leaf = Self::new(path, record[1 + HASH_SIZE..sum_start].to_vec(), sum);
        leaf.persisted = true;
        Ok(leaf)
    }
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> Display for Leaf<HASH_SIZE, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Leaf {{ sum: {}, hash: {}, path: {} }}",
            self.sum(),
            hex::encode(self.hash().as_slice()),
            hex::encode(self.path.as_slice())
        )
    }
}
