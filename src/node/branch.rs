use std::fmt::Display;
use std::sync::Arc;

use super::{digest_branch, read_computed, ComputedNode, Hasher, Node, Sum, BRANCH_TAG};
use crate::error::SumOverflow;

/// A branch is a node that has exactly 2 children.
/// It holds the sum of all its descendants next to its hash, the sum is never
/// folded into the hash itself.
#[derive(Clone)]
pub struct Branch<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> {
    left: Arc<Node<HASH_SIZE, H>>,
    right: Arc<Node<HASH_SIZE, H>>,
    computed: ComputedNode<HASH_SIZE>,
    persisted: bool,
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> Branch<HASH_SIZE, H> {
    /// Creates a new [`Branch`]. This function performs a hash and an addition.
    pub fn new(
        left: Arc<Node<HASH_SIZE, H>>,
        right: Arc<Node<HASH_SIZE, H>>,
    ) -> Result<Self, SumOverflow> {
        let (left_computed, right_computed) = (left.computed(), right.computed());
        let sum = left_computed
            .sum()
            .checked_add(right_computed.sum())
            .ok_or(SumOverflow)?;
        let (computed, _) = digest_branch::<HASH_SIZE, H>(&left_computed, &right_computed, sum);
        Ok(Self {
            left,
            right,
            computed,
            persisted: false,
        })
    }

    /// Creates a branch ordering `child` and `sibling` from the bit taken by `child`.
    pub fn from_ordered(
        child_is_right: bool,
        child: Arc<Node<HASH_SIZE, H>>,
        sibling: Arc<Node<HASH_SIZE, H>>,
    ) -> Result<Self, SumOverflow> {
        if child_is_right {
            Self::new(sibling, child)
        } else {
            Self::new(child, sibling)
        }
    }

    /// Returns the hash of the node. NO HASHING IS DONE HERE.
    pub fn hash(&self) -> [u8; HASH_SIZE] {
        self.computed.hash()
    }

    pub fn sum(&self) -> Sum {
        self.computed.sum()
    }

    pub fn computed(&self) -> ComputedNode<HASH_SIZE> {
        self.computed
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Returns the left and right children of this branch.
    pub fn children(&self) -> (&Arc<Node<HASH_SIZE, H>>, &Arc<Node<HASH_SIZE, H>>) {
        (&self.left, &self.right)
    }

    /// Returns `(next, sibling)` for a step in the direction of `is_right`.
    pub fn step(&self, is_right: bool) -> (&Arc<Node<HASH_SIZE, H>>, &Arc<Node<HASH_SIZE, H>>) {
        if is_right {
            (&self.right, &self.left)
        } else {
            (&self.left, &self.right)
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        super::encode_branch(&self.left.computed(), &self.right.computed())
    }

    pub(crate) fn parse(record: &[u8]) -> Result<Self, &'static str> {
        let encoded_size = ComputedNode::<HASH_SIZE>::ENCODED_SIZE;
        if record.len() != 1 + 2 * encoded_size || record[0] != BRANCH_TAG {
            return Err("invalid branch record");
        }
        let left = read_computed::<HASH_SIZE>(record, 1).ok_or("invalid left child")?;
        let right =
            read_computed::<HASH_SIZE>(record, 1 + encoded_size).ok_or("invalid right child")?;
        let mut branch = Self::new(Node::from_encoding(left), Node::from_encoding(right))
            .map_err(|_| "branch sum overflow")?;
        branch.persisted = true;
        Ok(branch)
    }
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone> Display for Branch<HASH_SIZE, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Branch {{ sum: {}, hash: {} }}",
            self.sum(),
            hex::encode(self.hash().as_slice())
        )
    }
}
