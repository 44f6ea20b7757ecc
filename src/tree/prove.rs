use std::iter;
use std::sync::Arc;

use super::{not_loaded, SMST};
use crate::{
    node::{Hasher, Node, Sum, DEFAULT_VALUE},
    path::get_path_bit,
    proof::SparseMerkleSumProof,
    TreeError,
};

/// Result of [`SMST::prove_closest`].
///
/// `path` and `value_hash` are already digests, the proof verifies against
/// them with a [`crate::TreeSpec::no_prehash`] spec.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClosestProof {
    pub path: Vec<u8>,
    pub value_hash: Vec<u8>,
    pub sum: Sum,
    pub proof: SparseMerkleSumProof,
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone, DbError> SMST<HASH_SIZE, H, DbError> {
    /// Creates a proof of membership of `key` if it is in the tree, of
    /// non-membership otherwise.
    pub fn prove(&self, key: &[u8]) -> Result<SparseMerkleSumProof, TreeError<DbError>> {
        let path = self.path_of(key)?;
        let placeholder = Arc::new(Node::Placeholder);
        let mut side_nodes = Vec::new();
        let mut depth = 0;
        let mut node = self.resolve(&self.root)?;
        let terminal = loop {
            node = match node.as_ref() {
                Node::Placeholder | Node::Leaf(_) => break node.clone(),
                Node::Stored(computed) => return Err(not_loaded(computed)),
                Node::Branch(branch) => {
                    let (next, sibling) = branch.step(get_path_bit(&path, depth));
                    side_nodes.push(sibling.clone());
                    depth += 1;
                    self.resolve(next)?
                }
                Node::Extension(extension) => match extension.divergence(&path) {
                    None => {
                        side_nodes.extend(iter::repeat(placeholder.clone()).take(extension.len()));
                        depth = extension.end();
                        self.resolve(extension.child())?
                    }
                    Some(split) => {
                        // the path leaves the run at `split`, its side of that branch is empty
                        side_nodes.extend(
                            iter::repeat(placeholder.clone()).take(split - extension.start()),
                        );
                        side_nodes.push(extension.below(split));
                        break placeholder.clone();
                    }
                },
            };
        };
        let non_membership_leaf_data = match terminal.as_ref() {
            Node::Leaf(leaf) if leaf.path() != &path => Some(leaf.serialize()),
            _ => None,
        };
        self.finish_proof(side_nodes, non_membership_leaf_data)
    }

    /// Finds the leaf reached by following `path` through the tree and proves
    /// its membership.
    ///
    /// Where `path` points to an empty subtree the walk takes the other side,
    /// and extensions are followed whatever the bits of `path` are, so a leaf
    /// is always found unless the tree is empty.
    pub fn prove_closest(&self, path: &[u8]) -> Result<ClosestProof, TreeError<DbError>> {
        let path: [u8; HASH_SIZE] = path.try_into().map_err(|_| TreeError::InvalidKeyLength {
            expected: HASH_SIZE,
            got: path.len(),
        })?;
        let placeholder = Arc::new(Node::Placeholder);
        let mut side_nodes = Vec::new();
        let mut depth = 0;
        let mut node = self.resolve(&self.root)?;
        let terminal = loop {
            node = match node.as_ref() {
                Node::Placeholder | Node::Leaf(_) => break node.clone(),
                Node::Stored(computed) => return Err(not_loaded(computed)),
                Node::Branch(branch) => {
                    let (mut next, mut sibling) = branch.step(get_path_bit(&path, depth));
                    if next.is_placeholder() {
                        (next, sibling) = (sibling, next);
                    }
                    side_nodes.push(sibling.clone());
                    depth += 1;
                    self.resolve(next)?
                }
                Node::Extension(extension) => {
                    side_nodes.extend(iter::repeat(placeholder.clone()).take(extension.len()));
                    depth = extension.end();
                    self.resolve(extension.child())?
                }
            };
        };
        let (path, value_hash, sum) = match terminal.as_ref() {
            Node::Leaf(leaf) => (leaf.path().to_vec(), leaf.value_hash().to_vec(), leaf.sum()),
            _ => (Vec::new(), DEFAULT_VALUE.to_vec(), 0),
        };
        let proof = self.finish_proof(side_nodes, None)?;
        Ok(ClosestProof {
            path,
            value_hash,
            sum,
            proof,
        })
    }

    /// Builds a proof from the siblings met on the way down, root first.
    fn finish_proof(
        &self,
        mut side_nodes: Vec<Arc<Node<HASH_SIZE, H>>>,
        non_membership_leaf_data: Option<Vec<u8>>,
    ) -> Result<SparseMerkleSumProof, TreeError<DbError>> {
        // the deepest sibling goes along with its record
        let sibling_data = match side_nodes.last() {
            Some(sibling) if !sibling.is_placeholder() => self.resolve(sibling)?.serialize(),
            _ => None,
        };
        side_nodes.reverse();
        Ok(SparseMerkleSumProof {
            side_nodes: side_nodes
                .iter()
                .map(|node| node.computed().to_bytes())
                .collect(),
            non_membership_leaf_data,
            sibling_data,
        })
    }
}
