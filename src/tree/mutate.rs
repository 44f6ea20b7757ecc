//! Insertion and deletion.
//!
//! Both operations rebuild the nodes on the way from the root to the leaf and
//! share everything else with the previous version of the tree. The tree is
//! only touched once the new root has been built, so a failed operation leaves
//! it unchanged.

use std::sync::Arc;

use tracing::trace;

use super::{not_loaded, SMST};
use crate::{
    node::{Branch, ComputedNode, Extension, Hasher, Leaf, Node, Sum},
    path::{first_diff_bit, get_path_bit, set_path_bit},
    TreeError,
};

type NodeRef<const HASH_SIZE: usize, H> = Arc<Node<HASH_SIZE, H>>;

/// Puts `child` below an extension covering `[start, end)` of `path`, unless
/// the run is empty.
fn extend<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone>(
    path: &[u8; HASH_SIZE],
    start: usize,
    end: usize,
    child: NodeRef<HASH_SIZE, H>,
) -> NodeRef<HASH_SIZE, H> {
    if start == end {
        child
    } else {
        Arc::new(Node::Extension(Extension::new(*path, start, end, child)))
    }
}

fn orphan<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone>(
    node: &Node<HASH_SIZE, H>,
    orphans: &mut Vec<ComputedNode<HASH_SIZE>>,
) {
    if node.is_persisted() {
        orphans.push(node.computed());
    }
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone, DbError> SMST<HASH_SIZE, H, DbError> {
    /// Sets the value and the sum of `key`.
    ///
    /// Updating a key with a value whose digest is empty deletes it, an empty
    /// digest is what [`SMST::get`] reports for absent keys.
    pub fn update(&mut self, key: &[u8], value: &[u8], sum: Sum) -> Result<(), TreeError<DbError>> {
        let path = self.path_of(key)?;
        let value_hash = self.spec.digest_value(value);
        if value_hash.is_empty() {
            return self.delete(key);
        }
        trace!(path = %hex::encode(path), sum, "update");
        let leaf = Arc::new(Node::Leaf(Leaf::new(path, value_hash, sum)));
        let mut orphans = Vec::new();
        let root = self.insert_at(&self.root, 0, &path, leaf, &mut orphans)?;
        self.root = root;
        self.orphans.extend(orphans);
        Ok(())
    }

    /// Removes `key` from the tree. Removing a key that isn't in the tree does
    /// nothing.
    pub fn delete(&mut self, key: &[u8]) -> Result<(), TreeError<DbError>> {
        let path = self.path_of(key)?;
        let mut orphans = Vec::new();
        match self.remove_at(&self.root, 0, &path, &mut orphans)? {
            Some(root) => {
                trace!(path = %hex::encode(path), "delete");
                self.root = root;
                self.orphans.extend(orphans);
            }
            None => trace!(path = %hex::encode(path), "delete of an absent key"),
        }
        Ok(())
    }

    fn insert_at(
        &self,
        node: &NodeRef<HASH_SIZE, H>,
        depth: usize,
        path: &[u8; HASH_SIZE],
        leaf: NodeRef<HASH_SIZE, H>,
        orphans: &mut Vec<ComputedNode<HASH_SIZE>>,
    ) -> Result<NodeRef<HASH_SIZE, H>, TreeError<DbError>> {
        let node = self.resolve(node)?;
        match node.as_ref() {
            Node::Placeholder => Ok(leaf),
            Node::Stored(computed) => Err(not_loaded(computed)),
            Node::Leaf(existing) if existing.path() == path => {
                orphan(&node, orphans);
                Ok(leaf)
            }
            Node::Leaf(existing) => {
                // both leaves now hang below a branch at the first bit they disagree on
                let split = first_diff_bit(existing.path(), path, depth);
                let branch = Branch::from_ordered(get_path_bit(path, split), leaf, node.clone())?;
                Ok(extend(path, depth, split, Arc::new(Node::Branch(branch))))
            }
            Node::Extension(extension) => {
                orphan(&node, orphans);
                match extension.divergence(path) {
                    None => {
                        let child =
                            self.insert_at(extension.child(), extension.end(), path, leaf, orphans)?;
                        Ok(Arc::new(Node::Extension(Extension::new(
                            *extension.path(),
                            extension.start(),
                            extension.end(),
                            child,
                        ))))
                    }
                    Some(split) => {
                        let branch = Branch::from_ordered(
                            get_path_bit(path, split),
                            leaf,
                            extension.below(split),
                        )?;
                        Ok(extend(
                            extension.path(),
                            extension.start(),
                            split,
                            Arc::new(Node::Branch(branch)),
                        ))
                    }
                }
            }
            Node::Branch(branch) => {
                orphan(&node, orphans);
                let is_right = get_path_bit(path, depth);
                let (next, sibling) = branch.step(is_right);
                let child = self.insert_at(next, depth + 1, path, leaf, orphans)?;
                Ok(Arc::new(Node::Branch(Branch::from_ordered(
                    is_right,
                    child,
                    sibling.clone(),
                )?)))
            }
        }
    }

    /// Returns the new subtree, or `None` if `path` isn't in it.
    fn remove_at(
        &self,
        node: &NodeRef<HASH_SIZE, H>,
        depth: usize,
        path: &[u8; HASH_SIZE],
        orphans: &mut Vec<ComputedNode<HASH_SIZE>>,
    ) -> Result<Option<NodeRef<HASH_SIZE, H>>, TreeError<DbError>> {
        let node = self.resolve(node)?;
        match node.as_ref() {
            Node::Placeholder => Ok(None),
            Node::Stored(computed) => Err(not_loaded(computed)),
            Node::Leaf(leaf) if leaf.path() == path => {
                orphan(&node, orphans);
                Ok(Some(Arc::new(Node::Placeholder)))
            }
            Node::Leaf(_) => Ok(None),
            Node::Branch(branch) => {
                let is_right = get_path_bit(path, depth);
                let (next, sibling) = branch.step(is_right);
                let Some(child) = self.remove_at(next, depth + 1, path, orphans)? else {
                    return Ok(None);
                };
                orphan(&node, orphans);
                if !child.is_placeholder() {
                    let branch = Branch::from_ordered(is_right, child, sibling.clone())?;
                    return Ok(Some(Arc::new(Node::Branch(branch))));
                }
                self.collapse(depth, !is_right, sibling, orphans).map(Some)
            }
            Node::Extension(extension) => {
                if !extension.matches(path) {
                    return Ok(None);
                }
                let Some(child) = self.remove_at(extension.child(), extension.end(), path, orphans)?
                else {
                    return Ok(None);
                };
                orphan(&node, orphans);
                Ok(Some(match child.as_ref() {
                    Node::Placeholder | Node::Leaf(_) => child.clone(),
                    Node::Extension(below) => {
                        orphan(&child, orphans);
                        let mut merged = *extension.path();
                        merged
                            .iter_mut()
                            .zip(below.path())
                            .for_each(|(byte, other)| *byte |= other);
                        Arc::new(Node::Extension(Extension::new(
                            merged,
                            extension.start(),
                            below.end(),
                            below.child().clone(),
                        )))
                    }
                    Node::Branch(_) => Arc::new(Node::Extension(Extension::new(
                        *extension.path(),
                        extension.start(),
                        extension.end(),
                        child.clone(),
                    ))),
                    Node::Stored(computed) => return Err(not_loaded(computed)),
                }))
            }
        }
    }

    /// Builds what replaces a branch at `depth` once only `sibling` is left in
    /// it. A leaf moves up, anything else gets an extension for the bit at
    /// `depth`.
    fn collapse(
        &self,
        depth: usize,
        sibling_is_right: bool,
        sibling: &NodeRef<HASH_SIZE, H>,
        orphans: &mut Vec<ComputedNode<HASH_SIZE>>,
    ) -> Result<NodeRef<HASH_SIZE, H>, TreeError<DbError>> {
        let sibling = self.resolve(sibling)?;
        let mut path = [0; HASH_SIZE];
        match sibling.as_ref() {
            Node::Leaf(_) => Ok(sibling.clone()),
            Node::Extension(extension) => {
                orphan(&sibling, orphans);
                path = *extension.path();
                if sibling_is_right {
                    set_path_bit(&mut path, depth);
                }
                Ok(Arc::new(Node::Extension(Extension::new(
                    path,
                    depth,
                    extension.end(),
                    extension.child().clone(),
                ))))
            }
            Node::Branch(_) => {
                if sibling_is_right {
                    set_path_bit(&mut path, depth);
                }
                Ok(Arc::new(Node::Extension(Extension::new(
                    path,
                    depth,
                    depth + 1,
                    sibling.clone(),
                ))))
            }
            Node::Placeholder => Err(TreeError::CorruptedNode(format!(
                "branch at depth {} has two empty children",
                depth
            ))),
            Node::Stored(computed) => Err(not_loaded(computed)),
        }
    }
}
