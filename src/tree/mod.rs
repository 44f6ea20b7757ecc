//! Sparse merkle sum tree implementation
//!
//! The tree keeps an in-memory view of the nodes touched since the last
//! commit. Everything else stays in the database and is loaded on demand
//! through the `hash ‖ sum` encoding of the node, which is also its key in the
//! database.

mod mutate;
mod prove;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument, trace, warn};

pub use prove::ClosestProof;

use crate::{
    db::Db,
    node::{ComputedNode, Hasher, Node, Sum, DEFAULT_VALUE},
    path::get_path_bit,
    spec::TreeSpec,
    TreeError,
};

/// Sparse merkle sum tree.
/// * `HASH_SIZE` - size of the hash digest in bytes.
/// * `H` - Hasher that will be used to hash nodes.
/// * `DbError` - Error type of the database holding the nodes.
pub struct SMST<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone, DbError> {
    db: Box<dyn Db<DbError = DbError>>,
    spec: TreeSpec<HASH_SIZE, H>,
    root: Arc<Node<HASH_SIZE, H>>,
    saved_root: ComputedNode<HASH_SIZE>,
    /// Persisted nodes replaced since the last commit.
    orphans: Vec<ComputedNode<HASH_SIZE>>,
    /// Nodes left out of the saved root that are still in the database.
    dead: Vec<ComputedNode<HASH_SIZE>>,
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone, DbError> SMST<HASH_SIZE, H, DbError> {
    /// Creates a new empty tree.
    pub fn new(db: Box<dyn Db<DbError = DbError>>, spec: TreeSpec<HASH_SIZE, H>) -> Self {
        Self {
            db,
            spec,
            root: Arc::new(Node::Placeholder),
            saved_root: ComputedNode::placeholder(),
            orphans: Vec::new(),
            dead: Vec::new(),
        }
    }

    /// Reopens a tree previously committed to `db` with the root `root`.
    pub fn import(
        db: Box<dyn Db<DbError = DbError>>,
        spec: TreeSpec<HASH_SIZE, H>,
        root: &[u8],
    ) -> Result<Self, TreeError<DbError>> {
        let saved_root = ComputedNode::from_bytes(root).ok_or(TreeError::InvalidRoot {
            expected: ComputedNode::<HASH_SIZE>::ENCODED_SIZE,
            got: root.len(),
        })?;
        Ok(Self {
            db,
            spec,
            root: Node::from_encoding(saved_root),
            saved_root,
            orphans: Vec::new(),
            dead: Vec::new(),
        })
    }

    pub fn db(&self) -> &dyn Db<DbError = DbError> {
        self.db.as_ref()
    }

    pub fn spec(&self) -> &TreeSpec<HASH_SIZE, H> {
        &self.spec
    }

    /// Max height of the tree
    pub const fn max_height() -> usize {
        HASH_SIZE * 8
    }

    /// Root of the tree, `hash ‖ sum`.
    pub fn root(&self) -> Vec<u8> {
        self.root.computed().to_bytes()
    }

    /// Sum of all the leaves of the tree.
    pub fn sum(&self) -> Sum {
        self.root.sum()
    }

    /// Root of the tree as of the last commit.
    pub fn saved_root(&self) -> Vec<u8> {
        self.saved_root.to_bytes()
    }

    /// Number of stored nodes that the next commit will delete.
    pub fn pending_orphans(&self) -> usize {
        self.orphans.len() + self.dead.len()
    }

    /// Returns the value digest and the sum stored for `key`, or
    /// `(DEFAULT_VALUE, 0)` if the key isn't in the tree.
    pub fn get(&self, key: &[u8]) -> Result<(Vec<u8>, Sum), TreeError<DbError>> {
        let path = self.path_of(key)?;
        let mut depth = 0;
        let mut node = self.resolve(&self.root)?;
        loop {
            node = match &*node {
                Node::Leaf(leaf) if leaf.path() == &path => {
                    return Ok((leaf.value_hash().to_vec(), leaf.sum()))
                }
                Node::Placeholder | Node::Leaf(_) => return Ok((DEFAULT_VALUE.to_vec(), 0)),
                Node::Stored(computed) => return Err(not_loaded(computed)),
                Node::Branch(branch) => {
                    let (next, _) = branch.step(get_path_bit(&path, depth));
                    depth += 1;
                    self.resolve(next)?
                }
                Node::Extension(extension) => {
                    if !extension.matches(&path) {
                        return Ok((DEFAULT_VALUE.to_vec(), 0));
                    }
                    depth = extension.end();
                    self.resolve(extension.child())?
                }
            };
        }
    }

    /// Returns true if `key` is in the tree.
    pub fn has(&self, key: &[u8]) -> Result<bool, TreeError<DbError>> {
        let (value_hash, _) = self.get(key)?;
        Ok(value_hash != DEFAULT_VALUE)
    }

    /// Writes every node created since the last commit to the database and
    /// deletes the nodes they replaced.
    ///
    /// The new root is saved once all its nodes are written. If writing fails
    /// the tree is left as it was before the call, so the commit can be
    /// retried or the changes discarded. If deleting a replaced node fails,
    /// the root is already saved and the nodes still to delete are kept for
    /// the next commit.
    #[instrument(level = "debug", skip_all)]
    pub fn commit(&mut self) -> Result<(), TreeError<DbError>> {
        self.save()?;
        self.delete_dead()
    }

    /// Writes the new nodes and makes the working root the saved root.
    pub(crate) fn save(&mut self) -> Result<(), TreeError<DbError>> {
        let mut saved = HashSet::new();
        Self::persist(self.db.as_mut(), &self.root, &mut saved)?;
        self.saved_root = self.root.computed();
        self.root = Node::from_encoding(self.saved_root);
        self.dead.append(&mut self.orphans);
        // a node written again by this commit is live
        self.dead.retain(|node| !saved.contains(node));
        debug!(
            written = saved.len(),
            root = %hex::encode(self.saved_root.to_bytes()),
            "saved tree"
        );
        Ok(())
    }

    /// Deletes the nodes left out of the saved root, one at a time.
    pub(crate) fn delete_dead(&mut self) -> Result<(), TreeError<DbError>> {
        let mut deleted = 0;
        while let Some(node) = self.dead.last() {
            let key = node.to_bytes();
            if let Err(err) = self.db.delete(&key) {
                warn!(
                    node = %hex::encode(&key),
                    left = self.dead.len(),
                    "failed to delete a replaced node"
                );
                return Err(TreeError::DbError(err));
            }
            self.dead.pop();
            deleted += 1;
        }
        debug!(deleted, "deleted replaced nodes");
        Ok(())
    }

    /// Drops every change made since the last commit.
    pub fn discard(&mut self) {
        trace!(orphans = self.orphans.len(), "discarding changes");
        self.root = Node::from_encoding(self.saved_root);
        self.orphans.clear();
    }

    /// Stops the database of the tree.
    pub fn stop(&mut self) -> Result<(), TreeError<DbError>> {
        self.db.stop().map_err(TreeError::DbError)
    }

    fn persist(
        db: &mut dyn Db<DbError = DbError>,
        node: &Node<HASH_SIZE, H>,
        saved: &mut HashSet<ComputedNode<HASH_SIZE>>,
    ) -> Result<(), TreeError<DbError>> {
        if node.is_placeholder() || node.is_persisted() {
            return Ok(());
        }
        match node {
            Node::Branch(branch) => {
                let (left, right) = branch.children();
                Self::persist(db, left, saved)?;
                Self::persist(db, right, saved)?;
            }
            Node::Extension(extension) => Self::persist(db, extension.child(), saved)?,
            _ => {}
        }
        if let Some(record) = node.serialize() {
            let computed = node.computed();
            db.set(&computed.to_bytes(), &record)
                .map_err(TreeError::DbError)?;
            saved.insert(computed);
        }
        Ok(())
    }

    /// Loads a stored node from the database. Any other node is returned as is.
    pub(crate) fn resolve(
        &self,
        node: &Arc<Node<HASH_SIZE, H>>,
    ) -> Result<Arc<Node<HASH_SIZE, H>>, TreeError<DbError>> {
        let Node::Stored(computed) = node.as_ref() else {
            return Ok(node.clone());
        };
        let key = computed.to_bytes();
        trace!(node = %hex::encode(&key), "loading node");
        let record = self
            .db
            .get(&key)
            .map_err(TreeError::DbError)?
            .ok_or_else(|| TreeError::NodeNotFound(hex::encode(&key)))?;
        let loaded = Node::parse(&record).map_err(|err| {
            warn!(node = %hex::encode(&key), err, "malformed node record");
            TreeError::CorruptedNode(format!("{}: {}", hex::encode(&key), err))
        })?;
        if loaded.computed() != *computed {
            warn!(node = %hex::encode(&key), "node record doesn't match its key");
            return Err(TreeError::CorruptedNode(format!(
                "{}: record hashes to {}",
                hex::encode(&key),
                hex::encode(loaded.computed().to_bytes())
            )));
        }
        Ok(Arc::new(loaded))
    }

    pub(crate) fn path_of(&self, key: &[u8]) -> Result<[u8; HASH_SIZE], TreeError<DbError>> {
        self.spec.path(key).ok_or(TreeError::InvalidKeyLength {
            expected: HASH_SIZE,
            got: key.len(),
        })
    }
}

/// Error for a node that should have been loaded from the database.
pub(crate) fn not_loaded<const HASH_SIZE: usize, DbError>(
    computed: &ComputedNode<HASH_SIZE>,
) -> TreeError<DbError> {
    TreeError::NodeNotFound(hex::encode(computed.to_bytes()))
}

#[cfg(test)]
mod test {
    use std::convert::Infallible;

    use super::SMST;
    use crate::{node::DEFAULT_VALUE, Db, MemoryDb, TreeError, TreeSpec};
    use sha2::Sha256;

    fn new_tree() -> SMST<32, Sha256, Infallible> {
        SMST::new(Box::new(MemoryDb::new()), TreeSpec::new())
    }

    #[test]
    fn test_smst_new() {
        let tree = new_tree();
        assert_eq!(tree.root(), vec![0; 40]);
        assert_eq!(tree.sum(), 0);
        assert_eq!(tree.saved_root(), vec![0; 40]);
        assert_eq!(SMST::<32, Sha256, Infallible>::max_height(), 256);
    }

    #[test]
    fn test_get_absent_key() {
        let tree = new_tree();
        assert_eq!(tree.get(b"missing").unwrap(), (DEFAULT_VALUE.to_vec(), 0));
        assert!(!tree.has(b"missing").unwrap());
    }

    #[test]
    fn test_commit_writes_nodes() {
        let mut tree = new_tree();
        tree.update(b"a", b"1", 1).unwrap();
        tree.update(b"b", b"2", 2).unwrap();
        let root = tree.root();
        tree.commit().unwrap();
        assert_eq!(tree.root(), root);
        assert_eq!(tree.saved_root(), root);
        assert!(tree.db().get(&root).unwrap().is_some());
        assert_eq!(tree.get(b"a").unwrap().1, 1);
    }

    #[test]
    fn test_discard() {
        let mut tree = new_tree();
        tree.update(b"a", b"1", 1).unwrap();
        tree.commit().unwrap();
        let root = tree.root();
        tree.update(b"b", b"2", 2).unwrap();
        tree.delete(b"a").unwrap();
        assert_ne!(tree.root(), root);
        tree.discard();
        assert_eq!(tree.root(), root);
        assert_eq!(tree.pending_orphans(), 0);
        assert_eq!(tree.get(b"a").unwrap().1, 1);
        assert!(!tree.has(b"b").unwrap());
    }

    #[test]
    fn test_import_bad_root() {
        let result = SMST::<32, Sha256, Infallible>::import(
            Box::new(MemoryDb::new()),
            TreeSpec::new(),
            &[0; 12],
        );
        assert_eq!(
            result.err(),
            Some(TreeError::InvalidRoot {
                expected: 40,
                got: 12
            })
        );
    }

    #[test]
    fn test_import_missing_root() {
        let tree = SMST::<32, Sha256, Infallible>::import(
            Box::new(MemoryDb::new()),
            TreeSpec::new(),
            &[1; 40],
        )
        .unwrap();
        assert_eq!(
            tree.get(b"a").unwrap_err(),
            TreeError::NodeNotFound(hex::encode([1; 40]))
        );
    }
}
