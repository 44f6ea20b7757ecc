//! A tree that also keeps the original values of its keys.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::{
    db::Db,
    node::{Hasher, Sum, SUM_SIZE},
    proof::SparseMerkleSumProof,
    spec::TreeSpec,
    tree::{ClosestProof, SMST},
    TreeError,
};

/// `value ‖ sum` of a key, `None` once the key is deleted.
type ValueChange = Option<Vec<u8>>;

/// [`SMST`] paired with a second database holding `value ‖ sum` for every key,
/// since the tree itself only stores value digests.
///
/// Value changes follow the tree changes: they are kept in memory until
/// [`SMSTWithStorage::commit`] and dropped by [`SMSTWithStorage::discard`].
pub struct SMSTWithStorage<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone, DbError> {
    tree: SMST<HASH_SIZE, H, DbError>,
    preimages: Box<dyn Db<DbError = DbError>>,
    /// Value changes since the last commit.
    pending: HashMap<Vec<u8>, ValueChange>,
    /// Value changes of a saved root that are not in `preimages` yet.
    unwritten: HashMap<Vec<u8>, ValueChange>,
}

impl<const HASH_SIZE: usize, H: Hasher<HASH_SIZE> + Clone, DbError>
    SMSTWithStorage<HASH_SIZE, H, DbError>
{
    pub fn new(
        nodes: Box<dyn Db<DbError = DbError>>,
        preimages: Box<dyn Db<DbError = DbError>>,
        spec: TreeSpec<HASH_SIZE, H>,
    ) -> Self {
        Self {
            tree: SMST::new(nodes, spec),
            preimages,
            pending: HashMap::new(),
            unwritten: HashMap::new(),
        }
    }

    /// Reopens a committed tree whose values are in `preimages`.
    pub fn import(
        nodes: Box<dyn Db<DbError = DbError>>,
        preimages: Box<dyn Db<DbError = DbError>>,
        spec: TreeSpec<HASH_SIZE, H>,
        root: &[u8],
    ) -> Result<Self, TreeError<DbError>> {
        Ok(Self {
            tree: SMST::import(nodes, spec, root)?,
            preimages,
            pending: HashMap::new(),
            unwritten: HashMap::new(),
        })
    }

    pub fn tree(&self) -> &SMST<HASH_SIZE, H, DbError> {
        &self.tree
    }

    pub fn spec(&self) -> &TreeSpec<HASH_SIZE, H> {
        self.tree.spec()
    }

    pub fn root(&self) -> Vec<u8> {
        self.tree.root()
    }

    pub fn sum(&self) -> Sum {
        self.tree.sum()
    }

    pub fn saved_root(&self) -> Vec<u8> {
        self.tree.saved_root()
    }

    pub fn update(&mut self, key: &[u8], value: &[u8], sum: Sum) -> Result<(), TreeError<DbError>> {
        if self.tree.spec().digest_value(value).is_empty() {
            return self.delete(key);
        }
        self.tree.update(key, value, sum)?;
        let mut record = Vec::with_capacity(value.len() + SUM_SIZE);
        record.extend_from_slice(value);
        record.extend_from_slice(&sum.to_be_bytes());
        self.pending.insert(key.to_vec(), Some(record));
        Ok(())
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<(), TreeError<DbError>> {
        self.tree.delete(key)?;
        self.pending.insert(key.to_vec(), None);
        Ok(())
    }

    /// Returns the value digest and the sum of `key` as the tree has them.
    pub fn get(&self, key: &[u8]) -> Result<(Vec<u8>, Sum), TreeError<DbError>> {
        self.tree.get(key)
    }

    pub fn has(&self, key: &[u8]) -> Result<bool, TreeError<DbError>> {
        self.tree.has(key)
    }

    /// Returns the value and the sum of `key`, `None` if it isn't in the tree.
    pub fn get_value(&self, key: &[u8]) -> Result<Option<(Vec<u8>, Sum)>, TreeError<DbError>> {
        let record = match self.pending.get(key).or_else(|| self.unwritten.get(key)) {
            Some(change) => change.clone(),
            None => self.preimages.get(key).map_err(TreeError::DbError)?,
        };
        let Some(record) = record else {
            return Ok(None);
        };
        if record.len() < SUM_SIZE {
            return Err(TreeError::CorruptedNode(format!(
                "value of {} is too short",
                hex::encode(key)
            )));
        }
        let (value, sum) = record.split_at(record.len() - SUM_SIZE);
        let mut sum_bytes = [0; SUM_SIZE];
        sum_bytes.copy_from_slice(sum);
        trace!(key = %hex::encode(key), "loaded value");
        Ok(Some((value.to_vec(), Sum::from_be_bytes(sum_bytes))))
    }

    pub fn prove(&self, key: &[u8]) -> Result<SparseMerkleSumProof, TreeError<DbError>> {
        self.tree.prove(key)
    }

    pub fn prove_closest(&self, path: &[u8]) -> Result<ClosestProof, TreeError<DbError>> {
        self.tree.prove_closest(path)
    }

    /// Commits the tree, then writes the values changed since the last
    /// commit.
    ///
    /// Once the tree nodes are written the values belong to the saved root:
    /// if writing them fails they stay queued for the next commit and
    /// [`SMSTWithStorage::discard`] keeps them.
    pub fn commit(&mut self) -> Result<(), TreeError<DbError>> {
        self.tree.save()?;
        self.unwritten.extend(self.pending.drain());
        let keys: Vec<Vec<u8>> = self.unwritten.keys().cloned().collect();
        for key in keys {
            let written = match &self.unwritten[&key] {
                Some(record) => self.preimages.set(&key, record),
                None => self.preimages.delete(&key),
            };
            written.map_err(TreeError::DbError)?;
            self.unwritten.remove(&key);
        }
        debug!(root = %hex::encode(self.tree.saved_root()), "committed values");
        self.tree.delete_dead()
    }

    /// Drops every change made since the last commit, in the tree and in the
    /// values.
    pub fn discard(&mut self) {
        self.tree.discard();
        self.pending.clear();
    }

    /// Stops both databases.
    pub fn stop(&mut self) -> Result<(), TreeError<DbError>> {
        self.tree.stop()?;
        self.preimages.stop().map_err(TreeError::DbError)
    }
}
