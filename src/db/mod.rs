//! Database trait and implementations for the Sparse Merkle Sum Tree

mod memory;

pub use memory::MemoryDb;

/// Thread safety marker trait
#[cfg(feature = "multi-thread")]
pub trait ThreadSafe: Send + Sync {}
#[cfg(feature = "multi-thread")]
impl<T: Send + Sync> ThreadSafe for T {}

#[cfg(not(feature = "multi-thread"))]
pub trait ThreadSafe {}
#[cfg(not(feature = "multi-thread"))]
impl<T> ThreadSafe for T {}

/// Store for the tree nodes
///
/// This trait must be implemented by any storage backend used with the tree.
/// Keys and values are raw bytes, the tree decides how nodes are addressed:
/// a node record is stored under the `hash ‖ sum` encoding of the node.
pub trait Db: ThreadSafe {
    /// The error type for database operations
    type DbError;

    /// Get the value stored under `key`, `None` if there is none.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::DbError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), Self::DbError>;

    /// Delete the value stored under `key`. Deleting a missing key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<(), Self::DbError>;

    /// Release the resources held by the database.
    fn stop(&mut self) -> Result<(), Self::DbError> {
        Ok(())
    }
}
