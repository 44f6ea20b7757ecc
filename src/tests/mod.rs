//! Tests for the Sparse Merkle Sum Tree implementation

mod sha512;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use crate::{Db, MemoryDb};

/// A [`MemoryDb`] that can be shared between trees and told to fail.
#[derive(Clone, Default)]
pub(crate) struct SharedDb {
    inner: Arc<Mutex<MemoryDb>>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
    fail_deletes: Arc<AtomicBool>,
}

impl SharedDb {
    pub(crate) fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub(crate) fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes deletes fail while writes still go through.
    pub(crate) fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Overwrites a record behind the back of the tree.
    pub(crate) fn tamper(&self, key: &[u8], value: &[u8]) {
        self.inner.lock().unwrap().set(key, value).unwrap();
    }
}

impl Db for SharedDb {
    type DbError = String;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, Self::DbError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err("read failed".to_string());
        }
        Ok(self.inner.lock().unwrap().get(key).unwrap())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), Self::DbError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err("write failed".to_string());
        }
        self.inner.lock().unwrap().set(key, value).unwrap();
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), Self::DbError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err("write failed".to_string());
        }
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err("delete failed".to_string());
        }
        self.inner.lock().unwrap().delete(key).unwrap();
        Ok(())
    }
}
