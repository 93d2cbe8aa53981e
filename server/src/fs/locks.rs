//! In-memory synchronization state for the mount directory.
//!
//! Two registries, each behind its own coarse mutex:
//! - [`LockTable`]: advisory write locks, file key -> owning client id.
//! - [`MutexTable`]: per-file mutual exclusion for server-side I/O.
//!
//! Registry mutexes are never held across an `.await`; per-file mutexes
//! are cloned out of the table first and awaited afterwards. Nothing here
//! touches the disk, so nothing here survives the process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as TokioMutex;

/// Advisory write locks. At most one entry per file key.
///
/// An entry exists only between the grant of a lock and the completion of
/// the mutating operation that requested it, on every terminal path.
#[derive(Debug, Default)]
pub struct LockTable {
    inner: Mutex<HashMap<String, String>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `(name, client_id)` if no entry exists. On conflict the
    /// current owner is returned as the error value.
    pub fn try_acquire(&self, name: &str, client_id: &str) -> Result<(), String> {
        let mut map = self.inner.lock().unwrap();
        match map.get(name) {
            Some(owner) => Err(owner.clone()),
            None => {
                map.insert(name.to_string(), client_id.to_string());
                Ok(())
            }
        }
    }

    /// Remove the entry if present. Idempotent.
    pub fn release(&self, name: &str) {
        let mut map = self.inner.lock().unwrap();
        map.remove(name);
    }

    pub fn owner(&self, name: &str) -> Option<String> {
        let map = self.inner.lock().unwrap();
        map.get(name).cloned()
    }

    /// True iff `client_id` currently holds the lock for `name`.
    pub fn holds(&self, name: &str, client_id: &str) -> bool {
        let map = self.inner.lock().unwrap();
        map.get(name).map(|owner| owner == client_id).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Releases a held write lock when dropped.
///
/// Mutating handlers hold one of these for their whole lifetime, so the
/// lock is released on success, on error, and when the handler future is
/// dropped by a deadline.
pub struct ReleaseOnDrop<'a> {
    table: &'a LockTable,
    name: String,
}

impl<'a> ReleaseOnDrop<'a> {
    pub fn new(table: &'a LockTable, name: impl Into<String>) -> Self {
        Self {
            table,
            name: name.into(),
        }
    }
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.table.release(&self.name);
    }
}

/// Lazily-populated registry of per-file mutexes.
///
/// Entries are created on first reference and never removed; the table is
/// bounded by the set of file keys ever seen by this process.
#[derive(Debug, Default)]
pub struct MutexTable {
    inner: Mutex<HashMap<String, Arc<TokioMutex<()>>>>,
}

impl MutexTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, name: &str) -> Arc<TokioMutex<()>> {
        let mut map = self.inner.lock().unwrap();
        if let Some(m) = map.get(name) {
            return m.clone();
        }
        let m = Arc::new(TokioMutex::new(()));
        map.insert(name.to_string(), m.clone());
        m
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.lock().unwrap().contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}
