pub mod callback_queue;
pub mod protocol;

pub use callback_queue::{CallbackProcessorHandle, CallbackQueue};

use crate::fs::{LockTable, MutexTable};
use crate::global_var::LOGGER;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex as TokioMutex;

/// Shared state of one serving process: the mount path plus all in-memory
/// synchronization structures. One `Arc<ServerState>` is cloned into every
/// connection task.
#[derive(Debug)]
pub struct ServerState {
    pub mount: PathBuf,
    pub locks: LockTable,
    pub file_mutexes: MutexTable,
    /// Serializes whole-directory operations against single-file
    /// mutations. Lock order when both are held: directory, then file.
    pub dir_mutex: TokioMutex<()>,
    pub callbacks: CallbackQueue,
}

impl ServerState {
    pub fn new(mount: PathBuf) -> Arc<Self> {
        let state = Self {
            mount,
            locks: LockTable::new(),
            file_mutexes: MutexTable::new(),
            dir_mutex: TokioMutex::new(()),
            callbacks: CallbackQueue::new(),
        };
        state.seed_file_mutexes();
        Arc::new(state)
    }

    /// Pre-create a mutex per regular file already in the mount directory.
    fn seed_file_mutexes(&self) {
        let entries = match std::fs::read_dir(&self.mount) {
            Ok(e) => e,
            Err(e) => {
                LOGGER.error(format!(
                    "Server failed to open mount directory {}: {}",
                    self.mount.display(),
                    e
                ));
                return;
            }
        };
        for entry in entries.flatten() {
            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                if api_model::file_key::validate_file_key(&name).is_ok() {
                    LOGGER.info(format!("Found file: {}", entry.path().display()));
                    self.file_mutexes.get_or_create(&name);
                }
            }
        }
    }
}
