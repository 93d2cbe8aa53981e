//! Background mirroring: a watcher thread for local changes and a
//! long-poll thread for server changes, both funneling into reconcile
//! passes under a single directory mutex. One coarse mutex is enough:
//! the two threads never interleave partial passes, and lock order is
//! trivially acyclic.

pub mod reconcile;
pub mod watcher;

pub use reconcile::{SyncAction, plan_action, reconcile_pass};
pub use watcher::MirrorWatcher;

use crate::error::ClientError;
use crate::node::ClientNode;
use chrono::Utc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Pause before re-registering after a failed or non-OK callback.
const RESET_INTERVAL: Duration = Duration::from_millis(3000);

/// Timestamped status line for the long-running sync command.
pub(crate) fn log_line(msg: &str) {
    eprintln!(
        "{} [sync] {}",
        Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        msg
    );
}

/// One full pass: list the server and reconcile every entry, all under
/// the directory mutex.
pub fn sync_once(node: &ClientNode, dir_mutex: &Mutex<()>) -> Result<(), ClientError> {
    let _guard = dir_mutex.lock().unwrap();
    list_and_reconcile(node)
}

fn list_and_reconcile(node: &ClientNode) -> Result<(), ClientError> {
    let (status, files) = node.list_files()?;
    if !status.is_ok() {
        log_line(&format!("listing failed: {}", status));
        return Ok(());
    }
    reconcile_pass(node, &files);
    Ok(())
}

/// React to one filesystem event under the directory mutex.
///
/// The server listing never mentions files that exist only locally, so
/// the reconciler alone cannot propagate a local creation; event paths
/// that name an existing regular file are pushed first, then a full pass
/// folds in any concurrent remote changes. Pushing an unchanged file is
/// cheap: the server short-circuits it on matching CRCs.
pub fn handle_watch_event(
    node: &ClientNode,
    dir_mutex: &Mutex<()>,
    event: &notify::Event,
) -> Result<(), ClientError> {
    let _guard = dir_mutex.lock().unwrap();
    for path in &event.paths {
        let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        if api_model::file_key::validate_file_key(name).is_err() {
            continue;
        }
        if !path.is_file() {
            continue;
        }
        match node.store_file(name) {
            Ok(status) if status.is_settled() => {}
            Ok(status) => log_line(&format!("push '{}' did not settle: {}", name, status)),
            Err(e) => log_line(&format!("push '{}' failed: {}", name, e)),
        }
    }
    list_and_reconcile(node)
}

/// Run the mirror until the process is killed: an initial pass, then a
/// watcher thread and a long-poll thread.
pub fn run_sync(node: Arc<ClientNode>) -> Result<(), ClientError> {
    let dir_mutex = Arc::new(Mutex::new(()));

    if let Err(e) = sync_once(&node, &dir_mutex) {
        log_line(&format!("initial sync failed: {}", e));
    }

    // Watcher thread: every relevant local event triggers a full pass.
    let watcher_node = node.clone();
    let watcher_mutex = dir_mutex.clone();
    let watcher_handle = std::thread::spawn(move || {
        let (watcher, rx) = match MirrorWatcher::watch(&watcher_node.mount) {
            Ok(pair) => pair,
            Err(e) => {
                log_line(&format!("failed to start watcher: {}", e));
                return;
            }
        };
        log_line(&format!(
            "watching mount directory: {}",
            watcher_node.mount.display()
        ));
        for event in rx.iter() {
            if let Err(e) = handle_watch_event(&watcher_node, &watcher_mutex, &event) {
                log_line(&format!("watcher sync failed: {}", e));
            }
        }
        drop(watcher);
    });

    // Long-poll thread: register, reconcile the reply, re-register.
    let poll_node = node.clone();
    let poll_mutex = dir_mutex.clone();
    let poll_handle = std::thread::spawn(move || {
        loop {
            match poll_node.callback_list("") {
                Ok((status, files)) if status.is_ok() => {
                    let _guard = poll_mutex.lock().unwrap();
                    reconcile_pass(&poll_node, &files);
                }
                Ok((status, _)) => {
                    log_line(&format!(
                        "callback returned {}; retrying in {:?}",
                        status, RESET_INTERVAL
                    ));
                    std::thread::sleep(RESET_INTERVAL);
                }
                Err(e) => {
                    log_line(&format!(
                        "callback failed: {}; retrying in {:?}",
                        e, RESET_INTERVAL
                    ));
                    std::thread::sleep(RESET_INTERVAL);
                }
            }
        }
    });

    let _ = watcher_handle.join();
    let _ = poll_handle.join();
    Ok(())
}
