//! Per-file reconciliation against a server listing.
//!
//! The decision is a pure function of the two modification times; the
//! executor turns decisions into RPCs. Transient failures are logged and
//! left for the next pass.

use crate::error::ClientError;
use crate::node::ClientNode;
use crate::sync::log_line;
use api_model::file_key::validate_file_key;
use api_model::protocol::models::file_info::FileInfo;
use api_model::status::StatusCode;
use std::time::{Duration, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    /// Missing locally: pull from the server.
    Pull,
    /// Local copy is newer: push it.
    Push,
    /// Server copy is newer: pull; on a content match, only the local
    /// timestamp advances.
    PullOrTouch,
    Noop,
}

pub fn plan_action(local_mtime: Option<i64>, server_mtime: i64) -> SyncAction {
    match local_mtime {
        None => SyncAction::Pull,
        Some(lm) if lm > server_mtime => SyncAction::Push,
        Some(lm) if lm < server_mtime => SyncAction::PullOrTouch,
        Some(_) => SyncAction::Noop,
    }
}

fn local_mtime_secs(node: &ClientNode, name: &str) -> Option<i64> {
    let path = node.mount.join(name);
    let meta = std::fs::metadata(&path).ok()?;
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
}

fn touch_local(node: &ClientNode, name: &str, mtime: i64) -> std::io::Result<()> {
    let t = UNIX_EPOCH + Duration::from_secs(mtime.max(0) as u64);
    std::fs::File::options()
        .write(true)
        .open(node.mount.join(name))?
        .set_modified(t)
}

/// Apply one reconcile decision for one server entry.
fn reconcile_entry(node: &ClientNode, entry: &FileInfo) -> Result<SyncAction, ClientError> {
    let action = plan_action(local_mtime_secs(node, &entry.name), entry.mtime);
    match action {
        SyncAction::Noop => {}
        SyncAction::Push => {
            let status = node.store_file(&entry.name)?;
            if !status.is_settled() {
                log_line(&format!(
                    "push '{}' did not settle: {}",
                    entry.name, status
                ));
            }
        }
        SyncAction::Pull | SyncAction::PullOrTouch => {
            let status = node.fetch_file(&entry.name)?;
            match status {
                // Content already matched; adopt the server's timestamp.
                StatusCode::AlreadyExists => {
                    if let Err(e) = touch_local(node, &entry.name, entry.mtime) {
                        log_line(&format!("failed to touch '{}': {}", entry.name, e));
                    }
                }
                s if s.is_settled() => {}
                s => log_line(&format!("pull '{}' did not settle: {}", entry.name, s)),
            }
        }
    }
    Ok(action)
}

/// One reconcile pass over a server listing. Entries that exist only
/// locally are not considered; deletions propagate only when invoked
/// explicitly. Must be called under the client directory mutex.
pub fn reconcile_pass(node: &ClientNode, files: &[FileInfo]) -> Vec<(String, SyncAction)> {
    let mut applied = Vec::new();
    for entry in files {
        if validate_file_key(&entry.name).is_err() {
            continue;
        }
        match reconcile_entry(node, entry) {
            Ok(action) => applied.push((entry.name.clone(), action)),
            Err(e) => {
                // Transient failure; try again next tick.
                log_line(&format!("reconcile of '{}' failed: {}", entry.name, e));
            }
        }
    }
    applied
}
