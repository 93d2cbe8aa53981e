pub mod locks;
pub mod staging;
pub mod util;

pub use locks::{LockTable, MutexTable, ReleaseOnDrop};
pub use staging::StagingFile;

use crate::err::Result;
use crate::utilities::AsyncLogger;
use crate::utilities::init_file_logger;
use api_model::file_key::{META_DIR, validate_file_key};
use api_model::protocol::models::file_info::FileInfo;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

/// Initialize filesystem-related resources under the given mount `path`.
///
/// Steps:
/// 1. Verify the directory exists with read, write, and execute permissions.
/// 2. Get or create the ".netdisc" meta directory.
/// 3. Get or create "logs" and "tmp" subdirectories under it.
/// 4. Initialize the async file logger in the logs directory.
///
/// Returns the async logger handle and the background task handle.
pub async fn init_working_dir<P: AsRef<Path>>(path: P) -> Result<(AsyncLogger, JoinHandle<()>)> {
    let base: &Path = path.as_ref();

    if !util::test_dir_existence(base) {
        return Err(format!("Directory '{}' does not exist", base.display()).into());
    }
    let perms = util::check_dir_permissions(base);
    if !(perms.read && perms.write && perms.execute) {
        return Err(format!(
            "Insufficient permissions for path '{}': read={}, write={}, execute={}",
            base.display(),
            perms.read,
            perms.write,
            perms.execute
        )
        .into());
    }

    let meta_dir: PathBuf = base.join(META_DIR);
    fs::create_dir_all(&meta_dir)?;

    let logs_dir: PathBuf = meta_dir.join("logs");
    fs::create_dir_all(&logs_dir)?;

    let tmp_dir: PathBuf = meta_dir.join("tmp");
    fs::create_dir_all(&tmp_dir)?;

    let log_file: PathBuf = logs_dir.join("server.log");
    let (logger, task) = init_file_logger(&log_file).await?;

    Ok((logger, task))
}

/// Snapshot the regular files in the mount directory.
///
/// Entries whose stat fails are returned with only the name populated
/// (best-effort contract). Non-regular entries, including the meta
/// directory, are skipped. The result is sorted by name.
pub fn list_mount_entries(mount: &Path) -> Result<Vec<FileInfo>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(mount)? {
        let entry = entry?;
        let name = match entry.file_name().into_string() {
            Ok(n) => n,
            Err(_) => continue,
        };
        if validate_file_key(&name).is_err() {
            continue;
        }
        match entry.file_type() {
            Ok(ft) if ft.is_file() => {}
            Ok(_) => continue,
            Err(_) => {
                files.push(FileInfo::name_only(name));
                continue;
            }
        }
        match entry.metadata() {
            Ok(meta) => files.push(util::file_info_from_meta(&name, &meta)),
            Err(_) => files.push(FileInfo::name_only(name)),
        }
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// Stat one file in the mount directory.
pub fn file_info_at(mount: &Path, name: &str) -> std::io::Result<FileInfo> {
    let meta = fs::metadata(mount.join(name))?;
    Ok(util::file_info_from_meta(name, &meta))
}
