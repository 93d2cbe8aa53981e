//! Filesystem helpers: mount path resolution, metadata conversions, and
//! best-effort directory permission probes.

use crate::err::Result;
use api_model::file_key::validate_file_key;
use api_model::protocol::models::file_info::FileInfo;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Join a file key to the mount directory.
///
/// Keys are validated first: traversal components and separators never
/// reach the filesystem layer.
pub fn resolve_mount_path(mount: &Path, name: &str) -> Result<PathBuf> {
    validate_file_key(name)?;
    Ok(mount.join(name))
}

pub fn mtime_secs(meta: &fs::Metadata) -> i64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(unix)]
pub fn ctime_secs(meta: &fs::Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    meta.ctime()
}

#[cfg(not(unix))]
pub fn ctime_secs(meta: &fs::Metadata) -> i64 {
    meta.created()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub fn file_info_from_meta(name: &str, meta: &fs::Metadata) -> FileInfo {
    FileInfo {
        name: name.to_string(),
        file_size: meta.len(),
        mtime: mtime_secs(meta),
        ctime: ctime_secs(meta),
    }
}

/// Set a file's modification time to whole seconds since the epoch.
pub fn set_file_mtime(path: &Path, secs: i64) -> io::Result<()> {
    let t = UNIX_EPOCH + Duration::from_secs(secs.max(0) as u64);
    let f = fs::File::options().write(true).open(path)?;
    f.set_modified(t)
}

pub fn expand_tilde(path: &str) -> String {
    // Expand leading "~/" to $HOME, and handle "~" alone. Leave other forms unchanged.
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return format!("{}/{}", home, rest);
        }
        return path.to_string();
    }
    if path == "~" {
        if let Ok(home) = std::env::var("HOME") {
            return home;
        }
        return path.to_string();
    }
    path.to_string()
}

pub fn test_dir_existence<P: AsRef<Path>>(dir: P) -> bool {
    dir.as_ref().exists() && dir.as_ref().is_dir()
}

/// Result of probing directory permissions for the current process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirPermissions {
    pub read: bool,
    pub write: bool,
    pub execute: bool, // "traverse" on Unix
}

/// Probe read, write, and traverse permissions by attempting real
/// operations rather than inspecting permission bits.
pub fn check_dir_permissions<P: AsRef<Path>>(dir: P) -> DirPermissions {
    let dir = dir.as_ref();

    match fs::metadata(dir) {
        Ok(md) if md.is_dir() => {}
        _ => {
            return DirPermissions {
                read: false,
                write: false,
                execute: false,
            };
        }
    }

    let read_ok = fs::read_dir(dir).is_ok();
    let exec_ok = fs::canonicalize(dir).is_ok();
    let write_ok = try_create_ephemeral_file(dir).unwrap_or(false);

    DirPermissions {
        read: read_ok,
        write: write_ok,
        execute: exec_ok,
    }
}

fn try_create_ephemeral_file(dir: &Path) -> io::Result<bool> {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let path: PathBuf = dir.join(format!(
        ".perm_check_{}_{}.tmp",
        std::process::id(),
        millis
    ));

    match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
    {
        Ok(file) => {
            drop(file);
            let _ = fs::remove_file(&path); // best-effort cleanup
            Ok(true)
        }
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    struct TempDirGuard(PathBuf);
    impl TempDirGuard {
        fn new(prefix: &str) -> Self {
            let mut p = std::env::temp_dir();
            let ts = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis();
            p.push(format!("{}_{}_{}", prefix, std::process::id(), ts));
            fs::create_dir_all(&p).unwrap();
            TempDirGuard(p)
        }
        fn path(&self) -> &Path {
            &self.0
        }
    }
    impl Drop for TempDirGuard {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn resolve_joins_valid_names() {
        let mount = Path::new("/srv/files");
        assert_eq!(
            resolve_mount_path(mount, "a.txt").unwrap(),
            PathBuf::from("/srv/files/a.txt")
        );
    }

    #[test]
    fn resolve_rejects_traversal() {
        let mount = Path::new("/srv/files");
        for name in ["", "..", "../../etc/passwd", "x/y", "a\\b", ".netdisc"] {
            assert!(resolve_mount_path(mount, name).is_err(), "{name}");
        }
    }

    #[test]
    fn set_file_mtime_round_trips() {
        let tmp = TempDirGuard::new("netdisc_mtime");
        let p = tmp.path().join("t.bin");
        fs::write(&p, b"x").unwrap();
        set_file_mtime(&p, 1_000_000).unwrap();
        let meta = fs::metadata(&p).unwrap();
        assert_eq!(mtime_secs(&meta), 1_000_000);
    }

    #[test]
    fn check_permissions_writable_temp_dir_has_write() {
        let tmp = TempDirGuard::new("netdisc_perms_ok");
        let perms = check_dir_permissions(tmp.path());
        assert!(perms.read && perms.write && perms.execute, "{:?}", perms);
    }

    #[test]
    fn check_permissions_nonexistent_dir_all_false() {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "netdisc_no_such_dir_{}_{}",
            std::process::id(),
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis()
        ));
        let perms = check_dir_permissions(&p);
        assert!(!perms.read && !perms.write && !perms.execute);
    }

    #[test]
    #[serial]
    fn expand_tilde_expands_when_home_set() {
        let original_home = env::var("HOME").ok();
        let temp_home = "/tmp/netdisc_home_test";
        unsafe {
            env::set_var("HOME", temp_home);
        }

        assert_eq!(
            expand_tilde("~/sub/dir"),
            format!("{}/{}", temp_home, "sub/dir")
        );
        assert_eq!(expand_tilde("~"), temp_home);
        assert_eq!(expand_tilde("/absolute/path"), "/absolute/path");
        assert_eq!(expand_tilde("~not/home"), "~not/home");

        match original_home {
            Some(val) => unsafe {
                env::set_var("HOME", val);
            },
            None => unsafe {
                env::remove_var("HOME");
            },
        }
    }

    #[test]
    fn test_dir_existence_false_for_file() {
        let tmp = TempDirGuard::new("netdisc_exist");
        let p = tmp.path().join("file.tmp");
        fs::write(&p, b"x").unwrap();
        assert!(test_dir_existence(tmp.path()));
        assert!(!test_dir_existence(&p));
    }
}
