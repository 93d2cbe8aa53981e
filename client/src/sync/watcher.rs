//! Filesystem change notifier for the local mount directory.
//!
//! Events are filtered (OS junk names, the meta directory, irrelevant
//! kinds) and forwarded over a std mpsc channel to the sync loop, which
//! runs a full pass under the directory mutex per event.

use crate::error::ClientError;
use api_model::file_key::META_DIR;
use notify::event::{EventKind, ModifyKind};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, channel};
use std::time::Duration;

/// Keep this alive while consuming the receiver; dropping it releases
/// the OS watch.
pub struct MirrorWatcher {
    _watcher: RecommendedWatcher,
    _root: PathBuf,
}

impl MirrorWatcher {
    pub fn watch<P: AsRef<Path>>(path: P) -> Result<(Self, Receiver<Event>), ClientError> {
        let root = path.as_ref().to_path_buf();
        if !root.exists() {
            return Err(ClientError::IoError(
                format!("Path '{}' does not exist", root.display()),
                String::new(),
            ));
        }

        let (tx, rx) = channel();
        let meta_dir = root.join(META_DIR);

        let watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(ev) => {
                    if let Some(ev) = filter_event(ev, &meta_dir) {
                        // Best-effort send; ignore if receiver dropped
                        let _ = tx.send(ev);
                    }
                }
                Err(e) => {
                    eprintln!("Filesystem watcher error: {}", e);
                }
            },
            Config::default()
                .with_poll_interval(Duration::from_secs(5))
                .with_follow_symlinks(false),
        )
        .map_err(|e| ClientError::IoError("failed to create watcher".into(), e.to_string()))?;

        let mut watcher = watcher;
        watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(|e| ClientError::IoError("failed to start watcher".into(), e.to_string()))?;

        Ok((
            Self {
                _watcher: watcher,
                _root: root,
            },
            rx,
        ))
    }
}

fn is_ignored_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    // Common OS metadata files
    if lower == ".ds_store" || lower == "desktop.ini" || lower == "thumbs.db" {
        return true;
    }
    // Staging files carry a .part suffix until committed
    if name.ends_with(".part") {
        return true;
    }
    false
}

fn filter_event(mut ev: Event, meta_dir: &Path) -> Option<Event> {
    // Only creations, removals, and content/name modifications matter.
    let is_wanted_kind = matches!(
        &ev.kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Modify(ModifyKind::Data(_))
    );
    if !is_wanted_kind {
        return None;
    }

    ev.paths.retain(|p| {
        if p.starts_with(meta_dir) {
            return false;
        }
        if let Some(name) = p.file_name().and_then(|s| s.to_str()) {
            if is_ignored_name(name) {
                return false;
            }
        }
        true
    });

    if ev.paths.is_empty() { None } else { Some(ev) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct TempDirGuard(PathBuf);
    impl TempDirGuard {
        fn new(prefix: &str) -> Self {
            let mut p = std::env::temp_dir();
            let ts = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos();
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
    fn watch_dir_receives_create_event() {
        let tmp = TempDirGuard::new("netdisc_watch_create");
        let (_watcher, rx) = MirrorWatcher::watch(tmp.path()).expect("should start watcher");

        let file_path = tmp.path().join("hello.txt");
        fs::write(&file_path, b"hello").unwrap();

        let got = rx.recv_timeout(Duration::from_secs(10));
        assert!(
            got.is_ok(),
            "expected at least one filesystem event after creating a file"
        );
    }

    #[test]
    fn watch_nonexistent_path_errors() {
        let tmp = TempDirGuard::new("netdisc_watch_missing");
        let missing = tmp.path().join("subdir_that_does_not_exist");
        assert!(MirrorWatcher::watch(&missing).is_err());
    }

    fn event_with(kind: EventKind, path: PathBuf) -> Event {
        let mut ev = Event::default();
        ev.kind = kind;
        ev.paths.push(path);
        ev
    }

    #[test]
    fn meta_dir_events_are_filtered() {
        let root = Path::new("/mnt/mirror");
        let meta = root.join(META_DIR);
        let ev = event_with(
            EventKind::Create(notify::event::CreateKind::File),
            meta.join("tmp").join("x.part"),
        );
        assert!(filter_event(ev, &meta).is_none());

        let ok_ev = event_with(
            EventKind::Create(notify::event::CreateKind::File),
            root.join("real.txt"),
        );
        assert!(filter_event(ok_ev, &meta).is_some());
    }

    #[test]
    fn junk_names_are_filtered() {
        let root = Path::new("/mnt/mirror");
        let meta = root.join(META_DIR);
        for junk in [".DS_Store", "Thumbs.db", "half-done.part"] {
            let ev = event_with(
                EventKind::Create(notify::event::CreateKind::File),
                root.join(junk),
            );
            assert!(filter_event(ev, &meta).is_none(), "{junk}");
        }
    }

    #[test]
    fn access_events_are_dropped() {
        let root = Path::new("/mnt/mirror");
        let meta = root.join(META_DIR);
        let ev = event_with(
            EventKind::Access(notify::event::AccessKind::Read),
            root.join("real.txt"),
        );
        assert!(filter_event(ev, &meta).is_none());
    }
}
