use crate::err::Result;
use api_model::file_key::META_DIR;
use std::fs;
use std::path::{Path, PathBuf};

/// A randomly-named staging file under `<mount>/.netdisc/tmp`.
///
/// Streamed content lands here first and is renamed into the mount root
/// only on completion, so an aborted transfer never leaves a torn file
/// under the canonical name. An uncommitted staging file is removed on
/// drop.
#[derive(Debug)]
pub struct StagingFile {
    path: PathBuf,
    committed: bool,
}

impl StagingFile {
    pub fn allocate(mount: &Path, name: &str) -> Result<Self> {
        let dir = mount.join(META_DIR).join("tmp");
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{}-{:016x}.part", name, rand::random::<u64>()));
        Ok(Self {
            path,
            committed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically move the staged bytes to `target` (same filesystem).
    pub fn commit(mut self, target: &Path) -> std::io::Result<()> {
        fs::rename(&self.path, target)?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}
