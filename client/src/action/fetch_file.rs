use crate::error::ClientError;
use crate::node::{ClientNode, try_rpc};
use api_model::checksum::{EMPTY_CRC, crc32_file};
use api_model::file_key::META_DIR;
use api_model::protocol::message::request_message::RequestKind;
use api_model::protocol::message::response_message::ResponseKind;
use api_model::protocol::models::fetch::FetchRequest;
use api_model::protocol::protocol::Protocol;
use api_model::status::StatusCode;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

/// Staged download that removes itself unless committed.
struct DownloadGuard {
    path: PathBuf,
    committed: bool,
}

impl DownloadGuard {
    fn allocate(mount: &Path, name: &str) -> Result<Self, ClientError> {
        let dir = mount.join(META_DIR).join("tmp");
        std::fs::create_dir_all(&dir)
            .map_err(|e| ClientError::io("failed to create staging directory", e))?;
        Ok(Self {
            path: dir.join(format!("{}-{:016x}.part", name, rand::random::<u64>())),
            committed: false,
        })
    }

    fn commit(mut self, target: &Path) -> Result<(), ClientError> {
        std::fs::rename(&self.path, target)
            .map_err(|e| ClientError::io("failed to move download into place", e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for DownloadGuard {
    fn drop(&mut self) {
        if !self.committed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

impl ClientNode {
    /// Pull a file from the server into the local mount.
    ///
    /// `AlreadyExists` means the local bytes already match; when that
    /// verdict arrives for a file with no local copy, the matching
    /// content can only be empty, so an empty file is materialized.
    /// On a full transfer the local mtime is set to the server's so the
    /// next reconcile pass sees both sides equal.
    pub fn fetch_file(&self, name: &str) -> Result<StatusCode, ClientError> {
        let path = self.wrap_path(name)?;

        let (local_exists, mtime, crc) = match std::fs::metadata(&path) {
            Ok(meta) => {
                let mtime = meta
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(0);
                let crc = crc32_file(&path)
                    .map_err(|e| ClientError::io("failed to checksum local file", e))?;
                (true, mtime, crc)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (false, 0, EMPTY_CRC),
            Err(e) => return Err(ClientError::io("failed to stat local file", e)),
        };

        let mut conn = try_rpc!(self.connect());
        let message = self.request(RequestKind::Fetch(FetchRequest {
            name: name.to_string(),
            mtime,
            crc,
        }));
        try_rpc!(conn.send_message(&message.serialize()));

        let header = match try_rpc!(conn.read_response()).response {
            ResponseKind::Fetch(reply) => match reply.status {
                StatusCode::Ok => reply.transfer.ok_or_else(|| {
                    ClientError::ProtocolError(
                        "FETCH OK without transfer header".into(),
                        String::new(),
                    )
                })?,
                StatusCode::AlreadyExists => {
                    if !local_exists {
                        std::fs::write(&path, b"")
                            .map_err(|e| ClientError::io("failed to create empty file", e))?;
                    }
                    return Ok(StatusCode::AlreadyExists);
                }
                other => return Ok(other),
            },
            ResponseKind::Error(e) => return Ok(e.status),
            other => {
                return Err(ClientError::ProtocolError(
                    "unexpected reply to FETCH".into(),
                    format!("{:?}", other),
                ));
            }
        };

        let staging = DownloadGuard::allocate(&self.mount, name)?;
        {
            let mut file = std::fs::File::create(&staging.path)
                .map_err(|e| ClientError::io("failed to create staging file", e))?;
            try_rpc!(conn.recv_exact(&mut file, header.size));
        }
        staging.commit(&path)?;

        let mtime = UNIX_EPOCH + Duration::from_secs(header.mtime.max(0) as u64);
        std::fs::File::options()
            .write(true)
            .open(&path)
            .and_then(|f| f.set_modified(mtime))
            .map_err(|e| ClientError::io("failed to set fetched mtime", e))?;

        Ok(StatusCode::Ok)
    }
}
