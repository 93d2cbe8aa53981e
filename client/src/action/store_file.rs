use crate::error::ClientError;
use crate::node::{ClientNode, try_rpc};
use api_model::checksum::crc32_file;
use api_model::protocol::message::request_message::RequestKind;
use api_model::protocol::message::response_message::ResponseKind;
use api_model::protocol::models::store::StoreRequest;
use api_model::protocol::protocol::Protocol;
use api_model::status::StatusCode;
use std::time::UNIX_EPOCH;

impl ClientNode {
    /// Push a local file to the server.
    ///
    /// Acquires the write lock first; a denied lock cancels the
    /// operation with `ResourceExhausted`. A missing local file is
    /// `NotFound` without any RPC. `AlreadyExists` means the server kept
    /// its identical bytes (possibly advancing its mtime).
    pub fn store_file(&self, name: &str) -> Result<StatusCode, ClientError> {
        let path = self.wrap_path(name)?;

        let meta = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StatusCode::NotFound);
            }
            Err(e) => return Err(ClientError::io("failed to stat local file", e)),
        };

        if !self.request_write_lock(name)?.is_ok() {
            return Ok(StatusCode::ResourceExhausted);
        }

        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let size = meta.len();
        let crc = crc32_file(&path).map_err(|e| ClientError::io("failed to checksum local file", e))?;

        let mut conn = try_rpc!(self.connect());
        let message = self.request(RequestKind::Store(StoreRequest {
            name: name.to_string(),
            mtime,
            crc,
            size,
        }));
        try_rpc!(conn.send_message(&message.serialize()));

        // First reply: short-circuit, rejection, or go-ahead.
        match try_rpc!(conn.read_response()).response {
            ResponseKind::StoreReady(_) => {}
            ResponseKind::Store(reply) => return Ok(reply.status),
            ResponseKind::Error(e) => return Ok(e.status),
            other => {
                return Err(ClientError::ProtocolError(
                    "unexpected reply to STORE".into(),
                    format!("{:?}", other),
                ));
            }
        }

        let mut file = std::fs::File::open(&path)
            .map_err(|e| ClientError::io("failed to open local file", e))?;
        try_rpc!(conn.send_chunks(&mut file, size));

        match try_rpc!(conn.read_response()).response {
            ResponseKind::Store(reply) => Ok(reply.status),
            ResponseKind::Error(e) => Ok(e.status),
            other => Err(ClientError::ProtocolError(
                "unexpected final reply to STORE".into(),
                format!("{:?}", other),
            )),
        }
    }
}
