use crate::conn::Connection;
use crate::error::ClientError;
use api_model::file_key::validate_file_key;
use api_model::protocol::message::request_message::{RequestKind, RequestMessage};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Deadline used by the long-poll registration; a parked callback may
/// legitimately wait a long time for the server to answer.
pub(crate) const LONG_POLL_DEADLINE: Duration = Duration::from_secs(120);

/// One mirroring client process.
///
/// Holds the connection coordinates and the identity under which write
/// locks are taken; the per-verb methods live in `action/`.
#[derive(Debug)]
pub struct ClientNode {
    pub mount: PathBuf,
    pub server_addr: SocketAddr,
    pub client_id: String,
    pub deadline: Duration,
}

impl ClientNode {
    pub fn new(
        mount: PathBuf,
        server_addr: SocketAddr,
        client_id: Option<String>,
        deadline_ms: u64,
    ) -> Self {
        Self {
            mount,
            server_addr,
            client_id: client_id.unwrap_or_else(generate_client_id),
            deadline: Duration::from_millis(deadline_ms.max(1)),
        }
    }

    pub(crate) fn wrap_path(&self, name: &str) -> Result<PathBuf, ClientError> {
        validate_file_key(name).map_err(|e| {
            ClientError::ProtocolError(format!("invalid file name '{}'", name), e.to_string())
        })?;
        Ok(self.mount.join(name))
    }

    pub(crate) fn connect(&self) -> Result<Connection, ClientError> {
        Connection::connect(self.server_addr, self.deadline)
    }

    pub(crate) fn request(&self, kind: RequestKind) -> RequestMessage {
        RequestMessage::new(
            self.client_id.clone(),
            self.deadline.as_millis() as u64,
            kind,
        )
    }
}

/// Opaque identity, stable for the process lifetime, unique across
/// clients with overwhelming probability.
pub fn generate_client_id() -> String {
    format!(
        "client-{}-{:016x}",
        std::process::id(),
        rand::random::<u64>()
    )
}

/// Convert a transport timeout into the `DeadlineExceeded` status;
/// any other transport failure propagates as an error. The optional
/// second form supplies the whole `Ok` value for calls that also carry a
/// payload.
macro_rules! try_rpc {
    ($expr:expr) => {
        $crate::node::try_rpc!($expr, api_model::status::StatusCode::DeadlineExceeded)
    };
    ($expr:expr, $deadline_value:expr) => {
        match $expr {
            Ok(v) => v,
            Err($crate::error::ClientError::TimeoutError(_)) => {
                return Ok($deadline_value);
            }
            Err(e) => return Err(e),
        }
    };
}
pub(crate) use try_rpc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique_and_prefixed() {
        let a = generate_client_id();
        let b = generate_client_id();
        assert_ne!(a, b);
        assert!(a.starts_with("client-"));
    }

    #[test]
    fn wrap_path_joins_and_validates() {
        let node = ClientNode::new(
            PathBuf::from("/tmp/mirror"),
            "127.0.0.1:14400".parse().unwrap(),
            Some("c1".into()),
            5000,
        );
        assert_eq!(
            node.wrap_path("a.txt").unwrap(),
            PathBuf::from("/tmp/mirror/a.txt")
        );
        assert!(node.wrap_path("../escape").is_err());
        assert!(node.wrap_path("").is_err());
    }

    #[test]
    fn explicit_client_id_is_kept() {
        let node = ClientNode::new(
            PathBuf::from("/tmp/mirror"),
            "127.0.0.1:14400".parse().unwrap(),
            Some("override-id".into()),
            5000,
        );
        assert_eq!(node.client_id, "override-id");
    }
}
