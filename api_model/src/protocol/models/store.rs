use crate::protocol::models::file_info::FileInfo;
use crate::status::StatusCode;
use serde::{Deserialize, Serialize};

/// Announces an incoming content stream of exactly `size` raw bytes.
/// The caller must already hold the write lock for `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreRequest {
    pub name: String,
    pub mtime: i64,
    pub crc: u32,
    pub size: u64,
}

/// Go-ahead: the server found no matching content and will accept the
/// announced byte run next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreReady;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreReply {
    pub status: StatusCode,
    pub info: Option<FileInfo>,
}
