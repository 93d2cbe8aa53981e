use crate::status::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchRequest {
    pub name: String,
    /// Caller's current local mtime; drives the server-side touch on a
    /// CRC match. Zero when the caller holds no local copy.
    pub mtime: i64,
    pub crc: u32,
}

/// Precedes the raw content run on a full fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferHeader {
    pub size: u64,
    pub mtime: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchReply {
    pub status: StatusCode,
    pub transfer: Option<TransferHeader>,
}
