use crate::protocol::models::file_info::FileInfo;
use crate::status::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub name: String,
}

/// On success `info` holds the metadata the file had before removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteReply {
    pub status: StatusCode,
    pub info: Option<FileInfo>,
}
