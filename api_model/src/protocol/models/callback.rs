use crate::protocol::models::file_info::FileInfo;
use crate::status::StatusCode;
use serde::{Deserialize, Serialize};

/// Long-poll registration. The reply represents the directory state at
/// some point at or after the call began; no stronger ordering holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackListRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackReply {
    pub status: StatusCode,
    pub files: Vec<FileInfo>,
}
