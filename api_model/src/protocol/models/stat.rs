use crate::protocol::models::file_info::FileInfo;
use crate::status::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatReply {
    pub status: StatusCode,
    pub info: Option<FileInfo>,
}
