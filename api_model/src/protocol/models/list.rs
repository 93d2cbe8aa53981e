use crate::protocol::models::file_info::FileInfo;
use crate::status::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRequest;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListReply {
    pub status: StatusCode,
    pub files: Vec<FileInfo>,
}
