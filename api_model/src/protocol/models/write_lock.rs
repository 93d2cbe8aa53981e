use crate::status::StatusCode;
use serde::{Deserialize, Serialize};

/// Reserve the sole right to mutate `name`. The owner token is the
/// client id carried at the message level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteLockRequest {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteLockReply {
    pub status: StatusCode,
}
