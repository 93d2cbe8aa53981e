use crate::status::StatusCode;
use serde::{Deserialize, Serialize};

/// Verb-independent failure reply.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReply {
    pub status: StatusCode,
    pub message: String,
}

impl ErrorReply {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::Internal,
            message: message.into(),
        }
    }

    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}
