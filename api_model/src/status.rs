use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome domain shared by every verb in the protocol.
///
/// `AlreadyExists` is not a failure: it is the no-transfer-needed signal
/// emitted by the CRC short-circuit on store and fetch.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    NotFound,
    AlreadyExists,
    ResourceExhausted,
    DeadlineExceeded,
    Cancelled,
    Internal,
}

impl StatusCode {
    #[inline]
    pub fn is_ok(self) -> bool {
        matches!(self, StatusCode::Ok)
    }

    /// True for the outcomes a reconcile pass treats as settled:
    /// the transfer happened, or both sides already agreed on content.
    #[inline]
    pub fn is_settled(self) -> bool {
        matches!(self, StatusCode::Ok | StatusCode::AlreadyExists)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusCode::Ok => "OK",
            StatusCode::NotFound => "NOT_FOUND",
            StatusCode::AlreadyExists => "ALREADY_EXISTS",
            StatusCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            StatusCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            StatusCode::Cancelled => "CANCELLED",
            StatusCode::Internal => "INTERNAL",
        };
        write!(f, "{}", s)
    }
}
