use std::fmt::{Debug, Display};

pub enum ClientError {
    ConnectError(String, String),
    TimeoutError(String),
    ProtocolError(String, String),
    IoError(String, String),
}

impl ClientError {
    pub fn io(context: impl Into<String>, e: std::io::Error) -> Self {
        ClientError::IoError(context.into(), e.to_string())
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::ConnectError(msg, _) => write!(f, "Connect error: {}", msg),
            ClientError::TimeoutError(msg) => write!(f, "Timeout: {}", msg),
            ClientError::ProtocolError(msg, _) => write!(f, "Protocol error: {}", msg),
            ClientError::IoError(msg, _) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl Debug for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::ConnectError(msg, trace) => {
                write!(f, "Connect error: {}\nTrace: {}", msg, trace)
            }
            ClientError::TimeoutError(msg) => write!(f, "Timeout: {}", msg),
            ClientError::ProtocolError(msg, trace) => {
                write!(f, "Protocol error: {}\nTrace: {}", msg, trace)
            }
            ClientError::IoError(msg, trace) => {
                write!(f, "I/O error: {}\nTrace: {}", msg, trace)
            }
        }
    }
}

impl std::error::Error for ClientError {}
