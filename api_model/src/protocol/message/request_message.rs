use crate::err::Result;
use crate::protocol::models::callback::CallbackListRequest;
use crate::protocol::models::delete::DeleteRequest;
use crate::protocol::models::fetch::FetchRequest;
use crate::protocol::models::list::ListRequest;
use crate::protocol::models::stat::StatRequest;
use crate::protocol::models::store::StoreRequest;
use crate::protocol::models::write_lock::WriteLockRequest;
use crate::protocol::protocol::Protocol;
use crate::protocol::token::Token;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum RequestKind {
    Store(StoreRequest),
    Fetch(FetchRequest),
    Delete(DeleteRequest),
    List(ListRequest),
    Stat(StatRequest),
    WriteLock(WriteLockRequest),
    CallbackList(CallbackListRequest),
}

impl RequestKind {
    pub fn verb(&self) -> &'static str {
        match self {
            RequestKind::Store(_) => "STORE",
            RequestKind::Fetch(_) => "FETCH",
            RequestKind::Delete(_) => "DELETE",
            RequestKind::List(_) => "LIST",
            RequestKind::Stat(_) => "STAT",
            RequestKind::WriteLock(_) => "WRITE_LOCK",
            RequestKind::CallbackList(_) => "CALLBACK_LIST",
        }
    }
}

/// One RPC call. Every call carries the caller's identity and a deadline
/// in milliseconds (0 = unbounded).
#[derive(Debug, Clone)]
pub struct RequestMessage {
    pub client_id: String,
    pub deadline_ms: u64,
    pub request: RequestKind,
}

impl RequestMessage {
    /// Number of wire tokens per request message.
    pub const TOKEN_COUNT: usize = 4;

    pub fn new(client_id: String, deadline_ms: u64, request: RequestKind) -> Self {
        Self {
            client_id,
            deadline_ms,
            request,
        }
    }
}

impl Protocol for RequestMessage {
    fn serialize(&self) -> Vec<u8> {
        // Format: +NETDISC_REQ, +client_id, :deadline_ms, $<request-bytes>
        let request_bytes = bincode::serialize(&self.request).unwrap_or_else(|_e| Vec::new());
        let tokens = vec![
            Token::Simple(String::from("NETDISC_REQ")),
            Token::Simple(self.client_id.clone()),
            Token::Integer(self.deadline_ms),
            Token::Data(bytes::Bytes::from(request_bytes)),
        ];
        let mut out = Vec::new();
        for t in tokens {
            out.extend_from_slice(&t.to_bytes());
        }
        out
    }

    fn deserialize(bytes: &[u8]) -> Result<Self>
    where
        Self: Sized,
    {
        let tokens = Token::parse_all(bytes)?;
        Self::from_tokens(&tokens)
    }

    fn from_tokens(tokens: &[Token]) -> Result<Self>
    where
        Self: Sized,
    {
        use std::io;
        if tokens.len() != Self::TOKEN_COUNT {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "expected {} tokens for RequestMessage, got {}",
                    Self::TOKEN_COUNT,
                    tokens.len()
                ),
            )
            .into());
        }
        match &tokens[0] {
            Token::Simple(s) if s == "NETDISC_REQ" => {}
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("expected leading Simple(\"NETDISC_REQ\"), got {:?}", other),
                )
                .into());
            }
        }
        let client_id = match &tokens[1] {
            Token::Simple(s) => s.clone(),
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("expected Simple for client_id, got {:?}", other),
                )
                .into());
            }
        };
        let deadline_ms = match &tokens[2] {
            Token::Integer(v) => *v,
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("expected Integer for deadline_ms, got {:?}", other),
                )
                .into());
            }
        };
        let request = match &tokens[3] {
            Token::Data(b) => match bincode::deserialize::<RequestKind>(&b[..]) {
                Ok(v) => v,
                Err(e) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("bincode decode RequestKind failed: {}", e),
                    )
                    .into());
                }
            },
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("expected Data for request, got {:?}", other),
                )
                .into());
            }
        };
        Ok(RequestMessage {
            client_id,
            deadline_ms,
            request,
        })
    }
}
