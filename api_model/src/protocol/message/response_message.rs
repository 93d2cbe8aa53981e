use crate::err::Result;
use crate::protocol::models::callback::CallbackReply;
use crate::protocol::models::delete::DeleteReply;
use crate::protocol::models::error::ErrorReply;
use crate::protocol::models::fetch::FetchReply;
use crate::protocol::models::list::ListReply;
use crate::protocol::models::stat::StatReply;
use crate::protocol::models::store::{StoreReady, StoreReply};
use crate::protocol::models::write_lock::WriteLockReply;
use crate::protocol::protocol::Protocol;
use crate::protocol::token::Token;
use crate::status::StatusCode;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub enum ResponseKind {
    Store(StoreReply),
    StoreReady(StoreReady),
    Fetch(FetchReply),
    Delete(DeleteReply),
    List(ListReply),
    Stat(StatReply),
    WriteLock(WriteLockReply),
    Callback(CallbackReply),
    Error(ErrorReply),
}

impl ResponseKind {
    /// Status carried by this reply, regardless of variant.
    pub fn status(&self) -> StatusCode {
        match self {
            ResponseKind::Store(r) => r.status,
            ResponseKind::StoreReady(_) => StatusCode::Ok,
            ResponseKind::Fetch(r) => r.status,
            ResponseKind::Delete(r) => r.status,
            ResponseKind::List(r) => r.status,
            ResponseKind::Stat(r) => r.status,
            ResponseKind::WriteLock(r) => r.status,
            ResponseKind::Callback(r) => r.status,
            ResponseKind::Error(r) => r.status,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseMessage {
    pub response: ResponseKind,
}

impl ResponseMessage {
    /// Number of wire tokens per response message.
    pub const TOKEN_COUNT: usize = 2;

    pub fn new(response: ResponseKind) -> Self {
        Self { response }
    }
}

impl Protocol for ResponseMessage {
    fn serialize(&self) -> Vec<u8> {
        // Format: +NETDISC_RESP, $<response-bytes>
        let response_bytes = bincode::serialize(&self.response).unwrap_or_else(|_e| Vec::new());
        let tokens = vec![
            Token::Simple(String::from("NETDISC_RESP")),
            Token::Data(bytes::Bytes::from(response_bytes)),
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
                    "expected {} tokens for ResponseMessage, got {}",
                    Self::TOKEN_COUNT,
                    tokens.len()
                ),
            )
            .into());
        }
        match &tokens[0] {
            Token::Simple(s) if s == "NETDISC_RESP" => {}
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("expected leading Simple(\"NETDISC_RESP\"), got {:?}", other),
                )
                .into());
            }
        }
        let response = match &tokens[1] {
            Token::Data(b) => match bincode::deserialize::<ResponseKind>(&b[..]) {
                Ok(v) => v,
                Err(e) => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("bincode decode ResponseKind failed: {}", e),
                    )
                    .into());
                }
            },
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("expected Data for response, got {:?}", other),
                )
                .into());
            }
        };
        Ok(ResponseMessage { response })
    }
}
