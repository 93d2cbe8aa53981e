use crate::error::ClientError;
use crate::node::{ClientNode, try_rpc};
use api_model::protocol::message::request_message::RequestKind;
use api_model::protocol::message::response_message::ResponseKind;
use api_model::protocol::models::write_lock::WriteLockRequest;
use api_model::protocol::protocol::Protocol;
use api_model::status::StatusCode;

impl ClientNode {
    /// Ask the server for the sole right to mutate `name`. The server
    /// reports a denial as an internal error; callers translate any
    /// non-OK outcome into lock exhaustion.
    pub fn request_write_lock(&self, name: &str) -> Result<StatusCode, ClientError> {
        let mut conn = try_rpc!(self.connect());
        let message = self.request(RequestKind::WriteLock(WriteLockRequest {
            name: name.to_string(),
        }));
        try_rpc!(conn.send_message(&message.serialize()));
        let response = try_rpc!(conn.read_response());
        match response.response {
            ResponseKind::WriteLock(reply) => Ok(reply.status),
            ResponseKind::Error(e) => Ok(e.status),
            other => Err(ClientError::ProtocolError(
                "unexpected reply to WRITE_LOCK".into(),
                format!("{:?}", other),
            )),
        }
    }
}
