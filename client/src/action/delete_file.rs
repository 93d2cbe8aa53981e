use crate::error::ClientError;
use crate::node::{ClientNode, try_rpc};
use api_model::protocol::message::request_message::RequestKind;
use api_model::protocol::message::response_message::ResponseKind;
use api_model::protocol::models::delete::DeleteRequest;
use api_model::protocol::models::file_info::FileInfo;
use api_model::protocol::protocol::Protocol;
use api_model::status::StatusCode;

impl ClientNode {
    /// Delete a file on the server. Acquires the write lock first; a
    /// denied lock cancels the operation with `ResourceExhausted`. On
    /// success the reply carries the removed file's prior metadata.
    pub fn delete_file(&self, name: &str) -> Result<(StatusCode, Option<FileInfo>), ClientError> {
        self.wrap_path(name)?;

        let lock_status = match self.request_write_lock(name) {
            Ok(s) => s,
            Err(ClientError::TimeoutError(_)) => {
                return Ok((StatusCode::ResourceExhausted, None));
            }
            Err(e) => return Err(e),
        };
        if !lock_status.is_ok() {
            return Ok((StatusCode::ResourceExhausted, None));
        }

        let mut conn = try_rpc!(self.connect(), (StatusCode::DeadlineExceeded, None));
        let message = self.request(RequestKind::Delete(DeleteRequest {
            name: name.to_string(),
        }));
        try_rpc!(
            conn.send_message(&message.serialize()),
            (StatusCode::DeadlineExceeded, None)
        );
        let response = try_rpc!(conn.read_response(), (StatusCode::DeadlineExceeded, None));
        match response.response {
            ResponseKind::Delete(reply) => Ok((reply.status, reply.info)),
            ResponseKind::Error(e) => Ok((e.status, None)),
            other => Err(ClientError::ProtocolError(
                "unexpected reply to DELETE".into(),
                format!("{:?}", other),
            )),
        }
    }
}
