use crate::error::ClientError;
use crate::node::{ClientNode, try_rpc};
use api_model::protocol::message::request_message::RequestKind;
use api_model::protocol::message::response_message::ResponseKind;
use api_model::protocol::models::file_info::FileInfo;
use api_model::protocol::models::list::ListRequest;
use api_model::protocol::protocol::Protocol;
use api_model::status::StatusCode;

impl ClientNode {
    /// Snapshot the server's directory listing.
    pub fn list_files(&self) -> Result<(StatusCode, Vec<FileInfo>), ClientError> {
        let mut conn = try_rpc!(self.connect(), (StatusCode::DeadlineExceeded, Vec::new()));
        let message = self.request(RequestKind::List(ListRequest));
        try_rpc!(
            conn.send_message(&message.serialize()),
            (StatusCode::DeadlineExceeded, Vec::new())
        );
        let response = try_rpc!(
            conn.read_response(),
            (StatusCode::DeadlineExceeded, Vec::new())
        );
        match response.response {
            ResponseKind::List(reply) => Ok((reply.status, reply.files)),
            ResponseKind::Error(e) => Ok((e.status, Vec::new())),
            other => Err(ClientError::ProtocolError(
                "unexpected reply to LIST".into(),
                format!("{:?}", other),
            )),
        }
    }
}
