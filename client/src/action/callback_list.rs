use crate::conn::Connection;
use crate::error::ClientError;
use crate::node::{ClientNode, LONG_POLL_DEADLINE};
use api_model::protocol::message::request_message::{RequestKind, RequestMessage};
use api_model::protocol::message::response_message::ResponseKind;
use api_model::protocol::models::callback::CallbackListRequest;
use api_model::protocol::models::file_info::FileInfo;
use api_model::protocol::protocol::Protocol;
use api_model::status::StatusCode;

impl ClientNode {
    /// Register a long-poll callback and block until the server answers
    /// with its current directory listing. Uses its own generous deadline
    /// instead of the per-call one; the registration itself carries no
    /// server-side deadline.
    pub fn callback_list(
        &self,
        name: &str,
    ) -> Result<(StatusCode, Vec<FileInfo>), ClientError> {
        let mut conn = Connection::connect(self.server_addr, LONG_POLL_DEADLINE)?;
        let message = RequestMessage::new(
            self.client_id.clone(),
            0,
            RequestKind::CallbackList(CallbackListRequest {
                name: name.to_string(),
            }),
        );
        conn.send_message(&message.serialize())?;
        let response = conn.read_response()?;
        match response.response {
            ResponseKind::Callback(reply) => Ok((reply.status, reply.files)),
            ResponseKind::Error(e) => Ok((e.status, Vec::new())),
            other => Err(ClientError::ProtocolError(
                "unexpected reply to CALLBACK_LIST".into(),
                format!("{:?}", other),
            )),
        }
    }
}
