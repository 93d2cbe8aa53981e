use crate::error::ClientError;
use crate::node::{ClientNode, try_rpc};
use api_model::protocol::message::request_message::RequestKind;
use api_model::protocol::message::response_message::ResponseKind;
use api_model::protocol::models::file_info::FileInfo;
use api_model::protocol::models::stat::StatRequest;
use api_model::protocol::protocol::Protocol;
use api_model::status::StatusCode;

impl ClientNode {
    /// Stat one file on the server; `NotFound` when it is absent.
    pub fn file_status(&self, name: &str) -> Result<(StatusCode, Option<FileInfo>), ClientError> {
        self.wrap_path(name)?;

        let mut conn = try_rpc!(self.connect(), (StatusCode::DeadlineExceeded, None));
        let message = self.request(RequestKind::Stat(StatRequest {
            name: name.to_string(),
        }));
        try_rpc!(
            conn.send_message(&message.serialize()),
            (StatusCode::DeadlineExceeded, None)
        );
        let response = try_rpc!(conn.read_response(), (StatusCode::DeadlineExceeded, None));
        match response.response {
            ResponseKind::Stat(reply) => Ok((reply.status, reply.info)),
            ResponseKind::Error(e) => Ok((e.status, None)),
            other => Err(ClientError::ProtocolError(
                "unexpected reply to STAT".into(),
                format!("{:?}", other),
            )),
        }
    }
}
