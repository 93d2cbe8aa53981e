use crate::core::ServerState;
use crate::interface::handlers::delete_file::delete_file;
use crate::interface::handlers::file_status::file_status;
use crate::interface::handlers::list_files::list_files;
use crate::interface::handlers::write_lock::write_lock;
use api_model::protocol::message::request_message::{RequestKind, RequestMessage};
use api_model::protocol::message::response_message::ResponseKind;

mod delete_file;
mod file_status;
mod list_files;
mod write_lock;

pub async fn run_handler(
    state: &ServerState,
    message: &RequestMessage,
) -> crate::err::Result<ResponseKind> {
    let response = match &message.request {
        RequestKind::Delete(req) => delete_file(state, &message.client_id, req).await,
        RequestKind::List(req) => list_files(state, req).await,
        RequestKind::Stat(req) => file_status(state, req).await,
        RequestKind::WriteLock(req) => write_lock(state, &message.client_id, req).await,
        other => return Err(format!("Handler for {:?} not found", other.verb()).into()),
    };
    Ok(response)
}
