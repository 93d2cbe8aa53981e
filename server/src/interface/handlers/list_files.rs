use crate::core::ServerState;
use crate::err::Result;
use crate::fs::list_mount_entries;
use api_model::protocol::models::list::{ListReply, ListRequest};
use api_model::status::StatusCode;
use rpc_handler::rpc_handler;

/// Snapshot the mount directory under the directory mutex.
#[rpc_handler(List)]
pub async fn list_files(state: &ServerState, _request: &ListRequest) -> Result<ListReply> {
    let _dir = state.dir_mutex.lock().await;
    let files = list_mount_entries(&state.mount)?;
    Ok(ListReply {
        status: StatusCode::Ok,
        files,
    })
}
