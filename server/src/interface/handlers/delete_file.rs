use crate::core::ServerState;
use crate::err::Result;
use crate::fs::ReleaseOnDrop;
use crate::fs::util::{file_info_from_meta, resolve_mount_path};
use crate::global_var::LOGGER;
use crate::netdisc_error;
use api_model::protocol::models::delete::{DeleteRequest, DeleteReply};
use api_model::status::StatusCode;
use rpc_handler::rpc_handler;

/// Remove a file. Requires the caller to hold the write lock, which is
/// released on every exit path.
#[rpc_handler(Delete)]
pub async fn delete_file(
    state: &ServerState,
    client_id: &str,
    request: &DeleteRequest,
) -> Result<DeleteReply> {
    let path = resolve_mount_path(&state.mount, &request.name)?;

    if !state.locks.holds(&request.name, client_id) {
        LOGGER.info(format!(
            "{} has no write lock for {}, or the file has already been locked",
            client_id, request.name
        ));
        return Err(netdisc_error!(
            "{} has no write lock for {}",
            client_id,
            request.name
        )
        .into());
    }
    let _release = ReleaseOnDrop::new(&state.locks, request.name.as_str());

    let file_mutex = state.file_mutexes.get_or_create(&request.name);
    let _dir = state.dir_mutex.lock().await;
    let _file = file_mutex.lock().await;

    let meta = match std::fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            LOGGER.info(format!("File not found for {}", path.display()));
            return Ok(DeleteReply {
                status: StatusCode::NotFound,
                info: None,
            });
        }
        Err(e) => return Err(e.into()),
    };

    // Report the metadata the file had just before removal.
    let info = file_info_from_meta(&request.name, &meta);
    std::fs::remove_file(&path)?;
    LOGGER.info(format!(
        "Server successfully deleted the file {}",
        request.name
    ));
    state.callbacks.signal_change();

    Ok(DeleteReply {
        status: StatusCode::Ok,
        info: Some(info),
    })
}
