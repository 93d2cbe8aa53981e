use crate::core::ServerState;
use crate::err::Result;
use crate::fs::util::resolve_mount_path;
use crate::global_var::LOGGER;
use crate::netdisc_error;
use api_model::protocol::models::write_lock::{WriteLockReply, WriteLockRequest};
use api_model::status::StatusCode;
use rpc_handler::rpc_handler;

/// Grant the caller the sole right to mutate the named file. A denial is
/// reported as an internal error; clients surface it as lock exhaustion.
#[rpc_handler(WriteLock)]
pub async fn write_lock(
    state: &ServerState,
    client_id: &str,
    request: &WriteLockRequest,
) -> Result<WriteLockReply> {
    resolve_mount_path(&state.mount, &request.name)?;

    match state.locks.try_acquire(&request.name, client_id) {
        Ok(()) => {
            // Make sure the per-file mutex exists before any I/O follows.
            state.file_mutexes.get_or_create(&request.name);
            LOGGER.info(format!(
                "Write lock for '{}' granted to {}",
                request.name, client_id
            ));
            Ok(WriteLockReply {
                status: StatusCode::Ok,
            })
        }
        Err(owner) => {
            LOGGER.info(format!(
                "Write lock for '{}' denied to {}; held by {}",
                request.name, client_id, owner
            ));
            Err(netdisc_error!(
                "Fail to acquire the lock for client ID: {}",
                client_id
            )
            .into())
        }
    }
}
