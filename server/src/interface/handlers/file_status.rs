use crate::core::ServerState;
use crate::err::Result;
use crate::fs::util::{file_info_from_meta, resolve_mount_path};
use crate::global_var::LOGGER;
use api_model::protocol::models::stat::{StatReply, StatRequest};
use api_model::status::StatusCode;
use rpc_handler::rpc_handler;

#[rpc_handler(Stat)]
pub async fn file_status(state: &ServerState, request: &StatRequest) -> Result<StatReply> {
    let path = resolve_mount_path(&state.mount, &request.name)?;

    let file_mutex = state.file_mutexes.get_or_create(&request.name);
    let _file = file_mutex.lock().await;

    match std::fs::metadata(&path) {
        Ok(meta) => Ok(StatReply {
            status: StatusCode::Ok,
            info: Some(file_info_from_meta(&request.name, &meta)),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            LOGGER.info(format!("File not found for {}", path.display()));
            Ok(StatReply {
                status: StatusCode::NotFound,
                info: None,
            })
        }
        Err(e) => Err(e.into()),
    }
}
