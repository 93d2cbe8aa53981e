//! Streaming store: header message, CRC short-circuit, staged chunked
//! receive, atomic commit. The caller's write lock is released on every
//! exit path by the `ReleaseOnDrop` guard.

use crate::core::ServerState;
use crate::err::Result;
use crate::fs::util::{file_info_from_meta, mtime_secs, resolve_mount_path, set_file_mtime};
use crate::fs::{ReleaseOnDrop, StagingFile};
use crate::global_var::LOGGER;
use crate::network::{CancelToken, StreamEnd, TcpConn};
use api_model::checksum::crc32_file_or_empty;
use api_model::protocol::message::response_message::{ResponseKind, ResponseMessage};
use api_model::protocol::models::error::ErrorReply;
use api_model::protocol::models::store::{StoreReady, StoreReply, StoreRequest};
use api_model::status::StatusCode;
use tokio::io::AsyncWriteExt;

async fn reply(conn: &mut TcpConn, response: ResponseKind) -> Result<()> {
    conn.send_response(&ResponseMessage::new(response)).await
}

async fn reply_internal(conn: &mut TcpConn, message: String) -> Result<()> {
    LOGGER.warn(format!("Store rejected: {}", &message));
    reply(conn, ResponseKind::Error(ErrorReply::internal(message))).await
}

pub async fn handle_store(
    state: &ServerState,
    client_id: &str,
    request: &StoreRequest,
    conn: &mut TcpConn,
    cancel: &CancelToken,
) -> Result<()> {
    let path = match resolve_mount_path(&state.mount, &request.name) {
        Ok(p) => p,
        Err(e) => return reply_internal(conn, e.to_string()).await,
    };

    // The write lock must have been granted to this client beforehand.
    if !state.locks.holds(&request.name, client_id) {
        return reply_internal(
            conn,
            format!(
                "{} has no write lock for {}, or the file has already been locked",
                client_id, request.name
            ),
        )
        .await;
    }
    let _release = ReleaseOnDrop::new(&state.locks, request.name.as_str());

    let file_mutex = state.file_mutexes.get_or_create(&request.name);
    let _dir = state.dir_mutex.lock().await;
    let _file = file_mutex.lock().await;

    let server_crc = match crc32_file_or_empty(&path) {
        Ok(crc) => crc,
        Err(e) => return reply_internal(conn, e.to_string()).await,
    };

    if path.exists() && server_crc == request.crc {
        // Content already matches; at most the timestamp advances.
        LOGGER.info(format!("File already exists for: {}", request.name));
        let meta = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) => return reply_internal(conn, e.to_string()).await,
        };
        if request.mtime > mtime_secs(&meta) {
            if let Err(e) = set_file_mtime(&path, request.mtime) {
                return reply_internal(conn, e.to_string()).await;
            }
            state.callbacks.signal_change();
        }
        let info = std::fs::metadata(&path)
            .map(|m| file_info_from_meta(&request.name, &m))
            .ok();
        return reply(
            conn,
            ResponseKind::Store(StoreReply {
                status: StatusCode::AlreadyExists,
                info,
            }),
        )
        .await;
    }

    // Go-ahead: the announced byte run follows.
    reply(conn, ResponseKind::StoreReady(StoreReady)).await?;

    let staging = match StagingFile::allocate(&state.mount, &request.name) {
        Ok(s) => s,
        Err(e) => return reply_internal(conn, e.to_string()).await,
    };
    let mut file = match tokio::fs::File::create(staging.path()).await {
        Ok(f) => f,
        Err(e) => return reply_internal(conn, e.to_string()).await,
    };

    LOGGER.info(format!(
        "Server starts storing data to file: {} ({} bytes)",
        request.name, request.size
    ));
    match conn.recv_raw(&mut file, request.size, cancel).await {
        Ok(StreamEnd::Complete) => {}
        Ok(StreamEnd::Cancelled) => {
            LOGGER.error("Deadline exceeded or client cancelled, abandoning");
            // Partial staging file is removed when `staging` drops.
            return reply(
                conn,
                ResponseKind::Store(StoreReply {
                    status: StatusCode::DeadlineExceeded,
                    info: None,
                }),
            )
            .await;
        }
        Err(e) => return reply_internal(conn, e.to_string()).await,
    }
    if let Err(e) = file.flush().await {
        return reply_internal(conn, e.to_string()).await;
    }
    drop(file);

    if let Err(e) = staging.commit(&path) {
        return reply_internal(conn, e.to_string()).await;
    }
    // Preserve the writer's timestamp so a pushed file compares equal on
    // the next reconcile pass.
    if request.mtime > 0 {
        if let Err(e) = set_file_mtime(&path, request.mtime) {
            LOGGER.warn(format!(
                "Stored '{}' but failed to set mtime: {}",
                request.name, e
            ));
        }
    }

    let info = match std::fs::metadata(&path) {
        Ok(m) => file_info_from_meta(&request.name, &m),
        Err(e) => return reply_internal(conn, e.to_string()).await,
    };
    LOGGER.info(format!(
        "Server successfully stored data of size {}",
        info.file_size
    ));
    state.callbacks.signal_change();

    reply(
        conn,
        ResponseKind::Store(StoreReply {
            status: StatusCode::Ok,
            info: Some(info),
        }),
    )
    .await
}
