//! Streaming fetch: per-file mutex, CRC short-circuit, chunked send.
//! Fetch is read-only and never consults the write-lock table.

use crate::core::ServerState;
use crate::err::Result;
use crate::fs::util::{mtime_secs, resolve_mount_path, set_file_mtime};
use crate::global_var::LOGGER;
use crate::network::{CancelToken, StreamEnd, TcpConn};
use api_model::checksum::crc32_file;
use api_model::protocol::message::response_message::{ResponseKind, ResponseMessage};
use api_model::protocol::models::error::ErrorReply;
use api_model::protocol::models::fetch::{FetchReply, FetchRequest, TransferHeader};
use api_model::status::StatusCode;

async fn reply(conn: &mut TcpConn, response: ResponseKind) -> Result<()> {
    conn.send_response(&ResponseMessage::new(response)).await
}

pub async fn handle_fetch(
    state: &ServerState,
    request: &FetchRequest,
    conn: &mut TcpConn,
    cancel: &CancelToken,
) -> Result<()> {
    let path = match resolve_mount_path(&state.mount, &request.name) {
        Ok(p) => p,
        Err(e) => {
            return reply(conn, ResponseKind::Error(ErrorReply::internal(e.to_string()))).await;
        }
    };

    let file_mutex = state.file_mutexes.get_or_create(&request.name);
    let _file = file_mutex.lock().await;

    let meta = match std::fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            LOGGER.info(format!("File not found for {}", path.display()));
            return reply(
                conn,
                ResponseKind::Fetch(FetchReply {
                    status: StatusCode::NotFound,
                    transfer: None,
                }),
            )
            .await;
        }
        Err(e) => {
            return reply(conn, ResponseKind::Error(ErrorReply::internal(e.to_string()))).await;
        }
    };

    let server_crc = match crc32_file(&path) {
        Ok(crc) => crc,
        Err(e) => {
            return reply(conn, ResponseKind::Error(ErrorReply::internal(e.to_string()))).await;
        }
    };

    if server_crc == request.crc {
        // Caller already holds these bytes; only the older timestamp may
        // advance, and only in the client-newer direction.
        LOGGER.info(format!(
            "File already exists in caller's environment for: {}",
            request.name
        ));
        if request.mtime > mtime_secs(&meta) {
            if let Err(e) = set_file_mtime(&path, request.mtime) {
                return reply(conn, ResponseKind::Error(ErrorReply::internal(e.to_string())))
                    .await;
            }
            state.callbacks.signal_change();
        }
        return reply(
            conn,
            ResponseKind::Fetch(FetchReply {
                status: StatusCode::AlreadyExists,
                transfer: None,
            }),
        )
        .await;
    }

    let size = meta.len();
    reply(
        conn,
        ResponseKind::Fetch(FetchReply {
            status: StatusCode::Ok,
            transfer: Some(TransferHeader {
                size,
                mtime: mtime_secs(&meta),
            }),
        }),
    )
    .await?;

    let mut file = match tokio::fs::File::open(&path).await {
        Ok(f) => f,
        Err(e) => {
            return Err(format!("failed to reopen '{}' for send: {}", path.display(), e).into());
        }
    };

    LOGGER.info(format!(
        "Server starts sending data for file: {} ({} bytes)",
        request.name, size
    ));
    match conn.send_raw(&mut file, size, cancel).await? {
        StreamEnd::Complete => {
            LOGGER.info(format!("Server successfully sent file: {}", request.name));
            Ok(())
        }
        StreamEnd::Cancelled => {
            // The raw run is already underway; all that is left is to stop.
            LOGGER.error("Deadline exceeded or client cancelled, abandoning");
            Ok(())
        }
    }
}
