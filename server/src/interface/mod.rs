pub mod handlers;

use crate::core::ServerState;
use crate::core::callback_queue::PendingCallback;
use crate::core::protocol::{file_fetch, file_store};
use crate::err::Result;
use crate::global_var::LOGGER;
use crate::interface::handlers::run_handler;
use crate::network::{CancelToken, TcpConn};
use api_model::protocol::message::request_message::{RequestKind, RequestMessage};
use api_model::protocol::message::response_message::{ResponseKind, ResponseMessage};
use api_model::protocol::models::error::ErrorReply;
use api_model::status::StatusCode;
use std::sync::Arc;

/// Serve one accepted connection: read the request message, route it, and
/// answer. Long-poll registrations move the connection into the callback
/// queue instead of answering inline.
pub async fn handle_connection(state: Arc<ServerState>, mut conn: TcpConn) {
    let peer = conn.peer_addr();
    let request = match conn.read_request(&CancelToken::unbounded()).await {
        Ok(Some(req)) => req,
        Ok(None) => return,
        Err(e) => {
            LOGGER.warn(format!("Failed to read request from {}: {}", peer, e));
            let resp = ResponseMessage::new(ResponseKind::Error(ErrorReply::internal(
                e.to_string(),
            )));
            let _ = conn.send_response(&resp).await;
            return;
        }
    };

    LOGGER.debug(format!(
        "{} from {} (client '{}', deadline {} ms)",
        request.request.verb(),
        peer,
        request.client_id,
        request.deadline_ms
    ));

    if let RequestKind::CallbackList(_) = request.request {
        state.callbacks.enqueue(PendingCallback { conn, request });
        return;
    }

    if let Err(e) = dispatch(&state, request, &mut conn).await {
        LOGGER.warn(format!("Connection from {} failed: {}", peer, e));
    }
}

async fn dispatch(state: &ServerState, request: RequestMessage, conn: &mut TcpConn) -> Result<()> {
    let cancel = CancelToken::with_deadline_ms(request.deadline_ms);

    match &request.request {
        RequestKind::Store(r) => {
            file_store::handle_store(state, &request.client_id, r, conn, &cancel).await
        }
        RequestKind::Fetch(r) => file_fetch::handle_fetch(state, r, conn, &cancel).await,
        _ => {
            let response = run_unary(state, &request, &cancel).await;
            conn.send_response(&ResponseMessage::new(response)).await
        }
    }
}

/// Run a unary handler under the request deadline. A timed-out handler
/// future is dropped, which releases any lock guards it holds.
async fn run_unary(
    state: &ServerState,
    request: &RequestMessage,
    cancel: &CancelToken,
) -> ResponseKind {
    let handler = run_handler(state, request);
    let outcome = match cancel.remaining() {
        Some(remaining) => match tokio::time::timeout(remaining, handler).await {
            Ok(res) => res,
            Err(_elapsed) => {
                return ResponseKind::Error(ErrorReply::new(
                    StatusCode::DeadlineExceeded,
                    format!("{} deadline exceeded", request.request.verb()),
                ));
            }
        },
        None => handler.await,
    };
    match outcome {
        Ok(kind) => kind,
        Err(e) => ResponseKind::Error(ErrorReply::internal(e.to_string())),
    }
}
