//! Long-poll callback queue.
//!
//! The RPC entry point parks each CallbackList connection here; a single
//! dedicated task drains the queue and answers every parked client with a
//! fresh directory listing. The drain task blocks on a notification
//! (fired on enqueue and on every committed mutation) with a bounded
//! fallback tick, so an idle server does not spin.

use crate::core::ServerState;
use crate::err::Result;
use crate::fs::list_mount_entries;
use crate::global_var::LOGGER;
use crate::network::TcpConn;
use api_model::protocol::message::request_message::RequestMessage;
use api_model::protocol::message::response_message::{ResponseKind, ResponseMessage};
use api_model::protocol::models::callback::CallbackReply;
use api_model::protocol::models::error::ErrorReply;
use api_model::status::StatusCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;

#[derive(Debug)]
pub struct PendingCallback {
    pub conn: TcpConn,
    pub request: RequestMessage,
}

#[derive(Debug, Default)]
pub struct CallbackQueue {
    pending: Mutex<Vec<PendingCallback>>,
    changed: Notify,
}

impl CallbackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a long-poll connection until the processor answers it.
    ///
    /// Enqueueing does not wake the processor: parked clients are
    /// answered when the directory changes or on the fallback tick, so a
    /// re-registering client does not degenerate into a hot poll loop.
    pub fn enqueue(&self, cb: PendingCallback) {
        let mut queue = self.pending.lock().unwrap();
        queue.push(cb);
    }

    /// Wake the processor; called after every committed store, touch, and
    /// delete so parked clients see changes promptly.
    pub fn signal_change(&self) {
        self.changed.notify_one();
    }

    pub async fn changed(&self) {
        self.changed.notified().await;
    }

    pub fn drain(&self) -> Vec<PendingCallback> {
        let mut queue = self.pending.lock().unwrap();
        std::mem::take(&mut *queue)
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle to the running callback processor task.
#[derive(Debug)]
pub struct CallbackProcessorHandle {
    handle: JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
}

impl CallbackProcessorHandle {
    pub fn spawn(state: Arc<ServerState>) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => {
                        LOGGER.info("Callback processor received shutdown signal, exiting...");
                        break;
                    }
                    _ = state.callbacks.changed() => {}
                    _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                }
                for mut pending in state.callbacks.drain() {
                    if let Err(e) = answer(&state, &mut pending).await {
                        LOGGER.warn(format!(
                            "Failed to answer callback from {}: {}",
                            pending.conn.peer_addr(),
                            e
                        ));
                    }
                }
            }
        });
        Self {
            handle,
            shutdown_tx,
        }
    }

    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
        Ok(())
    }
}

async fn answer(state: &ServerState, pending: &mut PendingCallback) -> Result<()> {
    let listing = {
        let _dir = state.dir_mutex.lock().await;
        list_mount_entries(&state.mount)
    };
    let response = match listing {
        Ok(files) => ResponseKind::Callback(CallbackReply {
            status: StatusCode::Ok,
            files,
        }),
        Err(e) => ResponseKind::Error(ErrorReply::internal(e.to_string())),
    };
    LOGGER.debug(format!(
        "Answering callback '{}' from {}",
        pending.request.client_id,
        pending.conn.peer_addr()
    ));
    pending
        .conn
        .send_response(&ResponseMessage::new(response))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_empties_the_queue() {
        let queue = CallbackQueue::new();
        assert!(queue.is_empty());
        assert!(queue.drain().is_empty());
    }

    #[tokio::test]
    async fn enqueue_wakes_a_waiter() {
        let queue = Arc::new(CallbackQueue::new());
        let q = queue.clone();
        let waiter = tokio::spawn(async move {
            q.changed().await;
        });
        // Give the waiter time to register interest.
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.signal_change();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be woken")
            .unwrap();
    }
}
