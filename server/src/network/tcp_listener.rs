use crate::err::Result;
use crate::global_var::LOGGER;
use std::net::SocketAddr;
use tokio::net::{TcpListener as TokioTcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// TcpListener binds to an address and continuously accepts connections,
/// handing each to the provided callback.
pub struct TcpListener {
    listener: TokioTcpListener,
}

/// Handle to a running listener task, allowing graceful shutdown.
#[derive(Debug)]
pub struct ListenerHandle {
    handle: JoinHandle<()>,
    shutdown_tx: oneshot::Sender<()>,
}

impl ListenerHandle {
    /// Signal shutdown and await the listener task to exit.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
        Ok(())
    }
}

impl TcpListener {
    /// Bind to a specific socket address (tests use ephemeral ports).
    pub async fn bind_on(addr: SocketAddr) -> Result<Self> {
        LOGGER.info(format!("Binding TCP listener to {}", addr));
        let listener = TokioTcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Start an accept loop in a background task. The handler is invoked
    /// for each accepted connection; the task runs until shutdown.
    pub fn into_task(
        self,
        mut on_conn: impl FnMut(TcpStream, SocketAddr) + Send + 'static,
    ) -> ListenerHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown_rx => {
                        LOGGER.info("Tcp listener received shutdown signal, exiting...");
                        break;
                    }
                    res = self.listener.accept() => {
                        match res {
                            Ok((stream, peer)) => {
                                LOGGER.debug(format!("Accepted TCP connection from {:?}", peer));
                                on_conn(stream, peer);
                            }
                            Err(e) => {
                                LOGGER.debug(format!("Failed to accept TCP connection {:?}", e));
                                continue;
                            }
                        }
                    }
                }
            }
        });
        ListenerHandle {
            handle,
            shutdown_tx,
        }
    }
}
