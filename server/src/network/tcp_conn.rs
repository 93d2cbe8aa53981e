use crate::err::Result;
use crate::network::cancel::CancelToken;
use api_model::protocol::CHUNK_SIZE;
use api_model::protocol::message::request_message::RequestMessage;
use api_model::protocol::message::response_message::ResponseMessage;
use api_model::protocol::protocol::Protocol;
use api_model::protocol::token::Token;
use bytes::BytesMut;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// How a raw content run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    Complete,
    Cancelled,
}

#[derive(Clone, Copy, Debug)]
pub struct TcpConnConfig {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for TcpConnConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(10),
        }
    }
}

/// One accepted RPC connection.
///
/// Reads are buffered so the incremental token parser can be retried as
/// bytes arrive; leftover buffered bytes are handed to the raw content
/// reader first, since the peer may have pipelined message and content.
#[derive(Debug)]
pub struct TcpConn {
    stream: TcpStream,
    peer: SocketAddr,
    read_timeout: Duration,
    write_timeout: Duration,
    buf: BytesMut,
}

impl TcpConn {
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self::with_config(stream, peer, TcpConnConfig::default())
    }

    pub fn with_config(stream: TcpStream, peer: SocketAddr, cfg: TcpConnConfig) -> Self {
        Self {
            stream,
            peer,
            read_timeout: cfg.read_timeout,
            write_timeout: cfg.write_timeout,
            buf: BytesMut::with_capacity(CHUNK_SIZE),
        }
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Time a single read may wait: the connection timeout, shortened by
    /// whatever is left of the request deadline.
    fn effective_wait(&self, cancel: &CancelToken) -> Duration {
        match cancel.remaining() {
            Some(r) => r.min(self.read_timeout),
            None => self.read_timeout,
        }
    }

    /// Pull more bytes into the parse buffer. Returns `false` when the
    /// wait was cut short by cancellation.
    async fn fill_buf(&mut self, cancel: &CancelToken) -> Result<bool> {
        if cancel.is_cancelled() {
            return Ok(false);
        }
        let wait = self.effective_wait(cancel);
        match timeout(wait, self.stream.read_buf(&mut self.buf)).await {
            Ok(Ok(0)) => Err("connection closed by peer".into()),
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => Err(e.into()),
            Err(_elapsed) => {
                if cancel.is_cancelled() {
                    Ok(false)
                } else {
                    Err(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "tcp read timeout",
                    )
                    .into())
                }
            }
        }
    }

    /// Read one request message. `None` means the deadline fired first.
    pub async fn read_request(&mut self, cancel: &CancelToken) -> Result<Option<RequestMessage>> {
        loop {
            if let Some((tokens, consumed)) =
                Token::parse_exact(&self.buf, RequestMessage::TOKEN_COUNT)?
            {
                let _ = self.buf.split_to(consumed);
                return Ok(Some(RequestMessage::from_tokens(&tokens)?));
            }
            if !self.fill_buf(cancel).await? {
                return Ok(None);
            }
        }
    }

    /// Send the entire buffer, honoring the write timeout.
    pub async fn send_all(&mut self, bytes: &[u8]) -> Result<()> {
        match timeout(self.write_timeout, self.stream.write_all(bytes)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.into()),
            Err(_elapsed) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "tcp write timeout",
            )
            .into()),
        }
    }

    pub async fn send_response(&mut self, resp: &ResponseMessage) -> Result<()> {
        let bytes = resp.serialize();
        self.send_all(&bytes).await
    }

    /// Receive exactly `size` raw bytes into `writer`, checking the cancel
    /// token between chunks. Buffered leftovers are consumed first.
    pub async fn recv_raw<W: AsyncWrite + Unpin>(
        &mut self,
        writer: &mut W,
        size: u64,
        cancel: &CancelToken,
    ) -> Result<StreamEnd> {
        let mut remaining = size;

        while remaining > 0 && !self.buf.is_empty() {
            if cancel.is_cancelled() {
                return Ok(StreamEnd::Cancelled);
            }
            let take = (self.buf.len() as u64).min(remaining) as usize;
            let chunk = self.buf.split_to(take);
            writer.write_all(&chunk).await?;
            remaining -= take as u64;
        }

        let mut chunk = vec![0u8; CHUNK_SIZE - 1];
        while remaining > 0 {
            if cancel.is_cancelled() {
                return Ok(StreamEnd::Cancelled);
            }
            let want = remaining.min((CHUNK_SIZE - 1) as u64) as usize;
            let wait = self.effective_wait(cancel);
            let n = match timeout(wait, self.stream.read(&mut chunk[..want])).await {
                Ok(Ok(0)) => return Err("connection closed mid-stream".into()),
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(e.into()),
                Err(_elapsed) => {
                    if cancel.is_cancelled() {
                        return Ok(StreamEnd::Cancelled);
                    }
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::TimedOut,
                        "tcp read timeout",
                    )
                    .into());
                }
            };
            writer.write_all(&chunk[..n]).await?;
            remaining -= n as u64;
        }
        Ok(StreamEnd::Complete)
    }

    /// Send exactly `size` raw bytes from `reader` in chunks of at most
    /// `CHUNK_SIZE - 1`, checking the cancel token between chunks.
    pub async fn send_raw<R: AsyncRead + Unpin>(
        &mut self,
        reader: &mut R,
        size: u64,
        cancel: &CancelToken,
    ) -> Result<StreamEnd> {
        let mut chunk = vec![0u8; CHUNK_SIZE - 1];
        let mut remaining = size;
        while remaining > 0 {
            if cancel.is_cancelled() {
                return Ok(StreamEnd::Cancelled);
            }
            let want = remaining.min((CHUNK_SIZE - 1) as u64) as usize;
            let n = reader.read(&mut chunk[..want]).await?;
            if n == 0 {
                return Err("source truncated mid-stream".into());
            }
            self.send_all(&chunk[..n]).await?;
            remaining -= n as u64;
        }
        Ok(StreamEnd::Complete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_model::protocol::message::request_message::RequestKind;
    use api_model::protocol::models::list::ListRequest;
    use api_model::protocol::models::store::StoreRequest;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::net::TcpListener as TokioTcpListener;
    use tokio::net::TcpStream as ClientStream;

    async fn pair() -> (TcpConn, ClientStream) {
        let listener = TokioTcpListener::bind(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            0,
        ))
        .await
        .unwrap();
        let addr = listener.local_addr().unwrap();
        let client = ClientStream::connect(addr).await.unwrap();
        let (stream, peer) = listener.accept().await.unwrap();
        (TcpConn::new(stream, peer), client)
    }

    #[tokio::test]
    async fn reads_request_split_across_writes() {
        let (mut conn, mut client) = pair().await;
        let msg = RequestMessage::new("c1".into(), 0, RequestKind::List(ListRequest));
        let bytes = msg.serialize();
        let (head, tail) = bytes.split_at(bytes.len() / 2);

        let head = head.to_vec();
        let tail = tail.to_vec();
        let writer = tokio::spawn(async move {
            client.write_all(&head).await.unwrap();
            tokio::time::sleep(Duration::from_millis(30)).await;
            client.write_all(&tail).await.unwrap();
            client
        });

        let parsed = conn
            .read_request(&CancelToken::unbounded())
            .await
            .unwrap()
            .expect("should not be cancelled");
        assert_eq!(parsed.client_id, "c1");
        let _ = writer.await.unwrap();
    }

    #[tokio::test]
    async fn recv_raw_consumes_pipelined_bytes() {
        let (mut conn, mut client) = pair().await;
        let body = vec![0xA5u8; 10_000];
        let msg = RequestMessage::new(
            "c1".into(),
            0,
            RequestKind::Store(StoreRequest {
                name: "x".into(),
                mtime: 1,
                crc: 2,
                size: body.len() as u64,
            }),
        );
        let mut wire = msg.serialize();
        wire.extend_from_slice(&body);

        let writer = tokio::spawn(async move {
            client.write_all(&wire).await.unwrap();
            client
        });

        let cancel = CancelToken::unbounded();
        let req = conn.read_request(&cancel).await.unwrap().unwrap();
        let size = match req.request {
            RequestKind::Store(r) => r.size,
            _ => panic!("wrong kind"),
        };
        let mut out = Vec::new();
        let end = conn.recv_raw(&mut out, size, &cancel).await.unwrap();
        assert_eq!(end, StreamEnd::Complete);
        assert_eq!(out, body);
        let _ = writer.await.unwrap();
    }

    #[tokio::test]
    async fn recv_raw_reports_cancellation_on_stalled_peer() {
        let (mut conn, client) = pair().await;
        let cancel = CancelToken::with_deadline_ms(50);
        let mut out = Vec::new();
        let end = conn.recv_raw(&mut out, 1024, &cancel).await.unwrap();
        assert_eq!(end, StreamEnd::Cancelled);
        drop(client);
    }

    #[tokio::test]
    async fn send_raw_round_trips_exact_sizes() {
        let (mut conn, mut client) = pair().await;
        // An exact multiple of the chunk payload size needs no extra frame.
        let body = vec![0x5Au8; (CHUNK_SIZE - 1) * 3];
        let size = body.len() as u64;

        let reader = tokio::spawn(async move {
            let mut got = vec![0u8; size as usize];
            client.read_exact(&mut got).await.unwrap();
            got
        });

        let mut src = std::io::Cursor::new(body.clone());
        let end = conn
            .send_raw(&mut src, size, &CancelToken::unbounded())
            .await
            .unwrap();
        assert_eq!(end, StreamEnd::Complete);
        assert_eq!(reader.await.unwrap(), body);
    }
}
