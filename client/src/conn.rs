//! Blocking RPC connection.
//!
//! One connection per call. Socket read/write waits are bounded by the
//! remaining portion of the call deadline, refreshed before every
//! operation, so a stalled server surfaces as a timeout instead of a
//! hang.

use crate::error::ClientError;
use api_model::protocol::CHUNK_SIZE;
use api_model::protocol::message::response_message::ResponseMessage;
use api_model::protocol::protocol::Protocol;
use api_model::protocol::token::Token;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

pub struct Connection {
    stream: TcpStream,
    buf: Vec<u8>,
    deadline: Instant,
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
    )
}

impl Connection {
    pub fn connect(addr: SocketAddr, deadline: Duration) -> Result<Self, ClientError> {
        let stream = TcpStream::connect_timeout(&addr, deadline).map_err(|e| {
            if is_timeout(&e) {
                ClientError::TimeoutError(format!("connecting to {}", addr))
            } else {
                ClientError::ConnectError(format!("failed to connect to {}", addr), e.to_string())
            }
        })?;
        stream
            .set_nodelay(true)
            .map_err(|e| ClientError::ConnectError("failed to set nodelay".into(), e.to_string()))?;
        Ok(Self {
            stream,
            buf: Vec::with_capacity(CHUNK_SIZE),
            deadline: Instant::now() + deadline,
        })
    }

    fn remaining(&self) -> Result<Duration, ClientError> {
        let now = Instant::now();
        if now >= self.deadline {
            return Err(ClientError::TimeoutError("call deadline expired".into()));
        }
        Ok(self.deadline - now)
    }

    fn arm_read(&self) -> Result<(), ClientError> {
        let remaining = self.remaining()?;
        self.stream
            .set_read_timeout(Some(remaining))
            .map_err(|e| ClientError::IoError("failed to set read timeout".into(), e.to_string()))
    }

    fn arm_write(&self) -> Result<(), ClientError> {
        let remaining = self.remaining()?;
        self.stream
            .set_write_timeout(Some(remaining))
            .map_err(|e| ClientError::IoError("failed to set write timeout".into(), e.to_string()))
    }

    pub fn send_message(&mut self, bytes: &[u8]) -> Result<(), ClientError> {
        self.arm_write()?;
        self.stream.write_all(bytes).map_err(|e| {
            if is_timeout(&e) {
                ClientError::TimeoutError("sending request".into())
            } else {
                ClientError::IoError("failed to send request".into(), e.to_string())
            }
        })
    }

    /// Read one response message, refilling the parse buffer as needed.
    pub fn read_response(&mut self) -> Result<ResponseMessage, ClientError> {
        loop {
            match Token::parse_exact(&self.buf, ResponseMessage::TOKEN_COUNT)
                .map_err(|e| ClientError::ProtocolError("malformed response".into(), e.to_string()))?
            {
                Some((tokens, consumed)) => {
                    self.buf.drain(..consumed);
                    return ResponseMessage::from_tokens(&tokens).map_err(|e| {
                        ClientError::ProtocolError("unexpected response".into(), e.to_string())
                    });
                }
                None => self.fill_buf()?,
            }
        }
    }

    fn fill_buf(&mut self) -> Result<(), ClientError> {
        self.arm_read()?;
        let mut chunk = [0u8; CHUNK_SIZE];
        let n = self.stream.read(&mut chunk).map_err(|e| {
            if is_timeout(&e) {
                ClientError::TimeoutError("waiting for response".into())
            } else {
                ClientError::IoError("failed to read response".into(), e.to_string())
            }
        })?;
        if n == 0 {
            return Err(ClientError::IoError(
                "connection closed by server".into(),
                String::new(),
            ));
        }
        self.buf.extend_from_slice(&chunk[..n]);
        Ok(())
    }

    /// Stream exactly `size` bytes from `reader` in chunks of at most
    /// `CHUNK_SIZE - 1`.
    pub fn send_chunks<R: Read>(&mut self, reader: &mut R, size: u64) -> Result<(), ClientError> {
        let mut chunk = vec![0u8; CHUNK_SIZE - 1];
        let mut remaining = size;
        while remaining > 0 {
            let want = remaining.min((CHUNK_SIZE - 1) as u64) as usize;
            let n = reader
                .read(&mut chunk[..want])
                .map_err(|e| ClientError::IoError("failed to read source file".into(), e.to_string()))?;
            if n == 0 {
                return Err(ClientError::IoError(
                    "source file truncated mid-stream".into(),
                    String::new(),
                ));
            }
            self.arm_write()?;
            self.stream.write_all(&chunk[..n]).map_err(|e| {
                if is_timeout(&e) {
                    ClientError::TimeoutError("streaming content".into())
                } else {
                    ClientError::IoError("failed to stream content".into(), e.to_string())
                }
            })?;
            remaining -= n as u64;
        }
        Ok(())
    }

    /// Receive exactly `size` raw bytes into `writer`. Bytes already
    /// pulled into the parse buffer are consumed first.
    pub fn recv_exact<W: Write>(&mut self, writer: &mut W, size: u64) -> Result<(), ClientError> {
        let mut remaining = size;

        if !self.buf.is_empty() {
            let take = (self.buf.len() as u64).min(remaining) as usize;
            writer
                .write_all(&self.buf[..take])
                .map_err(|e| ClientError::IoError("failed to write content".into(), e.to_string()))?;
            self.buf.drain(..take);
            remaining -= take as u64;
        }

        let mut chunk = vec![0u8; CHUNK_SIZE - 1];
        while remaining > 0 {
            let want = remaining.min((CHUNK_SIZE - 1) as u64) as usize;
            self.arm_read()?;
            let n = self.stream.read(&mut chunk[..want]).map_err(|e| {
                if is_timeout(&e) {
                    ClientError::TimeoutError("receiving content".into())
                } else {
                    ClientError::IoError("failed to receive content".into(), e.to_string())
                }
            })?;
            if n == 0 {
                return Err(ClientError::IoError(
                    "connection closed mid-stream".into(),
                    String::new(),
                ));
            }
            writer
                .write_all(&chunk[..n])
                .map_err(|e| ClientError::IoError("failed to write content".into(), e.to_string()))?;
            remaining -= n as u64;
        }
        Ok(())
    }
}
