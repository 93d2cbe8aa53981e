//! Channel-backed async logger.
//!
//! Log calls push records into an mpsc channel; a background task formats
//! and appends them to the log file so request tasks never block on disk.
//! Dropping the last handle (or calling `shutdown`) flushes and stops the
//! writer task.

use crate::err::Result;
use crate::global_var::{DEBUG_MODE, LOGGER_CELL};
use chrono::{DateTime, Utc};
use std::fmt;
use std::ops::Deref;
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO ",
            LogLevel::Warn => "\x1b[33mWARN \x1b[0m",
            LogLevel::Error => "\x1b[31mERROR\x1b[0m",
        };
        write!(f, "{}", s)
    }
}

/// A cheap cloneable sender handle into the logger task.
#[derive(Clone, Debug)]
pub struct AsyncLogger {
    tx: mpsc::Sender<LogRecord>,
}

impl AsyncLogger {
    fn log<S: Into<String>>(&self, level: LogLevel, msg: S) {
        // try_send drops records instead of blocking when the channel is
        // saturated; losing a log line beats stalling a transfer.
        if let Err(err) = self.tx.try_send(LogRecord::new(level, msg.into())) {
            eprintln!("Failed to send log message: {}", err);
        }
    }

    /// Request the logger task to flush and shut down.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(LogRecord::Shutdown).await;
    }

    pub fn trace<S: Into<String>>(&self, msg: S) {
        self.log(LogLevel::Trace, msg);
    }
    pub fn debug<S: Into<String>>(&self, msg: S) {
        if *DEBUG_MODE {
            self.log(LogLevel::Debug, msg);
        }
    }
    pub fn info<S: Into<String>>(&self, msg: S) {
        self.log(LogLevel::Info, msg);
    }
    pub fn warn<S: Into<String>>(&self, msg: S) {
        self.log(LogLevel::Warn, msg);
    }
    pub fn error<S: Into<String>>(&self, msg: S) {
        self.log(LogLevel::Error, msg);
    }
}

#[derive(Debug)]
enum LogRecord {
    Message {
        level: LogLevel,
        msg: String,
        ts_millis: i64,
    },
    Shutdown,
}

impl LogRecord {
    fn new(level: LogLevel, msg: String) -> Self {
        Self::Message {
            level,
            msg,
            ts_millis: Utc::now().timestamp_millis(),
        }
    }

    fn format_line(&self) -> Option<String> {
        match self {
            LogRecord::Message {
                level,
                msg,
                ts_millis,
            } => {
                // Format: 2025-10-08T21:22:33.123Z [LEVEL] message\n
                let dt = DateTime::from_timestamp_millis(*ts_millis).unwrap_or_else(Utc::now);
                let time_stamp = dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
                Some(format!("{} [{}] {}\n", time_stamp, level, msg))
            }
            LogRecord::Shutdown => None,
        }
    }
}

/// Initialize a file-based async logger. Returns the logger handle and the
/// background task handle. Dropping the last handle closes the channel and
/// lets the task flush and exit.
pub async fn init_file_logger<P: AsRef<Path>>(path: P) -> Result<(AsyncLogger, JoinHandle<()>)> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.as_ref())
        .await?;

    let (tx, mut rx) = mpsc::channel::<LogRecord>(1024);

    let task = tokio::spawn(async move {
        let mut writer = BufWriter::new(file);
        while let Some(rec) = rx.recv().await {
            match rec.format_line() {
                Some(line) => {
                    let _ = writer.write_all(line.as_bytes()).await;
                    let _ = writer.flush().await;
                }
                None => break,
            }
        }
        let _ = writer.flush().await;
    });

    Ok((AsyncLogger { tx }, task))
}

pub struct Logger;

impl Deref for Logger {
    type Target = AsyncLogger;
    fn deref(&self) -> &Self::Target {
        if let Some(l) = LOGGER_CELL.get() {
            return l;
        }
        #[cfg(test)]
        {
            // In test builds, lazily install a no-op logger so unit tests can
            // call LOGGER.*() without initializing the real one.
            let _ = LOGGER_CELL.set(test_fallback_logger());
            return LOGGER_CELL
                .get()
                .expect("LOGGER_CELL should be set by test fallback");
        }
        LOGGER_CELL.get().expect("LOGGER_CELL should be set")
    }
}

fn noop_logger() -> AsyncLogger {
    // Keep the receiver alive without a runtime by leaking it; the channel
    // simply fills up and further records are dropped.
    let (tx, rx) = mpsc::channel::<LogRecord>(1024);
    let _ = Box::leak(Box::new(rx));
    AsyncLogger { tx }
}

/// Install a logger that drops every record. For integration tests and
/// embedders that never initialize the file logger. Does nothing when a
/// logger is already installed.
pub fn install_noop_logger() {
    let _ = LOGGER_CELL.set(noop_logger());
}

#[cfg(test)]
fn test_fallback_logger() -> AsyncLogger {
    noop_logger()
}
