use std::time::{Duration, Instant};

/// Cancellation flag for one RPC, derived from the caller's deadline.
///
/// Streaming loops check it between chunks and blocking reads bound their
/// waits by `remaining()`, so cancellation is observed promptly instead of
/// relying on the transport to abort a syscall.
#[derive(Clone, Copy, Debug)]
pub struct CancelToken {
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn unbounded() -> Self {
        Self { deadline: None }
    }

    /// `ms == 0` means no deadline.
    pub fn with_deadline_ms(ms: u64) -> Self {
        if ms == 0 {
            Self::unbounded()
        } else {
            Self {
                deadline: Some(Instant::now() + Duration::from_millis(ms)),
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self.deadline {
            Some(d) => Instant::now() >= d,
            None => false,
        }
    }

    /// Time left before the deadline; `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }
}
