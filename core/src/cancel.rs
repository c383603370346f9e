//! Cooperative cancellation and per-chapter deadlines.
//!
//! A [`CancelToken`] is shared across every chapter of a batch; a [`RunGuard`]
//! pairs it with the deadline of a single chapter run. Long loops call
//! [`RunGuard::check`] at coarse intervals and bail out with an [`AlignError`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::alignment::AlignError;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct RunGuard {
    token: CancelToken,
    start: Instant,
    timeout: Option<Duration>,
}

impl RunGuard {
    pub fn new(token: CancelToken, timeout_seconds: Option<u32>) -> Self {
        Self {
            token,
            start: Instant::now(),
            timeout: timeout_seconds.map(|secs| Duration::from_secs(secs as u64)),
        }
    }

    /// A guard that never trips.
    pub fn unbounded() -> Self {
        Self::new(CancelToken::new(), None)
    }

    pub fn with_timeout(token: CancelToken, timeout: Duration) -> Self {
        Self {
            token,
            start: Instant::now(),
            timeout: Some(timeout),
        }
    }

    pub fn check(&self) -> Result<(), AlignError> {
        if self.token.is_cancelled() {
            return Err(AlignError::Cancelled);
        }
        if let Some(timeout) = self.timeout {
            if self.start.elapsed() >= timeout {
                return Err(AlignError::TimedOut {
                    seconds: timeout.as_secs(),
                });
            }
        }
        Ok(())
    }
}
