use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::*;
use crate::Result;

/// The execution context of a single API call, carrying a cancellation
/// signal and an optional deadline.
///
/// A Context is cheap to clone; clones share the same cancellation signal.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use courier::Context;
///
/// let ctx = Context::with_timeout(Duration::from_secs(5));
/// let child = ctx.clone();
/// ctx.cancel();
/// assert!(child.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Context {
    token:    CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Returns a Context which is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Returns a Context which expires after the given duration.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Returns a Context which expires at the given instant.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token:    CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Returns a Context cancelled by the given token.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Returns a copy of this Context with a deadline no later than the
    /// given timeout from now.
    pub fn timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            token:    self.token.clone(),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    /// Cancels this Context and every clone of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns an error if the Context is already cancelled or past its
    /// deadline.
    pub fn err(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(error!(ErrorKind::Cancelled, "context cancelled"));
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Err(error!(
                ErrorKind::DeadlineExceeded,
                "context deadline exceeded"
            )),
            _ => Ok(()),
        }
    }

    /// Runs the given future to completion unless the Context is cancelled
    /// or its deadline passes first, in which case the future is dropped.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.err()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => futures::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                Err(error!(ErrorKind::Cancelled, "context cancelled"))
            }
            _ = deadline => {
                Err(error!(ErrorKind::DeadlineExceeded, "context deadline exceeded"))
            }
            res = fut => res,
        }
    }
}
