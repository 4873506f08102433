// ABOUTME: Persistent sender that retries queued binary messages until the gateway accepts them
// ABOUTME: Configurable backoff and attempt cap; defaults retry immediately and forever

use crate::client::error::SbdError;
use crate::client::events::MessageEvent;
use crate::client::modem::{Inner, Modem};
use bytes::Bytes;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Retry behaviour for persistently queued messages.
///
/// # Example
///
/// ```rust
/// use rockblock::client::RetryPolicy;
/// use std::time::Duration;
///
/// // Default: retry immediately, never give up
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.max_attempts, None);
///
/// // Wait a minute between attempts and drop a message after 30 tries
/// let policy = RetryPolicy::new(Duration::from_secs(60)).with_max_attempts(30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay between a failed attempt and the next one (default: none)
    pub backoff: Duration,

    /// Attempts before a message is dropped (default: unlimited)
    ///
    /// A dropped message is logged and never confirmed.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: Duration::ZERO,
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Create a policy waiting `backoff` between attempts, with no cap.
    pub fn new(backoff: Duration) -> Self {
        Self {
            backoff,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Whether another attempt is allowed after `attempts` failures.
    pub fn should_retry(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }
}

/// What became of one queued payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Sent,
    Dropped,
    /// The link or every `Modem` handle is gone; nothing more can be sent
    Stopped,
}

/// Worker draining the persistent queue.
///
/// Holds only a weak reference to the modem, upgraded for one attempt at a
/// time, so the worker exits once every `Modem` handle has been dropped. It
/// also exits when the serial link closes; the queue then closes and further
/// enqueues fail with [`SbdError::ConnectionClosed`].
pub(crate) async fn run_persistent_sender(modem: Weak<Inner>, mut queue: mpsc::Receiver<Bytes>) {
    while let Some(payload) = queue.recv().await {
        if deliver(&modem, payload).await == Delivery::Stopped {
            break;
        }
    }
    debug!("Persistent sender stopped");
}

async fn deliver(modem: &Weak<Inner>, payload: Bytes) -> Delivery {
    let mut attempts = 0u32;

    loop {
        let Some(inner) = modem.upgrade() else {
            return Delivery::Stopped;
        };
        let handle = Modem { inner };
        let policy = handle.inner.options.retry.clone();

        attempts += 1;
        match handle.send_binary(&payload).await {
            Ok(()) => {
                info!("Persistent message sent after {attempts} attempt(s)");
                handle
                    .inner
                    .sinks
                    .dispatch(MessageEvent::ConfirmSent(payload))
                    .await;
                return Delivery::Sent;
            }
            Err(SbdError::ConnectionClosed) => {
                error!(
                    "Link closed, abandoning {} byte message after {attempts} attempt(s)",
                    payload.len()
                );
                return Delivery::Stopped;
            }
            Err(e) => warn!("send error: {e}"),
        }
        drop(handle);

        if !policy.should_retry(attempts) {
            error!(
                "Dropping {} byte message after {attempts} failed attempts",
                payload.len()
            );
            return Delivery::Dropped;
        }
        if !policy.backoff.is_zero() {
            tokio::time::sleep(policy.backoff).await;
        }
    }
}
