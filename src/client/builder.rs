// ABOUTME: Modem options and builder for opening an SBD modem over any async byte stream
// ABOUTME: Collects timeouts, queue sizes, retry policy and event sinks before the handshake

use crate::client::error::SbdResult;
use crate::client::events::EventSink;
use crate::client::modem::Modem;
use crate::client::persistent::RetryPolicy;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// Configuration for an SBD modem connection
///
/// # Example
///
/// ```rust,no_run
/// use rockblock::client::{ModemOptions, RetryPolicy};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// // Any AsyncRead + AsyncWrite stream will do, typically a serial port
/// let (port, _device) = tokio::io::duplex(1024);
/// let modem = ModemOptions::new()
///     .with_response_timeout(Duration::from_secs(60))
///     .with_retry_policy(RetryPolicy::new(Duration::from_secs(30)))
///     .open(port)
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ModemOptions {
    /// Longest wait for any single expected response line (default: 5 minutes)
    pub response_timeout: Duration,

    /// Interval between signal checks in `wait_for_network` (default: 5 seconds)
    pub network_poll_interval: Duration,

    /// Capacity of the persistent send queue (default: 1024)
    ///
    /// Enqueueing beyond capacity waits for space.
    pub queue_capacity: usize,

    /// Capacity of the reader → dialog line channel (default: 16)
    pub line_buffer: usize,

    /// Capacity of the dialog → writer channel (default: 16)
    pub write_buffer: usize,

    /// Retry behaviour of the persistent sender
    pub retry: RetryPolicy,

    pub(crate) sinks: Vec<Arc<dyn EventSink>>,
}

impl Default for ModemOptions {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(5 * 60),
            network_poll_interval: Duration::from_secs(5),
            queue_capacity: 1024,
            line_buffer: 16,
            write_buffer: 16,
            retry: RetryPolicy::default(),
            sinks: Vec::new(),
        }
    }
}

impl std::fmt::Debug for ModemOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModemOptions")
            .field("response_timeout", &self.response_timeout)
            .field("network_poll_interval", &self.network_poll_interval)
            .field("queue_capacity", &self.queue_capacity)
            .field("line_buffer", &self.line_buffer)
            .field("write_buffer", &self.write_buffer)
            .field("retry", &self.retry)
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl ModemOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn with_network_poll_interval(mut self, interval: Duration) -> Self {
        self.network_poll_interval = interval;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Register a sink before the modem starts, so no event can be missed.
    pub fn with_event_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Start the I/O tasks on `transport` and perform the `AT` / `AT&K0` handshake.
    pub async fn open<T>(self, transport: T) -> SbdResult<Modem>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        Modem::start(transport, self).await
    }
}
