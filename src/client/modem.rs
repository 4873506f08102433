// ABOUTME: Public SBD modem handle owning the reader, writer and persistent sender tasks
// ABOUTME: Serializes session dialogs behind a single dialog token shared by all clones

use crate::client::builder::ModemOptions;
use crate::client::dispatch::Dispatcher;
use crate::client::error::{SbdError, SbdResult};
use crate::client::events::{EventSink, EventSinks};
use crate::client::persistent::run_persistent_sender;
use crate::client::session::{Session, check_binary_payload};
use crate::client::traits::{NetworkInfo, SbdTransceiver};
use crate::connection::{CommandWriter, LineReader, ModemState, run_reader, run_writer};
use crate::datatypes::SessionStatus;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, mpsc, watch};
use tracing::debug;

/// Handle to an Iridium SBD modem
///
/// Cloning is cheap; all clones drive the same modem. Only one dialog
/// (send, download, signal or time query) runs at a time, and persistent
/// sends take their turn with direct calls.
#[derive(Clone)]
pub struct Modem {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    /// The session-dialog token
    dialog: Mutex<Dispatcher>,
    state: Arc<ModemState>,
    pub(crate) sinks: EventSinks,
    outbox: mpsc::Sender<Bytes>,
    pub(crate) options: ModemOptions,
}

impl Modem {
    /// Open a modem with default options.
    pub async fn open<T>(transport: T) -> SbdResult<Modem>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        ModemOptions::default().open(transport).await
    }

    pub(crate) async fn start<T>(transport: T, mut options: ModemOptions) -> SbdResult<Modem>
    where
        T: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(transport);
        let state = Arc::new(ModemState::new());

        let (line_tx, line_rx) = mpsc::channel(options.line_buffer);
        let (write_tx, write_rx) = mpsc::channel(options.write_buffer);
        tokio::spawn(run_reader(LineReader::new(read_half), state.clone(), line_tx));
        tokio::spawn(run_writer(CommandWriter::new(write_half), write_rx));

        let mut dispatcher = Dispatcher::new(line_rx, write_tx, options.response_timeout);
        let sinks = EventSinks::new(std::mem::take(&mut options.sinks));
        Session {
            io: &mut dispatcher,
            state: &state,
            sinks: &sinks,
        }
        .handshake()
        .await?;
        debug!("Modem handshake complete");

        let (outbox, queue) = mpsc::channel(options.queue_capacity);
        let inner = Arc::new(Inner {
            dialog: Mutex::new(dispatcher),
            state,
            sinks,
            outbox,
            options,
        });
        tokio::spawn(run_persistent_sender(Arc::downgrade(&inner), queue));

        Ok(Modem { inner })
    }

    /// A session over `io`, which must come from the locked dialog token.
    fn session<'a>(&'a self, io: &'a mut Dispatcher) -> Session<'a> {
        Session {
            io,
            state: &self.inner.state,
            sinks: &self.inner.sinks,
        }
    }

    /// Send a text message and run a mailbox session.
    ///
    /// Succeeds only when the gateway reports MO status 1. A message waiting
    /// in the mailbox is downloaded afterwards and delivered to the event
    /// sinks as [`MessageEvent::Received`](crate::client::MessageEvent::Received).
    pub async fn send_text(&self, text: &str) -> SbdResult<()> {
        let mut io = self.inner.dialog.lock().await;
        self.session(&mut io).send_text(text).await
    }

    /// Send a binary message (1 to 340 bytes) and run a mailbox session.
    pub async fn send_binary(&self, payload: &[u8]) -> SbdResult<()> {
        let mut io = self.inner.dialog.lock().await;
        self.session(&mut io).send_binary(payload).await
    }

    /// Queue a binary message for delivery by the persistent sender.
    ///
    /// Returns once the message is queued, waiting for space if the queue is
    /// full. Delivery is retried per the configured [`RetryPolicy`] and
    /// confirmed with [`MessageEvent::ConfirmSent`]; send errors are never
    /// reported to the caller.
    ///
    /// [`RetryPolicy`]: crate::client::RetryPolicy
    /// [`MessageEvent::ConfirmSent`]: crate::client::MessageEvent::ConfirmSent
    pub async fn send_binary_persistent(&self, payload: impl Into<Bytes>) -> SbdResult<()> {
        let payload = payload.into();
        check_binary_payload(&payload)?;
        self.inner
            .outbox
            .send(payload)
            .await
            .map_err(|_| SbdError::ConnectionClosed)
    }

    /// Download the message announced by the most recent session.
    pub async fn download_message(&self) -> SbdResult<Bytes> {
        let mut io = self.inner.dialog.lock().await;
        self.session(&mut io).download_waiting().await
    }

    /// Query the current signal strength (0 to 5 bars).
    pub async fn signal_quality(&self) -> SbdResult<u8> {
        let mut io = self.inner.dialog.lock().await;
        self.session(&mut io).signal_quality().await
    }

    /// Wait until the modem reports a non-zero signal, polling at the
    /// configured interval, or fail with [`SbdError::Timeout`] after `limit`.
    pub async fn wait_for_network(&self, limit: Duration) -> SbdResult<u8> {
        let poll = self.inner.options.network_poll_interval;
        let mut io = self.inner.dialog.lock().await;
        self.session(&mut io).wait_for_network(limit, poll).await
    }

    /// Read Iridium network time.
    ///
    /// On failure the error still carries a best-effort time, see
    /// [`SbdError::fallback_time`].
    pub async fn system_time(&self) -> SbdResult<DateTime<Utc>> {
        let mut io = self.inner.dialog.lock().await;
        self.session(&mut io).system_time().await
    }

    /// Register another event sink.
    pub async fn add_event_sink(&self, sink: impl EventSink + 'static) {
        self.inner.sinks.add(Arc::new(sink)).await;
    }

    /// The last session status reported by the modem.
    pub fn session_status(&self) -> SessionStatus {
        *self.inner.state.session_status.borrow()
    }

    /// Follow session status updates as the modem reports them.
    pub fn subscribe_session_status(&self) -> watch::Receiver<SessionStatus> {
        self.inner.state.session_status.subscribe()
    }

    /// The last network time decoded from a `-MSSTM` response, if any.
    pub fn last_system_time(&self) -> Option<DateTime<Utc>> {
        *self.inner.state.system_time.borrow()
    }
}

impl SbdTransceiver for Modem {
    async fn send_text(&self, text: &str) -> SbdResult<()> {
        Modem::send_text(self, text).await
    }

    async fn send_binary(&self, payload: &[u8]) -> SbdResult<()> {
        Modem::send_binary(self, payload).await
    }

    async fn send_binary_persistent(&self, payload: Bytes) -> SbdResult<()> {
        Modem::send_binary_persistent(self, payload).await
    }

    async fn download_message(&self) -> SbdResult<Bytes> {
        Modem::download_message(self).await
    }
}

impl NetworkInfo for Modem {
    async fn signal_quality(&self) -> SbdResult<u8> {
        Modem::signal_quality(self).await
    }

    async fn wait_for_network(&self, limit: Duration) -> SbdResult<u8> {
        Modem::wait_for_network(self, limit).await
    }

    async fn system_time(&self) -> SbdResult<DateTime<Utc>> {
        Modem::system_time(self).await
    }
}
