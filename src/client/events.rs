// ABOUTME: Message events raised by the SBD client and the sinks that consume them
// ABOUTME: Supports any number of registered sinks; sink failures are logged and not retried

use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tracing::warn;

/// Something that happened to a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageEvent {
    /// A persistently queued payload was accepted by the gateway
    ConfirmSent(Bytes),
    /// A mobile-terminated payload was downloaded from the mailbox
    Received(Bytes),
}

impl MessageEvent {
    pub fn payload(&self) -> &Bytes {
        match self {
            MessageEvent::ConfirmSent(payload) | MessageEvent::Received(payload) => payload,
        }
    }
}

/// Consumer of [`MessageEvent`]s.
///
/// Called synchronously from the task that produced the event, while the
/// modem is still held by that dialog, so implementations should return
/// quickly. Any `Fn(&MessageEvent) -> Result<(), Error>` closure is a sink.
///
/// # Deadlocks
///
/// Sinks run with the dialog lock and the sink registry's read lock held.
/// A sink must not call back into the [`Modem`](crate::Modem): `send_text`,
/// `add_event_sink` and every other dialog will wait on those locks forever.
/// Hand events to another task instead, e.g. through a [`ChannelSink`].
pub trait EventSink: Send + Sync {
    fn handle(&self, event: &MessageEvent) -> Result<(), crate::Error>;
}

impl<F> EventSink for F
where
    F: Fn(&MessageEvent) -> Result<(), crate::Error> + Send + Sync,
{
    fn handle(&self, event: &MessageEvent) -> Result<(), crate::Error> {
        self(event)
    }
}

/// Forwards events into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<MessageEvent>,
}

impl ChannelSink {
    /// Create a sink together with the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MessageEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelSink { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn handle(&self, event: &MessageEvent) -> Result<(), crate::Error> {
        self.tx
            .send(event.clone())
            .map_err(|_| "event receiver dropped".into())
    }
}

/// The set of registered sinks.
#[derive(Default)]
pub(crate) struct EventSinks {
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
}

impl EventSinks {
    pub(crate) fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        EventSinks {
            sinks: RwLock::new(sinks),
        }
    }

    pub(crate) async fn add(&self, sink: Arc<dyn EventSink>) {
        self.sinks.write().await.push(sink);
    }

    /// Deliver `event` to every sink, logging any that fail.
    pub(crate) async fn dispatch(&self, event: MessageEvent) {
        for sink in self.sinks.read().await.iter() {
            if let Err(e) = sink.handle(&event) {
                warn!("Message event handler failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_dispatch_reaches_every_sink() {
        let (channel, mut rx) = ChannelSink::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let closure = move |_: &MessageEvent| -> Result<(), crate::Error> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        let sinks = EventSinks::new(vec![Arc::new(channel) as Arc<dyn EventSink>]);
        sinks.add(Arc::new(closure)).await;
        sinks
            .dispatch(MessageEvent::Received(Bytes::from_static(b"hi")))
            .await;

        assert_eq!(
            rx.recv().await,
            Some(MessageEvent::Received(Bytes::from_static(b"hi")))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_stop_others() {
        let failing = |_: &MessageEvent| -> Result<(), crate::Error> { Err("nope".into()) };
        let (channel, mut rx) = ChannelSink::new();

        let sinks = EventSinks::new(vec![
            Arc::new(failing) as Arc<dyn EventSink>,
            Arc::new(channel) as Arc<dyn EventSink>,
        ]);
        sinks
            .dispatch(MessageEvent::ConfirmSent(Bytes::from_static(b"x")))
            .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.payload().as_ref(), b"x");
    }

    #[tokio::test]
    async fn test_no_sinks_is_fine() {
        EventSinks::default()
            .dispatch(MessageEvent::Received(Bytes::new()))
            .await;
    }
}
