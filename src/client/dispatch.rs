// ABOUTME: Response dispatcher that pairs outbound AT commands with the lines they produce
// ABOUTME: Blocks a dialog until a matching line arrives and records lines inside a capture window

use crate::client::error::{SbdError, SbdResult};
use crate::datatypes::AtCommand;
use bytes::Bytes;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// How a response line is compared with the awaited target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    Prefix,
    Suffix,
}

impl MatchMode {
    pub fn matches(self, line: &[u8], target: &[u8]) -> bool {
        match self {
            MatchMode::Exact => line == target,
            MatchMode::Prefix => line.starts_with(target),
            MatchMode::Suffix => line.ends_with(target),
        }
    }
}

#[derive(Debug)]
enum Capture {
    Idle,
    Capturing(Vec<Bytes>),
}

/// The dialog side of the serial link.
///
/// Holds the only receiver of response lines and a handle to the write
/// queue. Exclusive access to a `Dispatcher` is what allows one dialog at a
/// time to attribute responses to the commands it sent.
#[derive(Debug)]
pub(crate) struct Dispatcher {
    lines: mpsc::Receiver<Bytes>,
    writes: mpsc::Sender<Bytes>,
    capture: Capture,
    timeout: Duration,
}

impl Dispatcher {
    pub(crate) fn new(
        lines: mpsc::Receiver<Bytes>,
        writes: mpsc::Sender<Bytes>,
        timeout: Duration,
    ) -> Self {
        Dispatcher {
            lines,
            writes,
            capture: Capture::Idle,
            timeout,
        }
    }

    /// Queue raw bytes for the command writer.
    pub(crate) async fn write(&self, bytes: Bytes) -> SbdResult<()> {
        self.writes
            .send(bytes)
            .await
            .map_err(|_| SbdError::ConnectionClosed)
    }

    /// Send a command, first dropping any lines left over from an earlier
    /// dialog that gave up waiting.
    pub(crate) async fn command(&mut self, command: &AtCommand<'_>) -> SbdResult<()> {
        while let Ok(stale) = self.lines.try_recv() {
            debug!("discarded: {}", String::from_utf8_lossy(&stale));
        }
        debug!("sent: {command}");
        self.write(command.to_bytes()).await
    }

    /// Wait for the first line accepted by `accept`, returning it.
    ///
    /// Every line consumed while waiting is appended to the capture window
    /// when one is open. Fails with [`SbdError::Timeout`] if nothing matches
    /// within the response timeout.
    pub(crate) async fn wait_until<F>(&mut self, mut accept: F) -> SbdResult<Bytes>
    where
        F: FnMut(&[u8]) -> bool + Send,
    {
        let lines = &mut self.lines;
        let capture = &mut self.capture;

        let waiting = async move {
            while let Some(line) = lines.recv().await {
                if let Capture::Capturing(window) = capture {
                    window.push(line.clone());
                }
                if accept(&line) {
                    return Ok(line);
                }
            }
            Err(SbdError::ConnectionClosed)
        };

        tokio::time::timeout(self.timeout, waiting)
            .await
            .map_err(|_| SbdError::Timeout)?
    }

    pub(crate) async fn wait_for(&mut self, target: &str, mode: MatchMode) -> SbdResult<Bytes> {
        self.wait_until(|line| mode.matches(line, target.as_bytes()))
            .await
    }

    pub(crate) async fn wait_exact(&mut self, target: &str) -> SbdResult<Bytes> {
        self.wait_for(target, MatchMode::Exact).await
    }

    pub(crate) async fn wait_prefix(&mut self, target: &str) -> SbdResult<Bytes> {
        self.wait_for(target, MatchMode::Prefix).await
    }

    pub(crate) async fn wait_suffix(&mut self, target: &str) -> SbdResult<Bytes> {
        self.wait_for(target, MatchMode::Suffix).await
    }

    /// Start recording every consumed line, discarding any earlier window.
    pub(crate) fn begin_capture(&mut self) {
        self.capture = Capture::Capturing(Vec::new());
    }

    /// Stop recording and hand back the lines seen since [`begin_capture`].
    ///
    /// [`begin_capture`]: Dispatcher::begin_capture
    pub(crate) fn end_capture(&mut self) -> Vec<Bytes> {
        match std::mem::replace(&mut self.capture, Capture::Idle) {
            Capture::Capturing(window) => window,
            Capture::Idle => Vec::new(),
        }
    }
}
