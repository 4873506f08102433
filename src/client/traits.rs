// ABOUTME: Core SBD client traits using native async functions
// ABOUTME: Separates message exchange from network diagnostics so either can be mocked

use crate::client::error::SbdResult;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Message exchange with the Iridium gateway
///
/// Each call is one mailbox dialog; implementations must not run two
/// dialogs against the same modem concurrently.
pub trait SbdTransceiver {
    /// Send a text message (`AT+SBDWT`) and run a mailbox session.
    async fn send_text(&self, text: &str) -> SbdResult<()>;

    /// Send a binary message (`AT+SBDWB`) and run a mailbox session.
    async fn send_binary(&self, payload: &[u8]) -> SbdResult<()>;

    /// Queue a binary message to be retried until it is delivered.
    async fn send_binary_persistent(&self, payload: Bytes) -> SbdResult<()>;

    /// Download the mobile-terminated message announced by the last session.
    async fn download_message(&self) -> SbdResult<Bytes>;
}

/// Link diagnostics
pub trait NetworkInfo {
    /// Current signal strength in bars, 0 meaning no signal.
    async fn signal_quality(&self) -> SbdResult<u8>;

    /// Wait until the signal is non-zero, failing after `limit`.
    async fn wait_for_network(&self, limit: Duration) -> SbdResult<u8>;

    /// Iridium network time.
    async fn system_time(&self) -> SbdResult<DateTime<Utc>>;
}
