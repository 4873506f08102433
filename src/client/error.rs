// ABOUTME: SBD client error types covering protocol, integrity and delivery failures
// ABOUTME: Structured error reporting with automatic conversion from parser and codec errors

use crate::codec::CodecError;
use crate::datatypes::{ParseError, SessionStatus, WriteStatus};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Comprehensive error type for SBD modem operations
///
/// Every session-level call surfaces its failure through this type. The
/// persistent sender is the exception: it retries internally and never
/// reports send errors to whoever queued the payload.
#[derive(Debug, Error)]
pub enum SbdError {
    /// A structured response line was malformed
    #[error("Malformed response: {0}")]
    Parse(#[from] ParseError),

    /// A downloaded frame failed length or checksum validation
    #[error("Integrity error: {0}")]
    Integrity(#[from] CodecError),

    /// The dialog completed but the gateway did not accept the message
    #[error("Send message error: {0}")]
    SessionFailed(SessionStatus),

    /// The modem refused the binary transfer after `READY`
    #[error("Binary write rejected: {0:?}")]
    WriteRejected(WriteStatus),

    /// A download was requested but the last session reported no waiting message
    #[error("No messages waiting")]
    NoMessageWaiting,

    /// Payload rejected before anything was sent to the modem
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// No matching response arrived in time
    #[error("Operation timeout")]
    Timeout,

    /// The reader or writer task is gone
    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    /// Network time could not be read; `fallback` is the local clock
    #[error("Network time unavailable: {source}")]
    TimeUnavailable {
        fallback: DateTime<Utc>,
        source: Box<SbdError>,
    },
}

impl SbdError {
    /// Best-effort time carried by [`SbdError::TimeUnavailable`].
    pub fn fallback_time(&self) -> Option<DateTime<Utc>> {
        match self {
            SbdError::TimeUnavailable { fallback, .. } => Some(*fallback),
            _ => None,
        }
    }
}

/// Result type alias for SBD operations
pub type SbdResult<T> = Result<T, SbdError>;
