// ABOUTME: AT command and response datatypes for the Iridium 9602/9603 SBD command set
// ABOUTME: Stateless decoders for session-status, signal-quality and system-time responses

mod command;
mod session_status;
mod signal_quality;
mod system_time;

pub use command::AtCommand;
pub use session_status::{
    MoStatus, MtStatus, SESSION_STATUS_PREFIX, SessionStatus, WriteStatus,
};
pub use signal_quality::{SIGNAL_QUALITY_PREFIX, parse_signal_quality};
pub use system_time::{SYSTEM_TIME_PREFIX, TICK_MILLIS, iridium_epoch, parse_system_time};

use thiserror::Error;

/// Failure to decode a structured response line.
///
/// Parsers fail closed: a line producing one of these errors never updates
/// the modem state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line does not start with the response prefix for this decoder
    #[error("expected response prefix {expected:?}")]
    WrongPrefix { expected: &'static str },

    /// The response carried the wrong number of comma separated fields
    #[error("expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },

    /// A field could not be read as an integer
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
}

/// Returns the remainder of `line` after `prefix`, as text.
pub(crate) fn strip_prefix<'a>(
    line: &'a [u8],
    prefix: &'static str,
) -> Result<&'a str, ParseError> {
    let rest = line
        .strip_prefix(prefix.as_bytes())
        .ok_or(ParseError::WrongPrefix { expected: prefix })?;
    std::str::from_utf8(rest)
        .map_err(|_| ParseError::InvalidNumber(String::from_utf8_lossy(rest).into_owned()))
}
