use super::{ParseError, strip_prefix};
use num_enum::TryFromPrimitive;
use std::fmt;

/// Prefix shared by the `+SBDI:` and `+SBDIX:` session responses.
pub const SESSION_STATUS_PREFIX: &str = "+SBDI";

const FIELD_COUNT: usize = 6;

/// Outcome of the mobile-originated half of an `AT+SBDI` session.
#[derive(TryFromPrimitive)]
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MoStatus {
    /// No SBD message to send from the modem
    NoMessage = 0,

    /// SBD message successfully sent to the gateway
    Success = 1,

    /// An error occurred while attempting to send
    Failure = 2,
}

/// Outcome of the mobile-terminated half of an `AT+SBDI` session.
#[derive(TryFromPrimitive)]
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MtStatus {
    /// No SBD message waiting at the gateway
    NoMessage = 0,

    /// A message was retrieved into the MT buffer and is waiting for `AT+SBDRB`
    Received = 1,

    /// An error occurred while checking the mailbox
    Failure = 2,
}

/// Result code printed by the modem after an `AT+SBDWB` binary transfer.
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WriteStatus {
    /// Message written to the MO buffer
    Accepted = 0,

    /// Not enough bytes arrived within the transfer window
    TransferTimeout = 1,

    /// The appended checksum did not match
    ChecksumMismatch = 2,

    /// The announced length was outside the permitted range
    InvalidSize = 3,
}

impl WriteStatus {
    /// Decode a response line consisting of a single write result digit.
    pub fn from_line(line: &[u8]) -> Option<Self> {
        match line {
            [digit @ b'0'..=b'9'] => Self::try_from(digit - b'0').ok(),
            _ => None,
        }
    }
}

/// The six counters reported by `+SBDI:` / `+SBDIX:`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub mo_status: u16,
    pub momsn: u16,
    pub mt_status: u16,
    pub mtmsn: u16,
    pub mt_length: u16,
    pub mt_queued: u16,
}

impl SessionStatus {
    /// Parse a status line such as `+SBDI: 1, 4, 1, 2, 6, 9`.
    pub fn parse(line: &[u8]) -> Result<Self, ParseError> {
        let rest = strip_prefix(line, SESSION_STATUS_PREFIX)?;
        let (_, fields) = rest.split_once(':').ok_or(ParseError::WrongPrefix {
            expected: SESSION_STATUS_PREFIX,
        })?;

        let parts: Vec<&str> = fields.split(',').collect();
        if parts.len() != FIELD_COUNT {
            return Err(ParseError::FieldCount {
                expected: FIELD_COUNT,
                actual: parts.len(),
            });
        }

        let mut values = [0u16; FIELD_COUNT];
        for (value, part) in values.iter_mut().zip(parts) {
            let part = part.trim();
            *value = part
                .parse()
                .map_err(|_| ParseError::InvalidNumber(part.to_string()))?;
        }

        let [mo_status, momsn, mt_status, mtmsn, mt_length, mt_queued] = values;
        Ok(SessionStatus {
            mo_status,
            momsn,
            mt_status,
            mtmsn,
            mt_length,
            mt_queued,
        })
    }

    /// True only when the gateway acknowledged the outbound message.
    pub fn is_sent(&self) -> bool {
        self.mo_status == MoStatus::Success as u16
    }

    /// True when a mobile-terminated message is waiting in the MT buffer.
    pub fn has_mail(&self) -> bool {
        self.mt_status == MtStatus::Received as u16
    }

    pub fn mo(&self) -> Option<MoStatus> {
        MoStatus::try_from(self.mo_status).ok()
    }

    pub fn mt(&self) -> Option<MtStatus> {
        MtStatus::try_from(self.mt_status).ok()
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MO status {} (MOMSN {}), MT status {} (MTMSN {}, length {}, queued {})",
            self.mo_status, self.momsn, self.mt_status, self.mtmsn, self.mt_length, self.mt_queued
        )
    }
}
