use super::{ParseError, strip_prefix};

pub const SIGNAL_QUALITY_PREFIX: &str = "+CSQ:";

/// Parse a `+CSQ:<n>` response into the signal bar count (0 = no signal).
pub fn parse_signal_quality(line: &[u8]) -> Result<u8, ParseError> {
    let value = strip_prefix(line, SIGNAL_QUALITY_PREFIX)?.trim();
    value
        .parse()
        .map_err(|_| ParseError::InvalidNumber(value.to_string()))
}
