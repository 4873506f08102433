use super::{ParseError, strip_prefix};
use chrono::{DateTime, TimeDelta, Utc};

pub const SYSTEM_TIME_PREFIX: &str = "-MSSTM:";

/// Length of one Iridium system time tick.
pub const TICK_MILLIS: i64 = 90;

// 2014-05-11T14:23:55Z, the current Iridium era epoch.
const IRIDIUM_EPOCH_SECS: i64 = 1_399_818_235;

/// Reference instant of the `-MSSTM` tick counter.
pub fn iridium_epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH + TimeDelta::seconds(IRIDIUM_EPOCH_SECS)
}

/// Parse a `-MSSTM:<hex ticks>` response into network time.
///
/// The tick counter rolls over roughly every 12 years and the next era epoch
/// is announced by Iridium in advance; rollover is not detected here and a
/// wrapped counter decodes relative to the 2014 epoch.
pub fn parse_system_time(line: &[u8]) -> Result<DateTime<Utc>, ParseError> {
    let value = strip_prefix(line, SYSTEM_TIME_PREFIX)?.trim();
    let ticks = u32::from_str_radix(value, 16)
        .map_err(|_| ParseError::InvalidNumber(value.to_string()))?;

    TimeDelta::try_milliseconds(i64::from(ticks) * TICK_MILLIS)
        .and_then(|elapsed| iridium_epoch().checked_add_signed(elapsed))
        .ok_or_else(|| ParseError::InvalidNumber(value.to_string()))
}
