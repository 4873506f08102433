use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// Commands issued to the modem.
///
/// `Display` renders the command as the modem echoes it back; [`to_bytes`]
/// appends the carriage return that submits it.
///
/// [`to_bytes`]: AtCommand::to_bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AtCommand<'a> {
    /// `AT` handshake
    Attention,
    /// `AT&K0`, disable RTS/CTS flow control
    DisableFlowControl,
    /// `AT+SBDD0`, clear the MO buffer
    ClearBuffers,
    /// `AT+SBDWT=<text>`, stage a text message
    WriteText(&'a str),
    /// `AT+SBDWB=<len>`, announce a binary message of `len` bytes
    WriteBinary(usize),
    /// `AT+SBDI`, start a mailbox session
    InitiateSession,
    /// `AT+CSQ`, query signal quality
    SignalQuality,
    /// `AT+SBDRB`, read the MT buffer as a binary frame
    ReadBinary,
    /// `AT-MSSTM`, query Iridium system time
    SystemTime,
}

impl AtCommand<'_> {
    /// Encode the command including its terminating carriage return.
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_slice(self.to_string().as_bytes());
        buf.put_u8(b'\r');
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode(&mut buf);
        buf.freeze()
    }
}

impl fmt::Display for AtCommand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtCommand::Attention => f.write_str("AT"),
            AtCommand::DisableFlowControl => f.write_str("AT&K0"),
            AtCommand::ClearBuffers => f.write_str("AT+SBDD0"),
            AtCommand::WriteText(text) => write!(f, "AT+SBDWT={text}"),
            AtCommand::WriteBinary(len) => write!(f, "AT+SBDWB={len}"),
            AtCommand::InitiateSession => f.write_str("AT+SBDI"),
            AtCommand::SignalQuality => f.write_str("AT+CSQ"),
            AtCommand::ReadBinary => f.write_str("AT+SBDRB"),
            AtCommand::SystemTime => f.write_str("AT-MSSTM"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands_are_cr_terminated() {
        assert_eq!(AtCommand::Attention.to_bytes(), Bytes::from_static(b"AT\r"));
        assert_eq!(
            AtCommand::WriteText("TEST").to_bytes(),
            Bytes::from_static(b"AT+SBDWT=TEST\r")
        );
        assert_eq!(
            AtCommand::WriteBinary(340).to_bytes(),
            Bytes::from_static(b"AT+SBDWB=340\r")
        );
    }

    #[test]
    fn test_echo_has_no_terminator() {
        assert_eq!(AtCommand::ReadBinary.to_string(), "AT+SBDRB");
        assert_eq!(AtCommand::SystemTime.to_string(), "AT-MSSTM");
    }
}
