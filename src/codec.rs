// SBD Binary Codec - length and checksum framing for the modem's message buffers
//
// Binary messages written with AT+SBDWB are followed by a two byte checksum.
// Messages read back with AT+SBDRB arrive as [length:2][payload][checksum:2],
// all big-endian, interleaved with the line-oriented text of the AT dialog.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

/// Longest text accepted by `AT+SBDWT`.
pub const MAX_TEXT_LEN: usize = 120;

/// Largest mobile-originated binary message accepted by `AT+SBDWB`.
pub const MAX_MO_PAYLOAD: usize = 340;

/// Byte the line reader splits on, and the byte reassembly rejoins with.
pub const LINE_DELIMITER: u8 = b'\r';

const LENGTH_SIZE: usize = 2;
const CHECKSUM_SIZE: usize = 2;

/// Framing and integrity failures for downloaded messages
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid download response format")]
    InvalidResponse,

    #[error("frame too short: {0} bytes")]
    TooShort(usize),

    #[error("payload of {0} bytes does not fit a 16-bit length prefix")]
    PayloadTooLarge(usize),

    #[error("size mismatch: declared {declared}, payload {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("bad checksum: frame {received:04x}, computed {computed:04x}")]
    ChecksumMismatch { received: u16, computed: u16 },
}

/// Low 16 bits of the unsigned sum of `payload`.
pub fn checksum(payload: &[u8]) -> u16 {
    payload
        .iter()
        .fold(0u16, |sum, &byte| sum.wrapping_add(u16::from(byte)))
}

/// Bytes written after `READY`: the payload followed by its checksum.
pub fn encode_upload(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(payload.len() + CHECKSUM_SIZE);
    buf.put_slice(payload);
    buf.put_u16(checksum(payload));
    buf.freeze()
}

/// Build a `[length][payload][checksum]` frame as the modem sends it on `AT+SBDRB`.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, CodecError> {
    let length =
        u16::try_from(payload.len()).map_err(|_| CodecError::PayloadTooLarge(payload.len()))?;

    let mut buf = BytesMut::with_capacity(LENGTH_SIZE + payload.len() + CHECKSUM_SIZE);
    buf.put_u16(length);
    buf.put_slice(payload);
    buf.put_u16(checksum(payload));
    Ok(buf.freeze())
}

/// Validate a downloaded frame and return its payload.
pub fn decode_frame(frame: &[u8]) -> Result<Bytes, CodecError> {
    if frame.len() < LENGTH_SIZE + CHECKSUM_SIZE {
        return Err(CodecError::TooShort(frame.len()));
    }

    let mut buf = frame;
    let declared = usize::from(buf.get_u16());
    let (payload, mut trailer) = buf.split_at(buf.len() - CHECKSUM_SIZE);
    let received = trailer.get_u16();

    if declared != payload.len() {
        return Err(CodecError::LengthMismatch {
            declared,
            actual: payload.len(),
        });
    }

    let computed = checksum(payload);
    if received != computed {
        return Err(CodecError::ChecksumMismatch { received, computed });
    }

    Ok(Bytes::copy_from_slice(payload))
}

/// Rebuild the raw `AT+SBDRB` frame from the lines captured during a download.
///
/// Only the lines after the last occurrence of `echo` belong to the transfer.
/// The final line is the `OK` terminator and is dropped; the rest are joined
/// with [`LINE_DELIMITER`] to undo the reader's splitting, since the binary
/// frame may itself contain that byte.
pub fn reassemble(captured: &[Bytes], echo: &[u8]) -> Result<Bytes, CodecError> {
    let start = captured
        .iter()
        .rposition(|line| line.as_ref() == echo)
        .map_or(0, |echo_at| echo_at + 1);
    let transfer = &captured[start..];

    let Some((terminator, body)) = transfer.split_last() else {
        return Err(CodecError::InvalidResponse);
    };
    if terminator.len() < 2 {
        return Err(CodecError::InvalidResponse);
    }

    let mut frame = BytesMut::new();
    for (i, line) in body.iter().enumerate() {
        if i > 0 {
            frame.put_u8(LINE_DELIMITER);
        }
        frame.put_slice(line);
    }
    Ok(frame.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&'static [u8]]) -> Vec<Bytes> {
        raw.iter().map(|line| Bytes::from_static(line)).collect()
    }

    #[test]
    fn test_checksum_is_wrapping_sum() {
        assert_eq!(checksum(b""), 0);
        assert_eq!(checksum(b"TEST"), 0x0140);
        assert_eq!(checksum(&[0xFF; 258]), 254);
        assert_eq!(checksum(&[0xFF; 300]), 0x2AD4);
    }

    #[test]
    fn test_encode_upload_appends_big_endian_checksum() {
        assert_eq!(
            encode_upload(b"hello").as_ref(),
            &[b'h', b'e', b'l', b'l', b'o', 0x02, 0x14]
        );
    }

    #[test]
    fn test_frame_round_trip_with_delimiter_in_payload() {
        let payload = b"\x00line one\rline two\r\x7f";
        let frame = encode_frame(payload).unwrap();
        assert_eq!(decode_frame(&frame).unwrap().as_ref(), payload);
    }

    #[test]
    fn test_decode_rejects_short_frame() {
        assert_eq!(decode_frame(&[0x00, 0x00, 0x00]), Err(CodecError::TooShort(3)));
        assert_eq!(decode_frame(&[0x00, 0x00, 0x00, 0x00]), Ok(Bytes::new()));
    }

    #[test]
    fn test_decode_rejects_length_mismatch() {
        let frame = [0x00, 0x05, b'a', b'b', 0x00, 0xC3];
        assert_eq!(
            decode_frame(&frame),
            Err(CodecError::LengthMismatch { declared: 5, actual: 2 })
        );
    }

    #[test]
    fn test_decode_rejects_bad_checksum() {
        let frame = [0x00, 0x02, b'a', b'b', 0x00, 0xC4];
        assert_eq!(
            decode_frame(&frame),
            Err(CodecError::ChecksumMismatch {
                received: 0x00C4,
                computed: 0x00C3,
            })
        );
    }

    #[test]
    fn test_encode_frame_rejects_oversized_payload() {
        let payload = vec![0u8; 70_000];
        assert_eq!(
            encode_frame(&payload),
            Err(CodecError::PayloadTooLarge(70_000))
        );
    }

    #[test]
    fn test_reassemble_after_echo() {
        let captured = lines(&[b"AT+SBDRB", b"\x00\x03a", b"b\x00\xD0", b"OK"]);
        let frame = reassemble(&captured, b"AT+SBDRB").unwrap();
        assert_eq!(frame.as_ref(), b"\x00\x03a\rb\x00\xD0");
        assert_eq!(decode_frame(&frame).unwrap().as_ref(), b"a\rb");
    }

    #[test]
    fn test_reassemble_uses_last_echo() {
        let captured = lines(&[b"AT+SBDRB", b"stale", b"AT+SBDRB", b"\x00\x01z\x00\x7a", b"OK"]);
        let frame = reassemble(&captured, b"AT+SBDRB").unwrap();
        assert_eq!(frame.as_ref(), b"\x00\x01z\x00\x7a");
    }

    #[test]
    fn test_reassemble_without_echo_takes_whole_window() {
        let captured = lines(&[b"\x00\x01z\x00\x7a", b"OK"]);
        let frame = reassemble(&captured, b"AT+SBDRB").unwrap();
        assert_eq!(decode_frame(&frame).unwrap().as_ref(), b"z");
    }

    #[test]
    fn test_reassemble_rejects_empty_window() {
        assert_eq!(
            reassemble(&lines(&[b"AT+SBDRB"]), b"AT+SBDRB"),
            Err(CodecError::InvalidResponse)
        );
        assert_eq!(reassemble(&[], b"AT+SBDRB"), Err(CodecError::InvalidResponse));
    }
}
