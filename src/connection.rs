// ABOUTME: Serial link plumbing for the SBD modem: line reader, command writer, parsed state
// ABOUTME: Splits inbound bytes on CR, decodes status lines and serializes outbound writes

use crate::codec::LINE_DELIMITER;
use crate::datatypes::{
    SESSION_STATUS_PREFIX, SIGNAL_QUALITY_PREFIX, SYSTEM_TIME_PREFIX, SessionStatus,
    parse_signal_quality, parse_system_time,
};
use bytes::{Buf, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// Reads CR-terminated response lines from the modem.
///
/// The modem interleaves text responses with raw binary frames, so lines are
/// kept as bytes. A line ends at the first unconsumed carriage return; when
/// the stream closes, any unterminated residue is returned as a final line.
#[derive(Debug)]
pub struct LineReader<R> {
    stream: R,

    // Bytes received but not yet split into lines.
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(stream: R) -> LineReader<R> {
        LineReader {
            stream,
            // SBD frames are at most a few hundred bytes.
            buffer: BytesMut::with_capacity(1024),
        }
    }

    /// Read the next raw line, without its terminating carriage return.
    ///
    /// Returns `None` once the stream has closed and every buffered byte has
    /// been handed out.
    pub async fn read_line(&mut self) -> io::Result<Option<Bytes>> {
        loop {
            if let Some(line) = self.parse_line() {
                return Ok(Some(line));
            }

            // `0` indicates end of stream. Flush whatever is left as one
            // final unterminated line.
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(self.buffer.split().freeze()));
            }
        }
    }

    fn parse_line(&mut self) -> Option<Bytes> {
        let end = self.buffer.iter().position(|&b| b == LINE_DELIMITER)?;
        let line = self.buffer.split_to(end).freeze();
        self.buffer.advance(1);
        Some(line)
    }
}

/// Strip surrounding carriage returns and line feeds from a raw line.
pub fn trim_line(line: Bytes) -> Bytes {
    let is_eol = |b: &u8| *b == b'\r' || *b == b'\n';
    let start = line.iter().position(|b| !is_eol(b)).unwrap_or(line.len());
    let end = line.iter().rposition(|b| !is_eol(b)).map_or(start, |i| i + 1);
    line.slice(start..end)
}

/// Most recently decoded modem state.
///
/// Written only by the line reader as status lines arrive; anyone may
/// subscribe to the watch channels or read the latest value.
#[derive(Debug)]
pub struct ModemState {
    pub session_status: watch::Sender<SessionStatus>,
    pub signal_quality: watch::Sender<u8>,
    pub system_time: watch::Sender<Option<DateTime<Utc>>>,
}

impl ModemState {
    pub fn new() -> Self {
        ModemState {
            session_status: watch::Sender::new(SessionStatus::default()),
            signal_quality: watch::Sender::new(0),
            system_time: watch::Sender::new(None),
        }
    }

    /// Run the decoder matching `line`'s prefix, if any, and record the result.
    ///
    /// Malformed lines are logged and leave the previous value in place.
    pub fn observe(&self, line: &[u8]) {
        if line.starts_with(SESSION_STATUS_PREFIX.as_bytes()) {
            match SessionStatus::parse(line) {
                Ok(status) => {
                    self.session_status.send_replace(status);
                }
                Err(e) => warn!("Ignoring session status line: {e}"),
            }
        }
        if line.starts_with(SIGNAL_QUALITY_PREFIX.as_bytes()) {
            match parse_signal_quality(line) {
                Ok(bars) => {
                    self.signal_quality.send_replace(bars);
                }
                Err(e) => warn!("Ignoring signal quality line: {e}"),
            }
        }
        if line.starts_with(SYSTEM_TIME_PREFIX.as_bytes()) {
            match parse_system_time(line) {
                Ok(time) => {
                    self.system_time.send_replace(Some(time));
                }
                Err(e) => warn!("Ignoring system time line: {e}"),
            }
        }
    }
}

impl Default for ModemState {
    fn default() -> Self {
        Self::new()
    }
}

/// Line reader task: decode every line into `state`, then publish it.
///
/// Runs until the transport closes or fails, or nobody listens for lines.
pub async fn run_reader<R>(
    mut reader: LineReader<R>,
    state: Arc<ModemState>,
    lines: mpsc::Sender<Bytes>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        let line = match reader.read_line().await {
            Ok(Some(line)) => trim_line(line),
            Ok(None) => {
                debug!("Modem stream closed");
                return;
            }
            Err(e) => {
                warn!("Serial read error: {e}");
                return;
            }
        };

        if line.is_empty() {
            continue;
        }

        debug!("received: {}", String::from_utf8_lossy(&line));
        state.observe(&line);

        if lines.send(line).await.is_err() {
            debug!("Response channel closed, stopping reader");
            return;
        }
    }
}

/// Owns the write half of the transport.
#[derive(Debug)]
pub struct CommandWriter<W: AsyncWrite + Unpin> {
    stream: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> CommandWriter<W> {
    pub fn new(stream: W) -> Self {
        CommandWriter {
            stream: BufWriter::new(stream),
        }
    }

    /// Write `bytes` verbatim and flush them to the device.
    pub async fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await
    }
}

/// Command writer task: drain the write queue onto the transport in order.
///
/// Write failures are logged and the task keeps serving the queue.
pub async fn run_writer<W>(mut writer: CommandWriter<W>, mut queue: mpsc::Receiver<Bytes>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(bytes) = queue.recv().await {
        if let Err(e) = writer.write(&bytes).await {
            warn!("Serial write error: {e}");
        }
    }
    debug!("Write queue closed, stopping writer");
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect_lines(input: &[u8]) -> Vec<Bytes> {
        let mut reader = LineReader::new(input);
        let mut lines = Vec::new();
        while let Some(line) = reader.read_line().await.unwrap() {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_split_terminated_lines() {
        let lines = collect_lines(b"AT\rOK\r").await;
        assert_eq!(lines, vec![Bytes::from_static(b"AT"), Bytes::from_static(b"OK")]);
    }

    #[tokio::test]
    async fn test_unterminated_tail_emitted_at_end() {
        let lines = collect_lines(b"READY\r0\rOK").await;
        assert_eq!(
            lines,
            vec![
                Bytes::from_static(b"READY"),
                Bytes::from_static(b"0"),
                Bytes::from_static(b"OK"),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_stream_has_no_lines() {
        assert!(collect_lines(b"").await.is_empty());
    }

    #[tokio::test]
    async fn test_tail_waits_for_end_of_stream() {
        let (mut modem, host) = tokio::io::duplex(64);
        let mut reader = LineReader::new(host);

        modem.write_all(b"OK\rpart").await.unwrap();
        assert_eq!(reader.read_line().await.unwrap(), Some(Bytes::from_static(b"OK")));

        let pending = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            reader.read_line(),
        )
        .await;
        assert!(pending.is_err(), "unterminated tail must not be emitted early");

        modem.write_all(b"ial").await.unwrap();
        drop(modem);
        assert_eq!(
            reader.read_line().await.unwrap(),
            Some(Bytes::from_static(b"partial"))
        );
        assert_eq!(reader.read_line().await.unwrap(), None);
    }

    #[test]
    fn test_trim_line() {
        assert_eq!(trim_line(Bytes::from_static(b"\nOK\n")), Bytes::from_static(b"OK"));
        assert_eq!(trim_line(Bytes::from_static(b"\r\n")), Bytes::new());
        assert_eq!(trim_line(Bytes::from_static(b"a\rb")), Bytes::from_static(b"a\rb"));
    }

    #[test]
    fn test_observe_updates_state() {
        let state = ModemState::new();
        state.observe(b"+CSQ:4");
        state.observe(b"+SBDI: 1, 7, 0, 0, 0, 0");
        state.observe(b"-MSSTM: 00000000");

        assert_eq!(*state.signal_quality.borrow(), 4);
        assert_eq!(state.session_status.borrow().momsn, 7);
        assert_eq!(*state.system_time.borrow(), Some(crate::datatypes::iridium_epoch()));
    }

    #[test]
    fn test_observe_fails_closed() {
        let state = ModemState::new();
        state.observe(b"+SBDI: 1, 7, 1, 2, 3, 4");
        state.observe(b"+SBDI: 2, 8, 0");
        state.observe(b"+SBDI: 2, 8, zero, 0, 0, 0");
        state.observe(b"+CSQ:lots");

        assert_eq!(state.session_status.borrow().mo_status, 1);
        assert_eq!(state.session_status.borrow().momsn, 7);
        assert_eq!(*state.signal_quality.borrow(), 0);
    }

    #[tokio::test]
    async fn test_reader_task_publishes_trimmed_lines() {
        let state = Arc::new(ModemState::new());
        let (tx, mut rx) = mpsc::channel(8);
        let input: &[u8] = b"\r\nOK\r\n+CSQ:3\r\n\r\n";
        run_reader(LineReader::new(input), state.clone(), tx).await;

        assert_eq!(rx.recv().await, Some(Bytes::from_static(b"OK")));
        assert_eq!(rx.recv().await, Some(Bytes::from_static(b"+CSQ:3")));
        assert_eq!(rx.recv().await, None);
        assert_eq!(*state.signal_quality.borrow(), 3);
    }

    #[tokio::test]
    async fn test_writer_task_preserves_order() {
        let (host, mut modem) = tokio::io::duplex(64);
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(run_writer(CommandWriter::new(host), rx));

        tx.send(Bytes::from_static(b"AT+SBDWB=2\r")).await.unwrap();
        tx.send(Bytes::from_static(b"hi\x00\xD1")).await.unwrap();
        drop(tx);
        task.await.unwrap();

        let mut written = Vec::new();
        modem.read_to_end(&mut written).await.unwrap();
        assert_eq!(written, b"AT+SBDWB=2\rhi\x00\xD1");
    }

    /// Fails the first `failures` writes, then records the rest.
    struct FlakyWriter {
        failures: usize,
        written: Arc<std::sync::Mutex<Vec<u8>>>,
    }

    impl AsyncWrite for FlakyWriter {
        fn poll_write(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &[u8],
        ) -> std::task::Poll<io::Result<usize>> {
            if self.failures > 0 {
                self.failures -= 1;
                return std::task::Poll::Ready(Err(io::ErrorKind::BrokenPipe.into()));
            }
            self.written.lock().unwrap().extend_from_slice(buf);
            std::task::Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_writer_task_survives_write_error() {
        let written = Arc::new(std::sync::Mutex::new(Vec::new()));
        let flaky = FlakyWriter {
            failures: 1,
            written: written.clone(),
        };
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(run_writer(CommandWriter::new(flaky), rx));

        tx.send(Bytes::from_static(b"AT\r")).await.unwrap();
        tx.send(Bytes::from_static(b"AT+CSQ\r")).await.unwrap();
        drop(tx);
        task.await.unwrap();

        assert!(written.lock().unwrap().ends_with(b"AT+CSQ\r"));
    }
}
