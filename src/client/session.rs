// ABOUTME: SBD session engine driving the ordered AT dialogs for one mailbox exchange
// ABOUTME: Clear buffers, stage the message, run the session, check status and pull waiting mail

use crate::client::dispatch::Dispatcher;
use crate::client::error::{SbdError, SbdResult};
use crate::client::events::{EventSinks, MessageEvent};
use crate::codec;
use crate::connection::ModemState;
use crate::datatypes::{
    AtCommand, SIGNAL_QUALITY_PREFIX, SYSTEM_TIME_PREFIX, SessionStatus, WriteStatus,
    parse_signal_quality, parse_system_time,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

const OK: &str = "OK";
const READY: &str = "READY";

/// One dialog in progress.
///
/// Borrowing the dispatcher mutably is the session token: a `Session` can
/// only exist while its caller holds the modem's dialog lock.
pub(crate) struct Session<'a> {
    pub(crate) io: &'a mut Dispatcher,
    pub(crate) state: &'a ModemState,
    pub(crate) sinks: &'a EventSinks,
}

impl Session<'_> {
    async fn command_ok(&mut self, command: AtCommand<'_>) -> SbdResult<()> {
        self.io.command(&command).await?;
        self.io.wait_exact(OK).await?;
        Ok(())
    }

    /// `AT` then `AT&K0`, run once when the modem is opened.
    pub(crate) async fn handshake(&mut self) -> SbdResult<()> {
        self.command_ok(AtCommand::Attention).await?;
        self.command_ok(AtCommand::DisableFlowControl).await
    }

    pub(crate) async fn send_text(&mut self, text: &str) -> SbdResult<()> {
        if text.len() > codec::MAX_TEXT_LEN {
            return Err(SbdError::InvalidData(format!(
                "text message of {} bytes exceeds {} bytes",
                text.len(),
                codec::MAX_TEXT_LEN
            )));
        }
        if text.contains('\r') {
            return Err(SbdError::InvalidData(
                "text message may not contain a carriage return".to_string(),
            ));
        }

        self.command_ok(AtCommand::ClearBuffers).await?;
        self.command_ok(AtCommand::WriteText(text)).await?;
        self.run_session().await
    }

    pub(crate) async fn send_binary(&mut self, payload: &[u8]) -> SbdResult<()> {
        check_binary_payload(payload)?;

        self.command_ok(AtCommand::ClearBuffers).await?;
        self.io.command(&AtCommand::WriteBinary(payload.len())).await?;
        self.io.wait_exact(READY).await?;

        debug!("sent: {} binary bytes", payload.len());
        self.io.write(codec::encode_upload(payload)).await?;

        let line = self
            .io
            .wait_until(|line| WriteStatus::from_line(line).is_some())
            .await?;
        if let Some(rejected) =
            WriteStatus::from_line(&line).filter(|status| *status != WriteStatus::Accepted)
        {
            return Err(SbdError::WriteRejected(rejected));
        }
        self.io.wait_exact(OK).await?;

        self.run_session().await
    }

    /// Initiate the mailbox session and interpret its status.
    ///
    /// A waiting mobile-terminated message is downloaded on the way out; a
    /// failed download is logged and does not fail the send.
    async fn run_session(&mut self) -> SbdResult<()> {
        self.io.command(&AtCommand::InitiateSession).await?;
        let line = self.io.wait_prefix("+SBDI:").await?;
        let status = SessionStatus::parse(&line)?;
        self.io.wait_exact(OK).await?;

        if !status.is_sent() {
            return Err(SbdError::SessionFailed(status));
        }
        info!("Message sent (MOMSN {})", status.momsn);

        if status.has_mail() {
            if let Err(e) = self.download().await {
                warn!("Mailbox download after session failed: {e}");
            }
        }
        Ok(())
    }

    /// Download the mobile-terminated buffer announced by the last session.
    pub(crate) async fn download_waiting(&mut self) -> SbdResult<Bytes> {
        if !self.state.session_status.borrow().has_mail() {
            return Err(SbdError::NoMessageWaiting);
        }
        self.download().await
    }

    async fn download(&mut self) -> SbdResult<Bytes> {
        let command = AtCommand::ReadBinary;

        self.io.begin_capture();
        let finished = match self.io.command(&command).await {
            Ok(()) => self.io.wait_suffix(OK).await,
            Err(e) => Err(e),
        };
        let window = self.io.end_capture();
        finished?;

        let frame = codec::reassemble(&window, command.to_string().as_bytes())?;
        let payload = codec::decode_frame(&frame)?;
        info!("Downloaded {} byte message", payload.len());

        self.sinks
            .dispatch(MessageEvent::Received(payload.clone()))
            .await;
        Ok(payload)
    }

    pub(crate) async fn signal_quality(&mut self) -> SbdResult<u8> {
        self.io.command(&AtCommand::SignalQuality).await?;
        let line = self.io.wait_prefix(SIGNAL_QUALITY_PREFIX).await?;
        Ok(parse_signal_quality(&line)?)
    }

    /// Poll signal quality every `poll` until it is non-zero or `limit` elapses.
    pub(crate) async fn wait_for_network(
        &mut self,
        limit: Duration,
        poll: Duration,
    ) -> SbdResult<u8> {
        let mut ticker = interval_at(Instant::now() + poll, poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let polling = async {
            loop {
                ticker.tick().await;
                let bars = self.signal_quality().await?;
                if bars != 0 {
                    return Ok::<u8, SbdError>(bars);
                }
                debug!("No network yet");
            }
        };

        tokio::time::timeout(limit, polling)
            .await
            .map_err(|_| SbdError::Timeout)?
    }

    /// Read Iridium network time.
    ///
    /// If the time line never arrives or cannot be decoded, the error carries
    /// the local clock as a fallback.
    pub(crate) async fn system_time(&mut self) -> SbdResult<DateTime<Utc>> {
        let unavailable = |source: SbdError| SbdError::TimeUnavailable {
            fallback: Utc::now(),
            source: Box::new(source),
        };

        self.io
            .command(&AtCommand::SystemTime)
            .await
            .map_err(unavailable)?;
        let line = self
            .io
            .wait_prefix(SYSTEM_TIME_PREFIX)
            .await
            .map_err(unavailable)?;

        if let Err(e) = self.io.wait_exact(OK).await {
            debug!("No OK after system time: {e}");
        }

        parse_system_time(&line).map_err(|e| unavailable(e.into()))
    }
}

/// Reject payloads `AT+SBDWB` cannot carry.
pub(crate) fn check_binary_payload(payload: &[u8]) -> SbdResult<()> {
    if payload.is_empty() || payload.len() > codec::MAX_MO_PAYLOAD {
        return Err(SbdError::InvalidData(format!(
            "binary message must be 1 to {} bytes, got {}",
            codec::MAX_MO_PAYLOAD,
            payload.len()
        )));
    }
    Ok(())
}
