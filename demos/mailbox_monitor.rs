// ABOUTME: Long-running example that checks the SBD mailbox and queues replies persistently
// ABOUTME: Demonstrates event sinks, retry policy, network time and signal monitoring

pub(crate) use argh::FromArgs;
use rockblock::{MessageEvent, ModemOptions, RetryPolicy, SbdError};
use std::error::Error;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Poll the Iridium mailbox and acknowledge every received message
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the serial device the RockBLOCK is attached to (default: /dev/ttyUSB0)
    #[argh(option)]
    device: Option<String>,

    /// seconds between mailbox checks (default: 600)
    #[argh(option, short = 'i')]
    interval: Option<u64>,

    /// seconds to wait between failed delivery attempts (default: 30)
    #[argh(option)]
    backoff: Option<u64>,

    /// give up on a reply after this many attempts (default: never)
    #[argh(option)]
    max_attempts: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = argh::from_env();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if cli_args.debugging {
            Level::DEBUG
        } else {
            Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let device = cli_args.device.unwrap_or_else(|| "/dev/ttyUSB0".to_owned());
    let interval = Duration::from_secs(cli_args.interval.unwrap_or(600));

    let mut retry = RetryPolicy::new(Duration::from_secs(cli_args.backoff.unwrap_or(30)));
    if let Some(max) = cli_args.max_attempts {
        retry = retry.with_max_attempts(max);
    }

    let builder = tokio_serial::new(&device, 19200);
    let port = tokio_serial::SerialStream::open(&builder)?;

    let (replies, mut received) = tokio::sync::mpsc::unbounded_channel();
    let modem = ModemOptions::new()
        .with_retry_policy(retry)
        .with_event_sink(move |event: &MessageEvent| -> rockblock::Result<()> {
            match event {
                MessageEvent::Received(payload) => {
                    info!("Received {} bytes: {:?}", payload.len(), payload);
                    replies.send(payload.clone())?;
                }
                MessageEvent::ConfirmSent(payload) => {
                    info!("Delivered {} byte reply", payload.len());
                }
            }
            Ok(())
        })
        .open(port)
        .await?;

    match modem.system_time().await {
        Ok(time) => info!("Iridium time is {time}"),
        Err(e) => warn!("{e}, local clock reads {:?}", e.fallback_time()),
    }

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = modem.wait_for_network(interval / 2).await {
                    warn!("No network: {e}");
                    continue;
                }
                // An empty mailbox check: stage a single byte and let the
                // session pull anything waiting
                match modem.send_binary(&[0x00]).await {
                    Ok(()) => info!("Mailbox checked: {}", modem.session_status()),
                    Err(SbdError::SessionFailed(status)) => warn!("Session failed: {status}"),
                    Err(e) => error!("Mailbox check failed: {e}"),
                }
            }
            Some(payload) = received.recv() => {
                let mut ack = b"ACK ".to_vec();
                ack.extend_from_slice(&payload[..payload.len().min(64)]);
                modem.send_binary_persistent(ack).await?;
            }
        }
    }
}
