// ABOUTME: Example application sending one text or binary message through a serial RockBLOCK
// ABOUTME: Waits for network, sends, and prints any mailbox message picked up by the session

pub(crate) use argh::FromArgs;
use rockblock::{ChannelSink, MessageEvent, ModemOptions};
use std::error::Error;
use std::time::Duration;

/// Example application to show the simplest case of sending an SBD message
#[derive(FromArgs)]
struct CliArgs {
    /// whether or not to enable debugging
    #[argh(switch, short = 'd')]
    debugging: bool,

    /// the serial device the RockBLOCK is attached to (default: /dev/ttyUSB0)
    #[argh(option)]
    device: Option<String>,

    /// the baud rate (default: 19200)
    #[argh(option, short = 'b')]
    baud: Option<u32>,

    /// how long to wait for a signal, in seconds (default: 120)
    #[argh(option)]
    network_timeout: Option<u64>,

    /// send the message as binary instead of text
    #[argh(switch)]
    binary: bool,

    /// the message to send
    #[argh(option, short = 'm')]
    message: String,
}

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

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
    let baud = cli_args.baud.unwrap_or(19200);
    let network_timeout = Duration::from_secs(cli_args.network_timeout.unwrap_or(120));

    let builder = tokio_serial::new(&device, baud)
        .data_bits(tokio_serial::DataBits::Eight)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(tokio_serial::Parity::None);
    let port = tokio_serial::SerialStream::open(&builder)?;

    let (sink, mut events) = ChannelSink::new();
    let modem = ModemOptions::new()
        .with_event_sink(sink)
        .open(port)
        .await
        .map_err(|e| {
            eprintln!("Modem handshake failed on {device}: {e}");
            Box::<dyn Error>::from(e.to_string())
        })?;

    let bars = modem.wait_for_network(network_timeout).await?;
    println!("Network available ({bars} bars)");

    let result = if cli_args.binary {
        modem.send_binary(cli_args.message.as_bytes()).await
    } else {
        modem.send_text(&cli_args.message).await
    };

    match result {
        Ok(()) => {
            println!("Message sent: {}", modem.session_status());

            while let Ok(event) = events.try_recv() {
                if let MessageEvent::Received(payload) = event {
                    println!("Mailbox message: {}", String::from_utf8_lossy(&payload));
                }
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Failed to send message: {e}");
            Err(Box::<dyn Error>::from(e.to_string()))
        }
    }
}
