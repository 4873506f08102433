pub mod client;
pub mod codec;
pub mod connection;
pub mod datatypes;


// Re-export codec types for direct access
pub use codec::{CodecError, checksum, decode_frame, encode_frame};

// Re-export the main client API for easy access
pub use client::{
    ChannelSink, EventSink, MessageEvent, Modem, ModemOptions, NetworkInfo, RetryPolicy,
    SbdError, SbdResult, SbdTransceiver,
};

/// Error returned by event sinks.
///
/// Sinks are user code, so the modem only needs to log what went wrong.
/// Everything the modem itself reports uses the typed [`SbdError`].
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// A specialized `Result` type for sink and application code.
///
/// This is defined as a convenience.
///
/// # Examples
///
/// ## Sending a Text Message
///
/// ```rust,no_run
/// use rockblock::Modem;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> rockblock::Result<()> {
///     // Any AsyncRead + AsyncWrite stream, normally a 19200 baud serial port
///     let (port, _device) = tokio::io::duplex(1024);
///     let modem = Modem::open(port).await?;
///
///     let bars = modem.wait_for_network(Duration::from_secs(120)).await?;
///     println!("Signal: {bars} bars");
///
///     modem.send_text("Position 51.5N 0.1W").await?;
///     Ok(())
/// }
/// ```
///
/// ## Checking the Mailbox
///
/// ```rust,no_run
/// use rockblock::{Modem, SbdError};
///
/// # async fn example() -> rockblock::Result<()> {
/// # let (port, _device) = tokio::io::duplex(1024);
/// let modem = Modem::open(port).await?;
/// modem.send_binary(&[0x00]).await?;
///
/// match modem.download_message().await {
///     Ok(payload) => println!("Got {} bytes", payload.len()),
///     Err(SbdError::NoMessageWaiting) => println!("Mailbox empty"),
///     Err(e) => return Err(e.into()),
/// }
/// # Ok(())
/// # }
/// ```
pub type Result<T> = std::result::Result<T, Error>;
