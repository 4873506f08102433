// ABOUTME: SBD client module exposing the modem handle, its options, events and traits
// ABOUTME: Exports the session engine's public surface while keeping dialog plumbing crate-private

//! Iridium SBD Client Module
//!
//! This module drives a RockBLOCK (Iridium 9602/9603) modem over any async
//! byte stream:
//!
//! * **Native async traits** - `SbdTransceiver` and `NetworkInfo` use async fn in traits
//! * **One dialog at a time** - clones of a `Modem` share a single session token
//! * **Persistent sending** - queued binary messages are retried until delivered
//! * **Event sinks** - downloaded and confirmed messages fan out to every registered sink
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rockblock::client::{ChannelSink, MessageEvent, ModemOptions};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let (port, _device) = tokio::io::duplex(1024);
//! let (sink, mut events) = ChannelSink::new();
//! let modem = ModemOptions::new().with_event_sink(sink).open(port).await?;
//!
//! modem.wait_for_network(Duration::from_secs(120)).await?;
//! modem.send_text("Hello from the field").await?;
//!
//! // Mail picked up by the session arrives as an event
//! while let Ok(MessageEvent::Received(payload)) = events.try_recv() {
//!     println!("Received {} bytes", payload.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Persistent Sending
//!
//! ```rust,no_run
//! use rockblock::client::{MessageEvent, ModemOptions, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let (port, _device) = tokio::io::duplex(1024);
//! let modem = ModemOptions::new()
//!     .with_retry_policy(RetryPolicy::new(Duration::from_secs(30)))
//!     .with_event_sink(|event: &MessageEvent| -> Result<(), rockblock::Error> {
//!         println!("{event:?}");
//!         Ok(())
//!     })
//!     .open(port)
//!     .await?;
//!
//! // Returns as soon as the message is queued
//! modem.send_binary_persistent(vec![0x01, 0x02, 0x03]).await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub(crate) mod dispatch;
pub mod error;
pub mod events;
pub mod modem;
pub mod persistent;
pub(crate) mod session;
pub mod traits;

// Re-export the main types for easy access
pub use builder::ModemOptions;
pub use dispatch::MatchMode;
pub use error::{SbdError, SbdResult};
pub use events::{ChannelSink, EventSink, MessageEvent};
pub use modem::Modem;
pub use persistent::RetryPolicy;
pub use traits::{NetworkInfo, SbdTransceiver};
