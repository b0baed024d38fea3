//! TELEPIPE - resilient telemetry channels
//!
//! A small transport layer for shipping telemetry lines (metrics, log
//! records) to a collector. The interesting part is [`ResilientChannel`]:
//! it wraps any [`Channel`] and swaps in a freshly constructed one after a
//! configurable number of consecutive send failures, because real transports
//! wedge in states that only a full reconstruction clears.
//!
//! # Architecture
//!
//! ```text
//! caller ──► ResilientChannel ──► active Channel (tcp, udp, ...)
//!                  │
//!                  └── factory, invoked on threshold crossings
//! ```
//!
//! Channels are pluggable via the [`Channel`] trait.

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

pub mod channel;
pub mod config;
pub mod error;

pub use channel::{Channel, ResilientChannel, TcpChannel, UdpChannel};
pub use config::{Config, Transport};
pub use error::{Result, TelepipeError};
