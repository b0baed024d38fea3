//! Channel system for TELEPIPE
//!
//! Channels move telemetry lines to a destination (TCP collector, UDP
//! collector, test doubles). [`ResilientChannel`] wraps any of them and
//! rebuilds the wrapped instance from a factory once sends have failed a
//! configured number of times in a row.

mod resilient;
mod tcp;
mod udp;

use async_trait::async_trait;

pub use resilient::ResilientChannel;
pub use tcp::TcpChannel;
pub use udp::UdpChannel;

/// Channel trait - sends telemetry lines to a destination
///
/// Each channel handles delivery to one destination. A send either succeeds
/// or it does not; channels report that as a boolean and keep the reason to
/// themselves (log it, count it), so callers never branch on error detail.
///
/// # Example
///
/// ```ignore
/// struct CollectorChannel {
///     client: CollectorClient,
/// }
///
/// #[async_trait]
/// impl Channel for CollectorChannel {
///     fn name(&self) -> &'static str { "collector" }
///
///     async fn send(&self, message: &str) -> bool {
///         self.client.push_line(message).await.is_ok()
///     }
///
///     async fn send_batch(&self, messages: &[String]) -> bool {
///         self.client.push_lines(messages).await.is_ok()
///     }
/// }
/// ```
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name for identification and logging
    fn name(&self) -> &'static str;

    /// Send a single message
    ///
    /// Returns true if the attempt succeeded.
    async fn send(&self, message: &str) -> bool;

    /// Send a batch of messages as one attempt
    ///
    /// The batch succeeds or fails as a whole; per-message outcomes are not
    /// reported.
    async fn send_batch(&self, messages: &[String]) -> bool;

    /// Release underlying resources (sockets, clients)
    ///
    /// Best-effort: failures are swallowed by the implementation. Channels
    /// with nothing to clean up keep the default no-op.
    async fn release(&self) {}
}
