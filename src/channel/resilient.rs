//! Channel replacement after consecutive send failures
//!
//! Telemetry transports can wedge in a state (half-dead socket, poisoned
//! client) that only a full reconstruction clears. [`ResilientChannel`]
//! hides that recovery from the sending code: it counts consecutive send
//! failures and, on crossing a threshold, swaps the active channel for a
//! freshly built one from its factory.
//!
//! It deliberately does NOT retry individual sends and does not look at why
//! a send failed. A failed send still reports failure to the caller even
//! when it triggered a replacement as a side effect.

use super::Channel;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::warn;

/// Factory producing a fresh channel for the initial build and for each
/// replacement. Invoked synchronously; construction latency is visible to
/// the send that crossed the threshold.
type ChannelFactory = Box<dyn Fn() -> Box<dyn Channel> + Send + Sync>;

/// Channel wrapper that replaces the wrapped channel after `threshold`
/// consecutive send failures
///
/// Implements [`Channel`] itself, so it drops in anywhere the wrapped
/// channel was used. Safe for concurrent sends: the active channel lives in
/// an atomic cell, and a send racing a replacement lands on either the old
/// or the new channel in full.
///
/// # Example
///
/// ```ignore
/// let channel = ResilientChannel::new(
///     || Box::new(TcpChannel::new("collector:2003")),
///     3,
/// );
///
/// if !channel.send("app.requests 17 1700000000").await {
///     // delivery failed; the wrapper keeps count
/// }
/// ```
pub struct ResilientChannel {
    active: ArcSwap<Box<dyn Channel>>,
    factory: ChannelFactory,
    threshold: u32,
    consecutive_failures: AtomicU32,
    /// Total replacements performed
    replacements: AtomicU64,
}

impl ResilientChannel {
    /// Create a wrapper around the first channel produced by `factory`
    ///
    /// `threshold` is the number of consecutive send failures that triggers
    /// a replacement. A threshold of 0 could never make progress and is
    /// clamped to 1.
    pub fn new<F>(factory: F, threshold: u32) -> Self
    where
        F: Fn() -> Box<dyn Channel> + Send + Sync + 'static,
    {
        let factory: ChannelFactory = Box::new(factory);
        let initial = factory();
        Self {
            active: ArcSwap::from_pointee(initial),
            factory,
            threshold: threshold.max(1),
            consecutive_failures: AtomicU32::new(0),
            replacements: AtomicU64::new(0),
        }
    }

    /// Total channel replacements since construction
    pub fn replacements(&self) -> u64 {
        self.replacements.load(Ordering::Relaxed)
    }

    /// Failure accounting, run after every send attempt
    ///
    /// The comparison is `>=` rather than `==` so increments racing past the
    /// threshold still trigger a replacement instead of leaving the counter
    /// stuck above it.
    async fn observe(&self, success: bool) {
        if success {
            self.consecutive_failures.store(0, Ordering::Release);
            return;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1;
        if failures >= self.threshold {
            self.replace().await;
        }
    }

    /// Swap in a fresh channel and release the old one
    async fn replace(&self) {
        self.consecutive_failures.store(0, Ordering::Release);

        let fresh = Arc::new((self.factory)());
        let old = self.active.swap(fresh);
        self.replacements.fetch_add(1, Ordering::Relaxed);

        warn!(
            channel = old.name(),
            threshold = self.threshold,
            "replacing channel after consecutive send failures"
        );

        // In-flight sends may still hold the old channel through their own
        // Arc clone; release is best-effort and stays out of the send path's
        // result.
        old.release().await;
    }
}

#[async_trait]
impl Channel for ResilientChannel {
    fn name(&self) -> &'static str {
        "resilient"
    }

    async fn send(&self, message: &str) -> bool {
        let active = self.active.load_full();
        let success = active.send(message).await;
        self.observe(success).await;
        success
    }

    async fn send_batch(&self, messages: &[String]) -> bool {
        let active = self.active.load_full();
        let success = active.send_batch(messages).await;
        self.observe(success).await;
        success
    }

    async fn release(&self) {
        self.active.load_full().release().await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Channel that plays back a script of send outcomes, then succeeds
    struct ScriptedChannel {
        outcomes: Mutex<VecDeque<bool>>,
        sends: AtomicU64,
        released: Arc<AtomicU32>,
    }

    impl ScriptedChannel {
        fn new(outcomes: &[bool], released: Arc<AtomicU32>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.iter().copied().collect()),
                sends: AtomicU64::new(0),
                released,
            }
        }

        fn next_outcome(&self) -> bool {
            self.sends.fetch_add(1, Ordering::SeqCst);
            self.outcomes.lock().unwrap().pop_front().unwrap_or(true)
        }
    }

    #[async_trait]
    impl Channel for ScriptedChannel {
        fn name(&self) -> &'static str {
            "scripted"
        }
        async fn send(&self, _: &str) -> bool {
            self.next_outcome()
        }
        async fn send_batch(&self, _: &[String]) -> bool {
            self.next_outcome()
        }
        async fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Factory that counts how many channels it has built and scripts every
    /// build with the same outcomes
    fn counting_factory(
        outcomes: &'static [bool],
        released: Arc<AtomicU32>,
    ) -> (impl Fn() -> Box<dyn Channel> + Send + Sync + 'static, Arc<AtomicU32>) {
        let builds = Arc::new(AtomicU32::new(0));
        let builds_ref = Arc::clone(&builds);
        let factory = move || -> Box<dyn Channel> {
            builds_ref.fetch_add(1, Ordering::SeqCst);
            Box::new(ScriptedChannel::new(outcomes, Arc::clone(&released)))
        };
        (factory, builds)
    }

    #[tokio::test]
    async fn test_construction_builds_initial_channel() {
        let released = Arc::new(AtomicU32::new(0));
        let (factory, builds) = counting_factory(&[], released);
        let _channel = ResilientChannel::new(factory, 3);

        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_three_consecutive_failures_trigger_replacement() {
        let released = Arc::new(AtomicU32::new(0));
        let (factory, builds) = counting_factory(&[false, false, false], released.clone());
        let channel = ResilientChannel::new(factory, 3);

        assert!(!channel.send("m1").await);
        assert!(!channel.send("m2").await);
        assert_eq!(builds.load(Ordering::SeqCst), 1, "no replacement before threshold");

        // Third failure crosses the threshold
        assert!(!channel.send("m3").await);
        assert_eq!(builds.load(Ordering::SeqCst), 2);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(channel.replacements(), 1);
    }

    #[tokio::test]
    async fn test_success_resets_counter() {
        // fail, fail, success, fail, fail, fail: replacement only on the 6th
        // call because the success restarts the run
        let released = Arc::new(AtomicU32::new(0));
        let (factory, builds) =
            counting_factory(&[false, false, true, false, false, false], released);
        let channel = ResilientChannel::new(factory, 3);

        assert!(!channel.send("m1").await);
        assert!(!channel.send("m2").await);
        assert!(channel.send("m3").await);
        assert!(!channel.send("m4").await);
        assert!(!channel.send("m5").await);
        assert_eq!(builds.load(Ordering::SeqCst), 1, "counter was reset by the success");

        assert!(!channel.send("m6").await);
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_threshold_one_replaces_on_every_failure() {
        let released = Arc::new(AtomicU32::new(0));
        let (factory, builds) = counting_factory(&[false], released.clone());
        let channel = ResilientChannel::new(factory, 1);

        for _ in 0..5 {
            // each fresh channel fails its first send, then would succeed,
            // but threshold 1 replaces it immediately
            assert!(!channel.send("m").await);
        }

        assert_eq!(builds.load(Ordering::SeqCst), 6);
        assert_eq!(released.load(Ordering::SeqCst), 5);
        assert_eq!(channel.replacements(), 5);
    }

    #[tokio::test]
    async fn test_zero_threshold_is_clamped_to_one() {
        let released = Arc::new(AtomicU32::new(0));
        let (factory, builds) = counting_factory(&[false], released);
        let channel = ResilientChannel::new(factory, 0);

        assert!(!channel.send("m").await);
        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_send_reports_failure_even_when_it_replaces() {
        let builds = Arc::new(AtomicU32::new(0));
        let builds_ref = Arc::clone(&builds);
        let released = Arc::new(AtomicU32::new(0));
        let released_ref = Arc::clone(&released);

        // First channel always fails; replacements always succeed
        let factory = move || -> Box<dyn Channel> {
            let n = builds_ref.fetch_add(1, Ordering::SeqCst);
            let script: &[bool] = if n == 0 { &[false, false] } else { &[] };
            Box::new(ScriptedChannel::new(script, Arc::clone(&released_ref)))
        };
        let channel = ResilientChannel::new(factory, 1);

        // The replacement is a side effect; the flag reflects this attempt
        assert!(!channel.send("m").await);
        assert_eq!(builds.load(Ordering::SeqCst), 2);

        // The fresh channel succeeds and the wrapper passes that through too
        assert!(channel.send("m").await);
    }

    #[tokio::test]
    async fn test_batch_sends_share_the_failure_counter() {
        let released = Arc::new(AtomicU32::new(0));
        let (factory, builds) = counting_factory(&[false, false, false], released);
        let channel = ResilientChannel::new(factory, 3);

        let batch = vec!["m1".to_string(), "m2".to_string()];
        assert!(!channel.send_batch(&batch).await);
        assert!(!channel.send("m3").await);
        assert!(!channel.send_batch(&batch).await);

        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_sustained_failure_keeps_replacing() {
        // 12 failures at threshold 3: one replacement per crossing, counter
        // back to 0 each time
        let released = Arc::new(AtomicU32::new(0));
        let (factory, builds) =
            counting_factory(&[false, false, false], released.clone());
        let channel = ResilientChannel::new(factory, 3);

        for _ in 0..12 {
            assert!(!channel.send("m").await);
        }

        assert_eq!(builds.load(Ordering::SeqCst), 5);
        assert_eq!(released.load(Ordering::SeqCst), 4);
        assert_eq!(channel.replacements(), 4);
    }

    #[tokio::test]
    async fn test_release_releases_the_active_channel() {
        let released = Arc::new(AtomicU32::new(0));
        let (factory, _) = counting_factory(&[], released.clone());
        let channel = ResilientChannel::new(factory, 3);

        channel.release().await;
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_usable_as_dyn_channel() {
        let released = Arc::new(AtomicU32::new(0));
        let (factory, _) = counting_factory(&[], released);
        let channel: Box<dyn Channel> = Box::new(ResilientChannel::new(factory, 3));

        assert_eq!(channel.name(), "resilient");
        assert!(channel.send("m").await);
    }
}
