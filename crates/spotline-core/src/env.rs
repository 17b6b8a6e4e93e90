//! Environment abstraction for deterministic testing.
//!
//! Decouples the session runtime from system time. Production uses the real
//! clock and tokio timers; the test harness substitutes a virtual clock so
//! every delay in the protocol (retry backoff, reconcile trigger, leave
//! grace) elapses deterministically.

use std::time::Duration;

/// Abstract environment providing time.
///
/// # Invariants
///
/// - `now()` never goes backwards within a single execution context.
/// - `sleep()` is the only async method and is used exclusively by driver
///   code (the runtime); the session state machine itself never sleeps.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; simulation
    /// environments use a virtual clock.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
