//! Virtual-clock environment.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use spotline_core::Environment;

#[derive(Debug, Default)]
struct SimClock {
    now: Duration,
    sleeps: Vec<Duration>,
}

/// Environment whose clock only moves when someone sleeps on it.
///
/// `sleep` returns immediately, records the requested duration, and advances
/// the virtual now by that amount. Timer-driven behavior (retry backoff,
/// reconcile delay, leave grace) resolves without wall-clock waits, and tests
/// assert on [`SimEnv::sleeps`] to check the delays that would have been
/// honored.
#[derive(Debug, Clone, Default)]
pub struct SimEnv {
    state: Arc<Mutex<SimClock>>,
}

impl SimEnv {
    /// Environment starting at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total virtual time elapsed across all sleeps.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.state().now
    }

    /// Every sleep requested so far, in order.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state().sleeps.clone()
    }

    fn state(&self) -> MutexGuard<'_, SimClock> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Environment for SimEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        self.state().now
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        let state = Arc::clone(&self.state);
        async move {
            let mut clock = state.lock().unwrap_or_else(PoisonError::into_inner);
            clock.sleeps.push(duration);
            clock.now += duration;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sleeps_are_instant_and_recorded() {
        let env = SimEnv::new();

        env.sleep(Duration::from_secs(2)).await;
        env.sleep(Duration::from_millis(100)).await;

        assert_eq!(
            env.sleeps(),
            vec![Duration::from_secs(2), Duration::from_millis(100)]
        );
        assert_eq!(env.elapsed(), Duration::from_millis(2100));
    }

    #[tokio::test]
    async fn unawaited_sleeps_do_not_advance_time() {
        let env = SimEnv::new();
        assert_eq!(env.now(), Duration::ZERO);

        drop(env.sleep(Duration::from_secs(1)));
        assert_eq!(env.now(), Duration::ZERO);

        env.sleep(Duration::from_secs(1)).await;
        assert_eq!(env.now(), Duration::from_secs(1));
    }
}
