// Time source for telemetry timestamps and actuator settle waits

use std::future::{self, Future};
use std::time::Duration;

use tokio::time::Instant;

/// Monotonic time since startup plus a way to wait.
///
/// The runtime never sleeps directly; actuator sequences wait through this
/// trait so tests can run them on virtual time.
pub trait Clock {
    /// Time elapsed since the clock was created
    fn elapsed(&self) -> Duration;

    /// Wait for `duration` to pass
    fn wait(&mut self, duration: Duration) -> impl Future<Output = ()>;

    fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
    }
}

/// Wall clock backed by the tokio timer
#[derive(Debug, Clone)]
pub struct TokioClock {
    start: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn wait(&mut self, duration: Duration) -> impl Future<Output = ()> {
        tokio::time::sleep(duration)
    }
}

/// Clock that only moves when waited on. Waits complete immediately.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: Duration,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without waiting (e.g. to simulate the loop tick)
    pub fn advance(&mut self, duration: Duration) {
        self.now += duration;
    }
}

impl Clock for VirtualClock {
    fn elapsed(&self) -> Duration {
        self.now
    }

    fn wait(&mut self, duration: Duration) -> impl Future<Output = ()> {
        self.now += duration;
        future::ready(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_virtual_clock_advances_on_wait() {
        let mut clock = VirtualClock::new();
        clock.wait(Duration::from_millis(250)).await;
        clock.advance(Duration::from_millis(50));
        assert_eq!(clock.elapsed_ms(), 300);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_clock_on_paused_time() {
        let mut clock = TokioClock::new();
        clock.wait(Duration::from_millis(400)).await;
        let waited = clock.elapsed();
        assert!(waited >= Duration::from_millis(400));
        assert!(waited < Duration::from_millis(410));
    }
}
