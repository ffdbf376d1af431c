// Time source abstraction.
// Lets tests drive the rate limiter and cache on synthetic time.

use std::fmt::Debug;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Monotonic time provider.
///
/// The limiter and local cache never read the system clock directly; they go
/// through this trait so tests can substitute a hand-advanced clock.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> Instant;
}

/// Production clock. Reads `tokio::time::Instant`, so tests running under a
/// paused tokio runtime see virtual time advance through it as well.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Test clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += delta;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}
