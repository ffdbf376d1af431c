// Sliding-window rate limiter.
// Bounds the number of admitted API calls within any trailing window.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;

use crate::clock::{Clock, SystemClock};

/// How often a blocked `admit` re-checks the budget.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Immutable call budget: at most `max_calls` admissions inside any trailing
/// `window`.
#[derive(Debug, Clone, Copy)]
pub struct RateBudget {
    pub max_calls: usize,
    pub window: Duration,
}

impl Default for RateBudget {
    fn default() -> Self {
        Self {
            max_calls: crate::config::DEFAULT_RATE_LIMIT,
            window: crate::config::DEFAULT_RATE_WINDOW,
        }
    }
}

/// Sliding-window call budget enforcer.
///
/// Admission timestamps live in a FIFO deque behind one mutex; purge, check,
/// and append happen under a single lock acquisition so two concurrent
/// callers can never both squeeze into the last budget slot. The lock is
/// never held across an await, so cancelling a blocked [`admit`] (by dropping
/// its future) cannot leave a partial record behind.
///
/// One limiter instance per API token is the intended setup; clone the `Arc`
/// it lives in rather than constructing a second limiter.
///
/// [`admit`]: RateLimiter::admit
#[derive(Debug)]
pub struct RateLimiter {
    budget: RateBudget,
    calls: Mutex<VecDeque<Instant>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(budget: RateBudget) -> Self {
        Self::with_clock(budget, Arc::new(SystemClock))
    }

    /// Construct with an injected clock (tests).
    pub fn with_clock(budget: RateBudget, clock: Arc<dyn Clock>) -> Self {
        Self {
            budget,
            calls: Mutex::new(VecDeque::new()),
            clock,
        }
    }

    /// Drop records that have aged out of the window. Records are appended in
    /// non-decreasing time order, so popping from the head while the head is
    /// expired is sufficient.
    fn purge(&self, calls: &mut VecDeque<Instant>, now: Instant) {
        while calls
            .front()
            .is_some_and(|&t| now.duration_since(t) > self.budget.window)
        {
            calls.pop_front();
        }
    }

    /// Whether a call could be admitted right now. Purges expired records but
    /// does not reserve a slot.
    pub fn can_admit(&self) -> bool {
        let now = self.clock.now();
        let mut calls = self.calls.lock().unwrap();
        self.purge(&mut calls, now);
        calls.len() < self.budget.max_calls
    }

    /// Record an admission at the current time.
    ///
    /// Only meaningful immediately after a successful [`can_admit`] under
    /// external coordination; concurrent callers should use [`admit`], which
    /// checks and records atomically.
    ///
    /// [`can_admit`]: RateLimiter::can_admit
    /// [`admit`]: RateLimiter::admit
    pub fn record(&self) {
        let now = self.clock.now();
        let mut calls = self.calls.lock().unwrap();
        self.purge(&mut calls, now);
        calls.push_back(now);
    }

    /// Purge, check, and record under one lock acquisition.
    fn try_admit(&self) -> bool {
        let now = self.clock.now();
        let mut calls = self.calls.lock().unwrap();
        self.purge(&mut calls, now);
        if calls.len() < self.budget.max_calls {
            calls.push_back(now);
            true
        } else {
            false
        }
    }

    /// Block until the budget admits a call, then record it.
    ///
    /// Polls once per second while the window is full. Never times out: with
    /// `max_calls == 0` this suspends forever, and callers that need bounded
    /// waiting must wrap it in `tokio::time::timeout` or a cancellation
    /// token. Worst-case wait is otherwise bounded by the window length.
    pub async fn admit(&self) {
        if self.try_admit() {
            return;
        }
        log::debug!("call budget exhausted, blocking until {}", self.reset_at());
        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            if self.try_admit() {
                return;
            }
        }
    }

    /// Calls still available in the current window. Diagnostic only.
    pub fn remaining(&self) -> usize {
        let now = self.clock.now();
        let mut calls = self.calls.lock().unwrap();
        self.purge(&mut calls, now);
        self.budget.max_calls - calls.len()
    }

    /// Instant at which the oldest retained record ages out, or now when the
    /// window is empty. Callers use this to decide between waiting and
    /// failing fast.
    pub fn reset_time(&self) -> Instant {
        let now = self.clock.now();
        let mut calls = self.calls.lock().unwrap();
        self.purge(&mut calls, now);
        match calls.front() {
            Some(&oldest) => oldest + self.budget.window,
            None => now,
        }
    }

    /// Wall-clock estimate of [`reset_time`], for display and logging.
    ///
    /// [`reset_time`]: RateLimiter::reset_time
    pub fn reset_at(&self) -> DateTime<Utc> {
        let wait = self
            .reset_time()
            .saturating_duration_since(self.clock.now());
        Utc::now() + chrono::Duration::from_std(wait).unwrap_or_else(|_| chrono::Duration::zero())
    }

    pub fn budget(&self) -> RateBudget {
        self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn limiter(max_calls: usize, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateBudget {
            max_calls,
            window: Duration::from_secs(window_secs),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_admissions_under_budget_never_block() {
        let limiter = limiter(5, 60);
        let start = Instant::now();

        for _ in 0..5 {
            limiter.admit().await;
        }

        // Paused clock: any sleep would have advanced virtual time.
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_third_admission_waits_for_oldest_record() {
        let limiter = limiter(2, 10);
        let start = Instant::now();

        limiter.admit().await;
        limiter.admit().await;
        limiter.admit().await;

        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(10), "waited {:?}", waited);
        // One poll interval of slack past the window.
        assert!(waited <= Duration::from_secs(12), "waited {:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_tracks_records_and_expiry() {
        let limiter = limiter(5, 30);
        assert_eq!(limiter.remaining(), 5);

        limiter.record();
        limiter.record();
        limiter.record();
        assert_eq!(limiter.remaining(), 2);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(limiter.remaining(), 5);
    }

    #[test]
    fn test_manual_clock_drives_window_expiry() {
        let clock = Arc::new(ManualClock::new());
        let limiter = RateLimiter::with_clock(
            RateBudget {
                max_calls: 1,
                window: Duration::from_secs(10),
            },
            clock.clone(),
        );

        limiter.record();
        assert!(!limiter.can_admit());

        clock.advance(Duration::from_secs(11));
        assert!(limiter.can_admit());
        assert_eq!(limiter.remaining(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_never_admits() {
        let limiter = limiter(0, 10);

        assert!(!limiter.can_admit());
        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(!limiter.can_admit());
        assert_eq!(limiter.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_time_is_now_when_empty() {
        let limiter = limiter(2, 10);

        assert_eq!(limiter.reset_time(), Instant::now());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_time_is_oldest_plus_window() {
        let limiter = limiter(2, 10);

        let first = Instant::now();
        limiter.record();
        tokio::time::advance(Duration::from_secs(3)).await;
        limiter.record();

        assert_eq!(limiter.reset_time(), first + Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_admissions_respect_window() {
        let limiter = Arc::new(limiter(1, 5));
        let mut handles = Vec::new();

        for _ in 0..3 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                limiter.admit().await;
                Instant::now()
            }));
        }

        let mut admitted = Vec::new();
        for handle in handles {
            admitted.push(handle.await.unwrap());
        }
        admitted.sort();

        for pair in admitted.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(gap >= Duration::from_secs(5), "gap {:?}", gap);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_admit_leaves_no_partial_record() {
        let limiter = Arc::new(limiter(1, 10));
        limiter.admit().await;
        assert_eq!(limiter.remaining(), 0);

        // Drop a blocked admit before it is granted.
        let blocked = tokio::time::timeout(Duration::from_millis(5), limiter.admit());
        assert!(blocked.await.is_err());
        assert_eq!(limiter.remaining(), 0);

        // Once the window rolls over, exactly one slot opens up.
        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(limiter.remaining(), 1);
        limiter.admit().await;
        assert_eq!(limiter.remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_admits_never_exceed_budget() {
        let limiter = Arc::new(limiter(3, 20));
        let admitted = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let limiter = Arc::clone(&limiter);
            let admitted = Arc::clone(&admitted);
            handles.push(tokio::spawn(async move {
                limiter.admit().await;
                admitted.fetch_add(1, Ordering::SeqCst);
            }));
        }

        // Give every task a chance to race for the first batch of slots.
        tokio::time::advance(Duration::from_millis(10)).await;
        tokio::task::yield_now().await;
        assert!(admitted.load(Ordering::SeqCst) <= 3);

        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(admitted.load(Ordering::SeqCst), 8);
    }
}
