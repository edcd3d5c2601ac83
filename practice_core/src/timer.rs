//! Countdown timer.
//!
//! Split in two halves:
//! - [`Countdown`] is the bookkeeping: remaining seconds, running flag and a
//!   generation number. It never sleeps, so the state machine can own it and
//!   tests can drive it tick by tick.
//! - [`Ticker`] is the clock: a tokio task that calls back once per period for
//!   a fixed number of periods. Starting a ticker aborts the previous one.
//!
//! Every tick carries the generation it was started under. A tick whose
//! generation is not current is stale and is ignored, which covers ticks that
//! were already queued when the timer was cancelled or restarted.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Result of feeding one elapsed second into a [`Countdown`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Time is left; carries the new remaining seconds
    Remaining(u32),
    /// Remaining time reached zero; the countdown has stopped
    Expired,
}

/// Single-instance countdown with generation tracking
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    running: bool,
    generation: u64,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting down from `seconds`, superseding any previous run
    ///
    /// Returns the generation that ticks for this run must carry. A zero
    /// second run is already over: it never reports as running.
    pub fn start(&mut self, seconds: u32) -> u64 {
        self.generation += 1;
        self.remaining = seconds;
        self.running = seconds > 0;
        self.generation
    }

    /// Stop the countdown. Safe in any state; only bumps the generation when
    /// a run was actually live.
    pub fn cancel(&mut self) {
        if self.running {
            self.generation += 1;
            self.running = false;
        }
    }

    /// Stop and clear the remaining time
    pub fn clear(&mut self) {
        self.cancel();
        self.remaining = 0;
    }

    /// Apply one elapsed second from the run identified by `generation`
    ///
    /// Returns `None` for stale or post-expiry ticks. `Expired` is returned
    /// exactly once per run.
    pub fn tick(&mut self, generation: u64) -> Option<TickOutcome> {
        if !self.running || generation != self.generation {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.running = false;
            Some(TickOutcome::Expired)
        } else {
            Some(TickOutcome::Remaining(self.remaining))
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Drives a countdown in real time
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    task: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self { period, task: None }
    }

    /// Call `on_tick` once per period, `count` times
    ///
    /// Any previous run is aborted first. The run also stops early when
    /// `on_tick` returns `false` (receiver gone).
    pub fn start<F>(&mut self, count: u32, mut on_tick: F)
    where
        F: FnMut() -> bool + Send + 'static,
    {
        self.cancel();

        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            for _ in 0..count {
                interval.tick().await;
                if !on_tick() {
                    break;
                }
            }
        }));
    }

    /// Abort the running task, if any. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_countdown_ticks_down_then_expires_once() {
        let mut countdown = Countdown::new();
        let generation = countdown.start(3);

        assert_eq!(countdown.tick(generation), Some(TickOutcome::Remaining(2)));
        assert_eq!(countdown.tick(generation), Some(TickOutcome::Remaining(1)));
        assert_eq!(countdown.tick(generation), Some(TickOutcome::Expired));
        assert!(!countdown.is_running());
        assert_eq!(countdown.remaining(), 0);

        // Nothing after expiry
        assert_eq!(countdown.tick(generation), None);
    }

    #[test]
    fn test_restart_makes_old_ticks_stale() {
        let mut countdown = Countdown::new();
        let first = countdown.start(10);
        let second = countdown.start(5);

        assert_ne!(first, second);
        assert_eq!(countdown.tick(first), None);
        assert_eq!(countdown.tick(second), Some(TickOutcome::Remaining(4)));
    }

    #[test]
    fn test_cancel_is_idempotent_and_blocks_ticks() {
        let mut countdown = Countdown::new();
        countdown.cancel(); // never started

        let generation = countdown.start(4);
        countdown.tick(generation);
        countdown.cancel();
        countdown.cancel();

        assert!(!countdown.is_running());
        assert_eq!(countdown.tick(generation), None);
        assert_eq!(countdown.remaining(), 3);
    }

    #[test]
    fn test_zero_second_start_is_not_running() {
        let mut countdown = Countdown::new();
        let generation = countdown.start(0);

        assert!(!countdown.is_running());
        assert_eq!(countdown.remaining(), 0);
        assert_eq!(countdown.tick(generation), None);
    }

    #[test]
    fn test_cancel_after_expiry_is_noop() {
        let mut countdown = Countdown::new();
        let generation = countdown.start(1);
        assert_eq!(countdown.tick(generation), Some(TickOutcome::Expired));

        let before = countdown.generation();
        countdown.cancel();
        assert_eq!(countdown.generation(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_fires_count_times() {
        let fired = Arc::new(AtomicU32::new(0));
        let mut ticker = Ticker::new(Duration::from_secs(1));

        let counter = Arc::clone(&fired);
        ticker.start(5, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 5);
        assert!(!ticker.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_cancel_stops_delivery() {
        let fired = Arc::new(AtomicU32::new(0));
        let mut ticker = Ticker::new(Duration::from_secs(1));

        let counter = Arc::clone(&fired);
        ticker.start(60, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        ticker.cancel();
        let at_cancel = fired.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(fired.load(Ordering::SeqCst), at_cancel);
        assert_eq!(at_cancel, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_restart_aborts_previous_run() {
        let old_ticks = Arc::new(AtomicU32::new(0));
        let new_ticks = Arc::new(AtomicU32::new(0));
        let mut ticker = Ticker::new(Duration::from_secs(1));

        let counter = Arc::clone(&old_ticks);
        ticker.start(60, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let counter = Arc::clone(&new_ticks);
        ticker.start(3, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(old_ticks.load(Ordering::SeqCst), 1);
        assert_eq!(new_ticks.load(Ordering::SeqCst), 3);
    }
}
