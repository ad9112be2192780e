//! Countdown clock that drives session expiry.
//!
//! [`Countdown`] holds the pure decrement logic; [`Timer`] drives it once per
//! second on the tokio runtime and fires the end-of-time callback.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

const TICK: Duration = Duration::from_secs(1);

/// Below this many seconds the clock is shown as running low.
pub const LOW_TIME_SECS: u64 = 300;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The countdown is stopped; nothing changed.
    Idle,
    /// One second elapsed; this many remain.
    Running(u64),
    /// The countdown just reached zero.
    Expired,
}

/// Remaining-seconds state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Countdown {
    remaining: u64,
    running: bool,
}

impl Countdown {
    /// Reset to `minutes` and resume. A zero-length countdown never runs.
    pub fn start(&mut self, minutes: u64) {
        self.remaining = minutes * 60;
        self.running = self.remaining > 0;
    }

    /// Halt without resetting the remaining value.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn tick(&mut self) -> Tick {
        if !self.running {
            return Tick::Idle;
        }
        if self.remaining <= 1 {
            self.remaining = 0;
            self.running = false;
            return Tick::Expired;
        }
        self.remaining -= 1;
        Tick::Running(self.remaining)
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Format seconds as zero-padded `MM:SS`.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// A countdown ticking once per second on the tokio runtime.
///
/// Only one countdown task exists at a time: starting again aborts the
/// previous task before the new one is spawned, so a replaced countdown can
/// never fire its callback.
#[derive(Default)]
pub struct Timer {
    countdown: Arc<Mutex<Countdown>>,
    task: Option<JoinHandle<()>>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to `minutes` and start ticking. `on_end` runs once when the
    /// countdown reaches zero, immediately for `start(0)`. Must be called
    /// within a tokio runtime.
    pub fn start<F>(&mut self, minutes: u64, on_end: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.abort_task();

        let running = match self.countdown.lock() {
            Ok(mut countdown) => {
                countdown.start(minutes);
                countdown.is_running()
            }
            Err(_) => return,
        };
        if !running {
            tracing::info!("countdown started with no time left");
            on_end();
            return;
        }

        let countdown = Arc::clone(&self.countdown);
        self.task = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + TICK, TICK);
            loop {
                ticks.tick().await;
                let outcome = countdown
                    .lock()
                    .map(|mut c| c.tick())
                    .unwrap_or(Tick::Idle);
                match outcome {
                    Tick::Running(_) => continue,
                    Tick::Expired => {
                        tracing::info!("countdown expired");
                        on_end();
                        break;
                    }
                    Tick::Idle => break,
                }
            }
        }));
    }

    /// Halt ticking. The remaining value is kept.
    pub fn stop(&mut self) {
        self.abort_task();
        if let Ok(mut countdown) = self.countdown.lock() {
            countdown.stop();
        }
    }

    pub fn remaining(&self) -> u64 {
        self.countdown.lock().map(|c| c.remaining()).unwrap_or(0)
    }

    pub fn is_running(&self) -> bool {
        self.countdown.lock().map(|c| c.is_running()).unwrap_or(false)
    }

    /// Whether the clock is under [`LOW_TIME_SECS`].
    pub fn is_low(&self) -> bool {
        self.remaining() < LOW_TIME_SECS
    }

    /// Remaining time as `MM:SS`.
    pub fn display(&self) -> String {
        format_clock(self.remaining())
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.abort_task();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counter() -> (Arc<AtomicU32>, impl FnOnce() + Send + 'static) {
        let fired = Arc::new(AtomicU32::new(0));
        let handle = Arc::clone(&fired);
        (fired, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn countdown_expires_after_exact_tick_count() {
        let mut c = Countdown::default();
        c.start(2);
        let mut expired = 0;
        for _ in 0..120 {
            if c.tick() == Tick::Expired {
                expired += 1;
            }
        }
        assert_eq!(c.remaining(), 0);
        assert_eq!(expired, 1);
        assert_eq!(c.tick(), Tick::Idle);
    }

    #[test]
    fn countdown_stop_keeps_remaining() {
        let mut c = Countdown::default();
        c.start(1);
        c.tick();
        c.tick();
        c.stop();
        assert_eq!(c.tick(), Tick::Idle);
        assert_eq!(c.remaining(), 58);
    }

    #[test]
    fn zero_minute_countdown_never_runs() {
        let mut c = Countdown::default();
        c.start(0);
        assert!(!c.is_running());
        assert_eq!(c.tick(), Tick::Idle);
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(59), "00:59");
        assert_eq!(format_clock(3600), "60:00");
        assert_eq!(format_clock(905), "15:05");
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_once_at_zero() {
        let (fired, on_end) = counter();
        let mut timer = Timer::new();
        timer.start(1, on_end);
        assert_eq!(timer.display(), "01:00");

        tokio::time::sleep(Duration::from_millis(60_500)).await;
        assert_eq!(timer.remaining(), 0);
        assert!(!timer.is_running());
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_minutes_fires_immediately() {
        let (fired, on_end) = counter();
        let mut timer = Timer::new();
        timer.start(0, on_end);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_running());
        assert_eq!(timer.display(), "00:00");

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_stop_halts_without_reset() {
        let (fired, on_end) = counter();
        let mut timer = Timer::new();
        timer.start(1, on_end);

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        timer.stop();
        assert_eq!(timer.remaining(), 50);

        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(timer.remaining(), 50);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_prior_countdown() {
        let (first, on_first) = counter();
        let (second, on_second) = counter();
        let mut timer = Timer::new();
        timer.start(1, on_first);

        tokio::time::sleep(Duration::from_millis(30_500)).await;
        timer.start(2, on_second);
        assert_eq!(timer.remaining(), 120);

        tokio::time::sleep(Duration::from_millis(60_500)).await;
        assert_eq!(timer.remaining(), 60);
        assert_eq!(first.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert!(timer.is_low());
    }
}
