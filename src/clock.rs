//! Phase clock
//!
//! A cooperative, single-fire countdown. The clock never sleeps or spawns
//! anything: the owner passes the current instant to [`PhaseClock::poll`]
//! once per tick and receives the deadline payload the first time the
//! countdown has run out. Arming a new countdown discards the previous one,
//! so a clock can never fire into a phase it was not armed for.

use std::time::Duration;

use derive_where::derive_where;
use web_time::Instant;

/// An armed countdown
#[derive(Debug, Clone)]
struct Countdown<D> {
    /// Length the countdown was armed with
    duration: Duration,
    /// Instant at which the countdown runs out
    deadline: Instant,
    /// Payload handed back when the countdown runs out
    on_deadline: D,
}

/// A cancellable, single-fire countdown carrying a deadline payload `D`
#[derive(Clone)]
#[derive_where(Default)]
#[derive_where(Debug; D: std::fmt::Debug)]
pub struct PhaseClock<D> {
    countdown: Option<Countdown<D>>,
}

impl<D> PhaseClock<D> {
    /// Starts a countdown of `duration` from `now`
    ///
    /// Any countdown that is still armed is disarmed and its payload
    /// discarded.
    pub fn arm(&mut self, now: Instant, duration: Duration, on_deadline: D) {
        if self.countdown.is_some() {
            tracing::debug!("re-arming phase clock, previous countdown discarded");
        }

        tracing::debug!(?duration, "phase clock armed");

        self.countdown = Some(Countdown {
            duration,
            deadline: now + duration,
            on_deadline,
        });
    }

    /// Disarms the clock
    ///
    /// Safe to call at any time, including after the clock fired or when it
    /// was never armed.
    ///
    /// # Returns
    ///
    /// `true` if a pending countdown was disarmed
    pub fn cancel(&mut self) -> bool {
        let cancelled = self.countdown.take().is_some();
        if cancelled {
            tracing::debug!("phase clock cancelled");
        }
        cancelled
    }

    /// Whether a countdown is pending
    pub fn is_armed(&self) -> bool {
        self.countdown.is_some()
    }

    /// Length of the pending countdown
    pub fn duration(&self) -> Option<Duration> {
        self.countdown.as_ref().map(|c| c.duration)
    }

    /// Time left before the pending countdown runs out
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.countdown
            .as_ref()
            .map(|c| c.deadline.saturating_duration_since(now))
    }

    /// Time left in whole seconds, rounded up, for display
    pub fn remaining_secs(&self, now: Instant) -> Option<u64> {
        self.remaining(now)
            .map(|left| left.as_secs() + u64::from(left.subsec_nanos() > 0))
    }

    /// Checks the countdown against `now`
    ///
    /// # Returns
    ///
    /// The deadline payload exactly once, on the first poll at or after the
    /// deadline; `None` otherwise
    pub fn poll(&mut self, now: Instant) -> Option<D> {
        if self.countdown.as_ref()?.deadline > now {
            return None;
        }

        tracing::debug!("phase clock fired");

        self.countdown.take().map(|c| c.on_deadline)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Deadline {
        First,
        Second,
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_default_is_disarmed() {
        let mut clock = PhaseClock::<Deadline>::default();
        let now = Instant::now();

        assert!(!clock.is_armed());
        assert_eq!(clock.remaining(now), None);
        assert_eq!(clock.poll(now + secs(100)), None);
    }

    #[test]
    fn test_fires_once_at_deadline() {
        let mut clock = PhaseClock::default();
        let t0 = Instant::now();
        clock.arm(t0, secs(30), Deadline::First);

        assert_eq!(clock.poll(t0 + secs(29)), None);
        assert_eq!(clock.poll(t0 + secs(30)), Some(Deadline::First));
        assert_eq!(clock.poll(t0 + secs(31)), None);
        assert!(!clock.is_armed());
    }

    #[test]
    fn test_late_poll_still_fires() {
        let mut clock = PhaseClock::default();
        let t0 = Instant::now();
        clock.arm(t0, secs(5), Deadline::First);

        assert_eq!(clock.poll(t0 + secs(500)), Some(Deadline::First));
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let mut clock = PhaseClock::default();
        let t0 = Instant::now();
        clock.arm(t0, secs(30), Deadline::First);

        assert!(clock.cancel());
        assert_eq!(clock.poll(t0 + secs(30)), None);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut clock = PhaseClock::<Deadline>::default();
        let t0 = Instant::now();

        assert!(!clock.cancel());

        clock.arm(t0, secs(1), Deadline::First);
        assert_eq!(clock.poll(t0 + secs(1)), Some(Deadline::First));
        assert!(!clock.cancel());
        assert!(!clock.cancel());
    }

    #[test]
    fn test_rearm_discards_previous() {
        let mut clock = PhaseClock::default();
        let t0 = Instant::now();
        clock.arm(t0, secs(10), Deadline::First);
        clock.arm(t0 + secs(5), secs(10), Deadline::Second);

        assert_eq!(clock.poll(t0 + secs(10)), None);
        assert_eq!(clock.poll(t0 + secs(15)), Some(Deadline::Second));
        assert_eq!(clock.poll(t0 + secs(20)), None);
    }

    #[test]
    fn test_remaining_secs_rounds_up() {
        let mut clock = PhaseClock::default();
        let t0 = Instant::now();
        clock.arm(t0, secs(30), Deadline::First);

        assert_eq!(clock.duration(), Some(secs(30)));
        assert_eq!(clock.remaining_secs(t0), Some(30));
        assert_eq!(clock.remaining_secs(t0 + Duration::from_millis(500)), Some(30));
        assert_eq!(clock.remaining_secs(t0 + secs(29)), Some(1));
        assert_eq!(clock.remaining_secs(t0 + secs(45)), Some(0));
    }
}
