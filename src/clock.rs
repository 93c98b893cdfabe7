//! Time as seen by the sequencer, and the single timer slot it owns.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Monotonic time source. `now` is measured from an arbitrary fixed origin.
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Production clock backed by [`Instant`].
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Clones share the same time, so a test
/// can keep one handle while the sequencer owns another.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// A pending timer: what fires, and when.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Deadline<K> {
    pub kind: K,
    pub due: Duration,
}

/// Holds at most one armed timer. Arming always replaces what was there, so
/// two timers can never be live at once.
#[derive(Clone, Debug)]
pub struct TimerSlot<K> {
    armed: Option<Deadline<K>>,
}

impl<K: Copy> TimerSlot<K> {
    pub fn new() -> Self {
        Self { armed: None }
    }

    pub fn arm(&mut self, kind: K, due: Duration) {
        self.armed = Some(Deadline { kind, due });
    }

    /// Disarm, returning what was pending.
    pub fn cancel(&mut self) -> Option<Deadline<K>> {
        self.armed.take()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Take the timer if it is due at `now`, leaving the slot empty.
    pub fn take_due(&mut self, now: Duration) -> Option<Deadline<K>> {
        match self.armed {
            Some(deadline) if deadline.due <= now => self.armed.take(),
            _ => None,
        }
    }
}

impl<K: Copy> Default for TimerSlot<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        assert_eq!(clock.now(), Duration::ZERO);

        handle.advance_secs(3);
        assert_eq!(clock.now(), Duration::from_secs(3));
    }

    #[test]
    fn system_clock_moves_forward() {
        let clock = SystemClock::new();
        let a = clock.now();
        std::thread::sleep(Duration::from_millis(2));
        assert!(clock.now() > a);
    }

    #[test]
    fn arming_replaces_the_previous_timer() {
        let mut slot = TimerSlot::new();
        slot.arm('a', Duration::from_secs(1));
        slot.arm('b', Duration::from_secs(5));

        assert_eq!(slot.take_due(Duration::from_secs(2)), None);
        assert_eq!(
            slot.take_due(Duration::from_secs(5)),
            Some(Deadline {
                kind: 'b',
                due: Duration::from_secs(5)
            })
        );
        assert!(!slot.is_armed());
    }

    #[test]
    fn cancel_empties_the_slot() {
        let mut slot = TimerSlot::new();
        slot.arm(1u8, Duration::from_secs(1));
        assert!(slot.cancel().is_some());
        assert!(slot.cancel().is_none());
        assert_eq!(slot.take_due(Duration::from_secs(10)), None);
    }
}
