#![forbid(unsafe_code)]

//! Host-clocked one-shot timers with epoch cancellation.
//!
//! The overlay never blocks and never spawns threads: every pending callback
//! is an entry in a [`TimerQueue`], and the owner drains due entries whenever
//! the host advances time.
//!
//! # Invariants
//!
//! 1. Entries fire in `(due, arm order)` order; two timers armed for the same
//!    instant fire in the order they were armed.
//! 2. Entries dropped by [`TimerQueue::cancel_all`] never fire.
//! 3. Every fired entry carries the [`Epoch`] it was armed in. Owners bump
//!    their epoch on teardown and ignore fires from older epochs, so a stale
//!    entry that escaped cancellation is inert.
//! 4. `pop_due(now)` never returns an entry whose `due > now`.

use std::collections::BTreeMap;
use std::time::Duration;

/// Identifier of an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Raw numeric id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Activation generation. Timers armed under one epoch are inert in any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Epoch(u64);

impl Epoch {
    /// The next generation.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Raw generation counter.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// A timer that came due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<T> {
    pub id: TimerId,
    pub epoch: Epoch,
    /// Instant the timer was due (not the instant it was drained).
    pub due: Duration,
    pub task: T,
}

#[derive(Debug, Clone)]
struct Entry<T> {
    epoch: Epoch,
    task: T,
}

/// Ordered queue of pending one-shot timers.
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    entries: BTreeMap<(Duration, TimerId), Entry<T>>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Arm a timer that comes due at `due`.
    pub fn schedule_at(&mut self, due: Duration, epoch: Epoch, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.entries.insert((due, id), Entry { epoch, task });
        id
    }

    /// Cancel every pending timer, returning how many were dropped.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    /// Remove and return the earliest timer due at or before `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<Fired<T>> {
        let (&(due, _), _) = self.entries.first_key_value()?;
        if due > now {
            return None;
        }
        let ((due, id), entry) = self.entries.pop_first()?;
        Some(Fired {
            id,
            epoch: entry.epoch,
            due,
            task: entry.task,
        })
    }

    /// Instant of the earliest pending timer.
    #[must_use]
    pub fn next_due(&self) -> Option<Duration> {
        self.entries.keys().next().map(|(due, _)| *due)
    }

    /// Number of pending timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no timers are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending timers in firing order.
    pub fn iter(&self) -> impl Iterator<Item = (TimerId, Duration, Epoch, &T)> + '_ {
        self.entries
            .iter()
            .map(|((due, id), entry)| (*id, *due, entry.epoch, &entry.task))
    }
}

impl<T: Clone> TimerQueue<T> {
    /// Copies of every pending timer, in firing order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Fired<T>> {
        self.iter()
            .map(|(id, due, epoch, task)| Fired {
                id,
                epoch,
                due,
                task: task.clone(),
            })
            .collect()
    }
}
