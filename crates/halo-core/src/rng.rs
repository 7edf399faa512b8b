#![forbid(unsafe_code)]

//! Injectable randomness.
//!
//! Every random decision in the overlay (zone choice, distances, jitter,
//! name variant, lifetimes, particles, spawn intervals) is drawn from a single
//! [`RandomSource`]. Production hosts use a seeded [`Xorshift64`]; tests
//! substitute a [`SequenceRandom`] to pin exact choices.
//!
//! # Invariants
//!
//! 1. [`RandomSource::next_f64`] returns values in `[0.0, 1.0)`.
//! 2. [`RandomSource::range`] returns values in `[lo, hi)` (or `lo` when the
//!    range is empty).
//! 3. [`RandomSource::index`] returns values in `0..len` for `len > 0`.

use std::f64::consts::TAU;

/// A source of uniformly distributed values.
pub trait RandomSource {
    /// Next value in `[0.0, 1.0)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform value in `[lo, hi)`.
    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        lo + self.next_f64() * (hi - lo)
    }

    /// Uniform index in `0..len`. Returns 0 when `len` is 0.
    fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        ((self.next_f64() * len as f64) as usize).min(len - 1)
    }

    /// A fair coin: `true` when the draw is strictly above one half.
    fn coin(&mut self) -> bool {
        self.next_f64() > 0.5
    }

    /// Uniform angle in radians, `[0, 2π)`.
    fn angle(&mut self) -> f64 {
        self.next_f64() * TAU
    }
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_f64(&mut self) -> f64 {
        (**self).next_f64()
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_f64(&mut self) -> f64 {
        (**self).next_f64()
    }
}

/// Simple xorshift64 PRNG: deterministic for a given seed, no allocation.
#[derive(Debug, Clone)]
pub struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    /// Create a generator from `seed`. Any seed is accepted; zero is remapped.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        // Avoid the all-zero fixed point.
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15) | 1,
        }
    }

    /// Next raw 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

impl RandomSource for Xorshift64 {
    fn next_f64(&mut self) -> f64 {
        // Top 53 bits mapped onto the unit interval.
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

/// Replays a fixed list of draws, cycling when exhausted.
///
/// Values are clamped into `[0.0, 1.0)` so scripted inputs cannot violate the
/// [`RandomSource`] contract. An empty script always yields `0.0`.
#[derive(Debug, Clone, Default)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    /// Create a scripted source from `values`.
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            cursor: 0,
        }
    }

    /// A source that always returns `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Number of draws taken so far.
    pub fn draws(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&mut self) -> f64 {
        if self.values.is_empty() {
            self.cursor += 1;
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value.clamp(0.0, 1.0 - f64::EPSILON)
    }
}
