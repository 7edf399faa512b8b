#![forbid(unsafe_code)]

//! Stateless animation curves.
//!
//! Names only remember *when* a phase began, so every curve here is a pure
//! function of the time elapsed since its start: `curve.at(elapsed)` yields a
//! normalized `f32` in `[0, 1]`. Hosts that paint frames themselves use them
//! for opacity and particle drift instead of CSS keyframes.

pub mod stagger;

use std::time::Duration;

/// Easing function signature: maps `t` in [0, 1] to output in [0, 1].
pub type EasingFn = fn(f32) -> f32;

/// Constant velocity.
#[inline]
pub fn linear(t: f32) -> f32 {
    t.clamp(0.0, 1.0)
}

/// Quadratic ease-in (slow start).
#[inline]
pub fn ease_in(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t
}

/// Quadratic ease-out (slow end). Close enough to CSS `ease-out` for
/// progress estimates.
#[inline]
pub fn ease_out(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}

/// A curve sampled by elapsed time.
pub trait Curve {
    /// Value `elapsed` after the curve started, in `[0, 1]`.
    fn at(&self, elapsed: Duration) -> f32;

    /// Time until the curve holds its final value.
    fn span(&self) -> Duration;

    fn is_complete(&self, elapsed: Duration) -> bool {
        elapsed >= self.span()
    }
}

/// Ramp from 0 to 1 over a duration, shaped by an easing function.
#[derive(Debug, Clone, Copy)]
pub struct Fade {
    duration: Duration,
    easing: EasingFn,
}

impl Fade {
    /// A linear fade. A zero duration completes on the first nanosecond.
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            duration: duration.max(Duration::from_nanos(1)),
            easing: linear,
        }
    }

    #[must_use]
    pub fn easing(mut self, easing: EasingFn) -> Self {
        self.easing = easing;
        self
    }

    /// Linear progress before easing.
    pub fn raw_progress(&self, elapsed: Duration) -> f32 {
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        (t as f32).clamp(0.0, 1.0)
    }
}

impl Curve for Fade {
    fn at(&self, elapsed: Duration) -> f32 {
        (self.easing)(self.raw_progress(elapsed))
    }

    fn span(&self) -> Duration {
        self.duration
    }
}

/// Holds 0 for `delay`, then plays `inner`.
#[derive(Debug, Clone, Copy)]
pub struct Delayed<C> {
    delay: Duration,
    inner: C,
}

impl<C: Curve> Curve for Delayed<C> {
    fn at(&self, elapsed: Duration) -> f32 {
        match elapsed.checked_sub(self.delay) {
            Some(local) => self.inner.at(local),
            None => 0.0,
        }
    }

    fn span(&self) -> Duration {
        self.delay.saturating_add(self.inner.span())
    }
}

/// Wait `d`, then play `curve`.
pub fn delay<C: Curve>(d: Duration, curve: C) -> Delayed<C> {
    Delayed { delay: d, inner: curve }
}

/// Plays `inner` backwards in value: 1 at the start, 0 at the end.
#[derive(Debug, Clone, Copy)]
pub struct Reverse<C>(pub C);

impl<C: Curve> Curve for Reverse<C> {
    fn at(&self, elapsed: Duration) -> f32 {
        1.0 - self.0.at(elapsed)
    }

    fn span(&self) -> Duration {
        self.0.span()
    }
}
