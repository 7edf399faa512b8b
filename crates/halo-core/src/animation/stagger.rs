#![forbid(unsafe_code)]

//! Spawn spacing for bursts.
//!
//! A burst of names must not pop in on the same frame. [`stagger_offsets`]
//! spreads `count` spawns over `(count - 1) * delay`: the first spawn is
//! immediate, offsets never decrease, and `Linear` spacing is exact.

use std::time::Duration;

use super::{EasingFn, ease_in, ease_out};

/// How spawn offsets are distributed inside a burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StaggerMode {
    /// `offset[i] = i * delay`.
    #[default]
    Linear,
    /// Tight at first, spreading out.
    EaseIn,
    /// Spread out at first, tightening.
    EaseOut,
}

/// Offsets for `count` spawns, `delay` apart on average.
#[must_use]
pub fn stagger_offsets(count: usize, delay: Duration, mode: StaggerMode) -> Vec<Duration> {
    let easing: EasingFn = match mode {
        StaggerMode::Linear => {
            return (0..count)
                .map(|i| delay.saturating_mul(u32::try_from(i).unwrap_or(u32::MAX)))
                .collect();
        }
        StaggerMode::EaseIn => ease_in,
        StaggerMode::EaseOut => ease_out,
    };
    if count <= 1 {
        return vec![Duration::ZERO; count];
    }

    let last = (count - 1) as f64;
    let total = delay.as_secs_f64() * last;
    (0..count)
        .map(|i| Duration::from_secs_f64(total * f64::from(easing(i as f32 / last as f32))))
        .collect()
}
