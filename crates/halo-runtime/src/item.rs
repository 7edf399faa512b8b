#![forbid(unsafe_code)]

//! Transient name items and their decorative particles.

use std::fmt;
use std::time::Duration;

use halo_core::geometry::Point;
use halo_core::rng::RandomSource;

use crate::config::ParticleConfig;
use crate::placement::PlacementKind;
use crate::roster::ArtistId;

/// Unique, never reused identifier of a spawned name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "name-{}", self.0)
    }
}

/// Where an item is in its one-way lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Phase {
    /// Created, waiting for the reveal delay.
    Pending,
    /// Shown.
    Visible,
    /// Fading out; removed when the fade-out window ends.
    Exiting,
}

/// One smoke particle drifting away from its name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Final offset from the name's anchor point (px).
    pub offset: Point,
    /// Delay before the drift starts, measured from creation.
    pub delay: Duration,
    pub duration: Duration,
}

/// A floating artist name.
#[derive(Debug, Clone, PartialEq)]
pub struct NameItem {
    pub id: ItemId,
    pub artist_id: ArtistId,
    pub display_text: String,
    /// Anchor point; fixed for the item's whole life.
    pub position: Point,
    pub phase: Phase,
    /// Time spent visible before the fade-out starts.
    pub lifetime: Duration,
    pub particles: Vec<Particle>,
    pub placement: PlacementKind,
    pub created_at: Duration,
    pub phase_changed_at: Duration,
}

impl NameItem {
    /// Whether the item is currently shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.phase == Phase::Visible
    }

    /// Pending or visible; counts against the ceiling.
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self.phase, Phase::Pending | Phase::Visible)
    }

    /// Time spent in the current phase.
    #[must_use]
    pub fn phase_elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.phase_changed_at)
    }
}

/// Draw the particle set for a new name.
pub fn roll_particles<R: RandomSource + ?Sized>(config: &ParticleConfig, rng: &mut R) -> Vec<Particle> {
    let spread = config.count_max.saturating_sub(config.count_min) + 1;
    let count = config.count_min + rng.index(spread);
    (0..count)
        .map(|i| {
            let angle = rng.angle();
            let distance = rng.range(config.distance_min, config.distance_max);
            let step = u32::try_from(i).map_or(Duration::MAX, |i| config.delay_step.saturating_mul(i));
            Particle {
                offset: Point::default().polar(angle, distance),
                delay: config.base_delay.saturating_add(step),
                duration: duration_between(rng, config.duration_min, config.duration_max),
            }
        })
        .collect()
}

/// Uniform duration in `[min, max)` at millisecond resolution.
pub fn duration_between<R: RandomSource + ?Sized>(rng: &mut R, min: Duration, max: Duration) -> Duration {
    let lo = min.as_millis() as f64;
    let hi = max.as_millis() as f64;
    Duration::from_millis(rng.range(lo, hi).floor() as u64)
}

#[cfg(test)]
mod tests {
    use halo_core::rng::{SequenceRandom, Xorshift64};

    use super::*;

    #[test]
    fn particle_count_and_delays() {
        let config = ParticleConfig::default();
        let mut rng = SequenceRandom::constant(0.0);
        let particles = roll_particles(&config, &mut rng);
        assert_eq!(particles.len(), 5);
        let delays: Vec<u64> = particles.iter().map(|p| p.delay.as_millis() as u64).collect();
        assert_eq!(delays, vec![200, 300, 400, 500, 600]);
        assert!(particles.iter().all(|p| p.duration == Duration::from_secs(2)));
    }

    #[test]
    fn particle_ranges_hold_for_random_draws() {
        let config = ParticleConfig::default();
        let mut rng = Xorshift64::new(11);
        for _ in 0..200 {
            let particles = roll_particles(&config, &mut rng);
            assert!((5..=8).contains(&particles.len()));
            for p in &particles {
                let d = p.offset.distance(&Point::default());
                assert!((30.0 - 1e-9..80.0 + 1e-9).contains(&d));
                assert!(p.duration >= Duration::from_secs(2) && p.duration < Duration::from_secs(3));
            }
        }
    }

    #[test]
    fn max_draw_gives_largest_count() {
        let mut rng = SequenceRandom::constant(0.999);
        assert_eq!(roll_particles(&ParticleConfig::default(), &mut rng).len(), 8);
    }

    #[test]
    fn duration_between_bounds() {
        let mut rng = SequenceRandom::new(vec![0.0, 0.5]);
        let min = Duration::from_millis(4000);
        let max = Duration::from_millis(7000);
        assert_eq!(duration_between(&mut rng, min, max), min);
        assert_eq!(duration_between(&mut rng, min, max), Duration::from_millis(5500));
        assert_eq!(duration_between(&mut rng, max, max), max);
    }

    #[test]
    fn item_id_display() {
        assert_eq!(ItemId(12).to_string(), "name-12");
    }
}
