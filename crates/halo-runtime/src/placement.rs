#![forbid(unsafe_code)]

//! Bounded random search for a name position around the reference rectangle.
//!
//! Each attempt picks one of four [`Zone`]s, an outward distance from the
//! matching edge and a cross-axis offset around the centre, then checks the
//! candidate against three rules:
//!
//! 1. not inside the rectangle grown by `text_margin` (edges inclusive);
//! 2. inside the viewport shrunk by `viewport_padding` (edges inclusive);
//! 3. at least `min_separation` away from every occupied point.
//!
//! When `max_attempts` candidates are all rejected the engine falls back to a
//! point at a random angle and distance from the centre. The fallback may
//! break the rules; it exists so a spawn always gets a position.

use halo_core::geometry::{Point, Size};
use halo_core::rng::RandomSource;
use tracing::{debug, trace};

use crate::bounds::ReferenceRect;
use crate::config::PlacementConfig;

/// Side of the reference rectangle a candidate is projected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Zone {
    Above,
    Below,
    Left,
    Right,
}

impl Zone {
    pub const ALL: [Zone; 4] = [Zone::Above, Zone::Below, Zone::Left, Zone::Right];
}

/// How a position was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum PlacementKind {
    /// Passed every rule on the given attempt (1-based).
    Accepted { attempts: u32, zone: Zone },
    /// The search was exhausted.
    Fallback,
}

/// Result of a placement search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub point: Point,
    pub kind: PlacementKind,
}

impl Placement {
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self.kind, PlacementKind::Fallback)
    }
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    InsideText,
    OutsideViewport,
    TooClose,
}

/// Stateless placement search over a [`PlacementConfig`].
#[derive(Debug, Clone, Default)]
pub struct PlacementEngine {
    config: PlacementConfig,
}

impl PlacementEngine {
    #[must_use]
    pub fn new(config: PlacementConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Find a position for a new name. Never fails.
    ///
    /// `occupied` holds the positions of currently visible names.
    pub fn place<R: RandomSource + ?Sized>(
        &self,
        bounds: &ReferenceRect,
        viewport: Size,
        occupied: &[Point],
        rng: &mut R,
    ) -> Placement {
        let max_attempts = self.config.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let zone = Zone::ALL[rng.index(Zone::ALL.len())];
            let point = self.candidate(bounds, zone, rng);
            match self.check(point, bounds, viewport, occupied) {
                Ok(()) => {
                    trace!(attempt, ?zone, x = point.x, y = point.y, "placement accepted");
                    return Placement {
                        point,
                        kind: PlacementKind::Accepted {
                            attempts: attempt,
                            zone,
                        },
                    };
                }
                Err(reason) => trace!(attempt, ?zone, ?reason, "placement rejected"),
            }
        }

        let point = self.fallback(bounds, rng);
        debug!(
            attempts = max_attempts,
            x = point.x,
            y = point.y,
            occupied = occupied.len(),
            "placement search exhausted; using fallback position"
        );
        Placement {
            point,
            kind: PlacementKind::Fallback,
        }
    }

    /// Project one candidate from `zone`.
    pub fn candidate<R: RandomSource + ?Sized>(&self, bounds: &ReferenceRect, zone: Zone, rng: &mut R) -> Point {
        let c = &self.config;
        let rect = &bounds.rect;
        let distance = rng.range(c.min_distance, c.max_distance);
        match zone {
            Zone::Above | Zone::Below => {
                let x = bounds.center.x + (rng.next_f64() - 0.5) * rect.width * c.spread;
                let reach = distance + rng.range(0.0, c.jitter);
                let y = if zone == Zone::Above {
                    rect.top() - reach
                } else {
                    rect.bottom() + reach
                };
                Point::new(x, y)
            }
            Zone::Left | Zone::Right => {
                let reach = distance + rng.range(0.0, c.jitter);
                let x = if zone == Zone::Left {
                    rect.left() - reach
                } else {
                    rect.right() + reach
                };
                let y = bounds.center.y + (rng.next_f64() - 0.5) * rect.height * c.spread;
                Point::new(x, y)
            }
        }
    }

    /// Apply the three placement rules to `point`.
    pub fn check(
        &self,
        point: Point,
        bounds: &ReferenceRect,
        viewport: Size,
        occupied: &[Point],
    ) -> Result<(), Rejection> {
        if bounds.rect.expand(self.config.text_margin).contains(point) {
            return Err(Rejection::InsideText);
        }
        let usable = viewport.to_rect().shrink(self.config.viewport_padding);
        if !usable.contains(point) {
            return Err(Rejection::OutsideViewport);
        }
        if occupied
            .iter()
            .any(|other| point.distance(other) < self.config.min_separation)
        {
            return Err(Rejection::TooClose);
        }
        Ok(())
    }

    /// Whether `point` satisfies every placement rule.
    #[must_use]
    pub fn is_acceptable(&self, point: Point, bounds: &ReferenceRect, viewport: Size, occupied: &[Point]) -> bool {
        self.check(point, bounds, viewport, occupied).is_ok()
    }

    fn fallback<R: RandomSource + ?Sized>(&self, bounds: &ReferenceRect, rng: &mut R) -> Point {
        let angle = rng.angle();
        let distance = rng.range(self.config.min_distance, self.config.max_distance);
        bounds.center.polar(angle, distance)
    }
}

#[cfg(test)]
mod tests {
    use halo_core::geometry::Rect;
    use halo_core::rng::SequenceRandom;

    use super::*;

    fn headline() -> ReferenceRect {
        ReferenceRect::new(Rect::new(500.0, 100.0, 300.0, 100.0))
    }

    const VIEWPORT: Size = Size::new(1200.0, 800.0);

    #[test]
    fn below_candidate_geometry() {
        let engine = PlacementEngine::default();
        // distance 120, cross offset 0, jitter 0
        let mut rng = SequenceRandom::new(vec![0.0, 0.5, 0.0]);
        let p = engine.candidate(&headline(), Zone::Below, &mut rng);
        assert_eq!(p, Point::new(650.0, 320.0));
    }

    #[test]
    fn left_candidate_geometry() {
        let engine = PlacementEngine::default();
        // distance 120, jitter 15, cross offset -0.5 * 100 * 1.5
        let mut rng = SequenceRandom::new(vec![0.0, 0.5, 0.0]);
        let p = engine.candidate(&headline(), Zone::Left, &mut rng);
        assert_eq!(p, Point::new(500.0 - 135.0, 150.0 - 75.0));
    }

    #[test]
    fn accepts_first_valid_candidate() {
        let engine = PlacementEngine::default();
        // zone index 1 (below), distance 120, centred, no jitter
        let mut rng = SequenceRandom::new(vec![0.3, 0.0, 0.5, 0.0]);
        let placement = engine.place(&headline(), VIEWPORT, &[], &mut rng);
        assert_eq!(placement.point, Point::new(650.0, 320.0));
        assert_eq!(
            placement.kind,
            PlacementKind::Accepted {
                attempts: 1,
                zone: Zone::Below
            }
        );
    }

    #[test]
    fn margin_edge_is_inside_text() {
        let engine = PlacementEngine::default();
        let bounds = headline();
        assert_eq!(
            engine.check(Point::new(480.0, 150.0), &bounds, VIEWPORT, &[]),
            Err(Rejection::InsideText)
        );
        assert!(engine.is_acceptable(Point::new(479.0, 150.0), &bounds, VIEWPORT, &[]));
    }

    #[test]
    fn padding_edge_is_inside_viewport() {
        let engine = PlacementEngine::default();
        let bounds = headline();
        assert!(engine.is_acceptable(Point::new(50.0, 750.0), &bounds, VIEWPORT, &[]));
        assert_eq!(
            engine.check(Point::new(49.9, 400.0), &bounds, VIEWPORT, &[]),
            Err(Rejection::OutsideViewport)
        );
    }

    #[test]
    fn viewport_narrower_than_padding_accepts_nothing() {
        let engine = PlacementEngine::default();
        let far = ReferenceRect::new(Rect::new(5000.0, 5000.0, 10.0, 10.0));
        let narrow = Size::new(60.0, 800.0);
        for x in [0.0, 10.0, 30.0, 50.0, 60.0] {
            assert_eq!(
                engine.check(Point::new(x, 400.0), &far, narrow, &[]),
                Err(Rejection::OutsideViewport),
                "x = {x}"
            );
        }
    }

    #[test]
    fn separation_is_strict() {
        let engine = PlacementEngine::default();
        let bounds = headline();
        let p = Point::new(300.0, 500.0);
        assert!(engine.is_acceptable(p, &bounds, VIEWPORT, &[Point::new(400.0, 500.0)]));
        assert_eq!(
            engine.check(p, &bounds, VIEWPORT, &[Point::new(399.0, 500.0)]),
            Err(Rejection::TooClose)
        );
    }

    #[test]
    fn exhausted_search_falls_back_near_center() {
        let engine = PlacementEngine::new(PlacementConfig {
            max_attempts: 3,
            ..PlacementConfig::default()
        });
        // Every candidate lands inside a viewport too small to hold it.
        let tiny = Size::new(200.0, 200.0);
        let mut rng = SequenceRandom::new(vec![0.25, 0.5, 0.75]);
        let placement = engine.place(&headline(), tiny, &[], &mut rng);
        assert!(placement.is_fallback());
        let d = placement.point.distance(&headline().center);
        assert!((120.0..=250.0).contains(&d), "fallback distance {d}");
    }
}
