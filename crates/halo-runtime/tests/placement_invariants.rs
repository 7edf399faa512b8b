//! Property tests for the placement search.
//!
//! Whatever the rectangle, viewport and neighbours, an accepted position must
//! keep clear of the text, stay inside the padded viewport and keep its
//! distance from visible names. A fallback must stay within the distance band.

use halo_core::geometry::{Point, Rect, Size};
use halo_core::rng::Xorshift64;
use halo_runtime::{PlacementConfig, PlacementEngine, PlacementKind, ReferenceRect};
use proptest::prelude::*;

fn rect_strategy() -> impl Strategy<Value = Rect> {
    (0.0f64..1000.0, 0.0f64..700.0, 10.0f64..400.0, 10.0f64..200.0)
        .prop_map(|(x, y, w, h)| Rect::new(x, y, w, h))
}

fn viewport_strategy() -> impl Strategy<Value = Size> {
    (400.0f64..2000.0, 300.0f64..1200.0).prop_map(|(w, h)| Size::new(w, h))
}

fn occupied_strategy() -> impl Strategy<Value = Vec<Point>> {
    proptest::collection::vec(
        (0.0f64..2000.0, 0.0f64..1200.0).prop_map(|(x, y)| Point::new(x, y)),
        0..6,
    )
}

proptest! {
    #[test]
    fn accepted_positions_satisfy_every_rule(
        rect in rect_strategy(),
        viewport in viewport_strategy(),
        occupied in occupied_strategy(),
        seed in any::<u64>(),
    ) {
        let engine = PlacementEngine::default();
        let bounds = ReferenceRect::new(rect);
        let mut rng = Xorshift64::new(seed);
        let placement = engine.place(&bounds, viewport, &occupied, &mut rng);

        prop_assert!(placement.point.is_finite());
        match placement.kind {
            PlacementKind::Accepted { attempts, .. } => {
                prop_assert!((1..=50).contains(&attempts));
                prop_assert!(!rect.expand(20.0).contains(placement.point));
                prop_assert!(viewport.to_rect().shrink(50.0).contains(placement.point));
                for other in &occupied {
                    prop_assert!(placement.point.distance(other) >= 100.0);
                }
            }
            PlacementKind::Fallback => {
                let d = placement.point.distance(&bounds.center);
                prop_assert!((120.0 - 1e-6..=250.0 + 1e-6).contains(&d), "fallback distance {}", d);
            }
        }
    }

    #[test]
    fn candidates_leave_the_text_edge_by_the_distance_band(
        rect in rect_strategy(),
        seed in any::<u64>(),
    ) {
        let engine = PlacementEngine::default();
        let bounds = ReferenceRect::new(rect);
        let mut rng = Xorshift64::new(seed);
        for zone in halo_runtime::Zone::ALL {
            let p = engine.candidate(&bounds, zone, &mut rng);
            let gap = match zone {
                halo_runtime::Zone::Above => rect.top() - p.y,
                halo_runtime::Zone::Below => p.y - rect.bottom(),
                halo_runtime::Zone::Left => rect.left() - p.x,
                halo_runtime::Zone::Right => p.x - rect.right(),
            };
            prop_assert!((120.0 - 1e-9..280.0 + 1e-9).contains(&gap), "{:?} gap {}", zone, gap);
        }
    }
}

#[test]
fn never_lands_on_the_headline() {
    let engine = PlacementEngine::default();
    let bounds = ReferenceRect::new(Rect::new(500.0, 100.0, 300.0, 100.0));
    let viewport = Size::new(1200.0, 800.0);
    for seed in 0..500 {
        let mut rng = Xorshift64::new(seed);
        let p = engine.place(&bounds, viewport, &[], &mut rng).point;
        let on_text = (480.0..=820.0).contains(&p.x) && (80.0..=200.0).contains(&p.y);
        assert!(!on_text, "seed {seed} placed at {p:?}");
    }
}

#[test]
fn crowded_viewport_uses_fallback_band() {
    let engine = PlacementEngine::default();
    let bounds = ReferenceRect::new(Rect::new(500.0, 100.0, 300.0, 100.0));
    let viewport = Size::new(1200.0, 800.0);
    let mut occupied = Vec::new();
    for x in (0..=1200).step_by(60) {
        for y in (0..=800).step_by(60) {
            occupied.push(Point::new(f64::from(x), f64::from(y)));
        }
    }

    for seed in 0..20 {
        let mut rng = Xorshift64::new(seed);
        let placement = engine.place(&bounds, viewport, &occupied, &mut rng);
        assert!(placement.is_fallback());
        let d = placement.point.distance(&bounds.center);
        assert!((120.0..=250.0).contains(&d), "seed {seed}: distance {d}");
    }
}

#[test]
fn single_attempt_config_still_places() {
    let engine = PlacementEngine::new(PlacementConfig {
        max_attempts: 1,
        ..PlacementConfig::default()
    });
    let bounds = ReferenceRect::new(Rect::new(450.0, 350.0, 300.0, 100.0));
    let mut rng = Xorshift64::new(99);
    let placement = engine.place(&bounds, Size::new(1200.0, 800.0), &[], &mut rng);
    assert!(placement.point.is_finite());
}
