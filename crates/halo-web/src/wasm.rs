#![forbid(unsafe_code)]

use core::time::Duration;

use halo_core::geometry::{Rect, Size};
use halo_core::rng::Xorshift64;
use halo_runtime::Measure;
use wasm_bindgen::prelude::*;
use web_sys::Element;
use web_time::Instant;

use crate::render::RenderFrame;
use crate::{HostConfig, HostError, HostEvent, OverlayHost, duration_from_millis, roster_from_json_str};

/// Anchor heading read through `getBoundingClientRect()`.
struct Anchor(Element);

impl Measure for Anchor {
    fn measure(&self) -> Option<Rect> {
        if !self.0.is_connected() {
            return None;
        }
        let r = self.0.get_bounding_client_rect();
        Some(Rect::new(r.left(), r.top(), r.width(), r.height()))
    }
}

fn to_js(err: HostError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

/// Floating artist-name overlay.
///
/// JS owns the page: it forwards lifecycle, resize, scroll and element-size
/// events, calls `animationFrame()` + `step()` from `requestAnimationFrame`,
/// and draws the returned frame JSON.
#[wasm_bindgen]
pub struct HaloOverlay {
    host: Option<OverlayHost<Xorshift64>>,
    anchor: Option<Anchor>,
    origin: Instant,
}

#[wasm_bindgen]
impl HaloOverlay {
    /// Create an overlay from JSON config and roster documents.
    ///
    /// `seed` overrides the configured seed when given.
    #[wasm_bindgen(constructor)]
    pub fn new(
        config_json: &str,
        roster_json: &str,
        width: f64,
        height: f64,
        seed: Option<f64>,
    ) -> Result<HaloOverlay, JsValue> {
        let mut config = HostConfig::from_json_str(config_json).map_err(to_js)?;
        if let Some(seed) = seed.filter(|s| s.is_finite() && *s >= 0.0) {
            config.seed = Some(seed as u64);
        }
        let roster = roster_from_json_str(roster_json).map_err(to_js)?;
        let host = OverlayHost::seeded(config, roster, Size::new(width, height)).map_err(to_js)?;
        Ok(Self {
            host: Some(host),
            anchor: None,
            origin: Instant::now(),
        })
    }

    /// Start tracking `anchor` and measure it immediately.
    pub fn mount(&mut self, anchor: Element) {
        let anchor = Anchor(anchor);
        let rect = anchor.measure();
        self.anchor = Some(anchor);
        self.push(HostEvent::Mount { rect });
    }

    /// Stop tracking the anchor; the overlay goes dormant.
    pub fn unmount(&mut self) {
        self.anchor = None;
        self.push(HostEvent::Unmount);
    }

    /// Viewport size changed. Measured on the next `animationFrame()`.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.push(HostEvent::Resize {
            viewport: Size::new(width, height),
        });
    }

    /// Window or a nested container scrolled. Measured on the next
    /// `animationFrame()`.
    pub fn scroll(&mut self) {
        self.push(HostEvent::Scroll);
    }

    /// The anchor's own size changed (`ResizeObserver`).
    pub fn mutation(&mut self) {
        let rect = self.measure();
        self.push(HostEvent::Mutation { rect });
    }

    /// Run the measurement coalesced from resize and scroll events.
    #[wasm_bindgen(js_name = animationFrame)]
    pub fn animation_frame(&mut self) {
        let rect = self.measure();
        self.push(HostEvent::AnimationFrame { rect });
    }

    #[wasm_bindgen(js_name = setActive)]
    pub fn set_active(&mut self, active: bool) {
        self.push(HostEvent::SetActive(active));
    }

    /// Sync the overlay clock with wall time since construction.
    pub fn tick(&mut self) {
        let elapsed = self.origin.elapsed();
        if let Some(host) = self.host.as_mut() {
            host.set_time(elapsed);
        }
    }

    /// Advance the overlay clock by `ms` milliseconds (tests, replays).
    pub fn advance(&mut self, ms: f64) {
        let Some(dt) = duration_from_millis(ms) else {
            return;
        };
        if let Some(host) = self.host.as_mut() {
            host.advance_time(dt);
        }
    }

    /// Apply pending events and due timers; returns the frame as JSON.
    pub fn step(&mut self) -> Result<String, JsValue> {
        let Some(host) = self.host.as_mut() else {
            return RenderFrame::hidden(Duration::ZERO).to_json_string().map_err(to_js);
        };
        host.step();
        let json = match host.frame() {
            Some(frame) => frame.to_json_string(),
            None => RenderFrame::hidden(host.now()).to_json_string(),
        };
        json.map_err(to_js)
    }

    /// Explicit teardown for JS callers. Drops every timer and name.
    pub fn destroy(&mut self) {
        self.host = None;
        self.anchor = None;
    }
}

impl HaloOverlay {
    fn measure(&self) -> Option<Rect> {
        self.anchor.as_ref().and_then(Measure::measure)
    }

    fn push(&mut self, event: HostEvent) {
        if let Some(host) = self.host.as_mut() {
            host.push_event(event);
        }
    }
}
