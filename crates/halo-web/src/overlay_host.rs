#![forbid(unsafe_code)]

//! Step-based overlay runner.
//!
//! [`OverlayHost`] ties the bounds tracker, the lifecycle scheduler and the
//! render surface together without threads or blocking. The host (JavaScript
//! or a native harness) controls the loop:
//!
//! 1. Push page events via [`OverlayHost::push_event`].
//! 2. Advance time via [`OverlayHost::advance_time`] or [`OverlayHost::set_time`].
//! 3. Call [`OverlayHost::step`] to apply events, fire due timers and render.
//! 4. Read the frame via [`OverlayHost::frame`] or [`OverlayHost::take_outputs`].
//!
//! # Example
//!
//! ```
//! use core::time::Duration;
//! use halo_core::geometry::{Rect, Size};
//! use halo_runtime::{Artist, Roster};
//! use halo_web::{HostConfig, HostEvent, OverlayHost};
//!
//! let roster = Roster::new(vec![Artist::new(1, "עומר אדם", "Omer Adam")]);
//! let mut host = OverlayHost::seeded(HostConfig::default(), roster, Size::new(1200.0, 800.0)).unwrap();
//!
//! host.push_event(HostEvent::Mount { rect: Some(Rect::new(450.0, 350.0, 300.0, 100.0)) });
//! host.advance_time(Duration::from_millis(900));
//! let result = host.step();
//! assert!(result.running);
//! ```

use core::time::Duration;
use std::collections::VecDeque;

use halo_core::geometry::{Rect, Size};
use halo_core::rng::{RandomSource, Xorshift64};
use halo_runtime::{
    BoundsTracker, BoundsTrigger, BoundsUpdate, LifecycleEvent, LifecycleScheduler, Roster,
};
use tracing::trace;

use crate::render::{RenderFrame, RenderSurface};
use crate::{DEFAULT_SEED, DeterministicClock, HostConfig, HostError, HostEvent};

/// Result of a single [`OverlayHost::step`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    /// Whether the scheduler is running after this step.
    pub running: bool,
    /// Whether the rendered layer is shown.
    pub visible: bool,
    /// Number of host events processed during this step.
    pub events_processed: u32,
    /// Number of timers applied during this step.
    pub timers_fired: usize,
    /// Current frame index (monotonically increasing).
    pub frame_idx: u64,
}

/// Captured outputs for host consumption.
#[derive(Debug, Default, Clone)]
pub struct HostOutputs {
    /// Last rendered frame.
    pub last_frame: Option<RenderFrame>,
    /// Lifecycle transitions since the last take.
    pub events: Vec<LifecycleEvent>,
}

/// Host-driven, non-blocking overlay runner.
#[derive(Debug)]
pub struct OverlayHost<R> {
    clock: DeterministicClock,
    queue: VecDeque<HostEvent>,
    tracker: BoundsTracker,
    scheduler: LifecycleScheduler<R>,
    surface: RenderSurface,
    /// Latest rectangle the host reported for the anchor.
    reported: Option<Rect>,
    activate_at: Option<Duration>,
    frame_idx: u64,
    outputs: HostOutputs,
}

impl OverlayHost<Xorshift64> {
    /// Create a host whose random source is seeded from `config.seed`.
    pub fn seeded(config: HostConfig, roster: Roster, viewport: Size) -> Result<Self, HostError> {
        let rng = Xorshift64::new(config.seed.unwrap_or(DEFAULT_SEED));
        Self::new(config, roster, viewport, rng)
    }
}

impl<R: RandomSource> OverlayHost<R> {
    /// Create a host for an initial viewport.
    pub fn new(config: HostConfig, roster: Roster, viewport: Size, rng: R) -> Result<Self, HostError> {
        let surface = RenderSurface::new(config.halo.lifecycle.fade_out);
        let activate_at = config.auto_activate.then(|| config.activation_delay());
        let scheduler = LifecycleScheduler::new(config.halo, roster, rng)?;
        Ok(Self {
            clock: DeterministicClock::new(),
            queue: VecDeque::new(),
            tracker: BoundsTracker::new(viewport),
            scheduler,
            surface,
            reported: None,
            activate_at,
            frame_idx: 0,
            outputs: HostOutputs::default(),
        })
    }

    /// Queue a page event. Events are applied on the next [`step`](Self::step).
    pub fn push_event(&mut self, event: HostEvent) {
        self.queue.push_back(event);
    }

    /// Advance the deterministic clock by `dt`.
    pub fn advance_time(&mut self, dt: Duration) {
        self.clock.advance(dt);
    }

    /// Set the deterministic clock to an absolute time. Never moves backwards.
    pub fn set_time(&mut self, now: Duration) {
        self.clock.set(now);
    }

    /// Swap the roster. An empty roster puts the overlay to sleep.
    pub fn set_roster(&mut self, roster: Roster) {
        self.scheduler.set_roster(roster, self.clock.now());
    }

    /// Apply queued events, the activation delay and due timers, then render.
    pub fn step(&mut self) -> StepResult {
        let now = self.clock.now();

        let mut events_processed: u32 = 0;
        while let Some(event) = self.queue.pop_front() {
            events_processed += 1;
            self.handle_event(event, now);
        }

        if let Some(at) = self.activate_at
            && now >= at
        {
            self.activate_at = None;
            trace!(now_ms = now.as_millis() as u64, "activation delay elapsed");
            self.scheduler.set_active(true, now);
        }

        let timers_fired = self.scheduler.advance_to(now);
        let frame = self.surface.render(&self.scheduler, now);
        let visible = frame.visible;
        self.outputs.last_frame = Some(frame);
        self.outputs.events.extend(self.scheduler.drain_events());
        self.frame_idx += 1;

        trace!(
            frame_idx = self.frame_idx,
            events_processed,
            timers_fired,
            items = self.scheduler.items().len(),
            "host step"
        );
        StepResult {
            running: self.scheduler.is_running(),
            visible,
            events_processed,
            timers_fired,
            frame_idx: self.frame_idx,
        }
    }

    /// Last rendered frame.
    #[must_use]
    pub fn frame(&self) -> Option<&RenderFrame> {
        self.outputs.last_frame.as_ref()
    }

    /// Take the captured outputs, leaving empty defaults.
    pub fn take_outputs(&mut self) -> HostOutputs {
        std::mem::take(&mut self.outputs)
    }

    /// Access the scheduler.
    #[must_use]
    pub fn scheduler(&self) -> &LifecycleScheduler<R> {
        &self.scheduler
    }

    /// Access the bounds tracker.
    #[must_use]
    pub fn tracker(&self) -> &BoundsTracker {
        &self.tracker
    }

    /// Current host time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Current frame index.
    #[must_use]
    pub fn frame_idx(&self) -> u64 {
        self.frame_idx
    }

    /// Whether an auto-activation is still waiting for its delay.
    #[must_use]
    pub fn activation_pending(&self) -> bool {
        self.activate_at.is_some()
    }

    // --- Private helpers ---

    fn handle_event(&mut self, event: HostEvent, now: Duration) {
        let update = match event {
            HostEvent::Mount { rect } => {
                self.reported = rect;
                self.notify(BoundsTrigger::Mount)
            }
            HostEvent::Mutation { rect } => {
                self.reported = rect;
                self.notify(BoundsTrigger::Mutation)
            }
            HostEvent::Resize { viewport } => self.notify(BoundsTrigger::Resize(viewport)),
            HostEvent::Scroll => self.notify(BoundsTrigger::Scroll),
            HostEvent::AnimationFrame { rect } => {
                self.reported = rect;
                self.tracker.on_frame(&move || rect)
            }
            HostEvent::Unmount => {
                self.reported = None;
                self.notify(BoundsTrigger::Unmount)
            }
            HostEvent::SetActive(active) => {
                self.activate_at = None;
                self.scheduler.set_active(active, now);
                None
            }
        };
        if let Some(BoundsUpdate {
            bounds, viewport, ..
        }) = update
        {
            self.scheduler.set_bounds(bounds, viewport, now);
        }
    }

    fn notify(&mut self, trigger: BoundsTrigger) -> Option<BoundsUpdate> {
        let reported = self.reported;
        self.tracker.notify(trigger, &move || reported)
    }
}
