#![forbid(unsafe_code)]

//! Reference-rectangle tracking.
//!
//! The [`BoundsTracker`] keeps the latest on-screen box of the anchor heading
//! together with the viewport size. Hosts forward page triggers through
//! [`BoundsTracker::notify`] and call [`BoundsTracker::on_frame`] once per
//! animation frame:
//!
//! - `Mount` and `Mutation` measure immediately.
//! - `Resize` and `Scroll` are coalesced: a burst of them produces a single
//!   measurement on the next frame, using the latest viewport.
//! - `Unmount` clears the rectangle so dependents go dormant.
//!
//! A [`BoundsUpdate`] is published only when the rectangle or the viewport
//! actually changed. A source that cannot measure (element detached, zero
//! layout) leaves the previous state in place.

use halo_core::geometry::{Point, Rect, Size};
use tracing::trace;

/// The measured box of the anchor element plus its cached centre.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReferenceRect {
    pub rect: Rect,
    pub center: Point,
}

impl ReferenceRect {
    /// Wrap a measured rectangle.
    #[must_use]
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            center: rect.center(),
        }
    }
}

impl From<Rect> for ReferenceRect {
    fn from(rect: Rect) -> Self {
        Self::new(rect)
    }
}

/// Reads the anchor element's current geometry.
pub trait Measure {
    /// Current bounding box, or `None` when the element is unavailable.
    fn measure(&self) -> Option<Rect>;
}

impl<F> Measure for F
where
    F: Fn() -> Option<Rect>,
{
    fn measure(&self) -> Option<Rect> {
        self()
    }
}

/// Page events that may move the anchor element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundsTrigger {
    Mount,
    /// The viewport changed to the given size.
    Resize(Size),
    /// Window or any nested container scrolled.
    Scroll,
    /// The element's own size changed.
    Mutation,
    Unmount,
}

/// Published whenever the tracked rectangle or viewport changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsUpdate {
    pub bounds: Option<ReferenceRect>,
    pub viewport: Size,
    pub generation: u64,
}

/// Tracks the anchor rectangle across page events.
#[derive(Debug, Clone)]
pub struct BoundsTracker {
    current: Option<ReferenceRect>,
    viewport: Size,
    pending_viewport: Option<Size>,
    frame_pending: bool,
    mounted: bool,
    generation: u64,
}

impl BoundsTracker {
    /// Create an unmounted tracker for a viewport.
    #[must_use]
    pub fn new(viewport: Size) -> Self {
        Self {
            current: None,
            viewport,
            pending_viewport: None,
            frame_pending: false,
            mounted: false,
            generation: 0,
        }
    }

    /// Handle a page trigger.
    pub fn notify<M: Measure + ?Sized>(&mut self, trigger: BoundsTrigger, source: &M) -> Option<BoundsUpdate> {
        match trigger {
            BoundsTrigger::Mount => {
                self.mounted = true;
                let changed = self.measure(source);
                self.publish_if(changed)
            }
            BoundsTrigger::Mutation => {
                let changed = self.measure(source);
                self.publish_if(changed)
            }
            BoundsTrigger::Resize(viewport) => {
                self.pending_viewport = Some(viewport);
                self.frame_pending = true;
                None
            }
            BoundsTrigger::Scroll => {
                self.frame_pending = true;
                None
            }
            BoundsTrigger::Unmount => {
                self.mounted = false;
                self.frame_pending = false;
                self.pending_viewport = None;
                let changed = self.current.take().is_some();
                self.publish_if(changed)
            }
        }
    }

    /// Run the coalesced measurement, if one was requested since the last frame.
    pub fn on_frame<M: Measure + ?Sized>(&mut self, source: &M) -> Option<BoundsUpdate> {
        if !self.frame_pending {
            return None;
        }
        self.frame_pending = false;

        let mut changed = false;
        if let Some(viewport) = self.pending_viewport.take()
            && viewport != self.viewport
        {
            self.viewport = viewport;
            changed = true;
        }
        changed |= self.measure(source);
        self.publish_if(changed)
    }

    /// Read the source and store the result. Returns whether the rectangle changed.
    ///
    /// Unmounted trackers and unusable readings keep the previous state.
    pub fn measure<M: Measure + ?Sized>(&mut self, source: &M) -> bool {
        if !self.mounted {
            return false;
        }
        let Some(rect) = source.measure().filter(Rect::is_finite) else {
            trace!("anchor unavailable; keeping previous bounds");
            return false;
        };
        let next = ReferenceRect::new(rect);
        if self.current == Some(next) {
            return false;
        }
        self.current = Some(next);
        true
    }

    /// Latest rectangle, if mounted and measured.
    #[must_use]
    pub fn current(&self) -> Option<ReferenceRect> {
        self.current
    }

    #[must_use]
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Number of updates published so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a resize or scroll is waiting for the next frame.
    #[must_use]
    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    fn publish_if(&mut self, changed: bool) -> Option<BoundsUpdate> {
        if !changed {
            return None;
        }
        self.generation += 1;
        trace!(generation = self.generation, has_bounds = self.current.is_some(), "bounds published");
        Some(BoundsUpdate {
            bounds: self.current,
            viewport: self.viewport,
            generation: self.generation,
        })
    }
}
