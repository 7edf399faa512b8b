#![forbid(unsafe_code)]

//! Passive projection of the tracked names into render frames.
//!
//! A [`RenderFrame`] carries everything a DOM or canvas host needs: the layer
//! contract, and per name its anchor, text, animation state, CSS animation
//! string, and an eased opacity for hosts that composite themselves. The
//! surface only reads scheduler state.

use core::time::Duration;

use halo_core::animation::{Curve, Fade, Reverse, delay, ease_out};
use halo_runtime::{LifecycleScheduler, NameItem, Phase};
use serde::{Deserialize, Serialize};

use crate::HostError;

/// Stacking order of the overlay layer.
pub const LAYER_Z_INDEX: i32 = 15;
/// CSS animation applied while a name enters.
pub const ENTER_ANIMATION: &str = "pop-up-explode 2.5s ease-out forwards";
/// CSS animation applied while a name fades out.
pub const EXIT_ANIMATION: &str = "fade-out 2.5s ease-out forwards";
/// Anchoring transform: positions refer to the name's centre.
pub const ANCHOR_TRANSFORM: &str = "translate(-50%, -50%)";

const ENTER_DURATION: Duration = Duration::from_millis(2500);

/// Per-name animation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationState {
    /// Created but not shown yet; drawn fully transparent.
    Pending,
    Enter,
    Exit,
}

impl From<Phase> for AnimationState {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Pending => Self::Pending,
            Phase::Visible => Self::Enter,
            Phase::Exiting => Self::Exit,
        }
    }
}

/// Fixed, full-viewport, click-through layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStyle {
    pub position: String,
    pub inset: f64,
    pub pointer_events: String,
    pub overflow: String,
    pub z_index: i32,
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self {
            position: "fixed".into(),
            inset: 0.0,
            pointer_events: "none".into(),
            overflow: "visible".into(),
            z_index: LAYER_Z_INDEX,
        }
    }
}

/// One drifting smoke particle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedParticle {
    pub key: String,
    /// End offset relative to the name's anchor (px).
    pub end_x: f64,
    pub end_y: f64,
    pub delay_ms: u64,
    pub duration_ms: u64,
    /// Eased drift progress in `[0, 1]`.
    pub progress: f32,
}

/// One floating name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedItem {
    pub key: String,
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub transform: String,
    pub state: AnimationState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
    pub opacity: f32,
    pub particles: Vec<RenderedParticle>,
}

/// Everything the host draws for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderFrame {
    /// Whether the layer is shown at all.
    pub visible: bool,
    pub time_ms: u64,
    pub layer: LayerStyle,
    pub items: Vec<RenderedItem>,
}

impl RenderFrame {
    /// A hidden frame with no items.
    #[must_use]
    pub fn hidden(now: Duration) -> Self {
        Self {
            visible: false,
            time_ms: millis(now),
            layer: LayerStyle::default(),
            items: Vec::new(),
        }
    }

    pub fn to_json_string(&self) -> Result<String, HostError> {
        serde_json::to_string(self).map_err(|err| HostError::json("frame", err))
    }

    pub fn from_json_str(s: &str) -> Result<Self, HostError> {
        serde_json::from_str(s).map_err(|err| HostError::json("frame", err))
    }
}

/// Builds render frames from scheduler state.
#[derive(Debug, Clone)]
pub struct RenderSurface {
    fade_out: Duration,
}

impl Default for RenderSurface {
    fn default() -> Self {
        Self::new(Duration::from_millis(2500))
    }
}

impl RenderSurface {
    /// A surface whose exit opacity ramps over `fade_out`.
    #[must_use]
    pub fn new(fade_out: Duration) -> Self {
        Self { fade_out }
    }

    /// Project the scheduler's tracked names at `now`.
    pub fn render<R>(&self, scheduler: &LifecycleScheduler<R>, now: Duration) -> RenderFrame
    where
        R: halo_core::rng::RandomSource,
    {
        self.render_items(scheduler.is_running(), scheduler.items(), now)
    }

    /// Project `items` at `now`. Hidden when not running or nothing is tracked.
    #[must_use]
    pub fn render_items(&self, running: bool, items: &[NameItem], now: Duration) -> RenderFrame {
        if !running || items.is_empty() {
            return RenderFrame::hidden(now);
        }
        RenderFrame {
            visible: true,
            time_ms: millis(now),
            layer: LayerStyle::default(),
            items: items.iter().map(|item| self.render_item(item, now)).collect(),
        }
    }

    fn render_item(&self, item: &NameItem, now: Duration) -> RenderedItem {
        let state = AnimationState::from(item.phase);
        let in_phase = item.phase_elapsed(now);
        let (animation, opacity) = match state {
            AnimationState::Pending => (None, 0.0),
            AnimationState::Enter => (
                Some(ENTER_ANIMATION),
                Fade::new(ENTER_DURATION).easing(ease_out).at(in_phase),
            ),
            AnimationState::Exit => (
                Some(EXIT_ANIMATION),
                Reverse(Fade::new(self.fade_out).easing(ease_out)).at(in_phase),
            ),
        };

        // Particles start with the element, not with the reveal.
        let alive = now.saturating_sub(item.created_at);
        let particles = item
            .particles
            .iter()
            .enumerate()
            .map(|(i, particle)| RenderedParticle {
                key: format!("{}-smoke-{i}", item.id),
                end_x: particle.offset.x,
                end_y: particle.offset.y,
                delay_ms: millis(particle.delay),
                duration_ms: millis(particle.duration),
                progress: delay(particle.delay, Fade::new(particle.duration).easing(ease_out))
                    .at(alive),
            })
            .collect();

        RenderedItem {
            key: item.id.to_string(),
            text: item.display_text.clone(),
            x: item.position.x,
            y: item.position.y,
            transform: ANCHOR_TRANSFORM.to_owned(),
            state,
            animation: animation.map(str::to_owned),
            opacity,
            particles,
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
