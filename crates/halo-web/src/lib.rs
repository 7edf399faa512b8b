#![forbid(unsafe_code)]

//! `halo-web` drives the Halo overlay from a web page.
//!
//! Design goals:
//! - **Host-driven I/O**: the embedding environment (JS) pushes page events and
//!   the anchor element's geometry.
//! - **Deterministic time**: the host advances a monotonic clock explicitly.
//! - **No blocking / no threads**: suitable for `wasm32-unknown-unknown`.
//!
//! [`OverlayHost`] is the step runner; [`render::RenderSurface`] turns the
//! scheduler's state into serializable [`render::RenderFrame`]s. On `wasm32`
//! the `HaloOverlay` class exposes both to JavaScript.

pub mod overlay_host;
pub mod render;

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::HaloOverlay;

use core::time::Duration;

use halo_core::geometry::{Rect, Size};
use halo_runtime::{Artist, ConfigError, HaloConfig, Roster};
use serde::{Deserialize, Serialize};

pub use overlay_host::{HostOutputs, OverlayHost, StepResult};
pub use render::{AnimationState, RenderFrame, RenderSurface, RenderedItem, RenderedParticle};

/// Seed used when the host configuration does not pin one.
pub const DEFAULT_SEED: u64 = 0x4841_4c4f;

/// Host driver error type.
#[derive(Debug, Clone, PartialEq)]
pub enum HostError {
    /// The overlay configuration is inconsistent.
    Config(ConfigError),
    /// A JSON document could not be decoded or encoded.
    Json { what: &'static str, message: String },
}

impl HostError {
    fn json(what: &'static str, err: serde_json::Error) -> Self {
        Self::Json {
            what,
            message: err.to_string(),
        }
    }
}

impl core::fmt::Display for HostError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "invalid config: {err}"),
            Self::Json { what, message } => write!(f, "invalid {what} json: {message}"),
        }
    }
}

impl std::error::Error for HostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Json { .. } => None,
        }
    }
}

impl From<ConfigError> for HostError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// Deterministic monotonic clock controlled by the host.
#[derive(Debug, Default, Clone)]
pub struct DeterministicClock {
    now: Duration,
}

impl DeterministicClock {
    /// Create a clock starting at `0`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            now: Duration::ZERO,
        }
    }

    /// Set current monotonic time. Earlier values are ignored.
    pub fn set(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    /// Advance monotonic time by `dt`.
    pub fn advance(&mut self, dt: Duration) {
        self.now = self.now.saturating_add(dt);
    }

    /// Current monotonic time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }
}

/// Page events pushed by the host.
///
/// Events that carry a `rect` report the anchor's bounding box as measured
/// when the event was raised; `None` means the element could not be measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    Mount { rect: Option<Rect> },
    /// The anchor element's own size changed.
    Mutation { rect: Option<Rect> },
    /// The viewport changed. Measured on the next animation frame.
    Resize { viewport: Size },
    /// The window or a nested container scrolled. Measured on the next
    /// animation frame.
    Scroll,
    AnimationFrame { rect: Option<Rect> },
    Unmount,
    /// Explicitly show or hide the overlay. Cancels a pending auto-activation.
    SetActive(bool),
}

/// Host configuration: the overlay constants plus driver options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub halo: HaloConfig,
    /// Time after start before the overlay activates itself.
    pub activation_delay_ms: u64,
    /// Whether to activate after `activation_delay_ms` without an explicit
    /// `SetActive(true)`.
    pub auto_activate: bool,
    /// Seed for the random source; [`DEFAULT_SEED`] when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            halo: HaloConfig::default(),
            activation_delay_ms: 800,
            auto_activate: true,
            seed: None,
        }
    }
}

impl HostConfig {
    /// Parse and validate a JSON host configuration. Missing keys take defaults.
    pub fn from_json_str(s: &str) -> Result<Self, HostError> {
        let config: Self = serde_json::from_str(s).map_err(|err| HostError::json("config", err))?;
        config.halo.validate()?;
        Ok(config)
    }

    /// Activation delay as a duration.
    #[must_use]
    pub fn activation_delay(&self) -> Duration {
        Duration::from_millis(self.activation_delay_ms)
    }
}

/// Parse a JSON array of artist records.
///
/// Accepts both `{id, primary_name, secondary_name}` and the site's
/// `{id, name, englishName, ...}` shape.
pub fn roster_from_json_str(s: &str) -> Result<Roster, HostError> {
    let artists: Vec<Artist> = serde_json::from_str(s).map_err(|err| HostError::json("roster", err))?;
    Ok(Roster::new(artists))
}

/// Convert a host-supplied millisecond delta into a [`Duration`].
///
/// `None` for non-finite, non-positive or unrepresentable values.
#[must_use]
pub fn duration_from_millis(ms: f64) -> Option<Duration> {
    if !ms.is_finite() || ms <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(ms / 1000.0).ok()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn clock_is_monotonic() {
        let mut clock = DeterministicClock::new();
        clock.advance(Duration::from_millis(16));
        clock.set(Duration::from_millis(5));
        assert_eq!(clock.now(), Duration::from_millis(16));
        clock.set(Duration::from_millis(40));
        assert_eq!(clock.now(), Duration::from_millis(40));
    }

    #[test]
    fn millisecond_deltas_reject_unusable_values() {
        assert_eq!(duration_from_millis(16.0), Some(Duration::from_millis(16)));
        assert_eq!(duration_from_millis(0.5), Some(Duration::from_micros(500)));
        assert_eq!(duration_from_millis(1e300), None);
        assert_eq!(duration_from_millis(f64::MAX), None);
        assert_eq!(duration_from_millis(f64::NAN), None);
        assert_eq!(duration_from_millis(f64::INFINITY), None);
        assert_eq!(duration_from_millis(0.0), None);
        assert_eq!(duration_from_millis(-1.0), None);
    }

    #[test]
    fn host_config_defaults_from_empty_object() {
        let config = HostConfig::from_json_str("{}").unwrap();
        assert_eq!(config, HostConfig::default());
        assert_eq!(config.activation_delay(), Duration::from_millis(800));
    }

    #[test]
    fn host_config_overrides() {
        let config = HostConfig::from_json_str(
            r#"{"activation_delay_ms": 0, "auto_activate": false, "seed": 7,
                "halo": {"lifecycle": {"max_visible": 6}}}"#,
        )
        .unwrap();
        assert!(!config.auto_activate);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.halo.lifecycle.max_visible, 6);
    }

    #[test]
    fn host_config_is_validated() {
        let err = HostConfig::from_json_str(r#"{"halo": {"placement": {"max_attempts": 0}}}"#).unwrap_err();
        assert_eq!(err, HostError::Config(ConfigError::ZeroAttempts));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn malformed_json_names_the_document() {
        let err = HostConfig::from_json_str("{").unwrap_err();
        assert!(err.to_string().starts_with("invalid config json"));
        let err = roster_from_json_str(r#"[{"id": "x"}]"#).unwrap_err();
        assert!(err.to_string().starts_with("invalid roster json"));
    }

    #[test]
    fn roster_accepts_site_records() {
        let roster = roster_from_json_str(
            r#"[{"id": 1, "name": "שלמה ארצי", "englishName": "Shlomo Artzi", "category": "רוק"},
                {"id": 2, "primary_name": "נועה קירל", "secondary_name": "Noa Kirel"}]"#,
        )
        .unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.artists()[0].secondary_name, "Shlomo Artzi");
        assert_eq!(roster.artists()[1].primary_name, "נועה קירל");
    }
}
