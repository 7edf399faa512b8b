#![forbid(unsafe_code)]

//! Overlay configuration.
//!
//! Every constant of the placement search, the spawn/retire schedule and the
//! particle decoration lives here. Defaults reproduce the shipped overlay:
//!
//! | Group | Field | Default |
//! |-------|-------|---------|
//! | placement | distance band | 120–250 px (+0–30 px jitter) |
//! | placement | text margin / viewport padding | 20 px / 50 px |
//! | placement | min separation / attempts | 100 px / 50 |
//! | lifecycle | floor / ceiling | 2 / 4 visible |
//! | lifecycle | initial burst | 2–3, 600 ms apart |
//! | lifecycle | heartbeat / floor stagger | 1500 ms / 500 ms |
//! | lifecycle | organic interval | 1500–3500 ms |
//! | lifecycle | reveal / lifetime / fade-out | 50 ms / 4–7 s / 2500 ms |
//! | particles | count / distance | 5–8 / 30–80 px |
//! | particles | delay / duration | 200 ms + 100 ms·i / 2–3 s |
//!
//! Values can be overridden from `HALO_*` environment variables
//! ([`HaloConfig::from_env`]) or, with the `serde` feature, decoded from JSON
//! where durations are expressed in milliseconds (`*_ms` keys).

use std::fmt;
use std::time::Duration;

use halo_core::animation::stagger::StaggerMode;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A `min`/`max` pair is inverted.
    InvalidRange(&'static str),
    /// A distance or margin is negative.
    Negative { field: &'static str, value: f64 },
    /// A distance or margin is NaN or infinite.
    NotFinite(&'static str),
    /// A repeating interval is zero (or under a millisecond where the
    /// interval is drawn in milliseconds), which would fire forever in one step.
    ZeroInterval(&'static str),
    /// The placement search must try at least once.
    ZeroAttempts,
    /// The visible floor must be at least one.
    ZeroFloor,
    /// The ceiling is below the floor.
    CeilingBelowFloor { min_visible: usize, max_visible: usize },
    /// An environment variable could not be parsed.
    InvalidEnv { var: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRange(field) => write!(f, "{field}: minimum exceeds maximum"),
            Self::Negative { field, value } => write!(f, "{field}: must not be negative (got {value})"),
            Self::NotFinite(field) => write!(f, "{field}: must be finite"),
            Self::ZeroInterval(field) => write!(f, "{field}: must be greater than zero"),
            Self::ZeroAttempts => write!(f, "max_attempts: must be at least 1"),
            Self::ZeroFloor => write!(f, "min_visible: must be at least 1"),
            Self::CeilingBelowFloor {
                min_visible,
                max_visible,
            } => write!(
                f,
                "max_visible ({max_visible}) is below min_visible ({min_visible})"
            ),
            Self::InvalidEnv { var, value } => write!(f, "{var}: cannot parse {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Placement search parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlacementConfig {
    /// Lower bound of the radial offset from the text edge (px).
    pub min_distance: f64,
    /// Upper bound of the radial offset from the text edge (px).
    pub max_distance: f64,
    /// Extra outward jitter added to the offset, drawn in `[0, jitter)` (px).
    pub jitter: f64,
    /// Cross-axis spread as a multiple of the text extent (1.5 = ±75%).
    pub spread: f64,
    /// Exclusion margin around the text rectangle (px).
    pub text_margin: f64,
    /// Keep-out padding along every viewport edge (px).
    pub viewport_padding: f64,
    /// Minimum distance to any visible name (px).
    pub min_separation: f64,
    /// Candidates tried before falling back.
    pub max_attempts: u32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            min_distance: 120.0,
            max_distance: 250.0,
            jitter: 30.0,
            spread: 1.5,
            text_margin: 20.0,
            viewport_padding: 50.0,
            min_separation: 100.0,
            max_attempts: 50,
        }
    }
}

/// Spawn and retirement schedule.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LifecycleConfig {
    /// Floor of concurrently visible names.
    pub min_visible: usize,
    /// Ceiling of live (pending or visible) names.
    pub max_visible: usize,
    /// Smallest initial burst on activation.
    pub initial_burst_min: usize,
    /// Largest initial burst on activation.
    pub initial_burst_max: usize,
    /// Spacing between initial burst spawns.
    #[cfg_attr(feature = "serde", serde(rename = "initial_stagger_ms", with = "millis"))]
    pub initial_stagger: Duration,
    /// Spacing between floor-refill spawns.
    #[cfg_attr(feature = "serde", serde(rename = "floor_stagger_ms", with = "millis"))]
    pub floor_stagger: Duration,
    /// Distribution of burst offsets.
    pub stagger_mode: StaggerMode,
    /// Period of the floor check.
    #[cfg_attr(feature = "serde", serde(rename = "heartbeat_ms", with = "millis"))]
    pub heartbeat: Duration,
    /// Shortest gap between organic spawns.
    #[cfg_attr(feature = "serde", serde(rename = "organic_min_ms", with = "millis"))]
    pub organic_min: Duration,
    /// Longest gap between organic spawns.
    #[cfg_attr(feature = "serde", serde(rename = "organic_max_ms", with = "millis"))]
    pub organic_max: Duration,
    /// Delay between creation and the entry animation.
    #[cfg_attr(feature = "serde", serde(rename = "reveal_delay_ms", with = "millis"))]
    pub reveal_delay: Duration,
    /// Shortest time a name stays fully shown.
    #[cfg_attr(feature = "serde", serde(rename = "lifetime_min_ms", with = "millis"))]
    pub lifetime_min: Duration,
    /// Longest time a name stays fully shown.
    #[cfg_attr(feature = "serde", serde(rename = "lifetime_max_ms", with = "millis"))]
    pub lifetime_max: Duration,
    /// Exit animation length; the name is dropped when it ends.
    #[cfg_attr(feature = "serde", serde(rename = "fade_out_ms", with = "millis"))]
    pub fade_out: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            min_visible: 2,
            max_visible: 4,
            initial_burst_min: 2,
            initial_burst_max: 3,
            initial_stagger: Duration::from_millis(600),
            floor_stagger: Duration::from_millis(500),
            stagger_mode: StaggerMode::Linear,
            heartbeat: Duration::from_millis(1500),
            organic_min: Duration::from_millis(1500),
            organic_max: Duration::from_millis(3500),
            reveal_delay: Duration::from_millis(50),
            lifetime_min: Duration::from_millis(4000),
            lifetime_max: Duration::from_millis(7000),
            fade_out: Duration::from_millis(2500),
        }
    }
}

/// Decorative particle parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParticleConfig {
    pub count_min: usize,
    pub count_max: usize,
    /// Drift distance range (px).
    pub distance_min: f64,
    pub distance_max: f64,
    /// Delay of the first particle.
    #[cfg_attr(feature = "serde", serde(rename = "base_delay_ms", with = "millis"))]
    pub base_delay: Duration,
    /// Additional delay per particle index.
    #[cfg_attr(feature = "serde", serde(rename = "delay_step_ms", with = "millis"))]
    pub delay_step: Duration,
    #[cfg_attr(feature = "serde", serde(rename = "duration_min_ms", with = "millis"))]
    pub duration_min: Duration,
    #[cfg_attr(feature = "serde", serde(rename = "duration_max_ms", with = "millis"))]
    pub duration_max: Duration,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count_min: 5,
            count_max: 8,
            distance_min: 30.0,
            distance_max: 80.0,
            base_delay: Duration::from_millis(200),
            delay_step: Duration::from_millis(100),
            duration_min: Duration::from_millis(2000),
            duration_max: Duration::from_millis(3000),
        }
    }
}

/// Complete overlay configuration.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HaloConfig {
    pub placement: PlacementConfig,
    pub lifecycle: LifecycleConfig,
    pub particles: ParticleConfig,
}

impl HaloConfig {
    /// Set the visible floor and ceiling.
    #[must_use]
    pub fn with_visible_range(mut self, min_visible: usize, max_visible: usize) -> Self {
        self.lifecycle.min_visible = min_visible;
        self.lifecycle.max_visible = max_visible;
        self
    }

    /// Set the radial distance band.
    #[must_use]
    pub fn with_distance_band(mut self, min_distance: f64, max_distance: f64) -> Self {
        self.placement.min_distance = min_distance;
        self.placement.max_distance = max_distance;
        self
    }

    /// Set the placement attempt ceiling.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.placement.max_attempts = max_attempts;
        self
    }

    /// Set the lifetime range of a visible name.
    #[must_use]
    pub fn with_lifetime(mut self, min: Duration, max: Duration) -> Self {
        self.lifecycle.lifetime_min = min;
        self.lifecycle.lifetime_max = max;
        self
    }

    /// Set the organic spawn interval range.
    #[must_use]
    pub fn with_organic_interval(mut self, min: Duration, max: Duration) -> Self {
        self.lifecycle.organic_min = min;
        self.lifecycle.organic_max = max;
        self
    }

    /// Set the initial burst size range.
    #[must_use]
    pub fn with_initial_burst(mut self, min: usize, max: usize) -> Self {
        self.lifecycle.initial_burst_min = min;
        self.lifecycle.initial_burst_max = max;
        self
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.placement;
        for (field, value) in [
            ("min_distance", p.min_distance),
            ("max_distance", p.max_distance),
            ("jitter", p.jitter),
            ("spread", p.spread),
            ("text_margin", p.text_margin),
            ("viewport_padding", p.viewport_padding),
            ("min_separation", p.min_separation),
            ("particles.distance_min", self.particles.distance_min),
            ("particles.distance_max", self.particles.distance_max),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite(field));
            }
            if value < 0.0 {
                return Err(ConfigError::Negative { field, value });
            }
        }
        if p.min_distance > p.max_distance {
            return Err(ConfigError::InvalidRange("distance"));
        }
        if p.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }

        let l = &self.lifecycle;
        if l.min_visible == 0 {
            return Err(ConfigError::ZeroFloor);
        }
        if l.max_visible < l.min_visible {
            return Err(ConfigError::CeilingBelowFloor {
                min_visible: l.min_visible,
                max_visible: l.max_visible,
            });
        }
        if l.initial_burst_min > l.initial_burst_max {
            return Err(ConfigError::InvalidRange("initial_burst"));
        }
        if l.heartbeat.is_zero() {
            return Err(ConfigError::ZeroInterval("heartbeat"));
        }
        // Organic gaps are drawn in whole milliseconds.
        if l.organic_min.as_millis() == 0 {
            return Err(ConfigError::ZeroInterval("organic_min"));
        }
        if l.organic_min > l.organic_max {
            return Err(ConfigError::InvalidRange("organic_interval"));
        }
        if l.lifetime_min > l.lifetime_max {
            return Err(ConfigError::InvalidRange("lifetime"));
        }

        let pc = &self.particles;
        if pc.count_min > pc.count_max {
            return Err(ConfigError::InvalidRange("particles.count"));
        }
        if pc.distance_min > pc.distance_max {
            return Err(ConfigError::InvalidRange("particles.distance"));
        }
        if pc.duration_min > pc.duration_max {
            return Err(ConfigError::InvalidRange("particles.duration"));
        }
        Ok(())
    }

    /// Defaults overridden by `HALO_*` environment variables, then validated.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden through an arbitrary variable lookup, then validated.
    ///
    /// Recognised variables: `HALO_MIN_DISTANCE`, `HALO_MAX_DISTANCE`,
    /// `HALO_TEXT_MARGIN`, `HALO_VIEWPORT_PADDING`, `HALO_MIN_SEPARATION`,
    /// `HALO_MAX_ATTEMPTS`, `HALO_MIN_VISIBLE`, `HALO_MAX_VISIBLE`,
    /// `HALO_HEARTBEAT_MS`, `HALO_ORGANIC_MIN_MS`, `HALO_ORGANIC_MAX_MS`,
    /// `HALO_REVEAL_DELAY_MS`, `HALO_LIFETIME_MIN_MS`, `HALO_LIFETIME_MAX_MS`,
    /// `HALO_FADE_OUT_MS`. Blank values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };
        let mut config = Self::default();

        let p = &mut config.placement;
        env.f64("HALO_MIN_DISTANCE", &mut p.min_distance)?;
        env.f64("HALO_MAX_DISTANCE", &mut p.max_distance)?;
        env.f64("HALO_TEXT_MARGIN", &mut p.text_margin)?;
        env.f64("HALO_VIEWPORT_PADDING", &mut p.viewport_padding)?;
        env.f64("HALO_MIN_SEPARATION", &mut p.min_separation)?;
        env.parse("HALO_MAX_ATTEMPTS", &mut p.max_attempts)?;

        let l = &mut config.lifecycle;
        env.parse("HALO_MIN_VISIBLE", &mut l.min_visible)?;
        env.parse("HALO_MAX_VISIBLE", &mut l.max_visible)?;
        env.millis("HALO_HEARTBEAT_MS", &mut l.heartbeat)?;
        env.millis("HALO_ORGANIC_MIN_MS", &mut l.organic_min)?;
        env.millis("HALO_ORGANIC_MAX_MS", &mut l.organic_max)?;
        env.millis("HALO_REVEAL_DELAY_MS", &mut l.reveal_delay)?;
        env.millis("HALO_LIFETIME_MIN_MS", &mut l.lifetime_min)?;
        env.millis("HALO_LIFETIME_MAX_MS", &mut l.lifetime_max)?;
        env.millis("HALO_FADE_OUT_MS", &mut l.fade_out)?;

        config.validate()?;
        Ok(config)
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn raw(&self, var: &str) -> Option<String> {
        (self.lookup)(var)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, var: &str, slot: &mut T) -> Result<(), ConfigError> {
        if let Some(value) = self.raw(var) {
            *slot = value.parse().map_err(|_| ConfigError::InvalidEnv {
                var: var.to_string(),
                value,
            })?;
        }
        Ok(())
    }

    fn f64(&self, var: &str, slot: &mut f64) -> Result<(), ConfigError> {
        self.parse(var, slot)
    }

    fn millis(&self, var: &str, slot: &mut Duration) -> Result<(), ConfigError> {
        let mut ms = u64::try_from(slot.as_millis()).unwrap_or(u64::MAX);
        self.parse(var, &mut ms)?;
        *slot = Duration::from_millis(ms);
        Ok(())
    }
}

#[cfg(feature = "serde")]
mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        assert_eq!(HaloConfig::default().validate(), Ok(()));
    }

    #[test]
    fn default_constants() {
        let config = HaloConfig::default();
        assert_eq!(config.placement.max_attempts, 50);
        assert_eq!(config.placement.min_separation, 100.0);
        assert_eq!(config.lifecycle.min_visible, 2);
        assert_eq!(config.lifecycle.max_visible, 4);
        assert_eq!(config.lifecycle.fade_out, Duration::from_millis(2500));
        assert_eq!(config.particles.count_max, 8);
    }

    #[test]
    fn lookup_overrides_defaults() {
        let config = HaloConfig::from_lookup(lookup(&[
            ("HALO_MAX_VISIBLE", "6"),
            ("HALO_FADE_OUT_MS", " 1200 "),
            ("HALO_MIN_SEPARATION", "80.5"),
            ("HALO_MIN_VISIBLE", ""),
        ]))
        .unwrap();
        assert_eq!(config.lifecycle.max_visible, 6);
        assert_eq!(config.lifecycle.min_visible, 2);
        assert_eq!(config.lifecycle.fade_out, Duration::from_millis(1200));
        assert_eq!(config.placement.min_separation, 80.5);
    }

    #[test]
    fn lookup_reports_unparsable_variable() {
        let err = HaloConfig::from_lookup(lookup(&[("HALO_MAX_ATTEMPTS", "lots")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidEnv {
                var: "HALO_MAX_ATTEMPTS".into(),
                value: "lots".into()
            }
        );
        assert!(err.to_string().contains("HALO_MAX_ATTEMPTS"));
    }

    #[test]
    fn lookup_result_is_validated() {
        let err = HaloConfig::from_lookup(lookup(&[("HALO_MAX_VISIBLE", "1")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::CeilingBelowFloor {
                min_visible: 2,
                max_visible: 1
            }
        );
    }

    #[test]
    fn inverted_ranges_rejected() {
        let config = HaloConfig::default().with_distance_band(300.0, 100.0);
        assert_eq!(config.validate(), Err(ConfigError::InvalidRange("distance")));

        let config = HaloConfig::default()
            .with_lifetime(Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(config.validate(), Err(ConfigError::InvalidRange("lifetime")));
    }

    #[test]
    fn zero_intervals_rejected() {
        let mut config = HaloConfig::default();
        config.lifecycle.heartbeat = Duration::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval("heartbeat")));

        let config = HaloConfig::default().with_organic_interval(Duration::ZERO, Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval("organic_min")));
    }

    #[test]
    fn sub_millisecond_organic_interval_rejected() {
        let config = HaloConfig::default()
            .with_organic_interval(Duration::from_micros(500), Duration::from_micros(900));
        assert_eq!(config.validate(), Err(ConfigError::ZeroInterval("organic_min")));

        let config = HaloConfig::default()
            .with_organic_interval(Duration::from_millis(1), Duration::from_millis(1));
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn non_finite_and_negative_rejected() {
        let mut config = HaloConfig::default();
        config.placement.jitter = f64::NAN;
        assert_eq!(config.validate(), Err(ConfigError::NotFinite("jitter")));

        let mut config = HaloConfig::default();
        config.placement.text_margin = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Negative { field: "text_margin", .. })
        ));
    }

    #[test]
    fn zero_attempts_and_floor_rejected() {
        assert_eq!(
            HaloConfig::default().with_max_attempts(0).validate(),
            Err(ConfigError::ZeroAttempts)
        );
        assert_eq!(
            HaloConfig::default().with_visible_range(0, 4).validate(),
            Err(ConfigError::ZeroFloor)
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_uses_millisecond_keys_and_defaults() {
        let config: HaloConfig =
            serde_json::from_str(r#"{"lifecycle":{"fade_out_ms":900,"max_visible":5}}"#).unwrap();
        assert_eq!(config.lifecycle.fade_out, Duration::from_millis(900));
        assert_eq!(config.lifecycle.max_visible, 5);
        assert_eq!(config.placement, PlacementConfig::default());

        let json = serde_json::to_value(&HaloConfig::default()).unwrap();
        assert_eq!(json["lifecycle"]["heartbeat_ms"], 1500);
        assert_eq!(json["lifecycle"]["stagger_mode"], "linear");
    }
}
