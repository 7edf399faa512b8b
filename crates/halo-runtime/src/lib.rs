#![forbid(unsafe_code)]

//! Halo Runtime
//!
//! The state machines behind the floating artist-name overlay.
//!
//! # Key Components
//!
//! - [`BoundsTracker`] - Follows the anchor heading's on-screen rectangle
//! - [`PlacementEngine`] - Finds an out-of-text, non-colliding position for a name
//! - [`LifecycleScheduler`] - Spawns, reveals, expires and removes names on timers
//! - [`TimerQueue`] - Host-clocked one-shot timers with epoch cancellation
//! - [`HaloConfig`] - Every tunable constant, validated
//!
//! # Role in Halo
//! `halo-runtime` holds all behaviour and no I/O. Time is always passed in by
//! the caller, and every random decision goes through one
//! [`RandomSource`](halo_core::rng::RandomSource). `halo-web` wraps it in a
//! host driver and projects its state into render frames.

pub mod bounds;
pub mod config;
pub mod item;
pub mod placement;
pub mod roster;
pub mod scheduler;
pub mod timer;

pub use bounds::{BoundsTracker, BoundsTrigger, BoundsUpdate, Measure, ReferenceRect};
pub use config::{ConfigError, HaloConfig, LifecycleConfig, ParticleConfig, PlacementConfig};
pub use item::{ItemId, NameItem, Particle, Phase};
pub use placement::{Placement, PlacementEngine, PlacementKind, Rejection, Zone};
pub use roster::{Artist, ArtistId, Roster};
pub use scheduler::{LifecycleEvent, LifecycleScheduler, Task};
pub use timer::{Epoch, Fired, TimerId, TimerQueue};
