#![forbid(unsafe_code)]

//! Lifecycle scheduler: owns the tracked names and every pending timer.
//!
//! The scheduler runs while four conditions hold: the overlay is active, a
//! reference rectangle is known, the viewport is non-empty and the roster is
//! non-empty. Inputs change through [`LifecycleScheduler::set_active`],
//! [`LifecycleScheduler::set_bounds`] and [`LifecycleScheduler::set_roster`];
//! each call reconciles into an activation or a deactivation.
//!
//! On activation the scheduler arms:
//!
//! - an initial burst of spawns, staggered, the first one immediate;
//! - a floor heartbeat that tops the visible count up to `min_visible`;
//! - a self re-arming organic spawn with a random inter-arrival time.
//!
//! Each spawned name then walks `Pending → Visible → Exiting → removed`,
//! every step armed by the previous one. Timers fire in due order when the
//! host calls [`LifecycleScheduler::advance_to`]; handlers re-arm relative to
//! the instant the timer was due, so coarse host steps replay the same
//! schedule as fine ones.
//!
//! Deactivation cancels every timer, advances the [`Epoch`] and clears the
//! tracked set. A fire carrying an older epoch is ignored.

use std::collections::VecDeque;
use std::time::Duration;

use halo_core::animation::stagger::stagger_offsets;
use halo_core::geometry::{Point, Size};
use halo_core::rng::RandomSource;
use tracing::{debug, trace};

use crate::bounds::ReferenceRect;
use crate::config::{ConfigError, HaloConfig};
use crate::item::{ItemId, NameItem, Phase, duration_between, roll_particles};
use crate::placement::PlacementEngine;
use crate::roster::{ArtistId, Roster};
use crate::timer::{Epoch, Fired, TimerQueue};

/// Work a timer carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Spawn,
    Reveal(ItemId),
    Expire(ItemId),
    Remove(ItemId),
    Heartbeat,
    Organic,
}

/// Observable transitions, drained by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    Activated { epoch: Epoch, burst: usize },
    Spawned { id: ItemId, artist_id: ArtistId, fallback: bool },
    Revealed(ItemId),
    Expired(ItemId),
    Removed(ItemId),
    /// A spawn came due while the live count was at the ceiling.
    SpawnSkipped { live: usize },
    Deactivated { epoch: Epoch, cancelled: usize, cleared: usize },
}

/// Owner of the name items and their timers.
#[derive(Debug)]
pub struct LifecycleScheduler<R> {
    config: HaloConfig,
    placement: PlacementEngine,
    roster: Roster,
    rng: R,
    active: bool,
    bounds: Option<ReferenceRect>,
    viewport: Size,
    running: bool,
    epoch: Epoch,
    timers: TimerQueue<Task>,
    items: Vec<NameItem>,
    next_item: u64,
    now: Duration,
    events: VecDeque<LifecycleEvent>,
}

impl<R: RandomSource> LifecycleScheduler<R> {
    /// Create an inactive scheduler. Fails if `config` does not validate.
    pub fn new(config: HaloConfig, roster: Roster, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            placement: PlacementEngine::new(config.placement.clone()),
            config,
            roster,
            rng,
            active: false,
            bounds: None,
            viewport: Size::default(),
            running: false,
            epoch: Epoch::default(),
            timers: TimerQueue::new(),
            items: Vec::new(),
            next_item: 1,
            now: Duration::ZERO,
            events: VecDeque::new(),
        })
    }

    /// Turn the overlay on or off.
    pub fn set_active(&mut self, active: bool, now: Duration) {
        self.observe(now);
        self.active = active;
        self.reconcile();
    }

    /// Replace the reference rectangle and viewport.
    ///
    /// While running this does not reset anything; later spawns simply use
    /// the new geometry. Losing the rectangle deactivates.
    pub fn set_bounds(&mut self, bounds: Option<ReferenceRect>, viewport: Size, now: Duration) {
        self.observe(now);
        self.bounds = bounds;
        self.viewport = viewport;
        self.reconcile();
    }

    /// Replace the roster. An empty roster deactivates.
    pub fn set_roster(&mut self, roster: Roster, now: Duration) {
        self.observe(now);
        self.roster = roster;
        self.reconcile();
    }

    /// Fire every timer due at or before `now`, in due order.
    ///
    /// Returns how many fires were applied.
    pub fn advance_to(&mut self, now: Duration) -> usize {
        self.observe(now);
        let mut applied = 0;
        while let Some(fired) = self.timers.pop_due(self.now) {
            if self.fire(fired) {
                applied += 1;
            }
        }
        applied
    }

    /// Apply one fired timer. Returns `false`, without touching any state,
    /// when the timer belongs to an older epoch or refers to a gone item.
    pub fn fire(&mut self, fired: Fired<Task>) -> bool {
        if fired.epoch != self.epoch || !self.running {
            trace!(
                timer = fired.id.get(),
                timer_epoch = fired.epoch.get(),
                epoch = self.epoch.get(),
                "stale timer ignored"
            );
            return false;
        }
        trace!(timer = fired.id.get(), task = ?fired.task, due_ms = fired.due.as_millis() as u64, "timer fired");
        let at = fired.due;
        match fired.task {
            Task::Spawn => {
                self.spawn(at);
                true
            }
            Task::Organic => {
                self.spawn(at);
                let gap = self.organic_gap();
                self.arm(at + gap, Task::Organic);
                true
            }
            Task::Heartbeat => {
                self.maintain_floor(at);
                self.arm(at + self.config.lifecycle.heartbeat, Task::Heartbeat);
                true
            }
            Task::Reveal(id) => self.reveal(id, at),
            Task::Expire(id) => self.expire(id, at),
            Task::Remove(id) => self.remove(id),
        }
    }

    /// Tracked names in spawn order.
    #[must_use]
    pub fn items(&self) -> &[NameItem] {
        &self.items
    }

    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&NameItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Names currently shown.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_visible()).count()
    }

    /// Pending plus visible names.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_live()).count()
    }

    /// Copies of every armed timer, in firing order.
    #[must_use]
    pub fn pending_timers(&self) -> Vec<Fired<Task>> {
        self.timers.snapshot()
    }

    /// Instant of the next armed timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<LifecycleEvent> {
        self.events.drain(..).collect()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Latest instant the scheduler has observed.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    #[must_use]
    pub fn bounds(&self) -> Option<ReferenceRect> {
        self.bounds
    }

    #[must_use]
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub fn config(&self) -> &HaloConfig {
        &self.config
    }

    fn observe(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    fn should_run(&self) -> bool {
        self.active && self.bounds.is_some() && !self.viewport.is_empty() && !self.roster.is_empty()
    }

    fn reconcile(&mut self) {
        match (self.running, self.should_run()) {
            (false, true) => self.activate(),
            (true, false) => self.deactivate(),
            _ => {}
        }
    }

    fn activate(&mut self) {
        self.running = true;
        let now = self.now;
        let lifecycle = &self.config.lifecycle;
        let burst = lifecycle.initial_burst_min
            + self
                .rng
                .index(lifecycle.initial_burst_max - lifecycle.initial_burst_min + 1);
        let offsets = stagger_offsets(burst, lifecycle.initial_stagger, lifecycle.stagger_mode);
        let heartbeat = lifecycle.heartbeat;
        for offset in offsets {
            self.arm(now + offset, Task::Spawn);
        }
        self.arm(now + heartbeat, Task::Heartbeat);
        let gap = self.organic_gap();
        self.arm(now + gap, Task::Organic);

        debug!(epoch = self.epoch.get(), burst, roster = self.roster.len(), "overlay activated");
        self.events.push_back(LifecycleEvent::Activated {
            epoch: self.epoch,
            burst,
        });
    }

    fn deactivate(&mut self) {
        let cancelled = self.timers.cancel_all();
        let cleared = self.items.len();
        self.items.clear();
        let epoch = self.epoch;
        self.epoch = epoch.next();
        self.running = false;
        debug!(epoch = epoch.get(), cancelled, cleared, "overlay deactivated");
        self.events.push_back(LifecycleEvent::Deactivated {
            epoch,
            cancelled,
            cleared,
        });
    }

    fn arm(&mut self, due: Duration, task: Task) {
        self.timers.schedule_at(due, self.epoch, task);
    }

    fn organic_gap(&mut self) -> Duration {
        let lifecycle = &self.config.lifecycle;
        let (min, max) = (lifecycle.organic_min, lifecycle.organic_max);
        duration_between(&mut self.rng, min, max).max(Duration::from_millis(1))
    }

    fn maintain_floor(&mut self, at: Duration) {
        let visible = self.visible_count();
        let floor = self.config.lifecycle.min_visible;
        if visible >= floor {
            return;
        }
        let needed = floor - visible;
        trace!(visible, floor, needed, "refilling to floor");
        let lifecycle = &self.config.lifecycle;
        for offset in stagger_offsets(needed, lifecycle.floor_stagger, lifecycle.stagger_mode) {
            self.arm(at + offset, Task::Spawn);
        }
    }

    fn spawn(&mut self, at: Duration) {
        let Some(bounds) = self.bounds else {
            return;
        };
        let live = self.live_count();
        if live >= self.config.lifecycle.max_visible {
            debug!(live, ceiling = self.config.lifecycle.max_visible, "spawn skipped at ceiling");
            self.events.push_back(LifecycleEvent::SpawnSkipped { live });
            return;
        }
        let Some(artist) = self.roster.pick(&mut self.rng) else {
            return;
        };
        let artist_id = artist.id;
        let display_text = artist.pick_name(&mut self.rng).to_owned();

        let occupied: Vec<Point> = self
            .items
            .iter()
            .filter(|item| item.is_visible())
            .map(|item| item.position)
            .collect();
        let placement = self.placement.place(&bounds, self.viewport, &occupied, &mut self.rng);
        let particles = roll_particles(&self.config.particles, &mut self.rng);
        let lifecycle = &self.config.lifecycle;
        let (min, max) = (lifecycle.lifetime_min, lifecycle.lifetime_max);
        let lifetime = duration_between(&mut self.rng, min, max);

        let id = ItemId(self.next_item);
        self.next_item += 1;
        debug!(
            item_id = id.0,
            artist_id = artist_id.0,
            x = placement.point.x,
            y = placement.point.y,
            lifetime_ms = lifetime.as_millis() as u64,
            fallback = placement.is_fallback(),
            "name spawned"
        );
        self.items.push(NameItem {
            id,
            artist_id,
            display_text,
            position: placement.point,
            phase: Phase::Pending,
            lifetime,
            particles,
            placement: placement.kind,
            created_at: at,
            phase_changed_at: at,
        });
        self.events.push_back(LifecycleEvent::Spawned {
            id,
            artist_id,
            fallback: placement.is_fallback(),
        });
        self.arm(at + self.config.lifecycle.reveal_delay, Task::Reveal(id));
    }

    fn reveal(&mut self, id: ItemId, at: Duration) -> bool {
        let Some(lifetime) = self.advance_phase(id, Phase::Pending, Phase::Visible, at) else {
            return false;
        };
        self.events.push_back(LifecycleEvent::Revealed(id));
        self.arm(at + lifetime, Task::Expire(id));
        true
    }

    fn expire(&mut self, id: ItemId, at: Duration) -> bool {
        if self.advance_phase(id, Phase::Visible, Phase::Exiting, at).is_none() {
            return false;
        }
        self.events.push_back(LifecycleEvent::Expired(id));
        self.arm(at + self.config.lifecycle.fade_out, Task::Remove(id));
        true
    }

    fn remove(&mut self, id: ItemId) -> bool {
        let Some(index) = self
            .items
            .iter()
            .position(|item| item.id == id && item.phase == Phase::Exiting)
        else {
            return false;
        };
        self.items.remove(index);
        debug!(item_id = id.0, "name removed");
        self.events.push_back(LifecycleEvent::Removed(id));
        true
    }

    /// Move `id` from `from` to `to`, returning its lifetime.
    fn advance_phase(&mut self, id: ItemId, from: Phase, to: Phase, at: Duration) -> Option<Duration> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id && item.phase == from)?;
        item.phase = to;
        item.phase_changed_at = at;
        trace!(item_id = id.0, phase = ?to, "name transitioned");
        Some(item.lifetime)
    }
}

#[cfg(test)]
mod tests {
    use halo_core::geometry::Rect;
    use halo_core::rng::SequenceRandom;

    use super::*;
    use crate::roster::Artist;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn roster() -> Roster {
        Roster::new(vec![
            Artist::new(1, "שלמה ארצי", "Shlomo Artzi"),
            Artist::new(2, "נועה קירל", "Noa Kirel"),
        ])
    }

    fn headline() -> ReferenceRect {
        ReferenceRect::new(Rect::new(450.0, 350.0, 300.0, 100.0))
    }

    fn running(config: HaloConfig) -> LifecycleScheduler<SequenceRandom> {
        let mut scheduler = LifecycleScheduler::new(config, roster(), SequenceRandom::constant(0.0)).unwrap();
        scheduler.set_bounds(Some(headline()), Size::new(1200.0, 800.0), ms(0));
        scheduler.set_active(true, ms(0));
        scheduler
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = HaloConfig::default().with_visible_range(3, 2);
        assert!(LifecycleScheduler::new(config, roster(), SequenceRandom::constant(0.0)).is_err());
    }

    #[test]
    fn needs_every_precondition_to_run() {
        let mut scheduler =
            LifecycleScheduler::new(HaloConfig::default(), roster(), SequenceRandom::constant(0.0)).unwrap();
        scheduler.set_active(true, ms(0));
        assert!(!scheduler.is_running());

        scheduler.set_bounds(Some(headline()), Size::new(0.0, 800.0), ms(0));
        assert!(!scheduler.is_running());

        scheduler.set_bounds(Some(headline()), Size::new(1200.0, 800.0), ms(0));
        assert!(scheduler.is_running());
        assert!(matches!(
            scheduler.drain_events().as_slice(),
            [LifecycleEvent::Activated { burst: 2, .. }]
        ));
    }

    #[test]
    fn activation_arms_burst_heartbeat_and_organic() {
        let scheduler = running(HaloConfig::default());
        let timers: Vec<(Duration, Task)> = scheduler
            .pending_timers()
            .into_iter()
            .map(|f| (f.due, f.task))
            .collect();
        assert_eq!(
            timers,
            vec![
                (ms(0), Task::Spawn),
                (ms(600), Task::Spawn),
                (ms(1500), Task::Heartbeat),
                (ms(1500), Task::Organic),
            ]
        );
    }

    #[test]
    fn sub_millisecond_organic_gap_still_advances() {
        let mut scheduler = running(HaloConfig::default());
        scheduler.config.lifecycle.organic_min = Duration::from_micros(300);
        scheduler.config.lifecycle.organic_max = Duration::from_micros(700);
        scheduler.advance_to(ms(1510));
        let organic: Vec<Duration> = scheduler
            .pending_timers()
            .into_iter()
            .filter(|f| f.task == Task::Organic)
            .map(|f| f.due)
            .collect();
        assert_eq!(organic, vec![ms(1511)]);
    }

    #[test]
    fn single_item_walks_every_phase() {
        let mut scheduler = running(HaloConfig::default());
        scheduler.advance_to(ms(0));
        let id = scheduler.items()[0].id;
        assert_eq!(scheduler.item(id).unwrap().phase, Phase::Pending);

        scheduler.advance_to(ms(50));
        let item = scheduler.item(id).unwrap();
        assert_eq!(item.phase, Phase::Visible);
        assert_eq!(item.lifetime, ms(4000));

        scheduler.advance_to(ms(4049));
        assert_eq!(scheduler.item(id).unwrap().phase, Phase::Visible);
        scheduler.advance_to(ms(4050));
        assert_eq!(scheduler.item(id).unwrap().phase, Phase::Exiting);
        assert_eq!(scheduler.item(id).unwrap().phase_changed_at, ms(4050));

        scheduler.advance_to(ms(6549));
        assert!(scheduler.item(id).is_some());
        scheduler.advance_to(ms(6550));
        assert!(scheduler.item(id).is_none());
    }

    #[test]
    fn coarse_step_replays_fine_schedule() {
        let mut fine = running(HaloConfig::default());
        for t in (0..=10_000).step_by(16) {
            fine.advance_to(ms(t));
        }
        fine.advance_to(ms(10_000));

        let mut coarse = running(HaloConfig::default());
        coarse.advance_to(ms(10_000));

        let ids = |s: &LifecycleScheduler<SequenceRandom>| -> Vec<(ItemId, Phase)> {
            s.items().iter().map(|i| (i.id, i.phase)).collect()
        };
        assert_eq!(ids(&fine), ids(&coarse));
    }

    #[test]
    fn ceiling_skips_spawns() {
        let mut scheduler = running(HaloConfig::default().with_visible_range(1, 1));
        scheduler.advance_to(ms(600));
        assert_eq!(scheduler.items().len(), 1);
        let events = scheduler.drain_events();
        assert!(events.contains(&LifecycleEvent::SpawnSkipped { live: 1 }));
    }

    #[test]
    fn deactivation_clears_everything() {
        let mut scheduler = running(HaloConfig::default());
        scheduler.advance_to(ms(2000));
        assert!(!scheduler.items().is_empty());
        let before = scheduler.epoch();

        scheduler.set_active(false, ms(2000));
        assert!(scheduler.items().is_empty());
        assert!(scheduler.pending_timers().is_empty());
        assert_eq!(scheduler.epoch(), before.next());
        assert!(matches!(
            scheduler.drain_events().last(),
            Some(LifecycleEvent::Deactivated { cleared, .. }) if *cleared > 0
        ));
        assert_eq!(scheduler.advance_to(ms(20_000)), 0);
    }

    #[test]
    fn bounds_change_keeps_schedule() {
        let mut scheduler = running(HaloConfig::default());
        scheduler.advance_to(ms(100));
        let timers = scheduler.pending_timers();
        let items = scheduler.items().to_vec();

        let moved = ReferenceRect::new(Rect::new(100.0, 300.0, 300.0, 100.0));
        scheduler.set_bounds(Some(moved), Size::new(1200.0, 800.0), ms(100));
        assert_eq!(scheduler.pending_timers(), timers);
        assert_eq!(scheduler.items(), items.as_slice());
        assert_eq!(scheduler.bounds(), Some(moved));
    }

    #[test]
    fn losing_bounds_deactivates() {
        let mut scheduler = running(HaloConfig::default());
        scheduler.advance_to(ms(700));
        scheduler.set_bounds(None, Size::new(1200.0, 800.0), ms(700));
        assert!(!scheduler.is_running());
        assert!(scheduler.items().is_empty());
    }

    #[test]
    fn empty_roster_deactivates() {
        let mut scheduler = running(HaloConfig::default());
        scheduler.set_roster(Roster::default(), ms(10));
        assert!(!scheduler.is_running());
    }

    #[test]
    fn time_never_runs_backwards() {
        let mut scheduler = running(HaloConfig::default());
        scheduler.advance_to(ms(500));
        scheduler.advance_to(ms(100));
        assert_eq!(scheduler.now(), ms(500));
    }
}
