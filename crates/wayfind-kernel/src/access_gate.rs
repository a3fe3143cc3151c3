//! [`AccessGate`] – geofence-gated access state machine.
//!
//! The gate owns the whole "may this user navigate here?" decision:
//!
//! 1. **AwaitingPermission** – the permission prompt is shown once; the gate
//!    re-polls the [`PermissionOracle`] every tick until access is granted.
//! 2. **Polling** – one fix-acquisition attempt is in flight.  While the
//!    [`LocationSource`] is initializing the attempt waits, bounded by
//!    `fix_wait_attempts × fix_wait_interval`.
//! 3. The fix is tested against the fence:
//!    - inside  → **Unlocked** (terminal for the automatic loop),
//!    - outside → **Denied**, then back to Polling after `retry_backoff`,
//!    - no fix within the wait bound → **Error**, also re-polled after
//!      `retry_backoff`,
//!    - service disabled or failed → **Error**, which waits for an explicit
//!      [`AccessGate::retry`].
//!
//! A retry issued from `Unlocked` re-checks exactly once: if that check
//! lands outside the fence the gate stays `Denied` until the next retry.
//!
//! The gate never blocks.  The host calls [`AccessGate::tick`] with the
//! elapsed time and every long wait is a counter advanced by those ticks.
//!
//! # Notifications
//!
//! State changes are published on [`Topic::Access`] as
//! [`EventPayload::AccessChanged`], at most once per distinct status
//! message.  Entering `Unlocked` additionally publishes
//! [`EventPayload::SessionUnlocked`] exactly once per unlock, and flips the
//! shared [`UnlockSignal`].
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use wayfind_hal::sim::SimRig;
//! use wayfind_kernel::{AccessGate, AccessGateConfig, AccessState};
//! use wayfind_middleware::EventBus;
//!
//! let config = AccessGateConfig::default();
//! let rig = SimRig::ready_at(config.fence.center);
//!
//! let mut gate = AccessGate::new(
//!     config,
//!     Box::new(rig.permission.clone()),
//!     Box::new(rig.location.clone()),
//!     EventBus::default(),
//! );
//! gate.start();
//! gate.tick(Duration::from_millis(16));
//!
//! assert_eq!(gate.state(), &AccessState::Unlocked);
//! assert!(gate.unlock_signal().is_unlocked());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use wayfind_hal::{LocationSource, LocationStatus, PermissionOracle};
use wayfind_middleware::{EventBus, Topic};
use wayfind_types::{Event, EventPayload, GeoFenceConfig, GeoPoint, WayfindError};

use crate::geofence;

const EVENT_SOURCE: &str = "wayfind-kernel::access_gate";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Timing and fence parameters for [`AccessGate`].
#[derive(Debug, Clone, PartialEq)]
pub struct AccessGateConfig {
    pub fence: GeoFenceConfig,
    /// Delay between an out-of-range result and the next automatic attempt.
    pub retry_backoff: Duration,
    /// How many `fix_wait_interval`s to wait for an initializing service.
    pub fix_wait_attempts: u32,
    pub fix_wait_interval: Duration,
    /// Stop the automatic out-of-range loop after this many consecutive
    /// denials.  `None` keeps polling for as long as the gate runs.
    pub max_denied_retries: Option<u32>,
}

impl Default for AccessGateConfig {
    fn default() -> Self {
        Self {
            fence: GeoFenceConfig::default(),
            retry_backoff: Duration::from_secs(5),
            fix_wait_attempts: 20,
            fix_wait_interval: Duration::from_secs(1),
            max_denied_retries: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public state
// ─────────────────────────────────────────────────────────────────────────────

/// The gate's externally visible state.  Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessState {
    AwaitingPermission,
    Polling,
    Unlocked,
    /// The fix was valid but outside the fence.  Retried automatically.
    Denied(WayfindError),
    /// The fix could not be obtained.  Waits for [`AccessGate::retry`].
    Error(WayfindError),
}

impl AccessState {
    pub fn is_unlocked(&self) -> bool {
        matches!(self, Self::Unlocked)
    }

    /// The single user-facing message for this state.
    pub fn status_message(&self) -> String {
        match self {
            Self::AwaitingPermission => WayfindError::PermissionDenied.to_string(),
            Self::Polling => "Checking your location…".to_string(),
            Self::Unlocked => "Location verified. Scan a marker to begin.".to_string(),
            Self::Denied(reason) | Self::Error(reason) => reason.to_string(),
        }
    }
}

/// Read-only view of "is the session unlocked?", shared with scanning and UI.
///
/// Only [`AccessGate`] can change it; every clone observes the same value.
#[derive(Debug, Clone, Default)]
pub struct UnlockSignal(Arc<AtomicBool>);

impl UnlockSignal {
    pub fn is_unlocked(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn set(&self, unlocked: bool) {
        self.0.store(unlocked, Ordering::SeqCst);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internals
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    /// Torn down by the host; never resumes.
    Stopped,
}

/// A fix acquisition in flight.
#[derive(Debug, Default)]
struct FixAttempt {
    /// Whole wait intervals spent in `Initializing`.
    waits: u32,
    /// Time accumulated toward the next whole interval.
    carry: Duration,
}

// ─────────────────────────────────────────────────────────────────────────────
// AccessGate
// ─────────────────────────────────────────────────────────────────────────────

/// Geofence-gated access state machine.  See the [module docs](self).
pub struct AccessGate {
    config: AccessGateConfig,
    permission: Box<dyn PermissionOracle>,
    location: Box<dyn LocationSource>,
    bus: EventBus,

    lifecycle: Lifecycle,
    state: AccessState,
    attempt: Option<FixAttempt>,
    permission_requested: bool,
    backoff_elapsed: Duration,
    consecutive_denials: u32,
    /// Cleared by a retry out of `Unlocked`; the backoff re-poll is skipped
    /// until the next retry.
    auto_repoll: bool,
    unlock_notified: bool,
    signal: UnlockSignal,
    last_published: Option<String>,
}

impl AccessGate {
    /// Build a gate around its collaborators.  Nothing happens until
    /// [`start`][Self::start].
    pub fn new(
        config: AccessGateConfig,
        permission: Box<dyn PermissionOracle>,
        location: Box<dyn LocationSource>,
        bus: EventBus,
    ) -> Self {
        Self {
            config,
            permission,
            location,
            bus,
            lifecycle: Lifecycle::Idle,
            state: AccessState::AwaitingPermission,
            attempt: None,
            permission_requested: false,
            backoff_elapsed: Duration::ZERO,
            consecutive_denials: 0,
            auto_repoll: true,
            unlock_notified: false,
            signal: UnlockSignal::default(),
            last_published: None,
        }
    }

    pub fn state(&self) -> &AccessState {
        &self.state
    }

    pub fn status_message(&self) -> String {
        self.state.status_message()
    }

    /// A handle that follows the unlocked flag for the gate's lifetime.
    pub fn unlock_signal(&self) -> UnlockSignal {
        self.signal.clone()
    }

    pub fn is_attempt_in_flight(&self) -> bool {
        self.attempt.is_some()
    }

    pub fn config(&self) -> &AccessGateConfig {
        &self.config
    }

    /// Begin the permission/fix loop.  Shows the permission prompt once if
    /// access has not been granted yet.
    ///
    /// Starting a gate that was [stopped][Self::stop] is a no-op.
    pub fn start(&mut self) {
        match self.lifecycle {
            Lifecycle::Running => return,
            Lifecycle::Stopped => {
                warn!("access gate was torn down; ignoring start");
                return;
            }
            Lifecycle::Idle => {}
        }
        self.lifecycle = Lifecycle::Running;
        info!(
            radius_m = self.config.fence.radius_meters,
            center = %self.config.fence.center,
            "access gate started"
        );

        if !self.permission.has_location_permission() && !self.permission_requested {
            self.permission.request_location_permission();
            self.permission_requested = true;
        }
        self.tick(Duration::ZERO);
    }

    /// Tear the gate down.  Any in-flight attempt is abandoned and the
    /// location service released; the gate never resumes afterward.
    pub fn stop(&mut self) {
        if self.lifecycle == Lifecycle::Stopped {
            return;
        }
        if self.attempt.take().is_some() {
            self.location.stop();
        }
        self.lifecycle = Lifecycle::Stopped;
        info!(state = ?self.state, "access gate stopped");
    }

    /// Advance the state machine by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        if self.lifecycle != Lifecycle::Running {
            return;
        }

        match self.state {
            AccessState::AwaitingPermission => {
                if self.permission.has_location_permission() {
                    self.transition(AccessState::Polling);
                    self.begin_attempt();
                }
            }
            AccessState::Polling => self.poll_attempt(dt),
            AccessState::Denied(_) | AccessState::Error(WayfindError::FixTimeout) => {
                self.tick_backoff(dt)
            }
            AccessState::Unlocked | AccessState::Error(_) => {}
        }
    }

    /// User-initiated retry: reset to `Polling` and run a single attempt.
    ///
    /// From `Unlocked` the attempt is a one-off re-check; an out-of-range
    /// result is not re-polled automatically.
    ///
    /// Returns `false` (and does nothing) when an attempt is already in
    /// flight, when permission has not been granted, or when the gate is not
    /// running.
    pub fn retry(&mut self) -> bool {
        if self.lifecycle != Lifecycle::Running {
            return false;
        }
        if self.attempt.is_some() {
            debug!("retry ignored: fix attempt already in flight");
            return false;
        }
        if !self.permission.has_location_permission() {
            debug!("retry ignored: location permission not granted");
            return false;
        }

        info!(from = ?self.state, "retry requested");
        self.auto_repoll = !self.state.is_unlocked();
        self.unlock_notified = false;
        self.signal.set(false);
        self.consecutive_denials = 0;
        self.transition(AccessState::Polling);
        self.begin_attempt();
        true
    }

    // ── Attempt handling ────────────────────────────────────────────────────

    fn tick_backoff(&mut self, dt: Duration) {
        if !self.auto_repoll {
            return;
        }
        if matches!(self.state, AccessState::Denied(_))
            && let Some(cap) = self.config.max_denied_retries
            && self.consecutive_denials >= cap
        {
            return;
        }
        self.backoff_elapsed += dt;
        if self.backoff_elapsed >= self.config.retry_backoff {
            // Automatic re-poll stays quiet: the previous explanation
            // remains the visible message.
            self.state = AccessState::Polling;
            debug!("backoff elapsed; re-polling location");
            self.begin_attempt();
        }
    }

    #[instrument(skip(self))]
    fn begin_attempt(&mut self) {
        if self.attempt.is_some() {
            return;
        }
        if !self.location.is_service_enabled() {
            warn!("location services disabled");
            self.transition(AccessState::Error(WayfindError::LocationServiceDisabled));
            return;
        }
        self.location.start();
        self.attempt = Some(FixAttempt::default());
        self.poll_attempt(Duration::ZERO);
    }

    fn poll_attempt(&mut self, dt: Duration) {
        let max_waits = self.config.fix_wait_attempts;
        let interval = self.config.fix_wait_interval;

        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };

        match self.location.status() {
            LocationStatus::Initializing => {
                if interval.is_zero() {
                    attempt.waits = attempt.waits.saturating_add(1);
                } else {
                    attempt.carry += dt;
                    while attempt.carry >= interval && attempt.waits < max_waits {
                        attempt.carry -= interval;
                        attempt.waits += 1;
                    }
                }
                if attempt.waits >= max_waits {
                    warn!(waits = attempt.waits, "location fix timed out");
                    self.backoff_elapsed = Duration::ZERO;
                    self.finish_attempt(AccessState::Error(WayfindError::FixTimeout));
                }
            }
            LocationStatus::Failed => {
                warn!("location service reported failure");
                self.finish_attempt(AccessState::Error(WayfindError::FixFailed));
            }
            LocationStatus::Running => match self.location.last_fix() {
                Some(fix) => self.evaluate(fix),
                None => {
                    warn!("location service running without a fix");
                    self.finish_attempt(AccessState::Error(WayfindError::FixFailed));
                }
            },
        }
    }

    fn evaluate(&mut self, fix: GeoPoint) {
        let distance = geofence::distance_meters(fix, self.config.fence.center);
        info!(
            fix = %fix,
            distance_m = distance,
            radius_m = self.config.fence.radius_meters,
            "fix evaluated"
        );

        if geofence::is_within(fix, &self.config.fence) {
            self.consecutive_denials = 0;
            self.finish_attempt(AccessState::Unlocked);
        } else {
            self.consecutive_denials = self.consecutive_denials.saturating_add(1);
            self.backoff_elapsed = Duration::ZERO;
            self.finish_attempt(AccessState::Denied(WayfindError::OutOfRange));
        }
    }

    fn finish_attempt(&mut self, outcome: AccessState) {
        self.location.stop();
        self.attempt = None;
        if outcome.is_unlocked() {
            self.enter_unlocked();
        } else {
            self.transition(outcome);
        }
    }

    // ── State changes ───────────────────────────────────────────────────────

    fn enter_unlocked(&mut self) {
        self.transition(AccessState::Unlocked);
        if self.unlock_notified {
            debug!("already unlocked; notification suppressed");
            return;
        }
        self.unlock_notified = true;
        self.signal.set(true);
        info!("session unlocked");
        self.bus.publish_to(
            Topic::Access,
            Event::new(EVENT_SOURCE, EventPayload::SessionUnlocked),
        );
    }

    fn transition(&mut self, next: AccessState) {
        if self.state != next {
            info!(from = ?self.state, to = ?next, "access state changed");
            self.state = next;
        }
        let status = self.state.status_message();
        if self.last_published.as_deref() == Some(status.as_str()) {
            return;
        }
        self.last_published = Some(status.clone());
        self.bus.publish_to(
            Topic::Access,
            Event::new(EVENT_SOURCE, EventPayload::AccessChanged { status }),
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wayfind_hal::sim::SimRig;
    use wayfind_middleware::TopicReceiver;

    const SECOND: Duration = Duration::from_secs(1);

    fn north_of(p: GeoPoint, meters: f64) -> GeoPoint {
        GeoPoint::new(
            p.latitude + (meters / geofence::EARTH_RADIUS_M).to_degrees(),
            p.longitude,
        )
    }

    fn build(rig: &SimRig, config: AccessGateConfig) -> (AccessGate, TopicReceiver) {
        let bus = EventBus::default();
        let rx = bus.subscribe_to(Topic::Access);
        let gate = AccessGate::new(
            config,
            Box::new(rig.permission.clone()),
            Box::new(rig.location.clone()),
            bus,
        );
        (gate, rx)
    }

    fn statuses(rx: &mut TopicReceiver) -> Vec<String> {
        rx.drain()
            .into_iter()
            .filter_map(|e| match e.payload {
                EventPayload::AccessChanged { status } => Some(status),
                _ => None,
            })
            .collect()
    }

    fn unlock_count(events: &[Event]) -> usize {
        events
            .iter()
            .filter(|e| e.payload == EventPayload::SessionUnlocked)
            .count()
    }

    #[test]
    fn waits_for_permission_then_polls_before_unlocking() {
        let config = AccessGateConfig::default();
        let rig = SimRig::new();
        rig.location.set_fix(config.fence.center);
        let (mut gate, mut rx) = build(&rig, config);

        gate.start();
        assert_eq!(gate.state(), &AccessState::AwaitingPermission);
        assert_eq!(rig.permission.request_count(), 1);

        for _ in 0..10 {
            gate.tick(SECOND);
        }
        assert_eq!(gate.state(), &AccessState::AwaitingPermission);
        assert_eq!(rig.permission.request_count(), 1, "prompt shown once");
        assert_eq!(rig.location.start_count(), 0);

        rig.permission.grant();
        gate.tick(SECOND);
        assert_eq!(gate.state(), &AccessState::Unlocked);

        let seen = statuses(&mut rx);
        assert_eq!(
            seen,
            vec![
                AccessState::Polling.status_message(),
                AccessState::Unlocked.status_message()
            ],
            "Unlocked must be reached through Polling"
        );
    }

    #[test]
    fn out_of_range_backs_off_then_unlocks_on_next_attempt() {
        let config = AccessGateConfig::default();
        let center = config.fence.center;
        let rig = SimRig::ready_at(north_of(center, 150.0));
        rig.location.set_warmup_polls(1);
        let (mut gate, _rx) = build(&rig, config);

        gate.start();
        assert_eq!(gate.state(), &AccessState::Polling);

        gate.tick(SECOND);
        assert_eq!(gate.state(), &AccessState::Denied(WayfindError::OutOfRange));
        assert!(!rig.location.is_running(), "service released after attempt");

        rig.location.set_fix(north_of(center, 50.0));
        for _ in 0..4 {
            gate.tick(SECOND);
            assert!(matches!(gate.state(), AccessState::Denied(_)));
        }
        gate.tick(SECOND);
        assert_eq!(gate.state(), &AccessState::Polling, "re-polls after 5 s");

        gate.tick(SECOND);
        assert_eq!(gate.state(), &AccessState::Unlocked);
        assert_eq!(rig.location.start_count(), 2);
    }

    #[test]
    fn repeated_denials_publish_one_message() {
        let config = AccessGateConfig::default();
        let rig = SimRig::ready_at(north_of(config.fence.center, 500.0));
        let (mut gate, mut rx) = build(&rig, config);

        gate.start();
        for _ in 0..30 {
            gate.tick(SECOND);
        }
        assert!(rig.location.start_count() >= 6, "loop keeps polling");

        let denied = WayfindError::OutOfRange.to_string();
        let seen = statuses(&mut rx);
        assert_eq!(seen.iter().filter(|s| **s == denied).count(), 1);
    }

    #[test]
    fn denied_loop_can_be_capped() {
        let config = AccessGateConfig {
            max_denied_retries: Some(2),
            ..AccessGateConfig::default()
        };
        let rig = SimRig::ready_at(north_of(config.fence.center, 500.0));
        let (mut gate, _rx) = build(&rig, config);

        gate.start();
        for _ in 0..60 {
            gate.tick(SECOND);
        }
        assert_eq!(rig.location.start_count(), 2);
        assert!(matches!(gate.state(), AccessState::Denied(_)));

        rig.location.set_fix(gate.config().fence.center);
        assert!(gate.retry());
        assert_eq!(gate.state(), &AccessState::Unlocked);
    }

    #[test]
    fn disabled_service_is_a_sticky_error() {
        let config = AccessGateConfig::default();
        let rig = SimRig::ready_at(config.fence.center);
        rig.location.set_enabled(false);
        let (mut gate, _rx) = build(&rig, config);

        gate.start();
        assert_eq!(
            gate.state(),
            &AccessState::Error(WayfindError::LocationServiceDisabled)
        );
        for _ in 0..60 {
            gate.tick(SECOND);
        }
        assert_eq!(rig.location.start_count(), 0, "no automatic retry");

        rig.location.set_enabled(true);
        assert!(gate.retry());
        assert_eq!(gate.state(), &AccessState::Unlocked);
    }

    #[test]
    fn failed_service_reports_fix_failed() {
        let config = AccessGateConfig::default();
        let rig = SimRig::ready_at(config.fence.center);
        rig.location.set_status(LocationStatus::Failed);
        let (mut gate, _rx) = build(&rig, config);

        gate.start();
        assert_eq!(gate.state(), &AccessState::Error(WayfindError::FixFailed));
        assert!(!rig.location.is_running());
    }

    #[test]
    fn initializing_wait_is_bounded() {
        let config = AccessGateConfig::default();
        let rig = SimRig::ready_at(config.fence.center);
        rig.location.set_status(LocationStatus::Initializing);
        let (mut gate, _rx) = build(&rig, config);

        gate.start();
        for _ in 0..19 {
            gate.tick(SECOND);
            assert_eq!(gate.state(), &AccessState::Polling);
        }
        gate.tick(SECOND);
        assert_eq!(gate.state(), &AccessState::Error(WayfindError::FixTimeout));
        assert!(!rig.location.is_running());
    }

    #[test]
    fn fix_timeout_is_retried_after_backoff() {
        let config = AccessGateConfig::default();
        let rig = SimRig::ready_at(config.fence.center);
        rig.location.set_status(LocationStatus::Initializing);
        let (mut gate, _rx) = build(&rig, config);

        gate.start();
        for _ in 0..20 {
            gate.tick(SECOND);
        }
        assert_eq!(gate.state(), &AccessState::Error(WayfindError::FixTimeout));

        rig.location.set_status(LocationStatus::Running);
        for _ in 0..4 {
            gate.tick(SECOND);
            assert_eq!(gate.state(), &AccessState::Error(WayfindError::FixTimeout));
        }
        gate.tick(SECOND);
        assert_eq!(gate.state(), &AccessState::Unlocked, "no retry() needed");
        assert_eq!(rig.location.start_count(), 2);
    }

    #[test]
    fn failed_service_is_not_retried_automatically() {
        let config = AccessGateConfig::default();
        let rig = SimRig::ready_at(config.fence.center);
        rig.location.set_status(LocationStatus::Failed);
        let (mut gate, _rx) = build(&rig, config);

        gate.start();
        rig.location.set_status(LocationStatus::Running);
        for _ in 0..30 {
            gate.tick(SECOND);
        }
        assert_eq!(gate.state(), &AccessState::Error(WayfindError::FixFailed));
        assert_eq!(rig.location.start_count(), 1);
    }

    #[test]
    fn sub_interval_ticks_accumulate() {
        let config = AccessGateConfig {
            fix_wait_attempts: 2,
            ..AccessGateConfig::default()
        };
        let rig = SimRig::ready_at(config.fence.center);
        rig.location.set_status(LocationStatus::Initializing);
        let (mut gate, _rx) = build(&rig, config);

        gate.start();
        for _ in 0..7 {
            gate.tick(Duration::from_millis(250));
        }
        assert_eq!(gate.state(), &AccessState::Polling);
        gate.tick(Duration::from_millis(250));
        assert_eq!(gate.state(), &AccessState::Error(WayfindError::FixTimeout));
    }

    #[test]
    fn retry_while_attempt_in_flight_is_noop() {
        let config = AccessGateConfig::default();
        let rig = SimRig::ready_at(config.fence.center);
        rig.location.set_warmup_polls(5);
        let (mut gate, _rx) = build(&rig, config);

        gate.start();
        assert!(gate.is_attempt_in_flight());
        assert!(!gate.retry());
        assert_eq!(rig.location.start_count(), 1);
    }

    #[test]
    fn unlocked_is_terminal_for_the_automatic_loop() {
        let config = AccessGateConfig::default();
        let rig = SimRig::ready_at(config.fence.center);
        let (mut gate, _rx) = build(&rig, config);

        gate.start();
        assert_eq!(gate.state(), &AccessState::Unlocked);
        rig.location.set_fix(GeoPoint::new(0.0, 0.0));
        for _ in 0..60 {
            gate.tick(SECOND);
        }
        assert_eq!(gate.state(), &AccessState::Unlocked);
        assert_eq!(rig.location.start_count(), 1);
    }

    #[test]
    fn unlock_notification_is_idempotent() {
        let config = AccessGateConfig::default();
        let rig = SimRig::ready_at(config.fence.center);
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Access);
        let mut gate = AccessGate::new(
            config,
            Box::new(rig.permission.clone()),
            Box::new(rig.location.clone()),
            bus,
        );

        gate.start();
        gate.enter_unlocked();
        gate.enter_unlocked();

        assert_eq!(unlock_count(&rx.drain()), 1);
    }

    #[test]
    fn retry_from_unlocked_reruns_a_single_attempt() {
        let config = AccessGateConfig::default();
        let rig = SimRig::ready_at(config.fence.center);
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Access);
        let mut gate = AccessGate::new(
            config.clone(),
            Box::new(rig.permission.clone()),
            Box::new(rig.location.clone()),
            bus,
        );
        let signal = gate.unlock_signal();

        gate.start();
        assert!(signal.is_unlocked());

        rig.location.set_fix(north_of(config.fence.center, 300.0));
        assert!(gate.retry());
        assert!(!signal.is_unlocked());
        assert_eq!(gate.state(), &AccessState::Denied(WayfindError::OutOfRange));

        for _ in 0..30 {
            gate.tick(SECOND);
        }
        assert_eq!(rig.location.start_count(), 2, "no automatic re-poll");
        assert_eq!(gate.state(), &AccessState::Denied(WayfindError::OutOfRange));

        rig.location.set_fix(config.fence.center);
        assert!(gate.retry());
        assert!(signal.is_unlocked());
        assert_eq!(unlock_count(&rx.drain()), 2, "one per explicit unlock");
    }

    #[test]
    fn retry_from_denied_resumes_the_automatic_loop() {
        let config = AccessGateConfig::default();
        let rig = SimRig::ready_at(north_of(config.fence.center, 300.0));
        let (mut gate, _rx) = build(&rig, config.clone());

        gate.start();
        assert!(gate.retry());
        assert_eq!(rig.location.start_count(), 2);

        rig.location.set_fix(config.fence.center);
        for _ in 0..5 {
            gate.tick(SECOND);
        }
        assert_eq!(gate.state(), &AccessState::Unlocked);
    }

    #[test]
    fn stop_is_terminal_and_releases_location() {
        let config = AccessGateConfig::default();
        let rig = SimRig::ready_at(config.fence.center);
        rig.location.set_warmup_polls(100);
        let (mut gate, _rx) = build(&rig, config);

        gate.start();
        assert!(rig.location.is_running());
        gate.stop();
        assert!(!rig.location.is_running());
        assert!(!gate.is_attempt_in_flight());

        gate.tick(SECOND);
        gate.start();
        assert!(!gate.retry());
        assert_eq!(gate.state(), &AccessState::Polling);
        assert_eq!(rig.location.start_count(), 1);
    }

    #[test]
    fn status_messages_map_one_per_state() {
        assert!(AccessState::Error(WayfindError::LocationServiceDisabled)
            .status_message()
            .contains("disabled"));
        assert_ne!(
            AccessState::Polling.status_message(),
            AccessState::Unlocked.status_message()
        );
    }
}
