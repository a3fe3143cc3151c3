//! [`MarkerRecenter`] – marker-triggered re-anchoring of the AR frame.
//!
//! Every decoded marker identity passes three guards, in order; the first
//! one that fails aborts with no side effect:
//!
//! 1. the session must be unlocked ([`UnlockSignal`]),
//! 2. the identity must be non-empty,
//! 3. the identity must differ from the previous one ([`ScanDebounce`],
//!    exact byte comparison, one step of history only).
//!
//! A passing identity is recorded in the debounce and starts the scan
//! cooldown, even when it names no known target.  If the AR frame refuses
//! the reset or origin change, the previous debounce entry is restored so
//! the same marker can be scanned again.  A known target (matched
//! ignoring case) then drives, in order: AR session reset, AR origin set to
//! the target's pose, [`FloorListener::change_active_floor`], and a
//! [`EventPayload::Recentered`] notification on [`Topic::Scanning`].
//!
//! Camera frames arrive through [`MarkerRecenter::on_frame`], which skips
//! decoding entirely while the cooldown is running.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use wayfind_hal::{ArFrame, CameraFrame, MarkerDecoder};
use wayfind_kernel::UnlockSignal;
use wayfind_middleware::{EventBus, Topic};
use wayfind_types::{Event, EventPayload, Target, WayfindError};

use crate::target_registry::TargetRegistry;

const EVENT_SOURCE: &str = "wayfind-perception::marker_recenter";

// ────────────────────────────────────────────────────────────────────────────
// Public types
// ────────────────────────────────────────────────────────────────────────────

/// Timing parameters for [`MarkerRecenter`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecenterConfig {
    /// Frames are ignored for this long after a new identity is accepted.
    pub scan_cooldown: Duration,
}

impl Default for RecenterConfig {
    fn default() -> Self {
        Self {
            scan_cooldown: Duration::from_secs(2),
        }
    }
}

/// Receives the floor of each successfully resolved target.
pub trait FloorListener {
    fn change_active_floor(&mut self, floor: u32);
}

/// What a single decode or manual recenter request did.
#[derive(Debug, Clone, PartialEq)]
pub enum RecenterOutcome {
    /// The AR frame now sits at `target`'s pose on `floor`.
    Recentered { target: String, floor: u32 },
    /// Guard 1: the session is not unlocked.
    Locked,
    /// Guard 2: empty payload.
    EmptyIdentity,
    /// Guard 3: same identity as the previous accepted scan.
    Debounced,
    /// The frame arrived during the scan cooldown and was not decoded.
    CoolingDown,
    /// No marker was visible in the frame.
    NoMarker,
    /// The identity passed the guards but names no registered target.
    UnknownMarker(String),
    /// A collaborator refused the reset or origin change.
    Failed(WayfindError),
}

impl RecenterOutcome {
    pub fn is_recentered(&self) -> bool {
        matches!(self, Self::Recentered { .. })
    }

    /// The user-facing message for this outcome, if it warrants one.
    pub fn status_message(&self) -> Option<String> {
        match self {
            Self::Recentered { target, floor } => {
                Some(format!("Location set to {target} (floor {floor})."))
            }
            Self::Locked => {
                Some("Scan ignored: you are not inside a supported location.".to_string())
            }
            Self::EmptyIdentity => Some("Invalid scan detected.".to_string()),
            Self::UnknownMarker(identity) => {
                Some(WayfindError::UnknownMarker(identity.clone()).to_string())
            }
            Self::Failed(err) => Some(err.to_string()),
            Self::Debounced | Self::CoolingDown | Self::NoMarker => None,
        }
    }
}

/// One-step memory of the last accepted identity.
#[derive(Debug, Clone, Default)]
pub struct ScanDebounce {
    last_identity: Option<String>,
}

impl ScanDebounce {
    pub fn last_identity(&self) -> Option<&str> {
        self.last_identity.as_deref()
    }

    /// Record `identity` and return the entry it replaced, or `None` when it
    /// repeats the previous one.
    fn admit(&mut self, identity: &str) -> Option<Option<String>> {
        if self.last_identity.as_deref() == Some(identity) {
            return None;
        }
        Some(self.last_identity.replace(identity.to_string()))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MarkerRecenter
// ────────────────────────────────────────────────────────────────────────────

/// Marker-triggered spatial recentering.  See the [module docs](self).
pub struct MarkerRecenter {
    config: RecenterConfig,
    registry: Arc<TargetRegistry>,
    unlock: UnlockSignal,
    ar_frame: Box<dyn ArFrame>,
    decoder: Box<dyn MarkerDecoder>,
    bus: EventBus,
    debounce: ScanDebounce,
    cooldown_remaining: Duration,
    recentered: bool,
}

impl MarkerRecenter {
    pub fn new(
        config: RecenterConfig,
        registry: Arc<TargetRegistry>,
        unlock: UnlockSignal,
        ar_frame: Box<dyn ArFrame>,
        decoder: Box<dyn MarkerDecoder>,
        bus: EventBus,
    ) -> Self {
        Self {
            config,
            registry,
            unlock,
            ar_frame,
            decoder,
            bus,
            debounce: ScanDebounce::default(),
            cooldown_remaining: Duration::ZERO,
            recentered: false,
        }
    }

    pub fn debounce(&self) -> &ScanDebounce {
        &self.debounce
    }

    /// `true` once any recenter has succeeded.
    pub fn has_recentered(&self) -> bool {
        self.recentered
    }

    pub fn is_cooling_down(&self) -> bool {
        !self.cooldown_remaining.is_zero()
    }

    /// Count the scan cooldown down by `dt`.
    pub fn tick(&mut self, dt: Duration) {
        self.cooldown_remaining = self.cooldown_remaining.saturating_sub(dt);
    }

    /// Decode `frame` and feed the identity through
    /// [`on_marker_decoded`][Self::on_marker_decoded], unless the scan
    /// cooldown is running.
    pub fn on_frame(
        &mut self,
        frame: &CameraFrame,
        floors: &mut dyn FloorListener,
    ) -> RecenterOutcome {
        if self.is_cooling_down() {
            return RecenterOutcome::CoolingDown;
        }
        match self.decoder.decode(frame) {
            Some(identity) => self.on_marker_decoded(&identity, floors),
            None => RecenterOutcome::NoMarker,
        }
    }

    /// Handle one decoded marker identity.
    pub fn on_marker_decoded(
        &mut self,
        identity: &str,
        floors: &mut dyn FloorListener,
    ) -> RecenterOutcome {
        if !self.unlock.is_unlocked() {
            warn!(identity, "scan ignored: session is locked");
            return RecenterOutcome::Locked;
        }
        if identity.is_empty() {
            warn!("scan ignored: empty marker payload");
            return RecenterOutcome::EmptyIdentity;
        }
        let Some(previous) = self.debounce.admit(identity) else {
            debug!(identity, "same marker scanned again; ignoring");
            return RecenterOutcome::Debounced;
        };
        self.cooldown_remaining = self.config.scan_cooldown;
        info!(identity, "new marker scanned");

        let registry = Arc::clone(&self.registry);
        match registry.find(identity) {
            Some(target) => {
                let outcome = self.recenter(target, floors);
                if matches!(outcome, RecenterOutcome::Failed(_)) {
                    self.debounce.last_identity = previous;
                }
                outcome
            }
            None => {
                warn!(identity, "marker does not name a registered target");
                RecenterOutcome::UnknownMarker(identity.to_string())
            }
        }
    }

    /// Re-anchor at a named target chosen by the user rather than scanned,
    /// e.g. a floor entrance.  Requires the session to be unlocked; leaves
    /// the scan debounce untouched.
    pub fn recenter_at(&mut self, name: &str, floors: &mut dyn FloorListener) -> RecenterOutcome {
        if !self.unlock.is_unlocked() {
            warn!(name, "manual recenter ignored: session is locked");
            return RecenterOutcome::Locked;
        }
        let registry = Arc::clone(&self.registry);
        match registry.find(name) {
            Some(target) => self.recenter(target, floors),
            None => {
                warn!(name, "manual recenter to unknown target");
                RecenterOutcome::UnknownMarker(name.to_string())
            }
        }
    }

    #[instrument(skip_all, fields(target = %target.name, floor = target.floor))]
    fn recenter(&mut self, target: &Target, floors: &mut dyn FloorListener) -> RecenterOutcome {
        if let Err(err) = self.ar_frame.reset() {
            warn!(target = %target.name, error = %err, "AR session reset failed");
            return RecenterOutcome::Failed(err);
        }
        if let Err(err) = self
            .ar_frame
            .set_origin(target.pose.position, target.pose.rotation)
        {
            warn!(target = %target.name, error = %err, "AR origin update failed");
            return RecenterOutcome::Failed(err);
        }

        floors.change_active_floor(target.floor);
        self.recentered = true;
        info!(target = %target.name, floor = target.floor, "AR frame recentered");

        self.bus.publish_to(
            Topic::Scanning,
            Event::new(
                EVENT_SOURCE,
                EventPayload::Recentered {
                    target: target.name.clone(),
                    floor: target.floor,
                },
            ),
        );
        RecenterOutcome::Recentered {
            target: target.name.clone(),
            floor: target.floor,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wayfind_hal::sim::{PayloadDecoder, SimArFrame, SimRig};
    use wayfind_kernel::{AccessGate, AccessGateConfig};
    use wayfind_types::{GeoPoint, Pose, Quaternion, Vec3};

    #[derive(Default)]
    struct FloorLog(Vec<u32>);

    impl FloorListener for FloorLog {
        fn change_active_floor(&mut self, floor: u32) {
            self.0.push(floor);
        }
    }

    fn registry() -> Arc<TargetRegistry> {
        Arc::new(
            TargetRegistry::new(vec![
                Target::new(
                    "Library",
                    Pose::new(Vec3::new(12.0, 0.0, 3.5), Quaternion::from_yaw_degrees(90.0)),
                    1,
                ),
                Target::new("MeetingRoom", Pose::default(), 1),
                Target::new("FirstFloorEntrance", Pose::new(Vec3::new(0.0, 4.0, 0.0), Quaternion::identity()), 2),
            ])
            .unwrap(),
        )
    }

    /// A gate that is unlocked (`inside == true`) or stuck out of range.
    fn gate(inside: bool) -> AccessGate {
        let config = AccessGateConfig::default();
        let fix = if inside {
            config.fence.center
        } else {
            GeoPoint::new(0.0, 0.0)
        };
        let rig = SimRig::ready_at(fix);
        let mut gate = AccessGate::new(
            config,
            Box::new(rig.permission.clone()),
            Box::new(rig.location.clone()),
            EventBus::default(),
        );
        gate.start();
        gate
    }

    fn recenter_with(gate: &AccessGate, ar: &SimArFrame, bus: EventBus) -> MarkerRecenter {
        MarkerRecenter::new(
            RecenterConfig::default(),
            registry(),
            gate.unlock_signal(),
            Box::new(ar.clone()),
            Box::new(PayloadDecoder),
            bus,
        )
    }

    #[test]
    fn known_marker_resets_frame_and_changes_floor() {
        let gate = gate(true);
        let ar = SimArFrame::new();
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Scanning);
        let mut recenter = recenter_with(&gate, &ar, bus);
        let mut floors = FloorLog::default();

        let outcome = recenter.on_marker_decoded("library", &mut floors);

        assert_eq!(
            outcome,
            RecenterOutcome::Recentered {
                target: "Library".to_string(),
                floor: 1
            }
        );
        assert_eq!(ar.reset_count(), 1);
        let origin = ar.origin().unwrap();
        assert_eq!(origin.position, Vec3::new(12.0, 0.0, 3.5));
        assert_eq!(origin.rotation, Quaternion::from_yaw_degrees(90.0));
        assert_eq!(floors.0, vec![1]);
        assert!(recenter.has_recentered());

        let event = rx.try_recv().expect("recentered notification");
        assert!(matches!(event.payload, EventPayload::Recentered { floor: 1, .. }));
    }

    #[test]
    fn locked_session_ignores_scans_without_touching_debounce() {
        let gate = gate(false);
        let ar = SimArFrame::new();
        let mut recenter = recenter_with(&gate, &ar, EventBus::default());
        let mut floors = FloorLog::default();

        assert_eq!(
            recenter.on_marker_decoded("Library", &mut floors),
            RecenterOutcome::Locked
        );
        assert_eq!(recenter.debounce().last_identity(), None);
        assert_eq!(ar.reset_count(), 0);
        assert!(floors.0.is_empty());
    }

    #[test]
    fn empty_identity_is_rejected() {
        let gate = gate(true);
        let ar = SimArFrame::new();
        let mut recenter = recenter_with(&gate, &ar, EventBus::default());
        let mut floors = FloorLog::default();

        assert_eq!(
            recenter.on_marker_decoded("", &mut floors),
            RecenterOutcome::EmptyIdentity
        );
        assert_eq!(recenter.debounce().last_identity(), None);
    }

    #[test]
    fn held_marker_recenters_once() {
        let gate = gate(true);
        let ar = SimArFrame::new();
        let mut recenter = recenter_with(&gate, &ar, EventBus::default());
        let mut floors = FloorLog::default();

        assert!(recenter.on_marker_decoded("Library", &mut floors).is_recentered());
        assert_eq!(
            recenter.on_marker_decoded("Library", &mut floors),
            RecenterOutcome::Debounced
        );
        assert_eq!(ar.reset_count(), 1);
        assert_eq!(floors.0.len(), 1);
    }

    #[test]
    fn cycle_a_b_a_is_not_suppressed() {
        let gate = gate(true);
        let ar = SimArFrame::new();
        let mut recenter = recenter_with(&gate, &ar, EventBus::default());
        let mut floors = FloorLog::default();

        for id in ["Library", "FirstFloorEntrance", "Library"] {
            assert!(recenter.on_marker_decoded(id, &mut floors).is_recentered());
        }
        assert_eq!(ar.reset_count(), 3);
        assert_eq!(floors.0, vec![1, 2, 1]);
    }

    #[test]
    fn debounce_is_case_sensitive_but_lookup_is_not() {
        let gate = gate(true);
        let ar = SimArFrame::new();
        let mut recenter = recenter_with(&gate, &ar, EventBus::default());
        let mut floors = FloorLog::default();

        assert!(recenter.on_marker_decoded("Library", &mut floors).is_recentered());
        assert!(recenter.on_marker_decoded("LIBRARY", &mut floors).is_recentered());
        assert_eq!(ar.reset_count(), 2);
    }

    #[test]
    fn unknown_marker_is_debounced_but_harmless() {
        let gate = gate(true);
        let ar = SimArFrame::new();
        let mut recenter = recenter_with(&gate, &ar, EventBus::default());
        let mut floors = FloorLog::default();

        assert_eq!(
            recenter.on_marker_decoded("Reception", &mut floors),
            RecenterOutcome::UnknownMarker("Reception".to_string())
        );
        assert_eq!(recenter.debounce().last_identity(), Some("Reception"));
        assert_eq!(
            recenter.on_marker_decoded("Reception", &mut floors),
            RecenterOutcome::Debounced
        );
        assert_eq!(ar.reset_count(), 0);
        assert!(floors.0.is_empty());
        assert!(!recenter.has_recentered());
    }

    #[test]
    fn frames_are_skipped_during_cooldown() {
        let gate = gate(true);
        let ar = SimArFrame::new();
        let mut recenter = recenter_with(&gate, &ar, EventBus::default());
        let mut floors = FloorLog::default();

        assert_eq!(
            recenter.on_frame(&PayloadDecoder::blank_frame(), &mut floors),
            RecenterOutcome::NoMarker
        );
        assert!(recenter
            .on_frame(&PayloadDecoder::frame_for("Library"), &mut floors)
            .is_recentered());
        assert!(recenter.is_cooling_down());

        let entrance = PayloadDecoder::frame_for("FirstFloorEntrance");
        recenter.tick(Duration::from_millis(1500));
        assert_eq!(
            recenter.on_frame(&entrance, &mut floors),
            RecenterOutcome::CoolingDown
        );
        recenter.tick(Duration::from_millis(500));
        assert!(recenter.on_frame(&entrance, &mut floors).is_recentered());
        assert_eq!(floors.0, vec![1, 2]);
    }

    #[test]
    fn failed_reset_leaves_floor_untouched() {
        let gate = gate(true);
        let ar = SimArFrame::new();
        ar.set_fail_reset(true);
        let mut recenter = recenter_with(&gate, &ar, EventBus::default());
        let mut floors = FloorLog::default();

        let outcome = recenter.on_marker_decoded("Library", &mut floors);
        assert!(matches!(
            outcome,
            RecenterOutcome::Failed(WayfindError::Collaborator { .. })
        ));
        assert!(floors.0.is_empty());
        assert!(ar.origin().is_none());
        assert!(outcome.status_message().is_some());
        assert_eq!(recenter.debounce().last_identity(), None);
    }

    #[test]
    fn same_marker_recenters_after_a_failed_reset() {
        let gate = gate(true);
        let ar = SimArFrame::new();
        let mut recenter = recenter_with(&gate, &ar, EventBus::default());
        let mut floors = FloorLog::default();
        let library = PayloadDecoder::frame_for("Library");

        assert!(recenter.on_marker_decoded("MeetingRoom", &mut floors).is_recentered());
        recenter.tick(Duration::from_secs(2));

        ar.set_fail_reset(true);
        assert!(matches!(
            recenter.on_frame(&library, &mut floors),
            RecenterOutcome::Failed(_)
        ));
        assert_eq!(recenter.debounce().last_identity(), Some("MeetingRoom"));

        ar.set_fail_reset(false);
        recenter.tick(Duration::from_secs(2));
        assert!(recenter.on_frame(&library, &mut floors).is_recentered());
        assert_eq!(recenter.debounce().last_identity(), Some("Library"));
        assert_eq!(floors.0, vec![1, 1]);
    }

    #[test]
    fn manual_recenter_bypasses_debounce() {
        let gate = gate(true);
        let ar = SimArFrame::new();
        let mut recenter = recenter_with(&gate, &ar, EventBus::default());
        let mut floors = FloorLog::default();

        assert!(recenter.on_marker_decoded("Library", &mut floors).is_recentered());
        assert!(recenter
            .recenter_at("firstfloorentrance", &mut floors)
            .is_recentered());
        assert!(recenter
            .recenter_at("FirstFloorEntrance", &mut floors)
            .is_recentered());
        assert_eq!(recenter.debounce().last_identity(), Some("Library"));
        assert_eq!(floors.0, vec![1, 2, 2]);
    }

    #[test]
    fn silent_outcomes_have_no_message() {
        assert!(RecenterOutcome::Debounced.status_message().is_none());
        assert!(RecenterOutcome::CoolingDown.status_message().is_none());
        assert!(RecenterOutcome::Locked.status_message().is_some());
    }
}
