//! In-process simulated collaborators for headless runs and tests.
//!
//! Every simulated driver is a cheap, cloneable handle onto shared state.
//! Hand one clone to the component under test and keep another to steer the
//! device from outside (grant permission, move the fix, block the path) and
//! to assert on what the component did.
//!
//! # Example
//!
//! ```rust
//! use wayfind_hal::sim::SimRig;
//! use wayfind_hal::{LocationSource, LocationStatus, PermissionOracle};
//! use wayfind_types::GeoPoint;
//!
//! let rig = SimRig::new();
//! let mut location = rig.location.clone();
//!
//! rig.permission.grant();
//! rig.location.set_fix(GeoPoint::new(7.2811, 80.6201));
//!
//! location.start();
//! assert!(rig.permission.has_location_permission());
//! assert_eq!(location.status(), LocationStatus::Running);
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;
use wayfind_types::{GeoPoint, Pose, Quaternion, Vec3, WayfindError};

use crate::ar_frame::ArFrame;
use crate::camera::{CameraFrame, MarkerDecoder};
use crate::location::{LocationSource, LocationStatus, PermissionOracle};
use crate::path_solver::PathSolver;

/// Lock a shared sim state, recovering the data if a panicking test thread
/// poisoned it.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ────────────────────────────────────────────────────────────────────────────
// Permission
// ────────────────────────────────────────────────────────────────────────────

/// Simulated permission prompt.  Starts denied; [`grant`][Self::grant]
/// answers the prompt.
#[derive(Clone, Debug, Default)]
pub struct SimPermission {
    granted: Arc<AtomicBool>,
    requests: Arc<AtomicUsize>,
}

impl SimPermission {
    pub fn new() -> Self {
        Self::default()
    }

    /// A permission that was granted in a previous session.
    pub fn granted() -> Self {
        let p = Self::new();
        p.grant();
        p
    }

    pub fn grant(&self) {
        self.granted.store(true, Ordering::SeqCst);
    }

    pub fn revoke(&self) {
        self.granted.store(false, Ordering::SeqCst);
    }

    /// How many times the component asked the user.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl PermissionOracle for SimPermission {
    fn has_location_permission(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn request_location_permission(&mut self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        debug!("sim: location permission prompt shown");
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Location
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
struct LocationState {
    enabled: bool,
    running: bool,
    /// Status reported once warm-up polls are exhausted.
    status: LocationStatus,
    /// Remaining `status()` polls that report `Initializing` after a start.
    warmup_polls: u32,
    configured_warmup: u32,
    fix: Option<GeoPoint>,
    starts: usize,
}

/// Simulated GPS.  Defaults to enabled, no warm-up, reporting `Running`
/// with no fix until [`set_fix`][Self::set_fix] is called.
#[derive(Clone, Debug)]
pub struct SimLocation {
    state: Arc<Mutex<LocationState>>,
}

impl Default for SimLocation {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(LocationState {
                enabled: true,
                running: false,
                status: LocationStatus::Running,
                warmup_polls: 0,
                configured_warmup: 0,
                fix: None,
                starts: 0,
            })),
        }
    }
}

impl SimLocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fix(&self, fix: GeoPoint) {
        lock(&self.state).fix = Some(fix);
    }

    pub fn set_enabled(&self, enabled: bool) {
        lock(&self.state).enabled = enabled;
    }

    /// Status reported after warm-up.  `Initializing` here means the service
    /// never settles.
    pub fn set_status(&self, status: LocationStatus) {
        lock(&self.state).status = status;
    }

    /// Number of `status()` polls after each start that report
    /// `Initializing` before the configured status shows through.
    pub fn set_warmup_polls(&self, polls: u32) {
        let mut s = lock(&self.state);
        s.configured_warmup = polls;
        s.warmup_polls = polls;
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    pub fn start_count(&self) -> usize {
        lock(&self.state).starts
    }
}

impl LocationSource for SimLocation {
    fn is_service_enabled(&self) -> bool {
        lock(&self.state).enabled
    }

    fn start(&mut self) {
        let mut s = lock(&self.state);
        s.running = true;
        s.starts += 1;
        s.warmup_polls = s.configured_warmup;
    }

    fn stop(&mut self) {
        lock(&self.state).running = false;
    }

    fn status(&self) -> LocationStatus {
        let mut s = lock(&self.state);
        if s.warmup_polls > 0 {
            s.warmup_polls -= 1;
            return LocationStatus::Initializing;
        }
        s.status
    }

    fn last_fix(&self) -> Option<GeoPoint> {
        let s = lock(&self.state);
        match s.status {
            LocationStatus::Running => s.fix,
            _ => None,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// AR frame
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ArFrameState {
    resets: usize,
    origin: Option<Pose>,
    fail_reset: bool,
}

/// Simulated AR session that records resets and the last origin.
#[derive(Clone, Debug, Default)]
pub struct SimArFrame {
    state: Arc<Mutex<ArFrameState>>,
}

impl SimArFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset_count(&self) -> usize {
        lock(&self.state).resets
    }

    pub fn origin(&self) -> Option<Pose> {
        lock(&self.state).origin
    }

    /// Make subsequent resets fail, as when tracking is unavailable.
    pub fn set_fail_reset(&self, fail: bool) {
        lock(&self.state).fail_reset = fail;
    }
}

impl ArFrame for SimArFrame {
    fn reset(&mut self) -> Result<(), WayfindError> {
        let mut s = lock(&self.state);
        if s.fail_reset {
            return Err(WayfindError::Collaborator {
                component: "ar_frame".to_string(),
                details: "tracking session unavailable".to_string(),
            });
        }
        s.resets += 1;
        Ok(())
    }

    fn set_origin(&mut self, position: Vec3, rotation: Quaternion) -> Result<(), WayfindError> {
        lock(&self.state).origin = Some(Pose::new(position, rotation));
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Marker decoder
// ────────────────────────────────────────────────────────────────────────────

/// Decoder for simulated frames whose pixel buffer *is* the UTF-8 payload.
/// All-zero frames decode to nothing; a zero-length buffer is a marker with
/// an empty payload.
#[derive(Clone, Debug, Default)]
pub struct PayloadDecoder;

impl PayloadDecoder {
    /// Build a frame that decodes to `payload`.
    pub fn frame_for(payload: &str) -> CameraFrame {
        CameraFrame {
            width: payload.len() as u32,
            height: 1,
            data: payload.as_bytes().to_vec(),
        }
    }

    /// A frame with no marker in view.
    pub fn blank_frame() -> CameraFrame {
        CameraFrame {
            width: 4,
            height: 4,
            data: vec![0u8; 16],
        }
    }
}

impl MarkerDecoder for PayloadDecoder {
    fn decode(&mut self, frame: &CameraFrame) -> Option<String> {
        if !frame.data.is_empty() && frame.data.iter().all(|&b| b == 0) {
            return None;
        }
        std::str::from_utf8(&frame.data).ok().map(str::to_string)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Path solver
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct SolverState {
    blocked: bool,
    calls: usize,
}

/// Open-floor solver: walks along x first, then z, at the start height.
/// Can be blocked to simulate an unreachable destination.
#[derive(Clone, Debug, Default)]
pub struct SimPathSolver {
    state: Arc<Mutex<SolverState>>,
}

impl SimPathSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_blocked(&self, blocked: bool) {
        lock(&self.state).blocked = blocked;
    }

    pub fn call_count(&self) -> usize {
        lock(&self.state).calls
    }
}

impl PathSolver for SimPathSolver {
    fn compute_corners(&self, from: Vec3, to: Vec3) -> Vec<Vec3> {
        let mut s = lock(&self.state);
        s.calls += 1;
        if s.blocked {
            return Vec::new();
        }
        let corner = Vec3::new(to.x, from.y, from.z);
        if corner == from || corner == to {
            vec![from, to]
        } else {
            vec![from, corner, to]
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimRig
// ────────────────────────────────────────────────────────────────────────────

/// One handle per simulated collaborator, for wiring a complete session
/// without a device.
#[derive(Clone, Debug, Default)]
pub struct SimRig {
    pub permission: SimPermission,
    pub location: SimLocation,
    pub ar_frame: SimArFrame,
    pub decoder: PayloadDecoder,
    pub solver: SimPathSolver,
}

impl SimRig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A rig whose permission was already granted and whose GPS reports
    /// `fix` immediately.
    pub fn ready_at(fix: GeoPoint) -> Self {
        let rig = Self::new();
        rig.permission.grant();
        rig.location.set_fix(fix);
        rig
    }
}
