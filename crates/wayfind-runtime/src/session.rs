//! [`WayfindSession`] – one wayfinding session, end to end.
//!
//! The session owns the three cooperating state machines and drives them
//! from a single [`tick`][WayfindSession::tick]:
//!
//! 1. **Access** – [`AccessGate`] advances the permission → fix → fence
//!    check, publishing on [`Topic::Access`].
//! 2. **Scan** – [`MarkerRecenter`] counts down its scan cooldown.  Camera
//!    frames arrive separately through [`WayfindSession::on_frame`].
//! 3. **Route** – [`NavRouter`] recomputes the corridor from the camera
//!    position to the selected destination.
//!
//! The router is the recenter's [`FloorListener`]; a resolved marker switches
//! the active floor and its destination options in the same call.
//!
//! # Surfaces
//!
//! [`WayfindSession::surface`] tells the UI which panel to show.  Exactly one
//! is active: nothing while the location check runs, the error panel for a
//! failed or out-of-range check, the scanner until the first successful
//! recenter, then navigation.  An automatic re-poll after an out-of-range
//! result or a fix timeout keeps the error panel up.
//!
//! # Example
//!
//! ```
//! use wayfind_hal::sim::{PayloadDecoder, SimRig};
//! use wayfind_runtime::session::{Collaborators, SessionConfig, Surface, WayfindSession};
//! use wayfind_types::{Pose, Target, Vec3};
//! use wayfind_middleware::EventBus;
//!
//! let config = SessionConfig::default();
//! let rig = SimRig::ready_at(config.access.fence.center);
//! let config = config.with_targets(vec![Target::new("Library", Pose::default(), 1)]);
//!
//! let mut session =
//!     WayfindSession::new(config, Collaborators::from_sim(&rig), EventBus::default()).unwrap();
//! session.start();
//! assert!(matches!(session.surface(), Surface::Scanner { .. }));
//!
//! session.on_frame(&PayloadDecoder::frame_for("library"));
//! assert_eq!(session.surface(), &Surface::Navigation);
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};
use wayfind_hal::sim::SimRig;
use wayfind_hal::{ArFrame, CameraFrame, LocationSource, MarkerDecoder, PathSolver, PermissionOracle};
use wayfind_kernel::{AccessGate, AccessGateConfig, AccessState};
use wayfind_middleware::EventBus;
use wayfind_perception::{MarkerRecenter, RecenterConfig, RecenterOutcome, TargetRegistry};
use wayfind_types::{Target, Vec3, WayfindError};

use crate::nav_router::{FloorCatalog, NavRouter, NavSnapshot, RouteStatus};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a session needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub access: AccessGateConfig,
    pub recenter: RecenterConfig,
    pub catalog: FloorCatalog,
    pub targets: Vec<Target>,
    /// Shown on the scanner panel once access is granted.
    pub welcome_message: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access: AccessGateConfig::default(),
            recenter: RecenterConfig::default(),
            catalog: FloorCatalog::reference(),
            targets: Vec::new(),
            welcome_message: "Welcome! Scan the marker nearest to you to begin.".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn with_targets(mut self, targets: Vec<Target>) -> Self {
        self.targets = targets;
        self
    }
}

/// The platform services a session talks to.
pub struct Collaborators {
    pub permission: Box<dyn PermissionOracle>,
    pub location: Box<dyn LocationSource>,
    pub ar_frame: Box<dyn ArFrame>,
    pub decoder: Box<dyn MarkerDecoder>,
    pub solver: Box<dyn PathSolver>,
}

impl Collaborators {
    /// Wire every collaborator to a handle of `rig`.  The rig keeps control
    /// of the simulated state after the session takes ownership.
    pub fn from_sim(rig: &SimRig) -> Self {
        Self {
            permission: Box::new(rig.permission.clone()),
            location: Box::new(rig.location.clone()),
            ar_frame: Box::new(rig.ar_frame.clone()),
            decoder: Box::new(rig.decoder.clone()),
            solver: Box::new(rig.solver.clone()),
        }
    }
}

/// The panel the UI should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "surface", rename_all = "snake_case")]
pub enum Surface {
    Hidden,
    Scanner { message: String },
    Error { message: String },
    Navigation,
}

// ─────────────────────────────────────────────────────────────────────────────
// WayfindSession
// ─────────────────────────────────────────────────────────────────────────────

/// A single wayfinding session.  See the [module docs](self).
pub struct WayfindSession {
    gate: AccessGate,
    recenter: MarkerRecenter,
    router: NavRouter,
    bus: EventBus,
    welcome_message: String,
    surface: Surface,
    notice: Option<String>,
    stopped: bool,
}

impl WayfindSession {
    /// Build a session.
    ///
    /// # Errors
    ///
    /// [`WayfindError::InvalidTarget`] when `config.targets` contains an
    /// unnamed, floorless or duplicate target.
    pub fn new(
        config: SessionConfig,
        collaborators: Collaborators,
        bus: EventBus,
    ) -> Result<Self, WayfindError> {
        let registry = Arc::new(TargetRegistry::new(config.targets)?);
        let Collaborators {
            permission,
            location,
            ar_frame,
            decoder,
            solver,
        } = collaborators;

        let gate = AccessGate::new(config.access, permission, location, bus.clone());
        let recenter = MarkerRecenter::new(
            config.recenter,
            Arc::clone(&registry),
            gate.unlock_signal(),
            ar_frame,
            decoder,
            bus.clone(),
        );
        let router = NavRouter::new(config.catalog, registry, solver, bus.clone());

        Ok(Self {
            gate,
            recenter,
            router,
            bus,
            welcome_message: config.welcome_message,
            surface: Surface::Hidden,
            notice: None,
            stopped: false,
        })
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn access_state(&self) -> &AccessState {
        self.gate.state()
    }

    /// The access check's user-facing message.
    pub fn status_message(&self) -> String {
        self.gate.status_message()
    }

    /// The message left by the most recent scan or manual recenter.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn router(&self) -> &NavRouter {
        &self.router
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn start(&mut self) {
        if self.stopped {
            return;
        }
        info!("wayfinding session starting");
        self.gate.start();
        self.refresh_surface();
    }

    /// End the session.  Nothing is processed afterward.
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.gate.stop();
        self.stopped = true;
        info!("wayfinding session stopped");
    }

    /// Advance every state machine by `dt` and route from `camera_position`.
    pub fn tick(&mut self, dt: Duration, camera_position: Vec3) -> RouteStatus {
        if self.stopped {
            return self.router.route();
        }
        self.gate.tick(dt);
        self.recenter.tick(dt);
        self.refresh_surface();
        self.router.tick(camera_position)
    }

    pub fn on_frame(&mut self, frame: &CameraFrame) -> RecenterOutcome {
        if self.stopped {
            return RecenterOutcome::Locked;
        }
        let outcome = self.recenter.on_frame(frame, &mut self.router);
        self.after_recenter(outcome)
    }

    /// Feed an already-decoded marker identity.
    pub fn on_marker_decoded(&mut self, identity: &str) -> RecenterOutcome {
        if self.stopped {
            return RecenterOutcome::Locked;
        }
        let outcome = self.recenter.on_marker_decoded(identity, &mut self.router);
        self.after_recenter(outcome)
    }

    /// Re-anchor at a named target, e.g. a floor entrance picked by the user.
    pub fn select_floor(&mut self, entrance: &str) -> RecenterOutcome {
        if self.stopped {
            return RecenterOutcome::Locked;
        }
        let outcome = self.recenter.recenter_at(entrance, &mut self.router);
        self.after_recenter(outcome)
    }

    fn after_recenter(&mut self, outcome: RecenterOutcome) -> RecenterOutcome {
        if let Some(message) = outcome.status_message() {
            self.notice = Some(message);
        }
        self.refresh_surface();
        outcome
    }

    /// User retry from the error panel.  Returns `false` when the gate
    /// ignored it.
    pub fn retry(&mut self) -> bool {
        if self.stopped || !self.gate.retry() {
            return false;
        }
        self.surface = Surface::Hidden;
        self.refresh_surface();
        true
    }

    pub fn destination_options(&self) -> &[String] {
        self.router.destination_options()
    }

    /// See [`NavRouter::select_destination`].  Ignored once stopped.
    pub fn select_destination(&mut self, index: usize) -> Result<(), WayfindError> {
        if self.stopped {
            return Ok(());
        }
        self.router.select_destination(index)
    }

    pub fn clear_destination(&mut self) {
        if !self.stopped {
            self.router.clear_destination();
        }
    }

    pub fn toggle_visibility(&mut self) {
        if !self.stopped {
            self.router.toggle_visibility();
        }
    }

    pub fn set_vertical_offset(&mut self, offset: f32) {
        if !self.stopped {
            self.router.set_vertical_offset(offset);
        }
    }

    pub fn snapshot(&self) -> NavSnapshot {
        self.router.snapshot()
    }

    fn refresh_surface(&mut self) {
        let next = match self.gate.state() {
            AccessState::AwaitingPermission => Surface::Hidden,
            AccessState::Polling => match self.surface {
                Surface::Error { .. } => return,
                _ => Surface::Hidden,
            },
            AccessState::Denied(reason) | AccessState::Error(reason) => Surface::Error {
                message: reason.to_string(),
            },
            AccessState::Unlocked if self.recenter.has_recentered() => Surface::Navigation,
            AccessState::Unlocked => Surface::Scanner {
                message: self.welcome_message.clone(),
            },
        };
        if next != self.surface {
            debug!(surface = ?next, "surface changed");
            self.surface = next;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
