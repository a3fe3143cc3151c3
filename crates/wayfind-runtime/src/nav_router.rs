//! [`NavRouter`] – floor-scoped destination selection and the live path
//! corridor.
//!
//! The router owns the [`NavSession`]: the active floor, the selected
//! destination, the last corridor returned by the [`PathSolver`], the
//! vertical offset applied for display, and whether the path is visible.
//!
//! - [`NavRouter::change_active_floor`] rebuilds the destination options for
//!   the floor (placeholder first), clears the selection and hides the path.
//! - [`NavRouter::select_destination`] resolves an option to a [`Target`]
//!   and shows the path.
//! - [`NavRouter::tick`] asks the solver for fresh corners each frame while a
//!   visible destination is selected.  Solver output is stored verbatim; an
//!   empty or partial result is never patched up.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use wayfind_hal::sim::SimPathSolver;
//! use wayfind_middleware::EventBus;
//! use wayfind_perception::TargetRegistry;
//! use wayfind_runtime::nav_router::{FloorCatalog, NavRouter, RouteStatus};
//! use wayfind_types::{Pose, Target, Vec3};
//!
//! let registry = Arc::new(
//!     TargetRegistry::new(vec![Target::new(
//!         "Library",
//!         Pose::new(Vec3::new(4.0, 0.0, 0.0), Default::default()),
//!         1,
//!     )])
//!     .unwrap(),
//! );
//! let catalog = FloorCatalog::new().with_floor(1, ["Library"]);
//! let mut router = NavRouter::new(
//!     catalog,
//!     registry,
//!     Box::new(SimPathSolver::new()),
//!     EventBus::default(),
//! );
//!
//! router.change_active_floor(1);
//! router.select_destination(1).unwrap();
//! assert_eq!(
//!     router.tick(Vec3::zero()),
//!     RouteStatus::Routed { corners: 2 }
//! );
//! ```

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use wayfind_hal::PathSolver;
use wayfind_middleware::{EventBus, Topic};
use wayfind_perception::{FloorListener, TargetRegistry};
use wayfind_types::{Event, EventPayload, Target, Vec3, WayfindError};

const EVENT_SOURCE: &str = "wayfind-runtime::nav_router";

/// Label of the leading "no selection" option.
pub const PLACEHOLDER: &str = "Select a destination";

// ─────────────────────────────────────────────────────────────────────────────
// Catalog
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered destination names offered on each floor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloorCatalog {
    floors: BTreeMap<u32, Vec<String>>,
}

impl FloorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the destinations listed on `floor`, replacing any previous list.
    pub fn with_floor<I, S>(mut self, floor: u32, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.floors
            .insert(floor, names.into_iter().map(Into::into).collect());
        self
    }

    /// The destinations for `floor`; empty for an unknown floor.
    pub fn destinations(&self, floor: u32) -> &[String] {
        self.floors.get(&floor).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Floors with a destination list, ascending.
    pub fn floors(&self) -> impl Iterator<Item = u32> + '_ {
        self.floors.keys().copied()
    }

    /// The reference two-floor campus layout.
    pub fn reference() -> Self {
        Self::new()
            .with_floor(
                1,
                [
                    "HeadOfOperations",
                    "Library",
                    "ManagerOperations",
                    "MarketingDepartment",
                    "MeetingRoom",
                    "Reception",
                    "Staircase",
                    "StudyGlobalUnit",
                    "WashRoom",
                ],
            )
            .with_floor(
                2,
                [
                    "AcademicStaffRoom",
                    "AdminDepartment",
                    "FirstFloorEntrance",
                    "FirstFloorWashRoom",
                    "FreeArea",
                    "ITDepartment",
                    "ITLab1",
                    "LectureTheater1",
                    "LectureTheater2",
                ],
            )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session state
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque reference to a destination's on-screen indicator, resolved once
/// when the router is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IndicatorHandle(usize);

/// Result of the most recent routing tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RouteStatus {
    /// Nothing to route: hidden, or no destination selected.
    Idle,
    Routed { corners: usize },
    /// The solver returned no corners.
    NoPath,
}

/// Navigation state owned by [`NavRouter`].
#[derive(Debug, Clone, PartialEq)]
pub struct NavSession {
    active_floor: u32,
    selected_target: Option<Target>,
    corridor: Vec<Vec3>,
    vertical_offset: f32,
    visible: bool,
    active_indicator: Option<IndicatorHandle>,
}

impl NavSession {
    fn new(active_floor: u32) -> Self {
        Self {
            active_floor,
            selected_target: None,
            corridor: Vec::new(),
            vertical_offset: 0.0,
            visible: false,
            active_indicator: None,
        }
    }

    pub fn active_floor(&self) -> u32 {
        self.active_floor
    }

    pub fn selected_target(&self) -> Option<&Target> {
        self.selected_target.as_ref()
    }

    /// The last solver result, kept while hidden so it can be shown again.
    pub fn corridor(&self) -> &[Vec3] {
        &self.corridor
    }

    pub fn vertical_offset(&self) -> f32 {
        self.vertical_offset
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn active_indicator(&self) -> Option<IndicatorHandle> {
        self.active_indicator
    }

    fn clear_selection(&mut self) {
        self.selected_target = None;
        self.active_indicator = None;
        self.corridor.clear();
    }
}

/// What rendering needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavSnapshot {
    pub active_floor: u32,
    pub selected_target: Option<String>,
    pub visible: bool,
    pub vertical_offset: f32,
    pub active_indicator: Option<IndicatorHandle>,
    pub route: RouteStatus,
    /// Offset corridor; empty unless visible with a destination selected.
    pub corridor: Vec<Vec3>,
}

/// Raise every waypoint by `offset` on the vertical axis.
///
/// With a zero offset the input is returned as-is (borrowed); otherwise a
/// new sequence is built and the input is left untouched.
pub fn apply_vertical_offset(corridor: &[Vec3], offset: f32) -> Cow<'_, [Vec3]> {
    if offset == 0.0 {
        return Cow::Borrowed(corridor);
    }
    Cow::Owned(corridor.iter().map(|p| p.raised(offset)).collect())
}

// ─────────────────────────────────────────────────────────────────────────────
// NavRouter
// ─────────────────────────────────────────────────────────────────────────────

/// Navigation-target router.  See the [module docs](self).
pub struct NavRouter {
    catalog: FloorCatalog,
    registry: Arc<TargetRegistry>,
    solver: Box<dyn PathSolver>,
    bus: EventBus,
    session: NavSession,
    options: Vec<String>,
    indicators: HashMap<String, IndicatorHandle>,
    route: RouteStatus,
}

impl NavRouter {
    /// Build a router starting on the lowest catalogued floor (or floor 1).
    pub fn new(
        catalog: FloorCatalog,
        registry: Arc<TargetRegistry>,
        solver: Box<dyn PathSolver>,
        bus: EventBus,
    ) -> Self {
        let indicators = registry
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.to_lowercase(), IndicatorHandle(i)))
            .collect();
        let floor = catalog.floors().next().unwrap_or(1);
        let options = Self::options_for(&catalog, floor);
        Self {
            catalog,
            registry,
            solver,
            bus,
            session: NavSession::new(floor),
            options,
            indicators,
            route: RouteStatus::Idle,
        }
    }

    fn options_for(catalog: &FloorCatalog, floor: u32) -> Vec<String> {
        std::iter::once(PLACEHOLDER.to_string())
            .chain(catalog.destinations(floor).iter().cloned())
            .collect()
    }

    pub fn session(&self) -> &NavSession {
        &self.session
    }

    pub fn route(&self) -> RouteStatus {
        self.route
    }

    /// The options currently offered: placeholder at index 0, then the active
    /// floor's destinations.
    pub fn destination_options(&self) -> &[String] {
        &self.options
    }

    /// The indicator that belongs to `name`, if it is a registered target.
    pub fn indicator_for(&self, name: &str) -> Option<IndicatorHandle> {
        self.indicators.get(&name.to_lowercase()).copied()
    }

    /// Switch floors: rebuild the options, drop the selection, hide the path.
    pub fn change_active_floor(&mut self, floor: u32) {
        if self.catalog.destinations(floor).is_empty() {
            warn!(floor, "no destinations catalogued for floor");
        }
        self.session.active_floor = floor;
        self.options = Self::options_for(&self.catalog, floor);
        self.session.clear_selection();
        self.route = RouteStatus::Idle;
        self.session.visible = false;
        info!(floor, destinations = self.options.len() - 1, "active floor changed");
        self.bus.publish_to(
            Topic::Navigation,
            Event::new(EVENT_SOURCE, EventPayload::FloorChanged { floor }),
        );
    }

    /// Select the option at `index` as the destination.
    ///
    /// Index 0 (the placeholder) is ignored.  A resolved destination makes
    /// the path visible if it was hidden.
    ///
    /// # Errors
    ///
    /// [`WayfindError::UnknownDestination`] when `index` is past the end of
    /// the options or names no registered target.  An unresolved name also
    /// clears the previous selection.
    #[instrument(skip(self))]
    pub fn select_destination(&mut self, index: usize) -> Result<(), WayfindError> {
        if index == 0 {
            debug!("placeholder selected; ignoring");
            return Ok(());
        }
        let Some(name) = self.options.get(index).cloned() else {
            return Err(WayfindError::UnknownDestination(format!("option #{index}")));
        };

        self.session.clear_selection();
        self.route = RouteStatus::Idle;

        let Some(target) = self.registry.find(&name).cloned() else {
            warn!(destination = %name, "destination is not a registered target");
            return Err(WayfindError::UnknownDestination(name));
        };

        info!(destination = %target.name, floor = target.floor, "destination selected");
        self.session.active_indicator = self.indicator_for(&target.name);
        self.session.selected_target = Some(target);
        if !self.session.visible {
            self.session.visible = true;
        }
        Ok(())
    }

    /// Drop the selected destination and its corridor.
    pub fn clear_destination(&mut self) {
        self.session.clear_selection();
        self.route = RouteStatus::Idle;
    }

    /// Recompute the corridor from `current_position` to the selected
    /// destination.  Does nothing unless a destination is selected and the
    /// path is visible.
    pub fn tick(&mut self, current_position: Vec3) -> RouteStatus {
        if !self.session.visible {
            return self.route;
        }
        let Some(target) = self.session.selected_target.as_ref() else {
            return self.route;
        };

        let corners = self
            .solver
            .compute_corners(current_position, target.pose.position);

        let status = if corners.is_empty() {
            RouteStatus::NoPath
        } else {
            RouteStatus::Routed {
                corners: corners.len(),
            }
        };
        if status == RouteStatus::NoPath && self.route != RouteStatus::NoPath {
            let err = WayfindError::UnreachableTarget(target.name.clone());
            warn!(error = %err, "path solver found no corridor");
            self.bus.publish_to(
                Topic::Navigation,
                Event::new(
                    EVENT_SOURCE,
                    EventPayload::RouteUnavailable {
                        target: target.name.clone(),
                    },
                ),
            );
        }

        self.session.corridor = corners;
        self.route = status;
        status
    }

    /// Flip path visibility.  Hiding keeps the last corridor.
    pub fn toggle_visibility(&mut self) {
        self.session.visible = !self.session.visible;
        debug!(visible = self.session.visible, "path visibility toggled");
    }

    pub fn set_vertical_offset(&mut self, offset: f32) {
        self.session.vertical_offset = offset;
    }

    /// The corridor as it should be drawn right now.
    pub fn rendered_corridor(&self) -> Cow<'_, [Vec3]> {
        if !self.session.visible || self.session.selected_target.is_none() {
            return Cow::Borrowed(&[]);
        }
        apply_vertical_offset(&self.session.corridor, self.session.vertical_offset)
    }

    pub fn snapshot(&self) -> NavSnapshot {
        NavSnapshot {
            active_floor: self.session.active_floor,
            selected_target: self.session.selected_target.as_ref().map(|t| t.name.clone()),
            visible: self.session.visible,
            vertical_offset: self.session.vertical_offset,
            active_indicator: self.session.active_indicator,
            route: self.route,
            corridor: self.rendered_corridor().into_owned(),
        }
    }
}

impl FloorListener for NavRouter {
    fn change_active_floor(&mut self, floor: u32) {
        NavRouter::change_active_floor(self, floor);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
