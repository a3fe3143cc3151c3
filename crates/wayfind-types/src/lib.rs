//! `wayfind-types` – shared vocabulary for the Wayfind workspace.
//!
//! Geographic fixes, the AR-space geometry primitives, navigation targets,
//! the notification envelope routed over the event bus, and the single error
//! taxonomy every component converts its faults into.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ────────────────────────────────────────────────────────────────────────────
// Geographic primitives
// ────────────────────────────────────────────────────────────────────────────

/// A single WGS-84 position reading, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Circular eligibility region: a center and an allowed radius in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFenceConfig {
    pub center: GeoPoint,
    pub radius_meters: f64,
}

impl Default for GeoFenceConfig {
    /// The reference campus fence: 100 m around the main building.
    fn default() -> Self {
        Self {
            center: GeoPoint::new(7.28108739005917, 80.62005485982979),
            radius_meters: 100.0,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// AR-space geometry
// ────────────────────────────────────────────────────────────────────────────

/// A point or displacement in the AR world frame. `y` is the vertical axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    /// Shift the point along the vertical axis only.
    pub fn raised(self, dy: f32) -> Self {
        Self::new(self.x, self.y + dy, self.z)
    }
}

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion (|q| = 1).
    pub fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    /// The identity rotation (no rotation).
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `degrees` about the vertical (y) axis.
    pub fn from_yaw_degrees(degrees: f32) -> Self {
        let half = degrees.to_radians() / 2.0;
        Self::new(half.cos(), 0.0, half.sin(), 0.0)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// World pose of a surveyed location: where the AR origin goes on recenter.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Quaternion,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quaternion) -> Self {
        Self { position, rotation }
    }
}

/// A named, surveyed location in the building.
///
/// `name` is the case-insensitive key shared by marker payloads and the
/// destination catalog. `floor` is 1-based (1 = ground floor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub pose: Pose,
    pub floor: u32,
}

impl Target {
    pub fn new(name: impl Into<String>, pose: Pose, floor: u32) -> Self {
        Self {
            name: name.into(),
            pose,
            floor,
        }
    }

    /// Case-insensitive name comparison.
    pub fn matches(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Notifications
// ────────────────────────────────────────────────────────────────────────────

/// Unified notification envelope for the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "wayfind-kernel::access_gate"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Stamp a new event with a fresh id and the current time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Notifications produced by the core for UI and rendering consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// The access state changed; `status` is the human-readable message.
    AccessChanged { status: String },
    /// Emitted once when the geofence check first passes.
    SessionUnlocked,
    /// The AR frame was re-anchored to a surveyed target.
    Recentered { target: String, floor: u32 },
    /// The router switched floors and rebuilt its destination catalog.
    FloorChanged { floor: u32 },
    /// The path solver returned no corridor to the selected destination.
    RouteUnavailable { target: String },
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// Every fault the core can observe.  None of these are fatal: components
/// fold them into state plus a status message.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WayfindError {
    #[error("Location permission has not been granted.")]
    PermissionDenied,

    #[error("Location services are disabled on this device.")]
    LocationServiceDisabled,

    #[error("Failed to determine location: timed out waiting for a fix.")]
    FixTimeout,

    #[error("Failed to determine device location.")]
    FixFailed,

    #[error("Sorry, wayfinding is not available at your current location.")]
    OutOfRange,

    #[error("Unrecognised marker '{0}'.")]
    UnknownMarker(String),

    #[error("No path to '{0}' from here.")]
    UnreachableTarget(String),

    #[error("Unknown destination '{0}'.")]
    UnknownDestination(String),

    #[error("Invalid target '{name}': {details}")]
    InvalidTarget { name: String, details: String },

    #[error("Collaborator fault on {component}: {details}")]
    Collaborator { component: String, details: String },
}
