//! `wayfind-hal` – device and engine seams.
//!
//! The core never touches platform APIs directly.  Everything it consumes
//! from the device or the AR engine goes through one of these traits, so the
//! decision logic can be driven by a real host, by the simulated drivers in
//! [`sim`], or by test doubles.
//!
//! # Modules
//!
//! - [`location`] – [`PermissionOracle`] and [`LocationSource`]: permission
//!   state and best-effort geographic fixes.
//! - [`camera`] – [`CameraFrame`] and [`MarkerDecoder`]: the opaque
//!   `decode(frame) -> Option<String>` primitive.
//! - [`ar_frame`] – [`ArFrame`]: reset and re-origin the AR coordinate frame.
//! - [`path_solver`] – [`PathSolver`]: corner path between two points on the
//!   navigable surface.
//! - [`sim`] – in-process stand-ins for all of the above.

pub mod ar_frame;
pub mod camera;
pub mod location;
pub mod path_solver;
pub mod sim;

pub use ar_frame::ArFrame;
pub use camera::{CameraFrame, MarkerDecoder};
pub use location::{LocationSource, LocationStatus, PermissionOracle};
pub use path_solver::PathSolver;
