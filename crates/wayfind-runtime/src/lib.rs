//! `wayfind-runtime` – the session engine.
//!
//! Ties the access gate, marker recenter and navigation router into one
//! tick-driven session that a UI (or the `wayfind` CLI) can drive.
//!
//! # Modules
//!
//! - [`nav_router`] – [`NavRouter`]: per-floor destination options, the
//!   selected target, and the live path corridor with its vertical display
//!   offset.
//! - [`session`] – [`WayfindSession`]: owns the gate, recenter and router,
//!   forwards camera frames and user actions, and reports which panel the UI
//!   should show.
//! - [`telemetry`] – [`init_tracing`]: console logging plus optional OTLP
//!   span export.

pub mod nav_router;
pub mod session;
pub mod telemetry;

pub use nav_router::{
    FloorCatalog, IndicatorHandle, NavRouter, NavSession, NavSnapshot, RouteStatus,
    apply_vertical_offset,
};
pub use session::{Collaborators, SessionConfig, Surface, WayfindSession};
pub use telemetry::{LogFormat, TracerProviderGuard, init_tracing};
