//! `wayfind-perception` – Spatial re-anchoring.
//!
//! Ties what the camera sees to where the user is in the building.
//!
//! # Modules
//!
//! - [`target_registry`] – [`TargetRegistry`][target_registry::TargetRegistry]:
//!   the load-time catalog of surveyed targets (name, world pose, floor),
//!   looked up case-insensitively and shared read-only at runtime.
//! - [`marker_recenter`] – [`MarkerRecenter`][marker_recenter::MarkerRecenter]:
//!   turns a decoded marker identity into an AR frame reset at the matching
//!   target's pose and a floor change, behind the unlock, empty-payload, and
//!   one-step debounce guards.

pub mod marker_recenter;
pub mod target_registry;

pub use marker_recenter::{
    FloorListener, MarkerRecenter, RecenterConfig, RecenterOutcome, ScanDebounce,
};
pub use target_registry::TargetRegistry;
