//! `wayfind-kernel` – Eligibility gating
//!
//! Decides whether the user is physically allowed to start a wayfinding
//! session.  Nothing downstream (scanning, recentering, routing) runs until
//! the gate reports unlocked.
//!
//! # Modules
//!
//! - [`geofence`] – [`is_within`][geofence::is_within]: pure haversine
//!   distance check of a fix against a circular fence.
//! - [`access_gate`] – [`AccessGate`][access_gate::AccessGate]: the
//!   permission → polling → unlocked/denied/error state machine, driven by
//!   explicit ticks, that publishes the one-time "session unlocked"
//!   notification and exposes the shared [`UnlockSignal`].

pub mod access_gate;
pub mod geofence;

pub use access_gate::{AccessGate, AccessGateConfig, AccessState, UnlockSignal};
pub use geofence::{distance_meters, is_within};
