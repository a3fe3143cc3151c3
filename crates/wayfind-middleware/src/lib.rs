//! `wayfind-middleware` – notification plumbing.
//!
//! Carries the core's produced notifications ("session unlocked",
//! "recentered", floor and route changes) to UI and rendering consumers
//! without the core knowing who listens.
//!
//! # Modules
//!
//! - [`bus`] – Typed, topic-based publish/subscribe event bus built on Tokio
//!   broadcast channels.

pub mod bus;

pub use bus::{EventBus, Topic, TopicReceiver};
