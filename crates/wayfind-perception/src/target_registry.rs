//! [`TargetRegistry`] – catalog of surveyed targets.
//!
//! Built once from configuration.  Names are unique ignoring case, floors
//! are 1-based.  After construction the registry is typically wrapped in an
//! `Arc` and read concurrently by the recenter and routing components.
//!
//! # Example
//!
//! ```
//! use wayfind_perception::target_registry::TargetRegistry;
//! use wayfind_types::{Pose, Target};
//!
//! let registry = TargetRegistry::new(vec![
//!     Target::new("Library", Pose::default(), 1),
//!     Target::new("ITLab1", Pose::default(), 2),
//! ])
//! .unwrap();
//!
//! assert_eq!(registry.find("library").unwrap().floor, 1);
//! assert!(registry.find("Cafeteria").is_none());
//! ```

use std::collections::HashMap;

use wayfind_types::{Target, WayfindError};

fn key(name: &str) -> String {
    name.to_lowercase()
}

/// Append-only, case-insensitive catalog of [`Target`]s.
#[derive(Debug, Default, Clone)]
pub struct TargetRegistry {
    targets: Vec<Target>,
    by_name: HashMap<String, usize>,
}

impl TargetRegistry {
    /// Build a registry, validating every target.
    ///
    /// # Errors
    ///
    /// [`WayfindError::InvalidTarget`] for an empty name, a floor of 0, or a
    /// name that collides (ignoring case) with an earlier target.
    pub fn new(targets: Vec<Target>) -> Result<Self, WayfindError> {
        let mut registry = Self::default();
        for target in targets {
            registry.push(target)?;
        }
        Ok(registry)
    }

    /// Append one target.
    ///
    /// # Errors
    ///
    /// Same validation as [`new`][Self::new].
    pub fn push(&mut self, target: Target) -> Result<(), WayfindError> {
        let invalid = |details: &str| WayfindError::InvalidTarget {
            name: target.name.clone(),
            details: details.to_string(),
        };
        if target.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if target.floor == 0 {
            return Err(invalid("floor numbers start at 1"));
        }
        let k = key(&target.name);
        if self.by_name.contains_key(&k) {
            return Err(invalid("duplicate name (names are case-insensitive)"));
        }
        self.by_name.insert(k, self.targets.len());
        self.targets.push(target);
        Ok(())
    }

    /// Case-insensitive lookup.
    pub fn find(&self, name: &str) -> Option<&Target> {
        self.by_name.get(&key(name)).map(|&i| &self.targets[i])
    }

    /// Targets on `floor`, in registration order.
    pub fn on_floor(&self, floor: u32) -> impl Iterator<Item = &Target> {
        self.targets.iter().filter(move |t| t.floor == floor)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfind_types::{Pose, Vec3};

    fn target(name: &str, floor: u32) -> Target {
        Target::new(name, Pose::default(), floor)
    }

    #[test]
    fn lookup_ignores_case() {
        let registry = TargetRegistry::new(vec![target("MeetingRoom", 1)]).unwrap();
        assert!(registry.find("meetingroom").is_some());
        assert!(registry.find("MEETINGROOM").is_some());
        assert!(registry.find("meeting room").is_none());
    }

    #[test]
    fn duplicate_names_are_rejected_ignoring_case() {
        let err = TargetRegistry::new(vec![target("Library", 1), target("LIBRARY", 2)])
            .unwrap_err();
        assert!(matches!(err, WayfindError::InvalidTarget { .. }));
    }

    #[test]
    fn floor_zero_and_empty_name_are_rejected() {
        assert!(TargetRegistry::new(vec![target("Lobby", 0)]).is_err());
        assert!(TargetRegistry::new(vec![target("  ", 1)]).is_err());
    }

    #[test]
    fn on_floor_keeps_registration_order() {
        let registry = TargetRegistry::new(vec![
            target("WashRoom", 1),
            target("ITLab1", 2),
            target("Reception", 1),
        ])
        .unwrap();
        let names: Vec<&str> = registry.on_floor(1).map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["WashRoom", "Reception"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn find_returns_registered_pose() {
        let mut registry = TargetRegistry::default();
        assert!(registry.is_empty());
        registry
            .push(Target::new(
                "Staircase",
                Pose {
                    position: Vec3::new(4.0, 0.0, -2.0),
                    ..Pose::default()
                },
                1,
            ))
            .unwrap();
        assert_eq!(
            registry.find("staircase").unwrap().pose.position,
            Vec3::new(4.0, 0.0, -2.0)
        );
    }
}
