//! Location permission and fix-source seams.

use wayfind_types::GeoPoint;

/// Reports and requests the platform's fine-location permission.
pub trait PermissionOracle: Send {
    /// `true` once the user has granted location access.
    fn has_location_permission(&self) -> bool;

    /// Ask the platform to prompt the user.  Fire-and-forget: the answer
    /// arrives asynchronously and is observed through
    /// [`has_location_permission`][Self::has_location_permission].
    fn request_location_permission(&mut self);
}

/// Lifecycle of the device location service after [`LocationSource::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationStatus {
    /// Warming up; no usable fix yet.
    Initializing,
    /// A fix is available through [`LocationSource::last_fix`].
    Running,
    /// The service could not produce a fix.
    Failed,
}

/// Best-effort geographic fix provider.
pub trait LocationSource: Send {
    /// `false` when the user has switched location services off in device
    /// settings.
    fn is_service_enabled(&self) -> bool;

    /// Begin acquiring fixes.
    fn start(&mut self);

    /// Stop acquiring fixes and release the underlying sensor.
    fn stop(&mut self);

    /// Current service status.
    fn status(&self) -> LocationStatus;

    /// Most recent fix.  Only meaningful while [`status`][Self::status] is
    /// [`LocationStatus::Running`].
    fn last_fix(&self) -> Option<GeoPoint>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource {
        started: bool,
    }

    impl LocationSource for FixedSource {
        fn is_service_enabled(&self) -> bool {
            true
        }

        fn start(&mut self) {
            self.started = true;
        }

        fn stop(&mut self) {
            self.started = false;
        }

        fn status(&self) -> LocationStatus {
            if self.started {
                LocationStatus::Running
            } else {
                LocationStatus::Initializing
            }
        }

        fn last_fix(&self) -> Option<GeoPoint> {
            self.started.then(|| GeoPoint::new(1.0, 2.0))
        }
    }

    #[test]
    fn fix_only_available_once_running() {
        let mut src = FixedSource { started: false };
        assert!(src.last_fix().is_none());
        src.start();
        assert_eq!(src.status(), LocationStatus::Running);
        assert_eq!(src.last_fix(), Some(GeoPoint::new(1.0, 2.0)));
    }
}
