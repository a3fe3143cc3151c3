//! AR session control: the frame the corridor is drawn in.

use wayfind_types::{Quaternion, Vec3, WayfindError};

/// Control surface of the AR engine's tracking session.
pub trait ArFrame: Send {
    /// Discard accumulated tracking state and restart the session.
    ///
    /// # Errors
    ///
    /// Returns [`WayfindError::Collaborator`] if the engine refuses the reset.
    fn reset(&mut self) -> Result<(), WayfindError>;

    /// Place the session origin at a surveyed world pose.
    ///
    /// # Errors
    ///
    /// Returns [`WayfindError::Collaborator`] if the origin cannot be moved.
    fn set_origin(&mut self, position: Vec3, rotation: Quaternion) -> Result<(), WayfindError>;
}
