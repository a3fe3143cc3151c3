//! Corner-path solver seam.

use wayfind_types::Vec3;

/// Computes the corner points of a walkable path across the navigable
/// surface.
pub trait PathSolver: Send {
    /// Ordered corners from `from` to `to`.
    ///
    /// An empty result means the target is unreachable.  A partial result
    /// (ending short of `to`) is returned as-is; callers must not synthesize
    /// the missing segment.
    fn compute_corners(&self, from: Vec3, to: Vec3) -> Vec<Vec3>;
}
