//! Frame transforms between world and vehicle coordinates
//!
//! The vehicle frame has its origin at the vehicle position, x pointing
//! along the heading and y to the left.

use crate::common::{MpcResult, Path2D, Point2D, Pose2D};

/// Express a world-frame point in the vehicle frame of `pose`.
pub fn to_vehicle_frame(pose: &Pose2D, point: Point2D) -> Point2D {
    let (sin_psi, cos_psi) = pose.psi.sin_cos();
    let dx = point.x - pose.x;
    let dy = point.y - pose.y;
    Point2D::new(cos_psi * dx + sin_psi * dy, cos_psi * dy - sin_psi * dx)
}

/// Inverse of [`to_vehicle_frame`].
pub fn to_world_frame(pose: &Pose2D, point: Point2D) -> Point2D {
    let (sin_psi, cos_psi) = pose.psi.sin_cos();
    Point2D::new(
        pose.x + cos_psi * point.x - sin_psi * point.y,
        pose.y + sin_psi * point.x + cos_psi * point.y,
    )
}

/// Transform world-frame waypoint lists into vehicle-frame points.
///
/// Fails with `InvalidInput` when the lists differ in length.
pub fn world_to_vehicle(pose: &Pose2D, xs: &[f64], ys: &[f64]) -> MpcResult<Path2D> {
    let world = Path2D::from_xy(xs, ys)?;
    Ok(Path2D::from_points(
        world.points.into_iter().map(|p| to_vehicle_frame(pose, p)).collect(),
    ))
}

/// Transform vehicle-frame points back into the world frame.
pub fn vehicle_to_world(pose: &Pose2D, path: &Path2D) -> Path2D {
    Path2D::from_points(path.points.iter().map(|&p| to_world_frame(pose, p)).collect())
}
