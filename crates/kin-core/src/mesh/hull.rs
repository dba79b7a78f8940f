//! Convex hulls through parry

use glam::DVec3;
use parry3d_f64::math::Point;
use parry3d_f64::transformation::try_convex_hull;
use tracing::warn;

/// Convex hull of `points` as (vertices, outward-wound triangles)
///
/// Inputs parry cannot hull keep their points and get no triangles.
pub(crate) fn convex_hull(points: &[DVec3]) -> (Vec<DVec3>, Vec<[u32; 3]>) {
    if points.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let input: Vec<Point<f64>> = points.iter().map(|p| Point::new(p.x, p.y, p.z)).collect();
    match try_convex_hull(&input) {
        Ok((vertices, triangles)) => (
            vertices.iter().map(|p| DVec3::new(p.x, p.y, p.z)).collect(),
            triangles,
        ),
        Err(err) => {
            warn!("Convex hull of {} points failed: {:?}", points.len(), err);
            (points.to_vec(), Vec::new())
        }
    }
}
