//! Triangle meshes attached to shapes
//!
//! Provides the mesh container plus the procedural constructions shapes need:
//! primitive boxes, spheres and cylinders, convex hulls, and sphere-swept
//! ("rounded") convex meshes built from an inner convex core.

mod hull;
mod io;
mod normals;
mod primitive;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::constants::{SWEEP_LAT_SEGMENTS, SWEEP_LON_SEGMENTS};

pub use io::{MeshError, MeshFormat, load_mesh, load_obj, load_stl, save_stl};
pub use normals::{calculate_face_normals, calculate_triangle_normal};
pub use primitive::{cylinder_mesh, sphere_mesh, sphere_points, unit_box_mesh};

/// Indexed triangle mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<DVec3>,
    pub triangles: Vec<[u32; 3]>,
    /// Face normals, one per triangle (empty until computed)
    pub normals: Vec<DVec3>,
    /// RGB colors: a single entry colors the whole mesh, otherwise one per triangle
    pub colors: Vec<[f64; 3]>,
}

impl Mesh {
    pub fn new(vertices: Vec<DVec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
            normals: Vec::new(),
            colors: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Replace geometry with the 8-vertex unit box centered at the origin
    pub fn set_box(&mut self) {
        self.set_geometry(unit_box_mesh());
    }

    /// Replace geometry with a unit-radius UV sphere
    pub fn set_sphere(&mut self) {
        self.set_geometry(sphere_mesh(1.0));
    }

    /// Replace geometry with a Z-aligned cylinder
    pub fn set_cylinder(&mut self, radius: f64, height: f64) {
        self.set_geometry(cylinder_mesh(radius, height));
    }

    /// Replace geometry with `core` swept by a sphere of `radius`
    pub fn set_ss_cvx(&mut self, core: &Mesh, radius: f64) {
        let sphere = sphere_points(SWEEP_LAT_SEGMENTS, SWEEP_LON_SEGMENTS);
        let mut points = Vec::with_capacity(core.vertices.len() * sphere.len());
        for v in &core.vertices {
            points.extend(sphere.iter().map(|s| *v + *s * radius));
        }
        let (vertices, triangles) = hull::convex_hull(&points);
        self.set_geometry(Mesh::new(vertices, triangles));
    }

    /// Replace geometry with a box of outer extents `size` whose edges are rounded by `radius`
    pub fn set_ss_box(&mut self, size: DVec3, radius: f64) {
        let mut core = unit_box_mesh();
        core.scale(size - DVec3::splat(2.0 * radius));
        self.set_ss_cvx(&core, radius);
    }

    /// Convex hull of the vertices (no triangles when parry cannot hull them)
    pub fn convex_hull(&self) -> Mesh {
        let (vertices, triangles) = hull::convex_hull(&self.vertices);
        let mut mesh = Mesh::new(vertices, triangles);
        mesh.colors = self.colors.iter().take(1).copied().collect();
        mesh.compute_normals();
        mesh
    }

    pub fn scale(&mut self, factors: DVec3) {
        for v in &mut self.vertices {
            *v *= factors;
        }
        self.compute_normals();
    }

    pub fn scale_uniform(&mut self, factor: f64) {
        self.scale(DVec3::splat(factor));
    }

    pub fn translate(&mut self, offset: DVec3) {
        for v in &mut self.vertices {
            *v += offset;
        }
    }

    /// Mean of the vertices
    pub fn centroid(&self) -> DVec3 {
        if self.vertices.is_empty() {
            return DVec3::ZERO;
        }
        self.vertices.iter().copied().sum::<DVec3>() / self.vertices.len() as f64
    }

    /// Move the vertex mean to the origin, returning the applied offset
    pub fn center(&mut self) -> DVec3 {
        let c = self.centroid();
        self.translate(-c);
        c
    }

    /// Largest vertex distance from the origin
    pub fn radius(&self) -> f64 {
        self.vertices
            .iter()
            .map(|v| v.length())
            .fold(0.0, f64::max)
    }

    /// Axis-aligned bounds as (min, max)
    pub fn bounding_box(&self) -> Option<(DVec3, DVec3)> {
        let first = *self.vertices.first()?;
        Some(
            self.vertices
                .iter()
                .fold((first, first), |(lo, hi), v| (lo.min(*v), hi.max(*v))),
        )
    }

    pub fn compute_normals(&mut self) {
        self.normals = calculate_face_normals(&self.vertices, &self.triangles);
    }

    fn set_geometry(&mut self, mut other: Mesh) {
        other.compute_normals();
        self.vertices = other.vertices;
        self.triangles = other.triangles;
        self.normals = other.normals;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extents(mesh: &Mesh) -> DVec3 {
        let (lo, hi) = mesh.bounding_box().unwrap();
        hi - lo
    }

    #[test]
    fn test_box_scaled_extents() {
        let mut mesh = Mesh::default();
        mesh.set_box();
        mesh.scale(DVec3::new(2.0, 4.0, 6.0));
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.triangles.len(), 12);
        assert!(extents(&mesh).abs_diff_eq(DVec3::new(2.0, 4.0, 6.0), 1e-12));
    }

    #[test]
    fn test_sphere_radius() {
        let mut mesh = Mesh::default();
        mesh.set_sphere();
        mesh.scale_uniform(0.3);
        assert!((mesh.radius() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_box_hull_keeps_corners() {
        let mut mesh = Mesh::default();
        mesh.set_box();
        let hull = mesh.convex_hull();
        assert_eq!(hull.vertices.len(), 8);
        assert_eq!(hull.triangles.len(), 12);
    }

    #[test]
    fn test_ss_cvx_grows_by_radius() {
        let mut core = Mesh::default();
        core.set_box();
        let mut rounded = Mesh::default();
        rounded.set_ss_cvx(&core, 0.25);
        let e = extents(&rounded);
        assert!(e.abs_diff_eq(DVec3::splat(1.5), 1e-9));
        assert_eq!(rounded.normals.len(), rounded.triangles.len());
    }

    #[test]
    fn test_ss_box_outer_extents() {
        let mut mesh = Mesh::default();
        mesh.set_ss_box(DVec3::new(1.0, 2.0, 3.0), 0.1);
        assert!(extents(&mesh).abs_diff_eq(DVec3::new(1.0, 2.0, 3.0), 1e-9));
    }

    #[test]
    fn test_center_moves_mean_to_origin() {
        let mut mesh = Mesh::default();
        mesh.set_box();
        mesh.translate(DVec3::new(1.0, 2.0, 3.0));
        let offset = mesh.center();
        assert!(offset.abs_diff_eq(DVec3::new(1.0, 2.0, 3.0), 1e-12));
        assert!(mesh.centroid().abs_diff_eq(DVec3::ZERO, 1e-12));
    }
}
