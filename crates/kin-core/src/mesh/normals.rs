//! Normal calculation utilities for mesh data

use glam::DVec3;

/// Calculate normal for a single triangle (+Z for degenerate triangles)
pub fn calculate_triangle_normal(v0: DVec3, v1: DVec3, v2: DVec3) -> DVec3 {
    let cross = (v1 - v0).cross(v2 - v0);
    let len = cross.length();
    if len > 0.0 { cross / len } else { DVec3::Z }
}

/// Calculate face normals from vertices and triangles
pub fn calculate_face_normals(vertices: &[DVec3], triangles: &[[u32; 3]]) -> Vec<DVec3> {
    triangles
        .iter()
        .map(|&[a, b, c]| {
            calculate_triangle_normal(
                vertices[a as usize],
                vertices[b as usize],
                vertices[c as usize],
            )
        })
        .collect()
}
