//! Primitive mesh generation
//!
//! Generates vertices and triangles for basic shapes:
//! - Box (8 shared corners, 12 triangles)
//! - Cylinder (with end caps)
//! - Sphere (UV sphere)

use std::f64::consts::{PI, TAU};

use glam::DVec3;

use super::Mesh;
use crate::constants::{CYLINDER_SEGMENTS, SPHERE_LAT_SEGMENTS, SPHERE_LON_SEGMENTS};

/// Unit box centered at the origin
///
/// Triangles 2 and 3 form the +Z face, 4..=7 the -Y and +Y faces.
pub fn unit_box_mesh() -> Mesh {
    let h = 0.5;
    let vertices = vec![
        DVec3::new(-h, -h, -h),
        DVec3::new(h, -h, -h),
        DVec3::new(h, h, -h),
        DVec3::new(-h, h, -h),
        DVec3::new(-h, -h, h),
        DVec3::new(h, -h, h),
        DVec3::new(h, h, h),
        DVec3::new(-h, h, h),
    ];
    let triangles = vec![
        // -Z face (bottom)
        [0, 3, 2],
        [0, 2, 1],
        // +Z face (top)
        [4, 5, 6],
        [4, 6, 7],
        // -Y face
        [0, 1, 5],
        [0, 5, 4],
        // +Y face
        [3, 7, 6],
        [3, 6, 2],
        // -X face
        [0, 4, 7],
        [0, 7, 3],
        // +X face
        [1, 2, 6],
        [1, 6, 5],
    ];
    Mesh::new(vertices, triangles)
}

/// UV sphere of the given radius
pub fn sphere_mesh(radius: f64) -> Mesh {
    sphere_mesh_with_segments(radius, SPHERE_LAT_SEGMENTS, SPHERE_LON_SEGMENTS)
}

/// UV sphere with custom resolution
pub fn sphere_mesh_with_segments(radius: f64, lat_segments: u32, lon_segments: u32) -> Mesh {
    let mut vertices = Vec::new();
    let mut triangles = Vec::new();

    for lat in 0..=lat_segments {
        let theta = (lat as f64 / lat_segments as f64) * PI;
        for lon in 0..=lon_segments {
            let phi = (lon as f64 / lon_segments as f64) * TAU;
            vertices.push(radius * unit_direction(theta, phi));
        }
    }

    for lat in 0..lat_segments {
        for lon in 0..lon_segments {
            let current = lat * (lon_segments + 1) + lon;
            let next = current + lon_segments + 1;
            triangles.push([current, next, current + 1]);
            triangles.push([current + 1, next, next + 1]);
        }
    }

    Mesh::new(vertices, triangles)
}

/// Distinct points on the unit sphere: both poles plus `lat_segments - 1` rings
pub fn sphere_points(lat_segments: u32, lon_segments: u32) -> Vec<DVec3> {
    let mut points = vec![DVec3::Z, -DVec3::Z];
    for lat in 1..lat_segments {
        let theta = (lat as f64 / lat_segments as f64) * PI;
        for lon in 0..lon_segments {
            let phi = (lon as f64 / lon_segments as f64) * TAU;
            points.push(unit_direction(theta, phi));
        }
    }
    points
}

/// Z-aligned cylinder centered at the origin
pub fn cylinder_mesh(radius: f64, length: f64) -> Mesh {
    cylinder_mesh_with_segments(radius, length, CYLINDER_SEGMENTS)
}

/// Cylinder with custom segment count
pub fn cylinder_mesh_with_segments(radius: f64, length: f64, segments: u32) -> Mesh {
    let half_length = length / 2.0;
    let mut vertices = Vec::new();
    let mut triangles = Vec::new();

    // Rim vertices, bottom/top interleaved
    for i in 0..segments {
        let theta = (i as f64 / segments as f64) * TAU;
        let (s, c) = theta.sin_cos();
        vertices.push(DVec3::new(radius * c, radius * s, -half_length));
        vertices.push(DVec3::new(radius * c, radius * s, half_length));
    }

    // Side triangles
    for i in 0..segments {
        let base = i * 2;
        let next = ((i + 1) % segments) * 2;
        triangles.push([base, next, base + 1]);
        triangles.push([base + 1, next, next + 1]);
    }

    let top_center = vertices.len() as u32;
    vertices.push(DVec3::new(0.0, 0.0, half_length));
    let bottom_center = vertices.len() as u32;
    vertices.push(DVec3::new(0.0, 0.0, -half_length));

    // Caps (bottom reversed winding)
    for i in 0..segments {
        let base = i * 2;
        let next = ((i + 1) % segments) * 2;
        triangles.push([top_center, base + 1, next + 1]);
        triangles.push([bottom_center, next, base]);
    }

    Mesh::new(vertices, triangles)
}

fn unit_direction(theta: f64, phi: f64) -> DVec3 {
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    DVec3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta)
}
