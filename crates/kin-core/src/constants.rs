//! Global constants for kin-core

/// Default number of segments for cylinder mesh generation
pub const CYLINDER_SEGMENTS: u32 = 32;

/// Default number of latitude segments for sphere mesh generation
pub const SPHERE_LAT_SEGMENTS: u32 = 16;

/// Default number of longitude segments for sphere mesh generation
pub const SPHERE_LON_SEGMENTS: u32 = 32;

/// Latitude segments of the sphere swept over a convex core
pub const SWEEP_LAT_SEGMENTS: u32 = 6;

/// Longitude segments of the sphere swept over a convex core
pub const SWEEP_LON_SEGMENTS: u32 = 12;

/// Default shape size: box extents in slots 0..3, radius in slot 3
pub const DEFAULT_SHAPE_SIZE: [f64; 4] = [1.0, 1.0, 1.0, 0.1];

/// Default shape color (RGB)
pub const DEFAULT_SHAPE_COLOR: [f64; 3] = [0.8, 0.8, 0.8];

/// Smallest radius accepted for cylinders, capsules and rounded shapes
pub const MIN_SHAPE_RADIUS: f64 = 1e-10;

/// Squared quaternion norms outside [min, max] are reported before renormalizing
pub const QUAT_NORM_MIN: f64 = 0.5;
pub const QUAT_NORM_MAX: f64 = 2.0;

/// Below this |w| the universal joint inverse falls back to (pi, pi)
pub const UNIVERSAL_W_EPSILON: f64 = 1e-15;

/// Tolerance for identity checks on fixed prefix/suffix transforms
pub const TRANSFORM_EPSILON: f64 = 1e-12;
