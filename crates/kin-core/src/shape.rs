//! Geometric attachments of frames

use std::fmt;
use std::str::FromStr;

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_SHAPE_COLOR, DEFAULT_SHAPE_SIZE, MIN_SHAPE_RADIUS};
use crate::error::KinError;
use crate::mesh::Mesh;

/// Shape type
///
/// The numeric codes used by model files are available through
/// [`ShapeType::from_index`] and [`ShapeType::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ShapeType {
    #[default]
    None,
    Box,
    Sphere,
    Capsule,
    Mesh,
    Cylinder,
    Marker,
    /// Rounded box of the legacy format, no longer constructed
    RetiredSsBox,
    PointCloud,
    /// Convex mesh core swept by a sphere
    SsCvx,
    /// Box with rounded edges
    SsBox,
}

impl ShapeType {
    pub const ALL: &'static [ShapeType] = &[
        ShapeType::None,
        ShapeType::Box,
        ShapeType::Sphere,
        ShapeType::Capsule,
        ShapeType::Mesh,
        ShapeType::Cylinder,
        ShapeType::Marker,
        ShapeType::RetiredSsBox,
        ShapeType::PointCloud,
        ShapeType::SsCvx,
        ShapeType::SsBox,
    ];

    pub fn from_index(index: i64) -> Result<Self, KinError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.index() == index)
            .ok_or_else(|| KinError::UnknownShapeType(index.to_string()))
    }

    pub fn index(&self) -> i64 {
        match self {
            ShapeType::None => -1,
            ShapeType::Box => 0,
            ShapeType::Sphere => 1,
            ShapeType::Capsule => 2,
            ShapeType::Mesh => 3,
            ShapeType::Cylinder => 4,
            ShapeType::Marker => 5,
            ShapeType::RetiredSsBox => 6,
            ShapeType::PointCloud => 7,
            ShapeType::SsCvx => 8,
            ShapeType::SsBox => 9,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShapeType::None => "none",
            ShapeType::Box => "box",
            ShapeType::Sphere => "sphere",
            ShapeType::Capsule => "capsule",
            ShapeType::Mesh => "mesh",
            ShapeType::Cylinder => "cylinder",
            ShapeType::Marker => "marker",
            ShapeType::RetiredSsBox => "SSBox",
            ShapeType::PointCloud => "pointCloud",
            ShapeType::SsCvx => "ssCvx",
            ShapeType::SsBox => "ssBox",
        }
    }
}

impl fmt::Display for ShapeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShapeType {
    type Err = KinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| KinError::UnknownShapeType(s.to_string()))
    }
}

/// Geometry attached to a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub shape_type: ShapeType,
    /// Box extents in slots 0..3, radius in slot 3
    pub size: [f64; 4],
    /// Render/collision mesh
    pub mesh: Mesh,
    /// Inner convex core of rounded shapes and meshes
    pub core: Mesh,
    /// Participates in collision queries
    pub contact: bool,
    pub alpha: f64,
    mesh_radius: Option<f64>,
}

impl Default for Shape {
    fn default() -> Self {
        let mut mesh = Mesh::default();
        mesh.colors.push(DEFAULT_SHAPE_COLOR);
        Self {
            shape_type: ShapeType::None,
            size: DEFAULT_SHAPE_SIZE,
            mesh,
            core: Mesh::default(),
            contact: false,
            alpha: 1.0,
            mesh_radius: None,
        }
    }
}

impl Shape {
    pub fn new(shape_type: ShapeType) -> Self {
        Self {
            shape_type,
            ..Self::default()
        }
    }

    pub fn with_size(shape_type: ShapeType, size: [f64; 4]) -> Self {
        Self {
            shape_type,
            size,
            ..Self::default()
        }
    }

    /// Bounding radius of the mesh; `None` until the mesh has vertices
    pub fn mesh_radius(&self) -> Option<f64> {
        self.mesh_radius
    }

    pub fn radius(&self) -> f64 {
        self.size[3]
    }

    pub fn extents(&self) -> DVec3 {
        DVec3::new(self.size[0], self.size[1], self.size[2])
    }

    /// Set RGB or RGBA color
    pub fn set_color(&mut self, color: &[f64]) -> Result<(), KinError> {
        match *color {
            [r, g, b] => {
                self.mesh.colors = vec![[r, g, b]];
                self.alpha = 1.0;
            }
            [r, g, b, a] => {
                self.mesh.colors = vec![[r, g, b]];
                self.alpha = a;
            }
            _ => {
                return Err(KinError::Config(format!(
                    "color needs 3 or 4 components, got {}",
                    color.len()
                )));
            }
        }
        Ok(())
    }

    /// Generate mesh and core from the shape type and size
    ///
    /// Mesh-based types (`Mesh`, `PointCloud`, `SsCvx`) require vertices to be
    /// loaded into `mesh` first. `frame` names the owner in error messages.
    pub fn build(&mut self, frame: &str) -> Result<(), KinError> {
        let radius = self.radius();
        match self.shape_type {
            ShapeType::None => {
                return Err(KinError::UnknownShapeType(format!(
                    "shape of '{frame}' has no type"
                )));
            }
            ShapeType::Box => {
                self.mesh.set_box();
                self.mesh.scale(self.extents());
            }
            ShapeType::Sphere => {
                self.mesh.set_sphere();
                self.mesh.scale_uniform(radius);
            }
            ShapeType::Cylinder => {
                self.require_radius(frame)?;
                self.mesh.set_cylinder(radius, self.size[2]);
            }
            ShapeType::Capsule => {
                self.require_radius(frame)?;
                self.core.set_box();
                self.core.scale(DVec3::new(0.0, 0.0, self.size[2]));
                self.mesh.set_ss_cvx(&self.core, radius);
            }
            ShapeType::RetiredSsBox => {
                return Err(KinError::NotImplemented("retired SSBox shape type"));
            }
            ShapeType::Marker => {}
            ShapeType::Mesh | ShapeType::PointCloud => {
                self.require_mesh(frame)?;
                self.core = self.mesh.convex_hull();
            }
            ShapeType::SsCvx => {
                self.require_radius(frame)?;
                self.require_mesh(frame)?;
                self.core = self.mesh.clone();
                self.mesh.set_ss_cvx(&self.core, radius);
            }
            ShapeType::SsBox => {
                self.require_radius(frame)?;
                self.core.set_box();
                self.core.scale(self.extents() - DVec3::splat(2.0 * radius));
                self.mesh.set_ss_box(self.extents(), radius);
            }
        }
        self.update_mesh_radius();
        Ok(())
    }

    /// Color the faces of an 8-vertex box: top in the shape color, Y sides white, rest grey
    pub fn color_box(&mut self, frame: &str) -> Result<(), KinError> {
        if self.mesh.vertices.len() != 8 {
            return Err(KinError::InvalidSize {
                frame: frame.to_string(),
                reason: format!(
                    "colored box needs an 8-vertex box mesh, got {} vertices",
                    self.mesh.vertices.len()
                ),
            });
        }
        let base = self
            .mesh
            .colors
            .first()
            .copied()
            .unwrap_or(DEFAULT_SHAPE_COLOR);
        self.mesh.colors = (0..self.mesh.triangles.len())
            .map(|i| match i {
                2 | 3 => base,
                4..=7 => [1.0; 3],
                _ => [0.5; 3],
            })
            .collect();
        Ok(())
    }

    pub(crate) fn update_mesh_radius(&mut self) {
        self.mesh_radius = (!self.mesh.is_empty()).then(|| self.mesh.radius());
    }

    fn require_radius(&self, frame: &str) -> Result<(), KinError> {
        if self.radius() > MIN_SHAPE_RADIUS {
            Ok(())
        } else {
            Err(KinError::InvalidSize {
                frame: frame.to_string(),
                reason: format!("{} needs a positive radius in size[3]", self.shape_type),
            })
        }
    }

    fn require_mesh(&self, frame: &str) -> Result<(), KinError> {
        if self.mesh.is_empty() {
            Err(KinError::MeshRequired(frame.to_string()))
        } else {
            Ok(())
        }
    }
}
