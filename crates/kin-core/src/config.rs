//! Typed model configuration
//!
//! One entry per frame, with optional joint, shape and inertia sections.
//! Field names follow the model file keys (`X`, `Q`, `ctrl_H`, `BinvA`, ...);
//! the legacy aliases `pose`, `from` and `to` are accepted as well.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::KinError;
use crate::shape::ShapeType;
use crate::world::JointType;

/// Whole-model configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub frames: Vec<FrameConfig>,
}

/// Frame entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    pub name: String,
    /// Name of the parent frame
    pub parent: Option<String>,
    /// Absolute pose (roots only; child poses follow from `Q`)
    #[serde(rename = "X", alias = "pose")]
    pub pose: Option<Vec<f64>>,
    /// Relative transform to the parent
    #[serde(rename = "Q")]
    pub rel: Option<Vec<f64>>,
    /// Creates an inertia with tensor `0.2 * mass * I`
    pub mass: Option<f64>,
    pub active: bool,
    pub joint: Option<JointConfig>,
    pub shape: Option<ShapeConfig>,
    pub inertia: Option<InertiaConfig>,
    pub attributes: BTreeMap<String, String>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            parent: None,
            pose: None,
            rel: None,
            mass: None,
            active: true,
            joint: None,
            shape: None,
            inertia: None,
            attributes: BTreeMap::new(),
        }
    }
}

/// Enumeration value given by numeric code or by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSpec {
    Index(i64),
    Name(String),
}

impl TypeSpec {
    pub fn joint_type(&self) -> Result<JointType, KinError> {
        match self {
            TypeSpec::Index(i) => JointType::from_index(*i),
            TypeSpec::Name(name) => name.parse(),
        }
    }

    pub fn shape_type(&self) -> Result<ShapeType, KinError> {
        match self {
            TypeSpec::Index(i) => ShapeType::from_index(*i),
            TypeSpec::Name(name) => name.parse(),
        }
    }
}

/// Initial joint coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QSpec {
    /// Fills every coordinate; for 0-dim joints, a rotation angle about X
    Scalar(f64),
    Vector(Vec<f64>),
}

/// Joint section of a frame entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointConfig {
    /// Defaults to `hingeX`
    #[serde(rename = "type")]
    pub joint_type: Option<TypeSpec>,
    /// Fixed prefix of the edge, spliced in as a separate frame
    #[serde(rename = "A", alias = "from")]
    pub a: Option<Vec<f64>>,
    /// Fixed suffix of the edge, moved onto the unique child
    #[serde(rename = "B", alias = "to")]
    pub b: Option<Vec<f64>>,
    /// Use `A⁻¹` as the suffix
    #[serde(rename = "BinvA")]
    pub b_inv_a: bool,
    /// Joint axis; X is rotated onto it through `A` and `B`
    pub axis: Option<Vec<f64>>,
    #[serde(rename = "Q")]
    pub rel: Option<Vec<f64>>,
    pub q: Option<QSpec>,
    #[serde(rename = "ctrl_H")]
    pub ctrl_h: Option<f64>,
    pub limits: Option<Vec<f64>>,
    pub ctrl_limits: Option<Vec<f64>>,
    /// Name of the frame whose joint is mimicked
    pub mimic: Option<String>,
    pub inactive: bool,
    pub uncertainty: Option<Vec<f64>>,
}

/// Shape section of a frame entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    #[serde(rename = "type")]
    pub shape_type: Option<TypeSpec>,
    /// Overrides the leading entries of the default `[1, 1, 1, 0.1]`
    pub size: Option<Vec<f64>>,
    pub color: Option<Vec<f64>>,
    /// Mesh file, relative paths resolve against the model file directory
    pub mesh: Option<PathBuf>,
    pub meshscale: Option<f64>,
    pub contact: bool,
    #[serde(rename = "coloredBox")]
    pub colored_box: bool,
    /// Move the loaded mesh's vertex mean to the frame origin
    #[serde(rename = "rel_includes_mesh_center")]
    pub center_mesh: bool,
}

/// Dynamics classification flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InertiaConfig {
    pub fixed: bool,
    #[serde(rename = "static")]
    pub is_static: bool,
    pub kinematic: bool,
    pub dyntype: Option<i64>,
}

impl ModelConfig {
    /// Parse RON text; optional fields may be written without `Some(..)`
    pub fn from_ron_str(content: &str) -> Result<Self, KinError> {
        ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .from_str(content)
            .map_err(|e| KinError::Config(e.to_string()))
    }

    pub fn from_json_str(content: &str) -> Result<Self, KinError> {
        serde_json::from_str(content).map_err(|e| KinError::Config(e.to_string()))
    }

    /// Load from a `.json` or RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KinError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| KinError::Config(format!("{}: {}", path.display(), e)))?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_ron_str(&content),
        }
    }

    pub fn to_ron_string(&self) -> Result<String, KinError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| KinError::Config(e.to_string()))
    }

    /// Save as RON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), KinError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_ron_string()?)
            .map_err(|e| KinError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn frame(&self, name: &str) -> Option<&FrameConfig> {
        self.frames.iter().find(|f| f.name == name)
    }
}
