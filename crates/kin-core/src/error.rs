//! Error types for the kinematic model

use crate::mesh::MeshError;
use crate::world::{FrameId, JointType};

/// Errors raised by structural edits, joint calculus and model loading.
///
/// Every variant corresponds to a programming or malformed-input error with
/// no safe local recovery; callers are expected to surface it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KinError {
    #[error("Frame not found: {0}")]
    FrameNotFound(String),

    #[error("Frame '{name}' ({id}) has no parent")]
    NoParent { id: FrameId, name: String },

    #[error("Frame '{name}' ({id}) already has a parent")]
    AlreadyHasParent { id: FrameId, name: String },

    #[error("Linking '{child}' below '{parent}' would create a cycle")]
    WouldCreateCycle { parent: String, child: String },

    #[error("Frame '{0}' already has a joint")]
    JointExists(String),

    #[error("Frame '{0}' already has a shape")]
    ShapeExists(String),

    #[error("Frame '{0}' already has inertia")]
    InertiaExists(String),

    #[error("Frame '{0}' has no joint")]
    NoJoint(String),

    #[error("Joint '{frame}': limits have wrong dimension (expected {expected}, got {actual})")]
    LimitsDimension {
        frame: String,
        expected: usize,
        actual: usize,
    },

    #[error("Joint '{frame}': q has wrong dimension (expected {expected}, got {actual})")]
    QDimension {
        frame: String,
        expected: usize,
        actual: usize,
    },

    #[error("{joint_type} joint takes {expected} coordinates, got {actual}")]
    JointDimension {
        joint_type: JointType,
        expected: usize,
        actual: usize,
    },

    #[error("Non-finite transform for '{0}'")]
    NonFiniteTransform(String),

    #[error("Unknown joint type: {0}")]
    UnknownJointType(String),

    #[error("Unknown shape type: {0}")]
    UnknownShapeType(String),

    #[error("Unknown dynamics type: {0}")]
    UnknownDynType(i64),

    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Joint '{frame}' mimics '{target}', which does not resolve to a joint")]
    MimicUnresolved { frame: String, target: String },

    #[error("Shape '{0}' requires loaded mesh vertices")]
    MeshRequired(String),

    #[error("Invalid shape size for '{frame}': {reason}")]
    InvalidSize { frame: String, reason: String },

    #[error("Invalid transform: expected 3, 4 or 7 values, got {0}")]
    InvalidTransform(usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),
}
