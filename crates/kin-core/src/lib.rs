//! Kinematic Model Core
//!
//! This crate contains the articulated-body model used by motion planners:
//! - World: arena of frames forming the kinematic tree
//! - Joint: per-type maps between generalized coordinates and relative transforms
//! - Shape: geometric attachments with procedural meshes
//! - Inertia: mass and dynamics classification
//! - Config: typed model files and their import/export

pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod import;
pub mod inertia;
pub mod mesh;
pub mod shape;
pub mod transform;
pub mod world;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use export::*;
pub use import::*;
pub use inertia::*;
pub use mesh::*;
pub use shape::*;
pub use transform::*;
pub use world::*;
