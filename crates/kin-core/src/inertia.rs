//! Mass properties attached to a frame

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

use crate::error::KinError;

/// Dynamics classification consumed by external solvers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DynType {
    Static,
    Kinematic,
    #[default]
    Dynamic,
}

impl TryFrom<i64> for DynType {
    type Error = KinError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DynType::Static),
            1 => Ok(DynType::Kinematic),
            2 => Ok(DynType::Dynamic),
            other => Err(KinError::UnknownDynType(other)),
        }
    }
}

impl From<DynType> for i64 {
    fn from(value: DynType) -> Self {
        match value {
            DynType::Static => 0,
            DynType::Kinematic => 1,
            DynType::Dynamic => 2,
        }
    }
}

/// Mass, inertia tensor and accumulated wrench of a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inertia {
    pub dyn_type: DynType,
    /// Mass in kg
    pub mass: f64,
    /// Inertia tensor about the center of mass
    pub matrix: DMat3,
    pub com: DVec3,
    pub force: DVec3,
    pub torque: DVec3,
}

impl Default for Inertia {
    fn default() -> Self {
        Self {
            dyn_type: DynType::Dynamic,
            mass: 0.0,
            matrix: DMat3::ZERO,
            com: DVec3::ZERO,
            force: DVec3::ZERO,
            torque: DVec3::ZERO,
        }
    }
}

impl Inertia {
    /// Dynamic body with the default tensor `0.2 * mass * I`
    pub fn from_mass(mass: f64) -> Self {
        Self {
            mass,
            matrix: DMat3::IDENTITY * (0.2 * mass),
            dyn_type: DynType::Dynamic,
            ..Self::default()
        }
    }

    /// Apply dynamics classification flags
    ///
    /// `fixed`/`static` downgrade to static, `kinematic` to kinematic; an
    /// explicit numeric `dyntype` wins over the flags.
    pub fn classify(
        &mut self,
        fixed: bool,
        is_static: bool,
        kinematic: bool,
        dyntype: Option<i64>,
    ) -> Result<(), KinError> {
        if fixed || is_static {
            self.dyn_type = DynType::Static;
        }
        if kinematic {
            self.dyn_type = DynType::Kinematic;
        }
        if let Some(value) = dyntype {
            self.dyn_type = DynType::try_from(value)?;
        }
        Ok(())
    }

    /// Tensor of a solid box with the given extents
    pub fn box_tensor(mass: f64, size: DVec3) -> DMat3 {
        let k = mass / 12.0;
        let s2 = size * size;
        DMat3::from_diagonal(DVec3::new(
            k * (s2.y + s2.z),
            k * (s2.x + s2.z),
            k * (s2.x + s2.y),
        ))
    }

    /// Tensor of a solid cylinder along Z
    pub fn cylinder_tensor(mass: f64, radius: f64, length: f64) -> DMat3 {
        let r2 = radius * radius;
        let side = mass * (3.0 * r2 + length * length) / 12.0;
        DMat3::from_diagonal(DVec3::new(side, side, mass * r2 / 2.0))
    }

    /// Tensor of a solid sphere
    pub fn sphere_tensor(mass: f64, radius: f64) -> DMat3 {
        DMat3::from_diagonal(DVec3::splat(2.0 * mass * radius * radius / 5.0))
    }
}
