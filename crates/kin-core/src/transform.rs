//! Rigid transforms (position and unit quaternion)

use std::f64::consts::{PI, TAU};
use std::fmt;

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::error::KinError;

/// Rigid 3D pose: rotation followed by translation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub pos: DVec3,
    pub rot: DQuat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Self = Self {
        pos: DVec3::ZERO,
        rot: DQuat::IDENTITY,
    };

    pub fn new(pos: DVec3, rot: DQuat) -> Self {
        Self { pos, rot }
    }

    pub fn from_translation(pos: DVec3) -> Self {
        Self {
            pos,
            rot: DQuat::IDENTITY,
        }
    }

    pub fn from_rotation(rot: DQuat) -> Self {
        Self {
            pos: DVec3::ZERO,
            rot,
        }
    }

    /// Parse from a flat slice: `[x y z]`, `[qw qx qy qz]` or `[x y z qw qx qy qz]`
    ///
    /// Zero quaternions and non-finite entries are rejected.
    pub fn from_slice(values: &[f64]) -> Result<Self, KinError> {
        let transform = match values.len() {
            3 => Self::from_translation(DVec3::from_slice(values)),
            4 => Self::from_rotation(quat_from_wxyz(values).normalize()),
            7 => Self::new(
                DVec3::from_slice(&values[..3]),
                quat_from_wxyz(&values[3..]).normalize(),
            ),
            n => return Err(KinError::InvalidTransform(n)),
        };
        if !transform.is_finite() {
            return Err(KinError::NonFiniteTransform(format!("{values:?}")));
        }
        Ok(transform)
    }

    /// Flatten to `[x y z qw qx qy qz]`
    pub fn to_array(&self) -> [f64; 7] {
        [
            self.pos.x, self.pos.y, self.pos.z, self.rot.w, self.rot.x, self.rot.y, self.rot.z,
        ]
    }

    /// `self * other`: `other` expressed in the frame of `self`
    pub fn compose(&self, other: &Transform) -> Transform {
        Transform {
            pos: self.pos + self.rot * other.pos,
            rot: self.rot * other.rot,
        }
    }

    pub fn inverse(&self) -> Transform {
        let rot = self.rot.inverse();
        Transform {
            pos: -(rot * self.pos),
            rot,
        }
    }

    /// Map a point from this frame into the parent frame
    pub fn apply(&self, point: DVec3) -> DVec3 {
        self.pos + self.rot * point
    }

    pub fn is_finite(&self) -> bool {
        self.pos.is_finite() && self.rot.is_finite()
    }

    pub fn is_identity(&self, eps: f64) -> bool {
        self.approx_eq(&Self::IDENTITY, eps)
    }

    /// Compare poses; `q` and `-q` describe the same rotation
    pub fn approx_eq(&self, other: &Transform, eps: f64) -> bool {
        self.pos.abs_diff_eq(other.pos, eps)
            && (self.rot.abs_diff_eq(other.rot, eps) || self.rot.abs_diff_eq(-other.rot, eps))
    }
}

impl std::ops::Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        self.compose(&rhs)
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x, y, z, qw, qx, qy, qz] = self.to_array();
        write!(f, "{x} {y} {z} {qw} {qx} {qy} {qz}")
    }
}

/// Build a quaternion from configuration slots ordered `w x y z`
pub fn quat_from_wxyz(q: &[f64]) -> DQuat {
    DQuat::from_xyzw(q[1], q[2], q[3], q[0])
}

/// Normalize a quaternion given as `w x y z`, returning it with its prior norm
pub fn normalize_wxyz(q: &[f64]) -> (DQuat, f64) {
    let raw = quat_from_wxyz(q);
    let norm = raw.length();
    (raw / norm, norm)
}

/// Minimal rotation that maps direction `from` onto direction `to`
pub fn rotation_between(from: DVec3, to: DVec3) -> DQuat {
    DQuat::from_rotation_arc(from.normalize(), to.normalize())
}

/// Rotation angle in [0, 2pi) and unit axis of a quaternion
pub fn axis_angle(rot: DQuat) -> (DVec3, f64) {
    let v = DVec3::new(rot.x, rot.y, rot.z);
    let s = v.length();
    if s == 0.0 {
        return (DVec3::X, 0.0);
    }
    (v / s, 2.0 * s.atan2(rot.w))
}

/// Signed rotation angle about `axis`, wrapped into (-pi, pi]
///
/// The sign flips when the extracted rotation axis is anti-parallel to `axis`.
pub fn signed_angle_about(rot: DQuat, axis: DVec3) -> f64 {
    let (rot_axis, mut angle) = axis_angle(rot);
    if angle > PI {
        angle -= TAU;
    }
    if rot_axis.dot(axis) < 0.0 {
        angle = -angle;
    }
    angle
}
