//! Joint types and the per-type joint calculus

use std::fmt;
use std::str::FromStr;

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::constants::{QUAT_NORM_MAX, QUAT_NORM_MIN, UNIVERSAL_W_EPSILON};
use crate::error::KinError;
use crate::transform::{Transform, normalize_wxyz, signed_angle_about};

use super::FrameId;

/// Joint type
///
/// Names follow the model file convention (`hingeX`, `transXYPhi`, ...),
/// numeric codes are available through [`JointType::from_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JointType {
    None,
    #[default]
    HingeX,
    HingeY,
    HingeZ,
    TransX,
    TransY,
    TransZ,
    TransXY,
    Trans3,
    /// Planar translation plus an independent rotation about Z
    TransXYPhi,
    /// Rotation about X followed by rotation about Y
    Universal,
    Rigid,
    QuatBall,
    /// Rotation about Z, then translation in the rotated frame
    PhiTransXY,
    /// Translation along X plus a ball joint
    XBall,
    Free,
}

impl JointType {
    pub const ALL: &'static [JointType] = &[
        JointType::None,
        JointType::HingeX,
        JointType::HingeY,
        JointType::HingeZ,
        JointType::TransX,
        JointType::TransY,
        JointType::TransZ,
        JointType::TransXY,
        JointType::Trans3,
        JointType::TransXYPhi,
        JointType::Universal,
        JointType::Rigid,
        JointType::QuatBall,
        JointType::PhiTransXY,
        JointType::XBall,
        JointType::Free,
    ];

    pub fn from_index(index: i64) -> Result<Self, KinError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.index() == index)
            .ok_or_else(|| KinError::UnknownJointType(index.to_string()))
    }

    pub fn index(&self) -> i64 {
        match self {
            JointType::None => -1,
            JointType::HingeX => 0,
            JointType::HingeY => 1,
            JointType::HingeZ => 2,
            JointType::TransX => 3,
            JointType::TransY => 4,
            JointType::TransZ => 5,
            JointType::TransXY => 6,
            JointType::Trans3 => 7,
            JointType::TransXYPhi => 8,
            JointType::Universal => 9,
            JointType::Rigid => 10,
            JointType::QuatBall => 11,
            JointType::PhiTransXY => 12,
            JointType::XBall => 13,
            JointType::Free => 14,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            JointType::None => "none",
            JointType::HingeX => "hingeX",
            JointType::HingeY => "hingeY",
            JointType::HingeZ => "hingeZ",
            JointType::TransX => "transX",
            JointType::TransY => "transY",
            JointType::TransZ => "transZ",
            JointType::TransXY => "transXY",
            JointType::Trans3 => "trans3",
            JointType::TransXYPhi => "transXYPhi",
            JointType::Universal => "universal",
            JointType::Rigid => "rigid",
            JointType::QuatBall => "quatBall",
            JointType::PhiTransXY => "phiTransXY",
            JointType::XBall => "XBall",
            JointType::Free => "free",
        }
    }

    /// Number of generalized coordinates the type consumes
    pub fn dim(&self) -> usize {
        match self {
            JointType::HingeX
            | JointType::HingeY
            | JointType::HingeZ
            | JointType::TransX
            | JointType::TransY
            | JointType::TransZ => 1,
            JointType::TransXY | JointType::Universal => 2,
            JointType::TransXYPhi | JointType::PhiTransXY | JointType::Trans3 => 3,
            JointType::QuatBall => 4,
            JointType::XBall => 5,
            JointType::Free => 7,
            JointType::Rigid | JointType::None => 0,
        }
    }

    /// Canonical axis of hinge and single-axis translation types
    pub fn canonical_axis(&self) -> Option<DVec3> {
        match self {
            JointType::HingeX | JointType::TransX => Some(DVec3::X),
            JointType::HingeY | JointType::TransY => Some(DVec3::Y),
            JointType::HingeZ | JointType::TransZ => Some(DVec3::Z),
            _ => None,
        }
    }
}

impl fmt::Display for JointType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JointType {
    type Err = KinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| KinError::UnknownJointType(s.to_string()))
    }
}

/// Mimic reference of a joint
///
/// Targets are named while a model is loading and resolved to the frame
/// owning the mimicked joint once every frame exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mimic {
    Pending(String),
    Resolved(FrameId),
}

impl Mimic {
    pub fn target(&self) -> Option<FrameId> {
        match self {
            Mimic::Resolved(id) => Some(*id),
            Mimic::Pending(_) => None,
        }
    }
}

/// Per-coordinate noise model carried along with a joint
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Uncertainty {
    pub sigma: Vec<f64>,
}

/// Result of the forward map
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointTransform {
    pub transform: Transform,
    /// Squared norm of a quaternion input that fell outside the accepted range
    pub quat_drift: Option<f64>,
}

/// Parametrization of a frame's transform relative to its parent
///
/// Type, mimic and activity changes alter the configuration layout and go
/// through [`World`](super::World) so the layout is invalidated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub(crate) joint_type: JointType,
    pub(crate) q_index: Option<usize>,
    pub(crate) mimic: Option<Mimic>,
    pub(crate) active: bool,
    /// Reference coordinates
    pub q0: Vec<f64>,
    /// Control cost weight
    pub ctrl_h: f64,
    /// Position bounds `[lo_0, hi_0, ...]`, optionally followed by 3 control limits
    pub limits: Vec<f64>,
    pub axis: DVec3,
    pub uncertainty: Option<Uncertainty>,
}

impl Default for Joint {
    fn default() -> Self {
        Self::new(JointType::default())
    }
}

impl Joint {
    pub fn new(joint_type: JointType) -> Self {
        Self {
            joint_type,
            q_index: None,
            mimic: None,
            active: true,
            q0: vec![0.0; joint_type.dim()],
            ctrl_h: 1.0,
            limits: Vec::new(),
            axis: DVec3::X,
            uncertainty: None,
        }
    }

    /// Create a builder for constructing joints with fluent API
    pub fn builder(joint_type: JointType) -> JointBuilder {
        JointBuilder::new(joint_type)
    }

    pub fn joint_type(&self) -> JointType {
        self.joint_type
    }

    /// Offset into the configuration vector, `None` until laid out
    pub fn q_index(&self) -> Option<usize> {
        self.q_index
    }

    pub fn mimic(&self) -> Option<&Mimic> {
        self.mimic.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Coordinates consumed in the configuration vector (0 for mimic joints)
    pub fn dim(&self) -> usize {
        if self.mimic.is_some() {
            0
        } else {
            self.joint_type.dim()
        }
    }

    /// Position limits as `(lower, upper)` pairs
    pub fn limit_pairs(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.limits
            .chunks_exact(2)
            .take(self.dim())
            .map(|c| (c[0], c[1]))
    }

    /// Check `limits` against the joint dimension
    ///
    /// Accepts `2 * dim` entries, or `2 * dim + 3` with control limits appended.
    /// Rigid and mimic joints are not checked.
    pub fn validate_limits(&self, frame: &str) -> Result<(), KinError> {
        if self.limits.is_empty() || self.joint_type == JointType::Rigid || self.mimic.is_some() {
            return Ok(());
        }
        let expected = 2 * self.dim();
        let actual = self.limits.len();
        if actual == expected || actual == expected + 3 {
            Ok(())
        } else {
            Err(KinError::LimitsDimension {
                frame: frame.to_string(),
                expected,
                actual,
            })
        }
    }

    /// Forward map: relative transform from this joint's `dim` coordinates
    ///
    /// `q` holds exactly the joint's own slice of the configuration vector.
    /// Mimic joints are resolved by the world and never reach this map.
    pub fn forward(&self, q: &[f64]) -> Result<JointTransform, KinError> {
        let dim = self.joint_type.dim();
        if q.len() != dim {
            return Err(KinError::JointDimension {
                joint_type: self.joint_type,
                expected: dim,
                actual: q.len(),
            });
        }

        let mut quat_drift = None;
        let mut quat = |slots: &[f64]| {
            let (rot, norm) = normalize_wxyz(slots);
            let squared = norm * norm;
            if !(QUAT_NORM_MIN..=QUAT_NORM_MAX).contains(&squared) {
                quat_drift = Some(squared);
            }
            rot
        };

        let transform = match self.joint_type {
            JointType::HingeX => Transform::from_rotation(DQuat::from_rotation_x(q[0])),
            JointType::HingeY => Transform::from_rotation(DQuat::from_rotation_y(q[0])),
            JointType::HingeZ => Transform::from_rotation(DQuat::from_rotation_z(q[0])),
            JointType::Universal => Transform::from_rotation(
                DQuat::from_rotation_x(q[0]) * DQuat::from_rotation_y(q[1]),
            ),
            JointType::QuatBall => Transform::from_rotation(quat(q)),
            JointType::Free => Transform::new(DVec3::from_slice(&q[..3]), quat(&q[3..])),
            JointType::XBall => Transform::new(DVec3::new(q[0], 0.0, 0.0), quat(&q[1..])),
            JointType::TransX => Transform::from_translation(DVec3::X * q[0]),
            JointType::TransY => Transform::from_translation(DVec3::Y * q[0]),
            JointType::TransZ => Transform::from_translation(DVec3::Z * q[0]),
            JointType::TransXY => Transform::from_translation(DVec3::new(q[0], q[1], 0.0)),
            JointType::Trans3 => Transform::from_translation(DVec3::from_slice(q)),
            JointType::TransXYPhi => Transform::new(
                DVec3::new(q[0], q[1], 0.0),
                DQuat::from_rotation_z(q[2]),
            ),
            JointType::PhiTransXY => {
                let rot = DQuat::from_rotation_z(q[0]);
                Transform::new(rot * DVec3::new(q[1], q[2], 0.0), rot)
            }
            JointType::Rigid | JointType::None => Transform::IDENTITY,
        };

        if !transform.is_finite() {
            return Err(KinError::NonFiniteTransform(self.joint_type.to_string()));
        }
        Ok(JointTransform {
            transform,
            quat_drift,
        })
    }

    /// Inverse map: coordinates reproducing the relative transform `rel`
    pub fn inverse(&self, rel: &Transform) -> Vec<f64> {
        let Transform { pos, rot } = *rel;
        match self.joint_type {
            JointType::HingeX => vec![signed_angle_about(rot, DVec3::X)],
            JointType::HingeY => vec![signed_angle_about(rot, DVec3::Y)],
            JointType::HingeZ => vec![signed_angle_about(rot, DVec3::Z)],
            JointType::Universal => {
                if rot.w.abs() > UNIVERSAL_W_EPSILON {
                    vec![2.0 * (rot.x / rot.w).atan(), 2.0 * (rot.y / rot.w).atan()]
                } else {
                    vec![std::f64::consts::PI, std::f64::consts::PI]
                }
            }
            JointType::QuatBall => vec![rot.w, rot.x, rot.y, rot.z],
            JointType::TransX => vec![pos.x],
            JointType::TransY => vec![pos.y],
            JointType::TransZ => vec![pos.z],
            JointType::TransXY => vec![pos.x, pos.y],
            JointType::Trans3 => vec![pos.x, pos.y, pos.z],
            JointType::TransXYPhi => vec![pos.x, pos.y, signed_angle_about(rot, DVec3::Z)],
            JointType::PhiTransXY => {
                let local = rot.inverse() * pos;
                vec![signed_angle_about(rot, DVec3::Z), local.x, local.y]
            }
            JointType::Free => vec![pos.x, pos.y, pos.z, rot.w, rot.x, rot.y, rot.z],
            JointType::XBall => vec![pos.x, rot.w, rot.x, rot.y, rot.z],
            JointType::Rigid | JointType::None => Vec::new(),
        }
    }

    /// Copy for another world: mimic targets keep their frame ID, the layout is dropped
    pub(crate) fn clone_unassigned(&self) -> Joint {
        Joint {
            q_index: None,
            ..self.clone()
        }
    }
}

/// Builder for creating joints with fluent API
#[derive(Debug, Clone)]
pub struct JointBuilder {
    joint: Joint,
}

impl JointBuilder {
    pub fn new(joint_type: JointType) -> Self {
        Self {
            joint: Joint::new(joint_type),
        }
    }

    /// Set the reference coordinates
    pub fn q0(mut self, q0: impl Into<Vec<f64>>) -> Self {
        self.joint.q0 = q0.into();
        self
    }

    /// Set the control cost weight
    pub fn ctrl_h(mut self, h: f64) -> Self {
        self.joint.ctrl_h = h;
        self
    }

    /// Set position limits
    pub fn limits(mut self, limits: impl Into<Vec<f64>>) -> Self {
        self.joint.limits = limits.into();
        self
    }

    /// Set the joint axis
    pub fn axis(mut self, axis: DVec3) -> Self {
        self.joint.axis = axis.normalize();
        self
    }

    /// Follow the joint of another frame
    pub fn mimic(mut self, target: FrameId) -> Self {
        self.joint.mimic = Some(Mimic::Resolved(target));
        self
    }

    /// Follow the joint of a frame that is named but not yet created
    pub fn mimic_pending(mut self, name: impl Into<String>) -> Self {
        self.joint.mimic = Some(Mimic::Pending(name.into()));
        self
    }

    pub fn inactive(mut self) -> Self {
        self.joint.active = false;
        self
    }

    pub fn uncertainty(mut self, sigma: impl Into<Vec<f64>>) -> Self {
        self.joint.uncertainty = Some(Uncertainty {
            sigma: sigma.into(),
        });
        self
    }

    /// Build the joint
    pub fn build(self) -> Joint {
        self.joint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_dim_table() {
        let expected = [
            (JointType::HingeX, 1),
            (JointType::HingeY, 1),
            (JointType::HingeZ, 1),
            (JointType::TransX, 1),
            (JointType::TransY, 1),
            (JointType::TransZ, 1),
            (JointType::TransXY, 2),
            (JointType::Universal, 2),
            (JointType::TransXYPhi, 3),
            (JointType::PhiTransXY, 3),
            (JointType::Trans3, 3),
            (JointType::QuatBall, 4),
            (JointType::XBall, 5),
            (JointType::Free, 7),
            (JointType::Rigid, 0),
            (JointType::None, 0),
        ];
        for (t, dim) in expected {
            assert_eq!(Joint::new(t).dim(), dim, "{t}");
            let mimic = Joint::builder(t).mimic(FrameId(0)).build();
            assert_eq!(mimic.dim(), 0, "mimic {t}");
        }
    }

    #[test]
    fn test_type_names_and_codes() {
        for t in JointType::ALL {
            assert_eq!(t.name().parse::<JointType>().unwrap(), *t);
            assert_eq!(JointType::from_index(t.index()).unwrap(), *t);
        }
        assert!(matches!(
            "hingeW".parse::<JointType>(),
            Err(KinError::UnknownJointType(_))
        ));
        assert!(JointType::from_index(15).is_err());
    }

    #[test]
    fn test_hinge_z_forward_and_inverse() {
        let joint = Joint::new(JointType::HingeZ);
        let out = joint.forward(&[0.3]).unwrap();
        let expected = Transform::from_rotation(DQuat::from_rotation_z(0.3));
        assert!(out.transform.approx_eq(&expected, 1e-12));
        assert_abs_diff_eq!(joint.inverse(&out.transform)[0], 0.3, epsilon = 1e-9);
    }

    #[test]
    fn test_negative_hinge_angle_recovered() {
        let joint = Joint::new(JointType::HingeY);
        let out = joint.forward(&[-2.5]).unwrap();
        assert_abs_diff_eq!(joint.inverse(&out.transform)[0], -2.5, epsilon = 1e-9);
    }

    #[test]
    fn test_phi_trans_xy_translates_in_rotated_frame() {
        let joint = Joint::new(JointType::PhiTransXY);
        let q = [FRAC_PI_2, 1.0, 0.0];
        let out = joint.forward(&q).unwrap();
        assert!(out.transform.pos.abs_diff_eq(DVec3::new(0.0, 1.0, 0.0), 1e-12));

        let back = joint.inverse(&out.transform);
        for (a, b) in back.iter().zip(q) {
            assert_abs_diff_eq!(*a, b, epsilon = 1e-9);
        }

        let planar = Joint::new(JointType::TransXYPhi).forward(&q).unwrap();
        assert!(!planar.transform.approx_eq(&out.transform, 1e-6));
    }

    #[test]
    fn test_quat_ball_renormalizes_and_reports_drift() {
        let joint = Joint::new(JointType::QuatBall);
        let out = joint.forward(&[0.8, 0.0, 0.0, 0.0]).unwrap();
        assert_abs_diff_eq!(out.transform.rot.length(), 1.0, epsilon = 1e-9);
        assert!(out.quat_drift.is_none());

        let out = joint.forward(&[0.6, 0.0, 0.0, 0.0]).unwrap();
        assert_abs_diff_eq!(out.transform.rot.length(), 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(out.quat_drift.unwrap(), 0.36, epsilon = 1e-12);
    }

    #[test]
    fn test_free_joint() {
        let joint = Joint::new(JointType::Free);
        let q = [1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 2.0];
        let out = joint.forward(&q).unwrap();
        assert_eq!(out.transform.pos, DVec3::new(1.0, 2.0, 3.0));
        assert!(out.transform.rot.abs_diff_eq(DQuat::from_xyzw(0.0, 0.0, 1.0, 0.0), 1e-12));
    }

    #[test]
    fn test_universal_degenerate_orientation() {
        let joint = Joint::new(JointType::Universal);
        let rel = Transform::from_rotation(DQuat::from_xyzw(0.0, 0.0, 1.0, 0.0));
        assert_eq!(joint.inverse(&rel), vec![std::f64::consts::PI; 2]);
    }

    #[test]
    fn test_wrong_slice_length_and_nan() {
        let joint = Joint::new(JointType::Trans3);
        assert!(matches!(
            joint.forward(&[1.0]),
            Err(KinError::JointDimension {
                joint_type: JointType::Trans3,
                expected: 3,
                actual: 1
            })
        ));
        assert!(matches!(
            joint.forward(&[f64::NAN, 0.0, 0.0]),
            Err(KinError::NonFiniteTransform(_))
        ));
    }

    #[test]
    fn test_limits_validation() {
        let joint = Joint::builder(JointType::HingeX).limits([-1.0, 1.0]).build();
        assert!(joint.validate_limits("j").is_ok());
        let joint = Joint::builder(JointType::HingeX)
            .limits([-1.0, 1.0, 0.5, 2.0, 3.0])
            .build();
        assert!(joint.validate_limits("j").is_ok());
        assert_eq!(joint.limit_pairs().collect::<Vec<_>>(), vec![(-1.0, 1.0)]);

        let joint = Joint::builder(JointType::Universal).limits([-1.0, 1.0]).build();
        assert!(matches!(
            joint.validate_limits("j"),
            Err(KinError::LimitsDimension { expected: 4, actual: 2, .. })
        ));
        let rigid = Joint::builder(JointType::Rigid).limits([0.0, 1.0]).build();
        assert!(rigid.validate_limits("j").is_ok());
    }
}
