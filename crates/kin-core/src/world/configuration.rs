//! Configuration vector access and forward kinematics

use tracing::debug;

use crate::error::KinError;
use crate::transform::Transform;

use super::joint::Mimic;
use super::{FrameId, World};

impl World {
    // ============== Configuration Layout ==============

    /// Assign configuration offsets if the layout is stale
    pub fn ensure_q_layout(&mut self) {
        if !self.layout.valid {
            self.layout.rebuild(&mut self.frames);
            debug!("Configuration layout rebuilt: {} coordinates", self.layout.q_dim);
        }
    }

    /// Length of the configuration vector
    pub fn q_dim(&mut self) -> usize {
        self.ensure_q_layout();
        self.layout.q_dim
    }

    // ============== Joint Calculus ==============

    /// Set the relative transform of `id` from its coordinates in `q`, starting at `q_index`
    ///
    /// Mimic joints copy the current relative transform of the mimicked frame
    /// and ignore `q`.
    pub fn calc_rel_from_q(
        &mut self,
        id: FrameId,
        q: &[f64],
        q_index: usize,
    ) -> Result<(), KinError> {
        let frame = self.get(id)?;
        let joint = frame
            .joint
            .as_ref()
            .ok_or_else(|| KinError::NoJoint(frame.name.clone()))?;

        let (rel, drift) = match &joint.mimic {
            Some(Mimic::Resolved(target)) => (self.get(*target)?.rel, None),
            Some(Mimic::Pending(target)) => {
                return Err(KinError::MimicUnresolved {
                    frame: frame.name.clone(),
                    target: target.clone(),
                });
            }
            None => {
                let dim = joint.dim();
                let slice = q.get(q_index..q_index + dim).ok_or_else(|| KinError::QDimension {
                    frame: frame.name.clone(),
                    expected: q_index + dim,
                    actual: q.len(),
                })?;
                let out = joint.forward(slice).map_err(|e| match e {
                    KinError::NonFiniteTransform(_) => {
                        KinError::NonFiniteTransform(frame.name.clone())
                    }
                    other => other,
                })?;
                let drift = out.quat_drift.map(|squared| {
                    format!(
                        "quaternion normalization of joint '{}' is extreme: {}",
                        frame.name, squared
                    )
                });
                (out.transform, drift)
            }
        };

        if let Some(message) = drift {
            self.record_warning(message);
        }
        self.frames[id.0].rel = rel;
        Ok(())
    }

    /// Coordinates of the joint at `id` reproducing its current relative transform
    pub fn calc_q_from_rel(&self, id: FrameId) -> Result<Vec<f64>, KinError> {
        let frame = self.get(id)?;
        let joint = frame
            .joint
            .as_ref()
            .ok_or_else(|| KinError::NoJoint(frame.name.clone()))?;
        if joint.mimic.is_some() {
            return Ok(Vec::new());
        }
        Ok(joint.inverse(&frame.rel))
    }

    /// Frame whose non-mimic joint ultimately drives the joint at `id`
    pub fn mimic_source(&self, id: FrameId) -> Result<FrameId, KinError> {
        let mut current = id;
        for _ in 0..=self.frames.len() {
            let frame = self.get(current)?;
            match frame.joint.as_ref().and_then(|j| j.mimic.as_ref()) {
                None => return Ok(current),
                Some(Mimic::Resolved(target)) => current = *target,
                Some(Mimic::Pending(target)) => {
                    return Err(KinError::MimicUnresolved {
                        frame: frame.name.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        let frame = self.get(id)?;
        Err(KinError::MimicUnresolved {
            frame: frame.name.clone(),
            target: "cyclic mimic chain".to_string(),
        })
    }

    // ============== Configuration Vector ==============

    /// Gather the configuration vector from the current relative transforms
    pub fn get_q(&mut self) -> Result<Vec<f64>, KinError> {
        self.ensure_q_layout();
        let mut q = vec![0.0; self.layout.q_dim];
        for frame in &self.frames {
            let Some(joint) = frame.joint.as_ref() else {
                continue;
            };
            if let Some(index) = joint.q_index {
                let values = joint.inverse(&frame.rel);
                q[index..index + values.len()].copy_from_slice(&values);
            }
        }
        Ok(q)
    }

    /// Write every joint's relative transform from `q` and update global poses
    ///
    /// Mimic joints are written after all driven joints, copying the
    /// transform of the joint at the end of their mimic chain.
    pub fn set_q(&mut self, q: &[f64]) -> Result<(), KinError> {
        self.ensure_q_layout();
        if q.len() != self.layout.q_dim {
            return Err(KinError::QDimension {
                frame: "configuration".to_string(),
                expected: self.layout.q_dim,
                actual: q.len(),
            });
        }

        let mut mimics = Vec::new();
        for i in 0..self.frames.len() {
            let Some(joint) = self.frames[i].joint.as_ref() else {
                continue;
            };
            if joint.mimic.is_some() {
                mimics.push(FrameId(i));
            } else if let Some(index) = joint.q_index {
                self.calc_rel_from_q(FrameId(i), q, index)?;
            }
        }
        for id in mimics {
            let source = self.mimic_source(id)?;
            self.frames[id.0].rel = self.frames[source.0].rel;
        }

        self.calc_absolute_poses();
        Ok(())
    }

    // ============== Forward Kinematics ==============

    /// Propagate global poses from the roots: `X_child = X_parent · Q_child`
    pub fn calc_absolute_poses(&mut self) {
        let mut stack: Vec<FrameId> = self.roots();
        stack.reverse();
        while let Some(id) = stack.pop() {
            let parent_pose = self.frames[id.0].pose;
            let children = self.frames[id.0].children.clone();
            for &child in &children {
                let child_frame = &mut self.frames[child.0];
                child_frame.pose = parent_pose * child_frame.rel;
            }
            stack.extend(children.into_iter().rev());
        }
    }

    /// Global pose of `id` composed along its chain to the root
    pub fn world_pose(&self, id: FrameId) -> Result<Transform, KinError> {
        let chain = self.chain_to_root(id);
        let root = *chain.last().ok_or_else(|| KinError::FrameNotFound(id.to_string()))?;
        let mut pose = self.get(root)?.pose;
        for frame in chain.iter().rev().skip(1) {
            pose = pose * self.frames[frame.0].rel;
        }
        Ok(pose)
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use approx::assert_abs_diff_eq;
    use glam::{DQuat, DVec3};

    use crate::error::KinError;
    use crate::transform::Transform;
    use crate::world::{FrameId, Joint, JointType, Mimic, World};

    fn arm() -> (World, FrameId, FrameId, FrameId) {
        let mut world = World::new();
        let base = world.add_frame("base");
        let shoulder = world.add_frame("shoulder");
        let elbow = world.add_frame("elbow");
        world.link_from(shoulder, base).unwrap();
        world.link_from(elbow, shoulder).unwrap();
        world.add_joint(shoulder, Joint::new(JointType::HingeZ)).unwrap();
        world.add_joint(elbow, Joint::new(JointType::TransX)).unwrap();
        (world, base, shoulder, elbow)
    }

    #[test]
    fn test_set_q_updates_poses() {
        let (mut world, base, _, elbow) = arm();
        world.frame_mut(base).unwrap().pose = Transform::from_translation(DVec3::Z);
        world.set_q(&[FRAC_PI_2, 2.0]).unwrap();

        let pose = world.frame(elbow).unwrap().pose;
        assert!(pose.pos.abs_diff_eq(DVec3::new(0.0, 2.0, 1.0), 1e-12));
        assert!(pose.approx_eq(&world.world_pose(elbow).unwrap(), 1e-12));

        let q = world.get_q().unwrap();
        assert_abs_diff_eq!(q[0], FRAC_PI_2, epsilon = 1e-9);
        assert_abs_diff_eq!(q[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_set_q_rejects_wrong_length() {
        let (mut world, ..) = arm();
        assert!(matches!(
            world.set_q(&[0.1]),
            Err(KinError::QDimension { expected: 2, actual: 1, .. })
        ));
    }

    #[test]
    fn test_mimic_copies_source_transform() {
        let (mut world, base, shoulder, _) = arm();
        let twin = world.add_frame("twin");
        world.link_from(twin, base).unwrap();
        world
            .add_joint(twin, Joint::builder(JointType::HingeZ).mimic(shoulder).build())
            .unwrap();

        assert_eq!(world.q_dim(), 2);
        world.set_q(&[0.7, 0.0]).unwrap();
        let expected = Transform::from_rotation(DQuat::from_rotation_z(0.7));
        assert!(world.frame(twin).unwrap().rel.approx_eq(&expected, 1e-12));
        assert!(world.calc_q_from_rel(twin).unwrap().is_empty());
    }

    #[test]
    fn test_pending_mimic_fails() {
        let (mut world, _, _, elbow) = arm();
        world
            .set_mimic(elbow, Some(Mimic::Pending("nowhere".into())))
            .unwrap();
        assert!(matches!(
            world.calc_rel_from_q(elbow, &[], 0),
            Err(KinError::MimicUnresolved { .. })
        ));
    }

    #[test]
    fn test_quat_drift_recorded() {
        let mut world = World::new();
        let base = world.add_frame("base");
        let ball = world.add_frame("ball");
        world.link_from(ball, base).unwrap();
        world.add_joint(ball, Joint::new(JointType::QuatBall)).unwrap();

        world.set_q(&[0.2, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(world.warnings().len(), 1);
        assert!(world.warnings()[0].contains("ball"));
        assert_abs_diff_eq!(world.frame(ball).unwrap().rel.rot.length(), 1.0, epsilon = 1e-12);

        world.clear_warnings();
        world.set_q(&[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert!(world.warnings().is_empty());
    }

    #[test]
    fn test_non_finite_names_frame() {
        let (mut world, _, shoulder, _) = arm();
        match world.calc_rel_from_q(shoulder, &[f64::NAN], 0) {
            Err(KinError::NonFiniteTransform(name)) => assert_eq!(name, "shoulder"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
