//! World: the arena of frames forming the kinematic tree

mod configuration;
mod dof_layout;
mod frame;
mod joint;
mod queries;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::KinError;
use crate::inertia::Inertia;
use crate::shape::Shape;
use crate::transform::Transform;

pub use frame::Frame;
pub use joint::{Joint, JointBuilder, JointTransform, JointType, Mimic, Uncertainty};

use dof_layout::DofLayout;

/// Frame identifier, equal to the frame's position in the world
///
/// IDs stay contiguous: destroying a frame shifts every later ID down by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameId(pub usize);

impl FrameId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arena owning all frames of a kinematic model
///
/// Cloning a world copies every frame with its links, attachments and the
/// current configuration layout.
#[derive(Debug, Clone, Default)]
pub struct World {
    frames: Vec<Frame>,
    layout: DofLayout,
    warnings: Vec<String>,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Get a frame by ID
    pub fn frame(&self, id: FrameId) -> Option<&Frame> {
        self.frames.get(id.0)
    }

    /// Get a mutable frame by ID
    pub fn frame_mut(&mut self, id: FrameId) -> Option<&mut Frame> {
        self.frames.get_mut(id.0)
    }

    pub(crate) fn get(&self, id: FrameId) -> Result<&Frame, KinError> {
        self.frames
            .get(id.0)
            .ok_or_else(|| KinError::FrameNotFound(id.to_string()))
    }

    pub(crate) fn get_mut(&mut self, id: FrameId) -> Result<&mut Frame, KinError> {
        self.frames
            .get_mut(id.0)
            .ok_or_else(|| KinError::FrameNotFound(id.to_string()))
    }

    // ============== Diagnostics ==============

    /// Non-fatal conditions recorded since the last [`World::clear_warnings`]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn clear_warnings(&mut self) {
        self.warnings.clear();
    }

    pub(crate) fn record_warning(&mut self, message: String) {
        warn!("{}", message);
        self.warnings.push(message);
    }

    // ============== Frame Lifecycle ==============

    /// Append a parentless frame
    pub fn add_frame(&mut self, name: impl Into<String>) -> FrameId {
        let id = FrameId(self.frames.len());
        let frame = Frame::new(id, name);
        debug!("Created frame '{}' ({})", frame.name, id);
        self.frames.push(frame);
        id
    }

    /// Append a copy of `template`, optionally linked below `parent`
    ///
    /// Links of the template are not copied. Its joint is copied only when a
    /// parent is given; the copy keeps the mimic target's frame ID, so it
    /// refers to the frame with that ID in this world. That frame must exist
    /// and carry a joint.
    pub fn copy_frame(
        &mut self,
        template: &Frame,
        parent: Option<FrameId>,
    ) -> Result<FrameId, KinError> {
        if let Some(parent) = parent {
            self.get(parent)?;
        } else if template.joint.is_some() {
            return Err(KinError::NoParent {
                id: template.id,
                name: template.name.clone(),
            });
        }
        if parent.is_some()
            && let Some(Mimic::Resolved(target)) =
                template.joint.as_ref().and_then(|j| j.mimic.as_ref())
            && self.frames.get(target.0).is_none_or(|f| f.joint.is_none())
        {
            return Err(KinError::MimicUnresolved {
                frame: template.name.clone(),
                target: target.to_string(),
            });
        }

        let id = FrameId(self.frames.len());
        self.frames.push(Frame::from_template(id, template));
        debug!("Copied frame '{}' as {}", template.name, id);

        if let Some(parent) = parent {
            self.link_from(id, parent)?;
            if let Some(joint) = &template.joint {
                self.add_joint(id, joint.clone_unassigned())?;
            }
        }
        Ok(id)
    }

    /// Append a copy of one of this world's frames
    pub fn duplicate_frame(
        &mut self,
        source: FrameId,
        parent: Option<FrameId>,
    ) -> Result<FrameId, KinError> {
        let template = self.get(source)?.clone();
        self.copy_frame(&template, parent)
    }

    /// Destroy a frame
    ///
    /// Releases its attachments, unlinks it from its parent and detaches
    /// (without destroying) its children, then removes it from the arena and
    /// shifts later IDs down by one. Joints mimicking the destroyed frame
    /// fall back to a pending reference by name.
    pub fn destroy_frame(&mut self, id: FrameId) -> Result<(), KinError> {
        let name = self.get(id)?.name.clone();

        if self.frames[id.0].joint.is_some() {
            self.remove_joint(id)?;
        }
        self.frames[id.0].shape = None;
        self.frames[id.0].inertia = None;

        if self.frames[id.0].parent.is_some() {
            self.unlink(id)?;
        }
        while let Some(&child) = self.frames[id.0].children.last() {
            self.unlink(child)?;
        }

        for frame in &mut self.frames {
            if let Some(joint) = frame.joint.as_mut()
                && joint.mimic == Some(Mimic::Resolved(id))
            {
                joint.mimic = Some(Mimic::Pending(name.clone()));
            }
        }

        self.frames.remove(id.0);
        for frame in &mut self.frames {
            frame.remap_after_removal(id);
        }
        self.invalidate_q_layout();
        debug!("Destroyed frame '{}' ({})", name, id);
        Ok(())
    }

    // ============== Tree Surgery ==============

    /// Link a parentless frame below `parent`
    pub fn link_from(&mut self, id: FrameId, parent: FrameId) -> Result<(), KinError> {
        let frame = self.get(id)?;
        self.get(parent)?;
        if frame.parent.is_some() {
            return Err(KinError::AlreadyHasParent {
                id,
                name: frame.name.clone(),
            });
        }
        if self.chain_to_root(parent).contains(&id) {
            return Err(KinError::WouldCreateCycle {
                parent: self.frames[parent.0].name.clone(),
                child: frame.name.clone(),
            });
        }

        self.frames[id.0].parent = Some(parent);
        self.frames[parent.0].children.push(id);
        debug!("Linked {} below {}", id, parent);
        Ok(())
    }

    /// Detach a frame from its parent
    ///
    /// The relative transform is reset and the joint, which has no edge left
    /// to parametrize, is destroyed.
    pub fn unlink(&mut self, id: FrameId) -> Result<(), KinError> {
        let frame = self.get(id)?;
        let parent = frame.parent.ok_or_else(|| KinError::NoParent {
            id,
            name: frame.name.clone(),
        })?;

        self.frames[parent.0].children.retain(|c| *c != id);
        let frame = &mut self.frames[id.0];
        frame.parent = None;
        frame.rel = Transform::IDENTITY;
        if frame.joint.take().is_some() {
            self.invalidate_q_layout();
        }
        debug!("Unlinked {} from {}", id, parent);
        Ok(())
    }

    /// Splice a new frame between `id` and its parent
    ///
    /// The new frame takes over the parent slot and carries `a` as its
    /// relative transform. The relative transform of `id` becomes
    /// `a⁻¹ · rel`, so the composed edge is unchanged and so is the global
    /// pose. Returns the new frame.
    pub fn insert_pre_link(&mut self, id: FrameId, a: Transform) -> Result<FrameId, KinError> {
        let frame = self.get(id)?;
        let name = if frame.name.is_empty() {
            String::new()
        } else {
            format!(">{}", frame.name)
        };
        let old_parent = frame.parent;
        let rel = a.inverse() * frame.rel;
        let pose = frame.pose * rel.inverse();

        let link = self.add_frame(name);
        if let Some(parent) = old_parent {
            self.frames[parent.0].children.retain(|c| *c != id);
            self.frames[link.0].parent = Some(parent);
            self.frames[parent.0].children.push(link);
        }
        self.frames[link.0].rel = a;
        self.frames[link.0].pose = pose;
        self.frames[link.0].children.push(id);

        let frame = &mut self.frames[id.0];
        frame.parent = Some(link);
        frame.rel = rel;
        debug!("Inserted pre-link {} above {}", link, id);
        Ok(link)
    }

    /// Splice a new frame between `id` and its children
    ///
    /// Not supported: how joints of the re-parented children carry over is
    /// undefined, so this always fails for existing frames.
    pub fn insert_post_link(&mut self, id: FrameId, _b: Transform) -> Result<FrameId, KinError> {
        self.get(id)?;
        Err(KinError::NotImplemented("insert_post_link"))
    }

    // ============== Attachments ==============

    /// Attach a joint to the edge between `id` and its parent
    pub fn add_joint(&mut self, id: FrameId, joint: Joint) -> Result<(), KinError> {
        let frame = self.get(id)?;
        if frame.parent.is_none() {
            return Err(KinError::NoParent {
                id,
                name: frame.name.clone(),
            });
        }
        if frame.joint.is_some() {
            return Err(KinError::JointExists(frame.name.clone()));
        }
        joint.validate_limits(&frame.name)?;
        self.frames[id.0].joint = Some(joint);
        self.invalidate_q_layout();
        Ok(())
    }

    pub fn remove_joint(&mut self, id: FrameId) -> Result<Joint, KinError> {
        let frame = self.get_mut(id)?;
        let joint = frame
            .joint
            .take()
            .ok_or_else(|| KinError::NoJoint(frame.name.clone()))?;
        self.invalidate_q_layout();
        Ok(joint)
    }

    pub fn add_shape(&mut self, id: FrameId, shape: Shape) -> Result<(), KinError> {
        let frame = self.get_mut(id)?;
        if frame.shape.is_some() {
            return Err(KinError::ShapeExists(frame.name.clone()));
        }
        frame.shape = Some(shape);
        Ok(())
    }

    pub fn remove_shape(&mut self, id: FrameId) -> Result<Option<Shape>, KinError> {
        Ok(self.get_mut(id)?.shape.take())
    }

    pub fn add_inertia(&mut self, id: FrameId, inertia: Inertia) -> Result<(), KinError> {
        let frame = self.get_mut(id)?;
        if frame.inertia.is_some() {
            return Err(KinError::InertiaExists(frame.name.clone()));
        }
        frame.inertia = Some(inertia);
        Ok(())
    }

    pub fn remove_inertia(&mut self, id: FrameId) -> Result<Option<Inertia>, KinError> {
        Ok(self.get_mut(id)?.inertia.take())
    }

    // ============== Joint Edits ==============

    fn joint_mut(&mut self, id: FrameId) -> Result<&mut Joint, KinError> {
        let frame = self.get_mut(id)?;
        let name = &frame.name;
        frame
            .joint
            .as_mut()
            .ok_or_else(|| KinError::NoJoint(name.clone()))
    }

    /// Freeze a joint: it becomes rigid and consumes no coordinates
    pub fn make_rigid(&mut self, id: FrameId) -> Result<(), KinError> {
        self.set_joint_type(id, JointType::Rigid)
    }

    /// Change a joint's type; the reference coordinates are reset
    pub fn set_joint_type(&mut self, id: FrameId, joint_type: JointType) -> Result<(), KinError> {
        let joint = self.joint_mut(id)?;
        joint.joint_type = joint_type;
        joint.q0 = vec![0.0; joint_type.dim()];
        self.invalidate_q_layout();
        Ok(())
    }

    pub fn set_joint_active(&mut self, id: FrameId, active: bool) -> Result<(), KinError> {
        self.joint_mut(id)?.active = active;
        self.invalidate_q_layout();
        Ok(())
    }

    pub fn set_mimic(&mut self, id: FrameId, mimic: Option<Mimic>) -> Result<(), KinError> {
        self.joint_mut(id)?.mimic = mimic;
        self.invalidate_q_layout();
        Ok(())
    }

    /// Resolve every pending mimic name to the frame carrying that joint
    pub fn resolve_mimics(&mut self) -> Result<(), KinError> {
        let mut resolved = Vec::new();
        for frame in &self.frames {
            if let Some(Mimic::Pending(target)) = frame.joint.as_ref().and_then(|j| j.mimic.as_ref())
            {
                let id = self
                    .frame_by_name(target)
                    .filter(|f| f.joint.is_some() && f.id != frame.id)
                    .map(|f| f.id)
                    .ok_or_else(|| KinError::MimicUnresolved {
                        frame: frame.name.clone(),
                        target: target.clone(),
                    })?;
                resolved.push((frame.id, id));
            }
        }
        for (frame, target) in resolved {
            self.set_mimic(frame, Some(Mimic::Resolved(target)))?;
        }
        Ok(())
    }

    /// Drop the configuration layout; offsets are reassigned on next access
    pub fn invalidate_q_layout(&mut self) {
        if self.layout.valid {
            debug!("Configuration layout invalidated");
        }
        self.layout.invalidate(&mut self.frames);
    }

    pub fn is_q_layout_valid(&self) -> bool {
        self.layout.valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{DQuat, DVec3};

    fn chain() -> (World, FrameId, FrameId, FrameId) {
        let mut world = World::new();
        let base = world.add_frame("base");
        let arm = world.add_frame("arm");
        let hand = world.add_frame("hand");
        world.link_from(arm, base).unwrap();
        world.link_from(hand, arm).unwrap();
        world.add_joint(arm, Joint::new(JointType::HingeZ)).unwrap();
        world.add_joint(hand, Joint::new(JointType::TransX)).unwrap();
        (world, base, arm, hand)
    }

    #[test]
    fn test_ids_match_positions() {
        let (world, base, arm, hand) = chain();
        assert_eq!((base.0, arm.0, hand.0), (0, 1, 2));
        for (i, frame) in world.frames().iter().enumerate() {
            assert_eq!(frame.id().index(), i);
        }
    }

    #[test]
    fn test_link_rejects_second_parent_and_cycles() {
        let (mut world, base, arm, hand) = chain();
        assert!(matches!(
            world.link_from(hand, base),
            Err(KinError::AlreadyHasParent { .. })
        ));
        assert!(matches!(
            world.link_from(base, hand),
            Err(KinError::WouldCreateCycle { .. })
        ));
        assert!(matches!(
            world.link_from(base, base),
            Err(KinError::WouldCreateCycle { .. })
        ));
        assert_eq!(world.frame(arm).unwrap().children(), &[hand]);
    }

    #[test]
    fn test_unlink_drops_joint_and_resets_rel() {
        let (mut world, base, arm, _) = chain();
        world.frame_mut(arm).unwrap().rel = Transform::from_translation(DVec3::X);
        world.unlink(arm).unwrap();

        let frame = world.frame(arm).unwrap();
        assert!(frame.parent().is_none());
        assert!(frame.joint().is_none());
        assert!(frame.rel.is_identity(0.0));
        assert!(world.frame(base).unwrap().children().is_empty());
        assert!(matches!(world.unlink(arm), Err(KinError::NoParent { .. })));
    }

    #[test]
    fn test_single_attachment_per_frame() {
        let (mut world, base, arm, _) = chain();
        assert!(matches!(
            world.add_joint(arm, Joint::new(JointType::HingeX)),
            Err(KinError::JointExists(_))
        ));
        assert!(matches!(
            world.add_joint(base, Joint::new(JointType::HingeX)),
            Err(KinError::NoParent { .. })
        ));
        world.add_shape(base, Shape::default()).unwrap();
        assert!(matches!(
            world.add_shape(base, Shape::default()),
            Err(KinError::ShapeExists(_))
        ));
        world.add_inertia(base, Inertia::from_mass(1.0)).unwrap();
        assert!(matches!(
            world.add_inertia(base, Inertia::default()),
            Err(KinError::InertiaExists(_))
        ));
    }

    #[test]
    fn test_insert_pre_link_preserves_edge() {
        let (mut world, base, arm, hand) = chain();
        let q = Transform::new(DVec3::new(0.0, 0.0, 1.0), DQuat::from_rotation_z(0.4));
        world.frame_mut(arm).unwrap().rel = q;
        let a = Transform::new(DVec3::new(0.5, 0.0, 0.0), DQuat::from_rotation_x(0.2));

        let link = world.insert_pre_link(arm, a).unwrap();
        let new_frame = world.frame(link).unwrap();
        assert_eq!(new_frame.name, ">arm");
        assert_eq!(new_frame.parent(), Some(base));
        assert_eq!(new_frame.children(), &[arm]);
        assert_eq!(world.frame(base).unwrap().children(), &[link]);
        assert_eq!(world.frame(arm).unwrap().parent(), Some(link));
        assert_eq!(world.frame(arm).unwrap().children(), &[hand]);

        let composed = new_frame.rel * world.frame(arm).unwrap().rel;
        assert!(composed.approx_eq(&q, 1e-12));
        assert!(world.frame(arm).unwrap().joint().is_some());
    }

    #[test]
    fn test_insert_post_link_not_implemented() {
        let (mut world, _, arm, _) = chain();
        assert!(matches!(
            world.insert_post_link(arm, Transform::IDENTITY),
            Err(KinError::NotImplemented(_))
        ));
        assert_eq!(world.frame_count(), 3);
    }

    #[test]
    fn test_copy_frame_requires_parent_for_joint() {
        let (mut world, base, arm, _) = chain();
        assert!(matches!(
            world.duplicate_frame(arm, None),
            Err(KinError::NoParent { .. })
        ));
        let copy = world.duplicate_frame(arm, Some(base)).unwrap();
        let frame = world.frame(copy).unwrap();
        assert_eq!(frame.name, "arm");
        assert!(frame.children().is_empty());
        assert_eq!(frame.joint().unwrap().joint_type(), JointType::HingeZ);
        assert!(!world.is_q_layout_valid());

        let root_copy = world.duplicate_frame(base, None).unwrap();
        assert!(world.frame(root_copy).unwrap().is_root());
    }

    #[test]
    fn test_joint_edits_invalidate_layout() {
        let (mut world, _, arm, hand) = chain();
        world.ensure_q_layout();
        assert!(world.is_q_layout_valid());
        assert_eq!(world.frame(hand).unwrap().joint().unwrap().q_index(), Some(1));

        world.make_rigid(arm).unwrap();
        assert!(!world.is_q_layout_valid());
        assert!(world.frame(hand).unwrap().joint().unwrap().q_index().is_none());
        assert_eq!(world.q_dim(), 1);
        assert_eq!(world.frame(hand).unwrap().joint().unwrap().q_index(), Some(0));

        world.remove_joint(hand).unwrap();
        assert!(!world.is_q_layout_valid());
        assert_eq!(world.q_dim(), 0);
    }

    #[test]
    fn test_destroy_mimic_target_leaves_pending_name() {
        let (mut world, _, arm, hand) = chain();
        world.set_mimic(hand, Some(Mimic::Resolved(arm))).unwrap();
        world.destroy_frame(arm).unwrap();
        // hand lost its parent edge and with it the joint
        assert!(world.frame(FrameId(1)).unwrap().joint().is_none());

        let (mut world, base, arm, hand) = chain();
        let other = world.add_frame("other");
        world.link_from(other, base).unwrap();
        world
            .add_joint(other, Joint::builder(JointType::HingeZ).mimic(hand).build())
            .unwrap();
        world.destroy_frame(hand).unwrap();
        let other = world.frame(FrameId(2)).unwrap();
        assert_eq!(other.name, "other");
        assert_eq!(
            other.joint().unwrap().mimic(),
            Some(&Mimic::Pending("hand".into()))
        );
        assert!(world.frame(arm).unwrap().children().is_empty());
    }

    #[test]
    fn test_world_clone_is_independent() {
        let (world, _, arm, _) = chain();
        let mut copy = world.clone();
        copy.make_rigid(arm).unwrap();
        assert_eq!(
            world.frame(arm).unwrap().joint().unwrap().joint_type(),
            JointType::HingeZ
        );
        assert_eq!(copy.frame_count(), world.frame_count());
    }
}
