//! Frame: node of the kinematic tree

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::inertia::Inertia;
use crate::shape::Shape;
use crate::transform::Transform;

use super::FrameId;
use super::joint::{Joint, Mimic};

/// A node in the kinematic tree
///
/// Topology (`parent`, `children`) and the attachments are edited through
/// [`World`](super::World), which keeps IDs, links and the configuration
/// layout consistent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub(crate) id: FrameId,
    pub name: String,
    pub(crate) parent: Option<FrameId>,
    pub(crate) children: Vec<FrameId>,
    /// Pose relative to the parent (Q)
    pub rel: Transform,
    /// Global pose (X)
    pub pose: Transform,
    pub active: bool,
    /// Uninterpreted model attributes
    pub attributes: BTreeMap<String, String>,
    pub(crate) joint: Option<Joint>,
    pub(crate) shape: Option<Shape>,
    pub(crate) inertia: Option<Inertia>,
}

impl Frame {
    pub(crate) fn new(id: FrameId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            children: Vec::new(),
            rel: Transform::IDENTITY,
            pose: Transform::IDENTITY,
            active: true,
            attributes: BTreeMap::new(),
            joint: None,
            shape: None,
            inertia: None,
        }
    }

    /// Copy of `template` without links; the joint is handled by the caller
    pub(crate) fn from_template(id: FrameId, template: &Frame) -> Self {
        Self {
            id,
            name: template.name.clone(),
            parent: None,
            children: Vec::new(),
            rel: template.rel,
            pose: template.pose,
            active: template.active,
            attributes: template.attributes.clone(),
            joint: None,
            shape: template.shape.clone(),
            inertia: template.inertia.clone(),
        }
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn parent(&self) -> Option<FrameId> {
        self.parent
    }

    pub fn children(&self) -> &[FrameId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn joint(&self) -> Option<&Joint> {
        self.joint.as_ref()
    }

    /// Mutable joint access; layout-relevant fields stay behind `World` setters
    pub fn joint_mut(&mut self) -> Option<&mut Joint> {
        self.joint.as_mut()
    }

    pub fn shape(&self) -> Option<&Shape> {
        self.shape.as_ref()
    }

    pub fn shape_mut(&mut self) -> Option<&mut Shape> {
        self.shape.as_mut()
    }

    pub fn inertia(&self) -> Option<&Inertia> {
        self.inertia.as_ref()
    }

    pub fn inertia_mut(&mut self) -> Option<&mut Inertia> {
        self.inertia.as_mut()
    }

    /// Shift every ID reference after the frame at `removed` left the arena
    pub(super) fn remap_after_removal(&mut self, removed: FrameId) {
        let shift = |id: FrameId| if id > removed { FrameId(id.0 - 1) } else { id };
        self.id = shift(self.id);
        self.parent = self.parent.map(shift);
        for child in &mut self.children {
            *child = shift(*child);
        }
        if let Some(Mimic::Resolved(target)) =
            self.joint.as_mut().and_then(|j| j.mimic.as_mut())
        {
            *target = shift(*target);
        }
    }
}
