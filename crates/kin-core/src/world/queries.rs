//! Query methods for World

use super::joint::Joint;
use super::{Frame, FrameId, World};

impl World {
    // ============== Query Helpers ==============

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Find the first frame with the given name
    pub fn frame_by_name(&self, name: &str) -> Option<&Frame> {
        self.frames.iter().find(|f| f.name == name)
    }

    /// Find the ID of the first frame with the given name
    pub fn frame_id(&self, name: &str) -> Option<FrameId> {
        self.frame_by_name(name).map(|f| f.id)
    }

    /// Get a frame's name by ID
    pub fn frame_name(&self, id: FrameId) -> Option<&str> {
        self.frame(id).map(|f| f.name.as_str())
    }

    /// Get all root frames (frames without parents) in ID order
    pub fn roots(&self) -> Vec<FrameId> {
        self.frames
            .iter()
            .filter(|f| f.parent.is_none())
            .map(|f| f.id)
            .collect()
    }

    /// Get the children of a frame (empty for unknown IDs)
    pub fn children(&self, id: FrameId) -> &[FrameId] {
        self.frame(id).map(|f| f.children()).unwrap_or(&[])
    }

    pub fn parent(&self, id: FrameId) -> Option<FrameId> {
        self.frame(id).and_then(|f| f.parent)
    }

    /// Get the chain of frame IDs from a frame to its root (empty for unknown IDs)
    pub fn chain_to_root(&self, id: FrameId) -> Vec<FrameId> {
        let mut chain = Vec::new();
        let mut current = self.frame(id).map(|f| f.id);
        while let Some(id) = current {
            if chain.len() > self.frames.len() {
                break;
            }
            chain.push(id);
            current = self.parent(id);
        }
        chain
    }

    /// Get the joint connecting a frame to its parent
    pub fn joint(&self, id: FrameId) -> Option<&Joint> {
        self.frame(id).and_then(|f| f.joint())
    }

    /// All joints with the ID of their frame, in ID order
    pub fn joints(&self) -> impl Iterator<Item = (FrameId, &Joint)> {
        self.frames
            .iter()
            .filter_map(|f| f.joint().map(|j| (f.id, j)))
    }

    pub fn joint_count(&self) -> usize {
        self.joints().count()
    }

    /// All frames in depth-first order from the roots
    pub fn frames_depth_first(&self) -> Vec<FrameId> {
        let mut result = Vec::with_capacity(self.frames.len());
        let mut stack = self.roots();
        stack.reverse();
        while let Some(id) = stack.pop() {
            result.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use crate::world::{FrameId, Joint, JointType, World};

    #[test]
    fn test_tree_queries() {
        let mut world = World::new();
        let a = world.add_frame("a");
        let b = world.add_frame("b");
        let c = world.add_frame("c");
        let d = world.add_frame("d");
        world.link_from(c, a).unwrap();
        world.link_from(b, c).unwrap();
        world.add_joint(b, Joint::new(JointType::HingeX)).unwrap();

        assert_eq!(world.roots(), vec![a, d]);
        assert_eq!(world.chain_to_root(b), vec![b, c, a]);
        assert!(world.chain_to_root(FrameId(9)).is_empty());
        assert_eq!(world.frame_id("c"), Some(c));
        assert_eq!(world.frame_name(d), Some("d"));
        assert_eq!(world.children(a), &[c]);
        assert_eq!(world.parent(b), Some(c));
        assert_eq!(world.joints().map(|(id, _)| id).collect::<Vec<_>>(), vec![b]);
        assert_eq!(world.frames_depth_first(), vec![a, c, b, d]);
    }
}
