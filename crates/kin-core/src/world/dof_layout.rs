//! Cached layout of the configuration vector

use super::frame::Frame;

/// Configuration layout (computed on demand)
///
/// Offsets themselves live on the joints (`Joint::q_index`); this records
/// whether they are current and how long the vector is.
#[derive(Debug, Clone, Default, PartialEq)]
pub(super) struct DofLayout {
    /// Length of the configuration vector
    pub q_dim: usize,
    /// Whether the joint offsets are valid
    pub valid: bool,
}

impl DofLayout {
    /// Drop the layout and clear every joint offset
    pub fn invalidate(&mut self, frames: &mut [Frame]) {
        self.valid = false;
        self.q_dim = 0;
        for joint in frames.iter_mut().filter_map(|f| f.joint.as_mut()) {
            joint.q_index = None;
        }
    }

    /// Assign offsets to active, non-mimic joints in frame-ID order
    pub fn rebuild(&mut self, frames: &mut [Frame]) {
        let mut offset = 0;
        for joint in frames.iter_mut().filter_map(|f| f.joint.as_mut()) {
            if joint.active && joint.mimic.is_none() {
                joint.q_index = Some(offset);
                offset += joint.dim();
            } else {
                joint.q_index = None;
            }
        }
        self.q_dim = offset;
        self.valid = true;
    }
}
