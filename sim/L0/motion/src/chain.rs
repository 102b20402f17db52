//! Serial chains of kinematic bodies.
//!
//! Joint `0` is the root. Its frame is the body's full model-to-world
//! transform. Every later joint sits at the tip of its parent's offset and
//! contributes only its orientation:
//!
//! ```text
//! frame[0]     = global(root)
//! frame[i + 1] = frame[i] * T(offset[i]) * R(orientation[i + 1])
//! tip          = frame[n - 1] * offset[n - 1]
//! ```

use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion, Vector3};
use sim_types::{Result, SharedBody, SimError, frame_isometry, frame_rotation};

/// One link of an [`ArticulatedChain`].
#[derive(Debug, Clone)]
pub struct ChainJoint {
    /// Body whose orientation drives this joint.
    pub body: SharedBody,
    /// Vector from this joint to the next one, in the joint's frame.
    pub offset: Vector3<f64>,
}

impl ChainJoint {
    /// Creates a joint.
    #[must_use]
    pub fn new(body: SharedBody, offset: Vector3<f64>) -> Self {
        Self { body, offset }
    }
}

/// A root-to-tip sequence of joints.
#[derive(Debug, Clone)]
pub struct ArticulatedChain {
    joints: Vec<ChainJoint>,
}

impl ArticulatedChain {
    /// Creates a chain.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`] for an empty joint list.
    pub fn new(joints: Vec<ChainJoint>) -> Result<Self> {
        if joints.is_empty() {
            return Err(SimError::invalid_config("articulated chain needs a joint"));
        }
        Ok(Self { joints })
    }

    /// Number of joints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// Always false; chains hold at least one joint.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Joints from root to tip.
    #[must_use]
    pub fn joints(&self) -> &[ChainJoint] {
        &self.joints
    }

    /// World frame of every joint.
    #[must_use]
    pub fn frames(&self) -> Vec<Isometry3<f64>> {
        let mut frames = Vec::with_capacity(self.joints.len());
        let mut frame = frame_isometry(&self.joints[0].body.borrow().global_transform());
        frames.push(frame);
        for pair in self.joints.windows(2) {
            let orientation = pair[1].body.borrow().orientation();
            frame = frame * Translation3::from(pair[0].offset) * orientation;
            frames.push(frame);
        }
        frames
    }

    /// World positions of every joint followed by the tip.
    #[must_use]
    pub fn joint_positions(&self) -> Vec<Point3<f64>> {
        let frames = self.frames();
        let mut positions: Vec<Point3<f64>> = frames
            .iter()
            .map(|frame| Point3::from(frame.translation.vector))
            .collect();
        positions.push(self.tip_of(&frames));
        positions
    }

    /// World position of the chain's tip.
    #[must_use]
    pub fn end_effector(&self) -> Point3<f64> {
        self.tip_of(&self.frames())
    }

    /// Rotation of the frame joint `index` is expressed in.
    pub(crate) fn parent_rotation(&self, index: usize, frames: &[Isometry3<f64>]) -> UnitQuaternion<f64> {
        if index == 0 {
            return self.joints[0]
                .body
                .borrow()
                .node()
                .map_or_else(UnitQuaternion::identity, |node| {
                    frame_rotation(&node.global_transform())
                });
        }
        frames[index - 1].rotation
    }

    fn tip_of(&self, frames: &[Isometry3<f64>]) -> Point3<f64> {
        let last = self.joints.len() - 1;
        frames[last] * Point3::from(self.joints[last].offset)
    }
}
