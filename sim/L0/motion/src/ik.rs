//! Cyclic coordinate descent over an [`ArticulatedChain`].

use nalgebra::{Point3, UnitQuaternion};
use sim_types::Result;
use tracing::trace;

use crate::chain::ArticulatedChain;
use crate::config::IkConfig;

/// Vectors shorter than this give no usable rotation.
const MIN_LEVER: f64 = 1e-4;

/// Result of an IK solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkResult {
    /// Whether the tip ended within tolerance of the target.
    pub reached: bool,
    /// Final tip-to-target distance.
    pub distance: f64,
    /// Sweeps used.
    pub iterations: u32,
}

/// CCD solver. Rotates joints from tip to root, each one turning the tip
/// toward the target.
#[derive(Debug, Clone, Default)]
pub struct InverseKinematics {
    config: IkConfig,
}

impl InverseKinematics {
    /// Creates a solver.
    ///
    /// # Errors
    ///
    /// Returns the validation error if `config` is invalid.
    pub fn new(config: IkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Solver limits.
    #[must_use]
    pub fn config(&self) -> &IkConfig {
        &self.config
    }

    /// Rotate the chain's joints so its tip moves toward `target`.
    ///
    /// Joint orientations are written through each joint's shared body.
    /// Every joint, the root included, may rotate about its pivot; no joint
    /// position is ever written, so the root pivot stays where it is.
    pub fn reach_for_point(&self, chain: &ArticulatedChain, target: &Point3<f64>) -> IkResult {
        let mut iterations = 0;
        let mut distance = (chain.end_effector() - target).norm();

        while iterations < self.config.max_iterations && distance > self.config.tolerance {
            iterations += 1;

            for index in (0..chain.len()).rev() {
                let frames = chain.frames();
                let pivot = Point3::from(frames[index].translation.vector);
                let tip = chain.end_effector();
                let to_tip = tip - pivot;
                let to_target = target - pivot;
                if to_tip.norm() < MIN_LEVER || to_target.norm() < MIN_LEVER {
                    continue;
                }
                let Some(world) = UnitQuaternion::rotation_between(&to_tip, &to_target) else {
                    continue;
                };

                // World rotation expressed in the joint's parent frame.
                let parent = chain.parent_rotation(index, &frames);
                let local = parent.inverse() * world * parent;
                chain.joints()[index]
                    .body
                    .borrow_mut()
                    .pre_modify_orientation(local);
            }

            distance = (chain.end_effector() - target).norm();
            trace!(iterations, distance, "ik sweep");
        }

        IkResult {
            reached: distance <= self.config.tolerance,
            distance,
            iterations,
        }
    }
}
