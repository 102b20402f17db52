//! Scene-node contract consumed by kinematic bodies.
//!
//! The rendering scene graph lives outside this core. Bodies only need to ask
//! the node they are attached under for its model-to-world transform, which
//! is treated as a cheap, always-current query.

use std::cell::Cell;

use nalgebra::{Isometry3, Matrix4, Point3, UnitQuaternion, Vector3};

/// Anything that can report a current model-to-world transform.
pub trait SceneNode {
    /// Model-to-world transform of this node.
    fn global_transform(&self) -> Matrix4<f64>;
}

/// A scene node whose transform is set explicitly.
///
/// Useful as a parent frame for bodies in headless simulations and tests.
///
/// # Example
///
/// ```
/// use sim_types::{FixedNode, SceneNode};
/// use nalgebra::Isometry3;
///
/// let node = FixedNode::new(Isometry3::translation(1.0, 0.0, 0.0).to_homogeneous());
/// node.set_transform(Isometry3::translation(0.0, 2.0, 0.0).to_homogeneous());
/// assert_eq!(node.global_transform()[(1, 3)], 2.0);
/// ```
#[derive(Debug)]
pub struct FixedNode {
    transform: Cell<Matrix4<f64>>,
}

impl Default for FixedNode {
    fn default() -> Self {
        Self::new(Matrix4::identity())
    }
}

impl FixedNode {
    /// Create a node with the given model-to-world transform.
    #[must_use]
    pub fn new(transform: Matrix4<f64>) -> Self {
        Self {
            transform: Cell::new(transform),
        }
    }

    /// Replace the node's transform.
    pub fn set_transform(&self, transform: Matrix4<f64>) {
        self.transform.set(transform);
    }
}

impl SceneNode for FixedNode {
    fn global_transform(&self) -> Matrix4<f64> {
        self.transform.get()
    }
}

/// Rotation part of a homogeneous transform.
///
/// The upper 3x3 block is orthonormalized first, so transforms carrying a
/// uniform scale still yield a proper rotation.
#[must_use]
pub fn frame_rotation(transform: &Matrix4<f64>) -> UnitQuaternion<f64> {
    let linear = transform.fixed_view::<3, 3>(0, 0).into_owned();
    UnitQuaternion::from_matrix(&linear)
}

/// Translation part of a homogeneous transform.
#[must_use]
pub fn frame_origin(transform: &Matrix4<f64>) -> Point3<f64> {
    Point3::new(transform[(0, 3)], transform[(1, 3)], transform[(2, 3)])
}

/// Rigid (rotation + translation) approximation of a homogeneous transform.
#[must_use]
pub fn frame_isometry(transform: &Matrix4<f64>) -> Isometry3<f64> {
    let origin = frame_origin(transform);
    Isometry3::from_parts(
        Vector3::new(origin.x, origin.y, origin.z).into(),
        frame_rotation(transform),
    )
}
