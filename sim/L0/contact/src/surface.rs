//! Bounding surfaces: posed primitives owned by a bounding volume.

use std::cell::Cell;

use cf_spatial::{Aabb, Shape, SpatialError};
use nalgebra::{Isometry3, Translation3, Vector3};

/// One collision primitive of a [`BoundingVolume`](crate::BoundingVolume).
///
/// `local` places the shape in the model frame. `offset` is the model-space
/// position of the body's mass-center origin as last seen by this surface;
/// the surface's pose in the body frame is `local` shifted by `-offset`.
/// Surfaces are shared as `Rc<BoundingSurface>` (for example with a debug
/// renderer), so the offset is interior-mutable. A surface sits in at most
/// one volume at a time.
#[derive(Debug)]
pub struct BoundingSurface {
    shape: Shape,
    local: Isometry3<f64>,
    offset: Cell<Vector3<f64>>,
    attached: Cell<bool>,
}

impl BoundingSurface {
    /// Creates a surface at `local` in the model frame.
    ///
    /// # Errors
    ///
    /// Returns the shape's validation error if it is degenerate.
    pub fn new(shape: Shape, local: Isometry3<f64>) -> Result<Self, SpatialError> {
        shape.validate()?;
        Ok(Self {
            shape,
            local,
            offset: Cell::new(Vector3::zeros()),
            attached: Cell::new(false),
        })
    }

    /// Surface centered on the model origin.
    ///
    /// # Errors
    ///
    /// Returns the shape's validation error if it is degenerate.
    pub fn at_origin(shape: Shape) -> Result<Self, SpatialError> {
        Self::new(shape, Isometry3::identity())
    }

    /// The primitive.
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Pose in the model frame.
    #[must_use]
    pub fn local_pose(&self) -> Isometry3<f64> {
        self.local
    }

    /// Current mass-center offset.
    #[must_use]
    pub fn offset(&self) -> Vector3<f64> {
        self.offset.get()
    }

    /// Whether some volume currently holds this surface.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    /// Mark the surface as held by a volume. Returns `false` if it already was.
    pub(crate) fn attach(&self) -> bool {
        !self.attached.replace(true)
    }

    pub(crate) fn detach(&self) {
        self.attached.set(false);
    }

    /// Rebase the offset by `delta`.
    pub(crate) fn shift_offset(&self, delta: Vector3<f64>) {
        self.offset.set(self.offset.get() + delta);
    }

    /// Pose relative to the body's mass-center frame.
    #[must_use]
    pub fn body_pose(&self) -> Isometry3<f64> {
        Translation3::from(-self.offset.get()) * self.local
    }

    /// World pose given the body frame's world pose.
    #[must_use]
    pub fn world_pose(&self, body: &Isometry3<f64>) -> Isometry3<f64> {
        body * self.body_pose()
    }

    /// World bounds given the body frame's world pose.
    #[must_use]
    pub fn world_aabb(&self, body: &Isometry3<f64>) -> Aabb {
        self.shape.aabb(&self.world_pose(body))
    }
}
