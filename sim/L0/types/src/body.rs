//! Kinematic body state.
//!
//! A [`KinematicBody`] carries the motion state of one rigid entity: position,
//! orientation, linear velocity, and angular velocity expressed as an axis and
//! a degrees-per-second magnitude. Motion models and collision resolvers
//! mutate it once per tick; nothing here propagates to a rendering
//! representation.

use std::fmt;
use std::rc::Rc;

use nalgebra::{Isometry3, Matrix4, Point3, Translation3, UnitQuaternion, Vector3};
use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::claim::ClaimToken;
use crate::scene::SceneNode;
use crate::{Result, SimError};

/// Axis norms below this are treated as "no axis".
const AXIS_EPSILON: f64 = 1e-12;

/// Unique identifier for a body in the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyId(pub u64);

impl BodyId {
    /// Create a new body ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for BodyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

/// Angular velocity as a rotation axis and a speed in degrees per second.
///
/// The axis is unit length whenever the speed is nonzero. A degenerate axis
/// collapses the whole velocity to zero.
///
/// # Example
///
/// ```
/// use sim_types::AngularVelocity;
/// use nalgebra::Vector3;
///
/// let omega = AngularVelocity::new(Vector3::new(0.0, 0.0, 2.0), 90.0);
/// assert_eq!(omega.axis(), Vector3::z());
/// assert_eq!(omega.degrees_per_second(), 90.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AngularVelocity {
    axis: Vector3<f64>,
    degrees_per_second: f64,
}

impl Default for AngularVelocity {
    fn default() -> Self {
        Self::zero()
    }
}

impl AngularVelocity {
    /// Create an angular velocity, normalizing the axis.
    #[must_use]
    pub fn new(axis: Vector3<f64>, degrees_per_second: f64) -> Self {
        let norm = axis.norm();
        if norm < AXIS_EPSILON || !norm.is_finite() || !degrees_per_second.is_finite() {
            return Self::zero();
        }
        Self {
            axis: axis / norm,
            degrees_per_second,
        }
    }

    /// No rotation.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            axis: Vector3::zeros(),
            degrees_per_second: 0.0,
        }
    }

    /// Build from a rotation vector in degrees per second.
    #[must_use]
    pub fn from_vector(degrees: Vector3<f64>) -> Self {
        Self::new(degrees, degrees.norm())
    }

    /// Rotation axis (unit length, or zero when not rotating).
    #[must_use]
    pub fn axis(&self) -> Vector3<f64> {
        self.axis
    }

    /// Rotation speed in degrees per second.
    #[must_use]
    pub fn degrees_per_second(&self) -> f64 {
        self.degrees_per_second
    }

    /// Rotation vector in degrees per second (`axis * speed`).
    #[must_use]
    pub fn as_vector(&self) -> Vector3<f64> {
        self.axis * self.degrees_per_second
    }

    /// Rotation vector in radians per second.
    #[must_use]
    pub fn as_radians(&self) -> Vector3<f64> {
        self.axis * self.degrees_per_second.to_radians()
    }

    /// Whether the body is rotating at all.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.degrees_per_second == 0.0
    }

    /// Vector sum of two angular velocities.
    #[must_use]
    pub fn combine(&self, other: &Self) -> Self {
        Self::from_vector(self.as_vector() + other.as_vector())
    }
}

/// Motion state of one rigid entity.
///
/// The body's local frame is placed in the world by its owning
/// [`SceneNode`], if any. Rotation pivots about `center_of_mass`, so the
/// local transform is `T(position) * T(c) * R * T(-c)`.
///
/// # Example
///
/// ```
/// use sim_types::KinematicBody;
/// use nalgebra::Vector3;
///
/// let mut body = KinematicBody::default();
/// body.set_velocity(Vector3::new(1.0, 0.0, 0.0));
/// body.update(0.5).unwrap();
/// assert_eq!(body.position(), Vector3::new(0.5, 0.0, 0.0));
/// ```
pub struct KinematicBody {
    id: BodyId,
    position: Vector3<f64>,
    orientation: UnitQuaternion<f64>,
    linear_velocity: Vector3<f64>,
    angular_velocity: AngularVelocity,
    center_of_mass: Vector3<f64>,
    inertia: bool,
    node: Option<Rc<dyn SceneNode>>,
    claim: Option<ClaimToken>,
}

impl Default for KinematicBody {
    fn default() -> Self {
        Self::new(BodyId::default())
    }
}

impl fmt::Debug for KinematicBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KinematicBody")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("orientation", &self.orientation)
            .field("linear_velocity", &self.linear_velocity)
            .field("angular_velocity", &self.angular_velocity)
            .field("center_of_mass", &self.center_of_mass)
            .field("inertia", &self.inertia)
            .field("attached", &self.node.is_some())
            .field("holds_claim", &self.claim.is_some())
            .finish()
    }
}

impl KinematicBody {
    /// Create a body at rest at the origin.
    #[must_use]
    pub fn new(id: BodyId) -> Self {
        Self {
            id,
            position: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: AngularVelocity::zero(),
            center_of_mass: Vector3::zeros(),
            inertia: true,
            node: None,
            claim: None,
        }
    }

    /// Attach the body under a scene node.
    #[must_use]
    pub fn with_node(mut self, node: Rc<dyn SceneNode>) -> Self {
        self.node = Some(node);
        self
    }

    /// Set the initial position.
    #[must_use]
    pub fn with_position(mut self, position: Vector3<f64>) -> Self {
        self.position = position;
        self
    }

    /// Set the initial orientation.
    #[must_use]
    pub fn with_orientation(mut self, orientation: UnitQuaternion<f64>) -> Self {
        self.set_orientation(orientation);
        self
    }

    /// Body identifier.
    #[must_use]
    pub fn id(&self) -> BodyId {
        self.id
    }

    /// Owning scene node, if attached.
    #[must_use]
    pub fn node(&self) -> Option<&Rc<dyn SceneNode>> {
        self.node.as_ref()
    }

    /// Attach to (or detach from) a scene node.
    pub fn set_node(&mut self, node: Option<Rc<dyn SceneNode>>) {
        self.node = node;
    }

    // =========================================================================
    // Position and orientation
    // =========================================================================

    /// Current position in the parent frame.
    #[must_use]
    pub fn position(&self) -> Vector3<f64> {
        self.position
    }

    /// Replace the position.
    pub fn set_position(&mut self, position: Vector3<f64>) {
        self.position = position;
    }

    /// Add `delta` to the position.
    pub fn modify_position(&mut self, delta: Vector3<f64>) {
        self.position += delta;
    }

    /// Current orientation.
    #[must_use]
    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.orientation
    }

    /// Replace the orientation (renormalized).
    pub fn set_orientation(&mut self, orientation: UnitQuaternion<f64>) {
        self.orientation = UnitQuaternion::new_normalize(orientation.into_inner());
    }

    /// Apply `delta` after the current orientation (`orientation * delta`).
    pub fn modify_orientation(&mut self, delta: UnitQuaternion<f64>) {
        self.set_orientation(self.orientation * delta);
    }

    /// Apply `delta` before the current orientation (`delta * orientation`).
    ///
    /// Constraint-based motion uses this to apply a world-space correction
    /// ahead of the body's own local rotation.
    pub fn pre_modify_orientation(&mut self, delta: UnitQuaternion<f64>) {
        self.set_orientation(delta * self.orientation);
    }

    /// Rotation pivot in local coordinates.
    #[must_use]
    pub fn center_of_mass(&self) -> Vector3<f64> {
        self.center_of_mass
    }

    /// Set the rotation pivot in local coordinates.
    pub fn set_center_of_mass(&mut self, center: Vector3<f64>) {
        self.center_of_mass = center;
    }

    // =========================================================================
    // Velocities
    // =========================================================================

    /// Current linear velocity.
    #[must_use]
    pub fn velocity(&self) -> Vector3<f64> {
        self.linear_velocity
    }

    /// Current linear speed.
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.linear_velocity.norm()
    }

    /// Replace the linear velocity.
    pub fn set_velocity(&mut self, velocity: Vector3<f64>) {
        self.linear_velocity = velocity;
    }

    /// Add `delta` to the linear velocity.
    pub fn modify_velocity(&mut self, delta: Vector3<f64>) {
        self.linear_velocity += delta;
    }

    /// Current angular velocity.
    #[must_use]
    pub fn angular_velocity(&self) -> AngularVelocity {
        self.angular_velocity
    }

    /// Replace the angular velocity. The axis is normalized on write.
    pub fn set_angular_velocity(&mut self, axis: Vector3<f64>, degrees_per_second: f64) {
        self.angular_velocity = AngularVelocity::new(axis, degrees_per_second);
    }

    /// Add a rotation to the current angular velocity (vector sum).
    pub fn modify_angular_velocity(&mut self, axis: Vector3<f64>, degrees_per_second: f64) {
        self.angular_velocity = self
            .angular_velocity
            .combine(&AngularVelocity::new(axis, degrees_per_second));
    }

    // =========================================================================
    // Inertia and integration
    // =========================================================================

    /// Keep velocities between updates.
    pub fn enable_inertia(&mut self) {
        self.inertia = true;
    }

    /// Zero velocities after every update, so each velocity acts for one tick.
    pub fn disable_inertia(&mut self) {
        self.inertia = false;
    }

    /// Whether velocities persist across updates.
    #[must_use]
    pub fn is_inertia_enabled(&self) -> bool {
        self.inertia
    }

    /// Integrate both velocities over `dt` seconds.
    pub fn update(&mut self, dt: f64) -> Result<()> {
        Self::check_timestep(dt)?;
        self.position += self.linear_velocity * dt;
        self.integrate_rotation(dt);
        self.finish_update();
        Ok(())
    }

    /// Integrate only the angular velocity over `dt` seconds.
    ///
    /// Used when a collision resolver has already advanced the body's
    /// translation for this tick.
    pub fn update_angular(&mut self, dt: f64) -> Result<()> {
        Self::check_timestep(dt)?;
        self.integrate_rotation(dt);
        self.finish_update();
        Ok(())
    }

    fn check_timestep(dt: f64) -> Result<()> {
        if !dt.is_finite() || dt < 0.0 {
            warn!(dt, "rejecting kinematic update with invalid timestep");
            return Err(SimError::InvalidTimestep(dt));
        }
        Ok(())
    }

    fn integrate_rotation(&mut self, dt: f64) {
        if self.angular_velocity.is_zero() {
            return;
        }
        let delta = UnitQuaternion::from_scaled_axis(self.angular_velocity.as_radians() * dt);
        self.pre_modify_orientation(delta);
    }

    fn finish_update(&mut self) {
        if !self.inertia {
            self.linear_velocity = Vector3::zeros();
            self.angular_velocity = AngularVelocity::zero();
        }
    }

    // =========================================================================
    // Transforms
    // =========================================================================

    /// Local transform as an isometry (rotation about the center of mass).
    #[must_use]
    pub fn local_isometry(&self) -> Isometry3<f64> {
        let c = self.center_of_mass;
        let translation = self.position + c - self.orientation * c;
        Isometry3::from_parts(Translation3::from(translation), self.orientation)
    }

    /// Model-to-world transform: owning node transform times local transform.
    #[must_use]
    pub fn global_transform(&self) -> Matrix4<f64> {
        let local = self.local_isometry().to_homogeneous();
        match &self.node {
            Some(node) => node.global_transform() * local,
            None => local,
        }
    }

    /// World position of a point given in the body's local frame.
    #[must_use]
    pub fn world_point(&self, local: &Point3<f64>) -> Point3<f64> {
        self.global_transform().transform_point(local)
    }

    // =========================================================================
    // Claims
    // =========================================================================

    /// Hold a claim for as long as this body lives (or until released).
    ///
    /// Any previously held claim is released.
    pub fn hold_claim(&mut self, token: ClaimToken) {
        self.claim = Some(token);
    }

    /// Release the held claim, if any.
    pub fn release_claim(&mut self) {
        self.claim = None;
    }

    /// Whether the body currently holds a claim.
    ///
    /// A token whose claim was unlocked out from under it no longer counts.
    #[must_use]
    pub fn holds_claim(&self) -> bool {
        self.claim.as_ref().is_some_and(ClaimToken::is_current)
    }

    /// Check if any state contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|x| x.is_finite())
            && self.orientation.coords.iter().all(|x| x.is_finite())
            && self.linear_velocity.iter().all(|x| x.is_finite())
            && self.angular_velocity.degrees_per_second.is_finite()
    }
}
