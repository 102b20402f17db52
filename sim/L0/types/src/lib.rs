//! Core types for the collision/motion layer.
//!
//! This crate provides the state and contracts shared by the collision and
//! motion crates:
//!
//! - [`KinematicBody`] - Position, orientation, and velocities of one rigid entity
//! - [`AngularVelocity`] - Axis + degrees-per-second angular velocity
//! - [`SceneNode`] - Model-to-world transform contract of the owning scene node
//! - [`ClaimFlag`] / [`ClaimToken`] - Advisory single-owner claims
//! - [`SimError`] - Configuration and collaborator errors
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. The scene graph,
//! renderers, and device drivers are reached only through the traits defined
//! here and in `cf-spatial`.
//!
//! # Coordinate System
//!
//! Consistent with the CortenForge ecosystem:
//!
//! - X: right
//! - Y: forward
//! - Z: up
//! - Right-handed
//!
//! # Example
//!
//! ```
//! use sim_types::{BodyId, KinematicBody};
//! use nalgebra::Vector3;
//!
//! let mut body = KinematicBody::new(BodyId::new(1));
//! body.set_velocity(Vector3::new(0.0, 2.0, 0.0));
//! body.set_angular_velocity(Vector3::z(), 45.0);
//! body.update(0.25).unwrap();
//!
//! assert_eq!(body.position().y, 0.5);
//! assert!(body.orientation().angle() > 0.0);
//! ```

#![doc(html_root_url = "https://docs.rs/sim-types/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod body;
mod claim;
mod error;
mod scene;

pub use body::{AngularVelocity, BodyId, KinematicBody};
pub use claim::{ClaimFlag, ClaimToken};
pub use error::SimError;
pub use scene::{FixedNode, SceneNode, frame_isometry, frame_origin, frame_rotation};

// Re-export math types for convenience
pub use nalgebra::{Isometry3, Matrix4, Point3, UnitQuaternion, Vector3};

/// Shared, interiorly mutable body handle used by chains and avatars.
pub type SharedBody = std::rc::Rc<std::cell::RefCell<KinematicBody>>;

/// Result type for collision/motion operations.
pub type Result<T> = std::result::Result<T, SimError>;
