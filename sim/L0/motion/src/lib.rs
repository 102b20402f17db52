//! Collision resolution for moving bodies.
//!
//! This crate turns intersection queries into motion corrections:
//!
//! - [`CollisionResolver`] - Samples [`HotPoints`] along a body's travel and
//!   stops, slides, bounces, or renders a force ([`CollisionMode`])
//! - [`ArticulatedCollision`] - Sweeps an [`ArticulatedChain`] and corrects
//!   the first contact with [`InverseKinematics`]
//! - [`HapticDevice`] - Output contract for force feedback
//!
//! Geometry is reached only through [`cf_spatial::SpatialIntersector`]. Bodies
//! are [`sim_types::KinematicBody`] values, driven by one motion model and at
//! most one resolver per tick; [`CollisionResolver::update_claimed`] enforces
//! that with a volume's claim flag.
//!
//! # Pass Loop
//!
//! ```text
//! remaining = speed * dt
//! repeat up to max_passes:
//!     sample hot points along direction, reduce to the nearest contact
//!     advance by the allowed distance
//!     no contact   -> done
//!     contact      -> respond (stop | slide | bounce)
//! cap reached      -> stuck: velocity zeroed, position unchanged
//! ```
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.

#![doc(html_root_url = "https://docs.rs/sim-motion/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::cast_precision_loss,       // Ring indices are tiny
    clippy::missing_errors_doc,        // Setters share one rejection policy
)]

mod articulated;
mod chain;
mod config;
mod haptic;
mod hot_points;
mod ik;
mod resolver;

pub use articulated::{ArticulatedCollision, ChainOutcome, DEFAULT_SEGMENT_RADIUS, SEGMENT_COUNT};
pub use chain::{ArticulatedChain, ChainJoint};
pub use config::{
    CollisionConfig, CollisionMode, DEFAULT_MARGIN, DEFAULT_MAX_FORCE, DEFAULT_MAX_PASSES,
    DEFAULT_PROBE_RADIUS, IDLE_SPEED, IkConfig,
};
pub use haptic::{ForceLog, HapticDevice};
pub use hot_points::{HotPoints, MAX_POINTS, PointBuffer};
pub use ik::{IkResult, InverseKinematics};
pub use resolver::{
    CollisionResolver, PassContact, PassSample, ResolveOutcome, bounce_direction,
    elliptical_force, slide_direction,
};
