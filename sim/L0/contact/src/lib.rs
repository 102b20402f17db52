//! Bounding volumes and contact generation.
//!
//! A [`BoundingVolume`] is the collidable geometry of one rigid body: an
//! ordered list of [`BoundingSurface`] primitives, a mass-center offset, and
//! an advisory claim flag. Two volumes are tested against each other with
//! [`BoundingVolume::collide`], which pairs surfaces with a sweep-and-prune
//! broad phase and runs an analytical narrow-phase routine per pair.
//!
//! # Claim protocol
//!
//! At most one motion model may drive a body's collision resolution in a
//! tick. Callers check [`BoundingVolume::lock`] and skip their update when it
//! returns `false`; nothing blocks and nothing is retried.
//!
//! ```
//! use sim_contact::BoundingVolume;
//!
//! let volume = BoundingVolume::new();
//! assert!(volume.lock());
//! assert!(!volume.lock()); // second claimant skips this tick
//! volume.unlock();
//! assert!(volume.lock());
//! ```
//!
//! # Contact Normals
//!
//! Every [`ContactPoint`] normal points from the volume `collide` was called
//! on toward the target volume.
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.

#![doc(html_root_url = "https://docs.rs/sim-contact/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
)]

mod broad_phase;
mod contact;
mod narrow;
mod surface;
mod volume;

pub use broad_phase::{SweepAndPrune, brute_force_pairs};
pub use contact::{ContactManifold, ContactPoint, DEFAULT_MAX_CONTACTS};
pub use narrow::{ShapeContact, collide_shapes};
pub use surface::BoundingSurface;
pub use volume::BoundingVolume;

// Re-export types needed to build volumes
pub use cf_spatial::{Shape, SpatialError};
pub use sim_types::{BodyId, ClaimFlag, ClaimToken};
