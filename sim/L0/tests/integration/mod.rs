//! Integration tests for the collision/motion crates.
//!
//! These tests drive the public APIs end to end:
//! - Claim flags on bounding volumes shared between resolvers
//! - Point-sampling resolution in every response mode
//! - Force feedback into a haptic device
//! - Articulated chains corrected by inverse kinematics
//! - Bounding volumes registered as scene geometry

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

pub mod articulated_chain;
pub mod claim_protocol;
pub mod force_feedback;
pub mod resolver_modes;
pub mod test_utils;
pub mod volume_scene;
