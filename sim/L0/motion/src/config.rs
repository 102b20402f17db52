//! Configuration types for collision resolution.
//!
//! [`CollisionConfig`] controls how the point-sampling resolver responds to
//! contact; [`IkConfig`] bounds the inverse-kinematics correction used by
//! articulated chains.

use cf_spatial::IntersectMask;
use sim_types::{Result, SimError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default distance kept between a resolved body and the surface it hit.
pub const DEFAULT_MARGIN: f64 = 0.1;

/// Default cap on sample/reduce/respond passes per tick.
pub const DEFAULT_MAX_PASSES: usize = 5;

/// Linear speed below which a body is treated as stationary.
pub const IDLE_SPEED: f64 = 1e-6;

/// Default force-feedback probe radius.
pub const DEFAULT_PROBE_RADIUS: f64 = 0.05;

/// Default force-feedback force ceiling.
pub const DEFAULT_MAX_FORCE: f64 = 1.0;

/// How the resolver responds once motion is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CollisionMode {
    /// Stop at the contact; speed drops to zero.
    Stop,
    /// Continue along the contact's tangent plane.
    #[default]
    Slide,
    /// Reflect the direction of travel about the contact normal.
    Bounce,
    /// Leave motion alone and push a repulsive force to a haptic device.
    ForceFeedback,
}

impl CollisionMode {
    /// True for the modes that correct position.
    #[must_use]
    pub const fn is_positional(self) -> bool {
        !matches!(self, Self::ForceFeedback)
    }
}

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionConfig {
    /// Response policy.
    pub mode: CollisionMode,
    /// Distance subtracted from every measured hit distance.
    pub margin: f64,
    /// Which scene geometry participates.
    pub mask: IntersectMask,
    /// Maximum passes per tick before the body is declared stuck.
    pub max_passes: usize,
    /// Force magnitude at full probe penetration (force feedback only).
    pub max_force: f64,
    /// Radius of the sphere probed around each hot point (force feedback only).
    pub probe_radius: f64,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            mode: CollisionMode::default(),
            margin: DEFAULT_MARGIN,
            mask: IntersectMask::ALL,
            max_passes: DEFAULT_MAX_PASSES,
            max_force: DEFAULT_MAX_FORCE,
            probe_radius: DEFAULT_PROBE_RADIUS,
        }
    }
}

impl CollisionConfig {
    /// Stop-on-contact preset.
    #[must_use]
    pub fn stop() -> Self {
        Self {
            mode: CollisionMode::Stop,
            ..Default::default()
        }
    }

    /// Slide-along-surfaces preset (the default).
    #[must_use]
    pub fn slide() -> Self {
        Self::default()
    }

    /// Bounce preset.
    #[must_use]
    pub fn bounce() -> Self {
        Self {
            mode: CollisionMode::Bounce,
            ..Default::default()
        }
    }

    /// Haptic force-feedback preset.
    #[must_use]
    pub fn force_feedback(max_force: f64, probe_radius: f64) -> Self {
        Self {
            mode: CollisionMode::ForceFeedback,
            max_force,
            probe_radius,
            ..Default::default()
        }
    }

    /// Set the response mode.
    #[must_use]
    pub fn mode(mut self, mode: CollisionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the margin.
    #[must_use]
    pub fn margin(mut self, margin: f64) -> Self {
        self.margin = margin;
        self
    }

    /// Set the intersect mask.
    #[must_use]
    pub fn mask(mut self, mask: IntersectMask) -> Self {
        self.mask = mask;
        self
    }

    /// Set the pass cap.
    #[must_use]
    pub fn max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_margin(self.margin)?;
        validate_max_passes(self.max_passes)?;
        validate_max_force(self.max_force)?;
        validate_probe_radius(self.probe_radius)?;
        Ok(())
    }
}

pub(crate) fn validate_margin(margin: f64) -> Result<()> {
    if margin.is_finite() && margin >= 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid_parameter("margin", margin))
    }
}

pub(crate) fn validate_max_passes(max_passes: usize) -> Result<()> {
    if max_passes == 0 {
        return Err(SimError::invalid_config("max_passes must be at least 1"));
    }
    Ok(())
}

pub(crate) fn validate_max_force(max_force: f64) -> Result<()> {
    if max_force.is_finite() && max_force >= 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid_parameter("max_force", max_force))
    }
}

pub(crate) fn validate_probe_radius(radius: f64) -> Result<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid_parameter("probe_radius", radius))
    }
}

/// Inverse-kinematics solver limits.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IkConfig {
    /// Maximum CCD sweeps over the chain.
    pub max_iterations: u32,
    /// End-effector distance counted as reaching the target.
    pub tolerance: f64,
}

impl Default for IkConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            tolerance: 1e-3,
        }
    }
}

impl IkConfig {
    /// Tighter tolerance, more sweeps.
    #[must_use]
    pub fn precise() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-5,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(SimError::invalid_config("max_iterations must be at least 1"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(SimError::invalid_parameter("tolerance", self.tolerance));
        }
        Ok(())
    }
}
