//! Error types for the collision/motion core.

use thiserror::Error;

/// Errors reported by configuration calls in the collision/motion core.
///
/// None of these are fatal: the offending call is a no-op and the caller
/// decides whether to retry with corrected input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// Hot-point index outside the configured point count.
    #[error("hot point index {index} out of range (count {count})")]
    InvalidPointIndex {
        /// The rejected index.
        index: usize,
        /// Number of hot points currently configured.
        count: usize,
    },

    /// Requested hot-point count exceeds the fixed capacity.
    #[error("hot point count {requested} exceeds capacity {capacity}")]
    InvalidPointCount {
        /// The rejected count.
        requested: usize,
        /// Maximum number of hot points.
        capacity: usize,
    },

    /// A scalar parameter is out of its valid range.
    #[error("invalid {name}: {value}")]
    InvalidParameter {
        /// Name of the parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// Invalid timestep.
    #[error("invalid timestep: {0} (must be non-negative and finite)")]
    InvalidTimestep(f64),

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// A required collaborator (scene, device) is not attached.
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),
}

impl SimError {
    /// Create an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(name: &'static str, value: f64) -> Self {
        Self::InvalidParameter { name, value }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Check if this is a configuration error.
    ///
    /// Every variant except [`SimError::MissingCollaborator`] describes bad
    /// input from the caller.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        !matches!(self, Self::MissingCollaborator(_))
    }
}
