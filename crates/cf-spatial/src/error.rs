//! Error types for spatial operations.

/// Errors that can occur when building scene geometry.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum SpatialError {
    /// A radius must be positive and finite.
    #[error("radius must be positive, got {0}")]
    InvalidRadius(f64),

    /// A length or half-extent must be non-negative and finite.
    #[error("extent must be non-negative, got {0}")]
    InvalidExtent(f64),

    /// A plane normal must be non-zero.
    #[error("plane normal must be non-zero")]
    DegenerateNormal,

    /// A triangle's vertices must not be collinear.
    #[error("triangle vertices are collinear")]
    DegenerateTriangle,

    /// The referenced geometry is not registered.
    #[error("unknown geometry {0}")]
    UnknownGeometry(usize),
}
