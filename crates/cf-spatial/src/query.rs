//! Batched intersection queries against a scene.
//!
//! The collision resolvers never walk scene geometry themselves. They submit
//! a batch of [`IntersectQuery`] values plus an [`IntersectMask`] to a
//! [`SpatialIntersector`] and get back one optional [`QueryHit`] per query,
//! in the same order.

use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::overlap::Sphere;
use crate::raycast::Segment;

/// Bitmask selecting which geometry a query may hit.
///
/// Geometry is tagged with a mask when it is registered; a query only
/// considers geometry whose mask shares at least one bit with the query's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntersectMask(pub u32);

impl IntersectMask {
    /// Matches nothing.
    pub const NONE: Self = Self(0);
    /// Matches everything.
    pub const ALL: Self = Self(u32::MAX);

    /// Creates a mask from raw bits.
    #[must_use]
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if the two masks share any bit.
    #[must_use]
    pub const fn matches(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for IntersectMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl std::ops::BitOr for IntersectMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One query in a batch.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum IntersectQuery {
    /// First crossing along a directed segment.
    Segment(Segment),
    /// Closest surface point within a sphere.
    Sphere(Sphere),
}

impl IntersectQuery {
    /// Segment query between two points.
    #[must_use]
    pub const fn segment(start: Point3<f64>, end: Point3<f64>) -> Self {
        Self::Segment(Segment::new(start, end))
    }

    /// Sphere query.
    #[must_use]
    pub fn sphere(center: Point3<f64>, radius: f64) -> Self {
        Self::Sphere(Sphere::new(center, radius))
    }
}

/// Result of one query.
///
/// For segment queries `normal` is the raw surface normal at `point` and
/// may face along the segment. For sphere queries it is the outward normal
/// of the surface closest to the sphere center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryHit {
    /// World-space hit point.
    pub point: Point3<f64>,
    /// Surface normal at the hit point.
    pub normal: Vector3<f64>,
}

impl QueryHit {
    /// Creates a hit.
    #[must_use]
    pub const fn new(point: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self { point, normal }
    }
}

/// Answers batched segment and sphere queries against scene geometry.
///
/// Implementations must return exactly one entry per query, in query order.
pub trait SpatialIntersector {
    /// Run a batch of queries restricted to geometry matching `mask`.
    fn intersect(&self, queries: &[IntersectQuery], mask: IntersectMask) -> Vec<Option<QueryHit>>;
}

impl<T: SpatialIntersector + ?Sized> SpatialIntersector for std::rc::Rc<T> {
    fn intersect(&self, queries: &[IntersectQuery], mask: IntersectMask) -> Vec<Option<QueryHit>> {
        (**self).intersect(queries, mask)
    }
}
