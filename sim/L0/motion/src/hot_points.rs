//! Bounded set of body-local sample points.

use nalgebra::{Matrix4, Point3};
use sim_types::{Result, SimError};
use smallvec::SmallVec;

/// Maximum number of hot points per resolver.
pub const MAX_POINTS: usize = 16;

/// Inline storage sized for a full set of hot points.
pub type PointBuffer = SmallVec<[Point3<f64>; MAX_POINTS]>;

/// Up to [`MAX_POINTS`] sample offsets in a body's local frame.
///
/// # Example
///
/// ```
/// use sim_motion::HotPoints;
/// use nalgebra::Point3;
///
/// let mut points = HotPoints::new();
/// points.set_count(2).unwrap();
/// points.set(1, Point3::new(0.0, 0.0, 1.8)).unwrap();
///
/// assert_eq!(points.len(), 2);
/// assert!(points.set(2, Point3::origin()).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HotPoints {
    points: PointBuffer,
}

impl HotPoints {
    /// No points.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single point.
    #[must_use]
    pub fn single(point: Point3<f64>) -> Self {
        let mut points = PointBuffer::new();
        points.push(point);
        Self { points }
    }

    /// Build from a list of points.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidPointCount`] if more than [`MAX_POINTS`]
    /// are given.
    pub fn from_points(points: &[Point3<f64>]) -> Result<Self> {
        if points.len() > MAX_POINTS {
            return Err(SimError::InvalidPointCount {
                requested: points.len(),
                capacity: MAX_POINTS,
            });
        }
        Ok(Self {
            points: points.iter().copied().collect(),
        })
    }

    /// Resize to `count` points. New points start at the local origin.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidPointCount`] above [`MAX_POINTS`].
    pub fn set_count(&mut self, count: usize) -> Result<()> {
        if count > MAX_POINTS {
            return Err(SimError::InvalidPointCount {
                requested: count,
                capacity: MAX_POINTS,
            });
        }
        self.points.resize(count, Point3::origin());
        Ok(())
    }

    /// Replace the point at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidPointIndex`] if `index` is not below
    /// [`len`](Self::len).
    pub fn set(&mut self, index: usize, point: Point3<f64>) -> Result<()> {
        let count = self.points.len();
        let slot = self
            .points
            .get_mut(index)
            .ok_or(SimError::InvalidPointIndex { index, count })?;
        *slot = point;
        Ok(())
    }

    /// Point at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Point3<f64>> {
        self.points.get(index).copied()
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True if there are no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points in order.
    #[must_use]
    pub fn as_slice(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Points mapped through a model-to-world transform.
    #[must_use]
    pub fn world_positions(&self, global: &Matrix4<f64>) -> PointBuffer {
        self.points
            .iter()
            .map(|p| global.transform_point(p))
            .collect()
    }
}
