//! Reference [`SpatialIntersector`] over a flat list of posed shapes.
//!
//! [`SceneGeometry`] is shared behind an `Rc` by everything that registers
//! surfaces into it, so its mutators take `&self`. Slots are never reused
//! while occupied; a removed slot stays empty until the next insert that
//! finds it.

use std::cell::{Cell, RefCell};

use nalgebra::Isometry3;
use tracing::{debug, trace};

use crate::error::SpatialError;
use crate::overlap::{Aabb, Sphere};
use crate::query::{IntersectMask, IntersectQuery, QueryHit, SpatialIntersector};
use crate::raycast::{Segment, cast_segment};
use crate::shape::Shape;

/// Handle to geometry registered in a [`SceneGeometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeometryId(usize);

impl GeometryId {
    /// Slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Entry {
    shape: Shape,
    pose: Isometry3<f64>,
    mask: IntersectMask,
}

/// Posed shapes answering segment and sphere queries.
///
/// # Example
///
/// ```
/// use cf_spatial::{IntersectMask, IntersectQuery, SceneGeometry, Shape, SpatialIntersector};
/// use nalgebra::{Isometry3, Point3, Vector3};
///
/// let scene = SceneGeometry::new();
/// scene
///     .insert(Shape::plane(Vector3::z(), 0.0), Isometry3::identity(), IntersectMask::ALL)
///     .unwrap();
///
/// let hits = scene.intersect(
///     &[IntersectQuery::segment(Point3::new(0.0, 0.0, 1.0), Point3::new(0.0, 0.0, -1.0))],
///     IntersectMask::ALL,
/// );
/// assert_eq!(hits.len(), 1);
/// assert!(hits[0].is_some());
/// ```
#[derive(Debug, Default)]
pub struct SceneGeometry {
    entries: RefCell<Vec<Option<Entry>>>,
    queries: Cell<usize>,
}

impl SceneGeometry {
    /// Creates an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shape at `pose`.
    ///
    /// # Errors
    ///
    /// Returns the shape's validation error if it is degenerate.
    pub fn insert(
        &self,
        shape: Shape,
        pose: Isometry3<f64>,
        mask: IntersectMask,
    ) -> Result<GeometryId, SpatialError> {
        shape.validate()?;
        let mut entries = self.entries.borrow_mut();
        let entry = Some(Entry { shape, pose, mask });
        let index = if let Some(free) = entries.iter().position(Option::is_none) {
            entries[free] = entry;
            free
        } else {
            entries.push(entry);
            entries.len() - 1
        };
        debug!(index, "geometry registered");
        Ok(GeometryId(index))
    }

    /// Unregisters geometry. Returns `false` if `id` was not registered.
    pub fn remove(&self, id: GeometryId) -> bool {
        let removed = self
            .entries
            .borrow_mut()
            .get_mut(id.0)
            .and_then(Option::take)
            .is_some();
        if removed {
            debug!(index = id.0, "geometry removed");
        }
        removed
    }

    /// Moves registered geometry.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::UnknownGeometry`] if `id` is not registered.
    pub fn set_pose(&self, id: GeometryId, pose: Isometry3<f64>) -> Result<(), SpatialError> {
        self.with_entry(id, |entry| entry.pose = pose)
    }

    /// Changes which query masks see this geometry.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::UnknownGeometry`] if `id` is not registered.
    pub fn set_mask(&self, id: GeometryId, mask: IntersectMask) -> Result<(), SpatialError> {
        self.with_entry(id, |entry| entry.mask = mask)
    }

    /// World pose of registered geometry.
    #[must_use]
    pub fn pose(&self, id: GeometryId) -> Option<Isometry3<f64>> {
        self.entries
            .borrow()
            .get(id.0)
            .and_then(Option::as_ref)
            .map(|entry| entry.pose)
    }

    /// World bounds of registered geometry.
    #[must_use]
    pub fn aabb(&self, id: GeometryId) -> Option<Aabb> {
        self.entries
            .borrow()
            .get(id.0)
            .and_then(Option::as_ref)
            .map(|entry| entry.shape.aabb(&entry.pose))
    }

    /// Number of registered shapes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().iter().flatten().count()
    }

    /// True if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of individual queries answered so far.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.get()
    }

    fn with_entry(&self, id: GeometryId, f: impl FnOnce(&mut Entry)) -> Result<(), SpatialError> {
        let mut entries = self.entries.borrow_mut();
        let entry = entries
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(SpatialError::UnknownGeometry(id.0))?;
        f(entry);
        Ok(())
    }

    fn nearest_crossing(&self, segment: &Segment, mask: IntersectMask) -> Option<QueryHit> {
        self.entries
            .borrow()
            .iter()
            .flatten()
            .filter(|entry| entry.mask.matches(mask))
            .filter_map(|entry| cast_segment(&entry.shape, &entry.pose, segment))
            .min_by(|a, b| a.fraction.total_cmp(&b.fraction))
            .map(|hit| QueryHit::new(hit.point, hit.normal))
    }

    fn nearest_surface(&self, sphere: &Sphere, mask: IntersectMask) -> Option<QueryHit> {
        self.entries
            .borrow()
            .iter()
            .flatten()
            .filter(|entry| entry.mask.matches(mask))
            .map(|entry| {
                let surface = entry.shape.closest_point(&entry.pose, &sphere.center);
                (surface.signed_distance(&sphere.center), surface)
            })
            .filter(|(distance, _)| *distance <= sphere.radius)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, surface)| QueryHit::new(surface.point, surface.normal))
    }
}

impl SpatialIntersector for SceneGeometry {
    fn intersect(&self, queries: &[IntersectQuery], mask: IntersectMask) -> Vec<Option<QueryHit>> {
        self.queries.set(self.queries.get() + queries.len());
        trace!(count = queries.len(), mask = mask.bits(), "intersect batch");
        queries
            .iter()
            .map(|query| match query {
                IntersectQuery::Segment(segment) => self.nearest_crossing(segment, mask),
                IntersectQuery::Sphere(sphere) => self.nearest_surface(sphere, mask),
            })
            .collect()
    }
}
