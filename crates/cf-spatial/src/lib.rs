//! Geometry and intersection queries for the collision layer.
//!
//! This crate provides the scene-side half of collision handling:
//!
//! - [`Shape`] - Sphere, box, capsule, plane, and triangle primitives
//! - [`Aabb`] and [`Sphere`] - Coarse bounds for overlap tests
//! - [`Segment`] and [`cast_segment`] - First crossing along a segment
//! - [`SpatialIntersector`] - Batched segment/sphere query contract
//! - [`SceneGeometry`] - Reference intersector over posed shapes
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. Anything that can
//! answer [`IntersectQuery`] batches (a physics engine's query pipeline, a
//! BVH, or [`SceneGeometry`] in tests and tools) plugs in through
//! [`SpatialIntersector`].
//!
//! # Normals
//!
//! Segment hits carry the raw geometric normal, which can face along the
//! direction of travel when a segment leaves a solid or crosses a two-sided
//! surface from behind. Callers that need a facing normal correct it
//! themselves. Sphere hits carry the outward normal of the closest surface.
//!
//! # Example
//!
//! ```
//! use cf_spatial::{IntersectMask, IntersectQuery, SceneGeometry, Shape, SpatialIntersector};
//! use nalgebra::{Isometry3, Point3, Vector3};
//!
//! let scene = SceneGeometry::new();
//! scene
//!     .insert(
//!         Shape::cuboid(Vector3::new(0.5, 2.0, 2.0)),
//!         Isometry3::translation(2.0, 0.0, 0.0),
//!         IntersectMask::ALL,
//!     )
//!     .unwrap();
//!
//! let probe = IntersectQuery::segment(Point3::origin(), Point3::new(5.0, 0.0, 0.0));
//! let hit = scene.intersect(&[probe], IntersectMask::ALL)[0].unwrap();
//! assert!((hit.point.x - 1.5).abs() < 1e-12);
//! assert!((hit.normal.x + 1.0).abs() < 1e-12);
//! ```

#![doc(html_root_url = "https://docs.rs/cf-spatial/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::many_single_char_names,    // Geometry code uses a, b, c, d, t
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod error;
mod overlap;
mod query;
mod raycast;
mod scene;
mod shape;

pub use error::SpatialError;
pub use overlap::{Aabb, Axis, Sphere};
pub use query::{IntersectMask, IntersectQuery, QueryHit, SpatialIntersector};
pub use raycast::{Segment, SegmentHit, cast_segment};
pub use scene::{GeometryId, SceneGeometry};
pub use shape::{
    GEOM_EPSILON, PLANE_EXTENT, Shape, SurfacePoint, capsule_endpoints, closest_point_on_segment,
    closest_points_segments,
};

// Re-export math types for convenience
pub use nalgebra::{Isometry3, Point3, Vector3};
