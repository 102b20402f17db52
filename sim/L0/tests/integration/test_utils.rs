//! Shared fixtures for the collision/motion integration tests.
//!
//! # Tolerance Hierarchy
//!
//! ```text
//! GEOM_TOL  = 1e-10 ── exact geometric constructions (axis-aligned walls)
//! DIST_TOL  = 1e-9  ── distances after a few passes of accumulated motion
//! FORCE_TOL = 1e-9  ── force magnitudes from the elliptical falloff
//! ```

use std::rc::Rc;

use cf_spatial::{IntersectMask, SceneGeometry, Shape};
use nalgebra::{Isometry3, Point3, Vector3};
use sim_motion::{CollisionConfig, CollisionResolver, HotPoints};
use sim_types::KinematicBody;

/// Tolerance for exact geometric constructions.
pub const GEOM_TOL: f64 = 1e-10;

/// Tolerance for distances accumulated over several passes.
pub const DIST_TOL: f64 = 1e-9;

/// Tolerance for force magnitudes.
pub const FORCE_TOL: f64 = 1e-9;

// ============================================================================
// Scenes
// ============================================================================

/// An empty shared scene.
#[must_use]
pub fn empty_scene() -> Rc<SceneGeometry> {
    Rc::new(SceneGeometry::new())
}

/// A wall whose face toward the origin is the plane `x = face`.
///
/// The wall spans `y, z` in `[-10, 10]` and is 1 unit deep.
#[must_use]
pub fn wall_x(face: f64) -> Rc<SceneGeometry> {
    let scene = empty_scene();
    add_box(&scene, Vector3::new(face + 0.5, 0.0, 0.0), Vector3::new(0.5, 10.0, 10.0));
    scene
}

/// A ground plane `z = 0` with normal +Z.
#[must_use]
pub fn ground() -> Rc<SceneGeometry> {
    let scene = empty_scene();
    scene
        .insert(Shape::plane(Vector3::z(), 0.0), Isometry3::identity(), IntersectMask::ALL)
        .unwrap();
    scene
}

/// Insert an axis-aligned box.
pub fn add_box(scene: &SceneGeometry, center: Vector3<f64>, half_extents: Vector3<f64>) {
    scene
        .insert(
            Shape::cuboid(half_extents),
            Isometry3::translation(center.x, center.y, center.z),
            IntersectMask::ALL,
        )
        .unwrap();
}

/// Insert a sphere.
pub fn add_sphere(scene: &SceneGeometry, center: Vector3<f64>, radius: f64) {
    scene
        .insert(
            Shape::sphere(radius),
            Isometry3::translation(center.x, center.y, center.z),
            IntersectMask::ALL,
        )
        .unwrap();
}

// ============================================================================
// Bodies and resolvers
// ============================================================================

/// A body at the origin with the given velocity.
#[must_use]
pub fn moving_body(velocity: Vector3<f64>) -> KinematicBody {
    let mut body = KinematicBody::default();
    body.set_velocity(velocity);
    body
}

/// A resolver over `scene` with a single hot point at the body origin.
#[must_use]
pub fn point_resolver(config: CollisionConfig, scene: Rc<SceneGeometry>) -> CollisionResolver {
    points_resolver(config, scene, &[Point3::origin()])
}

/// A resolver over `scene` with the given hot points.
#[must_use]
pub fn points_resolver(
    config: CollisionConfig,
    scene: Rc<SceneGeometry>,
    points: &[Point3<f64>],
) -> CollisionResolver {
    CollisionResolver::new(config)
        .unwrap()
        .with_scene(scene)
        .with_points(HotPoints::from_points(points).unwrap())
}
