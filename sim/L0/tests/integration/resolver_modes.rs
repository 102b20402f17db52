//! Point-sampling resolution in the positional modes.
//!
//! # Configurations
//!
//! Most tests use a wall whose face is the plane `x = d` and a single hot
//! point at the body origin, so travel distances can be written down
//! exactly:
//!
//! ```text
//!   origin        face
//!     o ---------> |
//!     |<--- d --->|
//!     |<- d-m ->|         STOP comes to rest a margin m short of the face
//! ```

use std::cell::Cell;
use std::rc::Rc;

use approx::assert_relative_eq;
use cf_spatial::{IntersectMask, IntersectQuery, QueryHit, SceneGeometry, Shape, SpatialIntersector};
use nalgebra::{Isometry3, Matrix4, Point3, Vector3};
use crate::test_utils::{
    DIST_TOL, GEOM_TOL, empty_scene, moving_body, point_resolver, points_resolver, wall_x,
};
use sim_motion::{
    CollisionConfig, CollisionMode, CollisionResolver, HotPoints, ResolveOutcome,
    bounce_direction, slide_direction,
};
use sim_types::KinematicBody;

// ============================================================================
// Idle short-circuit
// ============================================================================

#[test]
fn stationary_body_issues_no_queries() {
    for mode in [
        CollisionMode::Stop,
        CollisionMode::Slide,
        CollisionMode::Bounce,
        CollisionMode::ForceFeedback,
    ] {
        let scene = wall_x(0.5);
        let mut resolver = point_resolver(CollisionConfig::default().mode(mode), Rc::clone(&scene));
        let mut body = KinematicBody::default().with_position(Vector3::new(0.2, 0.3, 0.4));

        let outcome = resolver.update(&mut body, 1.0).unwrap();

        assert_eq!(outcome, ResolveOutcome::Idle);
        assert_eq!(scene.query_count(), 0);
        assert_eq!(body.position(), Vector3::new(0.2, 0.3, 0.4));
        assert_eq!(body.velocity(), Vector3::zeros());
    }
}

#[test]
fn no_hot_points_is_idle() {
    let scene = wall_x(0.5);
    let mut resolver = CollisionResolver::new(CollisionConfig::stop())
        .unwrap()
        .with_scene(scene.clone());
    let mut body = moving_body(Vector3::x());
    assert_eq!(resolver.update(&mut body, 1.0).unwrap(), ResolveOutcome::Idle);
    assert_eq!(scene.query_count(), 0);
}

// ============================================================================
// STOP
// ============================================================================

#[test]
fn stop_advances_distance_minus_margin() {
    for (distance, margin) in [(2.0, 0.1), (1.0, 0.25), (3.5, 0.0)] {
        let mut resolver = point_resolver(CollisionConfig::stop().margin(margin), wall_x(distance));
        let mut body = moving_body(Vector3::new(5.0, 0.0, 0.0));

        let outcome = resolver.update(&mut body, 1.0).unwrap();

        assert!(matches!(outcome, ResolveOutcome::Collided { passes: 1, .. }));
        assert_relative_eq!(body.position().x, distance - margin, epsilon = GEOM_TOL);
        assert_eq!(body.velocity(), Vector3::zeros());
    }
}

#[test]
fn stop_inside_margin_clamps_to_zero() {
    let mut resolver = point_resolver(CollisionConfig::stop().margin(0.2), wall_x(0.05));
    let mut body = moving_body(Vector3::new(5.0, 0.0, 0.0));
    resolver.update(&mut body, 1.0).unwrap();
    assert_eq!(body.position(), Vector3::zeros());
    assert_eq!(body.velocity(), Vector3::zeros());
}

#[test]
fn stop_along_diagonal_moves_along_travel() {
    let mut resolver = point_resolver(CollisionConfig::stop().margin(0.1), wall_x(2.0));
    let mut body = moving_body(Vector3::new(4.0, 0.0, 3.0));
    resolver.update(&mut body, 1.0).unwrap();

    let moved = body.position();
    // Stays on the line of travel and keeps the margin along the normal.
    assert_relative_eq!(moved.z / moved.x, 0.75, epsilon = DIST_TOL);
    assert_relative_eq!(moved.x, 1.9, epsilon = DIST_TOL);
}

#[test]
fn nearest_hot_point_limits_travel() {
    let points = [
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(0.4, 0.0, 1.0),
        Point3::new(-0.2, 0.0, -1.0),
    ];
    let mut resolver = points_resolver(CollisionConfig::stop().margin(0.1), wall_x(2.0), &points);
    let mut body = moving_body(Vector3::new(5.0, 0.0, 0.0));
    resolver.update(&mut body, 1.0).unwrap();
    assert_relative_eq!(body.position().x, 1.5, epsilon = GEOM_TOL);
}

#[test]
fn clear_path_moves_full_distance() {
    let mut resolver = point_resolver(CollisionConfig::stop(), empty_scene());
    let mut body = moving_body(Vector3::new(0.0, 3.0, 0.0));
    let outcome = resolver.update(&mut body, 0.5).unwrap();
    assert_eq!(outcome, ResolveOutcome::Clear { passes: 1 });
    assert_relative_eq!(body.position(), Vector3::new(0.0, 1.5, 0.0), epsilon = GEOM_TOL);
    assert_eq!(body.velocity(), Vector3::new(0.0, 3.0, 0.0));
}

// ============================================================================
// SLIDE
// ============================================================================

#[test]
fn slide_direction_is_tangent() {
    let normals = [
        Vector3::x(),
        -Vector3::z(),
        Vector3::new(1.0, 2.0, -0.5).normalize(),
        Vector3::new(-0.3, 0.1, 0.9).normalize(),
    ];
    let directions = [
        Vector3::new(1.0, 1.0, 0.0).normalize(),
        Vector3::new(-0.2, 0.7, 0.4).normalize(),
        Vector3::new(0.0, 0.0, 1.0),
    ];
    for n in &normals {
        for v in &directions {
            let (slid, scale) = slide_direction(v, n);
            if scale > 0.0 {
                assert_relative_eq!(slid.dot(n), 0.0, epsilon = GEOM_TOL);
                assert_relative_eq!(slid.norm(), 1.0, epsilon = GEOM_TOL);
            }
        }
    }
}

#[test]
fn slide_keeps_tangential_motion() {
    let mut resolver = point_resolver(CollisionConfig::slide().margin(0.1), wall_x(1.0));
    let mut body = moving_body(Vector3::new(1.0, 1.0, 0.0));

    let outcome = resolver.update(&mut body, 3.0).unwrap();

    let ResolveOutcome::Collided { normal, .. } = outcome else {
        panic!("expected contact, got {outcome:?}");
    };
    assert_relative_eq!(body.velocity().dot(&normal), 0.0, epsilon = GEOM_TOL);
    assert_relative_eq!(body.position().x, 0.9, epsilon = DIST_TOL);
    assert!(body.position().y > 0.9);
    // Speed is rescaled by the projected length.
    assert_relative_eq!(body.speed(), 1.0, epsilon = DIST_TOL);
}

#[test]
fn slide_head_on_stops() {
    let mut resolver = point_resolver(CollisionConfig::slide().margin(0.1), wall_x(1.0));
    let mut body = moving_body(Vector3::new(2.0, 0.0, 0.0));
    resolver.update(&mut body, 1.0).unwrap();
    assert_relative_eq!(body.position().x, 0.9, epsilon = GEOM_TOL);
    assert_eq!(body.velocity(), Vector3::zeros());
}

// ============================================================================
// BOUNCE
// ============================================================================

#[test]
fn bounce_direction_obeys_reflection_law() {
    let cases = [
        (Vector3::new(1.0, -1.0, 0.0).normalize(), Vector3::y()),
        (Vector3::new(0.3, 0.4, -0.866).normalize(), Vector3::new(0.0, 0.6, 0.8)),
        (Vector3::x(), -Vector3::x()),
    ];
    for (v, n) in cases {
        let reflected = bounce_direction(&v, &n);
        assert_relative_eq!(reflected, v - n * (2.0 * v.dot(&n)), epsilon = GEOM_TOL);
        assert_relative_eq!(reflected.norm(), v.norm(), epsilon = GEOM_TOL);
    }
}

#[test]
fn bounce_reflects_velocity_about_reported_normal() {
    let mut resolver = point_resolver(CollisionConfig::bounce().margin(0.05), wall_x(1.0));
    let v = Vector3::new(2.0, 1.0, 0.0);
    let mut body = moving_body(v);

    let outcome = resolver.update(&mut body, 1.0).unwrap();

    let ResolveOutcome::Collided { normal, passes } = outcome else {
        panic!("expected contact, got {outcome:?}");
    };
    assert_eq!(passes, 2);
    assert_relative_eq!(body.velocity(), v - normal * (2.0 * v.dot(&normal)), epsilon = DIST_TOL);
    assert_relative_eq!(body.speed(), v.norm(), epsilon = DIST_TOL);
    assert!(body.position().x < 1.0);
}

// ============================================================================
// Max-pass safety
// ============================================================================

/// A 90 degree V opening toward -X with its apex at `(1, 0)`.
fn v_corner() -> Rc<SceneGeometry> {
    let scene = empty_scene();
    let apex = Vector3::new(1.0, 0.0, 0.0);
    let half_thickness = 0.5;
    for angle in [225.0_f64, 135.0] {
        let angle = angle.to_radians();
        // Box local +X is the inward face normal.
        let normal = Vector3::new(angle.cos(), angle.sin(), 0.0);
        let center = apex - normal * half_thickness;
        scene
            .insert(
                Shape::cuboid(Vector3::new(half_thickness, 3.0, 10.0)),
                Isometry3::new(center, Vector3::z() * angle),
                IntersectMask::ALL,
            )
            .unwrap();
    }
    scene
}

#[test]
fn slide_into_corner_terminates_at_rest() {
    let mut resolver = point_resolver(CollisionConfig::slide().margin(0.1), v_corner());
    let mut body = moving_body(Vector3::new(5.0, 0.0, 0.0));

    let outcome = resolver.update(&mut body, 1.0).unwrap();

    let passes = match outcome {
        ResolveOutcome::Collided { passes, .. } | ResolveOutcome::Stuck { passes } => passes,
        other => panic!("expected the corner to stop the body, got {other:?}"),
    };
    assert!(passes <= resolver.config().max_passes);
    assert_eq!(body.velocity(), Vector3::zeros());
    assert!(body.position().x < 1.0);
}

/// Every query hits at its own start with a normal across the travel, so
/// sliding never makes progress.
struct Trap {
    batches: Cell<usize>,
}

impl SpatialIntersector for Trap {
    fn intersect(&self, queries: &[IntersectQuery], _mask: IntersectMask) -> Vec<Option<QueryHit>> {
        self.batches.set(self.batches.get() + 1);
        queries
            .iter()
            .map(|query| match query {
                IntersectQuery::Segment(segment) => Some(QueryHit::new(segment.start, Vector3::y())),
                IntersectQuery::Sphere(_) => None,
            })
            .collect()
    }
}

#[test]
fn pathological_scene_ends_stuck_with_zero_velocity() {
    for max_passes in [1, 5, 12] {
        let trap = Rc::new(Trap {
            batches: Cell::new(0),
        });
        let mut resolver = CollisionResolver::new(CollisionConfig::slide().max_passes(max_passes))
            .unwrap()
            .with_scene(trap.clone())
            .with_points(HotPoints::single(Point3::origin()));
        let mut body = moving_body(Vector3::new(3.0, 0.0, 0.0));

        let outcome = resolver.update(&mut body, 1.0).unwrap();

        assert_eq!(outcome, ResolveOutcome::Stuck { passes: max_passes });
        assert_eq!(body.velocity(), Vector3::zeros());
        assert_eq!(body.position(), Vector3::zeros());
        assert!(trap.batches.get() <= 2 * max_passes);
    }
}

// ============================================================================
// Back-face correction
// ============================================================================

#[test]
fn back_face_normal_is_negated() {
    // Two-sided triangle at x = 1 wound so its raw normal is +X.
    let scene = empty_scene();
    scene
        .insert(
            Shape::triangle(
                Point3::new(1.0, -5.0, -5.0),
                Point3::new(1.0, 5.0, -5.0),
                Point3::new(1.0, 0.0, 5.0),
            ),
            Isometry3::identity(),
            IntersectMask::ALL,
        )
        .unwrap();

    let probe = IntersectQuery::segment(Point3::origin(), Point3::new(3.0, 0.0, 0.0));
    let raw = scene.intersect(&[probe], IntersectMask::ALL)[0].unwrap();
    assert!(raw.normal.dot(&Vector3::x()) > 0.0);

    let resolver = point_resolver(CollisionConfig::stop().margin(0.0), scene);
    let sample = resolver
        .sample_pass(&Matrix4::identity(), &Vector3::x(), 2.0)
        .unwrap();
    let contact = sample.contact.unwrap();
    assert!(contact.normal.dot(&Vector3::x()) < 0.0);
    assert_relative_eq!(contact.normal, -raw.normal, epsilon = GEOM_TOL);
    assert_relative_eq!(sample.allowed, 1.0, epsilon = GEOM_TOL);
}

#[test]
fn masked_out_geometry_is_ignored() {
    let scene = empty_scene();
    scene
        .insert(
            Shape::cuboid(Vector3::new(0.5, 10.0, 10.0)),
            Isometry3::translation(1.5, 0.0, 0.0),
            IntersectMask::new(0b10),
        )
        .unwrap();
    let mut resolver = point_resolver(
        CollisionConfig::stop().mask(IntersectMask::new(0b01)),
        scene,
    );
    let mut body = moving_body(Vector3::new(4.0, 0.0, 0.0));
    let outcome = resolver.update(&mut body, 1.0).unwrap();
    assert_eq!(outcome, ResolveOutcome::Clear { passes: 1 });
}
