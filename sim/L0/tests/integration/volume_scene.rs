//! Bounding volumes as collidable and intersectable geometry.

use std::rc::Rc;

use approx::assert_relative_eq;
use cf_spatial::{IntersectMask, Shape};
use nalgebra::{Isometry3, Point3, Vector3};
use crate::test_utils::{GEOM_TOL, empty_scene, moving_body, point_resolver};
use sim_contact::{BoundingSurface, BoundingVolume, DEFAULT_MAX_CONTACTS};
use sim_motion::{CollisionConfig, ResolveOutcome};
use sim_types::{BodyId, KinematicBody};

fn sphere_surface(radius: f64, at: Vector3<f64>) -> Rc<BoundingSurface> {
    Rc::new(BoundingSurface::new(Shape::sphere(radius), Isometry3::translation(at.x, at.y, at.z)).unwrap())
}

// ============================================================================
// Surface offset bookkeeping
// ============================================================================

#[test]
fn repeated_surface_offset_is_idempotent() {
    let mut volume = BoundingVolume::new();
    volume.add_surface(sphere_surface(0.5, Vector3::new(1.0, 0.0, 0.0)));
    volume.add_surface(sphere_surface(0.25, Vector3::new(0.0, 2.0, 0.0)));

    let offset = Vector3::new(0.2, -0.1, 0.3);
    volume.set_surface_offset(offset);
    let body_poses: Vec<_> = volume.surfaces().iter().map(|s| s.body_pose()).collect();
    let world_poses: Vec<_> = (0..2).map(|i| volume.surface_pose(i).unwrap()).collect();

    volume.set_surface_offset(offset);

    for (i, surface) in volume.surfaces().iter().enumerate() {
        assert_eq!(surface.body_pose(), body_poses[i]);
        assert_eq!(volume.surface_pose(i).unwrap(), world_poses[i]);
    }
    assert_eq!(volume.surface_offset(), offset);
}

#[test]
fn surface_offset_keeps_world_placement() {
    let mut volume = BoundingVolume::new();
    volume.set_pose(Isometry3::translation(0.0, 0.0, 1.0));
    volume.add_surface(sphere_surface(0.5, Vector3::new(1.0, 0.0, 0.0)));
    let before = volume.surface_pose(0).unwrap();

    volume.set_surface_offset(Vector3::new(0.0, 0.4, 0.0));
    let after = volume.surface_pose(0).unwrap();

    assert_relative_eq!(after.translation.vector, before.translation.vector, epsilon = GEOM_TOL);
}

// ============================================================================
// Contacts between volumes
// ============================================================================

#[test]
fn contacts_are_capped() {
    let mut ground = BoundingVolume::new();
    ground.add_surface(Rc::new(
        BoundingSurface::at_origin(Shape::plane(Vector3::z(), 0.0)).unwrap(),
    ));

    let mut crate_volume = BoundingVolume::new().with_owner(BodyId::new(9));
    crate_volume.add_surface(Rc::new(
        BoundingSurface::at_origin(Shape::cuboid(Vector3::new(0.5, 0.5, 0.5))).unwrap(),
    ));
    crate_volume.set_pose(Isometry3::translation(0.0, 0.0, 0.4));

    let all = crate_volume.collide_default(&ground);
    assert_eq!(all.len(), 4);
    assert!(all.len() <= DEFAULT_MAX_CONTACTS);
    for contact in &all {
        assert_relative_eq!(contact.penetration, 0.1, epsilon = GEOM_TOL);
        assert_eq!(contact.body_a, Some(BodyId::new(9)));
    }

    let capped = crate_volume.collide(&ground, 2);
    assert_eq!(capped.len(), 2);
    assert!(capped.is_truncated());
}

#[test]
fn empty_volumes_never_collide() {
    let a = BoundingVolume::new();
    let mut b = BoundingVolume::new();
    b.add_surface(sphere_surface(1.0, Vector3::zeros()));
    assert!(a.collide_default(&b).is_empty());
    assert!(b.collide_default(&a).is_empty());
}

// ============================================================================
// Registered volumes as scene geometry
// ============================================================================

#[test]
fn resolver_stops_at_registered_volume() {
    let scene = empty_scene();
    let mut pillar = BoundingVolume::new();
    pillar.add_surface(sphere_surface(0.5, Vector3::zeros()));
    pillar.register_with(Rc::clone(&scene), IntersectMask::ALL);
    pillar.set_pose(Isometry3::translation(3.0, 0.0, 0.0));

    let mut resolver = point_resolver(CollisionConfig::stop().margin(0.1), Rc::clone(&scene));
    let mut body = moving_body(Vector3::new(4.0, 0.0, 0.0));
    let outcome = resolver.update(&mut body, 1.0).unwrap();

    assert!(matches!(outcome, ResolveOutcome::Collided { .. }));
    assert_relative_eq!(body.position().x, 2.4, epsilon = GEOM_TOL);

    // Once dropped, the pillar no longer blocks anything.
    drop(pillar);
    assert!(scene.is_empty());
    let mut body = moving_body(Vector3::new(4.0, 0.0, 0.0));
    assert_eq!(resolver.update(&mut body, 1.0).unwrap(), ResolveOutcome::Clear { passes: 1 });
}

#[test]
fn volume_follows_body_into_scene() {
    let scene = empty_scene();
    let mut mover = KinematicBody::new(BodyId::new(3)).with_position(Vector3::new(0.0, 5.0, 0.0));
    let mut volume = BoundingVolume::new().with_owner(mover.id());
    volume.add_surface(sphere_surface(0.5, Vector3::zeros()));
    volume.register_with(Rc::clone(&scene), IntersectMask::ALL);
    volume.follow(&mover);

    mover.set_position(Vector3::new(0.0, 1.0, 0.0));
    volume.follow(&mover);

    let resolver = point_resolver(CollisionConfig::stop().margin(0.0), scene);
    let sample = resolver
        .sample_pass(&nalgebra::Matrix4::identity(), &Vector3::y(), 5.0)
        .unwrap();
    assert_relative_eq!(sample.allowed, 0.5, epsilon = GEOM_TOL);
    assert_relative_eq!(
        sample.contact.unwrap().point,
        Point3::new(0.0, 0.5, 0.0),
        epsilon = GEOM_TOL
    );
}

#[test]
fn offset_change_between_follows_keeps_geometry_in_place() {
    let scene = empty_scene();
    let body = KinematicBody::new(BodyId::new(4)).with_position(Vector3::new(0.0, 1.0, 0.0));
    let mut volume = BoundingVolume::new().with_owner(body.id());
    volume.add_surface(sphere_surface(0.5, Vector3::zeros()));
    volume.register_with(Rc::clone(&scene), IntersectMask::ALL);

    volume.follow(&body);
    volume.set_surface_offset(Vector3::new(0.5, 0.0, 0.0));
    volume.follow(&body);

    let resolver = point_resolver(CollisionConfig::stop().margin(0.0), scene);
    let sample = resolver
        .sample_pass(&nalgebra::Matrix4::identity(), &Vector3::y(), 5.0)
        .unwrap();
    assert_relative_eq!(sample.allowed, 0.5, epsilon = GEOM_TOL);
}

#[test]
fn surface_cannot_join_a_second_volume() {
    let surface = sphere_surface(0.5, Vector3::zeros());
    let mut first = BoundingVolume::new();
    first.add_surface(Rc::clone(&surface));
    let before = first.surface_pose(0).unwrap();

    let mut second = BoundingVolume::new();
    second.set_surface_offset(Vector3::new(0.0, 0.0, 2.0));
    assert_eq!(second.add_surface(Rc::clone(&surface)), None);
    assert_eq!(first.surface_pose(0).unwrap(), before);

    first.clear();
    assert_eq!(second.add_surface(surface), Some(0));
}
