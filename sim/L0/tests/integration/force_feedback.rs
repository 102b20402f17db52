//! Force feedback through a haptic device.
//!
//! A probe sphere of radius `r` around each hot point is tested against a
//! ground plane. With the point at height `h`, penetration is `r - h` and the
//! rendered force is `max * (1 - sqrt(1 - (p / r)^2))` along the surface
//! normal.

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use crate::test_utils::{FORCE_TOL, ground, moving_body};
use sim_motion::{
    CollisionConfig, CollisionResolver, ForceLog, HapticDevice, HotPoints, ResolveOutcome,
    elliptical_force,
};

const MAX_FORCE: f64 = 3.0;
const RADIUS: f64 = 0.5;

fn haptic_resolver(points: &[Point3<f64>]) -> (CollisionResolver, Rc<RefCell<ForceLog>>) {
    let log = Rc::new(RefCell::new(ForceLog::new()));
    let device: Box<dyn HapticDevice> = Box::new(Rc::clone(&log));
    let resolver = CollisionResolver::new(CollisionConfig::force_feedback(MAX_FORCE, RADIUS))
        .unwrap()
        .with_scene(ground())
        .with_device(device)
        .with_points(HotPoints::from_points(points).unwrap());
    (resolver, log)
}

fn force_at_height(height: f64) -> Vector3<f64> {
    let (mut resolver, log) = haptic_resolver(&[Point3::new(0.0, 0.0, height)]);
    let mut body = moving_body(Vector3::new(0.1, 0.0, 0.0));
    let outcome = resolver.update(&mut body, 0.01).unwrap();
    let ResolveOutcome::ForceApplied { force } = outcome else {
        panic!("expected a force, got {outcome:?}");
    };
    assert_eq!(log.borrow().last(), Some(force));
    force
}

#[test]
fn zero_penetration_gives_zero_force() {
    assert_relative_eq!(elliptical_force(MAX_FORCE, 0.0, RADIUS), 0.0);
    assert_relative_eq!(force_at_height(RADIUS).norm(), 0.0, epsilon = FORCE_TOL);
}

#[test]
fn full_penetration_gives_max_force() {
    assert_relative_eq!(elliptical_force(MAX_FORCE, RADIUS, RADIUS), MAX_FORCE);
    let force = force_at_height(0.0);
    assert_relative_eq!(force, Vector3::new(0.0, 0.0, MAX_FORCE), epsilon = FORCE_TOL);
}

#[test]
fn falloff_is_elliptical_between_bounds() {
    let force = force_at_height(0.25);
    let expected = MAX_FORCE * (1.0 - (1.0 - 0.25_f64).sqrt());
    assert_relative_eq!(force.z, expected, epsilon = FORCE_TOL);
    assert!(force.z > 0.0 && force.z < MAX_FORCE);
}

#[test]
fn deepest_point_drives_the_force() {
    let (mut resolver, log) = haptic_resolver(&[
        Point3::new(0.0, 0.0, 0.45),
        Point3::new(1.0, 0.0, 0.1),
        Point3::new(2.0, 0.0, 0.3),
    ]);
    let mut body = moving_body(Vector3::x());
    resolver.update(&mut body, 0.01).unwrap();

    let expected = elliptical_force(MAX_FORCE, 0.4, RADIUS);
    assert_relative_eq!(log.borrow().last().unwrap().z, expected, epsilon = FORCE_TOL);
}

#[test]
fn force_feedback_leaves_motion_alone() {
    let (mut resolver, log) = haptic_resolver(&[Point3::origin()]);
    let mut body = moving_body(Vector3::new(0.0, 0.0, -2.0));
    resolver.update(&mut body, 0.5).unwrap();
    resolver.update(&mut body, 0.5).unwrap();

    assert_eq!(body.position(), Vector3::zeros());
    assert_eq!(body.velocity(), Vector3::new(0.0, 0.0, -2.0));
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn out_of_reach_sends_zero_force() {
    let (mut resolver, log) = haptic_resolver(&[Point3::new(0.0, 0.0, 2.0)]);
    let mut body = moving_body(Vector3::x());
    resolver.update(&mut body, 0.01).unwrap();
    assert_eq!(log.borrow().forces(), &[Vector3::zeros()]);
}

#[test]
fn stationary_body_sends_nothing() {
    let (mut resolver, log) = haptic_resolver(&[Point3::origin()]);
    let mut body = moving_body(Vector3::zeros());
    assert_eq!(resolver.update(&mut body, 0.01).unwrap(), ResolveOutcome::Idle);
    assert!(log.borrow().is_empty());
}
