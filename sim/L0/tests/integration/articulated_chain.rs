//! Articulated chains swept through a scene.
//!
//! ```text
//!   root        elbow        tip
//!    o -----------o -----------o      joints at x = 0, 1, 2
//!      segment 0    segment 1
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_relative_eq;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use crate::test_utils::{add_box, add_sphere, empty_scene};
use sim_motion::{
    ArticulatedChain, ArticulatedCollision, ChainJoint, ChainOutcome, IkConfig, InverseKinematics,
    SEGMENT_COUNT,
};
use sim_types::{KinematicBody, SharedBody};

fn shared() -> SharedBody {
    Rc::new(RefCell::new(KinematicBody::default()))
}

fn arm() -> (ArticulatedChain, SharedBody, SharedBody) {
    let (shoulder, elbow) = (shared(), shared());
    let chain = ArticulatedChain::new(vec![
        ChainJoint::new(Rc::clone(&shoulder), Vector3::x()),
        ChainJoint::new(Rc::clone(&elbow), Vector3::x()),
    ])
    .unwrap();
    (chain, shoulder, elbow)
}

#[test]
fn forward_kinematics_follow_joint_orientations() {
    let (chain, shoulder, elbow) = arm();
    shoulder
        .borrow_mut()
        .set_orientation(UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.5));
    elbow
        .borrow_mut()
        .set_orientation(UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -0.5));

    let positions = chain.joint_positions();
    assert_relative_eq!(positions[1], Point3::new(0.5_f64.cos(), 0.5_f64.sin(), 0.0), epsilon = 1e-12);
    assert_relative_eq!(
        positions[2],
        Point3::new(0.5_f64.cos() + 1.0, 0.5_f64.sin(), 0.0),
        epsilon = 1e-12
    );
}

#[test]
fn segments_are_tested_root_first() {
    // Obstacles near both segments: only the root one is corrected.
    let scene = empty_scene();
    add_sphere(&scene, Vector3::new(0.5, 0.1, 0.0), 0.2);
    add_sphere(&scene, Vector3::new(1.5, 0.1, 0.0), 0.2);

    let (chain, _, _) = arm();
    let mut collision = ArticulatedCollision::new().with_scene(scene.clone());
    collision.set_segment_radius(0.1).unwrap();

    let outcome = collision.update(&chain);
    assert!(matches!(outcome, ChainOutcome::Corrected { segment: 0, .. }));
    assert_eq!(scene.query_count(), SEGMENT_COUNT);
}

#[test]
fn contact_is_closest_ring_hit() {
    let scene = empty_scene();
    add_box(&scene, Vector3::new(1.6, 0.0, 0.0), Vector3::new(0.1, 1.0, 1.0));

    let (chain, _, _) = arm();
    let mut collision = ArticulatedCollision::new().with_scene(scene);
    collision.set_segment_radius(0.05).unwrap();

    let ChainOutcome::Corrected { segment, contact, .. } = collision.update(&chain) else {
        panic!("expected the wall to be hit");
    };
    assert_eq!(segment, 1);
    assert_relative_eq!(contact.point.x, 1.5, epsilon = 1e-9);
}

#[test]
fn correction_moves_the_tip_toward_contact() {
    let scene = empty_scene();
    add_sphere(&scene, Vector3::new(1.5, 0.15, 0.0), 0.2);

    let (chain, shoulder, elbow) = arm();
    let ik = InverseKinematics::new(IkConfig::precise()).unwrap();
    let mut collision = ArticulatedCollision::new().with_scene(scene).with_ik(ik);
    collision.set_segment_radius(0.1).unwrap();

    let ChainOutcome::Corrected { contact, ik, .. } = collision.update(&chain) else {
        panic!("expected a correction");
    };
    assert!(ik.reached);
    assert_relative_eq!(chain.end_effector(), contact.point, epsilon = 1e-4);

    // Link lengths are preserved; only orientations change.
    let positions = chain.joint_positions();
    assert_relative_eq!((positions[1] - positions[0]).norm(), 1.0, epsilon = 1e-9);
    assert_relative_eq!((positions[2] - positions[1]).norm(), 1.0, epsilon = 1e-9);
    assert_eq!(shoulder.borrow().position(), Vector3::zeros());
    assert_eq!(elbow.borrow().position(), Vector3::zeros());
}

#[test]
fn clear_scene_leaves_chain_alone() {
    let scene = empty_scene();
    add_sphere(&scene, Vector3::new(0.0, 4.0, 0.0), 0.5);

    let (chain, _, _) = arm();
    let before = chain.end_effector();
    let outcome = ArticulatedCollision::new().with_scene(scene.clone()).update(&chain);

    assert_eq!(outcome, ChainOutcome::Clear { segments: 2 });
    assert_eq!(chain.end_effector(), before);
    assert_eq!(scene.query_count(), 2 * SEGMENT_COUNT);
}
