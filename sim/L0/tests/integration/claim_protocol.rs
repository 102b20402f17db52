//! Advisory claims on bounding volumes.
//!
//! A claim is a non-blocking flag: the first `lock()` wins, every later one
//! fails until `unlock()`. Resolvers sharing a volume's flag skip the tick
//! instead of waiting.

use nalgebra::Vector3;
use sim_contact::BoundingVolume;
use crate::test_utils::{moving_body, point_resolver, wall_x};
use sim_motion::CollisionConfig;
use sim_types::KinematicBody;

/// Deterministic pseudo-random op sequence; `true` is `lock`, `false` is `unlock`.
fn op_sequence(len: usize, mut seed: u64) -> Vec<bool> {
    (0..len)
        .map(|_| {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            (seed >> 33) % 3 != 0
        })
        .collect()
}

#[test]
fn lock_is_mutually_exclusive_over_any_sequence() {
    for seed in [1, 7, 42, 1234] {
        let volume = BoundingVolume::new();
        let mut successes_since_unlock = 0;
        let mut just_unlocked = true;

        for lock in op_sequence(200, seed) {
            if lock {
                let acquired = volume.lock();
                if just_unlocked {
                    assert!(acquired, "lock right after unlock must succeed");
                }
                if acquired {
                    successes_since_unlock += 1;
                }
                assert!(successes_since_unlock <= 1);
                just_unlocked = false;
            } else {
                volume.unlock();
                successes_since_unlock = 0;
                just_unlocked = true;
            }
        }
    }
}

#[test]
fn unlock_is_idempotent() {
    let volume = BoundingVolume::new();
    volume.unlock();
    volume.unlock();
    assert!(volume.lock());
    volume.unlock();
    volume.unlock();
    assert!(!volume.is_locked());
}

#[test]
fn dropped_body_releases_its_claim() {
    let volume = BoundingVolume::new();
    {
        let mut body = KinematicBody::default();
        body.hold_claim(volume.claim().unwrap());
        assert!(volume.claim().is_none());
    }
    assert!(!volume.is_locked());
}

#[test]
fn stale_claim_never_frees_a_newer_holder() {
    let volume = BoundingVolume::new();
    let mut first = KinematicBody::default();
    first.hold_claim(volume.claim().unwrap());

    // The volume is force-released and someone else takes it.
    volume.unlock();
    let mut second = KinematicBody::default();
    second.hold_claim(volume.claim().unwrap());

    drop(first);
    assert!(volume.is_locked());
    assert!(!volume.lock());
    assert!(second.holds_claim());

    drop(second);
    assert!(volume.lock());
}

#[test]
fn second_resolver_skips_while_claimed() {
    let volume = BoundingVolume::new();
    let mut body = moving_body(Vector3::new(1.0, 0.0, 0.0));
    let mut primary = point_resolver(CollisionConfig::stop(), wall_x(10.0));
    let mut secondary = point_resolver(CollisionConfig::slide(), wall_x(10.0));

    let token = volume.claim().unwrap();
    let skipped = secondary
        .update_claimed(volume.claim_flag(), &mut body, 1.0)
        .unwrap();
    assert_eq!(skipped, None);
    assert_eq!(body.position(), Vector3::zeros());

    // The holder itself resolves without the flag.
    primary.update(&mut body, 1.0).unwrap();
    drop(token);

    assert!(
        secondary
            .update_claimed(volume.claim_flag(), &mut body, 1.0)
            .unwrap()
            .is_some()
    );
    assert_eq!(body.position(), Vector3::new(2.0, 0.0, 0.0));
}
