//! Analytical narrow-phase tests between posed primitives.
//!
//! Every routine reports contacts with the normal pointing from the first
//! shape toward the second and a non-negative penetration depth. Pairs with
//! no routine (plane/plane, triangle/triangle, box/triangle, plane/triangle)
//! produce nothing.

use cf_spatial::{
    GEOM_EPSILON, Shape, capsule_endpoints, closest_point_on_segment, closest_points_segments,
};
use nalgebra::{Isometry3, Point3, Vector3};

/// Refinement steps for the capsule-vs-convex closest-point search.
const CAPSULE_REFINE_STEPS: usize = 4;

/// One contact between two primitives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeContact {
    /// World-space contact location.
    pub position: Point3<f64>,
    /// Unit normal from the first shape toward the second.
    pub normal: Vector3<f64>,
    /// Overlap depth along the normal.
    pub penetration: f64,
}

impl ShapeContact {
    fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

/// Contacts between `a` at `pose_a` and `b` at `pose_b`.
#[must_use]
pub fn collide_shapes(
    a: &Shape,
    pose_a: &Isometry3<f64>,
    b: &Shape,
    pose_b: &Isometry3<f64>,
) -> Vec<ShapeContact> {
    match (a, b) {
        (Shape::Sphere { radius }, _) => {
            let center = Point3::from(pose_a.translation.vector);
            sphere_against(&center, *radius, b, pose_b)
                .map(ShapeContact::flipped)
                .into_iter()
                .collect()
        }
        (_, Shape::Sphere { .. }) => flip_all(collide_shapes(b, pose_b, a, pose_a)),

        (
            Shape::Capsule {
                half_length: la,
                radius: ra,
            },
            Shape::Capsule {
                half_length: lb,
                radius: rb,
            },
        ) => capsule_capsule(pose_a, *la, *ra, pose_b, *lb, *rb)
            .into_iter()
            .collect(),
        (Shape::Capsule { half_length, radius }, Shape::Plane { .. }) => {
            let (p, q) = capsule_endpoints(pose_a, *half_length);
            [p, q]
                .iter()
                .filter_map(|end| sphere_against(end, *radius, b, pose_b))
                .map(ShapeContact::flipped)
                .collect()
        }
        (Shape::Capsule { half_length, radius }, Shape::Box { .. } | Shape::Triangle { .. }) => {
            capsule_against(pose_a, *half_length, *radius, b, pose_b)
                .map(ShapeContact::flipped)
                .into_iter()
                .collect()
        }
        (Shape::Plane { .. } | Shape::Box { .. } | Shape::Triangle { .. }, Shape::Capsule { .. }) => {
            flip_all(collide_shapes(b, pose_b, a, pose_a))
        }

        (Shape::Box { half_extents }, Shape::Plane { .. }) => {
            corners_below(half_extents, pose_a, b, pose_b)
        }
        (Shape::Plane { .. }, Shape::Box { .. }) => flip_all(collide_shapes(b, pose_b, a, pose_a)),
        (Shape::Box { half_extents: ha }, Shape::Box { half_extents: hb }) => {
            let mut contacts = corners_inside(ha, pose_a, b, pose_b);
            contacts.extend(flip_all(corners_inside(hb, pose_b, a, pose_a)));
            contacts
        }

        _ => Vec::new(),
    }
}

fn flip_all(contacts: Vec<ShapeContact>) -> Vec<ShapeContact> {
    contacts.into_iter().map(ShapeContact::flipped).collect()
}

/// Sphere against any shape. The normal points from `shape` toward the sphere.
fn sphere_against(
    center: &Point3<f64>,
    radius: f64,
    shape: &Shape,
    pose: &Isometry3<f64>,
) -> Option<ShapeContact> {
    let surface = shape.closest_point(pose, center);
    let penetration = radius - surface.signed_distance(center);
    if penetration < 0.0 {
        return None;
    }
    // Midway between the surface and the sphere's deepest point.
    Some(ShapeContact {
        position: surface.point - surface.normal * (penetration * 0.5),
        normal: surface.normal,
        penetration,
    })
}

fn capsule_capsule(
    pose_a: &Isometry3<f64>,
    half_a: f64,
    radius_a: f64,
    pose_b: &Isometry3<f64>,
    half_b: f64,
    radius_b: f64,
) -> Option<ShapeContact> {
    let (p1, q1) = capsule_endpoints(pose_a, half_a);
    let (p2, q2) = capsule_endpoints(pose_b, half_b);
    let (on_a, on_b) = closest_points_segments(&p1, &q1, &p2, &q2);

    let diff = on_b - on_a;
    let dist = diff.norm();
    let penetration = radius_a + radius_b - dist;
    if penetration < 0.0 {
        return None;
    }
    // Crossing axes: pick +Z.
    let normal = if dist > GEOM_EPSILON {
        diff / dist
    } else {
        Vector3::z()
    };
    Some(ShapeContact {
        position: on_a + normal * (radius_a - penetration * 0.5),
        normal,
        penetration,
    })
}

/// Capsule against a box or triangle, treated as the sphere on the capsule
/// axis nearest the shape. The normal points from `shape` toward the capsule.
fn capsule_against(
    pose: &Isometry3<f64>,
    half_length: f64,
    radius: f64,
    shape: &Shape,
    shape_pose: &Isometry3<f64>,
) -> Option<ShapeContact> {
    let (p, q) = capsule_endpoints(pose, half_length);
    let mut on_axis = Point3::from(pose.translation.vector);
    for _ in 0..CAPSULE_REFINE_STEPS {
        let on_shape = shape.closest_point(shape_pose, &on_axis).point;
        on_axis = closest_point_on_segment(&on_shape, &p, &q);
    }
    sphere_against(&on_axis, radius, shape, shape_pose)
}

fn box_corners(half: &Vector3<f64>, pose: &Isometry3<f64>) -> [Point3<f64>; 8] {
    let mut corners = [Point3::origin(); 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        let sign = |bit: usize| if i & bit == 0 { -1.0 } else { 1.0 };
        *corner = pose * Point3::new(sign(1) * half.x, sign(2) * half.y, sign(4) * half.z);
    }
    corners
}

/// Box corners lying on or below a plane. Normal points from box to plane.
fn corners_below(
    half: &Vector3<f64>,
    box_pose: &Isometry3<f64>,
    plane: &Shape,
    plane_pose: &Isometry3<f64>,
) -> Vec<ShapeContact> {
    box_corners(half, box_pose)
        .iter()
        .filter_map(|corner| {
            let surface = plane.closest_point(plane_pose, corner);
            let depth = -surface.signed_distance(corner);
            (depth >= 0.0).then(|| ShapeContact {
                position: *corner,
                normal: -surface.normal,
                penetration: depth,
            })
        })
        .collect()
}

/// Corners of the first box inside the second. Normal points first to second.
fn corners_inside(
    half: &Vector3<f64>,
    pose: &Isometry3<f64>,
    other: &Shape,
    other_pose: &Isometry3<f64>,
) -> Vec<ShapeContact> {
    box_corners(half, pose)
        .iter()
        .filter_map(|corner| {
            let surface = other.closest_point(other_pose, corner);
            let depth = -surface.signed_distance(corner);
            (depth > 0.0).then(|| ShapeContact {
                position: *corner,
                normal: -surface.normal,
                penetration: depth,
            })
        })
        .collect()
}
