//! Segment casts against shapes.
//!
//! A [`Segment`] is swept from `start` to `end`; [`cast_segment`] reports the
//! first surface crossing along it. The reported normal is the raw geometric
//! normal of the surface at the hit, which need not face the segment's start:
//! a segment leaving a solid, or crossing a triangle or plane from behind,
//! reports a normal that points along the direction of travel.
//!
//! # Example
//!
//! ```
//! use cf_spatial::{Segment, Shape, cast_segment};
//! use nalgebra::{Isometry3, Point3};
//!
//! let wall = Shape::sphere(1.0);
//! let pose = Isometry3::translation(5.0, 0.0, 0.0);
//! let segment = Segment::new(Point3::origin(), Point3::new(10.0, 0.0, 0.0));
//!
//! let hit = cast_segment(&wall, &pose, &segment).unwrap();
//! assert!((hit.point.x - 4.0).abs() < 1e-10);
//! assert!((hit.fraction - 0.4).abs() < 1e-10);
//! ```

use nalgebra::{Isometry3, Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::shape::{GEOM_EPSILON, Shape, capsule_endpoints};

/// A directed line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    /// Where the segment starts.
    pub start: Point3<f64>,
    /// Where the segment ends.
    pub end: Point3<f64>,
}

impl Segment {
    /// Creates a segment between two points.
    #[must_use]
    pub const fn new(start: Point3<f64>, end: Point3<f64>) -> Self {
        Self { start, end }
    }

    /// Creates a segment from a start point, a direction, and a length.
    ///
    /// The direction is normalized; a zero direction yields a point segment.
    #[must_use]
    pub fn from_direction(start: Point3<f64>, direction: &Vector3<f64>, length: f64) -> Self {
        let dir = direction.try_normalize(GEOM_EPSILON).unwrap_or_else(Vector3::zeros);
        Self {
            start,
            end: start + dir * length,
        }
    }

    /// Vector from start to end.
    #[must_use]
    pub fn delta(&self) -> Vector3<f64> {
        self.end - self.start
    }

    /// Length of the segment.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.delta().norm()
    }

    /// Point at parameter `t` (0 = start, 1 = end).
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        self.start + self.delta() * t
    }
}

/// Where a segment first crosses a surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentHit {
    /// Parameter along the segment in `[0, 1]`.
    pub fraction: f64,
    /// World-space hit point.
    pub point: Point3<f64>,
    /// Raw geometric normal at the hit point.
    pub normal: Vector3<f64>,
}

/// Cast a segment against a shape placed at `pose`.
///
/// Returns the first crossing, or `None` if the segment misses or has zero
/// length.
#[must_use]
pub fn cast_segment(shape: &Shape, pose: &Isometry3<f64>, segment: &Segment) -> Option<SegmentHit> {
    if segment.length() < GEOM_EPSILON {
        return None;
    }

    let (fraction, normal) = match *shape {
        Shape::Sphere { radius } => {
            let center = Point3::from(pose.translation.vector);
            let t = sphere_crossing(&center, radius, segment)?;
            let normal = (segment.point_at(t) - center) / radius;
            (t, normal)
        }
        Shape::Box { half_extents } => {
            let start = pose.inverse_transform_point(&segment.start);
            let end = pose.inverse_transform_point(&segment.end);
            let (t, local_normal) = box_crossing(&start, &(end - start), &half_extents)?;
            (t, pose.rotation * local_normal)
        }
        Shape::Capsule {
            half_length,
            radius,
        } => {
            let (a, b) = capsule_endpoints(pose, half_length);
            capsule_crossing(&a, &b, radius, segment)?
        }
        Shape::Plane { normal, distance } => {
            let n = pose.rotation * normal;
            let on_plane = pose * Point3::from(normal * distance);
            let t = plane_crossing(&n, &on_plane, segment)?;
            (t, n)
        }
        Shape::Triangle { a, b, c } => {
            let (a, b, c) = (pose * a, pose * b, pose * c);
            let t = triangle_crossing(&a, &b, &c, segment)?;
            let normal = (b - a).cross(&(c - a)).try_normalize(GEOM_EPSILON)?;
            (t, normal)
        }
    };

    Some(SegmentHit {
        fraction,
        point: segment.point_at(fraction),
        normal,
    })
}

fn in_unit(t: f64) -> bool {
    (0.0..=1.0).contains(&t)
}

/// Roots of `|start + t*d - center|^2 = r^2`, smallest first.
fn sphere_roots(center: &Point3<f64>, radius: f64, segment: &Segment) -> Option<(f64, f64)> {
    let d = segment.delta();
    let m = segment.start - center;
    let a = d.norm_squared();
    let b = m.dot(&d);
    let c = m.norm_squared() - radius * radius;
    let disc = b * b - a * c;
    if disc < 0.0 {
        return None;
    }
    let sqrt = disc.sqrt();
    Some(((-b - sqrt) / a, (-b + sqrt) / a))
}

fn sphere_crossing(center: &Point3<f64>, radius: f64, segment: &Segment) -> Option<f64> {
    let (t0, t1) = sphere_roots(center, radius, segment)?;
    if in_unit(t0) {
        Some(t0)
    } else if t0 < 0.0 && in_unit(t1) {
        // Starts inside; report the exit.
        Some(t1)
    } else {
        None
    }
}

/// Slab test in the box frame.
fn box_crossing(
    start: &Point3<f64>,
    delta: &Vector3<f64>,
    half: &Vector3<f64>,
) -> Option<(f64, Vector3<f64>)> {
    let mut t_enter = f64::NEG_INFINITY;
    let mut t_exit = f64::INFINITY;
    let mut enter_axis = 0;
    let mut exit_axis = 0;

    for i in 0..3 {
        if delta[i].abs() < GEOM_EPSILON {
            if start[i].abs() > half[i] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / delta[i];
        let mut t_near = (-half[i] - start[i]) * inv;
        let mut t_far = (half[i] - start[i]) * inv;
        if t_near > t_far {
            std::mem::swap(&mut t_near, &mut t_far);
        }
        if t_near > t_enter {
            t_enter = t_near;
            enter_axis = i;
        }
        if t_far < t_exit {
            t_exit = t_far;
            exit_axis = i;
        }
        if t_enter > t_exit {
            return None;
        }
    }

    let (t, axis, sign) = if t_enter >= 0.0 {
        (t_enter, enter_axis, -delta[enter_axis].signum())
    } else {
        (t_exit, exit_axis, delta[exit_axis].signum())
    };
    if !in_unit(t) {
        return None;
    }
    let mut normal = Vector3::zeros();
    normal[axis] = sign;
    Some((t, normal))
}

fn capsule_crossing(
    a: &Point3<f64>,
    b: &Point3<f64>,
    radius: f64,
    segment: &Segment,
) -> Option<(f64, Vector3<f64>)> {
    let axis = b - a;
    let axis_len_sq = axis.norm_squared();
    let mut best: Option<f64> = None;
    let mut consider = |t: f64| {
        if in_unit(t) && best.is_none_or(|b| t < b) {
            best = Some(t);
        }
    };

    // Cylindrical side, restricted to the axis span.
    if axis_len_sq > GEOM_EPSILON * GEOM_EPSILON {
        let d = segment.delta();
        let m = segment.start - a;
        let d_perp = d - axis * (d.dot(&axis) / axis_len_sq);
        let m_perp = m - axis * (m.dot(&axis) / axis_len_sq);
        let qa = d_perp.norm_squared();
        if qa > GEOM_EPSILON * GEOM_EPSILON {
            let qb = m_perp.dot(&d_perp);
            let qc = m_perp.norm_squared() - radius * radius;
            let disc = qb * qb - qa * qc;
            if disc >= 0.0 {
                let sqrt = disc.sqrt();
                for t in [(-qb - sqrt) / qa, (-qb + sqrt) / qa] {
                    let along = (segment.point_at(t) - a).dot(&axis) / axis_len_sq;
                    if (0.0..=1.0).contains(&along) {
                        consider(t);
                    }
                }
            }
        }
    }

    // Hemispherical caps, only where they bulge past the axis span.
    for (center, outward) in [(a, -1.0), (b, 1.0)] {
        if let Some((t0, t1)) = sphere_roots(center, radius, segment) {
            for t in [t0, t1] {
                let along = (segment.point_at(t) - center).dot(&axis) * outward;
                if along >= 0.0 || axis_len_sq <= GEOM_EPSILON * GEOM_EPSILON {
                    consider(t);
                }
            }
        }
    }

    let t = best?;
    let point = segment.point_at(t);
    let on_axis = crate::shape::closest_point_on_segment(&point, a, b);
    let normal = (point - on_axis).try_normalize(GEOM_EPSILON)?;
    Some((t, normal))
}

fn plane_crossing(normal: &Vector3<f64>, on_plane: &Point3<f64>, segment: &Segment) -> Option<f64> {
    let denom = normal.dot(&segment.delta());
    if denom.abs() < GEOM_EPSILON {
        return None;
    }
    let t = normal.dot(&(on_plane - segment.start)) / denom;
    in_unit(t).then_some(t)
}

/// Two-sided Möller–Trumbore.
fn triangle_crossing(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    segment: &Segment,
) -> Option<f64> {
    let d = segment.delta();
    let e1 = b - a;
    let e2 = c - a;
    let p = d.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < GEOM_EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = segment.start - a;
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&e1);
    let v = d.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = e2.dot(&q) * inv_det;
    in_unit(t).then_some(t)
}
