//! Local-frame geometric shapes.
//!
//! A [`Shape`] is defined in its own frame and placed in the world by an
//! [`Isometry3`]. Shapes know their world bounds and the closest point on
//! their surface to an arbitrary world point; segment casts live in
//! [`crate::raycast`].
//!
//! Conventions (shared with the simulation crates):
//!
//! - Boxes are centered on the origin with the given half-extents.
//! - Capsules run along local Z from `-half_length` to `+half_length`.
//! - Planes satisfy `normal · x = distance`; the solid side is below.
//! - Triangles are two-sided; their geometric normal follows the winding.

use nalgebra::{Isometry3, Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::SpatialError;
use crate::overlap::Aabb;

/// Norm below which vectors are treated as degenerate.
pub const GEOM_EPSILON: f64 = 1e-10;

/// Half-size used to bound infinite planes.
pub const PLANE_EXTENT: f64 = 1e6;

/// Geometric primitive in local coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Shape {
    /// Sphere centered on the origin.
    Sphere {
        /// Sphere radius.
        radius: f64,
    },
    /// Box centered on the origin.
    Box {
        /// Half-extents along each local axis.
        half_extents: Vector3<f64>,
    },
    /// Capsule along local Z.
    Capsule {
        /// Half-length of the axis segment.
        half_length: f64,
        /// Capsule radius.
        radius: f64,
    },
    /// Infinite plane `normal · x = distance`.
    Plane {
        /// Unit normal.
        normal: Vector3<f64>,
        /// Offset along the normal.
        distance: f64,
    },
    /// Two-sided triangle.
    Triangle {
        /// First vertex.
        a: Point3<f64>,
        /// Second vertex.
        b: Point3<f64>,
        /// Third vertex.
        c: Point3<f64>,
    },
}

/// A point on a shape's surface with the outward normal there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    /// World-space surface point.
    pub point: Point3<f64>,
    /// Unit outward normal (toward the query side for triangles).
    pub normal: Vector3<f64>,
}

impl SurfacePoint {
    /// Signed distance of `query` from the surface along the normal.
    ///
    /// Negative when `query` lies inside a solid.
    #[must_use]
    pub fn signed_distance(&self, query: &Point3<f64>) -> f64 {
        (query - self.point).dot(&self.normal)
    }
}

impl Shape {
    /// Create a sphere.
    #[must_use]
    pub const fn sphere(radius: f64) -> Self {
        Self::Sphere { radius }
    }

    /// Create a box from half-extents.
    #[must_use]
    pub const fn cuboid(half_extents: Vector3<f64>) -> Self {
        Self::Box { half_extents }
    }

    /// Create a capsule along local Z.
    #[must_use]
    pub const fn capsule(half_length: f64, radius: f64) -> Self {
        Self::Capsule {
            half_length,
            radius,
        }
    }

    /// Create a plane, normalizing the normal.
    ///
    /// The offset is scaled along with the normal so the plane is unchanged.
    #[must_use]
    pub fn plane(normal: Vector3<f64>, distance: f64) -> Self {
        let norm = normal.norm();
        if norm < GEOM_EPSILON {
            return Self::Plane { normal, distance };
        }
        Self::Plane {
            normal: normal / norm,
            distance: distance / norm,
        }
    }

    /// Create a triangle.
    #[must_use]
    pub const fn triangle(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>) -> Self {
        Self::Triangle { a, b, c }
    }

    /// Check that the shape's parameters describe real geometry.
    pub fn validate(&self) -> Result<(), SpatialError> {
        match *self {
            Self::Sphere { radius } => positive_radius(radius),
            Self::Box { half_extents } => half_extents
                .iter()
                .try_for_each(|&h| non_negative_extent(h)),
            Self::Capsule {
                half_length,
                radius,
            } => {
                non_negative_extent(half_length)?;
                positive_radius(radius)
            }
            Self::Plane { normal, distance } => {
                if normal.norm() < GEOM_EPSILON || !distance.is_finite() {
                    return Err(SpatialError::DegenerateNormal);
                }
                Ok(())
            }
            Self::Triangle { a, b, c } => {
                if (b - a).cross(&(c - a)).norm() < GEOM_EPSILON {
                    return Err(SpatialError::DegenerateTriangle);
                }
                Ok(())
            }
        }
    }

    /// World-space bounds of the shape placed at `pose`.
    #[must_use]
    pub fn aabb(&self, pose: &Isometry3<f64>) -> Aabb {
        let center = Point3::from(pose.translation.vector);
        match *self {
            Self::Sphere { radius } => Aabb::from_center(center, Vector3::repeat(radius)),
            Self::Box { half_extents } => {
                let rotation = pose.rotation.to_rotation_matrix();
                let abs = rotation.matrix().abs();
                Aabb::from_center(center, abs * half_extents)
            }
            Self::Capsule {
                half_length,
                radius,
            } => {
                let (start, end) = capsule_endpoints(pose, half_length);
                Aabb::new(start, end).expanded(radius)
            }
            Self::Plane { normal, distance } => {
                let n = pose.rotation * normal;
                let on_plane = pose * Point3::from(normal * distance);
                let mut half = Vector3::repeat(PLANE_EXTENT);
                for i in 0..3 {
                    if n[i].abs() > 1.0 - 1e-9 {
                        half[i] = 0.0;
                    }
                }
                let mut aabb = Aabb::from_center(on_plane, half);
                for i in 0..3 {
                    if half[i] > 0.0 {
                        aabb.min[i] = -PLANE_EXTENT;
                        aabb.max[i] = PLANE_EXTENT;
                    }
                }
                aabb
            }
            Self::Triangle { a, b, c } => {
                let mut aabb = Aabb::new(pose * a, pose * b);
                aabb.expand_to_include(&(pose * c));
                aabb
            }
        }
    }

    /// Closest point on the surface to `query`, with the outward normal.
    #[must_use]
    pub fn closest_point(&self, pose: &Isometry3<f64>, query: &Point3<f64>) -> SurfacePoint {
        let local = pose.inverse_transform_point(query);
        let (point, normal) = match *self {
            Self::Sphere { radius } => {
                let normal = unit_or(local.coords, Vector3::z());
                (Point3::from(normal * radius), normal)
            }
            Self::Box { half_extents } => closest_on_box(&local, &half_extents),
            Self::Capsule {
                half_length,
                radius,
            } => {
                let axis_z = local.z.clamp(-half_length, half_length);
                let on_axis = Point3::new(0.0, 0.0, axis_z);
                let normal = unit_or(local - on_axis, Vector3::x());
                (on_axis + normal * radius, normal)
            }
            Self::Plane { normal, distance } => {
                let height = normal.dot(&local.coords) - distance;
                (local - normal * height, normal)
            }
            Self::Triangle { a, b, c } => {
                let point = closest_on_triangle(&local, &a, &b, &c);
                let face = unit_or((b - a).cross(&(c - a)), Vector3::z());
                let normal = if (local - point).dot(&face) < 0.0 {
                    -face
                } else {
                    face
                };
                (point, normal)
            }
        };

        SurfacePoint {
            point: pose * point,
            normal: pose.rotation * normal,
        }
    }
}

/// World endpoints of a capsule's axis segment.
#[must_use]
pub fn capsule_endpoints(pose: &Isometry3<f64>, half_length: f64) -> (Point3<f64>, Point3<f64>) {
    let axis = pose.rotation * Vector3::new(0.0, 0.0, half_length);
    let center = Point3::from(pose.translation.vector);
    (center - axis, center + axis)
}

/// Closest point on segment `[a, b]` to `p`.
#[must_use]
pub fn closest_point_on_segment(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> Point3<f64> {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < GEOM_EPSILON * GEOM_EPSILON {
        return *a;
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Closest points between segments `[p1, q1]` and `[p2, q2]`.
///
/// Returns `(on_first, on_second)`.
#[must_use]
pub fn closest_points_segments(
    p1: &Point3<f64>,
    q1: &Point3<f64>,
    p2: &Point3<f64>,
    q2: &Point3<f64>,
) -> (Point3<f64>, Point3<f64>) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);
    let eps = GEOM_EPSILON * GEOM_EPSILON;

    let (s, t) = if a <= eps && e <= eps {
        (0.0, 0.0)
    } else if a <= eps {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= eps {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let mut s = if denom > eps {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t = (b * s + f) / e;
            if t < 0.0 {
                t = 0.0;
                s = (-c / a).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / a).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}

fn unit_or(v: Vector3<f64>, fallback: Vector3<f64>) -> Vector3<f64> {
    let norm = v.norm();
    if norm > GEOM_EPSILON { v / norm } else { fallback }
}

fn positive_radius(radius: f64) -> Result<(), SpatialError> {
    if radius > 0.0 && radius.is_finite() {
        Ok(())
    } else {
        Err(SpatialError::InvalidRadius(radius))
    }
}

fn non_negative_extent(extent: f64) -> Result<(), SpatialError> {
    if extent >= 0.0 && extent.is_finite() {
        Ok(())
    } else {
        Err(SpatialError::InvalidExtent(extent))
    }
}

fn closest_on_box(local: &Point3<f64>, half: &Vector3<f64>) -> (Point3<f64>, Vector3<f64>) {
    let clamped = local.sup(&Point3::from(-half)).inf(&Point3::from(*half));
    let outside = local - clamped;
    if outside.norm() > GEOM_EPSILON {
        return (clamped, outside.normalize());
    }

    // Inside: push out through the nearest face.
    let mut axis = 0;
    let mut best = f64::INFINITY;
    for i in 0..3 {
        let depth = half[i] - local[i].abs();
        if depth < best {
            best = depth;
            axis = i;
        }
    }
    let sign = if local[axis] < 0.0 { -1.0 } else { 1.0 };
    let mut point = *local;
    point[axis] = sign * half[axis];
    let mut normal = Vector3::zeros();
    normal[axis] = sign;
    (point, normal)
}

/// Closest point on triangle `abc` to `p` (Voronoi-region walk).
fn closest_on_triangle(
    p: &Point3<f64>,
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Point3<f64> {
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return a + ab * (d1 / (d1 - d3));
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return a + ac * (d2 / (d2 - d6));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        return b + (c - b) * ((d4 - d3) / ((d4 - d3) + (d5 - d6)));
    }

    let denom = 1.0 / (va + vb + vc);
    a + ab * (vb * denom) + ac * (vc * denom)
}
