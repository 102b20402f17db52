//! Point-sampling collision resolution.
//!
//! Each tick the resolver casts a segment from every hot point along the
//! body's direction of travel, keeps the shortest allowed travel distance,
//! and applies the configured response. Passes repeat from the partially
//! advanced position until the tick's distance is used up, nothing is hit,
//! or the pass cap is reached.
//!
//! # Tick Order
//!
//! 1. A motion model sets the body's linear velocity
//! 2. [`CollisionResolver::update`] advances the body's position and writes
//!    back the resolved velocity
//! 3. The caller integrates rotation with
//!    [`KinematicBody::update_angular`]
//!
//! # Distances
//!
//! A hit `h` along a segment from hot point `p` allows `|h - p| - margin` of
//! travel. For positional modes a second segment is cast from `p` against
//! the contact normal; its hit distance `q` gives `(q - margin) / cos` where
//! `cos` is the angle between travel and the normal, which keeps grazing
//! approaches from getting closer than `margin` to the surface.

use std::rc::Rc;

use cf_spatial::{GEOM_EPSILON, IntersectQuery, SpatialIntersector};
use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};
use sim_types::{ClaimFlag, KinematicBody, Result, SimError, frame_rotation};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::config::{
    CollisionConfig, CollisionMode, IDLE_SPEED, validate_margin, validate_max_force,
    validate_max_passes, validate_probe_radius,
};
use crate::haptic::HapticDevice;
use crate::hot_points::{HotPoints, MAX_POINTS, PointBuffer};

/// Below this cosine the refining segment runs parallel to travel and is ignored.
const MIN_APPROACH_COS: f64 = 1e-6;

type QueryBuffer = SmallVec<[IntersectQuery; MAX_POINTS]>;

/// How a tick ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolveOutcome {
    /// Stationary body, no scene, or no hot points; nothing was queried.
    Idle,
    /// The body moved its full distance without contact.
    Clear {
        /// Passes used.
        passes: usize,
    },
    /// Contact changed the body's motion.
    Collided {
        /// Passes used.
        passes: usize,
        /// Normal of the last contact, facing the body.
        normal: Vector3<f64>,
    },
    /// The pass cap was hit; velocity was zeroed and position left alone.
    Stuck {
        /// Passes used.
        passes: usize,
    },
    /// Force feedback: a force was pushed to the haptic device.
    ForceApplied {
        /// The force sent.
        force: Vector3<f64>,
    },
}

impl ResolveOutcome {
    /// True if the body's motion was affected by a contact.
    #[must_use]
    pub fn is_contact(&self) -> bool {
        matches!(self, Self::Collided { .. } | Self::Stuck { .. })
    }
}

/// The limiting contact of one sampling pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassContact {
    /// Index of the limiting hot point.
    pub point_index: usize,
    /// World-space hit point.
    pub point: Point3<f64>,
    /// Contact normal, facing against the direction of travel.
    pub normal: Vector3<f64>,
}

/// Result of one sampling and reduction pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassSample {
    /// Distance the body may travel this pass, at most the requested distance.
    pub allowed: f64,
    /// Set when a hit limits travel below the requested distance.
    pub contact: Option<PassContact>,
}

/// Slide `direction` along the plane with unit `normal`.
///
/// Returns the renormalized tangent direction and the projected length,
/// which scales speed and remaining distance. A direction straight into the
/// surface yields a zero vector and zero scale.
#[must_use]
pub fn slide_direction(direction: &Vector3<f64>, normal: &Vector3<f64>) -> (Vector3<f64>, f64) {
    let projected = direction - normal * direction.dot(normal);
    let magnitude = projected.norm();
    if magnitude < GEOM_EPSILON {
        return (Vector3::zeros(), 0.0);
    }
    (projected / magnitude, magnitude)
}

/// Reflect `direction` about the plane with unit `normal`.
#[must_use]
pub fn bounce_direction(direction: &Vector3<f64>, normal: &Vector3<f64>) -> Vector3<f64> {
    let reflected = direction - normal * (2.0 * direction.dot(normal));
    reflected.try_normalize(GEOM_EPSILON).unwrap_or(reflected)
}

/// Elliptical force falloff: zero at the probe surface, `max_force` at full depth.
///
/// `penetration` is clamped to `[0, radius]`.
#[must_use]
pub fn elliptical_force(max_force: f64, penetration: f64, radius: f64) -> f64 {
    if radius <= 0.0 {
        return 0.0;
    }
    let ratio = (penetration / radius).clamp(0.0, 1.0);
    max_force * (1.0 - (1.0 - ratio * ratio).sqrt())
}

/// Resolves a body's motion against scene geometry by sampling hot points.
///
/// # Example
///
/// ```
/// use cf_spatial::{IntersectMask, SceneGeometry, Shape};
/// use nalgebra::{Isometry3, Point3, Vector3};
/// use sim_motion::{CollisionConfig, CollisionResolver, HotPoints, ResolveOutcome};
/// use sim_types::KinematicBody;
/// use std::rc::Rc;
///
/// let scene = Rc::new(SceneGeometry::new());
/// scene
///     .insert(
///         Shape::cuboid(Vector3::new(0.5, 5.0, 5.0)),
///         Isometry3::translation(2.5, 0.0, 0.0),
///         IntersectMask::ALL,
///     )
///     .unwrap();
///
/// let mut resolver = CollisionResolver::new(CollisionConfig::stop())
///     .unwrap()
///     .with_scene(scene)
///     .with_points(HotPoints::single(Point3::origin()));
///
/// let mut body = KinematicBody::default();
/// body.set_velocity(Vector3::new(10.0, 0.0, 0.0));
/// let outcome = resolver.update(&mut body, 1.0).unwrap();
///
/// assert!(matches!(outcome, ResolveOutcome::Collided { .. }));
/// assert!((body.position().x - 1.9).abs() < 1e-9);
/// assert_eq!(body.speed(), 0.0);
/// ```
pub struct CollisionResolver {
    config: CollisionConfig,
    points: HotPoints,
    scene: Option<Rc<dyn SpatialIntersector>>,
    device: Option<Box<dyn HapticDevice>>,
}

impl std::fmt::Debug for CollisionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionResolver")
            .field("config", &self.config)
            .field("points", &self.points)
            .field("has_scene", &self.scene.is_some())
            .field("has_device", &self.device.is_some())
            .finish()
    }
}

impl Default for CollisionResolver {
    fn default() -> Self {
        Self {
            config: CollisionConfig::default(),
            points: HotPoints::new(),
            scene: None,
            device: None,
        }
    }
}

impl CollisionResolver {
    /// Creates a resolver with no scene and no hot points.
    ///
    /// # Errors
    ///
    /// Returns the validation error if `config` is invalid.
    pub fn new(config: CollisionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Default::default()
        })
    }

    /// Attach the scene to query.
    #[must_use]
    pub fn with_scene(mut self, scene: Rc<dyn SpatialIntersector>) -> Self {
        self.scene = Some(scene);
        self
    }

    /// Attach a haptic device.
    #[must_use]
    pub fn with_device(mut self, device: Box<dyn HapticDevice>) -> Self {
        self.device = Some(device);
        self
    }

    /// Replace the hot points.
    #[must_use]
    pub fn with_points(mut self, points: HotPoints) -> Self {
        self.points = points;
        self
    }

    /// Attach, replace, or detach the scene.
    pub fn set_scene(&mut self, scene: Option<Rc<dyn SpatialIntersector>>) {
        self.scene = scene;
    }

    /// Attach, replace, or detach the haptic device.
    pub fn set_device(&mut self, device: Option<Box<dyn HapticDevice>>) {
        self.device = device;
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// Replace the whole configuration. Invalid input changes nothing.
    pub fn set_config(&mut self, config: CollisionConfig) -> Result<()> {
        config.validate().inspect_err(rejected)?;
        self.config = config;
        Ok(())
    }

    // ==================== Parameters ====================

    /// Set the response mode.
    pub fn set_mode(&mut self, mode: CollisionMode) {
        self.config.mode = mode;
    }

    /// Set the margin. Negative or non-finite values change nothing.
    pub fn set_margin(&mut self, margin: f64) -> Result<()> {
        validate_margin(margin).inspect_err(rejected)?;
        self.config.margin = margin;
        Ok(())
    }

    /// Set the intersect mask.
    pub fn set_mask(&mut self, mask: cf_spatial::IntersectMask) {
        self.config.mask = mask;
    }

    /// Set the pass cap. Zero changes nothing.
    pub fn set_max_passes(&mut self, max_passes: usize) -> Result<()> {
        validate_max_passes(max_passes).inspect_err(rejected)?;
        self.config.max_passes = max_passes;
        Ok(())
    }

    /// Set the force-feedback force ceiling.
    pub fn set_max_force(&mut self, max_force: f64) -> Result<()> {
        validate_max_force(max_force).inspect_err(rejected)?;
        self.config.max_force = max_force;
        Ok(())
    }

    /// Set the force-feedback probe radius.
    pub fn set_probe_radius(&mut self, radius: f64) -> Result<()> {
        validate_probe_radius(radius).inspect_err(rejected)?;
        self.config.probe_radius = radius;
        Ok(())
    }

    // ==================== Hot points ====================

    /// Resize the hot-point set. New points start at the local origin.
    pub fn set_point_count(&mut self, count: usize) -> Result<()> {
        self.points.set_count(count).inspect_err(rejected)
    }

    /// Replace one hot point.
    pub fn set_point(&mut self, index: usize, point: Point3<f64>) -> Result<()> {
        self.points.set(index, point).inspect_err(rejected)
    }

    /// Hot point at `index`.
    #[must_use]
    pub fn point(&self, index: usize) -> Option<Point3<f64>> {
        self.points.get(index)
    }

    /// Number of hot points.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Hot points in order.
    #[must_use]
    pub fn points(&self) -> &[Point3<f64>] {
        self.points.as_slice()
    }

    // ==================== Resolution ====================

    /// Resolve one tick of the body's linear motion.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidTimestep`] for a negative or non-finite
    /// `dt`; the body is left untouched.
    pub fn update(&mut self, body: &mut KinematicBody, dt: f64) -> Result<ResolveOutcome> {
        if !dt.is_finite() || dt < 0.0 {
            warn!(dt, "collision update rejected");
            return Err(SimError::InvalidTimestep(dt));
        }

        let speed = body.speed();
        if speed < IDLE_SPEED {
            return Ok(ResolveOutcome::Idle);
        }
        let Some(scene) = self.scene.clone() else {
            trace!(body = %body.id(), "no scene attached");
            return Ok(ResolveOutcome::Idle);
        };
        if self.points.is_empty() {
            return Ok(ResolveOutcome::Idle);
        }

        let outcome = match self.config.mode {
            CollisionMode::ForceFeedback => self.apply_force_feedback(&*scene, body),
            CollisionMode::Stop | CollisionMode::Slide | CollisionMode::Bounce => {
                self.resolve_motion(&*scene, body, speed, dt)
            }
        };
        Ok(outcome)
    }

    /// [`update`](Self::update) under an advisory claim.
    ///
    /// Returns `Ok(None)` without touching the body if `claim` is already
    /// held; otherwise claims, resolves, and releases.
    pub fn update_claimed(
        &mut self,
        claim: &ClaimFlag,
        body: &mut KinematicBody,
        dt: f64,
    ) -> Result<Option<ResolveOutcome>> {
        let Some(_token) = claim.claim() else {
            debug!(body = %body.id(), "volume already claimed, skipping tick");
            return Ok(None);
        };
        self.update(body, dt).map(Some)
    }

    /// One sampling and reduction pass from the body pose `global`.
    ///
    /// `direction` must be a unit vector. Returns `None` if no scene is
    /// attached.
    #[must_use]
    pub fn sample_pass(
        &self,
        global: &Matrix4<f64>,
        direction: &Vector3<f64>,
        distance: f64,
    ) -> Option<PassSample> {
        let scene = self.scene.as_ref()?;
        Some(self.sample(&**scene, global, direction, distance))
    }

    fn sample(
        &self,
        scene: &dyn SpatialIntersector,
        global: &Matrix4<f64>,
        direction: &Vector3<f64>,
        distance: f64,
    ) -> PassSample {
        let margin = self.config.margin;
        let reach = distance + margin;
        let origins = self.points.world_positions(global);

        let queries: QueryBuffer = origins
            .iter()
            .map(|o| IntersectQuery::segment(*o, o + direction * reach))
            .collect();
        let first = scene.intersect(&queries, self.config.mask);

        // (point index, hit point, facing normal, allowed travel)
        let mut hits: SmallVec<[(usize, Point3<f64>, Vector3<f64>, f64); MAX_POINTS]> =
            SmallVec::new();
        for (index, origin) in origins.iter().enumerate() {
            let Some(Some(hit)) = first.get(index) else {
                continue;
            };
            let mut normal = hit.normal;
            if normal.dot(direction) > 0.0 {
                normal = -normal;
            }
            let allowed = (hit.point - origin).norm() - margin;
            hits.push((index, hit.point, normal, allowed));
        }
        if hits.is_empty() {
            return PassSample {
                allowed: distance,
                contact: None,
            };
        }

        if self.config.mode.is_positional() {
            self.refine(scene, &origins, direction, reach, &mut hits);
        }

        let mut best: Option<(usize, Point3<f64>, Vector3<f64>, f64)> = None;
        for &(index, point, normal, allowed) in &hits {
            let allowed = allowed.max(0.0);
            if best.is_none_or(|(.., current)| allowed < current) {
                best = Some((index, point, normal, allowed));
            }
        }

        match best {
            Some((point_index, point, normal, allowed)) if allowed < distance => PassSample {
                allowed,
                contact: Some(PassContact {
                    point_index,
                    point,
                    normal,
                }),
            },
            _ => PassSample {
                allowed: distance,
                contact: None,
            },
        }
    }

    /// Tighten allowed distances with a segment cast against each contact normal.
    fn refine(
        &self,
        scene: &dyn SpatialIntersector,
        origins: &PointBuffer,
        direction: &Vector3<f64>,
        reach: f64,
        hits: &mut [(usize, Point3<f64>, Vector3<f64>, f64)],
    ) {
        let queries: QueryBuffer = hits
            .iter()
            .map(|&(index, _, normal, _)| {
                let origin = origins[index];
                IntersectQuery::segment(origin, origin - normal * reach)
            })
            .collect();
        let second = scene.intersect(&queries, self.config.mask);

        for (slot, refined) in hits.iter_mut().zip(&second) {
            let Some(hit) = refined else {
                continue;
            };
            let (index, _, normal, allowed) = slot;
            let cos = -direction.dot(normal);
            if cos < MIN_APPROACH_COS {
                continue;
            }
            let perpendicular = (hit.point - origins[*index]).norm();
            *allowed = allowed.min((perpendicular - self.config.margin) / cos);
        }
    }

    fn resolve_motion(
        &self,
        scene: &dyn SpatialIntersector,
        body: &mut KinematicBody,
        speed: f64,
        dt: f64,
    ) -> ResolveOutcome {
        // Velocity and position live in the parent node's frame; sampling is
        // done in world space.
        let parent = body
            .node()
            .map_or_else(UnitQuaternion::identity, |node| {
                frame_rotation(&node.global_transform())
            });

        let world_velocity = parent * body.velocity();
        let mut direction = world_velocity / speed;
        let mut speed = speed;
        let mut remaining = speed * dt;
        let mut global = body.global_transform();
        let mut delta = Vector3::zeros();
        let mut last_normal = None;

        for pass in 1..=self.config.max_passes {
            let sample = self.sample(scene, &global, &direction, remaining);
            let step = direction * sample.allowed;
            delta += step;
            global = Matrix4::new_translation(&step) * global;
            remaining -= sample.allowed;
            trace!(pass, allowed = sample.allowed, remaining, "collision pass");

            let done = match sample.contact {
                None => true,
                Some(contact) => {
                    last_normal = Some(contact.normal);
                    self.respond(&contact.normal, &mut direction, &mut speed, &mut remaining);
                    remaining <= 0.0 || speed <= 0.0
                }
            };

            if done {
                body.set_velocity(parent.inverse() * (direction * speed));
                body.modify_position(parent.inverse() * delta);
                return match last_normal {
                    Some(normal) => {
                        debug!(body = %body.id(), passes = pass, "motion resolved against contact");
                        ResolveOutcome::Collided {
                            passes: pass,
                            normal,
                        }
                    }
                    None => ResolveOutcome::Clear { passes: pass },
                };
            }
        }

        debug!(
            body = %body.id(),
            passes = self.config.max_passes,
            "pass cap reached, body stuck"
        );
        body.set_velocity(Vector3::zeros());
        ResolveOutcome::Stuck {
            passes: self.config.max_passes,
        }
    }

    fn respond(
        &self,
        normal: &Vector3<f64>,
        direction: &mut Vector3<f64>,
        speed: &mut f64,
        remaining: &mut f64,
    ) {
        match self.config.mode {
            CollisionMode::Stop => {
                *remaining = 0.0;
                *speed = 0.0;
            }
            CollisionMode::Slide => {
                let (tangent, scale) = slide_direction(direction, normal);
                *direction = tangent;
                *speed *= scale;
                *remaining *= scale;
            }
            CollisionMode::Bounce => {
                *direction = bounce_direction(direction, normal);
            }
            CollisionMode::ForceFeedback => {}
        }
    }

    fn apply_force_feedback(
        &mut self,
        scene: &dyn SpatialIntersector,
        body: &KinematicBody,
    ) -> ResolveOutcome {
        let radius = self.config.probe_radius;
        let origins = self.points.world_positions(&body.global_transform());
        let queries: QueryBuffer = origins
            .iter()
            .map(|o| IntersectQuery::sphere(*o, radius))
            .collect();
        let results = scene.intersect(&queries, self.config.mask);

        let mut deepest: Option<(f64, Vector3<f64>)> = None;
        for (origin, result) in origins.iter().zip(&results) {
            let Some(hit) = result else {
                continue;
            };
            let separation = (origin - hit.point).dot(&hit.normal);
            let penetration = (radius - separation).clamp(0.0, radius);
            if deepest.is_none_or(|(depth, _)| penetration > depth) {
                deepest = Some((penetration, hit.normal));
            }
        }

        let force = deepest.map_or_else(Vector3::zeros, |(penetration, normal)| {
            normal * elliptical_force(self.config.max_force, penetration, radius)
        });
        match &mut self.device {
            Some(device) => device.set_force(force),
            None => trace!(body = %body.id(), "no haptic device attached"),
        }
        ResolveOutcome::ForceApplied { force }
    }
}

fn rejected(err: &SimError) {
    warn!(%err, "collision configuration rejected");
}
