//! Collision correction for articulated chains.
//!
//! Each chain segment is swept by a ring of [`SEGMENT_COUNT`] parallel query
//! segments offset around its axis. Segments are tested root first, one
//! intersect batch per segment. The first segment with any hit has its
//! closest hit handed to the inverse-kinematics solver, and the tick ends
//! there: one correction per tick.

use std::rc::Rc;

use cf_spatial::{GEOM_EPSILON, IntersectMask, IntersectQuery, QueryHit, SpatialIntersector};
use nalgebra::{Point3, Vector3};
use sim_types::{Result, SimError};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::chain::ArticulatedChain;
use crate::ik::{IkResult, InverseKinematics};

/// Query segments in the ring around each chain segment.
pub const SEGMENT_COUNT: usize = 8;

/// Default ring radius.
pub const DEFAULT_SEGMENT_RADIUS: f64 = 0.05;

/// How an articulated tick ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChainOutcome {
    /// No scene attached; nothing was queried.
    Idle,
    /// Every segment was tested and none hit.
    Clear {
        /// Segments tested.
        segments: usize,
    },
    /// A segment hit and the chain was corrected.
    Corrected {
        /// Index of the segment that hit, counted from the root.
        segment: usize,
        /// The hit passed to the solver.
        contact: QueryHit,
        /// Solver result.
        ik: IkResult,
    },
}

/// Sweeps an [`ArticulatedChain`] through the scene and corrects the first contact.
pub struct ArticulatedCollision {
    segment_radius: f64,
    mask: IntersectMask,
    scene: Option<Rc<dyn SpatialIntersector>>,
    ik: InverseKinematics,
}

impl std::fmt::Debug for ArticulatedCollision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArticulatedCollision")
            .field("segment_radius", &self.segment_radius)
            .field("mask", &self.mask)
            .field("has_scene", &self.scene.is_some())
            .field("ik", &self.ik)
            .finish()
    }
}

impl Default for ArticulatedCollision {
    fn default() -> Self {
        Self {
            segment_radius: DEFAULT_SEGMENT_RADIUS,
            mask: IntersectMask::ALL,
            scene: None,
            ik: InverseKinematics::default(),
        }
    }
}

impl ArticulatedCollision {
    /// Creates a resolver with the default ring radius and no scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the scene to query.
    #[must_use]
    pub fn with_scene(mut self, scene: Rc<dyn SpatialIntersector>) -> Self {
        self.scene = Some(scene);
        self
    }

    /// Replace the solver.
    #[must_use]
    pub fn with_ik(mut self, ik: InverseKinematics) -> Self {
        self.ik = ik;
        self
    }

    /// Attach, replace, or detach the scene.
    pub fn set_scene(&mut self, scene: Option<Rc<dyn SpatialIntersector>>) {
        self.scene = scene;
    }

    /// Ring radius.
    #[must_use]
    pub fn segment_radius(&self) -> f64 {
        self.segment_radius
    }

    /// Set the ring radius. Negative or non-finite values change nothing.
    pub fn set_segment_radius(&mut self, radius: f64) -> Result<()> {
        if !radius.is_finite() || radius < 0.0 {
            let err = SimError::invalid_parameter("segment_radius", radius);
            warn!(%err, "articulated configuration rejected");
            return Err(err);
        }
        self.segment_radius = radius;
        Ok(())
    }

    /// Intersect mask.
    #[must_use]
    pub fn mask(&self) -> IntersectMask {
        self.mask
    }

    /// Set the intersect mask.
    pub fn set_mask(&mut self, mask: IntersectMask) {
        self.mask = mask;
    }

    /// Test the chain root to tip and correct the first contact found.
    pub fn update(&self, chain: &ArticulatedChain) -> ChainOutcome {
        let Some(scene) = self.scene.as_ref() else {
            trace!("no scene attached to articulated chain");
            return ChainOutcome::Idle;
        };

        let positions = chain.joint_positions();
        for (segment, ends) in positions.windows(2).enumerate() {
            let (start, end) = (ends[0], ends[1]);
            let queries = self.ring(&start, &end);
            let results = scene.intersect(&queries, self.mask);

            let closest = results
                .iter()
                .zip(&queries)
                .filter_map(|(hit, query)| match (hit, query) {
                    (Some(hit), IntersectQuery::Segment(s)) => {
                        Some((*hit, (hit.point - s.start).norm()))
                    }
                    _ => None,
                })
                .min_by(|a, b| a.1.total_cmp(&b.1));

            if let Some((contact, _)) = closest {
                let ik = self.ik.reach_for_point(chain, &contact.point);
                debug!(segment, reached = ik.reached, "articulated chain corrected");
                return ChainOutcome::Corrected {
                    segment,
                    contact,
                    ik,
                };
            }
        }

        ChainOutcome::Clear {
            segments: positions.len() - 1,
        }
    }

    /// Query segments parallel to `start..end`, spread evenly around it.
    fn ring(
        &self,
        start: &Point3<f64>,
        end: &Point3<f64>,
    ) -> SmallVec<[IntersectQuery; SEGMENT_COUNT]> {
        let (u, v) = ring_basis(&(end - start));
        (0..SEGMENT_COUNT)
            .map(|k| {
                let theta = std::f64::consts::TAU * k as f64 / SEGMENT_COUNT as f64;
                let offset = (u * theta.cos() + v * theta.sin()) * self.segment_radius;
                IntersectQuery::segment(start + offset, end + offset)
            })
            .collect()
    }
}

/// Two unit vectors perpendicular to `axis` and each other.
fn ring_basis(axis: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let Some(axis) = axis.try_normalize(GEOM_EPSILON) else {
        return (Vector3::x(), Vector3::y());
    };
    let helper = if axis.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = axis.cross(&helper).normalize();
    let v = axis.cross(&u);
    (u, v)
}
