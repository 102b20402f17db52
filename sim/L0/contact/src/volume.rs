//! Bounding volumes: the collidable geometry of one rigid body.

use std::rc::Rc;

use cf_spatial::{Aabb, GeometryId, IntersectMask, SceneGeometry};
use nalgebra::{Isometry3, Translation3, Vector3};
use sim_types::{BodyId, ClaimFlag, ClaimToken, KinematicBody, frame_isometry};
use tracing::{debug, trace, warn};

use crate::broad_phase::SweepAndPrune;
use crate::contact::{ContactManifold, ContactPoint, DEFAULT_MAX_CONTACTS};
use crate::narrow::collide_shapes;
use crate::surface::BoundingSurface;

/// Link between a volume's surfaces and a scene they are queryable in.
#[derive(Debug)]
struct Registration {
    scene: Rc<SceneGeometry>,
    mask: IntersectMask,
    /// One slot per surface, in surface order.
    ids: Vec<Option<GeometryId>>,
}

/// An ordered set of bounding surfaces attached to one rigid body.
///
/// A volume carries an advisory claim flag: a resolver that wants to drive
/// the body's collision state calls [`lock`](Self::lock) (or
/// [`claim`](Self::claim)) first and skips its update when that fails.
///
/// Optionally the volume registers its surfaces with a [`SceneGeometry`] so
/// other bodies' intersection queries can hit them. Registered geometry
/// follows [`set_pose`](Self::set_pose) and is unregistered by
/// [`clear`](Self::clear) and on drop.
///
/// # Example
///
/// ```
/// use cf_spatial::Shape;
/// use nalgebra::Isometry3;
/// use sim_contact::{BoundingSurface, BoundingVolume};
/// use std::rc::Rc;
///
/// let mut a = BoundingVolume::new();
/// a.add_surface(Rc::new(BoundingSurface::at_origin(Shape::sphere(1.0)).unwrap()));
///
/// let mut b = BoundingVolume::new();
/// b.add_surface(Rc::new(BoundingSurface::at_origin(Shape::sphere(1.0)).unwrap()));
/// b.set_pose(Isometry3::translation(1.5, 0.0, 0.0));
///
/// assert!(a.lock());
/// assert!(!a.lock());
/// let contacts = a.collide(&b, 4);
/// a.unlock();
///
/// assert_eq!(contacts.len(), 1);
/// ```
#[derive(Debug)]
pub struct BoundingVolume {
    surfaces: Vec<Rc<BoundingSurface>>,
    claim: ClaimFlag,
    offset: Vector3<f64>,
    owner: Option<BodyId>,
    pose: Isometry3<f64>,
    registration: Option<Registration>,
}

impl Default for BoundingVolume {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingVolume {
    /// An empty, unclaimed volume at the world origin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            surfaces: Vec::new(),
            claim: ClaimFlag::new(),
            offset: Vector3::zeros(),
            owner: None,
            pose: Isometry3::identity(),
            registration: None,
        }
    }

    /// Record which body this volume belongs to.
    #[must_use]
    pub fn with_owner(mut self, owner: BodyId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Owning body, if recorded.
    #[must_use]
    pub fn owner(&self) -> Option<BodyId> {
        self.owner
    }

    // ==================== Surfaces ====================

    /// Append a surface and return its index.
    ///
    /// The surface is rebased to the volume's current mass-center offset and,
    /// if the volume is registered with a scene, inserted into that scene.
    /// A surface already held by a volume is rejected with `None` and left
    /// untouched.
    pub fn add_surface(&mut self, surface: Rc<BoundingSurface>) -> Option<usize> {
        if !surface.attach() {
            warn!("surface already belongs to a bounding volume");
            return None;
        }
        surface.shift_offset(self.offset - surface.offset());
        if let Some(reg) = &mut self.registration {
            let id = register(reg, &surface, &self.pose);
            reg.ids.push(id);
        }
        self.surfaces.push(surface);
        trace!(count = self.surfaces.len(), "surface added");
        Some(self.surfaces.len() - 1)
    }

    /// Remove and return the surface at `index`, or `None` if out of range.
    ///
    /// The returned surface is free to join another volume.
    pub fn remove_surface(&mut self, index: usize) -> Option<Rc<BoundingSurface>> {
        if index >= self.surfaces.len() {
            return None;
        }
        if let Some(reg) = &mut self.registration {
            if let Some(id) = reg.ids.remove(index) {
                reg.scene.remove(id);
            }
        }
        let surface = self.surfaces.remove(index);
        surface.detach();
        Some(surface)
    }

    /// Number of surfaces.
    #[must_use]
    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    /// Surface at `index`, or `None` if out of range.
    #[must_use]
    pub fn surface(&self, index: usize) -> Option<&Rc<BoundingSurface>> {
        self.surfaces.get(index)
    }

    /// All surfaces in order.
    #[must_use]
    pub fn surfaces(&self) -> &[Rc<BoundingSurface>] {
        &self.surfaces
    }

    /// Unregister and release every surface. Calling it again does nothing.
    pub fn clear(&mut self) {
        if self.surfaces.is_empty() {
            return;
        }
        if let Some(reg) = &mut self.registration {
            for id in reg.ids.drain(..).flatten() {
                reg.scene.remove(id);
            }
        }
        debug!(count = self.surfaces.len(), "bounding volume cleared");
        for surface in self.surfaces.drain(..) {
            surface.detach();
        }
    }

    // ==================== Claim ====================

    /// Try to claim the volume. Returns `false`, changing nothing, if it is
    /// already claimed.
    pub fn lock(&self) -> bool {
        self.claim.lock()
    }

    /// Release the claim. Releasing an unclaimed volume is fine.
    pub fn unlock(&self) {
        self.claim.unlock();
    }

    /// True while claimed.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.claim.is_locked()
    }

    /// Claim the volume, returning a token that releases it on drop.
    #[must_use]
    pub fn claim(&self) -> Option<ClaimToken> {
        self.claim.claim()
    }

    /// Handle to the volume's claim flag, shared with any clones.
    #[must_use]
    pub fn claim_flag(&self) -> &ClaimFlag {
        &self.claim
    }

    // ==================== Placement ====================

    /// World pose of the body frame.
    #[must_use]
    pub fn pose(&self) -> Isometry3<f64> {
        self.pose
    }

    /// Move the volume. Registered geometry follows.
    pub fn set_pose(&mut self, pose: Isometry3<f64>) {
        self.pose = pose;
        self.sync_registered();
    }

    /// Place the volume at a body's current global transform.
    ///
    /// The body frame sits at the mass-center offset from the body's origin,
    /// matching what [`set_surface_offset`](Self::set_surface_offset) keeps.
    pub fn follow(&mut self, body: &KinematicBody) {
        self.set_pose(frame_isometry(&body.global_transform()) * Translation3::from(self.offset));
    }

    /// Current mass-center offset in the model frame.
    #[must_use]
    pub fn surface_offset(&self) -> Vector3<f64> {
        self.offset
    }

    /// Record that the body's mass-center origin now sits at `offset` in the
    /// model frame.
    ///
    /// Each surface is rebased by the change in offset and the body frame
    /// moves by the same amount, so nothing moves in world space. Setting
    /// the current value again changes nothing.
    pub fn set_surface_offset(&mut self, offset: Vector3<f64>) {
        let delta = offset - self.offset;
        if delta == Vector3::zeros() {
            return;
        }
        for surface in &self.surfaces {
            surface.shift_offset(delta);
        }
        self.offset = offset;
        self.pose *= Translation3::from(delta);
        self.sync_registered();
        trace!(?delta, "surface offset rebased");
    }

    /// World pose of the surface at `index`.
    #[must_use]
    pub fn surface_pose(&self, index: usize) -> Option<Isometry3<f64>> {
        self.surfaces
            .get(index)
            .map(|surface| surface.world_pose(&self.pose))
    }

    /// World bounds of all surfaces, or `None` for an empty volume.
    #[must_use]
    pub fn aabb(&self) -> Option<Aabb> {
        self.surfaces
            .iter()
            .map(|surface| surface.world_aabb(&self.pose))
            .reduce(|acc, aabb| acc.union(&aabb))
    }

    // ==================== Scene registration ====================

    /// Make this volume's surfaces intersectable in `scene` under `mask`.
    ///
    /// Replaces any previous registration.
    pub fn register_with(&mut self, scene: Rc<SceneGeometry>, mask: IntersectMask) {
        self.unregister();
        let mut reg = Registration {
            scene,
            mask,
            ids: Vec::with_capacity(self.surfaces.len()),
        };
        for surface in &self.surfaces {
            let id = register(&reg, surface, &self.pose);
            reg.ids.push(id);
        }
        self.registration = Some(reg);
    }

    /// Remove this volume's surfaces from the scene it is registered with.
    pub fn unregister(&mut self) {
        if let Some(reg) = self.registration.take() {
            for id in reg.ids.into_iter().flatten() {
                reg.scene.remove(id);
            }
        }
    }

    /// True if registered with a scene.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.registration.is_some()
    }

    fn sync_registered(&self) {
        let Some(reg) = &self.registration else {
            return;
        };
        for (surface, id) in self.surfaces.iter().zip(&reg.ids) {
            if let Some(id) = id {
                if let Err(err) = reg.scene.set_pose(*id, surface.world_pose(&self.pose)) {
                    warn!(%err, "registered surface vanished from scene");
                }
            }
        }
    }

    // ==================== Collision ====================

    /// Contacts between this volume and `target`, at most `max_contacts`.
    ///
    /// Surface pairs are found with a sweep over their world AABBs and each
    /// pair is tested with the matching primitive routine. Once the cap is
    /// reached, remaining pairs are skipped. Normals point from this volume
    /// toward `target`.
    #[must_use]
    pub fn collide(&self, target: &Self, max_contacts: usize) -> ContactManifold {
        let mut manifold = ContactManifold::with_capacity(max_contacts);
        if self.surfaces.is_empty() || target.surfaces.is_empty() || max_contacts == 0 {
            return manifold;
        }

        let ours: Vec<Aabb> = self
            .surfaces
            .iter()
            .map(|s| s.world_aabb(&self.pose))
            .collect();
        let theirs: Vec<Aabb> = target
            .surfaces
            .iter()
            .map(|s| s.world_aabb(&target.pose))
            .collect();
        let pairs = SweepAndPrune::new().find_pairs(&ours, &theirs);
        trace!(pairs = pairs.len(), "broad phase");

        'pairs: for (ia, ib) in pairs {
            let (sa, sb) = (&self.surfaces[ia], &target.surfaces[ib]);
            let contacts = collide_shapes(
                sa.shape(),
                &sa.world_pose(&self.pose),
                sb.shape(),
                &sb.world_pose(&target.pose),
            );
            for contact in contacts {
                let accepted = manifold.push(ContactPoint {
                    position: contact.position,
                    normal: contact.normal,
                    penetration: contact.penetration,
                    body_a: self.owner,
                    body_b: target.owner,
                    surface_a: ia,
                    surface_b: ib,
                });
                if !accepted {
                    break 'pairs;
                }
            }
        }

        if manifold.is_truncated() {
            debug!(max_contacts, "contact cap reached");
        }
        manifold
    }

    /// [`collide`](Self::collide) with [`DEFAULT_MAX_CONTACTS`].
    #[must_use]
    pub fn collide_default(&self, target: &Self) -> ContactManifold {
        self.collide(target, DEFAULT_MAX_CONTACTS)
    }
}

impl Drop for BoundingVolume {
    fn drop(&mut self) {
        self.unregister();
        for surface in &self.surfaces {
            surface.detach();
        }
    }
}

fn register(
    reg: &Registration,
    surface: &BoundingSurface,
    pose: &Isometry3<f64>,
) -> Option<GeometryId> {
    match reg
        .scene
        .insert(*surface.shape(), surface.world_pose(pose), reg.mask)
    {
        Ok(id) => Some(id),
        Err(err) => {
            warn!(%err, "surface could not be registered");
            None
        }
    }
}
