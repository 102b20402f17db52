//! Contact points and bounded contact manifolds.

use nalgebra::{Point3, Vector3};
use sim_types::BodyId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default cap on contacts generated by one volume-vs-volume test.
pub const DEFAULT_MAX_CONTACTS: usize = 16;

/// A single contact between two bounding surfaces.
///
/// The normal points from the first volume toward the second, so pushing
/// the second volume along `normal` by `penetration` separates the pair.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ContactPoint {
    /// World-space contact location.
    pub position: Point3<f64>,
    /// Unit contact normal, first volume toward second.
    pub normal: Vector3<f64>,
    /// Overlap depth along the normal (non-negative).
    pub penetration: f64,
    /// Owner of the first volume, if it has one.
    pub body_a: Option<BodyId>,
    /// Owner of the second volume, if it has one.
    pub body_b: Option<BodyId>,
    /// Index of the contributing surface in the first volume.
    pub surface_a: usize,
    /// Index of the contributing surface in the second volume.
    pub surface_b: usize,
}

/// Contacts produced by one [`BoundingVolume::collide`] call.
///
/// Holds at most `capacity` contacts; pushes past the cap are refused and
/// mark the manifold as truncated.
///
/// [`BoundingVolume::collide`]: crate::BoundingVolume::collide
#[derive(Debug, Clone, PartialEq)]
pub struct ContactManifold {
    contacts: Vec<ContactPoint>,
    capacity: usize,
    truncated: bool,
}

impl ContactManifold {
    /// Empty manifold holding up to `capacity` contacts.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            contacts: Vec::with_capacity(capacity.min(DEFAULT_MAX_CONTACTS)),
            capacity,
            truncated: false,
        }
    }

    /// Add a contact. Returns `false` (and records truncation) when full.
    pub fn push(&mut self, contact: ContactPoint) -> bool {
        if self.is_full() {
            self.truncated = true;
            return false;
        }
        self.contacts.push(contact);
        true
    }

    /// True once `capacity` contacts are held.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.contacts.len() >= self.capacity
    }

    /// True if any contact was refused because the manifold was full.
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Maximum number of contacts.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of contacts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// True if there are no contacts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Contacts in generation order.
    #[must_use]
    pub fn contacts(&self) -> &[ContactPoint] {
        &self.contacts
    }

    /// Iterate over contacts.
    pub fn iter(&self) -> std::slice::Iter<'_, ContactPoint> {
        self.contacts.iter()
    }

    /// The contact with the largest penetration.
    #[must_use]
    pub fn deepest(&self) -> Option<&ContactPoint> {
        self.contacts
            .iter()
            .max_by(|a, b| a.penetration.total_cmp(&b.penetration))
    }
}

impl Default for ContactManifold {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_CONTACTS)
    }
}

impl<'a> IntoIterator for &'a ContactManifold {
    type Item = &'a ContactPoint;
    type IntoIter = std::slice::Iter<'a, ContactPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.contacts.iter()
    }
}

impl IntoIterator for ContactManifold {
    type Item = ContactPoint;
    type IntoIter = std::vec::IntoIter<ContactPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.contacts.into_iter()
    }
}
