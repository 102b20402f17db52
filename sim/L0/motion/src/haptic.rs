//! Haptic output contract for force-feedback resolution.

use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::Vector3;

/// A device that renders a force to the user.
///
/// Fire-and-forget: the resolver does not wait for or expect any
/// acknowledgement.
pub trait HapticDevice {
    /// Render `force` until the next call.
    fn set_force(&mut self, force: Vector3<f64>);
}

impl<T: HapticDevice + ?Sized> HapticDevice for Box<T> {
    fn set_force(&mut self, force: Vector3<f64>) {
        (**self).set_force(force);
    }
}

impl<T: HapticDevice + ?Sized> HapticDevice for Rc<RefCell<T>> {
    fn set_force(&mut self, force: Vector3<f64>) {
        self.borrow_mut().set_force(force);
    }
}

/// Device stand-in that keeps every force it was sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForceLog {
    forces: Vec<Vector3<f64>>,
}

impl ForceLog {
    /// Empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent force.
    #[must_use]
    pub fn last(&self) -> Option<Vector3<f64>> {
        self.forces.last().copied()
    }

    /// All forces in order.
    #[must_use]
    pub fn forces(&self) -> &[Vector3<f64>] {
        &self.forces
    }

    /// Number of forces received.
    #[must_use]
    pub fn len(&self) -> usize {
        self.forces.len()
    }

    /// True if nothing was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forces.is_empty()
    }
}

impl HapticDevice for ForceLog {
    fn set_force(&mut self, force: Vector3<f64>) {
        self.forces.push(force);
    }
}
