//! Advisory, non-blocking claim flags.
//!
//! A [`ClaimFlag`] marks a resource (typically a bounding volume) as being
//! driven by one motion model for the current tick. Claims never block: a
//! failed [`ClaimFlag::lock`] is reported immediately and the caller decides
//! whether to skip its update.
//!
//! # Example
//!
//! ```
//! use sim_types::ClaimFlag;
//!
//! let flag = ClaimFlag::new();
//! assert!(flag.lock());
//! assert!(!flag.lock());
//! flag.unlock();
//!
//! // Scoped claim, released on drop
//! {
//!     let token = flag.claim().expect("flag is free");
//!     assert!(flag.is_locked());
//!     drop(token);
//! }
//! assert!(!flag.is_locked());
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// Shared single-owner claim flag.
///
/// Clones share the same underlying state, so a volume and the tokens it
/// hands out observe each other.
#[derive(Clone, Default)]
pub struct ClaimFlag {
    state: Rc<ClaimState>,
}

#[derive(Default)]
struct ClaimState {
    locked: Cell<bool>,
    /// Bumped on every successful lock; a token only releases its own claim.
    generation: Cell<u64>,
}

impl ClaimFlag {
    /// Create an unlocked flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to take the claim.
    ///
    /// Returns `false` without side effects when the flag is already held.
    pub fn lock(&self) -> bool {
        let state = &self.state;
        if state.locked.get() {
            return false;
        }
        state.locked.set(true);
        state.generation.set(state.generation.get().wrapping_add(1));
        true
    }

    /// Release the claim. Releasing a free flag is a no-op.
    pub fn unlock(&self) {
        self.state.locked.set(false);
    }

    /// Whether the flag is currently held.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state.locked.get()
    }

    /// Take the claim as a token that releases it when dropped.
    ///
    /// The token only ever releases the claim it was issued for. If the flag
    /// was unlocked and claimed again in the meantime, dropping the stale
    /// token leaves the newer claim in place.
    #[must_use]
    pub fn claim(&self) -> Option<ClaimToken> {
        self.lock().then(|| ClaimToken {
            flag: self.clone(),
            generation: self.state.generation.get(),
        })
    }
}

impl fmt::Debug for ClaimFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClaimFlag")
            .field("locked", &self.state.locked.get())
            .finish()
    }
}

/// A held claim. Dropping the token unlocks the flag it came from.
#[derive(Debug)]
#[must_use = "dropping a claim token releases the claim immediately"]
pub struct ClaimToken {
    flag: ClaimFlag,
    generation: u64,
}

impl ClaimToken {
    /// Whether this token was issued by `flag`.
    #[must_use]
    pub fn belongs_to(&self, flag: &ClaimFlag) -> bool {
        Rc::ptr_eq(&self.flag.state, &flag.state)
    }

    /// Whether the claim this token stands for is still the one held.
    #[must_use]
    pub fn is_current(&self) -> bool {
        let state = &self.flag.state;
        state.locked.get() && state.generation.get() == self.generation
    }
}

impl Drop for ClaimToken {
    fn drop(&mut self) {
        if self.is_current() {
            self.flag.unlock();
        }
    }
}
