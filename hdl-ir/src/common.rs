//! Reference-counted cell aliases used throughout the IR.
//!
//! Signal and operator nodes form a tree with back-pointers to their parent
//! (for naming and direction resolution). Children are held as strong [`RRC`]
//! references; parents are held as [`WRC`] (weak) references so the tree
//! never leaks or cycles.

use hdl_utils::GetName;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Alias for a `RefCell` contained in an `Rc` reference.
#[allow(clippy::upper_case_acronyms)]
pub type RRC<T> = Rc<RefCell<T>>;

/// Construct a new [`RRC`].
pub fn rrc<T>(t: T) -> RRC<T> {
    Rc::new(RefCell::new(t))
}

/// A non-owning back-pointer to a parent node.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug)]
pub struct WRC<T>
where
    T: GetName,
{
    internal: Weak<RefCell<T>>,
}

impl<T: GetName> WRC<T> {
    /// Upgrade the weak reference. Panics if the parent has been dropped,
    /// which should never happen while the owning arena (circuit/module) is
    /// alive.
    pub fn upgrade(&self) -> RRC<T> {
        self.internal
            .upgrade()
            .unwrap_or_else(|| unreachable!("weak reference to a dropped IR node"))
    }
}

impl<T: GetName> From<&RRC<T>> for WRC<T> {
    fn from(internal: &RRC<T>) -> Self {
        Self {
            internal: Rc::downgrade(internal),
        }
    }
}

impl<T: GetName> Clone for WRC<T> {
    fn clone(&self) -> Self {
        Self {
            internal: Weak::clone(&self.internal),
        }
    }
}
