//! Memory reclamation control
//!
//! Scrolling is timing critical: a reclamation pause landing between two
//! steps shows up as a visible hitch. The animation engine therefore forces
//! a pass before each scroll segment and keeps reclamation suspended while
//! pixels are moving.

/// Control over the platform's memory reclamation
pub trait Reclaimer {
    /// Run a reclamation pass immediately
    fn collect(&mut self);

    /// Stop automatic reclamation until [`Reclaimer::resume`] is called
    fn suspend(&mut self);

    /// Re-enable automatic reclamation
    fn resume(&mut self);

    /// Whether automatic reclamation is currently suspended
    fn is_suspended(&self) -> bool;
}

/// Reclaimer for platforms without automatic reclamation
///
/// Only tracks the suspension flag so the bracket stays observable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoReclaim {
    suspended: bool,
}

impl NoReclaim {
    /// Create a reclaimer in the resumed state
    pub const fn new() -> Self {
        Self { suspended: false }
    }
}

impl Reclaimer for NoReclaim {
    fn collect(&mut self) {}

    fn suspend(&mut self) {
        self.suspended = true;
    }

    fn resume(&mut self) {
        self.suspended = false;
    }

    fn is_suspended(&self) -> bool {
        self.suspended
    }
}
