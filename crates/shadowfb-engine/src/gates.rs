//! Feature gates and the reentrancy flag.

use std::cell::Cell;

/// Process-lifetime switches for the two optional subsystems.
///
/// Both start disabled and are only turned on once their one-time
/// initialization succeeds.
#[derive(Debug, Default)]
pub struct FeatureGates {
    virtualization: Cell<bool>,
    overlay: Cell<bool>,
}

impl FeatureGates {
    #[inline]
    pub fn virtualization(&self) -> bool {
        self.virtualization.get()
    }

    #[inline]
    pub fn overlay(&self) -> bool {
        self.overlay.get()
    }

    pub(crate) fn set_virtualization(&self, enabled: bool) {
        self.virtualization.set(enabled);
    }

    pub(crate) fn set_overlay(&self, enabled: bool) {
        self.overlay.set(enabled);
    }
}

/// Set while the layer issues its own calls through a hooked context.
///
/// Rewrites are skipped while the flag is held.
#[derive(Debug, Default)]
pub struct ReentrancyFlag(Cell<bool>);

impl ReentrancyFlag {
    #[inline]
    pub fn is_held(&self) -> bool {
        self.0.get()
    }

    /// Sets the flag until the returned scope is dropped.
    ///
    /// Nested scopes restore the outer value rather than clearing it.
    #[must_use = "the flag is released as soon as the scope is dropped"]
    pub fn hold(&self) -> ReentrancyScope<'_> {
        let previous = self.0.replace(true);
        ReentrancyScope { flag: self, previous }
    }
}

pub struct ReentrancyScope<'a> {
    flag: &'a ReentrancyFlag,
    previous: bool,
}

impl Drop for ReentrancyScope<'_> {
    fn drop(&mut self) {
        self.flag.0.set(self.previous);
    }
}
