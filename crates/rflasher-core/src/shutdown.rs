//! Shutdown registry
//!
//! A LIFO stack of cleanup actions, registered as session-wide resources
//! are acquired and run, most-recently-registered first, whether the
//! session ends normally or on a fatal error. Master init, lock
//! acquisition, and write-protect restoration each push a guard here
//! instead of relying on scope-exit cleanup alone, since a hardware
//! session's exit paths (an early `?`, a fatal error several call frames
//! down) don't line up neatly with lexical scope.

#[cfg(feature = "alloc")]
use alloc::boxed::Box;
#[cfg(feature = "alloc")]
use alloc::vec::Vec;

#[cfg(feature = "alloc")]
type ShutdownFn = Box<dyn FnOnce()>;

/// LIFO stack of pending cleanup actions
#[cfg(feature = "alloc")]
pub struct ShutdownRegistry {
    actions: Vec<ShutdownFn>,
}

#[cfg(feature = "alloc")]
impl ShutdownRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// Register a cleanup action to run at shutdown
    ///
    /// Actions run in reverse registration order, so a resource that
    /// depends on one registered earlier is always torn down first.
    pub fn push(&mut self, action: impl FnOnce() + 'static) {
        self.actions.push(Box::new(action));
    }

    /// Number of actions currently pending
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether there are no pending actions
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run every pending action in LIFO order, then clear the registry
    ///
    /// Safe to call more than once: actions already run are not repeated.
    /// Called explicitly at the end of a pass, and again (as a no-op, if
    /// already flushed) from `Drop`.
    pub fn run(&mut self) {
        while let Some(action) = self.actions.pop() {
            action();
        }
    }
}

#[cfg(feature = "alloc")]
impl Default for ShutdownRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "alloc")]
impl Drop for ShutdownRegistry {
    fn drop(&mut self) {
        self.run();
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec as StdVec;

    #[test]
    fn runs_in_lifo_order() {
        let log = Rc::new(RefCell::new(StdVec::new()));
        let mut registry = ShutdownRegistry::new();

        let l1 = log.clone();
        registry.push(move || l1.borrow_mut().push(1));
        let l2 = log.clone();
        registry.push(move || l2.borrow_mut().push(2));
        let l3 = log.clone();
        registry.push(move || l3.borrow_mut().push(3));

        registry.run();
        assert_eq!(*log.borrow(), StdVec::from([3, 2, 1]));
        assert!(registry.is_empty());
    }

    #[test]
    fn drop_flushes_remaining_actions() {
        let log = Rc::new(RefCell::new(StdVec::new()));
        {
            let mut registry = ShutdownRegistry::new();
            let l1 = log.clone();
            registry.push(move || l1.borrow_mut().push("cleaned up"));
        }
        assert_eq!(*log.borrow(), StdVec::from(["cleaned up"]));
    }
}
