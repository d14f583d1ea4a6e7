//! Core types shared across the crate.
//!
//! - [`ViewId`] - Per-instance identity for views (lets callers assert reuse)
//! - [`Cid`] - Stable client-side identity of an observable record
//! - [`Ownership`] - Whether a view created its host node or borrowed it
//! - [`Cleanup`] - Teardown handle returned by subscriptions

use std::cell::Cell;
use std::fmt;

// =============================================================================
// Cleanup Function
// =============================================================================

/// Cleanup function returned by subscriptions and watchers.
///
/// Call this to unsubscribe and release whatever the subscription captured.
pub type Cleanup = Box<dyn FnOnce()>;

// =============================================================================
// Identity Counters
// =============================================================================

thread_local! {
    /// Counter for generating view IDs.
    static VIEW_COUNTER: Cell<u64> = const { Cell::new(0) };

    /// Counter for generating record client IDs.
    static CID_COUNTER: Cell<u64> = const { Cell::new(0) };
}

fn next_from(counter: &'static std::thread::LocalKey<Cell<u64>>) -> u64 {
    counter.with(|c| {
        let next = c.get() + 1;
        c.set(next);
        next
    })
}

/// Identity of a single view instance.
///
/// Two handles with the same `ViewId` refer to the same view; a view rebuilt
/// by reconciliation always gets a fresh one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    /// Allocate the next view ID.
    pub fn next() -> Self {
        Self(next_from(&VIEW_COUNTER))
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view{}", self.0)
    }
}

/// Client ID of an observable record.
///
/// Assigned once at record creation and never reused within a thread, so it is
/// the reconciliation key for item views.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cid(u64);

impl Cid {
    /// Allocate the next client ID.
    pub fn next() -> Self {
        Self(next_from(&CID_COUNTER))
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

// =============================================================================
// Ownership
// =============================================================================

/// Who owns a view's host node.
///
/// Fixed at construction. An owned node is destroyed when the view is removed;
/// a borrowed one is left attached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Ownership {
    /// The view created (or cloned) its host node.
    #[default]
    Owned,
    /// The host node was supplied by the caller.
    Borrowed,
}

impl Ownership {
    pub fn is_owned(self) -> bool {
        self == Self::Owned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = ViewId::next();
        let b = ViewId::next();
        assert_ne!(a, b);

        let c1 = Cid::next();
        let c2 = Cid::next();
        assert_ne!(c1, c2);
        assert!(c1.to_string().starts_with('c'));
    }

    #[test]
    fn test_default_ownership_is_owned() {
        assert!(Ownership::default().is_owned());
        assert!(!Ownership::Borrowed.is_owned());
    }
}
