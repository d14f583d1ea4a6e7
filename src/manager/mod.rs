//! Child managers - the bindings a view rebuilds on every render.
//!
//! - [`SingleViewManager`] - one child whose host node is the mount
//! - [`CollectionViewManager`] - one child per collection item
//!
//! Both start from [`ViewManagerBase`]: resolve the mount under the parent,
//! resolve the model/collection references, layer options, then construct,
//! render, and relay each child.

mod base;
mod collection;
mod config;
mod single;

pub use base::{ManagedView, ViewManagerBase};
pub use collection::CollectionViewManager;
pub use config::{DynamicOptions, ElConfig, ElResolver, ManagerConfig, ManagerSpec, Reference};
pub use single::SingleViewManager;

use crate::error::{Diagnostic, ViewResult};

/// A manager owned by a view.
pub enum ChildManager {
    Single(SingleViewManager),
    Collection(CollectionViewManager),
}

impl ChildManager {
    pub fn render(&mut self) -> ViewResult<()> {
        match self {
            Self::Single(manager) => manager.render(),
            Self::Collection(manager) => manager.render(),
        }
    }

    pub fn remove(&mut self) {
        match self {
            Self::Single(manager) => manager.remove(),
            Self::Collection(manager) => manager.remove(),
        }
    }

    pub fn diagnostic(&self) -> Option<Diagnostic> {
        match self {
            Self::Single(manager) => manager.diagnostic(),
            Self::Collection(manager) => manager.diagnostic(),
        }
    }

    pub fn selector(&self) -> String {
        match self {
            Self::Single(manager) => manager.base().selector().to_string(),
            Self::Collection(manager) => manager.selector(),
        }
    }

    pub fn as_single(&self) -> Option<&SingleViewManager> {
        match self {
            Self::Single(manager) => Some(manager),
            Self::Collection(_) => None,
        }
    }

    pub fn as_collection(&self) -> Option<&CollectionViewManager> {
        match self {
            Self::Collection(manager) => Some(manager),
            Self::Single(_) => None,
        }
    }
}
