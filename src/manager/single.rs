//! Single-child manager - one persistent child rendered into its mount.

use crate::error::{Diagnostic, ViewResult};
use crate::view::{ElSource, View, ViewHandle, ViewOptions};

use super::base::{ManagedView, ViewManagerBase};
use super::config::ManagerConfig;

/// Renders one child whose host node is the mount itself.
pub struct SingleViewManager {
    base: ViewManagerBase,
}

impl SingleViewManager {
    pub fn new(parent: &ViewHandle, config: &ManagerConfig, selector: &str) -> ViewResult<Self> {
        let spec = config.normalize();
        Ok(Self {
            base: ViewManagerBase::new(parent, &spec, selector)?,
        })
    }

    pub fn base(&self) -> &ViewManagerBase {
        &self.base
    }

    pub fn diagnostic(&self) -> Option<Diagnostic> {
        self.base.diagnostic()
    }

    pub fn child(&self) -> Option<&dyn View> {
        self.base.children().first().map(ManagedView::view)
    }

    /// Create the child. No-op when the mount is missing.
    pub fn render(&mut self) -> ViewResult<()> {
        let Some(mount) = self.base.mount().cloned() else {
            return Ok(());
        };
        self.base.remove();
        let options = self.base.compute_options(ViewOptions {
            el: Some(ElSource::Node(mount)),
            ..ViewOptions::default()
        });
        let child = self.base.create_child(options)?;
        self.base.adopt(child);
        Ok(())
    }

    pub fn remove(&mut self) {
        self.base.remove();
    }
}
