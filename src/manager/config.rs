//! Child binding configuration.
//!
//! A binding is written either as a bare [`ViewClass`] (shorthand) or as a
//! full [`ManagerSpec`]. [`ManagerConfig::normalize`] turns both into a spec
//! once, at manager construction.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::dom::NodeRef;
use crate::state::{CollectionSource, Item};
use crate::view::{OptionValue, ViewClass, ViewHandle, ViewOptions};

/// Computes options from the parent and (for item views) the current item.
pub type DynamicOptions = Rc<dyn Fn(&ViewHandle, Option<&Item>) -> ViewOptions>;

/// Maps an item to the selector of its pre-rendered node inside the mount.
pub type ElResolver = Rc<dyn Fn(&Item) -> String>;

// =============================================================================
// References
// =============================================================================

/// Where a binding's model or collection comes from.
#[derive(Clone)]
pub enum Reference<T> {
    /// Look up an option of the parent by name.
    ByKey(String),
    /// Compute it from the parent.
    Resolver(Rc<dyn Fn(&ViewHandle) -> Option<T>>),
}

impl<T> Reference<T> {
    pub fn key(name: impl Into<String>) -> Self {
        Self::ByKey(name.into())
    }

    pub fn resolver(resolve: impl Fn(&ViewHandle) -> Option<T> + 'static) -> Self {
        Self::Resolver(Rc::new(resolve))
    }

    pub(crate) fn resolve(
        &self,
        parent: &ViewHandle,
        lookup: impl FnOnce(&ViewOptions, &str) -> Option<T>,
    ) -> Option<T> {
        match self {
            Self::ByKey(key) => lookup(parent.options(), key),
            Self::Resolver(resolve) => resolve(parent),
        }
    }
}

impl<T> fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByKey(key) => f.debug_tuple("ByKey").field(key).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

// =============================================================================
// Host node configuration
// =============================================================================

/// Explicit host node for the views a binding creates.
#[derive(Clone)]
pub enum ElConfig {
    /// Every child uses this node.
    Node(NodeRef),
    /// Pre-rendered mode: each item's node already exists inside the mount.
    PerItem(ElResolver),
}

impl fmt::Debug for ElConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => f.debug_tuple("Node").field(node).finish(),
            Self::PerItem(_) => f.write_str("PerItem(..)"),
        }
    }
}

// =============================================================================
// ManagerSpec
// =============================================================================

/// Full form of a child binding.
#[derive(Clone)]
pub struct ManagerSpec {
    /// Class to construct. Defaults to a plain nesting view.
    pub view: ViewClass,
    pub model: Reference<Item>,
    pub collection: Reference<CollectionSource>,
    pub dynamic_options: Option<DynamicOptions>,
    pub el: Option<ElConfig>,
    /// Locator for the template slot(s) inside an item-view mount.
    pub template_el: Option<String>,
    /// Static options passed to every child.
    pub options: ViewOptions,
}

impl Default for ManagerSpec {
    fn default() -> Self {
        Self {
            view: ViewClass::nesting(),
            model: Reference::key("model"),
            collection: Reference::key("collection"),
            dynamic_options: None,
            el: None,
            template_el: None,
            options: ViewOptions::default(),
        }
    }
}

impl fmt::Debug for ManagerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerSpec")
            .field("view", &self.view.name())
            .field("model", &self.model)
            .field("collection", &self.collection)
            .field("dynamic_options", &self.dynamic_options.is_some())
            .field("el", &self.el)
            .field("template_el", &self.template_el)
            .finish_non_exhaustive()
    }
}

impl ManagerSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(mut self, class: ViewClass) -> Self {
        self.view = class;
        self
    }

    pub fn model_key(mut self, key: impl Into<String>) -> Self {
        self.model = Reference::key(key);
        self
    }

    pub fn model_with(mut self, resolve: impl Fn(&ViewHandle) -> Option<Item> + 'static) -> Self {
        self.model = Reference::resolver(resolve);
        self
    }

    pub fn collection_key(mut self, key: impl Into<String>) -> Self {
        self.collection = Reference::key(key);
        self
    }

    pub fn collection_with(
        mut self,
        resolve: impl Fn(&ViewHandle) -> Option<CollectionSource> + 'static,
    ) -> Self {
        self.collection = Reference::resolver(resolve);
        self
    }

    pub fn dynamic_options(
        mut self,
        compute: impl Fn(&ViewHandle, Option<&Item>) -> ViewOptions + 'static,
    ) -> Self {
        self.dynamic_options = Some(Rc::new(compute));
        self
    }

    /// Host node for every child. On item views this means pre-rendered mode.
    pub fn el(mut self, node: NodeRef) -> Self {
        self.el = Some(ElConfig::Node(node));
        self
    }

    /// Switch to pre-rendered mode.
    pub fn el_per_item(mut self, resolve: impl Fn(&Item) -> String + 'static) -> Self {
        self.el = Some(ElConfig::PerItem(Rc::new(resolve)));
        self
    }

    pub fn template_el(mut self, locator: impl Into<String>) -> Self {
        self.template_el = Some(locator.into());
        self
    }

    pub fn template(mut self, render: impl Fn(Option<&Value>) -> String + 'static) -> Self {
        self.options = self.options.template(render);
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options = self.options.option(key, value);
        self
    }

    /// Replace the static options wholesale.
    pub fn options(mut self, options: ViewOptions) -> Self {
        self.options = options;
        self
    }
}

// =============================================================================
// ManagerConfig
// =============================================================================

/// A child binding as declared on a view.
#[derive(Clone, Debug)]
pub enum ManagerConfig {
    Shorthand(ViewClass),
    Full(ManagerSpec),
}

impl ManagerConfig {
    pub fn normalize(&self) -> ManagerSpec {
        match self {
            Self::Shorthand(class) => ManagerSpec::new().view(class.clone()),
            Self::Full(spec) => spec.clone(),
        }
    }
}

impl From<ViewClass> for ManagerConfig {
    fn from(class: ViewClass) -> Self {
        Self::Shorthand(class)
    }
}

impl From<ManagerSpec> for ManagerConfig {
    fn from(spec: ManagerSpec) -> Self {
        Self::Full(spec)
    }
}
