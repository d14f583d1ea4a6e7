//! View classes - reusable view constructors with default options.
//!
//! Managers are configured with a [`ViewClass`] rather than a view instance:
//! they construct a fresh view for every child they create. `extend` layers
//! further defaults on top of an existing class.

use std::fmt;
use std::rc::Rc;

use crate::error::ViewResult;

use super::nesting::{Behavior, NestingView, View};
use super::options::ViewOptions;

/// Builds a boxed view from fully merged options.
pub type ViewFactory = Rc<dyn Fn(ViewOptions) -> ViewResult<Box<dyn View>>>;

/// A named view constructor plus the defaults it applies.
#[derive(Clone)]
pub struct ViewClass {
    name: Rc<str>,
    defaults: Rc<ViewOptions>,
    factory: ViewFactory,
}

impl ViewClass {
    /// Plain [`NestingView`] with default hooks.
    pub fn nesting() -> Self {
        Self::custom("NestingView", |options| {
            Ok(Box::new(NestingView::new(options)?) as Box<dyn View>)
        })
    }

    /// [`NestingView`] running a fresh behavior from `make` per instance.
    pub fn with_behavior<B: Behavior>(name: &str, make: impl Fn() -> B + 'static) -> Self {
        Self::custom(name, move |options| {
            Ok(Box::new(NestingView::with_behavior(options, make())?) as Box<dyn View>)
        })
    }

    /// Any view type, built by `factory`.
    pub fn custom(
        name: &str,
        factory: impl Fn(ViewOptions) -> ViewResult<Box<dyn View>> + 'static,
    ) -> Self {
        Self {
            name: Rc::from(name),
            defaults: Rc::new(ViewOptions::default()),
            factory: Rc::new(factory),
        }
    }

    /// Derive a class whose defaults sit on top of this one's.
    pub fn extend(&self, defaults: ViewOptions) -> Self {
        Self {
            name: self.name.clone(),
            defaults: Rc::new(defaults.layered_over(&self.defaults)),
            factory: self.factory.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn defaults(&self) -> &ViewOptions {
        &self.defaults
    }

    /// Build a view. `options` win over the class defaults.
    pub fn construct(&self, options: ViewOptions) -> ViewResult<Box<dyn View>> {
        (self.factory)(options.layered_over(&self.defaults))
    }
}

impl Default for ViewClass {
    fn default() -> Self {
        Self::nesting()
    }
}

impl fmt::Debug for ViewClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewClass")
            .field("name", &self.name)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}
