//! Views - templates, lifecycle, and construction.
//!
//! - [`NestingView`] - template-rendering view that composes children
//! - [`Behavior`] - lifecycle hooks a view author overrides
//! - [`ViewClass`] - constructor plus defaults, what managers are configured with
//! - [`ViewOptions`] - everything a view is built from

mod class;
mod nesting;
mod options;

pub use self::class::{ViewClass, ViewFactory};
pub use self::nesting::{
    Behavior, DefaultBehavior, EL_SELECTOR, NestingView, View, ViewCore, ViewHandle,
};
pub use self::options::{
    DomEventBinding, DomEventHandler, ElSource, OptionValue, Template, ViewOptions,
};
