//! # spark-views
//!
//! Composable views with nested children and collection-driven item lists.
//!
//! Built on [spark-signals](https://github.com/RLabs-Inc/spark-signals) for
//! observable model attributes.
//!
//! ## Architecture
//!
//! A view owns a host node in an in-memory element tree. Rendering writes the
//! view's template into that node and then rebuilds its child managers:
//! ```text
//! render → template → decorate → SingleViewManagers → CollectionViewManagers
//!                                      │                       │
//!                                 one child view        one child per item,
//!                                 in its mount          reconciled by Cid
//! ```
//!
//! Child events bubble to the parent's channel through a relay, so a parent
//! hears everything its descendants trigger.
//!
//! ## Modules
//!
//! - [`types`] - Identities (`ViewId`, `Cid`), host ownership, cleanup handles
//! - [`error`] - `ViewError` and non-fatal `Diagnostic`s
//! - [`dom`] - Host tree: nodes, markup, selectors, DOM events
//! - [`state`] - Observable records and collections
//! - [`engine`] - Event channels and the child-to-parent relay
//! - [`view`] - `NestingView`, hooks, classes, options
//! - [`manager`] - Single-child and item-view managers
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//! use spark_views::{Collection, NestingView, View, ViewClass, ViewOptions};
//!
//! let todos = Collection::from_values([json!({"title": "write"}), json!({"title": "ship"})]);
//! let item = ViewClass::nesting().extend(ViewOptions::new().template(|data| {
//!     data.and_then(|d| d["title"].as_str()).unwrap_or_default().to_string()
//! }));
//!
//! let mut list = NestingView::new(
//!     ViewOptions::new()
//!         .collection(todos.clone())
//!         .template(|_| "<ul><li></li></ul>".to_string())
//!         .items("ul", item),
//! ).unwrap();
//! list.render().unwrap();
//! assert_eq!(list.el().inner_markup(), "<ul><li>write</li><li>ship</li></ul>");
//!
//! todos.remove(&todos.at(0).unwrap());
//! assert_eq!(list.el().inner_markup(), "<ul><li>ship</li></ul>");
//! ```

pub mod dom;
pub mod engine;
pub mod error;
pub mod manager;
pub mod state;
pub mod types;
pub mod view;

// Re-export commonly used items
pub use types::*;

pub use error::{Diagnostic, MarkupError, SelectorError, ViewError, ViewResult};

pub use dom::{DomEvent, NodeRef};

pub use engine::{relay, Event, EventChannel};

pub use state::{
    AddOptions, Changes, Collection, CollectionEvent, CollectionSignals, CollectionSource, Item,
    Record,
};

pub use view::{
    Behavior, DefaultBehavior, NestingView, OptionValue, Template, View, ViewClass, ViewCore,
    ViewHandle, ViewOptions,
};

pub use manager::{
    ChildManager, CollectionViewManager, ManagerConfig, ManagerSpec, SingleViewManager,
};
