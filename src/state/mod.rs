//! Observable state - the models and collections views are bound to.
//!
//! - [`Record`] / [`Item`] - what a single view renders
//! - [`Collection`] / [`CollectionSource`] - what an item-view binding iterates

mod collection;
mod model;

pub use collection::{
    AddOptions, Changes, Collection, CollectionEvent, CollectionHandler, CollectionSignals,
    CollectionSource, Comparator,
};
pub use model::{Attributes, Item, Record};
