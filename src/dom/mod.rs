//! Host Tree - the render target views draw into.
//!
//! An in-memory element tree with just enough surface for view composition:
//! - [`NodeRef`] - create, attach, detach, clone, and fill nodes
//! - Markup parsing and serialization (`set_inner_markup`, `inner_markup`)
//! - Selector queries (`find`) scoped to a node's own subtree
//! - Event listeners with bubbling (`on`, `dispatch`)
//!
//! # Example
//!
//! ```
//! use spark_views::dom::NodeRef;
//!
//! let list = NodeRef::element("ul");
//! list.set_inner_markup("<li>hello</li><li/>").unwrap();
//!
//! let last = list.find("li:last").unwrap().remove(0);
//! last.set_text("world");
//! assert_eq!(list.inner_markup(), "<li>hello</li><li>world</li>");
//! ```

mod markup;
mod node;
mod selector;

pub use node::{DomEvent, DomHandler, ListenerId, NodeRef, WeakNodeRef};
pub use selector::Selector;
