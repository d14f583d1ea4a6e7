//! View engine plumbing - event channels and the relay between them.
//!
//! - [`EventChannel`] - per-view named event stream
//! - [`relay`] - subscribe-and-forward combinator used by managers

mod events;
mod relay;

pub use events::{Event, EventChannel, EventHandler, WeakEventChannel};
pub use relay::relay;
