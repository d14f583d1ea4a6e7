//! Observable collections of records.
//!
//! A [`Collection`] keeps an ordered list of [`Record`]s and notifies
//! subscribers synchronously, at the point of mutation, with one of two
//! signal shapes:
//!
//! - **wholesale-change** ([`CollectionSignals::SORT`], [`CollectionSignals::RESET`]):
//!   the order or the whole membership changed
//! - **incremental-update** ([`CollectionSignals::UPDATE`]): carries the
//!   explicit `added` / `removed` records
//!
//! Silent mutations emit nothing. Attribute changes on member records never
//! reach collection subscribers.
//!
//! # Example
//!
//! ```
//! use spark_views::state::{Collection, CollectionSignals, Record};
//! use serde_json::json;
//!
//! let todos = Collection::from_values([json!({"title": "a"})]);
//! let stop = todos.on(CollectionSignals::UPDATE, |event| {
//!     println!("changed: {:?}", event.signal());
//! });
//! todos.add(Record::new(json!({"title": "b"})));
//! stop();
//! assert_eq!(todos.len(), 2);
//! ```

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use bitflags::bitflags;
use serde_json::Value;

use super::model::{Item, Record};
use crate::types::{Cid, Cleanup};

// =============================================================================
// Signals
// =============================================================================

bitflags! {
    /// Collection notification kinds, combinable into a subscription mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CollectionSignals: u8 {
        const SORT = 1 << 0;
        const RESET = 1 << 1;
        const UPDATE = 1 << 2;
        const WHOLESALE = Self::SORT.bits() | Self::RESET.bits();
    }
}

/// Membership delta carried by an incremental update.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Changes {
    pub added: Vec<Record>,
    pub removed: Vec<Record>,
}

impl Changes {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// A notification delivered to collection subscribers.
#[derive(Clone, Debug, PartialEq)]
pub enum CollectionEvent {
    /// Order changed; membership did not.
    Sort,
    /// Membership replaced wholesale.
    Reset { previous: Vec<Record> },
    /// Records were added and/or removed.
    Update(Changes),
}

impl CollectionEvent {
    pub fn signal(&self) -> CollectionSignals {
        match self {
            Self::Sort => CollectionSignals::SORT,
            Self::Reset { .. } => CollectionSignals::RESET,
            Self::Update(_) => CollectionSignals::UPDATE,
        }
    }
}

/// Subscriber callback.
pub type CollectionHandler = Rc<dyn Fn(&CollectionEvent)>;

/// Ordering used to keep a collection sorted.
pub type Comparator = Rc<dyn Fn(&Record, &Record) -> Ordering>;

/// Options for [`Collection::add_with`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AddOptions {
    /// Insert position; appended (or sorted into place) when `None`.
    pub at: Option<usize>,
    /// Suppress notifications.
    pub silent: bool,
}

// =============================================================================
// Collection
// =============================================================================

struct CollectionInner {
    models: Vec<Record>,
    comparator: Option<Comparator>,
    listeners: Vec<(u64, CollectionSignals, CollectionHandler)>,
    next_listener: u64,
}

impl CollectionInner {
    fn contains(&self, record: &Record) -> bool {
        let id = record.id();
        self.models
            .iter()
            .any(|m| m.ptr_eq(record) || (id.is_some() && m.id() == id))
    }

    /// Sort in place; returns whether the order changed.
    fn sort_in_place(&mut self) -> bool {
        let Some(comparator) = self.comparator.clone() else {
            return false;
        };
        let before: Vec<Cid> = self.models.iter().map(Record::cid).collect();
        self.models.sort_by(|a, b| comparator(a, b));
        self.models.iter().map(Record::cid).ne(before)
    }
}

/// Shared, observable, ordered list of records.
///
/// Cloning a `Collection` clones the handle.
#[derive(Clone)]
pub struct Collection {
    inner: Rc<RefCell<CollectionInner>>,
}

impl Default for Collection {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("models", &self.models())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Collection {
    pub fn new() -> Self {
        Self::with_models(Vec::new())
    }

    pub fn with_models(models: Vec<Record>) -> Self {
        let collection = Self {
            inner: Rc::new(RefCell::new(CollectionInner {
                models: Vec::new(),
                comparator: None,
                listeners: Vec::new(),
                next_listener: 0,
            })),
        };
        collection.add_with(models, AddOptions { at: None, silent: true });
        collection
    }

    /// Build a collection with one record per JSON object.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self::with_models(values.into_iter().map(Record::new).collect())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.inner.borrow().models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().models.is_empty()
    }

    pub fn at(&self, index: usize) -> Option<Record> {
        self.inner.borrow().models.get(index).cloned()
    }

    pub fn get(&self, cid: Cid) -> Option<Record> {
        self.inner
            .borrow()
            .models
            .iter()
            .find(|m| m.cid() == cid)
            .cloned()
    }

    /// Snapshot of the records in order.
    pub fn models(&self) -> Vec<Record> {
        self.inner.borrow().models.clone()
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    /// Append one record (sorted into place if a comparator is set).
    pub fn add(&self, record: Record) -> bool {
        !self.add_with(vec![record], AddOptions::default()).is_empty()
    }

    /// Add records, skipping any already present (same record, or same `id`
    /// attribute). Returns the records actually added.
    pub fn add_with(&self, records: Vec<Record>, options: AddOptions) -> Vec<Record> {
        let (added, reordered) = {
            let mut inner = self.inner.borrow_mut();
            let mut at = options.at.map(|i| i.min(inner.models.len()));
            let mut added = Vec::new();

            for record in records {
                if inner.contains(&record) {
                    continue;
                }
                match at.as_mut() {
                    Some(index) => {
                        inner.models.insert(*index, record.clone());
                        *index += 1;
                    }
                    None => inner.models.push(record.clone()),
                }
                added.push(record);
            }

            let reordered = options.at.is_none() && !added.is_empty() && inner.sort_in_place();
            (added, reordered)
        };

        if !options.silent && !added.is_empty() {
            if reordered {
                self.emit(&CollectionEvent::Sort);
            }
            self.emit(&CollectionEvent::Update(Changes {
                added: added.clone(),
                removed: Vec::new(),
            }));
        }
        added
    }

    pub fn remove(&self, record: &Record) -> bool {
        !self.remove_with(std::slice::from_ref(record), false).is_empty()
    }

    /// Remove records; returns the ones that were members.
    pub fn remove_with(&self, records: &[Record], silent: bool) -> Vec<Record> {
        let removed: Vec<Record> = {
            let mut inner = self.inner.borrow_mut();
            let mut removed = Vec::new();
            for record in records {
                if let Some(index) = inner.models.iter().position(|m| m.ptr_eq(record)) {
                    removed.push(inner.models.remove(index));
                }
            }
            removed
        };

        if !silent && !removed.is_empty() {
            self.emit(&CollectionEvent::Update(Changes {
                added: Vec::new(),
                removed: removed.clone(),
            }));
        }
        removed
    }

    /// Replace all records.
    pub fn reset(&self, records: Vec<Record>) {
        self.reset_with(records, false);
    }

    pub fn reset_with(&self, records: Vec<Record>, silent: bool) {
        let previous = {
            let mut inner = self.inner.borrow_mut();
            let previous = std::mem::take(&mut inner.models);
            for record in records {
                if !inner.contains(&record) {
                    inner.models.push(record);
                }
            }
            inner.sort_in_place();
            previous
        };

        if !silent {
            self.emit(&CollectionEvent::Reset { previous });
        }
    }

    pub fn set_comparator(&self, comparator: impl Fn(&Record, &Record) -> Ordering + 'static) {
        self.inner.borrow_mut().comparator = Some(Rc::new(comparator));
    }

    /// Re-sort with the current comparator and notify. Without a comparator
    /// this does nothing.
    pub fn sort(&self) {
        let has_comparator = {
            let mut inner = self.inner.borrow_mut();
            inner.sort_in_place();
            inner.comparator.is_some()
        };
        if has_comparator {
            self.emit(&CollectionEvent::Sort);
        } else {
            tracing::warn!("sort() called on a collection without a comparator");
        }
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    /// Subscribe to the signals in `mask`. Returns a cleanup that unsubscribes.
    pub fn on(
        &self,
        mask: CollectionSignals,
        handler: impl Fn(&CollectionEvent) + 'static,
    ) -> Cleanup {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_listener;
            inner.next_listener += 1;
            inner.listeners.push((id, mask, Rc::new(handler)));
            id
        };

        let weak = Rc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .borrow_mut()
                    .listeners
                    .retain(|(listener, _, _)| *listener != id);
            }
        })
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    fn emit(&self, event: &CollectionEvent) {
        let signal = event.signal();
        // Clone handlers out so they may mutate or resubscribe.
        let handlers: Vec<CollectionHandler> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .filter(|(_, mask, _)| mask.intersects(signal))
            .map(|(_, _, handler)| handler.clone())
            .collect();

        for handler in handlers {
            handler(event);
        }
    }
}

// =============================================================================
// Collection Source
// =============================================================================

/// What an item-view binding iterates: a live collection, or a fixed list
/// that never notifies.
#[derive(Clone, Debug)]
pub enum CollectionSource {
    Observable(Collection),
    Fixed(Vec<Item>),
}

impl CollectionSource {
    /// Current items in iteration order.
    pub fn items(&self) -> Vec<Item> {
        match self {
            Self::Observable(collection) => {
                collection.models().into_iter().map(Item::Record).collect()
            }
            Self::Fixed(items) => items.clone(),
        }
    }

    pub fn as_observable(&self) -> Option<&Collection> {
        match self {
            Self::Observable(collection) => Some(collection),
            Self::Fixed(_) => None,
        }
    }
}

impl From<Collection> for CollectionSource {
    fn from(collection: Collection) -> Self {
        Self::Observable(collection)
    }
}

impl From<Vec<Item>> for CollectionSource {
    fn from(items: Vec<Item>) -> Self {
        Self::Fixed(items)
    }
}

impl From<Vec<Record>> for CollectionSource {
    fn from(records: Vec<Record>) -> Self {
        Self::Fixed(records.into_iter().map(Item::Record).collect())
    }
}

impl From<Vec<Value>> for CollectionSource {
    fn from(values: Vec<Value>) -> Self {
        Self::Fixed(values.into_iter().map(Item::Plain).collect())
    }
}
