//! Observable records and the items views bind to.
//!
//! A [`Record`] is a keyed attribute bag with a stable client ID ([`Cid`]).
//! Its attributes live in a spark-signals `Signal`, so code that wants to
//! follow attribute changes can [`watch`](Record::watch) them. Attribute
//! changes never notify the collections a record belongs to.
//!
//! An [`Item`] is what a view receives as its model: either a record (has
//! identity, serializes to JSON) or plain JSON data (no identity).

use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};
use spark_signals::{effect, effect_scope, signal, Signal};

use crate::types::{Cid, Cleanup};

/// Attribute map of a record.
pub type Attributes = Map<String, Value>;

// =============================================================================
// Record
// =============================================================================

struct RecordInner {
    cid: Cid,
    attributes: Signal<Attributes>,
}

/// Observable model with a stable identity.
///
/// Cloning a `Record` clones the handle, not the data.
#[derive(Clone)]
pub struct Record {
    inner: Rc<RecordInner>,
}

impl Record {
    /// Create a record from a JSON object. Any other JSON value yields a
    /// record with no attributes.
    pub fn new(attributes: Value) -> Self {
        match attributes {
            Value::Object(map) => Self::from_attributes(map),
            other => {
                tracing::warn!(value = %other, "record attributes must be a JSON object");
                Self::from_attributes(Attributes::new())
            }
        }
    }

    pub fn from_attributes(attributes: Attributes) -> Self {
        Self {
            inner: Rc::new(RecordInner {
                cid: Cid::next(),
                attributes: signal(attributes),
            }),
        }
    }

    pub fn cid(&self) -> Cid {
        self.inner.cid
    }

    /// The `id` attribute, if set and not null.
    pub fn id(&self) -> Option<Value> {
        self.get("id").filter(|id| !id.is_null())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.attributes.get().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let mut attributes = self.inner.attributes.get();
        attributes.insert(key.to_string(), value.into());
        self.inner.attributes.set(attributes);
    }

    pub fn attributes(&self) -> Attributes {
        self.inner.attributes.get()
    }

    /// Serialized form handed to templates.
    pub fn to_json(&self) -> Value {
        Value::Object(self.attributes())
    }

    /// Run `on_change` now and again after every attribute change.
    ///
    /// Returns a cleanup that stops watching.
    pub fn watch(&self, on_change: impl Fn(&Attributes) + 'static) -> Cleanup {
        let attributes = self.inner.attributes.clone();
        let scope = effect_scope(false);

        scope.run(move || {
            let _effect_cleanup = effect(move || {
                let current = attributes.get();
                on_change(&current);
            });
        });

        Box::new(move || {
            scope.stop();
        })
    }

    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("cid", &self.cid())
            .field("attributes", &self.attributes())
            .finish()
    }
}

// =============================================================================
// Item
// =============================================================================

/// A view's model: an observable record or plain data.
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    Record(Record),
    Plain(Value),
}

impl Item {
    /// Reconciliation key. Plain data has none.
    pub fn identity(&self) -> Option<Cid> {
        match self {
            Self::Record(record) => Some(record.cid()),
            Self::Plain(_) => None,
        }
    }

    /// Data handed to a template: the record's serialized form, or the raw
    /// value for plain data.
    pub fn template_data(&self) -> Value {
        match self {
            Self::Record(record) => record.to_json(),
            Self::Plain(value) => value.clone(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Self::Record(record) => record.get(key),
            Self::Plain(value) => value.get(key).cloned(),
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Record(record) => Some(record),
            Self::Plain(_) => None,
        }
    }
}

impl From<Record> for Item {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<Value> for Item {
    fn from(value: Value) -> Self {
        Self::Plain(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    #[test]
    fn test_record_identity_is_stable() {
        let record = Record::new(json!({"title": "hello"}));
        let cid = record.cid();
        record.set("title", "world");
        assert_eq!(record.cid(), cid);
        assert_eq!(record.get("title"), Some(json!("world")));
        assert_ne!(Record::new(json!({})).cid(), cid);
    }

    #[test]
    fn test_id_attribute() {
        assert_eq!(Record::new(json!({"id": "a"})).id(), Some(json!("a")));
        assert_eq!(Record::new(json!({"id": null})).id(), None);
        assert_eq!(Record::new(json!({})).id(), None);
    }

    #[test]
    fn test_non_object_attributes_are_empty() {
        let record = Record::new(json!([1, 2]));
        assert!(record.attributes().is_empty());
    }

    #[test]
    fn test_item_template_data() {
        let record = Record::new(json!({"a": 1}));
        assert_eq!(Item::from(record).template_data(), json!({"a": 1}));

        let plain = Item::from(json!({"b": 2}));
        assert_eq!(plain.template_data(), json!({"b": 2}));
        assert_eq!(plain.identity(), None);
        assert_eq!(plain.get("b"), Some(json!(2)));
    }

    #[test]
    fn test_watch_follows_changes_until_stopped() {
        let record = Record::new(json!({"title": "hello"}));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();

        let stop = record.watch(move |attributes| {
            seen_clone.borrow_mut().push(attributes["title"].clone());
        });
        record.set("title", "world");
        stop();
        record.set("title", "again");

        assert_eq!(*seen.borrow(), vec![json!("hello"), json!("world")]);
    }
}
