//! View construction options.
//!
//! [`ViewOptions`] is the one bag of settings a view is built from. Known
//! settings are typed fields; anything else goes into `custom` and stays
//! reachable through [`ViewOptions::get`] (and by key from child bindings).
//!
//! Options layer: [`ViewOptions::layered_over`] keeps every field already set
//! and fills the rest from a lower layer. Class defaults, static binding
//! options, dynamic options, and per-call overrides all stack this way.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::dom::{DomEvent, NodeRef};
use crate::engine::EventChannel;
use crate::manager::ManagerConfig;
use crate::state::{Collection, CollectionSource, Item, Record};

// =============================================================================
// Template
// =============================================================================

/// Pure data-to-markup function.
///
/// Receives the view's template data (`None` when the view has no model).
#[derive(Clone)]
pub struct Template(Rc<dyn Fn(Option<&Value>) -> String>);

impl Template {
    pub fn new(render: impl Fn(Option<&Value>) -> String + 'static) -> Self {
        Self(Rc::new(render))
    }

    /// A template that ignores its data.
    pub fn constant(markup: impl Into<String>) -> Self {
        let markup = markup.into();
        Self::new(move |_| markup.clone())
    }

    pub fn render(&self, data: Option<&Value>) -> String {
        (self.0)(data)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Template(..)")
    }
}

// =============================================================================
// Host node source
// =============================================================================

/// Where a view's host node comes from when the caller supplies one.
#[derive(Clone, Debug)]
pub enum ElSource {
    /// Use this existing node.
    Node(NodeRef),
    /// Parse this markup; the first element becomes the host node.
    Markup(String),
}

impl From<NodeRef> for ElSource {
    fn from(node: NodeRef) -> Self {
        Self::Node(node)
    }
}

// =============================================================================
// DOM event bindings
// =============================================================================

/// Handler for a delegated DOM event. Receives the view's own channel.
pub type DomEventHandler = Rc<dyn Fn(&EventChannel, &DomEvent)>;

/// One `"event"` or `"event selector"` binding on a view's host node.
#[derive(Clone)]
pub struct DomEventBinding {
    pub event: String,
    /// Only react when the target is inside a node matching this selector.
    pub selector: Option<String>,
    pub handler: DomEventHandler,
}

impl DomEventBinding {
    /// Parse `"click"` or `"click .button"`.
    pub fn new(spec: &str, handler: impl Fn(&EventChannel, &DomEvent) + 'static) -> Self {
        let spec = spec.trim();
        let (event, selector) = match spec.split_once(char::is_whitespace) {
            Some((event, selector)) => (event, Some(selector.trim().to_string())),
            None => (spec, None),
        };
        Self {
            event: event.to_string(),
            selector,
            handler: Rc::new(handler),
        }
    }
}

impl fmt::Debug for DomEventBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomEventBinding")
            .field("event", &self.event)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Custom option values
// =============================================================================

/// Value of a custom (untyped) option.
#[derive(Clone, Debug)]
pub enum OptionValue {
    Item(Item),
    Collection(CollectionSource),
    Node(NodeRef),
    Value(Value),
}

impl From<Item> for OptionValue {
    fn from(item: Item) -> Self {
        Self::Item(item)
    }
}

impl From<Record> for OptionValue {
    fn from(record: Record) -> Self {
        Self::Item(Item::Record(record))
    }
}

impl From<Collection> for OptionValue {
    fn from(collection: Collection) -> Self {
        Self::Collection(CollectionSource::Observable(collection))
    }
}

impl From<CollectionSource> for OptionValue {
    fn from(source: CollectionSource) -> Self {
        Self::Collection(source)
    }
}

impl From<NodeRef> for OptionValue {
    fn from(node: NodeRef) -> Self {
        Self::Node(node)
    }
}

impl From<Value> for OptionValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

// =============================================================================
// ViewOptions
// =============================================================================

/// Everything a view is constructed from.
#[derive(Clone, Default)]
pub struct ViewOptions {
    /// Explicit host node (or markup for one). Makes the node borrowed.
    pub el: Option<ElSource>,
    /// Node to clone as the host node when `el` is absent.
    pub template_el: Option<NodeRef>,
    /// Tag for a freshly created host node (default `div`).
    pub tag_name: Option<String>,
    pub id: Option<String>,
    pub class_name: Option<String>,
    pub attributes: Option<IndexMap<String, String>>,
    pub model: Option<Item>,
    pub collection: Option<CollectionSource>,
    pub template: Option<Template>,
    /// Mount selector -> single persistent child.
    pub nested_views: Option<IndexMap<String, ManagerConfig>>,
    /// Mount selector -> one child per collection item.
    pub item_views: Option<IndexMap<String, ManagerConfig>>,
    pub events: Option<Vec<DomEventBinding>>,
    pub custom: IndexMap<String, OptionValue>,
}

impl fmt::Debug for ViewOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewOptions")
            .field("el", &self.el)
            .field("tag_name", &self.tag_name)
            .field("model", &self.model)
            .field("template", &self.template.is_some())
            .field(
                "nested_views",
                &self.nested_views.as_ref().map(|m| m.keys().collect::<Vec<_>>()),
            )
            .field(
                "item_views",
                &self.item_views.as_ref().map(|m| m.keys().collect::<Vec<_>>()),
            )
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Fill every unset field of `$upper` from `$lower`.
macro_rules! inherit_unset {
    ($upper:ident, $lower:ident; $($field:ident),* $(,)?) => {
        $(
            if $upper.$field.is_none() {
                $upper.$field = $lower.$field.clone();
            }
        )*
    };
}

impl ViewOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge: fields set on `self` win, the rest come from `lower`.
    pub fn layered_over(mut self, lower: &ViewOptions) -> ViewOptions {
        inherit_unset!(self, lower;
            el, template_el, tag_name, id, class_name, attributes,
            model, collection, template, nested_views, item_views, events,
        );
        for (key, value) in &lower.custom {
            self.custom
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }

    /// Custom option by key.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.custom.get(key)
    }

    /// Resolve a model reference by key: `"model"` is the model field,
    /// anything else a custom option holding an item or plain data.
    pub fn lookup_item(&self, key: &str) -> Option<Item> {
        if key == "model" {
            return self.model.clone();
        }
        match self.custom.get(key)? {
            OptionValue::Item(item) => Some(item.clone()),
            OptionValue::Value(value) => Some(Item::Plain(value.clone())),
            OptionValue::Collection(_) | OptionValue::Node(_) => None,
        }
    }

    /// Resolve a collection reference by key: `"collection"` is the
    /// collection field, anything else a custom option holding a collection
    /// or a JSON array.
    pub fn lookup_collection(&self, key: &str) -> Option<CollectionSource> {
        if key == "collection" {
            return self.collection.clone();
        }
        match self.custom.get(key)? {
            OptionValue::Collection(source) => Some(source.clone()),
            OptionValue::Value(Value::Array(values)) => {
                Some(CollectionSource::from(values.clone()))
            }
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Builder
    // -------------------------------------------------------------------------

    pub fn el(mut self, node: NodeRef) -> Self {
        self.el = Some(ElSource::Node(node));
        self
    }

    pub fn el_markup(mut self, markup: impl Into<String>) -> Self {
        self.el = Some(ElSource::Markup(markup.into()));
        self
    }

    pub fn template_el(mut self, node: NodeRef) -> Self {
        self.template_el = Some(node);
        self
    }

    pub fn tag_name(mut self, tag: impl Into<String>) -> Self {
        self.tag_name = Some(tag.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class_name(mut self, class: impl Into<String>) -> Self {
        self.class_name = Some(class.into());
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn model(mut self, model: impl Into<Item>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn collection(mut self, collection: impl Into<CollectionSource>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn template(mut self, render: impl Fn(Option<&Value>) -> String + 'static) -> Self {
        self.template = Some(Template::new(render));
        self
    }

    pub fn nested(mut self, selector: impl Into<String>, config: impl Into<ManagerConfig>) -> Self {
        self.nested_views
            .get_or_insert_with(IndexMap::new)
            .insert(selector.into(), config.into());
        self
    }

    pub fn items(mut self, selector: impl Into<String>, config: impl Into<ManagerConfig>) -> Self {
        self.item_views
            .get_or_insert_with(IndexMap::new)
            .insert(selector.into(), config.into());
        self
    }

    pub fn on_dom(mut self, spec: &str, handler: impl Fn(&EventChannel, &DomEvent) + 'static) -> Self {
        self.events
            .get_or_insert_with(Vec::new)
            .push(DomEventBinding::new(spec, handler));
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }
}
