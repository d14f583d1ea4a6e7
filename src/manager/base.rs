//! Shared manager plumbing: mount resolution, option layering, and child
//! creation.

use crate::dom::NodeRef;
use crate::engine::relay;
use crate::error::{Diagnostic, ViewResult};
use crate::state::CollectionSource;
use crate::types::Cleanup;
use crate::view::{View, ViewClass, ViewHandle, ViewOptions};

use super::config::{DynamicOptions, ManagerSpec};

// =============================================================================
// ManagedView
// =============================================================================

/// A child view plus the relay forwarding its events to the parent.
pub struct ManagedView {
    view: Box<dyn View>,
    relay: Option<Cleanup>,
}

impl ManagedView {
    pub fn view(&self) -> &dyn View {
        self.view.as_ref()
    }

    pub fn view_mut(&mut self) -> &mut dyn View {
        self.view.as_mut()
    }

    /// Remove the view, then stop relaying its events.
    pub fn remove(mut self) {
        self.view.remove();
        if let Some(stop) = self.relay.take() {
            stop();
        }
    }
}

impl std::fmt::Debug for ManagedView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedView")
            .field("id", &self.view.id())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// ViewManagerBase
// =============================================================================

/// State every manager starts from.
pub struct ViewManagerBase {
    parent: ViewHandle,
    selector: String,
    mount: Option<NodeRef>,
    view_class: ViewClass,
    static_options: ViewOptions,
    dynamic_options: Option<DynamicOptions>,
    collection: Option<CollectionSource>,
    owned: Vec<ManagedView>,
}

impl ViewManagerBase {
    /// Resolve the mount (first match of `selector` under the parent) and
    /// the model/collection references.
    pub fn new(parent: &ViewHandle, spec: &ManagerSpec, selector: &str) -> ViewResult<Self> {
        let mount = parent.query(selector)?.into_iter().next();
        let model = spec.model.resolve(parent, ViewOptions::lookup_item);
        let collection = spec
            .collection
            .resolve(parent, ViewOptions::lookup_collection);

        let mut static_options = spec.options.clone();
        if model.is_some() {
            static_options.model = model;
        }
        if collection.is_some() {
            static_options.collection = collection.clone();
        }

        Ok(Self {
            parent: parent.clone(),
            selector: selector.to_string(),
            mount,
            view_class: spec.view.clone(),
            static_options,
            dynamic_options: spec.dynamic_options.clone(),
            collection,
            owned: Vec::new(),
        })
    }

    pub fn parent(&self) -> &ViewHandle {
        &self.parent
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn mount(&self) -> Option<&NodeRef> {
        self.mount.as_ref()
    }

    pub fn is_renderable(&self) -> bool {
        self.mount.is_some()
    }

    /// Set when the mount selector matched nothing.
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        match self.mount {
            Some(_) => None,
            None => Some(Diagnostic::MountNotFound {
                selector: self.selector.clone(),
            }),
        }
    }

    /// The collection reference, resolved at construction.
    pub fn collection(&self) -> Option<&CollectionSource> {
        self.collection.as_ref()
    }

    /// Take the collection reference out of the options children inherit.
    ///
    /// Item views iterate the collection; they do not receive it.
    pub fn take_collection(&mut self) -> Option<CollectionSource> {
        self.static_options.collection = None;
        self.collection.take()
    }

    /// Layer `per_call` over dynamic options over static options.
    pub fn compute_options(&self, per_call: ViewOptions) -> ViewOptions {
        let dynamic = self
            .dynamic_options
            .as_ref()
            .map(|compute| compute(&self.parent, per_call.model.as_ref()))
            .unwrap_or_default();
        per_call.layered_over(&dynamic.layered_over(&self.static_options))
    }

    /// Construct, render, and relay a child.
    pub fn create_child(&self, options: ViewOptions) -> ViewResult<ManagedView> {
        let mut view = self.view_class.construct(options)?;
        if let Err(error) = view.render() {
            view.remove();
            return Err(error);
        }
        let relay = relay(view.events(), self.parent.events());
        Ok(ManagedView {
            view,
            relay: Some(relay),
        })
    }

    /// Take ownership of a child created by [`create_child`](Self::create_child).
    pub fn adopt(&mut self, child: ManagedView) {
        self.owned.push(child);
    }

    pub fn children(&self) -> &[ManagedView] {
        &self.owned
    }

    /// Remove every owned child. The mount is left alone.
    pub fn remove(&mut self) {
        for child in self.owned.drain(..) {
            child.remove();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Item, Record};
    use crate::view::{NestingView, OptionValue};
    use serde_json::json;

    fn parent(options: ViewOptions) -> NestingView {
        let mut view = NestingView::new(options).unwrap();
        view.render().unwrap();
        view
    }

    #[test]
    fn test_mount_and_diagnostic() {
        let view = parent(ViewOptions::new().template(|_| "<span></span>".to_string()));
        let handle = view.core().handle();

        let found = ViewManagerBase::new(&handle, &ManagerSpec::new(), "span").unwrap();
        assert!(found.is_renderable());
        assert_eq!(found.diagnostic(), None);

        let missing = ViewManagerBase::new(&handle, &ManagerSpec::new(), "em").unwrap();
        assert!(!missing.is_renderable());
        assert_eq!(
            missing.diagnostic(),
            Some(Diagnostic::MountNotFound { selector: "em".into() })
        );
    }

    #[test]
    fn test_model_reference_by_key() {
        let record = Record::new(json!({"firstName": "jane"}));
        let view = parent(ViewOptions::new().option("model2", record.clone()));
        let handle = view.core().handle();

        let base =
            ViewManagerBase::new(&handle, &ManagerSpec::new().model_key("model2"), ":el").unwrap();
        let options = base.compute_options(ViewOptions::new());
        assert_eq!(options.model, Some(Item::Record(record)));
    }

    #[test]
    fn test_option_precedence() {
        let view = parent(ViewOptions::new());
        let handle = view.core().handle();
        let spec = ManagerSpec::new()
            .option("a", "static")
            .option("b", "static")
            .option("c", "static")
            .dynamic_options(|_, _| ViewOptions::new().option("b", "dynamic").option("c", "dynamic"));
        let base = ViewManagerBase::new(&handle, &spec, ":el").unwrap();

        let options = base.compute_options(ViewOptions::new().option("c", "call"));
        let text = |key: &str| match options.get(key) {
            Some(OptionValue::Value(value)) => value.as_str().map(str::to_string),
            _ => None,
        };
        assert_eq!(text("a").as_deref(), Some("static"));
        assert_eq!(text("b").as_deref(), Some("dynamic"));
        assert_eq!(text("c").as_deref(), Some("call"));
    }

    #[test]
    fn test_take_collection_hides_it_from_children() {
        let items = crate::state::Collection::from_values([json!({"title": "a"})]);
        let view = parent(ViewOptions::new().collection(items));
        let handle = view.core().handle();
        let mut base = ViewManagerBase::new(&handle, &ManagerSpec::new(), ":el").unwrap();
        assert!(base.compute_options(ViewOptions::new()).collection.is_some());

        assert!(base.take_collection().is_some());
        assert!(base.collection().is_none());
        assert!(base.compute_options(ViewOptions::new()).collection.is_none());
    }

    #[test]
    fn test_dynamic_options_see_item() {
        let view = parent(ViewOptions::new());
        let handle = view.core().handle();
        let spec = ManagerSpec::new().dynamic_options(|_, item| {
            let label = item.and_then(|i| i.get("title")).unwrap_or_default();
            ViewOptions::new().option("label", label)
        });
        let base = ViewManagerBase::new(&handle, &spec, ":el").unwrap();

        let options = base.compute_options(ViewOptions::new().model(json!({"title": "x"})));
        assert!(matches!(options.get("label"), Some(OptionValue::Value(v)) if *v == json!("x")));
    }

    #[test]
    fn test_created_child_is_relayed() {
        let view = parent(ViewOptions::new());
        let handle = view.core().handle();
        let base = ViewManagerBase::new(&handle, &ManagerSpec::new(), ":el").unwrap();

        let mut base = base;
        let child = base.create_child(ViewOptions::new()).unwrap();
        let seen = std::rc::Rc::new(std::cell::Cell::new(false));
        let seen_clone = seen.clone();
        let _stop = view.core().events().on("ping", move |_| seen_clone.set(true));

        child.view().events().trigger("ping", vec![]);
        assert!(seen.get());

        let events = child.view().events().clone();
        base.adopt(child);
        assert_eq!(base.children().len(), 1);
        base.remove();
        assert!(base.children().is_empty());
        assert_eq!(events.listener_count(), 0);
    }
}
