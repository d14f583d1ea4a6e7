//! Views - the core composition unit.
//!
//! A view owns a host node, an event channel, and the child managers it
//! builds on every render. [`ViewCore`] holds that state; [`NestingView`]
//! runs the fixed lifecycle around it and calls into a [`Behavior`] for the
//! author-overridable steps.
//!
//! # Lifecycle
//!
//! `render`:
//! 1. remove child managers (destroying their views)
//! 2. `cleanup` hook
//! 3. write the template output into the host node (if there is a template)
//! 4. `decorate` hook
//! 5. build and render single-child managers, then item-view managers
//!
//! `remove`:
//! 1. remove child managers
//! 2. `cleanup` hook
//! 3. release the host node: detach it if owned, empty it if borrowed and
//!    templated, leave it alone otherwise
//!
//! # Example
//!
//! ```
//! use spark_views::view::{NestingView, View, ViewOptions};
//!
//! let mut view = NestingView::new(
//!     ViewOptions::new().template(|_| "<span>hi</span>".to_string()),
//! ).unwrap();
//! view.render().unwrap();
//! assert_eq!(view.el().inner_markup(), "<span>hi</span>");
//! ```

use std::any::Any;
use std::rc::Rc;

use serde_json::Value;

use crate::dom::{DomEvent, ListenerId, NodeRef, Selector};
use crate::engine::EventChannel;
use crate::error::{Diagnostic, ViewError, ViewResult};
use crate::manager::{ChildManager, CollectionViewManager, SingleViewManager};
use crate::state::{CollectionSource, Item};
use crate::types::{Ownership, ViewId};

use super::options::{ElSource, OptionValue, Template, ViewOptions};

/// Locator that resolves to the view's own host node.
pub const EL_SELECTOR: &str = ":el";

// =============================================================================
// View trait
// =============================================================================

/// Anything a manager can create, render, relay, and remove.
pub trait View: Any {
    fn id(&self) -> ViewId;

    /// Host node.
    fn el(&self) -> &NodeRef;

    fn events(&self) -> &EventChannel;

    fn render(&mut self) -> ViewResult<()>;

    fn remove(&mut self);

    fn as_any(&self) -> &dyn Any;
}

impl dyn View {
    /// Downcast to a concrete view type.
    pub fn downcast_ref<T: View>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

// =============================================================================
// Behavior hooks
// =============================================================================

/// Author-overridable steps of the [`NestingView`] lifecycle.
///
/// Every method has a default, so a behavior only implements what it needs.
pub trait Behavior: 'static {
    /// Template to render, if any. Defaults to the `template` option.
    fn template(&self, core: &ViewCore) -> Option<Template> {
        core.options().template.clone()
    }

    /// Data handed to the template. Defaults to the model's serialized form.
    fn template_data(&self, core: &ViewCore) -> Option<Value> {
        core.model().map(Item::template_data)
    }

    /// Runs after the template is written, before child managers are built.
    fn decorate(&mut self, _core: &mut ViewCore) -> ViewResult<()> {
        Ok(())
    }

    /// Runs on every re-render and on removal. Undo whatever `decorate` did.
    fn cleanup(&mut self, _core: &mut ViewCore) {}
}

/// Behavior with every hook left at its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultBehavior;

impl Behavior for DefaultBehavior {}

// =============================================================================
// ViewCore
// =============================================================================

/// State shared by every nesting view.
pub struct ViewCore {
    id: ViewId,
    el: NodeRef,
    ownership: Ownership,
    options: Rc<ViewOptions>,
    events: EventChannel,
    managers: Vec<ChildManager>,
    diagnostics: Vec<Diagnostic>,
    dom_listeners: Vec<ListenerId>,
}

impl ViewCore {
    /// Resolve the host node and bind DOM events.
    ///
    /// Host node priority: explicit node, explicit markup, clone of
    /// `template_el`, fresh node from `tag_name`/`id`/`class_name`/`attributes`.
    /// Only the last two make the view the owner of its node.
    pub fn construct(mut options: ViewOptions) -> ViewResult<Self> {
        let (el, ownership) = match (&options.el, &options.template_el) {
            (Some(ElSource::Node(node)), _) => (node.clone(), Ownership::Borrowed),
            (Some(ElSource::Markup(markup)), _) => {
                let el = NodeRef::parse(markup)?
                    .into_iter()
                    .find(NodeRef::is_element)
                    .ok_or_else(|| {
                        ViewError::Construct(format!("markup `{markup}` has no element"))
                    })?;
                (el, Ownership::Borrowed)
            }
            (None, Some(template_el)) => (template_el.deep_clone(), Ownership::Owned),
            (None, None) => (fresh_el(&options), Ownership::Owned),
        };
        // The slot node is copied, never kept.
        options.template_el = None;

        let mut core = Self {
            id: ViewId::next(),
            el,
            ownership,
            options: Rc::new(options),
            events: EventChannel::new(),
            managers: Vec::new(),
            diagnostics: Vec::new(),
            dom_listeners: Vec::new(),
        };
        core.bind_dom_events()?;
        Ok(core)
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn el(&self) -> &NodeRef {
        &self.el
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn model(&self) -> Option<&Item> {
        self.options.model.as_ref()
    }

    pub fn collection(&self) -> Option<&CollectionSource> {
        self.options.collection.as_ref()
    }

    pub fn option(&self, key: &str) -> Option<&OptionValue> {
        self.options.get(key)
    }

    /// Set a custom option. Children built on the next render see it.
    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        Rc::make_mut(&mut self.options)
            .custom
            .insert(key.into(), value.into());
    }

    /// Child managers from the latest render, single-child ones first.
    pub fn managers(&self) -> &[ChildManager] {
        &self.managers
    }

    /// Conditions reported by the latest render.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Nodes under the host node matching `selector`; [`EL_SELECTOR`] is the
    /// host node itself.
    pub fn query(&self, selector: &str) -> ViewResult<Vec<NodeRef>> {
        query_in(&self.el, selector)
    }

    pub fn trigger(&self, name: &str, args: Vec<Value>) {
        self.events.trigger(name, args);
    }

    /// Snapshot handed to child managers.
    pub fn handle(&self) -> ViewHandle {
        ViewHandle {
            id: self.id,
            el: self.el.clone(),
            events: self.events.clone(),
            options: self.options.clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Lifecycle steps
    // -------------------------------------------------------------------------

    pub(crate) fn remove_managers(&mut self) {
        for mut manager in self.managers.drain(..) {
            manager.remove();
        }
    }

    pub(crate) fn render_managers(&mut self) -> ViewResult<()> {
        self.diagnostics.clear();
        let handle = self.handle();

        if let Some(nested) = self.options.nested_views.clone() {
            for (selector, config) in &nested {
                let manager = SingleViewManager::new(&handle, config, selector)?;
                self.start_manager(ChildManager::Single(manager))?;
            }
        }

        if let Some(items) = self.options.item_views.clone() {
            for (selector, config) in &items {
                let manager = CollectionViewManager::new(&handle, config, selector)?;
                self.start_manager(ChildManager::Collection(manager))?;
            }
        }

        Ok(())
    }

    fn start_manager(&mut self, mut manager: ChildManager) -> ViewResult<()> {
        if let Some(diagnostic) = manager.diagnostic() {
            tracing::warn!(view = %self.id, %diagnostic, "child manager is inert");
            self.diagnostics.push(diagnostic);
        }
        let result = manager.render();
        // Kept even on failure so the next render or remove tears it down.
        self.managers.push(manager);
        result
    }

    /// Release the host node after removal.
    pub(crate) fn release_el(&mut self, templated: bool) {
        self.unbind_dom_events();
        if self.ownership.is_owned() {
            self.el.detach();
        } else if templated {
            self.el.empty();
        }
    }

    fn bind_dom_events(&mut self) -> ViewResult<()> {
        let Some(bindings) = self.options.events.clone() else {
            return Ok(());
        };

        for binding in bindings {
            if let Some(selector) = &binding.selector {
                Selector::parse(selector)?;
            }
            let channel = self.events.downgrade();
            let scope = self.el.downgrade();
            let selector = binding.selector.clone();
            let handler = binding.handler.clone();

            let id = self.el.on(
                &binding.event,
                Rc::new(move |event: &DomEvent| {
                    let Some(channel) = channel.upgrade() else {
                        return;
                    };
                    if let Some(selector) = &selector {
                        let Some(scope) = scope.upgrade() else {
                            return;
                        };
                        let delegated = scope
                            .find(selector)
                            .map(|hits| {
                                hits.iter()
                                    .any(|hit| event.target.is_inclusive_descendant_of(hit))
                            })
                            .unwrap_or(false);
                        if !delegated {
                            return;
                        }
                    }
                    handler(&channel, event);
                }),
            );
            self.dom_listeners.push(id);
        }
        Ok(())
    }

    fn unbind_dom_events(&mut self) {
        for id in self.dom_listeners.drain(..) {
            self.el.off(id);
        }
    }
}

fn fresh_el(options: &ViewOptions) -> NodeRef {
    let el = NodeRef::element(options.tag_name.as_deref().unwrap_or("div"));
    if let Some(attributes) = &options.attributes {
        for (name, value) in attributes {
            el.set_attr(name, value.as_str());
        }
    }
    if let Some(id) = &options.id {
        el.set_attr("id", id.as_str());
    }
    if let Some(class) = &options.class_name {
        el.set_attr("class", class.as_str());
    }
    el
}

pub(crate) fn query_in(el: &NodeRef, selector: &str) -> ViewResult<Vec<NodeRef>> {
    if selector.trim() == EL_SELECTOR {
        return Ok(vec![el.clone()]);
    }
    Ok(el.find(selector)?)
}

// =============================================================================
// ViewHandle
// =============================================================================

/// What a child manager knows about its parent view.
///
/// Options are captured when the parent starts building its managers.
#[derive(Clone)]
pub struct ViewHandle {
    id: ViewId,
    el: NodeRef,
    events: EventChannel,
    options: Rc<ViewOptions>,
}

impl ViewHandle {
    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn el(&self) -> &NodeRef {
        &self.el
    }

    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn model(&self) -> Option<&Item> {
        self.options.model.as_ref()
    }

    pub fn option(&self, key: &str) -> Option<&OptionValue> {
        self.options.get(key)
    }

    pub fn query(&self, selector: &str) -> ViewResult<Vec<NodeRef>> {
        query_in(&self.el, selector)
    }
}

// =============================================================================
// NestingView
// =============================================================================

/// View that renders a template and composes child views into it.
pub struct NestingView {
    core: ViewCore,
    behavior: Box<dyn Behavior>,
}

impl NestingView {
    pub fn new(options: ViewOptions) -> ViewResult<Self> {
        Self::with_behavior(options, DefaultBehavior)
    }

    pub fn with_behavior(options: ViewOptions, behavior: impl Behavior) -> ViewResult<Self> {
        Ok(Self {
            core: ViewCore::construct(options)?,
            behavior: Box::new(behavior),
        })
    }

    pub fn core(&self) -> &ViewCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut ViewCore {
        &mut self.core
    }

    pub fn managers(&self) -> &[ChildManager] {
        self.core.managers()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.core.diagnostics()
    }

    pub fn query(&self, selector: &str) -> ViewResult<Vec<NodeRef>> {
        self.core.query(selector)
    }

    pub fn trigger(&self, name: &str, args: Vec<Value>) {
        self.core.trigger(name, args);
    }
}

impl View for NestingView {
    fn id(&self) -> ViewId {
        self.core.id
    }

    fn el(&self) -> &NodeRef {
        &self.core.el
    }

    fn events(&self) -> &EventChannel {
        &self.core.events
    }

    fn render(&mut self) -> ViewResult<()> {
        self.core.remove_managers();
        self.behavior.cleanup(&mut self.core);

        if let Some(template) = self.behavior.template(&self.core) {
            let data = self.behavior.template_data(&self.core);
            self.core.el.set_inner_markup(&template.render(data.as_ref()))?;
        }

        self.behavior.decorate(&mut self.core)?;
        self.core.render_managers()
    }

    fn remove(&mut self) {
        self.core.remove_managers();
        self.behavior.cleanup(&mut self.core);
        let templated = self.behavior.template(&self.core).is_some();
        self.core.release_el(templated);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Record;
    use serde_json::json;
    use std::cell::{Cell, RefCell};

    fn greeting() -> ViewOptions {
        ViewOptions::new().template(|data| {
            let name = data
                .and_then(|d| d.get("firstName"))
                .and_then(Value::as_str)
                .unwrap_or("nobody");
            format!("<span>{name}</span>")
        })
    }

    #[test]
    fn test_fresh_el_is_owned() {
        let view = NestingView::new(
            ViewOptions::new()
                .tag_name("li")
                .id("first")
                .class_name("item")
                .attribute("data-x", "1"),
        )
        .unwrap();
        assert_eq!(view.core().ownership(), Ownership::Owned);
        assert_eq!(
            view.el().outer_markup(),
            r#"<li data-x="1" id="first" class="item"></li>"#
        );
    }

    #[test]
    fn test_explicit_el_is_borrowed() {
        let host = NodeRef::element("section");
        let view = NestingView::new(ViewOptions::new().el(host.clone())).unwrap();
        assert!(view.el().ptr_eq(&host));
        assert_eq!(view.core().ownership(), Ownership::Borrowed);

        let view = NestingView::new(ViewOptions::new().el_markup("<p>x</p>")).unwrap();
        assert_eq!(view.el().tag().as_deref(), Some("p"));
        assert_eq!(view.core().ownership(), Ownership::Borrowed);

        assert!(matches!(
            NestingView::new(ViewOptions::new().el_markup("just text")),
            Err(ViewError::Construct(_))
        ));
    }

    #[test]
    fn test_template_el_is_cloned() {
        let slot = NodeRef::parse(r#"<li class="row"><b></b></li>"#).unwrap().remove(0);
        let view = NestingView::new(ViewOptions::new().template_el(slot.clone())).unwrap();
        assert!(!view.el().ptr_eq(&slot));
        assert_eq!(view.el().outer_markup(), slot.outer_markup());
        assert_eq!(view.core().ownership(), Ownership::Owned);
        assert!(view.core().options().template_el.is_none());
    }

    #[test]
    fn test_render_writes_template_with_model() {
        let record = Record::new(json!({"firstName": "john"}));
        let mut view = NestingView::new(greeting().model(record)).unwrap();
        view.render().unwrap();
        assert_eq!(view.el().inner_markup(), "<span>john</span>");

        let mut anonymous = NestingView::new(greeting()).unwrap();
        anonymous.render().unwrap();
        assert_eq!(anonymous.el().inner_markup(), "<span>nobody</span>");
    }

    #[test]
    fn test_render_without_template_keeps_content() {
        let host = NodeRef::parse("<div><p>kept</p></div>").unwrap().remove(0);
        let mut view = NestingView::new(ViewOptions::new().el(host.clone())).unwrap();
        view.render().unwrap();
        assert_eq!(host.inner_markup(), "<p>kept</p>");
        view.remove();
        assert_eq!(host.inner_markup(), "<p>kept</p>");
    }

    #[test]
    fn test_remove_releases_el_by_ownership() {
        let parent = NodeRef::element("div");
        let mut owned = NestingView::new(greeting()).unwrap();
        owned.render().unwrap();
        parent.append(owned.el());
        owned.remove();
        assert!(owned.el().parent().is_none());

        let host = NodeRef::element("div");
        parent.append(&host);
        let mut borrowed = NestingView::new(greeting().el(host.clone())).unwrap();
        borrowed.render().unwrap();
        borrowed.remove();
        assert!(host.parent().is_some_and(|p| p.ptr_eq(&parent)));
        assert_eq!(host.inner_markup(), "");
    }

    #[derive(Default)]
    struct Counting {
        decorated: Rc<Cell<usize>>,
        cleaned: Rc<Cell<usize>>,
        order: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Behavior for Counting {
        fn template(&self, _core: &ViewCore) -> Option<Template> {
            let order = self.order.clone();
            Some(Template::new(move |_| {
                order.borrow_mut().push("template");
                "<b></b>".to_string()
            }))
        }

        fn decorate(&mut self, core: &mut ViewCore) -> ViewResult<()> {
            self.order.borrow_mut().push("decorate");
            self.decorated.set(self.decorated.get() + 1);
            core.query("b")?[0].set_attr("class", "decorated");
            Ok(())
        }

        fn cleanup(&mut self, _core: &mut ViewCore) {
            self.order.borrow_mut().push("cleanup");
            self.cleaned.set(self.cleaned.get() + 1);
        }
    }

    #[test]
    fn test_hooks_run_in_order() {
        let behavior = Counting::default();
        let order = behavior.order.clone();
        let decorated = behavior.decorated.clone();
        let cleaned = behavior.cleaned.clone();

        let mut view = NestingView::with_behavior(ViewOptions::new(), behavior).unwrap();
        view.render().unwrap();
        view.render().unwrap();
        view.remove();

        assert_eq!(decorated.get(), 2);
        assert_eq!(cleaned.get(), 3);
        assert_eq!(
            *order.borrow(),
            vec!["cleanup", "template", "decorate", "cleanup", "template", "decorate", "cleanup"]
        );
    }

    #[test]
    fn test_dom_events_trigger_on_channel() {
        let mut view = NestingView::new(
            ViewOptions::new()
                .template(|_| r#"<a class="go">go</a><i>no</i>"#.to_string())
                .on_dom("click .go", |channel, _| channel.trigger("went", vec![json!(1)])),
        )
        .unwrap();
        view.render().unwrap();

        let seen = Rc::new(Cell::new(0));
        let seen_clone = seen.clone();
        let _stop = view.events().on("went", move |_| seen_clone.set(seen_clone.get() + 1));

        view.query("i").unwrap()[0].dispatch("click");
        assert_eq!(seen.get(), 0);
        view.query(".go").unwrap()[0].dispatch("click");
        assert_eq!(seen.get(), 1);

        view.remove();
        assert_eq!(view.el().listener_count(), 0);
    }

    #[test]
    fn test_bad_delegate_selector_fails_construction() {
        let result = NestingView::new(ViewOptions::new().on_dom("click [", |_, _| {}));
        assert!(matches!(result, Err(ViewError::Selector(_))));
    }

    #[test]
    fn test_query_el_selector() {
        let view = NestingView::new(ViewOptions::new()).unwrap();
        let hits = view.query(":el").unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].ptr_eq(view.el()));
    }

    #[test]
    fn test_set_option_visible_through_handle() {
        let mut view = NestingView::new(ViewOptions::new()).unwrap();
        view.core_mut().set_option("label", "hello");
        let handle = view.core().handle();
        assert!(matches!(handle.option("label"), Some(OptionValue::Value(v)) if *v == json!("hello")));
    }

    #[test]
    fn test_downcast() {
        let view: Box<dyn View> = Box::new(NestingView::new(ViewOptions::new()).unwrap());
        assert!(view.downcast_ref::<NestingView>().is_some());
    }
}
