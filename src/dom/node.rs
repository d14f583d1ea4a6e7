//! Host nodes - shared, mutable element/text nodes.
//!
//! A [`NodeRef`] is a cheap handle (`Rc`) to one node. Parents own their
//! children; children hold a weak back-pointer, so detaching a subtree and
//! dropping every handle to it frees it.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::markup;
use super::selector::Selector;
use crate::error::{MarkupError, SelectorError};

// =============================================================================
// Node Data
// =============================================================================

#[derive(Clone, Debug)]
pub(crate) enum NodeKind {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

struct NodeData {
    kind: NodeKind,
    parent: Weak<RefCell<NodeData>>,
    children: Vec<NodeRef>,
    listeners: Vec<(ListenerId, String, DomHandler)>,
}

// =============================================================================
// DOM Events
// =============================================================================

/// Identifies one listener registered with [`NodeRef::on`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

thread_local! {
    static LISTENER_COUNTER: Cell<u64> = const { Cell::new(0) };
}

impl ListenerId {
    fn next() -> Self {
        LISTENER_COUNTER.with(|c| {
            let next = c.get() + 1;
            c.set(next);
            Self(next)
        })
    }
}

/// An event travelling up the host tree.
#[derive(Clone)]
pub struct DomEvent {
    /// Event name, e.g. `"click"`.
    pub name: String,
    /// Node the event was dispatched on.
    pub target: NodeRef,
    /// Node whose listener is currently running.
    pub current: NodeRef,
}

/// Listener callback for DOM events.
pub type DomHandler = Rc<dyn Fn(&DomEvent)>;

// =============================================================================
// NodeRef
// =============================================================================

/// Handle to a host node.
#[derive(Clone)]
pub struct NodeRef(Rc<RefCell<NodeData>>);

/// Weak handle to a host node.
#[derive(Clone)]
pub struct WeakNodeRef(Weak<RefCell<NodeData>>);

impl WeakNodeRef {
    pub fn upgrade(&self) -> Option<NodeRef> {
        self.0.upgrade().map(NodeRef)
    }
}

impl std::fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.outer_markup())
    }
}

impl NodeRef {
    fn from_kind(kind: NodeKind) -> Self {
        Self(Rc::new(RefCell::new(NodeData {
            kind,
            parent: Weak::new(),
            children: Vec::new(),
            listeners: Vec::new(),
        })))
    }

    /// Create a detached element.
    pub fn element(tag: &str) -> Self {
        Self::from_kind(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        })
    }

    /// Create a detached text node.
    pub fn text(content: impl Into<String>) -> Self {
        Self::from_kind(NodeKind::Text(content.into()))
    }

    /// Parse markup into detached top-level nodes.
    pub fn parse(markup: &str) -> Result<Vec<NodeRef>, MarkupError> {
        markup::parse_fragment(markup)
    }

    pub(crate) fn kind(&self) -> NodeKind {
        self.0.borrow().kind.clone()
    }

    /// Non-owning handle, for listeners that must not keep their node alive.
    pub fn downgrade(&self) -> WeakNodeRef {
        WeakNodeRef(Rc::downgrade(&self.0))
    }

    /// True when both handles point at the same node.
    pub fn ptr_eq(&self, other: &NodeRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_element(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Element { .. })
    }

    /// Lowercase tag name, `None` for text nodes.
    pub fn tag(&self) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element { tag, .. } => Some(tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    // -------------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------------

    pub fn attr(&self, name: &str) -> Option<String> {
        match &self.0.borrow().kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.clone()),
            NodeKind::Text(_) => None,
        }
    }

    /// Set an attribute, keeping its original position when it already exists.
    /// No-op on text nodes.
    pub fn set_attr(&self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let NodeKind::Element { attributes, .. } = &mut self.0.borrow_mut().kind {
            let name = name.to_ascii_lowercase();
            match attributes.iter_mut().find(|(key, _)| *key == name) {
                Some(slot) => slot.1 = value,
                None => attributes.push((name, value)),
            }
        }
    }

    /// All attributes in insertion order.
    pub fn attributes(&self) -> Vec<(String, String)> {
        match &self.0.borrow().kind {
            NodeKind::Element { attributes, .. } => attributes.clone(),
            NodeKind::Text(_) => Vec::new(),
        }
    }

    pub fn id(&self) -> Option<String> {
        self.attr("id")
    }

    pub fn classes(&self) -> Vec<String> {
        self.attr("class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    // -------------------------------------------------------------------------
    // Tree structure
    // -------------------------------------------------------------------------

    pub fn parent(&self) -> Option<NodeRef> {
        self.0.borrow().parent.upgrade().map(NodeRef)
    }

    pub fn children(&self) -> Vec<NodeRef> {
        self.0.borrow().children.clone()
    }

    pub fn element_children(&self) -> Vec<NodeRef> {
        self.children().into_iter().filter(NodeRef::is_element).collect()
    }

    pub fn last_element_child(&self) -> Option<NodeRef> {
        self.element_children().pop()
    }

    /// All descendants in document order, excluding `self`.
    pub fn descendants(&self) -> Vec<NodeRef> {
        let mut out = Vec::new();
        self.collect_descendants(&mut out);
        out
    }

    fn collect_descendants(&self, out: &mut Vec<NodeRef>) {
        for child in self.children() {
            out.push(child.clone());
            child.collect_descendants(out);
        }
    }

    /// True when `self` is `other` or one of its descendants.
    pub fn is_inclusive_descendant_of(&self, other: &NodeRef) -> bool {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if node.ptr_eq(other) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Move `child` to the end of this node's children.
    ///
    /// The child is detached from its previous parent first. Appending a node
    /// into its own subtree is refused.
    pub fn append(&self, child: &NodeRef) {
        if self.is_inclusive_descendant_of(child) {
            tracing::warn!("refusing to append a node into its own subtree");
            return;
        }
        child.detach();
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        self.0.borrow_mut().children.push(child.clone());
    }

    /// Remove this node from its parent, keeping its own subtree intact.
    pub fn detach(&self) {
        let parent = self.0.borrow_mut().parent.upgrade();
        self.0.borrow_mut().parent = Weak::new();
        if let Some(parent) = parent {
            parent
                .borrow_mut()
                .children
                .retain(|c| !Rc::ptr_eq(&c.0, &self.0));
        }
    }

    /// Remove all children.
    pub fn empty(&self) {
        let children = std::mem::take(&mut self.0.borrow_mut().children);
        for child in children {
            child.0.borrow_mut().parent = Weak::new();
        }
    }

    /// Replace all children with the nodes parsed from `markup`.
    pub fn set_inner_markup(&self, markup: &str) -> Result<(), MarkupError> {
        let nodes = Self::parse(markup)?;
        self.empty();
        for node in &nodes {
            self.append(node);
        }
        Ok(())
    }

    /// Replace all children with a single text node.
    pub fn set_text(&self, content: &str) {
        self.empty();
        if !content.is_empty() {
            self.append(&NodeRef::text(content));
        }
    }

    pub fn inner_markup(&self) -> String {
        let mut out = String::new();
        for child in self.children() {
            markup::write_node(&child, &mut out);
        }
        out
    }

    pub fn outer_markup(&self) -> String {
        let mut out = String::new();
        markup::write_node(self, &mut out);
        out
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self) -> String {
        match self.kind() {
            NodeKind::Text(text) => text,
            NodeKind::Element { .. } => self
                .children()
                .iter()
                .map(NodeRef::text_content)
                .collect(),
        }
    }

    /// Copy this node and its subtree. The copy is detached and carries no
    /// listeners.
    pub fn deep_clone(&self) -> NodeRef {
        let copy = NodeRef::from_kind(self.kind());
        for child in self.children() {
            copy.append(&child.deep_clone());
        }
        copy
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Descendants matching `selector`, in document order.
    pub fn find(&self, selector: &str) -> Result<Vec<NodeRef>, SelectorError> {
        Ok(Selector::parse(selector)?.find(self))
    }

    // -------------------------------------------------------------------------
    // Listeners
    // -------------------------------------------------------------------------

    /// Listen for `event` dispatched on this node or bubbling up from below.
    pub fn on(&self, event: &str, handler: DomHandler) -> ListenerId {
        let id = ListenerId::next();
        self.0
            .borrow_mut()
            .listeners
            .push((id, event.to_string(), handler));
        id
    }

    /// Remove a listener. Returns false if it was not registered here.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut data = self.0.borrow_mut();
        let before = data.listeners.len();
        data.listeners.retain(|(listener, _, _)| *listener != id);
        data.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.0.borrow().listeners.len()
    }

    /// Dispatch `event` on this node and bubble it to every ancestor.
    pub fn dispatch(&self, event: &str) {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            // Clone handlers out so listeners may touch the tree.
            let handlers: Vec<DomHandler> = node
                .0
                .borrow()
                .listeners
                .iter()
                .filter(|(_, name, _)| name == event)
                .map(|(_, _, handler)| handler.clone())
                .collect();

            let dom_event = DomEvent {
                name: event.to_string(),
                target: self.clone(),
                current: node.clone(),
            };
            for handler in handlers {
                handler(&dom_event);
            }
            current = node.parent();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_moves_between_parents() {
        let a = NodeRef::element("div");
        let b = NodeRef::element("div");
        let child = NodeRef::element("span");

        a.append(&child);
        assert_eq!(a.children().len(), 1);

        b.append(&child);
        assert!(a.children().is_empty());
        assert!(child.parent().is_some_and(|p| p.ptr_eq(&b)));
    }

    #[test]
    fn test_append_refuses_cycles() {
        let outer = NodeRef::element("div");
        let inner = NodeRef::element("span");
        outer.append(&inner);

        inner.append(&outer);
        assert!(outer.parent().is_none());
        assert!(inner.parent().is_some_and(|p| p.ptr_eq(&outer)));
    }

    #[test]
    fn test_reappend_moves_to_tail() {
        let list = NodeRef::element("ul");
        list.set_inner_markup("<li>a</li><li>b</li><li>c</li>").unwrap();
        let first = list.children()[0].clone();

        list.append(&first);
        assert_eq!(list.inner_markup(), "<li>b</li><li>c</li><li>a</li>");
    }

    #[test]
    fn test_deep_clone_is_independent() {
        let original = NodeRef::parse(r#"<span id="hello"><b>x</b></span>"#).unwrap().remove(0);
        let copy = original.deep_clone();

        copy.set_attr("id", "hello2");
        assert_eq!(original.id().as_deref(), Some("hello"));
        assert_eq!(copy.id().as_deref(), Some("hello2"));
        assert_eq!(copy.inner_markup(), "<b>x</b>");
        assert!(copy.parent().is_none());
    }

    #[test]
    fn test_set_attr_keeps_position() {
        let node = NodeRef::element("span");
        node.set_attr("id", "a");
        node.set_attr("class", "b");
        node.set_attr("id", "c");
        assert_eq!(node.outer_markup(), r#"<span id="c" class="b"></span>"#);
    }

    #[test]
    fn test_dispatch_bubbles_to_ancestors() {
        let root = NodeRef::parse("<div><p><span></span></p></div>").unwrap().remove(0);
        let span = root.find("span").unwrap().remove(0);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        root.on(
            "click",
            Rc::new(move |event: &DomEvent| {
                seen_clone
                    .borrow_mut()
                    .push((event.target.tag(), event.current.tag()));
            }),
        );

        span.dispatch("click");
        span.dispatch("keydown");

        assert_eq!(
            *seen.borrow(),
            vec![(Some("span".to_string()), Some("div".to_string()))]
        );
    }

    #[test]
    fn test_off_removes_listener() {
        let node = NodeRef::element("div");
        let id = node.on("click", Rc::new(|_: &DomEvent| {}));
        assert_eq!(node.listener_count(), 1);
        assert!(node.off(id));
        assert!(!node.off(id));
        assert_eq!(node.listener_count(), 0);
    }
}
