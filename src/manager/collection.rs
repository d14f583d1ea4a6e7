//! Item-view manager - one child per collection item, reconciled by identity.
//!
//! # Reconciliation
//!
//! Every pass makes the mount mirror the current item sequence:
//! 1. destroy all views whose item has no identity (plain data)
//! 2. destroy views whose identity left the collection
//! 3. walk the items in order: an identified item with a live view has that
//!    view re-appended at the tail; anything else gets a new view appended
//!
//! Re-appending in iteration order reorders the mount without rebuilding a
//! single surviving view. Views of identified items keep their [`ViewId`]
//! for as long as the item stays in the collection.
//!
//! # Template slots
//!
//! Before the first pass the mount's template slot is detached: its last
//! element child, or every match of `template_el`. When exactly one slot was
//! detached, new children clone it as their host node.
//!
//! # Pre-rendered mode
//!
//! Any `el` on the binding means the item nodes already exist. Nothing is
//! detached or appended; each child adopts the configured node, or the node
//! a per-item resolver points at.
//!
//! [`ViewId`]: crate::types::ViewId

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::dom::NodeRef;
use crate::error::{Diagnostic, ViewResult};
use crate::state::{CollectionEvent, CollectionSignals, CollectionSource, Item};
use crate::types::{Cid, Cleanup, ViewId};
use crate::view::{ElSource, ViewHandle, ViewOptions};

use super::base::{ManagedView, ViewManagerBase};
use super::config::{ElConfig, ManagerConfig};

// =============================================================================
// State
// =============================================================================

struct ItemViews {
    base: ViewManagerBase,
    source: Option<CollectionSource>,
    by_identity: IndexMap<Cid, ManagedView>,
    unidentified: Vec<ManagedView>,
    template_slots: Vec<NodeRef>,
    el: Option<ElConfig>,
}

impl ItemViews {
    fn slot_hint(&self) -> Option<NodeRef> {
        match self.template_slots.as_slice() {
            [slot] => Some(slot.clone()),
            _ => None,
        }
    }

    fn is_pre_rendered(&self) -> bool {
        self.el.is_some()
    }

    fn reconcile(&mut self) -> ViewResult<()> {
        let Some(mount) = self.base.mount().cloned() else {
            return Ok(());
        };
        let Some(source) = self.source.clone() else {
            return Ok(());
        };

        for view in self.unidentified.drain(..) {
            view.remove();
        }

        let items = source.items();
        let current: HashSet<Cid> = items.iter().filter_map(Item::identity).collect();

        let stale: Vec<Cid> = self
            .by_identity
            .keys()
            .filter(|cid| !current.contains(cid))
            .copied()
            .collect();
        for cid in &stale {
            if let Some(view) = self.by_identity.shift_remove(cid) {
                view.remove();
            }
        }

        let pre_rendered = self.is_pre_rendered();
        let mut created = 0usize;
        let mut reused = 0usize;

        for item in items {
            let identity = item.identity();
            if let Some(existing) = identity.and_then(|cid| self.by_identity.get(&cid)) {
                if !pre_rendered {
                    mount.append(existing.view().el());
                }
                reused += 1;
                continue;
            }

            let view = self.create_item_view(&mount, item)?;
            if !pre_rendered {
                mount.append(view.view().el());
            }
            match identity {
                Some(cid) => {
                    self.by_identity.insert(cid, view);
                }
                None => self.unidentified.push(view),
            }
            created += 1;
        }

        tracing::debug!(
            selector = self.base.selector(),
            created,
            reused,
            removed = stale.len(),
            "reconciled item views"
        );
        Ok(())
    }

    fn create_item_view(&self, mount: &NodeRef, item: Item) -> ViewResult<ManagedView> {
        let mut per_call = ViewOptions {
            template_el: self.slot_hint(),
            ..ViewOptions::default()
        };

        match &self.el {
            Some(ElConfig::PerItem(resolve)) => {
                let selector = resolve(&item);
                match mount.find(&selector)?.into_iter().next() {
                    Some(node) => per_call.el = Some(ElSource::Node(node)),
                    None => tracing::warn!(
                        selector = %selector,
                        "pre-rendered item node not found; creating a fresh one"
                    ),
                }
            }
            Some(ElConfig::Node(node)) => per_call.el = Some(ElSource::Node(node.clone())),
            None => {}
        }

        per_call.model = Some(item);
        let options = self.base.compute_options(per_call);
        self.base.create_child(options)
    }

    fn clear(&mut self) {
        for view in self.unidentified.drain(..) {
            view.remove();
        }
        for (_, view) in self.by_identity.drain(..) {
            view.remove();
        }
    }
}

/// Entry point for collection notifications.
fn reconcile_on_signal(state: &Weak<RefCell<ItemViews>>) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let Ok(mut views) = state.try_borrow_mut() else {
        tracing::warn!("collection changed during reconciliation; nested pass skipped");
        return;
    };
    if let Err(error) = views.reconcile() {
        tracing::error!(
            selector = views.base.selector(),
            %error,
            "item view reconciliation failed"
        );
    }
}

/// Detach the template slots from `mount`.
fn take_template_slots(mount: &NodeRef, locator: Option<&str>) -> ViewResult<Vec<NodeRef>> {
    let slots = match locator {
        Some(locator) => mount.find(locator)?,
        None => mount.last_element_child().into_iter().collect(),
    };
    for slot in &slots {
        slot.detach();
    }
    Ok(slots)
}

// =============================================================================
// CollectionViewManager
// =============================================================================

/// Keeps one child view per collection item, in collection order.
pub struct CollectionViewManager {
    state: Rc<RefCell<ItemViews>>,
    subscriptions: Vec<Cleanup>,
}

impl CollectionViewManager {
    /// Extract template slots and subscribe to the collection.
    ///
    /// A manager without a mount neither extracts nor subscribes.
    pub fn new(parent: &ViewHandle, config: &ManagerConfig, selector: &str) -> ViewResult<Self> {
        let spec = config.normalize();
        let mut base = ViewManagerBase::new(parent, &spec, selector)?;
        let source = base.take_collection();
        let el = spec.el.clone();

        let template_slots = match (base.mount(), &el) {
            (Some(mount), None) => take_template_slots(mount, spec.template_el.as_deref())?,
            _ => Vec::new(),
        };

        let observable = match (base.mount(), &source) {
            (Some(_), Some(source)) => source.as_observable().cloned(),
            _ => None,
        };

        let state = Rc::new(RefCell::new(ItemViews {
            base,
            source,
            by_identity: IndexMap::new(),
            unidentified: Vec::new(),
            template_slots,
            el,
        }));

        let mut subscriptions = Vec::new();
        if let Some(collection) = observable {
            let weak = Rc::downgrade(&state);
            subscriptions.push(collection.on(CollectionSignals::WHOLESALE, move |_| {
                reconcile_on_signal(&weak);
            }));

            let weak = Rc::downgrade(&state);
            subscriptions.push(collection.on(CollectionSignals::UPDATE, move |event| {
                if let CollectionEvent::Update(changes) = event {
                    if !changes.is_empty() {
                        reconcile_on_signal(&weak);
                    }
                }
            }));
        }

        Ok(Self {
            state,
            subscriptions,
        })
    }

    pub fn diagnostic(&self) -> Option<Diagnostic> {
        self.state.borrow().base.diagnostic()
    }

    pub fn selector(&self) -> String {
        self.state.borrow().base.selector().to_string()
    }

    /// Has a mount and a collection.
    pub fn is_active(&self) -> bool {
        let state = self.state.borrow();
        state.base.is_renderable() && state.source.is_some()
    }

    pub fn is_pre_rendered(&self) -> bool {
        self.state.borrow().is_pre_rendered()
    }

    /// Run a reconciliation pass.
    pub fn render(&mut self) -> ViewResult<()> {
        self.state.borrow_mut().reconcile()
    }

    /// Destroy every child and stop listening to the collection.
    pub fn remove(&mut self) {
        for stop in self.subscriptions.drain(..) {
            stop();
        }
        self.state.borrow_mut().clear();
    }

    /// View of the item with `cid`, if one is live.
    pub fn view_for(&self, cid: Cid) -> Option<ViewId> {
        self.state
            .borrow()
            .by_identity
            .get(&cid)
            .map(|view| view.view().id())
    }

    /// Identity-keyed views in no particular order.
    pub fn identified(&self) -> Vec<(Cid, ViewId)> {
        self.state
            .borrow()
            .by_identity
            .iter()
            .map(|(cid, view)| (*cid, view.view().id()))
            .collect()
    }

    pub fn identified_count(&self) -> usize {
        self.state.borrow().by_identity.len()
    }

    pub fn unidentified_count(&self) -> usize {
        self.state.borrow().unidentified.len()
    }

    /// Host nodes of every live child.
    pub fn item_els(&self) -> Vec<NodeRef> {
        let state = self.state.borrow();
        state
            .by_identity
            .values()
            .chain(state.unidentified.iter())
            .map(|view| view.view().el().clone())
            .collect()
    }

    /// Slots detached from the mount at construction.
    pub fn template_slots(&self) -> Vec<NodeRef> {
        self.state.borrow().template_slots.clone()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

impl Drop for CollectionViewManager {
    fn drop(&mut self) {
        for stop in self.subscriptions.drain(..) {
            stop();
        }
    }
}
