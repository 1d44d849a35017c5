//! Rendering context contract.
//!
//! A [`RenderContext`] is the live, swappable object owning the on-screen
//! representation of a tab's content. Exactly one is bound to a
//! [`TabController`](crate::tab::TabController) at a time; the controller
//! tracks a private version counter across rebinds and uses context identity
//! ([`Rc::ptr_eq`]) to reject stale background results.
//!
//! This crate never renders anything itself. Hosts implement the trait over
//! their actual surface (a text view, a hex view, ...) and hand instances
//! out through a [`ContextLocator`].

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::content::{OwnerSlot, TabId};

/// Opaque serialized view state (caret, scroll position, folds, ...).
///
/// Produced by [`RenderContext::serialize`] when content is navigated away
/// from, stored in history entries, and replayed on the way back.
pub type ViewState = serde_json::Value;

/// Shared handle to a rendering context.
///
/// Contexts may be cached by a [`ContextLocator`] and rebound across shows,
/// so they are reference counted; identity comparisons use [`Rc::ptr_eq`].
pub type SharedContext = Rc<RefCell<dyn RenderContext>>;

/// The live object owning a tab's on-screen representation.
pub trait RenderContext: Any {
    /// Called when this context becomes the bound context of a tab.
    fn on_show(&mut self) {}

    /// Called when this context stops being the bound context.
    fn on_hide(&mut self) {}

    /// The tab this context is bound to, if any.
    fn owner(&self) -> Option<TabId>;

    /// Stamp the owning tab. Binding to a *different* tab than a previous
    /// binding is a programming error (see [`OwnerSlot::bind`]).
    fn bind_owner(&self, owner: TabId);

    /// Capture the current view state, or `None` if there is nothing worth
    /// restoring.
    fn serialize(&self) -> Option<ViewState>;

    /// Reapply a previously captured view state.
    fn restore(&mut self, state: &ViewState);

    /// Whether the surface is laid out and visible enough for a restored
    /// view state to take effect. When this returns `false` at commit time
    /// the controller defers one extra [`restore`](Self::restore) until the
    /// host reports readiness.
    fn is_ready(&self) -> bool {
        true
    }

    /// Downcast support for hosts that need the concrete context back.
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Hands out rendering contexts for content items.
///
/// Owns no cross-tab state: each controller gets its own locator, so cached
/// contexts never leak between tabs.
pub trait ContextLocator {
    /// Return the context cached under `key`, creating it on first use.
    ///
    /// Content items that share a surface kind (e.g. every decompiled-code
    /// view) pass the same key and get the same context back, preserving
    /// scroll state machinery across shows.
    fn get_or_create(
        &mut self,
        key: &str,
        create: &mut dyn FnMut() -> SharedContext,
    ) -> SharedContext;
}

/// Default [`ContextLocator`]: a per-tab cache keyed by surface kind.
#[derive(Default)]
pub struct CachingLocator {
    cache: HashMap<String, SharedContext>,
}

impl CachingLocator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContextLocator for CachingLocator {
    fn get_or_create(
        &mut self,
        key: &str,
        create: &mut dyn FnMut() -> SharedContext,
    ) -> SharedContext {
        if let Some(ctx) = self.cache.get(key) {
            return Rc::clone(ctx);
        }
        let ctx = create();
        self.cache.insert(key.to_string(), Rc::clone(&ctx));
        ctx
    }
}

/// Sentinel context bound while a tab shows nothing.
#[derive(Default)]
pub struct EmptyContext {
    owner: OwnerSlot,
}

impl EmptyContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh sentinel wrapped as a [`SharedContext`].
    pub fn shared() -> SharedContext {
        Rc::new(RefCell::new(Self::new()))
    }
}

impl RenderContext for EmptyContext {
    fn owner(&self) -> Option<TabId> {
        self.owner.get()
    }

    fn bind_owner(&self, owner: TabId) {
        self.owner.bind(owner);
    }

    fn serialize(&self) -> Option<ViewState> {
        None
    }

    fn restore(&mut self, _state: &ViewState) {}

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
