//! Content item contract.
//!
//! A content item is the opaque, polymorphic unit of "what a tab displays"
//! (a decompiled-code view, a hex dump, ...). The controller drives it
//! through show/hide hooks and, for items that opt in via
//! [`TabContent::as_async`], an asynchronous production step with
//! cooperative cancellation.

use std::any::Any;
use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use thiserror::Error;

use crate::render::{ContextLocator, RenderContext, SharedContext};

/// Identity of one tab controller.
///
/// Back-references from content items and rendering contexts to their
/// owning controller are modelled as `TabId` stamps rather than pointers;
/// all staleness/ownership checks compare these stamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(u64);

impl TabId {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Set-once owning-tab stamp.
///
/// Once bound, rebinding to the same tab is a no-op and rebinding to a
/// different tab panics: a content item or context never migrates between
/// controllers (the controller strictly outlives both).
#[derive(Debug, Default)]
pub struct OwnerSlot(Cell<Option<TabId>>);

impl OwnerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<TabId> {
        self.0.get()
    }

    /// Bind the slot to `owner`.
    ///
    /// # Panics
    ///
    /// Panics if the slot is already bound to a different tab.
    pub fn bind(&self, owner: TabId) {
        match self.0.get() {
            None => self.0.set(Some(owner)),
            Some(existing) => {
                assert!(
                    existing == owner,
                    "owner slot already bound to {existing:?}, cannot rebind to {owner:?}"
                );
            }
        }
    }
}

/// Opaque per-show value threaded from the show hook into the async step.
pub type UserData = Box<dyn Any>;

/// Opaque result computed by a background production task.
pub type ProducedOutput = Box<dyn Any + Send>;

/// A unit of background work built by an [`AsyncTabContent`].
///
/// Runs on a worker thread; it must not touch controller, history, or
/// context state. It only computes an output and checks `cancel` at its
/// own checkpoints.
pub type ProduceJob =
    Box<dyn FnOnce(&CancelToken) -> Result<ProducedOutput, ProduceError> + Send>;

/// Why a background production task produced no usable output.
#[derive(Debug, Clone, Error)]
pub enum ProduceError {
    /// The task observed its cancellation signal and stopped.
    #[error("production cancelled")]
    Cancelled,
    /// The task faulted.
    #[error("production failed: {0}")]
    Failed(String),
}

/// Cooperative cancellation signal handed to a [`ProduceJob`].
///
/// Cancellation does not stop the task; the task is expected to poll
/// [`is_cancelled`](Self::is_cancelled) at its checkpoints and bail with
/// [`ProduceError::Cancelled`]. A cancelled-but-still-finishing task is
/// harmless: its result fails the controller's staleness check.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How an asynchronous show step ended.
#[derive(Debug)]
pub enum AsyncOutcome {
    /// The task ran to completion and produced output.
    Completed(ProducedOutput),
    /// The task faulted or observed cancellation.
    Failed(ProduceError),
    /// No task was started (the should-start predicate declined).
    NotRun,
}

/// Result record handed to [`AsyncTabContent::on_async_end`].
#[derive(Debug)]
pub struct AsyncShowResult {
    pub outcome: AsyncOutcome,
    /// Whether the result may touch visible state. `false` means the tab
    /// moved on while the task ran and the output must be discarded.
    pub applicable: bool,
}

impl AsyncShowResult {
    /// Result used when the should-start predicate declines to run a task.
    pub fn not_run() -> Self {
        Self {
            outcome: AsyncOutcome::NotRun,
            applicable: true,
        }
    }

    /// Whether the show counts as successful for the shown-callback.
    pub fn success(&self) -> bool {
        matches!(
            self.outcome,
            AsyncOutcome::Completed(_) | AsyncOutcome::NotRun
        )
    }
}

/// The opaque, polymorphic unit a tab displays.
pub trait TabContent {
    /// Human-readable title, recomputed on every commit.
    fn title(&self) -> String;

    /// Optional tooltip, recomputed on every commit.
    fn tooltip(&self) -> Option<String> {
        None
    }

    /// The tab this item is owned by, if any.
    fn owner(&self) -> Option<TabId>;

    /// Stamp the owning tab (set-once, see [`OwnerSlot`]).
    fn bind_owner(&self, owner: TabId);

    /// Create or locate the rendering context this item displays into.
    fn create_context(&self, locator: &mut dyn ContextLocator) -> SharedContext;

    /// Called when the item becomes the displayed content. The returned
    /// user data is threaded through to the async production step.
    fn on_show(&self, ctx: &mut dyn RenderContext) -> Option<UserData> {
        let _ = ctx;
        None
    }

    /// Called when the item stops being the displayed content.
    fn on_hide(&self) {}

    /// Called when the owning tab becomes the active tab.
    fn on_selected(&self) {}

    /// Called when the owning tab stops being the active tab.
    fn on_unselected(&self) {}

    /// True only for the controller's initial "nothing shown yet" item,
    /// which never surfaces in navigation history.
    fn is_empty_sentinel(&self) -> bool {
        false
    }

    /// Async capability probe. Items supporting background production
    /// return themselves here.
    fn as_async(&self) -> Option<&dyn AsyncTabContent> {
        None
    }
}

/// Capability interface for content produced by a background task.
pub trait AsyncTabContent: TabContent {
    /// Whether a task should start for this show. Returning `false` (e.g.
    /// because output is already cached on the context) skips straight to
    /// [`on_async_end`](Self::on_async_end) with [`AsyncShowResult::not_run`].
    fn should_start(&self, ctx: &dyn RenderContext, user: Option<&UserData>) -> bool {
        let _ = (ctx, user);
        true
    }

    /// Build the background job for this show. The job is moved to a worker
    /// thread; everything it needs must be captured by value.
    fn start(&self, ctx: &dyn RenderContext, user: Option<&UserData>) -> ProduceJob;

    /// Invoked on the owner thread after the task ends (or is skipped),
    /// exactly once per show. `result.applicable` gates whether the output
    /// may be committed into `ctx`.
    fn on_async_end(
        &self,
        ctx: &mut dyn RenderContext,
        user: Option<&UserData>,
        result: AsyncShowResult,
    );
}

/// Sentinel content installed at controller construction.
#[derive(Default)]
pub struct EmptyContent {
    owner: OwnerSlot,
}

impl EmptyContent {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TabContent for EmptyContent {
    fn title(&self) -> String {
        String::new()
    }

    fn owner(&self) -> Option<TabId> {
        self.owner.get()
    }

    fn bind_owner(&self, owner: TabId) {
        self.owner.bind(owner);
    }

    fn create_context(&self, locator: &mut dyn ContextLocator) -> SharedContext {
        locator.get_or_create("empty", &mut crate::render::EmptyContext::shared)
    }

    fn is_empty_sentinel(&self) -> bool {
        true
    }
}
