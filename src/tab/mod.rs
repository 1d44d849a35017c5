//! Content lifecycle controller.
//!
//! A [`TabController`] owns what one view slot currently displays: the
//! current content item, its bound rendering context, and the back/forward
//! history. Showing new content runs hide-old → bind-new → maybe-async →
//! commit. The asynchronous leg is the delicate part: by the time a
//! background production task finishes, the user may have navigated
//! elsewhere, so its completion is only committed after a staleness check
//! comparing the task's scope, the context bound when it started, and the
//! context's owner stamp against the controller's current state.
//!
//! All controller state lives on one logical owner thread. Worker threads
//! never touch it; they report over a channel that the owner drains via
//! [`poll`](TabController::poll), so every transition runs to completion
//! before the next begins and no locks are needed.

mod task;

use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::content::{
    AsyncOutcome, AsyncShowResult, CancelToken, EmptyContent, TabContent, TabId, UserData,
};
use crate::history::History;
use crate::render::{CachingLocator, ContextLocator, SharedContext, ViewState};
use crate::trace;

use task::{Completion, ScopeId};

/// One-shot callback invoked when a show finalizes, with a success flag.
///
/// Never invoked for a show superseded before its task completed.
pub type ShownCallback = Box<dyn FnOnce(bool)>;

/// Fire-and-forget notifications to the owning tab manager.
pub trait TabObserver {
    /// Title or tooltip were recomputed.
    fn title_changed(&mut self, title: &str, tooltip: Option<&str>) {
        let _ = (title, tooltip);
    }

    /// New content became the tab's current content.
    fn content_shown(&mut self, tab: TabId) {
        let _ = tab;
    }
}

/// Observer that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl TabObserver for NullObserver {}

/// A show whose production task has not completed yet, or a superseded one
/// still owed its async-end hook.
struct PendingTask {
    scope: ScopeId,
    cancel: CancelToken,
    /// Context bound when the task started; compared by identity against
    /// the currently bound context at completion time.
    context: SharedContext,
    content: Rc<dyn TabContent>,
    user: Option<UserData>,
    snapshot: Option<ViewState>,
    on_shown: Option<ShownCallback>,
}

/// Snapshot waiting for the rendering surface to report readiness.
struct DeferredRestore {
    state: ViewState,
    /// Context version captured at defer time; a mismatch at fire time
    /// means the context was replaced and the snapshot must not apply.
    version: u64,
}

/// How a show interacts with the history stack and the outgoing entry.
enum HistoryOp {
    /// Record the outgoing item, then make the new one current.
    Push,
    /// Re-show the current entry in place (refresh).
    Keep,
    /// Replay an entry whose predecessor the caller already hid before
    /// moving the cursor (back/forward navigation).
    Replay,
}

/// Owner of one view slot's displayed content.
pub struct TabController {
    id: TabId,
    history: History<Rc<dyn TabContent>>,
    locator: Box<dyn ContextLocator>,
    context: SharedContext,
    context_version: u64,
    title: String,
    tooltip: Option<String>,
    observer: Box<dyn TabObserver>,
    sender: Sender<Completion>,
    receiver: Receiver<Completion>,
    next_scope: u64,
    active: Option<PendingTask>,
    /// Superseded tasks whose completions have not arrived yet. Each still
    /// gets its async-end hook, exactly once, with `applicable = false`.
    retired: Vec<PendingTask>,
    deferred: Option<DeferredRestore>,
    selected: bool,
    closed: bool,
}

impl TabController {
    pub fn new() -> Self {
        Self::with_parts(Box::new(CachingLocator::new()), Box::new(NullObserver))
    }

    /// Build a controller around a custom context locator and observer.
    pub fn with_parts(
        mut locator: Box<dyn ContextLocator>,
        observer: Box<dyn TabObserver>,
    ) -> Self {
        let id = TabId::fresh();
        let sentinel: Rc<dyn TabContent> = Rc::new(EmptyContent::new());
        sentinel.bind_owner(id);
        let context = sentinel.create_context(&mut *locator);
        context.borrow().bind_owner(id);
        let (sender, receiver) = mpsc::channel();
        Self {
            id,
            history: History::new(sentinel),
            locator,
            context,
            context_version: 0,
            title: String::new(),
            tooltip: None,
            observer,
            sender,
            receiver,
            next_scope: 0,
            active: None,
            retired: Vec::new(),
            deferred: None,
            selected: false,
            closed: false,
        }
    }

    pub const fn id(&self) -> TabId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn tooltip(&self) -> Option<&str> {
        self.tooltip.as_deref()
    }

    /// The currently displayed content item.
    pub fn current(&self) -> &Rc<dyn TabContent> {
        self.history.current()
    }

    /// The currently bound rendering context.
    pub fn context(&self) -> SharedContext {
        Rc::clone(&self.context)
    }

    /// Version counter bumped on every context rebind; distinguishes
    /// current from superseded contexts.
    pub const fn context_version(&self) -> u64 {
        self.context_version
    }

    pub fn can_navigate_backward(&self) -> bool {
        self.history.can_navigate_backward()
    }

    pub fn can_navigate_forward(&self) -> bool {
        self.history.can_navigate_forward()
    }

    /// Whether a production task is in flight for the current show.
    pub fn has_pending_task(&self) -> bool {
        self.active.is_some()
    }

    pub const fn is_selected(&self) -> bool {
        self.selected
    }

    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    /// Show `item`, recording the outgoing content in history.
    ///
    /// `snapshot` is an optional view state to reapply once the show
    /// commits; `on_shown` fires when the show finalizes.
    ///
    /// # Panics
    ///
    /// Panics if `item` is already owned by a different tab, or if the
    /// controller was closed. Both are caller contract breaches.
    pub fn show(
        &mut self,
        item: Rc<dyn TabContent>,
        snapshot: Option<ViewState>,
        on_shown: Option<ShownCallback>,
    ) {
        if let Some(owner) = item.owner() {
            assert!(
                owner == self.id,
                "content item is already owned by another tab"
            );
        }
        self.show_internal(item, snapshot, on_shown, HistoryOp::Push);
    }

    /// Navigate one history entry back, replaying its stored snapshot.
    /// Returns `false` (without any effect) when there is nothing behind.
    ///
    /// The outgoing entry is hidden before the cursor moves, so the hooks
    /// run in the same hide-then-show order as a plain [`show`](Self::show).
    pub fn navigate_backward(&mut self) -> bool {
        if !self.history.can_navigate_backward() {
            return false;
        }
        self.retire_active();
        let state = self.context.borrow().serialize();
        self.history.set_snapshot(state);
        self.hide_current();
        let snapshot = self.history.navigate_backward();
        let item = Rc::clone(self.history.current());
        trace::log_event("tab.back", format!("title={}", item.title()));
        self.show_internal(item, snapshot, None, HistoryOp::Replay);
        true
    }

    /// Navigate one history entry forward, replaying its stored snapshot.
    /// Returns `false` (without any effect) when there is nothing ahead.
    pub fn navigate_forward(&mut self) -> bool {
        if !self.history.can_navigate_forward() {
            return false;
        }
        self.retire_active();
        let state = self.context.borrow().serialize();
        self.history.set_snapshot(state);
        self.hide_current();
        let snapshot = self.history.navigate_forward();
        let item = Rc::clone(self.history.current());
        trace::log_event("tab.forward", format!("title={}", item.title()));
        self.show_internal(item, snapshot, None, HistoryOp::Replay);
        true
    }

    /// Hide and re-show the current item with a freshly captured snapshot,
    /// forcing recomputation while preserving the user's view state.
    pub fn refresh(&mut self) {
        let item = Rc::clone(self.history.current());
        if item.is_empty_sentinel() {
            return;
        }
        let snapshot = self.context.borrow().serialize();
        trace::log_event("tab.refresh", format!("title={}", item.title()));
        self.show_internal(item, snapshot, None, HistoryOp::Keep);
    }

    /// Drain completed production tasks and run the staleness check for
    /// each. Must be called from the owner thread; returns the number of
    /// completions handled.
    pub fn poll(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(completion) = self.receiver.try_recv() {
            self.handle_completion(completion);
            handled += 1;
        }
        handled
    }

    /// The host reports that the rendering surface is laid out and
    /// visible; applies the deferred snapshot if its context survived.
    pub fn surface_ready(&mut self) {
        if let Some(deferred) = self.deferred.take() {
            if deferred.version == self.context_version {
                self.context.borrow_mut().restore(&deferred.state);
            }
        }
    }

    /// Mark the tab as the active one, notifying the current item.
    pub fn set_selected(&mut self, selected: bool) {
        if self.selected == selected {
            return;
        }
        self.selected = selected;
        let current = self.history.current();
        if current.is_empty_sentinel() {
            return;
        }
        if selected {
            current.on_selected();
        } else {
            current.on_unselected();
        }
    }

    /// Tear the tab down: cancel in-flight work and hide the current
    /// content. Further shows are a contract breach; dropping the
    /// controller closes it implicitly.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.retire_active();
        self.hide_current();
        self.context.borrow_mut().on_hide();
        trace::log_event("tab.close", format!("version={}", self.context_version));
    }

    fn show_internal(
        &mut self,
        item: Rc<dyn TabContent>,
        snapshot: Option<ViewState>,
        on_shown: Option<ShownCallback>,
        history: HistoryOp,
    ) {
        assert!(!self.closed, "show on a closed tab");
        let _timer = trace::scope("tab.show");

        self.retire_active();

        match history {
            HistoryOp::Push => {
                let save = !self.history.current().is_empty_sentinel();
                if save {
                    let state = self.context.borrow().serialize();
                    self.history.set_snapshot(state);
                }
                self.hide_current();
                self.history.set_current(Rc::clone(&item), save);
            }
            HistoryOp::Keep => self.hide_current(),
            HistoryOp::Replay => {}
        }

        item.bind_owner(self.id);
        let context = item.create_context(&mut *self.locator);
        context.borrow().bind_owner(self.id);
        // Context hooks fire only when the bound instance changes; a
        // re-show into the same context keeps it shown throughout.
        if !Rc::ptr_eq(&context, &self.context) {
            self.context.borrow_mut().on_hide();
            self.context = context;
            self.context_version += 1;
            self.context.borrow_mut().on_show();
        }

        self.title = item.title();
        self.tooltip = item.tooltip();
        self.observer.title_changed(&self.title, self.tooltip.as_deref());

        let user = item.on_show(&mut *self.context.borrow_mut());
        trace::log_event(
            "tab.show",
            format!("title={} version={}", self.title, self.context_version),
        );

        if let Some(async_item) = item.as_async() {
            if async_item.should_start(&*self.context.borrow(), user.as_ref()) {
                let job = async_item.start(&*self.context.borrow(), user.as_ref());
                self.next_scope += 1;
                let scope = ScopeId::new(self.next_scope);
                let cancel = CancelToken::new();
                task::spawn(job, scope, cancel.clone(), self.sender.clone());
                self.active = Some(PendingTask {
                    scope,
                    cancel,
                    context: Rc::clone(&self.context),
                    content: Rc::clone(&item),
                    user,
                    snapshot,
                    on_shown,
                });
                self.observer.content_shown(self.id);
                return;
            }
            async_item.on_async_end(
                &mut *self.context.borrow_mut(),
                user.as_ref(),
                AsyncShowResult::not_run(),
            );
        }

        self.finalize(snapshot, on_shown, true);
        self.observer.content_shown(self.id);
    }

    /// Cancel the in-flight task, if any, and park it until its completion
    /// arrives so the async-end hook still fires.
    fn retire_active(&mut self) {
        if let Some(pending) = self.active.take() {
            pending.cancel.cancel();
            trace::log_event("tab.async.cancel", "superseded by a newer show");
            self.retired.push(pending);
        }
    }

    fn hide_current(&mut self) {
        let current = Rc::clone(self.history.current());
        if !current.is_empty_sentinel() {
            current.on_hide();
        }
    }

    fn finalize(
        &mut self,
        snapshot: Option<ViewState>,
        on_shown: Option<ShownCallback>,
        success: bool,
    ) {
        if let Some(state) = snapshot {
            let ready = self.context.borrow().is_ready();
            if ready {
                self.context.borrow_mut().restore(&state);
            } else {
                self.deferred = Some(DeferredRestore {
                    state,
                    version: self.context_version,
                });
            }
        }
        if let Some(on_shown) = on_shown {
            on_shown(success);
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        let outcome = match completion.result {
            Ok(output) => AsyncOutcome::Completed(output),
            Err(err) => AsyncOutcome::Failed(err),
        };

        if let Some(pending) = self.active.take_if(|task| task.scope == completion.scope) {
            let applicable = Rc::ptr_eq(&pending.context, &self.context)
                && pending.context.borrow().owner() == Some(self.id);
            if applicable {
                let result = AsyncShowResult {
                    outcome,
                    applicable: true,
                };
                let success = result.success();
                if let Some(async_item) = pending.content.as_async() {
                    async_item.on_async_end(
                        &mut *self.context.borrow_mut(),
                        pending.user.as_ref(),
                        result,
                    );
                }
                trace::log_event("tab.async.done", format!("success={success}"));
                self.finalize(pending.snapshot, pending.on_shown, success);
            } else {
                Self::discard(pending, outcome);
            }
            return;
        }

        if let Some(index) = self
            .retired
            .iter()
            .position(|task| task.scope == completion.scope)
        {
            let pending = self.retired.remove(index);
            Self::discard(pending, outcome);
        }
    }

    /// Release a superseded task: the async-end hook fires against the
    /// context the task started with, marked inapplicable, and the show's
    /// snapshot and shown-callback are dropped unused.
    fn discard(pending: PendingTask, outcome: AsyncOutcome) {
        if let Some(async_item) = pending.content.as_async() {
            async_item.on_async_end(
                &mut *pending.context.borrow_mut(),
                pending.user.as_ref(),
                AsyncShowResult {
                    outcome,
                    applicable: false,
                },
            );
        }
        trace::log_event("tab.async.stale", "superseded result discarded");
    }
}

impl Default for TabController {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TabController {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{
        AsyncTabContent, OwnerSlot, ProduceError, ProduceJob, ProducedOutput,
    };
    use crate::render::RenderContext;
    use serde_json::{Value, json};
    use std::any::Any;
    use std::cell::{Cell, RefCell};
    use std::sync::mpsc::Receiver as GateReceiver;
    use std::thread;
    use std::time::{Duration, Instant};

    type Log = Rc<RefCell<Vec<String>>>;

    fn log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    struct TestContext {
        owner: OwnerSlot,
        caret: Cell<u64>,
        ready: Cell<bool>,
        restored: RefCell<Vec<ViewState>>,
        shows: Cell<u32>,
        hides: Cell<u32>,
    }

    impl TestContext {
        fn new() -> Self {
            Self {
                owner: OwnerSlot::new(),
                caret: Cell::new(0),
                ready: Cell::new(true),
                restored: RefCell::new(Vec::new()),
                shows: Cell::new(0),
                hides: Cell::new(0),
            }
        }
    }

    impl RenderContext for TestContext {
        fn on_show(&mut self) {
            self.shows.set(self.shows.get() + 1);
        }

        fn on_hide(&mut self) {
            self.hides.set(self.hides.get() + 1);
        }

        fn owner(&self) -> Option<TabId> {
            self.owner.get()
        }

        fn bind_owner(&self, owner: TabId) {
            self.owner.bind(owner);
        }

        fn serialize(&self) -> Option<ViewState> {
            Some(json!({ "caret": self.caret.get() }))
        }

        fn restore(&mut self, state: &ViewState) {
            self.restored.borrow_mut().push(state.clone());
            if let Some(caret) = state.get("caret").and_then(Value::as_u64) {
                self.caret.set(caret);
            }
        }

        fn is_ready(&self) -> bool {
            self.ready.get()
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    struct PlainItem {
        owner: OwnerSlot,
        title: String,
        context: Rc<RefCell<TestContext>>,
        log: Log,
    }

    fn plain(title: &str, log: &Log) -> Rc<PlainItem> {
        Rc::new(PlainItem {
            owner: OwnerSlot::new(),
            title: title.to_string(),
            context: Rc::new(RefCell::new(TestContext::new())),
            log: Rc::clone(log),
        })
    }

    impl TabContent for PlainItem {
        fn title(&self) -> String {
            self.title.clone()
        }

        fn owner(&self) -> Option<TabId> {
            self.owner.get()
        }

        fn bind_owner(&self, owner: TabId) {
            self.owner.bind(owner);
        }

        fn create_context(&self, _locator: &mut dyn ContextLocator) -> SharedContext {
            self.context.clone()
        }

        fn on_show(&self, _ctx: &mut dyn RenderContext) -> Option<UserData> {
            self.log.borrow_mut().push(format!("show {}", self.title));
            None
        }

        fn on_hide(&self) {
            self.log.borrow_mut().push(format!("hide {}", self.title));
        }

        fn on_selected(&self) {
            self.log
                .borrow_mut()
                .push(format!("selected {}", self.title));
        }

        fn on_unselected(&self) {
            self.log
                .borrow_mut()
                .push(format!("unselected {}", self.title));
        }
    }

    struct AsyncItem {
        owner: OwnerSlot,
        title: String,
        context: Rc<RefCell<TestContext>>,
        log: Log,
        /// Worker blocks on this until the test releases it.
        gate: RefCell<Option<GateReceiver<()>>>,
        should: bool,
        fail: bool,
    }

    fn async_item(title: &str, log: &Log, gate: Option<GateReceiver<()>>) -> Rc<AsyncItem> {
        Rc::new(AsyncItem {
            owner: OwnerSlot::new(),
            title: title.to_string(),
            context: Rc::new(RefCell::new(TestContext::new())),
            log: Rc::clone(log),
            gate: RefCell::new(gate),
            should: true,
            fail: false,
        })
    }

    impl TabContent for AsyncItem {
        fn title(&self) -> String {
            self.title.clone()
        }

        fn owner(&self) -> Option<TabId> {
            self.owner.get()
        }

        fn bind_owner(&self, owner: TabId) {
            self.owner.bind(owner);
        }

        fn create_context(&self, _locator: &mut dyn ContextLocator) -> SharedContext {
            self.context.clone()
        }

        fn on_hide(&self) {
            self.log.borrow_mut().push(format!("hide {}", self.title));
        }

        fn as_async(&self) -> Option<&dyn AsyncTabContent> {
            Some(self)
        }
    }

    impl AsyncTabContent for AsyncItem {
        fn should_start(&self, _ctx: &dyn RenderContext, _user: Option<&UserData>) -> bool {
            self.should
        }

        fn start(&self, _ctx: &dyn RenderContext, _user: Option<&UserData>) -> ProduceJob {
            let gate = self.gate.borrow_mut().take();
            let fail = self.fail;
            Box::new(move |cancel| {
                if let Some(gate) = gate {
                    let _ = gate.recv();
                }
                if cancel.is_cancelled() {
                    return Err(ProduceError::Cancelled);
                }
                if fail {
                    return Err(ProduceError::Failed("boom".to_string()));
                }
                Ok(Box::new(99u32) as ProducedOutput)
            })
        }

        fn on_async_end(
            &self,
            _ctx: &mut dyn RenderContext,
            _user: Option<&UserData>,
            result: AsyncShowResult,
        ) {
            let outcome = match result.outcome {
                AsyncOutcome::Completed(_) => "completed",
                AsyncOutcome::Failed(ProduceError::Cancelled) => "cancelled",
                AsyncOutcome::Failed(ProduceError::Failed(_)) => "failed",
                AsyncOutcome::NotRun => "notrun",
            };
            self.log.borrow_mut().push(format!(
                "end {} {outcome} applicable={}",
                self.title, result.applicable
            ));
        }
    }

    /// Poll until at least one completion is handled.
    fn drain(controller: &mut TabController) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if controller.poll() > 0 {
                return;
            }
            assert!(Instant::now() < deadline, "timed out waiting for a completion");
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn shown_flag() -> (Rc<Cell<Option<bool>>>, ShownCallback) {
        let flag = Rc::new(Cell::new(None));
        let inner = Rc::clone(&flag);
        (flag, Box::new(move |success| inner.set(Some(success))))
    }

    #[test]
    fn test_first_show_replaces_sentinel() {
        let log = log();
        let mut controller = TabController::new();
        controller.show(plain("a", &log), None, None);

        assert_eq!(controller.title(), "a");
        assert!(!controller.can_navigate_backward());
        assert!(!controller.can_navigate_forward());
    }

    #[test]
    fn test_show_hides_outgoing_before_showing() {
        let log = log();
        let mut controller = TabController::new();
        controller.show(plain("a", &log), None, None);
        controller.show(plain("b", &log), None, None);

        assert_eq!(*log.borrow(), vec!["show a", "hide a", "show b"]);
        assert!(controller.can_navigate_backward());
    }

    #[test]
    fn test_sync_show_finalizes_immediately() {
        let log = log();
        let mut controller = TabController::new();
        let (flag, on_shown) = shown_flag();
        controller.show(plain("a", &log), None, Some(on_shown));

        assert_eq!(flag.get(), Some(true));
        assert!(!controller.has_pending_task());
    }

    #[test]
    fn test_context_version_bumps_on_rebind_only() {
        let log = log();
        let mut controller = TabController::new();
        let item = plain("a", &log);
        controller.show(Rc::clone(&item) as Rc<dyn TabContent>, None, None);
        let version = controller.context_version();

        // Refreshing the same item rebinds the same context instance
        controller.refresh();
        assert_eq!(controller.context_version(), version);

        controller.show(plain("b", &log), None, None);
        assert_eq!(controller.context_version(), version + 1);
    }

    #[test]
    fn test_navigate_backward_restores_snapshot() {
        let log = log();
        let mut controller = TabController::new();
        let first = plain("a", &log);
        controller.show(Rc::clone(&first) as Rc<dyn TabContent>, None, None);
        first.context.borrow().caret.set(42);
        controller.show(plain("b", &log), None, None);

        assert!(controller.navigate_backward());
        assert_eq!(controller.title(), "a");
        let restored = first.context.borrow().restored.borrow().clone();
        assert_eq!(restored, vec![json!({ "caret": 42 })]);
    }

    #[test]
    fn test_navigate_without_history_is_noop() {
        let mut controller = TabController::new();
        assert!(!controller.navigate_backward());
        assert!(!controller.navigate_forward());
    }

    #[test]
    fn test_navigate_forward_after_backward() {
        let log = log();
        let mut controller = TabController::new();
        controller.show(plain("a", &log), None, None);
        controller.show(plain("b", &log), None, None);

        controller.navigate_backward();
        assert!(controller.can_navigate_forward());
        assert!(controller.navigate_forward());
        assert_eq!(controller.title(), "b");
    }

    #[test]
    fn test_navigate_backward_hides_outgoing_item() {
        let log = log();
        let mut controller = TabController::new();
        controller.show(plain("a", &log), None, None);
        controller.show(plain("b", &log), None, None);
        log.borrow_mut().clear();

        assert!(controller.navigate_backward());
        assert_eq!(*log.borrow(), vec!["hide b", "show a"]);
    }

    #[test]
    fn test_navigate_forward_hides_outgoing_item() {
        let log = log();
        let mut controller = TabController::new();
        controller.show(plain("a", &log), None, None);
        controller.show(plain("b", &log), None, None);
        controller.navigate_backward();
        log.borrow_mut().clear();

        assert!(controller.navigate_forward());
        assert_eq!(*log.borrow(), vec!["hide a", "show b"]);
    }

    #[test]
    fn test_context_hooks_fire_only_on_rebind() {
        let log = log();
        let mut controller = TabController::new();
        let item = plain("a", &log);
        controller.show(Rc::clone(&item) as Rc<dyn TabContent>, None, None);
        assert_eq!(item.context.borrow().shows.get(), 1);

        controller.refresh();
        assert_eq!(
            item.context.borrow().shows.get(),
            1,
            "the same context stays shown across a refresh"
        );
        assert_eq!(item.context.borrow().hides.get(), 0);

        controller.show(plain("b", &log), None, None);
        assert_eq!(item.context.borrow().hides.get(), 1);
        assert_eq!(item.context.borrow().shows.get(), 1);
    }

    #[test]
    fn test_refresh_preserves_caret_state() {
        let log = log();
        let mut controller = TabController::new();
        let item = plain("a", &log);
        controller.show(Rc::clone(&item) as Rc<dyn TabContent>, None, None);
        item.context.borrow().caret.set(17);

        controller.refresh();

        let restored = item.context.borrow().restored.borrow().clone();
        assert_eq!(restored, vec![json!({ "caret": 17 })]);
        assert!(!controller.can_navigate_backward(), "refresh records no history");
    }

    #[test]
    fn test_refresh_on_sentinel_is_noop() {
        let mut controller = TabController::new();
        controller.refresh();
        assert!(controller.title().is_empty());
    }

    #[test]
    fn test_async_show_commits_on_completion() {
        let log = log();
        let mut controller = TabController::new();
        let (flag, on_shown) = shown_flag();
        controller.show(async_item("a", &log, None), None, Some(on_shown));
        assert!(controller.has_pending_task());
        assert_eq!(flag.get(), None, "not finalized before the task completes");

        drain(&mut controller);
        assert_eq!(flag.get(), Some(true));
        assert!(!controller.has_pending_task());
        assert_eq!(*log.borrow(), vec!["end a completed applicable=true"]);
    }

    #[test]
    fn test_async_failure_reports_unsuccessful_show() {
        let log = log();
        let mut controller = TabController::new();
        let mut item = async_item("a", &log, None);
        Rc::get_mut(&mut item).unwrap().fail = true;
        let (flag, on_shown) = shown_flag();
        controller.show(item, None, Some(on_shown));

        drain(&mut controller);
        assert_eq!(flag.get(), Some(false));
        assert_eq!(*log.borrow(), vec!["end a failed applicable=true"]);
    }

    #[test]
    fn test_declined_task_skips_straight_to_async_end() {
        let log = log();
        let mut controller = TabController::new();
        let mut item = async_item("a", &log, None);
        Rc::get_mut(&mut item).unwrap().should = false;
        let (flag, on_shown) = shown_flag();
        controller.show(item, None, Some(on_shown));

        assert!(!controller.has_pending_task());
        assert_eq!(flag.get(), Some(true));
        assert_eq!(*log.borrow(), vec!["end a notrun applicable=true"]);
    }

    #[test]
    fn test_superseding_show_discards_stale_result() {
        let log = log();
        let mut controller = TabController::new();
        let (release, gate) = mpsc::channel();
        let (flag, on_shown) = shown_flag();
        controller.show(async_item("a", &log, Some(gate)), None, Some(on_shown));
        controller.show(plain("b", &log), None, None);
        assert!(!controller.has_pending_task());

        release.send(()).unwrap();
        drain(&mut controller);

        let entries = log.borrow().clone();
        let ends: Vec<_> = entries.iter().filter(|e| e.starts_with("end a")).collect();
        assert_eq!(ends, vec!["end a cancelled applicable=false"]);
        assert_eq!(flag.get(), None, "superseded show never finalizes");
        assert_eq!(controller.title(), "b");
    }

    #[test]
    fn test_navigate_backward_during_async_discards_result() {
        let log = log();
        let mut controller = TabController::new();
        controller.show(plain("a", &log), None, None);
        let (release, gate) = mpsc::channel();
        controller.show(async_item("b", &log, Some(gate)), None, None);

        assert!(controller.navigate_backward());
        assert_eq!(controller.title(), "a");

        release.send(()).unwrap();
        drain(&mut controller);
        let entries = log.borrow().clone();
        let ends: Vec<_> = entries.iter().filter(|e| e.starts_with("end b")).collect();
        assert_eq!(ends, vec!["end b cancelled applicable=false"]);
    }

    #[test]
    fn test_deferred_restore_waits_for_surface() {
        let log = log();
        let mut controller = TabController::new();
        let item = plain("a", &log);
        item.context.borrow().ready.set(false);
        controller.show(
            Rc::clone(&item) as Rc<dyn TabContent>,
            Some(json!({ "caret": 9 })),
            None,
        );
        assert!(item.context.borrow().restored.borrow().is_empty());

        controller.surface_ready();
        let restored = item.context.borrow().restored.borrow().clone();
        assert_eq!(restored, vec![json!({ "caret": 9 })]);
    }

    #[test]
    fn test_deferred_restore_dropped_after_context_rebind() {
        let log = log();
        let mut controller = TabController::new();
        let item = plain("a", &log);
        item.context.borrow().ready.set(false);
        controller.show(
            Rc::clone(&item) as Rc<dyn TabContent>,
            Some(json!({ "caret": 9 })),
            None,
        );
        controller.show(plain("b", &log), None, None);

        controller.surface_ready();
        assert!(
            item.context.borrow().restored.borrow().is_empty(),
            "snapshot must not apply to a replaced context"
        );
    }

    #[test]
    #[should_panic(expected = "owned by another tab")]
    fn test_show_rejects_item_owned_elsewhere() {
        let log = log();
        let mut first = TabController::new();
        let mut second = TabController::new();
        let item = plain("a", &log);
        first.show(Rc::clone(&item) as Rc<dyn TabContent>, None, None);
        second.show(item, None, None);
    }

    #[test]
    fn test_close_cancels_inflight_work() {
        let log = log();
        let mut controller = TabController::new();
        let (release, gate) = mpsc::channel();
        controller.show(async_item("a", &log, Some(gate)), None, None);

        controller.close();
        assert!(controller.is_closed());

        release.send(()).unwrap();
        drain(&mut controller);
        let entries = log.borrow().clone();
        assert!(
            entries.contains(&"end a cancelled applicable=false".to_string()),
            "async-end still fires after close: {entries:?}"
        );
    }

    #[test]
    fn test_selection_hooks_fire_once_per_transition() {
        let log = log();
        let mut controller = TabController::new();
        controller.show(plain("a", &log), None, None);

        controller.set_selected(true);
        controller.set_selected(true);
        controller.set_selected(false);

        let entries = log.borrow().clone();
        assert_eq!(entries[1..], ["selected a", "unselected a"]);
    }

    #[test]
    fn test_observer_sees_title_and_shown_notifications() {
        struct Recording(Log);
        impl TabObserver for Recording {
            fn title_changed(&mut self, title: &str, _tooltip: Option<&str>) {
                self.0.borrow_mut().push(format!("title={title}"));
            }
            fn content_shown(&mut self, _tab: TabId) {
                self.0.borrow_mut().push("shown".to_string());
            }
        }

        let log = log();
        let observed = log.clone();
        let mut controller = TabController::with_parts(
            Box::new(CachingLocator::new()),
            Box::new(Recording(observed)),
        );
        let quiet = Rc::new(RefCell::new(Vec::new()));
        controller.show(plain("a", &quiet), None, None);

        assert_eq!(*log.borrow(), vec!["title=a", "shown"]);
    }
}
