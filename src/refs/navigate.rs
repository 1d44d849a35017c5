//! Reference navigation policy.
//!
//! Given a reference span and an intent, the [`Navigator`] decides whether
//! to jump somewhere in another slot, move the caret in place, or only
//! highlight related occurrences. "Follow" has three distinct destinations
//! depending on whether the origin is local to the displayed content and
//! whether the jump should be recorded in history — pressing Enter and
//! Ctrl+Enter on the same reference must behave differently.
//!
//! The navigator owns the displayed content's [`ReferenceIndex`] snapshot
//! and talks to everything else through narrow collaborator traits.

use crate::trace;

use super::{ReferenceIndex, Span, SpanId, Symbol, SymbolResolver};

/// Visual role of a related-reference highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightKind {
    /// The span is a definition site.
    Definition,
    /// The span is a plain reference.
    Reference,
}

/// Caret, selection, and highlight operations on the rendering surface.
pub trait NavigationSurface {
    /// Current caret offset in content coordinates.
    fn caret(&self) -> usize;

    /// Move the caret (and scroll it into view) without touching history.
    fn move_caret(&mut self, offset: usize);

    /// Collapse the selection to `offset` and move the caret there.
    fn select(&mut self, offset: usize);

    /// Highlight a span with the given role.
    fn mark(&mut self, span: SpanId, kind: HighlightKind);

    /// Remove every highlight added via [`mark`](Self::mark).
    fn clear_marks(&mut self);

    /// Give the surface input focus.
    fn focus(&mut self);
}

/// Cross-slot follow collaborator: causes another show elsewhere,
/// possibly in a new tab. Opaque beyond that.
pub trait FollowDelegate {
    fn follow(&mut self, span: &Span, new_slot: bool);
}

/// Looks up the position of a symbol's definition within the displayed
/// content, for symbols that have one but no local-target span.
pub trait DefinitionLookup {
    fn position_of(&self, symbol: &Symbol) -> Option<usize>;
}

/// Lookup that knows no definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDefinitions;

impl DefinitionLookup for NoDefinitions {
    fn position_of(&self, _symbol: &Symbol) -> Option<usize> {
        None
    }
}

/// Intent flags for a follow request.
#[derive(Debug, Clone, Copy)]
pub struct FollowOptions {
    /// Always delegate to the cross-slot follower, opening a new slot.
    pub to_new_slot: bool,
    /// Prefer resolving within the displayed content before crossing slots.
    pub prefer_local: bool,
    /// Whether the jump should be recorded in navigation history (which
    /// routes it through the cross-slot follower).
    pub record_history: bool,
    /// Whether crossing to another slot is permitted at all.
    pub may_cross_slot: bool,
}

impl FollowOptions {
    /// Follow in place when possible, recording history (Enter / F12).
    pub const fn local_follow() -> Self {
        Self {
            to_new_slot: false,
            prefer_local: true,
            record_history: true,
            may_cross_slot: true,
        }
    }

    /// Open the target in a new slot (Ctrl+Enter / Ctrl+F12).
    pub const fn new_slot() -> Self {
        Self {
            to_new_slot: true,
            prefer_local: false,
            record_history: true,
            may_cross_slot: true,
        }
    }

    /// Seek the definition, recording history (reference click).
    pub const fn definition() -> Self {
        Self {
            to_new_slot: false,
            prefer_local: false,
            record_history: true,
            may_cross_slot: true,
        }
    }

    /// Jump within the displayed content only, without history.
    pub const fn in_place() -> Self {
        Self {
            to_new_slot: false,
            prefer_local: true,
            record_history: false,
            may_cross_slot: false,
        }
    }
}

/// What a follow request accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// A jump happened (in place or via the cross-slot follower).
    Navigated,
    /// Related references were highlighted but nothing moved; other
    /// handlers may still act on the request.
    MarkedOnly,
    /// Nothing to do (no target, or a slot crossing was not permitted).
    NotHandled,
}

impl FollowOutcome {
    pub const fn handled(self) -> bool {
        !matches!(self, Self::NotHandled)
    }
}

/// Where a follow request's span came from.
///
/// "Belongs to the displayed content" is strict index membership
/// (`Local`); equivalence is deliberately not consulted at this boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanOrigin {
    /// A span of the displayed content's own index.
    Local(SpanId),
    /// A span carried over from some other content.
    Foreign(Span),
}

/// Collaborators a navigation request runs against.
pub struct Collaborators<'a> {
    pub resolver: &'a dyn SymbolResolver,
    pub definitions: &'a dyn DefinitionLookup,
    pub follower: &'a mut dyn FollowDelegate,
    pub surface: &'a mut dyn NavigationSurface,
}

/// Policy layer deciding what a navigation intent does.
pub struct Navigator {
    index: ReferenceIndex,
    last_marked: Option<Span>,
}

impl Navigator {
    pub fn new(index: ReferenceIndex) -> Self {
        Self {
            index,
            last_marked: None,
        }
    }

    /// Replace the index after content is re-rendered. Previous span ids
    /// and mark state are invalidated wholesale.
    pub fn set_index(&mut self, index: ReferenceIndex) {
        self.index = index;
        self.last_marked = None;
    }

    pub const fn index(&self) -> &ReferenceIndex {
        &self.index
    }

    /// Run the follow state machine for `origin` under `opts`.
    pub fn follow(
        &mut self,
        origin: &SpanOrigin,
        opts: FollowOptions,
        collab: &mut Collaborators<'_>,
    ) -> FollowOutcome {
        let Some(span) = self.origin_span(origin).cloned() else {
            return FollowOutcome::NotHandled;
        };
        trace::log_event(
            "nav.follow",
            format!(
                "new_slot={} prefer_local={} record_history={}",
                opts.to_new_slot, opts.prefer_local, opts.record_history
            ),
        );

        if opts.to_new_slot {
            if !opts.may_cross_slot {
                return FollowOutcome::NotHandled;
            }
            collab.follower.follow(&span, true);
            return FollowOutcome::Navigated;
        }

        if opts.prefer_local {
            self.follow_prefer_local(origin, &span, opts, collab)
        } else {
            self.follow_definition(origin, span, opts, collab)
        }
    }

    fn follow_prefer_local(
        &mut self,
        origin: &SpanOrigin,
        span: &Span,
        opts: FollowOptions,
        collab: &mut Collaborators<'_>,
    ) -> FollowOutcome {
        let SpanOrigin::Local(id) = *origin else {
            // Span from another content: the jump must cross slots
            if !opts.may_cross_slot {
                return FollowOutcome::NotHandled;
            }
            collab.follower.follow(span, false);
            return FollowOutcome::Navigated;
        };

        let id = self
            .index
            .local_target_of(id, collab.resolver)
            .unwrap_or(id);
        let target = self.index[id].clone();

        if target.is_local_target {
            if opts.record_history {
                if !opts.may_cross_slot {
                    return FollowOutcome::NotHandled;
                }
                collab.follower.follow(&target, false);
            } else {
                collab.surface.move_caret(target.start);
            }
            return FollowOutcome::Navigated;
        }

        if target.is_local {
            // Plain local reference with no definition site: nothing to
            // jump to
            return FollowOutcome::NotHandled;
        }
        if !opts.may_cross_slot {
            return FollowOutcome::NotHandled;
        }
        collab.follower.follow(&target, false);
        FollowOutcome::Navigated
    }

    fn follow_definition(
        &mut self,
        origin: &SpanOrigin,
        span: Span,
        opts: FollowOptions,
        collab: &mut Collaborators<'_>,
    ) -> FollowOutcome {
        // Substitute the definition site for a usage site when one exists
        let target = match *origin {
            SpanOrigin::Local(id) => {
                let id = self
                    .index
                    .local_target_of(id, collab.resolver)
                    .unwrap_or(id);
                self.index[id].clone()
            }
            SpanOrigin::Foreign(_) => {
                if span.is_local_target {
                    span
                } else {
                    match self.index.find_local_target(&span, collab.resolver) {
                        Some(id) => self.index[id].clone(),
                        None => span,
                    }
                }
            }
        };

        let mut position = None;
        if !target.is_local {
            if target.is_local_target {
                position = Some(target.end);
            }
            if position.is_none() {
                position = collab.definitions.position_of(&target.symbol);
            }
        }

        if let Some(position) = position {
            if opts.record_history {
                if !opts.may_cross_slot {
                    return FollowOutcome::NotHandled;
                }
                collab.follower.follow(&target, false);
            } else {
                self.mark_related(&target, collab.resolver, collab.surface);
                collab.surface.focus();
                collab.surface.select(position);
            }
            return FollowOutcome::Navigated;
        }

        if target.is_local && self.mark_related(&target, collab.resolver, collab.surface) {
            return FollowOutcome::MarkedOnly;
        }

        collab.surface.focus();
        if !opts.may_cross_slot {
            return FollowOutcome::NotHandled;
        }
        collab.follower.follow(&target, false);
        FollowOutcome::Navigated
    }

    /// Move the caret to the next (or previous) span equivalent to the one
    /// under the caret, wrapping in document order. History is untouched.
    pub fn move_reference(
        &self,
        forward: bool,
        resolver: &dyn SymbolResolver,
        surface: &mut dyn NavigationSurface,
    ) -> bool {
        let Some(origin) = self.index.span_at(surface.caret()) else {
            return false;
        };
        for id in self.index.cycle_from(origin, forward) {
            if self.index.equivalent(id, origin, resolver) {
                trace::log_event("nav.move", format!("forward={forward}"));
                surface.move_caret(self.index[id].start);
                return true;
            }
        }
        false
    }

    /// Highlight every span equivalent to `span`, tagged by role.
    ///
    /// No-op when `span` was the last one marked. Returns whether the
    /// request was taken (marks applied or already in place).
    pub fn mark_related(
        &mut self,
        span: &Span,
        resolver: &dyn SymbolResolver,
        surface: &mut dyn NavigationSurface,
    ) -> bool {
        if self.last_marked.as_ref() == Some(span) {
            return true;
        }
        surface.clear_marks();
        let related = self.index.find_equivalent(span, resolver);
        if related.is_empty() {
            self.last_marked = None;
            return false;
        }
        for id in &related {
            let kind = if self.index[*id].is_local_target {
                HighlightKind::Definition
            } else {
                HighlightKind::Reference
            };
            surface.mark(*id, kind);
        }
        trace::log_event("nav.mark", format!("related={}", related.len()));
        self.last_marked = Some(span.clone());
        true
    }

    /// Clear related-reference highlights (Escape).
    pub fn clear_marks(&mut self, surface: &mut dyn NavigationSurface) {
        surface.clear_marks();
        self.last_marked = None;
    }

    /// Track the caret: mark the references related to the span under the
    /// caret, or clear the marks when the caret sits in none.
    pub fn refresh_caret_marks(
        &mut self,
        resolver: &dyn SymbolResolver,
        surface: &mut dyn NavigationSurface,
    ) {
        match self.index.span_at(surface.caret()) {
            Some(id) => {
                let span = self.index[id].clone();
                self.mark_related(&span, resolver, surface);
            }
            None => self.clear_marks(surface),
        }
    }

    /// Jump to the definition site of `symbol` within the displayed
    /// content, in place and without history. Returns whether a local
    /// target carrying exactly that symbol existed.
    pub fn go_to_location(
        &mut self,
        symbol: &Symbol,
        collab: &mut Collaborators<'_>,
    ) -> bool {
        let Some(id) = self
            .index
            .iter()
            .find(|(_, span)| span.is_local_target && span.symbol == *symbol)
            .map(|(id, _)| id)
        else {
            return false;
        };
        self.follow(&SpanOrigin::Local(id), FollowOptions::in_place(), collab)
            .handled()
    }

    fn origin_span<'a>(&'a self, origin: &'a SpanOrigin) -> Option<&'a Span> {
        match origin {
            SpanOrigin::Local(id) => self.index.get(*id),
            SpanOrigin::Foreign(span) => Some(span),
        }
    }
}
