//! Reference spans, symbols, and the ordered reference index.
//!
//! Rendered output carries reference spans pointing at symbols. The
//! [`ReferenceIndex`] holds the spans of one content item in document
//! order and answers point lookups, cyclic iteration, and
//! equivalence-based grouping. Equivalence is broader than identity: a
//! usage site and a definition site are different spans whose payloads
//! may only compare equal after resolving to a canonical definition.
//!
//! Spans are immutable; the whole index is replaced when content is
//! re-rendered.

pub mod navigate;

use std::ops::Index;

use serde::{Deserialize, Serialize};

/// A member-like symbol: something declared inside a type.
///
/// Comparison is field-wise, so declaring-type context is significant and
/// a private-scope marker participates like any other field: two
/// private-scope symbols with identical signatures in the same declaring
/// type compare equal even though they were distinct reference objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberSig {
    /// Full name of the declaring type, if any.
    pub declaring_type: Option<String>,
    /// Member name.
    pub name: String,
    /// Encoded signature (parameter/return shape).
    pub signature: String,
    /// Whether the member is compilation-unit private ("no visibility
    /// scope"). Still comparable.
    pub private_scope: bool,
}

impl MemberSig {
    pub fn new(
        declaring_type: impl Into<Option<String>>,
        name: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            signature: signature.into(),
            private_scope: false,
        }
    }

    #[must_use]
    pub fn with_private_scope(mut self) -> Self {
        self.private_scope = true;
        self
    }
}

/// Symbolic payload attached to a reference span.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    /// A member-like symbol, subject to resolution before comparison.
    Member(MemberSig),
    /// Anything else (keywords, literals, opcodes); compared strictly by
    /// value and never resolved.
    Opaque(String),
}

impl Symbol {
    pub fn member(
        declaring_type: impl Into<Option<String>>,
        name: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self::Member(MemberSig::new(declaring_type, name, signature))
    }

    pub fn opaque(text: impl Into<String>) -> Self {
        Self::Opaque(text.into())
    }

    pub const fn is_member(&self) -> bool {
        matches!(self, Self::Member(_))
    }
}

/// Resolves a usage-site symbol to its canonical definition.
///
/// Used only inside equivalence. Returning `None` means resolution failed
/// and the original symbol is compared unchanged.
pub trait SymbolResolver {
    fn resolve(&self, symbol: &Symbol) -> Option<Symbol>;
}

/// Resolver that never resolves anything; equivalence falls back to plain
/// value comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl SymbolResolver for NoResolver {
    fn resolve(&self, _symbol: &Symbol) -> Option<Symbol> {
        None
    }
}

/// An immutable half-open range `[start, end)` carrying a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub symbol: Symbol,
    /// Reference whose definition lies within the same content.
    pub is_local: bool,
    /// This span is itself a definition site within the same content.
    pub is_local_target: bool,
}

impl Span {
    pub const fn new(start: usize, end: usize, symbol: Symbol) -> Self {
        Self {
            start,
            end,
            symbol,
            is_local: false,
            is_local_target: false,
        }
    }

    #[must_use]
    pub const fn local(mut self) -> Self {
        self.is_local = true;
        self
    }

    #[must_use]
    pub const fn local_target(mut self) -> Self {
        self.is_local_target = true;
        self
    }

    pub const fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// Position of a span inside one [`ReferenceIndex`].
///
/// Ids are only meaningful against the index that produced them; a
/// re-rendered content gets a fresh index and fresh ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanId(usize);

/// Whether two symbols refer to the same thing.
///
/// True when the payloads compare equal by value, or when both are
/// member-like and their *resolved* forms compare equal (failed resolution
/// leaves a symbol unchanged). Resolution never applies to opaque
/// payloads. Not guaranteed transitive across symbol kinds.
pub fn symbols_equivalent(a: &Symbol, b: &Symbol, resolver: &dyn SymbolResolver) -> bool {
    if a == b {
        return true;
    }
    if !(a.is_member() && b.is_member()) {
        return false;
    }
    let resolved_a = resolver.resolve(a).unwrap_or_else(|| a.clone());
    let resolved_b = resolver.resolve(b).unwrap_or_else(|| b.clone());
    resolved_a == resolved_b
}

/// Whether two spans reference the same symbol (see [`symbols_equivalent`]).
pub fn spans_equivalent(a: &Span, b: &Span, resolver: &dyn SymbolResolver) -> bool {
    symbols_equivalent(&a.symbol, &b.symbol, resolver)
}

/// Ordered collection of the reference spans of one content item.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    spans: Vec<Span>,
}

impl ReferenceIndex {
    /// Build an index from spans in any order; they are sorted into
    /// document order (by start, then end).
    pub fn new(mut spans: Vec<Span>) -> Self {
        spans.sort_by_key(|span| (span.start, span.end));
        Self { spans }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub const fn len(&self) -> usize {
        self.spans.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn get(&self, id: SpanId) -> Option<&Span> {
        self.spans.get(id.0)
    }

    /// Iterate spans in document order.
    pub fn iter(&self) -> impl Iterator<Item = (SpanId, &Span)> {
        self.spans
            .iter()
            .enumerate()
            .map(|(i, span)| (SpanId(i), span))
    }

    /// Id of the span at `position` in document order, for hosts that
    /// enumerate spans externally.
    pub fn id_at(&self, position: usize) -> Option<SpanId> {
        (position < self.spans.len()).then_some(SpanId(position))
    }

    /// The span under `offset`.
    ///
    /// Prefers a span strictly containing `offset`; if none does, falls
    /// back to the first boundary-adjacent span (one whose range touches
    /// `offset`), preferring a span that starts at or before `offset`.
    pub fn span_at(&self, offset: usize) -> Option<SpanId> {
        let mut adjacent = None;
        for (i, span) in self.spans.iter().enumerate() {
            if span.start > offset {
                break;
            }
            if span.end < offset {
                continue;
            }
            if span.contains(offset) {
                return Some(SpanId(i));
            }
            // start <= offset == end: touches the boundary only
            if adjacent.is_none() {
                adjacent = Some(SpanId(i));
            }
        }
        adjacent
    }

    /// The next (or previous) span in document order, wrapping at either
    /// end. A single-span index wraps to `from` itself; an empty index (or
    /// a stale id) yields `None`.
    pub fn cycle(&self, from: SpanId, forward: bool) -> Option<SpanId> {
        let len = self.spans.len();
        if len == 0 || from.0 >= len {
            return None;
        }
        let next = if forward {
            (from.0 + 1) % len
        } else {
            (from.0 + len - 1) % len
        };
        Some(SpanId(next))
    }

    /// Every span other than `from`, in cycle order starting after `from`.
    ///
    /// Visits each of the remaining `len - 1` spans exactly once, then
    /// stops (the cycle-detection stop condition). Empty for an empty or
    /// single-span index.
    pub fn cycle_from(&self, from: SpanId, forward: bool) -> impl Iterator<Item = SpanId> {
        let mut cursor = Some(from);
        std::iter::from_fn(move || {
            let next = self.cycle(cursor?, forward)?;
            if next == from {
                cursor = None;
                return None;
            }
            cursor = Some(next);
            Some(next)
        })
    }

    /// The definition site for the span at `id` within this content:
    /// the span itself when it is a local target, otherwise the first
    /// equivalent local-target span, else `None`.
    pub fn local_target_of(&self, id: SpanId, resolver: &dyn SymbolResolver) -> Option<SpanId> {
        let span = self.get(id)?;
        if span.is_local_target {
            return Some(id);
        }
        self.find_local_target(span, resolver)
    }

    /// First local-target span equivalent to `span` (which need not belong
    /// to this index).
    pub fn find_local_target(&self, span: &Span, resolver: &dyn SymbolResolver) -> Option<SpanId> {
        self.iter()
            .find(|(_, candidate)| {
                candidate.is_local_target && spans_equivalent(candidate, span, resolver)
            })
            .map(|(id, _)| id)
    }

    /// Ids of every span equivalent to `span`, in document order.
    pub fn find_equivalent(
        &self,
        span: &Span,
        resolver: &dyn SymbolResolver,
    ) -> Vec<SpanId> {
        self.iter()
            .filter(|(_, candidate)| spans_equivalent(candidate, span, resolver))
            .map(|(id, _)| id)
            .collect()
    }

    /// Whether two in-index spans are equivalent: same span, or their
    /// payloads match under [`symbols_equivalent`].
    pub fn equivalent(&self, a: SpanId, b: SpanId, resolver: &dyn SymbolResolver) -> bool {
        if a == b {
            return true;
        }
        match (self.get(a), self.get(b)) {
            (Some(span_a), Some(span_b)) => spans_equivalent(span_a, span_b, resolver),
            _ => false,
        }
    }
}

impl Index<SpanId> for ReferenceIndex {
    type Output = Span;

    fn index(&self, id: SpanId) -> &Span {
        &self.spans[id.0]
    }
}
