// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. refs::ReferenceIndex)
    clippy::module_name_repetitions
)]

//! # Tabnav
//!
//! The content core of a navigable view slot ("tab"): lifecycle, history,
//! and reference navigation. No rendering happens here — hosts plug their
//! surfaces in behind narrow traits.
//!
//! Tabnav provides:
//! - Back/forward history with per-entry view-state snapshots
//! - Cancellable background content production with a staleness check that
//!   discards results superseded while they were computed
//! - An ordered reference-span index with point/cyclic lookup and
//!   resolution-based symbol equivalence
//! - A navigator deciding whether a "follow" jumps across slots, moves the
//!   caret in place, or only highlights related occurrences
//!
//! ## Architecture
//!
//! Everything mutable lives on one logical owner thread. The only real
//! parallelism is a background production job, which runs on a worker
//! thread and reports over a channel that the owner drains via
//! [`TabController::poll`](tab::TabController::poll).
//!
//! ## Modules
//!
//! - [`tab`]: Content lifecycle controller
//! - [`history`]: Back/forward history stack
//! - [`refs`]: Reference index, equivalence, and the navigator
//! - [`content`]: Content item contract
//! - [`render`]: Rendering context contract
//! - [`trace`]: Lifecycle instrumentation

pub mod content;
pub mod history;
pub mod refs;
pub mod render;
pub mod tab;
pub mod trace;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::content::{AsyncTabContent, TabContent, TabId};
    pub use crate::history::History;
    pub use crate::refs::navigate::{FollowOptions, Navigator, SpanOrigin};
    pub use crate::refs::{ReferenceIndex, Span, Symbol};
    pub use crate::render::{RenderContext, ViewState};
    pub use crate::tab::TabController;
}
