//! Back/forward history over shown content.
//!
//! The [`History`] struct is an ordered sequence of entries with a single
//! cursor. Setting a new current item while the cursor is not at the tail
//! drops everything after the cursor (browser-history semantics). Each
//! entry can carry a serialized view-state snapshot; snapshots are attached
//! lazily by the controller at the moment the entry's item is navigated
//! away from — the controller is the only writer of snapshots.
//!
//! # Example
//!
//! ```
//! use tabnav::history::History;
//!
//! let mut history = History::new("empty");
//! history.set_current("a", false); // replaces the sentinel
//! history.set_current("b", true);
//! assert!(history.can_navigate_backward());
//!
//! history.navigate_backward();
//! assert_eq!(*history.current(), "a");
//! assert!(history.can_navigate_forward());
//! ```

use crate::render::ViewState;

#[derive(Debug, Clone)]
struct Entry<T> {
    item: T,
    view_state: Option<ViewState>,
}

/// Append/cursor history of shown content items.
///
/// Construction installs a sentinel entry for the "nothing shown yet"
/// state; replacing it with `save_current_first = false` keeps it out of
/// navigation counts forever.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: Vec<Entry<T>>,
    cursor: usize,
}

impl<T> History<T> {
    /// Create a history whose current entry is `sentinel`.
    pub fn new(sentinel: T) -> Self {
        Self {
            entries: vec![Entry {
                item: sentinel,
                view_state: None,
            }],
            cursor: 0,
        }
    }

    /// The item at the cursor.
    pub fn current(&self) -> &T {
        &self.entries[self.cursor].item
    }

    /// Make `item` current.
    ///
    /// With `save_current_first` the old current item is kept as the entry
    /// behind the cursor (without a snapshot — see [`set_snapshot`]);
    /// without it the old current entry is replaced in place, which is how
    /// the construction sentinel is retired. Either way all entries after
    /// the cursor are dropped.
    ///
    /// [`set_snapshot`]: Self::set_snapshot
    pub fn set_current(&mut self, item: T, save_current_first: bool) {
        self.entries.truncate(self.cursor + 1);
        let entry = Entry {
            item,
            view_state: None,
        };
        if save_current_first {
            self.entries.push(entry);
            self.cursor += 1;
        } else {
            self.entries[self.cursor] = entry;
        }
    }

    /// Whether an entry exists before the cursor.
    pub const fn can_navigate_backward(&self) -> bool {
        self.cursor > 0
    }

    /// Whether an entry exists after the cursor.
    pub const fn can_navigate_forward(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Number of entries behind the cursor.
    pub const fn backward_count(&self) -> usize {
        self.cursor
    }

    /// Number of entries ahead of the cursor.
    pub const fn forward_count(&self) -> usize {
        self.entries.len() - self.cursor - 1
    }

    /// Attach a view-state snapshot to the current entry.
    ///
    /// Called by the controller just before the current item is navigated
    /// away from, so the snapshot is restored when navigation returns here.
    pub fn set_snapshot(&mut self, state: Option<ViewState>) {
        self.entries[self.cursor].view_state = state;
    }

    /// Move the cursor back one entry and return that entry's snapshot.
    ///
    /// `None` means the entry carries no snapshot, not that the navigation
    /// failed — callers must check [`can_navigate_backward`] first.
    ///
    /// [`can_navigate_backward`]: Self::can_navigate_backward
    ///
    /// # Panics
    ///
    /// Panics if no previous entry exists; navigating without checking the
    /// predicate is a programming error.
    pub fn navigate_backward(&mut self) -> Option<ViewState> {
        assert!(
            self.can_navigate_backward(),
            "navigate_backward called with no previous entry"
        );
        self.cursor -= 1;
        self.entries[self.cursor].view_state.clone()
    }

    /// Move the cursor forward one entry and return that entry's snapshot.
    ///
    /// # Panics
    ///
    /// Panics if no next entry exists; navigating without checking the
    /// predicate is a programming error.
    pub fn navigate_forward(&mut self) -> Option<ViewState> {
        assert!(
            self.can_navigate_forward(),
            "navigate_forward called with no next entry"
        );
        self.cursor += 1;
        self.entries[self.cursor].view_state.clone()
    }
}
