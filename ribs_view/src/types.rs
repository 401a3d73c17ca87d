// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the view hierarchy: view identifiers, flags, local data and saved state.

use alloc::collections::BTreeMap;
use alloc::string::String;

use serde::{Deserialize, Serialize};

/// Identifier for a view in the hierarchy.
///
/// This is a small, copyable handle that stays stable while the view is alive
/// and becomes invalid when the underlying slot is reused.
/// It consists of a slot index and a generation counter.
///
/// ## Semantics
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - On remove, the slot is freed; any existing `ViewId` that pointed to that slot is now stale.
/// - On reuse of a freed slot, its generation is incremented, producing a new, distinct `ViewId`.
///
/// Use [`ViewTree::is_alive`](crate::ViewTree::is_alive) to check whether a `ViewId` still refers to a live view.
/// Stale `ViewId`s never alias a different live view because the generation must match.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ViewId(pub(crate) u32, pub(crate) u32);

impl ViewId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// View flags controlling rooting, visibility and state saving.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ViewFlags: u8 {
        /// View is a window root; views reachable from it are on screen.
        const ROOT         = 0b0000_0001;
        /// View is visible.
        const VISIBLE      = 0b0000_0010;
        /// View participates in hierarchy state save/restore.
        const SAVE_ENABLED = 0b0000_0100;
    }
}

impl Default for ViewFlags {
    fn default() -> Self {
        Self::VISIBLE | Self::SAVE_ENABLED
    }
}

/// Local data for a view.
#[derive(Clone, Debug, Default)]
pub struct LocalView {
    /// Key under which the view's state is saved. Views without a key are never saved.
    pub key: Option<u32>,
    /// Rooting, visibility and saving flags.
    pub flags: ViewFlags,
    /// Human readable label, used by debugging output and tests.
    pub label: Option<String>,
}

impl LocalView {
    /// A keyed view with default flags.
    pub fn keyed(key: u32) -> Self {
        Self {
            key: Some(key),
            ..Default::default()
        }
    }

    /// Attach a label to this view.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Saved state of a view subtree, keyed by [`LocalView::key`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewState(BTreeMap<u32, String>);

impl ViewState {
    /// An empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if no view contributed state.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of saved entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// State saved for `key`, if any.
    pub fn get(&self, key: u32) -> Option<&str> {
        self.0.get(&key).map(String::as_str)
    }

    pub(crate) fn insert(&mut self, key: u32, state: String) {
        self.0.insert(key, state);
    }
}

/// Errors reported by structural view operations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    /// The id does not refer to a live view.
    #[error("view {0:?} is not alive")]
    Stale(ViewId),
    /// The view already has a parent and must be removed first.
    #[error("view {view:?} is already a child of {parent:?}")]
    AlreadyParented {
        /// View that was being added.
        view: ViewId,
        /// Its current parent.
        parent: ViewId,
    },
    /// Linking would make a view its own ancestor.
    #[error("view {view:?} cannot be added under its own subtree")]
    Cycle {
        /// View that was being added.
        view: ViewId,
    },
}
