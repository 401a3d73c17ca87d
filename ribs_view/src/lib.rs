// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! RIBs View: a retained, arena-backed view hierarchy.
//!
//! The node tree in `ribs_core` never talks to a rendering toolkit directly.
//! It attaches and detaches views in this hierarchy, and a platform layer renders whatever is
//! reachable from a window root.
//!
//! - Represents a hierarchy of views with root windows, flags and savable per-view state.
//! - Hands out generational [`ViewId`] handles that never alias after a view is removed.
//! - Saves and restores the state of a whole subtree as a serializable [`ViewState`].
//!
//! ## API overview
//!
//! - [`ViewTree`]: container managing views and their parent/child links.
//! - [`LocalView`]: per-view local data (key, flags, label).
//! - [`ViewFlags`]: rooting, visibility and save controls.
//! - [`ViewState`]: saved state of a subtree, keyed by [`LocalView::key`].
//!
//! Key operations:
//! - [`ViewTree::new_root`] / [`ViewTree::insert`] → [`ViewId`]
//! - [`ViewTree::add_view`] / [`ViewTree::remove`]
//! - [`ViewTree::is_attached_to_root`]
//! - [`ViewTree::save_hierarchy_state`] / [`ViewTree::restore_hierarchy_state`]
//!
//! ### Minimal usage
//!
//! ```
//! use ribs_view::{LocalView, ViewTree};
//!
//! let mut views = ViewTree::new();
//! let window = views.new_root("window");
//!
//! // A view created by a factory starts unparented.
//! let screen = views.insert(None, LocalView::keyed(1).with_label("screen"));
//! assert!(!views.is_attached_to_root(screen));
//!
//! views.add_view(window, screen).unwrap();
//! assert!(views.is_attached_to_root(screen));
//!
//! views.set_state(screen, Some("scroll=12".into()));
//! let saved = views.save_hierarchy_state(screen);
//! views.remove(screen);
//! assert!(!views.is_alive(screen));
//!
//! let again = views.insert(Some(window), LocalView::keyed(1));
//! views.restore_hierarchy_state(again, &saved);
//! assert_eq!(views.state(again), Some("scroll=12"));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

mod tree;
mod types;

pub use tree::ViewTree;
pub use types::{LocalView, ViewError, ViewFlags, ViewId, ViewState};
