// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core hierarchy implementation: structure, linking, state save/restore.

use alloc::string::String;
use alloc::vec::Vec;

use crate::types::{LocalView, ViewError, ViewFlags, ViewId, ViewState};

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Retained view hierarchy.
pub struct ViewTree {
    views: Vec<Option<View>>, // slots
    generations: Vec<u32>,    // last generation per slot (persists across frees)
    free_list: Vec<usize>,
}

impl core::fmt::Debug for ViewTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.views.len();
        let alive = self.views.iter().filter(|n| n.is_some()).count();
        let roots = self
            .views
            .iter()
            .flatten()
            .filter(|v| v.local.flags.contains(ViewFlags::ROOT))
            .count();
        f.debug_struct("ViewTree")
            .field("views_total", &total)
            .field("views_alive", &alive)
            .field("roots", &roots)
            .field("free_list", &self.free_list.len())
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
struct View {
    generation: u32,
    parent: Option<ViewId>,
    children: Vec<ViewId>,
    local: LocalView,
    state: Option<String>,
}

impl View {
    fn new(generation: u32, local: LocalView) -> Self {
        Self {
            generation,
            parent: None,
            children: Vec::new(),
            local,
            state: None,
        }
    }
}

impl ViewTree {
    /// Create a new empty hierarchy.
    pub fn new() -> Self {
        Self {
            views: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Create a window root. Views linked below it count as attached.
    pub fn new_root(&mut self, label: impl Into<String>) -> ViewId {
        let local = LocalView {
            key: None,
            flags: ViewFlags::ROOT | ViewFlags::VISIBLE,
            label: Some(label.into()),
        };
        self.insert(None, local)
    }

    /// Insert a new view as a child of `parent` (or unparented if `None`).
    ///
    /// A stale `parent` leaves the new view unparented.
    pub fn insert(&mut self, parent: Option<ViewId>, local: LocalView) -> ViewId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.views[idx] = Some(View::new(generation, local));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ViewId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.views.push(Some(View::new(generation, local)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "ViewId uses 32-bit indices by design."
            )]
            ((self.views.len() - 1) as u32, generation)
        };
        let id = ViewId::new(idx, generation);
        if let Some(p) = parent.filter(|p| self.is_alive(*p)) {
            self.link_parent(id, p);
        }
        id
    }

    /// Link an unparented `view` as the last child of `container`.
    pub fn add_view(&mut self, container: ViewId, view: ViewId) -> Result<(), ViewError> {
        if !self.is_alive(container) {
            return Err(ViewError::Stale(container));
        }
        if !self.is_alive(view) {
            return Err(ViewError::Stale(view));
        }
        if let Some(parent) = self.view(view).parent {
            return Err(ViewError::AlreadyParented { view, parent });
        }
        if self.path_to_root(container).contains(&view) {
            return Err(ViewError::Cycle { view });
        }
        self.link_parent(view, container);
        Ok(())
    }

    /// Remove a view (and its subtree) from the hierarchy.
    pub fn remove(&mut self, id: ViewId) {
        if !self.is_alive(id) {
            return;
        }
        if let Some(parent) = self.view(id).parent {
            self.unlink_parent(id, parent);
        }
        let children = self.view(id).children.clone();
        for child in children {
            self.remove(child);
        }
        self.views[id.idx()] = None;
        self.free_list.push(id.idx());
    }

    /// Reparent `id` under `new_parent`, or unparent it with `None`.
    pub fn reparent(&mut self, id: ViewId, new_parent: Option<ViewId>) -> Result<(), ViewError> {
        if !self.is_alive(id) {
            return Err(ViewError::Stale(id));
        }
        if let Some(p) = new_parent {
            if !self.is_alive(p) {
                return Err(ViewError::Stale(p));
            }
            if self.path_to_root(p).contains(&id) {
                return Err(ViewError::Cycle { view: id });
            }
        }
        if let Some(parent) = self.view(id).parent {
            self.unlink_parent(id, parent);
        }
        if let Some(p) = new_parent {
            self.link_parent(id, p);
        }
        Ok(())
    }

    /// Returns true if `id` refers to a live view.
    ///
    /// A `ViewId` is live if its slot exists and its generation matches
    /// the current generation stored in that slot.
    pub fn is_alive(&self, id: ViewId) -> bool {
        self.views
            .get(id.idx())
            .and_then(|n| n.as_ref())
            .map(|n| n.generation == id.1)
            .unwrap_or(false)
    }

    /// Number of live views.
    pub fn len(&self) -> usize {
        self.views.iter().filter(|v| v.is_some()).count()
    }

    /// Returns true if the hierarchy holds no live views.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parent of a live view.
    pub fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.view_opt(id).and_then(|v| v.parent)
    }

    /// Children of a live view in insertion order; empty for stale ids.
    pub fn children(&self, id: ViewId) -> &[ViewId] {
        self.view_opt(id).map(|v| v.children.as_slice()).unwrap_or(&[])
    }

    /// Local data of a live view.
    pub fn local(&self, id: ViewId) -> Option<&LocalView> {
        self.view_opt(id).map(|v| &v.local)
    }

    /// Update flags of a live view.
    pub fn set_flags(&mut self, id: ViewId, flags: ViewFlags) {
        if let Some(v) = self.view_opt_mut(id) {
            v.local.flags = flags;
        }
    }

    /// Returns true if the parent chain of `id` reaches a [`ViewFlags::ROOT`] view.
    pub fn is_attached_to_root(&self, id: ViewId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.path_to_root(id)
            .first()
            .is_some_and(|top| self.view(*top).local.flags.contains(ViewFlags::ROOT))
    }

    /// Path from the topmost ancestor to `id` (inclusive); empty for stale ids.
    pub fn path_to_root(&self, mut id: ViewId) -> Vec<ViewId> {
        let mut out = Vec::new();
        if !self.is_alive(id) {
            return out;
        }
        loop {
            out.push(id);
            match self.view(id).parent {
                Some(p) => id = p,
                None => break,
            }
        }
        out.reverse();
        out
    }

    /// Set (or clear) the savable state of a view.
    pub fn set_state(&mut self, id: ViewId, state: Option<String>) {
        if let Some(v) = self.view_opt_mut(id) {
            v.state = state;
        }
    }

    /// Current savable state of a view.
    pub fn state(&self, id: ViewId) -> Option<&str> {
        self.view_opt(id).and_then(|v| v.state.as_deref())
    }

    /// Collect the state of every keyed, save-enabled view in the subtree of `id`.
    pub fn save_hierarchy_state(&self, id: ViewId) -> ViewState {
        let mut out = ViewState::new();
        self.walk(id, &mut |view| {
            if !view.local.flags.contains(ViewFlags::SAVE_ENABLED) {
                return;
            }
            if let (Some(key), Some(state)) = (view.local.key, view.state.as_ref()) {
                out.insert(key, state.clone());
            }
        });
        out
    }

    /// Write saved state back into keyed, save-enabled views in the subtree of `id`.
    pub fn restore_hierarchy_state(&mut self, id: ViewId, state: &ViewState) {
        if state.is_empty() {
            return;
        }
        let mut stack = Vec::from([id]);
        while let Some(next) = stack.pop() {
            let Some(view) = self.view_opt_mut(next) else {
                continue;
            };
            if view.local.flags.contains(ViewFlags::SAVE_ENABLED) {
                if let Some(saved) = view.local.key.and_then(|k| state.get(k)) {
                    view.state = Some(String::from(saved));
                }
            }
            stack.extend(view.children.iter().rev().copied());
        }
    }

    // --- internals ---

    fn walk(&self, id: ViewId, f: &mut impl FnMut(&View)) {
        let Some(view) = self.view_opt(id) else {
            return;
        };
        f(view);
        for child in &view.children {
            self.walk(*child, f);
        }
    }

    /// Access a view; panics if `id` is stale.
    fn view(&self, id: ViewId) -> &View {
        self.views[id.idx()].as_ref().expect("dangling ViewId")
    }

    fn view_mut(&mut self, id: ViewId) -> &mut View {
        self.views[id.idx()].as_mut().expect("dangling ViewId")
    }

    fn view_opt(&self, id: ViewId) -> Option<&View> {
        let v = self.views.get(id.idx())?.as_ref()?;
        (v.generation == id.1).then_some(v)
    }

    fn view_opt_mut(&mut self, id: ViewId) -> Option<&mut View> {
        let v = self.views.get_mut(id.idx())?.as_mut()?;
        if v.generation != id.1 {
            return None;
        }
        Some(v)
    }

    fn link_parent(&mut self, id: ViewId, parent: ViewId) {
        self.view_mut(parent).children.push(id);
        self.view_mut(id).parent = Some(parent);
    }

    fn unlink_parent(&mut self, id: ViewId, parent: ViewId) {
        self.view_mut(parent).children.retain(|c| *c != id);
        self.view_mut(id).parent = None;
    }
}
