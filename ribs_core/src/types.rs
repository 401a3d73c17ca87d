// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public types for the node tree: node identifiers, lifecycle flags and node descriptors.

use crate::bundle::Bundle;

/// Identifier for a node in a [`RibTree`](crate::RibTree).
///
/// A small, copyable, generational handle. Routers, interactors and plugins refer to
/// their node through it instead of holding the node itself.
///
/// - On insert, a fresh slot is allocated with generation `1`.
/// - When a node is detached from its parent it is freed and every `NodeId` pointing at it
///   goes stale; [`RibTree::is_alive`](crate::RibTree::is_alive) then returns false.
/// - On reuse of a freed slot, its generation is incremented, so stale ids never alias
///   a newer node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32, pub(crate) u32);

impl NodeId {
    pub(crate) const fn new(idx: u32, generation: u32) -> Self {
        Self(idx, generation)
    }

    pub(crate) const fn idx(self) -> usize {
        self.0 as usize
    }
}

bitflags::bitflags! {
    /// Lifecycle state of a node.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct LifecycleFlags: u8 {
        /// The node has been dispatched an attach and not yet a detach.
        const ATTACHED      = 0b0000_0001;
        /// The node participates in the view hierarchy (it may still be headless).
        const VIEW_ATTACHED = 0b0000_0010;
        /// The parent wants this node on screen whenever the parent itself is.
        const VIEW_ENABLED  = 0b0000_0100;
        /// Host lifecycle reached `start`.
        const STARTED       = 0b0000_1000;
        /// Host lifecycle reached `resume`.
        const RESUMED       = 0b0001_0000;
    }
}

/// Where the view of a routed node lives.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ViewAttachMode {
    /// Attached into the parent's view hierarchy when the configuration is active.
    #[default]
    Parent,
    /// Attached logically only; its view is managed elsewhere (dialogs, overlays).
    External,
}

/// Handle to a node built by a [`RoutingAction`](crate::RoutingAction).
///
/// Produced by [`RoutingAction::build_nodes`](crate::RoutingAction::build_nodes) and consumed
/// by the backstack. The backstack never looks inside beyond the node it refers to.
#[derive(Clone, Debug)]
pub struct NodeDescriptor {
    pub(crate) node: NodeId,
    pub(crate) view_attach_mode: ViewAttachMode,
    pub(crate) saved: Option<Bundle>,
}

impl NodeDescriptor {
    /// Describe a freshly built, not yet attached node.
    pub fn new(node: NodeId, view_attach_mode: ViewAttachMode) -> Self {
        Self {
            node,
            view_attach_mode,
            saved: None,
        }
    }

    /// Saved state to hand to the node when it is attached.
    #[must_use]
    pub fn with_saved_state(mut self, saved: Option<Bundle>) -> Self {
        self.saved = saved;
        self
    }

    /// The described node.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// How the node's view is attached.
    pub fn view_attach_mode(&self) -> ViewAttachMode {
        self.view_attach_mode
    }
}
