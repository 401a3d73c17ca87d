// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Owned, immutable copies of the tree structure for off-thread observers.

use std::collections::HashMap;

use ribs_view::ViewId;

use crate::types::{LifecycleFlags, NodeId};

/// One node of a [`TreeSnapshot`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSnapshot {
    /// Id of the node at capture time.
    pub id: NodeId,
    /// Class name.
    pub class: &'static str,
    /// Unique instance tag.
    pub tag: String,
    /// Rib id, once attached.
    pub rib_id: Option<u32>,
    /// Parent node.
    pub parent: Option<NodeId>,
    /// Children in attach order.
    pub children: Vec<NodeId>,
    /// Lifecycle flags.
    pub flags: LifecycleFlags,
    /// The node's view, if it was on screen.
    pub view: Option<ViewId>,
}

/// Structure of a [`RibTree`](crate::RibTree) at one point in time.
///
/// `Send` and `Sync`; iterate it on any thread. It never changes after capture.
#[derive(Clone, Debug, Default)]
pub struct TreeSnapshot {
    nodes: Vec<NodeSnapshot>,
    by_id: HashMap<NodeId, usize>,
}

impl TreeSnapshot {
    pub(crate) fn new(nodes: Vec<NodeSnapshot>) -> Self {
        let by_id = nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
        Self { nodes, by_id }
    }

    /// Number of captured nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree was empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Captured node by id.
    pub fn get(&self, id: NodeId) -> Option<&NodeSnapshot> {
        self.by_id.get(&id).map(|&i| &self.nodes[i])
    }

    /// Every captured node, in slot order.
    pub fn nodes(&self) -> &[NodeSnapshot] {
        &self.nodes
    }

    /// Nodes without a parent.
    pub fn roots(&self) -> impl Iterator<Item = &NodeSnapshot> {
        self.nodes.iter().filter(|n| n.parent.is_none())
    }

    /// Pre-order walk of the subtree under `root`, children in attach order.
    pub fn depth_first(&self, root: NodeId) -> impl Iterator<Item = &NodeSnapshot> {
        let mut stack = vec![root];
        core::iter::from_fn(move || {
            loop {
                let id = stack.pop()?;
                if let Some(node) = self.get(id) {
                    stack.extend(node.children.iter().rev());
                    return Some(node);
                }
            }
        })
    }
}
