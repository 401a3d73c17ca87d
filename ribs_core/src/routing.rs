// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Routing actions: what a configuration turns into.
//!
//! A [`Router`](crate::Router) maps each of its configurations to a [`RoutingAction`].
//! The backstack asks the action to build its nodes once, when the configuration is
//! resolved, and notifies it whenever the configuration becomes active or goes to sleep.
//!
//! Ready-made actions cover the common cases:
//!
//! - [`noop`]: the configuration has no nodes (an empty screen, a "nothing selected" state).
//! - [`attach`]: one child RIB shown inside the parent's view.
//! - [`attach_external`]: one child RIB whose view lives outside the parent's hierarchy.
//! - [`composite`]: several actions at once.
//! - [`invoke`]: a side effect every time the configuration becomes active.

use core::fmt;

use tracing::warn;

use crate::bundle::Bundle;
use crate::error::Result;
use crate::node::{BuildParams, Builder};
use crate::tree::RibTree;
use crate::types::{NodeDescriptor, ViewAttachMode};

/// Strategy turning a configuration into nodes and reacting to its activation.
pub trait RoutingAction: 'static {
    /// Build (but do not attach) the nodes for this configuration.
    ///
    /// `bundles` holds the saved state of the nodes built by a previous resolution of the
    /// same configuration, in build order; it is empty on first resolution.
    /// On error, implementations discard whatever they already built.
    fn build_nodes(&self, tree: &mut RibTree, bundles: &[Bundle]) -> Result<Vec<NodeDescriptor>> {
        let _ = (tree, bundles);
        Ok(Vec::new())
    }

    /// The configuration became active; its nodes' views are attached.
    fn execute(&self) {}

    /// The configuration is going to sleep or away; its nodes' views are about to be detached.
    fn cleanup(&self) {}
}

/// Action without nodes.
pub fn noop() -> Box<dyn RoutingAction> {
    Box::new(Noop)
}

/// Action building one child RIB whose view is attached inside the parent.
pub fn attach(builder: impl Builder) -> Box<dyn RoutingAction> {
    Box::new(AttachRib {
        builder: Box::new(builder),
        mode: ViewAttachMode::Parent,
    })
}

/// Action building one child RIB whose view is managed outside the parent's hierarchy.
pub fn attach_external(builder: impl Builder) -> Box<dyn RoutingAction> {
    Box::new(AttachRib {
        builder: Box::new(builder),
        mode: ViewAttachMode::External,
    })
}

/// Action combining several actions; nodes are built and attached in order.
pub fn composite(actions: Vec<Box<dyn RoutingAction>>) -> Box<dyn RoutingAction> {
    Box::new(Composite { actions })
}

/// Action running `f` every time the configuration becomes active.
pub fn invoke(f: impl Fn() + 'static) -> Box<dyn RoutingAction> {
    Box::new(Invoke { f: Box::new(f) })
}

#[derive(Debug)]
struct Noop;

impl RoutingAction for Noop {}

struct AttachRib {
    builder: Box<dyn Builder>,
    mode: ViewAttachMode,
}

impl fmt::Debug for AttachRib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachRib")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl RoutingAction for AttachRib {
    fn build_nodes(&self, tree: &mut RibTree, bundles: &[Bundle]) -> Result<Vec<NodeDescriptor>> {
        let saved = bundles.first().cloned();
        let rib = self.builder.build(BuildParams {
            saved_instance_state: saved.clone(),
        });
        let node = tree.insert(rib);
        Ok(vec![NodeDescriptor::new(node, self.mode).with_saved_state(saved)])
    }
}

struct Composite {
    actions: Vec<Box<dyn RoutingAction>>,
}

impl RoutingAction for Composite {
    fn build_nodes(&self, tree: &mut RibTree, bundles: &[Bundle]) -> Result<Vec<NodeDescriptor>> {
        let mut built: Vec<NodeDescriptor> = Vec::new();
        for action in &self.actions {
            let rest = bundles.get(built.len()..).unwrap_or(&[]);
            match action.build_nodes(tree, rest) {
                Ok(nodes) => built.extend(nodes),
                Err(err) => {
                    warn!(
                        built = built.len(),
                        error = %err,
                        "composite build failed, discarding nodes"
                    );
                    for descriptor in &built {
                        if let Err(discard) = tree.discard(descriptor.node) {
                            warn!(
                                node = ?descriptor.node,
                                error = %discard,
                                "could not discard built node"
                            );
                        }
                    }
                    return Err(err);
                }
            }
        }
        Ok(built)
    }

    fn execute(&self) {
        for action in &self.actions {
            action.execute();
        }
    }

    fn cleanup(&self) {
        for action in self.actions.iter().rev() {
            action.cleanup();
        }
    }
}

struct Invoke {
    f: Box<dyn Fn()>,
}

impl RoutingAction for Invoke {
    fn execute(&self) {
        (self.f)();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RibsError;
    use crate::node::Rib;
    use crate::types::NodeId;
    use std::cell::Cell;
    use std::rc::Rc;
    use tracing_test::traced_test;

    struct Failing;

    /// Builds a node that is already somebody's child, so it cannot be discarded.
    struct Adopted(NodeId);

    impl RoutingAction for Adopted {
        fn build_nodes(&self, tree: &mut RibTree, _: &[Bundle]) -> Result<Vec<NodeDescriptor>> {
            let node = tree.insert(Rib::new("Adopted"));
            tree.attach_child(self.0, node, None)?;
            Ok(vec![NodeDescriptor::new(node, ViewAttachMode::Parent)])
        }
    }

    impl RoutingAction for Failing {
        fn build_nodes(&self, _: &mut RibTree, _: &[Bundle]) -> Result<Vec<NodeDescriptor>> {
            Err(RibsError::unresolved::<Self>(&"broken"))
        }
    }

    #[test]
    fn attach_builds_one_detached_node() {
        let mut tree = RibTree::new();
        let nodes = attach(|_: BuildParams| Rib::new("Child"))
            .build_nodes(&mut tree, &[])
            .unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].view_attach_mode(), ViewAttachMode::Parent);
        assert_eq!(tree.class(nodes[0].node()), Some("Child"));
        assert_eq!(tree.parent(nodes[0].node()), None);
    }

    #[test]
    fn composite_hands_each_action_its_bundles() {
        let mut tree = RibTree::new();
        let mut first = Bundle::new();
        first.put("n", &1).unwrap();
        let mut second = Bundle::new();
        second.put("n", &2).unwrap();

        let seen = Rc::new(Cell::new(0));
        let seen_in_builder = Rc::clone(&seen);
        let action = composite(vec![
            attach(|_: BuildParams| Rib::new("A")),
            attach_external(move |params: BuildParams| {
                let n: i32 = params
                    .saved_instance_state
                    .and_then(|b| b.get("n").unwrap())
                    .unwrap_or_default();
                seen_in_builder.set(n);
                Rib::new("B")
            }),
        ]);
        let nodes = action.build_nodes(&mut tree, &[first, second]).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].view_attach_mode(), ViewAttachMode::External);
        assert_eq!(seen.get(), 2);
    }

    #[test]
    fn composite_failure_discards_built_nodes() {
        let mut tree = RibTree::new();
        let action = composite(vec![
            attach(|_: BuildParams| Rib::new("A")),
            Box::new(Failing) as Box<dyn RoutingAction>,
        ]);
        let err = action.build_nodes(&mut tree, &[]).unwrap_err();
        assert!(matches!(err, RibsError::UnresolvedConfiguration { .. }));
        assert_eq!(tree.len(), 0, "half-built node must not linger");
    }

    #[traced_test]
    #[test]
    fn composite_failure_keeps_build_error() {
        let mut tree = RibTree::new();
        let host = tree.attach_root(Rib::new("Host"), None).unwrap();
        let action = composite(vec![
            Box::new(Adopted(host)) as Box<dyn RoutingAction>,
            attach(|_: BuildParams| Rib::new("B")),
            Box::new(Failing),
        ]);
        let err = action.build_nodes(&mut tree, &[]).unwrap_err();
        assert!(matches!(err, RibsError::UnresolvedConfiguration { .. }), "{err:?}");
        // Host and the adopted child remain; the free node was still discarded.
        assert_eq!(tree.len(), 2);
        assert!(logs_contain("could not discard built node"));
    }

    #[test]
    fn invoke_runs_on_execute_only() {
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let action = invoke(move || counter.set(counter.get() + 1));
        action.cleanup();
        assert_eq!(hits.get(), 0);
        action.execute();
        action.execute();
        assert_eq!(hits.get(), 2);
    }
}
