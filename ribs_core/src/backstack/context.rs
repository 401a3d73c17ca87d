// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-entry state of a backstack.
//!
//! An entry starts [`Unresolved`]: a configuration plus whatever its nodes persisted.
//! Resolving it builds and attaches the nodes and yields a [`Resolved`] entry.
//! [`Resolved::shrink`] goes back, dropping the node references only; that is the shape
//! entries are persisted in.

use core::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::backstack::action;
use crate::bundle::Bundle;
use crate::error::Result;
use crate::router::Router;
use crate::routing::RoutingAction;
use crate::tree::RibTree;
use crate::types::{NodeDescriptor, NodeId};

/// How alive the subtree of a backstack entry is.
///
/// Ordered `Inactive < Sleeping < Active`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActivationState {
    /// No nodes, or nodes about to be torn down.
    #[default]
    Inactive,
    /// Nodes attached, views detached.
    Sleeping,
    /// Nodes attached and shown.
    Active,
}

impl ActivationState {
    /// State after putting an entry to sleep. Never increases activation.
    pub fn sleep(self) -> Self {
        match self {
            Self::Inactive => Self::Inactive,
            Self::Sleeping | Self::Active => Self::Sleeping,
        }
    }
}

/// A backstack entry.
#[derive(Debug)]
pub enum ConfigurationContext<C> {
    /// Configuration without nodes.
    Unresolved(Unresolved<C>),
    /// Configuration with live nodes.
    Resolved(Resolved<C>),
}

impl<C> ConfigurationContext<C> {
    /// The entry's configuration.
    pub fn configuration(&self) -> &C {
        match self {
            Self::Unresolved(u) => &u.configuration,
            Self::Resolved(r) => &r.configuration,
        }
    }

    /// The entry's activation state.
    pub fn activation_state(&self) -> ActivationState {
        match self {
            Self::Unresolved(u) => u.activation_state,
            Self::Resolved(r) => r.activation_state,
        }
    }

    /// Returns true if the entry's nodes exist.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Nodes of a resolved entry; empty when unresolved.
    pub fn nodes(&self) -> &[NodeDescriptor] {
        match self {
            Self::Unresolved(_) => &[],
            Self::Resolved(r) => &r.nodes,
        }
    }
}

/// A configuration whose nodes do not exist.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Unresolved<C> {
    /// The configuration.
    pub configuration: C,
    /// Saved state of the configuration's nodes, in build order.
    #[serde(default)]
    pub bundles: Vec<Bundle>,
    /// Activation state to reproduce on resolution.
    #[serde(default)]
    pub activation_state: ActivationState,
}

impl<C: Clone> Unresolved<C> {
    /// A fresh, inactive entry.
    pub fn new(configuration: C) -> Self {
        Self {
            configuration,
            bundles: Vec::new(),
            activation_state: ActivationState::Inactive,
        }
    }

    /// Build the configuration's nodes and attach them under `parent`.
    ///
    /// The result carries the same activation state: an `Active` entry also gets its views
    /// attached, a `Sleeping` one stays off screen. If the router cannot map the
    /// configuration or any node fails to build or attach, nothing stays behind in the tree.
    pub fn resolve<R>(&self, router: &R, tree: &mut RibTree, parent: NodeId) -> Result<Resolved<C>>
    where
        R: Router<Configuration = C>,
    {
        let routing_action = router.resolve(&self.configuration)?;
        let nodes = routing_action.build_nodes(tree, &self.bundles)?;
        let mut resolved = Resolved {
            configuration: self.configuration.clone(),
            bundles: Vec::new(),
            routing_action,
            nodes,
            activation_state: ActivationState::Inactive,
        };
        if let Err(err) = action::add(&mut resolved, tree, parent) {
            warn!(error = %err, "attaching resolved nodes failed, rolling back");
            action::discard(&resolved, tree, parent);
            return Err(err);
        }
        match self.activation_state {
            ActivationState::Active => {
                if let Err(err) = action::activate(&mut resolved, tree, parent, router) {
                    warn!(error = %err, "activating resolved nodes failed, rolling back");
                    action::discard(&resolved, tree, parent);
                    return Err(err);
                }
            }
            ActivationState::Sleeping => resolved.activation_state = ActivationState::Sleeping,
            ActivationState::Inactive => {}
        }
        Ok(resolved)
    }
}

/// A configuration with live nodes.
pub struct Resolved<C> {
    /// The configuration.
    pub configuration: C,
    /// Saved state not yet handed to nodes. Empty once the nodes are attached.
    pub bundles: Vec<Bundle>,
    pub(crate) routing_action: Box<dyn RoutingAction>,
    pub(crate) nodes: Vec<NodeDescriptor>,
    pub(crate) activation_state: ActivationState,
}

impl<C: fmt::Debug> fmt::Debug for Resolved<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolved")
            .field("configuration", &self.configuration)
            .field("bundles", &self.bundles.len())
            .field("nodes", &self.nodes)
            .field("activation_state", &self.activation_state)
            .finish_non_exhaustive()
    }
}

impl<C: Clone> Resolved<C> {
    /// The unresolved form of this entry: same configuration, bundles and activation state,
    /// without node references. Does not touch the nodes themselves.
    pub fn shrink(&self) -> Unresolved<C> {
        Unresolved {
            configuration: self.configuration.clone(),
            bundles: self.bundles.clone(),
            activation_state: self.activation_state,
        }
    }

    /// Current activation state.
    pub fn activation_state(&self) -> ActivationState {
        self.activation_state
    }

    /// The entry's nodes.
    pub fn nodes(&self) -> &[NodeDescriptor] {
        &self.nodes
    }

    /// Persistable form of the entry, carrying its nodes' saved state.
    pub(crate) fn save(&self, tree: &RibTree) -> Result<Unresolved<C>> {
        let mut unresolved = self.shrink();
        unresolved.bundles = self.save_nodes(tree)?;
        Ok(unresolved)
    }

    /// Save every node of the entry, in build order.
    pub(crate) fn save_nodes(&self, tree: &RibTree) -> Result<Vec<Bundle>> {
        self.nodes
            .iter()
            .map(|descriptor| {
                let mut out = Bundle::new();
                tree.save_instance_state(descriptor.node, &mut out)?;
                Ok(out)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RibsError;
    use crate::testing::{Screen, ScreenRouter, attach_host, removed_view, routed_tree};

    #[test]
    fn sleep_never_increases_activation() {
        use ActivationState::*;
        assert_eq!(Active.sleep(), Sleeping);
        assert_eq!(Sleeping.sleep(), Sleeping);
        assert_eq!(Inactive.sleep(), Inactive);
        for state in [Inactive, Sleeping, Active] {
            assert!(state.sleep() <= state);
            assert_eq!(state.sleep().sleep(), state.sleep());
        }
    }

    #[test]
    fn resolve_attaches_nodes_under_parent() {
        let (mut tree, host) = attach_host();
        let router = ScreenRouter::default();
        let resolved = Unresolved::new(Screen::A).resolve(&router, &mut tree, host).unwrap();
        assert_eq!(resolved.activation_state(), ActivationState::Inactive);
        assert_eq!(resolved.nodes().len(), 1);
        let child = resolved.nodes()[0].node();
        assert_eq!(tree.parent(child), Some(host));
        assert_eq!(tree.class(child), Some("A"));
        assert!(tree.children(host).contains(&child));
    }

    #[test]
    fn unmapped_configuration_fails_without_building() {
        let (mut tree, host) = attach_host();
        let before = tree.len();
        let err = Unresolved::new(Screen::Unmapped)
            .resolve(&ScreenRouter::default(), &mut tree, host)
            .unwrap_err();
        assert!(matches!(err, RibsError::UnresolvedConfiguration { .. }), "{err:?}");
        assert_eq!(tree.len(), before);
    }

    #[test]
    fn failed_activation_leaves_nothing_attached() {
        let (mut tree, root, _) = routed_tree(None);
        let router = ScreenRouter::default();
        router.misplace("A", removed_view(&mut tree));
        let children = tree.children(root).to_vec();
        let before = tree.len();

        let entry = Unresolved {
            configuration: Screen::A,
            bundles: Vec::new(),
            activation_state: ActivationState::Active,
        };
        let err = entry.resolve(&router, &mut tree, root).unwrap_err();
        assert!(matches!(err, RibsError::View(_)), "{err:?}");
        assert_eq!(tree.children(root), children);
        assert_eq!(tree.len(), before);
    }

    #[test]
    fn shrink_then_resolve_keeps_activation_state() {
        let (mut tree, host) = attach_host();
        let router = ScreenRouter::default();
        for state in [
            ActivationState::Inactive,
            ActivationState::Sleeping,
            ActivationState::Active,
        ] {
            let entry = Unresolved {
                configuration: Screen::B,
                bundles: Vec::new(),
                activation_state: state,
            };
            let resolved = entry.resolve(&router, &mut tree, host).unwrap();
            assert_eq!(resolved.activation_state(), state);

            let shrunk = resolved.shrink();
            assert_eq!(shrunk, entry);

            action::remove(&mut { resolved }, &mut tree, host).unwrap();
            let again = shrunk.resolve(&router, &mut tree, host).unwrap();
            assert_eq!(again.activation_state(), state);
            action::remove(&mut { again }, &mut tree, host).unwrap();
        }
    }

    #[test]
    fn unresolved_round_trips_through_json() {
        let mut bundle = Bundle::new();
        bundle.put("k", &1).unwrap();
        let entry = Unresolved {
            configuration: Screen::B,
            bundles: vec![bundle],
            activation_state: ActivationState::Sleeping,
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: Unresolved<Screen> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn resolved_debug_skips_action() {
        let (mut tree, host) = attach_host();
        let resolved = Unresolved::new(Screen::A)
            .resolve(&ScreenRouter::default(), &mut tree, host)
            .unwrap();
        let text = format!("{resolved:?}");
        assert!(text.contains("configuration: A"), "{text}");
    }
}
