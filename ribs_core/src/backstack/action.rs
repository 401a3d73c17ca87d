// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Activation transitions of a resolved entry.

use tracing::{trace, warn};

use crate::backstack::{ActivationState, Resolved};
use crate::error::Result;
use crate::router::ViewPlacement;
use crate::tree::RibTree;
use crate::types::{NodeId, ViewAttachMode};

/// Attach the entry's nodes as children of `parent`, handing each its saved state.
pub(super) fn add<C>(resolved: &mut Resolved<C>, tree: &mut RibTree, parent: NodeId) -> Result<()> {
    for descriptor in &mut resolved.nodes {
        let saved = descriptor.saved.take();
        tree.attach_child(parent, descriptor.node, saved.as_ref())?;
    }
    Ok(())
}

/// Best-effort rollback of a partially added entry.
pub(super) fn discard<C>(resolved: &Resolved<C>, tree: &mut RibTree, parent: NodeId) {
    for descriptor in resolved.nodes.iter().rev() {
        let node = descriptor.node;
        if !tree.is_alive(node) {
            continue;
        }
        let outcome = if tree.parent(node) == Some(parent) {
            tree.detach_child(parent, node)
        } else {
            tree.discard(node)
        };
        if let Err(err) = outcome {
            warn!(?node, error = %err, "rollback could not release node");
        }
    }
}

/// Show the entry: enable the views of its in-parent nodes, then run the action.
pub(super) fn activate<C>(
    resolved: &mut Resolved<C>,
    tree: &mut RibTree,
    parent: NodeId,
    placement: &dyn ViewPlacement,
) -> Result<()> {
    if resolved.activation_state == ActivationState::Active {
        return Ok(());
    }
    for descriptor in &resolved.nodes {
        if descriptor.view_attach_mode == ViewAttachMode::Parent {
            tree.activate_child(parent, descriptor.node, Some(placement))?;
        }
    }
    resolved.routing_action.execute();
    trace!(from = ?resolved.activation_state, to = ?ActivationState::Active, "entry activated");
    resolved.activation_state = ActivationState::Active;
    Ok(())
}

/// Undo a failed [`activate`]: every in-parent node leaves the screen again. Best-effort.
pub(super) fn withdraw<C>(resolved: &Resolved<C>, tree: &mut RibTree, parent: NodeId) {
    for descriptor in resolved.nodes.iter().rev() {
        let node = descriptor.node;
        if descriptor.view_attach_mode != ViewAttachMode::Parent || !tree.is_alive(node) {
            continue;
        }
        if let Err(err) = tree.deactivate_child(parent, node) {
            warn!(?node, error = %err, "rollback could not take node off screen");
        }
    }
}

/// Take the entry off screen, keeping its nodes. No-op unless active.
pub(super) fn sleep<C>(resolved: &mut Resolved<C>, tree: &mut RibTree, parent: NodeId) -> Result<()> {
    if resolved.activation_state != ActivationState::Active {
        return Ok(());
    }
    resolved.routing_action.cleanup();
    for descriptor in resolved.nodes.iter().rev() {
        if descriptor.view_attach_mode == ViewAttachMode::Parent {
            tree.deactivate_child(parent, descriptor.node)?;
        }
    }
    resolved.activation_state = resolved.activation_state.sleep();
    trace!(to = ?resolved.activation_state, "entry put to sleep");
    Ok(())
}

/// Tear the entry down: off screen first, then detach its nodes in reverse build order.
pub(super) fn remove<C>(resolved: &mut Resolved<C>, tree: &mut RibTree, parent: NodeId) -> Result<()> {
    sleep(resolved, tree, parent)?;
    for descriptor in resolved.nodes.iter().rev() {
        if tree.is_alive(descriptor.node) {
            tree.detach_child(parent, descriptor.node)?;
        }
    }
    resolved.activation_state = ActivationState::Inactive;
    Ok(())
}
