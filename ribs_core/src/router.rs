// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Routers: the navigation half of a RIB.
//!
//! A [`Router`] names the configurations a node can be in and maps each of them to a
//! [`RoutingAction`]. The tree pairs every router with a [`Backstack`] of its configurations
//! and drives both; routers never hold their node, only its [`NodeId`].

use core::any::Any;
use core::fmt;

use ribs_view::ViewId;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::backstack::{Backstack, Operation, Unresolved};
use crate::bundle::{Bundle, KEY_CHILD_NODES};
use crate::error::Result;
use crate::routing::RoutingAction;
use crate::tree::RibTree;
use crate::types::NodeId;

/// Navigation logic of a RIB.
///
/// ```
/// use ribs_core::routing::{self, RoutingAction};
/// use ribs_core::{BuildParams, Result, Rib, RibsError, Router};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
/// enum Screen {
///     Home,
///     Details(u32),
/// }
///
/// struct AppRouter;
///
/// impl Router for AppRouter {
///     type Configuration = Screen;
///
///     fn initial_configuration(&self) -> Screen {
///         Screen::Home
///     }
///
///     fn resolve(&self, configuration: &Screen) -> Result<Box<dyn RoutingAction>> {
///         match configuration {
///             Screen::Home => Ok(routing::attach(|_: BuildParams| Rib::new("Home"))),
///             Screen::Details(0) => Err(RibsError::unresolved::<Self>(configuration)),
///             Screen::Details(_) => Ok(routing::attach(|_: BuildParams| Rib::new("Details"))),
///         }
///     }
/// }
/// ```
pub trait Router: 'static {
    /// Navigation states of this router. Persisted across process recreation.
    type Configuration: Clone + fmt::Debug + Serialize + DeserializeOwned + 'static;

    /// Configuration the backstack starts with when nothing was persisted.
    fn initial_configuration(&self) -> Self::Configuration;

    /// Map a configuration to the action that builds its nodes.
    ///
    /// Configurations the router cannot map are programmer errors: return
    /// [`RibsError::unresolved`](crate::RibsError::unresolved) and the operation that
    /// needed the configuration fails without changing the backstack.
    fn resolve(&self, configuration: &Self::Configuration) -> Result<Box<dyn RoutingAction>>;

    /// Container for the view of a child of class `child_class`.
    ///
    /// `None` attaches the child under the node's own view, or into the node's own
    /// container when the node is headless.
    fn parent_view_for_child(&self, child_class: &str, own_view: Option<ViewId>) -> Option<ViewId> {
        let _ = (child_class, own_view);
        None
    }

    /// Persist router-local state. The key [`KEY_CHILD_NODES`] is reserved for the backstack.
    fn on_save_instance_state(&self, out: &mut Bundle) -> Result<()> {
        let _ = out;
        Ok(())
    }

    /// Restore router-local state before the backstack is restored.
    fn on_restore_instance_state(&mut self, saved: &Bundle) -> Result<()> {
        let _ = saved;
        Ok(())
    }
}

/// Object-safe view of [`Router::parent_view_for_child`].
pub(crate) trait ViewPlacement {
    fn container_for_child(&self, child_class: &str, own_view: Option<ViewId>) -> Option<ViewId>;
}

impl<R: Router> ViewPlacement for R {
    fn container_for_child(&self, child_class: &str, own_view: Option<ViewId>) -> Option<ViewId> {
        self.parent_view_for_child(child_class, own_view)
    }
}

/// A router together with its backstack, behind a type-erased interface the tree can store.
pub(crate) trait ErasedRouter {
    fn type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn placement(&self) -> &dyn ViewPlacement;
    fn dispatch_attach(
        &mut self,
        tree: &mut RibTree,
        node: NodeId,
        saved: Option<&Bundle>,
    ) -> Result<()>;
    fn dispatch_detach(&mut self, tree: &mut RibTree, node: NodeId) -> Result<()>;
    fn save_instance_state(&self, tree: &RibTree, out: &mut Bundle) -> Result<()>;
    fn pop_back_stack(&mut self, tree: &mut RibTree, node: NodeId) -> Result<bool>;
    fn pop(&mut self, tree: &mut RibTree, node: NodeId) -> Result<bool>;
}

pub(crate) struct RouterHost<R: Router> {
    pub(crate) router: R,
    pub(crate) backstack: Backstack<R::Configuration>,
}

impl<R: Router> RouterHost<R> {
    pub(crate) fn new(router: R) -> Self {
        Self {
            router,
            backstack: Backstack::default(),
        }
    }

    pub(crate) fn apply(
        &mut self,
        tree: &mut RibTree,
        node: NodeId,
        operation: Operation<R::Configuration>,
    ) -> Result<bool> {
        self.backstack.apply(tree, node, &self.router, operation)
    }
}

impl<R: Router> ErasedRouter for RouterHost<R> {
    fn type_name(&self) -> &'static str {
        core::any::type_name::<R>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn placement(&self) -> &dyn ViewPlacement {
        &self.router
    }

    fn dispatch_attach(
        &mut self,
        tree: &mut RibTree,
        node: NodeId,
        saved: Option<&Bundle>,
    ) -> Result<()> {
        let mut restored: Option<Vec<Unresolved<R::Configuration>>> = None;
        if let Some(saved) = saved {
            self.router.on_restore_instance_state(saved)?;
            restored = saved.get(KEY_CHILD_NODES)?;
        }
        self.backstack = match restored {
            Some(entries) if !entries.is_empty() => Backstack::from_entries(entries),
            _ => Backstack::new(self.router.initial_configuration()),
        };
        self.backstack.attach(tree, node, &self.router)
    }

    fn dispatch_detach(&mut self, tree: &mut RibTree, node: NodeId) -> Result<()> {
        self.backstack.detach(tree, node)
    }

    fn save_instance_state(&self, tree: &RibTree, out: &mut Bundle) -> Result<()> {
        self.router.on_save_instance_state(out)?;
        out.put(KEY_CHILD_NODES, &self.backstack.save(tree)?)
    }

    fn pop_back_stack(&mut self, tree: &mut RibTree, node: NodeId) -> Result<bool> {
        // Children of the active configuration get the back press first.
        for child in self.backstack.active_nodes() {
            if tree.handle_back_press(child)? {
                return Ok(true);
            }
        }
        self.apply(tree, node, Operation::Pop)
    }

    fn pop(&mut self, tree: &mut RibTree, node: NodeId) -> Result<bool> {
        self.apply(tree, node, Operation::Pop)
    }
}
