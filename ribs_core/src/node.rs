// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The parts a RIB is made of: interactor, view factory, plugins, and the [`Rib`] recipe
//! a builder hands to the tree.

use core::fmt;

use ribs_view::{ViewId, ViewTree};

use crate::bundle::Bundle;
use crate::error::Result;
use crate::router::{ErasedRouter, Router, RouterHost};
use crate::types::NodeId;

/// Feature logic of a RIB.
///
/// Every method has a no-op default. The tree calls them on the lifecycle thread:
///
/// - [`Interactor::on_attach`] after the node's router has restored its backstack,
/// - [`Interactor::on_detach`] before the router tears its backstack down,
/// - [`Interactor::on_view_created`] / [`Interactor::on_view_destroyed`] as the node's view
///   enters and leaves the view hierarchy.
pub trait Interactor: 'static {
    /// The node was attached. `saved` is this interactor's sub-bundle, if any was persisted.
    fn on_attach(&mut self, saved: Option<&Bundle>) -> Result<()> {
        let _ = saved;
        Ok(())
    }

    /// The node is being detached.
    fn on_detach(&mut self) {}

    /// Persist interactor-local state into its private sub-bundle.
    fn on_save_instance_state(&self, out: &mut Bundle) -> Result<()> {
        let _ = out;
        Ok(())
    }

    /// The node's view now exists and is linked into the hierarchy.
    fn on_view_created(&mut self, views: &mut ViewTree, view: ViewId) {
        let _ = (views, view);
    }

    /// The node's view was removed from the hierarchy.
    fn on_view_destroyed(&mut self) {}

    /// Back press that neither navigation nor children handled.
    fn handle_back_press(&mut self) -> bool {
        false
    }

    /// Host lifecycle: started.
    fn on_start(&mut self) {}

    /// Host lifecycle: stopped.
    fn on_stop(&mut self) {}

    /// Host lifecycle: resumed.
    fn on_resume(&mut self) {}

    /// Host lifecycle: paused.
    fn on_pause(&mut self) {}
}

impl Interactor for () {}

/// Observer of a node's lifecycle, for cross-cutting concerns.
pub trait Plugin: 'static {
    /// The node is about to restore its router and interactor.
    fn on_attach(&mut self, node: NodeId) {
        let _ = node;
    }

    /// The node's router and interactor were torn down; remaining children follow.
    fn on_detach(&mut self, node: NodeId) {
        let _ = node;
    }

    /// The node joined the view hierarchy. `view` is `None` for headless nodes.
    fn on_attach_to_view(&mut self, node: NodeId, view: Option<ViewId>) {
        let _ = (node, view);
    }

    /// The node left the view hierarchy.
    fn on_detach_from_view(&mut self, node: NodeId) {
        let _ = node;
    }

    /// A child was linked under the node, right before the child is attached.
    fn on_child_attached(&mut self, node: NodeId, child: NodeId) {
        let _ = (node, child);
    }

    /// A child was unlinked from the node, right before the child is detached.
    fn on_child_detached(&mut self, node: NodeId, child: NodeId) {
        let _ = (node, child);
    }
}

/// Creates the concrete view of a node.
///
/// The returned view must be unparented; the node links it into its container.
pub trait ViewFactory: 'static {
    /// Create the view.
    fn create(&self, views: &mut ViewTree) -> ViewId;
}

impl<F> ViewFactory for F
where
    F: Fn(&mut ViewTree) -> ViewId + 'static,
{
    fn create(&self, views: &mut ViewTree) -> ViewId {
        self(views)
    }
}

/// Input of a [`Builder`].
#[derive(Clone, Debug, Default)]
pub struct BuildParams {
    /// State persisted by a previous instance of the node being built.
    pub saved_instance_state: Option<Bundle>,
}

/// Produces the [`Rib`] for a child node.
pub trait Builder: 'static {
    /// Build the recipe.
    fn build(&self, params: BuildParams) -> Rib;
}

impl<F> Builder for F
where
    F: Fn(BuildParams) -> Rib + 'static,
{
    fn build(&self, params: BuildParams) -> Rib {
        self(params)
    }
}

/// Everything needed to create a node: its class name, interactor, and optionally a router,
/// a view factory and plugins.
///
/// ```
/// use ribs_core::{Rib, RibTree};
///
/// let mut tree = RibTree::new();
/// let root = tree.attach_root(Rib::new("Root"), None).unwrap();
/// assert_eq!(tree.class(root), Some("Root"));
/// ```
pub struct Rib {
    pub(crate) class: &'static str,
    pub(crate) interactor: Box<dyn Interactor>,
    pub(crate) router: Option<Box<dyn ErasedRouter>>,
    pub(crate) view_factory: Option<Box<dyn ViewFactory>>,
    pub(crate) plugins: Vec<Box<dyn Plugin>>,
}

impl fmt::Debug for Rib {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rib")
            .field("class", &self.class)
            .field("router", &self.router.as_ref().map(|r| r.type_name()))
            .field("has_view", &self.view_factory.is_some())
            .field("plugins", &self.plugins.len())
            .finish_non_exhaustive()
    }
}

impl Rib {
    /// A headless, routerless RIB with a no-op interactor.
    pub fn new(class: &'static str) -> Self {
        Self {
            class,
            interactor: Box::new(()),
            router: None,
            view_factory: None,
            plugins: Vec::new(),
        }
    }

    /// Use `interactor` for feature logic.
    #[must_use]
    pub fn with_interactor(mut self, interactor: impl Interactor) -> Self {
        self.interactor = Box::new(interactor);
        self
    }

    /// Route children through `router`.
    #[must_use]
    pub fn with_router<R: Router>(mut self, router: R) -> Self {
        self.router = Some(Box::new(RouterHost::new(router)));
        self
    }

    /// Give the node a view.
    #[must_use]
    pub fn with_view(mut self, factory: impl ViewFactory) -> Self {
        self.view_factory = Some(Box::new(factory));
        self
    }

    /// Observe the node's lifecycle with `plugin`.
    #[must_use]
    pub fn with_plugin(mut self, plugin: impl Plugin) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Class name of the RIB.
    pub fn class(&self) -> &'static str {
        self.class
    }
}
