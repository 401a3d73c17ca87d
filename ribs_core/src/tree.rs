// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core node tree: structure, attach/detach protocol, views, save/restore, navigation.

use ribs_view::{ViewId, ViewState, ViewTree};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backstack::{Backstack, Operation};
use crate::bundle::{Bundle, KEY_INTERACTOR, KEY_RIB_ID, KEY_ROUTER, KEY_VIEW_STATE};
use crate::config::RibsConfig;
use crate::error::{Result, RibsError};
use crate::node::{Interactor, Plugin, Rib, ViewFactory};
use crate::request_code::RequestCodeRegistry;
use crate::router::{ErasedRouter, Router, RouterHost, ViewPlacement};
use crate::snapshot::{NodeSnapshot, TreeSnapshot};
use crate::types::{LifecycleFlags, NodeId};

impl Default for RibTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Arena of RIB nodes plus the view hierarchy they render into.
///
/// All mutation goes through `&mut RibTree`. The tree owns trait objects that are not
/// `Send`, so it stays on the thread that created it; hand a [`TreeSnapshot`] to other
/// threads instead.
pub struct RibTree {
    nodes: Vec<Option<NodeSlot>>, // slots
    generations: Vec<u32>,        // last generation per slot (persists across frees)
    free_list: Vec<usize>,
    views: ViewTree,
    request_codes: RequestCodeRegistry,
    config: RibsConfig,
}

impl core::fmt::Debug for RibTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("RibTree")
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_list", &self.free_list.len())
            .field("views", &self.views)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

enum RouterCell {
    Absent,
    Idle(Box<dyn ErasedRouter>),
    /// Taken out for the duration of an operation on it.
    Busy,
}

struct NodeSlot {
    generation: u32,
    class: &'static str,
    tag: String,
    rib_id: Option<u32>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    flags: LifecycleFlags,
    view_factory: Option<Box<dyn ViewFactory>>,
    view: Option<ViewId>,
    parent_container: Option<ViewId>,
    saved_view_state: Option<ViewState>,
    router: RouterCell,
    interactor: Box<dyn Interactor>,
    plugins: Vec<Box<dyn Plugin>>,
}

impl NodeSlot {
    fn new(generation: u32, rib: Rib) -> Self {
        let Rib {
            class,
            interactor,
            router,
            view_factory,
            plugins,
        } = rib;
        Self {
            generation,
            class,
            tag: format!("{class}.{}", Uuid::new_v4()),
            rib_id: None,
            parent: None,
            children: Vec::new(),
            flags: LifecycleFlags::empty(),
            view_factory,
            view: None,
            parent_container: None,
            saved_view_state: None,
            router: router.map_or(RouterCell::Absent, RouterCell::Idle),
            interactor,
            plugins,
        }
    }
}

impl RibTree {
    /// Create an empty tree with the default configuration.
    pub fn new() -> Self {
        let config = RibsConfig::default();
        Self {
            nodes: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            views: ViewTree::new(),
            request_codes: RequestCodeRegistry::new(config.request_code_bits),
            config,
        }
    }

    /// Create an empty tree with a validated configuration.
    pub fn with_config(config: RibsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            request_codes: RequestCodeRegistry::new(config.request_code_bits),
            config,
            ..Self::new()
        })
    }

    /// Tree configuration.
    pub fn config(&self) -> &RibsConfig {
        &self.config
    }

    /// The view hierarchy nodes attach their views into.
    pub fn views(&self) -> &ViewTree {
        &self.views
    }

    /// Mutable access to the view hierarchy, e.g. to create window roots.
    pub fn views_mut(&mut self) -> &mut ViewTree {
        &mut self.views
    }

    /// Rib id and request code allocator of this tree.
    pub fn request_codes(&self) -> &RequestCodeRegistry {
        &self.request_codes
    }

    // --- structure ---

    /// Build a node from `rib` without attaching it.
    ///
    /// Routing actions call this from [`RoutingAction::build_nodes`](crate::RoutingAction::build_nodes);
    /// the backstack attaches the node afterwards.
    pub fn insert(&mut self, rib: Rib) -> NodeId {
        let (idx, generation) = if let Some(idx) = self.free_list.pop() {
            let generation = self.generations[idx].saturating_add(1);
            self.generations[idx] = generation;
            self.nodes[idx] = Some(NodeSlot::new(generation, rib));
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            (idx as u32, generation)
        } else {
            let generation = 1_u32;
            self.nodes.push(Some(NodeSlot::new(generation, rib)));
            self.generations.push(generation);
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            ((self.nodes.len() - 1) as u32, generation)
        };
        NodeId::new(idx, generation)
    }

    /// Drop a node that was built but never attached.
    pub fn discard(&mut self, node: NodeId) -> Result<()> {
        let slot = self.slot(node)?;
        if slot.parent.is_some() || slot.flags.contains(LifecycleFlags::ATTACHED) {
            return Err(RibsError::AlreadyAttached(node));
        }
        self.free_slot(node);
        Ok(())
    }

    /// Build and attach a root node, restoring it from `saved` if given.
    pub fn attach_root(&mut self, rib: Rib, saved: Option<&Bundle>) -> Result<NodeId> {
        let root = self.insert(rib);
        if let Err(err) = self.dispatch_attach(root, saved) {
            self.abandon(root);
            return Err(err);
        }
        self.breadcrumb("ATTACHED", root);
        Ok(root)
    }

    /// Tear down a root node and its whole subtree.
    ///
    /// Fails with [`RibsError::AlreadyAttached`] if `root` is somebody's child.
    pub fn detach_root(&mut self, root: NodeId) -> Result<()> {
        let slot = self.slot(root)?;
        if slot.parent.is_some() {
            return Err(RibsError::AlreadyAttached(root));
        }
        if slot.flags.contains(LifecycleFlags::VIEW_ATTACHED) {
            self.detach_view_inner(root)?;
        }
        self.breadcrumb("DETACHED", root);
        self.dispatch_detach(root)?;
        self.free_slot(root);
        Ok(())
    }

    /// Link an inserted node under `parent` and dispatch its attach.
    ///
    /// The child is brought up to the parent's started/resumed state. Its view is not
    /// attached; see [`RibTree::attach_child_view`].
    pub fn attach_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        saved: Option<&Bundle>,
    ) -> Result<()> {
        let parent_flags = self.slot(parent)?.flags;
        if !parent_flags.contains(LifecycleFlags::ATTACHED) {
            return Err(RibsError::NotAttached(parent));
        }
        let slot = self.slot(child)?;
        if child == parent
            || slot.parent.is_some()
            || slot.flags.contains(LifecycleFlags::ATTACHED)
        {
            return Err(RibsError::AlreadyAttached(child));
        }
        self.slot_mut(parent)?.children.push(child);
        self.slot_mut(child)?.parent = Some(parent);
        self.notify_plugins(parent, |p| p.on_child_attached(parent, child));
        if let Err(err) = self.dispatch_attach(child, saved) {
            self.unlink(parent, child);
            self.abandon(child);
            return Err(err);
        }
        self.breadcrumb("ATTACHED", child);
        if parent_flags.contains(LifecycleFlags::STARTED) {
            self.on_start(child)?;
        }
        if parent_flags.contains(LifecycleFlags::RESUMED) {
            self.on_resume(child)?;
        }
        Ok(())
    }

    /// Detach `child` from `parent`: its view first, then its subtree. The child's id goes
    /// stale.
    pub fn detach_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.slot(parent)?;
        let slot = self.slot(child)?;
        if slot.parent != Some(parent) {
            return Err(RibsError::NotAChild { parent, child });
        }
        if slot.flags.contains(LifecycleFlags::VIEW_ATTACHED) {
            self.detach_view_inner(child)?;
        }
        self.notify_plugins(parent, |p| p.on_child_detached(parent, child));
        self.breadcrumb("DETACHED", child);
        self.unlink(parent, child);
        self.dispatch_detach(child)?;
        self.free_slot(child);
        Ok(())
    }

    // --- attach/detach protocol ---

    fn dispatch_attach(&mut self, node: NodeId, saved: Option<&Bundle>) -> Result<()> {
        let slot = self.slot(node)?;
        if slot.flags.contains(LifecycleFlags::ATTACHED) {
            return Err(RibsError::AlreadyAttached(node));
        }
        let tag = slot.tag.clone();
        let restored_id = saved
            .map(|s| s.get::<u32>(KEY_RIB_ID))
            .transpose()?
            .flatten();
        let rib_id = match restored_id {
            Some(id) => {
                self.request_codes.reserve(&tag, id);
                id
            }
            None => self.request_codes.generate_group_id(&tag)?,
        };
        let view_state = saved
            .map(|s| s.get::<ViewState>(KEY_VIEW_STATE))
            .transpose()?
            .flatten();

        let slot = self.slot_mut(node)?;
        slot.rib_id = Some(rib_id);
        slot.saved_view_state = view_state;
        slot.flags.insert(LifecycleFlags::ATTACHED);
        self.notify_plugins(node, |p| p.on_attach(node));

        if let Some(mut router) = self.take_router(node)? {
            let router_state = saved.and_then(|s| s.bundle(KEY_ROUTER));
            let attached = router.dispatch_attach(self, node, router_state.as_ref());
            self.restore_router(node, router);
            attached?;
        }
        let interactor_state = saved.and_then(|s| s.bundle(KEY_INTERACTOR));
        self.slot_mut(node)?
            .interactor
            .on_attach(interactor_state.as_ref())
    }

    /// Idempotent: a node that is not attached has nothing to tear down.
    fn dispatch_detach(&mut self, node: NodeId) -> Result<()> {
        let slot = self.slot_mut(node)?;
        if !slot.flags.contains(LifecycleFlags::ATTACHED) {
            return Ok(());
        }
        slot.interactor.on_detach();
        if let Some(mut router) = self.take_router(node)? {
            let detached = router.dispatch_detach(self, node);
            self.restore_router(node, router);
            detached?;
        }
        self.notify_plugins(node, |p| p.on_detach(node));
        let slot = self.slot_mut(node)?;
        slot.flags.remove(LifecycleFlags::ATTACHED | LifecycleFlags::STARTED | LifecycleFlags::RESUMED);
        let remaining = slot.children.clone();
        for child in remaining {
            self.detach_child(node, child)?;
        }
        Ok(())
    }

    // --- views ---

    /// Attach the view subtree of `node` into `container`.
    ///
    /// Creates the node's view (headless nodes have none), restores its saved hierarchy
    /// state and then attaches every child whose view is enabled.
    pub fn attach_to_view(&mut self, node: NodeId, container: ViewId) -> Result<()> {
        if self
            .slot(node)?
            .flags
            .contains(LifecycleFlags::VIEW_ATTACHED)
        {
            return Err(RibsError::AlreadyAttachedToView(node));
        }
        if !self.views.is_alive(container) {
            return Err(RibsError::StaleContainer(container));
        }
        self.attach_view_inner(node, container)
    }

    /// Detach the view subtree of `node`, children first. View state is kept for the next
    /// [`RibTree::attach_to_view`].
    pub fn detach_from_view(&mut self, node: NodeId) -> Result<()> {
        if !self
            .slot(node)?
            .flags
            .contains(LifecycleFlags::VIEW_ATTACHED)
        {
            return Err(RibsError::NotAttachedToView(node));
        }
        self.detach_view_inner(node)
    }

    /// Show `child` inside `parent` whenever `parent` is on screen.
    pub fn attach_child_view(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.activate_child(parent, child, None)
    }

    /// Take `child` off screen; it stays attached.
    pub fn detach_child_view(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.deactivate_child(parent, child)
    }

    pub(crate) fn activate_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        placement: Option<&dyn ViewPlacement>,
    ) -> Result<()> {
        self.expect_child(parent, child)?;
        let slot = self.slot_mut(child)?;
        slot.flags.insert(LifecycleFlags::VIEW_ENABLED);
        let child_on_screen = slot.flags.contains(LifecycleFlags::VIEW_ATTACHED);
        let parent_on_screen = self
            .slot(parent)?
            .flags
            .contains(LifecycleFlags::VIEW_ATTACHED);
        if parent_on_screen && !child_on_screen {
            let container = self.container_for_child(parent, child, placement)?;
            self.attach_view_inner(child, container)?;
        }
        Ok(())
    }

    pub(crate) fn deactivate_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.expect_child(parent, child)?;
        let slot = self.slot_mut(child)?;
        slot.flags.remove(LifecycleFlags::VIEW_ENABLED);
        if slot.flags.contains(LifecycleFlags::VIEW_ATTACHED) {
            self.detach_view_inner(child)?;
        }
        Ok(())
    }

    /// Container for the view of `child`: the router's pick, else the parent's own view,
    /// else the parent's container.
    fn container_for_child(
        &self,
        parent: NodeId,
        child: NodeId,
        placement: Option<&dyn ViewPlacement>,
    ) -> Result<ViewId> {
        let class = self.slot(child)?.class;
        let slot = self.slot(parent)?;
        let requested = match (placement, &slot.router) {
            (Some(placement), _) => placement.container_for_child(class, slot.view),
            (None, RouterCell::Idle(router)) => {
                router.placement().container_for_child(class, slot.view)
            }
            (None, _) => None,
        };
        requested
            .or(slot.view)
            .or(slot.parent_container)
            .ok_or(RibsError::NotAttachedToView(parent))
    }

    fn attach_view_inner(&mut self, node: NodeId, container: ViewId) -> Result<()> {
        let slot = Self::slot_in(&mut self.nodes, node)?;
        let view = match &slot.view_factory {
            Some(factory) => {
                let view = factory.create(&mut self.views);
                if let Err(err) = self.views.add_view(container, view) {
                    self.views.remove(view);
                    return Err(err.into());
                }
                if let Some(state) = slot.saved_view_state.take() {
                    self.views.restore_hierarchy_state(view, &state);
                }
                slot.view = Some(view);
                Some(view)
            }
            None => None,
        };
        slot.flags.insert(LifecycleFlags::VIEW_ATTACHED);
        slot.parent_container = Some(container);
        if let Some(view) = view {
            slot.interactor.on_view_created(&mut self.views, view);
        }
        for plugin in &mut slot.plugins {
            plugin.on_attach_to_view(node, view);
        }
        let children = slot.children.clone();
        for child in children {
            let flags = self.slot(child)?.flags;
            if flags.contains(LifecycleFlags::VIEW_ENABLED)
                && !flags.contains(LifecycleFlags::VIEW_ATTACHED)
            {
                let container = self.container_for_child(node, child, None)?;
                self.attach_view_inner(child, container)?;
            }
        }
        Ok(())
    }

    fn detach_view_inner(&mut self, node: NodeId) -> Result<()> {
        let children = self.slot(node)?.children.clone();
        for child in children {
            if self
                .slot(child)?
                .flags
                .contains(LifecycleFlags::VIEW_ATTACHED)
            {
                self.detach_view_inner(child)?;
            }
        }
        let slot = Self::slot_in(&mut self.nodes, node)?;
        if let Some(view) = slot.view.take() {
            let state = self.views.save_hierarchy_state(view);
            slot.saved_view_state = (!state.is_empty()).then_some(state);
            self.views.remove(view);
            slot.interactor.on_view_destroyed();
        }
        slot.flags.remove(LifecycleFlags::VIEW_ATTACHED);
        slot.parent_container = None;
        for plugin in &mut slot.plugins {
            plugin.on_detach_from_view(node);
        }
        Ok(())
    }

    // --- state ---

    /// Persist `node` and everything below it into `out`.
    ///
    /// Feeding `out` back to [`RibTree::attach_root`] (or to the node's router on
    /// resolution) rebuilds an equivalent subtree with the same rib ids.
    pub fn save_instance_state(&self, node: NodeId, out: &mut Bundle) -> Result<()> {
        let slot = self.slot(node)?;
        if let Some(rib_id) = slot.rib_id {
            out.put(KEY_RIB_ID, &rib_id)?;
        }
        let view_state = match slot.view {
            Some(view) => Some(self.views.save_hierarchy_state(view)),
            None => slot.saved_view_state.clone(),
        };
        if let Some(state) = view_state.filter(|s| !s.is_empty()) {
            out.put(KEY_VIEW_STATE, &state)?;
        }
        match &slot.router {
            RouterCell::Absent => {}
            RouterCell::Busy => return Err(RibsError::RouterBusy(node)),
            RouterCell::Idle(router) => {
                let mut sub = Bundle::new();
                router.save_instance_state(self, &mut sub)?;
                out.put_bundle(KEY_ROUTER, sub);
            }
        }
        let mut sub = Bundle::new();
        slot.interactor.on_save_instance_state(&mut sub)?;
        if !sub.is_empty() {
            out.put_bundle(KEY_INTERACTOR, sub);
        }
        Ok(())
    }

    // --- back press ---

    /// Offer a back press to `node`.
    ///
    /// Navigation goes first: the router's active children, then the router's own
    /// backstack. Only if both decline does the interactor get asked.
    pub fn handle_back_press(&mut self, node: NodeId) -> Result<bool> {
        self.breadcrumb("BACKPRESS", node);
        if let Some(mut router) = self.take_router(node)? {
            let popped = router.pop_back_stack(self, node);
            self.restore_router(node, router);
            if popped? {
                return Ok(true);
            }
        }
        Ok(self.slot_mut(node)?.interactor.handle_back_press())
    }

    // --- host lifecycle ---

    /// Host lifecycle `start`, propagated to the subtree.
    pub fn on_start(&mut self, node: NodeId) -> Result<()> {
        self.propagate(node, LifecycleFlags::STARTED, true, |i| i.on_start())
    }

    /// Host lifecycle `stop`, propagated to the subtree.
    pub fn on_stop(&mut self, node: NodeId) -> Result<()> {
        self.propagate(node, LifecycleFlags::STARTED, false, |i| i.on_stop())
    }

    /// Host lifecycle `resume`, propagated to the subtree.
    pub fn on_resume(&mut self, node: NodeId) -> Result<()> {
        self.propagate(node, LifecycleFlags::RESUMED, true, |i| i.on_resume())
    }

    /// Host lifecycle `pause`, propagated to the subtree.
    pub fn on_pause(&mut self, node: NodeId) -> Result<()> {
        self.propagate(node, LifecycleFlags::RESUMED, false, |i| i.on_pause())
    }

    fn propagate(
        &mut self,
        node: NodeId,
        flag: LifecycleFlags,
        on: bool,
        hook: fn(&mut dyn Interactor),
    ) -> Result<()> {
        let slot = self.slot_mut(node)?;
        if slot.flags.contains(flag) == on {
            return Ok(());
        }
        slot.flags.set(flag, on);
        hook(&mut *slot.interactor);
        let children = slot.children.clone();
        for child in children {
            self.propagate(child, flag, on, hook)?;
        }
        Ok(())
    }

    // --- navigation ---

    /// Push `configuration` on the backstack of `node`'s router `R`.
    pub fn push<R: Router>(&mut self, node: NodeId, configuration: R::Configuration) -> Result<()> {
        self.apply::<R>(node, Operation::Push(configuration))
            .map(drop)
    }

    /// Pop the backstack of `node`'s router. Returns false at depth one.
    pub fn pop(&mut self, node: NodeId) -> Result<bool> {
        self.expect_attached(node)?;
        let mut router = self.take_router(node)?.ok_or(RibsError::NoRouter(node))?;
        let popped = router.pop(self, node);
        self.restore_router(node, router);
        popped
    }

    /// Swap the top of `node`'s backstack for `configuration`.
    pub fn replace<R: Router>(
        &mut self,
        node: NodeId,
        configuration: R::Configuration,
    ) -> Result<()> {
        self.apply::<R>(node, Operation::Replace(configuration))
            .map(drop)
    }

    /// Clear `node`'s backstack and start over from `configuration`.
    pub fn new_root<R: Router>(
        &mut self,
        node: NodeId,
        configuration: R::Configuration,
    ) -> Result<()> {
        self.apply::<R>(node, Operation::NewRoot(configuration))
            .map(drop)
    }

    /// Apply a backstack operation to `node`'s router `R`.
    pub fn apply<R: Router>(
        &mut self,
        node: NodeId,
        operation: Operation<R::Configuration>,
    ) -> Result<bool> {
        self.expect_attached(node)?;
        let mut router = self.take_router(node)?.ok_or(RibsError::NoRouter(node))?;
        let applied = match router.as_any_mut().downcast_mut::<RouterHost<R>>() {
            Some(host) => host.apply(self, node, operation),
            None => Err(RibsError::RouterMismatch {
                node,
                expected: core::any::type_name::<R>(),
            }),
        };
        self.restore_router(node, router);
        applied
    }

    /// Pop `node`'s backstack, offering the back press to its active children first.
    /// Returns false if nobody below `node` handled it.
    pub fn pop_back_stack(&mut self, node: NodeId) -> Result<bool> {
        self.expect_attached(node)?;
        let mut router = self.take_router(node)?.ok_or(RibsError::NoRouter(node))?;
        let popped = router.pop_back_stack(self, node);
        self.restore_router(node, router);
        popped
    }

    /// Backstack of `node`'s router `R`.
    pub fn backstack<R: Router>(&self, node: NodeId) -> Result<&Backstack<R::Configuration>> {
        self.host::<R>(node).map(|host| &host.backstack)
    }

    /// `node`'s router, typed.
    pub fn router<R: Router>(&self, node: NodeId) -> Result<&R> {
        self.host::<R>(node).map(|host| &host.router)
    }

    fn host<R: Router>(&self, node: NodeId) -> Result<&RouterHost<R>> {
        match &self.slot(node)?.router {
            RouterCell::Absent => Err(RibsError::NoRouter(node)),
            RouterCell::Busy => Err(RibsError::RouterBusy(node)),
            RouterCell::Idle(router) => router
                .as_any()
                .downcast_ref::<RouterHost<R>>()
                .ok_or(RibsError::RouterMismatch {
                    node,
                    expected: core::any::type_name::<R>(),
                }),
        }
    }

    // --- request codes ---

    /// Request code for `code`, routed back to `node` by [`RibTree::node_for_request_code`].
    pub fn request_code(&mut self, node: NodeId, code: u32) -> Result<u32> {
        let tag = self.slot(node)?.tag.clone();
        self.request_codes.generate_request_code(&tag, code)
    }

    /// Live node that issued `request_code`, if any.
    pub fn node_for_request_code(&self, request_code: u32) -> Option<NodeId> {
        let group = self.request_codes.group_of(request_code);
        self.alive()
            .find(|(_, slot)| slot.rib_id == Some(group))
            .map(|(id, _)| id)
    }

    // --- inspection ---

    /// Returns true if `id` refers to a live node.
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.slot(id).is_ok()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    /// Returns true if no node is alive.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slot(id).ok().and_then(|s| s.parent)
    }

    /// Children of a node, in attach order. Empty for stale ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.slot(id).map_or(&[], |s| &s.children)
    }

    /// Class name of a node.
    pub fn class(&self, id: NodeId) -> Option<&'static str> {
        self.slot(id).ok().map(|s| s.class)
    }

    /// Unique tag of a node instance.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.slot(id).ok().map(|s| s.tag.as_str())
    }

    /// Rib id of an attached node. Stable across save/restore.
    pub fn rib_id(&self, id: NodeId) -> Option<u32> {
        self.slot(id).ok().and_then(|s| s.rib_id)
    }

    /// The node's view, while it is on screen.
    pub fn view(&self, id: NodeId) -> Option<ViewId> {
        self.slot(id).ok().and_then(|s| s.view)
    }

    /// Lifecycle flags of a node.
    pub fn flags(&self, id: NodeId) -> Option<LifecycleFlags> {
        self.slot(id).ok().map(|s| s.flags)
    }

    /// Owned copy of the tree structure, safe to send to other threads.
    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot::new(
            self.alive()
                .map(|(id, slot)| NodeSnapshot {
                    id,
                    class: slot.class,
                    tag: slot.tag.clone(),
                    rib_id: slot.rib_id,
                    parent: slot.parent,
                    children: slot.children.clone(),
                    flags: slot.flags,
                    view: slot.view,
                })
                .collect(),
        )
    }

    // --- internals ---

    fn alive(&self) -> impl Iterator<Item = (NodeId, &NodeSlot)> {
        self.nodes.iter().enumerate().filter_map(|(idx, slot)| {
            let slot = slot.as_ref()?;
            #[allow(
                clippy::cast_possible_truncation,
                reason = "NodeId uses 32-bit indices by design."
            )]
            let id = NodeId::new(idx as u32, slot.generation);
            Some((id, slot))
        })
    }

    fn slot(&self, id: NodeId) -> Result<&NodeSlot> {
        self.nodes
            .get(id.idx())
            .and_then(Option::as_ref)
            .filter(|slot| slot.generation == id.1)
            .ok_or(RibsError::StaleNode(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut NodeSlot> {
        Self::slot_in(&mut self.nodes, id)
    }

    fn slot_in(nodes: &mut [Option<NodeSlot>], id: NodeId) -> Result<&mut NodeSlot> {
        nodes
            .get_mut(id.idx())
            .and_then(Option::as_mut)
            .filter(|slot| slot.generation == id.1)
            .ok_or(RibsError::StaleNode(id))
    }

    fn expect_child(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.slot(parent)?;
        if self.slot(child)?.parent == Some(parent) {
            Ok(())
        } else {
            Err(RibsError::NotAChild { parent, child })
        }
    }

    fn expect_attached(&self, node: NodeId) -> Result<()> {
        if self.slot(node)?.flags.contains(LifecycleFlags::ATTACHED) {
            Ok(())
        } else {
            Err(RibsError::NotAttached(node))
        }
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        if let Ok(slot) = self.slot_mut(parent) {
            slot.children.retain(|c| *c != child);
        }
        if let Ok(slot) = self.slot_mut(child) {
            slot.parent = None;
        }
    }

    /// Take the router out of its slot for an operation. `None` for routerless nodes.
    fn take_router(&mut self, node: NodeId) -> Result<Option<Box<dyn ErasedRouter>>> {
        let slot = self.slot_mut(node)?;
        match core::mem::replace(&mut slot.router, RouterCell::Busy) {
            RouterCell::Idle(router) => Ok(Some(router)),
            RouterCell::Absent => {
                slot.router = RouterCell::Absent;
                Ok(None)
            }
            RouterCell::Busy => Err(RibsError::RouterBusy(node)),
        }
    }

    fn restore_router(&mut self, node: NodeId, router: Box<dyn ErasedRouter>) {
        if let Ok(slot) = self.slot_mut(node) {
            slot.router = RouterCell::Idle(router);
        }
    }

    fn notify_plugins(&mut self, node: NodeId, mut f: impl FnMut(&mut dyn Plugin)) {
        if let Ok(slot) = self.slot_mut(node) {
            for plugin in &mut slot.plugins {
                f(&mut **plugin);
            }
        }
    }

    /// Best-effort teardown of a node whose attach failed.
    fn abandon(&mut self, node: NodeId) {
        if let Err(err) = self.dispatch_detach(node) {
            warn!(?node, error = %err, "teardown after failed attach did not complete");
        }
        self.free_slot(node);
    }

    fn free_slot(&mut self, node: NodeId) {
        if self.slot(node).is_err() {
            return;
        }
        if let Some(slot) = self.nodes[node.idx()].take() {
            if let Some(view) = slot.view {
                self.views.remove(view);
            }
            self.request_codes.release(&slot.tag);
            self.free_list.push(node.idx());
        }
    }

    fn breadcrumb(&self, event: &'static str, node: NodeId) {
        if !self.config.breadcrumbs {
            return;
        }
        if let Ok(slot) = self.slot(node) {
            debug!(
                target: "ribs_core::breadcrumb",
                ?node,
                class = slot.class,
                rib_id = ?slot.rib_id,
                "{event}"
            );
        }
    }
}
