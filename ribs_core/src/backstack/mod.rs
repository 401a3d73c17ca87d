// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backstack: the ordered configurations of one router.
//!
//! The top entry is the current configuration and is [`ActivationState::Active`]. Entries
//! below it stay resolved and [`ActivationState::Sleeping`] so going back is cheap, unless
//! [`RibsConfig::retained_backstack_depth`](crate::RibsConfig::retained_backstack_depth)
//! says otherwise: deeper entries are saved and shrunk back to [`Unresolved`].
//!
//! Mutations are expressed as [`Operation`] values and applied with [`Backstack::apply`];
//! the tree's `push`/`pop`/`replace`/`new_root` are thin wrappers.

mod action;
mod context;

use core::fmt;

use tracing::{trace, warn};

pub use context::{ActivationState, ConfigurationContext, Resolved, Unresolved};

use crate::error::Result;
use crate::router::Router;
use crate::tree::RibTree;
use crate::types::NodeId;

/// A backstack mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation<C> {
    /// Put a configuration on top; the previous top goes to sleep.
    Push(C),
    /// Remove the top; the entry below becomes active. Unhandled at depth one.
    Pop,
    /// Swap the top for a configuration.
    Replace(C),
    /// Drop every entry and start over from a configuration.
    NewRoot(C),
}

/// Ordered configuration contexts of a router.
pub struct Backstack<C> {
    entries: Vec<ConfigurationContext<C>>,
}

impl<C> Default for Backstack<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for Backstack<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.entries
                    .iter()
                    .map(|entry| (entry.configuration(), entry.activation_state())),
            )
            .finish()
    }
}

impl<C> Backstack<C> {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true before the router was first attached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The current entry.
    pub fn top(&self) -> Option<&ConfigurationContext<C>> {
        self.entries.last()
    }

    /// Every entry, bottom first.
    pub fn entries(&self) -> &[ConfigurationContext<C>] {
        &self.entries
    }

    /// Configurations, bottom first.
    pub fn configurations(&self) -> impl Iterator<Item = &C> {
        self.entries.iter().map(ConfigurationContext::configuration)
    }

    /// Nodes of the active entry.
    pub fn active_nodes(&self) -> Vec<NodeId> {
        match self.entries.last() {
            Some(ConfigurationContext::Resolved(top))
                if top.activation_state == ActivationState::Active =>
            {
                top.nodes.iter().map(|d| d.node).collect()
            }
            _ => Vec::new(),
        }
    }
}

impl<C: Clone + fmt::Debug> Backstack<C> {
    /// A backstack holding only `initial`, not yet resolved.
    pub fn new(initial: C) -> Self {
        Self {
            entries: vec![ConfigurationContext::Unresolved(Unresolved::new(initial))],
        }
    }

    /// A backstack restored from persisted entries.
    pub fn from_entries(entries: Vec<Unresolved<C>>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(ConfigurationContext::Unresolved)
                .collect(),
        }
    }

    /// Persistable form of every entry; resolved entries carry their nodes' saved state.
    pub fn save(&self, tree: &RibTree) -> Result<Vec<Unresolved<C>>> {
        self.entries
            .iter()
            .map(|entry| match entry {
                ConfigurationContext::Unresolved(unresolved) => Ok(unresolved.clone()),
                ConfigurationContext::Resolved(resolved) => resolved.save(tree),
            })
            .collect()
    }

    /// Bring the backstack up under a freshly attached `node`.
    ///
    /// Entries persisted as sleeping are resolved again and stay off screen; the top
    /// entry is resolved and activated.
    pub(crate) fn attach<R>(&mut self, tree: &mut RibTree, node: NodeId, router: &R) -> Result<()>
    where
        R: Router<Configuration = C>,
    {
        let Some(top) = self.entries.len().checked_sub(1) else {
            return Ok(());
        };
        for idx in 0..top {
            let entry = &self.entries[idx];
            if let ConfigurationContext::Unresolved(unresolved) = entry
                && unresolved.activation_state == ActivationState::Sleeping
            {
                let resolved = unresolved.resolve(router, tree, node)?;
                self.entries[idx] = ConfigurationContext::Resolved(resolved);
            }
        }
        self.promote_top(tree, node, router)?;
        self.trim(tree, node)
    }

    /// Tear every resolved entry down, top first. Configurations are kept.
    pub(crate) fn detach(&mut self, tree: &mut RibTree, node: NodeId) -> Result<()> {
        for idx in (0..self.entries.len()).rev() {
            if let ConfigurationContext::Resolved(resolved) = &mut self.entries[idx] {
                action::remove(resolved, tree, node)?;
                let shrunk = resolved.shrink();
                self.entries[idx] = ConfigurationContext::Unresolved(shrunk);
            }
        }
        Ok(())
    }

    /// Apply `operation` for the router of `node`.
    ///
    /// Returns whether the operation changed the backstack; only [`Operation::Pop`] at
    /// depth one reports `false`. If resolving or activating an entry fails, the entries are
    /// as they were before the call and the previous top is back on screen. A popped entry
    /// that has to be rebuilt gets fresh node ids restored from its saved state.
    pub fn apply<R>(
        &mut self,
        tree: &mut RibTree,
        node: NodeId,
        router: &R,
        operation: Operation<C>,
    ) -> Result<bool>
    where
        R: Router<Configuration = C>,
    {
        let before = self.len();
        trace!(?node, ?operation, depth = before, "applying backstack operation");
        let changed = match operation {
            Operation::Push(configuration) => self.push(tree, node, router, configuration)?,
            Operation::Pop => self.pop(tree, node, router)?,
            Operation::Replace(configuration) => self.replace(tree, node, router, configuration)?,
            Operation::NewRoot(configuration) => {
                self.new_root(tree, node, router, configuration)?
            }
        };
        trace!(
            ?node,
            depth_before = before,
            depth_after = self.len(),
            changed,
            "backstack operation applied"
        );
        Ok(changed)
    }

    fn push<R>(&mut self, tree: &mut RibTree, node: NodeId, router: &R, configuration: C) -> Result<bool>
    where
        R: Router<Configuration = C>,
    {
        let mut fresh = Unresolved::new(configuration).resolve(router, tree, node)?;
        self.switch_to(tree, node, router, &mut fresh)?;
        self.entries.push(ConfigurationContext::Resolved(fresh));
        self.trim(tree, node)?;
        Ok(true)
    }

    fn pop<R>(&mut self, tree: &mut RibTree, node: NodeId, router: &R) -> Result<bool>
    where
        R: Router<Configuration = C>,
    {
        if self.entries.len() <= 1 {
            return Ok(false);
        }
        // Resolve the entry below first so a failing resolve leaves the top in place.
        let below = self.entries.len() - 2;
        if let ConfigurationContext::Unresolved(unresolved) = &self.entries[below] {
            let resolved = unresolved.resolve(router, tree, node)?;
            self.entries[below] = ConfigurationContext::Resolved(resolved);
        }
        // Saved up front so a failed promotion can rebuild the popped entry.
        let saved = match self.entries.last() {
            Some(ConfigurationContext::Resolved(top)) => top.save(tree)?,
            Some(ConfigurationContext::Unresolved(top)) => top.clone(),
            None => return Ok(false),
        };
        let mut outcome = Ok(());
        if let Some(ConfigurationContext::Resolved(mut popped)) = self.entries.pop() {
            outcome = action::remove(&mut popped, tree, node);
            if outcome.is_err() {
                action::discard(&popped, tree, node);
            }
        }
        let outcome = outcome.and_then(|()| self.promote_top(tree, node, router));
        if let Err(err) = outcome {
            if let Some(ConfigurationContext::Resolved(top)) = self.entries.last() {
                action::withdraw(top, tree, node);
            }
            self.rebuild_top(tree, node, router, saved);
            return Err(err);
        }
        Ok(true)
    }

    fn replace<R>(
        &mut self,
        tree: &mut RibTree,
        node: NodeId,
        router: &R,
        configuration: C,
    ) -> Result<bool>
    where
        R: Router<Configuration = C>,
    {
        let mut fresh = Unresolved::new(configuration).resolve(router, tree, node)?;
        self.switch_to(tree, node, router, &mut fresh)?;
        if let Some(ConfigurationContext::Resolved(mut replaced)) = self.entries.pop() {
            action::remove(&mut replaced, tree, node)?;
        }
        self.entries.push(ConfigurationContext::Resolved(fresh));
        Ok(true)
    }

    fn new_root<R>(
        &mut self,
        tree: &mut RibTree,
        node: NodeId,
        router: &R,
        configuration: C,
    ) -> Result<bool>
    where
        R: Router<Configuration = C>,
    {
        let mut fresh = Unresolved::new(configuration).resolve(router, tree, node)?;
        self.switch_to(tree, node, router, &mut fresh)?;
        while let Some(entry) = self.entries.pop() {
            if let ConfigurationContext::Resolved(mut resolved) = entry {
                action::remove(&mut resolved, tree, node)?;
            }
        }
        self.entries.push(ConfigurationContext::Resolved(fresh));
        Ok(true)
    }

    /// Put the top to sleep and activate `fresh` in its place.
    ///
    /// On failure `fresh` is discarded and the top is back on screen.
    fn switch_to<R>(
        &mut self,
        tree: &mut RibTree,
        node: NodeId,
        router: &R,
        fresh: &mut Resolved<C>,
    ) -> Result<()>
    where
        R: Router<Configuration = C>,
    {
        let switched = self
            .sleep_top(tree, node)
            .and_then(|()| action::activate(fresh, tree, node, router));
        if let Err(err) = switched {
            warn!(?node, error = %err, "switching backstack top failed, rolling back");
            action::discard(fresh, tree, node);
            self.reactivate_top(tree, node, router);
            return Err(err);
        }
        Ok(())
    }

    fn sleep_top(&mut self, tree: &mut RibTree, node: NodeId) -> Result<()> {
        match self.entries.last_mut() {
            Some(ConfigurationContext::Resolved(top)) => action::sleep(top, tree, node),
            _ => Ok(()),
        }
    }

    /// Best-effort return of a resolved top to the screen.
    fn reactivate_top<R>(&mut self, tree: &mut RibTree, node: NodeId, router: &R)
    where
        R: Router<Configuration = C>,
    {
        let Some(ConfigurationContext::Resolved(top)) = self.entries.last_mut() else {
            return;
        };
        // A sleep that failed halfway leaves the entry marked active.
        top.activation_state = top.activation_state.sleep();
        if let Err(err) = action::activate(top, tree, node, router) {
            warn!(?node, error = %err, "backstack top could not be reactivated");
        }
    }

    /// Best-effort rebuild of a torn-down top from its saved form.
    fn rebuild_top<R>(&mut self, tree: &mut RibTree, node: NodeId, router: &R, saved: Unresolved<C>)
    where
        R: Router<Configuration = C>,
    {
        match saved.resolve(router, tree, node) {
            Ok(resolved) => self.entries.push(ConfigurationContext::Resolved(resolved)),
            Err(err) => {
                warn!(?node, error = %err, "popped entry could not be rebuilt");
                self.entries.push(ConfigurationContext::Unresolved(saved));
            }
        }
    }

    /// Make the top entry active, resolving it first if needed.
    fn promote_top<R>(&mut self, tree: &mut RibTree, node: NodeId, router: &R) -> Result<()>
    where
        R: Router<Configuration = C>,
    {
        let Some(top) = self.entries.last_mut() else {
            return Ok(());
        };
        if let ConfigurationContext::Unresolved(unresolved) = &*top {
            let resolved = unresolved.resolve(router, tree, node)?;
            *top = ConfigurationContext::Resolved(resolved);
        }
        if let ConfigurationContext::Resolved(resolved) = top {
            action::activate(resolved, tree, node, router)?;
        }
        Ok(())
    }

    /// Save and shrink entries deeper than the retained depth.
    fn trim(&mut self, tree: &mut RibTree, node: NodeId) -> Result<()> {
        let Some(depth) = tree.config().retained_backstack_depth else {
            return Ok(());
        };
        let keep_from = self.entries.len().saturating_sub(depth + 1);
        for idx in 0..keep_from {
            if let ConfigurationContext::Resolved(resolved) = &mut self.entries[idx] {
                let bundles = resolved.save_nodes(tree)?;
                action::remove(resolved, tree, node)?;
                let configuration = resolved.configuration.clone();
                trace!(?node, entry = idx, "trimmed backstack entry");
                self.entries[idx] = ConfigurationContext::Unresolved(Unresolved {
                    configuration,
                    bundles,
                    activation_state: ActivationState::Inactive,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RibsConfig;
    use crate::testing::{Screen, ScreenRouter, routed_tree, routed_tree_with};
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Step {
        Push(Screen),
        Pop,
    }

    fn screen() -> impl Strategy<Value = Screen> {
        prop::sample::select(vec![Screen::A, Screen::B, Screen::C])
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![screen().prop_map(Step::Push), Just(Step::Pop)]
    }

    fn assert_single_active_on_top(tree: &RibTree, root: NodeId) {
        let backstack = tree.backstack::<ScreenRouter>(root).unwrap();
        let top = backstack.len() - 1;
        let active: Vec<usize> = backstack
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| e.activation_state() == ActivationState::Active)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(active, [top], "exactly the top entry is active");
        for entry in &backstack.entries()[..top] {
            for descriptor in entry.nodes() {
                assert_eq!(tree.view(descriptor.node()), None, "sleeping node on screen");
            }
        }
        for descriptor in backstack.entries()[top].nodes() {
            assert!(tree.view(descriptor.node()).is_some(), "active node off screen");
        }
    }

    #[test]
    fn operations_apply_as_values() {
        let (mut tree, root, _) = routed_tree(None);
        assert!(tree.apply::<ScreenRouter>(root, Operation::Push(Screen::A)).unwrap());
        assert!(tree.apply::<ScreenRouter>(root, Operation::Replace(Screen::B)).unwrap());
        assert!(tree.apply::<ScreenRouter>(root, Operation::Pop).unwrap());
        assert!(!tree.apply::<ScreenRouter>(root, Operation::Pop).unwrap());
        let configurations: Vec<Screen> = tree
            .backstack::<ScreenRouter>(root)
            .unwrap()
            .configurations()
            .copied()
            .collect();
        assert_eq!(configurations, [Screen::Home]);
    }

    #[test]
    fn saved_entries_keep_states_and_node_bundles() {
        let (mut tree, root, _) = routed_tree(None);
        tree.push::<ScreenRouter>(root, Screen::A).unwrap();
        let saved = tree
            .backstack::<ScreenRouter>(root)
            .unwrap()
            .save(&tree)
            .unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].activation_state, ActivationState::Sleeping);
        assert_eq!(saved[1].activation_state, ActivationState::Active);
        assert_eq!(saved[1].configuration, Screen::A);
        let a = tree.backstack::<ScreenRouter>(root).unwrap().active_nodes()[0];
        let rib_id: Option<u32> = saved[1].bundles[0].get(crate::KEY_RIB_ID).unwrap();
        assert_eq!(rib_id, tree.rib_id(a));
    }

    proptest! {
        #[test]
        fn single_active_entry_survives_any_sequence(
            steps in prop::collection::vec(step(), 0..24),
            retained in prop::option::of(0_usize..3),
        ) {
            let config = RibsConfig::default().with_retained_backstack_depth(retained);
            let (mut tree, root, _) = routed_tree_with(config, None, None);
            let mut model = vec![Screen::Home];
            for step in steps {
                match step {
                    Step::Push(screen) => {
                        tree.push::<ScreenRouter>(root, screen).unwrap();
                        model.push(screen);
                    }
                    Step::Pop => {
                        let popped = tree.pop(root).unwrap();
                        prop_assert_eq!(popped, model.len() > 1);
                        if popped {
                            model.pop();
                        }
                    }
                }
                assert_single_active_on_top(&tree, root);
                let configurations: Vec<Screen> = tree
                    .backstack::<ScreenRouter>(root)
                    .unwrap()
                    .configurations()
                    .copied()
                    .collect();
                prop_assert_eq!(&configurations, &model);
            }
        }

        #[test]
        fn push_then_pop_is_a_round_trip(
            prefix in prop::collection::vec(screen(), 0..6),
            pushed in screen(),
        ) {
            let (mut tree, root, _) = routed_tree(None);
            for screen in prefix {
                tree.push::<ScreenRouter>(root, screen).unwrap();
            }
            let backstack = tree.backstack::<ScreenRouter>(root).unwrap();
            let depth = backstack.len();
            let top = *backstack.top().unwrap().configuration();
            let nodes = tree.len();

            tree.push::<ScreenRouter>(root, pushed).unwrap();
            prop_assert!(tree.pop(root).unwrap());

            let backstack = tree.backstack::<ScreenRouter>(root).unwrap();
            prop_assert_eq!(backstack.len(), depth);
            prop_assert_eq!(*backstack.top().unwrap().configuration(), top);
            prop_assert_eq!(tree.len(), nodes);
        }
    }
}
