// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fixtures shared by unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ribs_view::{LocalView, ViewId, ViewTree};
use serde::{Deserialize, Serialize};

use crate::bundle::Bundle;
use crate::config::RibsConfig;
use crate::error::{Result, RibsError};
use crate::node::{BuildParams, Interactor, Rib};
use crate::router::Router;
use crate::routing::{self, RoutingAction};
use crate::tree::RibTree;
use crate::types::NodeId;

pub(crate) type Log = Rc<RefCell<Vec<String>>>;

pub(crate) fn log() -> Log {
    Rc::default()
}

pub(crate) fn entries(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

/// Interactor appending `name:event` lines to a shared log.
pub(crate) struct Recording {
    name: &'static str,
    log: Log,
    consumes_back: bool,
}

impl Recording {
    pub(crate) fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: Rc::clone(log),
            consumes_back: false,
        }
    }

    pub(crate) fn consuming_back(mut self) -> Self {
        self.consumes_back = true;
        self
    }

    fn record(&self, event: &str) {
        self.log.borrow_mut().push(format!("{}:{event}", self.name));
    }
}

impl Interactor for Recording {
    fn on_attach(&mut self, _: Option<&Bundle>) -> Result<()> {
        self.record("attach");
        Ok(())
    }

    fn on_detach(&mut self) {
        self.record("detach");
    }

    fn on_view_created(&mut self, _: &mut ViewTree, _: ViewId) {
        self.record("view+");
    }

    fn on_view_destroyed(&mut self) {
        self.record("view-");
    }

    fn handle_back_press(&mut self) -> bool {
        self.record("back");
        self.consumes_back
    }

    fn on_start(&mut self) {
        self.record("start");
    }

    fn on_stop(&mut self) {
        self.record("stop");
    }

    fn on_resume(&mut self) {
        self.record("resume");
    }

    fn on_pause(&mut self) {
        self.record("pause");
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Screen {
    Home,
    A,
    B,
    /// Its interactor consumes back presses.
    C,
    Unmapped,
}

impl Screen {
    fn class(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::Unmapped => "Unmapped",
        }
    }
}

/// Router with one viewed child RIB per screen.
pub(crate) struct ScreenRouter {
    log: Log,
    misplaced: Cell<Option<(&'static str, ViewId)>>,
}

impl ScreenRouter {
    fn new(log: Log) -> Self {
        Self {
            log,
            misplaced: Cell::new(None),
        }
    }

    /// Send children of `class` into `container` instead of the default placement.
    pub(crate) fn misplace(&self, class: &'static str, container: ViewId) {
        self.misplaced.set(Some((class, container)));
    }
}

impl Default for ScreenRouter {
    fn default() -> Self {
        Self::new(log())
    }
}

impl Router for ScreenRouter {
    type Configuration = Screen;

    fn initial_configuration(&self) -> Screen {
        Screen::Home
    }

    fn resolve(&self, configuration: &Screen) -> Result<Box<dyn RoutingAction>> {
        let screen = *configuration;
        if screen == Screen::Unmapped {
            return Err(RibsError::unresolved::<Self>(configuration));
        }
        let log = Rc::clone(&self.log);
        Ok(routing::attach(move |_: BuildParams| screen_rib(screen, &log)))
    }

    fn parent_view_for_child(&self, child_class: &str, _: Option<ViewId>) -> Option<ViewId> {
        match self.misplaced.get() {
            Some((class, container)) if class == child_class => Some(container),
            _ => None,
        }
    }
}

/// A view id that no longer exists in `tree`.
pub(crate) fn removed_view(tree: &mut RibTree) -> ViewId {
    let gone = tree.views_mut().new_root("gone");
    tree.views_mut().remove(gone);
    gone
}

/// Make `root`'s router put `class` children into a removed view.
pub(crate) fn break_placement(tree: &mut RibTree, root: NodeId, class: &'static str) {
    let gone = removed_view(tree);
    tree.router::<ScreenRouter>(root)
        .expect("root routes screens")
        .misplace(class, gone);
}

fn screen_rib(screen: Screen, log: &Log) -> Rib {
    let class = screen.class();
    let mut interactor = Recording::new(class, log);
    if screen == Screen::C {
        interactor = interactor.consuming_back();
    }
    let key = screen as u32;
    Rib::new(class)
        .with_interactor(interactor)
        .with_view(move |views: &mut ViewTree| {
            views.insert(None, LocalView::keyed(key).with_label(class))
        })
}

/// A tree with one attached, routerless, headless root.
pub(crate) fn attach_host() -> (RibTree, NodeId) {
    let mut tree = RibTree::new();
    let host = tree
        .attach_root(Rib::new("Host"), None)
        .expect("host attaches");
    (tree, host)
}

/// A tree whose root routes [`Screen`]s and is on screen in a window.
pub(crate) fn routed_tree(log: Option<Log>) -> (RibTree, NodeId, ViewId) {
    routed_tree_with(RibsConfig::default(), log, None)
}

pub(crate) fn routed_tree_from(log: Option<Log>, saved: Option<&Bundle>) -> (RibTree, NodeId, ViewId) {
    routed_tree_with(RibsConfig::default(), log, saved)
}

pub(crate) fn routed_tree_with(
    config: RibsConfig,
    log: Option<Log>,
    saved: Option<&Bundle>,
) -> (RibTree, NodeId, ViewId) {
    let log = log.unwrap_or_default();
    let mut tree = RibTree::with_config(config).expect("valid config");
    let window = tree.views_mut().new_root("window");
    let root = Rib::new("Root")
        .with_interactor(Recording::new("Root", &log))
        .with_router(ScreenRouter::new(log))
        .with_view(|views: &mut ViewTree| views.insert(None, LocalView::keyed(100).with_label("root")));
    let root = tree.attach_root(root, saved).expect("root attaches");
    tree.attach_to_view(root, window).expect("root goes on screen");
    (tree, root, window)
}
