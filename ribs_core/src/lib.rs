// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! RIBs Core: Router/Interactor/Builder node trees driven by a backstack of configurations.
//!
//! An application is a tree of RIBs. Each node pairs an [`Interactor`] (feature logic) with an
//! optional [`Router`] (navigation) and an optional view. A router names the *configurations*
//! its node can be in and keeps them on a [`Backstack`]; pushing and popping configurations
//! builds, attaches, puts to sleep and tears down child nodes.
//!
//! - Nodes live in a generational arena, the [`RibTree`]. Routers and interactors only ever
//!   see [`NodeId`]s, never each other.
//! - Backstack entries are [`ConfigurationContext`]s: [`Unresolved`] (a configuration plus
//!   persisted state) or [`Resolved`] (live nodes). Resolution happens lazily.
//! - Every entry has an [`ActivationState`]. The top entry is active and on screen; entries
//!   below sleep with their views detached.
//! - The whole tree saves into a [`Bundle`] and restores from it with stable rib ids.
//!
//! ## API overview
//!
//! - [`RibTree`]: node arena, attach/detach protocol, views, save/restore and navigation.
//! - [`Rib`]: recipe for a node, produced by a [`Builder`].
//! - [`Router`]: configuration type plus the mapping to [`RoutingAction`]s.
//! - [`routing`]: ready-made routing actions.
//! - [`Interactor`], [`Plugin`]: lifecycle callbacks.
//! - [`RibsConfig`]: tree-wide configuration.
//! - [`TreeSnapshot`]: `Send` copy of the structure for other threads.
//!
//! Key operations:
//! - [`RibTree::attach_root`] / [`RibTree::detach_root`]
//! - [`RibTree::attach_to_view`] / [`RibTree::detach_from_view`]
//! - [`RibTree::push`] / [`RibTree::pop`] / [`RibTree::replace`] / [`RibTree::new_root`]
//! - [`RibTree::handle_back_press`]
//! - [`RibTree::save_instance_state`]
//!
//! ## Threading
//!
//! The tree is not `Send`: everything happens on the thread that owns it. There is no
//! locking and no operation blocks.
//!
//! ## Logging
//!
//! The crate logs through [`tracing`] and installs no subscriber. Breadcrumbs for node
//! attach, detach and back presses go to target `ribs_core::breadcrumb` at `debug` level;
//! backstack operations are logged at `trace` level.
//!
//! ### Minimal usage
//!
//! ```
//! use ribs_core::routing::{self, RoutingAction};
//! use ribs_core::{ActivationState, BuildParams, Result, Rib, RibTree, Router};
//! use ribs_view::{LocalView, ViewTree};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
//! enum Screen {
//!     List,
//!     Details(u32),
//! }
//!
//! struct AppRouter;
//!
//! impl Router for AppRouter {
//!     type Configuration = Screen;
//!
//!     fn initial_configuration(&self) -> Screen {
//!         Screen::List
//!     }
//!
//!     fn resolve(&self, screen: &Screen) -> Result<Box<dyn RoutingAction>> {
//!         let class = match screen {
//!             Screen::List => "List",
//!             Screen::Details(_) => "Details",
//!         };
//!         Ok(routing::attach(move |_: BuildParams| {
//!             Rib::new(class).with_view(move |views: &mut ViewTree| {
//!                 views.insert(None, LocalView::default().with_label(class))
//!             })
//!         }))
//!     }
//! }
//!
//! let mut tree = RibTree::new();
//! let window = tree.views_mut().new_root("window");
//! let root = tree.attach_root(Rib::new("App").with_router(AppRouter), None)?;
//! tree.attach_to_view(root, window)?;
//!
//! tree.push::<AppRouter>(root, Screen::Details(7))?;
//! let backstack = tree.backstack::<AppRouter>(root)?;
//! assert_eq!(backstack.len(), 2);
//! assert_eq!(backstack.entries()[0].activation_state(), ActivationState::Sleeping);
//!
//! // Back pops the details screen; at the first screen it is left to the host.
//! assert!(tree.handle_back_press(root)?);
//! assert!(!tree.handle_back_press(root)?);
//! # Ok::<(), ribs_core::RibsError>(())
//! ```

pub mod backstack;
mod bundle;
mod config;
mod error;
mod node;
mod request_code;
mod router;
pub mod routing;
mod snapshot;
#[cfg(test)]
mod testing;
mod tree;
mod types;

pub use backstack::{
    ActivationState, Backstack, ConfigurationContext, Operation, Resolved, Unresolved,
};
pub use bundle::{
    Bundle, KEY_CHILD_NODES, KEY_INTERACTOR, KEY_RIB_ID, KEY_ROUTER, KEY_VIEW_STATE,
};
pub use config::RibsConfig;
pub use error::{Result, RibsError};
pub use node::{BuildParams, Builder, Interactor, Plugin, Rib, ViewFactory};
pub use request_code::RequestCodeRegistry;
pub use router::Router;
pub use routing::RoutingAction;
pub use snapshot::{NodeSnapshot, TreeSnapshot};
pub use tree::RibTree;
pub use types::{LifecycleFlags, NodeDescriptor, NodeId, ViewAttachMode};
