// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Navigation basics.
//!
//! Build a root with a router, push a few screens, press back until the host has to decide.
//!
//! Run:
//! - `RUST_LOG=ribs_core=trace cargo run -p ribs_demos --example navigation`

use ribs_core::routing::{self, RoutingAction};
use ribs_core::{BuildParams, Interactor, Result, Rib, RibTree, RibsError, Router};
use ribs_view::{LocalView, ViewId, ViewTree};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum Screen {
    Feed,
    Profile(u32),
    Settings,
    /// Not wired up yet; resolving it fails.
    Legacy,
}

struct AppRouter;

impl Router for AppRouter {
    type Configuration = Screen;

    fn initial_configuration(&self) -> Screen {
        Screen::Feed
    }

    fn resolve(&self, screen: &Screen) -> Result<Box<dyn RoutingAction>> {
        match screen {
            Screen::Feed => Ok(routing::attach(|_: BuildParams| screen_rib("Feed"))),
            Screen::Profile(user) => {
                let user = *user;
                Ok(routing::composite(vec![
                    routing::attach(|_: BuildParams| screen_rib("Profile")),
                    routing::invoke(move || info!(user, "profile shown")),
                ]))
            }
            Screen::Settings => Ok(routing::attach(|_: BuildParams| screen_rib("Settings"))),
            Screen::Legacy => Err(RibsError::unresolved::<Self>(screen)),
        }
    }
}

struct ScreenInteractor(&'static str);

impl Interactor for ScreenInteractor {
    fn on_view_created(&mut self, _: &mut ViewTree, view: ViewId) {
        info!(screen = self.0, ?view, "view created");
    }

    fn on_view_destroyed(&mut self) {
        info!(screen = self.0, "view destroyed");
    }
}

fn screen_rib(class: &'static str) -> Rib {
    Rib::new(class)
        .with_interactor(ScreenInteractor(class))
        .with_view(move |views: &mut ViewTree| {
            views.insert(None, LocalView::default().with_label(class))
        })
}

fn print_tree(tree: &RibTree) {
    let snapshot = tree.snapshot();
    for root in snapshot.roots() {
        for node in snapshot.depth_first(root.id) {
            println!(
                "  {:<10} rib_id={:?} on_screen={}",
                node.class,
                node.rib_id,
                node.view.is_some()
            );
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ribs_core=debug")),
        )
        .init();

    let mut tree = RibTree::new();
    let window = tree.views_mut().new_root("window");
    let root = tree.attach_root(
        Rib::new("App").with_router(AppRouter).with_view(|views: &mut ViewTree| {
            views.insert(None, LocalView::default().with_label("app"))
        }),
        None,
    )?;
    tree.attach_to_view(root, window)?;

    tree.push::<AppRouter>(root, Screen::Profile(42))?;
    tree.push::<AppRouter>(root, Screen::Settings)?;
    println!("after pushes: {:?}", tree.backstack::<AppRouter>(root)?);
    print_tree(&tree);

    if let Err(err) = tree.push::<AppRouter>(root, Screen::Legacy) {
        println!("push rejected: {err}");
    }

    while tree.handle_back_press(root)? {
        println!("back: {:?}", tree.backstack::<AppRouter>(root)?);
    }
    println!("back press unhandled, the host would close the app now");

    tree.detach_root(root)?;
    assert!(tree.is_empty());
    assert_eq!(tree.views().len(), 1, "only the window is left");
    Ok(())
}
