// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Save and restore across a simulated process death.
//!
//! Navigate, write the tree to JSON, throw everything away, and rebuild from the JSON.
//!
//! Run:
//! - `cargo run -p ribs_demos --example save_restore`

use ribs_core::routing::{self, RoutingAction};
use ribs_core::{BuildParams, Bundle, Interactor, Result, Rib, RibTree, RibsConfig, Router};
use ribs_view::{LocalView, ViewTree};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
enum Tab {
    Inbox,
    Thread(u64),
}

struct MailRouter;

impl Router for MailRouter {
    type Configuration = Tab;

    fn initial_configuration(&self) -> Tab {
        Tab::Inbox
    }

    fn resolve(&self, tab: &Tab) -> Result<Box<dyn RoutingAction>> {
        Ok(match tab {
            Tab::Inbox => routing::attach(|_: BuildParams| {
                Rib::new("Inbox")
                    .with_interactor(Compose::default())
                    .with_view(|views: &mut ViewTree| views.insert(None, LocalView::keyed(1)))
            }),
            Tab::Thread(_) => routing::attach(|_: BuildParams| {
                Rib::new("Thread")
                    .with_view(|views: &mut ViewTree| views.insert(None, LocalView::keyed(2)))
            }),
        })
    }
}

/// Keeps an unsent draft across process death.
#[derive(Default)]
struct Compose {
    draft: Option<String>,
}

impl Interactor for Compose {
    fn on_attach(&mut self, saved: Option<&Bundle>) -> Result<()> {
        match saved {
            Some(saved) => {
                self.draft = saved.get("draft")?;
                info!(draft = ?self.draft, "draft restored");
            }
            None => self.draft = Some("see you at standup".into()),
        }
        Ok(())
    }

    fn on_save_instance_state(&self, out: &mut Bundle) -> Result<()> {
        if let Some(draft) = &self.draft {
            out.put("draft", draft)?;
        }
        Ok(())
    }
}

fn mail_root() -> Rib {
    Rib::new("Mail").with_router(MailRouter)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = RibsConfig::from_json(r#"{ "retained_backstack_depth": 4 }"#)?;

    let json = {
        let mut tree = RibTree::with_config(config.clone())?;
        let window = tree.views_mut().new_root("window");
        let root = tree.attach_root(mail_root(), None)?;
        tree.attach_to_view(root, window)?;

        let inbox = tree.backstack::<MailRouter>(root)?.active_nodes()[0];
        let inbox_view = tree.view(inbox).expect("inbox is on screen");
        tree.views_mut().set_state(inbox_view, Some("scroll=120".into()));
        tree.push::<MailRouter>(root, Tab::Thread(7))?;

        let mut out = Bundle::new();
        tree.save_instance_state(root, &mut out)?;
        println!(
            "saved {} backstack entries, root rib id {:?}",
            tree.backstack::<MailRouter>(root)?.len(),
            tree.rib_id(root)
        );
        out.to_json()
    };
    println!("wire form: {json}");

    let saved = Bundle::from_json(&json)?;
    let mut tree = RibTree::with_config(config)?;
    let window = tree.views_mut().new_root("window");
    let root = tree.attach_root(mail_root(), Some(&saved))?;
    tree.attach_to_view(root, window)?;
    println!("restored: {:?}", tree.backstack::<MailRouter>(root)?);

    assert!(tree.pop(root)?);
    let inbox = tree.backstack::<MailRouter>(root)?.active_nodes()[0];
    let inbox_view = tree.view(inbox).expect("inbox is back on screen");
    println!(
        "inbox rib id {:?}, view state {:?}",
        tree.rib_id(inbox),
        tree.views().state(inbox_view)
    );
    Ok(())
}
