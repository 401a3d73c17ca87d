// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error type shared by every mutating tree operation.

use core::fmt;

use ribs_view::{ViewError, ViewId};

use crate::types::NodeId;

/// Result alias used throughout the crate.
pub type Result<T, E = RibsError> = core::result::Result<T, E>;

/// Everything that can go wrong while mutating a RIB tree.
///
/// All variants describe misuse of the tree contract or unusable persisted state.
/// None of them is caught inside the crate: they surface from the operation that
/// triggered them, and the operation leaves the backstack it was working on unchanged.
#[derive(Debug, thiserror::Error)]
pub enum RibsError {
    /// A router could not map a configuration to a routing action.
    #[error("{router} has no routing action for configuration {configuration}")]
    UnresolvedConfiguration {
        /// Type name of the router.
        router: &'static str,
        /// Debug rendering of the configuration.
        configuration: String,
    },

    /// The node id does not refer to a live node.
    #[error("node {0:?} is not alive")]
    StaleNode(NodeId),

    /// The node is not a current child of the given parent.
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild {
        /// Expected parent.
        parent: NodeId,
        /// Node that was being detached.
        child: NodeId,
    },

    /// The node is already attached (or already has a parent).
    #[error("node {0:?} is already attached")]
    AlreadyAttached(NodeId),

    /// The operation requires an attached node.
    #[error("node {0:?} is not attached")]
    NotAttached(NodeId),

    /// The node is already part of the view hierarchy.
    #[error("node {0:?} is already attached to a view")]
    AlreadyAttachedToView(NodeId),

    /// The node is not part of the view hierarchy.
    #[error("node {0:?} is not attached to a view")]
    NotAttachedToView(NodeId),

    /// The container view handed to a node is not alive.
    #[error("container view {0:?} is not alive")]
    StaleContainer(ViewId),

    /// The node's router is in the middle of another operation.
    #[error("router of node {0:?} is busy with another operation")]
    RouterBusy(NodeId),

    /// The node was built without a router.
    #[error("node {0:?} has no router")]
    NoRouter(NodeId),

    /// Typed router access used the wrong router type.
    #[error("router of node {node:?} is not a {expected}")]
    RouterMismatch {
        /// Node whose router was accessed.
        node: NodeId,
        /// Requested router type.
        expected: &'static str,
    },

    /// Persisted state could not be (de)serialized.
    #[error("persisted state under `{key}` is malformed: {source}")]
    MalformedState {
        /// Bundle key that failed.
        key: String,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// A request code does not fit in the configured number of bits.
    #[error("request code {code} does not fit in {bits} bits")]
    RequestCodeOverflow {
        /// Code that was requested.
        code: u32,
        /// Bits reserved for codes.
        bits: u32,
    },

    /// Every group id representable next to the request code bits is in use.
    #[error("no free group id left with {bits} request code bits")]
    GroupIdsExhausted {
        /// Bits reserved for codes.
        bits: u32,
    },

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A structural view operation failed.
    #[error(transparent)]
    View(#[from] ViewError),
}

impl RibsError {
    /// Build an [`RibsError::UnresolvedConfiguration`] for router type `R`.
    ///
    /// Routers call this from [`Router::resolve`](crate::Router::resolve) for
    /// configurations they do not know how to build.
    pub fn unresolved<R: ?Sized>(configuration: &impl fmt::Debug) -> Self {
        Self::UnresolvedConfiguration {
            router: core::any::type_name::<R>(),
            configuration: format!("{configuration:?}"),
        }
    }

    pub(crate) fn malformed(key: &str, source: serde_json::Error) -> Self {
        Self::MalformedState {
            key: key.to_owned(),
            source,
        }
    }
}
