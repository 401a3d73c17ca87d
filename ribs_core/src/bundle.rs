// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Persisted state: a hierarchical key-value bundle with typed accessors.
//!
//! The wire representation is a JSON object. Every component owns one namespace:
//!
//! | key                 | owner       | content                                   |
//! |---------------------|-------------|-------------------------------------------|
//! | [`KEY_RIB_ID`]      | node        | stable rib id (`u32`)                     |
//! | [`KEY_VIEW_STATE`]  | node        | saved view hierarchy state                |
//! | [`KEY_ROUTER`]      | router      | private sub-bundle                        |
//! | [`KEY_INTERACTOR`]  | interactor  | private sub-bundle                        |
//! | [`KEY_CHILD_NODES`] | router      | backstack entries, inside [`KEY_ROUTER`]  |
//!
//! Components only read the keys they own.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, RibsError};

/// Backstack entries of a router, stored inside the router's sub-bundle.
pub const KEY_CHILD_NODES: &str = "node.children";
/// Private sub-bundle of a node's router.
pub const KEY_ROUTER: &str = "node.router";
/// Private sub-bundle of a node's interactor.
pub const KEY_INTERACTOR: &str = "node.interactor";
/// Stable rib id of a node.
pub const KEY_RIB_ID: &str = "rib.id";
/// Saved view hierarchy state of a node.
pub const KEY_VIEW_STATE: &str = "view.state";

/// Hierarchical key-value state handed across process recreation.
///
/// ```
/// use ribs_core::Bundle;
///
/// let mut inner = Bundle::new();
/// inner.put("count", &3_u32).unwrap();
///
/// let mut outer = Bundle::new();
/// outer.put_bundle("screen", inner);
///
/// let restored = Bundle::from_json(&outer.to_json()).unwrap();
/// let count: Option<u32> = restored.bundle("screen").unwrap().get("count").unwrap();
/// assert_eq!(count, Some(3));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bundle(Map<String, Value>);

impl Bundle {
    /// An empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any previous value.
    pub fn put<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| RibsError::malformed(key, e))?;
        self.0.insert(key.to_owned(), value);
        Ok(())
    }

    /// Read the value under `key`.
    ///
    /// Absent keys yield `Ok(None)`; present values of the wrong shape are an error.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(value) => T::deserialize(value)
                .map(Some)
                .map_err(|e| RibsError::malformed(key, e)),
        }
    }

    /// Store a nested bundle under `key`.
    pub fn put_bundle(&mut self, key: &str, bundle: Self) {
        self.0.insert(key.to_owned(), Value::Object(bundle.0));
    }

    /// Copy of the nested bundle under `key`, if there is one.
    pub fn bundle(&self, key: &str) -> Option<Self> {
        match self.0.get(key) {
            Some(Value::Object(map)) => Some(Self(map.clone())),
            _ => None,
        }
    }

    /// Returns true if something is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Remove and drop the value under `key`.
    pub fn remove(&mut self, key: &str) -> bool {
        self.0.remove(key).is_some()
    }

    /// Stored keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wire representation.
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// Parse a bundle from its wire representation.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| RibsError::malformed("<root>", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_key_is_not_an_error() {
        let bundle = Bundle::new();
        let value: Option<u32> = bundle.get(KEY_RIB_ID).unwrap();
        assert_eq!(value, None);
        assert!(bundle.bundle(KEY_ROUTER).is_none());
    }

    #[test]
    fn wrong_shape_is_reported_with_key() {
        let mut bundle = Bundle::new();
        bundle.put(KEY_RIB_ID, "not a number").unwrap();
        let err = bundle.get::<u32>(KEY_RIB_ID).unwrap_err();
        assert!(
            matches!(&err, RibsError::MalformedState { key, .. } if key == KEY_RIB_ID),
            "unexpected error {err:?}"
        );
    }

    #[test]
    fn nested_bundles_survive_the_wire() {
        let mut router = Bundle::new();
        router.put("selected", &vec!["a", "b"]).unwrap();
        let mut node = Bundle::new();
        node.put(KEY_RIB_ID, &7_u32).unwrap();
        node.put_bundle(KEY_ROUTER, router.clone());

        let back = Bundle::from_json(&node.to_json()).unwrap();
        assert_eq!(back, node);
        assert_eq!(back.bundle(KEY_ROUTER), Some(router));
        assert_eq!(back.keys().collect::<Vec<_>>(), vec![KEY_ROUTER, KEY_RIB_ID]);
    }

    #[test]
    fn non_object_is_not_a_bundle() {
        let mut bundle = Bundle::new();
        bundle.put(KEY_ROUTER, &1_u8).unwrap();
        assert!(bundle.bundle(KEY_ROUTER).is_none());
        assert!(Bundle::from_json("[1, 2]").is_err());
    }
}
