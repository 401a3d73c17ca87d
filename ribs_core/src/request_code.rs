// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rib id and request code allocation.
//!
//! Every node gets a group id (its rib id). Request codes a node hands to the host pack
//! the group id into the high bits and the caller's code into the low bits, so a result
//! coming back from the host can be routed to the node that asked for it.
//!
//! The registry is owned by the [`RibTree`](crate::RibTree) it serves; there is no
//! process-wide registry.

use std::collections::{HashMap, HashSet};

use crate::error::{Result, RibsError};

/// Allocator of rib ids and request codes.
///
/// ```
/// use ribs_core::RequestCodeRegistry;
///
/// let mut registry = RequestCodeRegistry::new(8);
/// let code = registry.generate_request_code("Profile.1", 3).unwrap();
/// assert_eq!(registry.code_of(code), 3);
/// assert_eq!(Some(registry.group_of(code)), registry.group_id("Profile.1"));
/// ```
#[derive(Clone, Debug)]
pub struct RequestCodeRegistry {
    bits: u32,
    next: u32,
    groups: HashMap<String, u32>,
    taken: HashSet<u32>,
}

impl RequestCodeRegistry {
    /// Registry whose request codes carry `bits` bits of caller code.
    ///
    /// `bits` is clamped to `1..=31` so at least one bit is left on each side.
    pub fn new(bits: u32) -> Self {
        Self {
            bits: bits.clamp(1, u32::BITS - 1),
            next: 1,
            groups: HashMap::new(),
            taken: HashSet::new(),
        }
    }

    /// Bits reserved for the caller's code.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    fn code_mask(&self) -> u32 {
        (1_u32 << self.bits) - 1
    }

    fn max_group(&self) -> u32 {
        u32::MAX >> self.bits
    }

    /// Group id of `tag`, allocating one on first use.
    pub fn generate_group_id(&mut self, tag: &str) -> Result<u32> {
        if let Some(group) = self.groups.get(tag) {
            return Ok(*group);
        }
        while self.taken.contains(&self.next) {
            self.next += 1;
        }
        if self.next > self.max_group() {
            return Err(RibsError::GroupIdsExhausted { bits: self.bits });
        }
        let group = self.next;
        self.next += 1;
        self.groups.insert(tag.to_owned(), group);
        self.taken.insert(group);
        Ok(group)
    }

    /// Record a restored group id so it is never handed to another tag.
    pub fn reserve(&mut self, tag: &str, group: u32) {
        if let Some(previous) = self.groups.insert(tag.to_owned(), group) {
            self.taken.remove(&previous);
        }
        self.taken.insert(group);
    }

    /// Forget `tag`. Its group id is not reused.
    pub fn release(&mut self, tag: &str) {
        if let Some(group) = self.groups.remove(tag) {
            self.taken.remove(&group);
        }
    }

    /// Group id currently held by `tag`.
    pub fn group_id(&self, tag: &str) -> Option<u32> {
        self.groups.get(tag).copied()
    }

    /// Request code combining the group id of `tag` with `code`.
    pub fn generate_request_code(&mut self, tag: &str, code: u32) -> Result<u32> {
        if code > self.code_mask() {
            return Err(RibsError::RequestCodeOverflow {
                code,
                bits: self.bits,
            });
        }
        let group = self.generate_group_id(tag)?;
        Ok((group << self.bits) | code)
    }

    /// Group id packed into a request code.
    pub fn group_of(&self, request_code: u32) -> u32 {
        request_code >> self.bits
    }

    /// Caller code packed into a request code.
    pub fn code_of(&self, request_code: u32) -> u32 {
        request_code & self.code_mask()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_ids_are_stable_per_tag() {
        let mut registry = RequestCodeRegistry::new(8);
        let a = registry.generate_group_id("a").unwrap();
        let b = registry.generate_group_id("b").unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.generate_group_id("a").unwrap(), a);
    }

    #[test]
    fn reserved_ids_are_skipped() {
        let mut registry = RequestCodeRegistry::new(8);
        registry.reserve("restored", 1);
        registry.reserve("restored-too", 2);
        assert_eq!(registry.generate_group_id("fresh").unwrap(), 3);
    }

    #[test]
    fn code_must_fit() {
        let mut registry = RequestCodeRegistry::new(4);
        assert!(registry.generate_request_code("a", 15).is_ok());
        let err = registry.generate_request_code("a", 16).unwrap_err();
        assert!(
            matches!(err, RibsError::RequestCodeOverflow { code: 16, bits: 4 }),
            "{err:?}"
        );
    }

    #[test]
    fn group_space_runs_out() {
        let mut registry = RequestCodeRegistry::new(30);
        // Groups 1..=3 fit in the two remaining bits.
        for tag in ["a", "b", "c"] {
            registry.generate_group_id(tag).unwrap();
        }
        assert!(matches!(
            registry.generate_group_id("d"),
            Err(RibsError::GroupIdsExhausted { bits: 30 })
        ));
    }

    #[test]
    fn bit_split_is_clamped() {
        let mut wide = RequestCodeRegistry::new(32);
        assert_eq!(wide.bits(), 31);
        let code = wide.generate_request_code("a", 5).unwrap();
        assert_eq!(wide.code_of(code), 5);
        assert_eq!(Some(wide.group_of(code)), wide.group_id("a"));

        let mut narrow = RequestCodeRegistry::new(0);
        assert_eq!(narrow.bits(), 1);
        assert!(narrow.generate_request_code("a", 1).is_ok());
        assert!(narrow.generate_request_code("a", 2).is_err());
    }

    #[test]
    fn released_tag_gets_a_new_id() {
        let mut registry = RequestCodeRegistry::new(8);
        let first = registry.generate_group_id("a").unwrap();
        registry.release("a");
        assert_eq!(registry.group_id("a"), None);
        assert_ne!(registry.generate_group_id("a").unwrap(), first);
    }
}
