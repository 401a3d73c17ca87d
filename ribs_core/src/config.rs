// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree-wide configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RibsError};

/// Configuration of a [`RibTree`](crate::RibTree).
///
/// Hosts usually ship it as JSON next to the rest of their settings:
///
/// ```
/// use ribs_core::RibsConfig;
///
/// let config = RibsConfig::from_json(r#"{ "retained_backstack_depth": 2 }"#).unwrap();
/// assert_eq!(config.retained_backstack_depth, Some(2));
/// assert_eq!(config.request_code_bits, 8);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RibsConfig {
    /// Low bits of a request code that carry the caller's code. The remaining high bits
    /// carry the rib id of the requesting node. Must be in `1..=24`.
    pub request_code_bits: u32,
    /// Number of backstack entries below the top that stay instantiated.
    ///
    /// Deeper entries are saved, torn down and resolved again when they come back on top.
    /// `None` keeps every entry instantiated.
    pub retained_backstack_depth: Option<usize>,
    /// Emit attach/detach/back-press breadcrumbs at `debug` level.
    pub breadcrumbs: bool,
}

impl Default for RibsConfig {
    fn default() -> Self {
        Self {
            request_code_bits: 8,
            retained_backstack_depth: None,
            breadcrumbs: true,
        }
    }
}

impl RibsConfig {
    /// Parse and validate a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RibsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(1..=24).contains(&self.request_code_bits) {
            return Err(RibsError::InvalidConfig(format!(
                "request_code_bits must be in 1..=24, got {}",
                self.request_code_bits
            )));
        }
        Ok(())
    }

    /// Set [`RibsConfig::request_code_bits`].
    #[must_use]
    pub fn with_request_code_bits(mut self, bits: u32) -> Self {
        self.request_code_bits = bits;
        self
    }

    /// Set [`RibsConfig::retained_backstack_depth`].
    #[must_use]
    pub fn with_retained_backstack_depth(mut self, depth: Option<usize>) -> Self {
        self.retained_backstack_depth = depth;
        self
    }

    /// Set [`RibsConfig::breadcrumbs`].
    #[must_use]
    pub fn with_breadcrumbs(mut self, breadcrumbs: bool) -> Self {
        self.breadcrumbs = breadcrumbs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        assert_eq!(RibsConfig::from_json("{}").unwrap(), RibsConfig::default());
    }

    #[test]
    fn rejects_out_of_range_bits() {
        let err = RibsConfig::from_json(r#"{ "request_code_bits": 0 }"#).unwrap_err();
        assert!(matches!(err, RibsError::InvalidConfig(_)), "{err:?}");
        assert!(RibsConfig::default().with_request_code_bits(25).validate().is_err());
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(RibsConfig::from_json(r#"{ "retain": 1 }"#).is_err());
    }
}
