//! Cloner configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Strategy selection settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClonerConfig {
    /// Types with at most this many members clone structurally
    pub max_structural_members: usize,
    /// Use the serializer for types above the member limit
    pub serializer_fallback: bool,
}

impl ClonerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With member limit
    #[inline]
    #[must_use]
    pub fn with_max_structural_members(mut self, max: usize) -> Self {
        self.max_structural_members = max;
        self
    }

    /// With serializer fallback enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_serializer_fallback(mut self, enabled: bool) -> Self {
        self.serializer_fallback = enabled;
        self
    }

    /// Parse from TOML; missing keys keep their defaults
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed input
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }
}

impl Default for ClonerConfig {
    fn default() -> Self {
        Self {
            max_structural_members: 10,
            serializer_fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ClonerConfig::new();
        assert_eq!(config.max_structural_members, 10);
        assert!(config.serializer_fallback);
    }

    #[test]
    fn toml_partial_override() {
        let config = ClonerConfig::from_toml_str("max_structural_members = 4").unwrap();
        assert_eq!(config.max_structural_members, 4);
        assert!(config.serializer_fallback);
    }

    #[test]
    fn toml_rejects_wrong_type() {
        assert!(ClonerConfig::from_toml_str("serializer_fallback = \"yes\"").is_err());
    }

    #[test]
    fn builder_setters() {
        let config = ClonerConfig::new()
            .with_max_structural_members(2)
            .with_serializer_fallback(false);
        assert_eq!(config.max_structural_members, 2);
        assert!(!config.serializer_fallback);
    }
}
