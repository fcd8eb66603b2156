//! Database configuration

use crate::error::ConfigError;
use reflect_model::Profile;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// What a second load does on an already loaded database
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReloadPolicy {
    /// Fail and keep the current image
    #[default]
    Reject,
    /// Load the new image fully, then swap it in and free the old one
    Replace,
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Behavior of a second load
    pub reload: ReloadPolicy,
    /// Profile every loaded image must satisfy
    pub profile: Profile,
    /// Run structural validation after decoding
    pub verify_on_load: bool,
    /// Reject payloads larger than this many bytes
    pub max_image_bytes: Option<u64>,
}

impl DatabaseConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With reload policy
    #[inline]
    #[must_use]
    pub fn with_reload(mut self, reload: ReloadPolicy) -> Self {
        self.reload = reload;
        self
    }

    /// With required profile
    #[inline]
    #[must_use]
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// With or without post-decode validation
    #[inline]
    #[must_use]
    pub fn with_verify_on_load(mut self, verify: bool) -> Self {
        self.verify_on_load = verify;
        self
    }

    /// With payload size limit
    #[inline]
    #[must_use]
    pub fn with_max_image_bytes(mut self, max: u64) -> Self {
        self.max_image_bytes = Some(max);
        self
    }

    /// Parse from TOML text; missing keys take their defaults
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for this structure
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            reload: ReloadPolicy::Reject,
            profile: Profile::Full,
            verify_on_load: true,
            max_image_bytes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = DatabaseConfig::new();
        assert_eq!(config.reload, ReloadPolicy::Reject);
        assert_eq!(config.profile, Profile::Full);
        assert!(config.verify_on_load);
        assert_eq!(config.max_image_bytes, None);
    }

    #[test]
    fn config_builder() {
        let config = DatabaseConfig::new()
            .with_reload(ReloadPolicy::Replace)
            .with_profile(Profile::Reduced)
            .with_verify_on_load(false)
            .with_max_image_bytes(1 << 20);

        assert_eq!(config.reload, ReloadPolicy::Replace);
        assert_eq!(config.profile, Profile::Reduced);
        assert!(!config.verify_on_load);
        assert_eq!(config.max_image_bytes, Some(1 << 20));
    }

    #[test]
    fn config_from_toml() {
        let config = DatabaseConfig::from_toml_str(
            r#"
            reload = "replace"
            profile = "reduced"
            max_image_bytes = 4096
            "#,
        )
        .unwrap();

        assert_eq!(config.reload, ReloadPolicy::Replace);
        assert_eq!(config.profile, Profile::Reduced);
        assert!(config.verify_on_load);
        assert_eq!(config.max_image_bytes, Some(4096));
    }

    #[test]
    fn config_from_empty_toml_is_default() {
        assert_eq!(DatabaseConfig::from_toml_str("").unwrap(), DatabaseConfig::default());
    }

    #[test]
    fn config_rejects_unknown_policy() {
        assert!(DatabaseConfig::from_toml_str("reload = \"sometimes\"").is_err());
    }
}
