//! Link configuration.
//!
//! Embedders usually deserialize this from a build manifest; everything has a
//! default so partial TOML documents work.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lattice_core::IdentifierSet;

/// Configuration for one load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Roots whose files must be emitted by some target.
    pub source_roots: Vec<String>,
    /// Roots whose files exist purely to satisfy references.
    pub proto_roots: Vec<String>,
    /// Include patterns for pruning. Empty keeps everything.
    pub roots: Vec<String>,
    /// Exclude patterns for pruning.
    pub prunes: Vec<String>,
    /// Profile to resolve after loading, if any.
    pub profile: Option<String>,
    /// Downgrade package-cycle rejection to a warning.
    pub permit_package_cycles: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl LinkConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// The prune selection this configuration describes.
    pub fn identifier_set(&self) -> IdentifierSet {
        IdentifierSet::new(self.roots.clone(), self.prunes.clone())
    }
}
