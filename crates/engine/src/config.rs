//! Sequence configuration loaded from YAML or JSON.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::diagram::DiagramStyle;

pub use crate::graph::SortOptions;

/// Settings of a [`Sequence`](crate::sequence::Sequence).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Name of the sequence and of its binding store.
    pub name: String,
    /// How diagrams are drawn.
    pub diagram: DiagramStyle,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            name: "sequence".to_string(),
            diagram: DiagramStyle::default(),
        }
    }
}

impl SequenceConfig {
    /// Parse a YAML (or JSON, which YAML accepts) document. Missing fields take defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("invalid sequence configuration")
    }
}

/// Load a [`SequenceConfig`] from `path`.
///
/// # Errors
///
/// Fails when the file cannot be read or does not contain a valid configuration document.
pub fn load_sequence_config(path: impl AsRef<Path>) -> Result<SequenceConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read sequence config: {}", path.display()))?;
    SequenceConfig::from_yaml_str(&content).with_context(|| format!("Failed to parse sequence config: {}", path.display()))
}
