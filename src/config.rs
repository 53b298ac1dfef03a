use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IoResultExt, Result};
use crate::rules::RuleTable;
use crate::types::Side;

/// repository configuration stored in config.toml
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub merge: MergePolicy,
    /// severity rules, overriding the built-in table key by key
    #[serde(default)]
    pub rules: RuleTable,
}

impl Config {
    /// load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).with_path(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).with_path(path)?;
        Ok(())
    }
}

/// merge behavior knobs
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergePolicy {
    /// side taken by rules whose suggestion is `default_side`
    pub default_side: Side,
    /// apply suggestions automatically when starting a merge
    pub auto_resolve: bool,
    /// minimum similarity (0..=1) for a removed/added pair to be reported as a rename
    pub rename_similarity: f64,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            default_side: Side::Theirs,
            auto_resolve: false,
            rename_similarity: 0.9,
        }
    }
}
