//! Configuration structures for loading drop-table YAML files

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Drop table shipped with the binary
pub const BUILTIN_DATASET: &str = include_str!("../data/conquest.yaml");

/// One entry of a drop pool as written in the data file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryConfig {
    pub item: String,
    pub quantity: u32,
    pub prob: f64,
}

/// A named drop pool; `rolls` defaults to a single draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub category: String,
    #[serde(default = "default_rolls")]
    pub rolls: u32,
    pub pool: Vec<EntryConfig>,
}

fn default_rolls() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyConfig {
    pub name: String,
    pub stamina: u32,
    pub drops: Vec<PoolConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BossConfig {
    pub name: String,
    pub difficulties: Vec<DifficultyConfig>,
}

/// Full drop table loaded from YAML/JSON.
///
/// Lists rather than maps are used throughout so the file order of bosses,
/// difficulties and pools survives deserialization; best-stage tie-breaks
/// depend on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub bosses: Vec<BossConfig>,
}

impl DatasetConfig {
    /// The embedded conquest table
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_DATASET)
    }

    /// Load a drop table from a YAML or JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let path_str = path.as_ref().to_string_lossy().to_lowercase();

        if path_str.ends_with(".json") {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: DatasetConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: DatasetConfig = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Number of (boss, difficulty) stages described
    pub fn stage_count(&self) -> usize {
        self.bosses.iter().map(|b| b.difficulties.len()).sum()
    }
}
