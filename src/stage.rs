//! Validated stage model built once from the raw drop table

use crate::config::{DatasetConfig, PoolConfig};
use crate::error::{LootError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Probability sum above which a pool grants every entry instead of drawing one
pub const BUNDLE_THRESHOLD: f64 = 1.01;

/// (boss, difficulty) pair identifying a stage
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct StageId {
    pub boss: String,
    pub difficulty: String,
}

impl StageId {
    pub fn new(boss: impl Into<String>, difficulty: impl Into<String>) -> Self {
        Self {
            boss: boss.into(),
            difficulty: difficulty.into(),
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.boss, self.difficulty)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoolEntry {
    pub item: String,
    pub quantity: u32,
    pub probability: f64,
}

impl PoolEntry {
    /// Expected quantity from one roll of the owning pool
    #[inline]
    pub fn expected_quantity(&self) -> f64 {
        self.quantity as f64 * self.probability
    }
}

/// How a pool hands out its entries
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "entries", rename_all = "lowercase")]
pub enum PoolKind {
    /// One weighted draw per roll
    Weighted(Vec<PoolEntry>),
    /// Every entry granted once per roll
    Bundle(Vec<PoolEntry>),
}

impl PoolKind {
    /// Tag entries by their probability sum. The EV engine and the simulator
    /// both read this tag, so the threshold is applied in one place only.
    pub fn classify(entries: Vec<PoolEntry>) -> Self {
        if probability_sum(&entries) > BUNDLE_THRESHOLD {
            PoolKind::Bundle(entries)
        } else {
            PoolKind::Weighted(entries)
        }
    }

    pub fn entries(&self) -> &[PoolEntry] {
        match self {
            PoolKind::Weighted(entries) | PoolKind::Bundle(entries) => entries,
        }
    }

    pub fn is_bundle(&self) -> bool {
        matches!(self, PoolKind::Bundle(_))
    }
}

pub fn probability_sum(entries: &[PoolEntry]) -> f64 {
    entries.iter().map(|e| e.probability).sum()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DropPool {
    pub category: String,
    pub rolls: u32,
    pub kind: PoolKind,
}

impl DropPool {
    pub fn entries(&self) -> &[PoolEntry] {
        self.kind.entries()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stage {
    pub id: StageId,
    pub stamina: u32,
    pub pools: Vec<DropPool>,
}

/// All stages in file order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub stages: Vec<Stage>,
}

impl Dataset {
    /// Validate a raw drop table. Any malformed stage rejects the whole table
    /// so nothing is discovered mid-simulation.
    pub fn from_config(config: &DatasetConfig) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut stages = Vec::with_capacity(config.stage_count());

        for boss in &config.bosses {
            for difficulty in &boss.difficulties {
                let id = StageId::new(&boss.name, &difficulty.name);
                if !seen.insert(id.clone()) {
                    return Err(invalid(&id, "duplicate stage"));
                }
                if difficulty.stamina == 0 {
                    return Err(invalid(&id, "stamina cost must be at least 1"));
                }
                if difficulty.drops.is_empty() {
                    return Err(invalid(&id, "no drop pools"));
                }

                let pools = difficulty
                    .drops
                    .iter()
                    .map(|pool| build_pool(&id, pool))
                    .collect::<Result<Vec<_>>>()?;

                stages.push(Stage {
                    id,
                    stamina: difficulty.stamina,
                    pools,
                });
            }
        }

        if stages.is_empty() {
            return Err(LootError::InvalidDataset("no stages defined".into()));
        }
        log::debug!("validated {} stages", stages.len());
        Ok(Self { stages })
    }

    /// The embedded conquest table, validated
    pub fn builtin() -> Result<Self> {
        Self::from_config(&DatasetConfig::builtin()?)
    }

    pub fn stage(&self, boss: &str, difficulty: &str) -> Result<&Stage> {
        self.stages
            .iter()
            .find(|s| s.id.boss == boss && s.id.difficulty == difficulty)
            .ok_or_else(|| LootError::UnknownStage {
                boss: boss.to_string(),
                difficulty: difficulty.to_string(),
            })
    }

    pub fn get(&self, id: &StageId) -> Result<&Stage> {
        self.stage(&id.boss, &id.difficulty)
    }

    pub fn has_boss(&self, boss: &str) -> bool {
        self.stages.iter().any(|s| s.id.boss == boss)
    }

    /// Boss names, first appearance order
    pub fn bosses(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for stage in &self.stages {
            if !names.contains(&stage.id.boss.as_str()) {
                names.push(&stage.id.boss);
            }
        }
        names
    }

    pub fn difficulties(&self, boss: &str) -> Vec<&str> {
        self.stages
            .iter()
            .filter(|s| s.id.boss == boss)
            .map(|s| s.id.difficulty.as_str())
            .collect()
    }
}

fn build_pool(stage: &StageId, pool: &PoolConfig) -> Result<DropPool> {
    let where_ = format!("pool '{}'", pool.category);
    if pool.rolls == 0 {
        return Err(invalid(stage, &format!("{where_}: rolls must be at least 1")));
    }
    if pool.pool.is_empty() {
        return Err(invalid(stage, &format!("{where_}: no entries")));
    }

    let mut entries = Vec::with_capacity(pool.pool.len());
    for entry in &pool.pool {
        if entry.quantity == 0 {
            return Err(invalid(
                stage,
                &format!("{where_}: '{}' has zero quantity", entry.item),
            ));
        }
        if !entry.prob.is_finite() || !(0.0..=1.0).contains(&entry.prob) {
            let message = format!(
                "{where_}: '{}' has probability {} outside [0, 1]",
                entry.item, entry.prob
            );
            return Err(invalid(stage, &message));
        }
        entries.push(PoolEntry {
            item: entry.item.clone(),
            quantity: entry.quantity,
            probability: entry.prob,
        });
    }

    let kind = PoolKind::classify(entries);
    if probability_sum(kind.entries()) == 0.0 {
        log::warn!("{stage} {where_}: all weights are zero, it will never drop");
    }

    Ok(DropPool {
        category: pool.category.clone(),
        rolls: pool.rolls,
        kind,
    })
}

fn invalid(stage: &StageId, message: &str) -> LootError {
    LootError::InvalidDataset(format!("{stage}: {message}"))
}
