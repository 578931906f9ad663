//! Expected drop quantity per stamina, per item and stage

use crate::stage::{Stage, StageId};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageEfficiency {
    pub stage: StageId,
    /// Expected quantity per point of stamina
    pub efficiency: f64,
}

/// Item -> per-stage efficiency, stages in dataset order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EfficiencyTable {
    items: BTreeMap<String, Vec<StageEfficiency>>,
}

impl EfficiencyTable {
    pub fn items(&self) -> impl Iterator<Item = (&String, &[StageEfficiency])> {
        self.items.iter().map(|(item, stages)| (item, stages.as_slice()))
    }

    pub fn stages_for(&self, item: &str) -> Option<&[StageEfficiency]> {
        self.items.get(item).map(Vec::as_slice)
    }

    pub fn get(&self, item: &str, stage: &StageId) -> Option<f64> {
        self.stages_for(item)?
            .iter()
            .find(|s| &s.stage == stage)
            .map(|s| s.efficiency)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Expected yield of one clear of `stage`, per item.
///
/// `quantity * probability` is used for bundle pools too: their entries carry
/// probability 1.0, and expectation is linear over the granted entries.
pub fn stage_expected_yield(stage: &Stage) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for pool in &stage.pools {
        let rolls = pool.rolls as f64;
        for entry in pool.entries() {
            *totals.entry(entry.item.clone()).or_insert(0.0) += entry.expected_quantity() * rolls;
        }
    }
    totals
}

/// Build the efficiency table for every item dropped by any stage
pub fn compute_efficiency(stages: &[Stage]) -> EfficiencyTable {
    let mut table = EfficiencyTable::default();
    for stage in stages {
        let stamina = stage.stamina as f64;
        for (item, total) in stage_expected_yield(stage) {
            table.items.entry(item).or_default().push(StageEfficiency {
                stage: stage.id.clone(),
                efficiency: total / stamina,
            });
        }
    }
    table
}

/// Highest-efficiency stage for each item.
///
/// Ties keep the stage seen first in dataset order. Items with no recorded
/// stage are left out.
pub fn best_stage_per_item(table: &EfficiencyTable) -> BTreeMap<String, StageEfficiency> {
    let mut best = BTreeMap::new();
    for (item, stages) in table.items() {
        let Some(first) = stages.first() else {
            continue;
        };
        let winner = stages
            .iter()
            .skip(1)
            .fold(first, |acc, s| if s.efficiency > acc.efficiency { s } else { acc });
        best.insert(item.clone(), winner.clone());
    }
    best
}
