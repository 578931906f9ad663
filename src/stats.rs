//! Simulation result statistics

use crate::efficiency::stage_expected_yield;
use crate::stage::{Stage, StageId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Item counts accumulated over one simulation call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Loot {
    items: BTreeMap<String, u64>,
}

impl Loot {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, item: &str, quantity: u64) {
        match self.items.get_mut(item) {
            Some(count) => *count += quantity,
            None => {
                self.items.insert(item.to_string(), quantity);
            }
        }
    }

    pub fn get(&self, item: &str) -> u64 {
        self.items.get(item).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.items.iter().map(|(item, &count)| (item.as_str(), count))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all item quantities
    pub fn total(&self) -> u64 {
        self.items.values().sum()
    }
}

/// Results from one call to the simulator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationOutcome {
    pub stage: StageId,
    pub runs: u64,
    pub stamina_spent: u64,
    pub loot: Loot,
}

impl SimulationOutcome {
    /// Realized yield per stamina for `item`
    pub fn per_stamina(&self, item: &str) -> f64 {
        if self.stamina_spent > 0 {
            self.loot.get(item) as f64 / self.stamina_spent as f64
        } else {
            0.0
        }
    }
}

/// Spread of one item's yield across trials
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemStats {
    pub mean: f64,
    pub std: f64,
    pub min: u64,
    pub max: u64,
    pub mean_per_stamina: f64,
    /// Theoretical expected quantity per stamina for the stage
    pub expected_per_stamina: f64,
}

/// Aggregated statistics from repeated simulation calls on one stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialStats {
    pub stage: StageId,
    pub trials: usize,
    pub runs_per_trial: u64,
    pub stamina_per_trial: u64,
    pub items: BTreeMap<String, ItemStats>,
}

impl TrialStats {
    /// Aggregate outcomes of `stage`. Every item the stage can drop is listed,
    /// and trials that missed an item count it as zero.
    pub fn from_outcomes(
        stage: &Stage,
        runs_per_trial: u64,
        outcomes: &[SimulationOutcome],
    ) -> Self {
        // The simulator rejects run counts that overflow; clamp for direct callers
        let stamina_per_trial = (stage.stamina as u64).saturating_mul(runs_per_trial);
        let expected = stage_expected_yield(stage);

        let mut names: Vec<&str> = expected.keys().map(String::as_str).collect();
        for outcome in outcomes {
            for (item, _) in outcome.loot.iter() {
                if !names.contains(&item) {
                    names.push(item);
                }
            }
        }

        let mut items = BTreeMap::new();
        if !outcomes.is_empty() {
            let n = outcomes.len() as f64;
            for name in names {
                let counts: Vec<u64> = outcomes.iter().map(|o| o.loot.get(name)).collect();
                let mean = counts.iter().sum::<u64>() as f64 / n;
                let variance = counts
                    .iter()
                    .map(|&c| (c as f64 - mean).powi(2))
                    .sum::<f64>()
                    / n;
                let mean_per_stamina = if stamina_per_trial > 0 {
                    mean / stamina_per_trial as f64
                } else {
                    0.0
                };
                let expected_per_stamina =
                    expected.get(name).copied().unwrap_or(0.0) / stage.stamina as f64;

                items.insert(
                    name.to_string(),
                    ItemStats {
                        mean,
                        std: variance.sqrt(),
                        min: *counts.iter().min().unwrap_or(&0),
                        max: *counts.iter().max().unwrap_or(&0),
                        mean_per_stamina,
                        expected_per_stamina,
                    },
                );
            }
        }

        Self {
            stage: stage.id.clone(),
            trials: outcomes.len(),
            runs_per_trial,
            stamina_per_trial,
            items,
        }
    }
}
