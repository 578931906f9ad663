//! Drop-rate expected-value analyzer and loot simulator for conquest stages

pub mod config;
pub mod efficiency;
pub mod error;
pub mod interactive;
pub mod ordering;
pub mod report;
pub mod simulation;
pub mod stage;
pub mod stats;

pub use efficiency::{best_stage_per_item, compute_efficiency, EfficiencyTable, StageEfficiency};
pub use error::{LootError, Result};
pub use simulation::{simulate, simulate_stage, FastRng};
pub use stage::{Dataset, DropPool, PoolEntry, PoolKind, Stage, StageId};
pub use stats::{Loot, SimulationOutcome, TrialStats};
