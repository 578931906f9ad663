//! Error type shared by the dataset loader and the simulator

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LootError {
    #[error("unknown stage: {boss}-{difficulty}")]
    UnknownStage { boss: String, difficulty: String },

    #[error("simulation of {stage} aborted in pool '{category}': {reason}")]
    SimulationAborted {
        stage: String,
        category: String,
        reason: String,
    },

    #[error("not enough stamina for {stage}: need {required}, have {available}")]
    InsufficientStamina {
        stage: String,
        required: u32,
        available: u64,
    },

    #[error("{runs} runs of {stage} would spend more stamina than can be counted")]
    RunCountTooLarge { stage: String, runs: u64 },

    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LootError {
    /// Failures scoped to a single request; the caller can prompt again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            LootError::UnknownStage { .. }
                | LootError::InsufficientStamina { .. }
                | LootError::SimulationAborted { .. }
                | LootError::RunCountTooLarge { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LootError>;
