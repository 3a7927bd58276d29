use thiserror::Error;

use crate::validation::ValidationReport;

/// Failure taxonomy of the analysis pipeline.
///
/// `DataIntegrity` aborts the whole run at the validator boundary and carries
/// the full report so every offending record is enumerated once, in one
/// place. `InsufficientData` is scoped to a single entity (one player, one
/// statistic, or the global pool) and must never take sibling computations
/// down with it.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("season data failed integrity validation\n{0}")]
    DataIntegrity(Box<ValidationReport>),

    #[error("insufficient data for {entity}: {observed} eligible games, need at least {required}")]
    InsufficientData {
        entity: String,
        observed: usize,
        required: usize,
    },
}

impl AnalysisError {
    pub fn insufficient(entity: impl Into<String>, observed: usize, required: usize) -> Self {
        AnalysisError::InsufficientData {
            entity: entity.into(),
            observed,
            required,
        }
    }
}
