//! Error types for the model gateway and pipeline stages

use thiserror::Error;

/// Pipeline stage that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Gatekeeper,
    Analyst,
    Guardian,
    EmailComposer,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Gatekeeper => "Gatekeeper",
            Stage::Analyst => "Analyst",
            Stage::Guardian => "Guardian",
            Stage::EmailComposer => "EmailComposer",
        };
        write!(f, "{}", name)
    }
}

/// Pipeline error type
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No API keys configured")]
    NoCredentials,

    #[error("All keys exhausted or rate limited after {attempts} attempts: {last}")]
    RateLimited { attempts: usize, last: String },

    #[error("Upstream model error: {0}")]
    Upstream(String),

    #[error("Model reply is not valid JSON: {0}")]
    Parse(String),

    #[error("Schema validation failed: {0}")]
    Schema(String),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Wrap an error with the stage it occurred in. Already-wrapped errors
    /// keep their original stage.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            PipelineError::Stage { .. } => self,
            other => PipelineError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage attribution, when present
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<orc_core::CoreError> for PipelineError {
    fn from(e: orc_core::CoreError) -> Self {
        PipelineError::Schema(e.to_string())
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
