use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::pipeline::{RunError, Stage};
use crate::plan::PlanParseError;

/// Everything that can stop a planning or validation run.
#[derive(Debug, Error)]
pub enum SolverError {
    /// `get_plan` / `is_domain_valid` called before `configure`.
    #[error("solver has not been configured")]
    NotConfigured,

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The namespace tried to climb out of the output directory.
    #[error("invalid namespace {0:?}: parent-directory components are not allowed")]
    InvalidNamespace(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The stage's program could not be started or waited on.
    #[error("failed to {stage}: {source}")]
    Launch {
        stage: Stage,
        #[source]
        source: RunError,
    },

    /// The stage ran but reported failure through its exit status.
    #[error("{stage} exited with {}: {stderr}", describe_exit(.exit_code))]
    StageFailed {
        stage: Stage,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{stage} exceeded the solver timeout")]
    StageTimedOut { stage: Stage },

    #[error(transparent)]
    PlanParse(#[from] PlanParseError),

    #[error("could not extract domain name from domain file")]
    DomainNameNotFound,
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {c}"),
        None => "signal".to_owned(),
    }
}

impl SolverError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Map a runner failure for `stage`, keeping timeouts distinct.
    pub(crate) fn from_run(stage: Stage, source: RunError) -> Self {
        match source {
            RunError::TimedOut { .. } => Self::StageTimedOut { stage },
            other => Self::Launch {
                stage,
                source: other,
            },
        }
    }
}
