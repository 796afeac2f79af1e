use std::fmt;
use std::io;

use crate::pipeline::StageFailure;

/// Failure of a single pipeline run.
#[derive(Debug)]
pub enum PipelineError {
    /// A pipeline needs a producer and a terminal stage.
    TooShort(usize),
    /// A stage's program could not be found on PATH. Stages after it were
    /// never started.
    MissingTool { program: String, source: io::Error },
    /// The OS refused to start a stage for a reason other than a missing
    /// executable.
    Spawn { program: String, source: io::Error },
    /// Allocating the pipe between two stages failed.
    PipeSetup(io::Error),
    /// Waiting on a started stage failed.
    Wait { program: String, source: io::Error },
    /// One or more stages exited unsuccessfully.
    StagesFailed(Vec<StageFailure>),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::TooShort(len) => {
                write!(f, "a pipeline needs at least two stages, got {len}")
            }
            PipelineError::MissingTool { program, source } => write!(
                f,
                "Couldn't find a tool needed by our query plan\nPerhaps you need to install '{program}'\n{source}"
            ),
            PipelineError::Spawn { program, source } => {
                write!(f, "failed to start '{program}': {source}")
            }
            PipelineError::PipeSetup(source) => {
                write!(f, "failed to allocate pipeline pipe: {source}")
            }
            PipelineError::Wait { program, source } => {
                write!(f, "failed to wait for '{program}': {source}")
            }
            PipelineError::StagesFailed(failures) => {
                write!(f, "pipeline failed:")?;
                for failure in failures {
                    write!(f, " [{failure}]")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::MissingTool { source, .. }
            | PipelineError::Spawn { source, .. }
            | PipelineError::Wait { source, .. } => Some(source),
            PipelineError::PipeSetup(source) => Some(source),
            PipelineError::TooShort(_) | PipelineError::StagesFailed(_) => None,
        }
    }
}
