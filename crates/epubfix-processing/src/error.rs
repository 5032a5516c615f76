use std::path::PathBuf;

use thiserror::Error;

use crate::tool::ToolOutput;

/// Failures of a single external tool invocation
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Failed to execute {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{binary} did not finish within {secs}s")]
    TimedOut { binary: String, secs: u64 },

    #[error("{binary} exited with status {code:?}: {}", .output.stderr.trim())]
    Failed {
        binary: String,
        code: Option<i32>,
        output: ToolOutput,
    },

    #[error("Invalid input path: {0}")]
    InvalidPath(PathBuf),
}

impl ToolError {
    /// Output captured before the failure, if the process ran to completion.
    pub fn output(&self) -> Option<&ToolOutput> {
        match self {
            ToolError::Failed { output, .. } => Some(output),
            _ => None,
        }
    }
}
