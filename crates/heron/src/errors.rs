use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Every way an orchestration run can fail. All variants are fatal to the run.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionError(String),

    #[error("Unsupported tool result type: {0}")]
    UnsupportedResultType(String),

    #[error("Exceeded maximum tool call iterations ({0})")]
    IterationBudgetExceeded(usize),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Completion request failed: {0}")]
    Provider(String),
}

impl AgentError {
    /// True when the model kept requesting tools until the iteration bound was hit,
    /// as opposed to an infrastructure or protocol failure.
    pub fn is_budget_exhausted(&self) -> bool {
        matches!(self, AgentError::IterationBudgetExceeded(_))
    }

    /// A short stable label for the error kind, used in caller-facing error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::CatalogUnavailable(_) => "catalog_unavailable",
            AgentError::ToolExecutionError(_) => "tool_execution_error",
            AgentError::UnsupportedResultType(_) => "unsupported_result_type",
            AgentError::IterationBudgetExceeded(_) => "iteration_budget_exceeded",
            AgentError::InvalidParameters(_) => "invalid_parameters",
            AgentError::Provider(_) => "provider_error",
        }
    }
}

pub type AgentResult<T> = Result<T, AgentError>;
