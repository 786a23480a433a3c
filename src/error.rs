/// devcontainer-ci error types and handling utilities
use thiserror::Error;

/// Main error type for phase orchestration
#[derive(Debug, Error)]
pub enum CiError {
    /// Malformed mount specification
    #[error("{message}")]
    Parse { message: String },
    /// Unexpected input value, e.g. an unknown push mode
    #[error("Configuration error: {message}")]
    Configuration { message: String },
    /// A build, run, push or copy collaborator reported failure
    #[error("{operation} failed: {message} (code: {code}){}", describe(.description))]
    Collaborator {
        operation: String,
        message: String,
        description: Option<String>,
        code: i32,
    },
    /// Multi-arch manifest merge exited non-zero
    #[error("manifest creation failed with {code}")]
    Manifest { code: i32 },
    /// Optional tooling is missing from the runner
    #[error("{tool} is not available")]
    EnvironmentUnavailable { tool: String },
    /// Phase state could not be persisted or restored
    #[error("Phase state error in {operation}: {reason}")]
    State { operation: String, reason: String },
    /// Wrapped anyhow error for compatibility
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn describe(description: &Option<String>) -> String {
    match description {
        Some(d) if !d.is_empty() => format!(": {}", d),
        _ => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, CiError>;

impl CiError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn state(operation: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::State {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }
}

/// Whether an error must fail the run. Missing optional tooling only skips it.
pub fn is_fatal(err: &CiError) -> bool {
    match err {
        CiError::EnvironmentUnavailable { .. } => false,
        CiError::Parse { .. } => true,
        CiError::Configuration { .. } => true,
        CiError::Collaborator { .. } => true,
        CiError::Manifest { .. } => true,
        CiError::State { .. } => true,
        CiError::Other(_) => true,
    }
}
