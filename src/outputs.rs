use crate::error::{CiError, Result};
use crate::state::append_delimited;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;

/// Sink for action outputs.
pub trait ActionOutputs: Send + Sync {
    fn set_output(&self, name: &str, value: &str) -> Result<()>;
}

/// Writes outputs to `$GITHUB_OUTPUT`; without it they only go to the log.
pub struct GithubOutputs {
    output_file: Option<PathBuf>,
}

impl GithubOutputs {
    pub fn new(output_file: Option<PathBuf>) -> Self {
        Self { output_file }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var_os("GITHUB_OUTPUT").map(PathBuf::from))
    }
}

impl ActionOutputs for GithubOutputs {
    fn set_output(&self, name: &str, value: &str) -> Result<()> {
        match &self.output_file {
            Some(path) => append_delimited(path, name, value)
                .map_err(|e| CiError::Other(anyhow::anyhow!("Failed to write output {}: {}", name, e))),
            None => {
                tracing::info!(name, bytes = value.len(), "GITHUB_OUTPUT not set, output not exported");
                Ok(())
            }
        }
    }
}

#[derive(Default)]
pub struct MemoryOutputs {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.values.lock().get(name).cloned()
    }
}

impl ActionOutputs for MemoryOutputs {
    fn set_output(&self, name: &str, value: &str) -> Result<()> {
        self.values.lock().insert(name.to_string(), value.to_string());
        Ok(())
    }
}
