use crate::error::{CiError, Result};
use crate::mount::MountSpec;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

pub mod devcontainer;
pub mod process;
pub mod publish;

pub use devcontainer::DevContainerCliTool;
pub use process::ProcessExec;
pub use publish::CliPublisher;

#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Suppress echoing the invocation to the log
    pub silent: bool,
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs one external program to completion.
#[async_trait]
pub trait Exec: Send + Sync {
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        options: &ExecOptions,
    ) -> anyhow::Result<ExecResult>;
}

/// Result reported by the devcontainer CLI for `build` and `up`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    Error {
        message: String,
        description: Option<String>,
        code: i32,
    },
}

impl BuildOutcome {
    pub fn into_result(self, operation: &str) -> Result<()> {
        match self {
            Self::Success => Ok(()),
            Self::Error {
                message,
                description,
                code,
            } => Err(CiError::Collaborator {
                operation: operation.to_string(),
                message,
                description,
                code,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildArgs {
    pub workspace_folder: PathBuf,
    pub config_file: Option<PathBuf>,
    pub image_name: Vec<String>,
    pub platform: Option<String>,
    pub additional_cache_froms: Vec<String>,
    pub user_data_folder: Option<PathBuf>,
    pub output: Option<String>,
    pub no_cache: bool,
    pub cache_to: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpArgs {
    pub workspace_folder: PathBuf,
    pub config_file: Option<PathBuf>,
    pub additional_mounts: Vec<MountSpec>,
    pub env: Vec<String>,
    pub skip_container_user_id_update: bool,
    pub user_data_folder: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecArgs {
    pub workspace_folder: PathBuf,
    pub config_file: Option<PathBuf>,
    pub command: Vec<String>,
    pub env: Vec<String>,
    pub user_data_folder: Option<PathBuf>,
}

/// The devcontainer build/up/exec tool.
#[async_trait]
pub trait DevContainerCli: Send + Sync {
    async fn is_installed(&self) -> bool;
    async fn install(&self, version: &str) -> anyhow::Result<()>;
    async fn build(&self, args: &BuildArgs) -> anyhow::Result<BuildOutcome>;
    async fn up(&self, args: &UpArgs) -> anyhow::Result<BuildOutcome>;
    /// Runs a command in the container, handing each output line to `sink`.
    async fn exec(
        &self,
        args: &ExecArgs,
        sink: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> anyhow::Result<i32>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    /// Replace an image already present at the destination
    pub overwrite: bool,
    pub source: String,
    pub destination: String,
}

/// Publishes built images to a registry.
#[async_trait]
pub trait ImagePublisher: Send + Sync {
    async fn push(&self, reference: &str) -> Result<()>;
    async fn copy(&self, request: &CopyRequest) -> Result<()>;
}

/// Checks for the multi-platform build plugin.
pub async fn buildx_available(exec: &dyn Exec) -> bool {
    let args = vec!["buildx".to_string(), "version".to_string()];
    let options = ExecOptions {
        silent: true,
        ..Default::default()
    };
    match exec.exec("docker", &args, &options).await {
        Ok(result) => result.success(),
        Err(e) => {
            tracing::debug!(error = %e, "docker buildx version could not be run");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_outcome_is_ok() {
        assert!(BuildOutcome::Success.into_result("build").is_ok());
    }

    #[test]
    fn test_error_outcome_carries_details() {
        let outcome = BuildOutcome::Error {
            message: "Command failed".to_string(),
            description: Some("An error occurred setting up the container.".to_string()),
            code: 1,
        };
        match outcome.into_result("up") {
            Err(CiError::Collaborator {
                operation, code, ..
            }) => {
                assert_eq!(operation, "up");
                assert_eq!(code, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
