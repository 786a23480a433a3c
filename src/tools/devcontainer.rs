use crate::constants::DEVCONTAINER_CLI_PACKAGE;
use crate::tools::{BuildArgs, BuildOutcome, DevContainerCli, Exec, ExecArgs, ExecOptions, UpArgs};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// JSON line the devcontainer CLI prints as its final result.
#[derive(Debug, Deserialize)]
struct RawOutcome {
    outcome: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Drives the `devcontainer` binary.
pub struct DevContainerCliTool {
    exec: Arc<dyn Exec>,
    program: String,
}

impl DevContainerCliTool {
    pub fn new(exec: Arc<dyn Exec>) -> Self {
        Self {
            exec,
            program: "devcontainer".to_string(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run_for_outcome(&self, args: Vec<String>) -> Result<BuildOutcome> {
        let result = self
            .exec
            .exec(&self.program, &args, &ExecOptions::default())
            .await?;
        parse_outcome(&result.stdout, result.exit_code)
    }
}

fn push_path(args: &mut Vec<String>, flag: &str, path: Option<&Path>) {
    if let Some(p) = path {
        args.push(flag.to_string());
        args.push(p.display().to_string());
    }
}

fn push_each<'a>(args: &mut Vec<String>, flag: &str, values: impl IntoIterator<Item = &'a String>) {
    for value in values {
        args.push(flag.to_string());
        args.push(value.clone());
    }
}

pub(crate) fn build_command_args(args: &BuildArgs) -> Vec<String> {
    let mut cmd = vec![
        "build".to_string(),
        "--workspace-folder".to_string(),
        args.workspace_folder.display().to_string(),
    ];
    push_path(&mut cmd, "--config", args.config_file.as_deref());
    push_path(&mut cmd, "--user-data-folder", args.user_data_folder.as_deref());
    push_each(&mut cmd, "--image-name", &args.image_name);
    if let Some(platform) = &args.platform {
        cmd.push("--platform".to_string());
        cmd.push(platform.clone());
    }
    push_each(&mut cmd, "--cache-from", &args.additional_cache_froms);
    push_each(&mut cmd, "--cache-to", &args.cache_to);
    if let Some(output) = &args.output {
        cmd.push("--output".to_string());
        cmd.push(output.clone());
    }
    if args.no_cache {
        cmd.push("--no-cache".to_string());
    }
    cmd
}

pub(crate) fn up_command_args(args: &UpArgs) -> Vec<String> {
    let mut cmd = vec![
        "up".to_string(),
        "--workspace-folder".to_string(),
        args.workspace_folder.display().to_string(),
    ];
    push_path(&mut cmd, "--config", args.config_file.as_deref());
    push_path(&mut cmd, "--user-data-folder", args.user_data_folder.as_deref());
    let mounts: Vec<String> = args.additional_mounts.iter().map(|m| m.to_string()).collect();
    push_each(&mut cmd, "--mount", &mounts);
    push_each(&mut cmd, "--remote-env", &args.env);
    if args.skip_container_user_id_update {
        cmd.push("--update-remote-user-uid-default".to_string());
        cmd.push("off".to_string());
    }
    cmd
}

pub(crate) fn exec_command_args(args: &ExecArgs) -> Vec<String> {
    let mut cmd = vec![
        "exec".to_string(),
        "--workspace-folder".to_string(),
        args.workspace_folder.display().to_string(),
    ];
    push_path(&mut cmd, "--config", args.config_file.as_deref());
    push_path(&mut cmd, "--user-data-folder", args.user_data_folder.as_deref());
    push_each(&mut cmd, "--remote-env", &args.env);
    cmd.extend(args.command.iter().cloned());
    cmd
}

/// Reads the outcome from the last JSON line of CLI stdout.
pub(crate) fn parse_outcome(stdout: &str, exit_code: i32) -> Result<BuildOutcome> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with('{'))
        .with_context(|| format!("devcontainer CLI produced no result (exit code {})", exit_code))?;

    let raw: RawOutcome =
        serde_json::from_str(line).context("Failed to parse devcontainer CLI result")?;

    if raw.outcome == "success" && exit_code == 0 {
        return Ok(BuildOutcome::Success);
    }

    Ok(BuildOutcome::Error {
        message: raw.message.unwrap_or_else(|| format!("outcome '{}'", raw.outcome)),
        description: raw.description,
        code: if exit_code == 0 { 1 } else { exit_code },
    })
}

#[async_trait]
impl DevContainerCli for DevContainerCliTool {
    async fn is_installed(&self) -> bool {
        let options = ExecOptions {
            silent: true,
            ..Default::default()
        };
        match self
            .exec
            .exec(&self.program, &["--version".to_string()], &options)
            .await
        {
            Ok(result) => result.success(),
            Err(_) => false,
        }
    }

    async fn install(&self, version: &str) -> Result<()> {
        let package = format!("{}@{}", DEVCONTAINER_CLI_PACKAGE, version);
        tracing::info!(package = %package, "Installing devcontainer CLI");

        let args = vec!["install".to_string(), "-g".to_string(), package.clone()];
        let result = self.exec.exec("npm", &args, &ExecOptions::default()).await?;
        if !result.success() {
            anyhow::bail!(
                "npm install of {} failed with {}: {}",
                package,
                result.exit_code,
                result.stderr.trim()
            );
        }
        Ok(())
    }

    async fn build(&self, args: &BuildArgs) -> Result<BuildOutcome> {
        self.run_for_outcome(build_command_args(args)).await
    }

    async fn up(&self, args: &UpArgs) -> Result<BuildOutcome> {
        self.run_for_outcome(up_command_args(args)).await
    }

    async fn exec(&self, args: &ExecArgs, sink: &mut (dyn for<'s> FnMut(&'s str) + Send)) -> Result<i32> {
        let cmd_args = exec_command_args(args);
        crate::log_external_call!(self.program.as_str(), &cmd_args);

        let mut child = Command::new(&self.program)
            .args(&cmd_args)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to start {}", self.program))?;

        let stdout = child
            .stdout
            .take()
            .context("devcontainer exec stdout was not captured")?;
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            sink(&line);
        }

        let status = child.wait().await?;
        Ok(status.code().unwrap_or(1))
    }
}
