use crate::tools::{Exec, ExecOptions, ExecResult};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

/// Runs programs on the runner host.
#[derive(Debug, Clone, Default)]
pub struct ProcessExec;

impl ProcessExec {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Exec for ProcessExec {
    async fn exec(&self, program: &str, args: &[String], options: &ExecOptions) -> Result<ExecResult> {
        if !options.silent {
            tracing::info!("[command]{} {}", program, args.join(" "));
        }
        crate::log_external_call!(program, args);

        let output = Command::new(program)
            .args(args)
            .envs(&options.env)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", program))?;

        let result = ExecResult {
            exit_code: output.status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !options.silent && !result.stderr.is_empty() {
            eprint!("{}", result.stderr);
        }

        Ok(result)
    }
}
