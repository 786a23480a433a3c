use crate::error::{CiError, Result};
use crate::tools::{CopyRequest, Exec, ExecOptions, ExecResult, ImagePublisher};
use async_trait::async_trait;
use std::sync::Arc;

/// Publishes with `docker push` and `skopeo copy`.
pub struct CliPublisher {
    exec: Arc<dyn Exec>,
}

impl CliPublisher {
    pub fn new(exec: Arc<dyn Exec>) -> Self {
        Self { exec }
    }

    async fn run(&self, operation: &str, program: &str, args: Vec<String>) -> Result<ExecResult> {
        self.exec
            .exec(program, &args, &ExecOptions::default())
            .await
            .map_err(|e| CiError::Collaborator {
                operation: operation.to_string(),
                message: format!("{:#}", e),
                description: None,
                code: -1,
            })
    }
}

fn failure(operation: &str, result: &ExecResult) -> CiError {
    CiError::Collaborator {
        operation: operation.to_string(),
        message: format!("exited with {}", result.exit_code),
        description: Some(result.stderr.trim().to_string()).filter(|s| !s.is_empty()),
        code: result.exit_code,
    }
}

#[async_trait]
impl ImagePublisher for CliPublisher {
    async fn push(&self, reference: &str) -> Result<()> {
        let operation = format!("docker push {}", reference);
        let result = self
            .run(&operation, "docker", vec!["push".to_string(), reference.to_string()])
            .await?;
        if !result.success() {
            return Err(failure(&operation, &result));
        }
        Ok(())
    }

    async fn copy(&self, request: &CopyRequest) -> Result<()> {
        let operation = format!("skopeo copy {}", request.destination);

        if !request.overwrite {
            let inspect = self
                .run(
                    &operation,
                    "skopeo",
                    vec!["inspect".to_string(), request.destination.clone()],
                )
                .await?;
            if inspect.success() {
                return Err(CiError::Collaborator {
                    operation,
                    message: "destination image already exists".to_string(),
                    description: None,
                    code: 1,
                });
            }
        }

        let args = vec![
            "copy".to_string(),
            "--all".to_string(),
            request.source.clone(),
            request.destination.clone(),
        ];
        let result = self.run(&operation, "skopeo", args).await?;
        if !result.success() {
            return Err(failure(&operation, &result));
        }
        Ok(())
    }
}
