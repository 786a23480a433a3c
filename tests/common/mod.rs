#![allow(dead_code)]

use async_trait::async_trait;
use devcontainer_ci::config::{ActionConfig, CiContext};
use devcontainer_ci::error::{CiError, Result};
use devcontainer_ci::orchestrator::Collaborators;
use devcontainer_ci::outputs::MemoryOutputs;
use devcontainer_ci::state::MemoryStateStore;
use devcontainer_ci::tools::{
    BuildArgs, BuildOutcome, CopyRequest, DevContainerCli, Exec, ExecArgs, ExecOptions,
    ExecResult, ImagePublisher, UpArgs,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Records every invocation; `docker buildx version` succeeds unless disabled.
pub struct RecordingExec {
    pub buildx_available: bool,
    /// Exit codes handed out to non-buildx-version calls, in order; 0 once drained
    pub exit_codes: Mutex<Vec<i32>>,
    pub calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl RecordingExec {
    pub fn new() -> Self {
        Self {
            buildx_available: true,
            exit_codes: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn without_buildx() -> Self {
        Self {
            buildx_available: false,
            ..Self::new()
        }
    }

    pub fn with_exit_codes(codes: Vec<i32>) -> Self {
        Self {
            exit_codes: Mutex::new(codes),
            ..Self::new()
        }
    }

    pub fn manifest_calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .iter()
            .filter(|(program, args)| program == "docker" && args.first().map(String::as_str) == Some("buildx") && args.get(1).map(String::as_str) == Some("imagetools"))
            .map(|(_, args)| args.clone())
            .collect()
    }
}

#[async_trait]
impl Exec for RecordingExec {
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        _options: &ExecOptions,
    ) -> anyhow::Result<ExecResult> {
        self.calls.lock().push((program.to_string(), args.to_vec()));

        if program == "docker" && args == ["buildx", "version"] {
            if !self.buildx_available {
                anyhow::bail!("docker: 'buildx' is not a docker command");
            }
            return Ok(ExecResult::default());
        }

        let mut codes = self.exit_codes.lock();
        let exit_code = if codes.is_empty() { 0 } else { codes.remove(0) };
        Ok(ExecResult {
            exit_code,
            ..Default::default()
        })
    }
}

pub struct FakeDevContainer {
    pub installed: bool,
    pub install_fails: bool,
    pub build_outcome: BuildOutcome,
    pub up_outcome: BuildOutcome,
    pub exec_lines: Vec<String>,
    pub exec_exit_code: i32,
    pub installs: Mutex<Vec<String>>,
    pub builds: Mutex<Vec<BuildArgs>>,
    pub ups: Mutex<Vec<UpArgs>>,
    pub execs: Mutex<Vec<ExecArgs>>,
}

impl Default for FakeDevContainer {
    fn default() -> Self {
        Self {
            installed: true,
            install_fails: false,
            build_outcome: BuildOutcome::Success,
            up_outcome: BuildOutcome::Success,
            exec_lines: Vec::new(),
            exec_exit_code: 0,
            installs: Mutex::new(Vec::new()),
            builds: Mutex::new(Vec::new()),
            ups: Mutex::new(Vec::new()),
            execs: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl DevContainerCli for FakeDevContainer {
    async fn is_installed(&self) -> bool {
        self.installed
    }

    async fn install(&self, version: &str) -> anyhow::Result<()> {
        self.installs.lock().push(version.to_string());
        if self.install_fails {
            anyhow::bail!("npm ERR! network unreachable");
        }
        Ok(())
    }

    async fn build(&self, args: &BuildArgs) -> anyhow::Result<BuildOutcome> {
        self.builds.lock().push(args.clone());
        Ok(self.build_outcome.clone())
    }

    async fn up(&self, args: &UpArgs) -> anyhow::Result<BuildOutcome> {
        self.ups.lock().push(args.clone());
        Ok(self.up_outcome.clone())
    }

    async fn exec(
        &self,
        args: &ExecArgs,
        sink: &mut (dyn for<'s> FnMut(&'s str) + Send),
    ) -> anyhow::Result<i32> {
        self.execs.lock().push(args.clone());
        for line in &self.exec_lines {
            sink(line);
        }
        Ok(self.exec_exit_code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    Push(String),
    Copy(CopyRequest),
}

#[derive(Default)]
pub struct RecordingPublisher {
    /// Reference (or copy destination) whose publication fails
    pub fail_on: Option<String>,
    pub published: Mutex<Vec<Published>>,
}

impl RecordingPublisher {
    pub fn failing_on(reference: &str) -> Self {
        Self {
            fail_on: Some(reference.to_string()),
            ..Default::default()
        }
    }

    fn check(&self, reference: &str) -> Result<()> {
        if self.fail_on.as_deref() == Some(reference) {
            return Err(CiError::Collaborator {
                operation: format!("docker push {}", reference),
                message: "denied: permission_denied".to_string(),
                description: None,
                code: 1,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ImagePublisher for RecordingPublisher {
    async fn push(&self, reference: &str) -> Result<()> {
        self.check(reference)?;
        self.published.lock().push(Published::Push(reference.to_string()));
        Ok(())
    }

    async fn copy(&self, request: &CopyRequest) -> Result<()> {
        self.check(&request.destination)?;
        self.published.lock().push(Published::Copy(request.clone()));
        Ok(())
    }
}

pub struct Harness {
    pub exec: Arc<RecordingExec>,
    pub devcontainer: Arc<FakeDevContainer>,
    pub publisher: Arc<RecordingPublisher>,
    pub state: Arc<MemoryStateStore>,
    pub outputs: Arc<MemoryOutputs>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(RecordingExec::new(), FakeDevContainer::default(), RecordingPublisher::default())
    }

    pub fn with(exec: RecordingExec, devcontainer: FakeDevContainer, publisher: RecordingPublisher) -> Self {
        Self {
            exec: Arc::new(exec),
            devcontainer: Arc::new(devcontainer),
            publisher: Arc::new(publisher),
            state: Arc::new(MemoryStateStore::new()),
            outputs: Arc::new(MemoryOutputs::new()),
        }
    }

    pub fn tools(&self) -> Collaborators {
        Collaborators {
            exec: self.exec.clone(),
            devcontainer: self.devcontainer.clone(),
            publisher: self.publisher.clone(),
            state: self.state.clone(),
            outputs: self.outputs.clone(),
        }
    }
}

pub fn config(image_name: Option<&str>, image_tag: Option<&str>) -> ActionConfig {
    ActionConfig {
        image_name: image_name.map(str::to_string),
        image_tag: image_tag.map(str::to_string),
        ..Default::default()
    }
}

pub fn ci(git_ref: &str, event_name: &str) -> CiContext {
    CiContext {
        git_ref: git_ref.to_string(),
        event_name: event_name.to_string(),
        ci_files: Vec::new(),
    }
}
