use crate::config::{ActionConfig, CiContext};
use crate::constants::{
    CI_FILE_BINDINGS, MAX_OUTPUT_BYTES, OUTPUT_MODE_ARCHIVE, OUTPUT_MODE_DOCKER, OUTPUT_RUN_CMD,
    TRUNCATED_OUTPUT_BYTES, TRUNCATION_MARKER,
};
use crate::error::{CiError, Result};
use crate::logging::TraceEvent;
use crate::mount::MountSpec;
use crate::orchestrator::Collaborators;
use crate::state::PhaseState;
use crate::tags;
use crate::tools::{self, BuildArgs, ExecArgs, UpArgs};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainOutcome {
    /// A merge tag was given; the post phase merges instead of building
    MergeDeferred,
    Built { references: Vec<String> },
    Ran { references: Vec<String>, output: String },
}

/// Cuts output above 1 MB on a char boundary and appends the marker.
pub fn truncate_output(output: String) -> String {
    if output.len() <= MAX_OUTPUT_BYTES {
        return output;
    }

    let mut end = TRUNCATED_OUTPUT_BYTES;
    while !output.is_char_boundary(end) {
        end -= 1;
    }

    let mut truncated = output;
    truncated.truncate(end);
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Build output mode for the configured platform combination.
pub fn output_mode(platform: Option<&str>, platform_tag: Option<&str>) -> Option<&'static str> {
    match (platform, platform_tag) {
        (Some(_), None) => Some(OUTPUT_MODE_ARCHIVE),
        (Some(_), Some(_)) => Some(OUTPUT_MODE_DOCKER),
        (None, _) => None,
    }
}

/// Main phase: build the dev container image and optionally run a command in it.
pub struct BuildOrchestrator<'a> {
    config: &'a ActionConfig,
    ctx: &'a CiContext,
    tools: &'a Collaborators,
}

impl<'a> BuildOrchestrator<'a> {
    pub fn new(config: &'a ActionConfig, ctx: &'a CiContext, tools: &'a Collaborators) -> Self {
        Self { config, ctx, tools }
    }

    pub async fn run(&self) -> Result<MainOutcome> {
        if let Some(merge_tag) = &self.config.merge_tag {
            tracing::info!(
                "{}",
                TraceEvent::MergeDeferred {
                    platform_tags: merge_tag.clone()
                }
            );
            PhaseState {
                merge_tag: Some(merge_tag.clone()),
                ..Default::default()
            }
            .persist(self.tools.state.as_ref())?;
            return Ok(MainOutcome::MergeDeferred);
        }

        // Not fatal: the caller skips the phase without failing the run
        if !tools::buildx_available(self.tools.exec.as_ref()).await {
            return Err(CiError::EnvironmentUnavailable {
                tool: "docker buildx".to_string(),
            });
        }

        self.ensure_devcontainer_cli().await?;

        let references = self.build().await?;

        match &self.config.run_cmd {
            Some(run_cmd) => {
                let output = self.run_command(run_cmd).await?;
                Ok(MainOutcome::Ran { references, output })
            }
            None => {
                tracing::info!("No runCmd set, skipping run");
                Ok(MainOutcome::Built { references })
            }
        }
    }

    async fn ensure_devcontainer_cli(&self) -> Result<()> {
        if self.tools.devcontainer.is_installed().await {
            return Ok(());
        }

        tracing::info!("devcontainer CLI not found, installing");
        self.tools
            .devcontainer
            .install(&self.config.cli_version)
            .await
            .map_err(|e| CiError::Collaborator {
                operation: "devcontainer CLI install".to_string(),
                message: format!("{:#}", e),
                description: None,
                code: 1,
            })
    }

    async fn build(&self) -> Result<Vec<String>> {
        let config = self.config;
        let platform_tag = config.platform_tag.as_deref();

        let references = match &config.image_name {
            Some(name) => tags::image_references(name, config.image_tag.as_deref(), platform_tag),
            None => Vec::new(),
        };

        let mut cache_from = config.cache_from.clone();
        tags::augment_cache_from(&references, config.no_cache, &mut cache_from);

        if platform_tag.is_some() {
            PhaseState {
                platform_tag: platform_tag.map(str::to_string),
                ..Default::default()
            }
            .persist(self.tools.state.as_ref())?;
        }

        let args = BuildArgs {
            workspace_folder: config.workspace_folder(),
            config_file: config.config_path(),
            image_name: references.clone(),
            platform: config.platform.clone(),
            additional_cache_froms: cache_from,
            user_data_folder: config.user_data_folder.clone(),
            output: output_mode(config.platform.as_deref(), platform_tag).map(str::to_string),
            no_cache: config.no_cache,
            cache_to: config.cache_to.clone(),
        };

        self.tools
            .devcontainer
            .build(&args)
            .await?
            .into_result("devcontainer build")?;

        tracing::info!(
            "{}",
            TraceEvent::ImageBuilt {
                references: references.clone()
            }
        );
        Ok(references)
    }

    /// CI command files bound into the container, plus the variables pointing at them.
    fn ci_bindings(&self) -> (Vec<MountSpec>, Vec<String>) {
        let mut mounts = Vec::new();
        let mut env = Vec::new();
        for (name, host_path) in &self.ctx.ci_files {
            if let Some((_, target)) = CI_FILE_BINDINGS.iter().find(|(n, _)| *n == name.as_str()) {
                mounts.push(MountSpec::bind(host_path.clone(), *target));
                env.push(format!("{}={}", name, target));
            }
        }
        (mounts, env)
    }

    async fn run_command(&self, run_cmd: &str) -> Result<String> {
        let config = self.config;
        let (ci_mounts, ci_env) = self.ci_bindings();

        let mut env = config.env.clone();
        env.extend(ci_env);

        let mut mounts = config.additional_mounts.clone();
        mounts.extend(ci_mounts);

        let up = UpArgs {
            workspace_folder: config.workspace_folder(),
            config_file: config.config_path(),
            additional_mounts: mounts,
            env: env.clone(),
            skip_container_user_id_update: config.skip_container_user_id_update,
            user_data_folder: config.user_data_folder.clone(),
        };
        self.tools
            .devcontainer
            .up(&up)
            .await?
            .into_result("devcontainer up")?;

        let exec = ExecArgs {
            workspace_folder: config.workspace_folder(),
            config_file: config.config_path(),
            command: vec!["bash".to_string(), "-c".to_string(), run_cmd.to_string()],
            env,
            user_data_folder: config.user_data_folder.clone(),
        };

        let mut lines: Vec<String> = Vec::new();
        let mut sink = |line: &str| {
            println!("{}", line);
            lines.push(line.to_string());
        };
        let exit_code = self.tools.devcontainer.exec(&exec, &mut sink).await?;

        let output = truncate_output(lines.join("\n"));
        tracing::info!(
            "{}",
            TraceEvent::CommandFinished {
                exit_code,
                output_bytes: output.len()
            }
        );
        self.tools.outputs.set_output(OUTPUT_RUN_CMD, &output)?;

        if exit_code != 0 {
            return Err(CiError::Collaborator {
                operation: "devcontainer exec".to_string(),
                message: format!("runCmd exited with {}", exit_code),
                description: None,
                code: exit_code,
            });
        }

        Ok(output)
    }
}
