use crate::constants::{CI_FILE_BINDINGS, DEFAULT_DEVCONTAINER_CLI_VERSION};
use crate::error::{CiError, Result};
use crate::mount::{parse_mount, MountSpec};
use clap::Args;
use std::collections::HashMap;
use std::path::PathBuf;

/// Action inputs, each readable from its `INPUT_<NAME>` variable.
#[derive(Debug, Clone, Default, Args)]
pub struct ActionInputs {
    /// Image name, without tag (e.g. ghcr.io/org/image)
    #[arg(long, env = "INPUT_IMAGENAME")]
    pub image_name: Option<String>,

    /// Comma-separated image tags (defaults to latest)
    #[arg(long, env = "INPUT_IMAGETAG")]
    pub image_tag: Option<String>,

    /// Target platforms passed to the build (e.g. linux/amd64,linux/arm64)
    #[arg(long, env = "INPUT_PLATFORM")]
    pub platform: Option<String>,

    /// Suffix distinguishing this run's per-platform image (e.g. linux-arm64)
    #[arg(long, env = "INPUT_PLATFORMTAG")]
    pub platform_tag: Option<String>,

    /// Comma-separated platform tags to merge into one multi-arch tag
    #[arg(long, env = "INPUT_MERGETAG")]
    pub merge_tag: Option<String>,

    /// Command to run in the dev container after building
    #[arg(long, env = "INPUT_RUNCMD")]
    pub run_cmd: Option<String>,

    /// Folder under the checkout containing the dev container workspace
    #[arg(long, env = "INPUT_SUBFOLDER")]
    pub sub_folder: Option<String>,

    /// devcontainer.json path, relative to the checkout
    #[arg(long, env = "INPUT_CONFIGFILE")]
    pub config_file: Option<String>,

    #[arg(long, env = "INPUT_CHECKOUTPATH")]
    pub checkout_path: Option<String>,

    /// never, always or filter
    #[arg(long, env = "INPUT_PUSH")]
    pub push: Option<String>,

    #[arg(long, env = "INPUT_REFFILTERFORPUSH")]
    pub ref_filter_for_push: Option<String>,

    #[arg(long, env = "INPUT_EVENTFILTERFORPUSH")]
    pub event_filter_for_push: Option<String>,

    /// Environment for the run command, one NAME=value or NAME per line
    #[arg(long, env = "INPUT_ENV")]
    pub env: Option<String>,

    #[arg(long, env = "INPUT_INHERITENV")]
    pub inherit_env: Option<String>,

    #[arg(long, env = "INPUT_SKIPCONTAINERUSERIDUPDATE")]
    pub skip_container_user_id_update: Option<String>,

    #[arg(long, env = "INPUT_USERDATAFOLDER")]
    pub user_data_folder: Option<String>,

    /// Extra build cache sources, one per line
    #[arg(long, env = "INPUT_CACHEFROM")]
    pub cache_from: Option<String>,

    #[arg(long, env = "INPUT_NOCACHE")]
    pub no_cache: Option<String>,

    /// Build cache destinations, one per line
    #[arg(long, env = "INPUT_CACHETO")]
    pub cache_to: Option<String>,

    /// Extra mounts for the run container, one mount spec per line
    #[arg(long, env = "INPUT_MOUNTS")]
    pub mounts: Option<String>,

    /// devcontainer CLI version installed when the CLI is missing
    #[arg(long, env = "INPUT_CLIVERSION")]
    pub cli_version: Option<String>,
}

/// Validated inputs for one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionConfig {
    pub image_name: Option<String>,
    pub image_tag: Option<String>,
    pub platform: Option<String>,
    pub platform_tag: Option<String>,
    pub merge_tag: Option<String>,
    pub run_cmd: Option<String>,
    pub checkout_path: PathBuf,
    pub sub_folder: Option<String>,
    pub config_file: Option<String>,
    pub push: Option<String>,
    pub ref_filter_for_push: Vec<String>,
    pub event_filter_for_push: Vec<String>,
    /// Resolved `NAME=value` pairs for the run command
    pub env: Vec<String>,
    pub skip_container_user_id_update: bool,
    pub additional_mounts: Vec<MountSpec>,
    pub user_data_folder: Option<PathBuf>,
    pub cache_from: Vec<String>,
    pub no_cache: bool,
    pub cache_to: Vec<String>,
    pub cli_version: String,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            image_name: None,
            image_tag: None,
            platform: None,
            platform_tag: None,
            merge_tag: None,
            run_cmd: None,
            checkout_path: PathBuf::from("."),
            sub_folder: None,
            config_file: None,
            push: None,
            ref_filter_for_push: Vec::new(),
            event_filter_for_push: Vec::new(),
            env: Vec::new(),
            skip_container_user_id_update: false,
            additional_mounts: Vec::new(),
            user_data_folder: None,
            cache_from: Vec::new(),
            no_cache: false,
            cache_to: Vec::new(),
            cli_version: DEFAULT_DEVCONTAINER_CLI_VERSION.to_string(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Splits a multiline list input, one entry per line, dropping blanks.
///
/// Commas stay inside an entry: buildx cache specs are comma-separated.
pub fn parse_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_bool(name: &str, value: Option<&str>) -> Result<bool> {
    match value.map(|v| v.trim().to_lowercase()).as_deref() {
        None | Some("") => Ok(false),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(CiError::configuration(format!(
            "Input '{}' expects true or false, got '{}'",
            name, other
        ))),
    }
}

/// Resolves `env` input lines against the host environment.
///
/// `NAME=value` is kept verbatim. A bare `NAME` takes the host value and is
/// dropped when the host does not define it. With `inherit_env`, every host
/// variable not named explicitly is appended.
pub fn resolve_env(
    lines: Option<&str>,
    inherit_env: bool,
    host_env: &HashMap<String, String>,
) -> Vec<String> {
    let mut resolved = Vec::new();
    let mut named = std::collections::HashSet::new();

    for line in lines.unwrap_or_default().lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        match line.split_once('=') {
            Some((name, _)) => {
                named.insert(name.to_string());
                resolved.push(line.to_string());
            }
            None => {
                named.insert(line.to_string());
                if let Some(value) = host_env.get(line) {
                    resolved.push(format!("{}={}", line, value));
                }
            }
        }
    }

    if inherit_env {
        let mut inherited: Vec<_> = host_env
            .iter()
            .filter(|(name, _)| !named.contains(*name))
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        inherited.sort();
        resolved.extend(inherited);
    }

    resolved
}

impl ActionConfig {
    pub fn from_inputs(inputs: ActionInputs, host_env: &HashMap<String, String>) -> Result<Self> {
        let inherit_env = parse_bool("inheritEnv", inputs.inherit_env.as_deref())?;

        Ok(Self {
            image_name: non_empty(inputs.image_name),
            image_tag: non_empty(inputs.image_tag),
            platform: non_empty(inputs.platform),
            platform_tag: non_empty(inputs.platform_tag),
            merge_tag: non_empty(inputs.merge_tag),
            run_cmd: non_empty(inputs.run_cmd),
            checkout_path: non_empty(inputs.checkout_path)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            sub_folder: non_empty(inputs.sub_folder),
            config_file: non_empty(inputs.config_file),
            push: non_empty(inputs.push),
            ref_filter_for_push: parse_list(inputs.ref_filter_for_push.as_deref()),
            event_filter_for_push: parse_list(inputs.event_filter_for_push.as_deref()),
            env: resolve_env(inputs.env.as_deref(), inherit_env, host_env),
            skip_container_user_id_update: parse_bool(
                "skipContainerUserIdUpdate",
                inputs.skip_container_user_id_update.as_deref(),
            )?,
            additional_mounts: inputs
                .mounts
                .as_deref()
                .unwrap_or_default()
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(parse_mount)
                .collect::<Result<Vec<_>>>()?,
            user_data_folder: non_empty(inputs.user_data_folder).map(PathBuf::from),
            cache_from: parse_list(inputs.cache_from.as_deref()),
            no_cache: parse_bool("noCache", inputs.no_cache.as_deref())?,
            cache_to: parse_list(inputs.cache_to.as_deref()),
            cli_version: non_empty(inputs.cli_version)
                .unwrap_or_else(|| DEFAULT_DEVCONTAINER_CLI_VERSION.to_string()),
        })
    }

    pub fn workspace_folder(&self) -> PathBuf {
        match &self.sub_folder {
            Some(sub) => self.checkout_path.join(sub),
            None => self.checkout_path.clone(),
        }
    }

    pub fn config_path(&self) -> Option<PathBuf> {
        self.config_file
            .as_ref()
            .map(|file| self.checkout_path.join(file))
    }
}

/// CI run context read from the runner environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CiContext {
    pub git_ref: String,
    pub event_name: String,
    /// Host paths of the CI command files, keyed by variable name
    pub ci_files: Vec<(String, String)>,
}

impl CiContext {
    pub fn from_vars(vars: &HashMap<String, String>) -> Self {
        let ci_files = CI_FILE_BINDINGS
            .iter()
            .filter_map(|(name, _)| {
                vars.get(*name)
                    .filter(|path| !path.is_empty())
                    .map(|path| (name.to_string(), path.clone()))
            })
            .collect();

        Self {
            git_ref: vars.get("GITHUB_REF").cloned().unwrap_or_default(),
            event_name: vars.get("GITHUB_EVENT_NAME").cloned().unwrap_or_default(),
            ci_files,
        }
    }

    pub fn from_env() -> Self {
        Self::from_vars(&std::env::vars().collect())
    }
}
