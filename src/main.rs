use anyhow::Result;
use clap::{Parser, Subcommand};
use devcontainer_ci::config::{ActionConfig, ActionInputs, CiContext};
use devcontainer_ci::error::is_fatal;
use devcontainer_ci::logging;
use devcontainer_ci::orchestrator::{self, Collaborators, Phase};
use devcontainer_ci::outputs::GithubOutputs;
use devcontainer_ci::state::{FileStateStore, GithubStateStore, PhaseStateStore};
use devcontainer_ci::tools::{CliPublisher, DevContainerCliTool, Exec, ProcessExec};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "devcontainer-ci",
    version,
    about = "Build dev container images in CI, run commands in them and publish the results"
)]
struct Cli {
    /// Emit JSON log lines
    #[arg(long, global = true, env = "DEVCONTAINER_CI_LOG_JSON")]
    json_logs: bool,

    /// Keep phase state in this JSON file instead of the runner state channel
    #[arg(long, global = true, env = "DEVCONTAINER_CI_STATE_FILE")]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run whichever phase is due: main first, post once main has run
    Run(ActionInputs),
    /// Build the image and run the command
    Main(ActionInputs),
    /// Push or merge the images built by the main phase
    Post(ActionInputs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Err(e) = logging::init_logging(cli.json_logs) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let state: Arc<dyn PhaseStateStore> = match &cli.state_file {
        Some(path) => Arc::new(FileStateStore::open(path)?),
        None => Arc::new(GithubStateStore::from_env()),
    };

    let (phase, inputs) = match cli.command {
        Command::Run(inputs) => (orchestrator::detect_phase(state.as_ref())?, inputs),
        Command::Main(inputs) => (Phase::Main, inputs),
        Command::Post(inputs) => (Phase::Post, inputs),
    };

    let host_env = std::env::vars().collect();
    let config = ActionConfig::from_inputs(inputs, &host_env);
    let ctx = CiContext::from_env();

    let exec: Arc<dyn Exec> = Arc::new(ProcessExec::new());
    let tools = Collaborators {
        exec: exec.clone(),
        devcontainer: Arc::new(DevContainerCliTool::new(exec.clone())),
        publisher: Arc::new(CliPublisher::new(exec)),
        state,
        outputs: Arc::new(GithubOutputs::from_env()),
    };

    let result = match config {
        Ok(config) => orchestrator::run_phase(phase, &config, &ctx, &tools).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(outcome) => {
            tracing::debug!(?outcome, "Phase finished");
            Ok(())
        }
        Err(e) if !is_fatal(&e) => {
            tracing::warn!(error = %e, "Phase skipped");
            Ok(())
        }
        Err(e) => {
            tracing::error!(phase = %phase, error = %e, "Phase failed");
            let message = e
                .to_string()
                .replace('%', "%25")
                .replace('\r', "%0D")
                .replace('\n', "%0A");
            println!("::error::{}", message);
            std::process::exit(1);
        }
    }
}
