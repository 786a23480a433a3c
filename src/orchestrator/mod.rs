use crate::config::{ActionConfig, CiContext};
use crate::error::Result;
use crate::outputs::ActionOutputs;
use crate::state::{PhaseState, PhaseStateStore};
use crate::tools::{DevContainerCli, Exec, ImagePublisher};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

pub mod main_phase;
pub mod post_phase;

pub use main_phase::{truncate_output, BuildOrchestrator, MainOutcome};
pub use post_phase::{PostOutcome, ReleaseOrchestrator};

/// External collaborators a phase calls into.
#[derive(Clone)]
pub struct Collaborators {
    pub exec: Arc<dyn Exec>,
    pub devcontainer: Arc<dyn DevContainerCli>,
    pub publisher: Arc<dyn ImagePublisher>,
    pub state: Arc<dyn PhaseStateStore>,
    pub outputs: Arc<dyn ActionOutputs>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Main,
    Post,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => write!(f, "main"),
            Self::Post => write!(f, "post"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseOutcome {
    Main(MainOutcome),
    Post(PostOutcome),
}

/// Picks the phase for a single-entry action: main on first invocation,
/// post once `hasRunMain` is recorded. Marks the main phase as run.
pub fn detect_phase(store: &dyn PhaseStateStore) -> Result<Phase> {
    let state = PhaseState::restore(store)?;
    if state.has_run_main {
        return Ok(Phase::Post);
    }

    PhaseState {
        has_run_main: true,
        ..Default::default()
    }
    .persist(store)?;
    Ok(Phase::Main)
}

pub async fn run_phase(
    phase: Phase,
    config: &ActionConfig,
    ctx: &CiContext,
    tools: &Collaborators,
) -> Result<PhaseOutcome> {
    let phase_name = phase.to_string();
    crate::log_phase_start!(phase_name.as_str());
    let start = Instant::now();

    let outcome = match phase {
        Phase::Main => PhaseOutcome::Main(BuildOrchestrator::new(config, ctx, tools).run().await?),
        Phase::Post => {
            let result = ReleaseOrchestrator::new(config, ctx, tools).run().await;
            // The post phase ends the run, whichever way it went
            let discarded = tools.state.discard();
            let outcome = result?;
            discarded?;
            PhaseOutcome::Post(outcome)
        }
    };

    crate::log_phase_complete!(phase_name.as_str(), start.elapsed().as_millis() as u64);
    Ok(outcome)
}
