use std::io;
/// Structured logging utilities for devcontainer-ci
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

/// Initialize structured logging with optional JSON output
pub fn init_logging(json_output: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("devcontainer_ci=info"));

    let registry = Registry::default().with(env_filter);

    if json_output {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()?;
    } else {
        // Runner logs are read top to bottom, keep lines short
        registry
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(false)
                    .with_thread_ids(false)
                    .without_time(),
            )
            .try_init()?;
    }

    Ok(())
}

#[macro_export]
macro_rules! log_phase_start {
    ($phase:expr) => {
        tracing::info!(phase = $phase, "Phase started");
    };
}

#[macro_export]
macro_rules! log_phase_complete {
    ($phase:expr, $duration_ms:expr) => {
        tracing::info!(
            phase = $phase,
            duration_ms = $duration_ms,
            "Phase completed"
        );
    };
}

#[macro_export]
macro_rules! log_external_call {
    ($program:expr, $args:expr) => {
        tracing::debug!(program = $program, args = ?$args, "Invoking external command");
    };
}

/// Milestones reported while a phase runs
#[derive(Debug, Clone)]
pub enum TraceEvent {
    MergeDeferred { platform_tags: String },
    ImageBuilt { references: Vec<String> },
    CommandFinished { exit_code: i32, output_bytes: usize },
    ManifestCreated { reference: String },
    ImagePublished { reference: String },
    PushSkipped { reason: String },
}

impl std::fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MergeDeferred { platform_tags } => {
                write!(f, "Deferring manifest merge of [{}] to post phase", platform_tags)
            }
            Self::ImageBuilt { references } => {
                if references.is_empty() {
                    write!(f, "Image built (untagged)")
                } else {
                    write!(f, "Image built: {}", references.join(", "))
                }
            }
            Self::CommandFinished {
                exit_code,
                output_bytes,
            } => {
                write!(
                    f,
                    "Run command exited with {} ({} bytes of output)",
                    exit_code, output_bytes
                )
            }
            Self::ManifestCreated { reference } => {
                write!(f, "Manifest list created: {}", reference)
            }
            Self::ImagePublished { reference } => {
                write!(f, "Image published: {}", reference)
            }
            Self::PushSkipped { reason } => {
                write!(f, "Image push skipped: {}", reason)
            }
        }
    }
}
