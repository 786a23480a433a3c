use crate::config::{ActionConfig, CiContext};
use crate::constants::OCI_ARCHIVE_PATH;
use crate::error::{CiError, Result};
use crate::logging::TraceEvent;
use crate::manifest;
use crate::orchestrator::Collaborators;
use crate::push::{self, PushDecision};
use crate::state::PhaseState;
use crate::tags;
use crate::tools::CopyRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Merged { references: Vec<String> },
    PushSkipped,
    Published {
        decision: PushDecision,
        references: Vec<String>,
    },
}

/// Post phase: merge per-platform images or publish what the main phase built.
///
/// Loops stop at the first failing tag; tags after it are not attempted.
pub struct ReleaseOrchestrator<'a> {
    config: &'a ActionConfig,
    ctx: &'a CiContext,
    tools: &'a Collaborators,
}

impl<'a> ReleaseOrchestrator<'a> {
    pub fn new(config: &'a ActionConfig, ctx: &'a CiContext, tools: &'a Collaborators) -> Self {
        Self { config, ctx, tools }
    }

    pub async fn run(&self) -> Result<PostOutcome> {
        let state = PhaseState::restore(self.tools.state.as_ref())?;
        tracing::debug!(state = ?state, "Restored phase state");

        if state.merge_tag.is_some() {
            return self.merge(&state).await;
        }
        self.publish(&state).await
    }

    fn require_image_name(&self, purpose: &str) -> Result<&'a str> {
        self.config
            .image_name
            .as_deref()
            .ok_or_else(|| CiError::configuration(format!("imageName is required to {}", purpose)))
    }

    async fn merge(&self, state: &PhaseState) -> Result<PostOutcome> {
        let image_name = self.require_image_name("merge platform images")?;
        let platform_tags = state.merge_platform_tags();

        let mut references = Vec::new();
        for tag in tags::split_tags(self.config.image_tag.as_deref()) {
            manifest::create_manifest(self.tools.exec.as_ref(), image_name, &tag, &platform_tags)
                .await?;
            let reference = format!("{}:{}", image_name, tag);
            tracing::info!(
                "{}",
                TraceEvent::ManifestCreated {
                    reference: reference.clone()
                }
            );
            references.push(reference);
        }

        Ok(PostOutcome::Merged { references })
    }

    async fn publish(&self, state: &PhaseState) -> Result<PostOutcome> {
        let config = self.config;
        let decision = push::decide(
            config.push.as_deref(),
            config.image_name.is_some(),
            &self.ctx.git_ref,
            &self.ctx.event_name,
            &config.ref_filter_for_push,
            &config.event_filter_for_push,
        )?;

        if !decision.should_push() {
            tracing::info!(
                "{}",
                TraceEvent::PushSkipped {
                    reason: format!("push={}", config.push.as_deref().unwrap_or("unset"))
                }
            );
            return Ok(PostOutcome::PushSkipped);
        }

        let image_name = self.require_image_name("push images")?;
        let image_tag = config.image_tag.as_deref();
        let mut references = Vec::new();

        if let Some(platform_tag) = state.platform_tag.as_deref() {
            for reference in tags::image_references(image_name, image_tag, Some(platform_tag)) {
                self.tools.publisher.push(&reference).await?;
                references.push(self.published(reference));
            }
        } else if config.platform.is_some() {
            // The build wrote an OCI archive rather than a local image
            for tag in tags::split_tags(image_tag) {
                let request = CopyRequest {
                    overwrite: true,
                    source: format!("oci-archive:{}:{}", OCI_ARCHIVE_PATH, tag),
                    destination: format!("docker://{}:{}", image_name, tag),
                };
                self.tools.publisher.copy(&request).await?;
                references.push(self.published(format!("{}:{}", image_name, tag)));
            }
        } else {
            for reference in tags::image_references(image_name, image_tag, None) {
                self.tools.publisher.push(&reference).await?;
                references.push(self.published(reference));
            }
        }

        Ok(PostOutcome::Published {
            decision,
            references,
        })
    }

    fn published(&self, reference: String) -> String {
        tracing::info!(
            "{}",
            TraceEvent::ImagePublished {
                reference: reference.clone()
            }
        );
        reference
    }
}
