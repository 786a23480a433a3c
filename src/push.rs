use crate::error::{CiError, Result};
use std::fmt;
use std::str::FromStr;

/// The `push` input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushMode {
    Never,
    Always,
    Filter,
}

impl FromStr for PushMode {
    type Err = CiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "never" => Ok(Self::Never),
            "always" => Ok(Self::Always),
            "filter" => Ok(Self::Filter),
            other => Err(CiError::configuration(format!(
                "Unexpected push value ('{}')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushDecision {
    Skip,
    PushAll,
    PushFiltered,
}

impl PushDecision {
    pub fn should_push(self) -> bool {
        !matches!(self, Self::Skip)
    }
}

impl fmt::Display for PushDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::PushAll => write!(f, "push-all"),
            Self::PushFiltered => write!(f, "push-filtered"),
        }
    }
}

/// Decides whether the post phase pushes.
///
/// An empty or missing `push` value means: filter when an image name is set,
/// otherwise skip. Filters only apply on the filter path; `always` ignores
/// them and `never` never reaches them.
pub fn decide(
    push: Option<&str>,
    has_image_name: bool,
    git_ref: &str,
    event_name: &str,
    ref_filter: &[String],
    event_filter: &[String],
) -> Result<PushDecision> {
    let mode = match push.map(str::trim).filter(|p| !p.is_empty()) {
        Some(value) => value.parse::<PushMode>()?,
        None if has_image_name => PushMode::Filter,
        None => PushMode::Never,
    };

    let decision = match mode {
        PushMode::Never => PushDecision::Skip,
        PushMode::Always => PushDecision::PushAll,
        PushMode::Filter => {
            if !ref_filter.is_empty() && !ref_filter.iter().any(|r| r == git_ref) {
                tracing::info!(
                    git_ref,
                    filter = ?ref_filter,
                    "Image push skipped because GITHUB_REF is not in refFilterForPush"
                );
                PushDecision::Skip
            } else if !event_filter.is_empty() && !event_filter.iter().any(|e| e == event_name) {
                tracing::info!(
                    event_name,
                    filter = ?event_filter,
                    "Image push skipped because GITHUB_EVENT_NAME is not in eventFilterForPush"
                );
                PushDecision::Skip
            } else {
                PushDecision::PushFiltered
            }
        }
    };

    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_matching_ref_pushes() {
        let decision = decide(
            Some("filter"),
            true,
            "refs/heads/main",
            "push",
            &list(&["refs/heads/main"]),
            &[],
        )
        .unwrap();
        assert_eq!(decision, PushDecision::PushFiltered);
    }

    #[test]
    fn test_filter_other_ref_skips() {
        let decision = decide(
            Some("filter"),
            true,
            "refs/heads/main",
            "push",
            &list(&["refs/heads/other"]),
            &[],
        )
        .unwrap();
        assert_eq!(decision, PushDecision::Skip);
    }

    #[test]
    fn test_event_filter_applies_after_ref_filter() {
        let decision = decide(
            Some("filter"),
            true,
            "refs/heads/main",
            "pull_request",
            &list(&["refs/heads/main"]),
            &list(&["push"]),
        )
        .unwrap();
        assert_eq!(decision, PushDecision::Skip);
    }

    #[test]
    fn test_unset_with_image_name_filters() {
        assert_eq!(
            decide(None, true, "refs/heads/main", "push", &[], &[]).unwrap(),
            PushDecision::PushFiltered
        );
        assert_eq!(
            decide(Some(""), true, "refs/heads/x", "push", &list(&["refs/heads/main"]), &[]).unwrap(),
            PushDecision::Skip
        );
    }

    #[test]
    fn test_unset_without_image_name_skips() {
        assert_eq!(
            decide(None, false, "refs/heads/main", "push", &[], &[]).unwrap(),
            PushDecision::Skip
        );
    }

    #[test]
    fn test_always_bypasses_filters() {
        let decision = decide(
            Some("always"),
            true,
            "refs/heads/feature",
            "pull_request",
            &list(&["refs/heads/main"]),
            &list(&["push"]),
        )
        .unwrap();
        assert_eq!(decision, PushDecision::PushAll);
        assert!(decision.should_push());
    }

    #[test]
    fn test_never_skips() {
        let decision = decide(Some("never"), true, "refs/heads/main", "push", &[], &[]).unwrap();
        assert_eq!(decision, PushDecision::Skip);
        assert!(!decision.should_push());
    }

    #[test]
    fn test_unknown_mode_is_configuration_error() {
        let err = decide(Some("sometimes"), true, "refs/heads/main", "push", &[], &[]).unwrap_err();
        assert!(matches!(err, CiError::Configuration { .. }));
        assert!(err.to_string().contains("sometimes"));
    }
}
