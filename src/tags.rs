use crate::constants::DEFAULT_IMAGE_TAG;
use regex::Regex;
use std::sync::OnceLock;

fn tag_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"\s*,\s*").expect("tag separator pattern is valid"))
}

/// Splits a comma-separated tag list, keeping order and duplicates.
pub fn split_tags(base_tag: Option<&str>) -> Vec<String> {
    let base = base_tag
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_IMAGE_TAG);

    tag_separator().split(base).map(str::to_string).collect()
}

/// Expands the tag list, suffixing each tag with `-<platform_tag>` when set.
pub fn compute_tags(base_tag: Option<&str>, platform_tag: Option<&str>) -> Vec<String> {
    let platform_tag = platform_tag.filter(|p| !p.is_empty());

    split_tags(base_tag)
        .into_iter()
        .map(|tag| match platform_tag {
            Some(platform) => format!("{}-{}", tag, platform),
            None => tag,
        })
        .collect()
}

/// Full `name:tag` references for every computed tag.
pub fn image_references(
    image_name: &str,
    base_tag: Option<&str>,
    platform_tag: Option<&str>,
) -> Vec<String> {
    compute_tags(base_tag, platform_tag)
        .into_iter()
        .map(|tag| format!("{}:{}", image_name, tag))
        .collect()
}

/// Prepends the single built reference to `cache_from` so the previous image
/// seeds the layer cache. Returns whether the list changed.
pub fn augment_cache_from(references: &[String], no_cache: bool, cache_from: &mut Vec<String>) -> bool {
    match references {
        [reference] => {
            if no_cache || cache_from.contains(reference) {
                return false;
            }
            cache_from.insert(0, reference.clone());
            true
        }
        [] => false,
        _ => {
            tracing::info!(
                count = references.len(),
                "Not adding image to cacheFrom as multiple tags are being built"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_suffix_preserves_order() {
        assert_eq!(
            compute_tags(Some("v1.0.0-rc,v2"), Some("linux-arm64")),
            vec!["v1.0.0-rc-linux-arm64", "v2-linux-arm64"]
        );
    }

    #[test]
    fn test_defaults_to_latest() {
        assert_eq!(compute_tags(None, None), vec!["latest"]);
        assert_eq!(compute_tags(Some(""), Some("linux-amd64")), vec!["latest-linux-amd64"]);
    }

    #[test]
    fn test_whitespace_around_commas_is_trimmed() {
        assert_eq!(compute_tags(Some(" v1 ,  v2,v3 "), None), vec!["v1", "v2", "v3"]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        assert_eq!(compute_tags(Some("a,a"), None), vec!["a", "a"]);
    }

    #[test]
    fn test_image_references() {
        assert_eq!(
            image_references("ghcr.io/o/i", Some("v1,v2"), None),
            vec!["ghcr.io/o/i:v1", "ghcr.io/o/i:v2"]
        );
    }

    #[test]
    fn test_single_reference_is_prepended() {
        let refs = vec!["ghcr.io/o/i:latest".to_string()];
        let mut cache_from = vec!["ghcr.io/o/base:latest".to_string()];
        assert!(augment_cache_from(&refs, false, &mut cache_from));
        assert_eq!(cache_from, vec!["ghcr.io/o/i:latest", "ghcr.io/o/base:latest"]);
    }

    #[test]
    fn test_existing_reference_is_not_duplicated() {
        let refs = vec!["ghcr.io/o/i:latest".to_string()];
        let mut cache_from = vec!["ghcr.io/o/i:latest".to_string()];
        assert!(!augment_cache_from(&refs, false, &mut cache_from));
        assert_eq!(cache_from.len(), 1);
    }

    #[test]
    fn test_no_cache_skips_augmentation() {
        let refs = vec!["ghcr.io/o/i:latest".to_string()];
        let mut cache_from = Vec::new();
        assert!(!augment_cache_from(&refs, true, &mut cache_from));
        assert!(cache_from.is_empty());
    }

    #[test]
    fn test_multiple_references_leave_cache_from_untouched() {
        let refs = vec!["i:v1".to_string(), "i:v2".to_string()];
        let mut cache_from = vec!["other:latest".to_string()];
        assert!(!augment_cache_from(&refs, false, &mut cache_from));
        assert_eq!(cache_from, vec!["other:latest"]);
    }
}
