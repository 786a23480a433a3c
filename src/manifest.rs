use crate::error::{CiError, Result};
use crate::tools::{Exec, ExecOptions};

/// Arguments for `docker buildx imagetools create` merging the per-platform
/// images of one tag into a manifest list.
pub fn manifest_args(image_name: &str, tag: &str, platform_tags: &[String]) -> Vec<String> {
    let mut args = vec![
        "buildx".to_string(),
        "imagetools".to_string(),
        "create".to_string(),
        "-t".to_string(),
        format!("{}:{}", image_name, tag),
    ];
    args.extend(
        platform_tags
            .iter()
            .map(|platform| format!("{}:{}-{}", image_name, tag, platform)),
    );
    args
}

/// Creates the multi-arch tag `image_name:tag`. One invocation per call.
pub async fn create_manifest(
    exec: &dyn Exec,
    image_name: &str,
    tag: &str,
    platform_tags: &[String],
) -> Result<()> {
    let args = manifest_args(image_name, tag, platform_tags);
    let result = exec.exec("docker", &args, &ExecOptions::default()).await?;

    if !result.success() {
        return Err(CiError::Manifest {
            code: result.exit_code,
        });
    }

    tracing::debug!(image_name, tag, platforms = platform_tags.len(), "imagetools create finished");
    Ok(())
}
