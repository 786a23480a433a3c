// Centralized constants for devcontainer-ci to avoid magic strings and numbers

/// Phase-state key marking that the main phase has already run in this job
pub const STATE_HAS_RUN_MAIN: &str = "hasRunMain";

/// Phase-state key holding the comma-joined platform tags of a deferred merge
pub const STATE_MERGE_TAG: &str = "mergeTag";

/// Phase-state key holding the platform suffix used by a per-platform build
pub const STATE_PLATFORM_TAG: &str = "platformTag";

/// Tag used when no image tag input is given
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Largest command output exposed as an action output (1 MB)
pub const MAX_OUTPUT_BYTES: usize = 1_000_000;

/// Marker appended to command output that had to be cut
pub const TRUNCATION_MARKER: &str = "\n\nTRUNCATED: output exceeds 1MB...";

/// Byte length output is cut to before the marker is appended
pub const TRUNCATED_OUTPUT_BYTES: usize = 999_966;

/// Archive written by platform builds that publish through a copy step
pub const OCI_ARCHIVE_PATH: &str = "/tmp/output.tar";

/// Build output mode for platform builds published from an archive
pub const OUTPUT_MODE_ARCHIVE: &str = "type=oci,dest=/tmp/output.tar";

/// Build output mode for platform builds loaded into the local engine
pub const OUTPUT_MODE_DOCKER: &str = "type=docker";

/// Action output carrying the captured run command log
pub const OUTPUT_RUN_CMD: &str = "runCmdOutput";

/// npm package providing the devcontainer CLI
pub const DEVCONTAINER_CLI_PACKAGE: &str = "@devcontainers/cli";

/// CLI version installed when none is requested
pub const DEFAULT_DEVCONTAINER_CLI_VERSION: &str = "0.58.0";

/// CI-visible files bound into the dev container, with their container targets
pub const CI_FILE_BINDINGS: [(&str, &str); 4] = [
    ("GITHUB_ENV", "/mnt/github/env"),
    ("GITHUB_OUTPUT", "/mnt/github/output"),
    ("GITHUB_PATH", "/mnt/github/path"),
    ("GITHUB_STEP_SUMMARY", "/mnt/github/step-summary"),
];
