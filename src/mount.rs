use crate::error::{CiError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A mount as accepted by `--mount` on the devcontainer CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    #[serde(rename = "type")]
    pub mount_type: String,
    pub source: String,
    pub target: String,
}

impl MountSpec {
    pub fn bind(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            mount_type: "bind".to_string(),
            source: source.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for MountSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type={},source={},target={}",
            self.mount_type, self.source, self.target
        )
    }
}

impl std::str::FromStr for MountSpec {
    type Err = CiError;

    fn from_str(s: &str) -> Result<Self> {
        parse_mount(s)
    }
}

/// Parses a comma-delimited mount option string.
///
/// Supported keys:
/// - type=<type>
/// - src=<path> | source=<path>
/// - dst=<path> | destination=<path> | target=<path>
/// - readonly | ro (optionally with a value, accepted and ignored)
pub fn parse_mount(spec: &str) -> Result<MountSpec> {
    let mut mount_type = None;
    let mut source = None;
    let mut target = None;

    for token in spec.split(',') {
        let (key, value) = match token.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (token, None),
        };

        match key.to_lowercase().as_str() {
            "type" => mount_type = value.map(str::to_string),
            "src" | "source" => source = value.map(str::to_string),
            "dst" | "destination" | "target" => target = value.map(str::to_string),
            "readonly" | "ro" => {}
            _ => {
                return Err(CiError::parse(format!(
                    "Unhandled mount option '{}'",
                    token
                )))
            }
        }
    }

    let missing = |field: &str| CiError::parse(format!("Mount '{}' is missing '{}'", spec, field));

    Ok(MountSpec {
        mount_type: mount_type.ok_or_else(|| missing("type"))?,
        source: source.ok_or_else(|| missing("source"))?,
        target: target.ok_or_else(|| missing("target"))?,
    })
}
