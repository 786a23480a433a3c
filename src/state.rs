use crate::constants::{STATE_HAS_RUN_MAIN, STATE_MERGE_TAG, STATE_PLATFORM_TAG};
use crate::error::{CiError, Result};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Key/value persistence shared by the main and post phases of one run.
pub trait PhaseStateStore: Send + Sync {
    fn save(&self, key: &str, value: &str) -> Result<()>;
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Forgets everything saved during this run. Stores whose lifetime the
    /// runner already bounds to one run keep the default no-op.
    fn discard(&self) -> Result<()> {
        Ok(())
    }
}

/// Decisions the main phase hands to the post phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseState {
    pub has_run_main: bool,
    /// Comma-joined platform tags of a deferred manifest merge
    pub merge_tag: Option<String>,
    pub platform_tag: Option<String>,
}

impl PhaseState {
    pub fn restore(store: &dyn PhaseStateStore) -> Result<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
        Ok(Self {
            has_run_main: store.load(STATE_HAS_RUN_MAIN)?.as_deref() == Some("true"),
            merge_tag: non_empty(store.load(STATE_MERGE_TAG)?),
            platform_tag: non_empty(store.load(STATE_PLATFORM_TAG)?),
        })
    }

    /// Writes every field that is set. Unset fields are never written.
    pub fn persist(&self, store: &dyn PhaseStateStore) -> Result<()> {
        if self.has_run_main {
            store.save(STATE_HAS_RUN_MAIN, "true")?;
        }
        if let Some(merge_tag) = &self.merge_tag {
            store.save(STATE_MERGE_TAG, merge_tag)?;
        }
        if let Some(platform_tag) = &self.platform_tag {
            store.save(STATE_PLATFORM_TAG, platform_tag)?;
        }
        Ok(())
    }

    /// Platform tags listed in `merge_tag`, in order.
    pub fn merge_platform_tags(&self) -> Vec<String> {
        self.merge_tag
            .as_deref()
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// GitHub Actions state: writes go to `$GITHUB_STATE`, and the runner hands
/// them back to the post step as `STATE_<name>` variables.
pub struct GithubStateStore {
    state_file: Option<PathBuf>,
    env: HashMap<String, String>,
}

impl GithubStateStore {
    pub fn new(state_file: Option<PathBuf>, env: HashMap<String, String>) -> Self {
        Self { state_file, env }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os("GITHUB_STATE").map(PathBuf::from),
            std::env::vars().collect(),
        )
    }
}

impl PhaseStateStore for GithubStateStore {
    fn save(&self, key: &str, value: &str) -> Result<()> {
        let path = self
            .state_file
            .as_ref()
            .ok_or_else(|| CiError::state("save", "GITHUB_STATE is not set"))?;
        append_delimited(path, key, value).map_err(|e| CiError::state("save", e))
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.env.get(&format!("STATE_{}", key)).cloned())
    }
}

/// Appends `name<<delim\nvalue\ndelim` the way runner command files expect.
pub(crate) fn append_delimited(path: &Path, key: &str, value: &str) -> std::io::Result<()> {
    let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}<<{}", key, delimiter)?;
    writeln!(file, "{}", value)?;
    writeln!(file, "{}", delimiter)?;
    Ok(())
}

/// JSON-file state for running both phases outside a CI runner.
pub struct FileStateStore {
    path: PathBuf,
    store: RwLock<HashMap<String, String>>,
}

impl FileStateStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let store = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| CiError::state("open", e))?;
            serde_json::from_str(&content).map_err(|e| CiError::state("open", e))?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            store: RwLock::new(store),
        })
    }

    fn save_index(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&*self.store.read())
            .map_err(|e| CiError::state("save", e))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CiError::state("save", e))?;
        }
        fs::write(&self.path, content).map_err(|e| CiError::state("save", e))
    }
}

impl PhaseStateStore for FileStateStore {
    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.store.write().insert(key.to_string(), value.to_string());
        self.save_index()
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.store.read().get(key).cloned())
    }

    fn discard(&self) -> Result<()> {
        self.store.write().clear();
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| CiError::state("discard", e))?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStateStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.values.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl PhaseStateStore for MemoryStateStore {
    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.values.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn discard(&self) -> Result<()> {
        self.values.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_persist_writes_only_set_fields() {
        let store = MemoryStateStore::new();
        let state = PhaseState {
            has_run_main: false,
            merge_tag: Some("linux-amd64,linux-arm64".to_string()),
            platform_tag: None,
        };
        state.persist(&store).unwrap();
        assert_eq!(store.keys(), vec!["mergeTag"]);
        assert_eq!(PhaseState::restore(&store).unwrap(), state);
    }

    #[test]
    fn test_merge_platform_tags() {
        let state = PhaseState {
            merge_tag: Some("linux-amd64, linux-arm64".to_string()),
            ..Default::default()
        };
        assert_eq!(state.merge_platform_tags(), vec!["linux-amd64", "linux-arm64"]);
        assert!(PhaseState::default().merge_platform_tags().is_empty());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStateStore::open(&path).unwrap();
        PhaseState {
            has_run_main: true,
            merge_tag: None,
            platform_tag: Some("linux-arm64".to_string()),
        }
        .persist(&store)
        .unwrap();

        let reopened = FileStateStore::open(&path).unwrap();
        let state = PhaseState::restore(&reopened).unwrap();
        assert!(state.has_run_main);
        assert_eq!(state.platform_tag.as_deref(), Some("linux-arm64"));
        assert_eq!(state.merge_tag, None);

        reopened.discard().unwrap();
        assert!(!path.exists());
        assert_eq!(reopened.load(STATE_HAS_RUN_MAIN).unwrap(), None);
    }

    #[test]
    fn test_has_run_main_requires_true() {
        let store = MemoryStateStore::new();
        store.save(STATE_HAS_RUN_MAIN, "false").unwrap();
        assert!(!PhaseState::restore(&store).unwrap().has_run_main);

        store.save(STATE_HAS_RUN_MAIN, "true").unwrap();
        assert!(PhaseState::restore(&store).unwrap().has_run_main);
    }

    #[test]
    fn test_github_store_writes_state_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state");
        let store = GithubStateStore::new(Some(path.clone()), HashMap::new());
        store.save("platformTag", "linux-amd64").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("platformTag<<ghadelimiter_"));
        assert_eq!(lines[1], "linux-amd64");
        assert_eq!(lines[0].split_once("<<").unwrap().1, lines[2]);
    }

    #[test]
    fn test_github_store_reads_state_env() {
        let mut env = HashMap::new();
        env.insert("STATE_mergeTag".to_string(), "linux-amd64".to_string());
        env.insert("STATE_platformTag".to_string(), String::new());
        let store = GithubStateStore::new(None, env);

        let state = PhaseState::restore(&store).unwrap();
        assert_eq!(state.merge_tag.as_deref(), Some("linux-amd64"));
        assert_eq!(state.platform_tag, None);
        assert!(!state.has_run_main);
    }

    #[test]
    fn test_github_store_without_state_file_fails_save() {
        let store = GithubStateStore::new(None, HashMap::new());
        assert!(matches!(
            store.save("hasRunMain", "true"),
            Err(CiError::State { .. })
        ));
    }
}
