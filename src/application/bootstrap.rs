use crate::infrastructure::config::{ensure_default_configs, load_app_config_with_lookup, AppConfig};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::initialize_database;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct BootstrapResult {
    pub workspace_root: PathBuf,
    pub config_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub database_path: PathBuf,
    pub config: AppConfig,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    bootstrap_workspace_with_lookup(workspace_root, |key| std::env::var(key).ok())
}

pub fn bootstrap_workspace_with_lookup<F>(
    workspace_root: &Path,
    lookup: F,
) -> Result<BootstrapResult, InfraError>
where
    F: Fn(&str) -> Option<String>,
{
    let config_dir = workspace_root.join("config");
    let state_dir = workspace_root.join("state");
    let logs_dir = workspace_root.join("logs");
    let database_path = state_dir.join("focusdesk.sqlite");

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&state_dir)?;
    fs::create_dir_all(&logs_dir)?;

    ensure_default_configs(&config_dir)?;
    let config = load_app_config_with_lookup(&config_dir, lookup)?;
    initialize_database(&database_path)?;

    Ok(BootstrapResult {
        workspace_root: workspace_root.to_path_buf(),
        config_dir,
        logs_dir,
        database_path,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::{LocalStore, SqliteLocalStore, DURATION_KEY};

    #[test]
    fn bootstrap_creates_layout_and_usable_database() {
        let root = std::env::temp_dir().join(format!("focusdesk-bootstrap-{}", std::process::id()));
        let result = bootstrap_workspace_with_lookup(&root, |_| None).expect("bootstrap");

        assert!(result.config_dir.join("app.json").exists());
        assert!(result.logs_dir.is_dir());
        assert_eq!(result.config, AppConfig::default());

        let store = SqliteLocalStore::new(&result.database_path);
        store.set(DURATION_KEY, "30").expect("write to bootstrapped database");
        assert_eq!(store.get(DURATION_KEY).expect("read"), Some("30".to_string()));

        let again = bootstrap_workspace_with_lookup(&root, |_| None).expect("second bootstrap");
        assert_eq!(again.database_path, result.database_path);

        let _ = fs::remove_dir_all(&root);
    }
}
