pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{bootstrap_workspace, BootstrapResult};
pub use application::focus_app::{FocusApp, LogoutReason};
pub use application::notification_store::NotificationEvent;
pub use domain::models::{LevelProgress, Notification, NotificationKind, Task, TaskStatus, User};
pub use domain::timer::{TimerPhase, TimerSnapshot};
pub use infrastructure::config::AppConfig;
pub use infrastructure::error::InfraError;

use infrastructure::api_client::ReqwestBackendClient;
use infrastructure::logging::init_logging;
use infrastructure::storage::SqliteLocalStore;
use std::path::Path;
use std::sync::Arc;

pub type DesktopApp = FocusApp<ReqwestBackendClient, SqliteLocalStore>;

/// Prepares the workspace under `workspace_root` and wires the production app.
///
/// Call from inside a tokio runtime so the timer and pollers can spawn.
pub fn launch(workspace_root: &Path) -> Result<DesktopApp, InfraError> {
    let bootstrap = bootstrap_workspace(workspace_root)?;
    if !init_logging(&bootstrap.logs_dir)? {
        tracing::debug!("tracing subscriber already installed");
    }

    let backend = Arc::new(ReqwestBackendClient::new(&bootstrap.config.api_base_url)?);
    let local_store = Arc::new(SqliteLocalStore::new(&bootstrap.database_path));
    tracing::info!(
        workspace = %bootstrap.workspace_root.display(),
        api_base_url = %bootstrap.config.api_base_url,
        "focusdesk launched"
    );
    Ok(FocusApp::new(backend, local_store, bootstrap.config))
}
