use crate::application::NowProvider;
use crate::domain::models::{FocusSessionRecord, Task, TaskStatus};
use crate::domain::timer::CompletedFocus;
use crate::infrastructure::api_client::BackendClient;
use crate::infrastructure::error::InfraError;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompletionReport {
    pub session_logged: bool,
    pub completed_task: Option<Task>,
}

pub struct SessionCompletionHandler<B: BackendClient> {
    backend: Arc<B>,
    now_provider: NowProvider,
}

impl<B: BackendClient> SessionCompletionHandler<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    /// Network failures are logged and reflected in the report, never returned.
    pub async fn handle(
        &self,
        token: &str,
        completed: &CompletedFocus,
        known_task: Option<&Task>,
    ) -> CompletionReport {
        let Some(task_id) = completed.task_id.as_deref() else {
            return CompletionReport::default();
        };

        let record =
            FocusSessionRecord::completed(task_id, completed.duration_seconds, (self.now_provider)());
        let session_logged = match self.backend.create_focus_session(token, &record).await {
            Ok(()) => {
                info!(task_id, duration = completed.duration_seconds, "focus session logged");
                true
            }
            Err(error) => {
                warn!(task_id, %error, "failed to log focus session");
                false
            }
        };

        if known_task.is_some_and(Task::is_completed) {
            return CompletionReport {
                session_logged,
                completed_task: None,
            };
        }

        let completed_task = match self.mark_completed(token, task_id).await {
            Ok(task) => Some(task),
            Err(error) => {
                warn!(task_id, %error, "failed to mark task completed");
                None
            }
        };

        CompletionReport {
            session_logged,
            completed_task,
        }
    }

    pub async fn mark_completed(&self, token: &str, task_id: &str) -> Result<Task, InfraError> {
        let mut task = self
            .backend
            .update_task_status(token, task_id, TaskStatus::Completed)
            .await?;
        // Some backends echo the pre-update document.
        task.status = TaskStatus::Completed;
        info!(task_id, "task marked completed");
        Ok(task)
    }
}
