use crate::domain::models::{DueNotice, FocusSessionRecord, Task, TaskStatus, User};
use crate::infrastructure::api_client::BackendClient;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

pub(crate) fn sample_user(id: &str, xp: u64) -> User {
    User {
        id: id.to_string(),
        name: format!("User {id}"),
        email: format!("{id}@example.test"),
        xp,
        level: None,
    }
}

pub(crate) fn sample_task(id: &str, title: &str) -> Task {
    Task {
        id: id.to_string(),
        title: title.to_string(),
        description: None,
        due_date: None,
        status: TaskStatus::Pending,
        priority: Default::default(),
    }
}

#[derive(Default)]
pub(crate) struct FakeBackendClient {
    accounts: Mutex<HashMap<String, (String, String)>>,
    users: Mutex<HashMap<String, User>>,
    tasks: Mutex<Vec<Task>>,
    due_notices: Mutex<Vec<DueNotice>>,
    pub sessions: Mutex<Vec<FocusSessionRecord>>,
    pub status_updates: Mutex<Vec<(String, TaskStatus)>>,
    pub fail_session_log: AtomicBool,
    pub fail_task_update: AtomicBool,
    pub fail_feed: AtomicBool,
    pub xp_per_completion: AtomicU64,
    pub user_calls: AtomicUsize,
    pub feed_calls: AtomicUsize,
}

impl FakeBackendClient {
    pub fn with_account(self, email: &str, password: &str, token: &str, user: User) -> Self {
        self.accounts
            .lock()
            .expect("accounts lock")
            .insert(email.to_string(), (password.to_string(), token.to_string()));
        self.users
            .lock()
            .expect("users lock")
            .insert(token.to_string(), user);
        self
    }

    pub fn with_tasks(self, tasks: Vec<Task>) -> Self {
        *self.tasks.lock().expect("tasks lock") = tasks;
        self
    }

    pub fn with_due_notices(self, notices: Vec<DueNotice>) -> Self {
        *self.due_notices.lock().expect("notices lock") = notices;
        self
    }

    pub fn replace_tasks(&self, tasks: Vec<Task>) {
        *self.tasks.lock().expect("tasks lock") = tasks;
    }

    pub fn set_user_xp(&self, token: &str, xp: u64) {
        if let Some(user) = self.users.lock().expect("users lock").get_mut(token) {
            user.xp = xp;
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().expect("sessions lock").len()
    }

    pub fn status_update_count(&self) -> usize {
        self.status_updates.lock().expect("updates lock").len()
    }

    fn user_for(&self, token: &str) -> Result<User, InfraError> {
        self.users
            .lock()
            .expect("users lock")
            .get(token)
            .cloned()
            .ok_or(InfraError::Unauthenticated)
    }
}

#[async_trait]
impl BackendClient for FakeBackendClient {
    async fn login(&self, email: &str, password: &str) -> Result<String, InfraError> {
        let accounts = self.accounts.lock().expect("accounts lock");
        match accounts.get(email) {
            Some((expected, token)) if expected == password => Ok(token.clone()),
            _ => Err(InfraError::Unauthenticated),
        }
    }

    async fn current_user(&self, token: &str) -> Result<User, InfraError> {
        self.user_calls.fetch_add(1, Ordering::SeqCst);
        self.user_for(token)
    }

    async fn list_tasks(&self, token: &str) -> Result<Vec<Task>, InfraError> {
        self.user_for(token)?;
        Ok(self.tasks.lock().expect("tasks lock").clone())
    }

    async fn update_task_status(
        &self,
        token: &str,
        task_id: &str,
        status: TaskStatus,
    ) -> Result<Task, InfraError> {
        self.user_for(token)?;
        if self.fail_task_update.load(Ordering::SeqCst) {
            return Err(InfraError::Http("updating task failed: http 503".to_string()));
        }
        self.status_updates
            .lock()
            .expect("updates lock")
            .push((task_id.to_string(), status));

        let xp_gain = self.xp_per_completion.load(Ordering::SeqCst);
        if let Some(user) = self.users.lock().expect("users lock").get_mut(token) {
            user.xp += xp_gain;
        }

        let mut tasks = self.tasks.lock().expect("tasks lock");
        match tasks.iter_mut().find(|task| task.id == task_id) {
            Some(task) => {
                task.status = status;
                Ok(task.clone())
            }
            None => {
                let mut task = sample_task(task_id, task_id);
                task.status = status;
                Ok(task)
            }
        }
    }

    async fn create_focus_session(
        &self,
        token: &str,
        record: &FocusSessionRecord,
    ) -> Result<(), InfraError> {
        self.user_for(token)?;
        if self.fail_session_log.load(Ordering::SeqCst) {
            return Err(InfraError::Http("network error while logging focus session".to_string()));
        }
        self.sessions
            .lock()
            .expect("sessions lock")
            .push(record.clone());
        Ok(())
    }

    async fn due_notices(&self, token: &str) -> Result<Vec<DueNotice>, InfraError> {
        self.user_for(token)?;
        self.feed_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_feed.load(Ordering::SeqCst) {
            return Err(InfraError::Http("fetching due notifications failed: http 500".to_string()));
        }
        Ok(self.due_notices.lock().expect("notices lock").clone())
    }
}
