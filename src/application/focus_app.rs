use crate::application::notification_dispatcher::{DispatchContext, NotificationDispatcher};
use crate::application::notification_store::{NotificationEvent, NotificationStore};
use crate::application::session_completion::SessionCompletionHandler;
use crate::application::NowProvider;
use crate::domain::models::{DueNotice, NewNotification, Notification, Task, User};
use crate::domain::timer::{CompletedFocus, FocusTimer, TickOutcome, TimerSnapshot};
use crate::infrastructure::api_client::BackendClient;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::{LocalStore, DURATION_KEY, TOKEN_KEY};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Holds at most one background task; replacing or cancelling aborts the previous one.
#[derive(Debug, Default)]
struct TaskSlot {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TaskSlot {
    fn replace(&self, handle: JoinHandle<()>) {
        if let Some(previous) = self.lock().replace(handle) {
            previous.abort();
        }
    }

    fn cancel(&self) {
        if let Some(previous) = self.lock().take() {
            previous.abort();
        }
    }

    fn is_active(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[derive(Debug, Clone)]
struct Session {
    token: String,
    user: User,
}

/// Identifies the session an async flow started under, so stale results can be dropped.
#[derive(Debug, Clone)]
struct SessionTicket {
    token: String,
    generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
    Requested,
    Inactivity,
}

#[derive(Debug)]
struct RuntimeState {
    timer: FocusTimer,
    session: Option<Session>,
    tasks: Vec<Task>,
    dispatch: DispatchContext,
    generation: u64,
    last_logout: Option<LogoutReason>,
}

impl RuntimeState {
    fn is_current(&self, ticket: &SessionTicket) -> bool {
        self.session.is_some() && self.generation == ticket.generation
    }

    fn clear_session(&mut self) -> Option<Session> {
        self.generation += 1;
        self.timer.set_focused_task(None);
        self.tasks.clear();
        self.dispatch = DispatchContext::default();
        self.session.take()
    }
}

struct CompletionJob {
    ticket: SessionTicket,
    completed: CompletedFocus,
    known_task: Option<Task>,
}

enum TickStep {
    Continue,
    Stop,
    Completed(Option<CompletionJob>),
}

struct AppInner<B: BackendClient, S: LocalStore> {
    backend: Arc<B>,
    local_store: Arc<S>,
    config: AppConfig,
    notifications: NotificationStore<S>,
    dispatcher: NotificationDispatcher,
    completion: SessionCompletionHandler<B>,
    now_provider: NowProvider,
    runtime: Mutex<RuntimeState>,
    tick_task: TaskSlot,
    idle_logout: TaskSlot,
    pollers: Mutex<Vec<JoinHandle<()>>>,
}

/// Clones share the same state and background tasks.
pub struct FocusApp<B: BackendClient + 'static, S: LocalStore + 'static> {
    inner: Arc<AppInner<B, S>>,
}

impl<B: BackendClient + 'static, S: LocalStore + 'static> Clone for FocusApp<B, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: BackendClient + 'static, S: LocalStore + 'static> FocusApp<B, S> {
    pub fn new(backend: Arc<B>, local_store: Arc<S>, config: AppConfig) -> Self {
        Self::new_with_now_provider(backend, local_store, config, Arc::new(Utc::now))
    }

    pub fn new_with_now_provider(
        backend: Arc<B>,
        local_store: Arc<S>,
        config: AppConfig,
        now_provider: NowProvider,
    ) -> Self {
        let duration_minutes = stored_duration_minutes(local_store.as_ref())
            .unwrap_or(config.default_duration_minutes);
        let notifications = NotificationStore::new(
            Arc::clone(&local_store),
            Duration::from_secs(config.toast_lifetime_seconds),
        )
        .with_now_provider(Arc::clone(&now_provider));
        let completion = SessionCompletionHandler::new(Arc::clone(&backend))
            .with_now_provider(Arc::clone(&now_provider));

        Self {
            inner: Arc::new(AppInner {
                backend,
                local_store,
                dispatcher: NotificationDispatcher::new(config.due_window),
                config,
                notifications,
                completion,
                now_provider,
                runtime: Mutex::new(RuntimeState {
                    timer: FocusTimer::new(duration_minutes),
                    session: None,
                    tasks: Vec::new(),
                    dispatch: DispatchContext::default(),
                    generation: 0,
                    last_logout: None,
                }),
                tick_task: TaskSlot::default(),
                idle_logout: TaskSlot::default(),
                pollers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        error!(command, %error, "command failed");
        error.to_string()
    }

    // Session

    pub async fn login(&self, email: &str, password: &str) -> Result<User, InfraError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(InfraError::InvalidInput(
                "email and password must not be empty".to_string(),
            ));
        }
        let token = self.inner.backend.login(email, password).await?;
        let user = self.sign_in(&token).await?;
        self.inner.local_store.set(TOKEN_KEY, &token)?;
        info!(user_id = %user.id, "logged in");
        Ok(user)
    }

    /// Signs in with the persisted token, if any. A rejected token is discarded.
    pub async fn restore_session(&self) -> Result<Option<User>, InfraError> {
        let Some(token) = self.inner.local_store.get(TOKEN_KEY)? else {
            return Ok(None);
        };
        match self.sign_in(&token).await {
            Ok(user) => {
                info!(user_id = %user.id, "session restored");
                Ok(Some(user))
            }
            Err(InfraError::Unauthenticated) => {
                warn!("stored token was rejected; clearing it");
                self.inner.local_store.remove(TOKEN_KEY)?;
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    pub fn logout(&self) -> Result<(), InfraError> {
        self.inner.end_session(LogoutReason::Requested, None)?;
        Ok(())
    }

    /// Re-arms the inactivity logout. No-op while signed out.
    pub fn record_activity(&self) -> Result<(), InfraError> {
        match self.inner.ticket() {
            Ok(ticket) => {
                self.inner.arm_idle_logout(&ticket);
                Ok(())
            }
            Err(InfraError::Unauthenticated) => Ok(()),
            Err(error) => Err(error),
        }
    }

    pub fn last_logout_reason(&self) -> Result<Option<LogoutReason>, InfraError> {
        Ok(self.inner.lock_runtime()?.last_logout)
    }

    pub fn shutdown(&self) {
        self.inner.stop_background();
        debug!("background tasks stopped");
    }

    pub fn is_authenticated(&self) -> Result<bool, InfraError> {
        Ok(self.inner.lock_runtime()?.session.is_some())
    }

    pub fn current_user(&self) -> Result<Option<User>, InfraError> {
        Ok(self
            .inner
            .lock_runtime()?
            .session
            .as_ref()
            .map(|session| session.user.clone()))
    }

    async fn sign_in(&self, token: &str) -> Result<User, InfraError> {
        let user = self.inner.backend.current_user(token).await?;
        user.validate().map_err(InfraError::InvalidInput)?;

        let ticket = self.inner.begin_session(token, user.clone())?;
        self.inner.spawn_pollers();
        self.inner.arm_idle_logout(&ticket);
        if let Err(error) = self.inner.refresh_tasks_for(&ticket).await {
            warn!(user_id = %user.id, %error, "initial task fetch failed");
        }
        Ok(user)
    }

    // Timer

    pub fn start_timer(&self) -> Result<TimerSnapshot, InfraError> {
        let snapshot = {
            let mut runtime = self.inner.lock_runtime()?;
            if !runtime.timer.start() {
                return Ok(runtime.timer.snapshot());
            }
            runtime.timer.snapshot()
        };
        self.inner.restart_ticker();
        info!(task_id = ?snapshot.focused_task_id, "timer started");
        Ok(snapshot)
    }

    pub fn pause_timer(&self) -> Result<TimerSnapshot, InfraError> {
        self.inner.tick_task.cancel();
        let mut runtime = self.inner.lock_runtime()?;
        if runtime.timer.pause() {
            info!(remaining = runtime.timer.remaining_seconds(), "timer paused");
        }
        Ok(runtime.timer.snapshot())
    }

    pub fn reset_timer(&self) -> Result<TimerSnapshot, InfraError> {
        self.inner.tick_task.cancel();
        let mut runtime = self.inner.lock_runtime()?;
        runtime.timer.reset();
        Ok(runtime.timer.snapshot())
    }

    /// Clamps to 1..=120 minutes and persists the choice as the global default.
    pub fn set_duration(&self, minutes: u32) -> Result<TimerSnapshot, InfraError> {
        let (applied, running, snapshot) = {
            let mut runtime = self.inner.lock_runtime()?;
            let applied = runtime.timer.set_duration(minutes);
            (applied, runtime.timer.is_running(), runtime.timer.snapshot())
        };
        self.inner
            .local_store
            .set(DURATION_KEY, &applied.to_string())?;
        if running {
            self.inner.restart_ticker();
        }
        info!(minutes = applied, "timer duration changed");
        Ok(snapshot)
    }

    pub fn set_focused_task(&self, task_id: Option<&str>) -> Result<TimerSnapshot, InfraError> {
        let task_id = task_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        self.inner.tick_task.cancel();
        let mut runtime = self.inner.lock_runtime()?;
        runtime.timer.set_focused_task(task_id);
        Ok(runtime.timer.snapshot())
    }

    pub fn timer_snapshot(&self) -> Result<TimerSnapshot, InfraError> {
        Ok(self.inner.lock_runtime()?.timer.snapshot())
    }

    pub fn is_ticking(&self) -> bool {
        self.inner.tick_task.is_active()
    }

    // Tasks and user

    pub fn tasks(&self) -> Result<Vec<Task>, InfraError> {
        Ok(self.inner.lock_runtime()?.tasks.clone())
    }

    pub async fn refresh_tasks(&self) -> Result<Vec<Task>, InfraError> {
        let ticket = self.inner.ticket()?;
        self.inner.refresh_tasks_for(&ticket).await
    }

    pub fn set_tasks(&self, tasks: Vec<Task>) -> Result<(), InfraError> {
        for task in &tasks {
            task.validate().map_err(InfraError::InvalidInput)?;
        }
        let ticket = self.inner.ticket()?;
        self.inner.apply_tasks(&ticket, tasks)?;
        Ok(())
    }

    pub async fn refresh_user(&self) -> Result<User, InfraError> {
        let ticket = self.inner.ticket()?;
        self.inner.refresh_user_for(&ticket).await
    }

    pub fn observe_user(&self, user: User) -> Result<(), InfraError> {
        let ticket = self.inner.ticket()?;
        self.inner.observe_user_for(&ticket, user)?;
        Ok(())
    }

    pub async fn complete_task(&self, task_id: &str) -> Result<Task, InfraError> {
        let task_id = task_id.trim();
        if task_id.is_empty() {
            return Err(InfraError::InvalidInput("task id must not be empty".to_string()));
        }
        let ticket = self.inner.ticket()?;
        if let Some(cached) = self.inner.cached_task(task_id)? {
            if cached.is_completed() {
                return Ok(cached);
            }
        }

        let task = self
            .inner
            .completion
            .mark_completed(&ticket.token, task_id)
            .await?;
        self.inner.record_completed_task(&ticket, task.clone())?;
        self.inner.refresh_user_quietly(&ticket).await;
        Ok(task)
    }

    // Polling

    pub fn poll_due_dates(&self) -> Result<usize, InfraError> {
        self.inner.poll_due_dates()
    }

    pub async fn poll_backend_feed(&self) -> usize {
        self.inner.poll_backend_feed().await
    }

    // Notifications

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<NotificationEvent> {
        self.inner.notifications.subscribe()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.notifications.notifications()
    }

    pub fn toasts(&self) -> Vec<Notification> {
        self.inner.notifications.toasts()
    }

    pub fn unread_count(&self) -> usize {
        self.inner.notifications.unread_count()
    }

    pub fn mark_notification_read(&self, id: &str) -> bool {
        self.inner.notifications.mark_read(id)
    }

    pub fn mark_all_notifications_read(&self) -> usize {
        self.inner.notifications.mark_all_read()
    }

    pub fn remove_notification(&self, id: &str) -> bool {
        self.inner.notifications.remove(id)
    }

    pub fn clear_notifications(&self) {
        self.inner.notifications.clear_all();
    }
}

impl<B: BackendClient + 'static, S: LocalStore + 'static> AppInner<B, S> {
    fn lock_runtime(&self) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
        self.runtime
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("runtime lock poisoned: {error}")))
    }

    fn ticket(&self) -> Result<SessionTicket, InfraError> {
        let runtime = self.lock_runtime()?;
        let session = runtime.session.as_ref().ok_or(InfraError::Unauthenticated)?;
        Ok(SessionTicket {
            token: session.token.clone(),
            generation: runtime.generation,
        })
    }

    fn cached_task(&self, task_id: &str) -> Result<Option<Task>, InfraError> {
        Ok(self
            .lock_runtime()?
            .tasks
            .iter()
            .find(|task| task.id == task_id)
            .cloned())
    }

    fn emit_all(&self, notifications: Vec<NewNotification>) -> usize {
        let count = notifications.len();
        for notification in notifications {
            self.notifications.add(notification);
        }
        count
    }

    fn begin_session(&self, token: &str, user: User) -> Result<SessionTicket, InfraError> {
        self.stop_background();
        let mut runtime = self.lock_runtime()?;
        if let Some(previous) = runtime.clear_session() {
            debug!(user_id = %previous.user.id, "replacing active session");
        }
        runtime.last_logout = None;
        self.notifications.load_for_user(&user.id);

        let level_up = self.dispatcher.check_level(&mut runtime.dispatch, &user);
        runtime.session = Some(Session {
            token: token.to_string(),
            user,
        });
        self.emit_all(level_up.into_iter().collect());

        Ok(SessionTicket {
            token: token.to_string(),
            generation: runtime.generation,
        })
    }

    /// With `expected_generation`, only ends the session that generation belongs to.
    fn end_session(
        &self,
        reason: LogoutReason,
        expected_generation: Option<u64>,
    ) -> Result<bool, InfraError> {
        let ended = {
            let mut runtime = self.lock_runtime()?;
            if let Some(generation) = expected_generation {
                if runtime.session.is_none() || runtime.generation != generation {
                    return Ok(false);
                }
            }
            let ended = runtime.clear_session();
            runtime.last_logout = Some(reason);
            self.notifications.detach_user();
            ended
        };
        self.stop_background();
        self.local_store.remove(TOKEN_KEY)?;
        if let Some(session) = &ended {
            info!(user_id = %session.user.id, ?reason, "logged out");
        }
        Ok(ended.is_some())
    }

    fn arm_idle_logout(self: &Arc<Self>, ticket: &SessionTicket) {
        let Ok(runtime) = Handle::try_current() else {
            debug!("no async runtime; inactivity logout disabled");
            return;
        };
        let limit = Duration::from_secs(self.config.inactivity_limit_seconds);
        let generation = ticket.generation;
        let weak = Arc::downgrade(self);
        let handle = runtime.spawn(async move {
            loop {
                tokio::time::sleep(limit).await;
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                // A running focus timer keeps the session open.
                match inner.lock_runtime().map(|runtime| runtime.timer.is_running()) {
                    Ok(true) => continue,
                    Ok(false) => {}
                    Err(error) => {
                        warn!(%error, "inactivity check failed");
                        return;
                    }
                }
                if let Err(error) = inner.end_session(LogoutReason::Inactivity, Some(generation)) {
                    warn!(%error, "inactivity logout failed");
                }
                return;
            }
        });
        self.idle_logout.replace(handle);
    }

    fn stop_background(&self) {
        self.tick_task.cancel();
        self.idle_logout.cancel();
        let mut pollers = self.pollers.lock().unwrap_or_else(PoisonError::into_inner);
        for poller in pollers.drain(..) {
            poller.abort();
        }
    }

    fn restart_ticker(self: &Arc<Self>) {
        match self.spawn_tick_loop() {
            Some(handle) => self.tick_task.replace(handle),
            None => debug!("no async runtime; timer is not ticking"),
        }
    }

    fn spawn_tick_loop(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let runtime = Handle::try_current().ok()?;
        let weak = Arc::downgrade(self);
        Some(runtime.spawn(async move {
            let mut ticker = tokio::time::interval(TICK_PERIOD);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                match inner.advance_one_second() {
                    Ok(TickStep::Continue) => {}
                    Ok(TickStep::Stop) => break,
                    Ok(TickStep::Completed(job)) => {
                        if let Some(job) = job {
                            tokio::spawn(Arc::clone(&inner).run_completion(job));
                        }
                        break;
                    }
                    Err(error) => {
                        error!(%error, "timer tick failed");
                        break;
                    }
                }
            }
        }))
    }

    fn advance_one_second(&self) -> Result<TickStep, InfraError> {
        let mut runtime = self.lock_runtime()?;
        let completed = match runtime.timer.tick() {
            TickOutcome::Ignored => return Ok(TickStep::Stop),
            TickOutcome::Ticked { .. } => return Ok(TickStep::Continue),
            TickOutcome::Completed(completed) => completed,
        };

        // Reset before any network work so the UI sees a fresh countdown.
        runtime.timer.reset();
        info!(task_id = ?completed.task_id, "focus session finished");

        let Some(task_id) = completed.task_id.clone() else {
            return Ok(TickStep::Completed(None));
        };
        let Some(session) = runtime.session.as_ref() else {
            debug!(task_id = %task_id, "no active session; completion not recorded");
            return Ok(TickStep::Completed(None));
        };
        let job = CompletionJob {
            ticket: SessionTicket {
                token: session.token.clone(),
                generation: runtime.generation,
            },
            known_task: runtime.tasks.iter().find(|task| task.id == task_id).cloned(),
            completed,
        };
        Ok(TickStep::Completed(Some(job)))
    }

    async fn run_completion(self: Arc<Self>, job: CompletionJob) {
        let report = self
            .completion
            .handle(&job.ticket.token, &job.completed, job.known_task.as_ref())
            .await;
        let Some(task) = report.completed_task else {
            return;
        };
        match self.record_completed_task(&job.ticket, task) {
            Ok(true) => self.refresh_user_quietly(&job.ticket).await,
            Ok(false) => debug!("session changed before completion was recorded"),
            Err(error) => warn!(%error, "failed to record completed task"),
        }
    }

    fn record_completed_task(&self, ticket: &SessionTicket, task: Task) -> Result<bool, InfraError> {
        let mut runtime = self.lock_runtime()?;
        if !runtime.is_current(ticket) {
            return Ok(false);
        }
        if let Some(cached) = runtime.tasks.iter_mut().find(|cached| cached.id == task.id) {
            *cached = task.clone();
        }
        self.notifications.add(NewNotification::task_completed(&task));
        Ok(true)
    }

    async fn refresh_tasks_for(&self, ticket: &SessionTicket) -> Result<Vec<Task>, InfraError> {
        let tasks = self.backend.list_tasks(&ticket.token).await?;
        self.apply_tasks(ticket, tasks.clone())?;
        Ok(tasks)
    }

    fn apply_tasks(&self, ticket: &SessionTicket, tasks: Vec<Task>) -> Result<bool, InfraError> {
        let mut guard = self.lock_runtime()?;
        if !guard.is_current(ticket) {
            return Ok(false);
        }
        let runtime = &mut *guard;
        runtime.tasks = tasks;
        let emitted = self.dispatcher.check_due_dates(
            &mut runtime.dispatch,
            &runtime.tasks,
            (self.now_provider)(),
        );
        self.emit_all(emitted);
        Ok(true)
    }

    async fn refresh_user_for(&self, ticket: &SessionTicket) -> Result<User, InfraError> {
        let user = self.backend.current_user(&ticket.token).await?;
        self.observe_user_for(ticket, user.clone())?;
        Ok(user)
    }

    async fn refresh_user_quietly(&self, ticket: &SessionTicket) {
        if let Err(error) = self.refresh_user_for(ticket).await {
            warn!(%error, "user refresh failed");
        }
    }

    fn observe_user_for(&self, ticket: &SessionTicket, user: User) -> Result<bool, InfraError> {
        let mut guard = self.lock_runtime()?;
        if !guard.is_current(ticket) {
            return Ok(false);
        }
        let runtime = &mut *guard;
        let Some(session) = runtime.session.as_mut() else {
            return Ok(false);
        };
        if session.user.id != user.id {
            return Err(InfraError::InvalidInput(format!(
                "user {} does not match the active session",
                user.id
            )));
        }
        let level_up = self.dispatcher.check_level(&mut runtime.dispatch, &user);
        session.user = user;
        self.emit_all(level_up.into_iter().collect());
        Ok(true)
    }

    fn poll_due_dates(&self) -> Result<usize, InfraError> {
        let mut guard = self.lock_runtime()?;
        if guard.session.is_none() {
            return Ok(0);
        }
        let runtime = &mut *guard;
        let emitted = self.dispatcher.check_due_dates(
            &mut runtime.dispatch,
            &runtime.tasks,
            (self.now_provider)(),
        );
        Ok(self.emit_all(emitted))
    }

    async fn poll_backend_feed(&self) -> usize {
        let Ok(ticket) = self.ticket() else {
            return 0;
        };
        let notices = match self.backend.due_notices(&ticket.token).await {
            Ok(notices) => notices,
            Err(error) => {
                warn!(%error, "due notification feed failed");
                return 0;
            }
        };
        match self.absorb_feed(&ticket, notices) {
            Ok(count) => count,
            Err(error) => {
                warn!(%error, "failed to apply due notification feed");
                0
            }
        }
    }

    fn absorb_feed(&self, ticket: &SessionTicket, notices: Vec<DueNotice>) -> Result<usize, InfraError> {
        let mut runtime = self.lock_runtime()?;
        if !runtime.is_current(ticket) {
            return Ok(0);
        }
        let emitted = self.dispatcher.absorb_feed(&mut runtime.dispatch, notices);
        Ok(self.emit_all(emitted))
    }

    fn spawn_pollers(self: &Arc<Self>) {
        let Ok(runtime) = Handle::try_current() else {
            debug!("no async runtime; background polling disabled");
            return;
        };

        let due_every = Duration::from_secs(self.config.due_check_interval_seconds);
        let weak = Arc::downgrade(self);
        let due_loop = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(due_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Task list updates already run the check.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if let Err(error) = inner.poll_due_dates() {
                    warn!(%error, "due date check failed");
                }
            }
        });

        let feed_every = Duration::from_secs(self.config.feed_poll_interval_seconds);
        let weak = Arc::downgrade(self);
        let feed_loop = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(feed_every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.poll_backend_feed().await;
            }
        });

        let mut pollers = self.pollers.lock().unwrap_or_else(PoisonError::into_inner);
        pollers.push(due_loop);
        pollers.push(feed_loop);
    }
}

impl<B: BackendClient, S: LocalStore> Drop for AppInner<B, S> {
    fn drop(&mut self) {
        let pollers = self.pollers.get_mut().unwrap_or_else(PoisonError::into_inner);
        for poller in pollers.drain(..) {
            poller.abort();
        }
    }
}

fn stored_duration_minutes<S: LocalStore>(local_store: &S) -> Option<u32> {
    match local_store.get(DURATION_KEY) {
        Ok(Some(raw)) => match raw.trim().parse::<u32>() {
            Ok(minutes) => Some(minutes),
            Err(error) => {
                warn!(value = %raw, %error, "ignoring unreadable stored duration");
                None
            }
        },
        Ok(None) => None,
        Err(error) => {
            warn!(%error, "failed to read stored duration");
            None
        }
    }
}
