use crate::application::{next_id, NowProvider};
use crate::domain::models::{NewNotification, Notification};
use crate::infrastructure::storage::{notifications_key, LocalStore};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const EVENT_CHANNEL_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    Added(Notification),
    Read { id: String },
    AllRead,
    Removed { id: String },
    ToastExpired { id: String },
    Cleared,
    Loaded { user_id: String, count: usize },
}

#[derive(Debug, Default)]
struct StoreState {
    user_id: Option<String>,
    notifications: Vec<Notification>,
    toasts: Vec<String>,
    expiries: HashMap<String, JoinHandle<()>>,
}

impl StoreState {
    fn cancel_expiries(&mut self) {
        for (_, handle) in self.expiries.drain() {
            handle.abort();
        }
    }
}

/// Expiring a toast only hides it; the notification stays in the persisted list.
pub struct NotificationStore<S: LocalStore> {
    local_store: Arc<S>,
    toast_lifetime: Duration,
    now_provider: NowProvider,
    state: Arc<Mutex<StoreState>>,
    updates_tx: broadcast::Sender<NotificationEvent>,
}

impl<S: LocalStore> NotificationStore<S> {
    pub fn new(local_store: Arc<S>, toast_lifetime: Duration) -> Self {
        let (updates_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            local_store,
            toast_lifetime,
            now_provider: Arc::new(Utc::now),
            state: Arc::new(Mutex::new(StoreState::default())),
            updates_tx,
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.updates_tx.subscribe()
    }

    pub fn load_for_user(&self, user_id: &str) -> usize {
        let key = notifications_key(user_id);
        let notifications = match self.local_store.get(&key) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<Notification>>(&raw) {
                Ok(parsed) => parsed,
                Err(error) => {
                    warn!(user_id, %error, "discarding unreadable persisted notifications");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(error) => {
                warn!(user_id, %error, "failed to read persisted notifications");
                Vec::new()
            }
        };

        let count = notifications.len();
        {
            let mut state = self.lock_state();
            state.cancel_expiries();
            state.user_id = Some(user_id.to_string());
            state.notifications = notifications;
            state.toasts.clear();
        }
        self.publish(NotificationEvent::Loaded {
            user_id: user_id.to_string(),
            count,
        });
        count
    }

    /// Forgets the in-memory list on logout; the persisted list is kept.
    pub fn detach_user(&self) {
        {
            let mut state = self.lock_state();
            state.cancel_expiries();
            state.user_id = None;
            state.notifications.clear();
            state.toasts.clear();
        }
        self.publish(NotificationEvent::Cleared);
    }

    pub fn add(&self, new_notification: NewNotification) -> Notification {
        let notification = Notification {
            id: next_id("ntf"),
            kind: new_notification.kind,
            title: new_notification.title,
            message: new_notification.message,
            timestamp: (self.now_provider)(),
            read: false,
            task_id: new_notification.task_id,
            level: new_notification.level,
        };

        {
            let mut state = self.lock_state();
            state.notifications.insert(0, notification.clone());
            state.toasts.insert(0, notification.id.clone());
            if let Some(handle) = self.schedule_expiry(&notification.id) {
                state.expiries.insert(notification.id.clone(), handle);
            }
            self.persist(&state);
        }

        debug!(id = %notification.id, kind = ?notification.kind, "notification added");
        self.publish(NotificationEvent::Added(notification.clone()));
        notification
    }

    pub fn mark_read(&self, id: &str) -> bool {
        let changed = {
            let mut state = self.lock_state();
            let changed = match state.notifications.iter_mut().find(|n| n.id == id) {
                Some(notification) if !notification.read => {
                    notification.read = true;
                    true
                }
                _ => false,
            };
            if changed {
                self.persist(&state);
            }
            changed
        };
        if changed {
            self.publish(NotificationEvent::Read { id: id.to_string() });
        }
        changed
    }

    pub fn mark_all_read(&self) -> usize {
        let changed = {
            let mut state = self.lock_state();
            let mut changed = 0;
            for notification in state.notifications.iter_mut().filter(|n| !n.read) {
                notification.read = true;
                changed += 1;
            }
            if changed > 0 {
                self.persist(&state);
            }
            changed
        };
        if changed > 0 {
            self.publish(NotificationEvent::AllRead);
        }
        changed
    }

    pub fn remove(&self, id: &str) -> bool {
        let removed = {
            let mut state = self.lock_state();
            let before = state.notifications.len();
            state.notifications.retain(|n| n.id != id);
            state.toasts.retain(|toast_id| toast_id != id);
            if let Some(handle) = state.expiries.remove(id) {
                handle.abort();
            }
            let removed = state.notifications.len() != before;
            if removed {
                self.persist(&state);
            }
            removed
        };
        if removed {
            self.publish(NotificationEvent::Removed { id: id.to_string() });
        }
        removed
    }

    pub fn clear_all(&self) {
        {
            let mut state = self.lock_state();
            state.cancel_expiries();
            state.notifications.clear();
            state.toasts.clear();
            self.persist(&state);
        }
        self.publish(NotificationEvent::Cleared);
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock_state().notifications.clone()
    }

    pub fn toasts(&self) -> Vec<Notification> {
        let state = self.lock_state();
        state
            .toasts
            .iter()
            .filter_map(|id| state.notifications.iter().find(|n| &n.id == id).cloned())
            .collect()
    }

    pub fn unread_count(&self) -> usize {
        self.lock_state()
            .notifications
            .iter()
            .filter(|n| !n.read)
            .count()
    }

    fn schedule_expiry(&self, id: &str) -> Option<JoinHandle<()>> {
        let Ok(runtime) = Handle::try_current() else {
            debug!(id, "no async runtime; toast expiry not scheduled");
            return None;
        };
        let state = Arc::clone(&self.state);
        let updates_tx = self.updates_tx.clone();
        let lifetime = self.toast_lifetime;
        let id = id.to_string();
        Some(runtime.spawn(async move {
            tokio::time::sleep(lifetime).await;
            expire_toast(&state, &updates_tx, &id);
        }))
    }

    fn persist(&self, state: &StoreState) {
        let Some(user_id) = state.user_id.as_deref() else {
            return;
        };
        let payload = match serde_json::to_string(&state.notifications) {
            Ok(payload) => payload,
            Err(error) => {
                warn!(user_id, %error, "failed to serialize notifications");
                return;
            }
        };
        if let Err(error) = self.local_store.set(&notifications_key(user_id), &payload) {
            warn!(user_id, %error, "failed to persist notifications");
        }
    }

    fn publish(&self, event: NotificationEvent) {
        // No subscribers is a normal state.
        let _ = self.updates_tx.send(event);
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        lock_store_state(&self.state)
    }
}

impl<S: LocalStore> Drop for NotificationStore<S> {
    fn drop(&mut self) {
        lock_store_state(&self.state).cancel_expiries();
    }
}

fn lock_store_state(state: &Mutex<StoreState>) -> MutexGuard<'_, StoreState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn expire_toast(
    state: &Mutex<StoreState>,
    updates_tx: &broadcast::Sender<NotificationEvent>,
    id: &str,
) {
    let expired = {
        let mut state = lock_store_state(state);
        state.expiries.remove(id);
        let before = state.toasts.len();
        state.toasts.retain(|toast_id| toast_id != id);
        state.toasts.len() != before
    };
    if expired {
        let _ = updates_tx.send(NotificationEvent::ToastExpired { id: id.to_string() });
    }
}
