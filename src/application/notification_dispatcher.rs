use crate::domain::models::{level_for_xp, DueNotice, DueWindow, NewNotification, Task, User};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Per-session dedup and level bookkeeping. Replaced wholesale on user switch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchContext {
    notified: HashSet<String>,
    last_level: u32,
}

impl Default for DispatchContext {
    fn default() -> Self {
        Self {
            notified: HashSet::new(),
            last_level: 1,
        }
    }
}

impl DispatchContext {
    pub fn last_level(&self) -> u32 {
        self.last_level
    }

    pub fn was_notified(&self, task_id: &str) -> bool {
        self.notified.contains(task_id)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationDispatcher {
    due_window: DueWindow,
}

impl NotificationDispatcher {
    pub fn new(due_window: DueWindow) -> Self {
        Self { due_window }
    }

    pub fn check_due_dates(
        &self,
        context: &mut DispatchContext,
        tasks: &[Task],
        now: DateTime<Utc>,
    ) -> Vec<NewNotification> {
        let mut emitted = Vec::new();
        for task in tasks.iter().filter(|task| !task.is_completed()) {
            let Some(hours) = task.hours_until_due(now) else {
                continue;
            };
            if context.notified.contains(&task.id) {
                continue;
            }
            if self.due_window.contains(hours) {
                context.notified.insert(task.id.clone());
                emitted.push(NewNotification::task_due_for(task));
            }
        }
        emitted
    }

    pub fn check_level(&self, context: &mut DispatchContext, user: &User) -> Option<NewNotification> {
        let level = level_for_xp(user.xp);
        if level <= context.last_level {
            return None;
        }
        context.last_level = level;
        Some(NewNotification::level_up(level))
    }

    /// Converts backend due notices, skipping tasks that already produced a due-soon notice.
    pub fn absorb_feed(
        &self,
        context: &mut DispatchContext,
        notices: Vec<DueNotice>,
    ) -> Vec<NewNotification> {
        notices
            .into_iter()
            .filter(|notice| !notice.task_id.trim().is_empty())
            .filter_map(|notice| {
                if !context.notified.insert(notice.task_id.clone()) {
                    return None;
                }
                let message = match notice.title.as_deref() {
                    Some(title) if notice.message.trim().is_empty() => {
                        format!("\"{title}\" is due in about 1 hour")
                    }
                    _ => notice.message,
                };
                Some(NewNotification::task_due(&notice.task_id, message))
            })
            .collect()
    }
}
