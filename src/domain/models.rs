use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const LEVEL_BASE_XP: u64 = 100;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
    #[default]
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
}

impl Task {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "task.id")?;
        validate_non_empty(&self.title, "task.title")?;
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Fractional hours from `now` until the due date; negative once overdue.
    pub fn hours_until_due(&self, now: DateTime<Utc>) -> Option<f64> {
        self.due_date
            .map(|due| (due - now).num_milliseconds() as f64 / 3_600_000.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub level: Option<u32>,
}

impl User {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "user.id")
    }

    pub fn level_progress(&self) -> LevelProgress {
        level_progress(self.xp)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    TaskDue,
    TaskCompleted,
    LevelUp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
}

/// A notification before the store assigns its id, timestamp and read flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub task_id: Option<String>,
    pub level: Option<u32>,
}

impl NewNotification {
    pub fn task_due(task_id: &str, message: String) -> Self {
        Self {
            kind: NotificationKind::TaskDue,
            title: "Task Due Soon!".to_string(),
            message,
            task_id: Some(task_id.to_string()),
            level: None,
        }
    }

    pub fn task_due_for(task: &Task) -> Self {
        Self::task_due(
            &task.id,
            format!("\"{}\" is due in about 1 hour", task.title),
        )
    }

    pub fn task_completed(task: &Task) -> Self {
        Self {
            kind: NotificationKind::TaskCompleted,
            title: "Task Completed! \u{2705}".to_string(),
            message: format!("Great job! You've completed \"{}\"", task.title),
            task_id: Some(task.id.clone()),
            level: None,
        }
    }

    pub fn level_up(level: u32) -> Self {
        Self {
            kind: NotificationKind::LevelUp,
            title: "Level Up! \u{1F389}".to_string(),
            message: format!("Congratulations! You've reached level {level}!"),
            task_id: None,
            level: Some(level),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FocusSessionRecord {
    pub task_id: String,
    pub duration: u32,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub status: String,
}

impl FocusSessionRecord {
    pub fn completed(task_id: &str, duration_seconds: u32, ended_at: DateTime<Utc>) -> Self {
        Self {
            task_id: task_id.to_string(),
            duration: duration_seconds,
            started_at: ended_at - chrono::Duration::seconds(i64::from(duration_seconds)),
            ended_at,
            status: "completed".to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.task_id, "focus_session.task_id")?;
        if self.ended_at < self.started_at {
            return Err("focus_session.ended_at must be >= focus_session.started_at".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DueNotice {
    pub task_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub message: String,
}

/// Band, in hours until due, inside which a task not yet notified gets a due-soon notice.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DueWindow {
    pub min_hours: f64,
    pub max_hours: f64,
}

impl Default for DueWindow {
    fn default() -> Self {
        Self {
            min_hours: 0.5,
            max_hours: 1.2,
        }
    }
}

impl DueWindow {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_hours < 0.0 {
            return Err("dueWindow.minHours must be >= 0".to_string());
        }
        if self.min_hours > self.max_hours {
            return Err("dueWindow.minHours must be <= maxHours".to_string());
        }
        Ok(())
    }

    pub fn contains(&self, hours_until_due: f64) -> bool {
        hours_until_due >= self.min_hours && hours_until_due <= self.max_hours
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct LevelProgress {
    pub level: u32,
    pub xp_in_level: u64,
    pub xp_for_level: u64,
    pub percent: f64,
}

/// Level 1 needs 100 XP, level N needs `100 * N` on top of all earlier levels.
pub fn level_progress(xp: u64) -> LevelProgress {
    let mut level: u32 = 1;
    let mut xp_for_level = LEVEL_BASE_XP;
    let mut xp_in_level = xp;
    while xp_in_level >= xp_for_level {
        xp_in_level -= xp_for_level;
        level = level.saturating_add(1);
        xp_for_level = LEVEL_BASE_XP.saturating_mul(u64::from(level));
    }
    let percent = (xp_in_level as f64 / xp_for_level as f64 * 100.0).min(100.0);
    LevelProgress {
        level,
        xp_in_level,
        xp_for_level,
        percent,
    }
}

pub fn level_for_xp(xp: u64) -> u32 {
    level_progress(xp).level
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    #[test]
    fn level_arithmetic_matches_threshold_rule() {
        let zero = level_progress(0);
        assert_eq!((zero.level, zero.xp_in_level, zero.xp_for_level), (1, 0, 100));

        let hundred = level_progress(100);
        assert_eq!((hundred.level, hundred.xp_in_level, hundred.xp_for_level), (2, 0, 200));

        let two_fifty = level_progress(250);
        assert_eq!((two_fifty.level, two_fifty.xp_in_level), (2, 150));
        assert!((two_fifty.percent - 75.0).abs() < f64::EPSILON);

        assert_eq!(level_for_xp(299), 2);
        assert_eq!(level_for_xp(300), 3);
        assert_eq!(level_for_xp(600), 4);
    }

    proptest! {
        #[test]
        fn level_progress_reconstructs_total_xp(xp in 0u64..5_000_000u64) {
            let progress = level_progress(xp);
            let consumed: u64 = (1..progress.level).map(|level| 100 * u64::from(level)).sum();

            prop_assert!(progress.xp_in_level < progress.xp_for_level);
            prop_assert_eq!(progress.xp_for_level, 100 * u64::from(progress.level));
            prop_assert_eq!(consumed + progress.xp_in_level, xp);
            prop_assert!(progress.percent >= 0.0 && progress.percent < 100.0);
        }

        #[test]
        fn level_is_monotonic_in_xp(xp in 0u64..1_000_000u64, extra in 0u64..10_000u64) {
            prop_assert!(level_for_xp(xp + extra) >= level_for_xp(xp));
        }
    }

    #[test]
    fn task_deserializes_backend_payload() {
        let task: Task = serde_json::from_str(
            r#"{
                "_id": "t-1",
                "title": "Essay draft",
                "dueDate": "2026-02-16T10:00:00.000Z",
                "status": "in-progress",
                "priority": "high",
                "subject": "History"
            }"#,
        )
        .expect("deserialize task");

        assert_eq!(task.id, "t-1");
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.due_date, Some(fixed_time("2026-02-16T10:00:00Z")));
        assert!(task.validate().is_ok());
    }

    #[test]
    fn task_defaults_missing_status_priority_and_due_date() {
        let task: Task =
            serde_json::from_str(r#"{"_id": "t-2", "title": "Read", "dueDate": null}"#)
                .expect("deserialize task");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, TaskPriority::None);
        assert_eq!(task.hours_until_due(Utc::now()), None);
    }

    #[test]
    fn hours_until_due_is_fractional_and_signed() {
        let now = fixed_time("2026-02-16T09:00:00Z");
        let mut task: Task = serde_json::from_str(r#"{"id": "t-3", "title": "Quiz"}"#)
            .expect("deserialize task");

        task.due_date = Some(fixed_time("2026-02-16T09:50:00Z"));
        let hours = task.hours_until_due(now).expect("due date set");
        assert!((hours - 50.0 / 60.0).abs() < 1e-9);

        task.due_date = Some(fixed_time("2026-02-16T08:30:00Z"));
        assert!(task.hours_until_due(now).expect("due date set") < 0.0);
    }

    #[test]
    fn user_accepts_either_id_field_and_defaults_xp() {
        let legacy: User = serde_json::from_str(r#"{"_id": "u-1", "name": "Ada", "email": "a@x"}"#)
            .expect("deserialize user");
        let current: User = serde_json::from_str(r#"{"id": "u-2", "xp": 250, "level": 2}"#)
            .expect("deserialize user");

        assert_eq!(legacy.id, "u-1");
        assert_eq!(legacy.xp, 0);
        assert_eq!(current.level_progress().level, 2);
    }

    #[test]
    fn notification_serializes_kind_as_type() {
        let notification = Notification {
            id: "ntf-1".to_string(),
            kind: NotificationKind::LevelUp,
            title: "Level Up!".to_string(),
            message: "Congratulations! You've reached level 3!".to_string(),
            timestamp: fixed_time("2026-02-16T09:00:00Z"),
            read: false,
            task_id: None,
            level: Some(3),
        };

        let value = serde_json::to_value(&notification).expect("serialize notification");
        assert_eq!(value["type"], "level_up");
        assert_eq!(value["level"], 3);
        assert!(value.get("taskId").is_none());
    }

    #[test]
    fn focus_session_record_spans_duration() {
        let ended_at = fixed_time("2026-02-16T09:25:00Z");
        let record = FocusSessionRecord::completed("t-1", 1500, ended_at);

        assert_eq!(record.started_at, fixed_time("2026-02-16T09:00:00Z"));
        assert_eq!(record.status, "completed");
        assert!(record.validate().is_ok());

        let value = serde_json::to_value(&record).expect("serialize record");
        assert_eq!(value["taskId"], "t-1");
        assert_eq!(value["duration"], 1500);
    }

    #[test]
    fn due_window_is_inclusive_on_both_bounds() {
        let window = DueWindow::default();
        assert!(window.contains(0.5));
        assert!(window.contains(0.6));
        assert!(window.contains(1.2));
        assert!(!window.contains(0.49));
        assert!(!window.contains(1.3));
        assert!(!window.contains(-0.1));
        assert!(DueWindow { min_hours: 2.0, max_hours: 1.0 }.validate().is_err());
    }

    #[test]
    fn notification_builders_carry_task_and_level() {
        let task: Task = serde_json::from_str(r#"{"id": "t-9", "title": "Lab report"}"#)
            .expect("deserialize task");

        let due = NewNotification::task_due_for(&task);
        assert_eq!(due.kind, NotificationKind::TaskDue);
        assert_eq!(due.message, "\"Lab report\" is due in about 1 hour");

        let completed = NewNotification::task_completed(&task);
        assert_eq!(completed.task_id.as_deref(), Some("t-9"));

        let level_up = NewNotification::level_up(4);
        assert_eq!(level_up.level, Some(4));
    }
}
