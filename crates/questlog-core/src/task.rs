use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskCategory {
    Work,
    Personal,
    Health,
    Learning,
    Other,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 5] = [
        TaskCategory::Work,
        TaskCategory::Personal,
        TaskCategory::Health,
        TaskCategory::Learning,
        TaskCategory::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TaskCategory::Work => "Work",
            TaskCategory::Personal => "Personal",
            TaskCategory::Health => "Health",
            TaskCategory::Learning => "Learning",
            TaskCategory::Other => "Other",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TaskCategory::ALL
            .into_iter()
            .find(|cat| cat.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| anyhow!("unknown category: {s} (expected work, personal, health, learning or other)"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Completed,
    Incomplete,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Active => "active",
            TaskStatus::Completed => "completed",
            TaskStatus::Incomplete => "incomplete",
        }
    }

    /// Moving into `Incomplete` from anywhere else must be confirmed by the
    /// user before the mutation is issued. The mutation itself never checks.
    pub fn requires_confirmation(from: TaskStatus, to: TaskStatus) -> bool {
        to == TaskStatus::Incomplete && from != TaskStatus::Incomplete
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(TaskStatus::Active),
            "completed" => Ok(TaskStatus::Completed),
            "incomplete" => Ok(TaskStatus::Incomplete),
            other => Err(anyhow!("unknown status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub text: String,
    pub category: TaskCategory,
    pub status: TaskStatus,
    #[serde(rename = "createdAt", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Builds an active task. `text` is stored as given; callers trim and
    /// reject empty input.
    pub fn new_active(text: String, category: TaskCategory, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            text,
            category,
            status: TaskStatus::Active,
            created_at: truncate_to_millis(now),
        }
    }
}

/// On-disk task record as any release ever wrote it. Older builds stored a
/// `completed` boolean instead of `status`.
#[derive(Debug, Clone, Deserialize)]
pub struct StoredTask {
    pub id: String,
    pub text: String,
    pub category: TaskCategory,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(rename = "createdAt", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl From<StoredTask> for Task {
    fn from(stored: StoredTask) -> Self {
        let status = upgrade_status(stored.status, stored.completed);
        Self {
            id: stored.id,
            text: stored.text,
            category: stored.category,
            status,
            created_at: stored.created_at,
        }
    }
}

pub fn upgrade_status(status: Option<TaskStatus>, completed: Option<bool>) -> TaskStatus {
    match (status, completed) {
        (Some(status), _) => status,
        (None, Some(true)) => TaskStatus::Completed,
        (None, _) => TaskStatus::Active,
    }
}

pub fn upgrade_tasks(stored: Vec<StoredTask>) -> Vec<Task> {
    stored.into_iter().map(Task::from).collect()
}

pub fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn truncate_to_millis(now: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Resolves a user-typed id. An exact match wins, otherwise the prefix must
/// select exactly one id. No match is `Ok(None)`; several are an error.
pub fn resolve_prefix<'a, I>(ids: I, prefix: &str, what: &str) -> anyhow::Result<Option<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Ok(None);
    }

    let mut matches = Vec::new();
    for id in ids {
        if id == prefix {
            return Ok(Some(id.to_string()));
        }
        if id.starts_with(prefix) {
            matches.push(id);
        }
    }

    match matches.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some((*only).to_string())),
        many => Err(anyhow!(
            "ambiguous {what} id '{prefix}': matches {} {what}s",
            many.len()
        )),
    }
}

/// Trimmed text, or `None` when nothing is left.
pub(crate) fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Ordered task collection, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskList {
    tasks: Vec<Task>,
}

impl TaskList {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn as_slice(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn resolve_prefix(&self, prefix: &str) -> anyhow::Result<Option<String>> {
        resolve_prefix(self.tasks.iter().map(|t| t.id.as_str()), prefix, "task")
    }

    /// Prepends a new active task. Returns its id, or `None` when `text` is
    /// blank.
    pub fn add(&mut self, text: &str, category: TaskCategory, now: DateTime<Utc>) -> Option<String> {
        let text = non_empty(text)?;
        let task = Task::new_active(text, category, now);
        let id = task.id.clone();
        self.tasks.insert(0, task);
        Some(id)
    }

    pub fn edit(&mut self, id: &str, text: &str, category: TaskCategory) -> bool {
        let Some(text) = non_empty(text) else {
            return false;
        };
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.text = text;
                task.category = category;
                true
            }
            None => false,
        }
    }

    pub fn set_status(&mut self, id: &str, status: TaskStatus) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.status = status;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap()
    }

    #[test]
    fn add_prepends_active_task() {
        let mut list = TaskList::default();
        let first = list.add("write report", TaskCategory::Work, now()).unwrap();
        let second = list.add("  stretch  ", TaskCategory::Health, now()).unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(list.as_slice()[0].id, second);
        assert_eq!(list.as_slice()[0].text, "stretch");
        assert_eq!(list.as_slice()[0].status, TaskStatus::Active);
        assert_eq!(list.as_slice()[1].id, first);
        assert_ne!(first, second);
    }

    #[test]
    fn blank_text_is_ignored() {
        let mut list = TaskList::default();
        assert!(list.add("", TaskCategory::Work, now()).is_none());
        assert!(list.add(" \t\n", TaskCategory::Other, now()).is_none());
        assert!(list.is_empty());

        let id = list.add("read", TaskCategory::Learning, now()).unwrap();
        assert!(!list.edit(&id, "   ", TaskCategory::Other));
        assert_eq!(list.get(&id).unwrap().text, "read");
        assert_eq!(list.get(&id).unwrap().category, TaskCategory::Learning);
    }

    #[test]
    fn edit_keeps_status_and_timestamp() {
        let mut list = TaskList::default();
        let id = list.add("draft", TaskCategory::Work, now()).unwrap();
        list.set_status(&id, TaskStatus::Completed);
        let before = list.get(&id).unwrap().clone();

        assert!(list.edit(&id, " final ", TaskCategory::Personal));
        let after = list.get(&id).unwrap();
        assert_eq!(after.text, "final");
        assert_eq!(after.category, TaskCategory::Personal);
        assert_eq!(after.status, before.status);
        assert_eq!(after.created_at, before.created_at);
    }

    #[test]
    fn set_status_touches_only_status() {
        let mut list = TaskList::default();
        let id = list.add("run", TaskCategory::Health, now()).unwrap();
        let original = list.get(&id).unwrap().clone();

        for status in [TaskStatus::Completed, TaskStatus::Incomplete, TaskStatus::Active] {
            assert!(list.set_status(&id, status));
            let task = list.get(&id).unwrap();
            assert_eq!(task.status, status);
            assert_eq!(task.id, original.id);
            assert_eq!(task.text, original.text);
            assert_eq!(task.category, original.category);
            assert_eq!(task.created_at, original.created_at);
        }
    }

    #[test]
    fn unknown_ids_are_no_ops() {
        let mut list = TaskList::default();
        list.add("one", TaskCategory::Work, now());
        let snapshot = list.clone();

        assert!(!list.remove("missing"));
        assert!(!list.set_status("missing", TaskStatus::Completed));
        assert!(!list.edit("missing", "x", TaskCategory::Work));
        assert_eq!(list, snapshot);
    }

    #[test]
    fn confirmation_only_when_entering_incomplete() {
        use TaskStatus::*;
        assert!(TaskStatus::requires_confirmation(Active, Incomplete));
        assert!(TaskStatus::requires_confirmation(Completed, Incomplete));
        assert!(!TaskStatus::requires_confirmation(Incomplete, Incomplete));
        assert!(!TaskStatus::requires_confirmation(Incomplete, Active));
        assert!(!TaskStatus::requires_confirmation(Active, Completed));
    }

    #[test]
    fn legacy_records_are_upgraded() {
        let raw = r#"[
            {"id":"a","text":"old done","category":"Work","completed":true,"createdAt":1700000000000},
            {"id":"b","text":"old open","category":"Health","completed":false,"createdAt":1700000000001},
            {"id":"c","text":"bare","category":"Other","createdAt":1700000000002},
            {"id":"d","text":"new","category":"Learning","status":"incomplete","completed":true,"createdAt":1700000000003}
        ]"#;
        let stored: Vec<StoredTask> = serde_json::from_str(raw).unwrap();
        let tasks = upgrade_tasks(stored);

        let statuses: Vec<_> = tasks.iter().map(|t| t.status).collect();
        assert_eq!(
            statuses,
            vec![
                TaskStatus::Completed,
                TaskStatus::Active,
                TaskStatus::Active,
                TaskStatus::Incomplete
            ]
        );
        assert_eq!(tasks[0].created_at.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn serialized_round_trip_is_lossless() {
        let mut list = TaskList::default();
        list.add("one", TaskCategory::Work, Utc::now());
        list.add("two", TaskCategory::Personal, Utc::now());
        let id = list.as_slice()[0].id.clone();
        list.set_status(&id, TaskStatus::Incomplete);

        let encoded = serde_json::to_string(list.as_slice()).unwrap();
        assert!(encoded.contains("\"createdAt\""));
        assert!(encoded.contains("\"incomplete\""));

        let stored: Vec<StoredTask> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(upgrade_tasks(stored), list.as_slice().to_vec());
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("health".parse::<TaskCategory>().unwrap(), TaskCategory::Health);
        assert_eq!("LEARNING".parse::<TaskCategory>().unwrap(), TaskCategory::Learning);
        assert!("chores".parse::<TaskCategory>().is_err());
    }

    #[test]
    fn prefixes_resolve_uniquely() {
        let list = TaskList::new(vec![
            Task {
                id: "abc123".to_string(),
                ..Task::new_active("one".to_string(), TaskCategory::Work, now())
            },
            Task {
                id: "abd456".to_string(),
                ..Task::new_active("two".to_string(), TaskCategory::Work, now())
            },
        ]);

        assert_eq!(list.resolve_prefix("abc").unwrap().as_deref(), Some("abc123"));
        assert_eq!(list.resolve_prefix("zzz").unwrap(), None);
        assert_eq!(list.resolve_prefix("").unwrap(), None);
        let err = list.resolve_prefix("ab").unwrap_err();
        assert!(err.to_string().contains("ambiguous task id 'ab'"));
    }

    #[test]
    fn exact_match_beats_longer_ids() {
        let ids = ["w1", "w10"];
        assert_eq!(resolve_prefix(ids, "w1", "target").unwrap().as_deref(), Some("w1"));
        assert!(resolve_prefix(ids, "w", "target").is_err());
    }
}
