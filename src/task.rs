//! To-do tasks

use std::convert::TryFrom;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::TaskId;

/// The stored format has a `completed` flag and an optional `completedAt` timestamp, yet some combinations make no sense.
/// This enum provides an API that forbids such impossible combinations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompletionStatus {
    Completed(DateTime<Utc>),
    Uncompleted,
}
impl CompletionStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, CompletionStatus::Completed(_))
    }

    pub fn completed_at(&self) -> Option<&DateTime<Utc>> {
        match self {
            CompletionStatus::Completed(date) => Some(date),
            CompletionStatus::Uncompleted => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    /// Sort key: the most pressing priority comes first
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Urgent => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(format!("unknown priority {:?}", other)),
        }
    }
}


/// The user-editable fields of a task, as submitted by the add/edit form
#[derive(Clone, Debug, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub priority: Priority,
    pub sync_google: bool,
}

impl TaskDraft {
    /// A draft with an empty description, no time, a medium priority and no calendar sync
    pub fn new<S: AsRef<str>>(title: S, date: NaiveDate) -> Self {
        Self {
            title: title.as_ref().trim().to_string(),
            description: String::new(),
            date,
            time: None,
            priority: Priority::default(),
            sync_google: false,
        }
    }

    pub fn with_description<S: AsRef<str>>(mut self, description: S) -> Self {
        self.description = description.as_ref().trim().to_string();
        self
    }

    pub fn with_time(mut self, time: Option<NaiveTime>) -> Self {
        self.time = time;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_sync_google(mut self, sync_google: bool) -> Self {
        self.sync_google = sync_google;
        self
    }

    /// Checks the only required field is present
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(())
    }
}


/// A to-do task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "TaskRecord", try_from = "TaskRecord")]
pub struct Task {
    /// Unique within a collection
    id: TaskId,

    title: String,
    description: String,
    date: NaiveDate,
    time: Option<NaiveTime>,
    priority: Priority,
    /// Whether this task should be mirrored to an external calendar (see [`crate::calendar_export`])
    sync_google: bool,

    /// The time this task was created. This never changes afterwards
    created_at: DateTime<Utc>,
    /// The completion status of this task
    completion_status: CompletionStatus,
}

impl Task {
    /// Create a brand new, uncompleted task
    pub fn new(id: TaskId, draft: TaskDraft, created_at: DateTime<Utc>) -> Self {
        Self::new_with_parameters(id, draft, created_at, CompletionStatus::Uncompleted)
    }

    /// Create a new Task instance, that may be completed already
    pub fn new_with_parameters(id: TaskId, draft: TaskDraft, created_at: DateTime<Utc>, completion_status: CompletionStatus) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            date: draft.date,
            time: draft.time,
            priority: draft.priority,
            sync_google: draft.sync_google,
            created_at,
            completion_status,
        }
    }

    pub fn id(&self) -> &TaskId              { &self.id          }
    pub fn title(&self) -> &str              { &self.title       }
    pub fn description(&self) -> &str        { &self.description }
    pub fn date(&self) -> NaiveDate          { self.date         }
    pub fn time(&self) -> Option<NaiveTime>  { self.time         }
    pub fn priority(&self) -> Priority       { self.priority     }
    pub fn sync_google(&self) -> bool        { self.sync_google  }
    pub fn completed(&self) -> bool          { self.completion_status.is_completed() }
    pub fn created_at(&self) -> &DateTime<Utc>            { &self.created_at }
    pub fn completed_at(&self) -> Option<&DateTime<Utc>>  { self.completion_status.completed_at() }
    pub fn completion_status(&self) -> &CompletionStatus  { &self.completion_status }

    /// The editable fields of this task, e.g. to pre-fill an edit form
    pub fn draft(&self) -> TaskDraft {
        TaskDraft {
            title: self.title.clone(),
            description: self.description.clone(),
            date: self.date,
            time: self.time,
            priority: self.priority,
            sync_google: self.sync_google,
        }
    }

    /// Replace every editable field.
    ///
    /// The edit form carries no completion state, so the task comes back as uncompleted.
    /// The id and the creation date are kept.
    pub fn apply_draft(&mut self, draft: TaskDraft) {
        self.title = draft.title;
        self.description = draft.description;
        self.date = draft.date;
        self.time = draft.time;
        self.priority = draft.priority;
        self.sync_google = draft.sync_google;
        self.completion_status = CompletionStatus::Uncompleted;
    }

    /// Set the completion status
    pub fn set_completion_status(&mut self, new_completion_status: CompletionStatus) {
        self.completion_status = new_completion_status;
    }

    /// Flip the completion status, stamping the completion date with `now` when it becomes completed
    pub fn toggle_completion(&mut self, now: DateTime<Utc>) {
        let new_status = match self.completion_status {
            CompletionStatus::Uncompleted => CompletionStatus::Completed(now),
            CompletionStatus::Completed(_) => CompletionStatus::Uncompleted,
        };
        self.set_completion_status(new_status);
    }
}


/// The stored representation of a [`Task`]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    id: TaskId,
    title: String,
    #[serde(default)]
    description: String,
    date: NaiveDate,
    #[serde(default, with = "time_of_day")]
    time: Option<NaiveTime>,
    priority: Priority,
    #[serde(default)]
    sync_google: bool,
    #[serde(default)]
    completed: bool,
    created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completed_at: Option<DateTime<Utc>>,
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        let completed = task.completed();
        let completed_at = task.completed_at().cloned();
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            date: task.date,
            time: task.time,
            priority: task.priority,
            sync_google: task.sync_google,
            completed,
            created_at: task.created_at,
            completed_at,
        }
    }
}

impl TryFrom<TaskRecord> for Task {
    type Error = String;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        if record.title.trim().is_empty() {
            return Err(format!("task {} has an empty title", record.id));
        }

        let completion_status = match (record.completed, record.completed_at) {
            (true, Some(date)) => CompletionStatus::Completed(date),
            (true, None) => {
                // Some writers only store the flag
                log::debug!("Task {} is completed but has no completion date, using its creation date", record.id);
                CompletionStatus::Completed(record.created_at)
            },
            (false, _) => CompletionStatus::Uncompleted,
        };

        Ok(Self {
            id: record.id,
            title: record.title,
            description: record.description,
            date: record.date,
            time: record.time,
            priority: record.priority,
            sync_google: record.sync_google,
            created_at: record.created_at,
            completion_status,
        })
    }
}

/// `HH:MM`, with an empty string standing for "no time"
mod time_of_day {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match time {
            Some(t) => serializer.serialize_str(&t.format(FORMAT).to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = match Option::<String>::deserialize(deserializer)? {
            None => return Ok(None),
            Some(text) => text,
        };
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        NaiveTime::parse_from_str(text, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
            .map(Some)
            .map_err(serde::de::Error::custom)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn some_task() -> Task {
        let draft = TaskDraft::new("  Buy milk ", NaiveDate::from_ymd(2024, 5, 14))
            .with_priority(Priority::High)
            .with_time(Some(NaiveTime::from_hms(9, 30, 0)));
        Task::new(TaskId::from("t1"), draft, Utc.ymd(2024, 5, 13).and_hms(8, 0, 0))
    }

    #[test]
    fn draft_trims_title() {
        let task = some_task();
        assert_eq!(task.title(), "Buy milk");
        assert_eq!(TaskDraft::new("   ", task.date()).validate(), Err(ValidationError::EmptyTitle));
    }

    #[test]
    fn toggle_sets_and_clears_completion_date() {
        let mut task = some_task();
        let now = Utc.ymd(2024, 5, 14).and_hms(12, 0, 0);
        task.toggle_completion(now);
        assert!(task.completed());
        assert_eq!(task.completed_at(), Some(&now));

        task.toggle_completion(now);
        assert!(task.completed() == false);
        assert_eq!(task.completed_at(), None);
    }

    #[test]
    fn editing_keeps_creation_date_and_reopens() {
        let mut task = some_task();
        task.toggle_completion(Utc::now());
        let created = *task.created_at();

        task.apply_draft(TaskDraft::new("Buy oat milk", NaiveDate::from_ymd(2024, 5, 15)));
        assert_eq!(task.title(), "Buy oat milk");
        assert_eq!(task.created_at(), &created);
        assert_eq!(task.id().as_str(), "t1");
        assert!(task.completed() == false);
    }

    #[test]
    fn stored_format() {
        let value = serde_json::to_value(some_task()).unwrap();
        assert_eq!(value["id"], "t1");
        assert_eq!(value["date"], "2024-05-14");
        assert_eq!(value["time"], "09:30");
        assert_eq!(value["priority"], "high");
        assert_eq!(value["syncGoogle"], false);
        assert_eq!(value["completed"], false);
        assert!(value.get("completedAt").is_none());
    }

    #[test]
    fn decode_records_written_by_the_web_client() {
        let text = r#"{
            "id": "lq2k8v0x3f",
            "title": "Dentist",
            "description": "",
            "date": "2024-05-20",
            "time": "",
            "priority": "urgent",
            "syncGoogle": true,
            "completed": true,
            "createdAt": "2024-05-01T10:11:12.345Z",
            "completedAt": "2024-05-02T08:00:00.000Z"
        }"#;
        let task: Task = serde_json::from_str(text).unwrap();
        assert_eq!(task.time(), None);
        assert_eq!(task.priority(), Priority::Urgent);
        assert!(task.sync_google());
        assert_eq!(task.completed_at(), Some(&Utc.ymd(2024, 5, 2).and_hms(8, 0, 0)));
    }

    #[test]
    fn completed_flag_without_date_still_has_a_date() {
        let text = r#"{"id": "a", "title": "x", "date": "2024-05-20", "priority": "low",
                       "completed": true, "createdAt": "2024-05-01T10:00:00Z"}"#;
        let task: Task = serde_json::from_str(text).unwrap();
        assert!(task.completed());
        assert_eq!(task.completed_at(), Some(task.created_at()));
    }

    #[test]
    fn empty_titles_are_rejected() {
        let text = r#"{"id": "a", "title": " ", "date": "2024-05-20", "priority": "low",
                       "createdAt": "2024-05-01T10:00:00Z"}"#;
        assert!(serde_json::from_str::<Task>(text).is_err());
    }

    #[test]
    fn priority_ranks() {
        assert!(Priority::Urgent.rank() < Priority::High.rank());
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
        assert_eq!("URGENT".parse::<Priority>(), Ok(Priority::Urgent));
        assert!("whenever".parse::<Priority>().is_err());
    }
}
