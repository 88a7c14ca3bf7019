//! To-do tasks, and the drafts and patches used to create and modify them

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::Error;
use crate::identity::Identity;
use crate::traits::Document;

/// Whether a task still has to be done
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// The status the card's "toggle" action switches to
    pub fn toggled(&self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Pending,
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Completed => write!(f, "completed"),
        }
    }
}


/// The id of a task, as assigned by the document store
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId {
    content: String,
}

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.content
    }
}
impl From<String> for TaskId {
    fn from(content: String) -> Self {
        Self { content }
    }
}
impl From<&str> for TaskId {
    fn from(content: &str) -> Self {
        Self { content: content.to_string() }
    }
}
impl Display for TaskId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}


/// A to-do task, owned by exactly one identity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    id: TaskId,
    /// The description of the task
    task: String,
    #[serde(default)]
    status: TaskStatus,
    /// Higher priorities are displayed first
    #[serde(default)]
    priority: i64,
    /// An RFC 3339 timestamp
    #[serde(default)]
    due_date: String,
    /// The `uid` of the owning [`Identity`]
    user_id: String,
}

impl Task {
    pub fn new(id: TaskId, task: String, status: TaskStatus, priority: i64, due_date: String, user_id: String) -> Self {
        Self { id, task, status, priority, due_date, user_id }
    }

    /// Build a task from a stored document. The document id becomes the task id.
    pub fn from_document(document: Document) -> Result<Self, serde_json::Error> {
        let Document { id, mut fields } = document;
        fields.insert("id".to_string(), Value::String(id));
        serde_json::from_value(Value::Object(fields))
    }

    pub fn id(&self) -> &TaskId        { &self.id       }
    pub fn task(&self) -> &str         { &self.task     }
    pub fn status(&self) -> TaskStatus { self.status    }
    pub fn priority(&self) -> i64      { self.priority  }
    pub fn due_date(&self) -> &str     { &self.due_date }
    pub fn user_id(&self) -> &str      { &self.user_id  }
    pub fn completed(&self) -> bool    { self.status.is_completed() }

    pub fn is_owned_by(&self, identity: &Identity) -> bool {
        self.user_id == identity.uid()
    }
}


/// A task that has not been stored yet: it has neither an id nor an owner
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub task: String,
    pub status: TaskStatus,
    pub priority: i64,
    pub due_date: String,
}

impl TaskDraft {
    /// A pending draft with priority 1, due now
    pub fn new<S: ToString>(task: S) -> Self {
        Self {
            task: task.to_string().trim().to_string(),
            status: TaskStatus::Pending,
            priority: 1,
            due_date: now_rfc3339(),
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_due_date<S: ToString>(mut self, due_date: S) -> Self {
        self.due_date = due_date.to_string();
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        validate_description(&self.task)?;
        validate_due_date(&self.due_date)
    }

    /// The document fields to submit to the store, stamped with the owner's uid
    pub fn to_fields(&self, owner: &Identity) -> Result<Map<String, Value>, Error> {
        let mut fields = to_object(self)?;
        fields.insert("userId".to_string(), Value::String(owner.uid().to_string()));
        Ok(fields)
    }
}


/// A partial update of a task. Fields that are `None` are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl TaskPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(status: TaskStatus) -> Self {
        Self { status: Some(status), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.task.is_none() && self.status.is_none() && self.priority.is_none() && self.due_date.is_none()
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.is_empty() {
            return Err(Error::invalid_task("nothing to update"));
        }
        if let Some(task) = &self.task {
            validate_description(task)?;
        }
        if let Some(due_date) = &self.due_date {
            validate_due_date(due_date)?;
        }
        Ok(())
    }

    /// The document fields to merge into the stored record
    pub fn to_fields(&self) -> Result<Map<String, Value>, Error> {
        to_object(self)
    }
}


fn validate_description(task: &str) -> Result<(), Error> {
    if task.trim().is_empty() {
        return Err(Error::invalid_task("the description is empty"));
    }
    Ok(())
}

fn validate_due_date(due_date: &str) -> Result<(), Error> {
    DateTime::parse_from_rfc3339(due_date)
        .map(|_| ())
        .map_err(|err| Error::invalid_task(format!("due date {:?} is not an RFC 3339 timestamp ({})", due_date, err)))
}

fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>, Error> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(Error::invalid_task(format!("unexpected serialized form {}", other))),
        Err(err) => Err(Error::invalid_task(err)),
    }
}

/// The current time, formatted the way due dates are stored (e.g. `2024-01-31T08:00:00.000Z`)
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_from_document() {
        let fields = json!({
            "task": "buy milk",
            "status": "completed",
            "priority": 3,
            "dueDate": "2024-01-31T08:00:00.000Z",
            "userId": "alice",
        });
        let document = Document {
            id: "doc-1".to_string(),
            fields: fields.as_object().unwrap().clone(),
        };

        let task = Task::from_document(document).unwrap();
        assert_eq!(task.id().as_str(), "doc-1");
        assert_eq!(task.task(), "buy milk");
        assert_eq!(task.status(), TaskStatus::Completed);
        assert_eq!(task.priority(), 3);
        assert_eq!(task.user_id(), "alice");
        assert!(task.is_owned_by(&Identity::new("alice", "alice@example.com")));
    }

    #[test]
    fn draft_fields_are_stamped_with_the_owner() {
        let owner = Identity::new("bob", "bob@example.com");
        let draft = TaskDraft::new("  water the plants ").with_priority(2);
        draft.validate().unwrap();

        let fields = draft.to_fields(&owner).unwrap();
        assert_eq!(fields["task"], json!("water the plants"));
        assert_eq!(fields["status"], json!("pending"));
        assert_eq!(fields["priority"], json!(2));
        assert_eq!(fields["userId"], json!("bob"));
        assert!(fields.contains_key("dueDate"));
        assert!(fields.contains_key("id") == false);
    }

    #[test]
    fn patch_only_serializes_what_it_sets() {
        let patch = TaskPatch::status(TaskStatus::Completed);
        let fields = patch.to_fields().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["status"], json!("completed"));
    }

    #[test]
    fn patch_validation() {
        assert!(TaskPatch::new().validate().is_err());
        assert!(TaskPatch { task: Some("   ".to_string()), ..TaskPatch::default() }.validate().is_err());
        assert!(TaskPatch { due_date: Some("tomorrow".to_string()), ..TaskPatch::default() }.validate().is_err());
        assert!(TaskPatch { priority: Some(5), ..TaskPatch::default() }.validate().is_ok());
        assert!(TaskPatch { due_date: Some("2024-02-01T10:00:00Z".to_string()), ..TaskPatch::default() }.validate().is_ok());
    }

    #[test]
    fn toggling_status() {
        assert_eq!(TaskStatus::Pending.toggled(), TaskStatus::Completed);
        assert_eq!(TaskStatus::Completed.toggled(), TaskStatus::Pending);
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
    }
}
