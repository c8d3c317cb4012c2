//! Domain types for the task list.
//!
//! A task list is an ordered sequence of tasks. Order is meaningful: new tasks
//! appear at the head, and the user can drag tasks into any position. The
//! view-model never sorts; every operation either keeps positions or names
//! them explicitly.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a task
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Creates a new random `TaskId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single task
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, fixed for the task's lifetime
    pub id: TaskId,
    /// Title shown in the list
    pub title: String,
    /// Optional free-form note
    pub memo: Option<String>,
    /// Whether the task is done
    pub is_done: bool,
}

impl Task {
    /// Creates a new, undone task with a fresh id
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            title: title.into(),
            memo: None,
            is_done: false,
        }
    }

    /// Sets the memo
    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Copies every mutable field from `other`, keeping this task's id
    pub fn assign_fields(&mut self, other: Task) {
        self.title = other.title;
        self.memo = other.memo;
        self.is_done = other.is_done;
    }
}

/// A committed change to the task collection, published by the task service
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskEvent {
    /// A task was created (or re-created with the same id)
    Create(Task),
    /// A task's fields changed
    Update(Task),
    /// A task was deleted
    Delete(TaskId),
    /// A task was marked as done
    MarkDone(TaskId),
    /// A task was marked as not done
    MarkUndone(TaskId),
}

impl TaskEvent {
    /// The id of the task this event concerns
    #[must_use]
    pub const fn task_id(&self) -> &TaskId {
        match self {
            Self::Create(task) | Self::Update(task) => &task.id,
            Self::Delete(id) | Self::MarkDone(id) | Self::MarkUndone(id) => id,
        }
    }
}

/// Request for the presentation layer to open the edit screen
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskEditRequest {
    /// Compose a brand-new, unsaved task
    New(Task),
    /// Edit an existing task
    Edit(Task),
}

impl TaskEditRequest {
    /// The task to show on the edit screen
    #[must_use]
    pub const fn task(&self) -> &Task {
        match self {
            Self::New(task) | Self::Edit(task) => task,
        }
    }
}

/// Trailing decoration of a cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessoryType {
    /// Undone task
    None,
    /// Done task
    Checkmark,
}

/// Read-only projection of a task for display
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskCell {
    /// Id of the projected task
    pub id: TaskId,
    /// Task title
    pub title: String,
    /// Checkmark when done
    pub accessory: AccessoryType,
}

impl From<&Task> for TaskCell {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            accessory: if task.is_done {
                AccessoryType::Checkmark
            } else {
                AccessoryType::None
            },
        }
    }
}

/// One display section; the list always renders exactly one
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskSection {
    /// Cells in display order
    pub items: Vec<TaskCell>,
}

/// Progress of the one-shot initial fetch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadStatus {
    /// No fetch in flight; `ViewDidLoad` will start one
    #[default]
    Idle,
    /// Fetch in flight
    Loading,
    /// Fetch completed; later `ViewDidLoad` inputs are ignored
    Loaded,
}

/// State of the task list view-model
#[derive(Clone, Debug, Default)]
pub struct TaskListState {
    /// Tasks in display order, ids unique
    pub tasks: Vec<Task>,
    /// Whether selecting a row opens it for editing instead of toggling it
    pub is_editing: bool,
    /// Initial fetch progress
    pub load_status: LoadStatus,
    /// Last fetch failure (if any)
    pub last_error: Option<String>,
}

impl TaskListState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state seeded with tasks, dropping repeated ids
    #[must_use]
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let mut state = Self::default();
        state.replace_tasks(tasks);
        state
    }

    /// Number of tasks
    #[must_use]
    pub fn count(&self) -> usize {
        self.tasks.len()
    }

    /// Position of a task by id
    #[must_use]
    pub fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| &task.id == id)
    }

    /// Replaces every task; the first occurrence of a repeated id wins
    pub fn replace_tasks(&mut self, tasks: Vec<Task>) {
        let mut seen = std::collections::HashSet::with_capacity(tasks.len());
        self.tasks = tasks
            .into_iter()
            .filter(|task| seen.insert(task.id.clone()))
            .collect();
    }

    /// The display snapshot: exactly one section
    #[must_use]
    pub fn sections(&self) -> Vec<TaskSection> {
        vec![TaskSection {
            items: self.tasks.iter().map(TaskCell::from).collect(),
        }]
    }
}

/// Inputs to the task list reducer
///
/// Gestures come from the user interface, domain events from the task
/// service, and the remaining variants are produced by effects.
#[derive(Clone, Debug, PartialEq)]
pub enum TaskListAction {
    // ========== Gestures ==========
    /// The view appeared for the first time; fetch stored tasks
    ViewDidLoad,

    /// Swipe-delete of the row at `index`
    ItemDidDelete {
        /// Row being deleted
        index: usize,
    },

    /// Drag of a row from `source` to `destination`
    ItemDidMove {
        /// Row being dragged
        source: usize,
        /// Row it lands on
        destination: usize,
    },

    /// Tap on the row at `index`
    ItemDidSelect {
        /// Row tapped
        index: usize,
    },

    /// Tap on the add button
    AddButtonItemDidTap,

    /// Tap on the edit button
    EditButtonItemDidTap,

    // ========== Domain events ==========
    /// A committed change published by the task service
    TaskEvent(TaskEvent),

    // ========== Effect feedback ==========
    /// The initial fetch returned
    TasksFetched {
        /// Stored tasks in display order
        tasks: Vec<Task>,
    },

    /// The initial fetch failed
    TasksFetchFailed {
        /// Error message
        error: String,
    },

    /// Output: open the edit screen
    PresentTaskEdit(TaskEditRequest),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_display() {
        let id = TaskId::new();
        let display = format!("{id}");
        assert_eq!(display, id.as_uuid().to_string());
    }

    #[test]
    fn task_new_is_undone() {
        let task = Task::new("Hello");

        assert_eq!(task.title, "Hello");
        assert_eq!(task.memo, None);
        assert!(!task.is_done);
    }

    #[test]
    fn assign_fields_keeps_id() {
        let mut task = Task::new("Hello");
        let id = task.id.clone();
        let mut other = Task::new("Hello, world!").with_memo("note");
        other.is_done = true;

        task.assign_fields(other);

        assert_eq!(task.id, id);
        assert_eq!(task.title, "Hello, world!");
        assert_eq!(task.memo.as_deref(), Some("note"));
        assert!(task.is_done);
    }

    #[test]
    fn cell_accessory_follows_completion() {
        let mut task = Task::new("Hello");
        assert_eq!(TaskCell::from(&task).accessory, AccessoryType::None);

        task.is_done = true;
        assert_eq!(TaskCell::from(&task).accessory, AccessoryType::Checkmark);
    }

    #[test]
    fn with_tasks_drops_repeated_ids() {
        let first = Task::new("first");
        let mut duplicate = first.clone();
        duplicate.title = "duplicate".to_string();
        let second = Task::new("second");

        let state = TaskListState::with_tasks(vec![first.clone(), duplicate, second.clone()]);

        assert_eq!(state.count(), 2);
        assert_eq!(state.tasks[0].title, "first");
        assert_eq!(state.position(&second.id), Some(1));
    }

    #[test]
    fn sections_has_exactly_one_section() {
        let state = TaskListState::new();
        let sections = state.sections();

        assert_eq!(sections.len(), 1);
        assert!(sections[0].items.is_empty());
    }

    #[test]
    fn event_task_id() {
        let task = Task::new("Hello");
        assert_eq!(TaskEvent::Create(task.clone()).task_id(), &task.id);
        assert_eq!(TaskEvent::MarkUndone(task.id.clone()).task_id(), &task.id);
    }

    #[test]
    fn edit_request_exposes_task() {
        let task = Task::new("");
        assert_eq!(TaskEditRequest::New(task.clone()).task(), &task);
    }
}
