//! In-memory task service.
//!
//! Keeps tasks in an ordered `Vec` and publishes every committed mutation on
//! a broadcast channel. Used by the demo binary and by tests, which can also
//! inject raw events with [`InMemoryTaskService::emit`] and simulate outages
//! with [`InMemoryTaskService::set_available`].

use crate::service::{ServiceError, ServiceFuture, TaskEventStream, TaskService};
use crate::types::{Task, TaskEvent, TaskId};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, broadcast};

/// Default number of events buffered per subscriber
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// In-memory [`TaskService`].
///
/// Clones share storage and the event channel.
///
/// # Example
///
/// ```
/// use tasklist::{InMemoryTaskService, Task, TaskService};
///
/// # async fn example() -> Result<(), tasklist::ServiceError> {
/// let service = InMemoryTaskService::new();
/// service.create_task(Task::new("Buy milk")).await?;
///
/// let tasks = service.fetch_tasks().await?;
/// assert_eq!(tasks.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct InMemoryTaskService {
    tasks: Arc<Mutex<Vec<Task>>>,
    events: broadcast::Sender<TaskEvent>,
    available: Arc<AtomicBool>,
}

impl InMemoryTaskService {
    /// Creates an empty service
    #[must_use]
    pub fn new() -> Self {
        Self::with_tasks(Vec::new())
    }

    /// Creates a service holding `tasks` in the given order
    #[must_use]
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            tasks: Arc::new(Mutex::new(tasks)),
            events,
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Publishes a raw event without touching storage
    ///
    /// Returns the number of subscribers that received it.
    pub fn emit(&self, event: TaskEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }

    /// Makes every subsequent call succeed (`true`) or fail with
    /// [`ServiceError::Unavailable`] (`false`)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Copy of the stored tasks
    pub async fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().await.clone()
    }

    fn ensure_available(&self) -> Result<(), ServiceError> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ServiceError::Unavailable)
        }
    }

    fn commit(&self, event: TaskEvent) {
        tracing::debug!(task_id = %event.task_id(), ?event, "Committed task event");
        let _ = self.events.send(event);
    }

    async fn set_done(&self, id: TaskId, is_done: bool) -> Result<(), ServiceError> {
        self.ensure_available()?;
        let mut tasks = self.tasks.lock().await;
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| ServiceError::NotFound(id.clone()))?;
        task.is_done = is_done;

        self.commit(if is_done {
            TaskEvent::MarkDone(id)
        } else {
            TaskEvent::MarkUndone(id)
        });
        Ok(())
    }
}

impl Default for InMemoryTaskService {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskService for InMemoryTaskService {
    fn fetch_tasks(&self) -> ServiceFuture<'_, Vec<Task>> {
        Box::pin(async move {
            self.ensure_available()?;
            Ok(self.tasks.lock().await.clone())
        })
    }

    fn events(&self) -> TaskEventStream {
        let mut receiver = self.events.subscribe();
        Box::pin(async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) => yield event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Task event subscriber lagged, events skipped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn create_task(&self, task: Task) -> ServiceFuture<'_, ()> {
        Box::pin(async move {
            self.ensure_available()?;
            let mut tasks = self.tasks.lock().await;
            match tasks.iter_mut().find(|stored| stored.id == task.id) {
                Some(stored) => stored.assign_fields(task.clone()),
                None => tasks.insert(0, task.clone()),
            }

            self.commit(TaskEvent::Create(task));
            Ok(())
        })
    }

    fn update_task(&self, task: Task) -> ServiceFuture<'_, ()> {
        Box::pin(async move {
            self.ensure_available()?;
            let mut tasks = self.tasks.lock().await;
            let stored = tasks
                .iter_mut()
                .find(|stored| stored.id == task.id)
                .ok_or_else(|| ServiceError::NotFound(task.id.clone()))?;
            stored.assign_fields(task.clone());

            self.commit(TaskEvent::Update(task));
            Ok(())
        })
    }

    fn delete_task(&self, id: TaskId) -> ServiceFuture<'_, ()> {
        Box::pin(async move {
            self.ensure_available()?;
            let mut tasks = self.tasks.lock().await;
            let index = tasks
                .iter()
                .position(|task| task.id == id)
                .ok_or_else(|| ServiceError::NotFound(id.clone()))?;
            tasks.remove(index);

            self.commit(TaskEvent::Delete(id));
            Ok(())
        })
    }

    fn mark_done(&self, id: TaskId) -> ServiceFuture<'_, ()> {
        Box::pin(self.set_done(id, true))
    }

    fn mark_undone(&self, id: TaskId) -> ServiceFuture<'_, ()> {
        Box::pin(self.set_done(id, false))
    }
}
