//! Task service contract.
//!
//! The service owns persistence. The view-model only reads the initial task
//! list, issues fire-and-forget commands, and listens to the event stream,
//! which carries every committed mutation including the ones the view-model
//! caused itself.

use crate::types::{Task, TaskEvent, TaskId};
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during task service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The backing store cannot be reached
    #[error("Task service unavailable")]
    Unavailable,

    /// The command referenced a task the store does not hold
    #[error("Task {0} not found")]
    NotFound(TaskId),
}

/// Stream of committed task events.
pub type TaskEventStream = Pin<Box<dyn Stream<Item = TaskEvent> + Send>>;

/// Boxed future returned by [`TaskService`] operations.
pub type ServiceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ServiceError>> + Send + 'a>>;

/// Trait for task service implementations.
///
/// # Dyn Compatibility
///
/// Operations return boxed futures instead of using `async fn` so the
/// service can be held as `Arc<dyn TaskService>` and captured by effects.
pub trait TaskService: Send + Sync {
    /// Load all stored tasks in display order.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unavailable`] if the store cannot be read.
    fn fetch_tasks(&self) -> ServiceFuture<'_, Vec<Task>>;

    /// Subscribe to committed task events.
    ///
    /// The subscription is taken when this method is called, so every event
    /// committed afterwards is delivered, even before the stream is first polled.
    fn events(&self) -> TaskEventStream;

    /// Store a new task; publishes [`TaskEvent::Create`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Unavailable`] if the store cannot be written.
    fn create_task(&self, task: Task) -> ServiceFuture<'_, ()>;

    /// Replace a stored task's fields; publishes [`TaskEvent::Update`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if no task has this id.
    fn update_task(&self, task: Task) -> ServiceFuture<'_, ()>;

    /// Remove a stored task; publishes [`TaskEvent::Delete`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if no task has this id.
    fn delete_task(&self, id: TaskId) -> ServiceFuture<'_, ()>;

    /// Mark a stored task as done; publishes [`TaskEvent::MarkDone`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if no task has this id.
    fn mark_done(&self, id: TaskId) -> ServiceFuture<'_, ()>;

    /// Mark a stored task as not done; publishes [`TaskEvent::MarkUndone`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotFound`] if no task has this id.
    fn mark_undone(&self, id: TaskId) -> ServiceFuture<'_, ()>;
}
