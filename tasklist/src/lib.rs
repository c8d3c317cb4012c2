//! Task list view-model.
//!
//! Folds two inputs into a single display section:
//!
//! - **Domain events** published by a [`TaskService`] (create, update,
//!   delete, mark done, mark undone)
//! - **Gestures** from the presentation layer (load, delete, move, select,
//!   add, edit)
//!
//! Selecting a row in edit mode or tapping the add button emits a
//! [`TaskEditRequest`] on the present-edit stream instead of mutating state.
//!
//! # Architecture
//!
//! - **State**: [`TaskListState`]: tasks in display order plus edit mode
//! - **Action**: [`TaskListAction`]: gestures, domain events, effect feedback
//! - **Reducer**: [`TaskListReducer`]: pure folding logic
//! - **Environment**: [`TaskListEnvironment`]: the task service and the
//!   [`WriteQueue`] that keeps its writes in reduction order
//! - **View-model**: [`TaskListViewModel`]: store, event forwarding, outputs
//!
//! # Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use std::sync::Arc;
//! use tasklist::{InMemoryTaskService, Task, TaskListViewModel};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let service = Arc::new(InMemoryTaskService::with_tasks(vec![Task::new("Buy milk")]));
//! let view_model = TaskListViewModel::new(service);
//!
//! let mut sections = view_model.sections_stream();
//! view_model.view_did_load().await?.wait().await;
//!
//! if let Some(snapshot) = sections.next().await {
//!     println!("{} rows", snapshot[0].items.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod in_memory;
pub mod reducer;
pub mod service;
pub mod types;
pub mod view_model;
pub mod writes;

pub use in_memory::InMemoryTaskService;
pub use reducer::{TaskListEnvironment, TaskListReducer};
pub use service::{ServiceError, ServiceFuture, TaskEventStream, TaskService};
pub use types::{
    AccessoryType, LoadStatus, Task, TaskCell, TaskEditRequest, TaskEvent, TaskId,
    TaskListAction, TaskListState, TaskSection,
};
pub use view_model::{PresentTaskEditStream, SectionsStream, TaskListStore, TaskListViewModel};
pub use writes::{Ticket, Turn, WriteQueue};
