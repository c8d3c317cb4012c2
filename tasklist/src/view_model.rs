//! Task list view-model.
//!
//! Wraps a [`Store`] running [`TaskListReducer`] and a single input task
//! that owns the service's event subscription. Gestures are handed to the
//! same task, which first reduces every event already committed to the
//! subscription. An event the service committed before a gesture is
//! therefore always reduced before it, and every snapshot is the result of
//! folding whole inputs in arrival order.

use crate::reducer::{TaskListEnvironment, TaskListReducer};
use crate::service::{TaskEventStream, TaskService};
use crate::types::{
    Task, TaskEditRequest, TaskEvent, TaskListAction, TaskListState, TaskSection,
};
use futures::{FutureExt, Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tasklist_runtime::{EffectHandle, Store, StoreConfig, StoreError};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;

/// Store specialised for the task list
pub type TaskListStore = Store<TaskListState, TaskListAction, TaskListEnvironment, TaskListReducer>;

/// Stream of display snapshots
pub type SectionsStream = Pin<Box<dyn Stream<Item = Vec<TaskSection>> + Send>>;

/// Stream of requests to open the edit screen
pub type PresentTaskEditStream = Pin<Box<dyn Stream<Item = TaskEditRequest> + Send>>;

/// A gesture waiting for the input task, with the channel for its result
type GestureRequest = (TaskListAction, oneshot::Sender<Result<EffectHandle, StoreError>>);

/// View-model for the task list screen.
///
/// Dropping the view-model stops the input task. Effects already in flight
/// keep running until they finish.
pub struct TaskListViewModel {
    store: TaskListStore,
    gestures: mpsc::UnboundedSender<GestureRequest>,
    inputs: JoinHandle<()>,
}

impl TaskListViewModel {
    /// Creates a view-model over `service` with the default [`StoreConfig`].
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn new(service: Arc<dyn TaskService>) -> Self {
        Self::with_config(service, StoreConfig::default())
    }

    /// Creates a view-model with a custom store configuration.
    ///
    /// The event subscription is taken here, so events committed after this
    /// call returns are never missed.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn with_config(service: Arc<dyn TaskService>, config: StoreConfig) -> Self {
        let events = service.events();
        let store = Store::with_config(
            TaskListState::new(),
            TaskListReducer::new(),
            TaskListEnvironment::new(service),
            config,
        );

        let (gestures, requests) = mpsc::unbounded_channel();
        let inputs = tokio::spawn(run_inputs(store.clone(), events, requests));

        Self {
            store,
            gestures,
            inputs,
        }
    }

    /// Hands a gesture to the input task and waits until it is reduced
    async fn dispatch(&self, action: TaskListAction) -> Result<EffectHandle, StoreError> {
        let (reply, result) = oneshot::channel();
        if self.gestures.send((action, reply)).is_err() {
            return Err(StoreError::ShutdownInProgress);
        }
        result.await.unwrap_or(Err(StoreError::ShutdownInProgress))
    }

    /// The view appeared; starts the one-shot fetch of stored tasks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn view_did_load(&self) -> Result<EffectHandle, StoreError> {
        self.dispatch(TaskListAction::ViewDidLoad).await
    }

    /// Swipe-delete of the row at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn item_did_delete(&self, index: usize) -> Result<EffectHandle, StoreError> {
        self.dispatch(TaskListAction::ItemDidDelete { index }).await
    }

    /// Drag of a row from `source` to `destination`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn item_did_move(
        &self,
        source: usize,
        destination: usize,
    ) -> Result<EffectHandle, StoreError> {
        self.dispatch(TaskListAction::ItemDidMove {
            source,
            destination,
        })
        .await
    }

    /// Tap on the row at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn item_did_select(&self, index: usize) -> Result<EffectHandle, StoreError> {
        self.dispatch(TaskListAction::ItemDidSelect { index }).await
    }

    /// Tap on the add button.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn add_button_item_did_tap(&self) -> Result<EffectHandle, StoreError> {
        self.dispatch(TaskListAction::AddButtonItemDidTap).await
    }

    /// Tap on the edit button.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`Self::shutdown`].
    pub async fn edit_button_item_did_tap(&self) -> Result<EffectHandle, StoreError> {
        self.dispatch(TaskListAction::EditButtonItemDidTap).await
    }

    /// Current display snapshot
    pub async fn sections(&self) -> Vec<TaskSection> {
        self.store.state(TaskListState::sections).await
    }

    /// Current snapshot first, then a new one after each reduced input.
    ///
    /// Inputs reduced while the consumer is not polling are coalesced into
    /// the next snapshot.
    #[must_use]
    pub fn sections_stream(&self) -> SectionsStream {
        let store = self.store.clone();
        let mut revisions = store.subscribe_revisions();

        Box::pin(async_stream::stream! {
            loop {
                revisions.borrow_and_update();
                yield store.state(TaskListState::sections).await;

                if revisions.changed().await.is_err() {
                    break;
                }
            }
        })
    }

    /// Edit requests emitted after this call.
    #[must_use]
    pub fn present_task_edit(&self) -> PresentTaskEditStream {
        let mut actions = self.store.subscribe_actions();

        Box::pin(async_stream::stream! {
            loop {
                match actions.recv().await {
                    Ok(TaskListAction::PresentTaskEdit(request)) => yield request,
                    Ok(_) => {},
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Present-edit subscriber lagged, requests skipped");
                    },
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Whether selecting a row opens it for editing
    pub async fn is_editing(&self) -> bool {
        self.store.state(|state| state.is_editing).await
    }

    /// Tasks in display order
    pub async fn tasks(&self) -> Vec<Task> {
        self.store.state(|state| state.tasks.clone()).await
    }

    /// Last fetch failure, cleared by a successful fetch
    pub async fn last_error(&self) -> Option<String> {
        self.store.state(|state| state.last_error.clone()).await
    }

    /// Rejects further input and waits for in-flight effects.
    ///
    /// The input task stops forwarding domain events at the first one it
    /// receives after this call.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
    /// when the configured timeout expires.
    pub async fn shutdown(&self) -> Result<(), StoreError> {
        self.store.shutdown_with_default_timeout().await
    }
}

impl Drop for TaskListViewModel {
    fn drop(&mut self) {
        self.inputs.abort();
    }
}

impl std::fmt::Debug for TaskListViewModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskListViewModel")
            .field("revision", &self.store.revision())
            .field("running", &!self.inputs.is_finished())
            .finish_non_exhaustive()
    }
}

/// Reduces domain events and gestures one at a time, in arrival order.
///
/// Ready events win over gestures, and a gesture is only sent after every
/// event already delivered to the subscription.
async fn run_inputs(
    store: TaskListStore,
    mut events: TaskEventStream,
    mut requests: mpsc::UnboundedReceiver<GestureRequest>,
) {
    let mut forwarding = true;

    loop {
        tokio::select! {
            biased;

            event = events.next(), if forwarding => {
                forwarding = match event {
                    Some(event) => forward_event(&store, event).await,
                    None => {
                        tracing::debug!("Task event stream ended");
                        false
                    },
                };
            },

            request = requests.recv() => {
                let Some((action, reply)) = request else {
                    break;
                };

                if forwarding {
                    forwarding = drain_ready_events(&store, &mut events).await;
                }
                let _ = reply.send(store.send(action).await);
            },
        }
    }

    tracing::debug!("Task list input task stopped");
}

/// Sends every event that is ready without waiting; `false` once forwarding stops
async fn drain_ready_events(store: &TaskListStore, events: &mut TaskEventStream) -> bool {
    while let Some(next) = events.next().now_or_never() {
        let Some(event) = next else {
            tracing::debug!("Task event stream ended");
            return false;
        };
        if !forward_event(store, event).await {
            return false;
        }
    }
    true
}

/// Sends one domain event; `false` once the store rejects input
async fn forward_event(store: &TaskListStore, event: TaskEvent) -> bool {
    tracing::debug!(task_id = %event.task_id(), "Forwarding task event");
    match store.send(TaskListAction::TaskEvent(event)).await {
        Ok(_) => true,
        Err(error) => {
            tracing::debug!(%error, "Stopped forwarding task events");
            false
        },
    }
}
