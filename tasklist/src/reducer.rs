//! Reducer logic for the task list view-model.
//!
//! Every input is folded in arrival order. Gestures address rows by index and
//! are checked against the current length, because a row can disappear
//! between the moment the user touches it and the moment the gesture is
//! reduced. Stale indices are dropped silently.
//!
//! Deletes and completion toggles are applied to local state first and then
//! sent to the service without waiting. Writes reach the service in the
//! order they were reduced, so the echoed domain events replay the same
//! sequence and converge on the local state. Service failures are logged
//! and never re-enter the reducer.

use crate::service::{ServiceError, TaskService};
use crate::types::{
    LoadStatus, Task, TaskEditRequest, TaskEvent, TaskId, TaskListAction, TaskListState,
};
use crate::writes::WriteQueue;
use std::future::Future;
use std::sync::Arc;
use tasklist_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};

/// Environment dependencies for the task list reducer
#[derive(Clone)]
pub struct TaskListEnvironment {
    /// Persistence and event source
    pub service: Arc<dyn TaskService>,
    /// Keeps service writes in reduction order
    pub writes: WriteQueue,
}

impl TaskListEnvironment {
    /// Creates a new `TaskListEnvironment`
    #[must_use]
    pub fn new(service: Arc<dyn TaskService>) -> Self {
        Self {
            service,
            writes: WriteQueue::new(),
        }
    }
}

/// Reducer for the task list
#[derive(Clone, Debug, Default)]
pub struct TaskListReducer;

impl TaskListReducer {
    /// Creates a new `TaskListReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Applies a domain event to state
    fn apply_event(state: &mut TaskListState, event: TaskEvent) {
        match event {
            TaskEvent::Create(task) => match state.position(&task.id) {
                Some(index) => state.tasks[index].assign_fields(task),
                None => state.tasks.insert(0, task),
            },
            TaskEvent::Update(task) => {
                if let Some(index) = state.position(&task.id) {
                    state.tasks[index].assign_fields(task);
                } else {
                    tracing::debug!(task_id = %task.id, "Ignoring update for unknown task");
                }
            },
            TaskEvent::Delete(id) => {
                state.tasks.retain(|task| task.id != id);
            },
            TaskEvent::MarkDone(id) => Self::set_done(state, &id, true),
            TaskEvent::MarkUndone(id) => Self::set_done(state, &id, false),
        }
    }

    fn set_done(state: &mut TaskListState, id: &TaskId, is_done: bool) {
        if let Some(index) = state.position(id) {
            state.tasks[index].is_done = is_done;
        }
    }

    /// Fire-and-forget persistence call, queued behind earlier writes;
    /// failures are logged only
    fn persist<F, Fut>(
        env: &TaskListEnvironment,
        operation: &'static str,
        call: F,
    ) -> Effect<TaskListAction>
    where
        F: FnOnce(Arc<dyn TaskService>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ServiceError>> + Send + 'static,
    {
        let service = Arc::clone(&env.service);
        let ticket = env.writes.ticket();
        Effect::fire_and_forget(async move {
            let _turn = ticket.wait().await;
            if let Err(error) = call(service).await {
                tracing::warn!(operation, %error, "Task service call failed");
            }
        })
    }

    fn present(request: TaskEditRequest) -> Effect<TaskListAction> {
        Effect::future(async move { Some(TaskListAction::PresentTaskEdit(request)) })
    }

    fn fetch(env: &TaskListEnvironment) -> Effect<TaskListAction> {
        let service = Arc::clone(&env.service);
        Effect::future(async move {
            match service.fetch_tasks().await {
                Ok(tasks) => Some(TaskListAction::TasksFetched { tasks }),
                Err(error) => Some(TaskListAction::TasksFetchFailed {
                    error: error.to_string(),
                }),
            }
        })
    }

    fn delete_at(
        state: &mut TaskListState,
        index: usize,
        env: &TaskListEnvironment,
    ) -> SmallVec<[Effect<TaskListAction>; 4]> {
        if index >= state.tasks.len() {
            tracing::debug!(index, count = state.tasks.len(), "Ignoring stale delete");
            return SmallVec::new();
        }

        let Task { id, .. } = state.tasks.remove(index);
        smallvec![Self::persist(env, "delete_task", move |service| async move {
            service.delete_task(id).await
        })]
    }

    fn move_item(state: &mut TaskListState, source: usize, destination: usize) {
        let count = state.tasks.len();
        if source >= count || destination >= count {
            tracing::debug!(source, destination, count, "Ignoring stale move");
            return;
        }

        let task = state.tasks.remove(source);
        state.tasks.insert(destination, task);
    }

    fn select_at(
        state: &mut TaskListState,
        index: usize,
        env: &TaskListEnvironment,
    ) -> SmallVec<[Effect<TaskListAction>; 4]> {
        let Some(task) = state.tasks.get_mut(index) else {
            tracing::debug!(index, "Ignoring stale select");
            return SmallVec::new();
        };

        if state.is_editing {
            return smallvec![Self::present(TaskEditRequest::Edit(task.clone()))];
        }

        task.is_done = !task.is_done;
        let id = task.id.clone();
        let effect = if task.is_done {
            Self::persist(env, "mark_done", move |service| async move {
                service.mark_done(id).await
            })
        } else {
            Self::persist(env, "mark_undone", move |service| async move {
                service.mark_undone(id).await
            })
        };
        smallvec![effect]
    }
}

impl Reducer for TaskListReducer {
    type State = TaskListState;
    type Action = TaskListAction;
    type Environment = TaskListEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Gestures ==========
            TaskListAction::ViewDidLoad => {
                if state.load_status != LoadStatus::Idle {
                    tracing::debug!(status = ?state.load_status, "Initial fetch already started");
                    return SmallVec::new();
                }
                state.load_status = LoadStatus::Loading;
                smallvec![Self::fetch(env)]
            },

            TaskListAction::ItemDidDelete { index } => Self::delete_at(state, index, env),

            TaskListAction::ItemDidMove {
                source,
                destination,
            } => {
                Self::move_item(state, source, destination);
                SmallVec::new()
            },

            TaskListAction::ItemDidSelect { index } => Self::select_at(state, index, env),

            TaskListAction::AddButtonItemDidTap => {
                smallvec![Self::present(TaskEditRequest::New(Task::new("")))]
            },

            TaskListAction::EditButtonItemDidTap => {
                state.is_editing = !state.is_editing;
                SmallVec::new()
            },

            // ========== Domain events ==========
            TaskListAction::TaskEvent(event) => {
                Self::apply_event(state, event);
                SmallVec::new()
            },

            // ========== Effect feedback ==========
            TaskListAction::TasksFetched { tasks } => {
                state.replace_tasks(tasks);
                state.load_status = LoadStatus::Loaded;
                state.last_error = None;
                SmallVec::new()
            },

            TaskListAction::TasksFetchFailed { error } => {
                tracing::warn!(%error, "Initial task fetch failed");
                state.load_status = LoadStatus::Idle;
                state.last_error = Some(error);
                SmallVec::new()
            },

            // Output only; observed through the store's action broadcast
            TaskListAction::PresentTaskEdit(_) => SmallVec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can use unwrap

    use super::*;
    use crate::in_memory::InMemoryTaskService;
    use crate::types::AccessoryType;
    use tasklist_testing::{assertions, ReducerTest};

    fn create_test_env() -> TaskListEnvironment {
        TaskListEnvironment::new(Arc::new(InMemoryTaskService::new()))
    }

    fn created(task: &Task) -> TaskListAction {
        TaskListAction::TaskEvent(TaskEvent::Create(task.clone()))
    }

    fn titles(state: &TaskListState) -> Vec<String> {
        state.tasks.iter().map(|t| t.title.clone()).collect()
    }

    #[test]
    fn test_create_inserts_at_head() {
        let first = Task::new("Hello1");
        let second = Task::new("Hello2");

        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::new())
            .given_actions([created(&first)])
            .when_action(created(&second))
            .then_state(|state| {
                assert_eq!(titles(state), ["Hello2", "Hello1"]);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_create_with_existing_id_replaces_in_place() {
        let first = Task::new("Hello");
        let second = Task::new("Other");
        let mut renamed = first.clone();
        renamed.title = "Hello, world!".to_string();

        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::new())
            .given_actions([created(&first), created(&second)])
            .when_action(created(&renamed))
            .then_state(|state| {
                assert_eq!(titles(state), ["Other", "Hello, world!"]);
            })
            .run();
    }

    #[test]
    fn test_update_replaces_fields_without_moving() {
        let task = Task::new("Hello");
        let mut updated = task.clone().with_memo("memo");
        updated.title = "Hello, world!".to_string();

        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::with_tasks(vec![task, Task::new("tail")]))
            .when_action(TaskListAction::TaskEvent(TaskEvent::Update(updated)))
            .then_state(|state| {
                assert_eq!(state.tasks[0].title, "Hello, world!");
                assert_eq!(state.tasks[0].memo.as_deref(), Some("memo"));
                assert_eq!(state.tasks[1].title, "tail");
            })
            .run();
    }

    #[test]
    fn test_update_for_unknown_id_is_ignored() {
        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::new())
            .when_action(TaskListAction::TaskEvent(TaskEvent::Update(Task::new(
                "ghost",
            ))))
            .then_state(|state| {
                assert_eq!(state.count(), 0);
            })
            .run();
    }

    #[test]
    fn test_delete_and_mark_events_for_unknown_ids_are_noops() {
        let task = Task::new("Hello");
        let ghost = TaskId::new();

        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::with_tasks(vec![task.clone()]))
            .given_actions([
                TaskListAction::TaskEvent(TaskEvent::Delete(ghost.clone())),
                TaskListAction::TaskEvent(TaskEvent::MarkDone(ghost.clone())),
            ])
            .when_action(TaskListAction::TaskEvent(TaskEvent::MarkUndone(ghost)))
            .then_state(move |state| {
                assert_eq!(state.tasks, vec![task]);
            })
            .run();
    }

    #[test]
    fn test_delete_event_removes_task() {
        let task = Task::new("Hello");

        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::with_tasks(vec![task.clone()]))
            .when_action(TaskListAction::TaskEvent(TaskEvent::Delete(task.id)))
            .then_state(|state| {
                assert_eq!(state.count(), 0);
            })
            .run();
    }

    #[test]
    fn test_item_did_delete_removes_row_and_persists() {
        let task = Task::new("Hello");

        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::new())
            .given_actions([created(&task)])
            .when_action(TaskListAction::ItemDidDelete { index: 0 })
            .then_state(|state| {
                assert_eq!(state.count(), 0);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_item_did_delete_out_of_range_is_ignored() {
        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::with_tasks(vec![Task::new("Hello")]))
            .when_action(TaskListAction::ItemDidDelete { index: 1 })
            .then_state(|state| {
                assert_eq!(state.count(), 1);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_item_did_move_reorders() {
        let first = Task::new("Hello1");
        let second = Task::new("Hello2");

        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::new())
            .given_actions([created(&first), created(&second)])
            .when_action(TaskListAction::ItemDidMove {
                source: 0,
                destination: 1,
            })
            .then_state(|state| {
                assert_eq!(titles(state), ["Hello1", "Hello2"]);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_item_did_move_to_front() {
        let tasks = vec![Task::new("a"), Task::new("b"), Task::new("c")];

        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::with_tasks(tasks))
            .when_action(TaskListAction::ItemDidMove {
                source: 2,
                destination: 0,
            })
            .then_state(|state| {
                assert_eq!(titles(state), ["c", "a", "b"]);
            })
            .run();
    }

    #[test]
    fn test_item_did_move_out_of_range_is_ignored() {
        let tasks = vec![Task::new("a"), Task::new("b")];

        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::with_tasks(tasks))
            .given_actions([TaskListAction::ItemDidMove {
                source: 2,
                destination: 0,
            }])
            .when_action(TaskListAction::ItemDidMove {
                source: 0,
                destination: 2,
            })
            .then_state(|state| {
                assert_eq!(titles(state), ["a", "b"]);
            })
            .run();
    }

    #[test]
    fn test_select_undone_marks_done() {
        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::with_tasks(vec![Task::new("Hello")]))
            .when_action(TaskListAction::ItemDidSelect { index: 0 })
            .then_state(|state| {
                assert_eq!(state.sections()[0].items[0].accessory, AccessoryType::Checkmark);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_select_done_marks_undone() {
        let task = Task::new("Hello");

        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::new())
            .given_actions([
                created(&task),
                TaskListAction::TaskEvent(TaskEvent::MarkDone(task.id.clone())),
            ])
            .when_action(TaskListAction::ItemDidSelect { index: 0 })
            .then_state(|state| {
                assert_eq!(state.sections()[0].items[0].accessory, AccessoryType::None);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_select_in_edit_mode_keeps_completion() {
        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::with_tasks(vec![Task::new("Hello")]))
            .given_actions([TaskListAction::EditButtonItemDidTap])
            .when_action(TaskListAction::ItemDidSelect { index: 0 })
            .then_state(|state| {
                assert!(state.is_editing);
                assert!(!state.tasks[0].is_done);
            })
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn test_select_out_of_range_is_ignored() {
        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::new())
            .when_action(TaskListAction::ItemDidSelect { index: 0 })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_edit_button_toggles_edit_mode() {
        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::new())
            .given_actions([TaskListAction::EditButtonItemDidTap])
            .when_action(TaskListAction::EditButtonItemDidTap)
            .then_state(|state| {
                assert!(!state.is_editing);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_add_button_emits_present_effect() {
        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::new())
            .when_action(TaskListAction::AddButtonItemDidTap)
            .then_state(|state| {
                assert_eq!(state.count(), 0);
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn test_view_did_load_starts_fetch_once() {
        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::new())
            .given_actions([TaskListAction::ViewDidLoad])
            .when_action(TaskListAction::ViewDidLoad)
            .then_state(|state| {
                assert_eq!(state.load_status, LoadStatus::Loading);
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn test_tasks_fetched_replaces_state() {
        let fetched = vec![Task::new("a"), Task::new("b"), Task::new("c")];

        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::with_tasks(vec![Task::new("stale")]))
            .given_actions([TaskListAction::ViewDidLoad])
            .when_action(TaskListAction::TasksFetched { tasks: fetched })
            .then_state(|state| {
                assert_eq!(titles(state), ["a", "b", "c"]);
                assert_eq!(state.load_status, LoadStatus::Loaded);
                assert_eq!(state.last_error, None);
            })
            .run();
    }

    #[test]
    fn test_fetch_failure_records_error_and_allows_retry() {
        ReducerTest::new(TaskListReducer::new())
            .with_env(create_test_env())
            .given_state(TaskListState::new())
            .given_actions([
                TaskListAction::ViewDidLoad,
                TaskListAction::TasksFetchFailed {
                    error: "Task service unavailable".to_string(),
                },
            ])
            .when_action(TaskListAction::ViewDidLoad)
            .then_state(|state| {
                assert_eq!(state.load_status, LoadStatus::Loading);
                assert!(state.last_error.as_ref().unwrap().contains("unavailable"));
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[tokio::test]
    async fn test_present_effect_carries_selected_task() {
        let task = Task::new("Hello");
        let mut state = TaskListState::with_tasks(vec![task.clone()]);
        state.is_editing = true;

        let mut effects = TaskListReducer::new().reduce(
            &mut state,
            TaskListAction::ItemDidSelect { index: 0 },
            &create_test_env(),
        );
        let Some(Effect::Future(fut)) = effects.pop() else {
            unreachable!("edit-mode select always presents");
        };

        assert_eq!(
            fut.await,
            Some(TaskListAction::PresentTaskEdit(TaskEditRequest::Edit(task)))
        );
    }

    #[tokio::test]
    async fn test_writes_run_in_reduction_order() {
        let task = Task::new("Hello");
        let service = Arc::new(InMemoryTaskService::with_tasks(vec![task.clone()]));
        let env = TaskListEnvironment::new(service.clone());
        let reducer = TaskListReducer::new();
        let mut state = TaskListState::with_tasks(vec![task]);

        let mut first = reducer.reduce(&mut state, TaskListAction::ItemDidSelect { index: 0 }, &env);
        let mut second = reducer.reduce(&mut state, TaskListAction::ItemDidSelect { index: 0 }, &env);
        let (Some(Effect::Future(mark_done)), Some(Effect::Future(mark_undone))) =
            (first.pop(), second.pop())
        else {
            unreachable!("select always persists");
        };

        // Start the later write first; it must still land last
        let late = tokio::spawn(mark_undone);
        tokio::task::yield_now().await;
        assert_eq!(mark_done.await, None);
        assert_eq!(late.await.unwrap(), None);

        assert!(!state.tasks[0].is_done);
        assert!(!service.tasks().await[0].is_done);
        assert_eq!(env.writes.completed(), 2);
    }

    #[tokio::test]
    async fn test_persistence_failure_does_not_feed_back() {
        let service = InMemoryTaskService::new();
        service.set_available(false);
        let env = TaskListEnvironment::new(Arc::new(service));
        let mut state = TaskListState::with_tasks(vec![Task::new("Hello")]);

        let mut effects =
            TaskListReducer::new().reduce(&mut state, TaskListAction::ItemDidDelete { index: 0 }, &env);
        let Some(Effect::Future(fut)) = effects.pop() else {
            unreachable!("delete always persists");
        };

        assert_eq!(fut.await, None);
        assert_eq!(state.count(), 0);
    }
}
