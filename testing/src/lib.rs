//! # Task List Testing
//!
//! Testing utilities and helpers for the task list view-model.
//!
//! This crate provides:
//! - [`ReducerTest`]: a Given-When-Then harness for reducers
//! - [`assertions`]: helpers for inspecting returned effects
//! - [`init_test_tracing`]: log capture for test runs
//!
//! ## Example
//!
//! ```ignore
//! use tasklist_testing::{assertions, ReducerTest};
//!
//! ReducerTest::new(TaskListReducer::new())
//!     .with_env(test_environment())
//!     .given_state(TaskListState::default())
//!     .when_action(TaskListAction::EditButtonItemDidTap)
//!     .then_state(|state| assert!(state.is_editing))
//!     .then_effects(assertions::assert_no_effects)
//!     .run();
//! ```


pub use reducer_test::{assertions, ReducerTest};

/// Install a `tracing` subscriber that writes through the test harness
///
/// Honours `RUST_LOG`; defaults to `debug` for the workspace crates. Safe to
/// call from every test: only the first call installs the subscriber.
pub fn init_test_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("tasklist=debug,tasklist_runtime=debug")
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
