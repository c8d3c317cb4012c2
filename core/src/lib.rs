//! # Task List Core
//!
//! Core traits and types for the task list view-model.
//!
//! The view-model is expressed as a reducer: every input, whether a domain
//! event from the task service or a gesture from the user interface, is an
//! action folded into state by a pure function. Side effects (persistence
//! calls, navigation signals) are returned as descriptions and executed by the
//! runtime crate.
//!
//! ## Core Concepts
//!
//! - **State**: Ordered task list plus view flags
//! - **Action**: All possible inputs to a reducer (gestures, domain events, feedback)
//! - **Reducer**: Pure function `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: Side effect descriptions (not execution)
//! - **Environment**: Injected dependencies (the task service)
//!
//! ## Example
//!
//! ```ignore
//! use tasklist_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! impl Reducer for TaskListReducer {
//!     type State = TaskListState;
//!     type Action = TaskListAction;
//!     type Environment = TaskListEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut TaskListState,
//!         action: TaskListAction,
//!         env: &TaskListEnvironment,
//!     ) -> SmallVec<[Effect<TaskListAction>; 4]> {
//!         // Business logic goes here
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

pub use smallvec::{smallvec, SmallVec};

/// Reducer module - The core trait for view-model logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all view-model logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for view-model logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```
    /// use tasklist_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
    ///
    /// struct Toggle;
    ///
    /// impl Reducer for Toggle {
    ///     type State = bool;
    ///     type Action = ();
    ///     type Environment = ();
    ///
    ///     fn reduce(&self, state: &mut bool, _action: (), _env: &()) -> SmallVec<[Effect<()>; 4]> {
    ///         *state = !*state;
    ///         smallvec![Effect::None]
    ///     }
    /// }
    ///
    /// let mut state = false;
    /// Toggle.reduce(&mut state, (), &());
    /// assert!(state);
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Updates state in place
        /// 2. Returns effect descriptions to be executed
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// Effects to be executed by the runtime. Most actions produce zero or
        /// one effect, so the inline capacity of four avoids heap allocation.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution) and are composable.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is broadcast to
        /// observers and fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Wrap a future that produces no feedback action
        ///
        /// Used for fire-and-forget work such as persistence calls whose
        /// outcome never re-enters the reducer.
        ///
        /// # Example
        ///
        /// ```
        /// use tasklist_core::effect::Effect;
        ///
        /// let effect: Effect<()> = Effect::fire_and_forget(async {});
        /// assert!(effect.is_future());
        /// ```
        #[must_use]
        pub fn fire_and_forget<F>(future: F) -> Effect<Action>
        where
            F: Future<Output = ()> + Send + 'static,
        {
            Effect::Future(Box::pin(async move {
                future.await;
                None
            }))
        }

        /// Wrap a future whose output is fed back as an action
        #[must_use]
        pub fn future<F>(future: F) -> Effect<Action>
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(future))
        }

        /// Returns true for `Effect::None`
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }

        /// Returns true for `Effect::Future`
        #[must_use]
        pub const fn is_future(&self) -> bool {
            matches!(self, Effect::Future(_))
        }
    }
}
