use std::sync::{Mutex, MutexGuard, PoisonError};

/// A state cell whose transitions run under a single lock.
///
/// The closure passed to [`StateMachine::transition`] sees the current state,
/// may replace it, and returns whatever the caller needs (usually a verdict on
/// whether the transition was legal). A poisoned lock is recovered rather than
/// propagated: the state is plain data and stays consistent between closures.
///
/// # Example
///
/// ```rust
/// use sluice_common::state_machine::StateMachine;
///
/// #[derive(Debug, PartialEq)]
/// enum Door {
///     Open,
///     Closed,
/// }
///
/// let door = StateMachine::new(Door::Open);
/// let closed = door.transition(|state| match state {
///     Door::Open => {
///         *state = Door::Closed;
///         true
///     }
///     Door::Closed => false,
/// });
/// assert!(closed);
/// assert_eq!(*door.lock(), Door::Closed);
/// ```
#[derive(Debug)]
pub struct StateMachine<S> {
    state: Mutex<S>,
}

impl<S> StateMachine<S> {
    /// Creates a new `StateMachine` in the given initial state.
    pub fn new(initial_state: S) -> Self {
        Self {
            state: Mutex::new(initial_state),
        }
    }

    /// Direct access to the state for reads.
    pub fn lock(&self) -> MutexGuard<'_, S> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the state with the lock held and return its result.
    pub fn transition<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut state = self.lock();
        f(&mut *state)
    }

    /// Consume the machine and return the final state.
    pub fn into_inner(self) -> S {
        self.state.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}
