//! Upload task lifecycle.
//!
//! ```text
//!                       ┌──> ExistingFound ──────────────────────────────────┐
//! Resolving ────────────┤                                                    v
//!                       └──> CreatingNew -> WaitingForCreateTx               Ready
//!                                -> WaitingForCreateConfirm -> WaitingForLive ┘  │
//!                                                                                v
//!                             AddingRoots -> WaitingForRootTx -> WaitingForRootConfirm -> Complete
//!                                  └──────────────── legacy provider ───────────────────┘
//! ```
//!
//! Any creation step may fail into `CreationFailed`; any root addition step
//! into `RootAdditionFailed`. Both are terminal.

use thiserror::Error;
use tokio::time::Instant;
use tracing::debug;

/// Where an upload task stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CoordinatorState {
    /// Choosing a provider and proof set.
    Resolving,
    /// An existing proof set was chosen.
    ExistingFound,
    /// A new proof set is needed.
    CreatingNew,
    /// Creation submitted; waiting for the transaction to be mined.
    WaitingForCreateTx,
    /// Mined; waiting for the provider to report the new set.
    WaitingForCreateConfirm,
    /// Reported; waiting for the verifier to mark the set live.
    WaitingForLive,
    /// A live proof set is ready for roots.
    Ready,
    /// Signing and submitting roots.
    AddingRoots,
    /// Roots submitted; waiting for the transaction to be mined.
    WaitingForRootTx,
    /// Mined; waiting for the provider to report the assigned root ids.
    WaitingForRootConfirm,
    /// Roots confirmed.
    Complete,
    /// Proof set creation failed or timed out.
    CreationFailed,
    /// Root addition failed or timed out.
    RootAdditionFailed,
}

impl CoordinatorState {
    /// Whether no further event is accepted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::CreationFailed | Self::RootAdditionFailed)
    }

    /// Whether this is a proof set creation step.
    pub fn is_creating(&self) -> bool {
        matches!(
            self,
            Self::CreatingNew
                | Self::WaitingForCreateTx
                | Self::WaitingForCreateConfirm
                | Self::WaitingForLive
        )
    }

    /// Whether this is a root addition step.
    pub fn is_adding_roots(&self) -> bool {
        matches!(self, Self::AddingRoots | Self::WaitingForRootTx | Self::WaitingForRootConfirm)
    }
}

/// Something that moves an upload task forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CoordinatorEvent {
    /// An existing proof set matched the selection.
    ExistingSelected,
    /// No proof set matched; one must be created.
    CreationRequired,
    /// The existing set was accepted.
    Accepted,
    /// The creation transaction was submitted.
    CreateSubmitted,
    /// The creation transaction was mined.
    CreateMined,
    /// The provider reported the new proof set.
    CreateConfirmed,
    /// The verifier marked the set live.
    Live,
    /// Root addition began.
    AddRoots,
    /// The root addition transaction was submitted.
    RootsSubmitted,
    /// A legacy provider acknowledged the roots without a transaction.
    RootsAcknowledged,
    /// The root addition transaction was mined.
    RootsMined,
    /// The provider reported the assigned root ids.
    RootsConfirmed,
    /// The current step timed out or was rejected.
    Failed,
}

/// An event that is not valid in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event} in state {state}")]
pub struct InvalidTransition {
    /// State the event arrived in.
    pub state: CoordinatorState,
    /// The rejected event.
    pub event: CoordinatorEvent,
}

/// The transition function.
pub fn transition(
    state: CoordinatorState,
    event: CoordinatorEvent,
) -> Result<CoordinatorState, InvalidTransition> {
    use CoordinatorEvent as E;
    use CoordinatorState as S;

    let next = match (state, event) {
        (S::Resolving, E::ExistingSelected) => S::ExistingFound,
        (S::Resolving, E::CreationRequired) => S::CreatingNew,
        (S::ExistingFound, E::Accepted) => S::Ready,

        (S::CreatingNew, E::CreateSubmitted) => S::WaitingForCreateTx,
        (S::WaitingForCreateTx, E::CreateMined) => S::WaitingForCreateConfirm,
        (S::WaitingForCreateConfirm, E::CreateConfirmed) => S::WaitingForLive,
        (S::WaitingForLive, E::Live) => S::Ready,
        (s, E::Failed) if s.is_creating() => S::CreationFailed,

        (S::Ready, E::AddRoots) => S::AddingRoots,
        (S::AddingRoots, E::RootsSubmitted) => S::WaitingForRootTx,
        (S::AddingRoots, E::RootsAcknowledged) => S::Complete,
        (S::WaitingForRootTx, E::RootsMined) => S::WaitingForRootConfirm,
        (S::WaitingForRootConfirm, E::RootsConfirmed) => S::Complete,
        (s, E::Failed) if s.is_adding_roots() => S::RootAdditionFailed,

        (state, event) => return Err(InvalidTransition { state, event }),
    };
    Ok(next)
}

/// In-memory progress of one upload through the coordinator.
///
/// Never persisted; each upload owns its task.
#[derive(Debug, Clone)]
pub struct UploadTask {
    state: CoordinatorState,
    entered_at: Instant,
    history: Vec<CoordinatorState>,
}

impl Default for UploadTask {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadTask {
    /// A task about to resolve its target.
    pub fn new() -> Self {
        Self {
            state: CoordinatorState::Resolving,
            entered_at: Instant::now(),
            history: vec![CoordinatorState::Resolving],
        }
    }

    /// Current state.
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Every state visited so far, oldest first.
    pub fn history(&self) -> &[CoordinatorState] {
        &self.history
    }

    /// Apply `event`, returning the new state.
    pub fn apply(&mut self, event: CoordinatorEvent) -> Result<CoordinatorState, InvalidTransition> {
        let next = transition(self.state, event)?;
        debug!(
            from = %self.state,
            to = %next,
            %event,
            elapsed_ms = self.entered_at.elapsed().as_millis() as u64,
            "Upload task transition"
        );
        self.state = next;
        self.entered_at = Instant::now();
        self.history.push(next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CoordinatorEvent as E;
    use CoordinatorState as S;

    #[test]
    fn test_creation_path() {
        let mut task = UploadTask::new();
        for event in [
            E::CreationRequired,
            E::CreateSubmitted,
            E::CreateMined,
            E::CreateConfirmed,
            E::Live,
            E::AddRoots,
            E::RootsSubmitted,
            E::RootsMined,
            E::RootsConfirmed,
        ] {
            task.apply(event).unwrap();
        }
        assert_eq!(task.state(), S::Complete);
        assert_eq!(task.history().len(), 10);
        assert!(task.state().is_terminal());
    }

    #[test]
    fn test_existing_and_legacy_path() {
        let mut task = UploadTask::new();
        task.apply(E::ExistingSelected).unwrap();
        task.apply(E::Accepted).unwrap();
        task.apply(E::AddRoots).unwrap();
        assert_eq!(task.apply(E::RootsAcknowledged).unwrap(), S::Complete);
    }

    #[test]
    fn test_failures_are_phase_specific() {
        for state in [S::CreatingNew, S::WaitingForCreateTx, S::WaitingForCreateConfirm, S::WaitingForLive] {
            assert_eq!(transition(state, E::Failed).unwrap(), S::CreationFailed);
        }
        for state in [S::AddingRoots, S::WaitingForRootTx, S::WaitingForRootConfirm] {
            assert_eq!(transition(state, E::Failed).unwrap(), S::RootAdditionFailed);
        }
        assert!(transition(S::Ready, E::Failed).is_err());
    }

    #[test]
    fn test_terminal_states_reject_events() {
        for state in [S::Complete, S::CreationFailed, S::RootAdditionFailed] {
            for event in [E::AddRoots, E::Live, E::Failed, E::CreationRequired] {
                assert_eq!(
                    transition(state, event),
                    Err(InvalidTransition { state, event })
                );
            }
        }
    }

    #[test]
    fn test_out_of_order_event() {
        let mut task = UploadTask::new();
        let err = task.apply(E::Live).unwrap_err();
        assert_eq!(err.state, S::Resolving);
        assert_eq!(task.state(), S::Resolving);
        assert_eq!(err.to_string(), "invalid transition: live in state resolving");
    }
}
