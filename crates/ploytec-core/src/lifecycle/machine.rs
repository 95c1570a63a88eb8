//! Lifecycle state machine for the driver extension.
//!
//! Activation and deactivation run through an asynchronous, multi-step
//! approval workflow owned by the system's extension manager. The state
//! machine is the single authority for what the current lifecycle state is;
//! the session controller feeds it events and never writes the state
//! directly (the one exception being the externally-observed enabled state
//! reported at startup).

use std::fmt;

/// Lifecycle state of the driver extension. Exactly one is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DextState {
    /// Extension is not installed/active.
    Deactivated,
    /// Activation request submitted, waiting for the manager.
    Activating,
    /// Activation is pending the user's approval prompt.
    NeedsActivatingApproval,
    /// Extension is installed and running.
    Activated,
    /// Activation failed.
    ActivationError,
    /// Deactivation request submitted, waiting for the manager.
    Deactivating,
    /// Deactivation is pending the user's approval prompt.
    NeedsDeactivatingApproval,
    /// Deactivation failed.
    DeactivationError,
    /// The extension bundle could not be found.
    DextNotPresentError,
    /// The extension's code signature was rejected.
    CodeSigningError,
}

impl Default for DextState {
    fn default() -> Self {
        Self::Deactivated
    }
}

/// Event fed into the state machine. Produced by the session controller in
/// response to user actions or extension-manager callbacks, consumed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DextEvent {
    ActivationStarted,
    DeactivationStarted,
    PromptForApproval,
    ActivationFinished,
    DeactivationFinished,
    ActivationFailed,
    DeactivationFailed,
    DextNotPresent,
    CodeSigningErr,
}

impl fmt::Display for DextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DextState::Deactivated => write!(f, "DEACTIVATED"),
            DextState::Activating => write!(f, "ACTIVATING"),
            DextState::NeedsActivatingApproval => write!(f, "NEEDS_ACTIVATING_APPROVAL"),
            DextState::Activated => write!(f, "ACTIVATED"),
            DextState::ActivationError => write!(f, "ACTIVATION_ERROR"),
            DextState::Deactivating => write!(f, "DEACTIVATING"),
            DextState::NeedsDeactivatingApproval => write!(f, "NEEDS_DEACTIVATING_APPROVAL"),
            DextState::DeactivationError => write!(f, "DEACTIVATION_ERROR"),
            DextState::DextNotPresentError => write!(f, "DEXT_NOT_PRESENT_ERROR"),
            DextState::CodeSigningError => write!(f, "CODE_SIGNING_ERROR"),
        }
    }
}

impl fmt::Display for DextEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DextEvent::ActivationStarted => write!(f, "activation_started"),
            DextEvent::DeactivationStarted => write!(f, "deactivation_started"),
            DextEvent::PromptForApproval => write!(f, "prompt_for_approval"),
            DextEvent::ActivationFinished => write!(f, "activation_finished"),
            DextEvent::DeactivationFinished => write!(f, "deactivation_finished"),
            DextEvent::ActivationFailed => write!(f, "activation_failed"),
            DextEvent::DeactivationFailed => write!(f, "deactivation_failed"),
            DextEvent::DextNotPresent => write!(f, "dext_not_present"),
            DextEvent::CodeSigningErr => write!(f, "code_signing_err"),
        }
    }
}

impl DextState {
    /// Check if this is one of the error states.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            DextState::ActivationError
                | DextState::DeactivationError
                | DextState::DextNotPresentError
                | DextState::CodeSigningError
        )
    }

    /// Check if a request is in flight (including approval sub-states).
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            DextState::Activating
                | DextState::NeedsActivatingApproval
                | DextState::Deactivating
                | DextState::NeedsDeactivatingApproval
        )
    }

    /// Human-readable status line for front-ends. Carries no logic.
    pub fn status_message(&self) -> &'static str {
        match self {
            DextState::Activating => "Activating PloytecDriver, please wait.",
            DextState::NeedsActivatingApproval => {
                "Please follow the prompt to approve PloytecDriver."
            }
            DextState::NeedsDeactivatingApproval => {
                "Please follow the prompt to remove PloytecDriver."
            }
            DextState::Activated => "PloytecDriver has been activated and is ready to use.",
            DextState::ActivationError => {
                "PloytecDriver has experienced an error during activation.\nPlease check the logs to find the error."
            }
            DextState::DeactivationError => {
                "PloytecDriver has experienced an error during deactivation.\nPlease check the logs to find the error."
            }
            DextState::Deactivating => "Deactivating PloytecDriver, please wait.",
            DextState::Deactivated => "PloytecDriver deactivated.",
            DextState::DextNotPresentError => "Error: dext is not present.",
            DextState::CodeSigningError => {
                "Error: code signing.\nMake sure SIP is disabled (csrutil disable in recovery)\nand amfi_get_out_of_my_way=0x1 is added to the bootflags."
            }
        }
    }
}

/// Compute the successor state for an event. Pure and total: every
/// (state, event) pair maps to a defined state.
///
/// `*Started` events always move to the matching in-flight state. A finish,
/// failure or approval event that arrives while the opposite flow is in
/// flight lands in that flow's error state. The two absorbing-ish error
/// states (`DextNotPresentError`, `CodeSigningError`) still accept a fresh
/// `*Started` event so the user can retry.
pub fn transition(state: DextState, event: DextEvent) -> DextState {
    use DextEvent as E;
    use DextState as S;

    match state {
        S::Deactivated => match event {
            E::ActivationStarted => S::Activating,
            E::DeactivationStarted => S::Deactivating,
            E::DeactivationFinished => S::Deactivated,
            E::PromptForApproval
            | E::ActivationFinished
            | E::ActivationFailed
            | E::DeactivationFailed => S::DeactivationError,
            E::DextNotPresent => S::DextNotPresentError,
            E::CodeSigningErr => S::CodeSigningError,
        },
        S::Activating | S::NeedsActivatingApproval => match event {
            E::ActivationStarted => S::Activating,
            E::PromptForApproval => S::NeedsActivatingApproval,
            E::ActivationFinished => S::Activated,
            E::ActivationFailed
            | E::DeactivationStarted
            | E::DeactivationFinished
            | E::DeactivationFailed => S::ActivationError,
            E::DextNotPresent => S::DextNotPresentError,
            E::CodeSigningErr => S::CodeSigningError,
        },
        S::Activated => match event {
            E::ActivationStarted => S::Activating,
            E::ActivationFinished => S::Activated,
            E::DeactivationStarted => S::Deactivating,
            E::PromptForApproval
            | E::ActivationFailed
            | E::DeactivationFinished
            | E::DeactivationFailed => S::ActivationError,
            E::DextNotPresent => S::DextNotPresentError,
            E::CodeSigningErr => S::CodeSigningError,
        },
        S::ActivationError => match event {
            E::ActivationStarted => S::Activating,
            E::PromptForApproval
            | E::ActivationFinished
            | E::ActivationFailed
            | E::DeactivationStarted
            | E::DeactivationFinished
            | E::DeactivationFailed => S::ActivationError,
            E::DextNotPresent => S::DextNotPresentError,
            E::CodeSigningErr => S::CodeSigningError,
        },
        S::Deactivating | S::NeedsDeactivatingApproval => match event {
            E::DeactivationStarted => S::Deactivating,
            E::PromptForApproval => S::NeedsDeactivatingApproval,
            E::DeactivationFinished => S::Deactivated,
            E::DeactivationFailed
            | E::ActivationStarted
            | E::ActivationFinished
            | E::ActivationFailed => S::DeactivationError,
            E::DextNotPresent => S::DextNotPresentError,
            E::CodeSigningErr => S::CodeSigningError,
        },
        S::DeactivationError | S::DextNotPresentError | S::CodeSigningError => match event {
            E::ActivationStarted => S::Activating,
            E::DeactivationStarted => S::Deactivating,
            E::PromptForApproval
            | E::ActivationFinished
            | E::ActivationFailed
            | E::DeactivationFinished
            | E::DeactivationFailed => S::DeactivationError,
            E::DextNotPresent => S::DextNotPresentError,
            E::CodeSigningErr => S::CodeSigningError,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DextEvent as E;
    use DextState as S;

    const ALL_STATES: [DextState; 10] = [
        S::Deactivated,
        S::Activating,
        S::NeedsActivatingApproval,
        S::Activated,
        S::ActivationError,
        S::Deactivating,
        S::NeedsDeactivatingApproval,
        S::DeactivationError,
        S::DextNotPresentError,
        S::CodeSigningError,
    ];

    // Event order used by the expectation rows below.
    const ALL_EVENTS: [DextEvent; 9] = [
        E::ActivationStarted,
        E::DeactivationStarted,
        E::PromptForApproval,
        E::ActivationFinished,
        E::DeactivationFinished,
        E::ActivationFailed,
        E::DeactivationFailed,
        E::DextNotPresent,
        E::CodeSigningErr,
    ];

    /// Expected successor for every state, one row per state in
    /// `ALL_STATES` order, one column per event in `ALL_EVENTS` order.
    const EXPECTED: [[DextState; 9]; 10] = [
        // Deactivated
        [
            S::Activating,
            S::Deactivating,
            S::DeactivationError,
            S::DeactivationError,
            S::Deactivated,
            S::DeactivationError,
            S::DeactivationError,
            S::DextNotPresentError,
            S::CodeSigningError,
        ],
        // Activating
        [
            S::Activating,
            S::ActivationError,
            S::NeedsActivatingApproval,
            S::Activated,
            S::ActivationError,
            S::ActivationError,
            S::ActivationError,
            S::DextNotPresentError,
            S::CodeSigningError,
        ],
        // NeedsActivatingApproval
        [
            S::Activating,
            S::ActivationError,
            S::NeedsActivatingApproval,
            S::Activated,
            S::ActivationError,
            S::ActivationError,
            S::ActivationError,
            S::DextNotPresentError,
            S::CodeSigningError,
        ],
        // Activated
        [
            S::Activating,
            S::Deactivating,
            S::ActivationError,
            S::Activated,
            S::ActivationError,
            S::ActivationError,
            S::ActivationError,
            S::DextNotPresentError,
            S::CodeSigningError,
        ],
        // ActivationError
        [
            S::Activating,
            S::ActivationError,
            S::ActivationError,
            S::ActivationError,
            S::ActivationError,
            S::ActivationError,
            S::ActivationError,
            S::DextNotPresentError,
            S::CodeSigningError,
        ],
        // Deactivating
        [
            S::DeactivationError,
            S::Deactivating,
            S::NeedsDeactivatingApproval,
            S::DeactivationError,
            S::Deactivated,
            S::DeactivationError,
            S::DeactivationError,
            S::DextNotPresentError,
            S::CodeSigningError,
        ],
        // NeedsDeactivatingApproval
        [
            S::DeactivationError,
            S::Deactivating,
            S::NeedsDeactivatingApproval,
            S::DeactivationError,
            S::Deactivated,
            S::DeactivationError,
            S::DeactivationError,
            S::DextNotPresentError,
            S::CodeSigningError,
        ],
        // DeactivationError
        [
            S::Activating,
            S::Deactivating,
            S::DeactivationError,
            S::DeactivationError,
            S::DeactivationError,
            S::DeactivationError,
            S::DeactivationError,
            S::DextNotPresentError,
            S::CodeSigningError,
        ],
        // DextNotPresentError
        [
            S::Activating,
            S::Deactivating,
            S::DeactivationError,
            S::DeactivationError,
            S::DeactivationError,
            S::DeactivationError,
            S::DeactivationError,
            S::DextNotPresentError,
            S::CodeSigningError,
        ],
        // CodeSigningError
        [
            S::Activating,
            S::Deactivating,
            S::DeactivationError,
            S::DeactivationError,
            S::DeactivationError,
            S::DeactivationError,
            S::DeactivationError,
            S::DextNotPresentError,
            S::CodeSigningError,
        ],
    ];

    #[test]
    fn test_transition_matches_table() {
        for (row, &state) in ALL_STATES.iter().enumerate() {
            for (col, &event) in ALL_EVENTS.iter().enumerate() {
                let got = transition(state, event);
                let want = EXPECTED[row][col];
                assert_eq!(
                    got, want,
                    "transition({state}, {event}) = {got}, expected {want}"
                );
            }
        }
    }

    #[test]
    fn test_finish_is_idempotent_when_activated() {
        assert_eq!(
            transition(S::Activated, E::ActivationFinished),
            S::Activated
        );
        assert_eq!(
            transition(S::Deactivated, E::DeactivationFinished),
            S::Deactivated
        );
    }

    #[test]
    fn test_terminal_states_never_skip_in_flight_phase() {
        // Activated/Deactivated are only reachable from their own in-flight
        // family, never directly from an error state.
        for &state in &[
            S::ActivationError,
            S::DeactivationError,
            S::DextNotPresentError,
            S::CodeSigningError,
        ] {
            for &event in &ALL_EVENTS {
                let next = transition(state, event);
                assert_ne!(next, S::Activated, "{state} + {event} skipped Activating");
                assert_ne!(
                    next,
                    S::Deactivated,
                    "{state} + {event} skipped Deactivating"
                );
            }
        }
    }

    #[test]
    fn test_error_states_allow_retry() {
        for &state in &[
            S::ActivationError,
            S::DeactivationError,
            S::DextNotPresentError,
            S::CodeSigningError,
        ] {
            assert_eq!(transition(state, E::ActivationStarted), S::Activating);
        }
        for &state in &[
            S::DeactivationError,
            S::DextNotPresentError,
            S::CodeSigningError,
        ] {
            assert_eq!(transition(state, E::DeactivationStarted), S::Deactivating);
        }
    }

    #[test]
    fn test_status_messages_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for state in ALL_STATES {
            assert!(seen.insert(state.status_message()), "duplicate message for {state}");
        }
    }
}
