//! Workflow state machine with validated transitions.
//!
//! Enforces the allowed transitions between the widget's UI states:
//! Closed -> MenuOpen -> ModalOpen(action) -> Closed
//! MenuOpen -> Closed

use std::fmt;

use trigger_core::types::{ActionId, Catalog};

use crate::error::WorkflowError;

/// UI state of one widget. At most one modal can be open, and a selection
/// only exists while the widget is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkflowState {
    #[default]
    Closed,
    MenuOpen,
    ModalOpen(ActionId),
}

impl WorkflowState {
    pub fn main_open(&self) -> bool {
        !matches!(self, WorkflowState::Closed)
    }

    pub fn menu_open(&self) -> bool {
        matches!(self, WorkflowState::MenuOpen)
    }

    pub fn selected(&self) -> Option<ActionId> {
        match self {
            WorkflowState::ModalOpen(id) => Some(*id),
            _ => None,
        }
    }

    /// State name without the selection, for logs and events.
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Closed => "closed",
            WorkflowState::MenuOpen => "menu_open",
            WorkflowState::ModalOpen(_) => "modal_open",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::ModalOpen(id) => write!(f, "modal_open({})", id),
            other => write!(f, "{}", other.name()),
        }
    }
}

/// User-triggered inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// The trigger affordance was clicked.
    Toggle,
    /// A menu entry was picked.
    Select(ActionId),
    Cancel,
    Submit(ActionId),
}

impl fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowEvent::Toggle => write!(f, "toggle"),
            WorkflowEvent::Select(id) => write!(f, "select({})", id),
            WorkflowEvent::Cancel => write!(f, "cancel"),
            WorkflowEvent::Submit(id) => write!(f, "submit({})", id),
        }
    }
}

/// Result of a valid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub to: WorkflowState,
    /// Action whose entered values must be discarded.
    pub discard: Option<ActionId>,
}

/// Compute the next state for `event`.
///
/// Valid transitions:
/// - Closed -> MenuOpen (toggle)
/// - MenuOpen -> Closed (toggle)
/// - MenuOpen -> ModalOpen(a) (select a)
/// - ModalOpen(a) -> Closed (toggle, cancel, submit a), discarding a
/// - ModalOpen(a) -> ModalOpen(b) (select b), discarding a
pub fn transition(from: WorkflowState, event: WorkflowEvent) -> Result<Transition, WorkflowError> {
    use WorkflowEvent as E;
    use WorkflowState as S;

    let (to, discard) = match (from, event) {
        (S::Closed, E::Toggle) => (S::MenuOpen, None),
        (S::MenuOpen, E::Toggle) => (S::Closed, None),
        (S::MenuOpen, E::Select(id)) => (S::ModalOpen(id), None),
        (S::ModalOpen(open), E::Toggle) | (S::ModalOpen(open), E::Cancel) => {
            (S::Closed, Some(open))
        }
        (S::ModalOpen(open), E::Select(id)) => (S::ModalOpen(id), Some(open)),
        (S::ModalOpen(open), E::Submit(id)) if open == id => (S::Closed, Some(open)),
        (state, event) => return Err(WorkflowError::InvalidTransition { state, event }),
    };

    Ok(Transition { to, discard })
}

/// Owns the current UI state and checks action ids against the catalog.
#[derive(Debug, Default)]
pub struct WorkflowMachine {
    state: WorkflowState,
}

impl WorkflowMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Apply `event`, failing loudly if it names an action the catalog lacks.
    pub fn apply(
        &mut self,
        event: WorkflowEvent,
        catalog: &Catalog,
    ) -> Result<Transition, WorkflowError> {
        if let WorkflowEvent::Select(id) | WorkflowEvent::Submit(id) = event {
            if catalog.get(id).is_none() {
                tracing::error!(action = %id, actions = catalog.len(), "Action id out of catalog range");
                return Err(WorkflowError::UnknownAction(id));
            }
        }

        let step = transition(self.state, event)?;
        tracing::debug!(from = %self.state, to = %step.to, event = %event, "Workflow transition");
        self.state = step.to;
        Ok(step)
    }

    /// Return to Closed regardless of the current state.
    pub fn reset(&mut self) -> Option<ActionId> {
        let open = self.state.selected();
        self.state = WorkflowState::Closed;
        open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trigger_core::types::Action;

    const A: ActionId = ActionId(0);
    const B: ActionId = ActionId(1);

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Action {
                name: "Callback".to_string(),
                url: "/cb".to_string(),
                parameters: vec![],
            },
            Action {
                name: "Survey".to_string(),
                url: "/survey".to_string(),
                parameters: vec![],
            },
        ])
    }

    // =====================================================================
    // Valid transitions
    // =====================================================================

    #[test]
    fn test_closed_toggle_opens_menu() {
        let t = transition(WorkflowState::Closed, WorkflowEvent::Toggle).unwrap();
        assert_eq!(t.to, WorkflowState::MenuOpen);
        assert_eq!(t.discard, None);
    }

    #[test]
    fn test_menu_toggle_closes() {
        let t = transition(WorkflowState::MenuOpen, WorkflowEvent::Toggle).unwrap();
        assert_eq!(t.to, WorkflowState::Closed);
        assert_eq!(t.discard, None);
    }

    #[test]
    fn test_menu_select_opens_modal() {
        let t = transition(WorkflowState::MenuOpen, WorkflowEvent::Select(A)).unwrap();
        assert_eq!(t.to, WorkflowState::ModalOpen(A));
        assert_eq!(t.discard, None);
    }

    #[test]
    fn test_modal_toggle_cancels() {
        let t = transition(WorkflowState::ModalOpen(A), WorkflowEvent::Toggle).unwrap();
        assert_eq!(t.to, WorkflowState::Closed);
        assert_eq!(t.discard, Some(A));
    }

    #[test]
    fn test_modal_cancel_closes_and_discards() {
        let t = transition(WorkflowState::ModalOpen(A), WorkflowEvent::Cancel).unwrap();
        assert_eq!(t.to, WorkflowState::Closed);
        assert_eq!(t.discard, Some(A));
    }

    #[test]
    fn test_modal_submit_closes_and_discards() {
        let t = transition(WorkflowState::ModalOpen(A), WorkflowEvent::Submit(A)).unwrap();
        assert_eq!(t.to, WorkflowState::Closed);
        assert_eq!(t.discard, Some(A));
    }

    #[test]
    fn test_modal_select_is_last_writer_wins() {
        let t = transition(WorkflowState::ModalOpen(A), WorkflowEvent::Select(B)).unwrap();
        assert_eq!(t.to, WorkflowState::ModalOpen(B));
        assert_eq!(t.discard, Some(A));
    }

    // =====================================================================
    // Invalid transitions
    // =====================================================================

    #[test]
    fn test_closed_rejects_everything_but_toggle() {
        for event in [
            WorkflowEvent::Select(A),
            WorkflowEvent::Cancel,
            WorkflowEvent::Submit(A),
        ] {
            assert!(transition(WorkflowState::Closed, event).is_err(), "{event}");
        }
    }

    #[test]
    fn test_menu_rejects_cancel_and_submit() {
        assert!(transition(WorkflowState::MenuOpen, WorkflowEvent::Cancel).is_err());
        assert!(transition(WorkflowState::MenuOpen, WorkflowEvent::Submit(A)).is_err());
    }

    #[test]
    fn test_submit_for_other_action_is_rejected() {
        let err = transition(WorkflowState::ModalOpen(A), WorkflowEvent::Submit(B)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid workflow transition: submit(1) while modal_open(0)"
        );
    }

    // =====================================================================
    // Machine
    // =====================================================================

    #[test]
    fn test_double_toggle_returns_to_closed() {
        let catalog = catalog();
        let mut machine = WorkflowMachine::new();
        let first = machine.apply(WorkflowEvent::Toggle, &catalog).unwrap();
        let second = machine.apply(WorkflowEvent::Toggle, &catalog).unwrap();
        assert_eq!(machine.state(), WorkflowState::Closed);
        assert_eq!(first.discard, None);
        assert_eq!(second.discard, None);
    }

    #[test]
    fn test_unknown_action_fails_fast() {
        let catalog = catalog();
        let mut machine = WorkflowMachine::new();
        machine.apply(WorkflowEvent::Toggle, &catalog).unwrap();

        let err = machine
            .apply(WorkflowEvent::Select(ActionId(9)), &catalog)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownAction(ActionId(9))));
        assert_eq!(machine.state(), WorkflowState::MenuOpen);
    }

    #[test]
    fn test_invalid_transition_leaves_state_untouched() {
        let catalog = catalog();
        let mut machine = WorkflowMachine::new();
        assert!(machine.apply(WorkflowEvent::Cancel, &catalog).is_err());
        assert_eq!(machine.state(), WorkflowState::Closed);
    }

    #[test]
    fn test_reset_reports_open_action() {
        let catalog = catalog();
        let mut machine = WorkflowMachine::new();
        machine.apply(WorkflowEvent::Toggle, &catalog).unwrap();
        machine.apply(WorkflowEvent::Select(B), &catalog).unwrap();
        assert_eq!(machine.reset(), Some(B));
        assert_eq!(machine.state(), WorkflowState::Closed);
        assert_eq!(machine.reset(), None);
    }

    #[test]
    fn test_derived_flags() {
        assert!(!WorkflowState::Closed.main_open());
        assert!(WorkflowState::MenuOpen.main_open());
        assert!(WorkflowState::MenuOpen.menu_open());
        assert!(WorkflowState::ModalOpen(A).main_open());
        assert!(!WorkflowState::ModalOpen(A).menu_open());
        assert_eq!(WorkflowState::ModalOpen(A).selected(), Some(A));
        assert_eq!(WorkflowState::MenuOpen.selected(), None);
    }

    #[test]
    fn test_all_valid_transitions_count() {
        let states = [
            WorkflowState::Closed,
            WorkflowState::MenuOpen,
            WorkflowState::ModalOpen(A),
        ];
        let events = [
            WorkflowEvent::Toggle,
            WorkflowEvent::Select(A),
            WorkflowEvent::Select(B),
            WorkflowEvent::Cancel,
            WorkflowEvent::Submit(A),
            WorkflowEvent::Submit(B),
        ];

        let mut valid = 0;
        for from in states {
            for event in events {
                if transition(from, event).is_ok() {
                    valid += 1;
                }
            }
        }
        // Closed: toggle. Menu: toggle, select a/b. Modal(a): toggle, select a/b, cancel, submit a.
        assert_eq!(valid, 9);
    }
}
