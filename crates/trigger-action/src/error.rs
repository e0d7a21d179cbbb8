//! Error types for the workflow engine.

use crate::workflow::{WorkflowEvent, WorkflowState};
use trigger_core::error::TriggerError;
use trigger_core::types::ActionId;

/// Errors from the workflow state machine.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Action {0} is not in the catalog")]
    UnknownAction(ActionId),
    #[error("Invalid workflow transition: {event} while {state}")]
    InvalidTransition {
        state: WorkflowState,
        event: WorkflowEvent,
    },
}

/// Errors from the form state store.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("Action {action} has no field named {name}")]
    UnknownField { action: ActionId, name: String },
    #[error("Form for action {0} is not open")]
    NotOpen(ActionId),
}

/// Transport-level submission failures.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid fulfillment URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Submission timed out after {0} ms")]
    Timeout(u64),
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Malformed fulfillment response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportError::MalformedResponse(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Errors raised while preparing a submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Interaction context unavailable: {0}")]
    Context(#[from] TriggerError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// Errors surfaced by the widget facade.
#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    #[error("Widget is hidden for the current interaction")]
    Hidden,
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
}
