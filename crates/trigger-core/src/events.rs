use serde::{Deserialize, Serialize};

use crate::types::{ActionId, SubmissionId, Timestamp};

/// Everything a trigger widget reports to its host.
///
/// Events are broadcast after the corresponding state change, so
/// subscribers observe the widget as it already is. Submission outcomes
/// arrive here independently of modal visibility.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum WidgetEvent {
    /// The interaction context was replaced.
    ContextChanged { visible: bool, timestamp: Timestamp },

    /// The workflow moved to a new UI state.
    WorkflowChanged {
        /// `closed`, `menu_open` or `modal_open`.
        state: String,
        selected: Option<ActionId>,
        timestamp: Timestamp,
    },

    /// A submission left the widget; the modal is already closed.
    SubmissionDispatched {
        submission_id: SubmissionId,
        action: ActionId,
        url: String,
        timestamp: Timestamp,
    },

    /// A submission resolved.
    SubmissionCompleted {
        submission_id: SubmissionId,
        action: ActionId,
        /// `success`, `known_failure`, `unrecognized` or `transport_failure`.
        outcome: String,
        /// Text to show the user, if the outcome is acknowledged.
        acknowledgment: Option<String>,
        timestamp: Timestamp,
    },
}

impl WidgetEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            WidgetEvent::ContextChanged { timestamp, .. }
            | WidgetEvent::WorkflowChanged { timestamp, .. }
            | WidgetEvent::SubmissionDispatched { timestamp, .. }
            | WidgetEvent::SubmissionCompleted { timestamp, .. } => *timestamp,
        }
    }

    /// Returns a human-readable event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            WidgetEvent::ContextChanged { .. } => "context_changed",
            WidgetEvent::WorkflowChanged { .. } => "workflow_changed",
            WidgetEvent::SubmissionDispatched { .. } => "submission_dispatched",
            WidgetEvent::SubmissionCompleted { .. } => "submission_completed",
        }
    }
}
