//! Action workflow engine for trigger widgets.
//!
//! Renders a menu of configured actions, walks the agent through a
//! per-action form, and submits the merged payload to a fulfillment
//! endpoint with a bounded timeout.

pub mod client;
pub mod error;
pub mod form;
pub mod render;
pub mod submission;
pub mod visibility;
pub mod widget;
pub mod workflow;

pub use client::{FulfillmentClient, HttpFulfillmentClient};
pub use error::{FormError, SubmitError, TransportError, WidgetError, WorkflowError};
pub use form::FormStore;
pub use render::{FieldKind, FieldRenderer, FieldSpec};
pub use submission::{Outcome, SubmissionHandle};
pub use widget::{MenuEntry, ModalView, TriggerWidget};
pub use workflow::{WorkflowEvent, WorkflowMachine, WorkflowState};
