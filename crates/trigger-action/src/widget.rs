//! The trigger widget: one owner for catalog, context, UI state and form values.
//!
//! Every transition is a synchronous `&mut self` call. The only work that
//! outlives a call is the submission round trip, which runs on its own task.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use trigger_core::config::{SubmissionConfig, TriggerConfig};
use trigger_core::events::WidgetEvent;
use trigger_core::types::{ActionId, Catalog, InteractionContext, SubmissionId, Theme, Timestamp};

use crate::client::{FulfillmentClient, HttpFulfillmentClient};
use crate::error::{FormError, SubmitError, TransportError, WidgetError, WorkflowError};
use crate::form::FormStore;
use crate::render::{FieldRenderer, FieldSpec};
use crate::submission::{self, Notifier, Submission, SubmissionHandle};
use crate::visibility;
use crate::workflow::{Transition, WorkflowEvent, WorkflowMachine, WorkflowState};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// One row of the action menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MenuEntry {
    pub id: ActionId,
    pub name: String,
}

/// The open confirmation modal with its fields bound to current values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModalView {
    pub id: ActionId,
    pub title: String,
    pub fields: Vec<FieldSpec>,
}

pub struct TriggerWidget {
    catalog: Catalog,
    context: InteractionContext,
    visible: bool,
    theme: Theme,
    machine: WorkflowMachine,
    form: FormStore,
    renderer: FieldRenderer,
    client: Arc<dyn FulfillmentClient>,
    submission: SubmissionConfig,
    events: broadcast::Sender<WidgetEvent>,
}

impl TriggerWidget {
    pub fn new(catalog: Catalog, config: &TriggerConfig, client: Arc<dyn FulfillmentClient>) -> Self {
        Self::new_at(catalog, config, client, Utc::now())
    }

    /// Construct with an explicit construction instant, which fixes the
    /// datetime bound for the widget's lifetime.
    pub fn new_at(
        catalog: Catalog,
        config: &TriggerConfig,
        client: Arc<dyn FulfillmentClient>,
        constructed_at: DateTime<Utc>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        tracing::debug!(actions = catalog.len(), "Trigger widget created");

        Self {
            catalog,
            context: InteractionContext::default(),
            visible: false,
            theme: Theme::from(config.widget.darkmode),
            machine: WorkflowMachine::new(),
            form: FormStore::new(),
            renderer: FieldRenderer::new(constructed_at, config.widget.datetime_horizon_days),
            client,
            submission: config.submission.clone(),
            events,
        }
    }

    /// Construct with the HTTP client described by `config.submission`.
    pub fn with_http_client(catalog: Catalog, config: &TriggerConfig) -> Result<Self, TransportError> {
        let client = HttpFulfillmentClient::new(&config.submission)?;
        Ok(Self::new(catalog, config, Arc::new(client)))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn context(&self) -> &InteractionContext {
        &self.context
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Apply the host's darkmode attribute.
    pub fn set_darkmode(&mut self, attr: &str) {
        self.theme = Theme::from_darkmode(attr);
    }

    pub fn state(&self) -> WorkflowState {
        self.machine.state()
    }

    pub fn renderer(&self) -> &FieldRenderer {
        &self.renderer
    }

    /// Receive widget events, including submission outcomes.
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.events.subscribe()
    }

    /// Replace the interaction context and re-evaluate visibility.
    ///
    /// Hiding the widget closes it and discards any open form.
    pub fn set_context(&mut self, context: InteractionContext) {
        let visible = visibility::should_show(context.selected.as_ref());
        self.context = context;

        if self.visible && !visible && self.machine.state().main_open() {
            if let Some(open) = self.machine.reset() {
                self.form.clear(open);
            }
            self.emit_state();
        }
        if visible != self.visible {
            tracing::info!(visible, "Trigger visibility changed");
        }
        self.visible = visible;

        self.emit(WidgetEvent::ContextChanged {
            visible,
            timestamp: Timestamp::now(),
        });
    }

    /// Menu rows in catalog order, empty unless the menu is open.
    pub fn menu(&self) -> Result<Vec<MenuEntry>, WidgetError> {
        self.ensure_visible()?;
        if !self.machine.state().menu_open() {
            return Ok(Vec::new());
        }
        Ok(self
            .catalog
            .iter()
            .map(|(id, action)| MenuEntry {
                id,
                name: action.name.clone(),
            })
            .collect())
    }

    /// The open modal, if any.
    pub fn modal(&self) -> Result<Option<ModalView>, WidgetError> {
        self.ensure_visible()?;
        let Some(id) = self.machine.state().selected() else {
            return Ok(None);
        };
        let action = self.catalog.get(id).ok_or(WorkflowError::UnknownAction(id))?;

        let fields = self
            .renderer
            .render_action(action, id)
            .into_iter()
            .map(|mut field| {
                field.value = field.effective_value(self.form.read(id, &field.name));
                field
            })
            .collect();

        Ok(Some(ModalView {
            id,
            title: format!("Trigger {}?", action.name),
            fields,
        }))
    }

    pub fn toggle(&mut self) -> Result<WorkflowState, WidgetError> {
        self.step(WorkflowEvent::Toggle)
    }

    pub fn select(&mut self, id: ActionId) -> Result<WorkflowState, WidgetError> {
        self.step(WorkflowEvent::Select(id))
    }

    pub fn cancel(&mut self) -> Result<WorkflowState, WidgetError> {
        self.step(WorkflowEvent::Cancel)
    }

    /// Record a value for a rendered field of the open action.
    pub fn write(&mut self, id: ActionId, name: &str, value: impl Into<String>) -> Result<(), WidgetError> {
        self.ensure_visible()?;
        let action = self.catalog.get(id).ok_or(WorkflowError::UnknownAction(id))?;
        if self.machine.state().selected() != Some(id) {
            return Err(FormError::NotOpen(id).into());
        }

        let renders = action
            .parameter(name)
            .and_then(|p| self.renderer.render(p, id))
            .is_some();
        if !renders {
            return Err(FormError::UnknownField {
                action: id,
                name: name.to_string(),
            }
            .into());
        }

        self.form.write(id, name, value);
        Ok(())
    }

    /// Raw stored value; empty when nothing was entered.
    pub fn read(&self, id: ActionId, name: &str) -> Result<&str, WidgetError> {
        self.ensure_visible()?;
        Ok(self.form.read(id, name))
    }

    /// Submit the open action.
    ///
    /// The widget is closed and the form cleared before this returns. The
    /// round trip continues on a spawned task, so a tokio runtime is required.
    pub fn submit(&mut self, id: ActionId) -> Result<SubmissionHandle, WidgetError> {
        self.ensure_visible()?;
        let step = self.machine.apply(WorkflowEvent::Submit(id), &self.catalog)?;

        let action = self.catalog.get(id).ok_or(WorkflowError::UnknownAction(id))?;
        let url = action.url.clone();
        let values = submission::collect(action, id, &self.renderer, &self.form);
        self.settle(step);

        let task = match self.context.selected_task() {
            Ok(task) => task,
            Err(e) => {
                tracing::error!(action = %id, error = %e, "Selected interaction missing from task map");
                return Err(SubmitError::from(e).into());
            }
        };

        let submission = Submission {
            id: SubmissionId::new(),
            action: id,
            url,
            payload: submission::merge_context(values, task),
        };
        tracing::info!(
            submission_id = %submission.id,
            action = %id,
            url = %submission.url,
            fields = submission.payload.len(),
            "Dispatching submission"
        );

        Ok(submission.spawn(
            Arc::clone(&self.client),
            self.submission.timeout(),
            Notifier {
                events: self.events.clone(),
                surface_transport_errors: self.submission.surface_transport_errors,
            },
        ))
    }

    fn ensure_visible(&self) -> Result<(), WidgetError> {
        if self.visible {
            Ok(())
        } else {
            Err(WidgetError::Hidden)
        }
    }

    fn step(&mut self, event: WorkflowEvent) -> Result<WorkflowState, WidgetError> {
        self.ensure_visible()?;
        let step = self.machine.apply(event, &self.catalog)?;
        self.settle(step);
        Ok(step.to)
    }

    fn settle(&mut self, step: Transition) {
        if let Some(discard) = step.discard {
            self.form.clear(discard);
        }
        self.emit_state();
    }

    fn emit_state(&self) {
        let state = self.machine.state();
        self.emit(WidgetEvent::WorkflowChanged {
            state: state.name().to_string(),
            selected: state.selected(),
            timestamp: Timestamp::now(),
        });
    }

    fn emit(&self, event: WidgetEvent) {
        // Without subscribers there is nobody to tell.
        let _ = self.events.send(event);
    }
}
