//! Maps parameter descriptors to input-field specifications.
//!
//! The renderer only describes fields. Markup is the host's concern, and the
//! bound values live in the [`FormStore`](crate::form::FormStore).

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Serialize;
use trigger_core::types::{Action, ActionId, Parameter, ParameterKind};

/// Default reach of datetime fields past widget construction.
pub const DEFAULT_DATETIME_HORIZON_DAYS: u32 = 30;

/// What kind of input the host should draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    /// Options in catalog order; the first one is the implicit default.
    Choice { options: Vec<String> },
    DateTime { max: DateTime<Utc> },
}

impl FieldKind {
    /// Upper bound formatted for a datetime input's `max` attribute.
    pub fn max_attribute(&self) -> Option<String> {
        match self {
            FieldKind::DateTime { max } => Some(max.to_rfc3339_opts(SecondsFormat::Millis, true)),
            _ => None,
        }
    }
}

/// A labeled input, addressable by `(action, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    pub action: ActionId,
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    /// Current bound value.
    pub value: String,
}

impl FieldSpec {
    /// The value submitted for this field given what the store holds.
    ///
    /// An untouched choice submits its first option, as a native select would.
    pub fn effective_value(&self, stored: &str) -> String {
        match &self.kind {
            FieldKind::Choice { options } if stored.is_empty() => {
                options.first().cloned().unwrap_or_default()
            }
            _ => stored.to_string(),
        }
    }
}

/// Renders parameters with a datetime bound fixed at construction.
#[derive(Debug, Clone)]
pub struct FieldRenderer {
    constructed_at: DateTime<Utc>,
    datetime_max: DateTime<Utc>,
}

impl FieldRenderer {
    pub fn new(constructed_at: DateTime<Utc>, horizon_days: u32) -> Self {
        Self {
            constructed_at,
            datetime_max: constructed_at + Duration::days(i64::from(horizon_days)),
        }
    }

    pub fn constructed_at(&self) -> DateTime<Utc> {
        self.constructed_at
    }

    /// Latest instant a datetime field accepts.
    pub fn datetime_max(&self) -> DateTime<Utc> {
        self.datetime_max
    }

    /// Field for one parameter, or `None` for a type this build does not know.
    pub fn render(&self, parameter: &Parameter, action: ActionId) -> Option<FieldSpec> {
        let kind = match &parameter.kind {
            ParameterKind::Input => FieldKind::Text,
            ParameterKind::Select { values } => FieldKind::Choice {
                options: values.clone(),
            },
            ParameterKind::DateTime => FieldKind::DateTime {
                max: self.datetime_max,
            },
            ParameterKind::Unrecognized { declared } => {
                tracing::debug!(
                    action = %action,
                    parameter = %parameter.name,
                    declared = %declared,
                    "Skipping parameter of unrecognized type"
                );
                return None;
            }
        };

        Some(FieldSpec {
            action,
            name: parameter.name.clone(),
            label: parameter.label.clone(),
            kind,
            value: String::new(),
        })
    }

    /// Fields for every renderable parameter of `action`, in order.
    pub fn render_action(&self, action: &Action, id: ActionId) -> Vec<FieldSpec> {
        action
            .parameters
            .iter()
            .filter_map(|p| self.render(p, id))
            .collect()
    }
}
