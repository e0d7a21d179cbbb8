use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::error::{Result, TriggerError};

/// Media type of the interactions the trigger is offered for.
pub const TELEPHONY_MEDIA_TYPE: &str = "telephony";

/// Submission body: parameter values overlaid with interaction context.
pub type Payload = Map<String, Value>;

// =============================================================================
// Action Catalog
// =============================================================================

/// Positional identity of an action within its catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub usize);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A configured trigger operation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Display label shown in the menu.
    pub name: String,
    /// Fulfillment endpoint, absolute or relative.
    pub url: String,
    /// Ordered parameter schema. Absent or `null` in JSON means none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub parameters: Vec<Parameter>,
}

impl Action {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A typed, named input required by an action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawParameter", into = "RawParameter")]
pub struct Parameter {
    pub name: String,
    pub label: String,
    pub kind: ParameterKind,
}

/// The closed set of parameter types a catalog may declare.
///
/// Any other declared `type` is kept as `Unrecognized` so newer catalogs
/// still load.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParameterKind {
    /// Free text.
    Input,
    /// Enumerated choice over `values`, in order.
    Select { values: Vec<String> },
    /// Date and time, bounded above.
    DateTime,
    Unrecognized { declared: String },
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterKind::Input => write!(f, "input"),
            ParameterKind::Select { .. } => write!(f, "select"),
            ParameterKind::DateTime => write!(f, "datetime"),
            ParameterKind::Unrecognized { declared } => write!(f, "{}", declared),
        }
    }
}

/// Wire shape of a parameter descriptor.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct RawParameter {
    name: String,
    #[serde(default)]
    label: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default, deserialize_with = "null_as_empty", skip_serializing_if = "Vec::is_empty")]
    values: Vec<String>,
}

impl From<RawParameter> for Parameter {
    fn from(raw: RawParameter) -> Self {
        let kind = match raw.kind.as_str() {
            "input" => ParameterKind::Input,
            "select" => ParameterKind::Select { values: raw.values },
            "datetime" => ParameterKind::DateTime,
            _ => ParameterKind::Unrecognized { declared: raw.kind },
        };
        Self {
            name: raw.name,
            label: raw.label,
            kind,
        }
    }
}

impl From<Parameter> for RawParameter {
    fn from(param: Parameter) -> Self {
        let kind = param.kind.to_string();
        let values = match param.kind {
            ParameterKind::Select { values } => values,
            _ => Vec::new(),
        };
        Self {
            name: param.name,
            label: param.label,
            kind,
            values,
        }
    }
}

/// Ordered, immutable list of actions supplied by the host.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog(Vec<Action>);

impl Catalog {
    pub fn new(actions: Vec<Action>) -> Self {
        Self(actions)
    }

    /// Parse a catalog from its JSON array form.
    ///
    /// Parameter names must be unique within each action.
    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: Self =
            serde_json::from_str(json).map_err(|e| TriggerError::Catalog(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        for (id, action) in self.iter() {
            let mut seen = HashSet::new();
            if let Some(dup) = action.parameters.iter().find(|p| !seen.insert(p.name.as_str())) {
                return Err(TriggerError::Catalog(format!(
                    "action {} ({}) declares parameter {:?} more than once",
                    id, action.name, dup.name
                )));
            }
        }
        Ok(())
    }

    /// Read a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), actions = catalog.len(), "Action catalog loaded");
        Ok(catalog)
    }

    pub fn get(&self, id: ActionId) -> Option<&Action> {
        self.0.get(id.0)
    }

    /// Actions paired with their identity, in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (ActionId, &Action)> {
        self.0.iter().enumerate().map(|(i, a)| (ActionId(i), a))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Interaction Context
// =============================================================================

/// An interaction record owned by the host desktop.
///
/// The shape is opaque apart from `mediaType` and `interactionId`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskRecord(Map<String, Value>);

impl TaskRecord {
    pub fn media_type(&self) -> Option<&str> {
        self.0.get("mediaType").and_then(Value::as_str)
    }

    pub fn interaction_id(&self) -> Option<&str> {
        self.0.get("interactionId").and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl TryFrom<Value> for TaskRecord {
    type Error = TriggerError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            other => Err(TriggerError::Context(format!(
                "task record must be a JSON object, got {}",
                other
            ))),
        }
    }
}

/// Live interaction state supplied by the host.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionContext {
    /// Interaction id to task record.
    #[serde(default)]
    pub tasks: HashMap<String, TaskRecord>,
    /// The currently focused task, if any.
    #[serde(default)]
    pub selected: Option<TaskRecord>,
}

impl InteractionContext {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TriggerError::Context(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// The task map entry referenced by the selected task's interaction id.
    pub fn selected_task(&self) -> Result<&TaskRecord> {
        let selected = self
            .selected
            .as_ref()
            .ok_or_else(|| TriggerError::Context("no task selected".to_string()))?;
        let key = selected
            .interaction_id()
            .ok_or_else(|| TriggerError::Context("selected task has no interactionId".to_string()))?;
        self.tasks
            .get(key)
            .ok_or_else(|| TriggerError::Context(format!("interaction {} not in task map", key)))
    }
}

// =============================================================================
// Fulfillment wire contract
// =============================================================================

/// Structured reply from a fulfillment endpoint.
///
/// `retval` is any JSON number. A missing or non-numeric `retval` does not
/// decode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentResponse {
    pub retval: Number,
    #[serde(default)]
    pub retmsg: String,
}

impl FulfillmentResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self::failure(0, message)
    }

    pub fn failure(retval: i64, message: impl Into<String>) -> Self {
        Self {
            retval: retval.into(),
            retmsg: message.into(),
        }
    }

    /// `retval` as an integer code. Whole floats such as `2.0` count;
    /// fractional or out-of-range numbers have no code.
    pub fn code(&self) -> Option<i64> {
        if let Some(code) = self.retval.as_i64() {
            return Some(code);
        }
        let value = self.retval.as_f64()?;
        let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
        (value.fract() == 0.0 && in_range).then_some(value as i64)
    }
}

// =============================================================================
// Presentation
// =============================================================================

/// Widget color scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Interpret the host's darkmode attribute. Only the literal `"true"` is dark.
    pub fn from_darkmode(attr: &str) -> Self {
        if attr == "true" {
            Theme::Dark
        } else {
            Theme::Light
        }
    }
}

impl From<bool> for Theme {
    fn from(darkmode: bool) -> Self {
        if darkmode {
            Theme::Dark
        } else {
            Theme::Light
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

// =============================================================================
// Identity / Temporal
// =============================================================================

/// Unique identifier for one submission attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(pub Uuid);

impl SubmissionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix timestamp in seconds.
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }
}
