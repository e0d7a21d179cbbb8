//! Submission pipeline: collect, merge context, dispatch, classify.
//!
//! Building the payload is synchronous. Only the network round trip runs
//! on a spawned task, so the widget can close before the reply arrives.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Number;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use trigger_core::events::WidgetEvent;
use trigger_core::types::{Action, ActionId, FulfillmentResponse, Payload, SubmissionId, TaskRecord, Timestamp};

use crate::client::FulfillmentClient;
use crate::error::TransportError;
use crate::form::FormStore;
use crate::render::FieldRenderer;

/// Response codes the fulfillment side documents as failures.
pub const KNOWN_FAILURE_CODES: [i64; 3] = [-1, 1, 2];

/// Classified result of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Success { message: String },
    KnownFailure { code: i64, message: String },
    /// Any other `retval`, fractional numbers included.
    Unrecognized { code: Number, message: String },
    /// Timeout, network error or undecodable reply.
    TransportFailure { reason: String },
}

impl Outcome {
    pub fn classify(response: &FulfillmentResponse) -> Self {
        let message = response.retmsg.clone();
        match response.code() {
            Some(0) => Outcome::Success { message },
            Some(code) if KNOWN_FAILURE_CODES.contains(&code) => {
                Outcome::KnownFailure { code, message }
            }
            Some(code) => Outcome::Unrecognized {
                code: code.into(),
                message,
            },
            None => Outcome::Unrecognized {
                code: response.retval.clone(),
                message,
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Success { .. } => "success",
            Outcome::KnownFailure { .. } => "known_failure",
            Outcome::Unrecognized { .. } => "unrecognized",
            Outcome::TransportFailure { .. } => "transport_failure",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Text for the user-facing acknowledgment.
    ///
    /// Transport failures are acknowledged only when `surface_transport` is set.
    pub fn acknowledgment(&self, surface_transport: bool) -> Option<String> {
        match self {
            Outcome::Success { .. } => Some("Success".to_string()),
            Outcome::KnownFailure { code, message } => Some(format!("Error {}: {}", code, message)),
            Outcome::Unrecognized { code, message } => {
                Some(format!("Unhandled Error Code {}: {}", code, message))
            }
            Outcome::TransportFailure { reason } if surface_transport => {
                Some(format!("Submission did not complete: {}", reason))
            }
            Outcome::TransportFailure { .. } => None,
        }
    }
}

impl From<TransportError> for Outcome {
    fn from(err: TransportError) -> Self {
        Outcome::TransportFailure {
            reason: err.to_string(),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success { .. } => write!(f, "success"),
            Outcome::KnownFailure { code, message } => write!(f, "failure {}: {}", code, message),
            Outcome::Unrecognized { code, message } => {
                write!(f, "unrecognized code {}: {}", code, message)
            }
            Outcome::TransportFailure { reason } => write!(f, "transport failure: {}", reason),
        }
    }
}

/// Read every rendered field of `action` from the store into a payload.
pub fn collect(action: &Action, id: ActionId, renderer: &FieldRenderer, store: &FormStore) -> Payload {
    renderer
        .render_action(action, id)
        .into_iter()
        .map(|field| {
            let value = field.effective_value(store.read(id, &field.name));
            (field.name, serde_json::Value::String(value))
        })
        .collect()
}

/// Overlay a copy of the task record onto the form values. Task fields win.
pub fn merge_context(mut payload: Payload, task: &TaskRecord) -> Payload {
    for (key, value) in task.fields() {
        payload.insert(key.clone(), value.clone());
    }
    payload
}

/// Send `payload` to `url`, giving up after `timeout`, and classify the reply.
pub async fn dispatch(
    client: &dyn FulfillmentClient,
    url: &str,
    payload: &Payload,
    timeout: Duration,
) -> Outcome {
    let result = match tokio::time::timeout(timeout, client.post(url, payload)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(timeout.as_millis() as u64)),
    };

    match result {
        Ok(response) => {
            let outcome = Outcome::classify(&response);
            match &outcome {
                Outcome::Success { .. } => tracing::info!(url = %url, "Submission accepted"),
                other => tracing::warn!(url = %url, outcome = %other, "Submission rejected"),
            }
            outcome
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Submission did not complete");
            e.into()
        }
    }
}

/// A prepared submission, detached from the widget that built it.
#[derive(Debug, Clone)]
pub struct Submission {
    pub id: SubmissionId,
    pub action: ActionId,
    pub url: String,
    pub payload: Payload,
}

/// Where a finished submission reports itself.
#[derive(Clone)]
pub struct Notifier {
    pub events: broadcast::Sender<WidgetEvent>,
    pub surface_transport_errors: bool,
}

impl Submission {
    /// Start the round trip on the runtime and return a handle to its outcome.
    pub fn spawn(
        self,
        client: Arc<dyn FulfillmentClient>,
        timeout: Duration,
        notifier: Notifier,
    ) -> SubmissionHandle {
        let Submission {
            id,
            action,
            url,
            payload,
        } = self;

        // No receivers is fine; the handle still carries the outcome.
        let _ = notifier.events.send(WidgetEvent::SubmissionDispatched {
            submission_id: id,
            action,
            url: url.clone(),
            timestamp: Timestamp::now(),
        });

        let task = tokio::spawn(async move {
            let outcome = dispatch(client.as_ref(), &url, &payload, timeout).await;
            let _ = notifier.events.send(WidgetEvent::SubmissionCompleted {
                submission_id: id,
                action,
                outcome: outcome.kind().to_string(),
                acknowledgment: outcome.acknowledgment(notifier.surface_transport_errors),
                timestamp: Timestamp::now(),
            });
            outcome
        });

        SubmissionHandle { id, action, task }
    }
}

/// An in-flight submission.
#[derive(Debug)]
pub struct SubmissionHandle {
    id: SubmissionId,
    action: ActionId,
    task: JoinHandle<Outcome>,
}

impl SubmissionHandle {
    pub fn id(&self) -> SubmissionId {
        self.id
    }

    pub fn action(&self) -> ActionId {
        self.action
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the round trip to resolve.
    pub async fn outcome(self) -> Outcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => Outcome::TransportFailure {
                reason: format!("submission task aborted: {}", e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Mutex;
    use trigger_core::types::{Parameter, ParameterKind};

    /// Replies with a fixed response after an optional delay.
    struct StubClient {
        reply: Result<FulfillmentResponse, String>,
        delay: Duration,
        seen: Mutex<Vec<(String, Payload)>>,
    }

    impl StubClient {
        fn replying(retval: i64, retmsg: &str) -> Self {
            Self {
                reply: Ok(FulfillmentResponse::failure(retval, retmsg)),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl FulfillmentClient for StubClient {
        async fn post(&self, url: &str, payload: &Payload) -> Result<FulfillmentResponse, TransportError> {
            self.seen.lock().unwrap().push((url.to_string(), payload.clone()));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.reply.clone().map_err(TransportError::Request)
        }
    }

    fn action() -> Action {
        Action {
            name: "Callback".to_string(),
            url: "/cb".to_string(),
            parameters: vec![
                Parameter {
                    name: "foo".to_string(),
                    label: "Foo".to_string(),
                    kind: ParameterKind::Input,
                },
                Parameter {
                    name: "queue".to_string(),
                    label: "Queue".to_string(),
                    kind: ParameterKind::Select {
                        values: vec!["Sales".to_string(), "Support".to_string()],
                    },
                },
                Parameter {
                    name: "mystery".to_string(),
                    label: "?".to_string(),
                    kind: ParameterKind::Unrecognized {
                        declared: "unsupported".to_string(),
                    },
                },
            ],
        }
    }

    // ---- classification ----

    #[test]
    fn test_classify_success() {
        let outcome = Outcome::classify(&FulfillmentResponse::success("queued"));
        assert!(outcome.is_success());
        assert_eq!(outcome.acknowledgment(false).as_deref(), Some("Success"));
    }

    #[test]
    fn test_classify_known_failures() {
        for code in KNOWN_FAILURE_CODES {
            let outcome = Outcome::classify(&FulfillmentResponse::failure(code, "bad number"));
            assert_eq!(
                outcome,
                Outcome::KnownFailure {
                    code,
                    message: "bad number".to_string()
                }
            );
            assert_eq!(
                outcome.acknowledgment(false),
                Some(format!("Error {}: bad number", code))
            );
        }
    }

    #[test]
    fn test_classify_unrecognized_codes() {
        for code in [99, -2, 3, i64::MAX] {
            let outcome = Outcome::classify(&FulfillmentResponse::failure(code, "??"));
            assert_eq!(outcome.kind(), "unrecognized");
            assert_eq!(
                outcome.acknowledgment(false),
                Some(format!("Unhandled Error Code {}: ??", code))
            );
        }
    }

    #[test]
    fn test_classify_float_retval() {
        let classify = |json: &str| {
            Outcome::classify(&serde_json::from_str::<FulfillmentResponse>(json).unwrap())
        };

        assert_eq!(
            classify(r#"{"retval": 2.0, "retmsg": "queue closed"}"#),
            Outcome::KnownFailure {
                code: 2,
                message: "queue closed".to_string()
            }
        );
        assert!(classify(r#"{"retval": 0.0, "retmsg": "ok"}"#).is_success());

        let fractional = classify(r#"{"retval": 99.5, "retmsg": "odd"}"#);
        assert_eq!(fractional.kind(), "unrecognized");
        assert_eq!(
            fractional.acknowledgment(false).as_deref(),
            Some("Unhandled Error Code 99.5: odd")
        );
    }

    #[test]
    fn test_transport_failure_acknowledgment_is_opt_in() {
        let outcome: Outcome = TransportError::Timeout(6000).into();
        assert_eq!(outcome.kind(), "transport_failure");
        assert_eq!(outcome.acknowledgment(false), None);
        assert_eq!(
            outcome.acknowledgment(true).as_deref(),
            Some("Submission did not complete: Submission timed out after 6000 ms")
        );
    }

    // ---- payload ----

    #[test]
    fn test_collect_reads_rendered_fields() {
        let renderer = FieldRenderer::new(Utc::now(), 30);
        let mut store = FormStore::new();
        store.write(ActionId(0), "foo", "a");

        let payload = collect(&action(), ActionId(0), &renderer, &store);
        assert_eq!(
            serde_json::Value::Object(payload),
            json!({"foo": "a", "queue": "Sales"})
        );
    }

    #[test]
    fn test_collect_no_parameters_is_empty() {
        let renderer = FieldRenderer::new(Utc::now(), 30);
        let bare = Action {
            name: "Ping".to_string(),
            url: "/ping".to_string(),
            parameters: vec![],
        };
        assert!(collect(&bare, ActionId(1), &renderer, &FormStore::new()).is_empty());
    }

    #[test]
    fn test_context_wins_on_collision() {
        let mut form = Payload::new();
        form.insert("foo".to_string(), json!("a"));
        let task = TaskRecord::try_from(json!({"foo": "b", "bar": "c"})).unwrap();

        let merged = merge_context(form, &task);
        assert_eq!(serde_json::Value::Object(merged), json!({"foo": "b", "bar": "c"}));
    }

    #[test]
    fn test_merge_copies_nested_values() {
        let task = TaskRecord::try_from(json!({"caller": {"ani": "555"}})).unwrap();
        let mut merged = merge_context(Payload::new(), &task);
        merged["caller"]["ani"] = json!("changed");
        assert_eq!(task.fields()["caller"]["ani"], json!("555"));
    }

    // ---- dispatch ----

    #[tokio::test]
    async fn test_dispatch_classifies_reply() {
        let client = StubClient::replying(2, "queue closed");
        let outcome = dispatch(&client, "/cb", &Payload::new(), Duration::from_secs(6)).await;
        assert_eq!(
            outcome,
            Outcome::KnownFailure {
                code: 2,
                message: "queue closed".to_string()
            }
        );
        assert_eq!(client.seen.lock().unwrap()[0].0, "/cb");
    }

    #[tokio::test]
    async fn test_dispatch_network_error_is_transport_failure() {
        let client = StubClient {
            reply: Err("connection reset".to_string()),
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        };
        let outcome = dispatch(&client, "/cb", &Payload::new(), Duration::from_secs(6)).await;
        assert_eq!(
            outcome,
            Outcome::TransportFailure {
                reason: "Request failed: connection reset".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_times_out_after_budget() {
        let client = StubClient {
            delay: Duration::from_secs(30),
            ..StubClient::replying(0, "late")
        };
        let started = tokio::time::Instant::now();
        let outcome = dispatch(&client, "/cb", &Payload::new(), Duration::from_millis(6000)).await;

        assert_eq!(
            outcome,
            Outcome::TransportFailure {
                reason: "Submission timed out after 6000 ms".to_string()
            }
        );
        assert_eq!(started.elapsed(), Duration::from_millis(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_just_inside_budget_is_classified() {
        let client = StubClient {
            delay: Duration::from_millis(5999),
            ..StubClient::replying(0, "ok")
        };
        let outcome = dispatch(&client, "/cb", &Payload::new(), Duration::from_millis(6000)).await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_spawned_submission_reports_on_channel() {
        let (events, mut rx) = broadcast::channel(8);
        let submission = Submission {
            id: SubmissionId::new(),
            action: ActionId(0),
            url: "/cb".to_string(),
            payload: Payload::new(),
        };
        let handle = submission.spawn(
            Arc::new(StubClient::replying(99, "odd")),
            Duration::from_secs(6),
            Notifier {
                events,
                surface_transport_errors: false,
            },
        );
        let id = handle.id();
        let outcome = handle.outcome().await;
        assert_eq!(outcome.kind(), "unrecognized");

        let dispatched = rx.recv().await.unwrap();
        assert_eq!(dispatched.event_name(), "submission_dispatched");
        match rx.recv().await.unwrap() {
            WidgetEvent::SubmissionCompleted {
                submission_id,
                outcome,
                acknowledgment,
                ..
            } => {
                assert_eq!(submission_id, id);
                assert_eq!(outcome, "unrecognized");
                assert_eq!(acknowledgment.as_deref(), Some("Unhandled Error Code 99: odd"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
