//! Shared helpers for the runtime integration suites.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use fform_runtime::FormStore;
use futures::executor::LocalPool;
use tracing::Subscriber;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};

pub use fform_core::{NamePath, Value, path};

/// Build a store value from JSON.
pub fn store(json: serde_json::Value) -> Value {
    serde_json::from_value(json).expect("json is a valid store value")
}

pub fn form(pool: &LocalPool) -> FormStore {
    FormStore::new(pool.spawner())
}

// ── Tracing capture ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedEvent {
    pub message: String,
    pub kind: Option<String>,
}

#[derive(Default)]
struct CaptureState {
    events: Vec<CapturedEvent>,
}

struct EventCapture {
    state: Arc<Mutex<CaptureState>>,
}

impl<S> Layer<S> for EventCapture
where
    S: Subscriber + for<'lookup> tracing_subscriber::registry::LookupSpan<'lookup>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        struct Fields {
            message: Option<String>,
            kind: Option<String>,
        }
        impl tracing::field::Visit for Fields {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                match field.name() {
                    "message" => self.message = Some(value.to_string()),
                    "kind" => self.kind = Some(value.to_string()),
                    _ => {}
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                let rendered = format!("{value:?}").trim_matches('"').to_string();
                match field.name() {
                    "message" => self.message = Some(rendered),
                    "kind" => self.kind = Some(rendered),
                    _ => {}
                }
            }
        }

        let mut fields = Fields {
            message: None,
            kind: None,
        };
        event.record(&mut fields);
        if let Some(message) = fields.message {
            self.state
                .lock()
                .expect("capture lock")
                .events
                .push(CapturedEvent {
                    message,
                    kind: fields.kind,
                });
        }
    }
}

/// Events captured while the guard returned by [`capture`] is alive.
#[derive(Clone)]
pub struct Captured {
    state: Arc<Mutex<CaptureState>>,
}

impl Captured {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.state.lock().expect("capture lock").events.clone()
    }

    /// Kinds of every `form.warning` event, in order.
    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|event| event.message == "form.warning")
            .filter_map(|event| event.kind)
            .collect()
    }

    pub fn saw(&self, message: &str) -> bool {
        self.events().iter().any(|event| event.message == message)
    }
}

/// Capture every event on this thread until the guard drops.
pub fn capture() -> (Captured, DefaultGuard) {
    let state = Arc::new(Mutex::new(CaptureState::default()));
    let subscriber = tracing_subscriber::registry().with(EventCapture {
        state: Arc::clone(&state),
    });
    let guard = tracing::subscriber::set_default(subscriber);
    (Captured { state }, guard)
}
