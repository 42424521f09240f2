//! Common test utilities
//!
//! A recording form double that owns its [`StateStore`] the way a real form
//! does, and a tracing layer that captures emitted events for assertions.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex};

use formwork_state::{
    BindingsConfig, FieldHandle, FormHandle, OptionChange, StateStore, ValidationTrigger,
};
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::Registry;

// --- Form double ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCall {
    Observe(ValidationTrigger),
    Dispose(ValidationTrigger),
}

/// Records every command plus the change that triggered it. Also notes
/// whether the owning form's store could be borrowed at that moment.
pub struct RecordingField {
    pub name: String,
    pub form: Weak<TestForm>,
    pub calls: RefCell<Vec<FieldCall>>,
    pub changes: RefCell<Vec<OptionChange>>,
    pub store_borrowable: RefCell<Vec<bool>>,
}

impl RecordingField {
    pub fn new(name: &str, form: Weak<TestForm>) -> Self {
        Self {
            name: name.to_string(),
            form,
            calls: RefCell::new(Vec::new()),
            changes: RefCell::new(Vec::new()),
            store_borrowable: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<FieldCall> {
        self.calls.borrow().clone()
    }

    pub fn changes(&self) -> Vec<OptionChange> {
        self.changes.borrow().clone()
    }

    fn record(&self, call: FieldCall, change: &OptionChange) {
        self.calls.borrow_mut().push(call);
        self.changes.borrow_mut().push(change.clone());
        let borrowable = self
            .form
            .upgrade()
            .is_some_and(|form| form.state.try_borrow().is_ok());
        self.store_borrowable.borrow_mut().push(borrowable);
    }
}

impl FieldHandle for RecordingField {
    fn observe_validation(&self, trigger: ValidationTrigger, change: &OptionChange) {
        self.record(FieldCall::Observe(trigger), change);
    }

    fn dispose_validation(&self, trigger: ValidationTrigger, change: &OptionChange) {
        self.record(FieldCall::Dispose(trigger), change);
    }
}

pub struct TestForm {
    pub name: String,
    pub fields: Vec<RecordingField>,
    pub state: RefCell<StateStore>,
}

impl FormHandle for TestForm {
    fn name(&self) -> &str {
        &self.name
    }

    fn each(&self, visit: &mut dyn FnMut(&dyn FieldHandle)) {
        for field in &self.fields {
            visit(field);
        }
    }
}

/// Declaration, options and bindings for a [`TestForm`].
#[derive(Default)]
pub struct FormSetup {
    pub initial: Value,
    pub options: Map<String, Value>,
    pub bindings: BindingsConfig,
}

impl FormSetup {
    pub fn declaration(initial: Value) -> Self {
        Self {
            initial,
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options.as_object().cloned().unwrap_or_default();
        self
    }

    pub fn with_bindings(mut self, bindings: BindingsConfig) -> Self {
        self.bindings = bindings;
        self
    }
}

impl TestForm {
    pub fn build(name: &str, field_names: &[&str], setup: FormSetup) -> Rc<Self> {
        Rc::new_cyclic(|me: &Weak<TestForm>| {
            let handle: Weak<dyn FormHandle> = me.clone();
            let state = StateStore::builder(name, handle)
                .initial(setup.initial)
                .options(setup.options)
                .bindings(setup.bindings)
                .build();
            TestForm {
                name: name.to_string(),
                fields: field_names
                    .iter()
                    .map(|n| RecordingField::new(n, me.clone()))
                    .collect(),
                state: RefCell::new(state),
            }
        })
    }

    pub fn field(&self, name: &str) -> &RecordingField {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("no field named {name}"))
    }

    pub fn set_option(&self, key: &str, value: impl Into<Value>) {
        self.state.borrow_mut().options_mut().set_value(key, value);
    }
}

// --- Event capture ---

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Clone, Default)]
pub struct EventCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl EventCapture {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: BTreeMap<String, String>,
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields
                .insert(field.name().to_string(), format!("{value:?}"));
        }
    }
}

impl<S: Subscriber> Layer<S> for EventCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
            fields: visitor.fields,
        });
    }
}

/// Run `f` with a capturing subscriber installed on this thread.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<CapturedEvent>) {
    let capture = EventCapture::default();
    let subscriber = Registry::default().with(capture.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, capture.events())
}

pub fn warnings(events: &[CapturedEvent]) -> Vec<&CapturedEvent> {
    events.iter().filter(|e| e.level == Level::WARN).collect()
}
