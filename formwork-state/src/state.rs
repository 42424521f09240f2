//! Per-form state container.
//!
//! Classifies the form declaration into a [`Mode`], keeps the initial and
//! current `{props, fields}` snapshots, owns the form's [`Options`] and
//! [`Bindings`], and turns `validateOnChange` / `validateOnBlur` transitions
//! into validation-observation commands on every field of the form.

use std::rc::{Rc, Weak};

use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::bindings::{Bindings, BindingsConfig};
use crate::classifier::{self, FIELDS_KEY};
use crate::disposers::{DisposerKey, Disposers};
use crate::error::{FormStateError, Result};
use crate::form::{FormHandle, FormRef};
use crate::options::{check_observe, ChangeRule, OptionChange, Options};
use crate::path;
use crate::types::{Bucket, DeclarationShape, Mode, Namespace, Snapshot, ValidationTrigger};

/// Disposer scope of the built-in options wiring. Reserved: custom
/// listeners cannot be registered under it.
pub const OPTIONS_SCOPE: &str = "options";

/// Builder for `StateStore`. Created by `StateStore::builder()`.
pub struct StateStoreBuilder {
    form_name: String,
    form: Weak<dyn FormHandle>,
    initial: Value,
    options: Map<String, Value>,
    bindings: BindingsConfig,
}

impl StateStoreBuilder {
    /// The raw form declaration to classify and project.
    pub fn initial(mut self, initial: Value) -> Self {
        self.initial = initial;
        self
    }

    /// Option values applied over the defaults before any subscription exists.
    pub fn options(mut self, options: Map<String, Value>) -> Self {
        self.options = options;
        self
    }

    /// Adapters registered on top of the built-in `default` rewriter.
    pub fn bindings(mut self, bindings: BindingsConfig) -> Self {
        self.bindings = bindings;
        self
    }

    /// Classify the declaration, seed the snapshots, set up options and
    /// bindings, then wire option changes to the form's fields.
    pub fn build(self) -> StateStore {
        let shape = classifier::classify(&self.initial);
        if shape.is_mixed() {
            warn!(
                form = %self.form_name,
                is_struct = shape.is_struct,
                has_unified = shape.has_unified,
                has_separated = shape.has_separated,
                "form is running in mixed mode (unified + separated field definitions); \
                 this is experimental, prefer a single mode"
            );
        }

        let mode = shape.mode();
        let structure = match mode {
            Mode::Separated => self
                .initial
                .get(FIELDS_KEY)
                .filter(|fields| !fields.is_null())
                .cloned()
                .unwrap_or_else(empty_structure),
            Mode::Unified => empty_structure(),
        };
        debug!(form = %self.form_name, ?mode, "classified form declaration");

        let mut store = StateStore {
            form: FormRef::new(self.form),
            form_name: self.form_name,
            mode,
            shape,
            structure,
            options: Options::new(),
            bindings: Bindings::new(),
            extra: None,
            disposers: Disposers::new(),
            initial: Snapshot::default(),
            current: Snapshot::default(),
        };

        let props = classifier::project_props(&self.initial);
        store.set(Namespace::Initial, Bucket::Props, Value::Object(props));

        store.options.set(self.options);
        store.bindings.register(self.bindings);
        store.observe_validation_options();
        store
    }
}

fn reserve_checked(key: DisposerKey) -> Result<DisposerKey> {
    if key.scope == OPTIONS_SCOPE {
        return Err(FormStateError::ReservedScope { scope: key.scope });
    }
    Ok(key)
}

fn empty_structure() -> Value {
    Value::Array(Vec::new())
}

fn merge(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        target.insert(key.clone(), value.clone());
    }
}

/// Per-form state. See the module docs.
#[derive(Debug)]
pub struct StateStore {
    form: FormRef,
    form_name: String,
    mode: Mode,
    shape: DeclarationShape,
    structure: Value,
    options: Options,
    bindings: Bindings,
    extra: Option<Value>,
    disposers: Disposers,
    initial: Snapshot,
    current: Snapshot,
}

impl StateStore {
    /// Start building the store for the named form.
    ///
    /// ```rust,ignore
    /// let form = Rc::new_cyclic(|me: &Weak<LoginForm>| {
    ///     let handle: Weak<dyn FormHandle> = me.clone();
    ///     LoginForm::new(
    ///         StateStore::builder("login", handle)
    ///             .initial(json!({ "fields": { "username": { "value": "" } } }))
    ///             .build(),
    ///     )
    /// });
    /// ```
    pub fn builder(form_name: impl Into<String>, form: Weak<dyn FormHandle>) -> StateStoreBuilder {
        StateStoreBuilder {
            form_name: form_name.into(),
            form,
            initial: Value::Object(Map::new()),
            options: Map::new(),
            bindings: BindingsConfig::new(),
        }
    }

    // --- Form back-reference ---

    /// The owning form, unless it has been dropped.
    pub fn form(&self) -> Option<Rc<dyn FormHandle>> {
        self.form.get()
    }

    /// Point the store, and its option wiring, at another form.
    pub fn set_form(&mut self, form: Weak<dyn FormHandle>) {
        self.form.replace(form);
    }

    /// Name given at construction. Used in diagnostics.
    pub fn form_name(&self) -> &str {
        &self.form_name
    }

    // --- Mode ---

    /// Mode decided at construction. Never changes afterwards.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// True iff the form runs in separated mode.
    pub fn strict(&self) -> bool {
        self.mode == Mode::Separated
    }

    /// Classifier flags the mode was decided from.
    pub fn shape(&self) -> DeclarationShape {
        self.shape
    }

    // --- Snapshots ---

    /// The `bucket` container of the `namespace` snapshot.
    pub fn get(&self, namespace: Namespace, bucket: Bucket) -> &Map<String, Value> {
        match namespace {
            Namespace::Initial => self.initial.bucket(bucket),
            Namespace::Current => self.current.bucket(bucket),
        }
    }

    /// Shallow-merge `patch` into the target container. `Initial` writes land
    /// in both snapshots; `Current` writes only in the live one. Non-object
    /// patches change nothing.
    pub fn set(&mut self, namespace: Namespace, bucket: Bucket, patch: Value) {
        let Value::Object(patch) = patch else {
            trace!(?namespace, ?bucket, "ignoring non-object patch");
            return;
        };
        if namespace == Namespace::Initial {
            merge(self.initial.bucket_mut(bucket), &patch);
        }
        merge(self.current.bucket_mut(bucket), &patch);
        trace!(?namespace, ?bucket, keys = patch.len(), "merged snapshot patch");
    }

    // --- Struct ---

    /// The `fields` entry of a separated declaration; an empty array otherwise.
    pub fn structure(&self) -> &Value {
        &self.structure
    }

    /// Replace the stored structure. `Null` leaves it untouched.
    pub fn set_structure(&mut self, data: Value) -> &Value {
        if !data.is_null() {
            self.structure = data;
        }
        &self.structure
    }

    // --- Extra ---

    /// Path lookup for a string, the whole blob for `None` or `Null`,
    /// replacement (returning `None`) for anything else.
    pub fn extra(&mut self, data: Option<Value>) -> Option<Value> {
        match data {
            Some(Value::String(path)) => self.extra_at(&path).cloned(),
            None | Some(Value::Null) => self.extra.clone(),
            Some(value) => {
                self.extra = Some(value);
                None
            }
        }
    }

    /// Borrowing path lookup into the extra blob. Missing or empty path
    /// segments resolve to `None`.
    pub fn extra_at(&self, path: &str) -> Option<&Value> {
        self.extra.as_ref().and_then(|extra| path::lookup(extra, path))
    }

    /// The whole extra blob, if one was set.
    pub fn extra_value(&self) -> Option<&Value> {
        self.extra.as_ref()
    }

    // --- Collaborators ---

    /// Form options, seeded from [`FormOptions`](crate::FormOptions) defaults.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Mutations made here dispatch to the store's subscriptions before
    /// returning, and `validateOnChange` / `validateOnBlur` transitions reach
    /// every field through [`FieldHandle`](crate::FieldHandle) while this
    /// borrow is still held. Fields must not reach back into the store.
    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Binding registry, including the built-in `default` rewriter.
    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Register more adapters after construction.
    pub fn bindings_mut(&mut self) -> &mut Bindings {
        &mut self.bindings
    }

    // --- Subscriptions ---

    /// Register an options interceptor under `scope`, replacing any previous one.
    ///
    /// Returns `ReservedScope` for [`OPTIONS_SCOPE`]; nothing is registered then.
    pub fn intercept_options(
        &mut self,
        scope: impl Into<String>,
        interceptor: impl Fn(&mut OptionChange) -> bool + 'static,
    ) -> Result<()> {
        let key = reserve_checked(DisposerKey::interceptor(scope))?;
        let subscription = self.options.intercept(interceptor);
        self.disposers.insert(key, subscription);
        Ok(())
    }

    /// Register an options observer under `scope`, replacing any previous one.
    ///
    /// Returns `ReservedScope` for [`OPTIONS_SCOPE`]; nothing is registered then.
    pub fn observe_options(
        &mut self,
        scope: impl Into<String>,
        observer: impl Fn(&OptionChange) + 'static,
    ) -> Result<()> {
        let key = reserve_checked(DisposerKey::observer(scope))?;
        let subscription = self.options.observe(observer);
        self.disposers.insert(key, subscription);
        Ok(())
    }

    /// Whether a live subscription is held under `key`.
    pub fn is_subscribed(&self, key: &DisposerKey) -> bool {
        self.disposers.contains(key)
    }

    /// Number of live subscriptions, the built-in wiring included.
    pub fn subscription_count(&self) -> usize {
        self.disposers.len()
    }

    /// Release the subscription under `key`. Returns `false` if none was held.
    ///
    /// Disposing `DisposerKey::observer(OPTIONS_SCOPE)` turns off the
    /// validation-toggle wiring for the rest of the store's life.
    pub fn dispose(&mut self, key: &DisposerKey) -> bool {
        let released = self.disposers.dispose(key);
        if released && key.scope == OPTIONS_SCOPE {
            debug!(form = %self.form_name, %key, "validation-toggle wiring disposed");
        }
        released
    }

    /// Release every subscription. Returns how many were released.
    pub fn dispose_all(&mut self) -> usize {
        let released = self.disposers.dispose_all();
        debug!(form = %self.form_name, released, "disposed form subscriptions");
        released
    }

    // --- Internal ---

    fn observe_validation_options(&mut self) {
        let rules = [
            (ValidationTrigger::OnChange, true),
            (ValidationTrigger::OnChange, false),
            (ValidationTrigger::OnBlur, true),
            (ValidationTrigger::OnBlur, false),
        ]
        .into_iter()
        .map(|(trigger, enable)| {
            let form = self.form.clone();
            ChangeRule::update(trigger.option_key(), enable, move |change| {
                let fields = form.each_field(|field| {
                    if enable {
                        field.observe_validation(trigger, change);
                    } else {
                        field.dispose_validation(trigger, change);
                    }
                });
                debug!(?trigger, enable, fields, "dispatched validation toggle");
            })
        })
        .collect();

        let subscription = self.options.observe(check_observe(rules));
        self.disposers.insert(DisposerKey::observer(OPTIONS_SCOPE), subscription);
    }
}
