//! Form options: a key/value configuration store with change notification.
//!
//! Every mutation goes through [`Options::set`], which computes one
//! [`OptionChange`] per key whose value actually differs, lets interceptors
//! rewrite or veto it, applies it, and then notifies observers. Dispatch is
//! synchronous and follows registration order.
//!
//! ```rust,ignore
//! let mut options = Options::new();
//! let sub = options.observe(check_observe(vec![ChangeRule::update(
//!     "validateOnChange",
//!     true,
//!     |_| println!("now validating on change"),
//! )]));
//! options.set_value("validateOnChange", true);
//! sub.cancel();
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::trace;

use crate::disposers::Subscription;
use crate::error::{FormStateError, Result};

/// Typed view of the built-in options and their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FormOptions {
    pub validate_on_init: bool,
    pub validate_on_blur: bool,
    pub validate_on_change: bool,
    pub validate_on_change_after_initial_blur: bool,
    pub validate_on_change_after_submit: bool,
    pub validate_disabled_fields: bool,
    pub validate_deleted_fields: bool,
    pub validate_pristine_fields: bool,
    pub show_errors_on_init: bool,
    pub show_errors_on_submit: bool,
    pub show_errors_on_blur: bool,
    pub show_errors_on_change: bool,
    pub show_errors_on_clear: bool,
    pub show_errors_on_reset: bool,
    pub strict_update: bool,
    pub strict_delete: bool,
    pub soft_delete: bool,
    pub retrieve_only_dirty_values: bool,
    pub retrieve_only_enabled_fields: bool,
    pub auto_parse_numbers: bool,
    pub allow_required: bool,
    pub submit_throws_error: bool,
    pub fallback: bool,
    /// Milliseconds.
    pub validation_debounce_wait: u64,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            validate_on_init: true,
            validate_on_blur: true,
            validate_on_change: false,
            validate_on_change_after_initial_blur: false,
            validate_on_change_after_submit: false,
            validate_disabled_fields: false,
            validate_deleted_fields: false,
            validate_pristine_fields: true,
            show_errors_on_init: false,
            show_errors_on_submit: true,
            show_errors_on_blur: true,
            show_errors_on_change: true,
            show_errors_on_clear: false,
            show_errors_on_reset: true,
            strict_update: false,
            strict_delete: true,
            soft_delete: false,
            retrieve_only_dirty_values: false,
            retrieve_only_enabled_fields: false,
            auto_parse_numbers: false,
            allow_required: false,
            submit_throws_error: true,
            fallback: true,
            validation_debounce_wait: 250,
        }
    }
}

impl FormOptions {
    /// Serialize into the store's key/value representation.
    pub fn to_map(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(FormStateError::InvalidOptions {
                message: format!("expected a mapping, got {other}"),
            }),
        }
    }
}

/// Whether a change introduced a key or replaced an existing value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    Add,
    Update,
}

/// One key's transition, handed to interceptors and observers.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionChange {
    pub key: String,
    pub kind: ChangeKind,
    pub old: Option<Value>,
    pub new: Value,
}

/// Runs before a change is applied. Returning `false` vetoes the change;
/// rewriting `change.new` alters what is stored.
pub type Interceptor = dyn Fn(&mut OptionChange) -> bool;

/// Runs after a change is applied.
pub type Observer = dyn Fn(&OptionChange);

struct Listeners<F: ?Sized> {
    next_id: u64,
    entries: Vec<(u64, Rc<F>)>,
}

impl<F: ?Sized> Listeners<F> {
    fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    fn add(&mut self, listener: Rc<F>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    fn remove(&mut self, id: u64) {
        self.entries.retain(|(entry, _)| *entry != id);
    }

    fn contains(&self, id: u64) -> bool {
        self.entries.iter().any(|(entry, _)| *entry == id)
    }

    fn snapshot(&self) -> Vec<(u64, Rc<F>)> {
        self.entries.clone()
    }
}

type Shared<F> = Rc<RefCell<Listeners<F>>>;

fn subscribe<F: ?Sized + 'static>(list: &Shared<F>, listener: Rc<F>) -> Subscription {
    let id = list.borrow_mut().add(listener);
    let weak = Rc::downgrade(list);
    Subscription::new(move || {
        if let Some(list) = weak.upgrade() {
            list.borrow_mut().remove(id);
        }
    })
}

/// Key/value option store.
pub struct Options {
    values: Map<String, Value>,
    interceptors: Shared<Interceptor>,
    observers: Shared<Observer>,
}

impl Options {
    /// Store seeded with [`FormOptions::default`].
    pub fn new() -> Self {
        let values = FormOptions::default()
            .to_map()
            .expect("FormOptions serializes to a JSON object of scalars");
        Self {
            values,
            interceptors: Rc::new(RefCell::new(Listeners::new())),
            observers: Rc::new(RefCell::new(Listeners::new())),
        }
    }

    /// Defaults overlaid with a YAML mapping. An empty document keeps the defaults.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let doc: Value = serde_yaml_ng::from_str(text)?;
        Self::from_document(doc)
    }

    /// Defaults overlaid with a JSON object.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(text)?;
        Self::from_document(doc)
    }

    fn from_document(doc: Value) -> Result<Self> {
        let mut options = Self::new();
        match doc {
            Value::Null => {}
            Value::Object(map) => options.set(map),
            other => {
                return Err(FormStateError::InvalidOptions {
                    message: format!("expected a mapping, got {other}"),
                });
            }
        }
        Ok(options)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Missing and non-boolean values read as `false`.
    pub fn get_bool(&self, key: &str) -> bool {
        self.values
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Field-level override first, then the form-level value.
    pub fn get_for<'a>(
        &'a self,
        key: &str,
        field_options: Option<&'a Map<String, Value>>,
    ) -> Option<&'a Value> {
        field_options
            .and_then(|overrides| overrides.get(key))
            .or_else(|| self.values.get(key))
    }

    pub fn all(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Typed snapshot of the current values. Unknown keys are ignored.
    pub fn typed(&self) -> Result<FormOptions> {
        Ok(serde_json::from_value(Value::Object(self.values.clone()))?)
    }

    pub fn set_value(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let mut patch = Map::new();
        patch.insert(key.into(), value.into());
        self.set(patch);
    }

    /// Merge `patch` key by key, dispatching interceptors and observers for
    /// each key whose value changes.
    pub fn set(&mut self, patch: Map<String, Value>) {
        for (key, new) in patch {
            let old = self.values.get(&key).cloned();
            if old.as_ref() == Some(&new) {
                continue;
            }
            let kind = if old.is_some() {
                ChangeKind::Update
            } else {
                ChangeKind::Add
            };
            let mut change = OptionChange {
                key,
                kind,
                old,
                new,
            };

            if !self.intercept_change(&mut change) {
                trace!(key = %change.key, "option change vetoed");
                continue;
            }
            if change.old.as_ref() == Some(&change.new) {
                continue;
            }

            trace!(key = %change.key, kind = ?change.kind, "option changed");
            self.values.insert(change.key.clone(), change.new.clone());
            self.notify(&change);
        }
    }

    fn intercept_change(&self, change: &mut OptionChange) -> bool {
        let snapshot = self.interceptors.borrow().snapshot();
        for (id, interceptor) in snapshot {
            if !self.interceptors.borrow().contains(id) {
                continue;
            }
            if !interceptor(&mut *change) {
                return false;
            }
        }
        true
    }

    fn notify(&self, change: &OptionChange) {
        let snapshot = self.observers.borrow().snapshot();
        for (id, observer) in snapshot {
            // a listener cancelled earlier in this dispatch must not run
            if !self.observers.borrow().contains(id) {
                continue;
            }
            observer(change);
        }
    }

    pub fn intercept(
        &mut self,
        interceptor: impl Fn(&mut OptionChange) -> bool + 'static,
    ) -> Subscription {
        subscribe(&self.interceptors, Rc::new(interceptor) as Rc<Interceptor>)
    }

    pub fn observe(&mut self, observer: impl Fn(&OptionChange) + 'static) -> Subscription {
        subscribe(&self.observers, Rc::new(observer) as Rc<Observer>)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.borrow().entries.len()
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors.borrow().entries.len()
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("values", &self.values)
            .field("interceptors", &self.interceptor_count())
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// A transition rule: fires `action` when `key` changes with `kind` to `to`.
pub struct ChangeRule {
    pub key: String,
    pub kind: ChangeKind,
    pub to: Value,
    pub action: Box<dyn Fn(&OptionChange)>,
}

impl ChangeRule {
    /// Rule for an existing key moving to `to`.
    pub fn update(
        key: impl Into<String>,
        to: impl Into<Value>,
        action: impl Fn(&OptionChange) + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            kind: ChangeKind::Update,
            to: to.into(),
            action: Box::new(action),
        }
    }

    pub fn matches(&self, change: &OptionChange) -> bool {
        change.kind == self.kind && change.key == self.key && change.new == self.to
    }
}

/// Build an observer that runs every matching rule, in order.
pub fn check_observe(rules: Vec<ChangeRule>) -> impl Fn(&OptionChange) + 'static {
    move |change| {
        for rule in rules.iter().filter(|rule| rule.matches(change)) {
            (rule.action)(change);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn counter() -> Rc<Cell<u32>> {
        Rc::new(Cell::new(0))
    }

    fn bump(counter: &Rc<Cell<u32>>) -> impl Fn(&OptionChange) + 'static {
        let counter = Rc::clone(counter);
        move |_| counter.set(counter.get() + 1)
    }

    #[test]
    fn new_seeds_defaults() {
        let options = Options::new();
        assert!(options.get_bool("validateOnBlur"));
        assert!(!options.get_bool("validateOnChange"));
        assert_eq!(options.get("validationDebounceWait"), Some(&json!(250)));
        assert_eq!(options.typed().unwrap(), FormOptions::default());
    }

    #[test]
    fn defaults_map_holds_every_typed_option() {
        let map = FormOptions::default().to_map().unwrap();
        assert_eq!(map.len(), 24);
        assert_eq!(Options::new().all(), &map);
        assert_eq!(map.get("submitThrowsError"), Some(&json!(true)));
        assert_eq!(map.get("softDelete"), Some(&json!(false)));
    }

    #[test]
    fn set_merges_and_keeps_unknown_keys() {
        let mut options = Options::new();
        let patch = json!({ "validateOnChange": true, "custom": "x" });
        options.set(patch.as_object().unwrap().clone());
        assert!(options.get_bool("validateOnChange"));
        assert_eq!(options.get("custom"), Some(&json!("x")));
        assert!(options.typed().unwrap().validate_on_change);
    }

    #[test]
    fn get_bool_on_non_bool_is_false() {
        let mut options = Options::new();
        options.set_value("validateOnInit", "yes");
        assert!(!options.get_bool("validateOnInit"));
        assert!(!options.get_bool("missing"));
    }

    #[test]
    fn field_override_wins() {
        let options = Options::new();
        let overrides = json!({ "validateOnBlur": false });
        let overrides = overrides.as_object().unwrap();
        assert_eq!(
            options.get_for("validateOnBlur", Some(overrides)),
            Some(&json!(false))
        );
        assert_eq!(
            options.get_for("validateOnInit", Some(overrides)),
            Some(&json!(true))
        );
        assert_eq!(options.get_for("validateOnBlur", None), Some(&json!(true)));
    }

    #[test]
    fn observers_see_update_and_add_kinds() {
        let mut options = Options::new();
        let seen: Rc<RefCell<Vec<OptionChange>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let _sub = options.observe(move |change| sink.borrow_mut().push(change.clone()));

        options.set_value("validateOnChange", true);
        options.set_value("brandNew", 1);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].kind, ChangeKind::Update);
        assert_eq!(seen[0].old, Some(json!(false)));
        assert_eq!(seen[0].new, json!(true));
        assert_eq!(seen[1].kind, ChangeKind::Add);
        assert_eq!(seen[1].old, None);
    }

    #[test]
    fn equal_value_is_not_a_change() {
        let mut options = Options::new();
        let fired = counter();
        let _sub = options.observe(bump(&fired));
        options.set_value("validateOnBlur", true);
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn cancelled_observer_is_not_called() {
        let mut options = Options::new();
        let fired = counter();
        let sub = options.observe(bump(&fired));
        options.set_value("validateOnChange", true);
        sub.cancel();
        options.set_value("validateOnChange", false);
        assert_eq!(fired.get(), 1);
        assert_eq!(options.observer_count(), 0);
    }

    #[test]
    fn interceptor_can_veto() {
        let mut options = Options::new();
        let fired = counter();
        let _obs = options.observe(bump(&fired));
        let _int = options.intercept(|change| change.key != "validateOnChange");

        options.set_value("validateOnChange", true);
        assert!(!options.get_bool("validateOnChange"));
        assert_eq!(fired.get(), 0);

        options.set_value("validateOnInit", false);
        assert!(!options.get_bool("validateOnInit"));
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn interceptor_can_rewrite() {
        let mut options = Options::new();
        let _int = options.intercept(|change| {
            if change.key == "validationDebounceWait" {
                change.new = json!(change.new.as_u64().unwrap_or(0).min(1000));
            }
            true
        });
        options.set_value("validationDebounceWait", 5000);
        assert_eq!(options.get("validationDebounceWait"), Some(&json!(1000)));
    }

    #[test]
    fn rewrite_back_to_old_value_is_dropped() {
        let mut options = Options::new();
        let fired = counter();
        let _obs = options.observe(bump(&fired));
        let _int = options.intercept(|change| {
            if let Some(old) = &change.old {
                change.new = old.clone();
            }
            true
        });
        options.set_value("validateOnChange", true);
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn check_observe_matches_target_transitions_only() {
        let mut options = Options::new();
        let on = counter();
        let off = counter();
        let _sub = options.observe(check_observe(vec![
            ChangeRule::update("validateOnChange", true, bump(&on)),
            ChangeRule::update("validateOnChange", false, bump(&off)),
        ]));

        options.set_value("validateOnChange", false);
        assert_eq!((on.get(), off.get()), (0, 0));
        options.set_value("validateOnChange", true);
        assert_eq!((on.get(), off.get()), (1, 0));
        options.set_value("validateOnChange", true);
        assert_eq!((on.get(), off.get()), (1, 0));
        options.set_value("validateOnChange", false);
        assert_eq!((on.get(), off.get()), (1, 1));
    }

    #[test]
    fn update_rule_ignores_added_keys() {
        let mut options = Options::new();
        let fired = counter();
        let _sub = options.observe(check_observe(vec![ChangeRule::update(
            "validateCustom",
            true,
            bump(&fired),
        )]));
        options.set_value("validateCustom", true);
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn observer_may_cancel_a_later_observer_mid_dispatch() {
        let mut options = Options::new();
        let fired = counter();
        let victim: Rc<RefCell<Option<Subscription>>> = Rc::default();

        let slot = Rc::clone(&victim);
        let _first = options.observe(move |_| {
            if let Some(sub) = slot.borrow_mut().take() {
                sub.cancel();
            }
        });
        *victim.borrow_mut() = Some(options.observe(bump(&fired)));

        options.set_value("validateOnChange", true);
        assert_eq!(fired.get(), 0);
        assert_eq!(options.observer_count(), 1);
    }

    #[test]
    fn yaml_document_overlays_defaults() {
        let options =
            Options::from_yaml_str("validateOnChange: true\nshowErrorsOnInit: true\n").unwrap();
        assert!(options.get_bool("validateOnChange"));
        assert!(options.get_bool("showErrorsOnInit"));
        assert!(options.get_bool("validateOnBlur"));
    }

    #[test]
    fn empty_yaml_keeps_defaults() {
        let options = Options::from_yaml_str("").unwrap();
        assert_eq!(options.typed().unwrap(), FormOptions::default());
    }

    #[test]
    fn json_document_overlays_defaults() {
        let options = Options::from_json_str(r#"{"validateOnBlur": false}"#).unwrap();
        assert!(!options.get_bool("validateOnBlur"));
    }

    #[test]
    fn non_mapping_document_is_rejected() {
        let err = Options::from_json_str("[1, 2]").unwrap_err();
        assert!(matches!(err, FormStateError::InvalidOptions { .. }));
        assert!(Options::from_yaml_str("- a\n- b\n").is_err());
        assert!(matches!(
            Options::from_json_str("{").unwrap_err(),
            FormStateError::Json(_)
        ));
    }
}
