//! Declaration classifier.
//!
//! Pure predicates that inspect a raw form declaration and report which
//! field-definition styles it uses, plus the whitelisted key-sets that make
//! up a form's top-level configuration.
//!
//! A declaration may combine styles; the three predicates are independent.

use serde_json::{Map, Value};

use crate::types::DeclarationShape;

/// Key holding nested field definitions (or a field path listing).
pub const FIELDS_KEY: &str = "fields";

/// Per-field property maps declared at the form's top level.
pub const SEPARATED_PROPS: &[&str] = &[
    "values",
    "initials",
    "defaults",
    "labels",
    "placeholders",
    "disabled",
    "related",
    "options",
    "extra",
    "bindings",
    "types",
    "hooks",
    "handlers",
    "deleted",
    "error",
    "autoFocus",
    "inputMode",
];

/// Validation rule keys.
pub const VALIDATION_PROPS: &[&str] = &["rules", "validators", "validatedWith"];

/// Keys whose values are functions (or references to them).
pub const FUNCTION_PROPS: &[&str] = &["observers", "interceptors", "parse", "format"];

/// Form lifecycle hooks.
pub const HOOK_PROPS: &[&str] = &[
    "onInit",
    "onChange",
    "onToggle",
    "onFocus",
    "onBlur",
    "onDrop",
    "onSubmit",
    "onSuccess",
    "onError",
    "onClear",
    "onReset",
    "onAdd",
    "onDel",
];

/// Properties that mark a JSON object as a single field's definition.
pub const FIELD_PROPS: &[&str] = &[
    "value",
    "initial",
    "default",
    "label",
    "placeholder",
    "disabled",
    "related",
    "options",
    "extra",
    "bindings",
    "type",
    "hooks",
    "handlers",
    "error",
    "deleted",
    "autoFocus",
    "inputMode",
    "rules",
    "validators",
    "validatedWith",
    "observers",
    "interceptors",
    "parse",
    "format",
    "fields",
];

/// All four whitelisted categories, in projection order.
pub fn whitelisted_keys() -> impl Iterator<Item = &'static str> {
    SEPARATED_PROPS
        .iter()
        .chain(VALIDATION_PROPS)
        .chain(FUNCTION_PROPS)
        .chain(HOOK_PROPS)
        .copied()
}

/// True for `fields` and every whitelisted configuration key.
pub fn is_config_key(key: &str) -> bool {
    key == FIELDS_KEY || whitelisted_keys().any(|k| k == key)
}

/// Keep only whitelisted top-level keys of the declaration.
pub fn project_props(declaration: &Value) -> Map<String, Value> {
    let Some(obj) = declaration.as_object() else {
        return Map::new();
    };
    whitelisted_keys()
        .filter_map(|key| obj.get(key).map(|v| (key.to_string(), v.clone())))
        .collect()
}

/// An object carrying at least one recognised field property.
pub fn is_field_definition(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| obj.keys().any(|k| FIELD_PROPS.contains(&k.as_str())))
}

/// The declaration's `fields` entry is a pure listing of field paths.
pub fn is_struct(declaration: &Value) -> bool {
    match declaration.get(FIELDS_KEY) {
        Some(Value::Array(items)) => !items.is_empty() && items.iter().all(Value::is_string),
        _ => false,
    }
}

/// Field definitions appear directly at the top level, next to configuration keys.
pub fn has_unified(declaration: &Value) -> bool {
    let Some(obj) = declaration.as_object() else {
        return false;
    };
    obj.iter()
        .any(|(key, value)| !is_config_key(key) && is_field_definition(value))
}

/// Field definitions are isolated under `fields`, or per-field property maps sit at
/// the top level (`labels: { username: "User" }`).
pub fn has_separated(declaration: &Value) -> bool {
    let Some(obj) = declaration.as_object() else {
        return false;
    };

    let nested = obj
        .get(FIELDS_KEY)
        .and_then(Value::as_object)
        .is_some_and(|fields| !fields.is_empty() && fields.values().all(Value::is_object));

    let per_field_maps = SEPARATED_PROPS
        .iter()
        .chain(VALIDATION_PROPS)
        .any(|key| obj.get(*key).is_some_and(Value::is_object));

    nested || per_field_maps
}

/// Run all three predicates.
pub fn classify(declaration: &Value) -> DeclarationShape {
    DeclarationShape {
        is_struct: is_struct(declaration),
        has_unified: has_unified(declaration),
        has_separated: has_separated(declaration),
    }
}
