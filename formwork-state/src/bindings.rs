//! Binding registry: named adapters that turn a field's props into the
//! props a UI component expects.
//!
//! Two adapter flavours exist. A *rewriter* renames keys (`value` → `checked`,
//! say). A *template* is a function that builds the output map itself and
//! receives the rewriter keys registered under the same name, if any.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{FormStateError, Result};

/// Name of the built-in rewriter.
pub const DEFAULT_BINDING: &str = "default";

const DEFAULT_KEYS: &[&str] = &[
    "id",
    "name",
    "type",
    "value",
    "checked",
    "label",
    "placeholder",
    "disabled",
    "onChange",
    "onBlur",
    "onFocus",
    "autoFocus",
];

/// Input handed to a template.
#[derive(Debug)]
pub struct BindingContext<'a> {
    pub name: &'a str,
    pub props: &'a Map<String, Value>,
    pub overrides: &'a Map<String, Value>,
    pub keys: Option<&'a IndexMap<String, String>>,
}

impl BindingContext<'_> {
    /// Override if present, else the field's own prop.
    pub fn pick(&self, key: &str) -> Option<&Value> {
        self.overrides.get(key).or_else(|| self.props.get(key))
    }
}

pub type BindingTemplate = dyn Fn(&BindingContext<'_>) -> Map<String, Value>;

/// One registrable adapter.
#[derive(Clone)]
pub enum BindingAdapter {
    Rewriter(IndexMap<String, String>),
    Template(Rc<BindingTemplate>),
}

impl fmt::Debug for BindingAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingAdapter::Rewriter(keys) => f.debug_tuple("Rewriter").field(keys).finish(),
            BindingAdapter::Template(_) => f.write_str("Template(..)"),
        }
    }
}

/// Ordered list of adapters to register.
#[derive(Debug, Clone, Default)]
pub struct BindingsConfig {
    entries: Vec<(String, BindingAdapter)>,
}

impl BindingsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rewriter from `(field prop, binding prop)` pairs.
    pub fn rewriter<K, V>(
        mut self,
        name: impl Into<String>,
        keys: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let keys = keys
            .into_iter()
            .map(|(from, to)| (from.into(), to.into()))
            .collect();
        self.entries.push((name.into(), BindingAdapter::Rewriter(keys)));
        self
    }

    pub fn template(
        mut self,
        name: impl Into<String>,
        template: impl Fn(&BindingContext<'_>) -> Map<String, Value> + 'static,
    ) -> Self {
        self.entries
            .push((name.into(), BindingAdapter::Template(Rc::new(template))));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for BindingsConfig {
    type Item = (String, BindingAdapter);
    type IntoIter = std::vec::IntoIter<(String, BindingAdapter)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Registered templates and rewriters.
pub struct Bindings {
    templates: HashMap<String, Rc<BindingTemplate>>,
    rewriters: HashMap<String, IndexMap<String, String>>,
}

impl Bindings {
    /// Registry holding only the identity `default` rewriter.
    pub fn new() -> Self {
        let default_keys = DEFAULT_KEYS
            .iter()
            .map(|k| (k.to_string(), k.to_string()))
            .collect();
        let mut rewriters = HashMap::new();
        rewriters.insert(DEFAULT_BINDING.to_string(), default_keys);
        Self {
            templates: HashMap::new(),
            rewriters,
        }
    }

    /// Rewriters merge into an existing rewriter of the same name; templates replace.
    pub fn register(&mut self, config: BindingsConfig) -> &mut Self {
        for (name, adapter) in config {
            match adapter {
                BindingAdapter::Rewriter(keys) => {
                    debug!(%name, keys = keys.len(), "registering binding rewriter");
                    self.rewriters.entry(name).or_default().extend(keys);
                }
                BindingAdapter::Template(template) => {
                    debug!(%name, "registering binding template");
                    self.templates.insert(name, template);
                }
            }
        }
        self
    }

    pub fn has(&self, name: &str) -> bool {
        self.templates.contains_key(name) || self.rewriters.contains_key(name)
    }

    pub fn rewriter(&self, name: &str) -> Option<&IndexMap<String, String>> {
        self.rewriters.get(name)
    }

    /// Resolve the binding props for one field.
    pub fn load(
        &self,
        name: &str,
        props: &Map<String, Value>,
        overrides: &Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        let ctx = BindingContext {
            name,
            props,
            overrides,
            keys: self.rewriters.get(name),
        };

        if let Some(template) = self.templates.get(name) {
            return Ok(template(&ctx));
        }

        let keys = ctx.keys.ok_or_else(|| FormStateError::UnknownBinding {
            name: name.to_string(),
        })?;

        Ok(keys
            .iter()
            .filter_map(|(from, to)| ctx.pick(from).map(|v| (to.clone(), v.clone())))
            .collect())
    }
}

impl Default for Bindings {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut templates: Vec<_> = self.templates.keys().collect();
        templates.sort();
        f.debug_struct("Bindings")
            .field("templates", &templates)
            .field("rewriters", &self.rewriters)
            .finish()
    }
}
