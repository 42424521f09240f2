//! Core value types shared by the state store and its collaborators.
//!
//! Snapshot containers are plain JSON maps; the enums here select which
//! container an accessor resolves to.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structural mode of a form, decided once from its declaration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Field definitions sit flatly alongside form-level configuration keys.
    Unified,
    /// Field definitions live under a dedicated nested key.
    Separated,
}

/// Which snapshot an accessor targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Namespace {
    /// Seeded at construction. Writes here also land in `Current`.
    Initial,
    /// Live state.
    Current,
}

/// Which container inside a snapshot an accessor targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    /// Form-level configuration values extracted from the declaration.
    Props,
    /// Per-field data.
    Fields,
}

/// Validation trigger a field can observe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum ValidationTrigger {
    OnChange,
    OnBlur,
}

impl ValidationTrigger {
    /// Option key that toggles observation of this trigger.
    pub fn option_key(self) -> &'static str {
        match self {
            ValidationTrigger::OnChange => "validateOnChange",
            ValidationTrigger::OnBlur => "validateOnBlur",
        }
    }
}

/// Result of running the classifier over a declaration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeclarationShape {
    pub is_struct: bool,
    pub has_unified: bool,
    pub has_separated: bool,
}

impl DeclarationShape {
    /// Unified and separated field definitions appear in the same declaration.
    pub fn is_mixed(&self) -> bool {
        self.has_unified && self.has_separated
    }

    /// Mode decision. A mixed declaration resolves to `Unified` because the
    /// separated branch requires the absence of unified content.
    pub fn mode(&self) -> Mode {
        if (self.has_separated || self.is_struct) && !self.has_unified {
            Mode::Separated
        } else {
            Mode::Unified
        }
    }
}

/// A `{props, fields}` pair captured at a point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    #[serde(default)]
    pub props: Map<String, Value>,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Snapshot {
    pub fn bucket(&self, bucket: Bucket) -> &Map<String, Value> {
        match bucket {
            Bucket::Props => &self.props,
            Bucket::Fields => &self.fields,
        }
    }

    pub fn bucket_mut(&mut self, bucket: Bucket) -> &mut Map<String, Value> {
        match bucket {
            Bucket::Props => &mut self.props,
            Bucket::Fields => &mut self.fields,
        }
    }
}
