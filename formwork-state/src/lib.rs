//! Per-form state container for declarative forms
//!
//! `formwork-state` owns everything a form knows about itself that is not a
//! field value: how its declaration is shaped, the initial and current
//! snapshots of form-level props and field data, form options, UI binding
//! adapters and the subscriptions that tie option changes to field behaviour.
//!
//! # Architecture
//!
//! - **Classify once**: a declaration is either *unified* (field definitions sit next
//!   to config keys) or *separated* (field definitions under `fields`, per-field maps
//!   such as `labels` at the top level). The mode never changes afterwards.
//! - **Two snapshots**: `Initial` writes land in both snapshots, `Current`
//!   writes only in the live one.
//! - **Explicit pub/sub**: [`Options`] dispatches interceptors and observers
//!   synchronously; every subscription is a [`Subscription`] handle kept in a
//!   [`Disposers`] registry keyed by scope.
//! - **Weak back-reference**: the store reaches its form through [`FormHandle`]
//!   without owning it.
//!
//! # Example
//!
//! ```rust,ignore
//! let store = StateStore::builder("login", form_handle)
//!     .initial(json!({ "fields": { "username": { "value": "" } } }))
//!     .build();
//! assert_eq!(store.mode(), Mode::Separated);
//! ```

pub mod bindings;
pub mod classifier;
pub mod disposers;
pub mod error;
pub mod form;
pub mod options;
pub mod path;
pub mod state;
pub mod types;

pub use bindings::{BindingAdapter, BindingContext, Bindings, BindingsConfig, DEFAULT_BINDING};
pub use disposers::{DisposerKey, DisposerKind, Disposers, Subscription};
pub use error::{FormStateError, Result};
pub use form::{FieldHandle, FormHandle, FormRef};
pub use options::{check_observe, ChangeKind, ChangeRule, FormOptions, OptionChange, Options};
pub use path::ValuePath;
pub use state::{StateStore, StateStoreBuilder, OPTIONS_SCOPE};
pub use types::{Bucket, DeclarationShape, Mode, Namespace, Snapshot, ValidationTrigger};
