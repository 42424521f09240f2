//! Seams to the owning form and its fields.
//!
//! The store never owns its form: it keeps a `Weak` back-reference behind a
//! shared cell so subscriptions created at construction always dispatch to
//! the form that is current at the time of the change.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::options::OptionChange;
use crate::types::ValidationTrigger;

/// A field as seen by the store: something that can start or stop observing
/// a validation trigger.
///
/// Both methods run inside the options dispatch, while the caller still holds
/// the `&mut StateStore` that made the change. Implementations must not reach
/// back into the store (a `RefCell<StateStore>` owned by the form is mutably
/// borrowed at that point). Everything the option change carries is in
/// `change`.
pub trait FieldHandle {
    fn observe_validation(&self, trigger: ValidationTrigger, change: &OptionChange);
    fn dispose_validation(&self, trigger: ValidationTrigger, change: &OptionChange);
}

/// The form aggregate that owns the store.
pub trait FormHandle {
    fn name(&self) -> &str;

    /// Visit every field the form owns, nested ones included.
    fn each(&self, visit: &mut dyn FnMut(&dyn FieldHandle));
}

/// Shared, reassignable back-reference to the owning form.
#[derive(Clone)]
pub struct FormRef {
    inner: Rc<RefCell<Weak<dyn FormHandle>>>,
}

impl FormRef {
    pub fn new(form: Weak<dyn FormHandle>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(form)),
        }
    }

    /// The form, unless it has already been dropped.
    pub fn get(&self) -> Option<Rc<dyn FormHandle>> {
        self.inner.borrow().upgrade()
    }

    pub fn replace(&self, form: Weak<dyn FormHandle>) {
        *self.inner.borrow_mut() = form;
    }

    /// Run `visit` on every field of the current form. Returns the number of
    /// fields visited; zero when the form is gone.
    pub fn each_field(&self, mut visit: impl FnMut(&dyn FieldHandle)) -> usize {
        let Some(form) = self.get() else {
            return 0;
        };
        let mut count = 0;
        form.each(&mut |field: &dyn FieldHandle| {
            count += 1;
            visit(field);
        });
        count
    }
}

impl std::fmt::Debug for FormRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self.get().map(|form| form.name().to_string());
        f.debug_struct("FormRef").field("form", &name).finish()
    }
}
