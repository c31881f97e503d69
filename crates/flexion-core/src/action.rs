//! Actions: named, queued mutation requests.
//!
//! Invoking an action never runs it. [`Component::invoke`](crate::Component::invoke)
//! snapshots the arguments into a queued task and appends it to the current
//! thread's loop; the loop runs it later with the processing flag set, which
//! is what allows the body to call [`Component::mutate`](crate::Component::mutate).

use std::fmt;
use std::sync::Arc;

use crate::component::Component;
use crate::error::Result;
use crate::value::Value;

/// The body of an action.
pub type ActionFn = Arc<dyn Fn(&Component, &[Value]) -> Result<()> + Send + Sync>;

/// Class-level declaration of an action.
#[derive(Clone)]
pub struct ActionSpec {
    name: String,
    body: ActionFn,
    doc: String,
}

impl ActionSpec {
    /// Declare an action.
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Component, &[Value]) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Arc::new(body),
            doc: String::new(),
        }
    }

    /// Attach a documentation string.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// The action name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The documentation string.
    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub(crate) fn body(&self) -> ActionFn {
        self.body.clone()
    }
}

impl fmt::Debug for ActionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSpec").field("name", &self.name).finish()
    }
}

/// A deferred closure queued with [`Loop::call_soon`](crate::Loop::call_soon).
pub(crate) type DeferredCall = Box<dyn FnOnce() + 'static>;

/// An entry in the loop's pending queue.
pub(crate) enum Task {
    /// A queued action with its argument snapshot.
    Action {
        component: Component,
        name: String,
        body: ActionFn,
        args: Vec<Value>,
    },
    /// A plain deferred call; runs outside the processing flag.
    Call(DeferredCall),
}

impl Task {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Action {
                component, name, ..
            } => format!("{}.{}", component.id(), name),
            Self::Call(_) => "deferred call".to_string(),
        }
    }
}
