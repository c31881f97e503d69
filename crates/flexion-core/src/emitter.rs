//! Emitters: named event sources that carry a payload instead of a value.
//!
//! Calling an emitter through [`Component::call_emitter`] runs its body,
//! which turns the call arguments into a [`Payload`], and delivers the result
//! as an event to every reaction subscribed to the emitter's name. Unlike
//! actions, emitters run synchronously and may be called from any phase.

use std::fmt;
use std::sync::Arc;

use crate::component::Component;
use crate::error::Result;
use crate::event::Payload;
use crate::value::Value;

/// The body of an emitter.
pub type EmitterFn = Arc<dyn Fn(&Component, &[Value]) -> Result<Payload> + Send + Sync>;

/// Class-level declaration of an emitter.
#[derive(Clone)]
pub struct EmitterSpec {
    name: String,
    body: EmitterFn,
    doc: String,
}

impl EmitterSpec {
    /// Declare an emitter.
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Component, &[Value]) -> Result<Payload> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            body: Arc::new(body),
            doc: String::new(),
        }
    }

    /// Declare an emitter that stores its first argument under `"value"`.
    ///
    /// Called without arguments it emits an empty payload.
    pub fn passthrough(name: impl Into<String>) -> Self {
        Self::new(name, |_, args| {
            let mut payload = Payload::new();
            if let Some(first) = args.first() {
                payload.insert("value".to_string(), first.clone());
            }
            Ok(payload)
        })
    }

    /// Attach a documentation string.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// The emitter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The documentation string.
    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub(crate) fn body(&self) -> EmitterFn {
        self.body.clone()
    }
}

impl fmt::Debug for EmitterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmitterSpec").field("name", &self.name).finish()
    }
}
