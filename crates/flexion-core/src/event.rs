//! Events delivered to reactions.
//!
//! Every effective mutation and every emission produces one [`Event`]. Events
//! are accumulated per reaction during a tick and handed over as one ordered
//! batch when the reaction runs.

use std::collections::BTreeMap;
use std::fmt;

use crate::component::ComponentId;
use crate::value::Value;

/// Ad-hoc data carried by emitter events.
pub type Payload = BTreeMap<String, Value>;

/// What happened to produce an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// The whole value was replaced.
    Set {
        /// The value before the mutation.
        old_value: Value,
        /// The value after the mutation.
        new_value: Value,
    },
    /// Items were inserted at `index`.
    Insert {
        /// Position of the first inserted item.
        index: usize,
        /// The inserted items.
        objects: Vec<Value>,
    },
    /// Items were removed starting at `index`.
    Remove {
        /// Position of the first removed item.
        index: usize,
        /// The removed items.
        objects: Vec<Value>,
    },
    /// Items starting at `index` were overwritten.
    Replace {
        /// Position of the first replaced item.
        index: usize,
        /// The items that were overwritten.
        old_objects: Vec<Value>,
        /// The items written in their place.
        objects: Vec<Value>,
    },
    /// An emitter fired; there is no old/new pair.
    Emit(Payload),
}

impl Change {
    /// Short name of the change kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::Insert { .. } => "insert",
            Self::Remove { .. } => "remove",
            Self::Replace { .. } => "replace",
            Self::Emit(_) => "emit",
        }
    }
}

/// A single change or emission, as seen by a reaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// The component that produced the event.
    pub source: ComponentId,
    /// The property or emitter name.
    pub name: String,
    /// What happened.
    pub change: Change,
}

impl Event {
    /// Create an event.
    pub fn new(source: ComponentId, name: impl Into<String>, change: Change) -> Self {
        Self {
            source,
            name: name.into(),
            change,
        }
    }

    /// The previous value, for `set` events.
    pub fn old_value(&self) -> Option<&Value> {
        match &self.change {
            Change::Set { old_value, .. } => Some(old_value),
            _ => None,
        }
    }

    /// The new value, for `set` events.
    pub fn new_value(&self) -> Option<&Value> {
        match &self.change {
            Change::Set { new_value, .. } => Some(new_value),
            _ => None,
        }
    }

    /// The payload, for emitter events.
    pub fn payload(&self) -> Option<&Payload> {
        match &self.change {
            Change::Emit(payload) => Some(payload),
            _ => None,
        }
    }

    /// Look up a payload field, for emitter events.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload().and_then(|payload| payload.get(key))
    }

    /// Whether this event reports a mutation (rather than an emission).
    pub fn is_mutation(&self) -> bool {
        !matches!(self.change, Change::Emit(_))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.source, self.name, self.change.kind())
    }
}
