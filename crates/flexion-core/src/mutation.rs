//! Low-level property mutations.
//!
//! A [`Mutation`] is the only thing that changes a stored property value. It
//! is applied through [`Component::mutate`](crate::Component::mutate), which
//! refuses to run unless the loop is processing actions. Besides plain `Set`,
//! sequence values support incremental `Insert`, `Remove` and `Replace`
//! mutations; these skip re-validation of the collection and report the delta
//! in their event so reactions can mirror it.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::event::Change;
use crate::property::PropertySpec;
use crate::value::Value;

/// A requested change to a property's stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Validate and replace the whole value.
    Set(Value),
    /// Insert `items` before `index`.
    Insert {
        /// Insertion point, at most the current length.
        index: usize,
        /// Items to insert.
        items: Vec<Value>,
    },
    /// Remove `count` items starting at `index`.
    Remove {
        /// First item to remove.
        index: usize,
        /// How many items to remove.
        count: usize,
    },
    /// Overwrite items starting at `index`.
    Replace {
        /// First item to overwrite.
        index: usize,
        /// The new items; the range must lie within the current value.
        items: Vec<Value>,
    },
}

impl Mutation {
    /// A `Set` mutation.
    pub fn set(value: impl Into<Value>) -> Self {
        Self::Set(value.into())
    }

    /// An `Insert` mutation.
    pub fn insert<I, V>(index: usize, items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Insert {
            index,
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// A `Remove` mutation.
    pub fn remove(index: usize, count: usize) -> Self {
        Self::Remove { index, count }
    }

    /// A `Replace` mutation.
    pub fn replace<I, V>(index: usize, items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Replace {
            index,
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    /// Short name of the mutation mode.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Set(_) => "set",
            Self::Insert { .. } => "insert",
            Self::Remove { .. } => "remove",
            Self::Replace { .. } => "replace",
        }
    }
}

/// Validate the value carried by a `Set` mutation.
///
/// Sequence modes are left alone; their items are not validated.
pub(crate) fn validate(spec: &PropertySpec, mutation: Mutation) -> Result<Mutation> {
    match mutation {
        Mutation::Set(raw) => spec.validate(raw).map(Mutation::Set),
        other => Ok(other),
    }
}

/// Apply an already validated `mutation` to the stored value of `spec`.
///
/// Returns the change to report, or `None` when the value is unchanged.
pub(crate) fn apply(spec: &PropertySpec, current: &mut Value, mutation: Mutation) -> Result<Option<Change>> {
    if let Mutation::Set(new_value) = mutation {
        if new_value == *current {
            return Ok(None);
        }
        let old_value = std::mem::replace(current, new_value.clone());
        return Ok(Some(Change::Set {
            old_value,
            new_value,
        }));
    }

    let len = match current {
        Value::Tuple(items) => items.len(),
        Value::List(list) => list.len(),
        other => {
            return Err(Error::access(
                format!("{} into property '{}'", mutation.kind(), spec.name()),
                format!("it holds a {}, not a sequence", other.type_name()),
            ));
        }
    };
    check_range(spec, &mutation, len)?;

    let change = match mutation {
        Mutation::Insert { index, items } => {
            if items.is_empty() {
                return Ok(None);
            }
            splice(current, index..index, items.clone());
            Change::Insert {
                index,
                objects: items,
            }
        }
        Mutation::Remove { index, count } => {
            if count == 0 {
                return Ok(None);
            }
            let objects = splice(current, index..index + count, Vec::new());
            Change::Remove { index, objects }
        }
        Mutation::Replace { index, items } => {
            if items.is_empty() {
                return Ok(None);
            }
            let old_objects = splice(current, index..index + items.len(), items.clone());
            Change::Replace {
                index,
                old_objects,
                objects: items,
            }
        }
        Mutation::Set(_) => unreachable!("set mutations return early"),
    };
    Ok(Some(change))
}

fn check_range(spec: &PropertySpec, mutation: &Mutation, len: usize) -> Result<()> {
    let (start, end) = match mutation {
        Mutation::Insert { index, .. } => (*index, *index),
        Mutation::Remove { index, count } => (*index, index.saturating_add(*count)),
        Mutation::Replace { index, items } => (*index, index.saturating_add(items.len())),
        Mutation::Set(_) => return Ok(()),
    };
    if start > len || end > len {
        return Err(Error::validation(
            spec.name(),
            format!(
                "{} range {start}..{end} out of bounds for length {len}",
                mutation.kind()
            ),
        ));
    }
    Ok(())
}

/// Splice a tuple (rebuilt) or a list (in place), returning the removed items.
fn splice(current: &mut Value, range: std::ops::Range<usize>, items: Vec<Value>) -> Vec<Value> {
    match current {
        Value::List(list) => list.with_mut(|vec| vec.splice(range, items).collect()),
        Value::Tuple(tuple) => {
            let mut vec = tuple.to_vec();
            let removed = vec.splice(range, items).collect();
            *tuple = Arc::from(vec);
            removed
        }
        _ => Vec::new(),
    }
}
