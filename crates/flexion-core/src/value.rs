//! Dynamic values carried by properties, action arguments and events.
//!
//! Property kinds coerce loosely (an int property accepts `"9"`, a list
//! property accepts a tuple), so everything that flows through the loop is a
//! [`Value`]. Scalars are plain data; [`Value::Tuple`] is an immutable shared
//! slice; [`Value::List`] is a shared container that can be changed in place,
//! which is what a list property hands out when read.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::component::Component;

/// A shared, in-place mutable sequence of values.
///
/// Cloning a `List` clones the handle, not the contents: every clone observes
/// the same items. Use [`List::copy`] for an independent shallow copy.
#[derive(Clone, Default)]
pub struct List(Arc<RwLock<Vec<Value>>>);

impl List {
    /// Create a list holding the given items.
    pub fn new(items: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    /// Snapshot the current items.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Whether the list has no items.
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Get a clone of the item at `index`.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.read().get(index).cloned()
    }

    /// Append an item in place.
    pub fn push(&self, value: impl Into<Value>) {
        self.0.write().push(value.into());
    }

    /// Access the items through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&[Value]) -> R,
    {
        f(&self.0.read())
    }

    /// Mutate the items through a closure.
    pub fn with_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Vec<Value>) -> R,
    {
        f(&mut self.0.write())
    }

    /// A new list with the same items, independent of this one.
    pub fn copy(&self) -> Self {
        Self::new(self.to_vec())
    }

    /// Whether both handles refer to the same container.
    pub fn ptr_eq(&self, other: &List) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.read() == *other.0.read()
    }
}

impl fmt::Debug for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.read().iter()).finish()
    }
}

impl From<Vec<Value>> for List {
    fn from(items: Vec<Value>) -> Self {
        Self::new(items)
    }
}

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    /// The absence of a value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A float.
    Float(f64),
    /// A string.
    Str(String),
    /// An immutable sequence.
    Tuple(Arc<[Value]>),
    /// A shared mutable sequence.
    List(List),
    /// A shared reference to a component (compared by identity).
    Component(Component),
    /// Any other payload (compared by identity).
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Build a tuple value.
    pub fn tuple<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Build a list value.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::List(List::new(items.into_iter().map(Into::into).collect()))
    }

    /// Wrap an arbitrary payload.
    pub fn opaque<T: Any + Send + Sync>(payload: T) -> Self {
        Self::Opaque(Arc::new(payload))
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Tuple(_) => "tuple",
            Self::List(_) => "list",
            Self::Component(_) => "component",
            Self::Opaque(_) => "opaque",
        }
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The boolean, if this is a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer, if this is an int.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The number as a float, if this is an int or a float.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The string slice, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The items, if this is a tuple.
    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// The list handle, if this is a list.
    pub fn as_list(&self) -> Option<&List> {
        match self {
            Self::List(list) => Some(list),
            _ => None,
        }
    }

    /// The component, if this is a component reference.
    pub fn as_component(&self) -> Option<&Component> {
        match self {
            Self::Component(c) => Some(c),
            _ => None,
        }
    }

    /// Downcast an opaque payload.
    pub fn as_opaque<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Opaque(payload) => payload.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// A snapshot of the items, if this is a tuple or a list.
    pub fn items(&self) -> Option<Vec<Value>> {
        match self {
            Self::Tuple(items) => Some(items.to_vec()),
            Self::List(list) => Some(list.to_vec()),
            _ => None,
        }
    }

    /// Truthiness: empty and zero values are false.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::Tuple(items) => !items.is_empty(),
            Self::List(list) => !list.is_empty(),
            Self::Component(_) | Self::Opaque(_) => true,
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            other => fmt::Display::fmt(other, f),
        }
    }
}

fn fmt_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        item.fmt_nested(f)?;
    }
    Ok(())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::Tuple(items) => {
                write!(f, "(")?;
                fmt_items(f, items)?;
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Self::List(list) => {
                write!(f, "[")?;
                list.with(|items| fmt_items(f, items))?;
                write!(f, "]")
            }
            Self::Component(c) => write!(f, "{}", c.id()),
            Self::Opaque(_) => write!(f, "<opaque>"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Int(i) => write!(f, "Int({i})"),
            Self::Float(x) => write!(f, "Float({x})"),
            Self::Str(s) => write!(f, "Str({s:?})"),
            Self::Tuple(items) => f.debug_tuple("Tuple").field(&&items[..]).finish(),
            Self::List(list) => f.debug_tuple("List").field(list).finish(),
            Self::Component(c) => write!(f, "Component({})", c.id()),
            Self::Opaque(_) => write!(f, "Opaque(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Component(a), Self::Component(b)) => a.ptr_eq(b),
            (Self::Opaque(a), Self::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Self::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Self::Float(f64::from(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Self::List(list)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(List::new(items))
    }
}

impl From<Component> for Value {
    fn from(c: Component) -> Self {
        Self::Component(c)
    }
}

impl From<&Component> for Value {
    fn from(c: &Component) -> Self {
        Self::Component(c.clone())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_handles_share_contents() {
        let list = List::new(vec![Value::from(1)]);
        let alias = list.clone();
        alias.push(2);
        assert_eq!(list.len(), 2);
        assert!(list.ptr_eq(&alias));

        let copy = list.copy();
        copy.push(3);
        assert_eq!(list.len(), 2);
        assert!(!list.ptr_eq(&copy));
    }

    #[test]
    fn test_list_equality_is_by_content() {
        let a = Value::list([1, 2]);
        let b = Value::list([1, 2]);
        assert_eq!(a, b);
        assert_ne!(a, Value::tuple([1, 2]));
    }

    #[test]
    fn test_opaque_equality_is_by_identity() {
        let a = Value::opaque(5u8);
        let b = Value::opaque(5u8);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.as_opaque::<u8>(), Some(&5));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::list([1, 2, 3]).to_string(), "[1, 2, 3]");
        assert_eq!(Value::tuple([Value::from(2), Value::from("xx")]).to_string(), "(2, \"xx\")");
        assert_eq!(Value::tuple([1]).to_string(), "(1,)");
        assert_eq!(Value::from("heya").to_string(), "heya");
        assert_eq!(Value::Null.to_string(), "null");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::from(0).is_truthy());
        assert!(!Value::tuple(Vec::<Value>::new()).is_truthy());
        assert!(Value::from(42).is_truthy());
        assert!(Value::opaque(()).is_truthy());
    }

    #[test]
    fn test_option_conversion() {
        assert!(Value::from(None::<i64>).is_null());
        assert_eq!(Value::from(Some(3)), Value::Int(3));
    }
}
