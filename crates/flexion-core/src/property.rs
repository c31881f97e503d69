//! Property descriptors for Flexion.
//!
//! A [`PropertySpec`] is the class-level declaration of a named, typed slot on
//! a component: it owns the validation (coercion) rules of its
//! [`PropertyKind`], the default value, whether a public `set_<name>` action
//! is generated for it, and a documentation string for introspection.
//!
//! # Built-in kinds
//!
//! | Kind        | Accepts                                     | Default |
//! |-------------|---------------------------------------------|---------|
//! | `Any`       | anything, unchanged                         | `null`  |
//! | `Bool`      | anything, by truthiness                     | `false` |
//! | `Int`       | int, float (truncated), bool, numeric text  | `0`     |
//! | `Float`     | int, float, bool, numeric text              | `0.0`   |
//! | `String`    | strings only                                | `""`    |
//! | `Tuple`     | tuple or list, copied                       | `()`    |
//! | `List`      | tuple or list, copied                       | `[]`    |
//! | `Component` | `null` or an instance of the allowed class  | `null`  |
//! | `Custom`    | whatever the [`Validator`] says             | its own |
//!
//! # Example
//!
//! ```
//! use flexion_core::property::{PropertyKind, PropertySpec};
//! use flexion_core::Value;
//!
//! let spec = PropertySpec::int("count").with_default(3).settable(true);
//! assert_eq!(spec.validate(Value::from(42.9)).unwrap(), Value::Int(42));
//! assert_eq!(spec.validate(Value::from("9")).unwrap(), Value::Int(9));
//! assert!(spec.validate(Value::from("nine")).is_err());
//! assert!(matches!(spec.kind(), PropertyKind::Int));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::component::ComponentClass;
use crate::error::{Error, Result};
use crate::value::{List, Value};

/// A user-supplied validation rule for [`PropertyKind::Custom`].
///
/// Implementations must be pure: return the normalized value for allowed
/// input and a validation error otherwise, without touching outside state.
///
/// # Example
///
/// ```
/// use flexion_core::property::Validator;
/// use flexion_core::{Error, Result, Value};
///
/// struct Letter;
///
/// impl Validator for Letter {
///     fn name(&self) -> &str {
///         "Letter"
///     }
///
///     fn default_value(&self) -> Value {
///         Value::from("a")
///     }
///
///     fn validate(&self, value: Value) -> Result<Value> {
///         match value.as_str() {
///             Some("a" | "b" | "c") => Ok(value),
///             _ => Err(Error::validation(self.name(), "must be \"a\", \"b\" or \"c\"")),
///         }
///     }
/// }
/// ```
pub trait Validator: Send + Sync {
    /// Name of the kind, used in messages and introspection.
    fn name(&self) -> &str;

    /// Value used when a property of this kind declares no default.
    fn default_value(&self) -> Value;

    /// Normalize `value` or reject it.
    fn validate(&self, value: Value) -> Result<Value>;
}

/// The semantic type of a property, which decides how values are coerced.
#[derive(Clone)]
pub enum PropertyKind {
    /// No validation at all.
    Any,
    /// Truthiness coercion.
    Bool,
    /// Integer coercion.
    Int,
    /// Float coercion.
    Float,
    /// Strings only.
    String,
    /// Immutable sequence, copied on validation.
    Tuple,
    /// Mutable sequence, copied on validation.
    List,
    /// Reference to a component, optionally restricted to a class (and its
    /// subclasses).
    Component(Option<ComponentClass>),
    /// A user-defined rule.
    Custom(Arc<dyn Validator>),
}

impl PropertyKind {
    /// Name of the kind.
    pub fn name(&self) -> &str {
        match self {
            Self::Any => "Any",
            Self::Bool => "Bool",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::String => "String",
            Self::Tuple => "Tuple",
            Self::List => "List",
            Self::Component(_) => "Component",
            Self::Custom(validator) => validator.name(),
        }
    }

    /// The value a property of this kind holds when no default is declared.
    pub fn default_value(&self) -> Value {
        match self {
            Self::Any | Self::Component(_) => Value::Null,
            Self::Bool => Value::Bool(false),
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::String => Value::Str(String::new()),
            Self::Tuple => Value::Tuple(Arc::from(Vec::new())),
            Self::List => Value::List(List::default()),
            Self::Custom(validator) => validator.default_value(),
        }
    }

    /// Normalize `value` according to this kind.
    pub fn validate(&self, value: Value) -> Result<Value> {
        match self {
            Self::Any => Ok(value),
            Self::Bool => Ok(Value::Bool(value.is_truthy())),
            Self::Int => validate_int(value),
            Self::Float => validate_float(value),
            Self::String => match value {
                Value::Str(_) => Ok(value),
                other => Err(mismatch("String", "a string", &other)),
            },
            Self::Tuple => match value {
                Value::Tuple(items) => Ok(Value::Tuple(Arc::from(items.to_vec()))),
                Value::List(list) => Ok(Value::Tuple(Arc::from(list.to_vec()))),
                other => Err(mismatch("Tuple", "a tuple or list", &other)),
            },
            Self::List => match value {
                Value::Tuple(items) => Ok(Value::List(List::new(items.to_vec()))),
                Value::List(list) => Ok(Value::List(list.copy())),
                other => Err(mismatch("List", "a tuple or list", &other)),
            },
            Self::Component(allowed) => {
                let Value::Component(component) = &value else {
                    return if value.is_null() {
                        Ok(Value::Null)
                    } else {
                        Err(mismatch("Component", "a component or null", &value))
                    };
                };
                if let Some(class) = allowed {
                    if !component.class().is_subclass_of(class) {
                        return Err(Error::validation(
                            "Component",
                            format!(
                                "expected a {} instance, got {}",
                                class.name(),
                                component.class().name()
                            ),
                        ));
                    }
                }
                Ok(value)
            }
            Self::Custom(validator) => validator.validate(value),
        }
    }
}

impl fmt::Debug for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component(Some(class)) => write!(f, "Component({})", class.name()),
            other => f.write_str(other.name()),
        }
    }
}

fn mismatch(kind: &str, expected: &str, got: &Value) -> Error {
    Error::validation(kind, format!("expected {expected}, got {}", got.type_name()))
}

fn float_to_int(x: f64) -> Result<i64> {
    let truncated = x.trunc();
    if !truncated.is_finite() || truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return Err(Error::validation("Int", format!("{x} cannot be represented as an int")));
    }
    Ok(truncated as i64)
}

fn validate_int(value: Value) -> Result<Value> {
    match value {
        Value::Int(_) => Ok(value),
        Value::Bool(b) => Ok(Value::Int(i64::from(b))),
        Value::Float(x) => float_to_int(x).map(Value::Int),
        Value::Str(ref s) => {
            let text = s.trim();
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Value::Int(i));
            }
            let x = text.parse::<f64>().map_err(|_| {
                Error::validation("Int", format!("cannot convert {s:?} to an int"))
            })?;
            float_to_int(x).map(Value::Int)
        }
        other => Err(mismatch("Int", "an int, float or numeric string", &other)),
    }
}

fn validate_float(value: Value) -> Result<Value> {
    match value {
        Value::Float(_) => Ok(value),
        Value::Int(i) => Ok(Value::Float(i as f64)),
        Value::Bool(b) => Ok(Value::Float(if b { 1.0 } else { 0.0 })),
        Value::Str(ref s) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| {
            Error::validation("Float", format!("cannot convert {s:?} to a float"))
        }),
        other => Err(mismatch("Float", "an int, float or numeric string", &other)),
    }
}

/// Class-level declaration of a typed, validated, optionally settable slot.
#[derive(Clone)]
pub struct PropertySpec {
    name: String,
    kind: PropertyKind,
    default: Option<Value>,
    settable: bool,
    doc: String,
}

impl PropertySpec {
    /// Declare a property of the given kind.
    pub fn new(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            settable: false,
            doc: String::new(),
        }
    }

    /// Declare an [`PropertyKind::Any`] property.
    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Any)
    }

    /// Declare a [`PropertyKind::Bool`] property.
    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Bool)
    }

    /// Declare an [`PropertyKind::Int`] property.
    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Int)
    }

    /// Declare a [`PropertyKind::Float`] property.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Float)
    }

    /// Declare a [`PropertyKind::String`] property.
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::String)
    }

    /// Declare a [`PropertyKind::Tuple`] property.
    pub fn tuple(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Tuple)
    }

    /// Declare a [`PropertyKind::List`] property.
    pub fn list(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::List)
    }

    /// Declare a component-reference property accepting any component.
    pub fn component(name: impl Into<String>) -> Self {
        Self::new(name, PropertyKind::Component(None))
    }

    /// Declare a component-reference property restricted to `class`.
    pub fn component_of(name: impl Into<String>, class: &ComponentClass) -> Self {
        Self::new(name, PropertyKind::Component(Some(class.clone())))
    }

    /// Declare a property with a custom validator.
    pub fn custom(name: impl Into<String>, validator: impl Validator + 'static) -> Self {
        Self::new(name, PropertyKind::Custom(Arc::new(validator)))
    }

    /// Set the default value. It is validated when the class is built.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Whether a public `set_<name>` action is generated.
    pub fn settable(mut self, settable: bool) -> Self {
        self.settable = settable;
        self
    }

    /// Attach a documentation string.
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    /// The property name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The property kind.
    pub fn kind(&self) -> &PropertyKind {
        &self.kind
    }

    /// Whether external callers may set this property.
    pub fn is_settable(&self) -> bool {
        self.settable
    }

    /// The documentation string (empty when none was given).
    pub fn doc(&self) -> &str {
        &self.doc
    }

    /// The declared default, or the kind's default.
    pub fn default_value(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.kind.default_value())
    }

    /// Name of the generated setter action.
    pub fn setter_name(&self) -> String {
        format!("set_{}", self.name)
    }

    /// Validate a value for this property.
    pub fn validate(&self, value: Value) -> Result<Value> {
        self.kind
            .validate(value)
            .map_err(|err| err.for_property(&self.name))
    }

    /// A fresh, validated initial value for a new instance.
    ///
    /// Validation copies collection defaults, so instances never share a
    /// default list.
    pub fn initial_value(&self) -> Result<Value> {
        self.validate(self.default_value())
    }
}

impl fmt::Debug for PropertySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("settable", &self.settable)
            .finish()
    }
}
