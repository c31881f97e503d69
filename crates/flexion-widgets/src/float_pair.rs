//! A property kind holding two floats, used for sizes, positions and flex
//! factors.
//!
//! A single number is broadcast to both elements, so `3` and `(3, 3)` are the
//! same value. Elements accept anything the core `Float` kind accepts.
//!
//! ```
//! use flexion_core::{PropertySpec, Value};
//! use flexion_widgets::float_pair::{self, FloatPair};
//!
//! let spec = PropertySpec::custom("flex", FloatPair);
//! assert_eq!(spec.validate(Value::from(2)).unwrap(), float_pair::value(2.0, 2.0));
//! assert_eq!(
//!     spec.validate(Value::tuple([Value::from("1.5"), Value::from(0)])).unwrap(),
//!     float_pair::value(1.5, 0.0),
//! );
//! assert!(spec.validate(Value::tuple([1, 2, 3])).is_err());
//! ```

use flexion_core::{Error, PropertyKind, Result, Validator, Value};

/// Validator for `(x, y)` float pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloatPair;

impl Validator for FloatPair {
    fn name(&self) -> &str {
        "FloatPair"
    }

    fn default_value(&self) -> Value {
        value(0.0, 0.0)
    }

    fn validate(&self, input: Value) -> Result<Value> {
        let items = match input {
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_) => {
                vec![input.clone(), input]
            }
            other => other.items().ok_or_else(|| {
                Error::validation(
                    self.name(),
                    format!("expected a number or a pair, got {}", other.type_name()),
                )
            })?,
        };
        let [x, y] = <[Value; 2]>::try_from(items).map_err(|items| {
            Error::validation(
                self.name(),
                format!("expected 2 elements, got {}", items.len()),
            )
        })?;
        Ok(Value::tuple([element(x)?, element(y)?]))
    }
}

fn element(item: Value) -> Result<f64> {
    PropertyKind::Float
        .validate(item)
        .map(|v| v.as_float().unwrap_or_default())
        .map_err(|e| Error::validation("FloatPair", e.to_string()))
}

/// Build a pair value.
pub fn value(x: f64, y: f64) -> Value {
    Value::tuple([x, y])
}

/// Read a validated pair back.
pub fn get(value: &Value) -> Option<(f64, f64)> {
    match value.as_tuple()? {
        [x, y] => Some((x.as_float()?, y.as_float()?)),
        _ => None,
    }
}
