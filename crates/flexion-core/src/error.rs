//! Error types for Flexion.

/// A specialized Result type for Flexion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Flexion operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A value fell outside a property's declared domain.
    #[error("Invalid value for property '{property}': {message}")]
    Validation {
        /// The property (or validator) that rejected the value.
        property: String,
        /// What was wrong with the value.
        message: String,
    },

    /// An operation was attempted from a context that does not allow it.
    #[error("Cannot {what}: {reason}")]
    Access {
        /// The attempted operation.
        what: String,
        /// Why it was refused.
        reason: String,
    },

    /// The component has been disposed and is inert.
    #[error("Component '{component}' has been disposed")]
    Disposed {
        /// The id of the disposed component.
        component: String,
    },

    /// Action or tick re-entrancy exceeded its safety bound.
    #[error("Recursion limit of {limit} exceeded while {phase}")]
    Recursion {
        /// The bound that tripped.
        limit: usize,
        /// What the loop was doing at the time.
        phase: &'static str,
    },

    /// A component or component class could not be constructed.
    #[error("Cannot construct '{class}': {message}")]
    Construction {
        /// The class being built or instantiated.
        class: String,
        /// What went wrong.
        message: String,
    },

    /// A reaction callback reported a failure.
    #[error("Reaction '{reaction}' failed: {message}")]
    Reaction {
        /// The name of the failing reaction.
        reaction: String,
        /// The failure message.
        message: String,
    },
}

impl Error {
    /// Create a validation error.
    pub fn validation(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            property: property.into(),
            message: message.into(),
        }
    }

    /// Create an access error.
    pub fn access(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Access {
            what: what.into(),
            reason: reason.into(),
        }
    }

    /// Create a disposed error.
    pub fn disposed(component: impl Into<String>) -> Self {
        Self::Disposed {
            component: component.into(),
        }
    }

    /// Create a construction error.
    pub fn construction(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Construction {
            class: class.into(),
            message: message.into(),
        }
    }

    /// Create a reaction error.
    pub fn reaction(reaction: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Reaction {
            reaction: reaction.into(),
            message: message.into(),
        }
    }

    /// Whether this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Whether this is an access error.
    pub fn is_access(&self) -> bool {
        matches!(self, Self::Access { .. })
    }

    /// Whether this is a disposed error.
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed { .. })
    }

    /// Whether this is a recursion error.
    pub fn is_recursion(&self) -> bool {
        matches!(self, Self::Recursion { .. })
    }

    /// Re-target a validation error at a named property.
    ///
    /// Validators report against their kind name; the mutation path knows the
    /// property name and uses this to make the message point at it.
    pub(crate) fn for_property(self, name: &str) -> Self {
        match self {
            Self::Validation { message, .. } => Self::Validation {
                property: name.to_string(),
                message,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::validation("intprop", "expected an int, got str");
        assert_eq!(
            err.to_string(),
            "Invalid value for property 'intprop': expected an int, got str"
        );

        let err = Error::Recursion {
            limit: 10,
            phase: "draining actions",
        };
        assert_eq!(
            err.to_string(),
            "Recursion limit of 10 exceeded while draining actions"
        );
    }

    #[test]
    fn test_for_property_only_touches_validation() {
        let err = Error::validation("Int", "bad").for_property("count");
        assert_eq!(err, Error::validation("count", "bad"));

        let err = Error::disposed("Thing1").for_property("count");
        assert!(err.is_disposed());
    }
}
