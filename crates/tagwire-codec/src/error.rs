use indexmap::IndexMap;
use thiserror::Error;

/// Common result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Terminal decode failures: the payload itself cannot be turned into a value.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The body is not well-formed JSON.
    #[error("Request body is not valid JSON: {0}")]
    Syntax(String),

    /// A tagged object named a type tag with no registry entry.
    #[error("Cannot decode object {0}. No such object.")]
    UnknownType(String),
}

/// One or more field rules rejected a tagged object.
///
/// Always a batch: every violated field appears in `fields`, keyed by field
/// name (list elements as `name[index]`), in schema declaration order.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    pub fields: IndexMap<String, String>,
}

impl ValidationError {
    pub fn for_object(tag: &str, fields: IndexMap<String, String>) -> Self {
        Self {
            message: format!("Error validating object {tag}"),
            fields,
        }
    }
}

/// A registered builder rejected an already-validated field map.
///
/// Builders run after validation, so a failure here is a configuration or
/// programming defect, not client input — it is never reduced to a 400.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct BuildError(pub String);

impl BuildError {
    pub fn missing_field(name: &str) -> Self {
        Self(format!("Missing field {name}."))
    }

    pub fn wrong_kind(name: &str, expected: &str, actual: &str) -> Self {
        Self(format!("Field {name}: expected {expected}, got {actual}."))
    }
}

/// Umbrella error for every codec operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Top-level assertion failure: the decoded value is not the declared type.
    #[error("Expected {expected} got {actual} instead.")]
    TypeMismatch { expected: String, actual: String },

    /// Encode-time: the runtime type of an outgoing value has no bound tag.
    #[error("Cannot encode value of type {0}. No tag registered for it.")]
    UnregisteredType(&'static str),

    /// Registration conflict: the tag (or the Rust type) is already bound.
    #[error("Type tag {0} is already registered.")]
    DuplicateTag(String),

    #[error("Error building object {tag}. {source}")]
    Build {
        tag: String,
        #[source]
        source: BuildError,
    },

    #[error("Could not serialize value: {0}")]
    Serialize(String),
}

impl CodecError {
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// True for failures caused by client input, recoverable at the request
    /// boundary. Everything else indicates a server-side defect.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CodecError::Decode(_) | CodecError::Validation(_) | CodecError::TypeMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_message() {
        let err = DecodeError::UnknownType("Foo".to_string());
        assert_eq!(err.to_string(), "Cannot decode object Foo. No such object.");
    }

    #[test]
    fn validation_error_message_and_fields() {
        let mut fields = IndexMap::new();
        fields.insert(
            "first_name".to_string(),
            "Expected str got int instead.".to_string(),
        );
        let err = ValidationError::for_object("Person", fields);
        assert_eq!(err.to_string(), "Error validating object Person");
        assert_eq!(err.fields["first_name"], "Expected str got int instead.");
    }

    #[test]
    fn type_mismatch_message() {
        let err = CodecError::type_mismatch("Person", "list");
        assert_eq!(err.to_string(), "Expected Person got list instead.");
    }

    #[test]
    fn client_error_partition() {
        assert!(CodecError::from(DecodeError::UnknownType("X".into())).is_client_error());
        assert!(!CodecError::UnregisteredType("Widget").is_client_error());
        assert!(
            !CodecError::Build {
                tag: "Widget".into(),
                source: BuildError::missing_field("kind"),
            }
            .is_client_error()
        );
    }
}
