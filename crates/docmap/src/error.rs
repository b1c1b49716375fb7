//! Error type for this crate.

/// A result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by this crate.
///
/// Configuration errors are raised once, when an entity descriptor is built, and are cached
/// together with the descriptor slot, so the type keeps failing with the same error. Conversion
/// errors are raised per value and never affect the cached descriptor.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A property or entity declaration is invalid.
    #[error("invalid configuration of `{entity}.{property}`: {reason}")]
    InvalidConfiguration {
        entity: String,
        property: String,
        reason: String,
    },
    /// A date property uses a custom format without a pattern.
    #[error(
        "property `{entity}.{property}` is declared with a custom date format but has no pattern defined"
    )]
    MissingDatePattern { entity: String, property: String },
    /// A date pattern cannot be compiled.
    #[error("invalid date pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    /// More than one property claims a role that must be unique.
    #[error("entity `{entity}` declares {role} on both `{current}` and `{other}`")]
    DuplicateRole {
        entity: String,
        role: &'static str,
        current: String,
        other: String,
    },
    /// Two properties resolve to the same wire field name.
    #[error("entity `{entity}` maps both `{current}` and `{other}` to field `{field}`")]
    DuplicateFieldName {
        entity: String,
        field: String,
        current: String,
        other: String,
    },
    /// A storage type cannot hold the property's values.
    #[error("property `{entity}.{property}` cannot be stored as `{field_type}`")]
    UnsupportedFieldType {
        entity: String,
        property: String,
        field_type: String,
    },
    /// A storage type name is not known.
    #[error("unknown field type: {0}")]
    UnknownFieldType(String),
    /// A wire field name failed strict validation.
    #[error("entity `{entity}`: {message}")]
    InvalidFieldName { entity: String, message: String },
    /// A configuration parameter is unknown or has an invalid value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A value cannot be converted to or from its document representation.
    #[error("cannot convert `{entity}.{property}` value {value}: {reason}")]
    Conversion {
        entity: String,
        property: String,
        value: String,
        reason: String,
    },
    /// A required constructor argument is absent.
    #[error("missing value for `{entity}.{property}`")]
    MissingArgument { entity: String, property: String },
    /// A property name is not declared on the entity.
    #[error("entity `{entity}` has no property `{property}`")]
    UnknownProperty { entity: String, property: String },
    /// A property without a setter was asked to take a value.
    #[error("property `{entity}.{property}` has no setter")]
    ReadOnlyProperty { entity: String, property: String },
    /// A type-erased value holds a different type than requested.
    #[error("expected an instance of `{expected}`, found `{found}`")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },
    /// An index-name expression has no value in the resolver.
    #[error("cannot resolve index name expression `#{{{0}}}`")]
    UnresolvedExpression(String),
    /// An entity that is not stored as a top-level document was asked for its index.
    #[error("entity `{0}` is not a document and has no index name")]
    MissingIndexName(String),
    /// An entity without an identifier was asked for one.
    #[error("entity `{0}` has no identifier")]
    MissingIdentifier(String),
    /// JSON serialization failed.
    #[error("serialization error: {0}")]
    Serializer(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serializer(err.to_string())
    }
}

impl Error {
    /// Whether the error was raised while building an entity descriptor.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration { .. }
                | Self::MissingDatePattern { .. }
                | Self::InvalidPattern { .. }
                | Self::DuplicateRole { .. }
                | Self::DuplicateFieldName { .. }
                | Self::UnsupportedFieldType { .. }
                | Self::UnknownFieldType(_)
                | Self::InvalidFieldName { .. }
                | Self::InvalidParameter(_)
        )
    }
}
