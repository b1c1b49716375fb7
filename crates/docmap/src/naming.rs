//! Field naming strategies.
//!
//! A strategy computes the wire field name of a property that does not declare one explicitly.
use std::fmt;

use heck::ToSnakeCase;

/// Maps a declared property name to a wire field name.
///
/// Implementations must be deterministic and free of side effects.
pub trait FieldNamingStrategy: fmt::Debug + Send + Sync {
    fn field_name(&self, property: &str) -> String;
}

/// Uses the declared property name unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyNameStrategy;

/// Lower-cases the property name and separates words with `_`.
///
/// `withoutCustomFieldName` becomes `without_custom_field_name`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCaseStrategy;

impl FieldNamingStrategy for PropertyNameStrategy {
    fn field_name(&self, property: &str) -> String {
        property.to_string()
    }
}

impl FieldNamingStrategy for SnakeCaseStrategy {
    fn field_name(&self, property: &str) -> String {
        property.to_snake_case()
    }
}

/// Return `explicit` if specified, otherwise the name computed by `strategy`.
pub fn resolve(strategy: &dyn FieldNamingStrategy, property: &str, explicit: Option<&str>) -> String {
    match explicit {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => strategy.field_name(property),
    }
}

#[cfg(test)]
mod tests {
    use super::{PropertyNameStrategy, SnakeCaseStrategy, resolve};

    macro_rules! test_snake_case {
        ($name:ident, $property:expr, $expected:expr) => {
            #[test]
            fn $name() {
                assert_eq!(resolve(&SnakeCaseStrategy, $property, None), $expected);
            }
        };
    }

    test_snake_case!(snake_case_camel, "withoutCustomFieldName", "without_custom_field_name");
    test_snake_case!(snake_case_single_word, "message", "message");
    test_snake_case!(snake_case_upper_camel, "SeqNoPrimaryTerm", "seq_no_primary_term");
    test_snake_case!(snake_case_acronym, "HTTPServer", "http_server");
    test_snake_case!(snake_case_already_snake, "last_updated", "last_updated");

    #[test]
    fn test_identity() {
        assert_eq!(
            resolve(&PropertyNameStrategy, "withoutCustomFieldName", None),
            "withoutCustomFieldName"
        );
    }

    #[test]
    fn test_explicit_name_wins() {
        assert_eq!(
            resolve(&PropertyNameStrategy, "withCustomFieldName", Some("CUStomFIEldnAME")),
            "CUStomFIEldnAME"
        );
        assert_eq!(
            resolve(&SnakeCaseStrategy, "withCustomFieldName", Some("CUStomFIEldnAME")),
            "CUStomFIEldnAME"
        );
    }

    #[test]
    fn test_empty_explicit_name_is_ignored() {
        assert_eq!(resolve(&SnakeCaseStrategy, "fieldName", Some("")), "field_name");
    }
}
