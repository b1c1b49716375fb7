use std::sync::Arc;

use crate::naming::{FieldNamingStrategy, PropertyNameStrategy, SnakeCaseStrategy};
use crate::{Error, Result};

/// Process-wide mapping configuration.
#[derive(Debug, Clone)]
pub struct MappingConfig {
    pub naming: Arc<dyn FieldNamingStrategy>,
    /// Treat field-name diagnostics as errors instead of warnings.
    pub strict: bool,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            naming: Arc::new(PropertyNameStrategy),
            strict: false,
        }
    }
}

impl MappingConfig {
    pub fn with_naming(mut self, naming: impl FieldNamingStrategy + 'static) -> Self {
        self.naming = Arc::new(naming);
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

impl TryFrom<&str> for MappingConfig {
    type Error = Error;

    /// Parse comma-separated `key=value` parameters, e.g. `naming=snake_case,strict=true`.
    fn try_from(s: &str) -> Result<Self> {
        let mut config = Self::default();
        for param in s.split(',').filter(|s| !s.is_empty()) {
            if let Some(v) = param.strip_prefix("naming=") {
                config.naming = match v {
                    "identity" | "property_name" => Arc::new(PropertyNameStrategy),
                    "snake_case" => Arc::new(SnakeCaseStrategy),
                    _ => return Err(Error::InvalidParameter(format!("unknown naming: {v}"))),
                };
            } else if let Some(v) = param.strip_prefix("strict=") {
                config.strict = v
                    .parse()
                    .map_err(|_| Error::InvalidParameter(format!("invalid strict value: {v}")))?;
            } else {
                return Err(Error::InvalidParameter(format!("unknown parameter: {param}")));
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::MappingConfig;
    use crate::Error;

    #[test]
    fn test_empty() {
        let config = MappingConfig::try_from("").unwrap();
        assert!(!config.strict);
        assert_eq!(config.naming.field_name("fieldName"), "fieldName");
    }

    #[test]
    fn test_snake_case_strict() {
        let config = MappingConfig::try_from("naming=snake_case,strict=true").unwrap();
        assert!(config.strict);
        assert_eq!(config.naming.field_name("fieldName"), "field_name");
    }

    #[test]
    fn test_unknown_parameter() {
        assert!(matches!(
            MappingConfig::try_from("unknown=bar").unwrap_err(),
            Error::InvalidParameter(_)
        ));
    }

    #[test]
    fn test_unknown_naming() {
        assert!(matches!(
            MappingConfig::try_from("naming=kebab").unwrap_err(),
            Error::InvalidParameter(_)
        ));
    }

    #[test]
    fn test_invalid_strict_with_valid_naming() {
        assert!(matches!(
            MappingConfig::try_from("naming=snake_case,strict=yes").unwrap_err(),
            Error::InvalidParameter(_)
        ));
    }
}
