//! Property value converters.
use std::fmt;
use std::sync::Arc;

use crate::date::DateConverter;
use crate::field::{DateFormat, Field};
use crate::value::{Value, ValueError, ValueKind};
use crate::{Error, Result};

/// Converts a property value to and from its textual document representation.
///
/// Converters of collection-valued properties are applied to every element.
pub trait PropertyValueConverter: fmt::Debug + Send + Sync {
    fn write(&self, value: &Value) -> std::result::Result<String, ValueError>;

    fn read(&self, text: &str) -> std::result::Result<Value, ValueError>;
}

/// Resolve the converter of a property.
///
/// An explicit converter on the field wins. Date fields holding temporal values get a
/// [`DateConverter`] built from their formats and patterns. Everything else has no converter.
pub fn resolve(
    entity: &str,
    property: &str,
    kind: &ValueKind,
    field: Option<&Field>,
) -> Result<Option<Arc<dyn PropertyValueConverter>>> {
    let Some(field) = field else {
        return Ok(None);
    };
    if let Some(converter) = &field.converter {
        return Ok(Some(converter.clone()));
    }
    if !field.field_type.is_date() {
        return Ok(None);
    }
    let formats = field.date_formats();
    if formats.contains(&DateFormat::Custom) && field.patterns().next().is_none() {
        return Err(Error::MissingDatePattern {
            entity: entity.to_string(),
            property: property.to_string(),
        });
    }
    if !kind.is_temporal() {
        return Ok(None);
    }
    let converter = DateConverter::new(kind.element().clone(), &formats, field.patterns())?;
    if converter.is_none() {
        tracing::warn!(
            entity,
            property,
            "date property has neither a date format nor a pattern; values are written as ISO-8601"
        );
    }
    Ok(converter.map(|c| Arc::new(c) as Arc<dyn PropertyValueConverter>))
}
