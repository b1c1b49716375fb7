//! Declarative field annotations.
//!
//! These types describe how a property is stored by the search engine. They are plain data and
//! deserialize from the same snake_case names the engine uses in its mappings.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::convert::PropertyValueConverter;
use crate::value::ValueKind;
use crate::{Error, Result};

/// A storage type of the search engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Inferred from the property's value kind.
    #[default]
    Auto,
    Text,
    Keyword,
    Long,
    Integer,
    Short,
    Byte,
    Double,
    Float,
    HalfFloat,
    ScaledFloat,
    Date,
    DateNanos,
    Boolean,
    Binary,
    Object,
    Nested,
    Ip,
    GeoPoint,
    TokenCount,
    Percolator,
    Flattened,
    SearchAsYouType,
    Wildcard,
    Join,
}

/// A named date format of the search engine.
///
/// Every format except [`DateFormat::None`] and [`DateFormat::Custom`] is bound to exactly one
/// pattern, which is used to print and parse values in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    None,
    Custom,
    BasicDate,
    BasicDateTime,
    BasicDateTimeNoMillis,
    BasicTime,
    BasicTimeNoMillis,
    BasicTTime,
    BasicTTimeNoMillis,
    Date,
    DateHour,
    DateHourMinute,
    DateHourMinuteSecond,
    DateHourMinuteSecondMillis,
    DateOptionalTime,
    DateTime,
    DateTimeNoMillis,
    EpochMillis,
    EpochSecond,
    Hour,
    HourMinute,
    HourMinuteSecond,
    HourMinuteSecondMillis,
    Time,
    TimeNoMillis,
    Year,
    YearMonth,
    YearMonthDay,
}

/// Mapping parameters of a single field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Field {
    /// Explicit wire name. Wins over the naming strategy.
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Date formats. `None` uses the engine default of `date_optional_time||epoch_millis`.
    pub format: Option<Vec<DateFormat>>,
    pub pattern: Vec<String>,
    pub store: bool,
    pub index: Option<bool>,
    pub doc_values: Option<bool>,
    pub fielddata: bool,
    pub analyzer: Option<String>,
    pub search_analyzer: Option<String>,
    pub normalizer: Option<String>,
    pub copy_to: Vec<String>,
    pub ignore_above: Option<u32>,
    pub null_value: Option<serde_json::Value>,
    /// Write `null` for absent values instead of omitting the field.
    pub store_null_value: bool,
    #[serde(skip)]
    pub converter: Option<Arc<dyn PropertyValueConverter>>,
}

/// An additional sub-field of a [`MultiField`].
#[derive(Debug, Clone, Deserialize)]
pub struct InnerField {
    pub suffix: String,
    #[serde(flatten)]
    pub field: Field,
}

/// A field stored once and indexed under additional sub-fields.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MultiField {
    pub main_field: Field,
    pub other_fields: Vec<InnerField>,
}

/// A parent/child relation of a join field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JoinRelation {
    pub parent: String,
    pub children: Vec<String>,
}

/// How a property is declared to the engine.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSpec {
    /// No annotation. The storage type is inferred.
    #[default]
    Inferred,
    Field(Field),
    MultiField(MultiField),
}

impl FieldType {
    pub fn is_date(&self) -> bool {
        matches!(self, Self::Date | Self::DateNanos)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object | Self::Nested | Self::Flattened)
    }

    /// Infer a storage type from a value kind.
    ///
    /// Returns `None` for kinds that are never mapped as document fields.
    pub fn infer(kind: &ValueKind) -> Option<Self> {
        match kind.element() {
            ValueKind::Boolean => Some(Self::Boolean),
            ValueKind::Integer => Some(Self::Integer),
            ValueKind::Long => Some(Self::Long),
            ValueKind::Float => Some(Self::Float),
            ValueKind::Double => Some(Self::Double),
            ValueKind::String => Some(Self::Keyword),
            ValueKind::LocalDate | ValueKind::LocalDateTime | ValueKind::Instant => {
                Some(Self::Date)
            }
            ValueKind::Json | ValueKind::Entity(_) => Some(Self::Object),
            ValueKind::Join => Some(Self::Join),
            ValueKind::SeqNoPrimaryTerm | ValueKind::List(_) => None,
        }
    }

    /// Whether values of `kind` can be stored under this type.
    pub fn accepts(&self, kind: &ValueKind) -> bool {
        let element = kind.element();
        match self {
            Self::Auto => true,
            Self::Object | Self::Nested => {
                matches!(element, ValueKind::Entity(_) | ValueKind::Json)
            }
            Self::Join => matches!(element, ValueKind::Join),
            _ => !matches!(
                element,
                ValueKind::Entity(_) | ValueKind::Join | ValueKind::SeqNoPrimaryTerm
            ),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Text => "text",
            Self::Keyword => "keyword",
            Self::Long => "long",
            Self::Integer => "integer",
            Self::Short => "short",
            Self::Byte => "byte",
            Self::Double => "double",
            Self::Float => "float",
            Self::HalfFloat => "half_float",
            Self::ScaledFloat => "scaled_float",
            Self::Date => "date",
            Self::DateNanos => "date_nanos",
            Self::Boolean => "boolean",
            Self::Binary => "binary",
            Self::Object => "object",
            Self::Nested => "nested",
            Self::Ip => "ip",
            Self::GeoPoint => "geo_point",
            Self::TokenCount => "token_count",
            Self::Percolator => "percolator",
            Self::Flattened => "flattened",
            Self::SearchAsYouType => "search_as_you_type",
            Self::Wildcard => "wildcard",
            Self::Join => "join",
        })
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| Error::UnknownFieldType(s.to_string()))
    }
}

impl DateFormat {
    /// The engine name of the format.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Custom => "custom",
            Self::BasicDate => "basic_date",
            Self::BasicDateTime => "basic_date_time",
            Self::BasicDateTimeNoMillis => "basic_date_time_no_millis",
            Self::BasicTime => "basic_time",
            Self::BasicTimeNoMillis => "basic_time_no_millis",
            Self::BasicTTime => "basic_t_time",
            Self::BasicTTimeNoMillis => "basic_t_time_no_millis",
            Self::Date => "date",
            Self::DateHour => "date_hour",
            Self::DateHourMinute => "date_hour_minute",
            Self::DateHourMinuteSecond => "date_hour_minute_second",
            Self::DateHourMinuteSecondMillis => "date_hour_minute_second_millis",
            Self::DateOptionalTime => "date_optional_time",
            Self::DateTime => "date_time",
            Self::DateTimeNoMillis => "date_time_no_millis",
            Self::EpochMillis => "epoch_millis",
            Self::EpochSecond => "epoch_second",
            Self::Hour => "hour",
            Self::HourMinute => "hour_minute",
            Self::HourMinuteSecond => "hour_minute_second",
            Self::HourMinuteSecondMillis => "hour_minute_second_millis",
            Self::Time => "time",
            Self::TimeNoMillis => "time_no_millis",
            Self::Year => "year",
            Self::YearMonth => "year_month",
            Self::YearMonthDay => "year_month_day",
        }
    }

    /// The pattern used to print and parse values, if the format has one.
    ///
    /// Epoch formats are numeric and have no pattern.
    pub fn pattern(&self) -> Option<&'static str> {
        match self {
            Self::None | Self::Custom | Self::EpochMillis | Self::EpochSecond => None,
            Self::BasicDate => Some("uuuuMMdd"),
            Self::BasicDateTime => Some("uuuuMMdd'T'HHmmss.SSSXXX"),
            Self::BasicDateTimeNoMillis => Some("uuuuMMdd'T'HHmmssXXX"),
            Self::BasicTime => Some("HHmmss.SSSXXX"),
            Self::BasicTimeNoMillis => Some("HHmmssXXX"),
            Self::BasicTTime => Some("'T'HHmmss.SSSXXX"),
            Self::BasicTTimeNoMillis => Some("'T'HHmmssXXX"),
            Self::Date | Self::YearMonthDay => Some("uuuu-MM-dd"),
            Self::DateHour => Some("uuuu-MM-dd'T'HH"),
            Self::DateHourMinute => Some("uuuu-MM-dd'T'HH:mm"),
            Self::DateHourMinuteSecond => Some("uuuu-MM-dd'T'HH:mm:ss"),
            Self::DateHourMinuteSecondMillis => Some("uuuu-MM-dd'T'HH:mm:ss.SSS"),
            Self::DateOptionalTime | Self::DateTime => Some("uuuu-MM-dd'T'HH:mm:ss.SSSXXX"),
            Self::DateTimeNoMillis => Some("uuuu-MM-dd'T'HH:mm:ssXXX"),
            Self::Hour => Some("HH"),
            Self::HourMinute => Some("HH:mm"),
            Self::HourMinuteSecond => Some("HH:mm:ss"),
            Self::HourMinuteSecondMillis => Some("HH:mm:ss.SSS"),
            Self::Time => Some("HH:mm:ss.SSSXXX"),
            Self::TimeNoMillis => Some("HH:mm:ssXXX"),
            Self::Year => Some("uuuu"),
            Self::YearMonth => Some("uuuu-MM"),
        }
    }
}

impl Field {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            ..Self::default()
        }
    }

    pub fn text() -> Self {
        Self::new(FieldType::Text)
    }

    pub fn keyword() -> Self {
        Self::new(FieldType::Keyword)
    }

    pub fn date() -> Self {
        Self::new(FieldType::Date)
    }

    pub fn nested() -> Self {
        Self::new(FieldType::Nested)
    }

    pub fn object() -> Self {
        Self::new(FieldType::Object)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn format(mut self, formats: impl IntoIterator<Item = DateFormat>) -> Self {
        self.format = Some(formats.into_iter().collect());
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern.push(pattern.into());
        self
    }

    pub fn store(mut self, store: bool) -> Self {
        self.store = store;
        self
    }

    pub fn index(mut self, index: bool) -> Self {
        self.index = Some(index);
        self
    }

    pub fn fielddata(mut self, fielddata: bool) -> Self {
        self.fielddata = fielddata;
        self
    }

    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    pub fn normalizer(mut self, normalizer: impl Into<String>) -> Self {
        self.normalizer = Some(normalizer.into());
        self
    }

    pub fn store_null_value(mut self, store_null_value: bool) -> Self {
        self.store_null_value = store_null_value;
        self
    }

    pub fn converter(mut self, converter: impl PropertyValueConverter + 'static) -> Self {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// The date formats in effect, falling back to the engine default.
    pub fn date_formats(&self) -> Vec<DateFormat> {
        self.format
            .clone()
            .unwrap_or_else(|| vec![DateFormat::DateOptionalTime, DateFormat::EpochMillis])
    }

    /// Patterns with text, in declaration order.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.pattern
            .iter()
            .map(String::as_str)
            .filter(|p| !p.trim().is_empty())
    }
}

impl InnerField {
    pub fn new(suffix: impl Into<String>, field: Field) -> Self {
        Self {
            suffix: suffix.into(),
            field,
        }
    }
}

impl MultiField {
    pub fn new(main_field: Field) -> Self {
        Self {
            main_field,
            other_fields: Vec::new(),
        }
    }

    pub fn inner(mut self, inner: InnerField) -> Self {
        self.other_fields.push(inner);
        self
    }
}

impl JoinRelation {
    pub fn new<S: Into<String>>(parent: impl Into<String>, children: impl IntoIterator<Item = S>) -> Self {
        Self {
            parent: parent.into(),
            children: children.into_iter().map(Into::into).collect(),
        }
    }
}

impl FieldSpec {
    /// The field holding the main value.
    pub fn main_field(&self) -> Option<&Field> {
        match self {
            Self::Inferred => None,
            Self::Field(field) => Some(field),
            Self::MultiField(multi) => Some(&multi.main_field),
        }
    }
}

impl From<Field> for FieldSpec {
    fn from(field: Field) -> Self {
        Self::Field(field)
    }
}

impl From<MultiField> for FieldSpec {
    fn from(multi: MultiField) -> Self {
        Self::MultiField(multi)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{DateFormat, Field, FieldType};
    use crate::Error;
    use crate::value::ValueKind;

    macro_rules! test_field_type {
        ($name:ident, $s:expr, $expected:expr) => {
            #[test]
            fn $name() {
                assert_eq!(FieldType::from_str($s).unwrap(), $expected);
                assert_eq!($expected.to_string(), $s);
            }
        };
    }

    test_field_type!(field_type_text, "text", FieldType::Text);
    test_field_type!(field_type_half_float, "half_float", FieldType::HalfFloat);
    test_field_type!(field_type_geo_point, "geo_point", FieldType::GeoPoint);
    test_field_type!(field_type_date_nanos, "date_nanos", FieldType::DateNanos);

    #[test]
    fn test_unknown_field_type() {
        assert!(matches!(
            FieldType::from_str("geo_hexagon").unwrap_err(),
            Error::UnknownFieldType(_)
        ));
    }

    #[test]
    fn test_default_date_formats() {
        assert_eq!(
            Field::date().date_formats(),
            vec![DateFormat::DateOptionalTime, DateFormat::EpochMillis]
        );
        assert!(Field::date().format([]).date_formats().is_empty());
    }

    #[test]
    fn test_blank_patterns_are_skipped() {
        let field = Field::date().pattern("").pattern("  ").pattern("dd.MM.uuuu");
        assert_eq!(field.patterns().collect::<Vec<_>>(), vec!["dd.MM.uuuu"]);
    }

    #[test]
    fn test_accepts() {
        assert!(FieldType::Keyword.accepts(&ValueKind::String));
        assert!(!FieldType::Nested.accepts(&ValueKind::String));
        assert!(FieldType::Object.accepts(&ValueKind::Json));
        assert!(!FieldType::Text.accepts(&ValueKind::Join));
        assert!(FieldType::Date.accepts(&ValueKind::List(Box::new(ValueKind::LocalDate))));
    }

    #[test]
    fn test_deserialize_field() {
        let field: Field = serde_json::from_value(serde_json::json!({
            "name": "by-name",
            "type": "date",
            "format": ["basic_date_time"],
            "pattern": ["dd.MM.uuuu"]
        }))
        .unwrap();
        assert_eq!(field.name.as_deref(), Some("by-name"));
        assert_eq!(field.field_type, FieldType::Date);
        assert_eq!(field.date_formats(), vec![DateFormat::BasicDateTime]);
    }
}
