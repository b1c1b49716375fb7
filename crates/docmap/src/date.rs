//! Date patterns and the built-in date converter.
//!
//! Patterns use the letters of the engine's date formats (`uuuu-MM-dd'T'HH:mm:ss.SSSXXX`). They
//! are compiled once into `chrono` format items and used in both directions.
use std::fmt::Write;

use chrono::format::{Fixed, Item, Numeric, Pad, Parsed, StrftimeItems};
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::convert::PropertyValueConverter;
use crate::field::DateFormat;
use crate::value::{Value, ValueError, ValueKind};
use crate::{Error, Result};

/// A compiled date pattern.
#[derive(Debug, Clone)]
pub struct DatePattern {
    source: String,
    items: Vec<Item<'static>>,
}

/// Patterns accepted by `date_optional_time`, after the one it prints with.
const OPTIONAL_TIME: [&str; 8] = [
    "uuuu-MM-dd'T'HH:mm:ss.SSSXXX",
    "uuuu-MM-dd'T'HH:mm:ss.SSSSSSXXX",
    "uuuu-MM-dd'T'HH:mm:ss.SSSSSSSSSXXX",
    "uuuu-MM-dd'T'HH:mm:ssXXX",
    "uuuu-MM-dd'T'HH:mm:ss.SSS",
    "uuuu-MM-dd'T'HH:mm:ss",
    "uuuu-MM-dd'T'HH:mm",
    "uuuu-MM-dd",
];

/// Prints and parses one textual date representation.
#[derive(Debug, Clone)]
enum DateFormatter {
    Pattern(DatePattern),
    /// Prints with the first pattern and parses with any of them.
    Lenient(Vec<DatePattern>),
    EpochMillis,
    EpochSecond,
}

/// Converts temporal values using an ordered list of formats.
///
/// Values are written with the first format. Reading tries every format in order.
#[derive(Debug, Clone)]
pub struct DateConverter {
    kind: ValueKind,
    formatters: Vec<DateFormatter>,
}

impl DatePattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };
        let mut items = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    literal.push('\'');
                    continue;
                }
                loop {
                    match chars.next() {
                        Some('\'') if chars.peek() == Some(&'\'') => {
                            chars.next();
                            literal.push('\'');
                        }
                        Some('\'') => break,
                        Some(c) => literal.push(c),
                        None => return Err(invalid("unterminated quote")),
                    }
                }
                continue;
            }
            if !c.is_ascii_alphabetic() {
                literal.push(c);
                continue;
            }
            let mut count = 1;
            while chars.peek() == Some(&c) {
                chars.next();
                count += 1;
            }
            // A fraction directly after a dot is printed together with the dot.
            let dotted = c == 'S' && literal.ends_with('.');
            if dotted {
                literal.pop();
            }
            if !literal.is_empty() {
                items.push(Item::OwnedLiteral(std::mem::take(&mut literal).into_boxed_str()));
            }
            items.push(letter(c, count, dotted).ok_or_else(|| {
                invalid(&format!("unsupported pattern letters `{}`", c.to_string().repeat(count)))
            })?);
        }
        if !literal.is_empty() {
            items.push(Item::OwnedLiteral(literal.into_boxed_str()));
        }
        if items.is_empty() {
            return Err(invalid("empty pattern"));
        }
        Ok(Self {
            source: pattern.to_string(),
            items,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn format(&self, instant: &DateTime<Utc>) -> Option<String> {
        let mut out = String::new();
        write!(out, "{}", instant.format_with_items(self.items.iter())).ok()?;
        Some(out)
    }

    fn parse(&self, text: &str) -> Option<Parsed> {
        let mut parsed = Parsed::new();
        chrono::format::parse(&mut parsed, text, self.items.iter()).ok()?;
        Some(parsed)
    }
}

fn letter(c: char, count: usize, dotted: bool) -> Option<Item<'static>> {
    let numeric = |n: Numeric| {
        Some(Item::Numeric(
            n,
            if count == 1 { Pad::None } else { Pad::Zero },
        ))
    };
    match (c, count) {
        ('y' | 'u', 2) => numeric(Numeric::YearMod100),
        ('y' | 'u', _) => Some(Item::Numeric(Numeric::Year, Pad::Zero)),
        ('M', 1 | 2) => numeric(Numeric::Month),
        ('M', 3) => Some(Item::Fixed(Fixed::ShortMonthName)),
        ('M', 4) => Some(Item::Fixed(Fixed::LongMonthName)),
        ('d', 1 | 2) => numeric(Numeric::Day),
        ('D', 1..=3) => Some(Item::Numeric(Numeric::Ordinal, Pad::Zero)),
        ('H', 1 | 2) => numeric(Numeric::Hour),
        ('h', 1 | 2) => numeric(Numeric::Hour12),
        ('m', 1 | 2) => numeric(Numeric::Minute),
        ('s', 1 | 2) => numeric(Numeric::Second),
        ('S', 3 | 6 | 9) => {
            let strftime = match (count, dotted) {
                (3, true) => "%.3f",
                (6, true) => "%.6f",
                (9, true) => "%.9f",
                (3, false) => "%3f",
                (6, false) => "%6f",
                _ => "%9f",
            };
            StrftimeItems::new(strftime).next()
        }
        ('a', 1) => Some(Item::Fixed(Fixed::UpperAmPm)),
        ('E', 1..=3) => Some(Item::Fixed(Fixed::ShortWeekdayName)),
        ('E', 4) => Some(Item::Fixed(Fixed::LongWeekdayName)),
        ('X', 1 | 2) => Some(Item::Fixed(Fixed::TimezoneOffsetZ)),
        ('X', 3) | ('Z', 5) => Some(Item::Fixed(Fixed::TimezoneOffsetColonZ)),
        ('x', 1 | 2) | ('Z', 1..=3) => Some(Item::Fixed(Fixed::TimezoneOffset)),
        ('x', 3) => Some(Item::Fixed(Fixed::TimezoneOffsetColon)),
        _ => None,
    }
}

/// Convert a temporal value to an instant, treating local values as UTC.
fn to_instant(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Date(date) => date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
        Value::DateTime(dt) => Some(dt.and_utc()),
        Value::Instant(instant) => Some(*instant),
        _ => None,
    }
}

fn from_instant(instant: DateTime<Utc>, kind: &ValueKind) -> Option<Value> {
    match kind {
        ValueKind::LocalDate => Some(Value::Date(instant.date_naive())),
        ValueKind::LocalDateTime => Some(Value::DateTime(instant.naive_utc())),
        ValueKind::Instant => Some(Value::Instant(instant)),
        _ => None,
    }
}

fn from_parsed(parsed: &Parsed, kind: &ValueKind) -> Option<Value> {
    if let ValueKind::LocalDate = kind {
        return parsed.to_naive_date().ok().map(Value::Date);
    }
    let instant = match parsed.to_datetime() {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => naive(parsed)?.and_utc(),
    };
    from_instant(instant, kind)
}

/// A date-time without an offset, or a date at midnight when the pattern has no time.
fn naive(parsed: &Parsed) -> Option<NaiveDateTime> {
    parsed
        .to_naive_datetime_with_offset(0)
        .ok()
        .or_else(|| parsed.to_naive_date().ok()?.and_hms_opt(0, 0, 0))
}

impl DateFormatter {
    fn describe(&self) -> &str {
        match self {
            Self::Pattern(pattern) => pattern.source(),
            Self::Lenient(patterns) => patterns.first().map_or("", DatePattern::source),
            Self::EpochMillis => "epoch_millis",
            Self::EpochSecond => "epoch_second",
        }
    }

    fn write(&self, instant: &DateTime<Utc>) -> Option<String> {
        match self {
            Self::Pattern(pattern) => pattern.format(instant),
            Self::Lenient(patterns) => patterns.first()?.format(instant),
            Self::EpochMillis => Some(instant.timestamp_millis().to_string()),
            Self::EpochSecond => Some(instant.timestamp().to_string()),
        }
    }

    fn read(&self, text: &str, kind: &ValueKind) -> Option<Value> {
        match self {
            Self::Pattern(pattern) => from_parsed(&pattern.parse(text)?, kind),
            Self::Lenient(patterns) => patterns
                .iter()
                .find_map(|pattern| from_parsed(&pattern.parse(text)?, kind)),
            Self::EpochMillis => {
                from_instant(DateTime::from_timestamp_millis(text.parse().ok()?)?, kind)
            }
            Self::EpochSecond => {
                from_instant(DateTime::from_timestamp(text.parse().ok()?, 0)?, kind)
            }
        }
    }
}

impl DateConverter {
    /// Build a converter for values of `kind` from formats followed by custom patterns.
    ///
    /// Returns `None` when no format or pattern is usable.
    pub fn new<'a>(
        kind: ValueKind,
        formats: &[DateFormat],
        patterns: impl IntoIterator<Item = &'a str>,
    ) -> Result<Option<Self>> {
        let mut formatters = Vec::new();
        for format in formats {
            match (format, format.pattern()) {
                (DateFormat::EpochMillis, _) => formatters.push(DateFormatter::EpochMillis),
                (DateFormat::EpochSecond, _) => formatters.push(DateFormatter::EpochSecond),
                (DateFormat::DateOptionalTime, _) => formatters.push(DateFormatter::Lenient(
                    OPTIONAL_TIME
                        .iter()
                        .map(|pattern| DatePattern::compile(pattern))
                        .collect::<Result<_>>()?,
                )),
                (_, Some(pattern)) => {
                    formatters.push(DateFormatter::Pattern(DatePattern::compile(pattern)?))
                }
                (_, None) => {}
            }
        }
        for pattern in patterns {
            formatters.push(DateFormatter::Pattern(DatePattern::compile(pattern)?));
        }
        if formatters.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self { kind, formatters }))
    }

    fn expected(&self) -> &'static str {
        match self.kind {
            ValueKind::LocalDate => "a local date",
            ValueKind::LocalDateTime => "a local date-time",
            _ => "an instant",
        }
    }
}

impl PropertyValueConverter for DateConverter {
    fn write(&self, value: &Value) -> std::result::Result<String, ValueError> {
        let instant = to_instant(value).ok_or_else(|| value.mismatch(self.expected()))?;
        self.formatters
            .first()
            .and_then(|f| f.write(&instant))
            .ok_or_else(|| ValueError {
                expected: "a value printable by the first date format",
                found: value.to_string(),
            })
    }

    fn read(&self, text: &str) -> std::result::Result<Value, ValueError> {
        self.formatters
            .iter()
            .find_map(|f| f.read(text, &self.kind))
            .ok_or_else(|| ValueError {
                expected: "text matching a date format",
                found: format!(
                    "{text:?} (tried {})",
                    self.formatters
                        .iter()
                        .map(DateFormatter::describe)
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })
    }
}
