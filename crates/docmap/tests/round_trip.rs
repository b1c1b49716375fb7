use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use docmap::{
    DateFormat, Document, Entity, Error, Field, InnerField, MappingContext, MappingConverter,
    MultiField, PropertyDefinition, Schema, SearchDocument, embedded,
};
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq)]
struct Author {
    name: String,
    born: Option<NaiveDate>,
}

embedded!(Author);

impl Entity for Author {
    fn schema() -> Schema<Self> {
        Schema::mutable("Author", Author::default)
            .property(PropertyDefinition::new("name"), |a| &a.name, |a, v| a.name = v)
            .property(PropertyDefinition::new("born"), |a| &a.born, |a, v| a.born = v)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Book {
    id: Option<String>,
    title: Option<String>,
    pages: i32,
    price: f64,
    available: bool,
    published: Option<NaiveDate>,
    last_modified: Option<DateTime<Utc>>,
    reading_dates: Vec<NaiveDate>,
    created: Option<NaiveDateTime>,
    tags: Vec<String>,
    authors: Vec<Author>,
    metadata: Option<serde_json::Value>,
}

impl Entity for Book {
    fn schema() -> Schema<Self> {
        Schema::mutable("Book", Book::default)
            .property(PropertyDefinition::new("id"), |b| &b.id, |b, v| b.id = v)
            .property(
                PropertyDefinition::new("title").field(
                    MultiField::new(Field::text())
                        .inner(InnerField::new("raw", Field::keyword())),
                ),
                |b| &b.title,
                |b, v| b.title = v,
            )
            .property(PropertyDefinition::new("pages"), |b| &b.pages, |b, v| b.pages = v)
            .property(PropertyDefinition::new("price"), |b| &b.price, |b, v| b.price = v)
            .property(
                PropertyDefinition::new("available"),
                |b| &b.available,
                |b, v| b.available = v,
            )
            .property(
                PropertyDefinition::new("published")
                    .field(Field::date().format([]).pattern("dd.MM.uuuu")),
                |b| &b.published,
                |b, v| b.published = v,
            )
            .property(
                PropertyDefinition::new("lastModified")
                    .field(Field::date().format([DateFormat::BasicDateTime])),
                |b| &b.last_modified,
                |b, v| b.last_modified = v,
            )
            .property(
                PropertyDefinition::new("readingDates")
                    .field(Field::date().format([]).pattern("dd.MM.uuuu")),
                |b| &b.reading_dates,
                |b, v| b.reading_dates = v,
            )
            .property(
                PropertyDefinition::new("created").field(Field::date()),
                |b| &b.created,
                |b, v| b.created = v,
            )
            .property(PropertyDefinition::new("tags"), |b| &b.tags, |b, v| b.tags = v)
            .property(
                PropertyDefinition::new("authors").field(Field::nested()),
                |b| &b.authors,
                |b, v| b.authors = v,
            )
            .property(
                PropertyDefinition::new("metadata"),
                |b| &b.metadata,
                |b, v| b.metadata = v,
            )
    }
}

fn converter() -> MappingConverter {
    MappingConverter::new(Arc::new(MappingContext::default()))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn hobbit() -> Book {
    Book {
        id: Some("1".into()),
        title: Some("The Hobbit".into()),
        pages: 310,
        price: 9.5,
        available: true,
        published: Some(date(1937, 9, 21)),
        last_modified: Some(Utc.with_ymd_and_hms(2020, 4, 19, 19, 44, 0).unwrap()),
        reading_dates: vec![date(2019, 12, 27), date(2020, 1, 1)],
        created: Some(date(2020, 1, 1).and_hms_opt(10, 0, 0).unwrap()),
        tags: vec!["fantasy".into()],
        authors: vec![Author {
            name: "J. R. R. Tolkien".into(),
            born: Some(date(1892, 1, 3)),
        }],
        metadata: Some(json!({"source": "import"})),
    }
}

#[test]
fn test_write_document() {
    let document = converter().write(&hobbit()).unwrap();
    assert_eq!(
        document.keys().collect::<Vec<_>>(),
        vec![
            "id",
            "title",
            "pages",
            "price",
            "available",
            "published",
            "lastModified",
            "readingDates",
            "created",
            "tags",
            "authors",
            "metadata",
        ]
    );
    assert_eq!(
        document.into_json(),
        json!({
            "id": "1",
            "title": "The Hobbit",
            "pages": 310,
            "price": 9.5,
            "available": true,
            "published": "21.09.1937",
            "lastModified": "20200419T194400.000Z",
            "readingDates": ["27.12.2019", "01.01.2020"],
            "created": "2020-01-01T10:00:00.000Z",
            "tags": ["fantasy"],
            "authors": [{"name": "J. R. R. Tolkien", "born": "1892-01-03"}],
            "metadata": {"source": "import"}
        })
    );
}

#[test]
fn test_round_trip() {
    let converter = converter();
    let book = hobbit();
    let document = converter.write(&book).unwrap();
    let read: Book = converter.read(&SearchDocument::new(document)).unwrap();
    assert_eq!(read, book);
}

#[test]
fn test_round_trip_through_json_text() {
    let converter = converter();
    let book = hobbit();
    let text = converter.write(&book).unwrap().to_json().unwrap();
    let read: Book = converter
        .read(&SearchDocument::new(Document::from_json(&text).unwrap()))
        .unwrap();
    assert_eq!(read, book);
}

#[test]
fn test_absent_values_read_as_no_value() {
    let book = Book {
        id: Some("2".into()),
        ..Book::default()
    };
    let converter = converter();
    let document = converter.write(&book).unwrap();
    assert!(!document.contains_key("title"));
    assert!(!document.contains_key("published"));
    let read: Book = converter.read(&SearchDocument::new(document)).unwrap();
    assert_eq!(read, book);
}

#[test]
fn test_custom_pattern_reads_written_text() {
    let source = Document::from_json(r#"{"published": "27.12.2019"}"#).unwrap();
    let book: Book = converter().read(&SearchDocument::new(source)).unwrap();
    assert_eq!(book.published, Some(date(2019, 12, 27)));
}

#[test]
fn test_single_value_into_collection() {
    let source = Document::from_json(r#"{"readingDates": "27.12.2019"}"#).unwrap();
    let book: Book = converter().read(&SearchDocument::new(source)).unwrap();
    assert_eq!(book.reading_dates, vec![date(2019, 12, 27)]);
}

#[test]
fn test_default_date_formats_accept_epoch_millis() {
    let source = Document::from_json(r#"{"created": 1577872800000}"#).unwrap();
    let book: Book = converter().read(&SearchDocument::new(source)).unwrap();
    assert_eq!(
        book.created,
        Some(date(2020, 1, 1).and_hms_opt(10, 0, 0).unwrap())
    );
}

#[test]
fn test_unparsable_collection_element() {
    let source = Document::from_json(r#"{"readingDates": ["27.12.2019", "tomorrow"]}"#).unwrap();
    let err = converter()
        .read::<Book>(&SearchDocument::new(source))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Conversion { ref property, ref value, .. }
            if property == "readingDates" && value == r#""tomorrow""#
    ));
}

#[test]
fn test_default_date_formats_accept_optional_time() {
    let cases = [
        ("2020-01-01", date(2020, 1, 1).and_hms_opt(0, 0, 0)),
        ("2020-01-01T10:00:00Z", date(2020, 1, 1).and_hms_opt(10, 0, 0)),
        ("2020-01-01T10:00:00.500Z", date(2020, 1, 1).and_hms_milli_opt(10, 0, 0, 500)),
    ];
    for (text, expected) in cases {
        let source = Document::from_json(&json!({ "created": text }).to_string()).unwrap();
        let book: Book = converter().read(&SearchDocument::new(source)).unwrap();
        assert_eq!(book.created, expected, "{text}");
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Reading {
    at: Option<NaiveDateTime>,
    seen: Option<DateTime<Utc>>,
}

impl Entity for Reading {
    fn schema() -> Schema<Self> {
        Schema::mutable("Reading", Reading::default)
            .property(PropertyDefinition::new("at"), |r| &r.at, |r, v| r.at = v)
            .property(PropertyDefinition::new("seen"), |r| &r.seen, |r, v| r.seen = v)
    }
}

#[test]
fn test_sub_millisecond_precision_round_trip() {
    let converter = converter();
    let reading = Reading {
        at: date(2020, 1, 1).and_hms_micro_opt(10, 0, 0, 123_456),
        seen: Some(
            date(2020, 1, 1)
                .and_hms_nano_opt(10, 0, 0, 123_456_789)
                .unwrap()
                .and_utc(),
        ),
    };
    let document = converter.write(&reading).unwrap();
    assert_eq!(
        document.clone().into_json(),
        json!({
            "at": "2020-01-01T10:00:00.123456",
            "seen": "2020-01-01T10:00:00.123456789Z"
        })
    );
    let read: Reading = converter.read(&SearchDocument::new(document)).unwrap();
    assert_eq!(read, reading);
}
