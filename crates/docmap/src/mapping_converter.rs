//! Conversion between entities and documents.
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use indexmap::IndexMap;
use serde_json::Value as Json;

use crate::context::MappingContext;
use crate::document::{Document, IndexRequest, SearchDocument, SearchHit};
use crate::entity::PersistentEntity;
use crate::index::ExpressionResolver;
use crate::property::PersistentProperty;
use crate::schema::Entity;
use crate::value::{JoinField, SeqNoPrimaryTerm, Value, ValueError, ValueKind};
use crate::{Error, Result};

/// Writes entities to documents and reads them back.
///
/// Descriptors come from the shared [`MappingContext`]. No lock is held while accessors or
/// converters run.
#[derive(Clone)]
pub struct MappingConverter {
    context: Arc<MappingContext>,
}

impl MappingConverter {
    pub fn new(context: Arc<MappingContext>) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &Arc<MappingContext> {
        &self.context
    }

    /// Write the writable properties of `instance` in declaration order.
    ///
    /// Absent values are omitted unless the field stores null values.
    pub fn write<T: Entity>(&self, instance: &T) -> Result<Document> {
        let typed = self.context.typed_entity::<T>()?;
        self.write_properties(typed.entity(), |property| {
            (typed.schema().accessor(property.position()).get)(instance)
        })
    }

    /// Read an entity from a document and its envelope.
    ///
    /// The identifier, version and sequence number/primary term come from the envelope. Fields
    /// without a readable property are ignored.
    pub fn read<T: Entity>(&self, document: &SearchDocument) -> Result<T> {
        let typed = self.context.typed_entity::<T>()?;
        let entity = typed.entity();
        let mut values = self.read_properties(entity, |field| document.source.get(field))?;
        if let (Some(property), Some(id)) = (entity.id_property(), &document.id) {
            values.insert(
                property.name().to_string(),
                id_value(entity, property, id)?,
            );
        }
        if let (Some(property), Some(version)) = (entity.version_property(), document.version) {
            values.insert(property.name().to_string(), Value::Long(version));
        }
        if let (Some(property), Some(token)) = (
            entity.seq_no_primary_term_property(),
            document.assigned_seq_no_primary_term(),
        ) {
            values.insert(
                property.name().to_string(),
                Value::SeqNoPrimaryTerm(token),
            );
        }
        typed.schema().instantiate(values)
    }

    pub fn read_hit<T: Entity>(&self, document: &SearchDocument) -> Result<SearchHit<T>> {
        Ok(SearchHit {
            index: document.index.clone(),
            id: document.id.clone(),
            score: document.score,
            sort_values: document.sort_values.clone(),
            content: self.read(document)?,
        })
    }

    /// Build the request that writes `instance` to its index.
    ///
    /// An assigned sequence number and primary term take precedence over the version.
    pub fn index_request<T: Entity>(
        &self,
        instance: &T,
        resolver: &dyn ExpressionResolver,
    ) -> Result<IndexRequest> {
        let typed = self.context.typed_entity::<T>()?;
        let entity = typed.entity();
        let value_of =
            |property: &PersistentProperty| (typed.schema().accessor(property.position()).get)(instance);

        let mut request = IndexRequest {
            index: entity.index_coordinates(resolver)?,
            id: match entity.id_property() {
                Some(property) => id_string(entity, property, value_of(property))?,
                None => None,
            },
            version: None,
            version_type: None,
            if_seq_no: None,
            if_primary_term: None,
            routing: None,
            source: self.write_properties(entity, value_of)?,
        };
        if let Some(Value::SeqNoPrimaryTerm(token)) =
            entity.seq_no_primary_term_property().map(value_of)
        {
            request.if_seq_no = Some(token.seq_no);
            request.if_primary_term = Some(token.primary_term);
        } else if let Some(Value::Long(version)) = entity.version_property().map(value_of) {
            request.version = Some(version);
            request.version_type = Some(entity.version_type());
        }
        if let Some(Value::Join(JoinField {
            parent: Some(parent),
            ..
        })) = entity.join_field_property().map(value_of)
        {
            request.routing = Some(parent);
        }
        tracing::trace!(
            entity = %entity.name(),
            index = %request.index,
            id = request.id.as_deref(),
            "index request"
        );
        Ok(request)
    }

    /// The identifier of `instance` as text.
    pub fn id_of<T: Entity>(&self, instance: &T) -> Result<Option<String>> {
        let typed = self.context.typed_entity::<T>()?;
        let entity = typed.entity();
        match entity.id_property() {
            Some(property) => id_string(
                entity,
                property,
                (typed.schema().accessor(property.position()).get)(instance),
            ),
            None => Ok(None),
        }
    }

    /// Set the identifier assigned by the engine. Immutable instances are rebuilt.
    pub fn populate_id<T: Entity>(&self, instance: T, id: &str) -> Result<T> {
        let typed = self.context.typed_entity::<T>()?;
        let entity = typed.entity();
        match entity.id_property() {
            Some(property) => typed.schema().with_value(
                instance,
                property.name(),
                id_value(entity, property, id)?,
            ),
            None => Ok(instance),
        }
    }

    pub fn populate_version<T: Entity>(&self, instance: T, version: i64) -> Result<T> {
        let typed = self.context.typed_entity::<T>()?;
        match typed.entity().version_property() {
            Some(property) => {
                typed
                    .schema()
                    .with_value(instance, property.name(), Value::Long(version))
            }
            None => Ok(instance),
        }
    }

    /// Set the sequence number and primary term. Unassigned values leave `instance` unchanged.
    pub fn populate_seq_no_primary_term<T: Entity>(
        &self,
        instance: T,
        seq_no: i64,
        primary_term: i64,
    ) -> Result<T> {
        let typed = self.context.typed_entity::<T>()?;
        match (
            typed.entity().seq_no_primary_term_property(),
            SeqNoPrimaryTerm::new(seq_no, primary_term),
        ) {
            (Some(property), Some(token)) => typed.schema().with_value(
                instance,
                property.name(),
                Value::SeqNoPrimaryTerm(token),
            ),
            _ => Ok(instance),
        }
    }

    fn write_properties(
        &self,
        entity: &PersistentEntity,
        mut value_of: impl FnMut(&PersistentProperty) -> Value,
    ) -> Result<Document> {
        let mut document = Document::new();
        for property in entity.properties().iter().filter(|p| p.is_writable()) {
            let value = value_of(property);
            if value.is_null() && !property.store_null_value() {
                continue;
            }
            let json = self.write_value(entity, property, &value)?;
            document.insert(property.field_name(), json);
        }
        Ok(document)
    }

    fn write_value(
        &self,
        entity: &PersistentEntity,
        property: &PersistentProperty,
        value: &Value,
    ) -> Result<Json> {
        match value {
            Value::Null => Ok(Json::Null),
            Value::List(items) => items
                .iter()
                .map(|item| self.write_value(entity, property, item))
                .collect::<Result<Vec<_>>>()
                .map(Json::Array),
            Value::Embedded(embedded) => {
                let reference = embedded.entity();
                let nested = reference.resolve(&self.context)?;
                let mut values = reference.values(&self.context, embedded)?;
                let document = self.write_properties(&nested, |p| {
                    values.shift_remove(p.name()).unwrap_or_default()
                })?;
                Ok(document.into_json())
            }
            Value::Double(f) if !f.is_finite() => Err(conversion(
                entity,
                property,
                value.to_string(),
                ValueError {
                    expected: "a finite number",
                    found: f.to_string(),
                },
            )),
            value => match property.property_converter() {
                Some(converter) => converter
                    .write(value)
                    .map(Json::String)
                    .map_err(|err| conversion(entity, property, value.to_string(), err)),
                None => Ok(value.to_json()),
            },
        }
    }

    fn read_properties<'a>(
        &self,
        entity: &PersistentEntity,
        get: impl Fn(&str) -> Option<&'a Json>,
    ) -> Result<IndexMap<String, Value>> {
        let mut values = IndexMap::new();
        for property in entity.properties().iter().filter(|p| p.is_readable()) {
            if let Some(json) = get(property.field_name()) {
                let value = self.read_value(entity, property, property.kind(), json)?;
                values.insert(property.name().to_string(), value);
            }
        }
        Ok(values)
    }

    fn read_value(
        &self,
        entity: &PersistentEntity,
        property: &PersistentProperty,
        kind: &ValueKind,
        json: &Json,
    ) -> Result<Value> {
        match (kind, json) {
            (_, Json::Null) => Ok(Value::Null),
            (ValueKind::List(element), Json::Array(items)) => items
                .iter()
                .map(|item| self.read_value(entity, property, element, item))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            (ValueKind::List(element), single) => Ok(Value::List(vec![self.read_value(
                entity, property, element, single,
            )?])),
            (ValueKind::Entity(reference), Json::Object(map)) => {
                let nested = reference.resolve(&self.context)?;
                let values = self.read_properties(&nested, |field| map.get(field))?;
                reference
                    .instantiate(&self.context, values)
                    .map(Value::Embedded)
            }
            (kind, json) => {
                let value = match (property.property_converter(), json) {
                    (Some(converter), Json::String(text)) => converter.read(text),
                    (Some(converter), Json::Number(number)) => converter.read(&number.to_string()),
                    _ => decode(kind, json),
                };
                value.map_err(|err| conversion(entity, property, json.to_string(), err))
            }
        }
    }
}

/// Decode a JSON value without a property converter.
fn decode(kind: &ValueKind, json: &Json) -> std::result::Result<Value, ValueError> {
    let mismatch = |expected: &'static str| ValueError {
        expected,
        found: json.to_string(),
    };
    match kind {
        ValueKind::Boolean => json.as_bool().map(Value::Bool).ok_or_else(|| mismatch("a boolean")),
        ValueKind::Integer | ValueKind::Long => {
            json.as_i64().map(Value::Long).ok_or_else(|| mismatch("an integer"))
        }
        ValueKind::Float | ValueKind::Double => {
            json.as_f64().map(Value::Double).ok_or_else(|| mismatch("a number"))
        }
        ValueKind::String => json
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| mismatch("a string")),
        ValueKind::LocalDate => json
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
            .map(Value::Date)
            .ok_or_else(|| mismatch("an ISO-8601 date")),
        ValueKind::LocalDateTime => json
            .as_str()
            .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok())
            .map(Value::DateTime)
            .ok_or_else(|| mismatch("an ISO-8601 date-time")),
        ValueKind::Instant => json
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|instant| Value::Instant(instant.with_timezone(&Utc)))
            .ok_or_else(|| mismatch("an RFC 3339 instant")),
        ValueKind::Json => Ok(Value::Json(json.clone())),
        ValueKind::Join => match json {
            Json::String(name) => Ok(Value::Join(JoinField::new(name.clone()))),
            other => serde_json::from_value(other.clone())
                .map(Value::Join)
                .map_err(|_| mismatch("a join field")),
        },
        ValueKind::SeqNoPrimaryTerm => serde_json::from_value(json.clone())
            .map(Value::SeqNoPrimaryTerm)
            .map_err(|_| mismatch("a seq_no/primary_term")),
        ValueKind::Entity(_) => Err(mismatch("an object")),
        ValueKind::List(_) => Err(mismatch("a list")),
    }
}

fn id_value(entity: &PersistentEntity, property: &PersistentProperty, id: &str) -> Result<Value> {
    match property.kind() {
        ValueKind::Long | ValueKind::Integer => id.parse().map(Value::Long).map_err(|_| {
            conversion(
                entity,
                property,
                id.to_string(),
                ValueError {
                    expected: "an integer identifier",
                    found: id.to_string(),
                },
            )
        }),
        _ => Ok(Value::String(id.to_string())),
    }
}

fn id_string(
    entity: &PersistentEntity,
    property: &PersistentProperty,
    value: Value,
) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(id) => Ok(Some(id)),
        Value::Long(id) => Ok(Some(id.to_string())),
        other => Err(conversion(
            entity,
            property,
            other.to_string(),
            other.mismatch("a string or integer identifier"),
        )),
    }
}

fn conversion(
    entity: &PersistentEntity,
    property: &PersistentProperty,
    value: String,
    err: ValueError,
) -> Error {
    Error::Conversion {
        entity: entity.name().to_string(),
        property: property.name().to_string(),
        value,
        reason: err.to_string(),
    }
}
