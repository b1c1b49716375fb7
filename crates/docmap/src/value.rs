//! In-memory property values.
//!
//! Accessors move property values in and out of domain objects as [`Value`]s. The [`FieldValue`]
//! trait binds a Rust field type to its [`ValueKind`], which is how special properties (such as
//! [`SeqNoPrimaryTerm`]) are recognised.
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::context::MappingContext;
use crate::entity::PersistentEntity;
use crate::schema::Entity;
use crate::{Error, Result};

/// A dynamically typed property value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    String(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Instant(DateTime<Utc>),
    List(Vec<Value>),
    /// An embedded entity instance.
    Embedded(Embedded),
    Join(JoinField),
    SeqNoPrimaryTerm(SeqNoPrimaryTerm),
    Json(serde_json::Value),
}

/// The declared semantic type of a property.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Boolean,
    Integer,
    Long,
    Float,
    Double,
    String,
    LocalDate,
    LocalDateTime,
    /// A point on the UTC time line.
    Instant,
    Json,
    #[serde(skip_deserializing)]
    Entity(EntityRef),
    List(Box<ValueKind>),
    Join,
    SeqNoPrimaryTerm,
}

/// A reference to an embedded entity type.
///
/// Resolving the reference re-queries the [`MappingContext`], so a descriptor never owns the
/// descriptors of the types it embeds. Embedded instances are read and built through the schema
/// cached in the context.
#[derive(Clone, Copy)]
pub struct EntityRef {
    type_id: TypeId,
    name: &'static str,
    resolve: fn(&MappingContext) -> Result<Arc<PersistentEntity>>,
    values: fn(&MappingContext, &Embedded) -> Result<IndexMap<String, Value>>,
    instantiate: fn(&MappingContext, IndexMap<String, Value>) -> Result<Embedded>,
}

/// A type-erased instance of an embedded entity.
///
/// Two embedded values are equal only if they share the same instance.
#[derive(Clone)]
pub struct Embedded {
    entity: EntityRef,
    instance: Arc<dyn Any + Send + Sync>,
}

/// Engine-native optimistic concurrency token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeqNoPrimaryTerm {
    pub seq_no: i64,
    pub primary_term: i64,
}

/// The value of a join field: the relation name and, for children, the parent id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// A value does not have the shape its field type expects.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("expected {expected}, found {found}")]
pub struct ValueError {
    pub expected: &'static str,
    pub found: String,
}

/// A Rust type that can be stored in an entity property.
pub trait FieldValue: Sized {
    fn kind() -> ValueKind;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> std::result::Result<Self, ValueError>;

    /// The value bound when a document has no value for the property.
    ///
    /// `None` means the property is required by immutable constructors.
    fn absent() -> Option<Self> {
        None
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Render the value as JSON without any property converter.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => json!(b),
            Self::Long(i) => json!(i),
            Self::Double(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(s) => json!(s),
            Self::Date(d) => json!(d.format("%Y-%m-%d").to_string()),
            Self::DateTime(dt) => json!(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Self::Instant(i) => json!(i.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Embedded(embedded) => json!(format!("<{}>", embedded.entity.name)),
            Self::Join(join) => json!(join),
            Self::SeqNoPrimaryTerm(s) => json!(s),
            Self::Json(v) => v.clone(),
        }
    }

    pub(crate) fn mismatch(&self, expected: &'static str) -> ValueError {
        ValueError {
            expected,
            found: self.to_json().to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl ValueKind {
    /// The element kind of a collection, or the kind itself.
    pub fn element(&self) -> &ValueKind {
        match self {
            Self::List(inner) => inner.element(),
            kind => kind,
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Self::List(_))
    }

    pub fn is_temporal(&self) -> bool {
        matches!(
            self.element(),
            Self::LocalDate | Self::LocalDateTime | Self::Instant
        )
    }

    pub fn entity(&self) -> Option<&EntityRef> {
        match self.element() {
            Self::Entity(entity) => Some(entity),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean => f.write_str("boolean"),
            Self::Integer => f.write_str("integer"),
            Self::Long => f.write_str("long"),
            Self::Float => f.write_str("float"),
            Self::Double => f.write_str("double"),
            Self::String => f.write_str("string"),
            Self::LocalDate => f.write_str("local date"),
            Self::LocalDateTime => f.write_str("local date-time"),
            Self::Instant => f.write_str("instant"),
            Self::Json => f.write_str("json"),
            Self::Entity(entity) => write!(f, "entity {}", entity.name),
            Self::List(inner) => write!(f, "list of {inner}"),
            Self::Join => f.write_str("join field"),
            Self::SeqNoPrimaryTerm => f.write_str("seq_no/primary_term"),
        }
    }
}

impl EntityRef {
    pub fn of<E: Entity>() -> Self {
        Self {
            type_id: TypeId::of::<E>(),
            name: std::any::type_name::<E>(),
            resolve: resolve_entity::<E>,
            values: embedded_values::<E>,
            instantiate: instantiate_embedded::<E>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Look up the referenced descriptor in `context`, building it on first use.
    pub fn resolve(&self, context: &MappingContext) -> Result<Arc<PersistentEntity>> {
        (self.resolve)(context)
    }

    /// Read every property of an embedded instance, keyed by declared name.
    pub fn values(
        &self,
        context: &MappingContext,
        embedded: &Embedded,
    ) -> Result<IndexMap<String, Value>> {
        (self.values)(context, embedded)
    }

    /// Build an embedded instance from property values keyed by declared name.
    pub fn instantiate(
        &self,
        context: &MappingContext,
        values: IndexMap<String, Value>,
    ) -> Result<Embedded> {
        (self.instantiate)(context, values)
    }
}

fn resolve_entity<E: Entity>(context: &MappingContext) -> Result<Arc<PersistentEntity>> {
    Ok(context.typed_entity::<E>()?.entity().clone())
}

fn embedded_values<E: Entity>(
    context: &MappingContext,
    embedded: &Embedded,
) -> Result<IndexMap<String, Value>> {
    let instance = embedded
        .instance
        .downcast_ref::<E>()
        .ok_or_else(|| Error::UnexpectedType {
            expected: std::any::type_name::<E>(),
            found: embedded.entity.name,
        })?;
    Ok(context.typed_entity::<E>()?.schema().values(instance))
}

fn instantiate_embedded<E: Entity>(
    context: &MappingContext,
    values: IndexMap<String, Value>,
) -> Result<Embedded> {
    let instance = context.typed_entity::<E>()?.schema().instantiate(values)?;
    Ok(Embedded::new(instance))
}

impl Embedded {
    pub fn new<E: Entity>(instance: E) -> Self {
        Self {
            entity: EntityRef::of::<E>(),
            instance: Arc::new(instance),
        }
    }

    /// The entity type of the instance.
    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    /// Take an embedded instance out of `value`, cloning it if it is still shared.
    pub fn take<E: Entity + Clone>(value: Value) -> std::result::Result<E, ValueError> {
        let Value::Embedded(embedded) = value else {
            return Err(value.mismatch("an embedded entity"));
        };
        let found = embedded.entity.name;
        embedded
            .instance
            .downcast::<E>()
            .map(Arc::unwrap_or_clone)
            .map_err(|_| ValueError {
                expected: std::any::type_name::<E>(),
                found: found.to_string(),
            })
    }
}

impl fmt::Debug for Embedded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Embedded").field(&self.entity.name).finish()
    }
}

impl PartialEq for Embedded {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityRef").field(&self.name).finish()
    }
}

impl PartialEq for EntityRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl SeqNoPrimaryTerm {
    /// Returns `None` for the unassigned markers the engine reports (negative sequence number or
    /// a primary term below one).
    pub fn new(seq_no: i64, primary_term: i64) -> Option<Self> {
        (seq_no >= 0 && primary_term >= 1).then_some(Self {
            seq_no,
            primary_term,
        })
    }
}

impl JoinField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
        }
    }

    pub fn child(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent.into()),
        }
    }
}

macro_rules! scalar_field_value {
    ($ty:ty, $kind:ident, $variant:ident, $expected:expr) => {
        impl FieldValue for $ty {
            fn kind() -> ValueKind {
                ValueKind::$kind
            }

            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }

            fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(other.mismatch($expected)),
                }
            }
        }
    };
}

scalar_field_value!(bool, Boolean, Bool, "a boolean");
scalar_field_value!(i64, Long, Long, "a long");
scalar_field_value!(String, String, String, "a string");
scalar_field_value!(NaiveDate, LocalDate, Date, "a local date");
scalar_field_value!(NaiveDateTime, LocalDateTime, DateTime, "a local date-time");
scalar_field_value!(DateTime<Utc>, Instant, Instant, "an instant");
scalar_field_value!(JoinField, Join, Join, "a join field");
scalar_field_value!(SeqNoPrimaryTerm, SeqNoPrimaryTerm, SeqNoPrimaryTerm, "a seq_no/primary_term");
scalar_field_value!(serde_json::Value, Json, Json, "a JSON value");

impl FieldValue for i32 {
    fn kind() -> ValueKind {
        ValueKind::Integer
    }

    fn to_value(&self) -> Value {
        Value::Long(i64::from(*self))
    }

    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::Long(v) => i32::try_from(v).map_err(|_| Value::Long(v).mismatch("an integer")),
            other => Err(other.mismatch("an integer")),
        }
    }
}

impl FieldValue for f64 {
    fn kind() -> ValueKind {
        ValueKind::Double
    }

    fn to_value(&self) -> Value {
        Value::Double(*self)
    }

    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::Double(v) => Ok(v),
            Value::Long(v) => Ok(v as f64),
            other => Err(other.mismatch("a double")),
        }
    }
}

impl FieldValue for f32 {
    fn kind() -> ValueKind {
        ValueKind::Float
    }

    fn to_value(&self) -> Value {
        Value::Double(f64::from(*self))
    }

    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        f64::from_value(value).map(|v| v as f32)
    }
}

impl<V: FieldValue> FieldValue for Option<V> {
    fn kind() -> ValueKind {
        V::kind()
    }

    fn to_value(&self) -> Value {
        self.as_ref().map(V::to_value).unwrap_or_default()
    }

    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            value => V::from_value(value).map(Some),
        }
    }

    fn absent() -> Option<Self> {
        Some(None)
    }
}

impl<V: FieldValue> FieldValue for Vec<V> {
    fn kind() -> ValueKind {
        ValueKind::List(Box::new(V::kind()))
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(V::to_value).collect())
    }

    fn from_value(value: Value) -> std::result::Result<Self, ValueError> {
        match value {
            Value::List(items) => items.into_iter().map(V::from_value).collect(),
            Value::Null => Ok(Vec::new()),
            other => Err(other.mismatch("a list")),
        }
    }

    fn absent() -> Option<Self> {
        Some(Vec::new())
    }
}

/// Implement [`FieldValue`] for a `Clone` [`Entity`] so it can be embedded in another entity as
/// an `object` or `nested` property.
#[macro_export]
macro_rules! embedded {
    ($ty:ty) => {
        impl $crate::FieldValue for $ty {
            fn kind() -> $crate::ValueKind {
                $crate::ValueKind::Entity($crate::EntityRef::of::<$ty>())
            }

            fn to_value(&self) -> $crate::Value {
                $crate::Value::Embedded($crate::Embedded::new(self.clone()))
            }

            fn from_value(
                value: $crate::Value,
            ) -> ::std::result::Result<Self, $crate::ValueError> {
                $crate::Embedded::take(value)
            }
        }
    };
}
