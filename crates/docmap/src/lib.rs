//! Object-document mapping for a document-oriented search engine.
//!
//! Entity types describe themselves through [`Entity::schema`]. A [`MappingContext`] turns each
//! schema into a [`PersistentEntity`] once, and a [`MappingConverter`] uses those descriptors to
//! write instances to [`Document`]s and read them back.
mod config;
mod context;
mod convert;
mod date;
mod diagnostic;
mod document;
mod entity;
mod error;
mod field;
mod index;
pub mod mapping;
mod mapping_converter;
pub mod naming;
mod property;
pub mod schema;
mod validator;
mod value;

pub use config::MappingConfig;
pub use context::{MappingContext, TypedEntity};
pub use convert::PropertyValueConverter;
pub use date::{DateConverter, DatePattern};
pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use document::{Document, IndexRequest, SearchDocument, SearchHit};
pub use entity::{DocumentMetadata, PersistentEntity};
pub use error::{Error, Result};
pub use field::{DateFormat, Field, FieldSpec, FieldType, InnerField, JoinRelation, MultiField};
pub use index::{
    ExpressionResolver, IndexCoordinates, IndexNameTemplate, NoExpressions, Settings, VersionType,
};
pub use mapping_converter::MappingConverter;
pub use naming::{FieldNamingStrategy, PropertyNameStrategy, SnakeCaseStrategy};
pub use property::{PersistentProperty, PropertyRole};
pub use schema::{
    Access, Arguments, DocumentDefinition, Entity, EntityDefinition, PropertyDefinition, Role,
    Schema,
};
pub use validator::{Check, Validator, validate};
pub use value::{
    Embedded, EntityRef, FieldValue, JoinField, SeqNoPrimaryTerm, Value, ValueError, ValueKind,
};
