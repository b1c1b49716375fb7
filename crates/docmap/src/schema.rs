//! Declarative entity schemas.
//!
//! A domain type describes itself once through [`Entity::schema`]: the properties it persists,
//! how each one is stored, and how values move in and out of an instance. The accessor-free half
//! of a schema is an [`EntityDefinition`], which can also be loaded from JSON.
//!
//! ```
//! use docmap::{Entity, Field, PropertyDefinition, Schema};
//!
//! #[derive(Default)]
//! struct Book {
//!     id: Option<String>,
//!     title: String,
//! }
//!
//! impl Entity for Book {
//!     fn schema() -> Schema<Self> {
//!         Schema::mutable("Book", Book::default)
//!             .property(PropertyDefinition::new("id").id(), |b| &b.id, |b, v| b.id = v)
//!             .property(
//!                 PropertyDefinition::new("title").field(Field::text()),
//!                 |b| &b.title,
//!                 |b, v| b.title = v,
//!             )
//!     }
//! }
//! ```
use indexmap::IndexMap;
use serde::Deserialize;

use crate::field::{FieldSpec, JoinRelation};
use crate::index::{Settings, VersionType};
use crate::value::{FieldValue, Value, ValueError, ValueKind};
use crate::{Error, Result};

/// A domain type that can be mapped to documents.
pub trait Entity: Send + Sync + Sized + 'static {
    fn schema() -> Schema<Self>;
}

/// The special role a property plays for its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Id,
    Version,
}

/// Whether a property travels through the document body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    #[default]
    ReadWrite,
    /// Read from documents but never written.
    ReadOnly,
    /// Written to documents but never read.
    WriteOnly,
    /// Neither read nor written.
    Transient,
}

/// Index-level metadata of an entity stored as a top-level document.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentDefinition {
    /// A literal index name, optionally containing `#{expression}` segments.
    pub index_name: String,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub version_type: VersionType,
    #[serde(default = "default_create_index")]
    pub create_index: bool,
}

fn default_create_index() -> bool {
    true
}

/// A declared property.
#[derive(Debug, Clone, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    pub kind: ValueKind,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub field: FieldSpec,
    /// Relations of a join field.
    #[serde(default)]
    pub relations: Vec<JoinRelation>,
}

/// An entity declaration without accessors.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityDefinition {
    pub name: String,
    #[serde(default)]
    pub document: Option<DocumentDefinition>,
    pub properties: Vec<PropertyDefinition>,
}

/// Reads one property of an instance and, where possible, writes it back.
pub(crate) struct Accessor<T> {
    pub(crate) get: Box<dyn Fn(&T) -> Value + Send + Sync>,
    pub(crate) set: Option<Box<dyn Fn(&mut T, Value) -> std::result::Result<(), ValueError> + Send + Sync>>,
}

/// How instances are created when reading documents.
enum Instantiator<T> {
    /// Start from a fresh instance and call property setters.
    Mutable(Box<dyn Fn() -> T + Send + Sync>),
    /// Pass every property value to a constructor at once.
    Immutable(Box<dyn Fn(&mut Arguments) -> Result<T> + Send + Sync>),
}

/// Constructor arguments of an immutable entity, keyed by declared property name.
#[derive(Debug)]
pub struct Arguments {
    entity: String,
    values: IndexMap<String, Value>,
}

/// The full schema of an entity type: its definition plus accessors.
pub struct Schema<T> {
    definition: EntityDefinition,
    accessors: Vec<Accessor<T>>,
    instantiator: Instantiator<T>,
}

impl DocumentDefinition {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            settings: Settings::default(),
            version_type: VersionType::default(),
            create_index: true,
        }
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn version_type(mut self, version_type: VersionType) -> Self {
        self.version_type = version_type;
        self
    }

    pub fn create_index(mut self, create_index: bool) -> Self {
        self.create_index = create_index;
        self
    }
}

impl PropertyDefinition {
    /// Declare a property. Its kind is set from the Rust field type when it is added to a
    /// [`Schema`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ValueKind::Json,
            role: None,
            access: Access::default(),
            field: FieldSpec::default(),
            relations: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: ValueKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn id(mut self) -> Self {
        self.role = Some(Role::Id);
        self
    }

    pub fn version(mut self) -> Self {
        self.role = Some(Role::Version);
        self
    }

    pub fn field(mut self, field: impl Into<FieldSpec>) -> Self {
        self.field = field.into();
        self
    }

    pub fn relation(mut self, relation: JoinRelation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.access = Access::ReadOnly;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.access = Access::WriteOnly;
        self
    }

    pub fn transient(mut self) -> Self {
        self.access = Access::Transient;
        self
    }
}

impl EntityDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            document: None,
            properties: Vec::new(),
        }
    }
}

impl<T: 'static> Schema<T> {
    /// A schema whose instances start from `new` and are filled in through setters.
    pub fn mutable(name: impl Into<String>, new: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            definition: EntityDefinition::new(name),
            accessors: Vec::new(),
            instantiator: Instantiator::Mutable(Box::new(new)),
        }
    }

    /// A schema whose instances are built by `new` from all property values at once.
    pub fn immutable(
        name: impl Into<String>,
        new: impl Fn(&mut Arguments) -> Result<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            definition: EntityDefinition::new(name),
            accessors: Vec::new(),
            instantiator: Instantiator::Immutable(Box::new(new)),
        }
    }

    /// Store instances as top-level documents.
    pub fn document(mut self, document: DocumentDefinition) -> Self {
        self.definition.document = Some(document);
        self
    }

    /// Add a property with a getter and a setter.
    pub fn property<V: FieldValue + 'static>(
        mut self,
        definition: PropertyDefinition,
        get: impl Fn(&T) -> &V + Send + Sync + 'static,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self {
        self.definition.properties.push(definition.kind(V::kind()));
        self.accessors.push(Accessor {
            get: Box::new(move |t| get(t).to_value()),
            set: Some(Box::new(move |t, value| {
                set(t, V::from_value(value)?);
                Ok(())
            })),
        });
        self
    }

    /// Add a property that is only read from instances.
    ///
    /// On a mutable schema such a property cannot be populated and is never read from documents.
    pub fn property_ro<V: FieldValue + 'static>(
        mut self,
        mut definition: PropertyDefinition,
        get: impl Fn(&T) -> &V + Send + Sync + 'static,
    ) -> Self {
        if let (Instantiator::Mutable(_), Access::ReadWrite) = (&self.instantiator, definition.access) {
            definition.access = Access::WriteOnly;
        }
        self.definition.properties.push(definition.kind(V::kind()));
        self.accessors.push(Accessor {
            get: Box::new(move |t| get(t).to_value()),
            set: None,
        });
        self
    }

    pub fn definition(&self) -> &EntityDefinition {
        &self.definition
    }

    pub fn is_immutable(&self) -> bool {
        matches!(self.instantiator, Instantiator::Immutable(_))
    }

    pub(crate) fn accessor(&self, index: usize) -> &Accessor<T> {
        &self.accessors[index]
    }

    /// Read every property of `instance`, keyed by declared name.
    pub fn values(&self, instance: &T) -> IndexMap<String, Value> {
        self.definition
            .properties
            .iter()
            .zip(&self.accessors)
            .map(|(p, a)| (p.name.clone(), (a.get)(instance)))
            .collect()
    }

    /// Create an instance from property values keyed by declared name.
    ///
    /// Names that are not declared are ignored.
    pub fn instantiate(&self, values: IndexMap<String, Value>) -> Result<T> {
        match &self.instantiator {
            Instantiator::Mutable(new) => {
                let mut instance = new();
                for (name, value) in values {
                    self.set(&mut instance, &name, value)?;
                }
                Ok(instance)
            }
            Instantiator::Immutable(new) => new(&mut Arguments {
                entity: self.definition.name.clone(),
                values,
            }),
        }
    }

    /// Set a single property, rebuilding immutable instances.
    ///
    /// A property without a setter on a mutable schema is an error.
    pub fn with_value(&self, mut instance: T, name: &str, value: Value) -> Result<T> {
        let Some(index) = self.definition.properties.iter().position(|p| p.name == name) else {
            return Err(self.unknown(name));
        };
        match &self.instantiator {
            Instantiator::Mutable(_) => {
                if self.accessors[index].set.is_none() {
                    return Err(Error::ReadOnlyProperty {
                        entity: self.definition.name.clone(),
                        property: name.to_string(),
                    });
                }
                self.set(&mut instance, name, value)?;
                Ok(instance)
            }
            Instantiator::Immutable(_) => {
                let mut values = self.values(&instance);
                values.insert(name.to_string(), value);
                self.instantiate(values)
            }
        }
    }

    fn set(&self, instance: &mut T, name: &str, value: Value) -> Result<()> {
        let Some(index) = self.definition.properties.iter().position(|p| p.name == name) else {
            return Ok(());
        };
        let Some(set) = &self.accessors[index].set else {
            return Ok(());
        };
        let raw = value.to_string();
        set(instance, value).map_err(|err| Error::Conversion {
            entity: self.definition.name.clone(),
            property: name.to_string(),
            value: raw,
            reason: err.to_string(),
        })
    }

    fn unknown(&self, name: &str) -> Error {
        Error::UnknownProperty {
            entity: self.definition.name.clone(),
            property: name.to_string(),
        }
    }
}

impl Arguments {
    /// Take the value of `property`, or its absent value when the document had none.
    pub fn take<V: FieldValue>(&mut self, property: &str) -> Result<V> {
        match self.values.shift_remove(property) {
            Some(value) if !value.is_null() => {
                let raw = value.to_string();
                V::from_value(value).map_err(|err| Error::Conversion {
                    entity: self.entity.clone(),
                    property: property.to_string(),
                    value: raw,
                    reason: err.to_string(),
                })
            }
            _ => V::absent().ok_or_else(|| Error::MissingArgument {
                entity: self.entity.clone(),
                property: property.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::{Access, Arguments, Entity, PropertyDefinition, Schema};
    use crate::value::{Value, ValueKind};
    use crate::{Error, Result};

    #[derive(Debug, Default, PartialEq)]
    struct Mutable {
        name: String,
        count: Option<i32>,
        derived: String,
    }

    impl Entity for Mutable {
        fn schema() -> Schema<Self> {
            Schema::mutable("Mutable", Mutable::default)
                .property(PropertyDefinition::new("name"), |m| &m.name, |m, v| m.name = v)
                .property(PropertyDefinition::new("count"), |m| &m.count, |m, v| m.count = v)
                .property_ro(PropertyDefinition::new("derived"), |m| &m.derived)
        }
    }

    #[derive(Debug, PartialEq)]
    struct Immutable {
        name: String,
        tags: Vec<String>,
    }

    impl Immutable {
        fn new(args: &mut Arguments) -> Result<Self> {
            Ok(Self {
                name: args.take("name")?,
                tags: args.take("tags")?,
            })
        }
    }

    impl Entity for Immutable {
        fn schema() -> Schema<Self> {
            Schema::immutable("Immutable", Immutable::new)
                .property_ro(PropertyDefinition::new("name"), |i| &i.name)
                .property_ro(PropertyDefinition::new("tags"), |i| &i.tags)
        }
    }

    fn values(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_kinds_come_from_field_types() {
        let schema = Mutable::schema();
        let kinds: Vec<_> = schema
            .definition()
            .properties
            .iter()
            .map(|p| p.kind.clone())
            .collect();
        assert_eq!(
            kinds,
            vec![ValueKind::String, ValueKind::Integer, ValueKind::String]
        );
    }

    #[test]
    fn test_read_only_property_on_mutable_schema_is_write_only() {
        let schema = Mutable::schema();
        assert_eq!(schema.definition().properties[2].access, Access::WriteOnly);
        assert!(Immutable::schema().is_immutable());
    }

    #[test]
    fn test_instantiate_mutable() {
        let m = Mutable::schema()
            .instantiate(values(&[
                ("name", Value::String("a".into())),
                ("count", Value::Long(3)),
                ("unknown", Value::Bool(true)),
            ]))
            .unwrap();
        assert_eq!(
            m,
            Mutable {
                name: "a".into(),
                count: Some(3),
                derived: String::new(),
            }
        );
    }

    #[test]
    fn test_instantiate_mutable_wrong_type() {
        let err = Mutable::schema()
            .instantiate(values(&[("name", Value::Long(1))]))
            .unwrap_err();
        assert!(matches!(err, Error::Conversion { ref property, .. } if property == "name"));
    }

    #[test]
    fn test_instantiate_immutable_absent_collection() {
        let i = Immutable::schema()
            .instantiate(values(&[("name", Value::String("a".into()))]))
            .unwrap();
        assert_eq!(
            i,
            Immutable {
                name: "a".into(),
                tags: Vec::new(),
            }
        );
    }

    #[test]
    fn test_instantiate_immutable_missing_required() {
        assert!(matches!(
            Immutable::schema().instantiate(IndexMap::new()).unwrap_err(),
            Error::MissingArgument { .. }
        ));
    }

    #[test]
    fn test_with_value_rebuilds_immutable() {
        let schema = Immutable::schema();
        let i = Immutable {
            name: "a".into(),
            tags: vec!["x".into()],
        };
        let i = schema
            .with_value(i, "name", Value::String("b".into()))
            .unwrap();
        assert_eq!(i.name, "b");
        assert_eq!(i.tags, vec!["x".to_string()]);
    }

    #[test]
    fn test_with_value_unknown_property() {
        let schema = Immutable::schema();
        let i = Immutable {
            name: "a".into(),
            tags: Vec::new(),
        };
        assert!(matches!(
            schema.with_value(i, "nope", Value::Null).unwrap_err(),
            Error::UnknownProperty { .. }
        ));
    }

    #[test]
    fn test_with_value_without_setter() {
        let err = Mutable::schema()
            .with_value(Mutable::default(), "derived", Value::String("x".into()))
            .unwrap_err();
        assert_eq!(
            err,
            Error::ReadOnlyProperty {
                entity: "Mutable".into(),
                property: "derived".into(),
            }
        );
    }
}
