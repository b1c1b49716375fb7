use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Value, json};

use crate::context::MappingContext;
use crate::entity::PersistentEntity;
use crate::field::{DateFormat, Field, FieldSpec, FieldType};
use crate::property::PersistentProperty;
use crate::Result;

/// A document mapping.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Mapping {
    pub properties: IndexMap<String, Property>,
}

/// A mapping property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Property {
    /// A simple, scalar property.
    Leaf(IndexMap<String, Value>),
    /// A sub-document mapping, i.e., an `object` or `nested` field.
    Mapping {
        #[serde(flatten)]
        parameters: IndexMap<String, Value>,
        #[serde(flatten)]
        properties: Mapping,
    },
}

/// Build the index mapping of `entity`.
///
/// Embedded entities are resolved through `context`. An entity that embeds itself, directly or
/// not, is mapped once and its recursive occurrence is left without properties.
pub fn build(context: &MappingContext, entity: &PersistentEntity) -> Result<Mapping> {
    Builder {
        context,
        stack: vec![entity.name().to_string()],
    }
    .mapping(entity)
}

struct Builder<'a> {
    context: &'a MappingContext,
    stack: Vec<String>,
}

impl Builder<'_> {
    fn mapping(&mut self, entity: &PersistentEntity) -> Result<Mapping> {
        let mut mapping = Mapping::default();
        for property in entity.properties().iter().filter(|p| p.is_mapped()) {
            mapping
                .properties
                .insert(property.field_name().to_string(), self.property(property)?);
        }
        Ok(mapping)
    }

    fn property(&mut self, property: &PersistentProperty) -> Result<Property> {
        let field_type = if property.is_id_property() && !property.has_explicit_field_type() {
            FieldType::Keyword
        } else {
            property.field_type()
        };
        let mut parameters = IndexMap::new();
        parameters.insert("type".to_string(), json!(field_type.to_string()));
        if let Some(field) = property.field() {
            field_parameters(field, &mut parameters);
        }
        if property.is_join_field_property() {
            let relations: serde_json::Map<_, _> = property
                .relations()
                .iter()
                .map(|r| (r.parent.clone(), json!(r.children)))
                .collect();
            parameters.insert("relations".to_string(), Value::Object(relations));
        }
        if let FieldSpec::MultiField(multi) = property.spec() {
            let fields: serde_json::Map<_, _> = multi
                .other_fields
                .iter()
                .map(|inner| {
                    let mut parameters = IndexMap::new();
                    parameters.insert("type".to_string(), json!(inner.field.field_type.to_string()));
                    field_parameters(&inner.field, &mut parameters);
                    (inner.suffix.clone(), json!(parameters))
                })
                .collect();
            parameters.insert("fields".to_string(), Value::Object(fields));
        }

        match property.kind().entity() {
            Some(reference) if matches!(field_type, FieldType::Object | FieldType::Nested) => {
                let nested = reference.resolve(self.context)?;
                if self.stack.iter().any(|name| name == nested.name()) {
                    return Ok(Property::Leaf(parameters));
                }
                self.stack.push(nested.name().to_string());
                let properties = self.mapping(&nested)?;
                self.stack.pop();
                Ok(Property::Mapping {
                    parameters,
                    properties,
                })
            }
            _ => Ok(Property::Leaf(parameters)),
        }
    }
}

fn field_parameters(field: &Field, parameters: &mut IndexMap<String, Value>) {
    let mut insert = |key: &str, value: Value| {
        parameters.insert(key.to_string(), value);
    };
    if field.field_type.is_date() && (field.format.is_some() || field.patterns().next().is_some()) {
        let format: Vec<&str> = field
            .date_formats()
            .iter()
            .filter(|f| !matches!(f, DateFormat::None | DateFormat::Custom))
            .map(|f| -> &str { f.name() })
            .chain(field.patterns())
            .collect();
        if !format.is_empty() {
            insert("format", json!(format.join("||")));
        }
    }
    if field.store {
        insert("store", json!(true));
    }
    if let Some(index) = field.index {
        insert("index", json!(index));
    }
    if let Some(doc_values) = field.doc_values {
        insert("doc_values", json!(doc_values));
    }
    if field.fielddata {
        insert("fielddata", json!(true));
    }
    if let Some(analyzer) = &field.analyzer {
        insert("analyzer", json!(analyzer));
    }
    if let Some(search_analyzer) = &field.search_analyzer {
        insert("search_analyzer", json!(search_analyzer));
    }
    if let Some(normalizer) = &field.normalizer {
        insert("normalizer", json!(normalizer));
    }
    if !field.copy_to.is_empty() {
        insert("copy_to", json!(field.copy_to));
    }
    if let Some(ignore_above) = field.ignore_above {
        insert("ignore_above", json!(ignore_above));
    }
    if let Some(null_value) = &field.null_value {
        insert("null_value", null_value.clone());
    }
}
