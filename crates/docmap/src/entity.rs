//! Persistent entity descriptors.
use std::collections::HashMap;

use crate::config::MappingConfig;
use crate::field::JoinRelation;
use crate::index::{ExpressionResolver, IndexCoordinates, IndexNameTemplate, Settings, VersionType};
use crate::property::{PersistentProperty, PropertyRole};
use crate::schema::EntityDefinition;
use crate::validator;
use crate::{Error, Result};

/// Index metadata of an entity stored as top-level documents.
#[derive(Debug, Clone)]
pub struct DocumentMetadata {
    pub index_name: IndexNameTemplate,
    pub settings: Settings,
    pub version_type: VersionType,
    pub create_index: bool,
}

/// The mapping metadata of one entity type.
///
/// Built once from an [`EntityDefinition`] and immutable afterwards.
#[derive(Debug, Clone)]
pub struct PersistentEntity {
    name: String,
    properties: Vec<PersistentProperty>,
    by_name: HashMap<String, usize>,
    by_field_name: HashMap<String, usize>,
    id: Option<usize>,
    version: Option<usize>,
    seq_no_primary_term: Option<usize>,
    join: Option<usize>,
    document: Option<DocumentMetadata>,
}

impl PersistentEntity {
    pub fn build(definition: &EntityDefinition, config: &MappingConfig) -> Result<Self> {
        let name = definition.name.clone();
        let mut properties = definition
            .properties
            .iter()
            .enumerate()
            .map(|(i, p)| PersistentProperty::build(&name, i, p, config))
            .collect::<Result<Vec<_>>>()?;

        let mut by_name = HashMap::new();
        for (i, property) in properties.iter().enumerate() {
            if let Some(other) = by_name.insert(property.name().to_string(), i) {
                return Err(Error::InvalidConfiguration {
                    entity: name.clone(),
                    property: property.name().to_string(),
                    reason: format!("declared twice (positions {other} and {i})"),
                });
            }
        }

        if !properties.iter().any(PersistentProperty::is_id_property)
            && let Some(property) = properties
                .iter_mut()
                .find(|p| p.is_implicit_id_candidate())
        {
            property.promote_to_id();
        }

        let id = unique_role(&name, &properties, PropertyRole::Id)?;
        let version = unique_role(&name, &properties, PropertyRole::Version)?;
        let seq_no_primary_term = unique_role(&name, &properties, PropertyRole::SeqNoPrimaryTerm)?;
        let join = unique_role(&name, &properties, PropertyRole::Join)?;

        let mut by_field_name = HashMap::new();
        for (i, property) in properties.iter().enumerate() {
            if !(property.is_readable() || property.is_writable()) {
                continue;
            }
            if let Some(other) = by_field_name.insert(property.field_name().to_string(), i) {
                return Err(Error::DuplicateFieldName {
                    entity: name.clone(),
                    field: property.field_name().to_string(),
                    current: property.name().to_string(),
                    other: properties[other].name().to_string(),
                });
            }
        }

        let document = definition
            .document
            .as_ref()
            .map(|d| -> Result<_> {
                Ok(DocumentMetadata {
                    index_name: IndexNameTemplate::parse(&d.index_name)?,
                    settings: d.settings.clone(),
                    version_type: d.version_type,
                    create_index: d.create_index,
                })
            })
            .transpose()?;

        let entity = Self {
            name,
            properties,
            by_name,
            by_field_name,
            id,
            version,
            seq_no_primary_term,
            join,
            document,
        };

        for diagnostic in validator::validate(&entity, config.strict) {
            if diagnostic.is_error() {
                return Err(Error::InvalidFieldName {
                    entity: entity.name.clone(),
                    message: diagnostic.to_string(),
                });
            }
            tracing::warn!(entity = %entity.name, "{diagnostic}");
        }

        tracing::debug!(
            entity = %entity.name,
            properties = entity.properties.len(),
            id = entity.id_property().map(PersistentProperty::name),
            "built persistent entity"
        );
        Ok(entity)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Properties in declaration order.
    pub fn properties(&self) -> &[PersistentProperty] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PersistentProperty> {
        self.by_name.get(name).map(|&i| &self.properties[i])
    }

    /// The readable or writable property stored under `field_name`.
    pub fn property_by_field_name(&self, field_name: &str) -> Option<&PersistentProperty> {
        self.by_field_name
            .get(field_name)
            .map(|&i| &self.properties[i])
    }

    pub fn id_property(&self) -> Option<&PersistentProperty> {
        self.id.map(|i| &self.properties[i])
    }

    pub fn version_property(&self) -> Option<&PersistentProperty> {
        self.version.map(|i| &self.properties[i])
    }

    pub fn seq_no_primary_term_property(&self) -> Option<&PersistentProperty> {
        self.seq_no_primary_term.map(|i| &self.properties[i])
    }

    pub fn join_field_property(&self) -> Option<&PersistentProperty> {
        self.join.map(|i| &self.properties[i])
    }

    pub fn has_version_property(&self) -> bool {
        self.version.is_some()
    }

    pub fn has_seq_no_primary_term_property(&self) -> bool {
        self.seq_no_primary_term.is_some()
    }

    pub fn join_relations(&self) -> &[JoinRelation] {
        self.join_field_property()
            .map(PersistentProperty::relations)
            .unwrap_or_default()
    }

    /// Whether instances are stored as top-level documents.
    pub fn is_document(&self) -> bool {
        self.document.is_some()
    }

    pub fn document(&self) -> Option<&DocumentMetadata> {
        self.document.as_ref()
    }

    pub fn index_name(&self) -> Option<&IndexNameTemplate> {
        self.document.as_ref().map(|d| &d.index_name)
    }

    /// Resolve the index name. Expressions are evaluated on every call.
    pub fn index_coordinates(&self, resolver: &dyn ExpressionResolver) -> Result<IndexCoordinates> {
        self.index_name()
            .ok_or_else(|| Error::MissingIndexName(self.name.clone()))?
            .resolve(resolver)
    }

    pub fn settings(&self) -> Option<&Settings> {
        self.document.as_ref().map(|d| &d.settings)
    }

    pub fn version_type(&self) -> VersionType {
        self.document
            .as_ref()
            .map(|d| d.version_type)
            .unwrap_or_default()
    }

    pub fn create_index(&self) -> bool {
        self.document.as_ref().is_some_and(|d| d.create_index)
    }
}

fn unique_role(
    entity: &str,
    properties: &[PersistentProperty],
    role: PropertyRole,
) -> Result<Option<usize>> {
    let mut found: Option<usize> = None;
    for (i, property) in properties.iter().enumerate() {
        if property.role() != role {
            continue;
        }
        if let Some(other) = found {
            return Err(Error::DuplicateRole {
                entity: entity.to_string(),
                role: role.name(),
                current: property.name().to_string(),
                other: properties[other].name().to_string(),
            });
        }
        found = Some(i);
    }
    Ok(found)
}
