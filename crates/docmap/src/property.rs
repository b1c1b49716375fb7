//! Property descriptors.
use std::sync::Arc;

use crate::config::MappingConfig;
use crate::convert::{self, PropertyValueConverter};
use crate::field::{Field, FieldSpec, FieldType, JoinRelation};
use crate::naming;
use crate::schema::{Access, PropertyDefinition, Role};
use crate::value::ValueKind;
use crate::{Error, Result};

/// The role a property plays in its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyRole {
    Plain,
    Id,
    Version,
    SeqNoPrimaryTerm,
    Join,
}

/// Mapping metadata of one declared property, derived once from its definition.
#[derive(Debug, Clone)]
pub struct PersistentProperty {
    position: usize,
    name: String,
    field_name: String,
    kind: ValueKind,
    field_type: FieldType,
    spec: FieldSpec,
    relations: Vec<JoinRelation>,
    role: PropertyRole,
    access: Access,
    converter: Option<Arc<dyn PropertyValueConverter>>,
}

impl PropertyRole {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Plain => "a plain property",
            Self::Id => "an identifier",
            Self::Version => "a version",
            Self::SeqNoPrimaryTerm => "a seq_no/primary_term",
            Self::Join => "a join field",
        }
    }
}

impl PersistentProperty {
    /// Build the descriptor of the property declared at `position` of `entity`.
    pub fn build(
        entity: &str,
        position: usize,
        definition: &PropertyDefinition,
        config: &MappingConfig,
    ) -> Result<Self> {
        let name = definition.name.as_str();
        let kind = &definition.kind;
        let invalid = |reason: &str| Error::InvalidConfiguration {
            entity: entity.to_string(),
            property: name.to_string(),
            reason: reason.to_string(),
        };
        let unsupported = |field_type: FieldType| Error::UnsupportedFieldType {
            entity: entity.to_string(),
            property: name.to_string(),
            field_type: field_type.to_string(),
        };

        let main = definition.field.main_field();
        let field_name = naming::resolve(
            config.naming.as_ref(),
            name,
            main.and_then(|f| f.name.as_deref()),
        );

        let role = match (definition.role, kind.element()) {
            (Some(Role::Id), _) => PropertyRole::Id,
            (Some(Role::Version), _) => PropertyRole::Version,
            (None, ValueKind::SeqNoPrimaryTerm) => PropertyRole::SeqNoPrimaryTerm,
            (None, ValueKind::Join) => PropertyRole::Join,
            (None, _) => PropertyRole::Plain,
        };
        match role {
            PropertyRole::Id if !is_identifier_kind(kind) => {
                return Err(invalid("an identifier must hold a string or an integer"));
            }
            PropertyRole::Version if !matches!(kind, ValueKind::Long | ValueKind::Integer) => {
                return Err(invalid("a version must hold an integer"));
            }
            PropertyRole::SeqNoPrimaryTerm | PropertyRole::Join if kind.is_collection() => {
                return Err(invalid("must not be a collection"));
            }
            PropertyRole::Join if definition.relations.is_empty() => {
                return Err(invalid("a join field must declare at least one relation"));
            }
            _ => {}
        }
        if role != PropertyRole::Join && !definition.relations.is_empty() {
            return Err(invalid("relations are only allowed on a join field"));
        }

        let declared = main.map(|f| f.field_type).unwrap_or_default();
        if !declared.accepts(kind) {
            return Err(unsupported(declared));
        }
        let field_type = match declared {
            FieldType::Auto => FieldType::infer(kind).unwrap_or_default(),
            declared => declared,
        };

        if let FieldSpec::MultiField(multi) = &definition.field {
            for inner in &multi.other_fields {
                if inner.suffix.trim().is_empty() {
                    return Err(invalid("inner fields must have a suffix"));
                }
                match inner.field.field_type {
                    FieldType::Auto => {
                        return Err(invalid("inner fields must declare a type"));
                    }
                    t if t.is_object() || t == FieldType::Join => return Err(unsupported(t)),
                    _ => {}
                }
            }
        }

        let converter = match role {
            PropertyRole::Plain | PropertyRole::Id => convert::resolve(entity, name, kind, main)?,
            _ => None,
        };

        Ok(Self {
            position,
            name: name.to_string(),
            field_name,
            kind: kind.clone(),
            field_type,
            spec: definition.field.clone(),
            relations: definition.relations.clone(),
            role,
            access: definition.access,
            converter,
        })
    }

    /// Index of the property in declaration order.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name used inside documents.
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    /// The storage type, with [`FieldType::Auto`] replaced by the inferred type.
    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn spec(&self) -> &FieldSpec {
        &self.spec
    }

    /// The field holding the main value, if the property is annotated.
    pub fn field(&self) -> Option<&Field> {
        self.spec.main_field()
    }

    pub fn relations(&self) -> &[JoinRelation] {
        &self.relations
    }

    pub fn role(&self) -> PropertyRole {
        self.role
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn is_id_property(&self) -> bool {
        self.role == PropertyRole::Id
    }

    pub fn is_version_property(&self) -> bool {
        self.role == PropertyRole::Version
    }

    pub fn is_seq_no_primary_term_property(&self) -> bool {
        self.role == PropertyRole::SeqNoPrimaryTerm
    }

    pub fn is_join_field_property(&self) -> bool {
        self.role == PropertyRole::Join
    }

    /// Whether the property explicitly declares a storage type.
    pub fn has_explicit_field_type(&self) -> bool {
        self.field().is_some_and(|f| f.field_type != FieldType::Auto)
    }

    /// Whether the property is read from document bodies.
    ///
    /// Engine-managed metadata travels out of band and is never read as a field.
    pub fn is_readable(&self) -> bool {
        !matches!(
            self.role,
            PropertyRole::Version | PropertyRole::SeqNoPrimaryTerm
        ) && matches!(self.access, Access::ReadWrite | Access::ReadOnly)
    }

    /// Whether the property is written to document bodies.
    pub fn is_writable(&self) -> bool {
        !matches!(
            self.role,
            PropertyRole::Version | PropertyRole::SeqNoPrimaryTerm
        ) && matches!(self.access, Access::ReadWrite | Access::WriteOnly)
    }

    /// Whether the property appears in the index mapping.
    pub fn is_mapped(&self) -> bool {
        !matches!(
            self.role,
            PropertyRole::Version | PropertyRole::SeqNoPrimaryTerm
        ) && self.access != Access::Transient
    }

    pub fn store_null_value(&self) -> bool {
        self.field().is_some_and(|f| f.store_null_value)
    }

    pub fn has_property_converter(&self) -> bool {
        self.converter.is_some()
    }

    pub fn property_converter(&self) -> Option<&dyn PropertyValueConverter> {
        self.converter.as_deref()
    }

    /// Promote a plain property to the identifier.
    pub(crate) fn promote_to_id(&mut self) {
        self.role = PropertyRole::Id;
    }

    /// Whether an implicit identifier may be taken from this property.
    pub(crate) fn is_implicit_id_candidate(&self) -> bool {
        self.role == PropertyRole::Plain
            && matches!(self.name.as_str(), "id" | "documentId")
            && is_identifier_kind(&self.kind)
            && self.access != Access::Transient
    }
}

fn is_identifier_kind(kind: &ValueKind) -> bool {
    matches!(
        kind,
        ValueKind::String | ValueKind::Long | ValueKind::Integer
    )
}

#[cfg(test)]
mod tests {
    use super::{PersistentProperty, PropertyRole};
    use crate::config::MappingConfig;
    use crate::field::{DateFormat, Field, FieldType, InnerField, JoinRelation, MultiField};
    use crate::naming::SnakeCaseStrategy;
    use crate::schema::PropertyDefinition;
    use crate::value::ValueKind;
    use crate::Error;

    fn build(definition: PropertyDefinition) -> crate::Result<PersistentProperty> {
        PersistentProperty::build("Entity", 0, &definition, &MappingConfig::default())
    }

    macro_rules! test_field_name {
        ($name:ident, $property:expr, $field:expr, $snake:expr, $expected:expr) => {
            #[test]
            fn $name() {
                let config = if $snake {
                    MappingConfig::default().with_naming(SnakeCaseStrategy)
                } else {
                    MappingConfig::default()
                };
                let mut definition = PropertyDefinition::new($property).kind(ValueKind::String);
                if let Some(name) = $field {
                    definition = definition.field(Field::keyword().name(name));
                }
                let property = PersistentProperty::build("E", 0, &definition, &config).unwrap();
                assert_eq!(property.field_name(), $expected);
            }
        };
    }

    test_field_name!(field_name_identity, "withoutCustomFieldName", None::<&str>, false, "withoutCustomFieldName");
    test_field_name!(field_name_snake_case, "withoutCustomFieldName", None::<&str>, true, "without_custom_field_name");
    test_field_name!(field_name_explicit, "withCustomFieldName", Some("CUStomFIEldnAME"), false, "CUStomFIEldnAME");
    test_field_name!(field_name_explicit_snake_case, "withCustomFieldName", Some("CUStomFIEldnAME"), true, "CUStomFIEldnAME");

    #[test]
    fn test_multi_field_name_comes_from_main_field() {
        let property = build(
            PropertyDefinition::new("description")
                .kind(ValueKind::String)
                .field(
                    MultiField::new(Field::text().name("desc"))
                        .inner(InnerField::new("raw", Field::keyword())),
                ),
        )
        .unwrap();
        assert_eq!(property.field_name(), "desc");
        assert_eq!(property.field_type(), FieldType::Text);
    }

    #[test]
    fn test_seq_no_primary_term_is_neither_readable_nor_writable() {
        let property =
            build(PropertyDefinition::new("seqNoPrimaryTerm").kind(ValueKind::SeqNoPrimaryTerm))
                .unwrap();
        assert!(property.is_seq_no_primary_term_property());
        assert!(!property.is_readable());
        assert!(!property.is_writable());
        assert!(!property.is_mapped());
    }

    #[test]
    fn test_version_is_out_of_band() {
        let property = build(PropertyDefinition::new("version").kind(ValueKind::Long).version())
            .unwrap();
        assert_eq!(property.role(), PropertyRole::Version);
        assert!(!property.is_readable());
        assert!(!property.is_writable());
    }

    #[test]
    fn test_version_must_be_integer() {
        let err = build(PropertyDefinition::new("version").kind(ValueKind::String).version())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_access_flags() {
        let read_only = build(PropertyDefinition::new("a").kind(ValueKind::String).read_only())
            .unwrap();
        assert!(read_only.is_readable() && !read_only.is_writable());
        let write_only = build(PropertyDefinition::new("a").kind(ValueKind::String).write_only())
            .unwrap();
        assert!(!write_only.is_readable() && write_only.is_writable());
        let transient = build(PropertyDefinition::new("a").kind(ValueKind::String).transient())
            .unwrap();
        assert!(!transient.is_readable() && !transient.is_writable() && !transient.is_mapped());
    }

    #[test]
    fn test_date_property_has_converter() {
        let property = build(
            PropertyDefinition::new("date")
                .kind(ValueKind::LocalDate)
                .field(Field::date().format([DateFormat::BasicDate])),
        )
        .unwrap();
        assert!(property.has_property_converter());
    }

    #[test]
    fn test_custom_format_without_pattern() {
        let err = build(
            PropertyDefinition::new("datetime")
                .kind(ValueKind::LocalDateTime)
                .field(Field::date().format([DateFormat::Custom]).pattern("")),
        )
        .unwrap_err();
        assert!(err.to_string().contains("pattern"));
    }

    #[test]
    fn test_unsupported_field_type() {
        let err = build(
            PropertyDefinition::new("name")
                .kind(ValueKind::String)
                .field(Field::nested()),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFieldType { ref field_type, .. } if field_type == "nested"));
    }

    #[test]
    fn test_inner_field_must_be_leaf() {
        let err = build(
            PropertyDefinition::new("name").kind(ValueKind::String).field(
                MultiField::new(Field::text()).inner(InnerField::new("obj", Field::object())),
            ),
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFieldType { .. }));
    }

    #[test]
    fn test_join_field_requires_relations() {
        assert!(build(PropertyDefinition::new("relation").kind(ValueKind::Join)).is_err());
        let property = build(
            PropertyDefinition::new("relation")
                .kind(ValueKind::Join)
                .relation(JoinRelation::new("question", ["answer"])),
        )
        .unwrap();
        assert!(property.is_join_field_property());
        assert_eq!(property.field_type(), FieldType::Join);
    }

    #[test]
    fn test_relations_only_on_join_field() {
        let err = build(
            PropertyDefinition::new("name")
                .kind(ValueKind::String)
                .relation(JoinRelation::new("question", ["answer"])),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_implicit_id_candidate() {
        let property = build(PropertyDefinition::new("documentId").kind(ValueKind::String)).unwrap();
        assert!(property.is_implicit_id_candidate());
        let property = build(PropertyDefinition::new("id").kind(ValueKind::Double)).unwrap();
        assert!(!property.is_implicit_id_candidate());
    }
}
