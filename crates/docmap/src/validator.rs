use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::entity::PersistentEntity;
use crate::field::FieldSpec;
use crate::property::PersistentProperty;

macro_rules! checks {
    ($($check:expr),* $(,)?) => {
            vec![$(Box::new($check)),*]
        }
}

/// Metadata fields managed by the engine.
const RESERVED: &[&str] = &[
    "_id",
    "_index",
    "_source",
    "_routing",
    "_version",
    "_seq_no",
    "_primary_term",
    "_field_names",
    "_ignored",
    "_meta",
    "_doc_count",
    "_tier",
    "_type",
];

pub trait Check: Send + Sync {
    fn check_property(
        &self,
        entity: &PersistentEntity,
        property: &PersistentProperty,
        diagnostics: &mut Vec<Diagnostic>,
    );

    fn check_entity(&self, _entity: &PersistentEntity, _diagnostics: &mut Vec<Diagnostic>) {}
}

pub struct Validator {
    checks: Vec<Box<dyn Check>>,
    strict: bool,
}

impl Validator {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            ..Self::default()
        }
    }

    /// Add a check after the built-in ones.
    pub fn check(mut self, check: impl Check + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn validate(&self, entity: &PersistentEntity) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for check in &self.checks {
            for property in entity.properties().iter().filter(|p| p.is_mapped()) {
                check.check_property(entity, property, &mut diagnostics);
            }
            check.check_entity(entity, &mut diagnostics);
        }
        if self.strict {
            diagnostics = diagnostics.into_iter().map(Diagnostic::promote).collect();
        }
        diagnostics
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            checks: checks![InvalidNameCheck, ReservedNameCheck, CaseCollisionCheck],
            strict: false,
        }
    }
}

pub fn validate(entity: &PersistentEntity, strict: bool) -> Vec<Diagnostic> {
    Validator::new(strict).validate(entity)
}

struct InvalidNameCheck;

impl Check for InvalidNameCheck {
    fn check_property(
        &self,
        entity: &PersistentEntity,
        property: &PersistentProperty,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        static RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"^[^.\s]+(\.[^.\s]+)*$").unwrap());
        let mut names = vec![property.field_name().to_string()];
        if let FieldSpec::MultiField(multi) = property.spec() {
            names.extend(
                multi
                    .other_fields
                    .iter()
                    .map(|inner| format!("{}.{}", property.field_name(), inner.suffix)),
            );
        }
        for name in names.into_iter().filter(|name| !RE.is_match(name)) {
            diagnostics.push(Diagnostic::warning(DiagnosticKind::InvalidFieldName {
                entity: entity.name().to_string(),
                property: property.name().to_string(),
                name,
            }));
        }
    }
}

struct ReservedNameCheck;

impl Check for ReservedNameCheck {
    fn check_property(
        &self,
        entity: &PersistentEntity,
        property: &PersistentProperty,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        if RESERVED.contains(&property.field_name()) {
            diagnostics.push(Diagnostic::warning(DiagnosticKind::ReservedFieldName {
                entity: entity.name().to_string(),
                property: property.name().to_string(),
                name: property.field_name().to_string(),
            }));
        }
    }
}

struct CaseCollisionCheck;

impl Check for CaseCollisionCheck {
    fn check_property(
        &self,
        _entity: &PersistentEntity,
        _property: &PersistentProperty,
        _diagnostics: &mut Vec<Diagnostic>,
    ) {
    }

    fn check_entity(&self, entity: &PersistentEntity, diagnostics: &mut Vec<Diagnostic>) {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for property in entity.properties().iter().filter(|p| p.is_mapped()) {
            let name = property.field_name();
            match seen.get(&name.to_lowercase()) {
                // Exact duplicates are rejected when the entity is built.
                Some(other) if *other != name => {
                    diagnostics.push(Diagnostic::warning(
                        DiagnosticKind::CaseInsensitiveCollision {
                            entity: entity.name().to_string(),
                            name: name.to_string(),
                            other: other.to_string(),
                        },
                    ));
                }
                Some(_) => {}
                None => {
                    seen.insert(name.to_lowercase(), name);
                }
            }
        }
    }
}
