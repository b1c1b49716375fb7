use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticKind {
    InvalidFieldName {
        entity: String,
        property: String,
        name: String,
    },
    ReservedFieldName {
        entity: String,
        property: String,
        name: String,
    },
    CaseInsensitiveCollision {
        entity: String,
        name: String,
        other: String,
    },
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind) -> Self {
        Self {
            severity: Severity::Error,
            kind,
        }
    }

    pub fn warning(kind: DiagnosticKind) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
        }
    }

    /// Raise warnings to errors.
    pub fn promote(self) -> Self {
        Self {
            severity: Severity::Error,
            kind: self.kind,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning)
    }
}

impl Severity {
    pub fn prefix(&self) -> char {
        match self {
            Self::Warning => 'W',
            Self::Error => 'E',
        }
    }
}

impl DiagnosticKind {
    pub fn number(&self) -> u32 {
        match self {
            Self::InvalidFieldName { .. } => 1,
            Self::ReservedFieldName { .. } => 2,
            Self::CaseInsensitiveCollision { .. } => 3,
        }
    }

    pub fn entity(&self) -> &str {
        match self {
            Self::InvalidFieldName { entity, .. }
            | Self::ReservedFieldName { entity, .. }
            | Self::CaseInsensitiveCollision { entity, .. } => entity,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:0>3} {}",
            self.severity.prefix(),
            self.kind.number(),
            self.kind
        )
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFieldName {
                entity,
                property,
                name,
            } => write!(f, "{entity}.{property}: '{name}' is not a valid field name"),
            Self::ReservedFieldName {
                entity,
                property,
                name,
            } => write!(f, "{entity}.{property}: '{name}' is a reserved metadata field"),
            Self::CaseInsensitiveCollision {
                entity,
                name,
                other,
            } => write!(
                f,
                "{entity}: field names '{name}' and '{other}' differ only in case"
            ),
        }
    }
}
