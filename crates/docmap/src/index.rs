//! Index names and index settings.
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{Error, Result};

/// Evaluates the `#{expression}` segments of an index-name template.
pub trait ExpressionResolver {
    fn resolve(&self, expression: &str) -> Option<String>;
}

/// Resolves no expressions. Suitable for static index names.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExpressions;

impl ExpressionResolver for NoExpressions {
    fn resolve(&self, _expression: &str) -> Option<String> {
        None
    }
}

impl ExpressionResolver for HashMap<String, String> {
    fn resolve(&self, expression: &str) -> Option<String> {
        self.get(expression).cloned()
    }
}

impl<F: Fn(&str) -> Option<String>> ExpressionResolver for F {
    fn resolve(&self, expression: &str) -> Option<String> {
        self(expression)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Expression(String),
}

/// An index name that may be computed when a request is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNameTemplate {
    source: String,
    segments: Vec<Segment>,
}

/// The resolved index a request is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexCoordinates {
    pub name: String,
}

/// Index creation settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub shards: u32,
    pub replicas: u32,
    pub refresh_interval: String,
    pub index_store_type: String,
    /// Leave all settings to the server.
    pub use_server_configuration: bool,
}

/// How the engine checks application-supplied version numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionType {
    #[default]
    Internal,
    External,
    ExternalGte,
}

impl IndexNameTemplate {
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = source;
        while let Some(start) = rest.find("#{") {
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after.find('}').ok_or_else(|| Error::InvalidParameter(format!(
                "unterminated expression in index name: {source}"
            )))?;
            let expression = after[..end].trim();
            if expression.is_empty() {
                return Err(Error::InvalidParameter(format!(
                    "empty expression in index name: {source}"
                )));
            }
            segments.push(Segment::Expression(expression.to_string()));
            rest = &after[end + 1..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        if segments.is_empty() {
            return Err(Error::InvalidParameter("empty index name".into()));
        }
        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    pub fn resolve(&self, resolver: &dyn ExpressionResolver) -> Result<IndexCoordinates> {
        let mut name = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => name.push_str(s),
                Segment::Expression(e) => name.push_str(
                    &resolver
                        .resolve(e)
                        .ok_or_else(|| Error::UnresolvedExpression(e.clone()))?,
                ),
            }
        }
        Ok(IndexCoordinates { name })
    }
}

impl fmt::Display for IndexCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            shards: 1,
            replicas: 1,
            refresh_interval: "1s".into(),
            index_store_type: "fs".into(),
            use_server_configuration: false,
        }
    }
}

impl Settings {
    pub fn shards(mut self, shards: u32) -> Self {
        self.shards = shards;
        self
    }

    pub fn replicas(mut self, replicas: u32) -> Self {
        self.replicas = replicas;
        self
    }

    pub fn refresh_interval(mut self, refresh_interval: impl Into<String>) -> Self {
        self.refresh_interval = refresh_interval.into();
        self
    }

    pub fn use_server_configuration(mut self, use_server_configuration: bool) -> Self {
        self.use_server_configuration = use_server_configuration;
        self
    }

    /// The settings body for index creation, or `None` when the server decides.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        if self.use_server_configuration {
            return None;
        }
        Some(json!({
            "index": {
                "number_of_shards": self.shards,
                "number_of_replicas": self.replicas,
                "refresh_interval": self.refresh_interval,
                "store": { "type": self.index_store_type }
            }
        }))
    }
}

impl fmt::Display for VersionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Internal => "internal",
            Self::External => "external",
            Self::ExternalGte => "external_gte",
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::{IndexNameTemplate, NoExpressions, Settings};
    use crate::Error;

    macro_rules! test_resolve {
        ($name:ident, $template:expr, $expected:expr) => {
            #[test]
            fn $name() {
                let resolver: HashMap<String, String> = [
                    ("@indexNameProvider.indexName()".to_string(), "sample-1".to_string()),
                    ("tenant".to_string(), "acme".to_string()),
                ]
                .into_iter()
                .collect();
                let template = IndexNameTemplate::parse($template).unwrap();
                assert_eq!(template.resolve(&resolver).unwrap().name, $expected);
            }
        };
    }

    test_resolve!(resolve_static, "test-index-book", "test-index-book");
    test_resolve!(
        resolve_expression,
        "#{@indexNameProvider.indexName()}",
        "sample-1"
    );
    test_resolve!(resolve_mixed, "logs-#{tenant}-2024", "logs-acme-2024");
    test_resolve!(resolve_trimmed, "#{ tenant }", "acme");

    #[test]
    fn test_is_static() {
        assert!(IndexNameTemplate::parse("books").unwrap().is_static());
        assert!(!IndexNameTemplate::parse("#{x}").unwrap().is_static());
    }

    #[test]
    fn test_unresolved_expression() {
        let template = IndexNameTemplate::parse("#{missing}").unwrap();
        assert_eq!(
            template.resolve(&NoExpressions).unwrap_err(),
            Error::UnresolvedExpression("missing".into())
        );
    }

    #[test]
    fn test_closure_resolver() {
        let template = IndexNameTemplate::parse("idx-#{n}").unwrap();
        let resolver = |e: &str| (e == "n").then(|| "7".to_string());
        assert_eq!(template.resolve(&resolver).unwrap().name, "idx-7");
    }

    #[test]
    fn test_invalid_templates() {
        assert!(IndexNameTemplate::parse("").is_err());
        assert!(IndexNameTemplate::parse("idx-#{open").is_err());
        assert!(IndexNameTemplate::parse("#{}").is_err());
    }

    #[test]
    fn test_settings_json() {
        let settings = Settings::default().shards(10).replicas(0).refresh_interval("-1");
        assert_eq!(
            settings.to_json().unwrap(),
            json!({
                "index": {
                    "number_of_shards": 10,
                    "number_of_replicas": 0,
                    "refresh_interval": "-1",
                    "store": { "type": "fs" }
                }
            })
        );
        assert_eq!(
            Settings::default().use_server_configuration(true).to_json(),
            None
        );
    }
}
