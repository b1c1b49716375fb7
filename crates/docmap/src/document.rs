//! Documents and the envelopes they travel in.
use indexmap::IndexMap;
use indexmap::map::Iter;
use serde::{Deserialize, Serialize};

use crate::index::{IndexCoordinates, VersionType};
use crate::value::SeqNoPrimaryTerm;
use crate::Result;

/// An ordered document body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(IndexMap<String, serde_json::Value>);

/// A document returned by the engine with its out-of-band metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SearchDocument {
    #[serde(rename = "_index", default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(rename = "_seq_no", default, skip_serializing_if = "Option::is_none")]
    pub seq_no: Option<i64>,
    #[serde(rename = "_primary_term", default, skip_serializing_if = "Option::is_none")]
    pub primary_term: Option<i64>,
    #[serde(rename = "_score", default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(rename = "sort", default, skip_serializing_if = "Vec::is_empty")]
    pub sort_values: Vec<serde_json::Value>,
    #[serde(rename = "_routing", default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
    #[serde(rename = "_source", default)]
    pub source: Document,
}

/// A read entity together with its hit metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit<T> {
    pub index: Option<String>,
    pub id: Option<String>,
    pub score: Option<f64>,
    pub sort_values: Vec<serde_json::Value>,
    pub content: T,
}

/// Everything needed to address a write of one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexRequest {
    pub index: IndexCoordinates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_type: Option<VersionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub if_seq_no: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub if_primary_term: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing: Option<String>,
    pub source: Document,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> Iter<'_, String, serde_json::Value> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_json(self) -> serde_json::Value {
        serde_json::Value::Object(self.0.into_iter().collect())
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Document {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl FromIterator<(String, serde_json::Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a serde_json::Value);
    type IntoIter = Iter<'a, String, serde_json::Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IndexRequest {
    /// Route the request explicitly, replacing any routing taken from a join parent.
    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }
}

impl SearchDocument {
    pub fn new(source: Document) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn seq_no_primary_term(mut self, seq_no: i64, primary_term: i64) -> Self {
        self.seq_no = Some(seq_no);
        self.primary_term = Some(primary_term);
        self
    }

    pub fn score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn routing(mut self, routing: impl Into<String>) -> Self {
        self.routing = Some(routing.into());
        self
    }

    /// The assigned sequence number and primary term, if the engine reported both.
    pub fn assigned_seq_no_primary_term(&self) -> Option<SeqNoPrimaryTerm> {
        SeqNoPrimaryTerm::new(self.seq_no?, self.primary_term?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Document, IndexRequest, SearchDocument};
    use crate::index::IndexCoordinates;

    #[test]
    fn test_document_keeps_insertion_order() {
        let document = Document::from_json(r#"{"b": 1, "a": 2, "c": 3}"#).unwrap();
        assert_eq!(document.keys().collect::<Vec<_>>(), vec!["b", "a", "c"]);
        assert_eq!(document.to_json().unwrap(), r#"{"b":1,"a":2,"c":3}"#);
    }

    #[test]
    fn test_search_document_from_hit() {
        let hit: SearchDocument = serde_json::from_value(json!({
            "_index": "test-index-book",
            "_id": "42",
            "_version": 3,
            "_seq_no": 7,
            "_primary_term": 1,
            "_score": 1.5,
            "sort": [1, "a"],
            "_source": {"title": "The Hobbit"}
        }))
        .unwrap();
        assert_eq!(hit.id.as_deref(), Some("42"));
        assert_eq!(hit.version, Some(3));
        let token = hit.assigned_seq_no_primary_term().unwrap();
        assert_eq!((token.seq_no, token.primary_term), (7, 1));
        assert_eq!(hit.sort_values, vec![json!(1), json!("a")]);
        assert_eq!(hit.source.get("title"), Some(&json!("The Hobbit")));
    }

    #[test]
    fn test_unassigned_seq_no_primary_term() {
        let hit = SearchDocument::new(Document::new()).seq_no_primary_term(-2, 0);
        assert_eq!(hit.assigned_seq_no_primary_term(), None);
    }

    #[test]
    fn test_explicit_routing() {
        let request = IndexRequest {
            index: IndexCoordinates {
                name: "answers".into(),
            },
            id: Some("2".into()),
            version: None,
            version_type: None,
            if_seq_no: None,
            if_primary_term: None,
            routing: Some("1".into()),
            source: Document::new(),
        }
        .routing("shard-key");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "index": {"name": "answers"},
                "id": "2",
                "routing": "shard-key",
                "source": {}
            })
        );
    }
}
