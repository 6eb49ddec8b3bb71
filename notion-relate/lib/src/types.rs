//! Records, property values, and the match-value extraction rule.
//!
//! Properties are kept as raw JSON on the [`Record`] and only decoded when a
//! caller asks for one. A malformed property therefore fails that one record
//! instead of the whole query page.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExtractionError;

/// A single text span of a `title` or `rich_text` property.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TextSpan {
    /// Unformatted text of the span
    pub plain_text: Option<String>,
}

/// A reference to another record inside a `relation` property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationRef {
    /// Target record identifier
    pub id: String,
}

/// Decoded value of a record property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Title spans
    Title(Vec<TextSpan>),
    /// Rich text spans
    RichText(Vec<TextSpan>),
    /// Number, `None` when the cell is empty
    Number(Option<serde_json::Number>),
    /// Relation targets
    Relation(Vec<RelationRef>),
    /// Any kind the linker does not match on (select, date, ...)
    Other(String),
}

impl PropertyValue {
    /// Decode a raw property object.
    ///
    /// The kind comes from the `type` field. Payloads without one fall back
    /// to the first known kind key present (`title`, `rich_text`, `number`,
    /// `relation`).
    ///
    /// ## Errors
    ///
    /// Returns [`ExtractionError::Malformed`] if the payload under the kind
    /// key does not decode.
    pub fn from_json(property: &str, raw: &Value) -> Result<Self, ExtractionError> {
        let kind = raw.get("type").and_then(Value::as_str).or_else(|| {
            ["title", "rich_text", "number", "relation"]
                .into_iter()
                .find(|key| raw.get(key).is_some())
        });

        let Some(kind) = kind else {
            return Ok(Self::Other("unknown".to_string()));
        };

        let payload = raw.get(kind).cloned().unwrap_or(Value::Null);
        let malformed = |source: serde_json::Error| ExtractionError::Malformed {
            property: property.to_string(),
            source,
        };

        Ok(match kind {
            "title" => Self::Title(serde_json::from_value(payload).map_err(malformed)?),
            "rich_text" => Self::RichText(serde_json::from_value(payload).map_err(malformed)?),
            "number" => Self::Number(serde_json::from_value(payload).map_err(malformed)?),
            "relation" => Self::Relation(serde_json::from_value(payload).map_err(malformed)?),
            other => Self::Other(other.to_string()),
        })
    }

    /// Produce the value used to join records.
    ///
    /// - `title` / `rich_text`: the first span's `plain_text`
    /// - `number`: its decimal rendering, zero included
    /// - everything else, and empty numbers: `None`
    ///
    /// ## Errors
    ///
    /// Fails when a text property has no spans or its first span carries no
    /// `plain_text`.
    pub fn match_value(&self, property: &str) -> Result<Option<String>, ExtractionError> {
        match self {
            Self::Title(spans) => first_plain_text(property, "title", spans).map(Some),
            Self::RichText(spans) => first_plain_text(property, "rich_text", spans).map(Some),
            // Zero is a real value, not an empty cell.
            Self::Number(Some(number)) if is_zero(number) => Ok(Some(number.to_string())),
            Self::Number(Some(number)) => Ok(Some(number.to_string())),
            // An empty cell joins nothing, rather than matching other empty cells on "None".
            Self::Number(None) => Ok(None),
            Self::Relation(_) | Self::Other(_) => Ok(None),
        }
    }
}

fn first_plain_text(
    property: &str,
    kind: &'static str,
    spans: &[TextSpan],
) -> Result<String, ExtractionError> {
    let first = spans.first().ok_or_else(|| ExtractionError::EmptySequence {
        property: property.to_string(),
        kind,
    })?;
    first
        .plain_text
        .clone()
        .ok_or_else(|| ExtractionError::MissingPlainText {
            property: property.to_string(),
        })
}

fn is_zero(number: &serde_json::Number) -> bool {
    number.as_f64() == Some(0.0)
}

/// A record (Notion page) as returned by a database query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Record {
    /// Record identifier
    pub id: String,
    /// Raw property objects keyed by property name
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

impl Record {
    /// Create a record with no properties.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: HashMap::new(),
        }
    }

    /// Add a raw property object.
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, raw: Value) -> Self {
        self.properties.insert(name.into(), raw);
        self
    }

    /// Decode a named property. A missing property is `Ok(None)`.
    ///
    /// ## Errors
    ///
    /// See [`PropertyValue::from_json`].
    pub fn property(&self, name: &str) -> Result<Option<PropertyValue>, ExtractionError> {
        self.properties
            .get(name)
            .map(|raw| PropertyValue::from_json(name, raw))
            .transpose()
    }

    /// Extract the match value of a named property.
    ///
    /// Missing properties, unsupported kinds, empty numbers and empty
    /// strings all come back as `Ok(None)`.
    ///
    /// ## Errors
    ///
    /// See [`PropertyValue::match_value`].
    pub fn match_value(&self, name: &str) -> Result<Option<String>, ExtractionError> {
        let Some(value) = self.property(name)? else {
            return Ok(None);
        };
        Ok(value.match_value(name)?.filter(|v| !v.is_empty()))
    }

    /// Identifiers currently held by a relation property.
    ///
    /// Anything that is not a readable relation counts as empty.
    pub fn relation_ids(&self, name: &str) -> Vec<String> {
        match self.property(name) {
            Ok(Some(PropertyValue::Relation(refs))) => refs.into_iter().map(|r| r.id).collect(),
            _ => Vec::new(),
        }
    }
}

/// One page of a database query.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QueryPage {
    /// Records on this page
    pub results: Vec<Record>,
    /// More pages follow
    pub has_more: bool,
    /// Cursor for the next page
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn title(text: &str) -> Value {
        json!({ "id": "title", "type": "title", "title": [{ "type": "text", "plain_text": text }] })
    }

    #[test]
    fn title_uses_first_span_only() {
        let raw = json!({
            "type": "title",
            "title": [{ "plain_text": "Alpha" }, { "plain_text": "Beta" }]
        });
        let record = Record::new("r1").with_property("Name", raw);
        assert_eq!(record.match_value("Name").unwrap(), Some("Alpha".to_string()));
    }

    #[test]
    fn rich_text_is_extracted() {
        let raw = json!({ "type": "rich_text", "rich_text": [{ "plain_text": "SKU-9" }] });
        let record = Record::new("r1").with_property("Code", raw);
        assert_eq!(record.match_value("Code").unwrap(), Some("SKU-9".to_string()));
    }

    #[test]
    fn integer_number_is_stringified() {
        let record = Record::new("r1").with_property("Num", json!({ "type": "number", "number": 42 }));
        assert_eq!(record.match_value("Num").unwrap(), Some("42".to_string()));
    }

    #[test]
    fn float_number_is_stringified() {
        let record = Record::new("r1").with_property("Num", json!({ "type": "number", "number": 2.5 }));
        assert_eq!(record.match_value("Num").unwrap(), Some("2.5".to_string()));
    }

    #[test]
    fn zero_is_a_valid_match_value() {
        let int_zero = Record::new("r1").with_property("Num", json!({ "type": "number", "number": 0 }));
        let float_zero =
            Record::new("r2").with_property("Num", json!({ "type": "number", "number": 0.0 }));
        assert_eq!(int_zero.match_value("Num").unwrap(), Some("0".to_string()));
        assert_eq!(float_zero.match_value("Num").unwrap(), Some("0.0".to_string()));
    }

    #[test]
    fn float_zero_renders_like_other_floats() {
        let one = Record::new("r1").with_property("Num", json!({ "type": "number", "number": 1.0 }));
        let zero = Record::new("r2").with_property("Num", json!({ "type": "number", "number": 0.0 }));
        assert_eq!(one.match_value("Num").unwrap(), Some("1.0".to_string()));
        assert_eq!(zero.match_value("Num").unwrap(), Some("0.0".to_string()));
    }

    #[test]
    fn empty_number_is_absent() {
        let record = Record::new("r1").with_property("Num", json!({ "type": "number", "number": null }));
        assert_eq!(record.match_value("Num").unwrap(), None);
    }

    #[test]
    fn missing_property_is_absent() {
        let record = Record::new("r1");
        assert_eq!(record.match_value("Name").unwrap(), None);
    }

    #[test]
    fn unsupported_kind_is_absent() {
        let raw = json!({ "type": "select", "select": { "name": "Red" } });
        let record = Record::new("r1").with_property("Colour", raw);
        assert_eq!(record.match_value("Colour").unwrap(), None);
    }

    #[test]
    fn empty_plain_text_is_absent() {
        let record = Record::new("r1").with_property("Name", title(""));
        assert_eq!(record.match_value("Name").unwrap(), None);
    }

    #[test]
    fn empty_title_is_an_extraction_error() {
        let record = Record::new("r1").with_property("Name", json!({ "type": "title", "title": [] }));
        let err = record.match_value("Name").unwrap_err();
        assert!(matches!(err, ExtractionError::EmptySequence { kind: "title", .. }));
    }

    #[test]
    fn span_without_plain_text_is_an_extraction_error() {
        let raw = json!({ "type": "rich_text", "rich_text": [{ "type": "mention" }] });
        let record = Record::new("r1").with_property("Code", raw);
        let err = record.match_value("Code").unwrap_err();
        assert!(matches!(err, ExtractionError::MissingPlainText { .. }));
    }

    #[test]
    fn malformed_payload_is_an_extraction_error() {
        let raw = json!({ "type": "title", "title": "not a list" });
        let record = Record::new("r1").with_property("Name", raw);
        assert!(matches!(
            record.match_value("Name").unwrap_err(),
            ExtractionError::Malformed { .. }
        ));
    }

    #[test]
    fn untagged_payload_falls_back_to_kind_key() {
        let raw = json!({ "rich_text": [{ "plain_text": "loose" }] });
        let record = Record::new("r1").with_property("Code", raw);
        assert_eq!(record.match_value("Code").unwrap(), Some("loose".to_string()));
    }

    #[test]
    fn relation_ids_reads_existing_targets() {
        let raw = json!({ "type": "relation", "relation": [{ "id": "a" }, { "id": "b" }] });
        let record = Record::new("r1").with_property("Parent", raw);
        assert_eq!(record.relation_ids("Parent"), vec!["a", "b"]);
    }

    #[test]
    fn relation_ids_is_empty_for_other_kinds() {
        let record = Record::new("r1").with_property("Parent", title("x"));
        assert!(record.relation_ids("Parent").is_empty());
        assert!(record.relation_ids("Missing").is_empty());
    }

    #[test]
    fn query_page_deserializes_notion_shape() {
        let body = json!({
            "object": "list",
            "results": [
                { "object": "page", "id": "p1", "properties": { "Name": title("Alpha") } }
            ],
            "has_more": true,
            "next_cursor": "cursor-2",
            "type": "page_or_database"
        });
        let page: QueryPage = serde_json::from_value(body).unwrap();
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].id, "p1");
        assert!(page.has_more);
        assert_eq!(page.next_cursor.as_deref(), Some("cursor-2"));
    }

    #[test]
    fn query_page_requires_results_and_has_more() {
        assert!(serde_json::from_value::<QueryPage>(json!({ "object": "error" })).is_err());
        assert!(serde_json::from_value::<QueryPage>(json!({ "results": [] })).is_err());

        let last: QueryPage =
            serde_json::from_value(json!({ "results": [], "has_more": false })).unwrap();
        assert_eq!(last.next_cursor, None);
    }
}
