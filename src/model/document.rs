//! Document model for the product search index.
//!
//! A `Document` is one indexed piece of catalog text (usually a product's
//! name, description and AI caption joined together), its scalar metadata,
//! and the embedding vector derived from the text at ingestion time.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metadata key stamped on every document at ingestion.
pub const CREATED_AT_KEY: &str = "created_at";

/// A scalar metadata value.
///
/// Serialized untagged so the JSON form is the plain value (`"home"`,
/// `42`, `12.5`, `true`). Integers and floats compare numerically; values
/// of different kinds are never equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

/// `-2^63` and `2^63`, the bounds of `i64` as exact floats.
const I64_MIN_F64: f64 = -9_223_372_036_854_775_808.0;
const I64_END_F64: f64 = 9_223_372_036_854_775_808.0;

/// Exact integer/float equality, without rounding the integer.
#[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
fn integer_equals_float(i: i64, f: f64) -> bool {
    f.fract() == 0.0 && (I64_MIN_F64..I64_END_F64).contains(&f) && f as i64 == i
}

impl PartialEq for MetadataValue {
    #[allow(clippy::float_cmp)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Integer(i), Self::Float(f)) | (Self::Float(f), Self::Integer(i)) => {
                integer_equals_float(*i, *f)
            }
            (Self::String(a), Self::String(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl TryFrom<&serde_json::Value> for MetadataValue {
    type Error = Error;

    fn try_from(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float))
                .ok_or_else(|| Error::InvalidArgument(format!("metadata number out of range: {n}"))),
            serde_json::Value::String(s) => Ok(Self::String(s.clone())),
            serde_json::Value::Null => {
                Err(Error::InvalidArgument("metadata value must not be null".into()))
            }
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => Err(
                Error::InvalidArgument("metadata value must be a string, number or boolean".into()),
            ),
        }
    }
}

impl MetadataValue {
    /// Parse a command-line value: bool, then integer, then float, else string.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            _ => {}
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Self::Integer(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            if f.is_finite() {
                return Self::Float(f);
            }
        }
        Self::String(raw.to_string())
    }
}

/// Document metadata: string keys to scalar values.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Check that metadata can be stored, i.e. holds no NaN or infinite float.
///
/// # Errors
///
/// Returns `InvalidArgument` naming the offending key.
pub fn check_metadata(metadata: &Metadata) -> Result<()> {
    match metadata
        .iter()
        .find(|(_, value)| matches!(value, MetadataValue::Float(f) if !f.is_finite()))
    {
        Some((key, value)) => Err(Error::InvalidArgument(format!(
            "metadata key '{key}': {value} is not a finite number"
        ))),
        None => Ok(()),
    }
}

/// Convert a JSON object into typed metadata, rejecting non-scalar values.
///
/// # Errors
///
/// Returns `InvalidArgument` naming the offending key.
pub fn metadata_from_json(map: &serde_json::Map<String, serde_json::Value>) -> Result<Metadata> {
    map.iter()
        .map(|(k, v)| {
            MetadataValue::try_from(v)
                .map(|mv| (k.clone(), mv))
                .map_err(|e| Error::InvalidArgument(format!("metadata key '{k}': {e}")))
        })
        .collect()
}

/// Parse `key=value` pairs from the command line into metadata.
///
/// # Errors
///
/// Returns `InvalidArgument` if a pair has no `=` or an empty key.
pub fn metadata_from_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for pair in pairs {
        let pair = pair.as_ref();
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            Error::InvalidArgument(format!("metadata must be key=value, got '{pair}'"))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidArgument(format!("metadata key is empty in '{pair}'")));
        }
        metadata.insert(key.to_string(), MetadataValue::parse_lenient(value.trim()));
    }
    Ok(metadata)
}

/// Equality filter over document metadata.
///
/// A document matches when, for every key in the filter, its metadata holds
/// that key with an equal value. A missing key excludes the document. The
/// empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFilter(pub Metadata);

impl MetadataFilter {
    #[must_use]
    pub fn new(conditions: Metadata) -> Self {
        Self(conditions)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check whether a document's metadata satisfies every condition.
    #[must_use]
    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.0
            .iter()
            .all(|(key, expected)| metadata.get(key).is_some_and(|actual| actual == expected))
    }
}

impl From<Metadata> for MetadataFilter {
    fn from(conditions: Metadata) -> Self {
        Self(conditions)
    }
}

/// A stored, embedded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier (UUID v4), assigned at ingestion.
    pub id: String,

    /// Indexed text content.
    pub text: String,

    /// Scalar metadata used for equality filtering.
    pub metadata: Metadata,

    /// Embedding of `text`; length equals the store's dimensionality.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vector: Vec<f32>,

    /// Insertion timestamp (Unix milliseconds).
    pub created_at: i64,
}

impl Document {
    /// Build a new document with a fresh id and the current timestamp.
    ///
    /// The RFC 3339 creation time is also written into `metadata` under
    /// [`CREATED_AT_KEY`], replacing any caller-supplied value.
    #[must_use]
    pub fn new(text: String, mut metadata: Metadata, vector: Vec<f32>) -> Self {
        let now = chrono::Utc::now();
        metadata.insert(
            CREATED_AT_KEY.to_string(),
            MetadataValue::String(now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
        );

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text,
            metadata,
            vector,
            created_at: now.timestamp_millis(),
        }
    }

    /// Vector length.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.vector.len()
    }

    /// Copy without the vector, for output where the embedding is noise.
    #[must_use]
    pub fn without_vector(&self) -> Self {
        Self {
            id: self.id.clone(),
            text: self.text.clone(),
            metadata: self.metadata.clone(),
            vector: Vec::new(),
            created_at: self.created_at,
        }
    }
}

/// A search hit: the document and its distance to the query.
///
/// Smaller distance means more similar; distances are never negative.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredDocument {
    pub document: Document,
    pub distance: f32,
}

/// One (text, metadata) pair submitted for ingestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestItem {
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl IngestItem {
    #[must_use]
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            text: text.into(),
            metadata,
        }
    }

    /// Parse `{"text": "...", "metadata": {...}}`; `metadata` may be omitted.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `text` is not a string or a metadata
    /// value is not a scalar.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let text = value
            .get("text")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| Error::InvalidArgument("'text' must be a string".into()))?;

        let metadata = match value.get("metadata") {
            None | Some(serde_json::Value::Null) => Metadata::new(),
            Some(serde_json::Value::Object(map)) => metadata_from_json(map)?,
            Some(_) => {
                return Err(Error::InvalidArgument("'metadata' must be an object".into()));
            }
        };

        Ok(Self::new(text, metadata))
    }
}

/// Parse a batch of ingest items.
///
/// Accepts a bare array of items or an object with a `documents` array.
///
/// # Errors
///
/// Returns `InvalidArgument` naming the first malformed item.
pub fn ingest_items_from_json(value: &serde_json::Value) -> Result<Vec<IngestItem>> {
    let items = value
        .as_array()
        .or_else(|| value.get("documents").and_then(serde_json::Value::as_array))
        .ok_or_else(|| {
            Error::InvalidArgument("expected an array of documents or {\"documents\": [...]}".into())
        })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            IngestItem::from_json(item)
                .map_err(|e| Error::InvalidArgument(format!("documents[{index}]: {e}")))
        })
        .collect()
}

/// Search hit as returned to callers: the document without its vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub distance: f32,
    pub metadata: Metadata,
}

impl From<ScoredDocument> for SearchHit {
    fn from(hit: ScoredDocument) -> Self {
        Self {
            id: hit.document.id,
            text: hit.document.text,
            distance: hit.distance,
            metadata: hit.document.metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(pairs: &[(&str, MetadataValue)]) -> Metadata {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_numeric_equality_crosses_int_and_float() {
        assert_eq!(MetadataValue::Integer(5), MetadataValue::Float(5.0));
        assert_ne!(MetadataValue::Integer(5), MetadataValue::Float(5.5));
        assert_ne!(MetadataValue::Integer(1), MetadataValue::Bool(true));
        assert_ne!(MetadataValue::String("5".into()), MetadataValue::Integer(5));
    }

    #[test]
    fn test_numeric_equality_is_exact_for_large_integers() {
        // 2^53 + 1 has no f64 of its own
        let big = 9_007_199_254_740_993_i64;
        assert_ne!(MetadataValue::Integer(big), MetadataValue::Float(9_007_199_254_740_992.0));
        assert_eq!(
            MetadataValue::Integer(big - 1),
            MetadataValue::Float(9_007_199_254_740_992.0)
        );
        assert_eq!(MetadataValue::Integer(i64::MIN), MetadataValue::Float(-9.223_372_036_854_775_808e18));
        assert_ne!(MetadataValue::Integer(i64::MAX), MetadataValue::Float(9.223_372_036_854_775_808e18));
        assert_ne!(MetadataValue::Integer(0), MetadataValue::Float(f64::NAN));
    }

    #[test]
    fn test_check_metadata_rejects_non_finite_floats() {
        assert!(check_metadata(&meta(&[("price", 12.5.into()), ("qty", 3i64.into())])).is_ok());
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = check_metadata(&meta(&[("price", bad.into())])).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(msg) if msg.contains("price")));
        }
    }

    #[test]
    fn test_filter_requires_every_key() {
        let doc = meta(&[("category", "home".into()), ("in_stock", true.into())]);

        let hit = MetadataFilter::new(meta(&[("category", "home".into())]));
        assert!(hit.matches(&doc));

        let both = MetadataFilter::new(meta(&[
            ("category", "home".into()),
            ("in_stock", true.into()),
        ]));
        assert!(both.matches(&doc));

        let wrong_value = MetadataFilter::new(meta(&[("category", "garden".into())]));
        assert!(!wrong_value.matches(&doc));

        let missing_key = MetadataFilter::new(meta(&[("brand", "acme".into())]));
        assert!(!missing_key.matches(&doc));
    }

    #[test]
    fn test_filter_is_exact_not_prefix() {
        let doc = meta(&[("category", "home-decor".into())]);
        let filter = MetadataFilter::new(meta(&[("category", "home".into())]));
        assert!(!filter.matches(&doc));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(MetadataFilter::default().matches(&Metadata::new()));
    }

    #[test]
    fn test_metadata_from_json_rejects_nested() {
        let ok = json!({"category": "home", "price": 12.5, "qty": 3, "sale": false});
        let parsed = metadata_from_json(ok.as_object().unwrap()).unwrap();
        assert_eq!(parsed["qty"], MetadataValue::Integer(3));
        assert_eq!(parsed["price"], MetadataValue::Float(12.5));

        let bad = json!({"tags": ["a", "b"]});
        let err = metadata_from_json(bad.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(msg) if msg.contains("tags")));

        let null = json!({"brand": null});
        assert!(metadata_from_json(null.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_metadata_from_pairs() {
        let parsed = metadata_from_pairs(&["category=home", "qty=3", "price=9.5", "sale=true"])
            .unwrap();
        assert_eq!(parsed["category"], MetadataValue::String("home".into()));
        assert_eq!(parsed["qty"], MetadataValue::Integer(3));
        assert_eq!(parsed["price"], MetadataValue::Float(9.5));
        assert_eq!(parsed["sale"], MetadataValue::Bool(true));

        assert!(metadata_from_pairs(&["novalue"]).is_err());
        assert!(metadata_from_pairs(&["=home"]).is_err());
    }

    #[test]
    fn test_untagged_json_round_trip_shape() {
        let m = meta(&[("category", "home".into()), ("qty", 2i64.into())]);
        let text = serde_json::to_string(&m).unwrap();
        assert_eq!(text, r#"{"category":"home","qty":2}"#);
    }

    #[test]
    fn test_new_document_stamps_created_at() {
        let mut input = Metadata::new();
        input.insert(CREATED_AT_KEY.into(), "caller value".into());
        let doc = Document::new("handmade ceramic mug".into(), input, vec![0.0; 4]);

        assert_eq!(doc.dimensions(), 4);
        assert!(uuid::Uuid::parse_str(&doc.id).is_ok());
        let stamped = doc.metadata[CREATED_AT_KEY].to_string();
        assert_ne!(stamped, "caller value");
        assert!(chrono::DateTime::parse_from_rfc3339(&stamped).is_ok());
    }

    #[test]
    fn test_ingest_items_from_json_shapes() {
        let bare = json!([{"text": "mug", "metadata": {"category": "home"}}, {"text": "pipe"}]);
        let items = ingest_items_from_json(&bare).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].metadata["category"], MetadataValue::from("home"));
        assert!(items[1].metadata.is_empty());

        let wrapped = json!({"documents": [{"text": "vase"}]});
        assert_eq!(ingest_items_from_json(&wrapped).unwrap()[0].text, "vase");

        let bad = json!([{"text": "ok"}, {"text": 5}]);
        let err = ingest_items_from_json(&bad).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(msg) if msg.contains("documents[1]")));
    }

    #[test]
    fn test_search_hit_drops_vector() {
        let doc = Document::new("mug".into(), Metadata::new(), vec![1.0, 2.0]);
        let id = doc.id.clone();
        let hit = SearchHit::from(ScoredDocument { document: doc, distance: 0.5 });
        assert_eq!(hit.id, id);
        let value = serde_json::to_value(&hit).unwrap();
        assert!(value.get("vector").is_none());
        assert_eq!(value["distance"], json!(0.5));
    }
}
