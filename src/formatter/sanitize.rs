//! Result sanitizer
//!
//! Walks a result tree and replaces the BSON kinds that have no JSON
//! counterpart with strings:
//! - ObjectId → 24-char lowercase hex
//! - DateTime → ISO 8601 / RFC 3339
//!
//! Everything else is copied unchanged. The input is never mutated.

use bson::{Bson, DateTime, Document};
use serde_json::Value as JsonValue;

use crate::executor::QueryResult;

/// Sanitize one value, returning a new tree.
pub fn sanitize(value: &Bson) -> Bson {
    match value {
        Bson::Array(items) => Bson::Array(items.iter().map(sanitize).collect()),
        Bson::Document(doc) => Bson::Document(sanitize_document(doc)),
        Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
        Bson::DateTime(dt) => Bson::String(datetime_to_iso_string(dt)),
        other => other.clone(),
    }
}

/// Sanitize every value of a document, keeping key order.
pub fn sanitize_document(doc: &Document) -> Document {
    doc.iter()
        .map(|(key, value)| (key.clone(), sanitize(value)))
        .collect()
}

/// Sanitize an executor result and convert it to plain JSON.
///
/// Numbers become JSON numbers (relaxed extended JSON); an `Empty`
/// result becomes `null`.
pub fn sanitize_result(result: &QueryResult) -> JsonValue {
    sanitize(&result.to_bson()).into_relaxed_extjson()
}

/// Convert DateTime to ISO 8601 string
///
/// Dates outside the RFC 3339 range fall back to epoch milliseconds.
pub fn datetime_to_iso_string(dt: &DateTime) -> String {
    dt.try_to_rfc3339_string()
        .unwrap_or_else(|_| format!("{}", dt.timestamp_millis()))
}
