//! Structured-data decoding of argument fragments
//!
//! Fragments are tried as strict JSON first; only when that fails is the
//! repair pass run and decoding retried once. The decoded JSON tree is then
//! lifted into BSON through extended JSON, so `{"$oid": ".."}` becomes an
//! `ObjectId` and `{"$date": ".."}` a `DateTime`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use mongodb::bson::{Bson, Document};
use serde_json::Value;
use tracing::debug;

use super::repair;
use crate::error::{ParseError, Result};

/// Decode one fragment into a JSON value tree.
///
/// # Arguments
/// * `fragment` - Raw argument text, strict or shell-flavored
///
/// # Returns
/// * `Result<Value>` - Decoded tree, or `InvalidQueryContent` carrying the
///   decode error of the repaired text
pub fn decode_value(fragment: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(fragment) {
        return Ok(value);
    }

    let repaired = repair::normalize(fragment);
    debug!("Repaired fragment {:?} into {:?}", fragment, repaired);

    serde_json::from_str::<Value>(&repaired).map_err(|e| {
        ParseError::InvalidQueryContent {
            fragment: fragment.trim().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Decode one fragment straight into BSON.
pub fn decode_bson(fragment: &str) -> Result<Bson> {
    let value = decode_value(fragment)?;
    value_to_bson(value, fragment)
}

/// Decode one fragment that must be a mapping.
pub fn decode_document(fragment: &str) -> Result<Document> {
    match decode_bson(fragment)? {
        Bson::Document(doc) => Ok(doc),
        other => Err(ParseError::InvalidQueryContent {
            fragment: fragment.trim().to_string(),
            reason: format!("expected an object, found {}", bson_kind(&other)),
        }
        .into()),
    }
}

/// Lift a decoded JSON tree into BSON via extended JSON.
///
/// `$date` strings are accepted in the shapes the shell accepts
/// (`2024-01-01`, `2024-01-01T10:00:00`, full RFC 3339) and pinned to UTC
/// before conversion.
pub fn value_to_bson(mut value: Value, fragment: &str) -> Result<Bson> {
    canonicalize_dates(&mut value);
    Bson::try_from(value).map_err(|e| {
        ParseError::InvalidQueryContent {
            fragment: fragment.trim().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Human-readable BSON kind for error messages.
pub fn bson_kind(value: &Bson) -> &'static str {
    match value {
        Bson::Document(_) => "object",
        Bson::Array(_) => "array",
        Bson::String(_) => "string",
        Bson::Boolean(_) => "boolean",
        Bson::Null => "null",
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => "number",
        Bson::ObjectId(_) => "ObjectId",
        Bson::DateTime(_) => "date",
        _ => "value",
    }
}

fn canonicalize_dates(value: &mut Value) {
    match value {
        Value::Array(items) => items.iter_mut().for_each(canonicalize_dates),
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(text)) = map.get("$date") {
                    if let Some(millis) = parse_shell_date(text) {
                        map.insert(
                            "$date".to_string(),
                            serde_json::json!({ "$numberLong": millis.to_string() }),
                        );
                    }
                    return;
                }
            }
            map.values_mut().for_each(canonicalize_dates);
        }
        _ => {}
    }
}

/// Parse the date strings `ISODate()` accepts into epoch milliseconds.
fn parse_shell_date(text: &str) -> Option<i64> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc().timestamp_millis());
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc).timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryError;
    use mongodb::bson::{doc, oid::ObjectId};
    use serde_json::json;

    #[test]
    fn test_strict_fast_path() {
        assert_eq!(decode_value(r#"{"status": "open"}"#).unwrap(), json!({"status": "open"}));
    }

    #[test]
    fn test_loose_and_strict_decode_alike() {
        let loose = decode_value("{status:'open', $or:[{a:1}]}").unwrap();
        let strict = decode_value(r#"{"status": "open", "$or": [{"a": 1}]}"#).unwrap();
        assert_eq!(loose, strict);
    }

    #[test]
    fn test_object_id_constructor_decodes_to_oid_mapping() {
        let value = decode_value(r#"{_id: ObjectId("507f1f77bcf86cd799439011")}"#).unwrap();
        assert_eq!(value["_id"], json!({"$oid": "507f1f77bcf86cd799439011"}));
    }

    #[test]
    fn test_object_id_becomes_bson_object_id() {
        let doc = decode_document(r#"{_id: ObjectId("507f1f77bcf86cd799439011")}"#).unwrap();
        let expected = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        assert_eq!(doc, doc! { "_id": expected });
    }

    #[test]
    fn test_iso_date_variants() {
        let full = decode_document(r#"{d: ISODate("2024-01-01T00:00:00Z")}"#).unwrap();
        let short = decode_document(r#"{d: ISODate("2024-01-01")}"#).unwrap();
        assert_eq!(full, short);
        match full.get("d") {
            Some(Bson::DateTime(dt)) => assert_eq!(dt.timestamp_millis(), 1_704_067_200_000),
            other => panic!("expected a date, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_fragment_is_empty_document() {
        assert_eq!(decode_document("   ").unwrap(), doc! {});
    }

    #[test]
    fn test_key_order_is_preserved() {
        let doc = decode_document("{date: -1, name: 1, amount: -1}").unwrap();
        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["date", "name", "amount"]);
    }

    #[test]
    fn test_unrepairable_fragment() {
        let err = decode_value("{status: 'open'").unwrap_err();
        match err {
            QueryError::Parse(ParseError::InvalidQueryContent { fragment, reason }) => {
                assert_eq!(fragment, "{status: 'open'");
                assert!(!reason.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_document_rejects_arrays() {
        let err = decode_document("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("expected an object, found array"));
    }
}
