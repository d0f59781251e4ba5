//! Conversions between request/response JSON and stored BSON documents.

use bson::{Bson, Document};
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// Render a BSON value the way API clients expect it.
///
/// ObjectIds become their hex string and datetimes become RFC 3339 strings;
/// everything else uses relaxed extended JSON (plain numbers, strings, bools).
pub fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(s) => Value::String(s),
            Err(_) => Value::from(dt.timestamp_millis()),
        },
        Bson::Document(doc) => document_to_json(doc),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        other => other.into_relaxed_extjson(),
    }
}

pub fn document_to_json(doc: Document) -> Value {
    Value::Object(doc.into_iter().map(|(k, v)| (k, bson_to_json(v))).collect())
}

/// Convert a JSON request body into a document, unmodified.
///
/// Only JSON objects are documents.
pub fn json_to_document(value: &Value) -> StoreResult<Document> {
    if !value.is_object() {
        return Err(StoreError::InvalidDocument("expected a JSON object".to_string()));
    }
    bson::to_document(value).map_err(|e| StoreError::InvalidDocument(e.to_string()))
}

#[cfg(test)]
mod tests {
    use bson::{doc, oid::ObjectId};
    use serde_json::json;

    use super::*;

    #[test]
    fn renders_nested_ids_and_plain_numbers() {
        let oid = ObjectId::new();
        let doc = doc! {
            "_id": oid,
            "rentalPrice": 45_i64,
            "rating": 4.5,
            "tags": ["suv", {"ref": oid}],
            "availability": true,
        };
        let value = document_to_json(doc);
        assert_eq!(value["_id"], json!(oid.to_hex()));
        assert_eq!(value["rentalPrice"], json!(45));
        assert_eq!(value["rating"], json!(4.5));
        assert_eq!(value["tags"][1]["ref"], json!(oid.to_hex()));
        assert_eq!(value["availability"], json!(true));
    }

    #[test]
    fn body_is_converted_verbatim() {
        let body = json!({"name": "Corolla", "rentalPrice": 50, "specs": {"seats": 5}});
        let doc = json_to_document(&body).unwrap();
        assert_eq!(doc.get_str("name").unwrap(), "Corolla");
        assert_eq!(doc.get_document("specs").unwrap().get_i64("seats").unwrap(), 5);
        assert_eq!(document_to_json(doc), body);
    }

    #[test]
    fn non_objects_are_rejected() {
        for body in [json!([1, 2]), json!("car"), json!(null)] {
            assert!(matches!(json_to_document(&body), Err(StoreError::InvalidDocument(_))));
        }
    }
}
