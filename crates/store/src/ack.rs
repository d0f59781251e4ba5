//! Acknowledgment records returned by mutations.
//!
//! The JSON shape mirrors what the Node driver's result objects serialize to,
//! which is what existing clients of this API read.

use bson::Bson;
use serde::{Serialize, Serializer};

use crate::json::bson_to_json;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAck {
    pub acknowledged: bool,
    #[serde(serialize_with = "serialize_bson")]
    pub inserted_id: Bson,
}

impl InsertAck {
    pub fn new(inserted_id: Bson) -> Self {
        Self {
            acknowledged: true,
            inserted_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAck {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    #[serde(serialize_with = "serialize_opt_bson")]
    pub upserted_id: Option<Bson>,
    pub upserted_count: u64,
}

impl UpdateAck {
    pub fn new(matched_count: u64, modified_count: u64, upserted_id: Option<Bson>) -> Self {
        let upserted_count = u64::from(upserted_id.is_some());
        Self {
            acknowledged: true,
            matched_count,
            modified_count,
            upserted_id,
            upserted_count,
        }
    }

    /// Ack for an update that had nothing to set.
    pub fn unmodified(matched_count: u64) -> Self {
        Self::new(matched_count, 0, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAck {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteAck {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}

fn serialize_bson<S: Serializer>(value: &Bson, serializer: S) -> Result<S::Ok, S::Error> {
    bson_to_json(value.clone()).serialize(serializer)
}

fn serialize_opt_bson<S: Serializer>(value: &Option<Bson>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serialize_bson(v, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use bson::oid::ObjectId;
    use serde_json::json;

    use super::*;

    #[test]
    fn insert_ack_renders_object_id_as_hex() {
        let oid = ObjectId::parse_str("65a1f0c2e4b0a1b2c3d4e5f6").unwrap();
        let ack = InsertAck::new(Bson::ObjectId(oid));
        assert_eq!(
            serde_json::to_value(&ack).unwrap(),
            json!({"acknowledged": true, "insertedId": "65a1f0c2e4b0a1b2c3d4e5f6"})
        );
    }

    #[test]
    fn update_ack_counts_upserts() {
        let ack = UpdateAck::new(0, 0, Some(Bson::ObjectId(ObjectId::new())));
        assert_eq!(ack.upserted_count, 1);
        let value = serde_json::to_value(UpdateAck::unmodified(1)).unwrap();
        assert_eq!(value["matchedCount"], 1);
        assert_eq!(value["modifiedCount"], 0);
        assert!(value["upsertedId"].is_null());
    }

    #[test]
    fn delete_ack_shape() {
        assert_eq!(
            serde_json::to_value(DeleteAck::new(0)).unwrap(),
            json!({"acknowledged": true, "deletedCount": 0})
        );
    }
}
