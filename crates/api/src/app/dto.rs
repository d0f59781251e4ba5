use serde::{Deserialize, Serialize};
use serde_json::Value;

use carhub_core::fields;
use carhub_store::{document_to_json, json_to_document, Document, Page, StoreError};

use crate::app::errors::ApiError;

/// Query string for paginated car listings.
#[derive(Debug, Default, Deserialize)]
pub struct CarListQuery {
    pub search: Option<String>,
    pub availability: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl CarListQuery {
    /// Missing page means the first; missing or zero limit means no limit.
    pub fn page(&self) -> Page {
        Page::new(self.page.unwrap_or(1), self.limit.unwrap_or(0))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CurrentUserQuery {
    pub email: Option<String>,
}

/// One page of cars plus the total match count ignoring pagination.
#[derive(Debug, Serialize)]
pub struct CarPage {
    pub cars: Vec<Value>,
    pub total: u64,
}

/// Convert a request body into a document, as-is.
pub fn body_to_document(body: &Value) -> Result<Document, ApiError> {
    json_to_document(body).map_err(|e| match e {
        StoreError::InvalidDocument(msg) => ApiError::BadRequest(msg),
        other => ApiError::Store(other),
    })
}

/// Fields to `$set` from an update body. `_id` is never client-writable.
pub fn update_fields(body: &Value) -> Result<Document, ApiError> {
    let mut doc = body_to_document(body)?;
    doc.remove(fields::ID);
    Ok(doc)
}

/// The body's `email` field, when present.
///
/// `Some(None)` means the field is present but not a string.
pub fn body_email(body: &Value) -> Option<Option<&str>> {
    body.get(fields::user::EMAIL).map(Value::as_str)
}

pub fn documents_to_json(docs: Vec<Document>) -> Vec<Value> {
    docs.into_iter().map(document_to_json).collect()
}

pub fn optional_document_to_json(doc: Option<Document>) -> Value {
    doc.map(document_to_json).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn update_fields_drop_id_and_keep_the_rest() {
        let set = update_fields(&json!({"_id": "x", "rentalPrice": 70, "name": "A"})).unwrap();
        assert!(set.get("_id").is_none());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn non_object_bodies_are_bad_requests() {
        assert!(matches!(body_to_document(&json!([1, 2])), Err(ApiError::BadRequest(_))));
        assert!(matches!(body_to_document(&json!("car")), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn body_email_distinguishes_absent_and_non_string() {
        assert_eq!(body_email(&json!({})), None);
        assert_eq!(body_email(&json!({"email": 5})), Some(None));
        assert_eq!(body_email(&json!({"email": "a@x.com"})), Some(Some("a@x.com")));
    }

    #[test]
    fn page_defaults_to_unlimited_first_page() {
        let page = CarListQuery::default().page();
        assert_eq!(page.skip(), 0);
        assert_eq!(page.limit(), None);
    }
}
