//! Store calls shared by several routes.

use carhub_core::{Collection, DocumentId};
use carhub_store::{Document, DocumentStore, FindOptions, Page, UpdateAck};

use crate::app::dto::{self, CarPage};
use crate::app::errors::ApiError;

/// Parse a path identifier. `None` for anything that is not a valid id;
/// callers answer with an empty result instead of an error.
pub fn parse_id(raw: &str) -> Option<DocumentId> {
    raw.parse().ok()
}

/// One page of cars plus the unpaginated match count.
///
/// Both reads run concurrently over the same filter; any failure fails the
/// request.
pub async fn car_page(
    store: &dyn DocumentStore,
    filter: Document,
    options: FindOptions,
    page: Page,
) -> Result<CarPage, ApiError> {
    let (docs, total) = tokio::try_join!(
        store.find(Collection::Cars, filter.clone(), options.page(page)),
        store.count(Collection::Cars, filter),
    )?;

    Ok(CarPage {
        cars: dto::documents_to_json(docs),
        total,
    })
}

/// Apply a partial update. An empty `set` writes nothing and reports how many
/// documents matched.
pub async fn apply_update(
    store: &dyn DocumentStore,
    collection: Collection,
    filter: Document,
    set: Document,
    upsert: bool,
) -> Result<UpdateAck, ApiError> {
    if set.is_empty() {
        let matched = store.count(collection, filter).await?;
        return Ok(UpdateAck::unmodified(matched.min(1)));
    }
    Ok(store.update_one(collection, filter, set, upsert).await?)
}

#[cfg(test)]
mod tests {
    use carhub_store::{doc, FilterBuilder, InMemoryStore};

    use super::*;

    #[test]
    fn malformed_ids_parse_to_none() {
        assert!(parse_id("not-an-id").is_none());
        assert!(parse_id("").is_none());
        assert!(parse_id("64b7f0c2a1b2c3d4e5f60718").is_some());
    }

    #[tokio::test]
    async fn empty_update_reports_match_without_writing() {
        let store = InMemoryStore::new();
        store
            .insert_one(Collection::Cars, doc! { "name": "Civic", "providerEmail": "a@x.com" })
            .await
            .unwrap();

        let filter = FilterBuilder::new().eq("providerEmail", "a@x.com").build();
        let ack = apply_update(&store, Collection::Cars, filter, Document::new(), false)
            .await
            .unwrap();
        assert_eq!(ack.matched_count, 1);
        assert_eq!(ack.modified_count, 0);

        let filter = FilterBuilder::new().eq("providerEmail", "b@x.com").build();
        let ack = apply_update(&store, Collection::Users, filter, Document::new(), true)
            .await
            .unwrap();
        assert_eq!(ack.matched_count, 0);
        assert_eq!(store.len(Collection::Users), 0);
    }

    #[tokio::test]
    async fn car_page_counts_beyond_the_page() {
        let store = InMemoryStore::new();
        for name in ["A", "B", "C"] {
            store
                .insert_one(Collection::Cars, doc! { "name": name })
                .await
                .unwrap();
        }

        let page = car_page(&store, Document::new(), FindOptions::default(), Page::new(2, 2))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.cars.len(), 1);
    }
}
