use std::sync::Arc;

use async_trait::async_trait;
use bson::Document;
use carhub_core::Collection;

use crate::{
    ack::{DeleteAck, InsertAck, UpdateAck},
    error::StoreResult,
    query::FindOptions,
};

/// The document database behind every route.
///
/// Each method is a single store round trip and is attempted exactly once.
/// Filters are plain documents in the store's query language; the in-memory
/// backend understands the subset built by [`crate::FilterBuilder`].
///
/// ## Multi-step sequences
///
/// Nothing here is transactional. Callers that pair `count` with `find` over
/// the same filter accept that a concurrent write can land between the two.
/// `insert_if_absent` is the one check-then-act operation and is a single
/// atomic upsert.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name, for logs.
    fn backend(&self) -> &'static str;

    /// Insert `doc` unmodified. An `_id` is generated when absent.
    async fn insert_one(&self, collection: Collection, doc: Document) -> StoreResult<InsertAck>;

    /// Insert `doc` only if nothing matches `filter`.
    ///
    /// Returns `None` when a matching document already exists.
    async fn insert_if_absent(
        &self,
        collection: Collection,
        filter: Document,
        doc: Document,
    ) -> StoreResult<Option<InsertAck>>;

    async fn find_one(&self, collection: Collection, filter: Document) -> StoreResult<Option<Document>>;

    async fn find(
        &self,
        collection: Collection,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>>;

    async fn count(&self, collection: Collection, filter: Document) -> StoreResult<u64>;

    /// Merge `set` into the first document matching `filter`.
    ///
    /// Fields absent from `set` are left untouched. With `upsert`, a missing
    /// document is created from the filter's equality fields plus `set`.
    async fn update_one(
        &self,
        collection: Collection,
        filter: Document,
        set: Document,
        upsert: bool,
    ) -> StoreResult<UpdateAck>;

    /// Remove the first document matching `filter`. Matching nothing is not an
    /// error; the ack reports zero.
    async fn delete_one(&self, collection: Collection, filter: Document) -> StoreResult<DeleteAck>;

    /// Release the connection. Called once, after the server has drained.
    async fn shutdown(&self);
}

#[async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    async fn insert_one(&self, collection: Collection, doc: Document) -> StoreResult<InsertAck> {
        (**self).insert_one(collection, doc).await
    }

    async fn insert_if_absent(
        &self,
        collection: Collection,
        filter: Document,
        doc: Document,
    ) -> StoreResult<Option<InsertAck>> {
        (**self).insert_if_absent(collection, filter, doc).await
    }

    async fn find_one(&self, collection: Collection, filter: Document) -> StoreResult<Option<Document>> {
        (**self).find_one(collection, filter).await
    }

    async fn find(
        &self,
        collection: Collection,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        (**self).find(collection, filter, options).await
    }

    async fn count(&self, collection: Collection, filter: Document) -> StoreResult<u64> {
        (**self).count(collection, filter).await
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: Document,
        set: Document,
        upsert: bool,
    ) -> StoreResult<UpdateAck> {
        (**self).update_one(collection, filter, set, upsert).await
    }

    async fn delete_one(&self, collection: Collection, filter: Document) -> StoreResult<DeleteAck> {
        (**self).delete_one(collection, filter).await
    }

    async fn shutdown(&self) {
        (**self).shutdown().await
    }
}
