//! MongoDB-backed document store.
//!
//! One `Client` is created at startup and shared by every request; the driver
//! pools connections internally. The client is shut down explicitly once the
//! HTTP server has drained.

use async_trait::async_trait;
use bson::{doc, Document};
use carhub_core::{fields, Collection};
use futures_util::TryStreamExt;
use mongodb::{
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Client, Database, IndexModel,
};
use tracing::{debug, info};

use crate::{
    ack::{DeleteAck, InsertAck, UpdateAck},
    document_store::DocumentStore,
    error::StoreResult,
    query::FindOptions,
};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug)]
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    /// Connect and ping, so a bad URI fails at startup rather than on the
    /// first request.
    pub async fn connect(uri: &str, database: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }).await?;
        info!(database, "connected to mongodb");
        Ok(Self { client, db })
    }

    /// Unique index on `users.email`, which makes `insert_if_absent` safe
    /// against concurrent sign-ups for the same address.
    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        let mut keys = Document::new();
        keys.insert(fields::user::EMAIL, 1);
        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection(Collection::Users).create_index(index).await?;
        Ok(())
    }

    fn collection(&self, collection: Collection) -> mongodb::Collection<Document> {
        self.db.collection(collection.name())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) => write.code == DUPLICATE_KEY,
        ErrorKind::Command(command) => command.code == DUPLICATE_KEY,
        _ => false,
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend(&self) -> &'static str {
        "mongo"
    }

    async fn insert_one(&self, collection: Collection, doc: Document) -> StoreResult<InsertAck> {
        let result = self.collection(collection).insert_one(doc).await?;
        Ok(InsertAck::new(result.inserted_id))
    }

    async fn insert_if_absent(
        &self,
        collection: Collection,
        filter: Document,
        doc: Document,
    ) -> StoreResult<Option<InsertAck>> {
        let result = self
            .collection(collection)
            .update_one(filter, doc! { "$setOnInsert": doc })
            .upsert(true)
            .await;

        match result {
            Ok(r) => Ok(r.upserted_id.map(InsertAck::new)),
            // Lost a race on the unique index: someone else inserted first.
            Err(e) if is_duplicate_key(&e) => {
                debug!(%collection, "insert_if_absent hit duplicate key");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_one(&self, collection: Collection, filter: Document) -> StoreResult<Option<Document>> {
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn find(
        &self,
        collection: Collection,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let coll = self.collection(collection);
        let mut find = coll.find(filter);
        if let Some(projection) = options.projection {
            find = find.projection(projection.to_document());
        }
        if let Some(sort) = options.sort {
            find = find.sort(sort.to_document());
        }
        if options.skip > 0 {
            find = find.skip(options.skip);
        }
        if let Some(limit) = options.limit {
            find = find.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let cursor = find.await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count(&self, collection: Collection, filter: Document) -> StoreResult<u64> {
        Ok(self.collection(collection).count_documents(filter).await?)
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: Document,
        set: Document,
        upsert: bool,
    ) -> StoreResult<UpdateAck> {
        let result = self
            .collection(collection)
            .update_one(filter, doc! { "$set": set })
            .upsert(upsert)
            .await?;
        Ok(UpdateAck::new(
            result.matched_count,
            result.modified_count,
            result.upserted_id,
        ))
    }

    async fn delete_one(&self, collection: Collection, filter: Document) -> StoreResult<DeleteAck> {
        let result = self.collection(collection).delete_one(filter).await?;
        Ok(DeleteAck::new(result.deleted_count))
    }

    async fn shutdown(&self) {
        info!("closing mongodb client");
        self.client.clone().shutdown().await;
    }
}
