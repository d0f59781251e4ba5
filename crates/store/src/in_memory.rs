use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bson::{oid::ObjectId, Bson, Document};
use carhub_core::{fields, Collection};

use crate::{
    ack::{DeleteAck, InsertAck, UpdateAck},
    document_store::DocumentStore,
    error::{StoreError, StoreResult},
    matcher,
    query::FindOptions,
};

/// In-memory document store for tests/dev.
///
/// Collections keep insertion order, which stands in for the store's natural
/// order. Dotted paths are resolved both when matching and by `$set`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection, ignoring filters.
    pub fn len(&self, collection: Collection) -> usize {
        self.inner
            .read()
            .map(|map| map.get(&collection).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: Collection) -> bool {
        self.len(collection) == 0
    }

    fn with_docs<T>(&self, collection: Collection, f: impl FnOnce(&[Document]) -> StoreResult<T>) -> StoreResult<T> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let docs = map.get(&collection).map(Vec::as_slice).unwrap_or_default();
        f(docs)
    }

    fn with_docs_mut<T>(
        &self,
        collection: Collection,
        f: impl FnOnce(&mut Vec<Document>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        f(map.entry(collection).or_default())
    }
}

/// Put an `_id` first, generating one when the document has none.
fn with_id(mut doc: Document) -> (Bson, Document) {
    let id = doc
        .remove(fields::ID)
        .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));
    let mut out = Document::new();
    out.insert(fields::ID, id.clone());
    merge(&mut out, doc);
    (id, out)
}

fn merge(target: &mut Document, fields: Document) {
    for (key, value) in fields {
        target.insert(key, value);
    }
}

/// Apply one `$set` entry, creating intermediate documents along a dotted
/// path. Returns whether the stored value changed.
fn set_path(doc: &mut Document, path: &str, value: Bson) -> StoreResult<bool> {
    let Some((head, rest)) = path.split_once('.') else {
        if doc.get(path) == Some(&value) {
            return Ok(false);
        }
        doc.insert(path, value);
        return Ok(true);
    };

    if !doc.contains_key(head) {
        doc.insert(head, Document::new());
    }
    match doc.get_mut(head) {
        Some(Bson::Document(inner)) => set_path(inner, rest, value),
        _ => Err(StoreError::InvalidDocument(format!(
            "cannot set '{rest}' inside non-document field '{head}'"
        ))),
    }
}

fn position(docs: &[Document], filter: &Document) -> StoreResult<Option<usize>> {
    for (i, doc) in docs.iter().enumerate() {
        if matcher::matches(doc, filter)? {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert_one(&self, collection: Collection, doc: Document) -> StoreResult<InsertAck> {
        let (id, doc) = with_id(doc);
        self.with_docs_mut(collection, |docs| {
            if docs.iter().any(|d| d.get(fields::ID) == Some(&id)) {
                return Err(StoreError::InvalidDocument(format!("duplicate _id {id}")));
            }
            docs.push(doc);
            Ok(InsertAck::new(id))
        })
    }

    async fn insert_if_absent(
        &self,
        collection: Collection,
        filter: Document,
        doc: Document,
    ) -> StoreResult<Option<InsertAck>> {
        // Check and insert under one write lock, so this is atomic.
        self.with_docs_mut(collection, |docs| {
            if position(docs, &filter)?.is_some() {
                return Ok(None);
            }
            let mut seeded = matcher::equality_fields(&filter);
            merge(&mut seeded, doc);
            let (id, seeded) = with_id(seeded);
            docs.push(seeded);
            Ok(Some(InsertAck::new(id)))
        })
    }

    async fn find_one(&self, collection: Collection, filter: Document) -> StoreResult<Option<Document>> {
        self.with_docs(collection, |docs| {
            Ok(position(docs, &filter)?.and_then(|i| docs.get(i).cloned()))
        })
    }

    async fn find(
        &self,
        collection: Collection,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let mut matched = self.with_docs(collection, |docs| {
            let mut out = Vec::new();
            for doc in docs {
                if matcher::matches(doc, &filter)? {
                    out.push(doc.clone());
                }
            }
            Ok(out)
        })?;

        if let Some(sort) = options.sort {
            matched.sort_by(|a, b| matcher::compare(b.get(sort.field()), a.get(sort.field())));
        }

        let skip = usize::try_from(options.skip).unwrap_or(usize::MAX);
        let limit = options
            .limit
            .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

        Ok(matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| match &options.projection {
                Some(projection) => matcher::project(doc, projection),
                None => doc,
            })
            .collect())
    }

    async fn count(&self, collection: Collection, filter: Document) -> StoreResult<u64> {
        self.with_docs(collection, |docs| {
            let mut n = 0;
            for doc in docs {
                if matcher::matches(doc, &filter)? {
                    n += 1;
                }
            }
            Ok(n)
        })
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: Document,
        set: Document,
        upsert: bool,
    ) -> StoreResult<UpdateAck> {
        self.with_docs_mut(collection, |docs| {
            match position(docs, &filter)? {
                Some(i) => {
                    let Some(doc) = docs.get_mut(i) else {
                        return Ok(UpdateAck::unmodified(0));
                    };
                    let mut changed = false;
                    for (key, value) in set {
                        changed |= set_path(doc, &key, value)?;
                    }
                    Ok(UpdateAck::new(1, u64::from(changed), None))
                }
                None if upsert => {
                    let mut seeded = matcher::equality_fields(&filter);
                    for (key, value) in set {
                        set_path(&mut seeded, &key, value)?;
                    }
                    let (id, seeded) = with_id(seeded);
                    docs.push(seeded);
                    Ok(UpdateAck::new(0, 0, Some(id)))
                }
                None => Ok(UpdateAck::unmodified(0)),
            }
        })
    }

    async fn delete_one(&self, collection: Collection, filter: Document) -> StoreResult<DeleteAck> {
        self.with_docs_mut(collection, |docs| match position(docs, &filter)? {
            Some(i) => {
                docs.remove(i);
                Ok(DeleteAck::new(1))
            }
            None => Ok(DeleteAck::new(0)),
        })
    }

    async fn shutdown(&self) {}
}
