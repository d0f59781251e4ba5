//! Document store layer: the `DocumentStore` trait, its MongoDB and in-memory
//! backends, and the query vocabulary shared by handlers.

pub mod ack;
pub mod document_store;
pub mod error;
pub mod in_memory;
pub mod json;
mod matcher;
pub mod mongo;
pub mod query;

pub use ack::{DeleteAck, InsertAck, UpdateAck};
pub use document_store::DocumentStore;
pub use error::{StoreError, StoreResult};
pub use in_memory::InMemoryStore;
pub use json::{bson_to_json, document_to_json, json_to_document};
pub use mongo::MongoStore;
pub use query::{FilterBuilder, FindOptions, Page, Projection, Sort};

pub use bson::{doc, Bson, Document};
