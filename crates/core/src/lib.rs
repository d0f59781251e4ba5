//! `carhub-core`: shared domain vocabulary.
//!
//! Collection names, document field names, identifiers and the domain error
//! type. This crate has no IO.

pub mod collection;
pub mod error;
pub mod fields;
pub mod id;

pub use collection::Collection;
pub use error::DomainError;
pub use id::DocumentId;
