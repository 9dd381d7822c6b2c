//! Storage domain - document store abstraction

mod entity;
mod query;
mod repository;

pub use entity::{Collection, Document, DocumentId, ID_KEY};
pub use query::{
    ArrayUpsert, ConditionalInsert, DeleteResult, Filter, InsertOneResult, Update, UpdateResult,
};
pub use repository::DocumentStore;

#[cfg(test)]
pub use repository::MockDocumentStore;
