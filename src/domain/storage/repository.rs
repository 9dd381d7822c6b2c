//! Document store trait definition

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::domain::DomainError;

use super::entity::Document;
use super::query::{
    ArrayUpsert, ConditionalInsert, DeleteResult, Filter, InsertOneResult, Update, UpdateResult,
};

/// Asynchronous document database handle
///
/// Implementations must be safe to share between any number of repositories.
/// Transport failures surface as [`DomainError::Database`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document, generating an `_id` when the document has none
    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, DomainError>;

    /// Inserts a document unless a stored one already matches `conflict`
    ///
    /// The check and the insert are one atomic step, so concurrent callers
    /// with the same conflict filter see at most one `Inserted`.
    async fn insert_if_absent(
        &self,
        collection: &str,
        document: Document,
        conflict: &Filter,
    ) -> Result<ConditionalInsert, DomainError>;

    /// Returns the first document matching the filter
    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, DomainError>;

    /// Applies an update to the first document matching the filter
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<UpdateResult, DomainError>;

    /// Atomically upserts an element of an embedded array in the first
    /// document matching the filter
    async fn upsert_array_element(
        &self,
        collection: &str,
        filter: &Filter,
        upsert: &ArrayUpsert,
    ) -> Result<UpdateResult, DomainError>;

    /// Deletes the first document matching the filter
    async fn delete_one(&self, collection: &str, filter: &Filter)
        -> Result<DeleteResult, DomainError>;

    /// Removes every document of a collection
    async fn drop_collection(&self, collection: &str) -> Result<(), DomainError>;
}
