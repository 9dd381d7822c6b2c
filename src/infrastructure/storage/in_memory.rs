//! In-memory document store implementation

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::storage::{
    ArrayUpsert, ConditionalInsert, DeleteResult, Document, DocumentStore, Filter,
    InsertOneResult, Update, UpdateResult,
};
use crate::domain::DomainError;

/// Thread-safe in-memory document store
///
/// Useful for testing and development. Data is lost when the process
/// terminates. Each mutation holds the write lock for its whole duration,
/// so every operation is atomic with respect to the others.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held in a collection
    #[cfg(test)]
    pub(crate) async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }
}

fn push_document(
    documents: &mut Vec<Document>,
    collection: &str,
    mut document: Document,
) -> Result<InsertOneResult, DomainError> {
    let id = document
        .ensure_id()
        .map_err(|e| DomainError::database(format!("Invalid document id: {}", e)))?;

    if documents.iter().any(|existing| existing.id() == Some(id)) {
        return Err(DomainError::database(format!(
            "Document with id '{}' already exists in '{}'",
            id, collection
        )));
    }

    documents.push(document);

    Ok(InsertOneResult {
        inserted_id: Some(id),
    })
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, DomainError> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        push_document(documents, collection, document)
    }

    async fn insert_if_absent(
        &self,
        collection: &str,
        document: Document,
        conflict: &Filter,
    ) -> Result<ConditionalInsert, DomainError> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        if documents.iter().any(|existing| conflict.matches(existing)) {
            return Ok(ConditionalInsert::Conflict);
        }

        push_document(documents, collection, document).map(ConditionalInsert::Inserted)
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, DomainError> {
        let collections = self.collections.read().await;

        Ok(collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|doc| filter.matches(doc)))
            .cloned())
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<UpdateResult, DomainError> {
        let mut collections = self.collections.write().await;

        let Some(document) = collections
            .get_mut(collection)
            .and_then(|documents| documents.iter_mut().find(|doc| filter.matches(doc)))
        else {
            return Ok(UpdateResult::default());
        };

        Ok(UpdateResult {
            matched_count: 1,
            modified_count: u64::from(update.apply(document)),
        })
    }

    async fn upsert_array_element(
        &self,
        collection: &str,
        filter: &Filter,
        upsert: &ArrayUpsert,
    ) -> Result<UpdateResult, DomainError> {
        let mut collections = self.collections.write().await;

        let Some(document) = collections
            .get_mut(collection)
            .and_then(|documents| documents.iter_mut().find(|doc| filter.matches(doc)))
        else {
            return Ok(UpdateResult::default());
        };

        Ok(UpdateResult {
            matched_count: 1,
            modified_count: u64::from(upsert.apply(document)),
        })
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<DeleteResult, DomainError> {
        let mut collections = self.collections.write().await;

        let Some(documents) = collections.get_mut(collection) else {
            return Ok(DeleteResult::default());
        };

        match documents.iter().position(|doc| filter.matches(doc)) {
            Some(index) => {
                documents.remove(index);
                Ok(DeleteResult { deleted_count: 1 })
            }
            None => Ok(DeleteResult::default()),
        }
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), DomainError> {
        self.collections.write().await.remove(collection);
        Ok(())
    }
}
