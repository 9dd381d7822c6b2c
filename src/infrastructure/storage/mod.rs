//! Storage infrastructure - document store implementations

mod factory;
mod in_memory;
mod postgres;

pub use factory::{StorageConfig, StorageFactory, DOCUMENTS_TABLE};
pub use in_memory::InMemoryDocumentStore;
pub use postgres::{compile_filter, CompiledFilter, PostgresConfig, PostgresDocumentStore};
