//! PostgreSQL document store with connection pooling

use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use tracing::debug;

use crate::domain::storage::{
    ArrayUpsert, ConditionalInsert, DeleteResult, Document, DocumentId, DocumentStore, Filter,
    InsertOneResult, Update, UpdateResult,
};
use crate::domain::DomainError;

/// PostgreSQL storage configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
    /// Idle timeout in seconds
    pub idle_timeout_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/valhalla".to_string(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }
}

/// A filter compiled to a SQL/JSON path predicate and its variables
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    pub path: String,
    pub vars: Value,
}

/// Compile a filter into a `jsonb_path_match` predicate
///
/// Values are bound as path variables (`$v0`, `$v1`, ...). Lax mode unwraps
/// arrays along the path, which gives the any-element semantics of
/// [`Filter::matches`]. Only scalar values can be compared.
pub fn compile_filter(filter: &Filter) -> Result<CompiledFilter, DomainError> {
    let mut vars = Map::new();
    let path = compile_node(filter, &mut vars)?;

    Ok(CompiledFilter {
        path,
        vars: Value::Object(vars),
    })
}

fn compile_node(filter: &Filter, vars: &mut Map<String, Value>) -> Result<String, DomainError> {
    match filter {
        Filter::Eq { path, value } => {
            if value.is_array() || value.is_object() {
                return Err(DomainError::database(format!(
                    "Cannot filter '{}' on a structured value",
                    path
                )));
            }

            let accessor = path_accessor(path);
            if value.is_null() {
                return Ok(format!("(!(exists({accessor})) || {accessor} == null)"));
            }

            let name = format!("v{}", vars.len());
            vars.insert(name.clone(), value.clone());
            Ok(format!("({accessor} == ${name})"))
        }
        Filter::And(filters) if filters.is_empty() => Ok("true".to_string()),
        Filter::And(filters) => {
            let parts = filters
                .iter()
                .map(|f| compile_node(f, vars))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("({})", parts.join(" && ")))
        }
    }
}

fn path_accessor(path: &str) -> String {
    path.split('.').fold(String::from("$"), |mut acc, segment| {
        acc.push('.');
        // a JSON string literal is a valid quoted path key
        acc.push_str(&Value::from(segment).to_string());
        acc
    })
}

/// PostgreSQL document store
///
/// Every collection shares one table with (collection, id, data) columns;
/// documents are stored whole as JSONB. Read-modify-write operations lock
/// the matched row for the duration of their transaction.
pub struct PostgresDocumentStore {
    pool: PgPool,
    table_name: String,
}

impl Debug for PostgresDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresDocumentStore")
            .field("table_name", &self.table_name)
            .finish()
    }
}

impl PostgresDocumentStore {
    /// Creates a new store over the given pool and table name
    pub fn new(pool: PgPool, table_name: impl Into<String>) -> Self {
        Self {
            pool,
            table_name: table_name.into(),
        }
    }

    /// Creates a new store with connection pooling
    pub async fn connect(
        config: &PostgresConfig,
        table_name: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(std::time::Duration::from_secs(config.idle_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| DomainError::database(format!("Failed to connect to PostgreSQL: {}", e)))?;

        Ok(Self::new(pool, table_name))
    }

    /// Ensures the documents table and its index exist
    pub async fn ensure_table(&self) -> Result<(), DomainError> {
        let create_table = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (collection, id)
            )
            "#,
            self.table_name
        );
        let create_index = format!(
            "CREATE INDEX IF NOT EXISTS {0}_data_idx ON {0} USING GIN (data)",
            self.table_name
        );

        for query in [create_table, create_index] {
            sqlx::query(&query)
                .execute(&self.pool)
                .await
                .map_err(|e| DomainError::database(format!("Failed to create table: {}", e)))?;
        }

        Ok(())
    }

    fn insert_query(&self) -> String {
        format!(
            "INSERT INTO {} (collection, id, data) VALUES ($1, $2, $3)",
            self.table_name
        )
    }

    fn prepare_insert(mut document: Document) -> Result<(DocumentId, Value), DomainError> {
        let id = document
            .ensure_id()
            .map_err(|e| DomainError::database(format!("Invalid document id: {}", e)))?;
        Ok((id, Value::from(document)))
    }

    fn decode(data: Value) -> Result<Document, DomainError> {
        Document::try_from(data)
            .map_err(|_| DomainError::database("Stored document is not a JSON object"))
    }

    /// Lock the first matching document, let `mutate` change it, write it back
    async fn modify_one<F>(
        &self,
        collection: &str,
        filter: &Filter,
        mutate: F,
    ) -> Result<UpdateResult, DomainError>
    where
        F: FnOnce(&mut Document) -> bool + Send,
    {
        let compiled = compile_filter(filter)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        let select = format!(
            r#"
            SELECT id, data FROM {}
            WHERE collection = $1 AND jsonb_path_match(data, $2::jsonpath, $3::jsonb)
            ORDER BY created_at, id
            LIMIT 1
            FOR UPDATE
            "#,
            self.table_name
        );

        let row = sqlx::query(&select)
            .bind(collection)
            .bind(&compiled.path)
            .bind(&compiled.vars)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to find document: {}", e)))?;

        let Some(row) = row else {
            return Ok(UpdateResult::default());
        };

        let id: String = row.get("id");
        let mut document = Self::decode(row.get("data"))?;

        if !mutate(&mut document) {
            return Ok(UpdateResult {
                matched_count: 1,
                modified_count: 0,
            });
        }

        let update = format!(
            "UPDATE {} SET data = $3 WHERE collection = $1 AND id = $2",
            self.table_name
        );

        sqlx::query(&update)
            .bind(collection)
            .bind(&id)
            .bind(Value::from(document))
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to update document: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit transaction: {}", e)))?;

        Ok(UpdateResult {
            matched_count: 1,
            modified_count: 1,
        })
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn insert_one(
        &self,
        collection: &str,
        document: Document,
    ) -> Result<InsertOneResult, DomainError> {
        let (id, data) = Self::prepare_insert(document)?;

        sqlx::query(&self.insert_query())
            .bind(collection)
            .bind(id.to_string())
            .bind(data)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to insert document: {}", e)))?;

        debug!(collection = %collection, id = %id, "Inserted document");

        Ok(InsertOneResult {
            inserted_id: Some(id),
        })
    }

    async fn insert_if_absent(
        &self,
        collection: &str,
        document: Document,
        conflict: &Filter,
    ) -> Result<ConditionalInsert, DomainError> {
        let (id, data) = Self::prepare_insert(document)?;
        let compiled = compile_filter(conflict)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        // Serializes every insert guarded by the same conflict filter until commit
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1 || ':' || $2 || ':' || $3))")
            .bind(collection)
            .bind(&compiled.path)
            .bind(compiled.vars.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to acquire insert lock: {}", e)))?;

        let exists = format!(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM {}
                WHERE collection = $1 AND jsonb_path_match(data, $2::jsonpath, $3::jsonb)
            )
            "#,
            self.table_name
        );

        let conflicting: bool = sqlx::query_scalar(&exists)
            .bind(collection)
            .bind(&compiled.path)
            .bind(&compiled.vars)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to find document: {}", e)))?;

        if conflicting {
            debug!(collection = %collection, "Insert skipped on conflict");
            return Ok(ConditionalInsert::Conflict);
        }

        sqlx::query(&self.insert_query())
            .bind(collection)
            .bind(id.to_string())
            .bind(data)
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to insert document: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit transaction: {}", e)))?;

        debug!(collection = %collection, id = %id, "Inserted document");

        Ok(ConditionalInsert::Inserted(InsertOneResult {
            inserted_id: Some(id),
        }))
    }

    async fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<Document>, DomainError> {
        let compiled = compile_filter(filter)?;
        let query = format!(
            r#"
            SELECT data FROM {}
            WHERE collection = $1 AND jsonb_path_match(data, $2::jsonpath, $3::jsonb)
            ORDER BY created_at, id
            LIMIT 1
            "#,
            self.table_name
        );

        let row = sqlx::query(&query)
            .bind(collection)
            .bind(&compiled.path)
            .bind(&compiled.vars)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to find document: {}", e)))?;

        row.map(|row| Self::decode(row.get("data"))).transpose()
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<UpdateResult, DomainError> {
        self.modify_one(collection, filter, |document| update.apply(document))
            .await
    }

    async fn upsert_array_element(
        &self,
        collection: &str,
        filter: &Filter,
        upsert: &ArrayUpsert,
    ) -> Result<UpdateResult, DomainError> {
        self.modify_one(collection, filter, |document| upsert.apply(document))
            .await
    }

    async fn delete_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<DeleteResult, DomainError> {
        let compiled = compile_filter(filter)?;
        let query = format!(
            r#"
            DELETE FROM {0}
            WHERE collection = $1 AND id = (
                SELECT id FROM {0}
                WHERE collection = $1 AND jsonb_path_match(data, $2::jsonpath, $3::jsonb)
                ORDER BY created_at, id
                LIMIT 1
            )
            "#,
            self.table_name
        );

        let result = sqlx::query(&query)
            .bind(collection)
            .bind(&compiled.path)
            .bind(&compiled.vars)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to delete document: {}", e)))?;

        Ok(DeleteResult {
            deleted_count: result.rows_affected(),
        })
    }

    async fn drop_collection(&self, collection: &str) -> Result<(), DomainError> {
        let query = format!("DELETE FROM {} WHERE collection = $1", self.table_name);

        sqlx::query(&query)
            .bind(collection)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to drop collection: {}", e)))?;

        Ok(())
    }
}
