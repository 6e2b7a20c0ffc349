//! libSQL implementation of the async `Database` trait.
//!
//! Documents live in a single `documents` table as JSON text keyed by
//! `(collection, id)`. Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::onboarding::merge::{Fields, merge_fields};
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.init_schema().await?;
        Ok(backend)
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Decode a stored document body.
fn parse_body(collection: &str, id: &str, body: &str) -> Result<Fields, DatabaseError> {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(DatabaseError::Serialization(format!(
            "{collection}/{id}: stored document is not an object"
        ))),
        Err(e) => Err(DatabaseError::Serialization(format!("{collection}/{id}: {e}"))),
    }
}

fn encode_body(fields: &Fields) -> Result<String, DatabaseError> {
    serde_json::to_string(fields).map_err(|e| DatabaseError::Serialization(e.to_string()))
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Fields>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT body FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_document: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let body: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("get_document: {e}")))?;
                parse_body(collection, id, &body).map(Some)
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_document: {e}"))),
        }
    }

    async fn merge_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
    ) -> Result<(), DatabaseError> {
        let mut body = self.get_document(collection, id).await?.unwrap_or_default();
        merge_fields(&mut body, fields);

        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let body_str = encode_body(&body)?;

        conn.execute(
            "INSERT INTO documents (collection, id, body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT (collection, id) DO UPDATE SET body = ?3, updated_at = ?4",
            params![collection, id, body_str, now],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("merge_document: {e}")))?;

        debug!(collection, id, fields = fields.len(), "Document merged");
        Ok(())
    }

    async fn create_document(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
    ) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let body_str = encode_body(fields)?;

        let inserted = conn
            .execute(
                "INSERT INTO documents (collection, id, body, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT (collection, id) DO NOTHING",
                params![collection, id, body_str, now],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_document: {e}")))?;

        debug!(collection, id, created = inserted > 0, "Document create attempted");
        Ok(inserted > 0)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
