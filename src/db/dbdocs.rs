use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Error as SqlxError;
use std::time::Duration;
use tracing::{error, info};

use super::docstore::{DocumentStore, StoreError};
use crate::models::{Document, DocumentPatch, NewDocument};

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id SERIAL PRIMARY KEY,
        filename TEXT NOT NULL,
        content TEXT NOT NULL,
        last_modified TEXT NOT NULL
    )
"#;

/// Document Row from database
#[derive(Debug, Clone, sqlx::FromRow)]
struct DocumentRow {
    id: i32,
    filename: String,
    content: String,
    last_modified: String,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: i64::from(row.id),
            filename: row.filename,
            content: row.content,
            last_modified: row.last_modified,
        }
    }
}

/// PostgreSQL backed document store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new database connection pool and make sure the schema exists
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    pub async fn connect(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .connect(database_url)
            .await?;

        sqlx::query(CREATE_TABLE_SQL).execute(&pool).await.map_err(|e| {
            error!("Failed to create documents table: {}", e);
            e
        })?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    fn log_pool_state(&self, op: &str) {
        let pool_idle = self.pool.num_idle() as u32;
        let pool_size = self.pool.size();
        tracing::debug!(
            "{}: pool connections {} idle, {} in use",
            op,
            pool_idle,
            pool_size.saturating_sub(pool_idle)
        );
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, id: i64) -> Result<Option<Document>, StoreError> {
        let Ok(id) = i32::try_from(id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, filename, content, last_modified FROM documents WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Document::from))
    }

    async fn get_by_filename(&self, filename: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, filename, content, last_modified FROM documents WHERE filename = $1 ORDER BY id LIMIT 1",
        )
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Document::from))
    }

    async fn list(&self) -> Result<Vec<Document>, StoreError> {
        self.log_pool_state("list documents");
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, filename, content, last_modified FROM documents ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(total).unwrap_or_default())
    }

    async fn create(&self, new_doc: NewDocument) -> Result<Document, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            INSERT INTO documents (filename, content, last_modified)
            VALUES ($1, $2, $3)
            RETURNING id, filename, content, last_modified
            "#,
        )
        .bind(&new_doc.filename)
        .bind(&new_doc.content)
        .bind(&new_doc.last_modified)
        .fetch_one(&self.pool)
        .await?;
        info!("Document {} created in database", row.id);
        Ok(row.into())
    }

    async fn update(&self, id: i64, patch: DocumentPatch) -> Result<Option<Document>, StoreError> {
        let Ok(id) = i32::try_from(id) else {
            return Ok(None);
        };
        self.log_pool_state("update document");

        // Single statement so overlapping updates serialize on the row lock
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            UPDATE documents SET
                filename = COALESCE($2, filename),
                content = COALESCE($3, content),
                last_modified = COALESCE($4, last_modified)
            WHERE id = $1
            RETURNING id, filename, content, last_modified
            "#,
        )
        .bind(id)
        .bind(patch.filename)
        .bind(patch.content)
        .bind(patch.last_modified)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Document::from))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let Ok(id) = i32::try_from(id) else {
            return Ok(false);
        };
        let result = sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
