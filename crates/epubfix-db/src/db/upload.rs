use async_trait::async_trait;
use epubfix_core::models::{NewUploadRecord, UploadRecord};
use epubfix_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::store::UploadStore;

const UPLOAD_COLUMNS: &str = "id, user_id, title, file_name, file_size, file_type, status, \
    original_url, epub3_url, fixed_url, log_url, created_at";

#[derive(Clone)]
pub struct UploadRepository {
    pool: PgPool,
}

impl UploadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UploadStore for UploadRepository {
    #[tracing::instrument(skip(self, record), fields(db.table = "epubs", db.operation = "insert", db.record_id = %record.id, status = %record.status))]
    async fn create(&self, record: NewUploadRecord) -> Result<UploadRecord, AppError> {
        let query = format!(
            r#"
            INSERT INTO epubs (
                id, user_id, title, file_name, file_size, file_type, status,
                original_url, epub3_url, fixed_url, log_url, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW())
            RETURNING {}
            "#,
            UPLOAD_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, UploadRecord>(&query)
            .bind(record.id)
            .bind(record.user_id)
            .bind(&record.title)
            .bind(&record.file_name)
            .bind(record.file_size)
            .bind(&record.file_type)
            .bind(record.status)
            .bind(&record.original_url)
            .bind(&record.epub3_url)
            .bind(&record.fixed_url)
            .bind(&record.log_url)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "epubs", db.operation = "select", db.user_id = %user_id))]
    async fn list_for_owner(&self, user_id: Uuid) -> Result<Vec<UploadRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM epubs WHERE user_id = $1 ORDER BY created_at DESC",
            UPLOAD_COLUMNS
        );

        let rows = sqlx::query_as::<Postgres, UploadRecord>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "epubs", db.operation = "select", db.record_id = %id))]
    async fn get_for_owner(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<UploadRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM epubs WHERE id = $1 AND user_id = $2",
            UPLOAD_COLUMNS
        );

        let row = sqlx::query_as::<Postgres, UploadRecord>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "epubs", db.operation = "delete", db.record_id = %id))]
    async fn delete_for_owner(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM epubs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "epubs", db.operation = "select"))]
    async fn list_all(&self) -> Result<Vec<UploadRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM epubs ORDER BY created_at DESC",
            UPLOAD_COLUMNS
        );

        let rows = sqlx::query_as::<Postgres, UploadRecord>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    #[tracing::instrument(skip(self), fields(db.table = "epubs", db.operation = "delete"))]
    async fn delete_all(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM epubs")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
