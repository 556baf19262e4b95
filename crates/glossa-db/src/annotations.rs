//! Annotation repository implementation.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use glossa_core::{Annotation, AnnotationRepository, Error, Result};

use crate::collections::json_object;

const ANNOTATION_COLUMNS: &str = "key, slug, collection_key, body, target, creator, stylesheet, \
     data, created_at_utc, modified_at_utc, deleted";

fn map_annotation(r: PgRow) -> Annotation {
    Annotation {
        key: r.get("key"),
        slug: r.get("slug"),
        collection_key: r.get("collection_key"),
        body: r.get("body"),
        target: r.get("target"),
        creator: r.get("creator"),
        stylesheet: r.get("stylesheet"),
        extra: json_object(r.get("data")),
        created_at_utc: r.get("created_at_utc"),
        modified_at_utc: r.get("modified_at_utc"),
        deleted: r.get("deleted"),
    }
}

/// PostgreSQL implementation of AnnotationRepository.
#[derive(Clone)]
pub struct PgAnnotationRepository {
    pool: Pool<Postgres>,
}

/// A mutation matched no active row: Gone if it was soft deleted meanwhile.
fn gone_or_missing(deleted: Option<bool>, what: &str) -> Error {
    match deleted {
        Some(true) => Error::Gone(format!("annotation {} has been deleted", what)),
        _ => Error::NotFound(format!("annotation {}", what)),
    }
}

impl PgAnnotationRepository {
    /// Create a new PgAnnotationRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn deleted_flag(&self, key: Uuid) -> Result<Option<bool>> {
        sqlx::query_scalar("SELECT deleted FROM annotation WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }
}

#[async_trait]
impl AnnotationRepository for PgAnnotationRepository {
    async fn get_by(&self, collection_key: Uuid, slug: &str) -> Result<Option<Annotation>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM annotation WHERE collection_key = $1 AND slug = $2",
            ANNOTATION_COLUMNS
        ))
        .bind(collection_key)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(map_annotation))
    }

    async fn slug_exists(&self, collection_key: Uuid, slug: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM annotation WHERE collection_key = $1 AND slug = $2)",
        )
        .bind(collection_key)
        .bind(slug)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(exists)
    }

    async fn save(&self, annotation: &Annotation) -> Result<()> {
        sqlx::query(
            "INSERT INTO annotation (key, slug, collection_key, body, target, creator, stylesheet,
                                     data, created_at_utc, modified_at_utc, deleted)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(annotation.key)
        .bind(&annotation.slug)
        .bind(annotation.collection_key)
        .bind(&annotation.body)
        .bind(&annotation.target)
        .bind(&annotation.creator)
        .bind(&annotation.stylesheet)
        .bind(JsonValue::Object(annotation.extra.clone()))
        .bind(annotation.created_at_utc)
        .bind(annotation.modified_at_utc)
        .bind(annotation.deleted)
        .execute(&self.pool)
        .await
        .map_err(Error::from_sqlx)?;

        debug!(
            subsystem = "db",
            component = "annotations",
            op = "save",
            slug = %annotation.slug,
            "Annotation inserted"
        );
        Ok(())
    }

    async fn update(&self, annotation: &Annotation) -> Result<()> {
        let result = sqlx::query(
            "UPDATE annotation
             SET body = $1, target = $2, creator = $3, stylesheet = $4, data = $5,
                 modified_at_utc = $6
             WHERE key = $7 AND NOT deleted",
        )
        .bind(&annotation.body)
        .bind(&annotation.target)
        .bind(&annotation.creator)
        .bind(&annotation.stylesheet)
        .bind(JsonValue::Object(annotation.extra.clone()))
        .bind(annotation.modified_at_utc)
        .bind(annotation.key)
        .execute(&self.pool)
        .await
        .map_err(Error::from_sqlx)?;

        if result.rows_affected() == 0 {
            let deleted = self.deleted_flag(annotation.key).await?;
            return Err(gone_or_missing(deleted, &annotation.slug));
        }
        Ok(())
    }

    async fn delete(&self, key: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE annotation SET deleted = TRUE WHERE key = $1 AND NOT deleted")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(Error::from_sqlx)?;

        if result.rows_affected() == 0 {
            let deleted = self.deleted_flag(key).await?;
            return Err(gone_or_missing(deleted, &key.to_string()));
        }
        Ok(())
    }

    async fn list(
        &self,
        collection_key: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Annotation>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM annotation
             WHERE collection_key = $1 AND NOT deleted
             ORDER BY created_at_utc, key
             LIMIT $2 OFFSET $3",
            ANNOTATION_COLUMNS
        ))
        .bind(collection_key)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_annotation).collect())
    }

    async fn count(&self, collection_key: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM annotation WHERE collection_key = $1 AND NOT deleted",
        )
        .bind(collection_key)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(count)
    }
}
