//! Collection repository implementation.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use glossa_core::{Collection, CollectionRepository, Error, JsonMap, ResourceStore, Result};

/// Columns of a collection row plus its live annotation count.
const COLLECTION_COLUMNS: &str = r#"
    c.key, c.slug, c.label, c.data, c.created_at_utc, c.modified_at_utc, c.deleted,
    COALESCE((SELECT COUNT(*) FROM annotation a
              WHERE a.collection_key = c.key AND NOT a.deleted), 0) AS total
"#;

pub(crate) fn json_object(value: JsonValue) -> JsonMap {
    match value {
        JsonValue::Object(map) => map,
        _ => JsonMap::new(),
    }
}

fn map_collection(r: PgRow) -> Collection {
    Collection {
        key: r.get("key"),
        slug: r.get("slug"),
        label: r.get("label"),
        extra: json_object(r.get("data")),
        created_at_utc: r.get("created_at_utc"),
        modified_at_utc: r.get("modified_at_utc"),
        deleted: r.get("deleted"),
        total: r.get("total"),
    }
}

/// PostgreSQL implementation of CollectionRepository.
#[derive(Clone)]
pub struct PgCollectionRepository {
    pool: Pool<Postgres>,
}

impl PgCollectionRepository {
    /// Create a new PgCollectionRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

/// A mutation matched no active row: Gone if it was soft deleted meanwhile.
fn gone_or_missing(deleted: Option<bool>, what: &str) -> Error {
    match deleted {
        Some(true) => Error::Gone(format!("collection {} has been deleted", what)),
        _ => Error::NotFound(format!("collection {}", what)),
    }
}

#[async_trait]
impl ResourceStore<Collection> for PgCollectionRepository {
    async fn get_by(&self, slug: &str) -> Result<Option<Collection>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM collection c WHERE c.slug = $1",
            COLLECTION_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(map_collection))
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM collection WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(exists)
    }

    async fn save(&self, collection: &Collection) -> Result<()> {
        sqlx::query(
            "INSERT INTO collection (key, slug, label, data, created_at_utc, modified_at_utc, deleted)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(collection.key)
        .bind(&collection.slug)
        .bind(&collection.label)
        .bind(JsonValue::Object(collection.extra.clone()))
        .bind(collection.created_at_utc)
        .bind(collection.modified_at_utc)
        .bind(collection.deleted)
        .execute(&self.pool)
        .await
        .map_err(Error::from_sqlx)?;

        debug!(
            subsystem = "db",
            component = "collections",
            op = "save",
            slug = %collection.slug,
            "Collection inserted"
        );
        Ok(())
    }

    async fn update(&self, collection: &Collection) -> Result<()> {
        let result = sqlx::query(
            "UPDATE collection SET label = $1, data = $2, modified_at_utc = $3
             WHERE key = $4 AND NOT deleted",
        )
        .bind(&collection.label)
        .bind(JsonValue::Object(collection.extra.clone()))
        .bind(collection.modified_at_utc)
        .bind(collection.key)
        .execute(&self.pool)
        .await
        .map_err(Error::from_sqlx)?;

        if result.rows_affected() == 0 {
            let deleted: Option<bool> =
                sqlx::query_scalar("SELECT deleted FROM collection WHERE key = $1")
                    .bind(collection.key)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(Error::Database)?;
            return Err(gone_or_missing(deleted, &collection.slug));
        }
        Ok(())
    }

    async fn delete(&self, key: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Row lock conflicts with the key-share lock taken by annotation inserts.
        let deleted: Option<bool> =
            sqlx::query_scalar("SELECT deleted FROM collection WHERE key = $1 FOR UPDATE")
                .bind(key)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?;
        if deleted != Some(false) {
            return Err(gone_or_missing(deleted, &key.to_string()));
        }

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM annotation WHERE collection_key = $1 AND NOT deleted",
        )
        .bind(key)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;
        if active > 0 {
            return Err(Error::Constraint(format!(
                "collection still contains {} annotations",
                active
            )));
        }

        sqlx::query("UPDATE collection SET deleted = TRUE WHERE key = $1")
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(Error::from_sqlx)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}

#[async_trait]
impl CollectionRepository for PgCollectionRepository {
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Collection>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM collection c WHERE NOT c.deleted
             ORDER BY c.created_at_utc, c.key
             LIMIT $1 OFFSET $2",
            COLLECTION_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(map_collection).collect())
    }

    async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM collection WHERE NOT deleted")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(count)
    }
}
