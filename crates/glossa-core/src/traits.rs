//! Core traits for glossa storage abstractions.
//!
//! These traits define the repository interfaces that the protocol engine
//! depends on, enabling the PostgreSQL backend and the in-memory backend to be
//! swapped freely.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Annotation, Collection, Resource};

// =============================================================================
// GENERIC STORE
// =============================================================================

/// Persistence operations for one kind of resource inside one container
/// namespace.
///
/// Lookups include soft-deleted rows so the protocol can tell Gone from
/// Not Found.
#[async_trait]
pub trait ResourceStore<R: Resource>: Send + Sync {
    /// Fetch by slug, deleted or not.
    async fn get_by(&self, slug: &str) -> Result<Option<R>>;

    /// True if any row (deleted included) already uses this slug.
    async fn slug_exists(&self, slug: &str) -> Result<bool>;

    /// Insert a new resource.
    async fn save(&self, resource: &R) -> Result<()>;

    /// Persist the mutable fields of an existing resource.
    async fn update(&self, resource: &R) -> Result<()>;

    /// Soft delete by storage key.
    async fn delete(&self, key: Uuid) -> Result<()>;
}

// =============================================================================
// COLLECTION REPOSITORY
// =============================================================================

/// Repository for annotation collections.
///
/// Every fetched [`Collection`] carries a live `total` of its active
/// annotations.
#[async_trait]
pub trait CollectionRepository: ResourceStore<Collection> {
    /// Active collections ordered by creation time, then key.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Collection>>;

    /// Number of active collections.
    async fn count(&self) -> Result<i64>;
}

// =============================================================================
// ANNOTATION REPOSITORY
// =============================================================================

/// Repository for annotations. Slugs are unique per collection.
#[async_trait]
pub trait AnnotationRepository: Send + Sync {
    async fn get_by(&self, collection_key: Uuid, slug: &str) -> Result<Option<Annotation>>;

    async fn slug_exists(&self, collection_key: Uuid, slug: &str) -> Result<bool>;

    async fn save(&self, annotation: &Annotation) -> Result<()>;

    async fn update(&self, annotation: &Annotation) -> Result<()>;

    async fn delete(&self, key: Uuid) -> Result<()>;

    /// Active annotations of a collection ordered by creation time, then key.
    async fn list(&self, collection_key: Uuid, limit: i64, offset: i64)
        -> Result<Vec<Annotation>>;

    /// Number of active annotations in a collection.
    async fn count(&self, collection_key: Uuid) -> Result<i64>;
}

/// An [`AnnotationRepository`] narrowed to one collection's namespace.
pub struct ScopedAnnotations<'a> {
    repo: &'a dyn AnnotationRepository,
    collection_key: Uuid,
}

impl<'a> ScopedAnnotations<'a> {
    pub fn new(repo: &'a dyn AnnotationRepository, collection_key: Uuid) -> Self {
        Self {
            repo,
            collection_key,
        }
    }

    pub fn collection_key(&self) -> Uuid {
        self.collection_key
    }
}

#[async_trait]
impl ResourceStore<Annotation> for ScopedAnnotations<'_> {
    async fn get_by(&self, slug: &str) -> Result<Option<Annotation>> {
        self.repo.get_by(self.collection_key, slug).await
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        self.repo.slug_exists(self.collection_key, slug).await
    }

    async fn save(&self, annotation: &Annotation) -> Result<()> {
        self.repo.save(annotation).await
    }

    async fn update(&self, annotation: &Annotation) -> Result<()> {
        self.repo.update(annotation).await
    }

    async fn delete(&self, key: Uuid) -> Result<()> {
        self.repo.delete(key).await
    }
}
