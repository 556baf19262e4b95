//! In-memory repositories for tests and local experiments.
//!
//! Enforces the same constraints as the PostgreSQL schema: unique collection
//! slugs, unique annotation slugs per collection, annotations referencing an
//! existing collection, and no deletion of a collection with active
//! annotations. A deleted row refuses further updates and deletes with
//! [`Error::Gone`].

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Annotation, Collection};
use crate::traits::{AnnotationRepository, CollectionRepository, ResourceStore};

#[derive(Debug, Default)]
struct MemoryState {
    collections: Vec<Collection>,
    annotations: Vec<Annotation>,
}

impl MemoryState {
    fn active_count(&self, collection_key: Uuid) -> i64 {
        self.annotations
            .iter()
            .filter(|a| a.collection_key == collection_key && !a.deleted)
            .count() as i64
    }

    fn with_total(&self, collection: &Collection) -> Collection {
        let mut out = collection.clone();
        out.total = self.active_count(collection.key);
        out
    }
}

/// Shared in-memory store handing out both repositories.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collections(&self) -> MemoryCollectionRepository {
        MemoryCollectionRepository {
            state: self.state.clone(),
        }
    }

    pub fn annotations(&self) -> MemoryAnnotationRepository {
        MemoryAnnotationRepository {
            state: self.state.clone(),
        }
    }
}

fn read(state: &RwLock<MemoryState>) -> Result<RwLockReadGuard<'_, MemoryState>> {
    state
        .read()
        .map_err(|_| Error::Internal("memory repository lock poisoned".to_string()))
}

fn write(state: &RwLock<MemoryState>) -> Result<RwLockWriteGuard<'_, MemoryState>> {
    state
        .write()
        .map_err(|_| Error::Internal("memory repository lock poisoned".to_string()))
}

fn page<T: Clone>(items: impl Iterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

// =============================================================================
// COLLECTIONS
// =============================================================================

#[derive(Debug, Clone)]
pub struct MemoryCollectionRepository {
    state: Arc<RwLock<MemoryState>>,
}

#[async_trait]
impl ResourceStore<Collection> for MemoryCollectionRepository {
    async fn get_by(&self, slug: &str) -> Result<Option<Collection>> {
        let state = read(&self.state)?;
        Ok(state
            .collections
            .iter()
            .find(|c| c.slug == slug)
            .map(|c| state.with_total(c)))
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool> {
        Ok(read(&self.state)?.collections.iter().any(|c| c.slug == slug))
    }

    async fn save(&self, collection: &Collection) -> Result<()> {
        let mut state = write(&self.state)?;
        if state.collections.iter().any(|c| c.slug == collection.slug) {
            return Err(Error::Constraint(format!(
                "collection slug {} already exists",
                collection.slug
            )));
        }
        state.collections.push(collection.clone());
        Ok(())
    }

    async fn update(&self, collection: &Collection) -> Result<()> {
        let mut state = write(&self.state)?;
        let stored = state
            .collections
            .iter_mut()
            .find(|c| c.key == collection.key)
            .ok_or_else(|| Error::NotFound(format!("collection {}", collection.slug)))?;
        if stored.deleted {
            return Err(Error::Gone(format!("collection {} has been deleted", stored.slug)));
        }
        *stored = Collection {
            deleted: false,
            ..collection.clone()
        };
        Ok(())
    }

    async fn delete(&self, key: Uuid) -> Result<()> {
        let mut state = write(&self.state)?;
        let active = state.active_count(key);
        let stored = state
            .collections
            .iter_mut()
            .find(|c| c.key == key)
            .ok_or_else(|| Error::NotFound(format!("collection {}", key)))?;
        if stored.deleted {
            return Err(Error::Gone(format!("collection {} has been deleted", stored.slug)));
        }
        if active > 0 {
            return Err(Error::Constraint(
                "collection still contains annotations".to_string(),
            ));
        }
        stored.deleted = true;
        Ok(())
    }
}

#[async_trait]
impl CollectionRepository for MemoryCollectionRepository {
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Collection>> {
        let state = read(&self.state)?;
        let mut active: Vec<&Collection> = state.collections.iter().filter(|c| !c.deleted).collect();
        active.sort_by_key(|c| (c.created_at_utc, c.key));
        Ok(page(
            active.into_iter().map(|c| state.with_total(c)),
            limit,
            offset,
        ))
    }

    async fn count(&self) -> Result<i64> {
        Ok(read(&self.state)?
            .collections
            .iter()
            .filter(|c| !c.deleted)
            .count() as i64)
    }
}

// =============================================================================
// ANNOTATIONS
// =============================================================================

#[derive(Debug, Clone)]
pub struct MemoryAnnotationRepository {
    state: Arc<RwLock<MemoryState>>,
}

#[async_trait]
impl AnnotationRepository for MemoryAnnotationRepository {
    async fn get_by(&self, collection_key: Uuid, slug: &str) -> Result<Option<Annotation>> {
        Ok(read(&self.state)?
            .annotations
            .iter()
            .find(|a| a.collection_key == collection_key && a.slug == slug)
            .cloned())
    }

    async fn slug_exists(&self, collection_key: Uuid, slug: &str) -> Result<bool> {
        Ok(read(&self.state)?
            .annotations
            .iter()
            .any(|a| a.collection_key == collection_key && a.slug == slug))
    }

    async fn save(&self, annotation: &Annotation) -> Result<()> {
        let mut state = write(&self.state)?;
        if !state
            .collections
            .iter()
            .any(|c| c.key == annotation.collection_key)
        {
            return Err(Error::Constraint(format!(
                "collection {} does not exist",
                annotation.collection_key
            )));
        }
        if state
            .annotations
            .iter()
            .any(|a| a.collection_key == annotation.collection_key && a.slug == annotation.slug)
        {
            return Err(Error::Constraint(format!(
                "annotation slug {} already exists",
                annotation.slug
            )));
        }
        state.annotations.push(annotation.clone());
        Ok(())
    }

    async fn update(&self, annotation: &Annotation) -> Result<()> {
        let mut state = write(&self.state)?;
        let stored = state
            .annotations
            .iter_mut()
            .find(|a| a.key == annotation.key)
            .ok_or_else(|| Error::NotFound(format!("annotation {}", annotation.slug)))?;
        if stored.deleted {
            return Err(Error::Gone(format!("annotation {} has been deleted", stored.slug)));
        }
        *stored = Annotation {
            deleted: false,
            ..annotation.clone()
        };
        Ok(())
    }

    async fn delete(&self, key: Uuid) -> Result<()> {
        let mut state = write(&self.state)?;
        let stored = state
            .annotations
            .iter_mut()
            .find(|a| a.key == key)
            .ok_or_else(|| Error::NotFound(format!("annotation {}", key)))?;
        if stored.deleted {
            return Err(Error::Gone(format!("annotation {} has been deleted", stored.slug)));
        }
        stored.deleted = true;
        Ok(())
    }

    async fn list(
        &self,
        collection_key: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Annotation>> {
        let state = read(&self.state)?;
        let mut active: Vec<&Annotation> = state
            .annotations
            .iter()
            .filter(|a| a.collection_key == collection_key && !a.deleted)
            .collect();
        active.sort_by_key(|a| (a.created_at_utc, a.key));
        Ok(page(active.into_iter().cloned(), limit, offset))
    }

    async fn count(&self, collection_key: Uuid) -> Result<i64> {
        Ok(read(&self.state)?.active_count(collection_key))
    }
}
