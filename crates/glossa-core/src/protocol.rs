//! Protocol operations over any [`Resource`].
//!
//! Each identifier moves through `absent → active → deleted`; deleted is
//! terminal. Lookups report a deleted resource as [`Error::Gone`] and a
//! missing one as [`Error::NotFound`], and no mutation is accepted once a
//! resource is deleted.

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::{debug, info};
use uuid::Uuid;

use crate::defaults::{MAX_SLUG_LEN, SLUG_GENERATION_ATTEMPTS};
use crate::error::{Error, Result};
use crate::models::Resource;
use crate::schema;
use crate::traits::ResourceStore;

fn gone<R: Resource>(slug: &str) -> Error {
    Error::Gone(format!("{} {} has been deleted", R::KIND, slug))
}

/// Fetch an active resource by slug.
pub async fn lookup<R, S>(store: &S, slug: &str) -> Result<R>
where
    R: Resource,
    S: ResourceStore<R> + ?Sized,
{
    match store.get_by(slug).await? {
        None => Err(Error::NotFound(format!("{} {} not found", R::KIND, slug))),
        Some(resource) if resource.is_deleted() => Err(gone::<R>(slug)),
        Some(resource) => Ok(resource),
    }
}

/// Create a resource from a client payload.
///
/// The slug hint is honoured when usable and free in the container; otherwise
/// a generated slug is used. Persistence failures are not retried.
pub async fn create<R, S>(
    store: &S,
    payload: &JsonValue,
    slug_hint: Option<&str>,
    container: R::Container,
) -> Result<R>
where
    R: Resource,
    S: ResourceStore<R> + ?Sized,
{
    let fields = schema::prepare(R::KIND, payload)?;
    let slug = assign_slug(store, slug_hint).await?;
    let resource = R::from_payload(Uuid::now_v7(), slug, container, fields, Utc::now())?;

    store.save(&resource).await?;
    info!(
        subsystem = "protocol",
        op = "create",
        kind = %R::KIND,
        slug = resource.slug(),
        "Resource created"
    );
    Ok(resource)
}

/// Replace the mutable fields of an active resource.
pub async fn update<R, S>(store: &S, mut existing: R, payload: &JsonValue) -> Result<R>
where
    R: Resource,
    S: ResourceStore<R> + ?Sized,
{
    if existing.is_deleted() {
        return Err(gone::<R>(existing.slug()));
    }
    let fields = schema::prepare(R::KIND, payload)?;
    existing.replace(fields, Utc::now())?;

    store.update(&existing).await?;
    info!(
        subsystem = "protocol",
        op = "update",
        kind = %R::KIND,
        slug = existing.slug(),
        "Resource updated"
    );
    Ok(existing)
}

/// Soft delete an active resource.
///
/// A failed flip is reported as a client error.
pub async fn delete<R, S>(store: &S, existing: &R) -> Result<()>
where
    R: Resource,
    S: ResourceStore<R> + ?Sized,
{
    if existing.is_deleted() {
        return Err(gone::<R>(existing.slug()));
    }
    store.delete(existing.key()).await.map_err(|e| {
        if e.is_client_error() {
            e
        } else {
            Error::Constraint(e.to_string())
        }
    })?;
    info!(
        subsystem = "protocol",
        op = "delete",
        kind = %R::KIND,
        slug = existing.slug(),
        "Resource deleted"
    );
    Ok(())
}

// =============================================================================
// SLUGS
// =============================================================================

/// True if `slug` can be used as a single path segment.
pub fn is_usable_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug != "."
        && slug != ".."
        && slug.len() <= MAX_SLUG_LEN
        && !slug.chars().any(|c| c == '/' || c.is_control())
}

/// Decode a raw `Slug` header value (percent-encoded UTF-8).
///
/// Returns `None` for hints that cannot serve as a slug.
pub fn parse_slug_hint(raw: &[u8]) -> Option<String> {
    let decoded = urlencoding::decode_binary(raw);
    let hint = String::from_utf8(decoded.into_owned()).ok()?;
    let hint = hint.trim();
    is_usable_slug(hint).then(|| hint.to_string())
}

async fn assign_slug<R, S>(store: &S, hint: Option<&str>) -> Result<String>
where
    R: Resource,
    S: ResourceStore<R> + ?Sized,
{
    if let Some(hint) = hint.filter(|h| is_usable_slug(h)) {
        if !store.slug_exists(hint).await? {
            return Ok(hint.to_string());
        }
        debug!(kind = %R::KIND, slug = hint, "Slug hint taken, generating one");
    }

    for _ in 0..SLUG_GENERATION_ATTEMPTS {
        let candidate = Uuid::new_v4().to_string();
        if !store.slug_exists(&candidate).await? {
            return Ok(candidate);
        }
    }
    Err(Error::Internal(format!(
        "no free {} slug after {} attempts",
        R::KIND,
        SLUG_GENERATION_ATTEMPTS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRepository;
    use crate::models::{Annotation, Collection};
    use crate::traits::{AnnotationRepository, ScopedAnnotations};
    use serde_json::json;

    #[test]
    fn test_usable_slugs() {
        assert!(is_usable_slug("foo"));
        assert!(is_usable_slug("café"));
        assert!(!is_usable_slug(""));
        assert!(!is_usable_slug("."));
        assert!(!is_usable_slug(".."));
        assert!(!is_usable_slug("a/b"));
        assert!(!is_usable_slug("a\nb"));
        assert!(!is_usable_slug(&"x".repeat(MAX_SLUG_LEN + 1)));
    }

    #[test]
    fn test_parse_slug_hint_decodes_percent_encoding() {
        assert_eq!(parse_slug_hint(b"caf%C3%A9"), Some("café".to_string()));
        assert_eq!(parse_slug_hint(b"  foo "), Some("foo".to_string()));
    }

    #[test]
    fn test_parse_slug_hint_rejects_unusable() {
        assert_eq!(parse_slug_hint(b"a%2Fb"), None);
        assert_eq!(parse_slug_hint(b"%FF"), None);
        assert_eq!(parse_slug_hint(b""), None);
    }

    // ─── lifecycle against the in-memory repositories ───────────────────

    async fn seeded() -> (MemoryRepository, Collection) {
        let repo = MemoryRepository::new();
        let coll: Collection = create(&repo.collections(), &json!({"label": "L"}), Some("coll"), ())
            .await
            .unwrap();
        (repo, coll)
    }

    #[tokio::test]
    async fn test_lookup_absent_is_not_found() {
        let repo = MemoryRepository::new();
        let err = lookup::<Collection, _>(&repo.collections(), "nope").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_uses_slug_hint() {
        let (repo, coll) = seeded().await;
        assert_eq!(coll.slug, "coll");

        let annotations = repo.annotations();
        let scoped = ScopedAnnotations::new(&annotations, coll.key);
        let ann: Annotation = create(
            &scoped,
            &json!({"body": "Simple body", "target": "http://example.com"}),
            Some("foo"),
            coll.key,
        )
        .await
        .unwrap();
        assert_eq!(ann.slug, "foo");
        assert_eq!(ann.collection_key, coll.key);
    }

    #[tokio::test]
    async fn test_create_without_hint_generates_uuid_slug() {
        let repo = MemoryRepository::new();
        let coll: Collection = create(&repo.collections(), &json!({}), None, ()).await.unwrap();
        assert!(Uuid::parse_str(&coll.slug).is_ok());
    }

    #[tokio::test]
    async fn test_taken_hint_falls_back_to_generated_slug() {
        let (repo, _) = seeded().await;
        let second: Collection = create(&repo.collections(), &json!({}), Some("coll"), ())
            .await
            .unwrap();
        assert_ne!(second.slug, "coll");
        assert!(Uuid::parse_str(&second.slug).is_ok());
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_payload() {
        let (repo, coll) = seeded().await;
        let annotations = repo.annotations();
        let scoped = ScopedAnnotations::new(&annotations, coll.key);
        let err = create::<Annotation, _>(&scoped, &json!({"body": "b"}), None, coll.key)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(annotations.count(coll.key).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_deleted_resource_is_gone_forever() {
        let (repo, coll) = seeded().await;
        let annotations = repo.annotations();
        let scoped = ScopedAnnotations::new(&annotations, coll.key);
        let ann: Annotation = create(&scoped, &json!({"target": "t"}), Some("foo"), coll.key)
            .await
            .unwrap();

        delete(&scoped, &ann).await.unwrap();

        let err = lookup::<Annotation, _>(&scoped, "foo").await.unwrap_err();
        assert!(matches!(err, Error::Gone(_)));

        // The slug of a deleted annotation is never handed out again.
        let again: Annotation = create(&scoped, &json!({"target": "t"}), Some("foo"), coll.key)
            .await
            .unwrap();
        assert_ne!(again.slug, "foo");
        assert!(matches!(
            lookup::<Annotation, _>(&scoped, "foo").await,
            Err(Error::Gone(_))
        ));
    }

    #[tokio::test]
    async fn test_mutations_of_deleted_resource_are_gone() {
        let (repo, coll) = seeded().await;
        let annotations = repo.annotations();
        let scoped = ScopedAnnotations::new(&annotations, coll.key);
        let ann: Annotation = create(&scoped, &json!({"target": "t"}), Some("foo"), coll.key)
            .await
            .unwrap();
        delete(&scoped, &ann).await.unwrap();
        let stale = scoped.get_by("foo").await.unwrap().unwrap();

        assert!(matches!(
            update(&scoped, stale.clone(), &json!({"target": "t2"})).await,
            Err(Error::Gone(_))
        ));
        assert!(matches!(delete(&scoped, &stale).await, Err(Error::Gone(_))));
    }

    #[tokio::test]
    async fn test_copy_read_before_delete_cannot_revive() {
        let (repo, coll) = seeded().await;
        let annotations = repo.annotations();
        let scoped = ScopedAnnotations::new(&annotations, coll.key);
        let _: Annotation = create(&scoped, &json!({"target": "t"}), Some("foo"), coll.key)
            .await
            .unwrap();

        let stale: Annotation = lookup(&scoped, "foo").await.unwrap();
        let current: Annotation = lookup(&scoped, "foo").await.unwrap();
        delete(&scoped, &current).await.unwrap();

        let err = update(&scoped, stale.clone(), &json!({"target": "t2"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Gone(_)));
        assert!(matches!(delete(&scoped, &stale).await, Err(Error::Gone(_))));
        assert!(matches!(
            lookup::<Annotation, _>(&scoped, "foo").await,
            Err(Error::Gone(_))
        ));
        assert_eq!(annotations.count(coll.key).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_collection_copy_read_before_delete_cannot_revive() {
        let (repo, coll) = seeded().await;
        let collections = repo.collections();
        let stale: Collection = lookup(&collections, "coll").await.unwrap();
        delete(&collections, &coll).await.unwrap();

        let err = update(&collections, stale.clone(), &json!({"label": "M"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Gone(_)));
        assert!(matches!(delete(&collections, &stale).await, Err(Error::Gone(_))));
        assert!(matches!(
            lookup::<Collection, _>(&collections, "coll").await,
            Err(Error::Gone(_))
        ));
    }

    #[tokio::test]
    async fn test_update_replaces_fields_and_keeps_identity() {
        let (repo, coll) = seeded().await;
        let annotations = repo.annotations();
        let scoped = ScopedAnnotations::new(&annotations, coll.key);
        let ann: Annotation = create(
            &scoped,
            &json!({"body": "b", "target": "t"}),
            Some("foo"),
            coll.key,
        )
        .await
        .unwrap();

        let updated = update(&scoped, ann.clone(), &json!({"target": "t2"}))
            .await
            .unwrap();
        assert_eq!(updated.key, ann.key);
        assert_eq!(updated.slug, ann.slug);
        assert_eq!(updated.created_at_utc, ann.created_at_utc);
        assert!(updated.modified_at_utc.is_some());
        assert_eq!(updated.body, None);

        let stored = lookup::<Annotation, _>(&scoped, "foo").await.unwrap();
        assert_eq!(stored.target, json!("t2"));
    }

    #[tokio::test]
    async fn test_collection_total_is_live() {
        let (repo, coll) = seeded().await;
        let annotations = repo.annotations();
        let scoped = ScopedAnnotations::new(&annotations, coll.key);
        let a: Annotation = create(&scoped, &json!({"target": "t"}), None, coll.key)
            .await
            .unwrap();
        let _: Annotation = create(&scoped, &json!({"target": "t"}), None, coll.key)
            .await
            .unwrap();

        let fetched = lookup::<Collection, _>(&repo.collections(), "coll").await.unwrap();
        assert_eq!(fetched.total, 2);

        delete(&scoped, &a).await.unwrap();
        let fetched = lookup::<Collection, _>(&repo.collections(), "coll").await.unwrap();
        assert_eq!(fetched.total, 1);
    }

    #[tokio::test]
    async fn test_non_empty_collection_cannot_be_deleted() {
        let (repo, coll) = seeded().await;
        let annotations = repo.annotations();
        let scoped = ScopedAnnotations::new(&annotations, coll.key);
        let _: Annotation = create(&scoped, &json!({"target": "t"}), None, coll.key)
            .await
            .unwrap();

        let err = delete(&repo.collections(), &coll).await.unwrap_err();
        assert!(matches!(err, Error::Constraint(_)));
        assert!(lookup::<Collection, _>(&repo.collections(), "coll").await.is_ok());
    }
}
