//! Core data models for glossa.
//!
//! Annotations and collections are plain records. Both implement
//! [`Resource`], the capability the protocol engine works against: a storage
//! key that never leaves the server, a slug that names the resource inside its
//! container, a soft-delete flag, and a canonical field projection.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value as JsonValue};
use uuid::Uuid;

use crate::error::{Error, Result};

/// JSON object used for payloads and projections.
pub type JsonMap = Map<String, JsonValue>;

// =============================================================================
// RESOURCE CAPABILITY
// =============================================================================

/// The kinds of resource the server stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Annotation,
    Collection,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Annotation => "annotation",
            ResourceKind::Collection => "collection",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical field-to-value projection of something that can be rendered.
///
/// Object safe so the representation builder can take `&dyn Projection`.
pub trait Projection: Send + Sync {
    /// Path segment naming this object inside its container.
    fn slug(&self) -> &str;

    /// Declared fields as a flat JSON object. Never contains the storage key
    /// or an `id`; identifiers are minted by the IRI resolver.
    fn dictize(&self) -> JsonMap;
}

/// Shared capability of every persisted domain object.
pub trait Resource: Projection + Clone + fmt::Debug + 'static {
    /// Owner handed to newly created objects.
    type Container: Copy + Send + Sync;

    const KIND: ResourceKind;

    /// JSON-LD `type` set rendered for this kind.
    const TYPES: &'static [&'static str];

    fn key(&self) -> Uuid;

    fn is_deleted(&self) -> bool;

    /// Build a new, active object from an already validated payload.
    fn from_payload(
        key: Uuid,
        slug: String,
        container: Self::Container,
        payload: JsonMap,
        now: DateTime<Utc>,
    ) -> Result<Self>;

    /// Replace every mutable field from an already validated payload.
    ///
    /// `key`, `slug` and `created` are left untouched; `modified` becomes `now`.
    fn replace(&mut self, payload: JsonMap, now: DateTime<Utc>) -> Result<()>;
}

/// Render a timestamp the way every representation carries it
/// (`2026-10-17T09:30:00Z`).
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn types_value(types: &[&str]) -> JsonValue {
    match types {
        [single] => JsonValue::String((*single).to_string()),
        many => JsonValue::Array(
            many.iter()
                .map(|t| JsonValue::String((*t).to_string()))
                .collect(),
        ),
    }
}

fn insert_timestamps(out: &mut JsonMap, created: &DateTime<Utc>, modified: Option<&DateTime<Utc>>) {
    out.insert("created".to_string(), json!(format_timestamp(created)));
    if let Some(modified) = modified {
        out.insert("modified".to_string(), json!(format_timestamp(modified)));
    }
}

// =============================================================================
// ANNOTATION
// =============================================================================

/// A Web Annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub key: Uuid,
    pub slug: String,
    pub collection_key: Uuid,
    pub body: Option<JsonValue>,
    pub target: JsonValue,
    pub creator: Option<JsonValue>,
    pub stylesheet: Option<JsonValue>,
    /// Other Web Annotation properties (motivation, rights, ...) kept verbatim.
    pub extra: JsonMap,
    pub created_at_utc: DateTime<Utc>,
    pub modified_at_utc: Option<DateTime<Utc>>,
    pub deleted: bool,
}

struct AnnotationFields {
    body: Option<JsonValue>,
    target: JsonValue,
    creator: Option<JsonValue>,
    stylesheet: Option<JsonValue>,
    extra: JsonMap,
}

impl AnnotationFields {
    fn split(mut payload: JsonMap) -> Result<Self> {
        let target = payload
            .remove("target")
            .ok_or_else(|| Error::Validation("\"target\" is a required property".to_string()))?;
        Ok(Self {
            body: payload.remove("body"),
            target,
            creator: payload.remove("creator"),
            stylesheet: payload.remove("stylesheet"),
            extra: payload,
        })
    }
}

impl Projection for Annotation {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn dictize(&self) -> JsonMap {
        let mut out = self.extra.clone();
        out.insert("type".to_string(), types_value(Self::TYPES));
        if let Some(body) = &self.body {
            out.insert("body".to_string(), body.clone());
        }
        out.insert("target".to_string(), self.target.clone());
        if let Some(creator) = &self.creator {
            out.insert("creator".to_string(), creator.clone());
        }
        if let Some(stylesheet) = &self.stylesheet {
            out.insert("stylesheet".to_string(), stylesheet.clone());
        }
        insert_timestamps(&mut out, &self.created_at_utc, self.modified_at_utc.as_ref());
        out
    }
}

impl Resource for Annotation {
    type Container = Uuid;

    const KIND: ResourceKind = ResourceKind::Annotation;
    const TYPES: &'static [&'static str] = &["Annotation"];

    fn key(&self) -> Uuid {
        self.key
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn from_payload(
        key: Uuid,
        slug: String,
        collection_key: Uuid,
        payload: JsonMap,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let fields = AnnotationFields::split(payload)?;
        Ok(Self {
            key,
            slug,
            collection_key,
            body: fields.body,
            target: fields.target,
            creator: fields.creator,
            stylesheet: fields.stylesheet,
            extra: fields.extra,
            created_at_utc: now,
            modified_at_utc: None,
            deleted: false,
        })
    }

    fn replace(&mut self, payload: JsonMap, now: DateTime<Utc>) -> Result<()> {
        let fields = AnnotationFields::split(payload)?;
        self.body = fields.body;
        self.target = fields.target;
        self.creator = fields.creator;
        self.stylesheet = fields.stylesheet;
        self.extra = fields.extra;
        self.modified_at_utc = Some(now);
        Ok(())
    }
}

// =============================================================================
// COLLECTION
// =============================================================================

/// An annotation collection (an LDP basic container).
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    pub key: Uuid,
    pub slug: String,
    pub label: Option<String>,
    pub extra: JsonMap,
    pub created_at_utc: DateTime<Utc>,
    pub modified_at_utc: Option<DateTime<Utc>>,
    pub deleted: bool,
    /// Live count of active annotations, filled in by the repository on fetch.
    pub total: i64,
}

fn split_label(payload: &mut JsonMap) -> Option<String> {
    match payload.remove("label") {
        Some(JsonValue::String(label)) => Some(label),
        _ => None,
    }
}

impl Projection for Collection {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn dictize(&self) -> JsonMap {
        let mut out = self.extra.clone();
        out.insert("type".to_string(), types_value(Self::TYPES));
        if let Some(label) = &self.label {
            out.insert("label".to_string(), json!(label));
        }
        out.insert("total".to_string(), json!(self.total));
        insert_timestamps(&mut out, &self.created_at_utc, self.modified_at_utc.as_ref());
        out
    }
}

impl Resource for Collection {
    type Container = ();

    const KIND: ResourceKind = ResourceKind::Collection;
    const TYPES: &'static [&'static str] = &["AnnotationCollection", "BasicContainer"];

    fn key(&self) -> Uuid {
        self.key
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn from_payload(
        key: Uuid,
        slug: String,
        _container: (),
        mut payload: JsonMap,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let label = split_label(&mut payload);
        Ok(Self {
            key,
            slug,
            label,
            extra: payload,
            created_at_utc: now,
            modified_at_utc: None,
            deleted: false,
            total: 0,
        })
    }

    fn replace(&mut self, mut payload: JsonMap, now: DateTime<Utc>) -> Result<()> {
        self.label = split_label(&mut payload);
        self.extra = payload;
        self.modified_at_utc = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).unwrap()
    }

    fn payload(value: JsonValue) -> JsonMap {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_format_timestamp_uses_z_suffix() {
        assert_eq!(format_timestamp(&ts()), "2026-10-17T09:30:00Z");
    }

    #[test]
    fn test_annotation_from_payload_splits_fields() {
        let ann = Annotation::from_payload(
            Uuid::nil(),
            "foo".to_string(),
            Uuid::nil(),
            payload(json!({
                "body": "Simple body",
                "target": "http://example.com",
                "motivation": "commenting"
            })),
            ts(),
        )
        .unwrap();

        assert_eq!(ann.body, Some(json!("Simple body")));
        assert_eq!(ann.target, json!("http://example.com"));
        assert_eq!(ann.extra.get("motivation"), Some(&json!("commenting")));
        assert!(!ann.deleted);
        assert_eq!(ann.modified_at_utc, None);
    }

    #[test]
    fn test_annotation_without_target_is_rejected() {
        let err = Annotation::from_payload(
            Uuid::nil(),
            "foo".to_string(),
            Uuid::nil(),
            payload(json!({"body": "b"})),
            ts(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_annotation_dictize_never_exposes_key() {
        let key = Uuid::now_v7();
        let ann = Annotation::from_payload(
            key,
            "foo".to_string(),
            Uuid::nil(),
            payload(json!({"body": "b", "target": "t"})),
            ts(),
        )
        .unwrap();
        let out = ann.dictize();

        assert_eq!(out.get("type"), Some(&json!("Annotation")));
        assert_eq!(out.get("created"), Some(&json!("2026-10-17T09:30:00Z")));
        assert!(!out.contains_key("modified"));
        assert!(!out.contains_key("id"));
        let rendered = serde_json::to_string(&out).unwrap();
        assert!(!rendered.contains(&key.to_string()));
    }

    #[test]
    fn test_annotation_replace_keeps_identity() {
        let mut ann = Annotation::from_payload(
            Uuid::nil(),
            "foo".to_string(),
            Uuid::nil(),
            payload(json!({"body": "b", "target": "t", "creator": "alice"})),
            ts(),
        )
        .unwrap();
        let later = ts() + chrono::Duration::minutes(5);

        ann.replace(payload(json!({"target": "t2"})), later).unwrap();

        assert_eq!(ann.slug, "foo");
        assert_eq!(ann.created_at_utc, ts());
        assert_eq!(ann.modified_at_utc, Some(later));
        assert_eq!(ann.target, json!("t2"));
        assert_eq!(ann.body, None);
        assert_eq!(ann.creator, None);
    }

    #[test]
    fn test_collection_dictize_carries_types_and_total() {
        let mut coll = Collection::from_payload(
            Uuid::nil(),
            "coll".to_string(),
            (),
            payload(json!({"label": "My collection"})),
            ts(),
        )
        .unwrap();
        coll.total = 3;
        let out = coll.dictize();

        assert_eq!(
            out.get("type"),
            Some(&json!(["AnnotationCollection", "BasicContainer"]))
        );
        assert_eq!(out.get("label"), Some(&json!("My collection")));
        assert_eq!(out.get("total"), Some(&json!(3)));
    }

    #[test]
    fn test_resource_kind_display() {
        assert_eq!(ResourceKind::Annotation.to_string(), "annotation");
        assert_eq!(ResourceKind::Collection.to_string(), "collection");
    }
}
