//! JSON-LD representation building.
//!
//! Turns whatever a protocol operation produced into the body, `Link` headers
//! and entity tag of the response. Bodies always use the Web Annotation
//! profile; identifiers come from [`crate::iri::resolve`].

use http::Method;
use serde_json::{json, Value as JsonValue};
use sha2::{Digest, Sha256};

use crate::defaults::{ANNO_CONTEXT, LD_CONTENT_TYPE};
use crate::iri::{resolve, RequestContext};
use crate::models::{JsonMap, Projection};

// =============================================================================
// LINK TABLE
// =============================================================================

/// One `Link` header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRel {
    pub url: &'static str,
    pub rel: &'static str,
}

impl LinkRel {
    pub fn header_value(&self) -> String {
        format!("<{}>; rel=\"{}\"", self.url, self.rel)
    }
}

/// `type` member value → links it adds, in emission order.
pub const LINK_TABLE: &[(&str, &[LinkRel])] = &[
    (
        "Annotation",
        &[LinkRel {
            url: "http://www.w3.org/ns/ldp#Resource",
            rel: "type",
        }],
    ),
    (
        "AnnotationCollection",
        &[LinkRel {
            url: "http://www.w3.org/ns/oa#AnnotationCollection",
            rel: "type",
        }],
    ),
    (
        "AnnotationPage",
        &[LinkRel {
            url: "http://www.w3.org/ns/oa#AnnotationPage",
            rel: "type",
        }],
    ),
    (
        "BasicContainer",
        &[
            LinkRel {
                url: "http://www.w3.org/ns/ldp#BasicContainer",
                rel: "type",
            },
            LinkRel {
                url: "http://www.w3.org/TR/annotation-protocol/",
                rel: "http://www.w3.org/ns/ldp#constrainedBy",
            },
        ],
    ),
];

fn declared_types(body: &JsonMap) -> Vec<&str> {
    match body.get("type") {
        Some(JsonValue::String(t)) => vec![t.as_str()],
        Some(JsonValue::Array(items)) => items.iter().filter_map(JsonValue::as_str).collect(),
        _ => Vec::new(),
    }
}

/// `Link` header values for a body, in table order.
pub fn link_headers(body: &JsonMap) -> Vec<String> {
    let types = declared_types(body);
    LINK_TABLE
        .iter()
        .filter(|(name, _)| types.contains(name))
        .flat_map(|(_, links)| links.iter().map(LinkRel::header_value))
        .collect()
}

// =============================================================================
// ENTITY TAGS
// =============================================================================

fn write_canonical(value: &JsonValue, out: &mut String) {
    match value {
        JsonValue::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&JsonValue::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key.as_str()], out);
            }
            out.push('}');
        }
        JsonValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Compact serialization with object keys sorted at every level.
pub fn canonical_json(body: &JsonMap) -> String {
    let mut out = String::new();
    write_canonical(&JsonValue::Object(body.clone()), &mut out);
    out
}

/// Strong entity tag of a body: quoted hex SHA-256 of its canonical form.
pub fn compute_etag(body: &JsonMap) -> String {
    let digest = Sha256::digest(canonical_json(body).as_bytes());
    format!("\"{}\"", hex::encode(digest))
}

fn opaque_tag(tag: &str) -> &str {
    tag.trim().trim_start_matches("W/")
}

/// Weak comparison of `tag` against an `If-None-Match` list.
pub fn etag_matches(tag: &str, header: &str) -> bool {
    header.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || opaque_tag(candidate) == opaque_tag(tag)
    })
}

/// Strong comparison of `tag` against an `If-Match` list (RFC 9110 §13.1.1).
///
/// A weak tag on either side never matches.
pub fn etag_matches_strong(tag: &str, header: &str) -> bool {
    let tag = tag.trim();
    if tag.starts_with("W/") {
        return false;
    }
    header.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || (!candidate.starts_with("W/") && candidate == tag)
    })
}

// =============================================================================
// BUILDER
// =============================================================================

/// What an operation hands to the builder.
pub enum Renderable<'a> {
    /// Nothing to render (successful delete).
    Empty,
    /// A stored resource.
    Resource(&'a dyn Projection),
    /// A pre-assembled listing document.
    Document(JsonMap),
}

/// A rendered response body with its headers.
#[derive(Debug, Clone, PartialEq)]
pub struct Representation {
    pub body: JsonMap,
    pub links: Vec<String>,
    /// Set for `GET` and `HEAD` only.
    pub etag: Option<String>,
}

impl Representation {
    pub fn content_type(&self) -> &'static str {
        LD_CONTENT_TYPE
    }

    /// The `id` injected into the body, if any.
    pub fn id(&self) -> Option<&str> {
        self.body.get("id").and_then(JsonValue::as_str)
    }

    /// True if this representation's tag satisfies an `If-None-Match` value.
    pub fn matches(&self, header: &str) -> bool {
        self.etag
            .as_deref()
            .map(|tag| etag_matches(tag, header))
            .unwrap_or(false)
    }

    /// True if this representation's tag satisfies an `If-Match` value.
    pub fn matches_strong(&self, header: &str) -> bool {
        self.etag
            .as_deref()
            .map(|tag| etag_matches_strong(tag, header))
            .unwrap_or(false)
    }

    pub fn to_bytes(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.body)?)
    }
}

/// Builds representations; created once at startup.
#[derive(Debug, Clone, Default)]
pub struct RepresentationBuilder {
    generator: Option<JsonValue>,
}

impl RepresentationBuilder {
    pub fn new(generator: Option<JsonValue>) -> Self {
        Self { generator }
    }

    /// The projection of a resource as embedded anywhere in a response.
    pub fn project(&self, resource: &dyn Projection) -> JsonMap {
        let mut out = resource.dictize();
        if let Some(generator) = &self.generator {
            out.insert("generator".to_string(), generator.clone());
        }
        out
    }

    pub fn build(&self, value: Renderable<'_>, method: &Method, ctx: &RequestContext) -> Representation {
        let (mut body, resource) = match value {
            Renderable::Empty => (JsonMap::new(), None),
            Renderable::Resource(resource) => (self.project(resource), Some(resource)),
            Renderable::Document(doc) => (doc, None),
        };

        if !body.is_empty() {
            let id = match resource {
                Some(resource) if *method == Method::POST => Some(resolve(ctx, Some(resource))),
                // Listing documents may carry their own id (pages).
                None if body.contains_key("id") => None,
                _ => Some(resolve(ctx, None)),
            };
            if let Some(id) = id {
                body.insert("id".to_string(), json!(id));
            }
            body.insert("@context".to_string(), json!(ANNO_CONTEXT));
        }

        let links = link_headers(&body);
        let etag = (*method == Method::GET || *method == Method::HEAD).then(|| compute_etag(&body));

        Representation { body, links, etag }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl Projection for Fixed {
        fn slug(&self) -> &str {
            "foo"
        }

        fn dictize(&self) -> JsonMap {
            json!({"type": "Annotation", "target": "http://example.com"})
                .as_object()
                .cloned()
                .unwrap()
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::from_parts("http", "localhost", "/annotations/coll/", None)
    }

    fn map(v: JsonValue) -> JsonMap {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_renders_empty_body() {
        let rep = RepresentationBuilder::default().build(Renderable::Empty, &Method::DELETE, &ctx());
        assert!(rep.body.is_empty());
        assert!(rep.links.is_empty());
        assert!(rep.etag.is_none());
    }

    #[test]
    fn test_post_mints_id_from_slug() {
        let rep = RepresentationBuilder::default().build(
            Renderable::Resource(&Fixed),
            &Method::POST,
            &ctx(),
        );
        assert_eq!(rep.id(), Some("http://localhost/annotations/coll/foo/"));
        assert_eq!(rep.body.get("@context"), Some(&json!(ANNO_CONTEXT)));
        assert!(rep.etag.is_none());
    }

    #[test]
    fn test_get_uses_request_iri() {
        let rep = RepresentationBuilder::default().build(
            Renderable::Resource(&Fixed),
            &Method::GET,
            &ctx(),
        );
        assert_eq!(rep.id(), Some("http://localhost/annotations/coll/"));
        assert!(rep.etag.is_some());
    }

    #[test]
    fn test_generator_is_injected() {
        let builder = RepresentationBuilder::new(Some(json!({"id": "http://gen", "type": "Software"})));
        let rep = builder.build(Renderable::Resource(&Fixed), &Method::GET, &ctx());
        assert_eq!(
            rep.body.get("generator"),
            Some(&json!({"id": "http://gen", "type": "Software"}))
        );
    }

    #[test]
    fn test_document_keeps_own_id() {
        let doc = map(json!({"id": "http://localhost/annotations/coll/?page=1", "type": "AnnotationPage"}));
        let rep = RepresentationBuilder::default().build(Renderable::Document(doc), &Method::GET, &ctx());
        assert_eq!(rep.id(), Some("http://localhost/annotations/coll/?page=1"));
        assert_eq!(rep.links, vec!["<http://www.w3.org/ns/oa#AnnotationPage>; rel=\"type\""]);
    }

    #[test]
    fn test_links_follow_table_order() {
        let body = map(json!({"type": ["BasicContainer", "AnnotationCollection"]}));
        assert_eq!(
            link_headers(&body),
            vec![
                "<http://www.w3.org/ns/oa#AnnotationCollection>; rel=\"type\"".to_string(),
                "<http://www.w3.org/ns/ldp#BasicContainer>; rel=\"type\"".to_string(),
                "<http://www.w3.org/TR/annotation-protocol/>; rel=\"http://www.w3.org/ns/ldp#constrainedBy\"".to_string(),
            ]
        );
    }

    #[test]
    fn test_annotation_link() {
        let body = map(json!({"type": "Annotation"}));
        assert_eq!(
            link_headers(&body),
            vec!["<http://www.w3.org/ns/ldp#Resource>; rel=\"type\"".to_string()]
        );
    }

    #[test]
    fn test_unknown_type_has_no_links() {
        assert!(link_headers(&map(json!({"type": "Note"}))).is_empty());
        assert!(link_headers(&map(json!({"label": "x"}))).is_empty());
    }

    #[test]
    fn test_etag_ignores_key_order() {
        let a = map(json!({"a": 1, "b": {"x": [1, 2], "y": null}}));
        let b = map(json!({"b": {"y": null, "x": [1, 2]}, "a": 1}));
        assert_eq!(compute_etag(&a), compute_etag(&b));
        assert_ne!(compute_etag(&a), compute_etag(&map(json!({"a": 2}))));
    }

    #[test]
    fn test_etag_is_quoted_hex() {
        let tag = compute_etag(&map(json!({"a": 1})));
        assert!(tag.starts_with('"') && tag.ends_with('"'));
        assert_eq!(tag.len(), 66);
    }

    #[test]
    fn test_canonical_json_sorts_keys() {
        let body = map(json!({"b": 1, "a": "x"}));
        assert_eq!(canonical_json(&body), r#"{"a":"x","b":1}"#);
    }

    #[test]
    fn test_etag_matching() {
        let tag = "\"abc\"";
        assert!(etag_matches(tag, "\"abc\""));
        assert!(etag_matches(tag, "W/\"abc\""));
        assert!(etag_matches(tag, "\"zzz\", \"abc\""));
        assert!(etag_matches(tag, "*"));
        assert!(!etag_matches(tag, "\"abd\""));
    }

    #[test]
    fn test_strong_comparison_rejects_weak_tags() {
        let tag = "\"abc\"";
        assert!(etag_matches_strong(tag, "\"abc\""));
        assert!(etag_matches_strong(tag, "\"zzz\", \"abc\""));
        assert!(etag_matches_strong(tag, "*"));
        assert!(!etag_matches_strong(tag, "W/\"abc\""));
        assert!(!etag_matches_strong("W/\"abc\"", "W/\"abc\""));
        assert!(!etag_matches_strong(tag, "\"abd\""));
    }
}
