//! JSON Schema validation of client payloads.
//!
//! Payloads are validated as submitted, then stripped of the properties the
//! server manages itself. What remains is handed to
//! [`Resource::from_payload`](crate::models::Resource::from_payload) or
//! [`Resource::replace`](crate::models::Resource::replace).

use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde_json::{json, Value as JsonValue};

use crate::error::{Error, Result};
use crate::models::{JsonMap, ResourceKind};

/// Properties every representation gets from the server.
pub const SERVER_MANAGED: &[&str] = &[
    "id",
    "@context",
    "type",
    "created",
    "modified",
    "generated",
    "generator",
];

/// Additional server-managed properties of collections.
pub const COLLECTION_MANAGED: &[&str] = &["total", "first", "last"];

fn type_rule(required_type: &str) -> JsonValue {
    json!({
        "anyOf": [
            { "const": required_type },
            { "type": "array", "contains": { "const": required_type } }
        ]
    })
}

fn annotation_schema() -> JsonValue {
    json!({
        "type": "object",
        "required": ["target"],
        "properties": {
            "type": type_rule("Annotation"),
            "target": { "type": ["string", "object", "array"] },
            "creator": { "type": ["string", "object", "array"] },
            "stylesheet": { "type": ["string", "object"] }
        }
    })
}

fn collection_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "type": type_rule("AnnotationCollection"),
            "label": { "type": "string" }
        }
    })
}

type Compiled = std::result::Result<Validator, String>;

fn compile(schema: JsonValue) -> Compiled {
    jsonschema::validator_for(&schema).map_err(|e| e.to_string())
}

static ANNOTATION_VALIDATOR: Lazy<Compiled> = Lazy::new(|| compile(annotation_schema()));
static COLLECTION_VALIDATOR: Lazy<Compiled> = Lazy::new(|| compile(collection_schema()));

fn validator(kind: ResourceKind) -> Result<&'static Validator> {
    let compiled = match kind {
        ResourceKind::Annotation => &*ANNOTATION_VALIDATOR,
        ResourceKind::Collection => &*COLLECTION_VALIDATOR,
    };
    compiled
        .as_ref()
        .map_err(|e| Error::Internal(format!("invalid {} schema: {}", kind, e)))
}

/// Validate a payload for `kind`, returning the validator's first error
/// message verbatim as [`Error::Validation`].
pub fn validate(kind: ResourceKind, payload: &JsonValue) -> Result<()> {
    validator(kind)?
        .validate(payload)
        .map_err(|e| Error::Validation(e.to_string()))
}

/// Validate a payload and strip every server-managed property from it.
pub fn prepare(kind: ResourceKind, payload: &JsonValue) -> Result<JsonMap> {
    validate(kind, payload)?;

    let mut fields = match payload {
        JsonValue::Object(map) => map.clone(),
        // The schemas require an object; reaching here means they drifted.
        _ => return Err(Error::Validation(format!("{} is not of type \"object\"", payload))),
    };
    for key in SERVER_MANAGED {
        fields.remove(*key);
    }
    if kind == ResourceKind::Collection {
        for key in COLLECTION_MANAGED {
            fields.remove(*key);
        }
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotation_requires_target() {
        let err = validate(ResourceKind::Annotation, &json!({"body": "b"})).unwrap_err();
        match err {
            Error::Validation(msg) => assert!(msg.contains("target"), "message: {}", msg),
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_annotation_accepts_string_target() {
        validate(
            ResourceKind::Annotation,
            &json!({"body": "Simple body", "target": "http://example.com"}),
        )
        .unwrap();
    }

    #[test]
    fn test_annotation_rejects_foreign_type() {
        let err = validate(
            ResourceKind::Annotation,
            &json!({"type": "Note", "target": "http://example.com"}),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_annotation_accepts_type_array() {
        validate(
            ResourceKind::Annotation,
            &json!({"type": ["Annotation", "Other"], "target": "http://example.com"}),
        )
        .unwrap();
    }

    #[test]
    fn test_non_object_payload_rejected() {
        let err = validate(ResourceKind::Collection, &json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_collection_label_must_be_string() {
        let err = validate(ResourceKind::Collection, &json!({"label": 3})).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_prepare_strips_server_managed_properties() {
        let fields = prepare(
            ResourceKind::Annotation,
            &json!({
                "id": "http://elsewhere/1",
                "@context": "http://www.w3.org/ns/anno.jsonld",
                "type": "Annotation",
                "created": "2020-01-01T00:00:00Z",
                "generator": "someone",
                "target": "http://example.com",
                "motivation": "tagging"
            }),
        )
        .unwrap();

        let mut keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["motivation", "target"]);
    }

    #[test]
    fn test_prepare_strips_collection_paging_properties() {
        let fields = prepare(
            ResourceKind::Collection,
            &json!({"label": "L", "total": 10, "first": "x", "last": "y"}),
        )
        .unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("label"), Some(&json!("L")));
    }
}
