//! Centralized default constants for glossa.
//!
//! Protocol constants come from the W3C Web Annotation Protocol and Data
//! Model; the rest are server defaults that configuration may override.

// =============================================================================
// JSON-LD PROFILE
// =============================================================================

/// JSON-LD context injected into every non-empty representation.
pub const ANNO_CONTEXT: &str = "http://www.w3.org/ns/anno.jsonld";

/// The only media type this server produces.
pub const LD_CONTENT_TYPE: &str =
    "application/ld+json; profile=\"http://www.w3.org/ns/anno.jsonld\"";

// =============================================================================
// CONTAINER PREFERENCES (Annotation Protocol §4.2.1)
// =============================================================================

/// `Prefer` include IRI asking for a container without embedded pages.
pub const PREFER_MINIMAL_CONTAINER: &str = "http://www.w3.org/ns/ldp#PreferMinimalContainer";

/// `Prefer` include IRI asking for pages listing annotation IRIs only.
pub const PREFER_CONTAINED_IRIS: &str = "http://www.w3.org/ns/oa#PreferContainedIRIs";

/// `Prefer` include IRI asking for pages embedding full annotations.
pub const PREFER_CONTAINED_DESCRIPTIONS: &str =
    "http://www.w3.org/ns/oa#PreferContainedDescriptions";

// =============================================================================
// PAGINATION
// =============================================================================

/// Query parameter carrying the zero-based page index.
///
/// Always stripped from canonical IRIs.
pub const PAGE_PARAM: &str = "page";

/// Query parameter selecting IRI-only page items (`iris=1`).
pub const IRIS_PARAM: &str = "iris";

/// Annotations per page.
pub const PER_PAGE: i64 = 100;

/// Upper bound accepted from configuration.
pub const MAX_PER_PAGE: i64 = 1000;

// =============================================================================
// SLUGS
// =============================================================================

/// Request header carrying the client-suggested slug (RFC 5023 §9.7).
pub const SLUG_HEADER: &str = "slug";

/// How many generated slugs to try before giving up.
pub const SLUG_GENERATION_ATTEMPTS: usize = 5;

/// Longest slug hint honoured; longer hints fall back to a generated slug.
pub const MAX_SLUG_LEN: usize = 255;

// =============================================================================
// ROOT CONTAINER
// =============================================================================

/// Label of the root container listing every collection.
pub const ROOT_CONTAINER_LABEL: &str = "Annotation Collections";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_names_context() {
        assert!(LD_CONTENT_TYPE.starts_with("application/ld+json"));
        assert!(LD_CONTENT_TYPE.contains(ANNO_CONTEXT));
    }

    #[test]
    fn test_per_page_within_bounds() {
        assert!(PER_PAGE > 0);
        assert!(PER_PAGE <= MAX_PER_PAGE);
    }
}
