//! Container views: collections, their pages, and the root container.
//!
//! Pages are never stored. They are computed per request from the
//! collection's active annotations, ordered by creation time, and addressed by
//! the zero-based `page` query parameter.

use serde_json::{json, Value as JsonValue};

use crate::defaults::{
    PREFER_CONTAINED_DESCRIPTIONS, PREFER_CONTAINED_IRIS, PREFER_MINIMAL_CONTAINER,
    ROOT_CONTAINER_LABEL,
};
use crate::error::{Error, Result};
use crate::iri::{page_iri, resolve, RequestContext};
use crate::models::{format_timestamp, Annotation, Collection, JsonMap, Projection};
use crate::representation::RepresentationBuilder;

/// How much of a container the client asked to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerPreference {
    /// Container description only; pages are linked, not embedded.
    MinimalContainer,
    /// Page items are annotation IRIs.
    ContainedIris,
    /// Page items are full annotation descriptions.
    #[default]
    ContainedDescriptions,
}

impl ContainerPreference {
    /// Read the preference from a `Prefer` header, falling back to the
    /// `iris=1` query parameter.
    pub fn from_request(prefer: Option<&str>, ctx: &RequestContext) -> Self {
        if let Some(prefer) = prefer {
            if prefer.contains(PREFER_MINIMAL_CONTAINER) {
                return Self::MinimalContainer;
            }
            if prefer.contains(PREFER_CONTAINED_IRIS) {
                return Self::ContainedIris;
            }
            if prefer.contains(PREFER_CONTAINED_DESCRIPTIONS) {
                return Self::ContainedDescriptions;
            }
        }
        if ctx.wants_iris() {
            Self::ContainedIris
        } else {
            Self::ContainedDescriptions
        }
    }

    pub fn iris(&self) -> bool {
        matches!(self, Self::ContainedIris)
    }
}

/// Index of the last page, or `None` for an empty collection.
pub fn last_page(total: i64, per_page: i64) -> Option<i64> {
    if total <= 0 || per_page <= 0 {
        None
    } else {
        Some((total - 1) / per_page)
    }
}

/// Offset of the first item on `page`.
///
/// Pages past the last one do not exist.
pub fn page_offset(page: i64, total: i64, per_page: i64) -> Result<i64> {
    match last_page(total, per_page) {
        Some(last) if page <= last => Ok(page * per_page),
        _ => Err(Error::NotFound(format!("page {} not found", page))),
    }
}

/// Paging parameters of one container request.
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    pub ctx: &'a RequestContext,
    pub preference: ContainerPreference,
    pub per_page: i64,
}

impl<'a> PageView<'a> {
    pub fn new(ctx: &'a RequestContext, preference: ContainerPreference, per_page: i64) -> Self {
        Self {
            ctx,
            preference,
            per_page,
        }
    }

    fn page_iri(&self, page: i64) -> String {
        page_iri(self.ctx, page, self.preference.iris())
    }

    fn item(&self, builder: &RepresentationBuilder, annotation: &Annotation) -> JsonValue {
        let iri = resolve(&self.ctx.without_query(), Some(annotation as &dyn Projection));
        if self.preference.iris() {
            return JsonValue::String(iri);
        }
        let mut out = builder.project(annotation);
        out.insert("id".to_string(), json!(iri));
        JsonValue::Object(out)
    }

    fn items(&self, builder: &RepresentationBuilder, annotations: &[Annotation]) -> JsonValue {
        tracing::trace!(result_count = annotations.len(), "rendering page items");
        JsonValue::Array(annotations.iter().map(|a| self.item(builder, a)).collect())
    }

    /// The collection description with its `first`/`last` page references.
    ///
    /// `first_items` are the annotations of page 0; ignored for the minimal
    /// container preference.
    pub fn collection_document(
        &self,
        builder: &RepresentationBuilder,
        collection: &Collection,
        first_items: &[Annotation],
    ) -> JsonMap {
        let mut doc = builder.project(collection);
        let Some(last) = last_page(collection.total, self.per_page) else {
            return doc;
        };

        let first = if self.preference == ContainerPreference::MinimalContainer {
            json!(self.page_iri(0))
        } else {
            let mut page = JsonMap::new();
            page.insert("id".to_string(), json!(self.page_iri(0)));
            page.insert("type".to_string(), json!("AnnotationPage"));
            page.insert("items".to_string(), self.items(builder, first_items));
            if last > 0 {
                page.insert("next".to_string(), json!(self.page_iri(1)));
            }
            JsonValue::Object(page)
        };
        doc.insert("first".to_string(), first);
        doc.insert("last".to_string(), json!(self.page_iri(last)));
        doc
    }

    /// One AnnotationPage of a collection.
    pub fn page_document(
        &self,
        builder: &RepresentationBuilder,
        collection: &Collection,
        page: i64,
        items: &[Annotation],
    ) -> JsonMap {
        let mut part_of = JsonMap::new();
        part_of.insert("id".to_string(), json!(resolve(self.ctx, None)));
        if let Some(label) = &collection.label {
            part_of.insert("label".to_string(), json!(label));
        }
        part_of.insert("total".to_string(), json!(collection.total));
        if let Some(modified) = &collection.modified_at_utc {
            part_of.insert("modified".to_string(), json!(format_timestamp(modified)));
        }

        let mut doc = JsonMap::new();
        doc.insert("id".to_string(), json!(self.page_iri(page)));
        doc.insert("type".to_string(), json!("AnnotationPage"));
        doc.insert("partOf".to_string(), JsonValue::Object(part_of));
        doc.insert("startIndex".to_string(), json!(page * self.per_page));
        doc.insert("items".to_string(), self.items(builder, items));
        if let Some(last) = last_page(collection.total, self.per_page) {
            if page < last {
                doc.insert("next".to_string(), json!(self.page_iri(page + 1)));
            }
        }
        if page > 0 {
            doc.insert("prev".to_string(), json!(self.page_iri(page - 1)));
        }
        doc
    }
}

/// The root container listing every active collection by IRI.
pub fn root_document(ctx: &RequestContext, collections: &[Collection], total: i64) -> JsonMap {
    let base = ctx.without_query();
    let items: Vec<JsonValue> = collections
        .iter()
        .map(|c| json!(resolve(&base, Some(c as &dyn Projection))))
        .collect();

    let mut doc = JsonMap::new();
    doc.insert("type".to_string(), json!("BasicContainer"));
    doc.insert("label".to_string(), json!(ROOT_CONTAINER_LABEL));
    doc.insert("total".to_string(), json!(total));
    doc.insert("items".to_string(), JsonValue::Array(items));
    doc
}
