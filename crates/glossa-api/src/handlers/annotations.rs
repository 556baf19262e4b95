//! Annotation handlers, scoped to their collection.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, Method},
    Json,
};
use serde_json::Value as JsonValue;

use glossa_core::{protocol, Annotation, Collection, Renderable, RequestContext, ScopedAnnotations};

use crate::extract::{Ctx, SlugHint};
use crate::response::{check_if_match, read_response, LdResponse};
use crate::{ApiError, AppState};

/// Resolve the enclosing collection; a deleted collection hides its contents.
async fn enclosing_collection(state: &AppState, slug: &str) -> Result<Collection, ApiError> {
    Ok(protocol::lookup(state.collections.as_ref(), slug).await?)
}

/// `POST /annotations/{collection}/`: create an annotation.
pub async fn create_annotation(
    State(state): State<AppState>,
    Path(collection_slug): Path<String>,
    Ctx(ctx): Ctx,
    SlugHint(hint): SlugHint,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> Result<LdResponse, ApiError> {
    let collection = enclosing_collection(&state, &collection_slug).await?;
    let Json(payload) = payload?;

    let store = ScopedAnnotations::new(state.annotations.as_ref(), collection.key);
    let annotation: Annotation =
        protocol::create(&store, &payload, hint.as_deref(), collection.key).await?;

    let representation =
        state
            .representations
            .build(Renderable::Resource(&annotation), &Method::POST, &ctx);
    Ok(LdResponse::created(representation))
}

/// `GET /annotations/{collection}/{annotation}/`
pub async fn get_annotation(
    State(state): State<AppState>,
    Path((collection_slug, slug)): Path<(String, String)>,
    method: Method,
    Ctx(ctx): Ctx,
    headers: HeaderMap,
) -> Result<LdResponse, ApiError> {
    let collection = enclosing_collection(&state, &collection_slug).await?;
    let store = ScopedAnnotations::new(state.annotations.as_ref(), collection.key);
    let annotation: Annotation = protocol::lookup(&store, &slug).await?;

    let representation =
        state
            .representations
            .build(Renderable::Resource(&annotation), &method, &ctx);
    Ok(read_response(&headers, representation))
}

/// `PUT /annotations/{collection}/{annotation}/`
pub async fn update_annotation(
    State(state): State<AppState>,
    Path((collection_slug, slug)): Path<(String, String)>,
    Ctx(ctx): Ctx,
    headers: HeaderMap,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> Result<LdResponse, ApiError> {
    let collection = enclosing_collection(&state, &collection_slug).await?;
    let store = ScopedAnnotations::new(state.annotations.as_ref(), collection.key);
    let annotation: Annotation = protocol::lookup(&store, &slug).await?;
    if_match_current(&state, &annotation, &ctx, &headers)?;
    let Json(payload) = payload?;

    let updated = protocol::update(&store, annotation, &payload).await?;
    let representation =
        state
            .representations
            .build(Renderable::Resource(&updated), &Method::PUT, &ctx);
    Ok(LdResponse::ok(representation))
}

/// `DELETE /annotations/{collection}/{annotation}/`
pub async fn delete_annotation(
    State(state): State<AppState>,
    Path((collection_slug, slug)): Path<(String, String)>,
    Ctx(ctx): Ctx,
    headers: HeaderMap,
) -> Result<LdResponse, ApiError> {
    let collection = enclosing_collection(&state, &collection_slug).await?;
    let store = ScopedAnnotations::new(state.annotations.as_ref(), collection.key);
    let annotation: Annotation = protocol::lookup(&store, &slug).await?;
    if_match_current(&state, &annotation, &ctx, &headers)?;

    protocol::delete(&store, &annotation).await?;
    let representation = state
        .representations
        .build(Renderable::Empty, &Method::DELETE, &ctx);
    Ok(LdResponse::no_content(representation))
}

fn if_match_current(
    state: &AppState,
    annotation: &Annotation,
    ctx: &RequestContext,
    headers: &HeaderMap,
) -> Result<(), ApiError> {
    let current = state
        .representations
        .build(Renderable::Resource(annotation), &Method::GET, ctx);
    check_if_match(headers, &current)
}
