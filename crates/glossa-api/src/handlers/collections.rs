//! Root container and annotation collection handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, Method},
    Json,
};
use serde_json::Value as JsonValue;

use glossa_core::pages::{page_offset, ContainerPreference, PageView};
use glossa_core::{protocol, root_document, Collection, JsonMap, Renderable, RequestContext};

use crate::extract::{header_str, Ctx, SlugHint};
use crate::response::{check_if_match, read_response, LdResponse};
use crate::{ApiError, AppState};

/// Render a collection the way a `GET` of `ctx` would, honouring `Prefer`
/// and the `page` parameter.
async fn collection_view(
    state: &AppState,
    collection: &Collection,
    ctx: &RequestContext,
    headers: &HeaderMap,
) -> Result<JsonMap, ApiError> {
    let per_page = state.config.per_page;
    let preference = ContainerPreference::from_request(header_str(headers, "prefer"), ctx);
    let view = PageView::new(ctx, preference, per_page);

    let doc = match ctx.page()? {
        Some(page) => {
            let offset = page_offset(page, collection.total, per_page)?;
            let items = state.annotations.list(collection.key, per_page, offset).await?;
            view.page_document(&state.representations, collection, page, &items)
        }
        None => {
            let items = if preference == ContainerPreference::MinimalContainer || collection.total == 0 {
                Vec::new()
            } else {
                state.annotations.list(collection.key, per_page, 0).await?
            };
            view.collection_document(&state.representations, collection, &items)
        }
    };
    Ok(doc)
}

/// `GET /annotations/`: the first `per_page` active collections by IRI,
/// with `total` counting all of them.
pub async fn get_root(
    State(state): State<AppState>,
    method: Method,
    Ctx(ctx): Ctx,
    headers: HeaderMap,
) -> Result<LdResponse, ApiError> {
    let total = state.collections.count().await?;
    let collections = state.collections.list(state.config.per_page, 0).await?;
    let doc = root_document(&ctx, &collections, total);

    let representation = state
        .representations
        .build(Renderable::Document(doc), &method, &ctx);
    Ok(read_response(&headers, representation).container())
}

/// `POST /annotations/`: create a collection.
pub async fn create_collection(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    SlugHint(hint): SlugHint,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> Result<LdResponse, ApiError> {
    let Json(payload) = payload?;
    let collection: Collection =
        protocol::create(state.collections.as_ref(), &payload, hint.as_deref(), ()).await?;

    let representation =
        state
            .representations
            .build(Renderable::Resource(&collection), &Method::POST, &ctx);
    Ok(LdResponse::created(representation))
}

/// `GET /annotations/{collection}/`: the collection or one of its pages.
pub async fn get_collection(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    method: Method,
    Ctx(ctx): Ctx,
    headers: HeaderMap,
) -> Result<LdResponse, ApiError> {
    let collection: Collection = protocol::lookup(state.collections.as_ref(), &slug).await?;
    let doc = collection_view(&state, &collection, &ctx, &headers).await?;

    let representation = state
        .representations
        .build(Renderable::Document(doc), &method, &ctx);
    Ok(read_response(&headers, representation).container())
}

/// `PUT /annotations/{collection}/`: replace the collection description.
pub async fn update_collection(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Ctx(ctx): Ctx,
    headers: HeaderMap,
    payload: Result<Json<JsonValue>, JsonRejection>,
) -> Result<LdResponse, ApiError> {
    let collection: Collection = protocol::lookup(state.collections.as_ref(), &slug).await?;
    if_match_current(&state, &collection, &ctx, &headers).await?;
    let Json(payload) = payload?;

    let updated = protocol::update(state.collections.as_ref(), collection, &payload).await?;
    let representation =
        state
            .representations
            .build(Renderable::Resource(&updated), &Method::PUT, &ctx);
    Ok(LdResponse::ok(representation))
}

/// `DELETE /annotations/{collection}/`: only empty collections can go.
pub async fn delete_collection(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Ctx(ctx): Ctx,
    headers: HeaderMap,
) -> Result<LdResponse, ApiError> {
    let collection: Collection = protocol::lookup(state.collections.as_ref(), &slug).await?;
    if_match_current(&state, &collection, &ctx, &headers).await?;

    protocol::delete(state.collections.as_ref(), &collection).await?;
    let representation = state
        .representations
        .build(Renderable::Empty, &Method::DELETE, &ctx);
    Ok(LdResponse::no_content(representation))
}

async fn if_match_current(
    state: &AppState,
    collection: &Collection,
    ctx: &RequestContext,
    headers: &HeaderMap,
) -> Result<(), ApiError> {
    if header_str(headers, "if-match").is_none() {
        return Ok(());
    }
    let doc = collection_view(state, collection, ctx, headers).await?;
    let current = state
        .representations
        .build(Renderable::Document(doc), &Method::GET, ctx);
    check_if_match(headers, &current)
}
