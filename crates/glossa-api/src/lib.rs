//! # glossa-api
//!
//! HTTP surface of the Web Annotation Protocol server.
//!
//! Routes:
//! - `/annotations/` lists collections and accepts new ones
//! - `/annotations/{collection}/` reads (paged), updates and deletes a
//!   collection, and accepts new annotations
//! - `/annotations/{collection}/{annotation}/` reads, updates and deletes
//!   one annotation
//!
//! Only the trailing-slash form of each path is routed.

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
    Router,
};

use glossa_core::{AnnotationRepository, CollectionRepository, RepresentationBuilder};
use glossa_db::Database;

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod response;

pub use config::ServerConfig;
pub use error::ApiError;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub collections: Arc<dyn CollectionRepository>,
    pub annotations: Arc<dyn AnnotationRepository>,
    pub representations: Arc<RepresentationBuilder>,
    pub config: Arc<ServerConfig>,
    /// Present when backed by PostgreSQL; used by the health check.
    pub database: Option<Database>,
}

impl AppState {
    pub fn new(
        collections: Arc<dyn CollectionRepository>,
        annotations: Arc<dyn AnnotationRepository>,
        config: ServerConfig,
    ) -> Self {
        Self {
            collections,
            annotations,
            representations: Arc::new(RepresentationBuilder::new(config.generator_json())),
            config: Arc::new(config),
            database: None,
        }
    }

    /// State backed by the PostgreSQL repositories of `db`.
    pub fn from_database(db: Database, config: ServerConfig) -> Self {
        let mut state = Self::new(
            Arc::new(db.collections.clone()),
            Arc::new(db.annotations.clone()),
            config,
        );
        state.database = Some(db);
        state
    }
}

/// Build the protocol router. Transport layers (tracing, CORS, request ids)
/// are added by the binary.
pub fn router(state: AppState) -> Router {
    use handlers::{annotations, collections};

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/annotations/",
            get(collections::get_root).post(collections::create_collection),
        )
        .route(
            "/annotations/:collection/",
            get(collections::get_collection)
                .post(annotations::create_annotation)
                .put(collections::update_collection)
                .delete(collections::delete_collection),
        )
        .route(
            "/annotations/:collection/:annotation/",
            get(annotations::get_annotation)
                .put(annotations::update_annotation)
                .delete(annotations::delete_annotation),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error::reveal_internal_errors,
        ))
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .with_state(state)
}
