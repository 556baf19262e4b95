//! # glossa-core
//!
//! Core types, traits, and the protocol engine of the glossa Web Annotation
//! server.
//!
//! This crate mints IRIs, renders JSON-LD representations, and enforces the
//! resource lifecycle. Storage lives behind the repository traits in
//! [`traits`], implemented by `glossa-db` and, with the `mock` feature, by the
//! in-memory repositories in `memory`.

pub mod defaults;
pub mod error;
pub mod iri;
pub mod logging;
pub mod models;
pub mod pages;
pub mod protocol;
pub mod representation;
pub mod schema;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod memory;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use iri::{page_iri, resolve, RequestContext};
pub use models::*;
pub use pages::{root_document, ContainerPreference, PageView};
pub use representation::{Renderable, Representation, RepresentationBuilder};
pub use traits::*;
