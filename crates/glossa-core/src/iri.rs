//! IRI resolution.
//!
//! Every identifier the server hands out is derived from the request that
//! reached it plus, for newly minted resources, the resource slug. Storage keys
//! never take part. Resolution is pure: the same context and resource always
//! yield the same IRI.

use std::borrow::Cow;

use crate::defaults::{IRIS_PARAM, PAGE_PARAM};
use crate::error::{Error, Result};
use crate::models::Projection;

/// The parts of an inbound request that identifiers are derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    scheme: String,
    host: String,
    /// Percent-decoded request path.
    path: String,
    /// Decoded query pairs in arrival order.
    query: Vec<(String, String)>,
}

impl RequestContext {
    pub fn new(
        scheme: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
        query: Vec<(String, String)>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            path: path.into(),
            query,
        }
    }

    /// Build a context from the wire form of a request target.
    ///
    /// Path and query are percent-decoded; `+` in the query means space.
    /// Sequences that do not decode to UTF-8 are kept as received.
    pub fn from_parts(scheme: &str, host: &str, raw_path: &str, raw_query: Option<&str>) -> Self {
        let query = raw_query
            .map(|q| {
                q.split('&')
                    .filter(|pair| !pair.is_empty())
                    .map(|pair| {
                        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                        (decode_query_component(k), decode_query_component(v))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self::new(scheme, host, decode_lossless(raw_path), query)
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// First value of a query parameter.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The same request without any query parameters.
    ///
    /// Used for the IRIs of items listed on a page, which must not inherit the
    /// page's view parameters.
    pub fn without_query(&self) -> Self {
        Self {
            query: Vec::new(),
            ..self.clone()
        }
    }

    /// The requested zero-based page, if any.
    pub fn page(&self) -> Result<Option<i64>> {
        match self.query_value(PAGE_PARAM) {
            None => Ok(None),
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n >= 0 => Ok(Some(n)),
                _ => Err(Error::InvalidInput(format!(
                    "{} must be a non-negative integer, got {:?}",
                    PAGE_PARAM, raw
                ))),
            },
        }
    }

    /// True when the query explicitly asks for IRI-only page items.
    pub fn wants_iris(&self) -> bool {
        self.query_value(IRIS_PARAM) == Some("1")
    }

    fn with_param(&self, key: &str, value: &str) -> Self {
        let mut next = self.clone();
        next.query.push((key.to_string(), value.to_string()));
        next
    }
}

fn decode_lossless(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

fn decode_query_component(raw: &str) -> String {
    decode_lossless(&raw.replace('+', " "))
}

/// Percent-encode a path, segment by segment, keeping the `/` separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<Cow<'_, str>>>()
        .join("/")
}

/// Serialize the query without the page parameter, sorted by key.
///
/// The sort is stable so repeated keys keep their arrival order.
fn canonical_query(pairs: &[(String, String)]) -> String {
    let mut kept: Vec<&(String, String)> = pairs.iter().filter(|(k, _)| k != PAGE_PARAM).collect();
    kept.sort_by(|a, b| a.0.cmp(&b.0));
    kept.iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Resolve the IRI of the request target, or of `resource` minted under it.
pub fn resolve(ctx: &RequestContext, resource: Option<&dyn Projection>) -> String {
    let full_path = match resource {
        Some(r) => format!("{}{}/", ctx.path, r.slug()),
        None => ctx.path.clone(),
    };

    let mut iri = format!("{}://{}{}", ctx.scheme, ctx.host, encode_path(&full_path));
    let query = canonical_query(&ctx.query);
    if !query.is_empty() {
        iri.push('?');
        iri.push_str(&query);
    }
    iri
}

/// IRI of page `page` of the container addressed by `ctx`.
///
/// With `iris` set the page IRI carries `iris=1` so following it keeps the
/// IRI-only view.
pub fn page_iri(ctx: &RequestContext, page: i64, iris: bool) -> String {
    let base = if iris && !ctx.wants_iris() {
        resolve(&ctx.with_param(IRIS_PARAM, "1"), None)
    } else {
        resolve(ctx, None)
    };
    let sep = if base.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", base, sep, PAGE_PARAM, page)
}
