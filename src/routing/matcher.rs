//! Route matching logic.
//!
//! # Responsibilities
//! - Match the request path (exact, or prefix for patterns ending in `/*`)
//! - Check method, content negotiation, query parameters and headers
//! - Turn each failed check into a [`Rejection`]
//!
//! # Design Decisions
//! - A path mismatch is silent: the route simply does not apply
//! - Media types compare case-insensitively, ignoring parameters
//! - No regex to guarantee O(n) matching
//! - Query parameter names are compared after form-urlencoded decoding

use axum::body::Body;
use axum::http::{header, Method, Request};
use url::form_urlencoded;

use crate::routing::rejection::Rejection;

/// A single condition a route places on a request.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// `Err` carries the rejection explaining the mismatch.
    fn check(&self, req: &Request<Body>) -> Result<(), Rejection>;
}

/// Path pattern of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
}

impl PathPattern {
    /// `/files/*` becomes a prefix pattern on `/files/`; anything else is exact.
    pub fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) if prefix.ends_with('/') => Self::Prefix(prefix.to_string()),
            _ => Self::Exact(pattern.to_string()),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(p) => p == path,
            Self::Prefix(p) => path.starts_with(p.as_str()),
        }
    }
}

/// Matches the request method.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    method: Method,
}

impl MethodMatcher {
    pub fn new(method: Method) -> Self {
        Self { method }
    }
}

impl Matcher for MethodMatcher {
    fn check(&self, req: &Request<Body>) -> Result<(), Rejection> {
        if *req.method() == self.method {
            Ok(())
        } else {
            Err(Rejection::MethodNotAllowed {
                supported: self.method.clone(),
            })
        }
    }
}

/// Matches the request `Content-Type` against the types a route consumes.
///
/// Requests without a `Content-Type` carry no entity and pass.
#[derive(Debug, Clone)]
pub struct ConsumesMatcher {
    supported: Vec<String>,
}

impl ConsumesMatcher {
    pub fn new(supported: Vec<String>) -> Self {
        Self { supported }
    }
}

impl Matcher for ConsumesMatcher {
    fn check(&self, req: &Request<Body>) -> Result<(), Rejection> {
        let Some(value) = req.headers().get(header::CONTENT_TYPE) else {
            return Ok(());
        };
        let actual = value.to_str().map(essence).unwrap_or_default();
        if self.supported.iter().any(|s| essence(s).eq_ignore_ascii_case(actual)) {
            Ok(())
        } else {
            Err(Rejection::UnsupportedRequestContentType {
                supported: self.supported.clone(),
            })
        }
    }
}

/// Matches `Accept` against the representations a route produces.
#[derive(Debug, Clone)]
pub struct ProducesMatcher {
    supported: Vec<String>,
}

impl ProducesMatcher {
    pub fn new(supported: Vec<String>) -> Self {
        Self { supported }
    }
}

impl Matcher for ProducesMatcher {
    fn check(&self, req: &Request<Body>) -> Result<(), Rejection> {
        let accept = req
            .headers()
            .get(header::ACCEPT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if self.supported.iter().any(|s| accepts(accept, s)) {
            Ok(())
        } else {
            Err(Rejection::UnacceptedResponseContentType {
                supported: self.supported.clone(),
            })
        }
    }
}

/// Requires a query parameter to be present.
#[derive(Debug, Clone)]
pub struct QueryParamMatcher {
    name: String,
}

impl QueryParamMatcher {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Matcher for QueryParamMatcher {
    fn check(&self, req: &Request<Body>) -> Result<(), Rejection> {
        let query = req.uri().query().unwrap_or("");
        let present = form_urlencoded::parse(query.as_bytes()).any(|(name, _)| name == self.name.as_str());
        if present {
            Ok(())
        } else {
            Err(Rejection::MissingQueryParam {
                name: self.name.clone(),
            })
        }
    }
}

/// Requires a header to be present.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    name: String,
}

impl HeaderMatcher {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Matcher for HeaderMatcher {
    fn check(&self, req: &Request<Body>) -> Result<(), Rejection> {
        if req.headers().contains_key(self.name.as_str()) {
            Ok(())
        } else {
            Err(Rejection::MissingHeader {
                name: self.name.clone(),
            })
        }
    }
}

/// Media type without parameters, e.g. `text/html` for `text/html; charset=utf-8`.
fn essence(media_type: &str) -> &str {
    media_type.split(';').next().unwrap_or("").trim()
}

/// One entry of an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
struct MediaRange<'a> {
    media: &'a str,
    quality: f32,
}

impl<'a> MediaRange<'a> {
    /// A missing or unparseable `q` counts as 1.
    fn parse(range: &'a str) -> Self {
        let mut parts = range.split(';');
        let media = parts.next().unwrap_or("").trim();
        let quality = parts
            .filter_map(|p| p.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("q"))
            .and_then(|(_, value)| value.trim().parse::<f32>().ok())
            .unwrap_or(1.0);
        Self { media, quality }
    }

    /// 2 for an exact type, 1 for `type/*`, 0 for `*/*`, `None` if it does not match.
    fn specificity(&self, produced: &str, produced_type: &str) -> Option<u8> {
        match self.media.strip_suffix("/*") {
            Some("*") => Some(0),
            Some(kind) if kind.eq_ignore_ascii_case(produced_type) => Some(1),
            Some(_) => None,
            None if self.media.eq_ignore_ascii_case(produced) => Some(2),
            None => None,
        }
    }
}

/// Whether an `Accept` header value admits `produced`.
///
/// A missing or empty header accepts anything. Otherwise the most specific
/// range matching `produced` decides; `q=0` on that range refuses it.
pub fn accepts(accept: &str, produced: &str) -> bool {
    if accept.trim().is_empty() {
        return true;
    }
    let produced = essence(produced);
    let produced_type = produced.split('/').next().unwrap_or("");

    let mut best: Option<(u8, MediaRange<'_>)> = None;
    for range in accept.split(',').map(MediaRange::parse) {
        let Some(rank) = range.specificity(produced, produced_type) else {
            continue;
        };
        if best.as_ref().map_or(true, |(current, _)| rank > *current) {
            best = Some((rank, range));
        }
    }

    best.is_some_and(|(_, range)| range.quality > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, uri: &str, headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn path_patterns() {
        assert!(PathPattern::parse("/health").matches("/health"));
        assert!(!PathPattern::parse("/health").matches("/health/deep"));
        assert!(PathPattern::parse("/files/*").matches("/files/a/b"));
        assert!(!PathPattern::parse("/files/*").matches("/filesystem"));
        assert_eq!(PathPattern::parse("/a*"), PathPattern::Exact("/a*".into()));
    }

    #[test]
    fn method_mismatch_names_supported_method() {
        let matcher = MethodMatcher::new(Method::POST);
        assert!(matcher.check(&request(Method::POST, "/", &[])).is_ok());
        assert_eq!(
            matcher.check(&request(Method::GET, "/", &[])),
            Err(Rejection::MethodNotAllowed { supported: Method::POST })
        );
    }

    #[test]
    fn accept_negotiation() {
        assert!(accepts("", "application/json"));
        assert!(accepts("*/*", "application/json"));
        assert!(accepts("application/*", "application/json"));
        assert!(accepts("text/html, application/json;q=0.9", "application/json"));
        assert!(accepts("APPLICATION/JSON", "application/json; charset=utf-8"));
        assert!(!accepts("text/html", "application/json"));
        assert!(!accepts("application/json;q=0", "application/json"));
    }

    #[test]
    fn refused_range_wins_over_wildcards() {
        assert!(!accepts("text/*;q=0, */*", "text/html"));
        assert!(accepts("text/*;q=0, */*", "application/json"));
        assert!(!accepts("*/*, application/json;q=0", "application/json"));
        assert!(accepts("application/*;q=0, application/json", "application/json"));
    }

    #[test]
    fn quality_is_parsed_numerically() {
        assert!(!accepts("application/json;Q=0", "application/json"));
        assert!(!accepts("application/json; q=0.0000", "application/json"));
        assert!(accepts("application/json;q=0.001", "application/json"));
        assert!(accepts("application/json;q=bogus", "application/json"));
    }

    #[test]
    fn produces_rejects_unacceptable() {
        let matcher = ProducesMatcher::new(vec!["application/json".into()]);
        assert!(matcher.check(&request(Method::GET, "/", &[])).is_ok());
        assert_eq!(
            matcher.check(&request(Method::GET, "/", &[("accept", "text/csv")])),
            Err(Rejection::UnacceptedResponseContentType {
                supported: vec!["application/json".into()]
            })
        );
    }

    #[test]
    fn consumes_checks_content_type_essence() {
        let matcher = ConsumesMatcher::new(vec!["application/json".into()]);
        assert!(matcher.check(&request(Method::POST, "/", &[])).is_ok());
        assert!(matcher
            .check(&request(Method::POST, "/", &[("content-type", "application/json; charset=utf-8")]))
            .is_ok());
        assert!(matches!(
            matcher.check(&request(Method::POST, "/", &[("content-type", "text/plain")])),
            Err(Rejection::UnsupportedRequestContentType { .. })
        ));
    }

    #[test]
    fn query_and_header_requirements() {
        let query = QueryParamMatcher::new("page");
        assert!(query.check(&request(Method::GET, "/?page=2&x", &[])).is_ok());
        assert!(query.check(&request(Method::GET, "/?x&page", &[])).is_ok());
        assert!(query.check(&request(Method::GET, "/?pages=2", &[])).is_err());

        let encoded = QueryParamMatcher::new("from");
        assert!(encoded.check(&request(Method::GET, "/report?f%72om=today", &[])).is_ok());
        let spaced = QueryParamMatcher::new("user id");
        assert!(spaced.check(&request(Method::GET, "/?user+id=1", &[])).is_ok());
        assert!(spaced.check(&request(Method::GET, "/?user%20id", &[])).is_ok());

        let header = HeaderMatcher::new("x-api-key");
        assert!(header.check(&request(Method::GET, "/", &[("X-Api-Key", "k")])).is_ok());
        assert_eq!(
            header.check(&request(Method::GET, "/", &[])),
            Err(Rejection::MissingHeader { name: "x-api-key".into() })
        );
    }
}
