//! Rejections, arbitration and the default rejection responder.
//!
//! # Data Flow
//! ```text
//! failed route matching → RejectionSet
//!     → arbitrate() (content-negotiation failures win)
//!     → respond() (status + JSON error document)
//! ```

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::Response;

use crate::error::ErrorBody;
use crate::http::transaction::TransactionContext;

/// Why a candidate route refused a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Path matched but the method did not.
    MethodNotAllowed { supported: Method },
    /// The request entity's content type is not consumed by the route.
    UnsupportedRequestContentType { supported: Vec<String> },
    /// None of the route's representations satisfies `Accept`.
    UnacceptedResponseContentType { supported: Vec<String> },
    MissingQueryParam { name: String },
    MissingHeader { name: String },
    MalformedRequestContent { message: String },
    Validation { message: String },
}

/// Rejections collected while matching a single request, in route order.
///
/// An empty set means no route matched the path at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectionSet(Vec<Rejection>);

impl RejectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(rejection: Rejection) -> Self {
        Self(vec![rejection])
    }

    pub fn push(&mut self, rejection: Rejection) {
        self.0.push(rejection);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rejection> {
        self.0.iter()
    }
}

impl From<Vec<Rejection>> for RejectionSet {
    fn from(rejections: Vec<Rejection>) -> Self {
        Self(rejections)
    }
}

impl FromIterator<Rejection> for RejectionSet {
    fn from_iter<I: IntoIterator<Item = Rejection>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for RejectionSet {
    type Item = Rejection;
    type IntoIter = std::vec::IntoIter<Rejection>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Pick the rejection(s) worth reporting.
///
/// An unaccepted-response-content-type rejection beats everything else and is
/// surfaced alone. Otherwise the set is returned untouched.
pub fn arbitrate(set: RejectionSet) -> RejectionSet {
    let preferred = set
        .iter()
        .position(|r| matches!(r, Rejection::UnacceptedResponseContentType { .. }));

    match preferred {
        Some(index) => set.into_iter().nth(index).map(RejectionSet::single).unwrap_or_default(),
        None => set,
    }
}

/// Convert a rejection set into a JSON error response.
///
/// Kinds are considered in a fixed order; rejections of the winning kind are
/// merged into one message.
pub fn respond(ctx: &TransactionContext, set: &RejectionSet) -> Response {
    let (status, message, allow) = describe(set);
    let mut response = ErrorBody::new(ctx, message).into_response(status);

    if let Some(allow) = allow.and_then(|a| HeaderValue::from_str(&a).ok()) {
        response.headers_mut().insert(header::ALLOW, allow);
    }
    response
}

fn describe(set: &RejectionSet) -> (StatusCode, String, Option<String>) {
    if set.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            "The requested resource could not be found.".to_string(),
            None,
        );
    }

    for r in set.iter() {
        if let Rejection::MalformedRequestContent { message } = r {
            return (
                StatusCode::BAD_REQUEST,
                format!("The request content was malformed: {message}"),
                None,
            );
        }
    }
    for r in set.iter() {
        if let Rejection::Validation { message } = r {
            return (StatusCode::BAD_REQUEST, message.clone(), None);
        }
    }
    for r in set.iter() {
        if let Rejection::MissingQueryParam { name } = r {
            return (
                StatusCode::NOT_FOUND,
                format!("Request is missing required query parameter '{name}'"),
                None,
            );
        }
    }
    for r in set.iter() {
        if let Rejection::MissingHeader { name } = r {
            return (
                StatusCode::BAD_REQUEST,
                format!("Request is missing required HTTP header '{name}'"),
                None,
            );
        }
    }

    let unsupported = merged(set, |r| match r {
        Rejection::UnsupportedRequestContentType { supported } => Some(supported.as_slice()),
        _ => None,
    });
    if !unsupported.is_empty() {
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!(
                "The request's Content-Type is not supported. Expected:\n{}",
                unsupported.join(" or ")
            ),
            None,
        );
    }

    let unaccepted = merged(set, |r| match r {
        Rejection::UnacceptedResponseContentType { supported } => Some(supported.as_slice()),
        _ => None,
    });
    if !unaccepted.is_empty() {
        return (
            StatusCode::NOT_ACCEPTABLE,
            format!(
                "Resource representation is only available with these types:\n{}",
                unaccepted.join("\n")
            ),
            None,
        );
    }

    let mut methods: Vec<&str> = Vec::new();
    for r in set.iter() {
        if let Rejection::MethodNotAllowed { supported } = r {
            if !methods.contains(&supported.as_str()) {
                methods.push(supported.as_str());
            }
        }
    }
    let allow = methods.join(", ");
    (
        StatusCode::METHOD_NOT_ALLOWED,
        format!("HTTP method not allowed, supported methods: {allow}"),
        Some(allow),
    )
}

fn merged<'a>(
    set: &'a RejectionSet,
    select: impl Fn(&'a Rejection) -> Option<&'a [String]>,
) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for types in set.iter().filter_map(select) {
        for t in types {
            if !out.contains(&t.as_str()) {
                out.push(t);
            }
        }
    }
    out
}
