//! Per request state shared by every stage of a middleware chain.
//!
//! This module contains the core types a middleware works with:
//! - `RequestContext`: the request descriptor, the routing results and the response being built
//! - `PathParams`: the decoded path parameters of the matched route

use crate::body::ResponseBody;
use crate::router::CompiledRoute;
use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST};
use http::request::Parts;
use http::{Extensions, HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode, Uri};
use std::sync::Arc;

/// The context of one request as it travels through a middleware chain.
///
/// The request side (method, uri, headers) is read only. The routing side is written by the
/// [`Dispatcher`](crate::Dispatcher) and the response side is written by middleware and handlers.
/// A context is exclusively owned by its request, nothing in it is shared with other requests.
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    router_path: Option<String>,

    params: PathParams,
    matched: Vec<Arc<CompiledRoute>>,
    matched_route: Option<Arc<CompiledRoute>>,
    router_name: Option<String>,

    status: Option<StatusCode>,
    response_headers: HeaderMap,
    body: Option<Bytes>,
    extensions: Extensions,
}

impl RequestContext {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self::with_headers(method, uri, HeaderMap::new())
    }

    pub fn with_headers(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            uri,
            headers,
            router_path: None,
            params: PathParams::empty(),
            matched: vec![],
            matched_route: None,
            router_name: None,
            status: None,
            response_headers: HeaderMap::new(),
            body: None,
            extensions: Extensions::new(),
        }
    }

    /// Creates a context from the head of an http request, the body is left to the caller
    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::with_headers(request.method().clone(), request.uri().clone(), request.headers().clone())
    }

    /// Returns the HTTP method of the request
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the URI of the request
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the HTTP headers of the request
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The path routing is done against, the uri path unless overridden
    pub fn path(&self) -> &str {
        self.router_path.as_deref().unwrap_or_else(|| self.uri.path())
    }

    /// Routes on `path` instead of the uri path, for rewriting middleware placed in front of a router
    pub fn set_router_path(&mut self, path: impl Into<String>) {
        self.router_path = Some(path.into());
    }

    /// The `Host` header, falling back to the uri authority
    pub fn host(&self) -> Option<&str> {
        self.headers
            .get(HOST)
            .and_then(|value| value.to_str().ok())
            .or_else(|| self.uri.authority().map(http::uri::Authority::as_str))
    }

    /// Returns the decoded path parameters of the matched route
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut PathParams {
        &mut self.params
    }

    /// Every route whose pattern matched the path, whatever its methods
    pub fn matched(&self) -> &[Arc<CompiledRoute>] {
        &self.matched
    }

    /// The route selected for this request, if any
    pub fn matched_route(&self) -> Option<&Arc<CompiledRoute>> {
        self.matched_route.as_ref()
    }

    /// The name of the router that dispatched this request
    pub fn router_name(&self) -> Option<&str> {
        self.router_name.as_deref()
    }

    pub(crate) fn record_matched(&mut self, routes: impl IntoIterator<Item = Arc<CompiledRoute>>) {
        self.matched.extend(routes);
    }

    pub(crate) fn set_matched_route(&mut self, route: Arc<CompiledRoute>) {
        self.matched_route = Some(route);
    }

    pub(crate) fn set_router_name(&mut self, name: Option<&str>) {
        if let Some(name) = name {
            self.router_name = Some(name.to_string());
        }
    }

    /// The response status, `404 Not Found` until something sets it
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::NOT_FOUND)
    }

    /// Returns true once a status was explicitly set, either directly or by setting a body
    pub fn is_status_set(&self) -> bool {
        self.status.is_some()
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response_headers
    }

    /// Sets a response header, replacing every previous value of it
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response_headers.insert(name, value);
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Sets the response body, the status becomes `200 OK` unless it was set before
    pub fn set_body(&mut self, body: impl Into<Bytes>) {
        self.body = Some(body.into());
        self.status.get_or_insert(StatusCode::OK);
    }

    /// Sets a `text/plain` response body
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.set_header(CONTENT_TYPE, HeaderValue::from_static(mime::TEXT_PLAIN_UTF_8.as_ref()));
        self.set_body(text.into());
    }

    /// Typed state shared between the stages of this request
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Turns the response side of this context into an http response
    pub fn into_response(self) -> Response<ResponseBody> {
        let status = self.status();
        let mut response = Response::new(ResponseBody::from(self.body));
        *response.status_mut() = status;
        *response.headers_mut() = self.response_headers;
        response
    }
}

impl From<Parts> for RequestContext {
    fn from(parts: Parts) -> Self {
        Self::with_headers(parts.method, parts.uri, parts.headers)
    }
}

/// Represents path parameters extracted from the URL path of an HTTP request.
///
/// Parameters keep the order in which they were captured, a later capture with the same name
/// replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    inner: Vec<(String, String)>,
}

impl PathParams {
    /// Creates an empty PathParams instance with no parameters
    #[inline]
    pub fn empty() -> Self {
        Self { inner: vec![] }
    }

    /// Returns true if there are no path parameters
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of path parameters
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Gets the value of a path parameter by its name
    /// Returns None if the parameter doesn't exist
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.inner.iter().find(|(name, _)| name == key).map(|(_, value)| value.as_str())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.inner.iter_mut().find(|(name, _)| *name == key) {
            Some(entry) => entry.1 = value,
            None => self.inner.push((key, value)),
        }
    }

    pub fn merge(&mut self, other: PathParams) {
        for (key, value) in other.inner {
            self.insert(key, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }
}
