//! The stage answering requests whose path matched but whose method did not.
//!
//! Placed in front of a [`Dispatcher`](crate::Dispatcher), it inspects the outcome once the rest
//! of the chain has run:
//! - `501 Not Implemented` for a method no router of the tree knows about
//! - `200 OK` with an `Allow` header for `OPTIONS`
//! - `405 Method Not Allowed` with an `Allow` header for any other method
//!
//! In throw mode the last two failures are returned as errors instead.

use crate::error::{BoxError, RoutingError};
use crate::middleware::{Middleware, Next};
use crate::request::RequestContext;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ALLOW, CONTENT_LENGTH};
use http::{HeaderValue, Method, StatusCode};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builds the error returned in throw mode
pub type ErrorFactory = Arc<dyn Fn() -> BoxError + Send + Sync>;

#[derive(Clone, Default)]
pub struct AllowedMethodsOptions {
    throw: bool,
    method_not_allowed: Option<ErrorFactory>,
    not_implemented: Option<ErrorFactory>,
}

impl AllowedMethodsOptions {
    pub fn builder() -> AllowedMethodsOptionsBuilder {
        AllowedMethodsOptionsBuilder { options: Self::default() }
    }

    pub fn is_throw(&self) -> bool {
        self.throw
    }
}

impl fmt::Debug for AllowedMethodsOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllowedMethodsOptions")
            .field("throw", &self.throw)
            .field("method_not_allowed", &self.method_not_allowed.is_some())
            .field("not_implemented", &self.not_implemented.is_some())
            .finish()
    }
}

#[derive(Debug)]
pub struct AllowedMethodsOptionsBuilder {
    options: AllowedMethodsOptions,
}

impl AllowedMethodsOptionsBuilder {
    /// Return errors instead of setting `405` and `501`
    #[must_use]
    pub fn throw(mut self, throw: bool) -> Self {
        self.options.throw = throw;
        self
    }

    /// The error returned for a method not allowed, [`RoutingError::MethodNotAllowed`] by default
    #[must_use]
    pub fn method_not_allowed<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> BoxError + Send + Sync + 'static,
    {
        self.options.method_not_allowed = Some(Arc::new(factory));
        self
    }

    /// The error returned for an unknown method, [`RoutingError::NotImplemented`] by default
    #[must_use]
    pub fn not_implemented<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> BoxError + Send + Sync + 'static,
    {
        self.options.not_implemented = Some(Arc::new(factory));
        self
    }

    pub fn build(self) -> AllowedMethodsOptions {
        self.options
    }
}

/// Built by [`Router::allowed_methods`](crate::Router::allowed_methods)
#[derive(Debug, Clone)]
pub struct AllowedMethods {
    implemented: Vec<Method>,
    options: AllowedMethodsOptions,
}

impl AllowedMethods {
    pub fn new(implemented: Vec<Method>, options: AllowedMethodsOptions) -> Self {
        Self { implemented, options }
    }

    pub fn implemented(&self) -> &[Method] {
        &self.implemented
    }
}

/// Methods of the routes matched by path, first seen first
fn allowed(ctx: &RequestContext) -> Vec<Method> {
    let mut allowed: Vec<Method> = vec![];
    for method in ctx.matched().iter().flat_map(|route| route.methods()) {
        if !allowed.contains(method) {
            allowed.push(method.clone());
        }
    }
    allowed
}

fn allow_header(allowed: &[Method]) -> Result<HeaderValue, BoxError> {
    let joined = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
    Ok(HeaderValue::from_str(&joined)?)
}

#[async_trait]
impl Middleware for AllowedMethods {
    async fn call(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), BoxError> {
        next.run(ctx).await?;

        if ctx.matched_route().is_some() || ctx.status() != StatusCode::NOT_FOUND {
            return Ok(());
        }

        let method = ctx.method().clone();
        let allowed = allowed(ctx);

        if !self.implemented.contains(&method) && method != Method::OPTIONS {
            debug!(method = %method, path = ctx.path(), "method not implemented");
            if self.options.throw {
                return Err(match &self.options.not_implemented {
                    Some(factory) => factory(),
                    None => RoutingError::not_implemented(method).into(),
                });
            }
            ctx.set_status(StatusCode::NOT_IMPLEMENTED);
            if !allowed.is_empty() {
                ctx.set_header(ALLOW, allow_header(&allowed)?);
            }
            return Ok(());
        }

        if allowed.is_empty() {
            return Ok(());
        }

        if method == Method::OPTIONS {
            ctx.set_status(StatusCode::OK);
            ctx.set_body(Bytes::new());
            ctx.set_header(CONTENT_LENGTH, HeaderValue::from_static("0"));
            ctx.set_header(ALLOW, allow_header(&allowed)?);
        } else if !allowed.contains(&method) {
            let allow = allow_header(&allowed)?;
            debug!(method = %method, path = ctx.path(), allow = ?allow, "method not allowed");
            if self.options.throw {
                return Err(match &self.options.method_not_allowed {
                    Some(factory) => factory(),
                    None => RoutingError::method_not_allowed(method, allow.to_str().unwrap_or_default()).into(),
                });
            }
            ctx.set_status(StatusCode::METHOD_NOT_ALLOWED);
            ctx.set_header(ALLOW, allow);
        }
        Ok(())
    }
}
