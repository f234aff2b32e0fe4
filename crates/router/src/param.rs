//! Parameter handlers run for routes capturing a given path parameter.

use crate::error::BoxError;
use crate::middleware::{Middleware, Next};
use crate::request::RequestContext;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// A stage run when a route captures the parameter it is registered for.
///
/// It receives the decoded value and the continuation of the route's chain; not running the
/// continuation short-circuits the route.
#[async_trait]
pub trait ParamHandler: Send + Sync {
    async fn call(&self, value: String, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), BoxError>;
}

#[async_trait]
impl<P> ParamHandler for Arc<P>
where
    P: ParamHandler + ?Sized,
{
    async fn call(&self, value: String, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), BoxError> {
        self.as_ref().call(value, ctx, next).await
    }
}

pub struct ParamFn<F> {
    f: F,
}

/// Adapts a closure returning a boxed future into a [`ParamHandler`]
pub fn param_fn<F>(f: F) -> ParamFn<F>
where
    F: for<'a> Fn(String, &'a mut RequestContext, Next<'a>) -> BoxFuture<'a, Result<(), BoxError>>
        + Send
        + Sync
        + 'static,
{
    ParamFn { f }
}

#[async_trait]
impl<F> ParamHandler for ParamFn<F>
where
    F: for<'a> Fn(String, &'a mut RequestContext, Next<'a>) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync,
{
    async fn call(&self, value: String, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), BoxError> {
        (self.f)(value, ctx, next).await
    }
}

impl<F> fmt::Debug for ParamFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ParamFn")
    }
}

/// Binds a param handler to a parameter name inside a compiled route's stack
pub(crate) struct ParamMiddleware {
    name: String,
    handler: Arc<dyn ParamHandler>,
}

impl ParamMiddleware {
    pub(crate) fn new(name: impl Into<String>, handler: Arc<dyn ParamHandler>) -> Self {
        Self { name: name.into(), handler }
    }
}

#[async_trait]
impl Middleware for ParamMiddleware {
    async fn call(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), BoxError> {
        match ctx.params().get(&self.name).map(str::to_string) {
            Some(value) => {
                trace!(param = %self.name, value = %value, "running param handler");
                self.handler.call(value, ctx, next).await
            }
            None => next.run(ctx).await,
        }
    }
}

impl fmt::Debug for ParamMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamMiddleware").field("name", &self.name).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{ParamMiddleware, param_fn};
    use crate::middleware::{Chain, handler_fn};
    use crate::request::RequestContext;
    use futures::FutureExt;
    use http::{Method, StatusCode};
    use std::sync::Arc;

    fn chain_for(param: &str) -> Chain {
        let handler = param_fn(|value, ctx, next| {
            async move {
                if value == "0" {
                    ctx.set_status(StatusCode::NOT_FOUND);
                    return Ok(());
                }
                ctx.extensions_mut().insert(value);
                next.run(ctx).await
            }
            .boxed()
        });

        Chain::new().with(ParamMiddleware::new(param, Arc::new(handler))).with(handler_fn(|ctx: &mut RequestContext| {
            let user = ctx.extensions().get::<String>().cloned().unwrap_or_default();
            ctx.set_text(format!("user {user}"));
        }))
    }

    fn ctx_with_id(id: Option<&str>) -> RequestContext {
        let mut ctx = RequestContext::new(Method::GET, "/users".parse().unwrap());
        if let Some(id) = id {
            ctx.params_mut().insert("id", id);
        }
        ctx
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_param_handler_receives_value() {
        let mut ctx = ctx_with_id(Some("3"));
        chain_for("id").run(&mut ctx).await.unwrap();
        assert_eq!(ctx.body().unwrap().as_ref(), b"user 3");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_param_handler_can_short_circuit() {
        let mut ctx = ctx_with_id(Some("0"));
        chain_for("id").run(&mut ctx).await.unwrap();
        assert!(ctx.body().is_none());
        assert_eq!(ctx.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_absent_param_is_skipped() {
        let mut ctx = ctx_with_id(None);
        chain_for("id").run(&mut ctx).await.unwrap();
        assert_eq!(ctx.body().unwrap().as_ref(), b"user ");
    }
}
