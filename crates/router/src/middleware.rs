//! Middleware primitives: the [`Middleware`] trait, its continuation [`Next`] and the closure
//! adapters used to register plain functions.
//!
//! Every stage of a chain receives the request context and a continuation. A stage that does not
//! run its continuation short-circuits the rest of the chain, a stage that fails stops the chain
//! and its error is returned to the caller unchanged.

use crate::error::BoxError;
use crate::request::RequestContext;
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A shareable middleware stage
pub type SharedMiddleware = Arc<dyn Middleware>;

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn call(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), BoxError>;
}

#[async_trait]
impl<M> Middleware for Arc<M>
where
    M: Middleware + ?Sized,
{
    async fn call(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), BoxError> {
        self.as_ref().call(ctx, next).await
    }
}

/// The rest of a chain, handed to each stage.
///
/// Running it runs the remaining stages of the current chain and, once they are exhausted, the
/// chain the current one was entered from.
pub struct Next<'a> {
    chain: &'a [SharedMiddleware],
    parent: Option<Box<Next<'a>>>,
}

impl<'a> Next<'a> {
    /// A continuation that does nothing
    pub fn empty() -> Self {
        Self { chain: &[], parent: None }
    }

    pub(crate) fn new(chain: &'a [SharedMiddleware], parent: Option<Next<'a>>) -> Self {
        Self { chain, parent: parent.map(Box::new) }
    }

    /// Runs the remaining stages, resolving once they have all completed or one short-circuited
    pub fn run<'c>(self, ctx: &'c mut RequestContext) -> BoxFuture<'c, Result<(), BoxError>>
    where
        'a: 'c,
    {
        match self.chain.split_first() {
            Some((first, rest)) => {
                let next = Next { chain: rest, parent: self.parent };
                first.as_ref().call(ctx, next)
            }
            None => match self.parent {
                Some(parent) => (*parent).run(ctx),
                None => Box::pin(async { Ok::<(), BoxError>(()) }),
            },
        }
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("remaining", &self.chain.len()).field("nested", &self.parent.is_some()).finish()
    }
}

/// Shares a middleware so it can be listed together with others, see [`IntoHandlers`]
pub fn shared<M: Middleware + 'static>(middleware: M) -> SharedMiddleware {
    Arc::new(middleware)
}

/// Stages registered for one route.
///
/// A single middleware is one stage. A `Vec` (or array) of shared middleware forms one
/// sequential chain, it must not be empty.
pub trait IntoHandlers {
    fn into_handlers(self) -> Vec<SharedMiddleware>;
}

impl<M: Middleware + 'static> IntoHandlers for M {
    fn into_handlers(self) -> Vec<SharedMiddleware> {
        vec![Arc::new(self)]
    }
}

impl IntoHandlers for Vec<SharedMiddleware> {
    fn into_handlers(self) -> Vec<SharedMiddleware> {
        self
    }
}

impl<const N: usize> IntoHandlers for [SharedMiddleware; N] {
    fn into_handlers(self) -> Vec<SharedMiddleware> {
        self.into_iter().collect()
    }
}

/// An ordered list of stages composed into one.
///
/// Used as a middleware, the chain continues with the outer continuation once its own stages
/// are exhausted.
#[derive(Clone, Default)]
pub struct Chain {
    stages: Vec<SharedMiddleware>,
}

impl Chain {
    pub fn new() -> Self {
        Self { stages: vec![] }
    }

    #[must_use]
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    pub fn push<M: Middleware + 'static>(&mut self, middleware: M) {
        self.stages.push(Arc::new(middleware));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs the chain to completion against `ctx`
    pub async fn run(&self, ctx: &mut RequestContext) -> Result<(), BoxError> {
        Next::new(&self.stages, None).run(ctx).await
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("stages", &self.stages.len()).finish()
    }
}

#[async_trait]
impl Middleware for Chain {
    async fn call(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), BoxError> {
        Next::new(&self.stages, Some(next)).run(ctx).await
    }
}

/// a middleware backed by an async closure
pub struct MiddlewareFn<F> {
    f: F,
}

/// Adapts a closure returning a boxed future into a [`Middleware`].
///
/// ```
/// use futures::FutureExt;
/// use micro_router::middleware_fn;
///
/// let timing = middleware_fn(|ctx, next| {
///     async move {
///         let result = next.run(ctx).await;
///         tracing::info!(status = %ctx.status(), "request done");
///         result
///     }
///     .boxed()
/// });
/// # let _ = timing;
/// ```
pub fn middleware_fn<F>(f: F) -> MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut RequestContext, Next<'a>) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync + 'static,
{
    MiddlewareFn { f }
}

#[async_trait]
impl<F> Middleware for MiddlewareFn<F>
where
    F: for<'a> Fn(&'a mut RequestContext, Next<'a>) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync,
{
    async fn call(&self, ctx: &mut RequestContext, next: Next<'_>) -> Result<(), BoxError> {
        (self.f)(ctx, next).await
    }
}

impl<F> fmt::Debug for MiddlewareFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MiddlewareFn")
    }
}

/// What a handler closure may return
pub trait HandlerOutput {
    fn into_result(self) -> Result<(), BoxError>;
}

impl HandlerOutput for () {
    fn into_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E: Into<BoxError>> HandlerOutput for Result<(), E> {
    fn into_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

/// a terminal stage backed by a synchronous closure
pub struct HandlerFn<F, R> {
    f: F,
    _phantom: PhantomData<fn() -> R>,
}

/// Adapts a closure writing the response into a terminal [`Middleware`], the continuation is
/// never run.
pub fn handler_fn<F, R>(f: F) -> HandlerFn<F, R>
where
    F: Fn(&mut RequestContext) -> R + Send + Sync + 'static,
    R: HandlerOutput,
{
    HandlerFn { f, _phantom: PhantomData }
}

#[async_trait]
impl<F, R> Middleware for HandlerFn<F, R>
where
    F: Fn(&mut RequestContext) -> R + Send + Sync,
    R: HandlerOutput,
{
    async fn call(&self, ctx: &mut RequestContext, _next: Next<'_>) -> Result<(), BoxError> {
        (self.f)(ctx).into_result()
    }
}

impl<F, R> fmt::Debug for HandlerFn<F, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HandlerFn")
    }
}
