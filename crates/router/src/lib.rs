//! An embeddable, koa-style router.
//!
//! Routes are registered on a tree of [`Router`]s, each with its own prefix, middleware and param
//! handlers. The tree is compiled into a flat table in declaration order and served by a
//! [`Dispatcher`], itself a [`Middleware`] a host mounts in its own chain. The transport is left
//! to the host: it builds a [`RequestContext`] per request and turns it into a response once the
//! chain completes.
//!
//! # Example
//! ```
//! use micro_router::{AllowedMethodsOptions, Chain, RequestContext, Router, handler_fn};
//! use http::{Method, StatusCode};
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # runtime.block_on(async {
//! let mut router = Router::new();
//! router.get("/users/:id", handler_fn(|ctx: &mut RequestContext| {
//!     let id = ctx.params().get("id").unwrap_or_default().to_string();
//!     ctx.set_text(format!("user {id}"));
//! })).unwrap();
//!
//! let app = Chain::new()
//!     .with(router.allowed_methods(AllowedMethodsOptions::default()))
//!     .with(router.routes().unwrap());
//!
//! let mut ctx = RequestContext::new(Method::GET, "/users/42".parse().unwrap());
//! app.run(&mut ctx).await.unwrap();
//! assert_eq!(ctx.body().unwrap().as_ref(), b"user 42");
//!
//! let mut ctx = RequestContext::new(Method::POST, "/users/42".parse().unwrap());
//! app.run(&mut ctx).await.unwrap();
//! assert_eq!(ctx.status(), StatusCode::METHOD_NOT_ALLOWED);
//! # });
//! # }
//! ```

mod allowed_methods;
mod body;
mod error;
mod middleware;
mod param;
mod request;
mod route;

pub mod pattern;
pub mod router;
pub mod url;

pub use allowed_methods::AllowedMethods;
pub use allowed_methods::AllowedMethodsOptions;
pub use allowed_methods::AllowedMethodsOptionsBuilder;
pub use allowed_methods::ErrorFactory;
pub use body::ResponseBody;
pub use error::BoxError;
pub use error::RouterError;
pub use error::RoutingError;
pub use middleware::Chain;
pub use middleware::HandlerFn;
pub use middleware::HandlerOutput;
pub use middleware::IntoHandlers;
pub use middleware::Middleware;
pub use middleware::MiddlewareFn;
pub use middleware::Next;
pub use middleware::SharedMiddleware;
pub use middleware::handler_fn;
pub use middleware::middleware_fn;
pub use middleware::shared;
pub use param::ParamFn;
pub use param::ParamHandler;
pub use param::param_fn;
pub use request::PathParams;
pub use request::RequestContext;
pub use route::PathSpec;
pub use route::Route;
pub use route::RouteTarget;
pub use router::Dispatcher;
pub use router::Router;
pub use router::RouterBuilder;
