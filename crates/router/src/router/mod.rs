//! Router module provides a tree of routers compiled into one flat, declaration-ordered table.
//!
//! This module contains the core routing types:
//! - `Router`: routes, middleware, param handlers and nested routers, registered in order
//! - `RouteTable`: the compiled snapshot a `Dispatcher` serves requests from
//! - `Dispatcher`: the middleware matching requests and running the selected route's stack
//!
//! # Example
//! ```
//! use micro_router::{RequestContext, Router, handler_fn};
//!
//! let mut users = Router::new();
//! users.get(("user", "/:id"), handler_fn(|ctx: &mut RequestContext| {
//!     let id = ctx.params().get("id").unwrap_or_default().to_string();
//!     ctx.set_text(id);
//! })).unwrap();
//!
//! let mut router = Router::builder().prefix("/api").build().unwrap();
//! router.nest_at("/users", users).unwrap();
//!
//! assert_eq!(router.url("user", [("id", 3)]).unwrap(), "/api/users/3");
//! let dispatcher = router.routes().unwrap();
//! # let _ = dispatcher;
//! ```

mod dispatch;
mod host;
mod table;

pub use dispatch::Dispatcher;
pub use host::HostMatcher;
pub use table::{CompiledRoute, RouteMatch, RouteTable};

use crate::allowed_methods::{AllowedMethods, AllowedMethodsOptions};
use crate::error::{BoxError, RouterError};
use crate::middleware::{IntoHandlers, Middleware, Next, SharedMiddleware};
use crate::param::ParamHandler;
use crate::pattern::{PathTemplate, PatternOptions};
use crate::request::RequestContext;
use crate::route::{Route, RouteTarget, parse_methods};
use crate::url::UrlParams;
use async_trait::async_trait;
use http::header::LOCATION;
use http::{HeaderValue, Method, StatusCode};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// The methods `all` registers and a router implements by default
pub const DEFAULT_METHODS: [Method; 7] =
    [Method::HEAD, Method::OPTIONS, Method::GET, Method::PUT, Method::PATCH, Method::POST, Method::DELETE];

#[derive(Debug, Clone)]
struct RouterOptions {
    name: Option<String>,
    sensitive: bool,
    strict: bool,
    methods: Vec<Method>,
    host: Option<HostMatcher>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self { name: None, sensitive: false, strict: false, methods: DEFAULT_METHODS.to_vec(), host: None }
    }
}

enum Entry {
    Route(Route),
    Nested(Arc<Router>),
}

/// A node of a router tree.
///
/// Routes and nested routers are kept in the order they were registered, that order is the
/// matching order of the compiled table. Nesting never changes the nested router, the same
/// router can be nested under several parents and prefixes.
pub struct Router {
    options: RouterOptions,
    prefix: PathTemplate,
    middleware: Vec<SharedMiddleware>,
    params: HashMap<String, Arc<dyn ParamHandler>>,
    entries: Vec<Entry>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! method_route {
    ($name:ident, $method:expr) => {
        #[doc = concat!("Registers a route answering `", stringify!($name), "` requests")]
        pub fn $name(&mut self, target: impl Into<RouteTarget>, handlers: impl IntoHandlers) -> Result<&mut Self, RouterError> {
            self.add(vec![$method], target.into(), handlers.into_handlers())
        }
    };
}

impl Router {
    pub fn new() -> Self {
        Self::with_options(RouterOptions::default(), PathTemplate::empty())
    }

    /// Creates a new router builder
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    fn with_options(options: RouterOptions, prefix: PathTemplate) -> Self {
        Self { options, prefix, middleware: vec![], params: HashMap::new(), entries: vec![] }
    }

    pub fn name(&self) -> Option<&str> {
        self.options.name.as_deref()
    }

    /// The prefix applied to every route of this router, empty by default
    pub fn prefix(&self) -> &str {
        self.prefix.raw()
    }

    /// Replaces the prefix, it applies from the next compilation on
    pub fn set_prefix(&mut self, prefix: &str) -> Result<&mut Self, RouterError> {
        self.prefix = PathTemplate::parse(prefix)?;
        Ok(self)
    }

    /// Appends a middleware run before the handlers of every route of this router and of the
    /// routers nested in it
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Registers a handler run for routes capturing the parameter `name`.
    ///
    /// Handlers of several parameters run in the order the parameters appear in the path. A
    /// handler registered here replaces one inherited from an enclosing router.
    pub fn param<P: ParamHandler + 'static>(&mut self, name: impl Into<String>, handler: P) -> &mut Self {
        self.params.insert(name.into(), Arc::new(handler));
        self
    }

    method_route!(get, Method::GET);
    method_route!(post, Method::POST);
    method_route!(put, Method::PUT);
    method_route!(patch, Method::PATCH);
    method_route!(delete, Method::DELETE);
    method_route!(head, Method::HEAD);
    method_route!(options, Method::OPTIONS);

    /// Registers a route answering every method this router is configured with
    pub fn all(&mut self, target: impl Into<RouteTarget>, handlers: impl IntoHandlers) -> Result<&mut Self, RouterError> {
        let methods = self.options.methods.clone();
        self.add(methods, target.into(), handlers.into_handlers())
    }

    /// Registers a route for methods given by name, names are case insensitive
    pub fn register<I, S>(
        &mut self,
        methods: I,
        target: impl Into<RouteTarget>,
        handlers: impl IntoHandlers,
    ) -> Result<&mut Self, RouterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let methods = parse_methods(methods)?;
        self.add(methods, target.into(), handlers.into_handlers())
    }

    fn add(&mut self, methods: Vec<Method>, target: RouteTarget, handlers: Vec<SharedMiddleware>) -> Result<&mut Self, RouterError> {
        let (name, paths) = target.into_parts()?;
        let options = PatternOptions::default().sensitive(self.options.sensitive).strict(self.options.strict);

        // every path is checked before anything is registered
        let routes = paths
            .iter()
            .map(|path| Route::new(methods.clone(), path, handlers.clone(), name.clone(), options))
            .collect::<Result<Vec<_>, _>>()?;

        for route in routes {
            trace!(methods = ?route.methods(), path = route.path(), name = ?route.name(), "registered route");
            self.entries.push(Entry::Route(route));
        }
        Ok(self)
    }

    /// Nests `child` at this point of the registration order
    pub fn nest(&mut self, child: impl Into<Arc<Router>>) -> &mut Self {
        self.entries.push(Entry::Nested(child.into()));
        self
    }

    /// Nests `child` under `prefix`, `child` itself is left untouched
    pub fn nest_at(&mut self, prefix: &str, child: impl Into<Arc<Router>>) -> Result<&mut Self, RouterError> {
        let options = RouterOptions { name: None, host: None, ..self.options.clone() };
        let mut wrapper = Self::with_options(options, PathTemplate::parse(prefix)?);
        wrapper.entries.push(Entry::Nested(child.into()));
        self.entries.push(Entry::Nested(Arc::new(wrapper)));
        Ok(self)
    }

    /// Redirects `source` to `destination` with `301 Moved Permanently`
    pub fn redirect(&mut self, source: impl Into<RouteTarget>, destination: &str) -> Result<&mut Self, RouterError> {
        self.redirect_with_status(source, destination, StatusCode::MOVED_PERMANENTLY)
    }

    /// Redirects `source` to `destination`.
    ///
    /// A destination that is neither a path nor an absolute url is taken as a route name and
    /// resolved against the routes registered so far.
    pub fn redirect_with_status(
        &mut self,
        source: impl Into<RouteTarget>,
        destination: &str,
        status: StatusCode,
    ) -> Result<&mut Self, RouterError> {
        if destination.is_empty() {
            warn!("rejected redirect to an empty destination");
            return Err(RouterError::invalid_arguments("redirect destination must not be empty"));
        }
        if !status.is_redirection() {
            return Err(RouterError::invalid_arguments(format!("{status} is not a redirection status")));
        }

        let location = if destination.starts_with('/') || destination.contains("://") {
            destination.to_string()
        } else {
            self.url(destination, ())?
        };
        let location = HeaderValue::from_str(&location).map_err(RouterError::invalid_arguments)?;

        let redirect: SharedMiddleware = Arc::new(Redirect { location, status });
        let methods = self.options.methods.clone();
        self.add(methods, source.into(), vec![redirect])
    }

    /// The first route registered under `name`, looking into nested routers as well.
    ///
    /// The route is returned as registered, without the prefixes of the routers it is nested
    /// in. Use [`Router::url`] for absolute paths.
    pub fn route(&self, name: &str) -> Option<&Route> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Route(route) => (route.name() == Some(name)).then_some(route),
            Entry::Nested(child) => child.route(name),
        })
    }

    /// Builds the absolute path of the route registered under `name`, prefixes included
    pub fn url(&self, name: &str, params: impl Into<UrlParams>) -> Result<String, RouterError> {
        self.compile()?.url(name, params)
    }

    /// Flattens the tree into a table, in declaration order
    pub fn compile(&self) -> Result<RouteTable, RouterError> {
        table::compile(self)
    }

    /// Compiles the tree into the middleware dispatching requests to it
    pub fn routes(&self) -> Result<Dispatcher, RouterError> {
        Ok(Dispatcher::new(self.compile()?))
    }

    /// The stage answering `OPTIONS`, `405` and `501` for requests no route was selected for
    pub fn allowed_methods(&self, options: AllowedMethodsOptions) -> AllowedMethods {
        AllowedMethods::new(self.implemented_methods(), options)
    }

    /// Methods configured or registered anywhere in this tree, `HEAD` included when `GET` is
    pub fn implemented_methods(&self) -> Vec<Method> {
        let mut methods = vec![];
        self.collect_methods(&mut methods);
        if methods.contains(&Method::GET) && !methods.contains(&Method::HEAD) {
            methods.push(Method::HEAD);
        }
        methods
    }

    fn collect_methods(&self, methods: &mut Vec<Method>) {
        fn push_unique(methods: &mut Vec<Method>, candidates: &[Method]) {
            for method in candidates {
                if !methods.contains(method) {
                    methods.push(method.clone());
                }
            }
        }

        push_unique(methods, &self.options.methods);
        for entry in &self.entries {
            match entry {
                Entry::Route(route) => push_unique(methods, route.methods()),
                Entry::Nested(child) => child.collect_methods(methods),
            }
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("name", &self.options.name)
            .field("prefix", &self.prefix.raw())
            .field("middleware", &self.middleware.len())
            .field("params", &self.params.keys().collect::<Vec<_>>())
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Builder for [`Router`]
#[derive(Debug, Default)]
pub struct RouterBuilder {
    options: RouterOptions,
    prefix: String,
}

impl RouterBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// The router name, exposed to handlers as [`RequestContext::router_name`]
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Match paths case sensitively, default `false`
    #[must_use]
    pub fn sensitive(mut self, sensitive: bool) -> Self {
        self.options.sensitive = sensitive;
        self
    }

    /// Distinguish `/path` from `/path/`, default `false`
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.options.strict = strict;
        self
    }

    /// The methods `all` registers and the router implements
    #[must_use]
    pub fn methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.options.methods = methods.into_iter().collect();
        self
    }

    /// Only match requests for this host
    #[must_use]
    pub fn host(mut self, host: impl Into<HostMatcher>) -> Self {
        self.options.host = Some(host.into());
        self
    }

    pub fn build(self) -> Result<Router, RouterError> {
        let prefix = PathTemplate::parse(&self.prefix)?;
        Ok(Router::with_options(self.options, prefix))
    }
}

struct Redirect {
    location: HeaderValue,
    status: StatusCode,
}

#[async_trait]
impl Middleware for Redirect {
    async fn call(&self, ctx: &mut RequestContext, _next: Next<'_>) -> Result<(), BoxError> {
        ctx.set_header(LOCATION, self.location.clone());
        ctx.set_status(self.status);
        Ok(())
    }
}

#[cfg(test)]
mod tests;
