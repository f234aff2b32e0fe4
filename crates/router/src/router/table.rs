//! The flattened, immutable form of a router tree.

use super::host::HostMatcher;
use super::{Entry, Router};
use crate::error::RouterError;
use crate::middleware::SharedMiddleware;
use crate::param::{ParamHandler, ParamMiddleware};
use crate::pattern::{PathTemplate, Pattern};
use crate::request::PathParams;
use crate::route::Route;
use crate::url::UrlParams;
use http::Method;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A route with its absolute pattern and the full stack it runs.
///
/// The stack is the middleware of every enclosing router from the root down, then the param
/// handlers for the parameters the route captures, then the route's own handlers.
pub struct CompiledRoute {
    route: Route,
    host: Option<HostMatcher>,
    stack: Vec<SharedMiddleware>,
}

impl CompiledRoute {
    /// The route with every enclosing prefix applied
    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn name(&self) -> Option<&str> {
        self.route.name()
    }

    pub fn methods(&self) -> &[Method] {
        self.route.methods()
    }

    pub fn path(&self) -> &str {
        self.route.path()
    }

    pub fn pattern(&self) -> &Pattern {
        self.route.pattern()
    }

    pub fn host(&self) -> Option<&HostMatcher> {
        self.host.as_ref()
    }

    pub fn stack(&self) -> &[SharedMiddleware] {
        &self.stack
    }

    pub fn params(&self, path: &str) -> Option<PathParams> {
        self.route.params(path)
    }

    fn matches_host(&self, host: Option<&str>) -> bool {
        self.host.as_ref().is_none_or(|matcher| matcher.matches(host))
    }
}

impl fmt::Debug for CompiledRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledRoute")
            .field("name", &self.route.name())
            .field("methods", &self.route.methods())
            .field("path", &self.route.path())
            .field("stack", &self.stack.len())
            .finish()
    }
}

/// The outcome of matching one request against a [`RouteTable`]
#[derive(Debug, Default)]
pub struct RouteMatch {
    matched: Vec<Arc<CompiledRoute>>,
    route: Option<Arc<CompiledRoute>>,
}

impl RouteMatch {
    /// Every route whose path matched, whatever its methods, in table order
    pub fn matched(&self) -> &[Arc<CompiledRoute>] {
        &self.matched
    }

    /// The selected route
    pub fn route(&self) -> Option<&Arc<CompiledRoute>> {
        self.route.as_ref()
    }

    pub fn into_parts(self) -> (Vec<Arc<CompiledRoute>>, Option<Arc<CompiledRoute>>) {
        (self.matched, self.route)
    }
}

/// A snapshot of a router tree, in declaration order.
///
/// Later changes to the tree are not reflected, compile again to pick them up.
#[derive(Debug)]
pub struct RouteTable {
    name: Option<String>,
    routes: Vec<Arc<CompiledRoute>>,
}

impl RouteTable {
    /// The name of the router the table was compiled from
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn routes(&self) -> &[Arc<CompiledRoute>] {
        &self.routes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Matches a request without running anything.
    ///
    /// The first route declared for `method` wins. A `HEAD` request with no route declared for
    /// `HEAD` falls back to the first `GET` route.
    pub fn lookup(&self, method: &Method, path: &str, host: Option<&str>) -> RouteMatch {
        let matched: Vec<_> =
            self.routes.iter().filter(|route| route.matches_host(host) && route.pattern().is_match(path)).cloned().collect();

        let route = matched
            .iter()
            .find(|route| route.methods().contains(method))
            .or_else(|| {
                if *method == Method::HEAD {
                    matched.iter().find(|route| route.methods().contains(&Method::GET))
                } else {
                    None
                }
            })
            .cloned();

        RouteMatch { matched, route }
    }

    /// The first route registered under `name`
    pub fn route(&self, name: &str) -> Option<&Arc<CompiledRoute>> {
        self.routes.iter().find(|route| route.name() == Some(name))
    }

    /// Builds the absolute path of the route registered under `name`
    pub fn url(&self, name: &str, params: impl Into<UrlParams>) -> Result<String, RouterError> {
        self.route(name).ok_or_else(|| RouterError::unknown_route(name))?.route().url(params)
    }
}

/// What a router inherits from the routers enclosing it
struct Scope {
    prefix: PathTemplate,
    middleware: Vec<SharedMiddleware>,
    params: HashMap<String, Arc<dyn ParamHandler>>,
    host: Option<HostMatcher>,
}

impl Scope {
    fn root() -> Self {
        Self { prefix: PathTemplate::empty(), middleware: vec![], params: HashMap::new(), host: None }
    }

    fn enter(&self, router: &Router) -> Self {
        let mut middleware = self.middleware.clone();
        middleware.extend(router.middleware.iter().cloned());

        let mut params = self.params.clone();
        params.extend(router.params.iter().map(|(name, handler)| (name.clone(), Arc::clone(handler))));

        Self {
            prefix: self.prefix.join(&router.prefix, router.options.strict),
            middleware,
            params,
            host: router.options.host.clone().or_else(|| self.host.clone()),
        }
    }

    fn compile_route(&self, route: &Route) -> Result<CompiledRoute, RouterError> {
        let route = route.with_template_prefix(&self.prefix)?;

        let mut stack = self.middleware.clone();
        for key in route.keys() {
            if let Some(handler) = self.params.get(key.name()) {
                stack.push(Arc::new(ParamMiddleware::new(key.name(), Arc::clone(handler))));
            }
        }
        stack.extend(route.handlers().iter().cloned());

        Ok(CompiledRoute { route, host: self.host.clone(), stack })
    }
}

pub(crate) fn compile(router: &Router) -> Result<RouteTable, RouterError> {
    let mut routes = vec![];
    collect(router, &Scope::root(), &mut routes)?;
    debug!(router = ?router.name(), routes = routes.len(), "compiled route table");
    Ok(RouteTable { name: router.name().map(str::to_string), routes })
}

fn collect(router: &Router, parent: &Scope, out: &mut Vec<Arc<CompiledRoute>>) -> Result<(), RouterError> {
    let scope = parent.enter(router);
    for entry in &router.entries {
        match entry {
            Entry::Route(route) => out.push(Arc::new(scope.compile_route(route)?)),
            Entry::Nested(child) => collect(child, &scope, out)?,
        }
    }
    Ok(())
}
