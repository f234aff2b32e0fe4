//! Routes: a method set, a compiled pattern and the ordered handlers to run.

use crate::error::RouterError;
use crate::middleware::{IntoHandlers, SharedMiddleware};
use crate::pattern::{ParamKey, PathTemplate, Pattern, PatternOptions};
use crate::request::PathParams;
use crate::url::UrlParams;
use http::Method;
use regex::Regex;
use std::fmt;

/// One path of a registration target
#[derive(Debug, Clone)]
pub enum PathSpec {
    Template(String),
    Regex(Regex),
}

impl PathSpec {
    fn compile(&self, options: PatternOptions) -> Result<Pattern, RouterError> {
        match self {
            PathSpec::Template(path) => Pattern::new(path, options),
            PathSpec::Regex(regex) => Ok(Pattern::from_regex_with(regex.clone(), options)),
        }
    }
}

/// What a route is registered for: one or more paths and an optional name.
///
/// Built from the usual argument shapes:
/// - `"/users"` or `String`
/// - `("user", "/users/:id")`
/// - `["/a", "/b"]` or `vec!["/a", "/b"]`
/// - `("users", ["/a", "/b"])`
/// - `Regex` or `("user", Regex)`
#[derive(Debug, Clone)]
pub struct RouteTarget {
    name: Option<String>,
    paths: Vec<PathSpec>,
}

impl RouteTarget {
    pub fn new(name: Option<String>, paths: Vec<PathSpec>) -> Self {
        Self { name, paths }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn paths(&self) -> &[PathSpec] {
        &self.paths
    }

    pub(crate) fn into_parts(self) -> Result<(Option<String>, Vec<PathSpec>), RouterError> {
        if self.paths.is_empty() {
            return Err(RouterError::invalid_arguments("a route needs at least one path"));
        }
        if self.name.as_deref().is_some_and(str::is_empty) {
            return Err(RouterError::invalid_arguments("a route name must not be empty"));
        }
        Ok((self.name, self.paths))
    }
}

impl From<&str> for RouteTarget {
    fn from(path: &str) -> Self {
        Self::new(None, vec![PathSpec::Template(path.to_string())])
    }
}

impl From<String> for RouteTarget {
    fn from(path: String) -> Self {
        Self::new(None, vec![PathSpec::Template(path)])
    }
}

impl From<(&str, &str)> for RouteTarget {
    fn from((name, path): (&str, &str)) -> Self {
        Self::new(Some(name.to_string()), vec![PathSpec::Template(path.to_string())])
    }
}

impl<const N: usize> From<[&str; N]> for RouteTarget {
    fn from(paths: [&str; N]) -> Self {
        Self::new(None, paths.iter().map(|path| PathSpec::Template((*path).to_string())).collect())
    }
}

impl From<Vec<&str>> for RouteTarget {
    fn from(paths: Vec<&str>) -> Self {
        Self::new(None, paths.into_iter().map(|path| PathSpec::Template(path.to_string())).collect())
    }
}

impl From<Vec<String>> for RouteTarget {
    fn from(paths: Vec<String>) -> Self {
        Self::new(None, paths.into_iter().map(PathSpec::Template).collect())
    }
}

impl<const N: usize> From<(&str, [&str; N])> for RouteTarget {
    fn from((name, paths): (&str, [&str; N])) -> Self {
        Self::new(Some(name.to_string()), paths.iter().map(|path| PathSpec::Template((*path).to_string())).collect())
    }
}

impl From<Regex> for RouteTarget {
    fn from(regex: Regex) -> Self {
        Self::new(None, vec![PathSpec::Regex(regex)])
    }
}

impl From<(&str, Regex)> for RouteTarget {
    fn from((name, regex): (&str, Regex)) -> Self {
        Self::new(Some(name.to_string()), vec![PathSpec::Regex(regex)])
    }
}

/// Normalizes method names to upper case, in order and without duplicates
pub(crate) fn parse_methods<I, S>(methods: I) -> Result<Vec<Method>, RouterError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed: Vec<Method> = vec![];
    for method in methods {
        let upper = method.as_ref().trim().to_ascii_uppercase();
        if upper.is_empty() {
            return Err(RouterError::invalid_method(method.as_ref()));
        }
        let method = Method::from_bytes(upper.as_bytes()).map_err(|_| RouterError::invalid_method(&upper))?;
        if !parsed.contains(&method) {
            parsed.push(method);
        }
    }
    Ok(parsed)
}

/// A registered route.
///
/// `GET` routes also answer `HEAD` requests, a route registered for `HEAD` explicitly is
/// preferred over that during dispatch.
#[derive(Clone)]
pub struct Route {
    name: Option<String>,
    methods: Vec<Method>,
    pattern: Pattern,
    handlers: Vec<SharedMiddleware>,
}

impl Route {
    pub fn new(
        methods: Vec<Method>,
        path: &PathSpec,
        handlers: impl IntoHandlers,
        name: Option<String>,
        options: PatternOptions,
    ) -> Result<Self, RouterError> {
        let handlers = handlers.into_handlers();
        if handlers.is_empty() {
            return Err(RouterError::invalid_arguments("a route needs at least one handler"));
        }
        if methods.is_empty() {
            return Err(RouterError::invalid_arguments("a route needs at least one method"));
        }

        let mut unique: Vec<Method> = Vec::with_capacity(methods.len());
        for method in methods {
            if !unique.contains(&method) {
                unique.push(method);
            }
        }

        Ok(Self { name, methods: unique, pattern: path.compile(options)?, handlers })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The methods this route was registered for, `HEAD` is not implied here
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn path(&self) -> &str {
        self.pattern.path()
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn keys(&self) -> &[ParamKey] {
        self.pattern.keys()
    }

    pub fn handlers(&self) -> &[SharedMiddleware] {
        &self.handlers
    }

    /// Returns true if this route was registered for `method`, `GET` covering `HEAD`
    pub fn has_method(&self, method: &Method) -> bool {
        self.methods.contains(method) || (*method == Method::HEAD && self.methods.contains(&Method::GET))
    }

    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.has_method(method) && self.pattern.is_match(path)
    }

    /// Captures and decodes the parameters of `path`, `None` if the path does not match.
    ///
    /// Absent optional parameters are left out. A value that does not decode is kept as it was
    /// in the path.
    pub fn params(&self, path: &str) -> Option<PathParams> {
        let captures = self.pattern.captures(path)?;
        let mut params = PathParams::empty();
        for (key, value) in self.pattern.keys().iter().zip(captures) {
            let Some(value) = value else {
                continue;
            };
            match urlencoding::decode(&value) {
                Ok(decoded) => params.insert(key.name(), decoded.into_owned()),
                Err(_) => params.insert(key.name(), value),
            }
        }
        Some(params)
    }

    /// Builds a path for this route, see [`UrlParams`]
    pub fn url(&self, params: impl Into<UrlParams>) -> Result<String, RouterError> {
        self.pattern.to_path(&params.into())
    }

    /// Returns a copy of this route with `prefix` in front of its pattern
    pub fn with_prefix(&self, prefix: &str) -> Result<Self, RouterError> {
        Ok(Self { pattern: self.pattern.with_prefix(prefix)?, ..self.clone() })
    }

    pub(crate) fn with_template_prefix(&self, prefix: &PathTemplate) -> Result<Self, RouterError> {
        Ok(Self { pattern: self.pattern.with_template_prefix(prefix)?, ..self.clone() })
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .field("path", &self.pattern.path())
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
