//! Path pattern compilation.
//!
//! A [`Pattern`] turns a path template like `/users/:id/:tab?` into a matcher and keeps the
//! ordered list of parameter names it declares. Supported syntax:
//!
//! - `:name` a named parameter matching one segment
//! - `:name?` an optional parameter, its leading `/` is optional too
//! - `:name*` / `:name+` a parameter repeating over several segments
//! - `:name(\d+)` a parameter with a custom pattern
//! - `(\d+)` an unnamed group, keyed by its position
//! - `*` a wildcard matching the remainder of the path, slashes included
//!
//! Raw regular expressions can be used as well through [`Pattern::from_regex`].
//!
//! # Example
//! ```
//! use micro_router::pattern::{Pattern, PatternOptions};
//!
//! let pattern = Pattern::new("/users/:id", PatternOptions::default()).unwrap();
//! assert!(pattern.is_match("/users/42"));
//! assert!(pattern.is_match("/USERS/42/"));
//! assert_eq!(pattern.captures("/users/42"), Some(vec![Some("42".to_string())]));
//! ```

mod template;

pub(crate) use template::{PathTemplate, Token};

use crate::error::RouterError;
use crate::url::{self, UrlParams};
use regex::Regex;

/// Options controlling how a [`Pattern`] matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternOptions {
    /// match case sensitively, default `false`
    pub sensitive: bool,
    /// a trailing slash must match exactly, default `false`
    pub strict: bool,
    /// the pattern must match the whole path, default `true`
    pub end: bool,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self { sensitive: false, strict: false, end: true }
    }
}

impl PatternOptions {
    #[must_use]
    pub fn sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }

    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub fn end(mut self, end: bool) -> Self {
        self.end = end;
        self
    }
}

/// A parameter declared by a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamKey {
    name: String,
    optional: bool,
    positional: bool,
}

impl ParamKey {
    pub(crate) fn new(name: String, optional: bool) -> Self {
        Self { name, optional, positional: false }
    }

    pub(crate) fn positional(index: usize, optional: bool) -> Self {
        Self { name: index.to_string(), optional, positional: true }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// unnamed groups and wildcards are keyed by their position
    pub fn is_positional(&self) -> bool {
        self.positional
    }
}

#[derive(Debug, Clone)]
enum Source {
    Template(PathTemplate),
    Regex(String),
}

/// A compiled path pattern.
///
/// Patterns are immutable, prefixing one builds a new pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: Source,
    options: PatternOptions,
    regex: Regex,
    keys: Vec<ParamKey>,
}

impl Pattern {
    /// Compiles a string pattern
    pub fn new(path: &str, options: PatternOptions) -> Result<Self, RouterError> {
        Self::from_template(PathTemplate::parse(path)?, options)
    }

    /// Wraps a raw regular expression.
    ///
    /// Named capture groups become parameters with the group's name, unnamed ones are keyed by
    /// their position among the unnamed groups.
    pub fn from_regex(regex: Regex) -> Self {
        Self::from_regex_with(regex, PatternOptions::default())
    }

    /// Wraps a raw regular expression, `options` apply to prefixes joined in front of it.
    ///
    /// The expression itself is matched as written.
    pub fn from_regex_with(regex: Regex, options: PatternOptions) -> Self {
        let keys = regex_keys(&regex);
        Self { source: Source::Regex(regex.as_str().to_string()), options, regex, keys }
    }

    pub(crate) fn from_template(template: PathTemplate, options: PatternOptions) -> Result<Self, RouterError> {
        let regex = Regex::new(&template.to_regex(options)).map_err(|e| RouterError::invalid_pattern(template.raw(), e))?;
        let keys = template.keys();
        Ok(Self { source: Source::Template(template), options, regex, keys })
    }

    /// The pattern as it was written, prefixes included
    pub fn path(&self) -> &str {
        match &self.source {
            Source::Template(template) => template.raw(),
            Source::Regex(source) => source,
        }
    }

    pub fn options(&self) -> PatternOptions {
        self.options
    }

    /// The declared parameters, in left-to-right order
    pub fn keys(&self) -> &[ParamKey] {
        &self.keys
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    #[inline]
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Captures the raw, still encoded, parameter values in key order.
    ///
    /// An optional parameter that did not participate in the match is `None`.
    pub fn captures(&self, path: &str) -> Option<Vec<Option<String>>> {
        self.regex
            .captures(path)
            .map(|captures| captures.iter().skip(1).map(|value| value.map(|value| value.as_str().to_string())).collect())
    }

    /// Builds a new pattern matching `prefix` followed by this pattern.
    pub fn with_prefix(&self, prefix: &str) -> Result<Self, RouterError> {
        self.with_template_prefix(&PathTemplate::parse(prefix)?)
    }

    pub(crate) fn with_template_prefix(&self, prefix: &PathTemplate) -> Result<Self, RouterError> {
        if prefix.is_empty() {
            return Ok(self.clone());
        }

        let pattern = self.join_prefix(prefix)?;
        let mut seen: Vec<&str> = vec![];
        for key in &pattern.keys {
            if seen.contains(&key.name()) {
                return Err(RouterError::duplicate_parameter(pattern.path(), key.name()));
            }
            seen.push(key.name());
        }
        Ok(pattern)
    }

    fn join_prefix(&self, prefix: &PathTemplate) -> Result<Self, RouterError> {
        match &self.source {
            Source::Template(template) => Self::from_template(prefix.join(template, self.options.strict), self.options),
            Source::Regex(source) => {
                let body = prefix.regex_body(self.options.strict);
                let body = if self.options.sensitive { body } else { format!("(?i:{body})") };
                let rest = source.strip_prefix('^').unwrap_or(source);
                let combined = format!("^{body}{rest}");

                let regex = Regex::new(&combined).map_err(|e| RouterError::invalid_pattern(&combined, e))?;
                let mut keys = prefix.keys();
                let offset = keys.iter().filter(|key| key.positional).count();
                keys.extend(self.keys.iter().map(|key| {
                    if key.positional {
                        ParamKey::positional(offset + key.name.parse::<usize>().unwrap_or_default(), key.optional)
                    } else {
                        key.clone()
                    }
                }));
                Ok(Self { source: Source::Regex(combined), options: self.options, regex, keys })
            }
        }
    }

    /// Generates a path from parameter values, see [`UrlParams`]
    pub fn to_path(&self, params: &UrlParams) -> Result<String, RouterError> {
        match &self.source {
            Source::Template(template) => url::build(template, params),
            Source::Regex(source) => Err(RouterError::not_reversible(source)),
        }
    }
}

fn regex_keys(regex: &Regex) -> Vec<ParamKey> {
    let mut unnamed = 0usize;
    regex
        .capture_names()
        .skip(1)
        .map(|name| match name {
            Some(name) => ParamKey::new(name.to_string(), false),
            None => {
                let key = ParamKey::positional(unnamed, false);
                unnamed += 1;
                key
            }
        })
        .collect()
}
