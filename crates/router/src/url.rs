//! Reverse routing: building paths back from a pattern and parameter values.
//!
//! Parameters are interpolated in the order the pattern declares them. Keyed values are looked
//! up by name; positional values fill the remaining parameters left to right. Keyed values the
//! pattern does not consume end up in the query string.
//!
//! # Example
//! ```
//! use micro_router::pattern::{Pattern, PatternOptions};
//! use micro_router::url::UrlParams;
//!
//! let pattern = Pattern::new("/users/:id/:category", PatternOptions::default()).unwrap();
//! let params = UrlParams::new().param("id", 2).param("category", "koa router").param("page", 3);
//! assert_eq!(pattern.to_path(&params).unwrap(), "/users/2/koa%20router?page=3");
//! ```

use crate::error::RouterError;
use crate::pattern::{PathTemplate, Token};
use serde::Serialize;
use std::fmt::Display;

/// Parameter values used to build a path.
#[derive(Debug, Clone, Default)]
pub struct UrlParams {
    keyed: Vec<(String, String)>,
    positional: Vec<String>,
    query: Query,
}

impl UrlParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates params filled positionally, in the declaration order of the pattern's parameters
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        Self { positional: values.into_iter().map(|value| value.to_string()).collect(), ..Self::default() }
    }

    /// Sets a keyed value, replacing a previous value for the same key
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Display) -> Self {
        let key = key.into();
        let value = value.to_string();
        match self.keyed.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.keyed.push((key, value)),
        }
        self
    }

    /// Appends a positional value
    #[must_use]
    pub fn arg(mut self, value: impl Display) -> Self {
        self.positional.push(value.to_string());
        self
    }

    /// Sets the query appended after the path
    #[must_use]
    pub fn query(mut self, query: impl Into<Query>) -> Self {
        self.query = query.into();
        self
    }
}

impl From<()> for UrlParams {
    fn from((): ()) -> Self {
        Self::default()
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for UrlParams
where
    K: Into<String>,
    V: Display,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().fold(Self::default(), |params, (key, value)| params.param(key, value))
    }
}

/// The query part of a generated url.
///
/// Pairs, and keyed values the pattern does not consume, are serialized as
/// `application/x-www-form-urlencoded`, so a space becomes `+` rather than `%20`. Both decode to
/// the same query with any form aware parser; use [`Query::Encoded`] to control the encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Query {
    #[default]
    None,
    /// pairs serialized as `application/x-www-form-urlencoded`
    Pairs(Vec<(String, String)>),
    /// a query string forwarded verbatim
    Encoded(String),
}

impl Query {
    pub fn pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Display,
    {
        Self::Pairs(pairs.into_iter().map(|(key, value)| (key.into(), value.to_string())).collect())
    }

    /// Serializes any flat `serde` structure or map into an encoded query
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, RouterError> {
        serde_urlencoded::to_string(value).map(Self::Encoded).map_err(RouterError::invalid_query)
    }

    fn encode(&self) -> Result<Option<String>, RouterError> {
        match self {
            Query::None => Ok(None),
            Query::Pairs(pairs) if pairs.is_empty() => Ok(None),
            Query::Pairs(pairs) => serde_urlencoded::to_string(pairs).map(Some).map_err(RouterError::invalid_query),
            Query::Encoded(encoded) => {
                let encoded = encoded.trim_start_matches('?');
                Ok((!encoded.is_empty()).then(|| encoded.to_string()))
            }
        }
    }
}

impl From<&str> for Query {
    fn from(encoded: &str) -> Self {
        Self::Encoded(encoded.to_string())
    }
}

impl From<String> for Query {
    fn from(encoded: String) -> Self {
        Self::Encoded(encoded)
    }
}

impl<K, V> From<Vec<(K, V)>> for Query
where
    K: Into<String>,
    V: Display,
{
    fn from(pairs: Vec<(K, V)>) -> Self {
        Self::pairs(pairs)
    }
}

pub(crate) fn build(template: &PathTemplate, params: &UrlParams) -> Result<String, RouterError> {
    let mut consumed = vec![false; params.keyed.len()];
    let mut positional = params.positional.iter();
    let mut path = String::new();

    for token in template.tokens() {
        let param = match token {
            Token::Static(literal) => {
                path.push_str(literal);
                continue;
            }
            Token::Param(param) => param,
        };

        let value = match params.keyed.iter().position(|(key, _)| *key == param.name) {
            Some(idx) => {
                consumed[idx] = true;
                Some(params.keyed[idx].1.as_str())
            }
            None => positional.next().map(String::as_str),
        };

        match value {
            Some(value) => {
                path.push_str(&param.prefix);
                if param.repeat || param.wildcard {
                    let segments: Vec<_> = value.split('/').map(encode_component).collect();
                    path.push_str(&segments.join("/"));
                } else {
                    path.push_str(&encode_component(value));
                }
            }
            None if param.optional => {}
            None => return Err(RouterError::missing_parameter(&param.name)),
        }
    }

    let surplus = positional.count();
    if surplus > 0 {
        return Err(RouterError::UnexpectedParameters { count: surplus });
    }

    let unconsumed: Vec<_> =
        params.keyed.iter().zip(consumed).filter(|(_, consumed)| !consumed).map(|(pair, _)| pair.clone()).collect();

    let mut query = Vec::with_capacity(2);
    if let Some(encoded) = Query::Pairs(unconsumed).encode()? {
        query.push(encoded);
    }
    if let Some(encoded) = params.query.encode()? {
        query.push(encoded);
    }

    if !query.is_empty() {
        path.push('?');
        path.push_str(&query.join("&"));
    }
    Ok(path)
}

/// Percent-encodes a path value, leaving `!'()*` alone like `encodeURIComponent` does
fn encode_component(value: &str) -> String {
    const RESERVED: [(&str, &str); 5] = [("%21", "!"), ("%27", "'"), ("%28", "("), ("%29", ")"), ("%2A", "*")];

    RESERVED.iter().fold(urlencoding::encode(value).into_owned(), |encoded, (escaped, raw)| encoded.replace(escaped, raw))
}
