use http::{Method, StatusCode};
use std::error::Error;
use thiserror::Error;

/// The error type every middleware stage returns
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Errors raised while building a router or generating urls from it.
///
/// All of these are programming errors of the caller: they surface synchronously from the
/// registration or reverse routing call, never while a request is dispatched.
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("duplicate parameter '{name}' in path pattern '{pattern}'")]
    DuplicateParameter { pattern: String, name: String },

    #[error("invalid http method '{method}'")]
    InvalidMethod { method: String },

    #[error("invalid arguments: {reason}")]
    InvalidArguments { reason: String },

    #[error("no route found for name: {name}")]
    UnknownRoute { name: String },

    #[error("expected parameter '{name}' to be defined")]
    MissingParameter { name: String },

    #[error("got {count} more positional parameters than the path declares")]
    UnexpectedParameters { count: usize },

    #[error("path pattern '{pattern}' is a raw regular expression and cannot build urls")]
    NotReversible { pattern: String },

    #[error("invalid query: {reason}")]
    InvalidQuery { reason: String },
}

impl RouterError {
    pub fn invalid_pattern<P: ToString, R: ToString>(pattern: P, reason: R) -> Self {
        Self::InvalidPattern { pattern: pattern.to_string(), reason: reason.to_string() }
    }

    pub fn duplicate_parameter<P: ToString, N: ToString>(pattern: P, name: N) -> Self {
        Self::DuplicateParameter { pattern: pattern.to_string(), name: name.to_string() }
    }

    pub fn invalid_method<S: ToString>(method: S) -> Self {
        Self::InvalidMethod { method: method.to_string() }
    }

    pub fn invalid_arguments<S: ToString>(reason: S) -> Self {
        Self::InvalidArguments { reason: reason.to_string() }
    }

    pub fn unknown_route<S: ToString>(name: S) -> Self {
        Self::UnknownRoute { name: name.to_string() }
    }

    pub fn missing_parameter<S: ToString>(name: S) -> Self {
        Self::MissingParameter { name: name.to_string() }
    }

    pub fn not_reversible<S: ToString>(pattern: S) -> Self {
        Self::NotReversible { pattern: pattern.to_string() }
    }

    pub fn invalid_query<S: ToString>(reason: S) -> Self {
        Self::InvalidQuery { reason: reason.to_string() }
    }
}

/// Dispatch outcomes raised by [`AllowedMethods`](crate::AllowedMethods) in throw mode.
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("method {method} is not allowed, allowed: {allowed}")]
    MethodNotAllowed { method: Method, allowed: String },

    #[error("method {method} is not implemented")]
    NotImplemented { method: Method },
}

impl RoutingError {
    pub fn method_not_allowed(method: Method, allowed: impl Into<String>) -> Self {
        Self::MethodNotAllowed { method, allowed: allowed.into() }
    }

    pub fn not_implemented(method: Method) -> Self {
        Self::NotImplemented { method }
    }

    /// The status a host should answer with for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            RoutingError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            RoutingError::NotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
        }
    }
}
