//! # Errores del Servidor
//! src/error.rs
//!
//! Taxonomía de fallas de una conexión. Todas son terminales y locales a
//! esa conexión: ninguna se reintenta ni afecta a otras.
//!
//! | Error                   | Status |
//! |-------------------------|--------|
//! | `MalformedRequest`      | 400    |
//! | `UnsupportedMethod`     | 405    |
//! | `PathTraversalRejected` | 400    |
//! | `ResourceNotFound`      | 404    |
//! | `InternalFailure`       | 500    |

use crate::files::ResolveError;
use crate::http::{ParseError, StatusCode};
use crate::server::pool::PoolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("method not allowed: {0}")]
    UnsupportedMethod(String),

    #[error("path traversal rejected")]
    PathTraversalRejected,

    #[error("resource not found")]
    ResourceNotFound,

    #[error("internal failure: {0}")]
    InternalFailure(#[source] std::io::Error),
}

impl ServerError {
    /// Status que recibe el cliente.
    ///
    /// Traversal y request malformado responden igual (400) para no
    /// distinguir un ataque de un error de tipeo.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::MalformedRequest(_) => StatusCode::BadRequest,
            ServerError::UnsupportedMethod(_) => StatusCode::MethodNotAllowed,
            ServerError::PathTraversalRejected => StatusCode::BadRequest,
            ServerError::ResourceNotFound => StatusCode::NotFound,
            ServerError::InternalFailure(_) => StatusCode::InternalServerError,
        }
    }
}

impl From<ParseError> for ServerError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::UnsupportedMethod(method) => ServerError::UnsupportedMethod(method),
            other => ServerError::MalformedRequest(other.to_string()),
        }
    }
}

impl From<ResolveError> for ServerError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::TraversalRejected => ServerError::PathTraversalRejected,
            ResolveError::Internal(e) => ServerError::InternalFailure(e),
        }
    }
}

/// Errores de validación de la configuración
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} must be >= {1}")]
    TooSmall(&'static str, usize),

    #[error("server name must not be empty")]
    EmptyServerName,
}

/// Fallas al arrancar: son las únicas que terminan el proceso
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Pool(#[from] PoolError),
}
