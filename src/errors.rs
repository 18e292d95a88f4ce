//! Error kinds carried through the dispatcher and mapped to HTTP statuses.
//!
//! Every error the proxy can surface to a client is one of these variants,
//! so the HTTP layer maps status codes by kind instead of grepping error
//! text. The `Display` output for upstream 401/404 responses still contains
//! the literal status number so operators can search logs for it.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// Malformed protocol frames, unsupported command or service, wrong
    /// protocol version, gzip failure, unknown path.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Private mirror without a usable credential, or the upstream rejected
    /// the forwarded credential.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The upstream does not know the repository.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other non-2xx from the upstream, with a body excerpt when the
    /// upstream sent one.
    #[error("got a non-OK response from the upstream: {status} {message}")]
    Upstream { status: u16, message: String },

    /// A `git` subprocess exited non-zero.
    #[error("git {command} failed ({status}): {stderr}")]
    CommandFailed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// The client went away while we were waiting on an upstream fetch.
    #[error("request cancelled by the client")]
    Cancelled,

    /// Local filesystem errors, subprocess spawn failures, misconfiguration,
    /// unparsable upstream responses.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ProxyError {
    /// Classify a non-OK upstream response into a structured kind.
    pub fn from_upstream_status(status: u16, message: String) -> Self {
        match status {
            401 => ProxyError::Unauthorized(format!("upstream returned 401: {message}")),
            404 => ProxyError::NotFound(format!("upstream returned 404: {message}")),
            _ => ProxyError::Upstream { status, message },
        }
    }

    /// The HTTP status this error maps to at the front end.
    pub fn http_status(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ProxyError::NotFound(_) => StatusCode::NOT_FOUND,
            ProxyError::Upstream { .. }
            | ProxyError::CommandFailed { .. }
            | ProxyError::Cancelled
            | ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
