use std::time::Duration;

use crate::backend::FetchError;
use crate::error::{BackendErrorKind, ResolutionError};

/// Map a raw backend failure on `path` into the resolution taxonomy.
///
/// `after` is the time budget of the call, reported when the transport timed out.
pub fn classify(path: &str, err: FetchError, after: Duration) -> ResolutionError {
    match err {
        FetchError::Status { status, body } => {
            ResolutionError::backend(kind_for_status(status), path, vault_message(status, &body))
        }
        // Only reachable for backends whose HTTP client enforces its own timeout.
        FetchError::Transport(e) if e.is_timeout() => ResolutionError::Timeout {
            path: path.to_string(),
            after,
        },
        FetchError::Transport(e) if e.is_decode() => {
            ResolutionError::backend(BackendErrorKind::InvalidResponse, path, e.to_string())
        }
        FetchError::Transport(e) => {
            ResolutionError::backend(BackendErrorKind::Network, path, e.to_string())
        }
        FetchError::Decode(message) => {
            ResolutionError::backend(BackendErrorKind::InvalidResponse, path, message)
        }
        deleted @ FetchError::Deleted { .. } => {
            ResolutionError::backend(BackendErrorKind::NotFound, path, deleted.to_string())
        }
    }
}

pub fn kind_for_status(status: u16) -> BackendErrorKind {
    match status {
        401 => BackendErrorKind::Unauthenticated,
        403 => BackendErrorKind::Forbidden,
        404 => BackendErrorKind::NotFound,
        429 => BackendErrorKind::RateLimited,
        500..=599 => BackendErrorKind::Unavailable,
        other => BackendErrorKind::UnexpectedStatus(other),
    }
}

/// Vault reports failures as `{"errors": ["..."]}`; fall back to the raw body.
fn vault_message(status: u16, body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        #[serde(default)]
        errors: Vec<String>,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if !parsed.errors.is_empty() {
            return parsed.errors.join("; ");
        }
    }

    let body = body.trim();
    if body.is_empty() {
        format!("status {status}")
    } else {
        body.to_string()
    }
}
