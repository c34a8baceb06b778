use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::KvData;

/// Raw failure from a backend read, before classification.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("{}", deleted_message(.version, .deletion_time, .destroyed))]
    Deleted {
        version: u64,
        deletion_time: Option<DateTime<Utc>>,
        destroyed: bool,
    },
}

fn deleted_message(version: &u64, deletion_time: &Option<DateTime<Utc>>, destroyed: &bool) -> String {
    match deletion_time {
        _ if *destroyed => format!("secret version {version} is destroyed"),
        Some(at) => format!("secret version {version} was deleted at {}", at.to_rfc3339()),
        None => format!("secret version {version} is deleted"),
    }
}

/// Anything that can read a versioned secret document.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Read the document at `path`; the latest version when `version` is `None`.
    ///
    /// Dropping the returned future must abort the read.
    async fn fetch_document(&self, path: &str, version: Option<u64>) -> Result<KvData, FetchError>;

    /// Short name used in log fields
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<B: SecretBackend + ?Sized> SecretBackend for Arc<B> {
    async fn fetch_document(&self, path: &str, version: Option<u64>) -> Result<KvData, FetchError> {
        (**self).fetch_document(path, version).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
