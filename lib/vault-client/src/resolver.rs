//! Field resolution against a [`SecretBackend`] with a per-call deadline.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::backend::SecretBackend;
use crate::classify::classify;
use crate::client::VaultClient;
use crate::error::{Error, ResolutionError};
use crate::models::{KvData, SecretValue};
use crate::reference::SecretReference;

/// Resolve one field with a single bounded read; no retries.
///
/// The read future is dropped when the deadline passes, which aborts the
/// in-flight request.
pub async fn resolve_field<B>(
    backend: &B,
    reference: &SecretReference,
    timeout: Duration,
) -> Result<SecretValue, ResolutionError>
where
    B: SecretBackend + ?Sized,
{
    let path = reference.normalized_path();

    tracing::debug!(
        backend = backend.name(),
        path,
        key = %reference.key,
        ?timeout,
        "Resolving secret field"
    );

    let read = backend.fetch_document(path, reference.version);
    // A budget too large to represent as an instant means no deadline.
    let outcome = match Instant::now().checked_add(timeout) {
        Some(deadline) => tokio::time::timeout_at(deadline, read).await,
        None => Ok(read.await),
    };

    let document = match outcome {
        Ok(Ok(document)) => document,
        Ok(Err(e)) => return Err(classify(path, e, timeout)),
        Err(_) => {
            return Err(ResolutionError::Timeout {
                path: path.to_string(),
                after: timeout,
            });
        }
    };

    tracing::debug!(path, version = document.metadata.version, "Fetched secret document");

    extract_field(document, path, &reference.key)
}

fn extract_field(mut document: KvData, path: &str, key: &str) -> Result<SecretValue, ResolutionError> {
    document
        .data
        .remove(key)
        .map(SecretValue::new)
        .ok_or_else(|| ResolutionError::KeyNotFound {
            path: path.to_string(),
            key: key.to_string(),
        })
}

/// A backend paired with the default time budget for each read.
#[derive(Debug, Clone)]
pub struct SecretResolver<B> {
    backend: B,
    timeout: Duration,
}

impl SecretResolver<VaultClient> {
    /// Use the client's configured request timeout as the default budget.
    pub fn from_client(client: VaultClient) -> Self {
        let timeout = client.config().request_timeout;
        Self::new(client, timeout)
    }
}

impl<B: SecretBackend> SecretResolver<B> {
    pub fn new(backend: B, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn resolve(&self, reference: &SecretReference) -> Result<SecretValue, ResolutionError> {
        resolve_field(&self.backend, reference, self.timeout).await
    }

    pub async fn resolve_with_timeout(
        &self,
        reference: &SecretReference,
        timeout: Duration,
    ) -> Result<SecretValue, ResolutionError> {
        resolve_field(&self.backend, reference, timeout).await
    }

    /// Like [`resolve`](Self::resolve), but gives up as soon as `cancel` fires.
    pub async fn resolve_with_cancel(
        &self,
        reference: &SecretReference,
        cancel: &CancellationToken,
    ) -> Result<SecretValue, ResolutionError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ResolutionError::Cancelled {
                path: reference.normalized_path().to_string(),
            }),
            result = self.resolve(reference) => result,
        }
    }

    /// Parse a `path:key[@version]` reference and resolve it.
    pub async fn resolve_str(&self, reference: &str) -> Result<SecretValue, Error> {
        let reference: SecretReference = reference.parse()?;
        Ok(self.resolve(&reference).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FetchError;
    use crate::error::BackendErrorKind;
    use crate::models::KvVersion;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct StaticBackend {
        documents: HashMap<String, HashMap<String, serde_json::Value>>,
        delay: Option<Duration>,
        calls: AtomicUsize,
        dropped: Arc<AtomicBool>,
        completed: Arc<AtomicBool>,
    }

    impl StaticBackend {
        fn with_document(mut self, path: &str, data: serde_json::Value) -> Self {
            let map = serde_json::from_value(data).unwrap();
            self.documents.insert(path.to_string(), map);
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl SecretBackend for StaticBackend {
        async fn fetch_document(&self, path: &str, _version: Option<u64>) -> Result<KvData, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _guard = DropFlag(Arc::clone(&self.dropped));

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.completed.store(true, Ordering::SeqCst);

            let data = self.documents.get(path).cloned().ok_or_else(|| FetchError::Status {
                status: 404,
                body: String::new(),
            })?;

            Ok(KvData {
                data,
                metadata: KvVersion {
                    version: 1,
                    created_time: "2024-01-01T00:00:00Z".parse().ok(),
                    deletion_time: None,
                    destroyed: false,
                },
            })
        }

        fn name(&self) -> &'static str {
            "static"
        }
    }

    fn backend() -> StaticBackend {
        StaticBackend::default().with_document("test/secret", serde_json::json!({"tagada": "42", "port": 8200}))
    }

    #[tokio::test]
    async fn test_resolve_existing_key() {
        let resolver = SecretResolver::new(backend(), Duration::from_secs(10));
        let value = resolver
            .resolve(&SecretReference::new("test/secret", "tagada"))
            .await
            .unwrap();
        assert_eq!(value.as_json(), &serde_json::json!("42"));
    }

    #[tokio::test]
    async fn test_values_are_not_coerced() {
        let resolver = SecretResolver::new(backend(), Duration::from_secs(10));
        let value = resolver.resolve_str("test/secret:port").await.unwrap();
        assert_eq!(value.into_inner(), serde_json::json!(8200));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let resolver = SecretResolver::new(backend(), Duration::from_secs(10));
        let err = resolver
            .resolve(&SecretReference::new("test/secret", "missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::KeyNotFound { ref key, .. } if key == "missing"));
    }

    #[tokio::test]
    async fn test_missing_path() {
        let resolver = SecretResolver::new(backend(), Duration::from_secs(10));
        let err = resolver
            .resolve(&SecretReference::new("nope", "tagada"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(BackendErrorKind::NotFound));
        assert_eq!(err.kind().map(|k| k.as_str()), Some("not_found"));
    }

    #[tokio::test]
    async fn test_repeated_reads_are_equal() {
        let resolver = SecretResolver::new(backend(), Duration::from_secs(10));
        let reference = SecretReference::new("/test/secret/", "tagada");
        let first = resolver.resolve(&reference).await.unwrap();
        let second = resolver.resolve(&reference).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(resolver.backend().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_aborts_slow_read() {
        let resolver = SecretResolver::new(backend().with_delay(Duration::from_secs(30)), Duration::from_secs(10));

        let err = resolver
            .resolve(&SecretReference::new("test/secret", "tagada"))
            .await
            .unwrap_err();

        assert!(matches!(err, ResolutionError::Timeout { after, .. } if after == Duration::from_secs(10)));
        assert!(resolver.backend().dropped.load(Ordering::SeqCst));
        assert!(!resolver.backend().completed.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_call_timeout_overrides_default() {
        let resolver = SecretResolver::new(backend().with_delay(Duration::from_secs(5)), Duration::from_secs(1));
        let value = resolver
            .resolve_with_timeout(&SecretReference::new("test/secret", "tagada"), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(value.render(), "42");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_budget_still_resolves() {
        let resolver = SecretResolver::new(backend().with_delay(Duration::from_secs(5)), Duration::MAX);
        let value = resolver
            .resolve(&SecretReference::new("test/secret", "tagada"))
            .await
            .unwrap();
        assert_eq!(value.render(), "42");

        let huge = Duration::from_secs(u64::MAX);
        let value = resolver
            .resolve_with_timeout(&SecretReference::new("test/secret", "port"), huge)
            .await
            .unwrap();
        assert_eq!(value.render(), "8200");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_aborts_read() {
        let resolver = SecretResolver::new(backend().with_delay(Duration::from_secs(5)), Duration::from_secs(10));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let err = resolver
            .resolve_with_cancel(&SecretReference::new("test/secret", "tagada"), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, ResolutionError::Cancelled { ref path } if path == "test/secret"));
        assert!(!resolver.backend().completed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_invalid_reference_string() {
        let resolver = SecretResolver::new(backend(), Duration::from_secs(10));
        let err = resolver.resolve_str("no-key").await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_shared_backend() {
        let shared = Arc::new(backend());
        let a = SecretResolver::new(Arc::clone(&shared), Duration::from_secs(10));
        let b = SecretResolver::new(Arc::clone(&shared), Duration::from_secs(10));

        let reference = SecretReference::new("test/secret", "tagada");
        let (x, y) = tokio::join!(a.resolve(&reference), b.resolve(&reference));
        assert_eq!(x.unwrap(), y.unwrap());
        assert_eq!(shared.calls.load(Ordering::SeqCst), 2);
    }
}
