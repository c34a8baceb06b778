use crate::backend::{FetchError, SecretBackend};
use crate::config::{ConfigSource, TransportConfig};
use crate::error::{ConnectionError, Error};
use crate::models::{KvData, KvVersion};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use std::collections::HashMap;
use url::Url;

const TOKEN_HEADER: &str = "x-vault-token";

/// Handle bound to one Vault server and one token.
///
/// Cheap to clone; clones share the connection pool. Nothing touches the
/// network until the first read.
#[derive(Debug, Clone)]
pub struct VaultClient {
    base_url: Url,
    http: reqwest::Client,
    config: TransportConfig,
}

impl VaultClient {
    pub fn new(config: TransportConfig) -> Result<Self, ConnectionError> {
        let base_url = parse_address(&config.address)?;

        let mut token = HeaderValue::from_str(config.token.trim())
            .map_err(|_| ConnectionError::InvalidToken)?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(TOKEN_HEADER, token);

        let user_agent = config
            .application_name
            .clone()
            .unwrap_or_else(|| format!("vault-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()
            .map_err(ConnectionError::HttpClient)?;

        Ok(Self {
            base_url,
            http,
            config,
        })
    }

    /// Load the configuration from the process environment and build a client.
    pub fn from_env() -> Result<Self, Error> {
        let config = TransportConfig::load(&ConfigSource::Env)?;
        Ok(Self::new(config)?)
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{address}/v1/{mount}/data/{path}[?version=N]`, each segment percent-encoded.
    fn document_url(&self, path: &str, version: Option<u64>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push("v1")
                .extend(self.config.mount.split('/').filter(|s| !s.is_empty()))
                .push("data")
                .extend(path.split('/').filter(|s| !s.is_empty()));
        }
        if let Some(version) = version {
            url.query_pairs_mut()
                .append_pair("version", &version.to_string());
        }
        url
    }

    pub async fn kv_read(&self, path: &str, version: Option<u64>) -> Result<KvData, FetchError> {
        let url = self.document_url(path, version);
        tracing::debug!(mount = %self.config.mount, path, ?version, "Reading secret document");

        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        #[derive(serde::Deserialize)]
        struct KvResponse {
            data: KvResponseData,
        }

        #[derive(serde::Deserialize)]
        struct KvResponseData {
            data: Option<HashMap<String, serde_json::Value>>,
            metadata: KvVersionResponse,
        }

        #[derive(serde::Deserialize)]
        struct KvVersionResponse {
            version: u64,
            #[serde(default)]
            created_time: Option<String>,
            #[serde(default)]
            deletion_time: Option<String>,
            #[serde(default)]
            destroyed: bool,
        }

        let resp: KvResponse = response.json().await?;
        let metadata = resp.data.metadata;
        let metadata = KvVersion {
            version: metadata.version,
            created_time: parse_timestamp(metadata.created_time),
            deletion_time: parse_timestamp(metadata.deletion_time),
            destroyed: metadata.destroyed,
        };

        match resp.data.data {
            Some(data) => Ok(KvData { data, metadata }),
            None => Err(FetchError::Deleted {
                version: metadata.version,
                deletion_time: metadata.deletion_time,
                destroyed: metadata.destroyed,
            }),
        }
    }
}

/// Vault sends `""` for unset timestamps; anything unparseable is treated as absent.
fn parse_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| s.parse().ok())
}

#[async_trait]
impl SecretBackend for VaultClient {
    async fn fetch_document(&self, path: &str, version: Option<u64>) -> Result<KvData, FetchError> {
        self.kv_read(path, version).await
    }

    fn name(&self) -> &'static str {
        "vault"
    }
}

fn parse_address(address: &str) -> Result<Url, ConnectionError> {
    let address = address.trim();
    let url = Url::parse(address)
        .map_err(|e| ConnectionError::invalid_address(address, e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConnectionError::invalid_address(
            address,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ConnectionError::invalid_address(address, "missing host"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(ConnectionError::invalid_address(
            address,
            "address must not contain a query or fragment",
        ));
    }

    Ok(url)
}
