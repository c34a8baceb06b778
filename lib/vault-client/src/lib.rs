//! vault-client - resolves single fields of HashiCorp Vault KV v2 secrets
//!
//! 1. `TransportConfig` is loaded once (env, dotenv file or explicit map)
//! 2. `VaultClient` binds the address and static token, lazily connecting
//! 3. `SecretResolver` reads one document per call, bounded by a deadline,
//!    and extracts the requested field
//!
//! Every failure comes back as a classified [`Error`]; nothing here retries,
//! caches or exits the process.

mod backend;
mod classify;
mod client;
mod config;
mod error;
mod models;
mod reference;
mod resolver;

pub use backend::{FetchError, SecretBackend};
pub use classify::{classify, kind_for_status};
pub use client::VaultClient;
pub use config::{ConfigSource, DEFAULT_MOUNT, DEFAULT_TIMEOUT, TransportConfig, parse_duration};
pub use error::{BackendErrorKind, ConfigError, ConnectionError, Error, ResolutionError, Result};
pub use models::{KvData, KvVersion, SecretValue};
pub use reference::SecretReference;
pub use resolver::{SecretResolver, resolve_field};

pub use tokio_util::sync::CancellationToken;
