use std::collections::HashMap;
use std::env::VarError;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const ADDRESS_KEY: &str = "ENDPOINT_ADDRESS";
pub const TOKEN_KEY: &str = "AUTH_TOKEN";
pub const TIMEOUT_KEY: &str = "REQUEST_TIMEOUT";
pub const MOUNT_KEY: &str = "SECRET_MOUNT";

const ADDRESS_FALLBACK_KEY: &str = "VAULT_ADDR";
const TOKEN_FALLBACK_KEY: &str = "VAULT_TOKEN";

/// Every variable `load` looks at.
const KNOWN_KEYS: [&str; 6] = [
    ADDRESS_KEY,
    ADDRESS_FALLBACK_KEY,
    TOKEN_KEY,
    TOKEN_FALLBACK_KEY,
    TIMEOUT_KEY,
    MOUNT_KEY,
];

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MOUNT: &str = "secret";

/// Where transport settings are read from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Process environment
    Env,
    /// A dotenv file; variables already set in the process environment win
    DotEnv(PathBuf),
    /// Explicit key/value pairs
    Map(HashMap<String, String>),
}

impl ConfigSource {
    fn read(&self) -> Result<HashMap<String, String>, ConfigError> {
        match self {
            Self::Env => {
                let mut vars = HashMap::new();
                overlay_process_env(&mut vars)?;
                Ok(vars)
            }
            Self::DotEnv(path) => {
                let env_file_error = |message: String| ConfigError::EnvFile {
                    path: path.clone(),
                    message,
                };

                let mut vars = HashMap::new();
                for item in dotenvy::from_path_iter(path).map_err(|e| env_file_error(e.to_string()))? {
                    let (key, value) = item.map_err(|e| env_file_error(e.to_string()))?;
                    vars.insert(key, value);
                }
                overlay_process_env(&mut vars)?;
                Ok(vars)
            }
            Self::Map(vars) => Ok(vars.clone()),
        }
    }
}

/// Copy the known keys that are set in the process environment into `vars`.
///
/// Unrelated variables are never read, so a non-UTF-8 value elsewhere in the
/// environment is harmless.
fn overlay_process_env(vars: &mut HashMap<String, String>) -> Result<(), ConfigError> {
    for key in KNOWN_KEYS {
        if let Some(value) = env_value(key, std::env::var(key))? {
            vars.insert(key.to_string(), value);
        }
    }
    Ok(())
}

fn env_value(key: &str, value: Result<String, VarError>) -> Result<Option<String>, ConfigError> {
    match value {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::invalid(key, "value is not valid UTF-8")),
    }
}

/// Endpoint, credential and timing for one Vault server.
#[derive(Clone)]
pub struct TransportConfig {
    pub address: String,
    pub token: String,
    pub request_timeout: Duration,
    pub mount: String,
    pub application_name: Option<String>,
}

impl std::fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConfig")
            .field("address", &self.address)
            .field("token", &"[REDACTED]")
            .field("request_timeout", &self.request_timeout)
            .field("mount", &self.mount)
            .field("application_name", &self.application_name)
            .finish()
    }
}

impl TransportConfig {
    pub fn new(address: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            token: token.into(),
            request_timeout: DEFAULT_TIMEOUT,
            mount: DEFAULT_MOUNT.to_string(),
            application_name: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_mount(mut self, mount: impl Into<String>) -> Self {
        self.mount = mount.into();
        self
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Read the configuration once from `source`.
    pub fn load(source: &ConfigSource) -> Result<Self, ConfigError> {
        let vars = source.read()?;

        let address = lookup(&vars, ADDRESS_KEY, Some(ADDRESS_FALLBACK_KEY))
            .ok_or_else(|| ConfigError::missing(ADDRESS_KEY))?;
        let token = lookup(&vars, TOKEN_KEY, Some(TOKEN_FALLBACK_KEY))
            .ok_or_else(|| ConfigError::missing(TOKEN_KEY))?;

        let request_timeout = match lookup(&vars, TIMEOUT_KEY, None) {
            Some(raw) => parse_duration(&raw).map_err(|reason| ConfigError::invalid(TIMEOUT_KEY, reason))?,
            None => DEFAULT_TIMEOUT,
        };

        let mount = lookup(&vars, MOUNT_KEY, None).unwrap_or_else(|| DEFAULT_MOUNT.to_string());

        let config = Self {
            address,
            token,
            request_timeout,
            mount,
            application_name: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants that `load` enforces, for configs built by hand.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::missing(ADDRESS_KEY));
        }
        if self.token.trim().is_empty() {
            return Err(ConfigError::missing(TOKEN_KEY));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::invalid(TIMEOUT_KEY, "timeout must be greater than zero"));
        }
        if self.mount.trim_matches('/').is_empty() {
            return Err(ConfigError::invalid(MOUNT_KEY, "mount must not be empty"));
        }
        Ok(())
    }
}

/// Non-empty value of `key`, or of `fallback` when `key` is absent or blank.
fn lookup(vars: &HashMap<String, String>, key: &str, fallback: Option<&str>) -> Option<String> {
    let non_empty = |name: &str| {
        vars.get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    non_empty(key).or_else(|| fallback.and_then(non_empty))
}

/// Parse `"10"`, `"10s"`, `"500ms"` or `"2m"`.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let (digits, unit) = if let Some(d) = raw.strip_suffix("ms") {
        (d, "ms")
    } else if let Some(d) = raw.strip_suffix('s') {
        (d, "s")
    } else if let Some(d) = raw.strip_suffix('m') {
        (d, "m")
    } else {
        (raw, "s")
    };

    let amount: u64 = digits
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a duration (expected e.g. 10, 10s, 500ms, 2m)"))?;

    let duration = match unit {
        "ms" => Duration::from_millis(amount),
        "m" => Duration::from_secs(
            amount
                .checked_mul(60)
                .ok_or_else(|| format!("'{raw}' is too large"))?,
        ),
        _ => Duration::from_secs(amount),
    };

    if duration.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }
    Ok(duration)
}
