use std::str::FromStr;

use crate::error::ConfigError;

/// One field inside one versioned secret document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReference {
    pub path: String,
    pub key: String,
    /// Specific KV version; latest when `None`
    pub version: Option<u64>,
}

impl SecretReference {
    pub fn new(path: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
            version: None,
        }
    }

    pub fn at_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Path with surrounding slashes removed, as sent to the backend.
    pub fn normalized_path(&self) -> &str {
        self.path.trim_matches('/')
    }
}

impl std::fmt::Display for SecretReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.path, self.key)?;
        if let Some(version) = self.version {
            write!(f, "@{version}")?;
        }
        Ok(())
    }
}

/// Parses `path:key` or `path:key@version`.
impl FromStr for SecretReference {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.splitn(2, ':').collect();
        if parts.len() != 2 {
            return Err(ConfigError::invalid_reference(s, "expected path:key"));
        }

        let path = parts[0].trim_matches('/');
        let (key, version) = match parts[1].rsplit_once('@') {
            Some((key, version)) => {
                let version = version
                    .parse::<u64>()
                    .map_err(|_| ConfigError::invalid_reference(s, "version must be a positive integer"))?;
                (key, Some(version))
            }
            None => (parts[1], None),
        };

        if path.is_empty() {
            return Err(ConfigError::invalid_reference(s, "path must not be empty"));
        }
        if key.is_empty() {
            return Err(ConfigError::invalid_reference(s, "key must not be empty"));
        }
        if version == Some(0) {
            return Err(ConfigError::invalid_reference(s, "version must be a positive integer"));
        }

        Ok(Self {
            path: path.to_string(),
            key: key.to_string(),
            version,
        })
    }
}
