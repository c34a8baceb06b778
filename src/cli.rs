use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use vault_client::{parse_duration, SecretReference};

pub const DEFAULT_PATH: &str = "test/secret";
pub const DEFAULT_KEY: &str = "tagada";
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Print one field of a Vault KV v2 secret.
#[derive(Debug, Parser)]
#[command(name = "vault-get", version)]
pub struct Cli {
    /// Secret path under the mount
    #[arg(default_value = DEFAULT_PATH, value_parser = parse_path)]
    pub path: String,

    /// Field to print
    #[arg(default_value = DEFAULT_KEY, value_parser = parse_key)]
    pub key: String,

    /// Dotenv file with ENDPOINT_ADDRESS / AUTH_TOKEN (missing default file is ignored)
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// KV v2 mount name
    #[arg(long)]
    pub mount: Option<String>,

    /// Per-read timeout, e.g. 10, 10s, 500ms
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Read this secret version instead of the latest
    #[arg(long = "secret-version", value_parser = clap::value_parser!(u64).range(1..))]
    pub secret_version: Option<u64>,
}

impl Cli {
    pub fn reference(&self) -> SecretReference {
        let reference = SecretReference::new(self.path.clone(), self.key.clone());
        match self.secret_version {
            Some(version) => reference.at_version(version),
            None => reference,
        }
    }

    /// The dotenv file to read, and whether its absence is an error.
    pub fn env_file(&self) -> (PathBuf, bool) {
        match &self.env_file {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_ENV_FILE), false),
        }
    }
}

fn parse_path(raw: &str) -> Result<String, String> {
    let path = raw.trim_matches('/');
    if path.is_empty() {
        return Err("path must name a secret under the mount".to_string());
    }
    Ok(path.to_string())
}

fn parse_key(raw: &str) -> Result<String, String> {
    if raw.is_empty() {
        return Err("key must not be empty".to_string());
    }
    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_read_fixed_pair() {
        let cli = Cli::try_parse_from(["vault-get"]).unwrap();
        assert_eq!(cli.reference(), SecretReference::new("test/secret", "tagada"));
        assert_eq!(cli.env_file(), (PathBuf::from(".env"), false));
    }

    #[test]
    fn test_explicit_arguments() {
        let cli = Cli::try_parse_from([
            "vault-get",
            "db/creds",
            "password",
            "--env-file",
            "prod.env",
            "--mount",
            "kv",
            "--timeout",
            "500ms",
            "--secret-version",
            "3",
        ])
        .unwrap();

        assert_eq!(cli.reference(), SecretReference::new("db/creds", "password").at_version(3));
        assert_eq!(cli.env_file(), (PathBuf::from("prod.env"), true));
        assert_eq!(cli.mount.as_deref(), Some("kv"));
        assert_eq!(cli.timeout, Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_rejects_bad_timeout_and_version() {
        assert!(Cli::try_parse_from(["vault-get", "--timeout", "soon"]).is_err());
        assert!(Cli::try_parse_from(["vault-get", "--secret-version", "0"]).is_err());
    }

    #[test]
    fn test_rejects_empty_path_and_key() {
        for args in [
            ["vault-get", "", "tagada"],
            ["vault-get", "/", "tagada"],
            ["vault-get", "///", "tagada"],
            ["vault-get", "test/secret", ""],
        ] {
            let err = Cli::try_parse_from(args).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation, "{args:?}");
        }
    }

    #[test]
    fn test_path_slashes_are_trimmed() {
        let cli = Cli::try_parse_from(["vault-get", "/db/creds/", "password"]).unwrap();
        assert_eq!(cli.reference(), SecretReference::new("db/creds", "password"));
    }
}
