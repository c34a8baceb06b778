#![warn(rust_2018_idioms)]

use std::process::ExitCode;

use clap::Parser;

use vault_client::{
    CancellationToken, ConfigError, ConfigSource, SecretResolver, SecretValue, TransportConfig,
    VaultClient,
};

mod cli;
mod logging;

use cli::Cli;

type Result<T> = std::result::Result<T, vault_client::Error>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match logging::init_logger() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        }
    };

    match run(&cli).await {
        Ok(value) => {
            println!("{}", value.render());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::debug!(retryable = e.is_retryable(), "Secret resolution failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<SecretValue> {
    let config = load_config(cli)?;
    let resolver = SecretResolver::from_client(VaultClient::new(config)?);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    Ok(resolver.resolve_with_cancel(&cli.reference(), &cancel).await?)
}

fn load_config(cli: &Cli) -> std::result::Result<TransportConfig, ConfigError> {
    let (env_file, required) = cli.env_file();
    let source = if required || env_file.is_file() {
        ConfigSource::DotEnv(env_file)
    } else {
        ConfigSource::Env
    };

    let mut config = TransportConfig::load(&source)?
        .with_application_name(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));

    if let Some(mount) = &cli.mount {
        config = config.with_mount(mount.clone());
    }
    if let Some(timeout) = cli.timeout {
        config = config.with_timeout(timeout);
    }

    config.validate()?;
    Ok(config)
}
