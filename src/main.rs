use anyhow::{anyhow, Result};
use is_terminal::IsTerminal;
use pxecrab::boot_store::DynBootStore;
use pxecrab::{Config, SharedConfig};
use std::sync::Arc;
use tokio::signal;
use tokio::signal::unix::{signal as unix_signal, SignalKind};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut first_args = std::env::args().take(2);
    let (program_name, config_file) = (
        first_args.next().unwrap_or("pxecrab".to_string()),
        first_args.next(),
    );

    let config = config_init(&program_name, config_file)?;
    let boot_store = config.boot_store().await?;
    match &config.store_path {
        Some(path) => tracing::info!("serving boot data from {path}"),
        None => tracing::warn!("no store_path configured, serving an empty catalog"),
    }

    let reload_handle = tokio::spawn(reload_on_hangup(boot_store.clone()));

    tracing::info!("API listening on {}", &config.api_bind_addr);
    let api_server = pxecrab::api::new(config.clone(), boot_store.clone());
    let api_handle = tokio::spawn(api_server);

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        Ok(reload_res) = reload_handle => {
            if let Err(err) = reload_res {
                return Err(err);
            }
        }
        Ok(api_res) = api_handle => {
            if let Err(err) = api_res {
                return Err(err.into())
            }
        }
    }
    tracing::info!("goodbye");
    Ok(())
}

fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(std::io::stdout().is_terminal()))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pxecrab=info".into()),
        )
        .init();
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<SharedConfig> {
    match config_file {
        None => Err(anyhow!("usage: {program_name} /path/to/config.json")),
        Some(config_file) => {
            tracing::debug!("loaded config from {config_file}");
            let config = Config::try_from_file(&config_file)?;
            Ok(Arc::new(config))
        }
    }
}

/// Re-read the boot data whenever the process receives `SIGHUP`.
async fn reload_on_hangup(boot_store: DynBootStore) -> Result<()> {
    let mut hangups = unix_signal(SignalKind::hangup())?;
    while hangups.recv().await.is_some() {
        match boot_store.write().await.reload().await {
            Ok(()) => tracing::info!("reloaded boot data"),
            Err(err) => tracing::warn!("keeping previous boot data, reload failed: {err}"),
        }
    }
    Ok(())
}
