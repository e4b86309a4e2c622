use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use vidtube_backend::{
    config::{LogFormat, Settings, DEFAULT_CONFIG_PATH},
    create_router,
    media::FlatFileMediaStore,
    storage::FlatFileCredentialStore,
    AppState,
};

/// Session and profile service for vidtube
#[derive(Parser, Debug)]
#[command(name = "vidtube-server", version, about)]
struct Args {
    /// TOML config file; missing files fall back to defaults
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Overrides `log.level`; `RUST_LOG` still wins over both
    #[arg(long)]
    log_level: Option<String>,

    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn apply(&self, settings: &mut Settings) {
        if let Some(host) = &self.host {
            settings.server.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(level) = &self.log_level {
            settings.log.level = level.clone();
        }
        if self.json_logs {
            settings.log.format = LogFormat::Json;
        }
    }
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log.level));
    let registry = tracing_subscriber::registry().with(filter);

    match settings.log.format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down gracefully..."),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully..."),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load_from(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    args.apply(&mut settings);
    settings.validate().context("invalid configuration")?;

    init_tracing(&settings);
    info!(config = %args.config.display(), "configuration loaded");

    let store = FlatFileCredentialStore::open(&settings.storage.path)
        .await
        .context("opening credential store")?;
    let media = FlatFileMediaStore::open(&settings.media.path, &settings.media.public_base_url)
        .await
        .context("opening media store")?;

    let state = Arc::new(
        AppState::new(Arc::new(store), Arc::new(media), &settings)
            .context("building application state")?,
    );
    let app = create_router(state);

    let addr = settings.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}
