use clap::Parser;
use metrics_exporter_statsd::StatsdBuilder;
use registration::api::RegistrationState;
use std::path::PathBuf;
use std::sync::Arc;
use store::{DocumentStore, NotionStore};
use tracing_subscriber::EnvFilter;
use webhook::api::WebhookState;

mod config;

use config::Config;

#[derive(Parser)]
#[command(
    name = "enrolld",
    about = "Cohort registration and payment webhook service"
)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(long, short)]
    config: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum ServeError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("could not install metrics recorder: {0}")]
    Metrics(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn main() -> Result<(), ServeError> {
    let cli = Cli::parse();
    let config = Config::from_file(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Keep the guard alive for the lifetime of the process.
    let _sentry_guard = config.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.clone(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    if let Some(metrics_config) = &config.metrics {
        let recorder = StatsdBuilder::from(&metrics_config.statsd_host, metrics_config.statsd_port)
            .build(Some("enroll"))
            .map_err(|e| ServeError::Metrics(e.to_string()))?;
        metrics::set_global_recorder(recorder).map_err(|e| ServeError::Metrics(e.to_string()))?;
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(serve(config))
}

async fn serve(config: Config) -> Result<(), ServeError> {
    let store: Arc<dyn DocumentStore> = Arc::new(NotionStore::new(config.store.clone()));

    let app = registration::api::router(RegistrationState {
        store: store.clone(),
        capacity: config.capacity,
    })
    .merge(webhook::api::router(WebhookState { store }));

    let addr = format!("{}:{}", config.listener.host, config.listener.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, capacity = config.capacity, "enrolld listening");
    axum::serve(listener, app).await?;

    Ok(())
}
