mod app;

use std::{
    fs::{self, OpenOptions},
    sync::Arc,
};

use anyhow::Result;
use boxoffice_core::{
    account::{ResetMailer, SimulatedMailer},
    booking::{Settlement, SimulatedGateway},
    catalog::{self, Catalog},
    config::{self, AppConfig},
};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    catalog::ensure_default_catalog(&config.catalog_path)?;
    let catalog = Catalog::new(config.catalog_path.clone());

    let (settlement, mailer): (Arc<dyn Settlement>, Arc<dyn ResetMailer>) =
        if config.decline_payments {
            info!(reason = %config.decline_reason, "Simulated gateway set to decline");
            (
                Arc::new(SimulatedGateway::declining(
                    config.settlement_delay(),
                    config.decline_reason.clone(),
                )),
                Arc::new(SimulatedMailer::failing(
                    config.settlement_delay(),
                    config.decline_reason.clone(),
                )),
            )
        } else {
            (
                Arc::new(SimulatedGateway::approving(config.settlement_delay())),
                Arc::new(SimulatedMailer::delivering(config.settlement_delay())),
            )
        };

    let mut app = app::BoxOfficeApp::new(catalog, &config, settlement, mailer);
    app.run().await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("boxoffice.log");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
