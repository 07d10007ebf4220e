//! Provisions secrets, `.env` and the database schema. Idempotent.

use anyhow::Context;
use bingo_server::{install, Settings};
use dotenv::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let settings = Settings::new().context("loading settings")?;
    let report = install::run(&settings).await.context("installation failed")?;

    let created = report.secrets.iter().filter(|s| s.created).count();
    info!(
        "Install complete: {} secret files ({} new), migrations {}",
        report.secrets.len(),
        created,
        if report.migrated { "applied" } else { "skipped" }
    );
    Ok(())
}
