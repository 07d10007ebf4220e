//! Seeds the configured database with demo users, cards and contact info.

use anyhow::Context;
use bingo_server::{populate, AppState, Settings};
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
    let state = AppState::new(settings).await.context("connecting to storage")?;

    let report = populate::populate(state.store.as_ref(), &state.auth_service)
        .await
        .context("seeding demo data")?;
    info!(
        "Populated {} users ({} already present), {} cards, {} contacts",
        report.users_created, report.users_skipped, report.cards_created, report.contacts_created
    );

    state.shutdown().await?;
    Ok(())
}
