use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use healthsync_events::{EmailConfig, EmailNotifier, Notifier};
use healthsync_pipeline::SourceRegistry;
use healthsync_providers::{FitbitSource, WithingsSource};
use healthsync_worker::SyncScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "healthsync_worker=debug,healthsync_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL is not set"))?;
    let pool = healthsync_db::connect(&database_url).await?;

    let sources = SourceRegistry::new()
        .register(std::sync::Arc::new(FitbitSource::new()))
        .register(std::sync::Arc::new(WithingsSource::new()));

    let notifier: Box<dyn Notifier> = match EmailConfig::from_env() {
        Some(config) => Box::new(EmailNotifier::new(config)),
        None => {
            tracing::warn!("SMTP not configured; threshold alerts will not be delivered");
            Box::new(healthsync_events::notifier::DisabledNotifier)
        }
    };

    let cancel = CancellationToken::new();
    let scheduler = SyncScheduler::new(pool, sources, notifier);
    let handle = tokio::spawn(scheduler.run(cancel.clone()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    cancel.cancel();
    handle.await?;

    Ok(())
}
