use tracing::{info, instrument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use qm_ingest_service::app::Application;
use qm_ingest_service::config::Config;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,qm_ingest_service=debug")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true),
        )
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    info!("Starting QM ingest service with config: {:?}", config);

    let app = Application::build(config).await?;
    app.run_until_stopped().await
}
