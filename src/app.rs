use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::fetcher::SourceFetcher;
use crate::outcomes::{CategoryCache, CategoryFetcher};
use crate::scheduler;
use crate::services::IngestService;

/// Application with the HTTP server and its background tasks
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
    /// Present only when `CATEGORIES_URL` is configured
    pub category_scheduler_handle: Option<JoinHandle<()>>,
}

impl Application {
    /// Build and initialize the application
    ///
    /// This creates the fetcher, ingest service and category cache, and spawns:
    /// - HTTP API server (Axum)
    /// - Category refresh scheduler (if a categories endpoint is configured)
    pub async fn build(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        let fetcher = SourceFetcher::with_options(config.fetch_timeout(), config.fetch_max_redirects);
        let ingest_service = IngestService::new(fetcher, config.source_cookie.clone());
        let category_cache = CategoryCache::new();

        let category_scheduler_handle = match config.categories_url.clone() {
            Some(url) => {
                let category_fetcher = CategoryFetcher::with_timeout(url, config.fetch_timeout());
                let cache_clone = category_cache.clone();
                let interval = config.category_refresh_minutes;

                Some(tokio::spawn(async move {
                    scheduler::start_category_refresh_scheduler(
                        category_fetcher,
                        cache_clone,
                        interval,
                    )
                    .await;
                }))
            }
            None => {
                warn!("CATEGORIES_URL not set; every outcome will classify as offen");
                None
            }
        };

        let app_state = AppState {
            ingest_service,
            category_cache,
        };
        let app = create_router(app_state).layer(TraceLayer::new_for_http());

        let addr = config.server_addr();
        info!("Starting HTTP server on {}", addr);

        let server_handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await
        });

        info!("Application initialized successfully");

        Ok(Self {
            server_handle,
            category_scheduler_handle,
        })
    }

    /// Run until the server stops; the refresh scheduler runs in the background
    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        self.server_handle.await??;
        Ok(())
    }
}
