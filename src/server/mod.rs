pub mod handlers;
pub mod state;

use crate::config::Config;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::PrometheusBuilder;
use state::{AppState, FEED_PAGE_KEY};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

/// Build the full router over a fresh [`AppState`].
///
/// Split from [`start`] so tests can drive the router without binding a
/// listener or installing the metrics recorder.
pub async fn build_router(config: Config) -> Router {
    router(AppState::new(config))
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::feed::serve_home))
        .route("/health", get(handlers::health::health_check))
        .route("/feeds/{codename}", get(handlers::feed::serve_channel))
        .route("/favicon.ico", get(handlers::assets::serve_favicon))
        .route("/static/{*path}", get(handlers::assets::serve_asset))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Axum HTTP server
pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);
    let refresh = Duration::from_secs(config.feed_refresh_secs.max(1));

    let state = AppState::new(config);
    spawn_feed_refresh(state.cache.clone(), refresh);

    let metrics_handle = PrometheusBuilder::new().install_recorder()?;
    let app = router(state).route(
        "/metrics",
        get(move || {
            let handle = metrics_handle.clone();
            async move { handle.render() }
        }),
    );

    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("Server listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}

/// Revalidate the merged feed page on a fixed interval so feeds keep
/// refreshing even with no traffic. The first tick fires immediately and
/// warms the page at startup.
fn spawn_feed_refresh(cache: crate::cache::ContentCache, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            if let Some(entry) = cache.lookup(FEED_PAGE_KEY) {
                if !entry.revalidate() {
                    debug!("refreshing merged feed page");
                }
            }
        }
    });
}
