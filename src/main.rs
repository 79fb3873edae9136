//! video-catalog: binary entrypoint.
//! Boots the Axum HTTP server and the background ingest loop that feeds it.

use shuttle_axum::ShuttleAxum;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use video_catalog::config::AppConfig;
use video_catalog::metrics::Metrics;

/// `RUST_LOG` filters; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("video_catalog=info,ingest=info,store=info,api=info,warn"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    // The Shuttle runtime may already have installed a subscriber.
    let _ = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::from_env()?;
    tracing::info!(config = ?cfg, "starting video-catalog");

    let service = video_catalog::build_service(&cfg).await?;

    // Driver checks this between cycles; Ctrl-C flips it.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    if let Some(driver) = service.driver {
        driver.spawn(shutdown_rx);
    }
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut router = video_catalog::router(service.state);
    match Metrics::init() {
        Ok(metrics) => router = router.merge(metrics.router()),
        Err(e) => tracing::warn!(error = ?e, "metrics disabled"),
    }

    Ok(router.into())
}
