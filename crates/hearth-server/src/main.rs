mod seed;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{HeaderValue, Method, header::CONTENT_TYPE};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use hearth_api::config::Config;
use hearth_api::storage::Storage;
use hearth_api::{AppState, AppStateInner};
use hearth_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    let default_filter = if config.debug {
        "hearth=debug,hearth_api=debug,hearth_db=debug,tower_http=debug"
    } else {
        "hearth=info,hearth_api=info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    if config.uses_placeholder_secret() {
        warn!("HEARTH_SECRET_KEY is still the development placeholder");
    }

    let db = Database::open(&config.db_path)?;
    seed::bootstrap(&db, &config.seed_path)?;
    let storage = Storage::new(config.upload_dir.clone()).await?;

    let cors = cors_layer(&config.cors_origins)?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("HEARTH_HOST/HEARTH_PORT do not form a socket address")?;

    let state: AppState = Arc::new(AppStateInner {
        db,
        config,
        storage,
    });

    let app = hearth_api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    info!("Hearth listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Hearth stopped");
    Ok(())
}

/// `*` allows any origin without credentials; an explicit list allows the
/// session cookie to be sent cross-origin.
fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];

    if origins.iter().any(|o| o == "*") {
        return Ok(CorsLayer::new()
            .allow_origin(AllowOrigin::any())
            .allow_methods(methods)
            .allow_headers([CONTENT_TYPE]));
    }

    let list = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin {}", o)))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(list))
        .allow_methods(methods)
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Could not install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
