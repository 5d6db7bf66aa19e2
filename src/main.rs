//! OCR PDF Server
//!
//! Serves `POST /ocr-pdf`: upload a PDF, get back its OCR text.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ocr_pdf_server::config::Config;
use ocr_pdf_server::routes;
use ocr_pdf_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before the filter reads RUST_LOG
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "ocr_pdf_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Invalid configuration")?;

    tracing::info!("Starting OCR PDF Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("OCR provider: {}", config.ocr.provider.as_str());
    tracing::info!("Rasterizer: {}", config.rasterizer.pdftoppm_path);
    tracing::info!("Page order: {:?}", config.pipeline.page_ordering);
    if config.auth.enabled {
        if config.auth.api_key.is_none() {
            tracing::warn!("AUTH_ENABLED is set but API_KEY is not; every request will be rejected");
        } else {
            tracing::info!("API key authentication enabled");
        }
    } else {
        tracing::warn!("API key authentication disabled");
    }

    let app_state = AppState::new(config.clone()).context("Failed to initialize application state")?;

    if !app_state.pipeline().ocr().is_available().await {
        tracing::warn!(
            "OCR provider {} is not reachable; requests will fail until it is",
            config.ocr.provider.as_str()
        );
    }

    let app = routes::app(app_state);

    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid SERVER_HOST '{}'", config.server.host))?;
    let addr = SocketAddr::from((host, config.server.port));
    tracing::info!("OCR PDF Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
