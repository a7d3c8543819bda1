mod config;
mod error;
mod handlers;
mod models;
mod server;
mod services;

use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;

use config::{Config, Transport};
use handlers::ApiHandler;
use services::FoodAnalyzer;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables first so RUST_LOG from .env applies
    dotenv().ok();
    env_logger::init();

    log::info!("🚀 Starting FoodScan AI gateway...");

    let config = Config::from_env()?;

    let analyzer = Arc::new(FoodAnalyzer::from_config(&config)?);
    if analyzer.is_available() {
        log::info!("✅ Gemini service initialized with model: {}", config.gemini_model);
    } else if config.api_key_set() {
        log::warn!("⚠️ GEMINI_ENABLED is off, running in demo mode");
    } else {
        log::warn!("⚠️ GEMINI_API_KEY not set, running in demo mode (fallback results only)");
    }

    let handler = ApiHandler::new(analyzer);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    log::info!("🌐 Listening on http://{} ({:?} transport)", config.bind_addr, config.transport);

    let server = match config.transport {
        #[cfg(feature = "http-server")]
        Transport::Axum => {
            let app = server::http::create_router(handler, config.max_body_bytes);
            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app).await {
                    log::error!("❌ HTTP server stopped: {}", e);
                }
            })
        }
        #[cfg(not(feature = "http-server"))]
        Transport::Axum => {
            anyhow::bail!("TRANSPORT=axum requires the http-server feature; use TRANSPORT=raw")
        }
        Transport::Raw => {
            let max_body_bytes = config.max_body_bytes;
            tokio::spawn(async move {
                if let Err(e) = server::raw::serve(listener, handler, max_body_bytes).await {
                    log::error!("❌ Raw server stopped: {}", e);
                }
            })
        }
    };

    log::info!("🎉 Ready: POST /api/analyze, GET /api/health");

    tokio::signal::ctrl_c().await?;

    log::info!("🛑 Shutting down...");
    server.abort();

    Ok(())
}
