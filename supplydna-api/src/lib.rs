//! # SupplyDNA Upload Proxy
//!
//! Pins metadata documents on Pinata on behalf of browsers and CLIs, so the
//! Pinata credentials never leave the server.
//!
//! ## Endpoints
//!
//! - `POST /api/pinata-upload` - Pin a JSON document, returns `{"IpfsHash": "..."}`
//! - `POST /upload` - Same, at the path used by local development setups
//! - `GET /health` - Liveness and whether Pinata credentials are configured
//!
//! ## Example
//!
//! ```rust,ignore
//! use supplydna_api::{ApiServer, ApiConfig};
//!
//! let server = ApiServer::new(ApiConfig::from_env())?;
//! server.run(([0, 0, 0, 0], 5001)).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod dto;
mod error;
mod handlers;
mod routes;
mod state;

pub use dto::{HealthResponse, UploadResponse};
pub use error::ApiError;
pub use routes::create_router;
pub use state::{ApiConfig, AppState};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use supplydna_core::error::Result;

/// Upload proxy server.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Creates a new server with the given configuration.
    pub fn new(config: ApiConfig) -> Result<Self> {
        if !config.has_pinata_credentials() {
            warn!("PINATA_API_KEY / PINATA_SECRET_API_KEY not set; uploads will fail");
        }

        Ok(Self {
            state: Arc::new(AppState::new(config)?),
        })
    }

    /// Port this server was configured for.
    pub fn port(&self) -> u16 {
        self.state.config.port
    }

    /// Creates the router with CORS, body limit and tracing layers.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        create_router(self.state.clone())
            .layer(DefaultBodyLimit::max(self.state.config.body_limit_bytes))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server on the given address until Ctrl-C.
    pub async fn run(self, addr: impl Into<SocketAddr>) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("SupplyDNA upload proxy listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down upload proxy");
    }
}

/// Starts the proxy on all interfaces, at the port configured by `PORT`.
pub async fn start_server() -> std::io::Result<()> {
    let config = ApiConfig::from_env();
    let server = ApiServer::new(config).map_err(std::io::Error::other)?;
    let port = server.port();
    server.run(([0, 0, 0, 0], port)).await
}
