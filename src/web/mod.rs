//! Web layer
//!
//! Republishes the generated guide over HTTP. The server only reads the
//! guide file; rebuilding it is left to the refresh scheduler.

use anyhow::Result;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;

pub mod handlers;

pub const GUIDE_ROUTE: &str = "/xmlguide.xmltv";

/// Web server configuration and setup
pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new<P: Into<PathBuf>>(config: &Config, guide_path: P) -> Result<Self> {
        let app = Self::router(AppState::new(guide_path));
        let addr: SocketAddr = format!("{}:{}", config.web.host, config.web.port).parse()?;
        Ok(Self { app, addr })
    }

    /// Routes and middleware
    pub fn router(state: AppState) -> Router {
        Router::new()
            .route(GUIDE_ROUTE, get(handlers::serve_guide))
            .route("/health", get(handlers::health_check))
            .fallback(handlers::not_found)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Start the web server
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

/// State shared by the handlers
#[derive(Clone)]
pub struct AppState {
    pub guide_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new<P: Into<PathBuf>>(guide_path: P) -> Self {
        Self {
            guide_path: Arc::new(guide_path.into()),
        }
    }
}
