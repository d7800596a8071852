//! Static server for the browser front-end

use crate::error::AvatarError;
use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{info, warn};

/// Serves files under `root`, with `index` answering `/`
pub struct StaticServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl StaticServer {
    pub async fn start(host: &str, port: u16, root: impl Into<PathBuf>, index: &str) -> Result<Self, AvatarError> {
        let root = root.into();
        if !root.is_dir() {
            warn!("Static root {} does not exist", root.display());
        }

        let addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| AvatarError::Network(format!("Failed to bind to {}: {}", addr, e)))?;
        let local_addr = listener.local_addr()?;
        info!("Serving {} on http://{}", root.display(), local_addr);

        let app = site(&root, index);
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!("Static server error: {}", e);
            }
        });

        Ok(Self { addr: local_addr, handle })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

// ServeDir percent-decodes paths and refuses `..` components
fn site(root: &Path, index: &str) -> Router {
    Router::new()
        .route_service("/", ServeFile::new(root.join(index)))
        .fallback_service(ServeDir::new(root).append_index_html_on_directories(true))
}
