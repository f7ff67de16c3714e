//! HTTP receiver accepting transfers from other Grabdrop devices.
//!
//! ## Endpoints
//!
//! - `GET /ping` - liveness check, answers `{"status":"ok"}`
//! - `POST /upload` - multipart upload, field `file`
//! - `GET /download/{name}` - fetch a previously received file
//!
//! Uploaded files land in the upload directory under a sanitized name; an
//! existing file is never overwritten.

mod error;
pub mod handlers;

pub use error::{ApiError, ApiResult};

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::ReceiveConfig;
use crate::error::{Error, Result};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct ReceiverState {
    pub(crate) upload_dir: Arc<PathBuf>,
}

impl ReceiverState {
    /// State storing uploads in `upload_dir`.
    #[must_use]
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: Arc::new(upload_dir.into()),
        }
    }

    /// Directory uploads are written to.
    #[must_use]
    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }
}

/// Build the receiver router.
pub fn router(state: ReceiverState, max_upload_size: usize) -> Router {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/upload", post(handlers::upload))
        .route("/download/{name}", get(handlers::download))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A bound receiver, ready to serve.
#[derive(Debug)]
pub struct ReceiveServer {
    listener: TcpListener,
    state: ReceiverState,
    max_upload_size: usize,
}

impl ReceiveServer {
    /// Bind the receiver on `addr`. Port 0 picks a free port.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload directory cannot be created or the
    /// socket cannot be bound.
    pub async fn bind(addr: SocketAddr, config: &ReceiveConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.upload_dir).await?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| Error::BindFailed {
                addr,
                reason: e.to_string(),
            })?;

        tracing::info!(
            %addr,
            upload_dir = %config.upload_dir.display(),
            "Receiver bound"
        );

        Ok(Self {
            listener,
            state: ReceiverState::new(config.upload_dir.clone()),
            max_upload_size: config.max_upload_size,
        })
    }

    /// Address actually bound.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Directory uploads are written to.
    #[must_use]
    pub fn upload_dir(&self) -> &Path {
        self.state.upload_dir()
    }

    /// Serve until `shutdown` is cancelled.
    ///
    /// In-flight requests are allowed to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<()> {
        let app = router(self.state, self.max_upload_size);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
            .map_err(|e| Error::TransferFailed(format!("receiver stopped: {e}")))?;

        tracing::info!("Receiver stopped");
        Ok(())
    }
}
