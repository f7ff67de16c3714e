//! HTTP transport talking to a Grabdrop [receiver](crate::receiver).

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use tokio_util::io::ReaderStream;

use super::{TransferOutcome, TransferTransport};
use crate::clipboard::CapturedPayload;

/// Multipart field carrying the payload.
pub const UPLOAD_FIELD: &str = "file";

/// [`TransferTransport`] over plain HTTP.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a fresh connection pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Build the upload form, streaming the file from disk.
    async fn build_form(payload: &CapturedPayload) -> Result<Form, String> {
        let read_error = |e: std::io::Error| format!("failed to read {}: {e}", payload.locator);
        let file = tokio::fs::File::open(payload.path()).await.map_err(read_error)?;
        let len = file.metadata().await.map_err(read_error)?.len();
        let mime = mime_guess::from_path(payload.path()).first_or_octet_stream();

        let body = Body::wrap_stream(ReaderStream::new(file));
        let part = Part::stream_with_length(body, len)
            .file_name(payload.file_name())
            .mime_str(mime.essence_str())
            .map_err(|e| format!("invalid content type {mime}: {e}"))?;
        Ok(Form::new().part(UPLOAD_FIELD, part))
    }
}

impl TransferTransport for HttpTransport {
    async fn ping(&self, addr: SocketAddr, timeout: Duration) -> bool {
        let url = format!("http://{addr}/ping");
        match self.client.get(&url).timeout(timeout).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(%addr, "Ping failed: {e}");
                false
            }
        }
    }

    async fn send(
        &self,
        payload: &CapturedPayload,
        addr: SocketAddr,
        timeout: Duration,
    ) -> TransferOutcome {
        let file_name = payload.file_name();
        if !payload.path().is_file() {
            return TransferOutcome::failure(format!("file not found: {}", payload.locator));
        }

        let form = match Self::build_form(payload).await {
            Ok(form) => form,
            Err(message) => return TransferOutcome::failure(message),
        };

        let url = format!("http://{addr}/upload");
        let response = self
            .client
            .post(&url)
            .timeout(timeout)
            .multipart(form)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                TransferOutcome::success(format!("sent {file_name} to {addr}"))
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                TransferOutcome::failure(format!(
                    "receiver at {addr} rejected {file_name} ({status}): {}",
                    body.trim()
                ))
            }
            Err(e) if e.is_timeout() => {
                TransferOutcome::failure(format!("timed out sending {file_name} to {addr}"))
            }
            Err(e) if e.is_connect() => {
                TransferOutcome::failure(format!("could not connect to {addr}"))
            }
            Err(e) => TransferOutcome::failure(format!("failed to send {file_name}: {e}")),
        }
    }
}
