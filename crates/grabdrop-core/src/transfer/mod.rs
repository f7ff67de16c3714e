//! Outbound transfer contract.
//!
//! The dispatcher only needs two things from the network: "is this peer
//! alive" and "deliver this payload". [`TransferTransport`] is that seam; the
//! HTTP implementation lives in [`http`] behind the `http` feature.
//!
//! Transports never return errors. Every failure is folded into a
//! [`TransferOutcome`] with a human-readable message, because the caller
//! only ever reports it.

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpTransport;

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clipboard::CapturedPayload;

/// Result of a single send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    /// Whether the receiver accepted the payload
    pub ok: bool,
    /// Human-readable description
    pub message: String,
}

impl TransferOutcome {
    /// Successful outcome.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    /// Failed outcome.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Delivers payloads to peers.
///
/// Both operations must give up on their own once `timeout` elapses. Callers
/// may still wrap them in a timeout of their own.
pub trait TransferTransport: Send + Sync + 'static {
    /// Check that a receiver answers at `addr`.
    fn ping(&self, addr: SocketAddr, timeout: Duration) -> impl Future<Output = bool> + Send;

    /// Deliver `payload` to the receiver at `addr`.
    fn send(
        &self,
        payload: &CapturedPayload,
        addr: SocketAddr,
        timeout: Duration,
    ) -> impl Future<Output = TransferOutcome> + Send;
}
