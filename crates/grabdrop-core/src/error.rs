//! Error types for Grabdrop.
//!
//! This module provides a unified error type for all Grabdrop operations,
//! with specific error variants for different failure modes.
//!
//! Most of the gesture pipeline never surfaces these errors to the user: a
//! missing frame resets the state machine and a failed transfer is reported
//! as a signal. They show up at the edges (configuration, discovery daemon,
//! receiver startup, clipboard access).

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// A specialized `Result` type for Grabdrop operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Grabdrop.
#[derive(Error, Debug)]
pub enum Error {
    /// Discovery daemon could not be started or used (E001)
    #[error("discovery unavailable: {0}")]
    DiscoveryUnavailable(String),

    /// Peer did not answer (E002)
    #[error("peer at {0} is unreachable")]
    PeerUnreachable(SocketAddr),

    /// Transfer failed (E003)
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// Receiver could not bind its listening socket (E004)
    #[error("cannot listen on {addr}: {reason}")]
    BindFailed {
        /// Address that was requested
        addr: SocketAddr,
        /// Reason for the failure
        reason: String,
    },

    /// Clipboard access failed (E005)
    #[error("clipboard error: {0}")]
    ClipboardError(String),

    /// A classifier produced a reading that could not be parsed
    #[error("invalid hand reading: {0}")]
    InvalidReading(String),

    /// File not found
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// Invalid path
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Configuration file error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Reason for invalidity
        reason: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("internal error: {0}")]
    Internal(String),

    /// Operation timeout
    #[error("operation timed out after {0} seconds")]
    Timeout(u64),
}

impl Error {
    /// Returns the error code associated with this error, if any.
    ///
    /// Error codes follow the pattern EXXX where XXX is a 3-digit number.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::DiscoveryUnavailable(_) => Some("E001"),
            Self::PeerUnreachable(_) => Some("E002"),
            Self::TransferFailed(_) => Some("E003"),
            Self::BindFailed { .. } => Some("E004"),
            Self::ClipboardError(_) => Some("E005"),
            _ => None,
        }
    }

    /// Returns whether this error is recoverable (can be retried).
    ///
    /// The gesture pipeline itself never retries; this is for callers such
    /// as the CLI that may offer to try again.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PeerUnreachable(_)
                | Self::TransferFailed(_)
                | Self::Timeout(_)
                | Self::ClipboardError(_)
        )
    }

    /// Returns a helpful suggestion for resolving the error, if applicable.
    #[must_use]
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::DiscoveryUnavailable(_) => Some(
                "Check that multicast traffic is allowed on this network\n\
                 and that no firewall blocks UDP port 5353.",
            ),
            Self::PeerUnreachable(_) => Some(
                "Make sure the other device is running 'grabdrop serve' or 'grabdrop run'\n\
                 and that both devices are on the same network.",
            ),
            Self::BindFailed { .. } => Some(
                "Another program may be using this port. Pick a different one:\n\
                   grabdrop serve --port 5001",
            ),
            Self::ClipboardError(_) => Some(
                "On Linux, make sure a display server (X11 or Wayland) is reachable\n\
                 from this session.",
            ),
            Self::ConfigError(_) | Self::InvalidConfig { .. } => Some(
                "Inspect the configuration with 'grabdrop config show'\n\
                 or recreate it with 'grabdrop config init --force'.",
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let addr: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        assert_eq!(Error::PeerUnreachable(addr).code(), Some("E002"));
        assert_eq!(Error::ClipboardError("x".into()).code(), Some("E005"));
        assert_eq!(Error::Internal("x".into()).code(), None);
    }

    #[test]
    fn test_recoverable() {
        assert!(Error::Timeout(30).is_recoverable());
        assert!(!Error::ConfigError("bad".into()).is_recoverable());
    }

    #[test]
    fn test_suggestion_present_for_bind_failure() {
        let err = Error::BindFailed {
            addr: "0.0.0.0:5000".parse().unwrap(),
            reason: "address in use".into(),
        };
        assert!(err.suggestion().is_some());
        assert!(err.to_string().contains("0.0.0.0:5000"));
    }
}
