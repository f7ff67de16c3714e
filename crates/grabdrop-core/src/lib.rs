//! # Grabdrop Core Library
//!
//! `grabdrop-core` turns a stream of classified hand readings into clipboard
//! transfers between devices on the local network: close your hand to grab
//! the clipboard, open it to throw the content to a discovered peer.
//!
//! ## Modules
//!
//! - [`gesture`] - Hand readings and the grab/hold/release state machine
//! - [`discovery`] - Live peer registry (fed by mDNS when the `mdns` feature is enabled)
//! - [`clipboard`] - Clipboard capture into transferable payloads
//! - [`dispatch`] - Reacts to gesture edges: capture, target selection, transfer tasks
//! - [`session`] - The frame loop wiring the pieces together
//! - [`transfer`] - Transfer transport contract and the HTTP implementation
//! - [`receiver`] - HTTP endpoint that accepts incoming transfers
//! - [`config`] - Configuration management
//!
//! ## Example
//!
//! ```rust,ignore
//! use grabdrop_core::dispatch::TransferDispatcher;
//! use grabdrop_core::discovery::DeviceRegistry;
//! use grabdrop_core::session::FrameLoop;
//!
//! let registry = DeviceRegistry::new();
//! let dispatcher = TransferDispatcher::new(registry.clone(), transport, settings, handle);
//! let frame_loop = FrameLoop::new(classifier, clipboard, dispatcher, &config);
//! frame_loop.run(&cancel)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod clipboard;
pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod gesture;
#[cfg(feature = "http")]
pub mod receiver;
pub mod session;
pub mod transfer;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version advertised in the discovery TXT record
pub const SERVICE_VERSION: &str = "1.0";

/// Default receiver port (TCP)
pub const DEFAULT_PORT: u16 = 5000;

/// Default time a fist must be held before it counts as a grab, in milliseconds
pub const DEFAULT_HOLD_THRESHOLD_MS: u64 = 500;

/// Default frame width in pixels
pub const DEFAULT_FRAME_WIDTH: u32 = 640;

/// Default frame height in pixels
pub const DEFAULT_FRAME_HEIGHT: u32 = 480;

/// Default distance from the right frame edge that selects a peer, in pixels
pub const DEFAULT_EDGE_MARGIN: u32 = 200;

/// Default reachability check timeout in seconds
pub const DEFAULT_PING_TIMEOUT_SECS: u64 = 5;

/// Default transfer timeout in seconds
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 30;

/// Default maximum accepted upload size (500 MiB)
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 500 * 1024 * 1024;
