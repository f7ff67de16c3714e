//! Clipboard capture for Grabdrop.
//!
//! When a grab completes, the dispatcher asks a [`ClipboardBridge`] for the
//! current clipboard content. The bridge turns it into a [`CapturedPayload`]
//! that points at a file the transport can send:
//!
//! - images are staged as PNG files
//! - text that names an existing path is sent as that file
//! - any other text is staged as a `.txt` file
//!
//! Staged files live in a dedicated directory and are swept by
//! [`cleanup_staged_files`].

mod native;

pub use native::NativeClipboardBridge;

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Prefix of every file staged by a bridge.
pub const STAGED_FILE_PREFIX: &str = "clipboard_";

/// What kind of content was grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    /// Plain text, staged to a file
    Text,
    /// An existing file referenced by the clipboard
    File,
    /// An image, staged as PNG
    Image,
}

impl std::fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::File => write!(f, "file"),
            Self::Image => write!(f, "image"),
        }
    }
}

/// Content grabbed from the clipboard, ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPayload {
    /// Content kind
    pub kind: PayloadKind,
    /// Path of the file to send
    pub locator: String,
    /// When the content was captured
    pub captured_at: DateTime<Utc>,
}

impl CapturedPayload {
    /// Create a payload captured now.
    #[must_use]
    pub fn new(kind: PayloadKind, locator: impl Into<String>) -> Self {
        Self {
            kind,
            locator: locator.into(),
            captured_at: Utc::now(),
        }
    }

    /// Locator as a path.
    #[must_use]
    pub fn path(&self) -> &Path {
        Path::new(&self.locator)
    }

    /// File name to present to the receiver.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path()
            .file_name()
            .map_or_else(|| "clipboard".to_string(), |n| n.to_string_lossy().to_string())
    }
}

/// Source of clipboard payloads.
///
/// Called synchronously from the frame loop, so implementations must return
/// quickly. Calling it again without new clipboard content must not create
/// a new staged file.
pub trait ClipboardBridge: Send {
    /// Capture the current clipboard content.
    ///
    /// `Ok(None)` means there was nothing usable on the clipboard.
    fn capture(&mut self) -> Result<Option<CapturedPayload>>;
}

/// Remove staged files older than `max_age` from `dir`.
///
/// Only files named with [`STAGED_FILE_PREFIX`] are considered. Returns the
/// number of files removed; a missing directory removes nothing.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be listed.
pub fn cleanup_staged_files(dir: &Path, max_age: Duration) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut removed = 0;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !is_staged_file(&path) {
            continue;
        }

        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= max_age {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) => tracing::debug!(path = %path.display(), "Failed to remove staged file: {e}"),
        }
    }

    if removed > 0 {
        tracing::info!(removed, dir = %dir.display(), "Removed stale staged clipboard files");
    }
    Ok(removed)
}

fn is_staged_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(STAGED_FILE_PREFIX))
}

/// Build a staged file path for content with `hash`.
pub(crate) fn staged_path(dir: &Path, hash: u64, extension: &str) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    dir.join(format!("{STAGED_FILE_PREFIX}{stamp}_{hash:016x}.{extension}"))
}
