//! System clipboard bridge backed by `arboard`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use arboard::Clipboard;
use image::ImageEncoder;
use xxhash_rust::xxh64::xxh64;

use super::{cleanup_staged_files, staged_path, CapturedPayload, ClipboardBridge, PayloadKind};
use crate::error::{Error, Result};

/// Raw clipboard content before staging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ClipboardContent {
    Text(String),
    /// PNG-encoded image
    Image(Vec<u8>),
}

impl ClipboardContent {
    fn hash(&self) -> u64 {
        match self {
            Self::Text(text) => xxh64(text.as_bytes(), 0),
            // Different seed so identical bytes never collide across kinds.
            Self::Image(png) => xxh64(png, 1),
        }
    }
}

/// Writes clipboard content to the staging directory.
///
/// Remembers the last staged content so an unchanged clipboard maps to the
/// same payload.
#[derive(Debug)]
pub(crate) struct Stager {
    dir: PathBuf,
    last: Option<(u64, CapturedPayload)>,
}

impl Stager {
    pub(crate) fn new(dir: PathBuf) -> Self {
        Self { dir, last: None }
    }

    pub(crate) fn stage(&mut self, content: &ClipboardContent) -> Result<CapturedPayload> {
        let hash = content.hash();
        if let Some((last_hash, payload)) = &self.last {
            if *last_hash == hash && payload.path().exists() {
                tracing::trace!(locator = %payload.locator, "Clipboard unchanged, reusing payload");
                return Ok(payload.clone());
            }
        }

        let payload = match content {
            ClipboardContent::Image(png) => {
                let path = self.write(hash, "png", png)?;
                CapturedPayload::new(PayloadKind::Image, path.to_string_lossy())
            }
            ClipboardContent::Text(text) => match existing_path(text) {
                Some(path) => CapturedPayload::new(PayloadKind::File, path.to_string_lossy()),
                None => {
                    let path = self.write(hash, "txt", text.as_bytes())?;
                    CapturedPayload::new(PayloadKind::Text, path.to_string_lossy())
                }
            },
        };

        tracing::debug!(kind = %payload.kind, locator = %payload.locator, "Clipboard captured");
        self.last = Some((hash, payload.clone()));
        Ok(payload)
    }

    fn write(&self, hash: u64, extension: &str, data: &[u8]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = staged_path(&self.dir, hash, extension);
        std::fs::write(&path, data)?;
        Ok(path)
    }
}

/// Clipboard text that names an existing file.
fn existing_path(text: &str) -> Option<PathBuf> {
    let candidate = text.trim();
    if candidate.is_empty() || candidate.contains('\n') {
        return None;
    }
    let path = Path::new(candidate);
    path.is_file().then(|| path.to_path_buf())
}

/// [`ClipboardBridge`] over the platform clipboard.
///
/// The platform handle is opened lazily on first capture, so constructing the
/// bridge never fails on a headless machine; the failure surfaces as a
/// capture error instead.
pub struct NativeClipboardBridge {
    clipboard: Option<Clipboard>,
    stager: Stager,
}

impl NativeClipboardBridge {
    /// Create a bridge staging into `staging_dir`.
    ///
    /// Staged files older than `max_staged_age` are removed first.
    #[must_use]
    pub fn new(staging_dir: PathBuf, max_staged_age: Duration) -> Self {
        if let Err(e) = cleanup_staged_files(&staging_dir, max_staged_age) {
            tracing::warn!(dir = %staging_dir.display(), "Failed to clean staging directory: {e}");
        }
        Self {
            clipboard: None,
            stager: Stager::new(staging_dir),
        }
    }

    fn clipboard(&mut self) -> Result<&mut Clipboard> {
        if self.clipboard.is_none() {
            let clipboard = Clipboard::new()
                .map_err(|e| Error::ClipboardError(format!("failed to access clipboard: {e}")))?;
            self.clipboard = Some(clipboard);
        }
        self.clipboard
            .as_mut()
            .ok_or_else(|| Error::Internal("clipboard handle missing".to_string()))
    }

    fn read(&mut self) -> Result<Option<ClipboardContent>> {
        let clipboard = self.clipboard()?;

        match clipboard.get_image() {
            Ok(image) => return encode_png(&image).map(|png| Some(ClipboardContent::Image(png))),
            Err(arboard::Error::ContentNotAvailable) => {}
            Err(e) => tracing::debug!("Clipboard: failed to read image: {e}"),
        }

        match clipboard.get_text() {
            Ok(text) if !text.trim().is_empty() => Ok(Some(ClipboardContent::Text(text))),
            Ok(_) | Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => {
                // A broken connection is not worth keeping around.
                self.clipboard = None;
                Err(Error::ClipboardError(format!("failed to read text: {e}")))
            }
        }
    }
}

impl std::fmt::Debug for NativeClipboardBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeClipboardBridge")
            .field("connected", &self.clipboard.is_some())
            .field("stager", &self.stager)
            .finish()
    }
}

impl ClipboardBridge for NativeClipboardBridge {
    fn capture(&mut self) -> Result<Option<CapturedPayload>> {
        match self.read()? {
            Some(content) => self.stager.stage(&content).map(Some),
            None => {
                tracing::debug!("Clipboard: no text or image content found");
                Ok(None)
            }
        }
    }
}

fn encode_png(image: &arboard::ImageData<'_>) -> Result<Vec<u8>> {
    let width = u32::try_from(image.width)
        .map_err(|_| Error::ClipboardError("image width too large".to_string()))?;
    let height = u32::try_from(image.height)
        .map_err(|_| Error::ClipboardError("image height too large".to_string()))?;

    let mut png = Vec::new();
    image::codecs::png::PngEncoder::new_with_quality(
        &mut png,
        image::codecs::png::CompressionType::Fast,
        image::codecs::png::FilterType::Adaptive,
    )
    .write_image(&image.bytes, width, height, image::ExtendedColorType::Rgba8)
    .map_err(|e| Error::ClipboardError(format!("failed to encode PNG: {e}")))?;

    tracing::trace!("Clipboard: read image {width}x{height}");
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn staged_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).map_or(0, |entries| entries.count())
    }

    #[test]
    fn test_text_is_staged_as_txt() {
        let temp = TempDir::new().unwrap();
        let mut stager = Stager::new(temp.path().join("staging"));

        let payload = stager
            .stage(&ClipboardContent::Text("hello world".to_string()))
            .unwrap();

        assert_eq!(payload.kind, PayloadKind::Text);
        assert!(payload.locator.ends_with(".txt"));
        assert_eq!(std::fs::read_to_string(payload.path()).unwrap(), "hello world");
    }

    #[test]
    fn test_existing_path_is_sent_as_file() {
        let temp = TempDir::new().unwrap();
        let doc = temp.path().join("report.pdf");
        std::fs::write(&doc, b"%PDF").unwrap();
        let staging = temp.path().join("staging");
        let mut stager = Stager::new(staging.clone());

        let text = format!("{}\n", doc.display());
        let payload = stager.stage(&ClipboardContent::Text(text)).unwrap();

        assert_eq!(payload.kind, PayloadKind::File);
        assert_eq!(payload.path(), doc.as_path());
        assert!(!staging.exists());
    }

    #[test]
    fn test_image_is_staged_as_png() {
        let temp = TempDir::new().unwrap();
        let mut stager = Stager::new(temp.path().to_path_buf());

        let image = arboard::ImageData {
            width: 2,
            height: 1,
            bytes: std::borrow::Cow::Owned(vec![255, 0, 0, 255, 0, 255, 0, 255]),
        };
        let png = encode_png(&image).unwrap();
        let payload = stager.stage(&ClipboardContent::Image(png)).unwrap();

        assert_eq!(payload.kind, PayloadKind::Image);
        assert!(payload.file_name().ends_with(".png"));
        let decoded = image::open(payload.path()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (2, 1));
    }

    #[test]
    fn test_unchanged_content_reuses_payload() {
        let temp = TempDir::new().unwrap();
        let mut stager = Stager::new(temp.path().to_path_buf());
        let content = ClipboardContent::Text("same".to_string());

        let first = stager.stage(&content).unwrap();
        let second = stager.stage(&content).unwrap();
        assert_eq!(first, second);
        assert_eq!(staged_count(temp.path()), 1);

        let third = stager
            .stage(&ClipboardContent::Text("different".to_string()))
            .unwrap();
        assert_ne!(first.locator, third.locator);
        assert_eq!(staged_count(temp.path()), 2);
    }

    #[test]
    fn test_restages_when_file_was_removed() {
        let temp = TempDir::new().unwrap();
        let mut stager = Stager::new(temp.path().to_path_buf());
        let content = ClipboardContent::Text("again".to_string());

        let first = stager.stage(&content).unwrap();
        std::fs::remove_file(first.path()).unwrap();

        let second = stager.stage(&content).unwrap();
        assert!(second.path().exists());
    }

    #[test]
    fn test_multiline_text_is_never_a_path() {
        assert!(existing_path("/etc\n/tmp").is_none());
        assert!(existing_path("   ").is_none());
    }
}
