//! Common test utilities for Grabdrop integration tests.
//!
//! Mock collaborators for the gesture pipeline plus small helpers for
//! building readings and peers.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use grabdrop_core::clipboard::{CapturedPayload, ClipboardBridge, PayloadKind};
use grabdrop_core::gesture::{FrameReading, GestureClassifier};
use grabdrop_core::transfer::{TransferOutcome, TransferTransport};
use grabdrop_core::{Error, Result};

/// Create a temporary directory for test files.
pub fn create_temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

/// Create a test file with the given content.
pub fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write test file");
    path
}

/// A LAN-looking address.
pub fn lan_ip(last: u8) -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 168, 1, last))
}

/// What the mock clipboard returns on capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardMode {
    /// A fresh text payload per capture
    Text,
    /// Nothing on the clipboard
    Empty,
    /// Platform failure
    Fail,
}

/// Clipboard bridge with a scripted result.
///
/// Each successful capture yields a distinct locator so tests can tell
/// payloads apart.
#[derive(Debug, Clone)]
pub struct MockClipboard {
    mode: ClipboardMode,
    captures: Arc<AtomicUsize>,
}

impl MockClipboard {
    pub fn new(mode: ClipboardMode) -> Self {
        Self {
            mode,
            captures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of `capture` calls so far, shared between clones.
    pub fn captures(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

impl ClipboardBridge for MockClipboard {
    fn capture(&mut self) -> Result<Option<CapturedPayload>> {
        let n = self.captures.fetch_add(1, Ordering::SeqCst) + 1;
        match self.mode {
            ClipboardMode::Text => Ok(Some(CapturedPayload::new(
                PayloadKind::Text,
                format!("/staging/clipboard_{n}.txt"),
            ))),
            ClipboardMode::Empty => Ok(None),
            ClipboardMode::Fail => Err(Error::ClipboardError("no display".to_string())),
        }
    }
}

/// How the mock transport handles one send.
#[derive(Debug, Clone)]
pub enum SendBehavior {
    /// Succeed immediately
    Succeed,
    /// Fail immediately with the message
    Fail(String),
    /// Succeed after a delay
    Delay(Duration),
    /// Never complete
    Hang,
}

/// A send the mock transport saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSend {
    pub locator: String,
    pub addr: SocketAddr,
}

/// Transport answering sends from a script, then succeeding.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<SendBehavior>>,
    sends: Mutex<Vec<RecordedSend>>,
    reachable: bool,
}

impl MockTransport {
    /// Transport that always succeeds.
    pub fn succeeding() -> Arc<Self> {
        Self::scripted(Vec::new())
    }

    /// Transport following `script` for the first sends.
    pub fn scripted(script: Vec<SendBehavior>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            sends: Mutex::new(Vec::new()),
            reachable: true,
        })
    }

    /// Every send attempted so far, in order.
    pub fn sends(&self) -> Vec<RecordedSend> {
        self.sends.lock().clone()
    }
}

impl TransferTransport for MockTransport {
    async fn ping(&self, _addr: SocketAddr, _timeout: Duration) -> bool {
        self.reachable
    }

    async fn send(
        &self,
        payload: &CapturedPayload,
        addr: SocketAddr,
        _timeout: Duration,
    ) -> TransferOutcome {
        self.sends.lock().push(RecordedSend {
            locator: payload.locator.clone(),
            addr,
        });
        let behavior = self
            .script
            .lock()
            .pop_front()
            .unwrap_or(SendBehavior::Succeed);

        match behavior {
            SendBehavior::Succeed => TransferOutcome::success(format!("sent to {addr}")),
            SendBehavior::Fail(message) => TransferOutcome::failure(message),
            SendBehavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                TransferOutcome::success(format!("sent to {addr}"))
            }
            SendBehavior::Hang => std::future::pending().await,
        }
    }
}

/// Classifier replaying a fixed list of results.
pub struct ScriptedClassifier {
    readings: VecDeque<Result<FrameReading>>,
}

impl ScriptedClassifier {
    pub fn new(readings: Vec<Result<FrameReading>>) -> Self {
        Self {
            readings: readings.into(),
        }
    }
}

impl GestureClassifier for ScriptedClassifier {
    fn next_reading(&mut self) -> Result<Option<FrameReading>> {
        self.readings.pop_front().transpose()
    }
}

/// A closed fist at `(x, y)` observed at `t_ms`.
pub fn fist(x: i32, y: i32, t_ms: u64) -> FrameReading {
    FrameReading {
        present: true,
        closed: true,
        open: false,
        x: Some(x),
        y: Some(y),
        timestamp_ms: Some(t_ms),
        ..FrameReading::default()
    }
}

/// An open hand at `(x, y)` observed at `t_ms`.
pub fn open_hand(x: i32, y: i32, t_ms: u64) -> FrameReading {
    FrameReading {
        present: true,
        closed: false,
        open: true,
        x: Some(x),
        y: Some(y),
        timestamp_ms: Some(t_ms),
        ..FrameReading::default()
    }
}

/// No hand in a frame observed at `t_ms`.
pub fn no_hand(t_ms: u64) -> FrameReading {
    FrameReading {
        timestamp_ms: Some(t_ms),
        ..FrameReading::default()
    }
}

/// Readings for a complete grab and throw ending at `(x, y)`.
pub fn grab_and_throw(x: i32, y: i32, start_ms: u64) -> Vec<Result<FrameReading>> {
    vec![
        Ok(fist(320, 240, start_ms)),
        Ok(fist(320, 240, start_ms + 300)),
        Ok(fist(330, 240, start_ms + 600)),
        Ok(open_hand(x, y, start_ms + 700)),
        Ok(open_hand(x, y, start_ms + 733)),
    ]
}
