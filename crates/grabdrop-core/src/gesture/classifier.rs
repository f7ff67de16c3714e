//! Classifier boundary.
//!
//! Hand landmark detection lives outside this crate. Anything that can say
//! "is there a hand, is it a fist, is it open, where is it" for each frame
//! can drive the pipeline by implementing [`GestureClassifier`].

use std::io::BufRead;

use serde::{Deserialize, Serialize};

use super::{FrameSize, HandPosition, HandSample};
use crate::error::{Error, Result};

/// Classification of a single frame.
///
/// Absent fields default to "no hand" / "unknown", so `{}` is a valid frame
/// without a hand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameReading {
    /// A hand was detected
    #[serde(default)]
    pub present: bool,
    /// The hand is a fist
    #[serde(default)]
    pub closed: bool,
    /// The hand is fully open
    #[serde(default)]
    pub open: bool,
    /// Hand x coordinate in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    /// Hand y coordinate in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    /// Width of the frame the reading came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_width: Option<u32>,
    /// Height of the frame the reading came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_height: Option<u32>,
    /// Capture time in milliseconds since the start of the stream
    #[serde(default, rename = "t_ms", skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
}

impl FrameReading {
    /// Sample for the state machine. Flags are ignored when no hand is present.
    #[must_use]
    pub const fn sample(&self) -> HandSample {
        HandSample {
            present: self.present,
            closed: self.present && self.closed,
            open: self.present && self.open,
        }
    }

    /// Hand position, if the hand is present and both coordinates are known.
    #[must_use]
    pub fn position(&self) -> Option<HandPosition> {
        if !self.present {
            return None;
        }
        Some(HandPosition::new(self.x?, self.y?))
    }

    /// Frame size carried by the reading, or `fallback`.
    #[must_use]
    pub fn frame_size(&self, fallback: FrameSize) -> FrameSize {
        match (self.frame_width, self.frame_height) {
            (Some(width), Some(height)) if width > 0 && height > 0 => FrameSize::new(width, height),
            _ => fallback,
        }
    }
}

/// Source of per-frame classifications.
pub trait GestureClassifier: Send {
    /// Produce the reading for the next frame.
    ///
    /// `Ok(None)` means the source is exhausted. [`Error::InvalidReading`]
    /// means this frame could not be classified; the caller treats it as a
    /// missing frame. Any other error means the source itself failed.
    fn next_reading(&mut self) -> Result<Option<FrameReading>>;
}

/// Reads one JSON-encoded [`FrameReading`] per line.
///
/// Lets an external hand tracker (or a recording of one) feed the pipeline
/// over a pipe.
pub struct JsonLinesClassifier<R> {
    reader: R,
    line: Vec<u8>,
    line_number: u64,
}

impl<R: BufRead + Send> JsonLinesClassifier<R> {
    /// Wrap a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            line_number: 0,
        }
    }
}

impl<R: BufRead + Send> GestureClassifier for JsonLinesClassifier<R> {
    fn next_reading(&mut self) -> Result<Option<FrameReading>> {
        loop {
            self.line.clear();
            // Raw bytes: a line that is not UTF-8 is a bad reading, not a
            // broken stream.
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let trimmed = self.line.trim_ascii();
            if trimmed.is_empty() {
                continue;
            }

            return serde_json::from_slice(trimmed).map(Some).map_err(|e| {
                Error::InvalidReading(format!("line {}: {e}", self.line_number))
            });
        }
    }
}
