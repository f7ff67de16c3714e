//! The frame loop.
//!
//! [`FrameLoop`] pulls one reading at a time from a [`GestureClassifier`],
//! feeds the state machine and hands every edge to the
//! [`TransferDispatcher`]. It never waits on the network: transfers are
//! only launched from here.
//!
//! A reading that cannot be parsed counts as a missing frame and resets the
//! state machine to Idle, which also discards any pending payload.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::clipboard::ClipboardBridge;
use crate::config::GestureConfig;
use crate::dispatch::{GestureEvent, Reaction, TransferDispatcher};
use crate::error::{Error, Result};
use crate::gesture::{
    FrameReading, FrameSize, GestureClassifier, GestureState, GestureStateMachine, Observation,
};
use crate::transfer::TransferTransport;

/// Result of processing one frame.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// State machine output for the frame
    pub observation: Observation,
    /// Dispatcher reaction, if the frame produced an edge
    pub reaction: Option<Reaction>,
}

/// Counters for a finished loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Readings processed
    pub frames: u64,
    /// Readings that could not be parsed
    pub invalid: u64,
    /// Holding entries
    pub grabs: u64,
    /// Transfers launched
    pub transfers: u64,
}

/// Maps reading timestamps onto the monotonic clock.
///
/// Readings carrying `t_ms` are placed relative to the loop start so a
/// recorded stream replays with its original timing. Readings without one
/// use the wall clock.
#[derive(Debug, Clone, Copy)]
struct FrameClock {
    origin: Instant,
}

impl FrameClock {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    fn at(&self, reading: &FrameReading) -> Instant {
        reading
            .timestamp_ms
            .map_or_else(Instant::now, |ms| self.origin + Duration::from_millis(ms))
    }
}

/// Frame loop wiring classifier, state machine and dispatcher.
pub struct FrameLoop<C, B, T> {
    classifier: C,
    clipboard: B,
    dispatcher: TransferDispatcher<T>,
    machine: GestureStateMachine,
    frame: FrameSize,
    clock: FrameClock,
}

impl<C, B, T> FrameLoop<C, B, T>
where
    C: GestureClassifier,
    B: ClipboardBridge,
    T: TransferTransport,
{
    /// Create a loop using the hold threshold and fallback frame size from
    /// `gesture`.
    pub fn new(
        classifier: C,
        clipboard: B,
        dispatcher: TransferDispatcher<T>,
        gesture: &GestureConfig,
    ) -> Self {
        Self {
            classifier,
            clipboard,
            dispatcher,
            machine: GestureStateMachine::new(gesture.hold_threshold),
            frame: gesture.frame_size(),
            clock: FrameClock::new(),
        }
    }

    /// Current gesture state.
    #[must_use]
    pub fn state(&self) -> GestureState {
        self.machine.state()
    }

    /// The dispatcher driven by this loop.
    #[must_use]
    pub fn dispatcher(&self) -> &TransferDispatcher<T> {
        &self.dispatcher
    }

    /// Mutable access to the dispatcher.
    pub fn dispatcher_mut(&mut self) -> &mut TransferDispatcher<T> {
        &mut self.dispatcher
    }

    /// Process one frame observed at `now`. `None` is a missing frame.
    pub fn step(&mut self, reading: Option<&FrameReading>, now: Instant) -> StepOutcome {
        let (observation, event) = match reading {
            Some(reading) => {
                let observation = self.machine.observe(reading.sample(), now);
                let event = GestureEvent::from_observation(
                    observation,
                    reading.position(),
                    reading.frame_size(self.frame),
                );
                (observation, event)
            }
            None => {
                let observation = self.machine.reset();
                (
                    observation,
                    GestureEvent::from_observation(observation, None, self.frame),
                )
            }
        };

        let reaction = event.map(|event| {
            tracing::trace!(?event, state = %observation.state, "Gesture edge");
            self.dispatcher.on_gesture_event(event, &mut self.clipboard)
        });

        StepOutcome {
            observation,
            reaction,
        }
    }

    /// Run until the classifier is exhausted or `cancel` fires.
    ///
    /// Cancellation is checked between readings.
    ///
    /// # Errors
    ///
    /// Returns an error if the classifier input itself fails (for example a
    /// closed pipe). Unparseable readings are not errors.
    pub fn run(&mut self, cancel: &CancellationToken) -> Result<LoopStats> {
        let mut stats = LoopStats::default();
        tracing::info!(
            hold_threshold_ms = self.machine.hold_threshold().as_millis(),
            frame_width = self.frame.width,
            frame_height = self.frame.height,
            "Frame loop started"
        );

        while !cancel.is_cancelled() {
            let outcome = match self.classifier.next_reading() {
                Ok(Some(reading)) => {
                    let now = self.clock.at(&reading);
                    self.step(Some(&reading), now)
                }
                Ok(None) => {
                    tracing::info!("Classifier input ended");
                    break;
                }
                Err(Error::InvalidReading(reason)) => {
                    tracing::debug!("Dropping frame: {reason}");
                    stats.invalid += 1;
                    self.step(None, Instant::now())
                }
                Err(e) => return Err(e),
            };

            stats.frames += 1;
            if outcome.observation.entered(GestureState::Holding) {
                stats.grabs += 1;
            }
            if matches!(outcome.reaction, Some(Reaction::Dispatched(_))) {
                stats.transfers += 1;
            }
        }

        tracing::info!(
            frames = stats.frames,
            grabs = stats.grabs,
            transfers = stats.transfers,
            "Frame loop stopped"
        );
        Ok(stats)
    }
}
