//! Hand gesture lifecycle.
//!
//! A classifier (see [`GestureClassifier`]) reports, for every frame, whether
//! a hand is visible and whether it is closed into a fist or fully open. The
//! [`GestureStateMachine`] turns that noisy per-frame stream into a four-state
//! lifecycle:
//!
//! ```text
//!            closed               closed, held > threshold        open
//!   Idle ───────────▶ Grabbing ─────────────────────────▶ Holding ──────▶ Releasing
//!    ▲                   │ !closed                          │ ambiguous       │
//!    └───────────────────┴──────────────────────────────────┴─────────────────┘
//!                        (hand absent resets from anywhere)    (next frame)
//! ```
//!
//! Grabbing debounces a brief clench. Releasing lasts exactly one observation,
//! so each completed cycle yields one Holding entry and one Releasing entry.
//! Both are reported through [`Observation::just_entered`] and are meant to be
//! consumed as edges, not levels.

mod classifier;

pub use classifier::{FrameReading, GestureClassifier, JsonLinesClassifier};

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Phase of the grab/release gesture.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureState {
    /// No gesture in progress
    #[default]
    Idle,
    /// Fist closed, waiting for the hold threshold
    Grabbing,
    /// Fist held long enough; content is considered grabbed
    Holding,
    /// Hand opened after holding; lasts a single observation
    Releasing,
}

impl fmt::Display for GestureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Grabbing => write!(f, "grabbing"),
            Self::Holding => write!(f, "holding"),
            Self::Releasing => write!(f, "releasing"),
        }
    }
}

/// One classified hand sample.
///
/// `closed` and `open` are independent: a relaxed, half-open hand is
/// neither.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandSample {
    /// A hand was detected in the frame
    pub present: bool,
    /// The hand is closed into a fist
    pub closed: bool,
    /// The hand is fully open
    pub open: bool,
}

impl HandSample {
    /// No hand in the frame.
    pub const ABSENT: Self = Self {
        present: false,
        closed: false,
        open: false,
    };

    /// A visible fist.
    #[must_use]
    pub const fn fist() -> Self {
        Self {
            present: true,
            closed: true,
            open: false,
        }
    }

    /// A visible, fully open hand.
    #[must_use]
    pub const fn open_hand() -> Self {
        Self {
            present: true,
            closed: false,
            open: true,
        }
    }

    /// A visible hand that is neither a fist nor fully open.
    #[must_use]
    pub const fn relaxed() -> Self {
        Self {
            present: true,
            closed: false,
            open: false,
        }
    }
}

/// Hand position in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandPosition {
    /// Horizontal coordinate, growing to the right
    pub x: i32,
    /// Vertical coordinate, growing downwards
    pub y: i32,
}

impl HandPosition {
    /// Create a position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl FrameSize {
    /// Create a frame size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self::new(crate::DEFAULT_FRAME_WIDTH, crate::DEFAULT_FRAME_HEIGHT)
    }
}

/// Result of feeding one sample to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// State after the sample
    pub state: GestureState,
    /// True when `state` differs from the state before the sample
    pub just_entered: bool,
}

impl Observation {
    /// True if this observation is the entry edge into `state`.
    #[must_use]
    pub fn entered(&self, state: GestureState) -> bool {
        self.just_entered && self.state == state
    }
}

/// Debounced grab/hold/release state machine.
///
/// The machine performs no I/O; the caller supplies the clock so the whole
/// lifecycle can be driven from recorded readings or tests.
#[derive(Debug, Clone)]
pub struct GestureStateMachine {
    state: GestureState,
    grab_start: Option<Instant>,
    hold_threshold: Duration,
}

impl GestureStateMachine {
    /// Create a machine in [`GestureState::Idle`].
    #[must_use]
    pub const fn new(hold_threshold: Duration) -> Self {
        Self {
            state: GestureState::Idle,
            grab_start: None,
            hold_threshold,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> GestureState {
        self.state
    }

    /// Configured hold threshold.
    #[must_use]
    pub const fn hold_threshold(&self) -> Duration {
        self.hold_threshold
    }

    /// Feed one sample observed at `now`.
    pub fn observe(&mut self, sample: HandSample, now: Instant) -> Observation {
        let previous = self.state;
        let (state, grab_start) =
            next_state(previous, self.grab_start, sample, now, self.hold_threshold);

        self.state = state;
        self.grab_start = grab_start;

        if state != previous {
            tracing::trace!(from = %previous, to = %state, "Gesture transition");
        }

        Observation {
            state,
            just_entered: state != previous,
        }
    }

    /// Force the machine back to idle.
    ///
    /// Used when the classifier could not deliver a frame at all.
    pub fn reset(&mut self) -> Observation {
        let previous = self.state;
        self.state = GestureState::Idle;
        self.grab_start = None;
        Observation {
            state: GestureState::Idle,
            just_entered: previous != GestureState::Idle,
        }
    }
}

impl Default for GestureStateMachine {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::DEFAULT_HOLD_THRESHOLD_MS))
    }
}

/// Pure transition function behind [`GestureStateMachine::observe`].
///
/// Returns the next state and the grab start time to carry forward.
#[must_use]
pub fn next_state(
    state: GestureState,
    grab_start: Option<Instant>,
    sample: HandSample,
    now: Instant,
    hold_threshold: Duration,
) -> (GestureState, Option<Instant>) {
    use GestureState::{Grabbing, Holding, Idle, Releasing};

    if !sample.present {
        return (Idle, None);
    }

    match state {
        Idle if sample.closed => (Grabbing, Some(now)),
        Idle => (Idle, None),
        Grabbing if !sample.closed => (Idle, None),
        Grabbing => {
            let started = grab_start.unwrap_or(now);
            if now.saturating_duration_since(started) > hold_threshold {
                (Holding, Some(started))
            } else {
                (Grabbing, Some(started))
            }
        }
        Holding if sample.open => (Releasing, None),
        Holding if !sample.closed => (Idle, None),
        Holding => (Holding, grab_start),
        Releasing => (Idle, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_millis(500);

    fn ms(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    /// Drive a machine into Holding starting at `base`.
    fn hold(machine: &mut GestureStateMachine, base: Instant) {
        machine.observe(HandSample::fist(), base);
        let obs = machine.observe(HandSample::fist(), ms(base, 600));
        assert!(obs.entered(GestureState::Holding));
    }

    #[test]
    fn test_starts_idle() {
        let machine = GestureStateMachine::default();
        assert_eq!(machine.state(), GestureState::Idle);
        assert_eq!(machine.hold_threshold(), THRESHOLD);
    }

    #[test]
    fn test_full_cycle_emits_each_edge_once() {
        let base = Instant::now();
        let mut machine = GestureStateMachine::new(THRESHOLD);

        let obs = machine.observe(HandSample::fist(), base);
        assert!(obs.entered(GestureState::Grabbing));

        let obs = machine.observe(HandSample::fist(), ms(base, 200));
        assert_eq!(obs.state, GestureState::Grabbing);
        assert!(!obs.just_entered);

        let obs = machine.observe(HandSample::fist(), ms(base, 501));
        assert!(obs.entered(GestureState::Holding));

        let obs = machine.observe(HandSample::fist(), ms(base, 900));
        assert_eq!(obs.state, GestureState::Holding);
        assert!(!obs.just_entered);

        let obs = machine.observe(HandSample::open_hand(), ms(base, 1000));
        assert!(obs.entered(GestureState::Releasing));

        let obs = machine.observe(HandSample::open_hand(), ms(base, 1033));
        assert!(obs.entered(GestureState::Idle));

        let obs = machine.observe(HandSample::open_hand(), ms(base, 1066));
        assert_eq!(obs.state, GestureState::Idle);
        assert!(!obs.just_entered);
    }

    #[test]
    fn test_threshold_is_strict() {
        let base = Instant::now();
        let mut machine = GestureStateMachine::new(THRESHOLD);

        machine.observe(HandSample::fist(), base);
        let obs = machine.observe(HandSample::fist(), ms(base, 500));
        assert_eq!(obs.state, GestureState::Grabbing);
    }

    #[test]
    fn test_early_release_returns_to_idle() {
        let base = Instant::now();
        let mut machine = GestureStateMachine::new(THRESHOLD);

        machine.observe(HandSample::fist(), base);
        let obs = machine.observe(HandSample::open_hand(), ms(base, 100));
        assert!(obs.entered(GestureState::Idle));

        // The debounce restarts from the next clench.
        machine.observe(HandSample::fist(), ms(base, 200));
        let obs = machine.observe(HandSample::fist(), ms(base, 650));
        assert_eq!(obs.state, GestureState::Grabbing);
        let obs = machine.observe(HandSample::fist(), ms(base, 701));
        assert!(obs.entered(GestureState::Holding));
    }

    #[test]
    fn test_ambiguous_pose_while_holding_cancels() {
        let base = Instant::now();
        let mut machine = GestureStateMachine::new(THRESHOLD);
        hold(&mut machine, base);

        let obs = machine.observe(HandSample::relaxed(), ms(base, 700));
        assert!(obs.entered(GestureState::Idle));
    }

    #[test]
    fn test_absent_hand_resets_from_any_state() {
        let base = Instant::now();

        let mut machine = GestureStateMachine::new(THRESHOLD);
        machine.observe(HandSample::fist(), base);
        assert!(machine
            .observe(HandSample::ABSENT, ms(base, 10))
            .entered(GestureState::Idle));

        let mut machine = GestureStateMachine::new(THRESHOLD);
        hold(&mut machine, base);
        assert!(machine
            .observe(HandSample::ABSENT, ms(base, 700))
            .entered(GestureState::Idle));

        // Absent while idle is not an edge.
        let obs = machine.observe(HandSample::ABSENT, ms(base, 800));
        assert_eq!(obs.state, GestureState::Idle);
        assert!(!obs.just_entered);
    }

    #[test]
    fn test_releasing_is_one_shot_even_with_fist() {
        let base = Instant::now();
        let mut machine = GestureStateMachine::new(THRESHOLD);
        hold(&mut machine, base);

        machine.observe(HandSample::open_hand(), ms(base, 700));
        let obs = machine.observe(HandSample::fist(), ms(base, 730));
        assert!(obs.entered(GestureState::Idle));

        // A new grab has to start over.
        let obs = machine.observe(HandSample::fist(), ms(base, 760));
        assert!(obs.entered(GestureState::Grabbing));
    }

    #[test]
    fn test_reset_reports_edge_only_when_leaving_another_state() {
        let base = Instant::now();
        let mut machine = GestureStateMachine::new(THRESHOLD);

        assert!(!machine.reset().just_entered);

        machine.observe(HandSample::fist(), base);
        let obs = machine.reset();
        assert!(obs.entered(GestureState::Idle));
        assert_eq!(machine.state(), GestureState::Idle);
    }

    #[test]
    fn test_state_always_valid_and_releasing_followed_by_idle() {
        let base = Instant::now();
        let samples = [
            HandSample::fist(),
            HandSample::ABSENT,
            HandSample::open_hand(),
            HandSample::relaxed(),
        ];
        let mut machine = GestureStateMachine::new(Duration::from_millis(30));

        // Deterministic pseudo-random walk over samples.
        let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
        let mut previous = GestureState::Idle;
        for step in 0..5_000u64 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let index = usize::try_from(seed % 4).unwrap();
            let obs = machine.observe(samples[index], ms(base, step * 20));

            if previous == GestureState::Releasing {
                assert_eq!(obs.state, GestureState::Idle);
            }
            assert_eq!(obs.just_entered, obs.state != previous);
            previous = obs.state;
        }
    }

    #[test]
    fn test_gesture_state_display() {
        assert_eq!(GestureState::Holding.to_string(), "holding");
        assert_eq!(GestureState::default(), GestureState::Idle);
    }
}
