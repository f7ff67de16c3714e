//! Reacting to gesture edges.
//!
//! [`TransferDispatcher`] is driven by the frame loop. It owns the single
//! pending payload slot and turns gesture edges into actions:
//!
//! | Event | Action |
//! |---|---|
//! | [`GestureEvent::Grabbed`] | capture the clipboard into the pending slot |
//! | [`GestureEvent::Released`] | pick a target and launch a [`TransferTask`]; always clears the slot |
//! | [`GestureEvent::Cancelled`] | clear the slot |
//!
//! Nothing here blocks on the network. Transfers run as tasks on a tokio
//! runtime, each with its own copy of the payload and target, and report
//! back through [`Signal`]s and their [`TransferTask`] status.

mod task;

pub use task::{TransferStatus, TransferTask};

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

use crate::clipboard::{CapturedPayload, ClipboardBridge, PayloadKind};
use crate::config::Config;
use crate::discovery::{DeviceRegistry, Peer, RegistrySnapshot};
use crate::gesture::{FrameSize, GestureState, HandPosition, Observation};
use crate::transfer::{TransferOutcome, TransferTransport};

/// Capacity of the signal channel; slow subscribers lose the oldest signals.
const SIGNAL_CAPACITY: usize = 64;

/// Edge-triggered input to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    /// Holding was entered
    Grabbed,
    /// Releasing was entered
    Released {
        /// Hand position in the releasing frame, if known
        position: Option<HandPosition>,
        /// Size of the releasing frame
        frame: FrameSize,
    },
    /// Idle was entered
    Cancelled,
}

impl GestureEvent {
    /// Event for a state machine observation, if it is an edge the
    /// dispatcher cares about.
    #[must_use]
    pub fn from_observation(
        observation: Observation,
        position: Option<HandPosition>,
        frame: FrameSize,
    ) -> Option<Self> {
        if !observation.just_entered {
            return None;
        }
        match observation.state {
            GestureState::Holding => Some(Self::Grabbed),
            GestureState::Releasing => Some(Self::Released { position, frame }),
            GestureState::Idle => Some(Self::Cancelled),
            GestureState::Grabbing => None,
        }
    }
}

/// User-facing notification.
///
/// Every outcome an observer needs to tell apart has its own variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum Signal {
    /// Clipboard content was grabbed
    CaptureSucceeded {
        /// Content kind
        kind: PayloadKind,
        /// Path of the grabbed content
        locator: String,
    },
    /// The clipboard had nothing usable
    CaptureEmpty,
    /// The clipboard could not be read
    CaptureFailed {
        /// Error description
        reason: String,
    },
    /// Released with no peer known
    NoDeviceAvailable,
    /// Released with peers known, but none in the selection region
    NoTargetInRegion,
    /// A transfer task was launched
    TransferStarted {
        /// Task id
        task_id: Uuid,
        /// Target peer name
        peer: String,
        /// File being sent
        file_name: String,
    },
    /// A transfer task completed
    TransferSucceeded {
        /// Task id
        task_id: Uuid,
        /// Target peer name
        peer: String,
        /// Transport message
        message: String,
    },
    /// A transfer task failed
    TransferFailed {
        /// Task id
        task_id: Uuid,
        /// Target peer name
        peer: String,
        /// Transport message
        message: String,
    },
}

/// What a single [`TransferDispatcher::on_gesture_event`] call did.
#[derive(Debug, Clone)]
pub enum Reaction {
    /// Nothing to do
    Ignored,
    /// A payload is now pending
    Captured(CapturedPayload),
    /// Capture found nothing
    CaptureEmpty,
    /// Capture failed
    CaptureFailed(String),
    /// A pending payload was discarded without a transfer
    Cleared,
    /// Released with an empty registry; payload discarded
    NoDeviceAvailable,
    /// Released with no peer in the selection region; payload discarded
    NoTargetInRegion,
    /// A transfer was launched
    Dispatched(TransferTask),
}

/// Dispatcher tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Distance from the right frame edge that selects a peer, in pixels
    pub edge_margin: u32,
    /// Upper bound on a single send
    pub send_timeout: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            edge_margin: crate::DEFAULT_EDGE_MARGIN,
            send_timeout: Duration::from_secs(crate::DEFAULT_SEND_TIMEOUT_SECS),
        }
    }
}

impl DispatchSettings {
    /// Settings taken from the configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            edge_margin: config.gesture.edge_margin,
            send_timeout: config.network.send_timeout,
        }
    }
}

/// Turns gesture edges into captures and transfer tasks.
pub struct TransferDispatcher<T> {
    registry: DeviceRegistry,
    transport: Arc<T>,
    settings: DispatchSettings,
    runtime: Handle,
    pending: Option<CapturedPayload>,
    tasks: Vec<TransferTask>,
    signals: broadcast::Sender<Signal>,
}

impl<T: TransferTransport> TransferDispatcher<T> {
    /// Create a dispatcher launching transfers on `runtime`.
    pub fn new(
        registry: DeviceRegistry,
        transport: Arc<T>,
        settings: DispatchSettings,
        runtime: Handle,
    ) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self {
            registry,
            transport,
            settings,
            runtime,
            pending: None,
            tasks: Vec::new(),
            signals,
        }
    }

    /// Receive every signal published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.signals.subscribe()
    }

    /// The payload waiting for a release, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&CapturedPayload> {
        self.pending.as_ref()
    }

    /// Drop the pending payload. Returns whether there was one.
    pub fn clear_pending(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Transfer tasks that were still running at the last dispatch, plus
    /// any launched since.
    #[must_use]
    pub fn tasks(&self) -> &[TransferTask] {
        &self.tasks
    }

    /// Registry targets are selected from.
    #[must_use]
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// React to one gesture edge.
    pub fn on_gesture_event(
        &mut self,
        event: GestureEvent,
        clipboard: &mut dyn ClipboardBridge,
    ) -> Reaction {
        match event {
            GestureEvent::Grabbed => self.capture(clipboard),
            GestureEvent::Released { position, frame } => self.release(position, frame),
            GestureEvent::Cancelled => {
                if self.clear_pending() {
                    tracing::debug!("Gesture cancelled, pending payload discarded");
                    Reaction::Cleared
                } else {
                    Reaction::Ignored
                }
            }
        }
    }

    fn capture(&mut self, clipboard: &mut dyn ClipboardBridge) -> Reaction {
        // A new grab always starts from an empty slot.
        self.pending = None;

        match clipboard.capture() {
            Ok(Some(payload)) => {
                tracing::info!(kind = %payload.kind, locator = %payload.locator, "Content grabbed");
                self.emit(Signal::CaptureSucceeded {
                    kind: payload.kind,
                    locator: payload.locator.clone(),
                });
                self.pending = Some(payload.clone());
                Reaction::Captured(payload)
            }
            Ok(None) => {
                tracing::info!("Nothing on the clipboard");
                self.emit(Signal::CaptureEmpty);
                Reaction::CaptureEmpty
            }
            Err(e) => {
                tracing::warn!("Clipboard capture failed: {e}");
                let reason = e.to_string();
                self.emit(Signal::CaptureFailed {
                    reason: reason.clone(),
                });
                Reaction::CaptureFailed(reason)
            }
        }
    }

    fn release(&mut self, position: Option<HandPosition>, frame: FrameSize) -> Reaction {
        let Some(payload) = self.pending.take() else {
            return Reaction::Ignored;
        };

        let snapshot = self.registry.snapshot();
        if snapshot.is_empty() {
            tracing::info!("Released with no device available");
            self.emit(Signal::NoDeviceAvailable);
            return Reaction::NoDeviceAvailable;
        }

        let Some(target) = self.select_target(&snapshot, position, frame) else {
            tracing::info!(
                ?position,
                peers = snapshot.len(),
                "Released outside the target region"
            );
            self.emit(Signal::NoTargetInRegion);
            return Reaction::NoTargetInRegion;
        };

        Reaction::Dispatched(self.spawn_transfer(payload, target))
    }

    fn select_target(
        &self,
        snapshot: &RegistrySnapshot,
        position: Option<HandPosition>,
        frame: FrameSize,
    ) -> Option<Peer> {
        match position {
            Some(position) => snapshot
                .select_by_position(position, frame, self.settings.edge_margin)
                .cloned(),
            None => match snapshot.peers() {
                [only] => Some(only.clone()),
                _ => None,
            },
        }
    }

    fn spawn_transfer(&mut self, payload: CapturedPayload, target: Peer) -> TransferTask {
        self.tasks.retain(|task| !task.status().is_terminal());

        let (status_tx, status_rx) = watch::channel(TransferStatus::Pending);
        let task = TransferTask::new(payload, target, status_rx);

        tracing::info!(
            task_id = %task.id(),
            peer = %task.target().name,
            address = %task.target().socket_addr(),
            file = %task.payload().file_name(),
            "Transfer started"
        );
        self.emit(Signal::TransferStarted {
            task_id: task.id(),
            peer: task.target().name.clone(),
            file_name: task.payload().file_name(),
        });

        self.runtime.spawn(run_transfer(
            Arc::clone(&self.transport),
            task.clone(),
            self.settings.send_timeout,
            status_tx,
            self.signals.clone(),
        ));

        self.tasks.push(task.clone());
        task
    }

    fn emit(&self, signal: Signal) {
        // No subscribers is fine.
        let _ = self.signals.send(signal);
    }
}

async fn run_transfer<T: TransferTransport>(
    transport: Arc<T>,
    task: TransferTask,
    timeout: Duration,
    status: watch::Sender<TransferStatus>,
    signals: broadcast::Sender<Signal>,
) {
    let addr = task.target().socket_addr();
    let send = transport.send(task.payload(), addr, timeout);

    let outcome = match tokio::time::timeout(timeout, send).await {
        Ok(outcome) => outcome,
        Err(_) => TransferOutcome::failure(format!(
            "timed out after {}s sending to {addr}",
            timeout.as_secs_f32()
        )),
    };

    let peer = task.target().name.clone();
    let signal = if outcome.ok {
        tracing::info!(task_id = %task.id(), %peer, "{}", outcome.message);
        Signal::TransferSucceeded {
            task_id: task.id(),
            peer,
            message: outcome.message.clone(),
        }
    } else {
        tracing::warn!(task_id = %task.id(), %peer, "Transfer failed: {}", outcome.message);
        Signal::TransferFailed {
            task_id: task.id(),
            peer,
            message: outcome.message.clone(),
        }
    };

    status.send_replace(TransferStatus::from(outcome));
    let _ = signals.send(signal);
}
