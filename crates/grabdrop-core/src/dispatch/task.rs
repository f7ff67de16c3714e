//! Transfer task records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::clipboard::CapturedPayload;
use crate::discovery::Peer;
use crate::transfer::TransferOutcome;

/// Lifecycle of a transfer task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum TransferStatus {
    /// Still running
    Pending,
    /// Receiver accepted the payload
    Sent(String),
    /// Transfer failed
    Failed(String),
}

impl TransferStatus {
    /// True once the task has finished either way.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Outcome message of a finished task.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Pending => None,
            Self::Sent(message) | Self::Failed(message) => Some(message),
        }
    }
}

impl From<TransferOutcome> for TransferStatus {
    fn from(outcome: TransferOutcome) -> Self {
        if outcome.ok {
            Self::Sent(outcome.message)
        } else {
            Self::Failed(outcome.message)
        }
    }
}

/// Handle to one launched transfer.
///
/// Holds its own copy of the payload and of the target as they were at
/// dispatch time. Clones observe the same task.
#[derive(Debug, Clone)]
pub struct TransferTask {
    id: Uuid,
    payload: CapturedPayload,
    target: Peer,
    started_at: DateTime<Utc>,
    status: watch::Receiver<TransferStatus>,
}

impl TransferTask {
    pub(super) fn new(
        payload: CapturedPayload,
        target: Peer,
        status: watch::Receiver<TransferStatus>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            target,
            started_at: Utc::now(),
            status,
        }
    }

    /// Unique task id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Payload being sent.
    #[must_use]
    pub fn payload(&self) -> &CapturedPayload {
        &self.payload
    }

    /// Target peer at dispatch time.
    #[must_use]
    pub fn target(&self) -> &Peer {
        &self.target
    }

    /// When the task was launched.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> TransferStatus {
        self.status.borrow().clone()
    }

    /// Wait until the task finishes and return its final status.
    ///
    /// A task that disappears without reporting (its runtime shut down)
    /// counts as failed.
    pub async fn finished(&self) -> TransferStatus {
        let mut status = self.status.clone();
        let result = status
            .wait_for(TransferStatus::is_terminal)
            .await
            .map(|s| s.clone());

        match result {
            Ok(done) => done,
            Err(_) => {
                let last = status.borrow().clone();
                if last.is_terminal() {
                    last
                } else {
                    TransferStatus::Failed("transfer task ended without reporting".to_string())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::PayloadKind;
    use std::net::{IpAddr, Ipv4Addr};

    fn task() -> (watch::Sender<TransferStatus>, TransferTask) {
        let (tx, rx) = watch::channel(TransferStatus::Pending);
        let peer = Peer {
            id: "a".into(),
            name: "Alpha".into(),
            address: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 5000,
            last_seen: Utc::now(),
        };
        let payload = CapturedPayload::new(PayloadKind::Text, "/tmp/clipboard_x.txt");
        (tx, TransferTask::new(payload, peer, rx))
    }

    #[tokio::test]
    async fn test_finished_waits_for_terminal_status() {
        let (tx, task) = task();
        assert_eq!(task.status(), TransferStatus::Pending);

        let waiter = tokio::spawn({
            let task = task.clone();
            async move { task.finished().await }
        });
        tx.send_replace(TransferStatus::Sent("sent".into()));

        assert_eq!(waiter.await.unwrap(), TransferStatus::Sent("sent".into()));
        assert!(task.status().is_terminal());
    }

    #[tokio::test]
    async fn test_finished_when_sender_dropped() {
        let (tx, task) = task();
        drop(tx);
        assert!(matches!(task.finished().await, TransferStatus::Failed(_)));
    }

    #[test]
    fn test_status_from_outcome() {
        let status = TransferStatus::from(TransferOutcome::failure("refused"));
        assert_eq!(status.message(), Some("refused"));
        assert!(status.is_terminal());
        assert!(!TransferStatus::Pending.is_terminal());
    }
}
