use std::time::Duration;
use tokio::sync::mpsc;

/// Phases of the sub-protocol.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum Phase {
    /// Protocol created, no phase has started.
    Init,
    /// Dealers send deals.
    Deal,
    /// Share holders respond to deals.
    Response,
    /// Dealers justify complaints.
    Justification,
    /// Protocol computes the result.
    Finish,
}

/// Emits the protocol phases on a fixed interval.
///
/// The deal phase is emitted immediately, each following
/// phase one interval after the previous.
pub struct TimePhaser {
    interval: Duration,
    sender: mpsc::Sender<Phase>,
}

impl TimePhaser {
    /// Create a phaser and the receiver for its phases.
    pub fn new(interval: Duration) -> (Self, mpsc::Receiver<Phase>) {
        let (sender, receiver) = mpsc::channel(4);
        (Self { interval, sender }, receiver)
    }

    /// Emit all phases.
    pub async fn start(self) {
        let phases = [
            Phase::Deal,
            Phase::Response,
            Phase::Justification,
            Phase::Finish,
        ];
        for (index, phase) in phases.into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.interval).await;
            }
            if self.sender.send(phase).await.is_err() {
                tracing::debug!(?phase, "phaser receiver dropped");
                return;
            }
        }
    }
}
