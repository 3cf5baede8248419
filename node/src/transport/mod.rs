use bytes::Bytes;
use thiserror::Error;

use cohort_shared::Member;

/// Errors a transport may report for a single send
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No route to the target. The frame is lost and will be recovered by
    /// retransmission if it was sequenced.
    #[error("Member {target} is unreachable")]
    Unreachable { target: Member },

    /// The transport was shut down
    #[error("Transport is closed")]
    Closed,
}

/// Moves encoded frames to other members. Frames are sent from inside
/// message delivery, so `send` must neither block for long nor feed the
/// frame back into a node on the calling thread.
pub trait Transport: Send + Sync {
    /// Sends one frame to `target`
    fn send(&self, target: &Member, frame: Bytes) -> Result<(), TransportError>;
}
