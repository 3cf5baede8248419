use thiserror::Error;

use crate::{sequence::SequenceError, types::Scope, Member};

/// Errors that can occur while accepting an inbound message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// Too many out-of-order messages buffered for one stream. The message is
    /// dropped and will be recovered by retransmission.
    #[error("Buffer for {sender} ({scope:?}) is full at {limit} out-of-order messages, dropping message")]
    SenderBufferFull {
        sender: Member,
        scope: Scope,
        limit: usize,
    },

    /// Buffer disagreed with the seqno tracker
    #[error("Sequence buffer error: {0}")]
    Sequence(#[from] SequenceError),
}
