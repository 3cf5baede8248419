use thiserror::Error;

use cohort_shared::{DeliveryError, HandlerTag, MembershipError, RequestId, WireError};

use crate::transport::TransportError;

/// Errors that can occur while starting or awaiting a call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// A call was made before the first view was installed
    #[error("Not connected: no view has been installed yet")]
    NotConnected,

    /// The id generator produced an id that is still in flight
    #[error("Request id {id} is already in flight")]
    DuplicateRequestId { id: RequestId },

    /// A call needs at least one target
    #[error("Call has no targets")]
    NoTargets,

    /// The call was cancelled before it completed
    #[error("Call {id} was cancelled")]
    Cancelled { id: RequestId },

    /// Two handlers were registered for one tag
    #[error("A handler for tag {tag} is already registered")]
    DuplicateHandler { tag: HandlerTag },
}

/// Errors surfaced by the node entry points
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    /// An operation that needs a view was attempted before the first install
    #[error("Not connected: no view has been installed yet")]
    NotConnected,

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Membership error: {0}")]
    Membership(#[from] MembershipError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
