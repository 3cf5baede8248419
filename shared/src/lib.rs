//! # Cohort Shared
//! Membership views, seqno tracking and ordered delivery shared by every
//! cohort node.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod delivery;
mod member;
mod membership;
mod messages;
mod sequence;
mod types;

pub use delivery::{
    DeliveryConfig, DeliveryEngine, DeliveryError, Receipt, Retransmission, RetransmitRequest,
    StreamKey, StreamState,
};
pub use member::Member;
pub use membership::{MembershipError, MembershipView, View, ViewChange};
pub use messages::{
    Envelope, Packet, RemoteOutcome, RequestId, RequestIdGenerator, ResponseMode,
    ResponseOutcome, ResponseSet, WireError,
};
pub use sequence::{
    Classification, Digest, DigestEntry, SeqnoRange, SeqnoTracker, SequenceBuffer, SequenceError,
};
pub use types::{HandlerTag, Scope, Seqno, Target, ViewId};
