//! # Cohort Node
//! A group member that delivers every sender's messages in order, tracks
//! membership views and dispatches remote calls to other members over any
//! transport that can move frames between them.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod transport;
pub mod shared {
    pub use cohort_shared::{
        DeliveryConfig, Digest, DigestEntry, HandlerTag, Member, MembershipError, Receipt,
        ResponseMode, ResponseOutcome, ResponseSet, Scope, Seqno, SeqnoRange, Target, View,
        ViewChange, ViewId,
    };
}

mod application;
mod dispatcher;
mod error;
mod node;
mod outbox;

pub use application::Application;
pub use dispatcher::{CallOptions, Dispatcher, DispatcherConfig, HandlerRegistry, ResponseFuture};
pub use error::{DispatchError, NodeError};
pub use node::{Node, NodeConfig};
