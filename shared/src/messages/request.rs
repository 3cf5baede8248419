use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};

use crate::Member;

/// Globally unique id of one request: the issuing member plus a counter that
/// only ever grows on that member
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId {
    origin: Member,
    counter: u64,
}

impl RequestId {
    pub fn new(origin: Member, counter: u64) -> Self {
        Self { origin, counter }
    }

    pub fn origin(&self) -> &Member {
        &self.origin
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.origin, self.counter)
    }
}

pub struct RequestIdGenerator {
    origin: Member,
    next: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new(origin: Member) -> Self {
        Self {
            origin,
            next: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> RequestId {
        RequestId::new(self.origin, self.next.fetch_add(1, Ordering::Relaxed))
    }
}
