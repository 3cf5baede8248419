//! In-memory transport for multi-node tests. Frames are queued per receiver
//! and pumped into the receiving node by its own task, never on the sender's
//! stack.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use bytes::Bytes;
use log::trace;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use cohort_node::transport::{Transport, TransportError};
use cohort_shared::{Member, Packet, Scope, Seqno};

/// Drops the first sequenced frame matching all fields. Retransmissions of
/// the same seqno pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DropRule {
    pub from: Member,
    pub to: Member,
    pub scope: Scope,
    pub seqno: Seqno,
}

#[derive(Default)]
pub struct LocalHub {
    routes: Mutex<HashMap<Member, UnboundedSender<(Member, Bytes)>>>,
    muted: Mutex<HashSet<Member>>,
    drops: Mutex<Vec<DropRule>>,
    routed: AtomicUsize,
    lost: AtomicUsize,
}

impl LocalHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers `member` and returns the queue of frames sent to it
    pub fn attach(&self, member: Member) -> UnboundedReceiver<(Member, Bytes)> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.routes.lock().insert(member, sender);
        receiver
    }

    /// Frames to `member` fail with `Unreachable` from now on
    pub fn detach(&self, member: &Member) {
        self.routes.lock().remove(member);
    }

    pub fn link(self: &Arc<Self>, member: Member) -> Arc<LocalLink> {
        Arc::new(LocalLink {
            local: member,
            hub: self.clone(),
        })
    }

    /// Silently loses every frame sent by `member`
    pub fn mute(&self, member: Member) {
        self.muted.lock().insert(member);
    }

    pub fn unmute(&self, member: &Member) {
        self.muted.lock().remove(member);
    }

    pub fn drop_once(&self, rule: DropRule) {
        self.drops.lock().push(rule);
    }

    /// Frames handed to a receiver queue so far
    pub fn routed(&self) -> usize {
        self.routed.load(Ordering::Relaxed)
    }

    /// Frames lost to muting or drop rules so far
    pub fn lost(&self) -> usize {
        self.lost.load(Ordering::Relaxed)
    }

    fn route(&self, from: Member, to: &Member, frame: Bytes) -> Result<(), TransportError> {
        if self.muted.lock().contains(&from) || self.matches_drop_rule(from, to, &frame) {
            trace!("losing frame {} -> {}", from, to);
            self.lost.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }

        let routes = self.routes.lock();
        let Some(route) = routes.get(to) else {
            return Err(TransportError::Unreachable { target: *to });
        };
        route
            .send((from, frame))
            .map_err(|_| TransportError::Closed)?;
        self.routed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn matches_drop_rule(&self, from: Member, to: &Member, frame: &Bytes) -> bool {
        let mut drops = self.drops.lock();
        if drops.is_empty() {
            return false;
        }
        let Ok(Packet::Sequenced { scope, seqno, .. }) = Packet::from_bytes(frame) else {
            return false;
        };
        let rule = DropRule {
            from,
            to: *to,
            scope,
            seqno,
        };
        match drops.iter().position(|candidate| *candidate == rule) {
            Some(index) => {
                drops.remove(index);
                true
            }
            None => false,
        }
    }
}

/// One member's view of the hub
pub struct LocalLink {
    local: Member,
    hub: Arc<LocalHub>,
}

impl Transport for LocalLink {
    fn send(&self, target: &Member, frame: Bytes) -> Result<(), TransportError> {
        self.hub.route(self.local, target, frame)
    }
}
