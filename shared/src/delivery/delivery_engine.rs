use std::{sync::Arc, time::Instant};

use bytes::Bytes;
use dashmap::DashMap;
use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::{
    delivery::{
        inbound_stream::{Arrival, InboundStream},
        outbound_stream::OutboundStream,
        DeliveryConfig, DeliveryError, StreamState,
    },
    membership::ViewChange,
    sequence::{Digest, DigestEntry, SeqnoRange},
    types::{Scope, Seqno, Target},
    Member,
};

/// Identifies one seqno space: the remote sender for inbound streams, the
/// destination (or the local member, for multicast) for outbound streams
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamKey {
    pub member: Member,
    pub scope: Scope,
}

impl StreamKey {
    pub fn new(member: Member, scope: Scope) -> Self {
        Self { member, scope }
    }
}

/// A request for the original sender of a stream to send `ranges` again
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetransmitRequest {
    pub sender: Member,
    pub scope: Scope,
    pub ranges: Vec<SeqnoRange>,
}

/// What happened to an inbound message
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Receipt {
    /// The message and `count - 1` buffered successors were handed over
    Delivered { count: usize },
    /// Seen before, dropped
    Duplicate,
    /// Held back until the gap in front of it closes
    Buffered { retransmit: Option<RetransmitRequest> },
    /// Dropped unseen because its sender is not in the installed view
    Discarded,
}

/// Messages found in the retransmit log of an outbound stream
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Retransmission {
    pub messages: Vec<(Seqno, Bytes)>,
    /// Set when some requested seqnos were already evicted. The requester
    /// should skip ahead to this seqno.
    pub first_available: Option<Seqno>,
}

/// Sequences outbound messages and turns inbound messages, which may arrive
/// duplicated or out of order, into a gap-free, duplicate-free stream per
/// sender.
///
/// Every stream sits behind its own lock; the maps only guard stream
/// creation and removal, so unrelated senders never contend.
pub struct DeliveryEngine {
    local: Member,
    config: DeliveryConfig,
    inbound: DashMap<StreamKey, Arc<Mutex<InboundStream>>>,
    outbound: DashMap<StreamKey, Arc<Mutex<OutboundStream>>>,
}

impl DeliveryEngine {
    pub fn new(local: Member, config: DeliveryConfig) -> Self {
        Self {
            local,
            config,
            inbound: DashMap::new(),
            outbound: DashMap::new(),
        }
    }

    pub fn local(&self) -> &Member {
        &self.local
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    // Outgoing

    /// Assigns the next seqno of the stream towards `target` and logs the
    /// payload for retransmission
    pub fn stamp(&self, target: &Target, payload: Bytes) -> Seqno {
        let key = match target {
            Target::Group => StreamKey::new(self.local, Scope::Multicast),
            Target::Member(member) => StreamKey::new(*member, Scope::Unicast),
        };
        let stream = self.outbound_stream(key);
        let mut stream = stream.lock();
        stream.stamp(payload)
    }

    /// Looks up the messages `requester` reports missing from the stream
    /// identified by `scope`
    pub fn retransmit(
        &self,
        requester: &Member,
        scope: Scope,
        ranges: &[SeqnoRange],
    ) -> Retransmission {
        let key = match scope {
            Scope::Multicast => StreamKey::new(self.local, Scope::Multicast),
            Scope::Unicast => StreamKey::new(*requester, Scope::Unicast),
        };
        let Some(stream) = self.outbound.get(&key).map(|entry| entry.value().clone()) else {
            debug!("retransmission request from {} for unknown {:?} stream", requester, scope);
            return Retransmission::default();
        };

        let (messages, first_available) = stream.lock().lookup(ranges);
        if let Some(first_available) = first_available {
            debug!(
                "{} asked for {:?} seqnos below {}, which are no longer logged",
                requester, scope, first_available
            );
        }
        Retransmission {
            messages,
            first_available,
        }
    }

    // Incoming

    /// Accepts one inbound message. Messages that become deliverable are
    /// passed to `deliver` in ascending seqno order while the stream is
    /// locked, so a sender's messages are never handed over concurrently or
    /// out of order.
    pub fn receive<F>(
        &self,
        sender: &Member,
        scope: Scope,
        seqno: Seqno,
        payload: Bytes,
        now: Instant,
        mut deliver: F,
    ) -> Result<Receipt, DeliveryError>
    where
        F: FnMut(Seqno, Bytes),
    {
        let stream = self.inbound_stream(StreamKey::new(*sender, scope));
        let mut stream = stream.lock();

        match stream.process(seqno, payload, self.config.max_buffered_per_sender)? {
            Arrival::Duplicate => {
                trace!("dropping duplicate {} from {} ({:?})", seqno, sender, scope);
                Ok(Receipt::Duplicate)
            }
            Arrival::Overflow => Err(DeliveryError::SenderBufferFull {
                sender: *sender,
                scope,
                limit: self.config.max_buffered_per_sender,
            }),
            Arrival::Buffered => {
                debug!(
                    "buffered {} from {} ({:?}), waiting for {}",
                    seqno,
                    sender,
                    scope,
                    stream.tracker().highest_contiguous().saturating_add(1)
                );
                let retransmit = stream
                    .retransmit_due(now, self.config.retransmit_interval)
                    .map(|ranges| RetransmitRequest {
                        sender: *sender,
                        scope,
                        ranges,
                    });
                Ok(Receipt::Buffered { retransmit })
            }
            Arrival::Delivered(messages) => {
                let count = messages.len();
                for (seqno, payload) in messages {
                    deliver(seqno, payload);
                }
                Ok(Receipt::Delivered { count })
            }
        }
    }

    /// Skips seqnos below `first_available` that the sender can no longer
    /// retransmit, delivering whatever became contiguous. Returns how many
    /// messages were delivered.
    pub fn fast_forward<F>(
        &self,
        sender: &Member,
        scope: Scope,
        first_available: Seqno,
        mut deliver: F,
    ) -> usize
    where
        F: FnMut(Seqno, Bytes),
    {
        let Some(stream) = self
            .inbound
            .get(&StreamKey::new(*sender, scope))
            .map(|entry| entry.value().clone())
        else {
            return 0;
        };
        let mut stream = stream.lock();

        let through = first_available.saturating_sub(1);
        if through > stream.tracker().highest_contiguous() {
            warn!(
                "{} ({:?}) no longer holds seqnos up to {}, skipping them",
                sender, scope, through
            );
        }
        let messages = stream.fast_forward(through);
        let count = messages.len();
        for (seqno, payload) in messages {
            deliver(seqno, payload);
        }
        count
    }

    /// Retransmission requests for every stream whose gap is still open and
    /// whose last request is at least one retransmit interval old
    pub fn pending_retransmits(&self, now: Instant) -> Vec<RetransmitRequest> {
        let mut output = Vec::new();
        for (key, stream) in self.inbound_streams() {
            if let Some(ranges) = stream
                .lock()
                .retransmit_due(now, self.config.retransmit_interval)
            {
                output.push(RetransmitRequest {
                    sender: key.member,
                    scope: key.scope,
                    ranges,
                });
            }
        }
        output
    }

    // Membership

    /// Discards every stream to or from `member`. Its next message starts a
    /// fresh seqno space.
    pub fn reset(&self, member: &Member) {
        for scope in [Scope::Multicast, Scope::Unicast] {
            if self.inbound.remove(&StreamKey::new(*member, scope)).is_some() {
                debug!("reset {:?} stream from {}", scope, member);
            }
        }
        self.outbound.remove(&StreamKey::new(*member, Scope::Unicast));
    }

    pub fn on_view_change(&self, change: &ViewChange) {
        for member in &change.left {
            self.reset(member);
        }
    }

    // Introspection

    pub fn stream_state(&self, sender: &Member, scope: Scope) -> StreamState {
        if self.inbound.contains_key(&StreamKey::new(*sender, scope)) {
            StreamState::Active
        } else {
            StreamState::Idle
        }
    }

    pub fn digest(&self) -> Digest {
        let entries = self
            .inbound_streams()
            .into_iter()
            .map(|(key, stream)| {
                let stream = stream.lock();
                DigestEntry {
                    sender: key.member,
                    scope: key.scope,
                    highest_delivered: stream.tracker().highest_contiguous(),
                    highest_received: stream.tracker().highest_received(),
                }
            })
            .collect();
        Digest::new(entries)
    }

    /// Missing ranges of one inbound stream
    pub fn missing(&self, sender: &Member, scope: Scope) -> Vec<SeqnoRange> {
        self.inbound
            .get(&StreamKey::new(*sender, scope))
            .map(|entry| entry.value().clone())
            .map(|stream| stream.lock().tracker().missing())
            .unwrap_or_default()
    }

    fn inbound_stream(&self, key: StreamKey) -> Arc<Mutex<InboundStream>> {
        self.inbound
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(InboundStream::new())))
            .value()
            .clone()
    }

    fn outbound_stream(&self, key: StreamKey) -> Arc<Mutex<OutboundStream>> {
        let capacity = self.config.retransmit_log_capacity;
        self.outbound
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(OutboundStream::new(capacity))))
            .value()
            .clone()
    }

    // streams are collected first so no map shard stays locked while a
    // stream lock is taken
    fn inbound_streams(&self) -> Vec<(StreamKey, Arc<Mutex<InboundStream>>)> {
        self.inbound
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }
}
