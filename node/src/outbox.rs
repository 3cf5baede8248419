use std::sync::Arc;

use bytes::Bytes;
use log::{trace, warn};

use cohort_shared::{
    DeliveryEngine, Envelope, Member, MembershipView, Packet, Scope, Seqno, Target,
};

use crate::{error::NodeError, transport::Transport};

/// Stamps outgoing envelopes with the next seqno of their stream and hands
/// the resulting frames to the transport
pub(crate) struct Outbox {
    engine: Arc<DeliveryEngine>,
    membership: Arc<MembershipView>,
    transport: Arc<dyn Transport>,
}

impl Outbox {
    pub fn new(
        engine: Arc<DeliveryEngine>,
        membership: Arc<MembershipView>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            engine,
            membership,
            transport,
        }
    }

    /// Sends a sequenced envelope. Group sends go to every member of the
    /// current view, the local member included.
    pub fn send(&self, target: Target, envelope: &Envelope) -> Result<Seqno, NodeError> {
        let view = self.membership.current().ok_or(NodeError::NotConnected)?;

        let payload = envelope.to_bytes()?;
        let scope = target.scope();
        let seqno = self.engine.stamp(&target, payload.clone());
        let frame = Packet::Sequenced {
            scope,
            seqno,
            payload,
        }
        .to_bytes()?;

        match target {
            Target::Member(member) => {
                trace!("sending {} ({:?}) to {}", seqno, scope, member);
                self.transport.send(&member, frame)?;
            }
            Target::Group => {
                trace!("sending {} ({:?}) to view {}", seqno, scope, view.id());
                for member in view.members() {
                    // a lost copy is recovered through retransmission
                    if let Err(error) = self.transport.send(member, frame.clone()) {
                        warn!("multicast {} to {} failed: {}", seqno, member, error);
                    }
                }
            }
        }

        Ok(seqno)
    }

    /// Sends a packet outside of any seqno stream
    pub fn send_unsequenced(&self, target: &Member, packet: &Packet) -> Result<(), NodeError> {
        let frame = packet.to_bytes()?;
        self.transport.send(target, frame)?;
        Ok(())
    }

    /// Re-sends an already stamped payload
    pub fn resend(
        &self,
        target: &Member,
        scope: Scope,
        seqno: Seqno,
        payload: Bytes,
    ) -> Result<(), NodeError> {
        self.send_unsequenced(
            target,
            &Packet::Sequenced {
                scope,
                seqno,
                payload,
            },
        )
    }
}
