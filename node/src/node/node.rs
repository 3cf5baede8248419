use std::sync::{Arc, Weak};

use bytes::Bytes;
use log::{debug, info, trace, warn};
use parking_lot::Mutex;
use tokio::{
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use cohort_shared::{
    DeliveryEngine, Digest, Envelope, HandlerTag, Member, MembershipView, Packet, Receipt,
    ResponseSet, RetransmitRequest, Scope, Seqno, SeqnoRange, Target, View, ViewChange, ViewId,
};

use crate::{
    application::Application,
    dispatcher::{CallOptions, Dispatcher, HandlerRegistry, ResponseFuture},
    error::{DispatchError, NodeError},
    node::NodeConfig,
    outbox::Outbox,
    transport::Transport,
};

/// One member of a group. The transport feeds it every frame it receives
/// through `on_packet`, the membership layer feeds it views through
/// `on_view_change`, and the application talks to the group through `send`
/// and `call`.
///
/// All entry points take `&self` and may be called concurrently.
pub struct Node {
    local: Member,
    config: NodeConfig,
    membership: Arc<MembershipView>,
    engine: Arc<DeliveryEngine>,
    outbox: Arc<Outbox>,
    dispatcher: Dispatcher,
    application: Arc<dyn Application>,
    view_lock: Mutex<()>,
}

impl Node {
    pub fn new(
        local: Member,
        config: NodeConfig,
        transport: Arc<dyn Transport>,
        application: Arc<dyn Application>,
        handlers: HandlerRegistry,
    ) -> Self {
        let membership = Arc::new(MembershipView::new());
        let engine = Arc::new(DeliveryEngine::new(local, config.delivery.clone()));
        let outbox = Arc::new(Outbox::new(
            engine.clone(),
            membership.clone(),
            transport,
        ));
        let dispatcher = Dispatcher::new(
            local,
            config.dispatcher.clone(),
            handlers,
            membership.clone(),
            outbox.clone(),
        );

        Self {
            local,
            config,
            membership,
            engine,
            outbox,
            dispatcher,
            application,
            view_lock: Mutex::new(()),
        }
    }

    pub fn local(&self) -> &Member {
        &self.local
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Last installed view, `None` until the first install
    pub fn view(&self) -> Option<Arc<View>> {
        self.membership.current()
    }

    pub fn is_connected(&self) -> bool {
        self.membership.is_connected()
    }

    pub fn is_coordinator(&self) -> bool {
        self.membership.is_coordinator(&self.local)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Delivery progress of every sender heard from
    pub fn digest(&self) -> Digest {
        self.engine.digest()
    }

    /// Seqnos still missing from one sender
    pub fn missing(&self, sender: &Member, scope: Scope) -> Vec<SeqnoRange> {
        self.engine.missing(sender, scope)
    }

    // Outgoing

    /// Sends an application message and returns the seqno it was stamped
    /// with
    pub fn send(&self, target: Target, payload: Bytes) -> Result<Seqno, NodeError> {
        self.outbox.send(target, &Envelope::Message(payload))
    }

    pub async fn call(
        &self,
        targets: &[Member],
        tag: HandlerTag,
        body: Bytes,
        options: CallOptions,
    ) -> Result<ResponseSet, DispatchError> {
        self.dispatcher.call(targets, tag, body, options).await
    }

    pub fn call_async(
        &self,
        targets: &[Member],
        tag: HandlerTag,
        body: Bytes,
        options: CallOptions,
    ) -> Result<ResponseFuture, DispatchError> {
        self.dispatcher.call_async(targets, tag, body, options)
    }

    // Incoming

    /// Entry point for every frame the transport receives from `sender`
    pub fn on_packet(&self, sender: Member, frame: &[u8]) -> Result<(), NodeError> {
        match Packet::from_bytes(frame)? {
            Packet::Sequenced {
                scope,
                seqno,
                payload,
            } => {
                self.on_message_received(sender, scope, seqno, payload)?;
            }
            Packet::Retransmit { scope, ranges } => {
                self.on_retransmit_request(sender, scope, &ranges)?;
            }
            Packet::Truncated {
                scope,
                first_available,
            } => {
                if !self.accepts_from(&sender) {
                    return Ok(());
                }
                let delivered = self.engine.fast_forward(
                    &sender,
                    scope,
                    first_available,
                    |seqno, payload| self.dispatch(&sender, seqno, payload),
                );
                debug!(
                    "{} ({:?}) truncated below {}, {} buffered messages released",
                    sender, scope, first_available, delivered
                );
            }
        }
        Ok(())
    }

    /// Accepts one sequenced message. Whatever becomes deliverable is handed
    /// to the dispatcher or the application in seqno order before this
    /// returns. Messages from members outside the installed view are
    /// discarded.
    pub fn on_message_received(
        &self,
        sender: Member,
        scope: Scope,
        seqno: Seqno,
        payload: Bytes,
    ) -> Result<Receipt, NodeError> {
        if !self.accepts_from(&sender) {
            return Ok(Receipt::Discarded);
        }

        let now = Instant::now().into_std();
        let receipt = self
            .engine
            .receive(&sender, scope, seqno, payload, now, |seqno, payload| {
                self.dispatch(&sender, seqno, payload)
            })?;

        // the sender may have left while the message was processed, after
        // the view change already discarded its streams
        if !self.membership.contains(&sender) {
            debug!("{} left during receive, dropping its streams again", sender);
            self.engine.reset(&sender);
            return Ok(receipt);
        }

        if let Receipt::Buffered {
            retransmit: Some(request),
        } = &receipt
        {
            self.request_retransmission(request);
        }
        Ok(receipt)
    }

    /// Installs a new view. A stale view is rejected and changes nothing.
    pub fn on_view_change(
        &self,
        members: Vec<Member>,
        view_id: ViewId,
    ) -> Result<ViewChange, NodeError> {
        let _guard = self.view_lock.lock();

        let change = match self.membership.install(View::new(view_id, members)) {
            Ok(change) => change,
            Err(error) => {
                warn!("{}: {}", self.local, error);
                return Err(error.into());
            }
        };

        if !change.joined.is_empty() || !change.left.is_empty() {
            info!(
                "{}: view {} joined {:?} left {:?}",
                self.local,
                change.view_id(),
                change.joined,
                change.left
            );
        }
        self.engine.on_view_change(&change);
        self.dispatcher.suspect(&change.left);
        self.application.view_accepted(&change.view);

        Ok(change)
    }

    // Periodic work

    /// Expires overdue calls and repeats retransmission requests for gaps
    /// that are still open
    pub fn tick(&self) {
        let now = Instant::now();
        self.dispatcher.expire(now);
        for request in self.engine.pending_retransmits(now.into_std()) {
            self.request_retransmission(&request);
        }
    }

    /// Runs `tick` every sweep interval until the node is dropped
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let node: Weak<Self> = Arc::downgrade(self);
        let period = self.config.dispatcher.sweep_interval;
        tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(node) = node.upgrade() else {
                    break;
                };
                node.tick();
            }
        })
    }

    /// Traffic from members outside the installed view belongs to an old
    /// epoch of theirs and is dropped
    fn accepts_from(&self, sender: &Member) -> bool {
        if self.membership.contains(sender) {
            return true;
        }
        trace!("{}: dropping frame from non-member {}", self.local, sender);
        false
    }

    fn dispatch(&self, sender: &Member, seqno: Seqno, payload: Bytes) {
        match Envelope::from_bytes(&payload) {
            Ok(Envelope::Message(message)) => self.application.deliver(sender, message),
            Ok(Envelope::Request { id, tag, body }) => {
                self.dispatcher.on_request(sender, id, tag, body)
            }
            Ok(Envelope::Response { id, outcome }) => {
                self.dispatcher.on_response(sender, id, outcome)
            }
            Err(error) => warn!("dropping undecodable message {} from {}: {}", seqno, sender, error),
        }
    }

    fn on_retransmit_request(
        &self,
        requester: Member,
        scope: Scope,
        ranges: &[SeqnoRange],
    ) -> Result<(), NodeError> {
        if !self.accepts_from(&requester) {
            return Ok(());
        }
        let retransmission = self.engine.retransmit(&requester, scope, ranges);
        debug!(
            "{} asked for {:?} ({:?}), resending {}",
            requester,
            ranges,
            scope,
            retransmission.messages.len()
        );
        for (seqno, payload) in retransmission.messages {
            self.outbox.resend(&requester, scope, seqno, payload)?;
        }
        if let Some(first_available) = retransmission.first_available {
            self.outbox.send_unsequenced(
                &requester,
                &Packet::Truncated {
                    scope,
                    first_available,
                },
            )?;
        }
        Ok(())
    }

    fn request_retransmission(&self, request: &RetransmitRequest) {
        debug!(
            "asking {} to retransmit {:?} ({:?})",
            request.sender, request.ranges, request.scope
        );
        let packet = Packet::Retransmit {
            scope: request.scope,
            ranges: request.ranges.clone(),
        };
        if let Err(error) = self.outbox.send_unsequenced(&request.sender, &packet) {
            warn!("retransmission request to {} failed: {}", request.sender, error);
        }
    }
}
