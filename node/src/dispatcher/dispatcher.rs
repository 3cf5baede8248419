use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use log::{debug, info, warn};
use tokio::{sync::oneshot, time::Instant};

use cohort_shared::{
    Envelope, HandlerTag, Member, MembershipView, RemoteOutcome, RequestId, RequestIdGenerator,
    ResponseOutcome, ResponseSet, Target, View,
};

use crate::{
    dispatcher::{
        pending_call::{CallTable, PendingCall},
        CallOptions, DispatcherConfig, HandlerRegistry, ResponseFuture,
    },
    error::DispatchError,
    outbox::Outbox,
};

// deadline used when a caller's timeout does not fit into an Instant
const MAX_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Sends requests to other members and collects their responses, and answers
/// requests from other members with the registered handlers
pub struct Dispatcher {
    local: Member,
    config: DispatcherConfig,
    ids: RequestIdGenerator,
    calls: Arc<CallTable>,
    handlers: HandlerRegistry,
    membership: Arc<MembershipView>,
    outbox: Arc<Outbox>,
}

impl Dispatcher {
    pub(crate) fn new(
        local: Member,
        config: DispatcherConfig,
        handlers: HandlerRegistry,
        membership: Arc<MembershipView>,
        outbox: Arc<Outbox>,
    ) -> Self {
        Self {
            local,
            config,
            ids: RequestIdGenerator::new(local),
            calls: Arc::new(CallTable::new()),
            handlers,
            membership,
            outbox,
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Calls the handler `tag` on every target and waits for the result.
    /// Targets that neither answer nor leave the view before the deadline
    /// are reported as `NoResponse`.
    pub async fn call(
        &self,
        targets: &[Member],
        tag: HandlerTag,
        body: Bytes,
        options: CallOptions,
    ) -> Result<ResponseSet, DispatchError> {
        self.call_async(targets, tag, body, options)?.await
    }

    /// Starts a call and returns without waiting for it
    pub fn call_async(
        &self,
        targets: &[Member],
        tag: HandlerTag,
        body: Bytes,
        options: CallOptions,
    ) -> Result<ResponseFuture, DispatchError> {
        let view = self.membership.current().ok_or(DispatchError::NotConnected)?;
        self.start(&view, targets, tag, body, options)
    }

    /// Registers and sends a call against `view`, which may already have
    /// been replaced by the time the call is registered
    fn start(
        &self,
        view: &View,
        targets: &[Member],
        tag: HandlerTag,
        body: Bytes,
        options: CallOptions,
    ) -> Result<ResponseFuture, DispatchError> {
        let mut unique: Vec<Member> = Vec::with_capacity(targets.len());
        for target in targets {
            if !unique.contains(target) {
                unique.push(*target);
            }
        }
        if unique.is_empty() {
            return Err(DispatchError::NoTargets);
        }

        let id = self.ids.next_id();
        let timeout = options.timeout.unwrap_or(self.config.default_timeout);
        let now = Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or_else(|| now + MAX_TIMEOUT);
        let (sender, receiver) = oneshot::channel();

        let mut call = PendingCall::new(unique.clone(), options.mode, deadline, sender);
        let (reachable, absent): (Vec<Member>, Vec<Member>) =
            unique.into_iter().partition(|target| view.contains(target));
        for target in &absent {
            debug!("call {}: {} is not in view {}, suspecting it", id, target, view.id());
            call.record(*target, ResponseOutcome::Suspected);
        }
        // registered before sending so no response can overtake the entry
        self.calls.insert(id, call)?;

        // a view installed since `view` was read suspected its leavers
        // before this call was in the table
        let reachable = match self.membership.current() {
            Some(latest) if latest.id() != view.id() => {
                let (staying, departed): (Vec<Member>, Vec<Member>) = reachable
                    .into_iter()
                    .partition(|target| latest.contains(target));
                for target in departed {
                    debug!(
                        "call {}: {} left in view {}, suspecting it",
                        id,
                        target,
                        latest.id()
                    );
                    self.calls.record(&id, target, ResponseOutcome::Suspected);
                }
                staying
            }
            _ => reachable,
        };

        let request = Envelope::Request { id, tag, body };
        for target in &reachable {
            if let Err(error) = self.outbox.send(Target::Member(*target), &request) {
                warn!("call {}: request to {} failed: {}", id, target, error);
            }
        }
        self.calls.settle(&id);

        Ok(ResponseFuture::new(id, deadline, receiver, self.calls.clone()))
    }

    /// Withdraws a call. Idempotent.
    pub fn cancel(&self, id: &RequestId) -> bool {
        let cancelled = self.calls.cancel(id);
        if cancelled {
            debug!("call {} cancelled", id);
        }
        cancelled
    }

    /// Number of calls still waiting for completion
    pub fn pending_calls(&self) -> usize {
        self.calls.len()
    }

    pub fn is_pending(&self, id: &RequestId) -> bool {
        self.calls.contains(id)
    }

    // Incoming

    /// Answers a request from `from` with the handler registered for `tag`
    pub(crate) fn on_request(&self, from: &Member, id: RequestId, tag: HandlerTag, body: Bytes) {
        let outcome = self.handlers.handle(from, tag, body);
        let response = Envelope::Response { id, outcome };
        if let Err(error) = self.outbox.send(Target::Member(*from), &response) {
            warn!("response to {} for {} failed: {}", from, id, error);
        }
    }

    pub(crate) fn on_response(&self, from: &Member, id: RequestId, outcome: RemoteOutcome) {
        if *id.origin() != self.local {
            warn!("{} answered {}, which was not issued here", from, id);
            return;
        }
        let outcome = match outcome {
            RemoteOutcome::Value(value) => ResponseOutcome::Value(value),
            RemoteOutcome::Failed(reason) => ResponseOutcome::Failed(reason),
        };
        if !self.calls.record(&id, *from, outcome) {
            debug!("ignoring response from {} to finished call {}", from, id);
        }
    }

    // Membership and time

    /// Marks members that left as suspected in every call waiting for them
    pub(crate) fn suspect(&self, left: &[Member]) {
        if left.is_empty() {
            return;
        }
        let recorded = self.calls.suspect(left);
        if recorded > 0 {
            info!("suspected {} outstanding responses from {:?}", recorded, left);
        }
    }

    /// Completes every call past its deadline. Returns how many expired.
    pub(crate) fn expire(&self, now: Instant) -> usize {
        let expired = self.calls.expire(now);
        if expired > 0 {
            debug!("expired {} calls", expired);
        }
        expired
    }
}
