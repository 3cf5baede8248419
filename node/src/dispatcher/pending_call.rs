use dashmap::{mapref::entry::Entry, DashMap};
use log::{debug, trace};
use tokio::{sync::oneshot, time::Instant};

use cohort_shared::{Member, RequestId, ResponseMode, ResponseOutcome, ResponseSet};

use crate::error::DispatchError;

/// Bookkeeping for one outstanding call
pub(crate) struct PendingCall {
    targets: Vec<Member>,
    mode: ResponseMode,
    outcomes: ResponseSet,
    deadline: Instant,
    completion: oneshot::Sender<ResponseSet>,
}

impl PendingCall {
    pub fn new(
        targets: Vec<Member>,
        mode: ResponseMode,
        deadline: Instant,
        completion: oneshot::Sender<ResponseSet>,
    ) -> Self {
        Self {
            targets,
            mode,
            outcomes: ResponseSet::new(),
            deadline,
            completion,
        }
    }

    /// Whether `member` is a target that has not been accounted for yet
    pub fn awaits(&self, member: &Member) -> bool {
        self.targets.contains(member) && !self.outcomes.contains(member)
    }

    /// Records the outcome of one target. The first outcome of a target
    /// sticks; later ones and outcomes from non-targets are ignored.
    pub fn record(&mut self, member: Member, outcome: ResponseOutcome) -> bool {
        if !self.awaits(&member) {
            return false;
        }
        self.outcomes.insert(member, outcome);
        true
    }

    pub fn is_satisfied(&self) -> bool {
        self.mode.is_satisfied(
            self.outcomes.num_received(),
            self.outcomes.len(),
            self.targets.len(),
        )
    }

    pub fn is_overdue(&self, now: Instant) -> bool {
        self.deadline <= now
    }

    /// Consumes the call and hands the result to the caller. Targets without
    /// an outcome are reported as `NoResponse`.
    pub fn complete(self, id: &RequestId) {
        let mut responses = ResponseSet::new();
        for target in &self.targets {
            let outcome = self
                .outcomes
                .get(target)
                .cloned()
                .unwrap_or(ResponseOutcome::NoResponse);
            responses.insert(*target, outcome);
        }

        debug!(
            "call {} complete: {} received, {} suspected, {} without response",
            id,
            responses.num_received(),
            responses.num_suspected(),
            responses.num_no_response()
        );
        if self.completion.send(responses).is_err() {
            trace!("caller of {} is gone, dropping its result", id);
        }
    }
}

/// Outstanding calls by request id. A call is completed only by whoever
/// removes it from the table, so each call completes at most once no matter
/// how responses, suspicions, expiry and cancellation race.
#[derive(Default)]
pub(crate) struct CallTable {
    calls: DashMap<RequestId, PendingCall>,
}

impl CallTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: RequestId, call: PendingCall) -> Result<(), DispatchError> {
        match self.calls.entry(id) {
            Entry::Occupied(_) => Err(DispatchError::DuplicateRequestId { id }),
            Entry::Vacant(entry) => {
                entry.insert(call);
                Ok(())
            }
        }
    }

    /// Records an outcome and completes the call if that satisfied it.
    /// Returns whether the outcome was accepted.
    pub fn record(&self, id: &RequestId, member: Member, outcome: ResponseOutcome) -> bool {
        let (accepted, finished) = match self.calls.entry(*id) {
            Entry::Occupied(mut entry) => {
                let accepted = entry.get_mut().record(member, outcome);
                if entry.get().is_satisfied() {
                    (accepted, Some(entry.remove()))
                } else {
                    (accepted, None)
                }
            }
            Entry::Vacant(_) => (false, None),
        };

        if let Some(call) = finished {
            call.complete(id);
        }
        accepted
    }

    /// Completes the call if it is already satisfied
    pub fn settle(&self, id: &RequestId) {
        if let Some((_, call)) = self.calls.remove_if(id, |_, call| call.is_satisfied()) {
            call.complete(id);
        }
    }

    /// Marks every member of `members` as suspected in every call still
    /// waiting for it. Returns how many outcomes were recorded.
    pub fn suspect(&self, members: &[Member]) -> usize {
        // ids are collected first so no shard stays locked while completing
        let affected: Vec<RequestId> = self
            .calls
            .iter()
            .filter(|entry| members.iter().any(|member| entry.value().awaits(member)))
            .map(|entry| *entry.key())
            .collect();

        let mut recorded = 0;
        for id in affected {
            for member in members {
                if self.record(&id, *member, ResponseOutcome::Suspected) {
                    recorded += 1;
                }
            }
        }
        recorded
    }

    /// Completes every call whose deadline has passed. Returns how many
    /// calls expired.
    pub fn expire(&self, now: Instant) -> usize {
        let overdue: Vec<RequestId> = self
            .calls
            .iter()
            .filter(|entry| entry.value().is_overdue(now))
            .map(|entry| *entry.key())
            .collect();

        let mut expired = 0;
        for id in overdue {
            if let Some((_, call)) = self.calls.remove_if(&id, |_, call| call.is_overdue(now)) {
                call.complete(&id);
                expired += 1;
            }
        }
        expired
    }

    /// Completes one call regardless of its state, as its deadline passed
    pub fn expire_call(&self, id: &RequestId) {
        if let Some((_, call)) = self.calls.remove(id) {
            call.complete(id);
        }
    }

    /// Removes the call without completing it. Returns whether it was still
    /// outstanding.
    pub fn cancel(&self, id: &RequestId) -> bool {
        self.calls.remove(id).is_some()
    }

    pub fn contains(&self, id: &RequestId) -> bool {
        self.calls.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }
}
