use std::{
    future::{Future, IntoFuture},
    pin::Pin,
    sync::Arc,
};

use log::trace;
use tokio::{
    sync::oneshot,
    time::{timeout_at, Instant},
};

use cohort_shared::{RequestId, ResponseSet};

use crate::{dispatcher::pending_call::CallTable, error::DispatchError};

/// Result of an outstanding call. Await it to get the responses, which
/// resolve at the latest at the call's deadline.
pub struct ResponseFuture {
    id: RequestId,
    deadline: Instant,
    receiver: oneshot::Receiver<ResponseSet>,
    calls: Arc<CallTable>,
}

impl ResponseFuture {
    pub(crate) fn new(
        id: RequestId,
        deadline: Instant,
        receiver: oneshot::Receiver<ResponseSet>,
        calls: Arc<CallTable>,
    ) -> Self {
        Self {
            id,
            deadline,
            receiver,
            calls,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Whether the call has not completed yet
    pub fn is_pending(&self) -> bool {
        self.calls.contains(&self.id)
    }

    /// Withdraws the call. Awaiting the future afterwards yields
    /// `DispatchError::Cancelled`. Cancelling twice, or after completion, does
    /// nothing and returns false.
    pub fn cancel(&self) -> bool {
        self.calls.cancel(&self.id)
    }

    /// Waits for the call to complete
    pub async fn wait(mut self) -> Result<ResponseSet, DispatchError> {
        let id = self.id;
        match timeout_at(self.deadline, &mut self.receiver).await {
            Ok(Ok(responses)) => Ok(responses),
            Ok(Err(_)) => Err(DispatchError::Cancelled { id }),
            Err(_) => {
                trace!("call {} reached its deadline", id);
                // whoever removes the call sends the result, possibly a
                // response that raced with the deadline
                self.calls.expire_call(&id);
                self.receiver
                    .await
                    .map_err(|_| DispatchError::Cancelled { id })
            }
        }
    }
}

impl IntoFuture for ResponseFuture {
    type Output = Result<ResponseSet, DispatchError>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}
