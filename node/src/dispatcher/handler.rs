use std::{collections::HashMap, sync::Arc};

use bytes::Bytes;
use log::warn;

use cohort_shared::{HandlerTag, Member, RemoteOutcome};

use crate::error::DispatchError;

type Handler = Arc<dyn Fn(&Member, Bytes) -> Result<Bytes, String> + Send + Sync>;

/// Maps request tags to the functions answering them. Filled before the node
/// starts and read-only afterwards.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<HandlerTag, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, tag: HandlerTag, handler: F) -> Result<(), DispatchError>
    where
        F: Fn(&Member, Bytes) -> Result<Bytes, String> + Send + Sync + 'static,
    {
        if self.handlers.contains_key(&tag) {
            return Err(DispatchError::DuplicateHandler { tag });
        }
        self.handlers.insert(tag, Arc::new(handler));
        Ok(())
    }

    pub fn contains(&self, tag: HandlerTag) -> bool {
        self.handlers.contains_key(&tag)
    }

    /// Runs the handler for `tag`. An unknown tag is answered with a failure
    /// so the caller does not wait for its deadline.
    pub(crate) fn handle(&self, from: &Member, tag: HandlerTag, body: Bytes) -> RemoteOutcome {
        let Some(handler) = self.handlers.get(&tag) else {
            warn!("{} called unknown handler {}", from, tag);
            return RemoteOutcome::Failed(format!("no handler registered for tag {}", tag));
        };
        match handler(from, body) {
            Ok(value) => RemoteOutcome::Value(value),
            Err(reason) => RemoteOutcome::Failed(reason),
        }
    }
}
