use bytes::Bytes;

use cohort_shared::{Member, View};

/// Receives what the node delivers. Both callbacks run on the task that
/// processed the triggering packet, so they should return quickly.
pub trait Application: Send + Sync {
    /// Called once per message, in seqno order for every sender
    fn deliver(&self, sender: &Member, payload: Bytes);

    /// Called after every successful view install
    fn view_accepted(&self, _view: &View) {}
}
