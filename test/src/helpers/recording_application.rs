use bytes::Bytes;
use parking_lot::Mutex;

use cohort_node::Application;
use cohort_shared::{Member, View, ViewId};

/// Application that remembers everything the node handed to it
#[derive(Default)]
pub struct RecordingApplication {
    delivered: Mutex<Vec<(Member, Bytes)>>,
    views: Mutex<Vec<ViewId>>,
}

impl RecordingApplication {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every delivery, in the order it happened
    pub fn delivered(&self) -> Vec<(Member, Bytes)> {
        self.delivered.lock().clone()
    }

    pub fn delivered_from(&self, sender: &Member) -> Vec<Bytes> {
        self.delivered
            .lock()
            .iter()
            .filter(|(from, _)| from == sender)
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    /// Ids of the accepted views, in install order
    pub fn views(&self) -> Vec<ViewId> {
        self.views.lock().clone()
    }
}

impl Application for RecordingApplication {
    fn deliver(&self, sender: &Member, payload: Bytes) {
        self.delivered.lock().push((*sender, payload));
    }

    fn view_accepted(&self, view: &View) {
        self.views.lock().push(view.id());
    }
}
